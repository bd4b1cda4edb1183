use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use std::time::Duration;
use tracing::{debug, instrument};

use crate::app::ports::ImageCatalogPort;
use crate::config::CloudflareConfig;
use crate::error::{Result, SyncError};
use crate::types::ListImagesResponse;

/// Lists images through the Cloudflare Images v1 API.
pub struct CloudflareImagesClient {
    client: reqwest::Client,
    config: CloudflareConfig,
}

impl CloudflareImagesClient {
    pub fn new(config: CloudflareConfig) -> Result<Self> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| SyncError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    pub fn list_url(&self) -> String {
        format!(
            "{}/accounts/{}/images/v1",
            self.config.api_base.trim_end_matches('/'),
            self.config.account_id
        )
    }
}

#[async_trait]
impl ImageCatalogPort for CloudflareImagesClient {
    #[instrument(skip(self))]
    async fn list_images(&self, page: u32, per_page: u32) -> Result<ListImagesResponse> {
        let url = self.list_url();
        debug!("HTTP GET request to: {} page={} per_page={}", url, page, per_page);
        let resp = self
            .client
            .get(&url)
            .query(&[("page", page), ("per_page", per_page)])
            .header(AUTHORIZATION, format!("Bearer {}", self.config.api_token))
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = resp.status();
        let bytes = resp.bytes().await?;
        debug!("HTTP response: status={}, size={} bytes", status.as_u16(), bytes.len());

        interpret_response(status.as_u16(), &bytes)
    }
}

/// Maps a raw listing response onto the envelope or a transport-level failure.
///
/// A non-2xx response that still carries a failure envelope is passed through so
/// the caller can report the service's own error list; anything else that is not a
/// readable 2xx envelope means the service could not be reached properly.
pub fn interpret_response(status: u16, body: &[u8]) -> Result<ListImagesResponse> {
    let parsed = serde_json::from_slice::<ListImagesResponse>(body);
    let success_status = (200..300).contains(&status);

    match parsed {
        Ok(envelope) if success_status => Ok(envelope),
        Ok(envelope) if !envelope.success => Ok(envelope),
        Ok(_) => Err(SyncError::RemoteUnavailable {
            reason: format!("unexpected HTTP status {}", status),
        }),
        Err(e) if success_status => Err(SyncError::RemoteUnavailable {
            reason: format!("unreadable response body: {}", e),
        }),
        Err(_) => Err(SyncError::RemoteUnavailable {
            reason: format!("unexpected HTTP status {}", status),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CloudflareConfig {
        CloudflareConfig {
            account_id: "acc123".into(),
            api_token: "tok".into(),
            api_base: "https://api.example.test/client/v4/".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_list_url() {
        let client = CloudflareImagesClient::new(config()).unwrap();
        assert_eq!(
            client.list_url(),
            "https://api.example.test/client/v4/accounts/acc123/images/v1"
        );
    }

    #[test]
    fn test_new_rejects_missing_token() {
        let mut cfg = config();
        cfg.api_token.clear();
        assert!(matches!(
            CloudflareImagesClient::new(cfg),
            Err(SyncError::Config(_))
        ));
    }

    #[test]
    fn test_success_envelope_passes_through() {
        let body = br#"{"success":true,"errors":[],"messages":[],"result":{"images":[{"id":"x1","filename":"a.png"}]}}"#;
        let env = interpret_response(200, body).unwrap();
        assert!(env.success);
        assert_eq!(env.result.unwrap().images.map(|i| i.len()), Some(1));
    }

    #[test]
    fn test_failure_envelope_on_error_status_is_kept() {
        let body = br#"{"success":false,"errors":[{"code":10000,"message":"Authentication error"}],"messages":[],"result":null}"#;
        let env = interpret_response(403, body).unwrap();
        assert!(!env.success);
        assert_eq!(env.errors[0].code, Some(10000));
    }

    #[test]
    fn test_error_status_without_envelope_is_unavailable() {
        let err = interpret_response(502, b"<html>Bad Gateway</html>").unwrap_err();
        assert!(matches!(err, SyncError::RemoteUnavailable { ref reason } if reason.contains("502")));
    }

    #[test]
    fn test_garbage_body_on_ok_status_is_unavailable() {
        let err = interpret_response(200, b"not json").unwrap_err();
        assert!(matches!(err, SyncError::RemoteUnavailable { .. }));
    }
}
