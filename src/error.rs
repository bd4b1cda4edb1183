use crate::types::ApiMessage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Image service unavailable: {reason}")]
    RemoteUnavailable { reason: String },

    #[error("Image service rejected the request: {}", format_api_messages(.errors))]
    RemoteRejected { errors: Vec<ApiMessage> },

    #[error("Malformed record at position {position}: {reason}")]
    MalformedRecord { position: usize, reason: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    /// True for the two failures that mean no catalog was obtained.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            SyncError::RemoteUnavailable { .. } | SyncError::RemoteRejected { .. }
        )
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        SyncError::RemoteUnavailable {
            reason: err.to_string(),
        }
    }
}

fn format_api_messages(errors: &[ApiMessage]) -> String {
    if errors.is_empty() {
        return "no error detail reported".to_string();
    }
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_message_lists_service_errors() {
        let err = SyncError::RemoteRejected {
            errors: vec![
                ApiMessage {
                    code: Some(10000),
                    message: "Authentication error".to_string(),
                },
                ApiMessage {
                    code: None,
                    message: "try again".to_string(),
                },
            ],
        };
        assert_eq!(
            err.to_string(),
            "Image service rejected the request: [10000] Authentication error; try again"
        );
        assert!(err.is_remote());
    }

    #[test]
    fn test_rejected_without_detail() {
        let err = SyncError::RemoteRejected { errors: vec![] };
        assert!(err.to_string().ends_with("no error detail reported"));
    }

    #[test]
    fn test_malformed_record_is_not_remote() {
        let err = SyncError::MalformedRecord {
            position: 3,
            reason: "image is a number".to_string(),
        };
        assert!(!err.is_remote());
        assert_eq!(err.to_string(), "Malformed record at position 3: image is a number");
    }

    #[test]
    fn test_remote_failure_found_through_context() {
        let err = anyhow::Error::from(SyncError::RemoteUnavailable {
            reason: "timeout".to_string(),
        })
        .context("fetching catalog");
        assert!(err.downcast_ref::<SyncError>().is_some_and(SyncError::is_remote));

        let err = anyhow::Error::from(SyncError::Config("missing token".to_string()));
        assert!(!err.downcast_ref::<SyncError>().is_some_and(SyncError::is_remote));
    }
}
