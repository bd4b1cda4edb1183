use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::*;
use crate::error::{Result, SyncError};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cloudflare: CloudflareConfig,
    #[serde(default)]
    pub files: FilesConfig,
}

/// Connection settings for the image service. Passed by value into the client;
/// nothing here is read from globals after loading.
#[derive(Clone, Deserialize)]
pub struct CloudflareConfig {
    #[serde(default)]
    pub account_id: String,
    #[serde(default)]
    pub api_token: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FilesConfig {
    #[serde(default = "default_input")]
    pub input: PathBuf,
    #[serde(default = "default_output")]
    pub output: PathBuf,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}
fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}
fn default_max_pages() -> u32 {
    DEFAULT_MAX_PAGES
}
fn default_timeout_seconds() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}
fn default_input() -> PathBuf {
    PathBuf::from(DEFAULT_INPUT_PATH)
}
fn default_output() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_PATH)
}

impl Default for CloudflareConfig {
    fn default() -> Self {
        Self {
            account_id: String::new(),
            api_token: String::new(),
            api_base: default_api_base(),
            page_size: default_page_size(),
            max_pages: default_max_pages(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            input: default_input(),
            output: default_output(),
        }
    }
}

// Keep the token out of logs.
impl std::fmt::Debug for CloudflareConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareConfig")
            .field("account_id", &self.account_id)
            .field("api_token", &if self.api_token.is_empty() { "<unset>" } else { "<redacted>" })
            .field("api_base", &self.api_base)
            .field("page_size", &self.page_size)
            .field("max_pages", &self.max_pages)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

impl Config {
    /// Loads `path` if it exists, falling back to defaults, then applies
    /// environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| {
                SyncError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
            })?;
            Self::from_toml_str(&content)?
        } else {
            tracing::debug!("No config file at {}, using defaults", path.display());
            Config::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var(ENV_ACCOUNT_ID) {
            if !v.trim().is_empty() {
                self.cloudflare.account_id = v.trim().to_string();
            }
        }
        if let Ok(v) = std::env::var(ENV_API_TOKEN) {
            if !v.trim().is_empty() {
                self.cloudflare.api_token = v.trim().to_string();
            }
        }
        if let Ok(v) = std::env::var(ENV_API_BASE) {
            if !v.trim().is_empty() {
                self.cloudflare.api_base = v.trim().to_string();
            }
        }
    }

    /// Checks everything a full sync run needs before any request goes out.
    pub fn validate(&self) -> Result<()> {
        self.cloudflare.validate()?;
        self.files.validate()
    }
}

impl CloudflareConfig {
    pub fn validate(&self) -> Result<()> {
        if self.account_id.trim().is_empty() {
            return Err(SyncError::Config(format!(
                "cloudflare.account_id is not set (config file or {})",
                ENV_ACCOUNT_ID
            )));
        }
        if self.api_token.trim().is_empty() {
            return Err(SyncError::Config(format!(
                "cloudflare.api_token is not set (config file or {})",
                ENV_API_TOKEN
            )));
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(SyncError::Config(format!(
                "cloudflare.page_size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        if self.max_pages == 0 {
            return Err(SyncError::Config("cloudflare.max_pages must be at least 1".into()));
        }
        Ok(())
    }
}

impl FilesConfig {
    pub fn validate(&self) -> Result<()> {
        if same_location(&self.input, &self.output) {
            return Err(SyncError::Config(format!(
                "output path '{}' must differ from the input path",
                self.output.display()
            )));
        }
        Ok(())
    }

    /// Rejects a side artifact (report, mapping dump) that would land on the
    /// input or output file.
    pub fn check_artifact(&self, label: &str, path: &Path) -> Result<()> {
        for (role, existing) in [("input", &self.input), ("output", &self.output)] {
            if same_location(path, existing) {
                return Err(SyncError::Config(format!(
                    "{} path '{}' must differ from the {} path",
                    label,
                    path.display(),
                    role
                )));
            }
        }
        Ok(())
    }
}

/// True when both paths name the same file. Paths that do not exist yet are
/// resolved through their parent directory.
pub fn same_location(a: &Path, b: &Path) -> bool {
    resolve(a) == resolve(b)
}

fn resolve(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => {
            let parent = if parent.as_os_str().is_empty() {
                Path::new(".")
            } else {
                parent
            };
            parent
                .canonicalize()
                .map(|dir| dir.join(name))
                .unwrap_or_else(|_| path.to_path_buf())
        }
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_full_config() {
        let config = Config::from_toml_str(
            r#"
            [cloudflare]
            account_id = "acc"
            api_token = "tok"
            page_size = 1000
            max_pages = 5

            [files]
            input = "in.json"
            output = "out.json"
            "#,
        )
        .unwrap();

        assert_eq!(config.cloudflare.account_id, "acc");
        assert_eq!(config.cloudflare.page_size, 1000);
        assert_eq!(config.cloudflare.max_pages, 5);
        assert_eq!(config.cloudflare.api_base, DEFAULT_API_BASE);
        assert_eq!(config.cloudflare.timeout_seconds, DEFAULT_TIMEOUT_SECONDS);
        assert_eq!(config.files.input, PathBuf::from("in.json"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();

        assert_eq!(config.cloudflare.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.files.output, PathBuf::from(DEFAULT_OUTPUT_PATH));
    }

    #[test]
    fn test_validate_requires_credentials() {
        let config = Config::default();
        assert!(matches!(config.validate(), Err(SyncError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_output_equal_to_input() {
        let mut config = Config::default();
        config.cloudflare.account_id = "acc".into();
        config.cloudflare.api_token = "tok".into();
        config.files.output = config.files.input.clone();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("must differ"));
    }

    #[test]
    fn test_validate_rejects_page_size_out_of_range() {
        let mut cf = CloudflareConfig {
            account_id: "acc".into(),
            api_token: "tok".into(),
            ..Default::default()
        };
        cf.page_size = 0;
        assert!(cf.validate().is_err());
        cf.page_size = MAX_PAGE_SIZE + 1;
        assert!(cf.validate().is_err());
        cf.page_size = MAX_PAGE_SIZE;
        assert!(cf.validate().is_ok());
    }

    #[test]
    fn test_report_cannot_replace_input_or_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.json");
        std::fs::write(&input, r#"[{"image":"cat.png"}]"#).unwrap();
        let files = FilesConfig {
            input: input.clone(),
            output: dir.path().join("out.json"),
        };

        let err = files.check_artifact("report", &input).unwrap_err();
        assert!(err.to_string().contains("differ from the input path"));

        // Output does not exist yet and is spelled differently
        let sneaky = dir.path().join(".").join("out.json");
        let err = files.check_artifact("report", &sneaky).unwrap_err();
        assert!(matches!(err, SyncError::Config(ref m) if m.contains("output path")));

        assert!(files
            .check_artifact("report", &dir.path().join("report.json"))
            .is_ok());
        let err = files.check_artifact("mapping dump", &input).unwrap_err();
        assert!(err.to_string().starts_with("Configuration error: mapping dump path"));
        assert_eq!(
            std::fs::read_to_string(&input).unwrap(),
            r#"[{"image":"cat.png"}]"#
        );
    }

    #[test]
    fn test_debug_redacts_token() {
        let cf = CloudflareConfig {
            api_token: "secret-token".into(),
            ..Default::default()
        };
        let rendered = format!("{:?}", cf);
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("<redacted>"));
    }
}
