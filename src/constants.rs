/// Defaults and fixed names shared across the codebase

// Image service
pub const DEFAULT_API_BASE: &str = "https://api.cloudflare.com/client/v4";
pub const DEFAULT_PAGE_SIZE: u32 = 100;
pub const DEFAULT_MAX_PAGES: u32 = 100;
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Upper bound the images listing endpoint accepts for `per_page`
pub const MAX_PAGE_SIZE: u32 = 10_000;

// Record files
pub const IMAGE_FIELD: &str = "image";
pub const DEFAULT_INPUT_PATH: &str = "assets/data/questions.json";
pub const DEFAULT_OUTPUT_PATH: &str = "assets/data/questions_updated.json";
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

// Environment overrides
pub const ENV_ACCOUNT_ID: &str = "CLOUDFLARE_ACCOUNT_ID";
pub const ENV_API_TOKEN: &str = "CLOUDFLARE_API_TOKEN";
pub const ENV_API_BASE: &str = "CLOUDFLARE_API_BASE";
pub const ENV_PUSHGATEWAY_URL: &str = "QUIZ_SYNC_PUSHGATEWAY_URL";
