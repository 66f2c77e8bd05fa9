//! Runtime configuration for the upload pipeline.
//!
//! Environment lookups stay at this edge: the pipeline itself only ever
//! sees an explicit [`Config`] value, so tests never have to manipulate
//! process-wide state.

use std::env;
use std::time::Duration;

pub const API_URL_ENV: &str = "PICLAB_API_URL";
pub const API_KEY_ENV: &str = "PICLAB_API_KEY";

const DEFAULT_API_URL: &str = "http://localhost:3000/api/upload";
const DEFAULT_API_KEY: &str = "your_api_key1";

/// Bound on every HTTP request the uploader makes, so a stalled endpoint
/// cannot hang a capture run indefinitely.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Upload endpoint accepting multipart POSTs.
    pub api_url: String,
    /// Key sent as a bearer token.
    pub api_key: String,
    /// Per-request deadline for uploads and downloads.
    pub request_timeout: Duration,
}

impl Config {
    /// Resolve configuration from CLI overrides and the process environment.
    pub fn resolve(cli_url: Option<String>, cli_key: Option<String>) -> Self {
        Self::from_sources(
            cli_url,
            cli_key,
            env::var(API_URL_ENV).ok(),
            env::var(API_KEY_ENV).ok(),
        )
    }

    /// Resolution order per value: CLI flag, then environment, then default.
    fn from_sources(
        cli_url: Option<String>,
        cli_key: Option<String>,
        env_url: Option<String>,
        env_key: Option<String>,
    ) -> Self {
        Self {
            api_url: cli_url
                .or(env_url)
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            api_key: cli_key
                .or(env_key)
                .unwrap_or_else(|| DEFAULT_API_KEY.to_string()),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}
