//! Shell configuration, read once at process start.
//!
//! Everything the bridge needs from the outside world lives here: the web
//! application URL, the backend URL used for receipt verification, the
//! federated sign-in client identifiers, and the purchasable SKUs.

use thiserror::Error;

/// Errors raised while assembling a [`ShellConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),
}

/// Fixed configuration for one shell process.
#[derive(Debug, Clone)]
pub struct ShellConfig {
    /// URL the embedded content is loaded from.
    pub front_url: String,
    /// Backend base URL; receipt verification posts to `{back_url}/purchase/verify`.
    pub back_url: String,
    pub google_web_client_id: String,
    pub google_ios_client_id: String,
    pub google_android_client_id: String,
    /// App bundle identifier, sent with iOS receipts.
    pub bundle_id: String,
    /// In-app product SKUs offered to the embedded content.
    pub iap_skus: Vec<String>,
}

impl ShellConfig {
    /// Read configuration from `VOCA_*` environment variables.
    ///
    /// `VOCA_FRONT_URL` and `VOCA_BACK_URL` are required; everything else
    /// defaults to empty. `VOCA_IAP_SKUS` is comma separated.
    pub fn from_env() -> Result<Self, ConfigError> {
        let front_url = require("VOCA_FRONT_URL")?;
        let back_url = require("VOCA_BACK_URL")?;
        Ok(Self {
            front_url,
            back_url,
            google_web_client_id: optional("VOCA_GOOGLE_WEB_CLIENT_ID"),
            google_ios_client_id: optional("VOCA_GOOGLE_IOS_CLIENT_ID"),
            google_android_client_id: optional("VOCA_GOOGLE_ANDROID_CLIENT_ID"),
            bundle_id: optional("VOCA_BUNDLE_ID"),
            iap_skus: parse_skus(&optional("VOCA_IAP_SKUS")),
        })
    }

    /// Endpoint the purchase flow verifies receipts against.
    pub fn verify_url(&self) -> String {
        format!("{}/purchase/verify", self.back_url.trim_end_matches('/'))
    }
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(v) if !v.is_empty() => Ok(v),
        _ => Err(ConfigError::MissingVar(name)),
    }
}

fn optional(name: &str) -> String {
    std::env::var(name).unwrap_or_default()
}

fn parse_skus(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
