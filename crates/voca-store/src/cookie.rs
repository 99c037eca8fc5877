//! Cookie mirror for the embedded content.
//!
//! The web application syncs selected cookies into native storage so flows
//! running outside the webview (receipt verification, above all) can present
//! the user's bearer token. Expiry is enforced lazily: an expired entry is
//! deleted on read and reported as absent. There is no background sweep.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{now_ms, KeyValue, Result};

/// Cookie the purchase flow reads its bearer credential from.
pub const ACCESS_TOKEN_COOKIE: &str = "userAccessToken";

const NAMESPACE: &str = "cookie.";

/// One stored cookie.
///
/// `expires` is an absolute millisecond epoch; zero or negative means the
/// cookie never expires on read (the web side sends session cookies that
/// way). `timestamp` records when the entry was written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CookieEntry {
    pub value: String,
    pub expires: i64,
    pub timestamp: i64,
}

impl CookieEntry {
    fn expired(&self, now: i64) -> bool {
        self.expires > 0 && self.expires <= now
    }
}

/// Namespaced cookie storage over a [`KeyValue`] backend.
#[derive(Clone)]
pub struct CookieJar {
    kv: Arc<dyn KeyValue>,
}

impl CookieJar {
    pub fn new(kv: Arc<dyn KeyValue>) -> Self {
        Self { kv }
    }

    fn key(name: &str) -> String {
        format!("{NAMESPACE}{name}")
    }

    /// Write or replace a cookie.
    pub async fn set(&self, name: &str, value: &str, expires: i64) -> Result<()> {
        let entry = CookieEntry {
            value: value.to_string(),
            expires,
            timestamp: now_ms(),
        };
        self.kv
            .set(&Self::key(name), &serde_json::to_string(&entry)?)
            .await
    }

    /// Read a cookie's value, deleting it first if it has expired.
    pub async fn get(&self, name: &str) -> Result<Option<String>> {
        let key = Self::key(name);
        let Some(raw) = self.kv.get(&key).await? else {
            return Ok(None);
        };
        let entry: CookieEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                // An undecodable entry is unrecoverable; drop it.
                debug!(name, error = %e, "dropping corrupt cookie entry");
                self.kv.remove(&key).await?;
                return Ok(None);
            }
        };
        if entry.expired(now_ms()) {
            debug!(name, "cookie expired on read");
            self.kv.remove(&key).await?;
            return Ok(None);
        }
        Ok(Some(entry.value))
    }

    pub async fn remove(&self, name: &str) -> Result<()> {
        self.kv.remove(&Self::key(name)).await
    }
}
