//! The signed-in user's credential record.
//!
//! Written whole by sign-in flows, patched by token refresh, cleared by
//! sign-out. Nothing else mutates it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{KeyValue, Result};

/// Fixed storage key for the credential record.
pub const SESSION_KEY: &str = "app_session";

/// Identity and token material for the current session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub google_id: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub fcm_token: Option<String>,
}

/// Persistence for the [`SessionRecord`].
#[derive(Clone)]
pub struct SessionStore {
    kv: Arc<dyn KeyValue>,
}

impl SessionStore {
    pub fn new(kv: Arc<dyn KeyValue>) -> Self {
        Self { kv }
    }

    pub async fn load(&self) -> Result<SessionRecord> {
        match self.kv.get(SESSION_KEY).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(SessionRecord::default()),
        }
    }

    /// Replace the whole record. Sign-in writes go through here so the
    /// access/refresh pair always lands together.
    pub async fn save(&self, record: &SessionRecord) -> Result<()> {
        self.kv
            .set(SESSION_KEY, &serde_json::to_string(record)?)
            .await
    }

    /// Patch only the access token, keeping the rest of the record intact.
    pub async fn set_access_token(&self, token: &str) -> Result<()> {
        let mut record = self.load().await?;
        record.access_token = Some(token.to_string());
        self.save(&record).await
    }

    /// Drop the record entirely (sign-out).
    pub async fn clear(&self) -> Result<()> {
        info!("clearing session record");
        self.kv.remove(SESSION_KEY).await
    }
}
