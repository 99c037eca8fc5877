//! Persistent key/value storage for the shell.
//!
//! Two things live here: the credential record written by sign-in flows and
//! a cookie jar the embedded content mirrors its cookies into. Both sit on
//! top of a small [`KeyValue`] capability so hosts can swap the backing
//! store (the shipped backends are an in-memory map and a single JSON file).

mod cookie;
mod error;
mod kv;
mod session;

pub use cookie::{CookieEntry, CookieJar, ACCESS_TOKEN_COOKIE};
pub use error::{Result, StoreError};
pub use kv::{JsonFileKv, KeyValue, MemoryKv};
pub use session::{SessionRecord, SessionStore, SESSION_KEY};

/// Milliseconds since the Unix epoch.
pub(crate) fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
