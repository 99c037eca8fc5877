//! Recording fakes shared by downstream crate tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::{ContentSink, ScreenState};

/// [`ContentSink`] that records everything posted or evaluated.
#[derive(Debug, Default)]
pub struct RecordingSink {
    posted: Mutex<Vec<String>>,
    evaluated: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw payloads posted so far, in order.
    pub fn posted(&self) -> Vec<String> {
        self.posted.lock().unwrap().clone()
    }

    /// Posted payloads parsed as JSON.
    pub fn posted_json(&self) -> Vec<serde_json::Value> {
        self.posted()
            .iter()
            .map(|p| serde_json::from_str(p).expect("posted payload is JSON"))
            .collect()
    }

    /// The `type` tag of each posted message, in order.
    pub fn posted_types(&self) -> Vec<String> {
        self.posted_json()
            .iter()
            .map(|v| v["type"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    pub fn evaluated(&self) -> Vec<String> {
        self.evaluated.lock().unwrap().clone()
    }
}

impl ContentSink for RecordingSink {
    fn post(&self, payload: &str) {
        self.posted.lock().unwrap().push(payload.to_string());
    }

    fn eval(&self, script: &str) {
        self.evaluated.lock().unwrap().push(script.to_string());
    }
}

/// [`ScreenState`] backed by an atomic flag.
#[derive(Debug, Default)]
pub struct FlagScreen {
    ocr_active: AtomicBool,
}

impl FlagScreen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ocr_active(&self) -> bool {
        self.ocr_active.load(Ordering::SeqCst)
    }
}

impl ScreenState for FlagScreen {
    fn set_ocr_active(&self, active: bool) {
        self.ocr_active.store(active, Ordering::SeqCst);
    }
}
