use serde::{Deserialize, Serialize};

/// Word geometry in source-image pixel space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// One recognized word from a captured image. Scoped to a single capture
/// session, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrWord {
    pub text: String,
    #[serde(rename = "boundingBox")]
    pub bounding_box: BoundingBox,
}

/// Handle onto a captured image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRef {
    pub uri: String,
    pub width: u32,
    pub height: u32,
}

/// A word the embedded content kept after dictionary lookup. Only ever
/// created from an inbound `filteredWords` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilteredWord {
    #[serde(rename = "wordId")]
    pub word_id: i64,
    pub word: String,
    /// Dictionary entries, owned and shaped by the web application.
    #[serde(default)]
    pub meanings: Vec<serde_json::Value>,
}
