//! Interfaces onto the embedded browser surface.
//!
//! The bridge never touches the webview directly; it only needs to hand an
//! opaque string to the page or run a script inside it. Both directions are
//! fire-and-forget from the caller's point of view.

#[cfg(feature = "test-support")]
pub mod test_support;

/// One-way channel into the embedded web content.
///
/// Implemented by the hosting shell (the actual webview wrapper). `post`
/// delivers a serialized bridge message to the page's message listener;
/// `eval` runs a script in the page context.
pub trait ContentSink: Send + Sync {
    fn post(&self, payload: &str);
    fn eval(&self, script: &str);
}

/// Shared screen flag owned by the hosting shell: whether the OCR capture
/// surface is shown over the web content.
pub trait ScreenState: Send + Sync {
    fn set_ocr_active(&self, active: bool);
}

/// Screen state for hosts without an OCR surface.
#[derive(Debug, Default)]
pub struct NullScreen;

impl ScreenState for NullScreen {
    fn set_ocr_active(&self, _active: bool) {}
}
