//! Native chrome capabilities the router drives: dialogs, toasts, haptics.

use async_trait::async_trait;

/// Haptic impact strength, mapped from the web side's style hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HapticStyle {
    Light,
    Medium,
    Heavy,
}

impl HapticStyle {
    /// Recognize a style hint. Unrecognized hints return `None` so the
    /// caller can fall back to a plain vibration.
    pub fn from_hint(hint: &str) -> Option<Self> {
        match hint.to_ascii_lowercase().as_str() {
            "light" => Some(Self::Light),
            "medium" => Some(Self::Medium),
            "heavy" => Some(Self::Heavy),
            _ => None,
        }
    }
}

/// Blocking native dialogs and transient notices.
#[async_trait]
pub trait ShellUi: Send + Sync {
    async fn alert(&self, message: &str);

    /// Two-button confirmation. Returns true iff the user picked the
    /// confirming (second) button.
    async fn confirm(&self, message: &str, cancel_label: &str, confirm_label: &str) -> bool;

    fn toast(&self, message: &str);
}

/// Device vibration. All calls are fire-and-forget.
pub trait Haptics: Send + Sync {
    fn impact(&self, style: HapticStyle);
    fn vibrate_ms(&self, duration: u64);
    fn cancel(&self);
}
