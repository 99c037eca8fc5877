//! Everything the router needs, handed in explicitly at construction.

use std::sync::Arc;

use voca_auth::{AppleSignIn, GoogleSignIn};
use voca_config::ShellConfig;
use voca_iap::PurchaseFlow;
use voca_ocr::CaptureCoordinator;
use voca_store::{CookieJar, SessionStore};
use voca_webview::{ContentSink, ScreenState};

use crate::shell::{Haptics, ShellUi};

/// Capability bundle for one bridge instance. No globals; tests swap in
/// fakes member by member.
pub struct BridgeContext {
    pub config: ShellConfig,
    pub content: Arc<dyn ContentSink>,
    pub screen: Arc<dyn ScreenState>,
    pub ui: Arc<dyn ShellUi>,
    pub haptics: Arc<dyn Haptics>,
    pub google: Arc<dyn GoogleSignIn>,
    pub apple: Arc<dyn AppleSignIn>,
    pub cookies: CookieJar,
    pub session: SessionStore,
    pub purchases: Arc<PurchaseFlow>,
    pub capture: Arc<CaptureCoordinator>,
    /// Host callback that shuts the application down.
    pub exit: Arc<dyn Fn() + Send + Sync>,
}
