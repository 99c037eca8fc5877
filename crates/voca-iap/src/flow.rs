//! The purchase verification state machine.
//!
//! `Idle → Initiated → AwaitingPlatformResult → Verifying →
//! {VerifyFailed, TokenRefreshRetry, Verified} → Finalizing →
//! {Completed, FinalizeFailed}`
//!
//! Verification runs against the backend with the bearer token mirrored
//! into the cookie store. A 401 triggers exactly one web-side session
//! refresh followed by one retry; a second 401 is terminal. Finalize is
//! only ever called after verification succeeds.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, Mutex};
use tracing::{error, info, warn};

use voca_store::{CookieJar, ACCESS_TOKEN_COOKIE};
use voca_webview::ContentSink;

use crate::message::{codes, IapMessage, SuccessData};
use crate::{
    Purchase, PurchaseEvent, PurchaseState, PurchaseStore, ReceiptVerifier, VerifyError,
};

/// Script asking the embedded content to refresh its session. The page is
/// expected to persist the new token back through `setCookie`.
pub const REFRESH_SCRIPT: &str = "window.refreshAccessToken && window.refreshAccessToken();";

const DEFAULT_REFRESH_GRACE: Duration = Duration::from_secs(3);

pub struct PurchaseFlow {
    store: Arc<dyn PurchaseStore>,
    verifier: Arc<dyn ReceiptVerifier>,
    cookies: CookieJar,
    content: Arc<dyn ContentSink>,
    /// How long to wait after requesting a session refresh before retrying.
    /// A timer stands in for a real completion signal here; see DESIGN.md.
    refresh_grace: Duration,
    initialized: Mutex<bool>,
    states: Mutex<HashMap<String, PurchaseState>>,
}

impl PurchaseFlow {
    pub fn new(
        store: Arc<dyn PurchaseStore>,
        verifier: Arc<dyn ReceiptVerifier>,
        cookies: CookieJar,
        content: Arc<dyn ContentSink>,
    ) -> Self {
        Self {
            store,
            verifier,
            cookies,
            content,
            refresh_grace: DEFAULT_REFRESH_GRACE,
            initialized: Mutex::new(false),
            states: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_refresh_grace(mut self, grace: Duration) -> Self {
        self.refresh_grace = grace;
        self
    }

    /// Current state for a transaction id, or for a SKU while its request
    /// is still waiting on the platform. Unknown keys read as `Idle`.
    pub async fn state_of(&self, key: &str) -> PurchaseState {
        self.states
            .lock()
            .await
            .get(key)
            .copied()
            .unwrap_or(PurchaseState::Idle)
    }

    async fn set_state(&self, transaction_id: &str, state: PurchaseState) {
        self.states
            .lock()
            .await
            .insert(transaction_id.to_string(), state);
    }

    fn post(&self, message: &IapMessage) {
        match serde_json::to_string(message) {
            Ok(payload) => self.content.post(&payload),
            Err(e) => error!(error = %e, "failed to serialize iap message"),
        }
    }

    /// Drive the flow from the platform's event stream. Events are handled
    /// one at a time, in order.
    pub async fn run(self: Arc<Self>, mut events: mpsc::Receiver<PurchaseEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                PurchaseEvent::Updated(purchase) => self.handle_update(purchase).await,
                PurchaseEvent::Failed { code, message } => self.handle_store_error(code, message),
            }
        }
    }

    /// Entry point for the bridge: start a purchase for one SKU.
    ///
    /// Initializes the store connection lazily, then posts
    /// `iap_purchase_started` before any platform confirmation arrives.
    /// Request progress is tracked under the SKU until the platform's
    /// purchase-updated event supersedes it with a transaction id.
    pub async fn execute_purchase(&self, item_id: &str) {
        if let Err(e) = self.ensure_initialized().await {
            error!(error = %e, "purchase store initialization failed");
            self.post(&IapMessage::error(codes::PURCHASE_FAILED, e.to_string()));
            return;
        }
        self.set_state(item_id, PurchaseState::Initiated).await;
        if let Err(e) = self.store.request_purchase(item_id).await {
            error!(item_id, error = %e, "purchase request failed");
            self.states.lock().await.remove(item_id);
            self.post(&IapMessage::error(
                e.code.as_deref().unwrap_or(codes::PURCHASE_FAILED),
                e.message.clone(),
            ));
            return;
        }
        self.set_state(item_id, PurchaseState::AwaitingPlatformResult)
            .await;
        info!(item_id, "purchase requested");
        self.post(&IapMessage::started(item_id));
    }

    async fn ensure_initialized(&self) -> Result<(), crate::PurchaseStoreError> {
        let mut initialized = self.initialized.lock().await;
        if *initialized {
            return Ok(());
        }
        self.store.init_connection().await?;
        *initialized = true;
        Ok(())
    }

    /// Handle one purchase-updated event end to end.
    async fn handle_update(&self, purchase: Purchase) {
        let tid = purchase.transaction_id.clone();
        match self.state_of(&tid).await {
            PurchaseState::Finalizing | PurchaseState::Completed => {
                warn!(transaction_id = %tid, "duplicate delivery of settled purchase; ignoring");
                return;
            }
            _ => {}
        }
        // The platform answered; the SKU-keyed request slot is done.
        self.states.lock().await.remove(&purchase.product_id);
        info!(transaction_id = %tid, product_id = %purchase.product_id, "verifying purchase");
        self.set_state(&tid, PurchaseState::Verifying).await;

        let body = match self.verify_with_retry(&purchase).await {
            Ok(body) => body,
            Err((code, message)) => {
                self.set_state(&tid, PurchaseState::VerifyFailed).await;
                self.post(&IapMessage::error(code, message));
                return;
            }
        };

        self.set_state(&tid, PurchaseState::Verified).await;
        self.set_state(&tid, PurchaseState::Finalizing).await;
        if let Err(e) = self.store.finish_transaction(&purchase, true).await {
            // Entitlement is recorded server-side; report as a processing
            // failure, not a failed purchase.
            error!(transaction_id = %tid, error = %e, "finalize failed after verification");
            self.set_state(&tid, PurchaseState::FinalizeFailed).await;
            self.post(&IapMessage::error(
                codes::PURCHASE_PROCESSING_FAILED,
                e.to_string(),
            ));
            return;
        }

        self.set_state(&tid, PurchaseState::Completed).await;
        info!(transaction_id = %tid, "purchase completed");
        self.post(&IapMessage::Success {
            data: Box::new(SuccessData {
                platform: purchase.platform,
                product_id: purchase.product_id.clone(),
                quantity: purchase.quantity,
                transaction_id: tid,
                transaction_date: purchase.transaction_date,
                server_verified: true,
                gems_awarded: body.get("gemsAwarded").and_then(Value::as_i64).unwrap_or(0),
                user_gems: body.get("userGems").and_then(Value::as_i64).unwrap_or(0),
                server_response: body,
            }),
        });
    }

    /// One verification attempt, with at most one token-refresh retry.
    async fn verify_with_retry(
        &self,
        purchase: &Purchase,
    ) -> Result<Value, (&'static str, String)> {
        let Some(bearer) = self.bearer().await else {
            // No credential at all is a hard failure; a refresh cannot help.
            return Err((
                codes::NO_ACCESS_TOKEN,
                "no access token available for verification".to_string(),
            ));
        };

        match self.verifier.verify(purchase, &bearer).await {
            Ok(body) => Ok(body),
            Err(VerifyError::Unauthorized) => {
                self.set_state(&purchase.transaction_id, PurchaseState::TokenRefreshRetry)
                    .await;
                warn!(
                    transaction_id = %purchase.transaction_id,
                    "bearer rejected; requesting session refresh and retrying once"
                );
                self.content.eval(REFRESH_SCRIPT);
                tokio::time::sleep(self.refresh_grace).await;

                let bearer = self.bearer().await.unwrap_or(bearer);
                match self.verifier.verify(purchase, &bearer).await {
                    Ok(body) => Ok(body),
                    Err(VerifyError::Unauthorized) => Err((
                        codes::AUTH_REQUIRED,
                        "authentication required".to_string(),
                    )),
                    Err(VerifyError::Rejected { message, .. }) => {
                        Err((codes::SERVER_VERIFICATION_FAILED, message))
                    }
                    Err(e @ VerifyError::Transport(_)) => {
                        Err((codes::SERVER_VERIFICATION_FAILED, e.to_string()))
                    }
                }
            }
            Err(VerifyError::Rejected { message, .. }) => {
                Err((codes::SERVER_VERIFICATION_FAILED, message))
            }
            Err(e @ VerifyError::Transport(_)) => {
                Err((codes::SERVER_VERIFICATION_FAILED, e.to_string()))
            }
        }
    }

    async fn bearer(&self) -> Option<String> {
        match self.cookies.get(ACCESS_TOKEN_COOKIE).await {
            Ok(value) => value,
            Err(e) => {
                error!(error = %e, "cookie store read failed");
                None
            }
        }
    }

    /// Platform error events. User cancellation is resolved silently; other
    /// codes are passed through to the embedded content.
    fn handle_store_error(&self, code: Option<String>, message: String) {
        if code.as_deref() == Some("E_USER_CANCELLED") {
            info!("purchase cancelled by the user");
            return;
        }
        warn!(?code, message, "purchase store reported an error");
        self.post(&IapMessage::error(
            code.as_deref().unwrap_or(codes::PURCHASE_ERROR),
            message,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AndroidReceipt, Platform, PurchaseStoreError};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;
    use voca_store::MemoryKv;
    use voca_webview::test_support::RecordingSink;

    fn purchase(tid: &str) -> Purchase {
        Purchase {
            product_id: "gems_10".into(),
            quantity: 1,
            transaction_id: tid.into(),
            transaction_date: 1_760_454_682_971,
            platform: Platform::Android,
            ios: None,
            android: Some(AndroidReceipt {
                purchase_token: "tok".into(),
                package_name: "com.example.voca".into(),
                data: None,
                signature: None,
            }),
        }
    }

    /// Purchase store that records calls into a shared event log.
    struct FakeStore {
        log: Arc<StdMutex<Vec<String>>>,
        inits: AtomicUsize,
        fail_request: bool,
        fail_finish: bool,
    }

    impl FakeStore {
        fn new(log: Arc<StdMutex<Vec<String>>>) -> Self {
            Self {
                log,
                inits: AtomicUsize::new(0),
                fail_request: false,
                fail_finish: false,
            }
        }
    }

    #[async_trait]
    impl PurchaseStore for FakeStore {
        async fn init_connection(&self) -> Result<(), PurchaseStoreError> {
            self.inits.fetch_add(1, Ordering::SeqCst);
            self.log.lock().unwrap().push("init".into());
            Ok(())
        }

        async fn request_purchase(&self, sku: &str) -> Result<(), PurchaseStoreError> {
            if self.fail_request {
                return Err(PurchaseStoreError::new(None, "store unavailable"));
            }
            self.log.lock().unwrap().push(format!("request:{sku}"));
            Ok(())
        }

        async fn finish_transaction(
            &self,
            purchase: &Purchase,
            consumable: bool,
        ) -> Result<(), crate::FinalizeError> {
            self.log
                .lock()
                .unwrap()
                .push(format!("finish:{}:{consumable}", purchase.transaction_id));
            if self.fail_finish {
                return Err(crate::FinalizeError("ack rejected".into()));
            }
            Ok(())
        }
    }

    /// Verifier fed a queue of canned outcomes.
    struct SeqVerifier {
        outcomes: StdMutex<VecDeque<Result<Value, VerifyError>>>,
        bearers: StdMutex<Vec<String>>,
        log: Arc<StdMutex<Vec<String>>>,
    }

    impl SeqVerifier {
        fn new(
            outcomes: Vec<Result<Value, VerifyError>>,
            log: Arc<StdMutex<Vec<String>>>,
        ) -> Self {
            Self {
                outcomes: StdMutex::new(outcomes.into()),
                bearers: StdMutex::new(Vec::new()),
                log,
            }
        }

        fn calls(&self) -> usize {
            self.bearers.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ReceiptVerifier for SeqVerifier {
        async fn verify(&self, _purchase: &Purchase, bearer: &str) -> Result<Value, VerifyError> {
            self.bearers.lock().unwrap().push(bearer.to_string());
            self.log.lock().unwrap().push("verify".into());
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(VerifyError::Unauthorized))
        }
    }

    struct Harness {
        flow: Arc<PurchaseFlow>,
        sink: Arc<RecordingSink>,
        store: Arc<FakeStore>,
        verifier: Arc<SeqVerifier>,
        cookies: CookieJar,
        log: Arc<StdMutex<Vec<String>>>,
    }

    async fn harness(outcomes: Vec<Result<Value, VerifyError>>) -> Harness {
        harness_with(outcomes, |s| s).await
    }

    async fn harness_with(
        outcomes: Vec<Result<Value, VerifyError>>,
        tweak: impl FnOnce(FakeStore) -> FakeStore,
    ) -> Harness {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::new(RecordingSink::new());
        let store = Arc::new(tweak(FakeStore::new(log.clone())));
        let verifier = Arc::new(SeqVerifier::new(outcomes, log.clone()));
        let cookies = CookieJar::new(Arc::new(MemoryKv::new()));
        cookies.set(ACCESS_TOKEN_COOKIE, "at-1", 0).await.unwrap();
        let flow = Arc::new(
            PurchaseFlow::new(
                store.clone(),
                verifier.clone(),
                cookies.clone(),
                sink.clone(),
            )
            .with_refresh_grace(Duration::from_millis(10)),
        );
        Harness {
            flow,
            sink,
            store,
            verifier,
            cookies,
            log,
        }
    }

    fn ok_body() -> Result<Value, VerifyError> {
        Ok(serde_json::json!({"gemsAwarded": 10, "userGems": 42}))
    }

    #[tokio::test]
    async fn verified_purchase_finalizes_then_reports_success() {
        let h = harness(vec![ok_body()]).await;
        h.flow.handle_update(purchase("t1")).await;

        assert_eq!(h.sink.posted_types(), vec!["iap_purchase_success"]);
        let msg = &h.sink.posted_json()[0];
        assert_eq!(msg["data"]["productId"], "gems_10");
        assert_eq!(msg["data"]["serverVerified"], true);
        assert_eq!(msg["data"]["gemsAwarded"], 10);
        assert_eq!(msg["data"]["serverResponse"]["userGems"], 42);
        assert_eq!(h.flow.state_of("t1").await, PurchaseState::Completed);
        // Verification strictly precedes the (single) finalize call.
        assert_eq!(
            *h.log.lock().unwrap(),
            vec!["verify".to_string(), "finish:t1:true".to_string()]
        );
    }

    #[tokio::test]
    async fn one_401_triggers_one_refresh_and_one_retry() {
        let h = harness(vec![Err(VerifyError::Unauthorized), ok_body()]).await;

        // Simulate the web session refresh landing during the grace period.
        let cookies = h.cookies.clone();
        let refresh = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(2)).await;
            cookies.set(ACCESS_TOKEN_COOKIE, "at-2", 0).await.unwrap();
        });

        h.flow.handle_update(purchase("t1")).await;
        refresh.await.unwrap();

        assert_eq!(h.sink.evaluated(), vec![REFRESH_SCRIPT.to_string()]);
        assert_eq!(h.verifier.calls(), 2);
        assert_eq!(
            h.verifier.bearers.lock().unwrap().as_slice(),
            ["at-1", "at-2"]
        );
        assert_eq!(h.sink.posted_types(), vec!["iap_purchase_success"]);
    }

    #[tokio::test]
    async fn two_401s_are_terminal_with_single_refresh() {
        let h = harness(vec![
            Err(VerifyError::Unauthorized),
            Err(VerifyError::Unauthorized),
        ])
        .await;
        h.flow.handle_update(purchase("t1")).await;

        assert_eq!(h.sink.evaluated().len(), 1);
        assert_eq!(h.verifier.calls(), 2);
        assert_eq!(h.sink.posted_types(), vec!["iap_purchase_error"]);
        let msg = &h.sink.posted_json()[0];
        assert_eq!(msg["data"]["error"], "AUTH_REQUIRED");
        // No finalize happened.
        assert!(!h.log.lock().unwrap().iter().any(|e| e.starts_with("finish")));
        assert_eq!(h.flow.state_of("t1").await, PurchaseState::VerifyFailed);
    }

    #[tokio::test]
    async fn rejection_reports_server_message_without_retry() {
        let h = harness(vec![Err(VerifyError::Rejected {
            status: 422,
            message: "receipt already used".into(),
        })])
        .await;
        h.flow.handle_update(purchase("t1")).await;

        assert!(h.sink.evaluated().is_empty());
        assert_eq!(h.verifier.calls(), 1);
        let msg = &h.sink.posted_json()[0];
        assert_eq!(msg["data"]["error"], "SERVER_VERIFICATION_FAILED");
        assert_eq!(msg["data"]["message"], "receipt already used");
    }

    #[tokio::test]
    async fn missing_bearer_fails_immediately() {
        let h = harness(vec![ok_body()]).await;
        h.cookies.remove(ACCESS_TOKEN_COOKIE).await.unwrap();
        h.flow.handle_update(purchase("t1")).await;

        assert_eq!(h.verifier.calls(), 0);
        assert!(h.sink.evaluated().is_empty());
        let msg = &h.sink.posted_json()[0];
        assert_eq!(msg["data"]["error"], "NO_ACCESS_TOKEN");
    }

    #[tokio::test]
    async fn finalize_failure_after_verify_is_processing_failed() {
        let h = harness_with(vec![ok_body()], |mut s| {
            s.fail_finish = true;
            s
        })
        .await;
        h.flow.handle_update(purchase("t1")).await;

        let msg = &h.sink.posted_json()[0];
        assert_eq!(msg["data"]["error"], "PURCHASE_PROCESSING_FAILED");
        assert_eq!(h.flow.state_of("t1").await, PurchaseState::FinalizeFailed);
    }

    #[tokio::test]
    async fn duplicate_delivery_of_completed_purchase_is_ignored() {
        let h = harness(vec![ok_body(), ok_body()]).await;
        h.flow.handle_update(purchase("t1")).await;
        h.flow.handle_update(purchase("t1")).await;

        assert_eq!(h.verifier.calls(), 1);
        assert_eq!(h.sink.posted_types(), vec!["iap_purchase_success"]);
    }

    #[tokio::test]
    async fn execute_purchase_initializes_once_and_posts_started() {
        let h = harness(vec![]).await;
        h.flow.execute_purchase("gems_10").await;
        h.flow.execute_purchase("gems_4").await;

        assert_eq!(h.store.inits.load(Ordering::SeqCst), 1);
        assert_eq!(
            h.sink.posted_types(),
            vec!["iap_purchase_started", "iap_purchase_started"]
        );
        let msg = &h.sink.posted_json()[0];
        assert_eq!(msg["data"]["itemId"], "gems_10");
        // Started was posted with no platform event delivered yet.
        assert_eq!(h.verifier.calls(), 0);
    }

    #[tokio::test]
    async fn failed_purchase_request_posts_error_instead_of_started() {
        let h = harness_with(vec![], |mut s| {
            s.fail_request = true;
            s
        })
        .await;
        h.flow.execute_purchase("gems_10").await;

        assert_eq!(h.sink.posted_types(), vec!["iap_purchase_error"]);
        let msg = &h.sink.posted_json()[0];
        assert_eq!(msg["data"]["error"], "PURCHASE_FAILED");
        // The failed request leaves no dangling state behind.
        assert_eq!(h.flow.state_of("gems_10").await, PurchaseState::Idle);
    }

    #[tokio::test]
    async fn request_progress_is_tracked_under_the_sku() {
        let h = harness(vec![ok_body()]).await;
        assert_eq!(h.flow.state_of("gems_10").await, PurchaseState::Idle);

        h.flow.execute_purchase("gems_10").await;
        assert_eq!(
            h.flow.state_of("gems_10").await,
            PurchaseState::AwaitingPlatformResult
        );

        h.flow.handle_update(purchase("t1")).await;
        // The platform result supersedes the SKU-keyed slot.
        assert_eq!(h.flow.state_of("gems_10").await, PurchaseState::Idle);
        assert_eq!(h.flow.state_of("t1").await, PurchaseState::Completed);
    }

    #[tokio::test]
    async fn retry_rejection_carries_bare_server_message() {
        let h = harness(vec![
            Err(VerifyError::Unauthorized),
            Err(VerifyError::Rejected {
                status: 422,
                message: "receipt already used".into(),
            }),
        ])
        .await;
        h.flow.handle_update(purchase("t1")).await;

        let msg = &h.sink.posted_json()[0];
        assert_eq!(msg["data"]["error"], "SERVER_VERIFICATION_FAILED");
        assert_eq!(msg["data"]["message"], "receipt already used");
    }

    #[tokio::test]
    async fn user_cancelled_event_is_silent() {
        let h = harness(vec![]).await;
        h.flow
            .handle_store_error(Some("E_USER_CANCELLED".into()), "cancelled".into());
        assert!(h.sink.posted().is_empty());

        h.flow
            .handle_store_error(Some("E_NETWORK_ERROR".into()), "offline".into());
        let msg = &h.sink.posted_json()[0];
        assert_eq!(msg["data"]["error"], "E_NETWORK_ERROR");
    }

    #[tokio::test]
    async fn event_stream_drives_the_flow() {
        let h = harness(vec![ok_body()]).await;
        let (tx, rx) = mpsc::channel(8);
        let runner = tokio::spawn(h.flow.clone().run(rx));

        tx.send(PurchaseEvent::Updated(purchase("t9"))).await.unwrap();
        drop(tx);
        runner.await.unwrap();

        assert_eq!(h.sink.posted_types(), vec!["iap_purchase_success"]);
        assert_eq!(h.flow.state_of("t9").await, PurchaseState::Completed);
    }
}
