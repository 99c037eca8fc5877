//! Inbound message dispatch.
//!
//! One [`BridgeRouter::handle_raw`] call handles one message end to end.
//! Nothing here returns an error to the caller: malformed input is logged
//! and dropped, adapter failures become outbound error messages or native
//! alerts.

use serde_json::Value;
use tracing::{debug, error, info, warn};

use voca_auth::{GoogleIdentity, SignInError};
use voca_iap::{codes, IapMessage};

use crate::context::BridgeContext;
use crate::message::{ConfirmButton, Inbound, Outbound, VibrateProps};
use crate::shell::HapticStyle;

/// Fallback vibration length when the page sends none.
const DEFAULT_VIBRATE_MS: u64 = 400;
/// Durations at or below this read as a haptic tap, not a vibration.
const HAPTIC_DURATION_MAX_MS: u64 = 100;

pub struct BridgeRouter {
    ctx: BridgeContext,
}

impl BridgeRouter {
    pub fn new(ctx: BridgeContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &BridgeContext {
        &self.ctx
    }

    fn post(&self, message: &Outbound) {
        match serde_json::to_string(message) {
            Ok(payload) => self.ctx.content.post(&payload),
            Err(e) => error!(error = %e, "failed to serialize outbound message"),
        }
    }

    fn post_iap(&self, message: &IapMessage) {
        match serde_json::to_string(message) {
            Ok(payload) => self.ctx.content.post(&payload),
            Err(e) => error!(error = %e, "failed to serialize iap message"),
        }
    }

    /// Handle one raw payload from the embedded content.
    pub async fn handle_raw(&self, raw: &str) {
        let value: Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "dropping malformed bridge message");
                return;
            }
        };
        let tag = value
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let inbound: Inbound = match serde_json::from_value(value) {
            Ok(m) => m,
            Err(e) => {
                warn!(%tag, error = %e, "dropping undecodable bridge message");
                return;
            }
        };
        self.dispatch(&tag, inbound).await;
    }

    async fn dispatch(&self, tag: &str, inbound: Inbound) {
        match inbound {
            Inbound::LaunchGoogleAuth => self.google_sign_in().await,
            Inbound::LaunchAppleAuth => self.apple_sign_in().await,
            Inbound::LaunchGoogleLogout => self.google_logout().await,
            Inbound::RefreshAccessToken => self.refresh_access_token().await,
            Inbound::RequestGooglePermissions => self.request_google_permissions().await,
            Inbound::IapPurchase { props } => match props.item_id.filter(|id| !id.is_empty()) {
                Some(item_id) => self.ctx.purchases.execute_purchase(&item_id).await,
                None => {
                    warn!("iapPurchase without itemId");
                    self.post_iap(&IapMessage::error(
                        codes::PURCHASE_FAILED,
                        "missing itemId",
                    ));
                }
            },
            Inbound::SetCookie { props } => {
                let (Some(name), Some(value)) = (props.name, props.value) else {
                    warn!("setCookie missing name or value; ignoring");
                    return;
                };
                let expires = props.expires.unwrap_or(0);
                if let Err(e) = self.ctx.cookies.set(&name, &value, expires).await {
                    error!(%name, error = %e, "failed to store cookie");
                }
            }
            Inbound::Log { message } => {
                info!(message = %message.unwrap_or_default(), "page log");
            }
            Inbound::Alert { message } => {
                self.ctx.ui.alert(&message.unwrap_or_default()).await;
            }
            Inbound::Confirm { message, btns } => self.confirm(message, btns).await,
            Inbound::ShowToast { props } => {
                self.ctx.ui.toast(&props.message.unwrap_or_default());
            }
            Inbound::CloseApp => (self.ctx.exit)(),
            Inbound::OpenCamera => self.ctx.screen.set_ocr_active(true),
            Inbound::FilteredWords { props } => self.ctx.capture.deliver_filtered(props).await,
            Inbound::Vibrate { props } => self.vibrate(props),
            Inbound::Unknown => debug!(%tag, "ignoring unknown bridge message type"),
        }
    }

    async fn google_sign_in(&self) {
        match self.ctx.google.sign_in().await {
            Ok(identity) => self.complete_google_sign_in(identity).await,
            Err(SignInError::Cancelled) => info!("google sign-in cancelled"),
            Err(e) => {
                error!(error = %e, "google sign-in failed");
                self.ctx.ui.alert(&e.to_string()).await;
            }
        }
    }

    /// Persist the identity, then hand it to the web application. The
    /// session record is patched, not replaced, so fields owned by other
    /// flows (the push token above all) survive a re-login.
    async fn complete_google_sign_in(&self, identity: GoogleIdentity) {
        let mut record = self.ctx.session.load().await.unwrap_or_default();
        record.google_id = Some(identity.google_id.clone());
        record.email = Some(identity.email.clone());
        record.name = Some(identity.name.clone());
        record.access_token = Some(identity.id_token.clone());
        record.refresh_token = Some(identity.server_auth_code.clone());
        if let Err(e) = self.ctx.session.save(&record).await {
            error!(error = %e, "failed to persist session record");
        }
        self.post(&Outbound::GoogleOauthCallback {
            google_id: identity.google_id,
            email: identity.email,
            name: identity.name,
            access_token: identity.id_token,
            refresh_token: identity.server_auth_code,
            login_type: "app",
            status: 200,
        });
    }

    async fn apple_sign_in(&self) {
        match self.ctx.apple.sign_in().await {
            Ok(identity) => {
                let mut record = self.ctx.session.load().await.unwrap_or_default();
                // Apple omits these after the first authorization.
                if identity.email.is_some() {
                    record.email = identity.email.clone();
                }
                if identity.full_name.is_some() {
                    record.name = identity.full_name.clone();
                }
                if let Err(e) = self.ctx.session.save(&record).await {
                    error!(error = %e, "failed to persist session record");
                }
                self.post(&Outbound::AppleOauthCallback {
                    identity_token: identity.identity_token,
                    email: identity.email,
                    full_name: identity.full_name,
                    user: identity.user,
                    status: 200,
                });
            }
            Err(SignInError::Cancelled) => info!("apple sign-in cancelled"),
            Err(e) => {
                error!(error = %e, "apple sign-in failed");
                self.ctx.ui.alert(&e.to_string()).await;
            }
        }
    }

    async fn google_logout(&self) {
        if let Err(e) = self.ctx.google.sign_out().await {
            // The local session is cleared regardless.
            warn!(error = %e, "google sign-out failed");
        }
        if let Err(e) = self.ctx.session.clear().await {
            error!(error = %e, "failed to clear session record");
        }
    }

    async fn refresh_access_token(&self) {
        match self.ctx.google.refresh_access_token().await {
            Ok(token) => {
                if let Err(e) = self.ctx.session.set_access_token(&token).await {
                    error!(error = %e, "failed to persist refreshed access token");
                }
                self.post(&Outbound::AccessTokenReturn { data: token });
            }
            Err(SignInError::Cancelled) => info!("access token refresh cancelled"),
            Err(e) => {
                error!(error = %e, "access token refresh failed");
                self.ctx.ui.alert(&e.to_string()).await;
            }
        }
    }

    async fn request_google_permissions(&self) {
        match self.ctx.google.request_permissions().await {
            Ok(identity) => {
                let mut record = self.ctx.session.load().await.unwrap_or_default();
                record.access_token = Some(identity.id_token);
                record.refresh_token = Some(identity.server_auth_code);
                if let Err(e) = self.ctx.session.save(&record).await {
                    error!(error = %e, "failed to persist session record");
                }
                self.post(&Outbound::ReturnGooglePermissions { success: true });
            }
            Err(e) => {
                warn!(error = %e, "google permissions request failed");
                self.post(&Outbound::ReturnGooglePermissions { success: false });
            }
        }
    }

    /// Native confirmation dialog. The reply is posted exactly once,
    /// whichever button the user picks.
    async fn confirm(&self, message: Option<String>, btns: Vec<ConfirmButton>) {
        let cancel_label = btns
            .first()
            .and_then(|b| b.text.clone())
            .unwrap_or_else(|| "Cancel".to_string());
        let confirm_label = btns
            .get(1)
            .and_then(|b| b.text.clone())
            .unwrap_or_else(|| "OK".to_string());
        let result = self
            .ctx
            .ui
            .confirm(&message.unwrap_or_default(), &cancel_label, &confirm_label)
            .await;
        self.post(&Outbound::ConfirmReturn {
            success: true,
            result,
        });
    }

    fn vibrate(&self, props: VibrateProps) {
        if props.cancel.unwrap_or(false) {
            self.ctx.haptics.cancel();
            return;
        }
        if let Some(style) = props.style.as_deref().and_then(HapticStyle::from_hint) {
            self.ctx.haptics.impact(style);
            return;
        }
        match props.duration {
            Some(d) if d <= HAPTIC_DURATION_MAX_MS => self.ctx.haptics.impact(HapticStyle::Light),
            Some(d) => self.ctx.haptics.vibrate_ms(d),
            None => self.ctx.haptics.vibrate_ms(DEFAULT_VIBRATE_MS),
        }
    }
}
