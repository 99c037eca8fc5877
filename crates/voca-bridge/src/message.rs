//! Bridge message envelopes.
//!
//! Inbound messages are an internally tagged union over the wire `type`
//! field, validated at the parse boundary. Unknown tags land in
//! [`Inbound::Unknown`] so new web-side message types never break dispatch.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use voca_ocr::FilteredWord;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IapProps {
    #[serde(rename = "itemId")]
    pub item_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CookieProps {
    pub name: Option<String>,
    pub value: Option<String>,
    #[serde(default, deserialize_with = "lenient_epoch_ms")]
    pub expires: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToastProps {
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfirmButton {
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VibrateProps {
    /// Raw vibration duration in milliseconds.
    pub duration: Option<u64>,
    /// Stop an ongoing vibration instead of starting one.
    pub cancel: Option<bool>,
    /// Haptic style hint; overrides `duration` when recognized.
    #[serde(rename = "type")]
    pub style: Option<String>,
}

/// Everything the embedded content can send us.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum Inbound {
    #[serde(rename = "launchGoogleAuth")]
    LaunchGoogleAuth,
    #[serde(rename = "launchAppleAuth")]
    LaunchAppleAuth,
    #[serde(rename = "launchGoogleLogout")]
    LaunchGoogleLogout,
    #[serde(rename = "refreshAccessToken")]
    RefreshAccessToken,
    #[serde(rename = "requestGooglePermissions")]
    RequestGooglePermissions,
    #[serde(rename = "iapPurchase")]
    IapPurchase {
        #[serde(default)]
        props: IapProps,
    },
    #[serde(rename = "setCookie")]
    SetCookie {
        #[serde(default)]
        props: CookieProps,
    },
    #[serde(rename = "log")]
    Log {
        #[serde(default)]
        message: Option<String>,
    },
    #[serde(rename = "alert")]
    Alert {
        #[serde(default)]
        message: Option<String>,
    },
    #[serde(rename = "confirm")]
    Confirm {
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        btns: Vec<ConfirmButton>,
    },
    #[serde(rename = "showToast")]
    ShowToast {
        #[serde(default)]
        props: ToastProps,
    },
    #[serde(rename = "closeApp")]
    CloseApp,
    #[serde(rename = "openCamera")]
    OpenCamera,
    #[serde(rename = "filteredWords")]
    FilteredWords {
        #[serde(default)]
        props: Vec<FilteredWord>,
    },
    #[serde(rename = "vibrate")]
    Vibrate {
        #[serde(default)]
        props: VibrateProps,
    },
    /// Any tag we do not recognize. Logged, never escalated.
    #[serde(other)]
    Unknown,
}

/// Router-owned replies to the embedded content. Purchase and OCR messages
/// are marshaled by their own crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Outbound {
    #[serde(rename = "google_oauth_app_callback")]
    GoogleOauthCallback {
        #[serde(rename = "googleId")]
        google_id: String,
        email: String,
        name: String,
        #[serde(rename = "accessToken")]
        access_token: String,
        #[serde(rename = "refreshToken")]
        refresh_token: String,
        #[serde(rename = "loginType")]
        login_type: &'static str,
        status: u16,
    },
    #[serde(rename = "apple_oauth_app_callback")]
    AppleOauthCallback {
        #[serde(rename = "identityToken")]
        identity_token: String,
        email: Option<String>,
        #[serde(rename = "fullName")]
        full_name: Option<String>,
        user: String,
        status: u16,
    },
    #[serde(rename = "confirm_return")]
    ConfirmReturn { success: bool, result: bool },
    #[serde(rename = "access_token_return")]
    AccessTokenReturn { data: String },
    #[serde(rename = "return_google_permissions")]
    ReturnGooglePermissions { success: bool },
}

/// Accept an epoch-milliseconds expiry as a JSON number or numeric string;
/// anything else reads as absent.
fn lenient_epoch_ms<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.parse::<i64>().ok(),
        _ => None,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn tagged_parse_of_known_types() {
        let msg: Inbound = serde_json::from_str(r#"{"type":"launchGoogleAuth"}"#).unwrap();
        assert!(matches!(msg, Inbound::LaunchGoogleAuth));

        let msg: Inbound =
            serde_json::from_str(r#"{"type":"iapPurchase","props":{"itemId":"gems_10"}}"#)
                .unwrap();
        match msg {
            Inbound::IapPurchase { props } => assert_eq!(props.item_id.as_deref(), Some("gems_10")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn unknown_tag_maps_to_unknown() {
        let msg: Inbound =
            serde_json::from_str(r#"{"type":"somethingNew","props":{"a":1}}"#).unwrap();
        assert!(matches!(msg, Inbound::Unknown));
    }

    #[test]
    fn missing_props_default() {
        let msg: Inbound = serde_json::from_str(r#"{"type":"iapPurchase"}"#).unwrap();
        match msg {
            Inbound::IapPurchase { props } => assert!(props.item_id.is_none()),
            other => panic!("unexpected: {other:?}"),
        }

        let msg: Inbound = serde_json::from_str(r#"{"type":"vibrate"}"#).unwrap();
        match msg {
            Inbound::Vibrate { props } => {
                assert!(props.duration.is_none() && props.cancel.is_none());
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn cookie_expiry_accepts_number_or_numeric_string() {
        let number: Inbound = serde_json::from_str(
            r#"{"type":"setCookie","props":{"name":"a","value":"b","expires":1760454682971}}"#,
        )
        .unwrap();
        let string: Inbound = serde_json::from_str(
            r#"{"type":"setCookie","props":{"name":"a","value":"b","expires":"1760454682971"}}"#,
        )
        .unwrap();
        for msg in [number, string] {
            match msg {
                Inbound::SetCookie { props } => assert_eq!(props.expires, Some(1_760_454_682_971)),
                other => panic!("unexpected: {other:?}"),
            }
        }

        let junk: Inbound = serde_json::from_str(
            r#"{"type":"setCookie","props":{"name":"a","value":"b","expires":"soon"}}"#,
        )
        .unwrap();
        match junk {
            Inbound::SetCookie { props } => assert_eq!(props.expires, None),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn outbound_wire_shapes() {
        let json = serde_json::to_value(Outbound::ConfirmReturn {
            success: true,
            result: false,
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type":"confirm_return","success":true,"result":false})
        );

        let json = serde_json::to_value(Outbound::GoogleOauthCallback {
            google_id: "g-1".into(),
            email: "u@example.com".into(),
            name: "U".into(),
            access_token: "at".into(),
            refresh_token: "rt".into(),
            login_type: "app",
            status: 200,
        })
        .unwrap();
        assert_eq!(json["type"], "google_oauth_app_callback");
        assert_eq!(json["googleId"], "g-1");
        assert_eq!(json["loginType"], "app");
        assert_eq!(json["status"], 200);
    }
}
