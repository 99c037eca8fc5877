//! The native bridge: parse inbound messages from the embedded web content,
//! route them to capability adapters, and marshal replies back.
//!
//! All dependencies come in through an explicit [`BridgeContext`]; there is
//! no ambient global state. A single [`BridgeRouter::handle_raw`] call fully
//! handles one inbound message and never lets a failure escape: malformed
//! input is logged and dropped, adapter failures turn into outbound error
//! messages or native alerts.

mod context;
mod message;
mod router;
mod shell;

pub use context::BridgeContext;
pub use message::{
    ConfirmButton, CookieProps, IapProps, Inbound, Outbound, ToastProps, VibrateProps,
};
pub use router::BridgeRouter;
pub use shell::{HapticStyle, Haptics, ShellUi};
