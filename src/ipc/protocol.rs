//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian
//! length. Wire names are kebab-case: `register-hotkey`, `hotkey-mode`, ...

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::events::{FallbackMode, RegistryEvent};
use crate::surface::SurfaceRole;

/// Requests from a connected surface to the daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Request {
    /// Bind this connection to a surface slot; must be the first message
    Attach { role: SurfaceRole },

    /// Translate and register one binding
    RegisterHotkey { accelerator: String, action: String },

    /// Translate and release one binding
    UnregisterHotkey { accelerator: String },

    /// Bulk replace: every current binding is dropped, then each entry of
    /// `bindings` (action -> user-facing hotkey string) is registered.
    /// BTreeMap keeps bulk registration order deterministic.
    RegisterAllHotkeys { bindings: BTreeMap<String, String> },

    /// Opaque command for the graphics overlay, relayed unmodified
    GraphicCommand { command: Value },

    /// Connectivity check
    Ping,

    /// Request a status snapshot
    GetStatus,
}

/// Notices from the daemon to a connected surface
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Notice {
    /// A bound accelerator was pressed (control surface only)
    GlobalHotkeyTriggered { action: String },

    /// OS registration failed; the control surface must bind the key locally
    HotkeyMode {
        mode: FallbackMode,
        accelerator: String,
        action: String,
    },

    /// Relayed overlay command (graphics surface only)
    GraphicCommand { command: Value },

    /// Attach acknowledged
    Attached { role: SurfaceRole },

    /// Pong response to ping
    Pong,

    /// Status snapshot
    Status(DaemonStatus),
}

/// Daemon status snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonStatus {
    /// Daemon version
    pub version: String,

    /// Number of recorded bindings (global and fallback)
    pub bindings: usize,

    /// Bindings with an active OS-level registration
    pub global: usize,

    /// Uptime in seconds
    pub uptime_secs: u64,
}

/// Convert a registry event into its wire notice
impl From<RegistryEvent> for Notice {
    fn from(event: RegistryEvent) -> Self {
        match event {
            RegistryEvent::Triggered { action } => Notice::GlobalHotkeyTriggered { action },
            RegistryEvent::FallbackRequested {
                mode,
                accelerator,
                action,
            } => Notice::HotkeyMode {
                mode,
                accelerator,
                action,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_names() {
        let json = r#"{"type":"register-hotkey","accelerator":"Ctrl + Shift + K","action":"toggle-overlay"}"#;
        let request: Request = serde_json::from_str(json).unwrap();
        assert!(matches!(
            request,
            Request::RegisterHotkey { ref action, .. } if action == "toggle-overlay"
        ));

        let json = r#"{"type":"register-all-hotkeys","bindings":{"play":"","stop":"Ctrl + S"}}"#;
        let request: Request = serde_json::from_str(json).unwrap();
        match request {
            Request::RegisterAllHotkeys { bindings } => {
                assert_eq!(bindings.len(), 2);
                assert_eq!(bindings["stop"], "Ctrl + S");
            }
            other => panic!("unexpected request: {other:?}"),
        }
    }

    #[test]
    fn test_graphic_command_payload_is_opaque() {
        let json = r#"{"type":"graphic-command","command":{"anything":[1,2,{"x":null}]}}"#;
        let request: Request = serde_json::from_str(json).unwrap();
        let Request::GraphicCommand { command } = request else {
            panic!("wrong variant");
        };
        // Round-trips untouched.
        assert_eq!(
            serde_json::to_string(&command).unwrap(),
            r#"{"anything":[1,2,{"x":null}]}"#
        );
    }

    #[test]
    fn test_hotkey_mode_notice_serialization() {
        let notice = Notice::HotkeyMode {
            mode: FallbackMode::InWindow,
            accelerator: "CmdOrCtrl+K".to_string(),
            action: "toggle-overlay".to_string(),
        };
        let json = serde_json::to_string(&notice).unwrap();
        assert!(json.contains("hotkey-mode"));
        assert!(json.contains("in-window"));
    }

    #[test]
    fn test_triggered_notice_from_registry_event() {
        let notice: Notice = RegistryEvent::Triggered {
            action: "start-capture".to_string(),
        }
        .into();
        let json = serde_json::to_string(&notice).unwrap();
        assert!(json.contains("global-hotkey-triggered"));
        assert!(json.contains("start-capture"));
    }

    #[test]
    fn test_attach_roles() {
        let request: Request = serde_json::from_str(r#"{"type":"attach","role":"graphics"}"#).unwrap();
        assert!(matches!(
            request,
            Request::Attach {
                role: SurfaceRole::Graphics
            }
        ));
    }
}
