//! Events emitted by the hotkey registry
//!
//! These are the registry's only outward-facing signals: a bound accelerator
//! fired, or an OS-level registration was refused and the control surface
//! must handle the binding locally.

use serde::{Deserialize, Serialize};

/// How a binding is delivered when OS-level registration is unavailable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FallbackMode {
    /// The control surface must listen for the key itself while focused
    #[serde(rename = "in-window")]
    InWindow,
}

/// Events emitted by the hotkey registry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RegistryEvent {
    /// The OS reported a press of a bound accelerator
    Triggered {
        /// Action name the accelerator is bound to
        action: String,
    },

    /// OS registration failed; the binding is recorded but will not fire globally
    FallbackRequested {
        /// Always `in-window` today
        mode: FallbackMode,
        /// Canonical accelerator that could not be registered
        accelerator: String,
        /// Action name the accelerator is bound to
        action: String,
    },
}

impl std::fmt::Display for RegistryEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryEvent::Triggered { action } => write!(f, "TRIGGERED ({})", action),
            RegistryEvent::FallbackRequested {
                accelerator,
                action,
                ..
            } => write!(f, "FALLBACK_REQUESTED ({} -> {})", accelerator, action),
        }
    }
}
