//! Global hotkey subsystem
//!
//! Translation of user-facing hotkey strings, OS-level registration through
//! the `global-hotkey` crate, and the process-wide binding registry.

pub mod accel;
mod backend;
mod registry;

pub use backend::{
    spawn_trigger_listener, AcceleratorBackend, BackendError, GlobalHotkeyBackend,
    UnavailableBackend,
};
pub use registry::{Binding, BindingMode, HotkeyRegistry};

#[cfg(test)]
pub(crate) use backend::testing;
