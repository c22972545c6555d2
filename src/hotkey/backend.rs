//! OS accelerator backend
//!
//! Thin seam between the registry's bookkeeping and the `global-hotkey`
//! crate: parse canonical accelerator strings, hold the OS registrations,
//! and map trigger ids back to accelerators. The trait exists so registry
//! behavior can be tested without touching the real OS shortcut tables.

use std::collections::HashMap;

use global_hotkey::{hotkey::HotKey, GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Errors from the OS registration layer
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("unparseable accelerator {0:?}: {1}")]
    Parse(String, String),

    #[error("OS refused accelerator {0:?}")]
    Os(String, #[source] global_hotkey::Error),

    #[error("failed to initialize global hotkey manager")]
    Init(#[source] global_hotkey::Error),

    #[error("global hotkey backend unavailable")]
    Unavailable,

    #[error("failed to spawn trigger listener thread: {0}")]
    ThreadSpawn(String),
}

/// OS-level accelerator registration operations
pub trait AcceleratorBackend {
    /// Register a canonical accelerator string system-wide.
    fn register(&mut self, accelerator: &str) -> Result<(), BackendError>;

    /// Release a previously registered accelerator. No-op if unknown.
    fn unregister(&mut self, accelerator: &str) -> Result<(), BackendError>;

    /// Resolve an OS trigger id back to the accelerator it belongs to.
    fn accelerator_for(&self, trigger_id: u32) -> Option<String>;
}

/// Backend backed by the `global-hotkey` crate
pub struct GlobalHotkeyBackend {
    manager: GlobalHotKeyManager,
    by_accelerator: HashMap<String, HotKey>,
    by_id: HashMap<u32, String>,
}

impl GlobalHotkeyBackend {
    pub fn new() -> Result<Self, BackendError> {
        let manager = GlobalHotKeyManager::new().map_err(BackendError::Init)?;
        Ok(Self {
            manager,
            by_accelerator: HashMap::new(),
            by_id: HashMap::new(),
        })
    }
}

impl AcceleratorBackend for GlobalHotkeyBackend {
    fn register(&mut self, accelerator: &str) -> Result<(), BackendError> {
        let hotkey: HotKey = accelerator
            .parse()
            .map_err(|e: global_hotkey::hotkey::HotKeyParseError| {
                BackendError::Parse(accelerator.to_string(), e.to_string())
            })?;

        self.manager
            .register(hotkey)
            .map_err(|e| BackendError::Os(accelerator.to_string(), e))?;

        self.by_accelerator.insert(accelerator.to_string(), hotkey);
        self.by_id.insert(hotkey.id(), accelerator.to_string());
        info!(%accelerator, id = hotkey.id(), "OS registration active");
        Ok(())
    }

    fn unregister(&mut self, accelerator: &str) -> Result<(), BackendError> {
        let Some(hotkey) = self.by_accelerator.remove(accelerator) else {
            debug!(%accelerator, "not registered with OS, nothing to release");
            return Ok(());
        };
        // Drop the id mapping first so a failed OS call cannot leave a
        // trigger routed to an accelerator we consider released.
        self.by_id.remove(&hotkey.id());

        self.manager
            .unregister(hotkey)
            .map_err(|e| BackendError::Os(accelerator.to_string(), e))?;

        info!(%accelerator, "OS registration released");
        Ok(())
    }

    fn accelerator_for(&self, trigger_id: u32) -> Option<String> {
        self.by_id.get(&trigger_id).cloned()
    }
}

/// Backend used when the OS shortcut subsystem cannot be initialized at all
/// (headless session, missing display server). Every registration fails, so
/// every binding takes the in-window fallback path and the daemon stays up.
pub struct UnavailableBackend;

impl AcceleratorBackend for UnavailableBackend {
    fn register(&mut self, _accelerator: &str) -> Result<(), BackendError> {
        Err(BackendError::Unavailable)
    }

    fn unregister(&mut self, _accelerator: &str) -> Result<(), BackendError> {
        Ok(())
    }

    fn accelerator_for(&self, _trigger_id: u32) -> Option<String> {
        None
    }
}

/// Start the dedicated thread that drains OS trigger events.
///
/// `global-hotkey` delivers events on a process-wide channel; this thread
/// forwards press events (releases are ignored) into the coordinator's
/// trigger channel and exits when that channel closes.
pub fn spawn_trigger_listener(trigger_tx: mpsc::Sender<u32>) -> Result<(), BackendError> {
    std::thread::Builder::new()
        .name("hotkey-triggers".to_string())
        .spawn(move || {
            info!("trigger listener thread started");
            let receiver = GlobalHotKeyEvent::receiver();

            while let Ok(event) = receiver.recv() {
                if event.state != HotKeyState::Pressed {
                    continue;
                }
                debug!(id = event.id, "global hotkey pressed");
                if trigger_tx.blocking_send(event.id).is_err() {
                    warn!("trigger channel closed, listener exiting");
                    break;
                }
            }

            info!("trigger listener thread stopped");
        })
        .map_err(|e| BackendError::ThreadSpawn(e.to_string()))?;

    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording fake backend shared by registry and coordinator tests.

    use std::collections::{HashMap, HashSet};
    use std::sync::{Arc, Mutex};

    use super::{AcceleratorBackend, BackendError};

    #[derive(Default)]
    pub struct FakeState {
        /// Accelerators currently held at the "OS" level
        pub active: Vec<String>,
        /// Every unregister call seen, in order
        pub released: Vec<String>,
        /// Accelerators the fake OS refuses to register
        pub refuse: HashSet<String>,
        /// Trigger id -> accelerator wiring for `accelerator_for`
        pub triggers: HashMap<u32, String>,
    }

    pub struct FakeBackend {
        state: Arc<Mutex<FakeState>>,
    }

    impl FakeBackend {
        pub fn new() -> (Self, Arc<Mutex<FakeState>>) {
            let state = Arc::new(Mutex::new(FakeState::default()));
            (
                Self {
                    state: Arc::clone(&state),
                },
                state,
            )
        }
    }

    impl AcceleratorBackend for FakeBackend {
        fn register(&mut self, accelerator: &str) -> Result<(), BackendError> {
            let mut state = self.state.lock().unwrap();
            if state.refuse.contains(accelerator) {
                return Err(BackendError::Unavailable);
            }
            state.active.push(accelerator.to_string());
            Ok(())
        }

        fn unregister(&mut self, accelerator: &str) -> Result<(), BackendError> {
            let mut state = self.state.lock().unwrap();
            state.released.push(accelerator.to_string());
            state.active.retain(|a| a != accelerator);
            Ok(())
        }

        fn accelerator_for(&self, trigger_id: u32) -> Option<String> {
            self.state.lock().unwrap().triggers.get(&trigger_id).cloned()
        }
    }
}
