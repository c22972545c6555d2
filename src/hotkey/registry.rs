//! Hotkey registry
//!
//! Process-wide bookkeeping of accelerator -> action bindings, layered over
//! an [`AcceleratorBackend`]. Every operation here is infallible by contract:
//! OS refusals and unexpected backend errors alike collapse into a logged
//! in-window fallback, never into an error returned to the caller.

use std::collections::{BTreeMap, HashMap};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::events::{FallbackMode, RegistryEvent};

use super::accel;
use super::backend::AcceleratorBackend;

/// Delivery path of a recorded binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingMode {
    /// The OS holds an active global registration for this accelerator
    Global,
    /// OS registration failed; the control surface handles the key in-window
    InWindow,
}

/// A recorded accelerator -> action binding
#[derive(Debug, Clone)]
pub struct Binding {
    /// Opaque action name, meaningful only to the control surface
    pub action: String,
    /// Which delivery path succeeded at registration time
    pub mode: BindingMode,
}

/// Owns the binding table and the OS backend.
///
/// Single-owner by design: all mutations happen on the coordinator task, so
/// the map needs no locking. Fallback and trigger notifications leave through
/// the event channel handed in at construction.
pub struct HotkeyRegistry {
    backend: Box<dyn AcceleratorBackend + Send>,
    bindings: HashMap<String, Binding>,
    event_tx: mpsc::UnboundedSender<RegistryEvent>,
}

impl HotkeyRegistry {
    pub fn new(
        backend: Box<dyn AcceleratorBackend + Send>,
        event_tx: mpsc::UnboundedSender<RegistryEvent>,
    ) -> Self {
        Self {
            backend,
            bindings: HashMap::new(),
            event_tx,
        }
    }

    /// Bind a canonical accelerator to an action.
    ///
    /// An existing binding for the same accelerator is released first, so the
    /// OS never holds two registrations for one combination. On OS refusal
    /// (or any backend error) the binding is still recorded, flagged as
    /// in-window, and a fallback event is emitted.
    pub fn register(&mut self, accelerator: &str, action: &str) {
        if self.bindings.contains_key(accelerator) {
            self.unregister(accelerator);
        }

        match self.backend.register(accelerator) {
            Ok(()) => {
                info!(%accelerator, %action, "hotkey registered globally");
                self.bindings.insert(
                    accelerator.to_string(),
                    Binding {
                        action: action.to_string(),
                        mode: BindingMode::Global,
                    },
                );
            }
            Err(e) => {
                warn!(
                    %accelerator,
                    %action,
                    error = %e,
                    "global registration failed, binding falls back to in-window handling"
                );
                self.bindings.insert(
                    accelerator.to_string(),
                    Binding {
                        action: action.to_string(),
                        mode: BindingMode::InWindow,
                    },
                );
                let _ = self.event_tx.send(RegistryEvent::FallbackRequested {
                    mode: FallbackMode::InWindow,
                    accelerator: accelerator.to_string(),
                    action: action.to_string(),
                });
            }
        }
    }

    /// Release a binding. No-op when the accelerator is not bound.
    ///
    /// Only bindings that actually hold an OS registration are released at
    /// the OS level; in-window fallbacks never produced one, so releasing
    /// them must not reach the backend.
    pub fn unregister(&mut self, accelerator: &str) {
        let Some(binding) = self.bindings.remove(accelerator) else {
            debug!(%accelerator, "not bound, nothing to unregister");
            return;
        };

        if binding.mode == BindingMode::Global {
            if let Err(e) = self.backend.unregister(accelerator) {
                warn!(%accelerator, error = %e, "failed to release OS registration");
                // Bookkeeping entry is already gone; nothing else to unwind.
            }
        }

        info!(%accelerator, action = %binding.action, "hotkey unregistered");
    }

    /// Bulk replace: clear everything, then register each `(action, hotkey)`
    /// pair after translating the user-facing hotkey string.
    ///
    /// Blank hotkey strings mean "no binding for this action" and are skipped
    /// without error; untranslatable strings are logged as conversion
    /// failures and skipped.
    pub fn register_all(&mut self, bindings: &BTreeMap<String, String>) {
        self.unregister_all();

        for (action, hotkey) in bindings {
            if hotkey.trim().is_empty() {
                debug!(%action, "no hotkey assigned, skipping");
                continue;
            }
            match accel::translate(hotkey) {
                Some(accelerator) => self.register(&accelerator, action),
                None => warn!(%action, %hotkey, "hotkey conversion failed, skipping"),
            }
        }

        info!(count = self.bindings.len(), "bulk registration complete");
    }

    /// Release every binding and clear bookkeeping. Idempotent; called on
    /// shutdown and at the start of every bulk replace.
    pub fn unregister_all(&mut self) {
        let accelerators: Vec<String> = self.bindings.keys().cloned().collect();
        for accelerator in accelerators {
            self.unregister(&accelerator);
        }
    }

    /// One-shot post-startup pass: snapshot the current bindings, release
    /// them, and push each back through the normal `register` path.
    ///
    /// Some OS shortcut subsystems ignore registrations made before the host
    /// session is fully ready; this second pass picks those up. Stored
    /// accelerators are re-translated on the way through, which is safe
    /// because translation is idempotent.
    pub fn reregister_all(&mut self) {
        if self.bindings.is_empty() {
            debug!("no bindings to re-register");
            return;
        }

        let snapshot: Vec<(String, String)> = self
            .bindings
            .iter()
            .map(|(accelerator, binding)| (accelerator.clone(), binding.action.clone()))
            .collect();

        info!(count = snapshot.len(), "re-registering bindings after startup settle");
        self.unregister_all();

        for (accelerator, action) in snapshot {
            match accel::translate(&accelerator) {
                Some(canonical) => self.register(&canonical, &action),
                None => warn!(%accelerator, %action, "re-translation failed, binding dropped"),
            }
        }
    }

    /// Route an OS trigger id to its action and emit a triggered event.
    pub fn handle_trigger(&self, trigger_id: u32) {
        let Some(accelerator) = self.backend.accelerator_for(trigger_id) else {
            debug!(trigger_id, "trigger for unknown id ignored");
            return;
        };
        let Some(binding) = self.bindings.get(&accelerator) else {
            warn!(%accelerator, "trigger for accelerator with no binding");
            return;
        };

        debug!(%accelerator, action = %binding.action, "delivering trigger");
        let _ = self.event_tx.send(RegistryEvent::Triggered {
            action: binding.action.clone(),
        });
    }

    /// Current binding for an accelerator, if any.
    pub fn binding(&self, accelerator: &str) -> Option<&Binding> {
        self.bindings.get(accelerator)
    }

    /// Number of recorded bindings (global and fallback).
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Number of bindings with an active OS registration.
    pub fn global_count(&self) -> usize {
        self.bindings
            .values()
            .filter(|b| b.mode == BindingMode::Global)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotkey::backend::testing::FakeBackend;

    use std::sync::{Arc, Mutex};

    fn create_registry() -> (
        HotkeyRegistry,
        Arc<Mutex<crate::hotkey::backend::testing::FakeState>>,
        mpsc::UnboundedReceiver<RegistryEvent>,
    ) {
        let (backend, state) = FakeBackend::new();
        let (tx, rx) = mpsc::unbounded_channel();
        (HotkeyRegistry::new(Box::new(backend), tx), state, rx)
    }

    #[test]
    fn test_register_replaces_existing_binding() {
        let (mut registry, state, _rx) = create_registry();

        registry.register("CmdOrCtrl+A", "foo");
        registry.register("CmdOrCtrl+A", "bar");

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.binding("CmdOrCtrl+A").unwrap().action, "bar");

        // Exactly one live OS registration, and the first one was released.
        let state = state.lock().unwrap();
        assert_eq!(state.active, vec!["CmdOrCtrl+A"]);
        assert_eq!(state.released, vec!["CmdOrCtrl+A"]);
    }

    #[test]
    fn test_register_all_empty_clears_registry() {
        let (mut registry, state, _rx) = create_registry();

        registry.register("CmdOrCtrl+A", "foo");
        registry.register("Alt+B", "bar");
        registry.register_all(&BTreeMap::new());

        assert!(registry.is_empty());
        assert!(state.lock().unwrap().active.is_empty());
    }

    #[test]
    fn test_register_all_skips_blank_hotkeys() {
        let (mut registry, _state, _rx) = create_registry();

        let mut bindings = BTreeMap::new();
        bindings.insert("play".to_string(), "".to_string());
        bindings.insert("stop".to_string(), "Ctrl + S".to_string());
        registry.register_all(&bindings);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.binding("CmdOrCtrl+S").unwrap().action, "stop");
        assert!(registry.binding("").is_none());
    }

    #[test]
    fn test_refused_registration_falls_back_with_one_event() {
        let (mut registry, state, mut rx) = create_registry();
        state
            .lock()
            .unwrap()
            .refuse
            .insert("CmdOrCtrl+K".to_string());

        registry.register("CmdOrCtrl+K", "toggle-overlay");

        // Bookkeeping still reflects intent, flagged as in-window.
        let binding = registry.binding("CmdOrCtrl+K").unwrap();
        assert_eq!(binding.action, "toggle-overlay");
        assert_eq!(binding.mode, BindingMode::InWindow);
        assert!(state.lock().unwrap().active.is_empty());

        // Exactly one fallback event.
        match rx.try_recv().unwrap() {
            RegistryEvent::FallbackRequested {
                mode,
                accelerator,
                action,
            } => {
                assert_eq!(mode, FallbackMode::InWindow);
                assert_eq!(accelerator, "CmdOrCtrl+K");
                assert_eq!(action, "toggle-overlay");
            }
            other => panic!("unexpected event: {other}"),
        }
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_fallback_binding_is_never_released_at_os_level() {
        let (mut registry, state, _rx) = create_registry();
        state
            .lock()
            .unwrap()
            .refuse
            .insert("CmdOrCtrl+K".to_string());

        registry.register("CmdOrCtrl+K", "toggle-overlay");
        registry.unregister_all();

        assert!(registry.is_empty());
        // The failed registration never reached the OS, so releasing the
        // binding must not reach it either.
        assert!(state.lock().unwrap().released.is_empty());
    }

    #[test]
    fn test_unregister_all_is_idempotent() {
        let (mut registry, _state, _rx) = create_registry();

        registry.register("CmdOrCtrl+A", "foo");
        registry.unregister_all();
        registry.unregister_all();

        assert!(registry.is_empty());
    }

    #[test]
    fn test_unregister_unknown_is_noop() {
        let (mut registry, state, _rx) = create_registry();

        registry.unregister("Alt+F4");

        assert!(registry.is_empty());
        assert!(state.lock().unwrap().released.is_empty());
    }

    #[test]
    fn test_trigger_routes_to_bound_action() {
        let (mut registry, state, mut rx) = create_registry();
        registry.register("CmdOrCtrl+R", "start-capture");
        state
            .lock()
            .unwrap()
            .triggers
            .insert(7, "CmdOrCtrl+R".to_string());

        registry.handle_trigger(7);

        match rx.try_recv().unwrap() {
            RegistryEvent::Triggered { action } => assert_eq!(action, "start-capture"),
            other => panic!("unexpected event: {other}"),
        }
    }

    #[test]
    fn test_trigger_for_unknown_id_is_ignored() {
        let (registry, _state, mut rx) = create_registry();
        registry.handle_trigger(42);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_reregister_all_runs_through_normal_path() {
        let (mut registry, state, mut rx) = create_registry();
        registry.register("CmdOrCtrl+A", "foo");
        registry.register("Alt+B", "bar");

        registry.reregister_all();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.global_count(), 2);
        let state = state.lock().unwrap();
        // Released once each, then registered again exactly once each.
        assert_eq!(
            state.active.iter().filter(|a| *a == "CmdOrCtrl+A").count(),
            1
        );
        assert_eq!(state.active.iter().filter(|a| *a == "Alt+B").count(), 1);
        assert_eq!(state.released.len(), 2);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_reregister_keeps_refused_binding_in_fallback() {
        let (mut registry, state, mut rx) = create_registry();
        state
            .lock()
            .unwrap()
            .refuse
            .insert("CmdOrCtrl+K".to_string());

        registry.register("CmdOrCtrl+K", "toggle-overlay");
        let _ = rx.try_recv();

        registry.reregister_all();

        // Still refused on the second pass: fallback again, one more event.
        let binding = registry.binding("CmdOrCtrl+K").unwrap();
        assert_eq!(binding.mode, BindingMode::InWindow);
        assert!(matches!(
            rx.try_recv().unwrap(),
            RegistryEvent::FallbackRequested { .. }
        ));
    }
}
