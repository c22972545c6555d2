//! The coordinator event loop
//!
//! One task owns the hotkey registry and both surface slots; IPC requests,
//! OS trigger events, registry notices, and the one-shot re-registration
//! timer all land here. Nothing else mutates that state, so no locking is
//! needed and no binding can be observed mid-update.

use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::events::RegistryEvent;
use crate::hotkey::{accel, HotkeyRegistry};
use crate::ipc::{DaemonStatus, Notice, Request};
use crate::surface::{relay_graphic_command, SurfaceHandle, SurfaceManager, SurfaceRole};

/// Events funneled into the coordinator from the IPC layer
#[derive(Debug)]
pub enum ServiceEvent {
    /// An inbound request from an attached surface
    Request {
        role: SurfaceRole,
        request: Request,
    },
    /// A connection attached as the given surface
    SurfaceAttached {
        role: SurfaceRole,
        handle: SurfaceHandle,
    },
    /// A connection departed; clears the slot only if it still holds it
    SurfaceDetached {
        role: SurfaceRole,
        handle: SurfaceHandle,
    },
}

/// Owns the registry and surface manager; drives all state changes.
pub struct Coordinator {
    registry: HotkeyRegistry,
    surfaces: SurfaceManager,
    started_at: Instant,
}

impl Coordinator {
    pub fn new(registry: HotkeyRegistry) -> Self {
        Self {
            registry,
            surfaces: SurfaceManager::default(),
            started_at: Instant::now(),
        }
    }

    /// Run the event loop until the service event channel closes.
    ///
    /// `settle_delay` schedules the single deferred re-registration pass:
    /// registrations made before the session is fully ready can silently
    /// fail, so the current bindings are pushed through the register path
    /// once more after the delay. The pass fires exactly once and is not
    /// retried.
    pub async fn run(
        &mut self,
        mut event_rx: mpsc::Receiver<ServiceEvent>,
        mut trigger_rx: mpsc::Receiver<u32>,
        mut registry_rx: mpsc::UnboundedReceiver<RegistryEvent>,
        settle_delay: Duration,
    ) {
        info!("coordinator started");

        let reregister = tokio::time::sleep(settle_delay);
        tokio::pin!(reregister);
        let mut reregistered = false;

        loop {
            tokio::select! {
                maybe_event = event_rx.recv() => match maybe_event {
                    Some(event) => self.handle_event(event),
                    None => break,
                },

                Some(trigger_id) = trigger_rx.recv() => {
                    self.registry.handle_trigger(trigger_id);
                }

                Some(registry_event) = registry_rx.recv() => {
                    info!(event = %registry_event, "registry event");
                    self.surfaces.notify_control(registry_event.into());
                }

                () = &mut reregister, if !reregistered => {
                    reregistered = true;
                    self.registry.reregister_all();
                }
            }
        }

        info!("coordinator stopped");
    }

    /// Release every OS registration; called once on shutdown.
    pub fn shutdown(&mut self) {
        self.registry.unregister_all();
        info!("hotkey registrations released");
    }

    fn handle_event(&mut self, event: ServiceEvent) {
        match event {
            ServiceEvent::SurfaceAttached { role, handle } => self.surfaces.attach(role, handle),
            ServiceEvent::SurfaceDetached { role, handle } => self.surfaces.detach(role, &handle),
            ServiceEvent::Request { role, request } => self.handle_request(role, request),
        }
    }

    fn handle_request(&mut self, role: SurfaceRole, request: Request) {
        // The graphics overlay is a passive endpoint; hotkey and relay
        // requests are accepted from the control panel only.
        if role == SurfaceRole::Graphics
            && !matches!(request, Request::Ping | Request::GetStatus)
        {
            warn!(?request, "request from graphics surface ignored");
            return;
        }

        match request {
            Request::Attach { .. } => {
                warn!(?role, "duplicate attach ignored");
            }

            Request::RegisterHotkey {
                accelerator,
                action,
            } => match accel::translate(&accelerator) {
                Some(canonical) => self.registry.register(&canonical, &action),
                None => warn!(%action, "empty accelerator, nothing to register"),
            },

            Request::UnregisterHotkey { accelerator } => match accel::translate(&accelerator) {
                Some(canonical) => self.registry.unregister(&canonical),
                None => debug!("empty accelerator, nothing to unregister"),
            },

            Request::RegisterAllHotkeys { bindings } => {
                self.registry.register_all(&bindings);
            }

            Request::GraphicCommand { command } => {
                relay_graphic_command(&self.surfaces, command);
            }

            Request::Ping => self.reply(role, Notice::Pong),

            Request::GetStatus => {
                let status = DaemonStatus {
                    version: env!("CARGO_PKG_VERSION").to_string(),
                    bindings: self.registry.len(),
                    global: self.registry.global_count(),
                    uptime_secs: self.started_at.elapsed().as_secs(),
                };
                self.reply(role, Notice::Status(status));
            }
        }
    }

    /// Reply to the surface that issued a request, or drop the reply.
    fn reply(&self, role: SurfaceRole, notice: Notice) {
        match self.surfaces.surface(role) {
            Some(handle) => handle.send(notice),
            None => debug!(?role, "requester no longer live, reply dropped"),
        }
    }
}
