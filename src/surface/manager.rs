//! Surface handles and the two-slot surface manager
//!
//! A surface is one of the two UI windows, seen from the daemon as a message
//! endpoint. Handles are non-owning: the peer can disappear at any time, so
//! liveness is checked immediately before every send and a message to a dead
//! surface is simply lost, never queued.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::ipc::Notice;

/// Which UI window a connection represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceRole {
    /// The control panel
    Control,
    /// The transparent graphics overlay
    Graphics,
}

/// Non-owning handle to a connected surface.
///
/// Backed by the connection's outbound channel; the handle is live exactly as
/// long as the connection's writer is still draining it.
#[derive(Debug, Clone)]
pub struct SurfaceHandle {
    outbound: mpsc::UnboundedSender<Notice>,
}

impl SurfaceHandle {
    pub fn new(outbound: mpsc::UnboundedSender<Notice>) -> Self {
        Self { outbound }
    }

    /// Whether the peer is still draining this handle.
    pub fn is_live(&self) -> bool {
        !self.outbound.is_closed()
    }

    /// Deliver a notice, or drop it silently if the peer is gone.
    pub fn send(&self, notice: Notice) {
        if !self.is_live() {
            debug!("surface gone, notice dropped");
            return;
        }
        if self.outbound.send(notice).is_err() {
            debug!("surface closed mid-send, notice dropped");
        }
    }

    /// Whether two handles refer to the same connection.
    pub fn same_connection(&self, other: &SurfaceHandle) -> bool {
        self.outbound.same_channel(&other.outbound)
    }
}

/// Owns the two surface slots. A re-attach for an occupied role replaces the
/// stale handle (last writer wins).
#[derive(Default)]
pub struct SurfaceManager {
    control: Option<SurfaceHandle>,
    graphics: Option<SurfaceHandle>,
}

impl SurfaceManager {
    pub fn attach(&mut self, role: SurfaceRole, handle: SurfaceHandle) {
        info!(?role, "surface attached");
        *self.slot_mut(role) = Some(handle);
    }

    /// Clear a slot, but only if it still holds the departing connection.
    /// A role that was re-attached in the meantime keeps its new handle.
    pub fn detach(&mut self, role: SurfaceRole, departing: &SurfaceHandle) {
        let slot = self.slot_mut(role);
        if slot
            .as_ref()
            .is_some_and(|current| current.same_connection(departing))
        {
            info!(?role, "surface detached");
            *slot = None;
        } else {
            debug!(?role, "stale detach ignored");
        }
    }

    /// Live handle for a role, if any.
    pub fn surface(&self, role: SurfaceRole) -> Option<&SurfaceHandle> {
        let slot = match role {
            SurfaceRole::Control => &self.control,
            SurfaceRole::Graphics => &self.graphics,
        };
        slot.as_ref().filter(|h| h.is_live())
    }

    /// Deliver a notice to the control surface, or drop it.
    pub fn notify_control(&self, notice: Notice) {
        match self.surface(SurfaceRole::Control) {
            Some(handle) => handle.send(notice),
            None => debug!("control surface not live, notice dropped"),
        }
    }

    fn slot_mut(&mut self, role: SurfaceRole) -> &mut Option<SurfaceHandle> {
        match role {
            SurfaceRole::Control => &mut self.control,
            SurfaceRole::Graphics => &mut self.graphics,
        }
    }
}
