//! Overlay command relay
//!
//! Stateless forwarding of opaque commands from the control panel to the
//! graphics overlay. The payload is owned by the two UI layers; this layer
//! performs no interpretation or validation.

use serde_json::Value;
use tracing::debug;

use crate::ipc::Notice;

use super::manager::{SurfaceManager, SurfaceRole};

/// Forward an opaque command to the graphics surface, or drop it silently
/// when that surface is absent or dead.
pub fn relay_graphic_command(surfaces: &SurfaceManager, command: Value) {
    match surfaces.surface(SurfaceRole::Graphics) {
        Some(surface) => surface.send(Notice::GraphicCommand { command }),
        None => debug!("graphics surface not live, command dropped"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::SurfaceHandle;

    use serde_json::json;
    use tokio::sync::mpsc;

    #[test]
    fn test_relay_delivers_command_unmodified() {
        let mut surfaces = SurfaceManager::default();
        let (tx, mut rx) = mpsc::unbounded_channel();
        surfaces.attach(SurfaceRole::Graphics, SurfaceHandle::new(tx));

        let command = json!({ "op": "set-scene", "scene": "intro", "opacity": 0.5 });
        relay_graphic_command(&surfaces, command.clone());

        match rx.try_recv().unwrap() {
            Notice::GraphicCommand { command: delivered } => assert_eq!(delivered, command),
            other => panic!("unexpected notice: {other:?}"),
        }
        // Delivered exactly once.
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_relay_drops_when_surface_absent() {
        let surfaces = SurfaceManager::default();
        relay_graphic_command(&surfaces, json!({ "op": "clear" }));
    }

    #[test]
    fn test_relay_drops_when_surface_dead() {
        let mut surfaces = SurfaceManager::default();
        let (tx, rx) = mpsc::unbounded_channel();
        surfaces.attach(SurfaceRole::Graphics, SurfaceHandle::new(tx));
        drop(rx);

        relay_graphic_command(&surfaces, json!({ "op": "clear" }));
    }
}
