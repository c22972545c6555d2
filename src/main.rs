//! deckcast-daemon: background coordinator for the deckcast desktop app
//!
//! The app runs two long-lived UI surfaces: a control panel and a
//! transparent graphics overlay meant for external video capture. This
//! daemon sits between them and provides:
//! - Global hotkey registration with in-window fallback on OS refusal
//! - A deferred re-registration pass once the session has settled
//! - Relay of opaque overlay commands from the control panel to the overlay
//! - An IPC server the two surfaces attach to

mod config;
mod events;
mod hotkey;
mod ipc;
mod lifecycle;
mod service;
mod surface;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::hotkey::{
    spawn_trigger_listener, AcceleratorBackend, GlobalHotkeyBackend, HotkeyRegistry,
    UnavailableBackend,
};
use crate::ipc::Server;
use crate::lifecycle::ShutdownSignal;
use crate::service::Coordinator;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "deckcast-daemon starting"
    );

    // Load configuration
    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(?config.socket_path, "configuration loaded");

    // Create shutdown signal handler
    let shutdown = ShutdownSignal::new();

    // Channels for inter-component communication
    // IPC server -> coordinator
    let (event_tx, event_rx) = mpsc::channel(64);
    // Trigger listener thread -> coordinator
    let (trigger_tx, trigger_rx) = mpsc::channel(64);
    // Registry -> coordinator (fallback and trigger notices)
    let (registry_tx, registry_rx) = mpsc::unbounded_channel();

    // Bring up the OS hotkey backend. If the session has no global shortcut
    // support the daemon still runs; every binding then takes the in-window
    // fallback path.
    let backend: Box<dyn AcceleratorBackend + Send> = match GlobalHotkeyBackend::new() {
        Ok(backend) => {
            match spawn_trigger_listener(trigger_tx) {
                Ok(()) => info!("global hotkey backend ready"),
                Err(e) => warn!(?e, "trigger listener failed to start, hotkeys will not fire"),
            }
            Box::new(backend)
        }
        Err(e) => {
            error!(?e, "failed to initialize global hotkey backend");
            warn!("continuing without global hotkeys - bindings will fall back to in-window handling");
            Box::new(UnavailableBackend)
        }
    };

    let registry = HotkeyRegistry::new(backend, registry_tx);
    let mut coordinator = Coordinator::new(registry);

    // Create IPC server for the two surfaces
    let server = Server::new(&config.socket_path, event_tx)?;

    info!("daemon initialized, entering main loop");

    // Main event loop
    tokio::select! {
        // Run the coordinator (registry, surfaces, deferred re-registration)
        _ = coordinator.run(event_rx, trigger_rx, registry_rx, config.reregister_delay) => {
            info!("coordinator exited");
        }

        // Run the IPC server (accepts surface connections)
        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        // Wait for shutdown signal
        _ = shutdown.wait() => {
            info!("shutdown signal received");
        }
    }

    // Cleanup
    info!("shutting down...");

    coordinator.shutdown();
    server.shutdown().await;

    info!("deckcast-daemon stopped");

    Ok(())
}
