//! IPC module for daemon-surface communication

mod protocol;
mod server;

pub use protocol::{DaemonStatus, Notice, Request};
pub use server::Server;
