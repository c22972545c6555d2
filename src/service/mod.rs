//! Coordinator module: the single-threaded event loop owning all state

mod coordinator;

pub use coordinator::{Coordinator, ServiceEvent};
