//! Surface management: the two UI endpoints and the command relay

mod manager;
mod relay;

pub use manager::{SurfaceHandle, SurfaceManager, SurfaceRole};
pub use relay::relay_graphic_command;
