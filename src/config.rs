//! Configuration loading and management

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;

/// Delay before the one-shot re-registration pass, unless overridden
const DEFAULT_REREGISTER_DELAY_MS: u64 = 3000;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the Unix domain socket the surfaces connect to
    pub socket_path: PathBuf,

    /// Directory for runtime data
    pub data_dir: PathBuf,

    /// Delay between startup and the deferred hotkey re-registration pass
    pub reregister_delay: Duration,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        let home = std::env::var("HOME")?;
        let data_dir = PathBuf::from(&home)
            .join(".local")
            .join("share")
            .join("deckcast");

        let socket_path = match std::env::var_os("DECKCAST_SOCKET") {
            Some(path) => PathBuf::from(path),
            None => data_dir.join("daemon.sock"),
        };

        let reregister_delay = std::env::var("DECKCAST_REREGISTER_DELAY_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_millis(DEFAULT_REREGISTER_DELAY_MS));

        Ok(Self {
            socket_path,
            data_dir,
            reregister_delay,
        })
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_load() {
        let config = Config::load().unwrap();
        assert!(config.data_dir.to_string_lossy().contains("deckcast"));
        assert!(config.reregister_delay >= Duration::from_millis(1));
    }
}
