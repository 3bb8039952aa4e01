//! Configuration module
//!
//! Handles loading and saving simulator configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::device::DeviceProfile;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Bus settings
    #[serde(default)]
    pub bus: BusConfig,

    /// Which devices to simulate
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// Attribute defaults shared by all devices
    #[serde(default)]
    pub device: DeviceProfile,
}

/// Bus configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusConfig {
    /// CAN interface name
    #[serde(default = "default_interface")]
    pub interface: String,
    /// Receive timeout in ms; also the shutdown latency
    #[serde(default = "default_rx_timeout")]
    pub rx_timeout_ms: u64,
}

fn default_interface() -> String {
    "vcan0".to_string()
}

fn default_rx_timeout() -> u64 {
    1000
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            interface: default_interface(),
            rx_timeout_ms: default_rx_timeout(),
        }
    }
}

impl BusConfig {
    pub fn rx_timeout(&self) -> Duration {
        Duration::from_millis(self.rx_timeout_ms)
    }
}

/// Simulation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Node ids of the simulated devices (0-255)
    #[serde(default = "default_node_ids")]
    pub node_ids: Vec<u32>,
}

fn default_node_ids() -> Vec<u32> {
    vec![1]
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            node_ids: default_node_ids(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the default location
    pub fn load_default() -> ConfigResult<Self> {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("canboot-sim/config.toml")),
            Some(PathBuf::from("./canboot-sim.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                return Self::load(path);
            }
        }

        // Return default config if no file found
        Ok(Self::default())
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let contents = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, contents)?;
        Ok(())
    }
}

/// Generate a sample configuration file
pub fn generate_sample_config() -> ConfigResult<String> {
    let config = Config {
        simulation: SimulationConfig {
            node_ids: vec![1, 3, 5, 8],
        },
        ..Default::default()
    };

    Ok(toml::to_string_pretty(&config)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.bus.interface, "vcan0");
        assert_eq!(config.bus.rx_timeout(), Duration::from_secs(1));
        assert_eq!(config.simulation.node_ids, vec![1]);
        assert_eq!(config.device, DeviceProfile::default());
    }

    #[test]
    fn test_save_and_load() {
        let mut config = Config::default();
        config.bus.interface = "can1".to_string();
        let file = NamedTempFile::new().unwrap();

        config.save(file.path()).unwrap();

        let loaded = Config::load(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[simulation]\nnode_ids = [2, 4]\n\n[device]\nproduct_id = 4660").unwrap();

        let loaded = Config::load(file.path()).unwrap();
        assert_eq!(loaded.simulation.node_ids, vec![2, 4]);
        assert_eq!(loaded.device.product_id, 0x1234);
        assert_eq!(loaded.device.vendor_id, DeviceProfile::default().vendor_id);
        assert_eq!(loaded.bus, BusConfig::default());
    }

    #[test]
    fn test_missing_file() {
        let result = Config::load(Path::new("/nonexistent/canboot-sim.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_sample_config() {
        let sample = generate_sample_config().unwrap();
        let parsed: Config = toml::from_str(&sample).unwrap();
        assert_eq!(parsed.simulation.node_ids, vec![1, 3, 5, 8]);
    }
}
