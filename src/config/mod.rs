use anyhow::{Context, Result};
use thiserror::Error;

pub mod network;
pub mod vehicle_classes;

pub use network::*;
pub use vehicle_classes::*;

/// Malformed network metadata strings.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    #[error("expected {expected} comma-separated numbers, got '{input}'")]
    Arity { expected: usize, input: String },
    #[error("'{0}' is not a number")]
    Number(String),
    #[error("projection: {0}")]
    Projection(String),
}

#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub network: NetworkConfig,
    pub vehicles: VehiclesConfig,
}

impl ViewerConfig {
    pub fn load_from_files(network_path: &str, vehicles_path: &str) -> Result<Self> {
        let network_content = std::fs::read_to_string(network_path)
            .with_context(|| format!("reading network metadata from {}", network_path))?;
        let vehicles_content = std::fs::read_to_string(vehicles_path)
            .with_context(|| format!("reading vehicle classes from {}", vehicles_path))?;

        let network: NetworkConfig = toml::from_str(&network_content)?;
        let vehicles: VehiclesConfig = toml::from_str(&vehicles_content)?;

        // Validate configurations
        network.validate()?;
        vehicles.validate()?;

        Ok(ViewerConfig { network, vehicles })
    }
}

pub trait Validate {
    fn validate(&self) -> Result<()>;
}
