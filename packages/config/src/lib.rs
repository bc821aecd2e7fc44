// ABOUTME: Configuration package for kubedev
// ABOUTME: Env var names, cluster config loading and the resource tier table

pub mod cluster;
pub mod env;
pub mod tiers;

pub use cluster::ClusterConfig;
pub use tiers::{ResourceTier, TierResources};

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
    #[error("Unknown resource tier: {0} (expected small, medium or large)")]
    UnknownTier(String),
}
