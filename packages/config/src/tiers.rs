// ABOUTME: Resource tier table mapping a tier name to compute and storage sizing
// ABOUTME: The storage claim size of every sandbox is taken from the selected tier

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ConfigError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceTier {
    #[default]
    Small,
    Medium,
    Large,
}

/// Kubernetes quantity strings for one tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierResources {
    pub cpu_request: &'static str,
    pub cpu_limit: &'static str,
    pub memory_request: &'static str,
    pub memory_limit: &'static str,
    pub storage_size: &'static str,
}

const SMALL: TierResources = TierResources {
    cpu_request: "250m",
    cpu_limit: "1",
    memory_request: "512Mi",
    memory_limit: "2Gi",
    storage_size: "10Gi",
};

const MEDIUM: TierResources = TierResources {
    cpu_request: "500m",
    cpu_limit: "2",
    memory_request: "1Gi",
    memory_limit: "4Gi",
    storage_size: "20Gi",
};

const LARGE: TierResources = TierResources {
    cpu_request: "1",
    cpu_limit: "4",
    memory_request: "2Gi",
    memory_limit: "8Gi",
    storage_size: "50Gi",
};

impl ResourceTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
        }
    }

    pub fn resources(&self) -> &'static TierResources {
        match self {
            Self::Small => &SMALL,
            Self::Medium => &MEDIUM,
            Self::Large => &LARGE,
        }
    }
}

impl fmt::Display for ResourceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceTier {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "small" => Ok(Self::Small),
            "medium" => Ok(Self::Medium),
            "large" => Ok(Self::Large),
            _ => Err(ConfigError::UnknownTier(s.to_string())),
        }
    }
}
