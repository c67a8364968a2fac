use crate::registry::RegistryConfig;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Runner configuration, loaded from a JSON file when one is supplied.
#[derive(Debug, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Index into the enumerated physical devices.
    #[serde(default)]
    pub device_index: usize,

    /// Enumerate the mesh-shading section of the tree.
    #[serde(default = "default_true")]
    pub mesh: bool,

    /// Enumerate the ray-tracing section of the tree.
    #[serde(default = "default_true")]
    pub ray_tracing: bool,
}

fn default_true() -> bool {
    true
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            device_index: 0,
            mesh: true,
            ray_tracing: true,
        }
    }
}

impl HarnessConfig {
    pub fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn registry(&self) -> RegistryConfig {
        RegistryConfig {
            mesh: self.mesh,
            ray_tracing: self.ray_tracing,
        }
    }
}
