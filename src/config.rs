use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Minimum modularity improvement required to accept a coarsening round.
pub const DEFAULT_MIN_MOD_GROWTH: f64 = 0.0000001;

pub(crate) const READ_BUFFER_SIZE: usize = 128 * 1024 * 1024;

/// What the driver does when the input graph has no edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyGraphPolicy {
    /// Surface `CommunityError::EmptyGraph`.
    Fail,
    /// Return the all-singleton partition as a trivial result.
    Singleton,
}

impl Default for EmptyGraphPolicy {
    fn default() -> Self {
        EmptyGraphPolicy::Fail
    }
}

/// Tunables of the hierarchy driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LouvainConfig {
    /// A coarsening round is accepted only when it grows modularity by
    /// strictly more than this amount.
    #[serde(default = "default_min_mod_growth")]
    pub min_mod_growth: f64,
    #[serde(default)]
    pub empty_graph_policy: EmptyGraphPolicy,
}

fn default_min_mod_growth() -> f64 {
    DEFAULT_MIN_MOD_GROWTH
}

impl Default for LouvainConfig {
    fn default() -> Self {
        LouvainConfig {
            min_mod_growth: DEFAULT_MIN_MOD_GROWTH,
            empty_graph_policy: EmptyGraphPolicy::default(),
        }
    }
}

impl LouvainConfig {
    /// Load a config from a yaml file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let config_file = File::open(path.as_ref())
            .with_context(|| format!("open config file {}", path.as_ref().display()))?;
        let config = serde_yaml::from_reader(config_file).context("parse config yaml")?;
        Ok(config)
    }
}
