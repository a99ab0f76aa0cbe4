use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::layout::engine::Ranker;

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct PndConfig {
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub dot: DotConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LayoutConfig {
    /// Edge length of the square every node is laid out as; spacing is derived from it.
    #[serde(default = "default_node_size")]
    pub node_size: f64,
    #[serde(default = "default_iterations")]
    pub iterations: usize,
    #[serde(default)]
    pub ranker: Ranker,
    #[serde(default = "default_remove_cycles")]
    pub remove_cycles: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_size: default_node_size(),
            iterations: default_iterations(),
            ranker: Ranker::default(),
            remove_cycles: default_remove_cycles(),
        }
    }
}

impl LayoutConfig {
    pub fn layer_spacing(&self) -> f64 {
        self.node_size * 2.0
    }

    pub fn node_spacing(&self) -> f64 {
        self.node_size
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DotConfig {
    #[serde(default = "default_rankdir")]
    pub rankdir: String,
    #[serde(default)]
    pub show_ids: bool,
}

impl Default for DotConfig {
    fn default() -> Self {
        Self {
            rankdir: default_rankdir(),
            show_ids: false,
        }
    }
}

impl PndConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: PndConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        Ok(config)
    }
}

fn default_node_size() -> f64 {
    40.0
}

fn default_iterations() -> usize {
    30
}

fn default_remove_cycles() -> bool {
    true
}

fn default_rankdir() -> String {
    "LR".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let config = PndConfig::load_from_file("does/not/exist.toml").unwrap();
        assert_eq!(config.layout, LayoutConfig::default());
        assert_eq!(config.layout.iterations, 30);
        assert_eq!(config.dot.rankdir, "LR");
    }

    #[test]
    fn partial_tables_keep_defaults() {
        let config: PndConfig = toml::from_str(
            r#"
            [layout]
            node_size = 20.0
            ranker = "longest-path"

            [dot]
            show_ids = true
            "#,
        )
        .unwrap();
        assert_eq!(config.layout.node_size, 20.0);
        assert_eq!(config.layout.layer_spacing(), 40.0);
        assert!(config.layout.remove_cycles);
        assert!(config.dot.show_ids);
        assert_eq!(config.dot.rankdir, "LR");
    }
}
