//! Underlay configuration system
//!
//! Loads renderer and visualization settings from `underlay.toml`, with environment variable
//! overrides for quick experiments.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default config file looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = "underlay.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Main configuration structure for the underlay renderer
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct UnderlayConfig {
    /// Host window settings
    pub window: WindowConfig,
    /// Shape history recording
    pub history: HistoryConfig,
    /// Geometry extrusion
    pub geo: GeoConfig,
    /// Ropes between consecutive shapes
    pub edges: EdgeConfig,
    /// Plugin startup state
    pub plugins: PluginsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HistoryConfig {
    /// Snapshots kept per shape; the oldest is evicted once full
    pub capacity: usize,
    /// Depth offset between consecutive history slices (negative recedes from the viewer)
    pub layer_depth: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeoConfig {
    /// Extrusion depth of shape walls
    pub depth: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EdgeConfig {
    pub segments: u32,
    pub sag: f32,
    pub stroke_weight: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct PluginsConfig {
    /// Names of visualizations enabled at startup
    pub enabled: Vec<String>,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Underlay".to_string(),
            width: 1280,
            height: 800,
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: 120,
            layer_depth: -50.0,
        }
    }
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self { depth: 10_000.0 }
    }
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            segments: 20,
            sag: 1000.0,
            stroke_weight: 20.0,
        }
    }
}

fn parse_env<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|val| val.trim().parse::<T>().ok())
}

impl UnderlayConfig {
    /// Parse a TOML document, replacing out-of-range values with their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(content)?;
        config.sanitize();
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Load `underlay.toml` from the current directory, or defaults if it is missing or invalid.
    pub fn load_or_default() -> Self {
        Self::load_from_file(DEFAULT_CONFIG_FILE).unwrap_or_default()
    }

    /// Merge configuration with environment variables
    ///
    /// Environment variables take precedence over configuration file values.
    pub fn merge_with_env(&mut self) {
        self.merge_with(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup. Unparseable values are ignored.
    pub fn merge_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(capacity) = parse_env(&lookup, "UNDERLAY_HISTORY_CAPACITY") {
            self.history.capacity = capacity;
        }
        if let Some(depth) = parse_env(&lookup, "UNDERLAY_LAYER_DEPTH") {
            self.history.layer_depth = depth;
        }
        if let Some(depth) = parse_env(&lookup, "UNDERLAY_GEO_DEPTH") {
            self.geo.depth = depth;
        }
        if let Some(segments) = parse_env(&lookup, "UNDERLAY_ROPE_SEGMENTS") {
            self.edges.segments = segments;
        }
        if let Some(sag) = parse_env(&lookup, "UNDERLAY_ROPE_SAG") {
            self.edges.sag = sag;
        }
        if let Some(list) = lookup("UNDERLAY_PLUGINS") {
            self.plugins.enabled = list
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect();
        }
        self.sanitize();
    }

    /// Replace values the renderer cannot use with their defaults.
    pub fn sanitize(&mut self) {
        if self.history.capacity == 0 {
            self.history.capacity = HistoryConfig::default().capacity;
        }
        if self.edges.segments == 0 {
            self.edges.segments = EdgeConfig::default().segments;
        }
        if !self.history.layer_depth.is_finite() {
            self.history.layer_depth = HistoryConfig::default().layer_depth;
        }
        if !self.geo.depth.is_finite() {
            self.geo.depth = GeoConfig::default().depth;
        }
        if !self.edges.sag.is_finite() {
            self.edges.sag = EdgeConfig::default().sag;
        }
    }

    /// Load configuration with environment variable overrides
    ///
    /// 1. Load from underlay.toml (or use defaults if not found)
    /// 2. Override with environment variables if present
    pub fn load() -> Self {
        let mut config = Self::load_or_default();
        config.merge_with_env();
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = UnderlayConfig::default();
        assert_eq!(config.history.capacity, 120);
        assert_eq!(config.history.layer_depth, -50.0);
        assert_eq!(config.geo.depth, 10_000.0);
        assert_eq!(config.edges.segments, 20);
        assert!(config.plugins.enabled.is_empty());
    }

    #[test]
    fn test_toml_serialization() {
        let config = UnderlayConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = UnderlayConfig::from_toml_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let parsed = UnderlayConfig::from_toml_str(
            r#"
            [history]
            capacity = 3

            [plugins]
            enabled = ["Geo", "Edges"]
            "#,
        )
        .unwrap();
        assert_eq!(parsed.history.capacity, 3);
        assert_eq!(parsed.history.layer_depth, -50.0);
        assert_eq!(parsed.plugins.enabled, vec!["Geo", "Edges"]);
        assert_eq!(parsed.edges, EdgeConfig::default());
    }

    #[test]
    fn test_zero_values_fall_back() {
        let parsed = UnderlayConfig::from_toml_str(
            "[history]\ncapacity = 0\n[edges]\nsegments = 0\n",
        )
        .unwrap();
        assert_eq!(parsed.history.capacity, 120);
        assert_eq!(parsed.edges.segments, 20);
    }

    #[test]
    fn test_parse_error() {
        let err = UnderlayConfig::from_toml_str("[history]\ncapacity = \"many\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = UnderlayConfig::load_from_file("does/not/exist.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_merge_with_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("UNDERLAY_HISTORY_CAPACITY", "8"),
            ("UNDERLAY_ROPE_SAG", "250.5"),
            ("UNDERLAY_GEO_DEPTH", "not-a-number"),
            ("UNDERLAY_PLUGINS", "Geo, History,,"),
        ]);
        let mut config = UnderlayConfig::default();
        config.merge_with(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.history.capacity, 8);
        assert_eq!(config.edges.sag, 250.5);
        assert_eq!(config.geo.depth, 10_000.0);
        assert_eq!(config.plugins.enabled, vec!["Geo", "History"]);
    }
}
