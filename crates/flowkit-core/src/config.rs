//! Editor configuration.

use crate::error::ConfigurationError;
use crate::graph::DEFAULT_NODE_SIZE;
use kurbo::Size;
use serde::de::{Error as _, Unexpected};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// Default snapping grid.
pub const GRID_SIZE: Size = Size::new(20.0, 20.0);

/// Connector routing options.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Minimum length of the first and last segment.
    pub stub_length: f64,
    /// Route around node bounding boxes other than the endpoints.
    pub avoid_vertices: bool,
    /// Clearance kept around obstacles by the grid search.
    pub obstacle_margin: f64,
    /// Upper bound on grid search expansions before falling back.
    pub max_expansions: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            stub_length: GRID_SIZE.width,
            avoid_vertices: true,
            obstacle_margin: 10.0,
            max_expansions: 20_000,
        }
    }
}

/// Editor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Snapping grid; its width is also the default connector stub.
    pub grid: Size,
    /// Snap dropped and moved nodes to the grid.
    pub snap_to_grid: bool,
    pub routing: RouterConfig,
    /// Size of nodes dropped from the palette.
    pub default_node_size: Size,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            grid: GRID_SIZE,
            snap_to_grid: true,
            routing: RouterConfig::default(),
            default_node_size: DEFAULT_NODE_SIZE,
        }
    }
}

impl EditorConfig {
    /// Parse a configuration from a JSON object. Missing fields take their
    /// defaults; an absent `routing.stub_length` follows the grid width.
    pub fn from_json(json: &str) -> Result<Self, ConfigurationError> {
        let value: Value = serde_json::from_str(json)?;
        let stub_given = match &value {
            Value::Object(fields) => fields
                .get("routing")
                .and_then(|routing| routing.get("stub_length"))
                .is_some(),
            other => {
                let unexpected = match other {
                    Value::Array(_) => Unexpected::Seq,
                    Value::String(text) => Unexpected::Str(text),
                    Value::Bool(flag) => Unexpected::Bool(*flag),
                    Value::Null => Unexpected::Unit,
                    _ => Unexpected::Other("number"),
                };
                return Err(serde_json::Error::invalid_type(unexpected, &"a configuration object").into());
            }
        };
        let mut config: Self = serde_json::from_value(value)?;
        if !stub_given {
            config.routing.stub_length = config.grid.width;
        }
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Reject values the editor cannot work with.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !(self.grid.width > 0.0 && self.grid.height > 0.0) {
            return Err(ConfigurationError::InvalidValue {
                field: "grid",
                reason: format!("{}x{} is not a positive size", self.grid.width, self.grid.height),
            });
        }
        if !(self.default_node_size.width > 0.0 && self.default_node_size.height > 0.0) {
            return Err(ConfigurationError::InvalidValue {
                field: "default_node_size",
                reason: "must be positive".to_string(),
            });
        }
        if !(self.routing.stub_length.is_finite() && self.routing.stub_length > 0.0) {
            return Err(ConfigurationError::InvalidValue {
                field: "routing.stub_length",
                reason: format!("{} is not a positive length", self.routing.stub_length),
            });
        }
        if !(self.routing.obstacle_margin.is_finite() && self.routing.obstacle_margin >= 0.0) {
            return Err(ConfigurationError::InvalidValue {
                field: "routing.obstacle_margin",
                reason: "must be zero or positive".to_string(),
            });
        }
        Ok(())
    }
}
