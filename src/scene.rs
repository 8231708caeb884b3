//! Serde description of a canvas: named shapes plus the connections between
//! them. Shared by the CLI, the wasm wrapper and the integration tests.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::canvas::{Canvas, ConnectionId, ConnectionPolicy, ShapeId, Size};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::geometry::Point;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default)]
    pub shapes: Vec<SceneShape>,
    #[serde(default)]
    pub connections: Vec<SceneConnection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneShape {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Text drawn inside the shape; the id when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<ConnectionPolicy>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneConnection {
    pub from: String,
    pub to: String,
}

/// A canvas built from a [`Scene`], with the scene's names resolved.
#[derive(Debug)]
pub struct BuiltScene {
    pub canvas: Canvas,
    pub shapes: BTreeMap<String, ShapeId>,
    /// One entry per scene connection, `None` where a shape refused it.
    pub connections: Vec<Option<ConnectionId>>,
}

impl BuiltScene {
    pub fn shape(&self, name: &str) -> Result<ShapeId> {
        self.shapes
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownShapeName(name.to_string()))
    }

    pub fn refused(&self) -> usize {
        self.connections.iter().filter(|conn| conn.is_none()).count()
    }
}

impl Scene {
    pub fn from_json(input: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Adds every shape, then connects the pairs in declaration order.
    pub fn build(&self, config: &Config) -> Result<BuiltScene> {
        let mut canvas = Canvas::from_config(config);
        let mut shapes = BTreeMap::new();
        for shape in &self.shapes {
            if shapes.contains_key(&shape.id) {
                return Err(Error::DuplicateShapeName(shape.id.clone()));
            }
            let label = shape.label.clone().unwrap_or_else(|| shape.id.clone());
            let id = canvas.add_shape_with_policy(
                label,
                Point::new(shape.x, shape.y),
                Size::new(shape.width, shape.height),
                shape.policy.unwrap_or_default(),
            )?;
            shapes.insert(shape.id.clone(), id);
        }

        let mut built = BuiltScene {
            canvas,
            shapes,
            connections: Vec::with_capacity(self.connections.len()),
        };
        for conn in &self.connections {
            let orig = built.shape(&conn.from)?;
            let dest = built.shape(&conn.to)?;
            let id = built.canvas.add_connection(orig, dest)?;
            if id.is_none() {
                warn!(from = %conn.from, to = %conn.to, "scene connection refused");
            }
            built.connections.push(id);
        }
        debug!(
            shapes = built.shapes.len(),
            connections = built.connections.len(),
            refused = built.refused(),
            "built scene"
        );
        Ok(built)
    }
}
