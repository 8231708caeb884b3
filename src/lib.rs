//! Orthogonal connection routing for interactive diagram editors.
//!
//! A [`Canvas`] owns shapes and the connections between them. Binding a
//! connection picks a port on each shape, routes a Manhattan polyline
//! between them, rounds its corners and hops over the connections it
//! crosses. The result is a backend-neutral [`PathDescriptor`] that
//! [`render::render_svg`] turns into SVG.

pub mod canvas;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod geometry;
pub mod render;
pub mod route_dump;
pub mod routing;
pub mod scene;
pub mod theme;

pub use canvas::{
    Canvas, CanvasEvent, Connection, ConnectionId, ConnectionPolicy, ConnectionState, Crossing,
    Endpoint, Mode, PortPosition, Shape, ShapeDraft, ShapeId, Size,
};
#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, RenderConfig, RoutingConfig, StrategyConfig, load_config, parse_config};
pub use error::{Error, Result};
pub use geometry::Point;
pub use render::render_svg;
pub use routing::{ArrowMarker, PathCommand, PathDescriptor, Strategies};
pub use scene::{BuiltScene, Scene};
pub use theme::Theme;

/// Builds the scene described by `scene_json` and renders it to SVG.
pub fn render_scene_svg(scene_json: &str, config: &Config) -> anyhow::Result<String> {
    let scene = Scene::from_json(scene_json)?;
    let built = scene.build(config)?;
    Ok(render_svg(&built.canvas, &config.theme, &config.render))
}
