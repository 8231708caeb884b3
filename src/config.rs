use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Minimum straight run leaving a port before the route may turn.
pub const STUB_LENGTH: f32 = 20.0;
/// Half the width of the hop drawn where two connections cross.
pub const NOTCH_HALF_WIDTH: f32 = 10.0;
/// Upper bound on the corner rounding size.
pub const VERTEX_SIZE: f32 = 8.0;
/// Ports a shape may commit to one mode. Three of four keeps at least one
/// port reachable for the opposite mode.
pub const PORT_CAPACITY: usize = 3;
/// Hard cap on waypoint case-analysis steps.
pub const MAX_ROUTING_STEPS: usize = 32;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    pub stub_length: f32,
    pub notch_half_width: f32,
    pub vertex_size: f32,
    pub port_capacity: usize,
    pub max_routing_steps: usize,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            stub_length: STUB_LENGTH,
            notch_half_width: NOTCH_HALF_WIDTH,
            vertex_size: VERTEX_SIZE,
            port_capacity: PORT_CAPACITY,
            max_routing_steps: MAX_ROUTING_STEPS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaypointKind {
    #[default]
    Rectangular,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VertexKind {
    /// Sharp rectangular corner.
    Rect,
    #[default]
    Arc,
    Curve,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineKind {
    #[default]
    Straight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntersectionKind {
    #[default]
    Arc,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortPriorityKind {
    #[default]
    Closer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StrategyConfig {
    pub waypoint: WaypointKind,
    pub vertex: VertexKind,
    pub line: LineKind,
    pub intersection: IntersectionKind,
    pub port_priority: PortPriorityKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
    pub padding: f32,
    pub background: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            padding: 40.0,
            background: "#FFFFFF".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub theme: Theme,
    pub routing: RoutingConfig,
    pub strategies: StrategyConfig,
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        let theme = Theme::classic();
        let render = RenderConfig {
            background: theme.background.clone(),
            ..Default::default()
        };
        Self {
            theme,
            routing: RoutingConfig::default(),
            strategies: StrategyConfig::default(),
            render,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<f32>,
    shape_fill: Option<String>,
    shape_stroke: Option<String>,
    line_color: Option<String>,
    line_width: Option<f32>,
    text_color: Option<String>,
    background: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoutingConfigFile {
    stub_length: Option<f32>,
    notch_half_width: Option<f32>,
    vertex_size: Option<f32>,
    port_capacity: Option<usize>,
    max_routing_steps: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenderConfigFile {
    width: Option<f32>,
    height: Option<f32>,
    padding: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    routing: Option<RoutingConfigFile>,
    strategies: Option<StrategyConfig>,
    render: Option<RenderConfigFile>,
}

/// Loads a JSON5 config file and merges it over the defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let parsed: ConfigFile = json5::from_str(contents)?;

    if let Some(theme_name) = parsed.theme.as_deref() {
        if theme_name == "modern" {
            config.theme = Theme::modern();
        } else if theme_name == "classic" || theme_name == "default" {
            config.theme = Theme::classic();
        } else {
            anyhow::bail!("unknown theme `{theme_name}`");
        }
        config.render.background = config.theme.background.clone();
    }

    if let Some(vars) = parsed.theme_variables {
        if let Some(v) = vars.font_family {
            config.theme.font_family = v;
        }
        if let Some(v) = vars.font_size {
            config.theme.font_size = v;
        }
        if let Some(v) = vars.shape_fill {
            config.theme.shape_fill = v;
        }
        if let Some(v) = vars.shape_stroke {
            config.theme.shape_stroke = v;
        }
        if let Some(v) = vars.line_color {
            config.theme.line_color = v;
        }
        if let Some(v) = vars.line_width {
            config.theme.line_width = v;
        }
        if let Some(v) = vars.text_color {
            config.theme.text_color = v;
        }
        if let Some(v) = vars.background {
            config.render.background = v.clone();
            config.theme.background = v;
        }
    }

    if let Some(routing) = parsed.routing {
        if let Some(v) = routing.stub_length {
            config.routing.stub_length = v;
        }
        if let Some(v) = routing.notch_half_width {
            config.routing.notch_half_width = v;
        }
        if let Some(v) = routing.vertex_size {
            config.routing.vertex_size = v;
        }
        if let Some(v) = routing.port_capacity {
            config.routing.port_capacity = v;
        }
        if let Some(v) = routing.max_routing_steps {
            config.routing.max_routing_steps = v;
        }
    }
    validate_routing(&config.routing)?;

    if let Some(strategies) = parsed.strategies {
        config.strategies = strategies;
    }

    if let Some(render) = parsed.render {
        if let Some(v) = render.width {
            config.render.width = v;
        }
        if let Some(v) = render.height {
            config.render.height = v;
        }
        if let Some(v) = render.padding {
            config.render.padding = v;
        }
    }

    Ok(config)
}

fn validate_routing(routing: &RoutingConfig) -> anyhow::Result<()> {
    if !(routing.stub_length.is_finite() && routing.stub_length > 0.0) {
        anyhow::bail!("routing.stubLength must be positive");
    }
    if !(routing.notch_half_width.is_finite() && routing.notch_half_width >= 0.0) {
        anyhow::bail!("routing.notchHalfWidth must not be negative");
    }
    if !(routing.vertex_size.is_finite() && routing.vertex_size >= 0.0) {
        anyhow::bail!("routing.vertexSize must not be negative");
    }
    if !(1..=4).contains(&routing.port_capacity) {
        anyhow::bail!("routing.portCapacity must be between 1 and 4");
    }
    if routing.max_routing_steps == 0 {
        anyhow::bail!("routing.maxRoutingSteps must be at least 1");
    }
    Ok(())
}
