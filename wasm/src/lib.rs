use ortho_connect::config::{IntersectionKind, VertexKind};
use ortho_connect::{Config, Theme, render_scene_svg as render_scene};
use serde::Deserialize;
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SceneRenderOptions {
    theme: Option<String>,
    font_family: Option<String>,
    font_size: Option<f32>,
    vertex: Option<VertexKind>,
    intersection: Option<IntersectionKind>,
    stub_length: Option<f32>,
}

fn build_config(options: SceneRenderOptions) -> Config {
    let mut config = Config::default();
    if options.theme.as_deref() == Some("modern") {
        config.theme = Theme::modern();
        config.render.background = config.theme.background.clone();
    }
    if let Some(font_family) = options.font_family {
        config.theme.font_family = font_family;
    }
    if let Some(font_size) = options.font_size {
        config.theme.font_size = font_size;
    }
    if let Some(vertex) = options.vertex {
        config.strategies.vertex = vertex;
    }
    if let Some(intersection) = options.intersection {
        config.strategies.intersection = intersection;
    }
    if let Some(stub_length) = options.stub_length.filter(|v| v.is_finite() && *v > 0.0) {
        config.routing.stub_length = stub_length;
    }
    config
}

#[wasm_bindgen]
pub fn render_scene_svg(scene_json: &str, options_json: Option<String>) -> Result<String, JsValue> {
    let options = if let Some(raw_options) = options_json {
        serde_json::from_str::<SceneRenderOptions>(&raw_options)
            .map_err(|error| JsValue::from_str(&error.to_string()))?
    } else {
        SceneRenderOptions::default()
    };

    render_scene(scene_json, &build_config(options)).map_err(|error| JsValue::from_str(&error.to_string()))
}

#[cfg(test)]
mod tests {
    use ortho_connect::render_scene_svg;

    use crate::{SceneRenderOptions, build_config};

    #[test]
    fn options_select_strategies() {
        let options: SceneRenderOptions =
            serde_json::from_str(r#"{ "theme": "modern", "vertex": "rect", "intersection": "none" }"#).unwrap();
        let config = build_config(options);
        assert_eq!(config.strategies.vertex, ortho_connect::config::VertexKind::Rect);
        assert_eq!(config.theme.font_size, 13.0);
    }

    #[test]
    fn renders_crossing_scene() {
        let scene = r#"{
            "shapes": [
                { "id": "p1", "x": 0, "y": 0, "width": 100, "height": 50 },
                { "id": "p2", "x": 400, "y": 0, "width": 100, "height": 50 },
                { "id": "q1", "x": 200, "y": -200, "width": 100, "height": 50 },
                { "id": "q2", "x": 200, "y": 200, "width": 100, "height": 50 }
            ],
            "connections": [ { "from": "p1", "to": "p2" }, { "from": "q1", "to": "q2" } ]
        }"#;
        let svg = render_scene_svg(scene, &build_config(SceneRenderOptions::default()))
            .expect("crossing scene should render");
        assert!(svg.contains("<svg"));
        assert!(svg.contains(" C "));
    }
}
