use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub shape_fill: String,
    pub shape_stroke: String,
    pub shape_stroke_width: f32,
    pub shape_corner_radius: f32,
    pub line_color: String,
    pub line_width: f32,
    pub arrow_size: f32,
    pub text_color: String,
    pub background: String,
}

impl Theme {
    pub fn classic() -> Self {
        Self {
            font_family: "\"trebuchet ms\", verdana, arial, sans-serif".to_string(),
            font_size: 14.0,
            shape_fill: "#FFFFFF".to_string(),
            shape_stroke: "#333333".to_string(),
            shape_stroke_width: 1.5,
            shape_corner_radius: 6.0,
            line_color: "#333333".to_string(),
            line_width: 1.4,
            arrow_size: 10.0,
            text_color: "#333333".to_string(),
            background: "#FFFFFF".to_string(),
        }
    }

    pub fn modern() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 13.0,
            shape_fill: "#F8FAFF".to_string(),
            shape_stroke: "#C7D2E5".to_string(),
            shape_stroke_width: 1.2,
            shape_corner_radius: 10.0,
            line_color: "#7A8AA6".to_string(),
            line_width: 1.4,
            arrow_size: 9.0,
            text_color: "#1C2430".to_string(),
            background: "#FFFFFF".to_string(),
        }
    }
}
