use crate::canvas::Canvas;
use crate::config::RenderConfig;
use crate::geometry::{Bounds, Point};
use crate::routing::ArrowMarker;
use crate::theme::Theme;
use anyhow::Result;
use std::path::Path;

/// Draws every shape and every routed connection of `canvas` as one SVG
/// document. The view box is fitted to the content plus padding.
pub fn render_svg(canvas: &Canvas, theme: &Theme, config: &RenderConfig) -> String {
    let view = content_bounds(canvas).unwrap_or(Bounds::from_rect(0.0, 0.0, 0.0, 0.0));
    let pad = config.padding.max(0.0);
    let min_x = view.left - pad;
    let min_y = view.top - pad;
    let width = (view.width() + 2.0 * pad).max(200.0);
    let height = (view.height() + 2.0 * pad).max(200.0);

    let mut svg = String::new();
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width:.2}\" height=\"{height:.2}\" viewBox=\"{min_x:.2} {min_y:.2} {width:.2} {height:.2}\">",
    ));
    svg.push_str(&format!(
        "<rect x=\"{min_x:.2}\" y=\"{min_y:.2}\" width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        config.background
    ));

    for shape in canvas.shapes() {
        let bounds = shape.bounds();
        svg.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"{r}\" ry=\"{r}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"{}\"/>",
            bounds.left,
            bounds.top,
            bounds.width(),
            bounds.height(),
            theme.shape_fill,
            theme.shape_stroke,
            theme.shape_stroke_width,
            r = theme.shape_corner_radius,
        ));
        let center = bounds.center();
        // nudge the baseline so the text sits on the centre line
        let baseline = center.y + theme.font_size * 0.35;
        svg.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{baseline:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
            center.x,
            escape_xml(&theme.font_family),
            theme.font_size,
            theme.text_color,
            escape_xml(shape.label())
        ));
    }

    for conn in canvas.connections() {
        let path = conn.path();
        if path.is_empty() {
            continue;
        }
        svg.push_str(&format!(
            "<path data-connection=\"{}\" d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{}\"/>",
            conn.id().0,
            path.to_svg_d(),
            theme.line_color,
            theme.line_width
        ));
        if let Some(arrow) = path.arrow {
            svg.push_str(&arrow_svg(&arrow, theme));
        }
    }

    svg.push_str("</svg>");
    svg
}

/// Arrowhead with its tip on the marker point, pointing along +x before
/// rotation.
fn arrow_svg(arrow: &ArrowMarker, theme: &Theme) -> String {
    let len = theme.arrow_size;
    let half = len / 2.0;
    format!(
        "<polygon points=\"0,0 {:.2},{:.2} {:.2},{:.2}\" fill=\"{}\" transform=\"translate({:.2} {:.2}) rotate({:.2})\"/>",
        -len,
        -half,
        -len,
        half,
        theme.line_color,
        arrow.point.x,
        arrow.point.y,
        arrow.rotation
    )
}

fn content_bounds(canvas: &Canvas) -> Option<Bounds> {
    let mut points: Vec<Point> = Vec::new();
    for shape in canvas.shapes() {
        let bounds = shape.bounds();
        points.push(Point::new(bounds.left, bounds.top));
        points.push(Point::new(bounds.right, bounds.bottom));
    }
    for conn in canvas.connections() {
        points.extend_from_slice(conn.points());
    }
    Bounds::of_points(&points)
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.font_family = "Inter".to_string();
    opt.default_size = usvg::Size::from_wh(render_cfg.width, render_cfg.height)
        .or_else(|| usvg::Size::from_wh(800.0, 600.0))
        .ok_or_else(|| anyhow::anyhow!("invalid render size"))?;

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Size;

    fn pair() -> Canvas {
        let mut canvas = Canvas::default();
        let a = canvas
            .add_shape("Alpha & co", Point::new(0.0, 0.0), Size::new(100.0, 50.0))
            .unwrap();
        let b = canvas
            .add_shape("Beta", Point::new(300.0, 0.0), Size::new(100.0, 50.0))
            .unwrap();
        canvas.add_connection(a, b).unwrap().unwrap();
        canvas
    }

    #[test]
    fn render_svg_draws_shapes_and_connections() {
        let svg = render_svg(&pair(), &Theme::modern(), &RenderConfig::default());
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("Alpha &amp; co"));
        assert!(svg.contains("Beta"));
        assert!(svg.contains("d=\"M 100.00 25.00 L 300.00 25.00\""));
        assert!(svg.contains("translate(300.00 25.00) rotate(0.00)"));
    }

    #[test]
    fn view_box_fits_content_with_padding() {
        let config = RenderConfig {
            padding: 10.0,
            ..RenderConfig::default()
        };
        let svg = render_svg(&pair(), &Theme::classic(), &config);
        assert!(svg.contains("viewBox=\"-10.00 -10.00 420.00 200.00\""));
    }

    #[test]
    fn empty_canvas_still_renders() {
        let svg = render_svg(&Canvas::default(), &Theme::classic(), &RenderConfig::default());
        assert!(svg.contains("<svg"));
        assert!(!svg.contains("<path"));
    }
}
