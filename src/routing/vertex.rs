use crate::geometry::Point;

use super::{PathCommand, VertexStrategy};

/// Cubic handle length approximating a quarter circle.
const KAPPA: f32 = 0.552_284_8;

fn lerp(from: Point, to: Point, t: f32) -> Point {
    Point::new(from.x + (to.x - from.x) * t, from.y + (to.y - from.y) * t)
}

/// Keeps the corner sharp.
#[derive(Debug, Clone, Copy, Default)]
pub struct RectVertex;

impl VertexStrategy for RectVertex {
    fn corner(&self, _start: Point, corner: Point, end: Point, out: &mut Vec<PathCommand>) {
        out.push(PathCommand::LineTo(corner));
        out.push(PathCommand::LineTo(end));
    }
}

/// Rounds the corner with a quarter-circle arc.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArcVertex;

impl VertexStrategy for ArcVertex {
    fn corner(&self, start: Point, corner: Point, end: Point, out: &mut Vec<PathCommand>) {
        out.push(PathCommand::CurveTo {
            c1: lerp(start, corner, KAPPA),
            c2: lerp(end, corner, KAPPA),
            to: end,
        });
    }
}

/// Rounds the corner with a quadratic curve pulled toward the vertex.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurveVertex;

impl VertexStrategy for CurveVertex {
    fn corner(&self, start: Point, corner: Point, end: Point, out: &mut Vec<PathCommand>) {
        // quadratic with control `corner`, raised to cubic
        out.push(PathCommand::CurveTo {
            c1: lerp(start, corner, 2.0 / 3.0),
            c2: lerp(end, corner, 2.0 / 3.0),
            to: end,
        });
    }
}
