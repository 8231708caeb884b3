use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::RoutingConfig;
use crate::error::Result;
use crate::geometry::{EPSILON, Point, distance, segment_axis, sign};

use super::Strategies;

/// One backend-neutral draw command.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PathCommand {
    MoveTo(Point),
    LineTo(Point),
    CurveTo { c1: Point, c2: Point, to: Point },
}

/// Where the arrowhead sits and how far it is rotated, in degrees clockwise
/// from the +x axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ArrowMarker {
    pub point: Point,
    pub rotation: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PathDescriptor {
    pub commands: Vec<PathCommand>,
    pub arrow: Option<ArrowMarker>,
}

impl PathDescriptor {
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// SVG path data for the commands.
    pub fn to_svg_d(&self) -> String {
        let mut d = String::new();
        for command in &self.commands {
            if !d.is_empty() {
                d.push(' ');
            }
            match command {
                PathCommand::MoveTo(p) => d.push_str(&format!("M {:.2} {:.2}", p.x, p.y)),
                PathCommand::LineTo(p) => d.push_str(&format!("L {:.2} {:.2}", p.x, p.y)),
                PathCommand::CurveTo { c1, c2, to } => d.push_str(&format!(
                    "C {:.2} {:.2} {:.2} {:.2} {:.2} {:.2}",
                    c1.x, c1.y, c2.x, c2.y, to.x, to.y
                )),
            }
        }
        d
    }
}

#[derive(Debug, Clone, Copy)]
struct Corner {
    start: Point,
    point: Point,
    end: Point,
}

/// Rounded corner for every interior point, sized so that no corner eats
/// more than half of its outgoing segment or overlaps the previous corner.
/// A corner also stops `clearance` short of any crossing on its two
/// segments, so the hop over it stays on the straight part.
fn corners(
    points: &[Point],
    crossings: &BTreeMap<usize, Vec<Point>>,
    vertex_size: f32,
    clearance: f32,
) -> Result<Vec<Option<Corner>>> {
    let mut out = Vec::with_capacity(points.len().saturating_sub(2));
    let Some(&first) = points.first() else {
        return Ok(out);
    };
    let mut cursor = first;
    for (idx, window) in points.windows(3).enumerate() {
        let (prev, point, next) = (window[0], window[1], window[2]);
        let incoming = segment_axis(prev, point)?;
        let outgoing = segment_axis(point, next)?;
        if incoming == outgoing {
            cursor = point;
            out.push(None);
            continue;
        }
        let free = [idx, idx + 1]
            .iter()
            .filter_map(|segment| crossings.get(segment))
            .flatten()
            .map(|hit| (distance(*hit, point) - clearance).max(0.0))
            .fold(f32::INFINITY, f32::min);
        let size = vertex_size
            .min(distance(cursor, point))
            .min(distance(point, next) / 2.0)
            .min(free);
        if size < EPSILON {
            cursor = point;
            out.push(None);
            continue;
        }
        let back = f32::from(sign(point.get(incoming) - prev.get(incoming)));
        let forward = f32::from(sign(next.get(outgoing) - point.get(outgoing)));
        let corner = Corner {
            start: point.offset(incoming, -back * size),
            point,
            end: point.offset(outgoing, forward * size),
        };
        cursor = corner.end;
        out.push(Some(corner));
    }
    Ok(out)
}

fn arrow(points: &[Point]) -> Option<ArrowMarker> {
    let last = *points.last()?;
    points
        .windows(2)
        .rev()
        .find(|pair| distance(pair[0], pair[1]) > EPSILON)
        .map(|pair| ArrowMarker {
            point: last,
            rotation: (pair[1].y - pair[0].y).atan2(pair[1].x - pair[0].x).to_degrees(),
        })
}

/// Builds the draw commands for a routed polyline: straight runs, hops at
/// `crossings` (keyed by segment index) and rounded corners.
pub fn assemble_path(
    points: &[Point],
    crossings: &BTreeMap<usize, Vec<Point>>,
    strategies: &Strategies,
    config: &RoutingConfig,
) -> Result<PathDescriptor> {
    let Some(&first) = points.first() else {
        return Ok(PathDescriptor::default());
    };
    for pair in points.windows(2) {
        segment_axis(pair[0], pair[1])?;
    }
    let corners = corners(
        points,
        crossings,
        config.vertex_size,
        strategies.intersection.clearance(),
    )?;
    let mut commands = vec![PathCommand::MoveTo(first)];
    let mut pen = first;
    let last = points.len() - 1;

    for idx in 0..last {
        let seg_end = if idx + 1 < last {
            corners[idx].map_or(points[idx + 1], |c| c.start)
        } else {
            points[last]
        };

        if let Some(hits) = crossings.get(&idx)
            && !hits.is_empty()
            && !pen.approx_eq(seg_end)
        {
            for notch in strategies.intersection.notches(pen, seg_end, hits)? {
                if !pen.approx_eq(notch.start) {
                    strategies.line.line(notch.start, &mut commands);
                }
                strategies.intersection.jump(&notch, &mut commands);
                pen = notch.end;
            }
        }
        if !pen.approx_eq(seg_end) {
            strategies.line.line(seg_end, &mut commands);
            pen = seg_end;
        }

        if idx + 1 < last
            && let Some(corner) = corners[idx]
        {
            strategies
                .vertex
                .corner(corner.start, corner.point, corner.end, &mut commands);
            pen = corner.end;
        }
    }

    Ok(PathDescriptor {
        commands,
        arrow: arrow(points),
    })
}
