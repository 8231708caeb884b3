use crate::error::Result;
use crate::geometry::{Axis, EPSILON, NormalizedSegment, Point, clamp, distance, segment_axis, sign};

use super::{IntersectionStrategy, PathCommand};

/// A gap in a segment where the line hops over another connection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Notch {
    pub start: Point,
    pub end: Point,
    pub axis: Axis,
}

/// How a freshly sized notch combines with the notches already placed on
/// the same segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    Append,
    Replace,
}

/// Every strict crossing between the segments of `path` and `other`, keyed
/// by the index of the segment in `path`.
pub fn find_crossings(path: &[Point], other: &[Point]) -> Result<Vec<(usize, Point)>> {
    let theirs = other
        .windows(2)
        .map(|pair| NormalizedSegment::new(pair[0], pair[1]))
        .collect::<Result<Vec<_>>>()?;
    let mut crossings = Vec::new();
    for (idx, pair) in path.windows(2).enumerate() {
        let ours = NormalizedSegment::new(pair[0], pair[1])?;
        for segment in &theirs {
            if let Some(point) = ours.crossing(segment) {
                crossings.push((idx, point));
            }
        }
    }
    Ok(crossings)
}

/// Draws a semicircular hop of fixed half width centred on each crossing.
#[derive(Debug, Clone, Copy)]
pub struct ArcIntersection {
    half_width: f32,
}

impl ArcIntersection {
    pub fn new(half_width: f32) -> Self {
        Self {
            half_width: half_width.max(0.0),
        }
    }
}

impl IntersectionStrategy for ArcIntersection {
    fn notches(&self, start: Point, end: Point, crossings: &[Point]) -> Result<Vec<Notch>> {
        if crossings.is_empty() {
            return Ok(Vec::new());
        }
        let axis = segment_axis(start, end)?;
        let dir = f32::from(sign(end.get(axis) - start.get(axis)));
        let length = (end.get(axis) - start.get(axis)).abs();
        let half = self.half_width;

        // distance of each crossing from `start`, in travel order
        let mut offsets: Vec<f32> = crossings
            .iter()
            .map(|c| (c.get(axis) - start.get(axis)) * dir)
            .filter(|t| *t > EPSILON && *t < length - EPSILON)
            .collect();
        offsets.sort_by(f32::total_cmp);

        let mut spans: Vec<(f32, f32)> = Vec::new();
        for t in offsets {
            let (span, placement) = if length < 2.0 * half {
                ((0.0, length), Placement::Replace)
            } else {
                let lo = clamp(t - half, 0.0, length);
                let hi = clamp(t + half, 0.0, length);
                match spans.last() {
                    Some(&(prev_lo, prev_hi)) if lo <= prev_hi + EPSILON => {
                        ((prev_lo, hi.max(prev_hi)), Placement::Replace)
                    }
                    _ => ((lo, hi), Placement::Append),
                }
            };
            if placement == Placement::Replace {
                spans.pop();
            }
            spans.push(span);
        }

        Ok(spans
            .into_iter()
            .filter(|(lo, hi)| hi - lo > EPSILON)
            .map(|(lo, hi)| Notch {
                start: start.offset(axis, lo * dir),
                end: start.offset(axis, hi * dir),
                axis,
            })
            .collect())
    }

    fn jump(&self, notch: &Notch, out: &mut Vec<PathCommand>) {
        // a cubic with both handles lifted by h peaks at 0.75 h
        let lift = distance(notch.start, notch.end) / 2.0 / 0.75;
        let cross = notch.axis.cross();
        out.push(PathCommand::CurveTo {
            c1: notch.start.offset(cross, -lift),
            c2: notch.end.offset(cross, -lift),
            to: notch.end,
        });
    }

    fn clearance(&self) -> f32 {
        self.half_width
    }
}

/// Ignores crossings entirely.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoIntersection;

impl IntersectionStrategy for NoIntersection {
    fn notches(&self, _start: Point, _end: Point, _crossings: &[Point]) -> Result<Vec<Notch>> {
        Ok(Vec::new())
    }

    fn jump(&self, notch: &Notch, out: &mut Vec<PathCommand>) {
        out.push(PathCommand::LineTo(notch.end));
    }
}
