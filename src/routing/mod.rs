//! Pluggable routing strategies.
//!
//! A connection owns one [`Strategies`] bundle, chosen when it is created.
//! Each plug point is an independent trait object so a caller can swap,
//! say, the corner rounding without touching port selection.

use std::fmt;
use std::rc::Rc;

use crate::config::{
    IntersectionKind, LineKind, PortPriorityKind, RoutingConfig, StrategyConfig, VertexKind,
    WaypointKind,
};
use crate::error::Result;
use crate::geometry::{Axis, Bounds, Point};
use crate::canvas::PortPosition;

pub mod intersection;
pub mod path;
pub mod ports;
pub mod vertex;
pub mod waypoints;

pub use intersection::{ArcIntersection, NoIntersection, Notch, find_crossings};
pub use path::{ArrowMarker, PathCommand, PathDescriptor, assemble_path};
pub use ports::{CloserPortPriority, PortRanking};
pub use vertex::{ArcVertex, CurveVertex, RectVertex};
pub use waypoints::RectangularWaypoints;

/// A resolved connection end: anchor point plus the axis and sign of its
/// outward normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortDescriptor {
    pub point: Point,
    pub orientation: Axis,
    pub direction: i8,
}

impl PortDescriptor {
    pub fn new(point: Point, orientation: Axis, direction: i8) -> Self {
        Self {
            point,
            orientation,
            direction,
        }
    }

    pub fn from_port(point: Point, position: PortPosition) -> Self {
        Self::new(point, position.orientation(), position.direction())
    }
}

/// Produces the intermediate points between two port descriptors. The
/// anchors themselves are not part of the output.
pub trait WaypointStrategy: fmt::Debug {
    fn waypoints(
        &self,
        orig: PortDescriptor,
        dest: PortDescriptor,
        config: &RoutingConfig,
    ) -> Result<Vec<Point>>;
}

/// Emits the fragment replacing a corner. The pen sits at `start` and must
/// end at `end`; `corner` is the original polyline vertex.
pub trait VertexStrategy: fmt::Debug {
    fn corner(&self, start: Point, corner: Point, end: Point, out: &mut Vec<PathCommand>);
}

/// Emits a straight run from the current pen position to `to`.
pub trait LineStrategy: fmt::Debug {
    fn line(&self, to: Point, out: &mut Vec<PathCommand>);
}

/// Turns crossing points on one segment into notches and draws them.
pub trait IntersectionStrategy: fmt::Debug {
    /// `start`/`end` delimit the drawable part of the segment. Crossings may
    /// arrive in any order.
    fn notches(&self, start: Point, end: Point, crossings: &[Point]) -> Result<Vec<Notch>>;

    /// Draws the hop over `notch`; the pen sits at `notch.start`.
    fn jump(&self, notch: &Notch, out: &mut Vec<PathCommand>);

    /// Straight run a hop needs on each side of its crossing. Corners next
    /// to a crossing shrink to leave it free.
    fn clearance(&self) -> f32 {
        0.0
    }
}

/// Ranks the four compass ports of each end by geometric fitness.
pub trait PortPriorityStrategy: fmt::Debug {
    fn rank(&self, orig: &Bounds, dest: &Bounds) -> PortRanking;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StraightLine;

impl LineStrategy for StraightLine {
    fn line(&self, to: Point, out: &mut Vec<PathCommand>) {
        out.push(PathCommand::LineTo(to));
    }
}

#[derive(Debug)]
pub struct Strategies {
    pub waypoint: Box<dyn WaypointStrategy>,
    pub vertex: Box<dyn VertexStrategy>,
    pub line: Box<dyn LineStrategy>,
    pub intersection: Box<dyn IntersectionStrategy>,
    pub port_priority: Box<dyn PortPriorityStrategy>,
}

impl Strategies {
    pub fn from_config(kinds: &StrategyConfig, routing: &RoutingConfig) -> Self {
        let waypoint: Box<dyn WaypointStrategy> = match kinds.waypoint {
            WaypointKind::Rectangular => Box::new(RectangularWaypoints),
        };
        let vertex: Box<dyn VertexStrategy> = match kinds.vertex {
            VertexKind::Rect => Box::new(RectVertex),
            VertexKind::Arc => Box::new(ArcVertex),
            VertexKind::Curve => Box::new(CurveVertex),
        };
        let line: Box<dyn LineStrategy> = match kinds.line {
            LineKind::Straight => Box::new(StraightLine),
        };
        let intersection: Box<dyn IntersectionStrategy> = match kinds.intersection {
            IntersectionKind::Arc => Box::new(ArcIntersection::new(routing.notch_half_width)),
            IntersectionKind::None => Box::new(NoIntersection),
        };
        let port_priority: Box<dyn PortPriorityStrategy> = match kinds.port_priority {
            PortPriorityKind::Closer => Box::new(CloserPortPriority),
        };
        Self {
            waypoint,
            vertex,
            line,
            intersection,
            port_priority,
        }
    }

    pub fn shared(kinds: &StrategyConfig, routing: &RoutingConfig) -> Rc<Self> {
        Rc::new(Self::from_config(kinds, routing))
    }
}

impl Default for Strategies {
    fn default() -> Self {
        Self::from_config(&StrategyConfig::default(), &RoutingConfig::default())
    }
}
