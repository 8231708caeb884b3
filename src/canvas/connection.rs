use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use serde::Serialize;

use crate::geometry::{EPSILON, Point};
use crate::routing::{PathDescriptor, Strategies};

use super::port::{Mode, PortPosition};
use super::{ConnectionId, ShapeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Unbound,
    Bound,
    /// One end has been lifted off its shape and follows the pointer.
    Dragging,
    Removed,
}

/// What a connection end is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Endpoint {
    Shape(ShapeId),
    /// A loose end following the pointer during a reconnect drag.
    Free(Point),
}

impl Endpoint {
    pub fn shape(self) -> Option<ShapeId> {
        match self {
            Endpoint::Shape(id) => Some(id),
            Endpoint::Free(_) => None,
        }
    }
}

/// A crossing this connection hops over.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Crossing {
    pub connection: ConnectionId,
    pub point: Point,
}

pub(crate) fn slot(mode: Mode) -> usize {
    match mode {
        Mode::Orig => 0,
        Mode::Dest => 1,
    }
}

/// Ends and ports of a connection at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub(crate) struct Attachment {
    pub ends: [Option<Endpoint>; 2],
    pub ports: [Option<PortPosition>; 2],
}

impl Attachment {
    /// The real port held on a shape by `mode`'s end, if any.
    pub fn port_ref(&self, mode: Mode) -> Option<(ShapeId, PortPosition)> {
        let shape = self.ends[slot(mode)]?.shape()?;
        Some((shape, self.ports[slot(mode)]?))
    }

    pub fn shapes(&self) -> Option<(ShapeId, ShapeId)> {
        Some((self.ends[0]?.shape()?, self.ends[1]?.shape()?))
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Reconnect {
    pub end: Mode,
    pub snapshot: Attachment,
    pub last_free: Point,
}

#[derive(Debug, Clone)]
pub struct Connection {
    pub(super) id: ConnectionId,
    pub(super) state: ConnectionState,
    pub(super) attachment: Attachment,
    pub(super) points: Vec<Point>,
    pub(super) intersections: BTreeMap<usize, Vec<Crossing>>,
    pub(super) interceptors: BTreeSet<ConnectionId>,
    pub(super) path: PathDescriptor,
    pub(super) strategies: Rc<Strategies>,
    pub(super) crossings_stale: bool,
    pub(super) reconnect: Option<Reconnect>,
}

impl Connection {
    pub(super) fn new(id: ConnectionId, strategies: Rc<Strategies>) -> Self {
        Self {
            id,
            state: ConnectionState::Unbound,
            attachment: Attachment::default(),
            points: Vec::new(),
            intersections: BTreeMap::new(),
            interceptors: BTreeSet::new(),
            path: PathDescriptor::default(),
            strategies,
            crossings_stale: false,
            reconnect: None,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_removed(&self) -> bool {
        self.state == ConnectionState::Removed
    }

    /// Bound or mid-drag, i.e. holding a routed polyline.
    pub fn is_routed(&self) -> bool {
        matches!(self.state, ConnectionState::Bound | ConnectionState::Dragging)
    }

    pub fn endpoint(&self, mode: Mode) -> Option<Endpoint> {
        self.attachment.ends[slot(mode)]
    }

    pub fn orig_shape(&self) -> Option<ShapeId> {
        self.endpoint(Mode::Orig).and_then(Endpoint::shape)
    }

    pub fn dest_shape(&self) -> Option<ShapeId> {
        self.endpoint(Mode::Dest).and_then(Endpoint::shape)
    }

    /// Port used by `mode`'s end. For a free end this is the side the loose
    /// end is treated as facing.
    pub fn port(&self, mode: Mode) -> Option<PortPosition> {
        self.attachment.ports[slot(mode)]
    }

    pub fn orig_port(&self) -> Option<PortPosition> {
        self.port(Mode::Orig)
    }

    pub fn dest_port(&self) -> Option<PortPosition> {
        self.port(Mode::Dest)
    }

    /// Full routed polyline, anchors included.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn intersections(&self) -> &BTreeMap<usize, Vec<Crossing>> {
        &self.intersections
    }

    /// Connections that recorded a crossing against this one.
    pub fn interceptors(&self) -> &BTreeSet<ConnectionId> {
        &self.interceptors
    }

    pub fn references(&self, other: ConnectionId) -> bool {
        self.intersections
            .values()
            .flatten()
            .any(|crossing| crossing.connection == other)
    }

    pub fn path(&self) -> &PathDescriptor {
        &self.path
    }

    pub fn strategies(&self) -> &Strategies {
        &self.strategies
    }

    /// Crossing detection was skipped during a drag and is still owed.
    pub fn crossings_stale(&self) -> bool {
        self.crossings_stale
    }

    pub fn reconnecting_end(&self) -> Option<Mode> {
        self.reconnect.map(|drag| drag.end)
    }

    pub(super) fn crossing_points(&self) -> BTreeMap<usize, Vec<Point>> {
        self.intersections
            .iter()
            .map(|(segment, crossings)| (*segment, crossings.iter().map(|c| c.point).collect()))
            .collect()
    }

    /// Drops every record against `other`; returns whether anything changed.
    pub(super) fn forget(&mut self, other: ConnectionId) -> bool {
        let mut changed = false;
        self.intersections.retain(|_, crossings| {
            let before = crossings.len();
            crossings.retain(|crossing| crossing.connection != other);
            changed |= crossings.len() != before;
            !crossings.is_empty()
        });
        changed
    }
}

/// Drops duplicate points and merges collinear runs.
pub(crate) fn simplify(points: Vec<Point>) -> Vec<Point> {
    let mut out: Vec<Point> = Vec::with_capacity(points.len());
    for point in points {
        if out.last().is_some_and(|last| last.approx_eq(point)) {
            continue;
        }
        let collinear = match out.as_slice() {
            [.., a, b] => {
                ((a.x - b.x).abs() < EPSILON && (b.x - point.x).abs() < EPSILON)
                    || ((a.y - b.y).abs() < EPSILON && (b.y - point.y).abs() < EPSILON)
            }
            _ => false,
        };
        if collinear {
            out.pop();
        }
        out.push(point);
    }
    out
}

pub(crate) fn same_points(a: &[Point], b: &[Point]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(p, q)| p.approx_eq(*q))
}
