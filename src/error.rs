use crate::canvas::{ConnectionId, ShapeId};
use crate::geometry::Point;

/// Contract violations raised by the routing core.
///
/// Capability refusals (no free port, a shape declining a connection) are not
/// errors; [`crate::Canvas::connect`] reports them as `Ok(false)`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown shape: {0}")]
    UnknownShape(ShapeId),
    #[error("unknown connection: {0}")]
    UnknownConnection(ConnectionId),
    #[error("connection {0} has been removed")]
    ConnectionRemoved(ConnectionId),
    #[error("connection {0} is not bound to both shapes")]
    NotBound(ConnectionId),
    #[error("connection {0} has no reconnect drag in progress")]
    NotDragging(ConnectionId),
    #[error("segment ({}, {}) -> ({}, {}) is not axis-aligned", from.x, from.y, to.x, to.y)]
    DiagonalSegment { from: Point, to: Point },
    #[error("segment endpoints coincide at ({}, {})", point.x, point.y)]
    CoincidentPoints { point: Point },
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),
    #[error("waypoint routing did not converge after {steps} steps")]
    RoutingDidNotConverge { steps: usize },
    #[error("connection {0} is already being recomputed")]
    Reentrant(ConnectionId),
    #[error("scene references unknown shape `{0}`")]
    UnknownShapeName(String),
    #[error("scene declares shape `{0}` more than once")]
    DuplicateShapeName(String),
}

pub type Result<T> = std::result::Result<T, Error>;
