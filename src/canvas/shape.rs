use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geometry::{Bounds, Point};

use super::ShapeId;
use super::port::{Mode, Port, PortPosition};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub(crate) fn validate(self) -> Result<Self> {
        if !(self.width.is_finite() && self.height.is_finite()) || self.width <= 0.0 || self.height <= 0.0 {
            return Err(Error::InvalidGeometry(format!(
                "shape size must be positive and finite, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(self)
    }
}

/// Which connections a shape is willing to take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConnectionPolicy {
    pub accepts_incoming: bool,
    pub accepts_outgoing: bool,
    pub allows_self_loops: bool,
    pub max_connections: Option<usize>,
}

impl Default for ConnectionPolicy {
    fn default() -> Self {
        Self {
            accepts_incoming: true,
            accepts_outgoing: true,
            allows_self_loops: true,
            max_connections: None,
        }
    }
}

impl ConnectionPolicy {
    /// A sink that only takes incoming connections (e.g. an end event).
    pub fn sink() -> Self {
        Self {
            accepts_outgoing: false,
            ..Self::default()
        }
    }

    /// A source that only emits connections (e.g. a start event).
    pub fn source() -> Self {
        Self {
            accepts_incoming: false,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct Shape {
    id: ShapeId,
    label: String,
    position: Point,
    size: Size,
    ports: [Port; 4],
    policy: ConnectionPolicy,
    dragging: bool,
    resizing: bool,
}

impl Shape {
    pub(crate) fn new(id: ShapeId, label: String, position: Point, size: Size, policy: ConnectionPolicy) -> Self {
        Self {
            id,
            label,
            position,
            size,
            ports: PortPosition::ALL.map(Port::new),
            policy,
            dragging: false,
            resizing: false,
        }
    }

    pub fn id(&self) -> ShapeId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn current_size(&self) -> Size {
        self.size
    }

    /// Derived from position and size on every call.
    pub fn bounds(&self) -> Bounds {
        Bounds::from_rect(self.position.x, self.position.y, self.size.width, self.size.height)
    }

    pub fn policy(&self) -> ConnectionPolicy {
        self.policy
    }

    pub fn is_being_dragged(&self) -> bool {
        self.dragging
    }

    pub fn is_being_resized(&self) -> bool {
        self.resizing
    }

    pub fn ports(&self) -> &[Port; 4] {
        &self.ports
    }

    pub fn port(&self, index: usize) -> Option<&Port> {
        self.ports.get(index)
    }

    pub fn port_at(&self, position: PortPosition) -> &Port {
        &self.ports[position.index()]
    }

    /// Anchor point of the port at `position`.
    pub fn port_point(&self, position: PortPosition) -> Point {
        position.anchor(&self.bounds())
    }

    /// Number of ports currently committed to `mode`.
    pub fn committed(&self, mode: Mode) -> usize {
        self.ports.iter().filter(|port| port.mode() == Some(mode)).count()
    }

    /// A port is available when it already serves `mode`, or when it is empty
    /// and fewer than `capacity` ports are committed to `mode`. With the
    /// default capacity of 3 this always leaves one port for the other mode.
    pub fn is_port_available(&self, position: PortPosition, mode: Mode, capacity: usize) -> bool {
        match self.port_at(position).mode() {
            Some(current) => current == mode,
            None => self.committed(mode) < capacity,
        }
    }

    pub fn connection_count(&self) -> usize {
        self.ports.iter().map(|port| port.connections().len()).sum()
    }

    pub fn can_accept_connection(&self, mode: Mode, other: ShapeId, capacity: usize) -> bool {
        let allowed = match mode {
            Mode::Orig => self.policy.accepts_outgoing,
            Mode::Dest => self.policy.accepts_incoming,
        };
        if !allowed {
            return false;
        }
        if other == self.id && !self.policy.allows_self_loops {
            return false;
        }
        if let Some(max) = self.policy.max_connections
            && self.connection_count() >= max
        {
            return false;
        }
        PortPosition::ALL
            .iter()
            .any(|position| self.is_port_available(*position, mode, capacity))
    }

    pub(crate) fn assign_connection_to_port(
        &mut self,
        connection: super::ConnectionId,
        position: PortPosition,
        mode: Mode,
    ) -> bool {
        self.ports[position.index()].add(connection, mode)
    }

    /// Drops `connection` from one slot only, so a self-loop keeps its other end.
    pub(crate) fn release_port(&mut self, connection: super::ConnectionId, position: PortPosition) -> bool {
        self.ports[position.index()].remove(connection)
    }

    pub(crate) fn set_position(&mut self, position: Point) {
        self.position = position;
    }

    pub(crate) fn set_size(&mut self, size: Size) {
        self.size = size;
    }

    pub(crate) fn set_dragging(&mut self, dragging: bool) {
        self.dragging = dragging;
    }

    pub(crate) fn set_resizing(&mut self, resizing: bool) {
        self.resizing = resizing;
    }
}

/// Staged edit of a shape's geometry, committed with [`super::Canvas::apply`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeDraft {
    pub(crate) id: ShapeId,
    pub(crate) position: Option<Point>,
    pub(crate) size: Option<Size>,
}

impl ShapeDraft {
    pub(crate) fn new(id: ShapeId) -> Self {
        Self {
            id,
            position: None,
            size: None,
        }
    }

    pub fn id(&self) -> ShapeId {
        self.id
    }

    pub fn position(mut self, x: f32, y: f32) -> Self {
        self.position = Some(Point::new(x, y));
        self
    }

    pub fn size(mut self, width: f32, height: f32) -> Self {
        self.size = Some(Size::new(width, height));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.position.is_none() && self.size.is_none()
    }
}
