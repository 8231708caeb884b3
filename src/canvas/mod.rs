//! Arena registry of shapes and connections.
//!
//! Shapes, ports and connections never hold references to each other; they
//! are linked by [`ShapeId`] and [`ConnectionId`] and all mutation goes
//! through [`Canvas`]. Removed connections stay in the arena as tombstones so
//! a stale id reports [`Error::ConnectionRemoved`] instead of aliasing a new
//! connection.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::config::{Config, RoutingConfig, StrategyConfig};
use crate::error::{Error, Result};
use crate::geometry::{Bounds, Point, segment_axis};
use crate::routing::{PathDescriptor, PortDescriptor, Strategies, assemble_path, find_crossings};

pub mod connection;
pub mod port;
pub mod shape;

pub use connection::{Connection, ConnectionState, Crossing, Endpoint};
pub use port::{Mode, Port, PortPosition};
pub use shape::{ConnectionPolicy, Shape, ShapeDraft, Size};

use connection::{Attachment, Reconnect, same_points, simplify, slot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ShapeId(pub u32);

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "shape#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ConnectionId(pub u32);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "connection#{}", self.0)
    }
}

/// Notifications queued for the embedding editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanvasEvent {
    Connect {
        connection: ConnectionId,
        orig: ShapeId,
        dest: ShapeId,
    },
    Disconnect {
        connection: ConnectionId,
        orig: ShapeId,
        dest: ShapeId,
    },
    /// The port an end holds on `shape` changed. `None` means no port on
    /// that shape.
    PortChange {
        connection: ConnectionId,
        mode: Mode,
        shape: ShapeId,
        from: Option<PortPosition>,
        to: Option<PortPosition>,
    },
}

#[derive(Debug)]
pub struct Canvas {
    shapes: BTreeMap<ShapeId, Shape>,
    connections: Vec<Connection>,
    next_shape: u32,
    routing: RoutingConfig,
    strategies: Rc<Strategies>,
    events: Vec<CanvasEvent>,
    in_flight: BTreeSet<ConnectionId>,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(RoutingConfig::default(), &StrategyConfig::default())
    }
}

impl Canvas {
    pub fn new(routing: RoutingConfig, strategies: &StrategyConfig) -> Self {
        let strategies = Strategies::shared(strategies, &routing);
        Self {
            shapes: BTreeMap::new(),
            connections: Vec::new(),
            next_shape: 0,
            routing,
            strategies,
            events: Vec::new(),
            in_flight: BTreeSet::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.routing.clone(), &config.strategies)
    }

    pub fn routing_config(&self) -> &RoutingConfig {
        &self.routing
    }

    pub fn drain_events(&mut self) -> Vec<CanvasEvent> {
        std::mem::take(&mut self.events)
    }

    // ---- shapes ----

    pub fn add_shape(&mut self, label: impl Into<String>, position: Point, size: Size) -> Result<ShapeId> {
        self.add_shape_with_policy(label, position, size, ConnectionPolicy::default())
    }

    pub fn add_shape_with_policy(
        &mut self,
        label: impl Into<String>,
        position: Point,
        size: Size,
        policy: ConnectionPolicy,
    ) -> Result<ShapeId> {
        if !position.is_finite() {
            return Err(Error::InvalidGeometry(format!(
                "shape position ({}, {}) is not finite",
                position.x, position.y
            )));
        }
        let size = size.validate()?;
        let id = ShapeId(self.next_shape);
        self.next_shape += 1;
        self.shapes
            .insert(id, Shape::new(id, label.into(), position, size, policy));
        debug!(shape = %id, "added shape");
        Ok(id)
    }

    pub fn shape(&self, id: ShapeId) -> Result<&Shape> {
        self.shapes.get(&id).ok_or(Error::UnknownShape(id))
    }

    fn shape_mut(&mut self, id: ShapeId) -> Result<&mut Shape> {
        self.shapes.get_mut(&id).ok_or(Error::UnknownShape(id))
    }

    pub fn shapes(&self) -> impl Iterator<Item = &Shape> {
        self.shapes.values()
    }

    /// Connections holding a port on `id`, including ones mid-drag whose
    /// fixed end sits on it.
    pub fn attached_connections(&self, id: ShapeId) -> Result<Vec<ConnectionId>> {
        let shape = self.shape(id)?;
        let attached: BTreeSet<ConnectionId> = shape
            .ports()
            .iter()
            .flat_map(|port| port.connections().iter().copied())
            .collect();
        Ok(attached.into_iter().collect())
    }

    /// Shapes on the far end of every connection attached to `id`.
    pub fn connected_shapes(&self, id: ShapeId) -> Result<Vec<ShapeId>> {
        self.shape(id)?;
        let shapes: BTreeSet<ShapeId> = self
            .connections
            .iter()
            .filter(|conn| conn.is_routed())
            .filter_map(|conn| {
                let (orig, dest) = (conn.orig_shape(), conn.dest_shape());
                if orig == Some(id) {
                    dest
                } else if dest == Some(id) {
                    orig
                } else {
                    None
                }
            })
            .collect();
        Ok(shapes.into_iter().collect())
    }

    pub fn edit_shape(&self, id: ShapeId) -> Result<ShapeDraft> {
        self.shape(id)?;
        Ok(ShapeDraft::new(id))
    }

    /// Commits a staged edit and recomputes every attached connection once.
    pub fn apply(&mut self, draft: ShapeDraft) -> Result<()> {
        self.shape(draft.id)?;
        if draft.is_empty() {
            return Ok(());
        }
        if let Some(position) = draft.position
            && !position.is_finite()
        {
            return Err(Error::InvalidGeometry(format!(
                "shape position ({}, {}) is not finite",
                position.x, position.y
            )));
        }
        let size = draft.size.map(Size::validate).transpose()?;
        let shape = self.shape_mut(draft.id)?;
        if let Some(position) = draft.position {
            shape.set_position(position);
        }
        if let Some(size) = size {
            shape.set_size(size);
        }
        for conn in self.attached_connections(draft.id)? {
            self.recompute(conn)?;
        }
        Ok(())
    }

    pub fn move_shape(&mut self, id: ShapeId, x: f32, y: f32) -> Result<()> {
        let draft = self.edit_shape(id)?.position(x, y);
        self.apply(draft)
    }

    pub fn resize_shape(&mut self, id: ShapeId, width: f32, height: f32) -> Result<()> {
        let draft = self.edit_shape(id)?.size(width, height);
        self.apply(draft)
    }

    pub fn begin_drag(&mut self, id: ShapeId) -> Result<()> {
        self.shape_mut(id)?.set_dragging(true);
        Ok(())
    }

    pub fn end_drag(&mut self, id: ShapeId) -> Result<()> {
        self.shape_mut(id)?.set_dragging(false);
        self.settle(id)
    }

    pub fn begin_resize(&mut self, id: ShapeId) -> Result<()> {
        self.shape_mut(id)?.set_resizing(true);
        Ok(())
    }

    pub fn end_resize(&mut self, id: ShapeId) -> Result<()> {
        self.shape_mut(id)?.set_resizing(false);
        self.settle(id)
    }

    /// Removes the shape together with every connection touching it.
    pub fn remove_shape(&mut self, id: ShapeId) -> Result<Vec<ConnectionId>> {
        self.shape(id)?;
        let doomed: Vec<ConnectionId> = self
            .connections
            .iter()
            .filter(|conn| !conn.is_removed() && touches(conn, id))
            .map(Connection::id)
            .collect();
        for conn in &doomed {
            self.remove_connection(*conn)?;
        }
        self.shapes.remove(&id);
        debug!(shape = %id, removed = doomed.len(), "removed shape");
        Ok(doomed)
    }

    // ---- connections ----

    /// Looks up a connection, tombstones included.
    pub fn connection(&self, id: ConnectionId) -> Result<&Connection> {
        self.connections
            .get(id.0 as usize)
            .ok_or(Error::UnknownConnection(id))
    }

    fn live(&self, id: ConnectionId) -> Result<&Connection> {
        let conn = self.connection(id)?;
        if conn.is_removed() {
            return Err(Error::ConnectionRemoved(id));
        }
        Ok(conn)
    }

    fn conn_mut(&mut self, id: ConnectionId) -> Result<&mut Connection> {
        self.connections
            .get_mut(id.0 as usize)
            .ok_or(Error::UnknownConnection(id))
    }

    /// Every connection that has not been removed.
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter().filter(|conn| !conn.is_removed())
    }

    /// A fresh, unbound connection using the canvas' default strategies.
    pub fn create_connection(&mut self) -> ConnectionId {
        let strategies = Rc::clone(&self.strategies);
        self.create_connection_with(strategies)
    }

    pub fn create_connection_with(&mut self, strategies: Rc<Strategies>) -> ConnectionId {
        let id = ConnectionId(self.connections.len() as u32);
        self.connections.push(Connection::new(id, strategies));
        id
    }

    /// Creates and connects in one go. `Ok(None)` when either shape refuses,
    /// in which case no connection is left behind.
    pub fn add_connection(&mut self, orig: ShapeId, dest: ShapeId) -> Result<Option<ConnectionId>> {
        let id = self.create_connection();
        match self.connect(id, orig, dest) {
            Ok(true) => Ok(Some(id)),
            Ok(false) => {
                self.connections.pop();
                Ok(None)
            }
            Err(err) => {
                if self.live(id)?.state() == ConnectionState::Unbound {
                    self.connections.pop();
                } else {
                    self.remove_connection(id)?;
                }
                Err(err)
            }
        }
    }

    /// Binds `id` to `orig` -> `dest`, picking ports and routing it.
    ///
    /// Returns `Ok(false)` without touching any state when a shape refuses
    /// the connection or has no port for it; a previously bound connection
    /// keeps its old pair and ports, and a reconnect drag in progress stays
    /// active. An accepted connect cancels such a drag first.
    pub fn connect(&mut self, id: ConnectionId, orig: ShapeId, dest: ShapeId) -> Result<bool> {
        let conn = self.live(id)?;
        self.shape(orig)?;
        self.shape(dest)?;
        let current = conn.attachment;
        let strategies = Rc::clone(&conn.strategies);

        // ports are chosen as if `id` held nothing, which is also what
        // cancelling a drag and releasing the restored pair leaves behind
        self.release_ports(id, &current);
        let capacity = self.routing.port_capacity;
        let accepted = self.shape(orig)?.can_accept_connection(Mode::Orig, dest, capacity)
            && self.shape(dest)?.can_accept_connection(Mode::Dest, orig, capacity);
        let ends = [Endpoint::Shape(orig), Endpoint::Shape(dest)];
        let selected = if accepted {
            self.select_ports(&strategies, ends)
        } else {
            None
        };
        self.hold_ports(id, &current);
        let Some(ports) = selected else {
            debug!(connection = %id, orig = %orig, dest = %dest, "connection refused");
            return Ok(false);
        };

        if self.live(id)?.reconnect.is_some() {
            self.cancel_reconnect(id)?;
        }
        let conn = self.live(id)?;
        let previous = conn.attachment;
        let was_bound = conn.state == ConnectionState::Bound;

        let attachment = Attachment {
            ends: ends.map(Some),
            ports: ports.map(Some),
        };
        self.release_ports(id, &previous);
        self.hold_ports(id, &attachment);
        let conn = self.conn_mut(id)?;
        conn.attachment = attachment;
        conn.state = ConnectionState::Bound;
        conn.crossings_stale = false;

        if was_bound
            && let Some((old_orig, old_dest)) = previous.shapes()
            && (old_orig, old_dest) != (orig, dest)
        {
            self.events.push(CanvasEvent::Disconnect {
                connection: id,
                orig: old_orig,
                dest: old_dest,
            });
        }
        self.events.push(CanvasEvent::Connect {
            connection: id,
            orig,
            dest,
        });
        self.port_events(id, &previous, &attachment);
        debug!(
            connection = %id,
            orig = %orig,
            dest = %dest,
            orig_port = %ports[0],
            dest_port = %ports[1],
            "connected"
        );
        self.recompute(id)?;
        Ok(true)
    }

    /// Re-derives ports and recomputes points, crossings and path.
    pub fn make(&mut self, id: ConnectionId) -> Result<()> {
        if self.live(id)?.state() == ConnectionState::Unbound {
            return Err(Error::NotBound(id));
        }
        self.recompute(id)
    }

    /// Releases both ports, clears crossing bookkeeping on both sides and
    /// leaves a tombstone.
    pub fn remove_connection(&mut self, id: ConnectionId) -> Result<()> {
        let conn = self.live(id)?;
        let attachment = conn.attachment;
        let pair = if conn.is_routed() {
            conn.reconnect
                .map_or(attachment, |drag| drag.snapshot)
                .shapes()
        } else {
            None
        };

        self.drop_interceptor_records(id)?;
        self.drop_own_records(id)?;
        self.release_ports(id, &attachment);

        let conn = self.conn_mut(id)?;
        conn.state = ConnectionState::Removed;
        conn.attachment = Attachment::default();
        conn.points.clear();
        conn.path = PathDescriptor::default();
        conn.reconnect = None;
        conn.crossings_stale = false;

        self.port_events(id, &attachment, &Attachment::default());
        if let Some((orig, dest)) = pair {
            self.events.push(CanvasEvent::Disconnect {
                connection: id,
                orig,
                dest,
            });
        }
        debug!(connection = %id, "removed connection");
        Ok(())
    }

    // ---- reconnect drag ----

    /// Lifts `end` off its shape so it can follow the pointer. The bound
    /// state is kept for [`Self::cancel_reconnect`].
    pub fn begin_reconnect(&mut self, id: ConnectionId, end: Mode) -> Result<()> {
        let conn = self.live(id)?;
        if conn.state != ConnectionState::Bound {
            return Err(Error::NotBound(id));
        }
        let snapshot = conn.attachment;
        let (shape, port) = snapshot.port_ref(end).ok_or(Error::NotBound(id))?;
        let anchor = self.shape(shape)?.port_point(port);

        let mut lifted = snapshot;
        lifted.ends[slot(end)] = Some(Endpoint::Free(anchor));
        lifted.ports[slot(end)] = None;
        self.shape_mut(shape)?.release_port(id, port);

        let conn = self.conn_mut(id)?;
        conn.attachment = lifted;
        conn.state = ConnectionState::Dragging;
        conn.reconnect = Some(Reconnect {
            end,
            snapshot,
            last_free: anchor,
        });
        self.port_events(id, &snapshot, &lifted);
        debug!(connection = %id, ?end, "reconnect started");
        self.recompute(id)
    }

    /// Moves the loose end to `point`, dropping any hovered candidate.
    pub fn drag_end_to(&mut self, id: ConnectionId, point: Point) -> Result<()> {
        let conn = self.live(id)?;
        let drag = conn.reconnect.ok_or(Error::NotDragging(id))?;
        if !point.is_finite() {
            return Err(Error::InvalidGeometry(format!(
                "drag point ({}, {}) is not finite",
                point.x, point.y
            )));
        }
        let before = conn.attachment;
        let mut after = before;
        after.ends[slot(drag.end)] = Some(Endpoint::Free(point));
        after.ports[slot(drag.end)] = None;
        if let Some((shape, port)) = before.port_ref(drag.end) {
            self.shape_mut(shape)?.release_port(id, port);
        }

        let conn = self.conn_mut(id)?;
        conn.attachment = after;
        conn.reconnect = Some(Reconnect {
            last_free: point,
            ..drag
        });
        self.port_events(id, &before, &after);
        self.recompute(id)
    }

    /// Speculatively docks the loose end on `shape`. Returns false, leaving
    /// the end loose, when the shape refuses or has no port for it.
    pub fn hover(&mut self, id: ConnectionId, shape: ShapeId) -> Result<bool> {
        let conn = self.live(id)?;
        let drag = conn.reconnect.ok_or(Error::NotDragging(id))?;
        self.shape(shape)?;
        let before = conn.attachment;
        if before.ends[slot(drag.end)] == Some(Endpoint::Shape(shape)) {
            return Ok(true);
        }
        let strategies = Rc::clone(&conn.strategies);
        let other = before.ends[slot(drag.end.opposite())]
            .and_then(Endpoint::shape)
            .ok_or(Error::NotBound(id))?;

        if let Some((previous, port)) = before.port_ref(drag.end) {
            self.shape_mut(previous)?.release_port(id, port);
        }
        let mut loose = before;
        loose.ends[slot(drag.end)] = Some(Endpoint::Free(drag.last_free));
        loose.ports[slot(drag.end)] = None;
        let mut candidate = loose;
        candidate.ends[slot(drag.end)] = Some(Endpoint::Shape(shape));

        let capacity = self.routing.port_capacity;
        let mut accepted = self
            .shape(shape)?
            .can_accept_connection(drag.end, other, capacity);
        if accepted && let (Some(orig), Some(dest)) = (candidate.ends[0], candidate.ends[1]) {
            // the fixed end may move to a better port too
            self.release_ports(id, &loose);
            accepted = self.select_ports(&strategies, [orig, dest]).is_some();
            self.hold_ports(id, &loose);
        }

        let target = if accepted { candidate } else { loose };
        self.conn_mut(id)?.attachment = target;
        self.port_events(id, &before, &target);
        if !accepted {
            debug!(connection = %id, shape = %shape, "hover refused");
        }
        if target != before {
            self.recompute(id)?;
        }
        Ok(accepted)
    }

    /// Docks the loose end on `shape` and ends the drag. On refusal the drag
    /// stays active so the caller can keep dragging or cancel.
    pub fn finish_reconnect(&mut self, id: ConnectionId, shape: ShapeId) -> Result<bool> {
        let drag = self.live(id)?.reconnect.ok_or(Error::NotDragging(id))?;
        if !self.hover(id, shape)? {
            return Ok(false);
        }
        let conn = self.conn_mut(id)?;
        conn.reconnect = None;
        conn.state = ConnectionState::Bound;
        let (orig, dest) = conn.attachment.shapes().ok_or(Error::NotBound(id))?;
        if let Some((old_orig, old_dest)) = drag.snapshot.shapes()
            && (old_orig, old_dest) != (orig, dest)
        {
            self.events.push(CanvasEvent::Disconnect {
                connection: id,
                orig: old_orig,
                dest: old_dest,
            });
        }
        self.events.push(CanvasEvent::Connect {
            connection: id,
            orig,
            dest,
        });
        debug!(connection = %id, orig = %orig, dest = %dest, "reconnected");
        self.recompute(id)?;
        Ok(true)
    }

    /// Releases speculative reservations and restores the pre-drag pair and
    /// ports.
    pub fn cancel_reconnect(&mut self, id: ConnectionId) -> Result<()> {
        let conn = self.live(id)?;
        let drag = conn.reconnect.ok_or(Error::NotDragging(id))?;
        let before = conn.attachment;
        self.release_ports(id, &before);
        self.hold_ports(id, &drag.snapshot);

        let conn = self.conn_mut(id)?;
        conn.attachment = drag.snapshot;
        conn.reconnect = None;
        conn.state = ConnectionState::Bound;
        self.port_events(id, &before, &drag.snapshot);
        debug!(connection = %id, "reconnect cancelled");
        self.recompute(id)
    }

    // ---- internals ----

    fn release_ports(&mut self, id: ConnectionId, attachment: &Attachment) {
        for mode in [Mode::Orig, Mode::Dest] {
            if let Some((shape, port)) = attachment.port_ref(mode)
                && let Some(shape) = self.shapes.get_mut(&shape)
            {
                shape.release_port(id, port);
            }
        }
    }

    fn hold_ports(&mut self, id: ConnectionId, attachment: &Attachment) {
        for mode in [Mode::Orig, Mode::Dest] {
            if let Some((shape_id, port)) = attachment.port_ref(mode)
                && let Some(shape) = self.shapes.get_mut(&shape_id)
                && !shape.assign_connection_to_port(id, port, mode)
            {
                warn!(connection = %id, shape = %shape_id, %port, "port already serves the other mode");
            }
        }
    }

    /// Best available port per end. Free ends get the side they face.
    fn select_ports(&self, strategies: &Strategies, ends: [Endpoint; 2]) -> Option<[PortPosition; 2]> {
        let bounds = |end: Endpoint| match end {
            Endpoint::Shape(id) => self.shapes.get(&id).map(Shape::bounds),
            Endpoint::Free(point) => Some(Bounds::from_point(point)),
        };
        let ranking = strategies
            .port_priority
            .rank(&bounds(ends[0])?, &bounds(ends[1])?);
        let capacity = self.routing.port_capacity;

        let orig = match ends[0] {
            Endpoint::Free(_) => ranking.orig[0],
            Endpoint::Shape(id) => {
                let shape = self.shapes.get(&id)?;
                ranking
                    .orig
                    .into_iter()
                    .find(|port| shape.is_port_available(*port, Mode::Orig, capacity))?
            }
        };
        let dest = match ends[1] {
            Endpoint::Free(_) => ranking.dest[0],
            Endpoint::Shape(id) => {
                let shape = self.shapes.get(&id)?;
                let self_loop = ends[0].shape() == Some(id);
                ranking.dest.into_iter().find(|port| {
                    !(self_loop && *port == orig) && shape.is_port_available(*port, Mode::Dest, capacity)
                })?
            }
        };
        Some([orig, dest])
    }

    fn port_events(&mut self, id: ConnectionId, before: &Attachment, after: &Attachment) {
        for mode in [Mode::Orig, Mode::Dest] {
            let old = before.port_ref(mode);
            let new = after.port_ref(mode);
            if old == new {
                continue;
            }
            if let Some((shape, port)) = old
                && new.map(|(s, _)| s) != Some(shape)
            {
                self.events.push(CanvasEvent::PortChange {
                    connection: id,
                    mode,
                    shape,
                    from: Some(port),
                    to: None,
                });
            }
            if let Some((shape, port)) = new {
                let from = old.filter(|(s, _)| *s == shape).map(|(_, p)| p);
                self.events.push(CanvasEvent::PortChange {
                    connection: id,
                    mode,
                    shape,
                    from,
                    to: Some(port),
                });
            }
        }
    }

    fn recompute(&mut self, id: ConnectionId) -> Result<()> {
        if !self.in_flight.insert(id) {
            return Err(Error::Reentrant(id));
        }
        let result = self.recompute_inner(id);
        self.in_flight.remove(&id);
        result
    }

    fn recompute_inner(&mut self, id: ConnectionId) -> Result<()> {
        self.rederive_ports(id)?;
        let points = self.route_points(id)?;
        let moved = !same_points(&self.live(id)?.points, &points);
        if moved {
            // hops others drew over the old geometry are stale
            self.drop_interceptor_records(id)?;
        }
        self.drop_own_records(id)?;
        self.conn_mut(id)?.points = points;

        let suspended = self.detection_suspended(self.live(id)?);
        if suspended {
            self.conn_mut(id)?.crossings_stale = true;
        } else {
            self.detect_crossings(id)?;
        }
        self.refresh_path(id)?;
        trace!(
            connection = %id,
            points = self.live(id)?.points.len(),
            moved,
            suspended,
            "recomputed connection"
        );
        Ok(())
    }

    /// Releases own ports and picks them again; keeps the previous ports if
    /// nothing better is available.
    fn rederive_ports(&mut self, id: ConnectionId) -> Result<()> {
        let conn = self.live(id)?;
        let before = conn.attachment;
        let strategies = Rc::clone(&conn.strategies);
        let (Some(orig), Some(dest)) = (before.ends[0], before.ends[1]) else {
            return Err(Error::NotBound(id));
        };

        self.release_ports(id, &before);
        let ports = match self.select_ports(&strategies, [orig, dest]) {
            Some(ports) => ports,
            None => match (before.ports[0], before.ports[1]) {
                (Some(orig_port), Some(dest_port)) => {
                    warn!(connection = %id, "port selection failed, keeping previous ports");
                    [orig_port, dest_port]
                }
                _ => {
                    self.hold_ports(id, &before);
                    return Err(Error::NotBound(id));
                }
            },
        };
        let after = Attachment {
            ends: before.ends,
            ports: ports.map(Some),
        };
        self.hold_ports(id, &after);
        self.conn_mut(id)?.attachment = after;
        self.port_events(id, &before, &after);
        Ok(())
    }

    fn descriptor(&self, conn: &Connection, mode: Mode) -> Result<PortDescriptor> {
        let position = conn.port(mode).ok_or(Error::NotBound(conn.id))?;
        let point = match conn.endpoint(mode) {
            Some(Endpoint::Shape(shape)) => self.shape(shape)?.port_point(position),
            Some(Endpoint::Free(point)) => point,
            None => return Err(Error::NotBound(conn.id)),
        };
        Ok(PortDescriptor::from_port(point, position))
    }

    fn route_points(&self, id: ConnectionId) -> Result<Vec<Point>> {
        let conn = self.live(id)?;
        let orig = self.descriptor(conn, Mode::Orig)?;
        let dest = self.descriptor(conn, Mode::Dest)?;
        let waypoints = conn.strategies.waypoint.waypoints(orig, dest, &self.routing)?;

        let mut points = Vec::with_capacity(waypoints.len() + 2);
        points.push(orig.point);
        points.extend(waypoints);
        points.push(dest.point);
        let points = simplify(points);
        for pair in points.windows(2) {
            segment_axis(pair[0], pair[1])?;
        }
        if points.len() < 2 {
            warn!(connection = %id, "ports coincide, connection collapsed to a point");
        }
        Ok(points)
    }

    fn detection_suspended(&self, conn: &Connection) -> bool {
        conn.state == ConnectionState::Dragging
            || conn
                .attachment
                .ends
                .iter()
                .flatten()
                .filter_map(|end| end.shape())
                .any(|shape| {
                    self.shapes
                        .get(&shape)
                        .is_some_and(|s| s.is_being_dragged() || s.is_being_resized())
                })
    }

    /// Every interceptor of `id` forgets its crossings against `id` and
    /// redraws without rerouting.
    fn drop_interceptor_records(&mut self, id: ConnectionId) -> Result<()> {
        let interceptors = std::mem::take(&mut self.conn_mut(id)?.interceptors);
        for other in interceptors {
            if self.conn_mut(other)?.forget(id) {
                self.refresh_path(other)?;
            }
        }
        Ok(())
    }

    fn drop_own_records(&mut self, id: ConnectionId) -> Result<()> {
        let conn = self.conn_mut(id)?;
        let recorded: BTreeSet<ConnectionId> = conn
            .intersections
            .values()
            .flatten()
            .map(|crossing| crossing.connection)
            .collect();
        conn.intersections.clear();
        for other in recorded {
            self.conn_mut(other)?.interceptors.remove(&id);
        }
        Ok(())
    }

    fn detect_crossings(&mut self, id: ConnectionId) -> Result<()> {
        let conn = self.live(id)?;
        if conn.points.len() < 2 {
            return Ok(());
        }
        let Some(bounds) = Bounds::of_points(&conn.points) else {
            return Ok(());
        };
        let mut found: Vec<(usize, Crossing)> = Vec::new();
        let mut stale = false;
        for other in &self.connections {
            if other.id == id || !other.is_routed() || other.points.len() < 2 {
                continue;
            }
            if self.detection_suspended(other) {
                stale = true;
                continue;
            }
            let Some(other_bounds) = Bounds::of_points(&other.points) else {
                continue;
            };
            if !bounds.intersects(&other_bounds) {
                continue;
            }
            for (segment, point) in find_crossings(&conn.points, &other.points)? {
                let duplicate = other
                    .intersections
                    .values()
                    .flatten()
                    .any(|crossing| crossing.connection == id && crossing.point.approx_eq(point));
                if duplicate {
                    continue;
                }
                found.push((
                    segment,
                    Crossing {
                        connection: other.id,
                        point,
                    },
                ));
            }
        }

        for (_, crossing) in &found {
            self.conn_mut(crossing.connection)?.interceptors.insert(id);
        }
        let conn = self.conn_mut(id)?;
        for (segment, crossing) in found {
            conn.intersections.entry(segment).or_default().push(crossing);
        }
        conn.crossings_stale = stale;
        Ok(())
    }

    fn refresh_path(&mut self, id: ConnectionId) -> Result<()> {
        let path = {
            let conn = self.connection(id)?;
            assemble_path(&conn.points, &conn.crossing_points(), &conn.strategies, &self.routing)?
        };
        self.conn_mut(id)?.path = path;
        Ok(())
    }

    /// Full recompute after a drag or resize ends, including connections
    /// whose crossing detection was skipped meanwhile.
    fn settle(&mut self, shape: ShapeId) -> Result<()> {
        for conn in self.attached_connections(shape)? {
            self.recompute(conn)?;
        }
        let stale: Vec<ConnectionId> = self
            .connections
            .iter()
            .filter(|conn| conn.is_routed() && conn.crossings_stale && !self.detection_suspended(conn))
            .map(Connection::id)
            .collect();
        for conn in stale {
            self.recompute(conn)?;
        }
        Ok(())
    }
}

fn touches(conn: &Connection, shape: ShapeId) -> bool {
    let in_ends = |attachment: &Attachment| {
        attachment
            .ends
            .iter()
            .flatten()
            .any(|end| end.shape() == Some(shape))
    };
    in_ends(&conn.attachment) || conn.reconnect.is_some_and(|drag| in_ends(&drag.snapshot))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::PathCommand;

    fn canvas() -> Canvas {
        Canvas::default()
    }

    fn boxed(canvas: &mut Canvas, x: f32, y: f32, w: f32, h: f32) -> ShapeId {
        canvas
            .add_shape("box", Point::new(x, y), Size::new(w, h))
            .unwrap()
    }

    fn has_hop(conn: &Connection) -> bool {
        conn.path()
            .commands
            .iter()
            .any(|command| matches!(command, PathCommand::CurveTo { .. }))
    }

    /// Horizontal A and vertical B crossing at (250, 25); B connected last.
    fn crossing_pair(canvas: &mut Canvas) -> (ConnectionId, ConnectionId, ShapeId) {
        let p1 = boxed(canvas, 0.0, 0.0, 100.0, 50.0);
        let p2 = boxed(canvas, 400.0, 0.0, 100.0, 50.0);
        let q1 = boxed(canvas, 200.0, -200.0, 100.0, 50.0);
        let q2 = boxed(canvas, 200.0, 200.0, 100.0, 50.0);
        let a = canvas.add_connection(p1, p2).unwrap().unwrap();
        let b = canvas.add_connection(q1, q2).unwrap().unwrap();
        (a, b, p1)
    }

    #[test]
    fn side_by_side_boxes_connect_straight() {
        let mut canvas = canvas();
        let a = boxed(&mut canvas, 0.0, 0.0, 100.0, 50.0);
        let b = boxed(&mut canvas, 300.0, 0.0, 100.0, 50.0);
        let id = canvas.add_connection(a, b).unwrap().unwrap();
        let conn = canvas.connection(id).unwrap();
        assert_eq!(conn.orig_port(), Some(PortPosition::East));
        assert_eq!(conn.dest_port(), Some(PortPosition::West));
        assert_eq!(conn.points(), &[Point::new(100.0, 25.0), Point::new(300.0, 25.0)]);
        assert_eq!(conn.state(), ConnectionState::Bound);
    }

    #[test]
    fn diagonal_boxes_get_one_elbow() {
        let mut canvas = canvas();
        let a = boxed(&mut canvas, 0.0, 0.0, 40.0, 40.0);
        let b = boxed(&mut canvas, 50.0, 200.0, 40.0, 40.0);
        let id = canvas.add_connection(a, b).unwrap().unwrap();
        let conn = canvas.connection(id).unwrap();
        assert_eq!(
            conn.points(),
            &[Point::new(20.0, 40.0), Point::new(20.0, 220.0), Point::new(50.0, 220.0)]
        );
    }

    #[test]
    fn connect_emits_connect_and_port_changes() {
        let mut canvas = canvas();
        let a = boxed(&mut canvas, 0.0, 0.0, 100.0, 50.0);
        let b = boxed(&mut canvas, 300.0, 0.0, 100.0, 50.0);
        let id = canvas.add_connection(a, b).unwrap().unwrap();
        let events = canvas.drain_events();
        assert_eq!(
            events,
            vec![
                CanvasEvent::Connect {
                    connection: id,
                    orig: a,
                    dest: b
                },
                CanvasEvent::PortChange {
                    connection: id,
                    mode: Mode::Orig,
                    shape: a,
                    from: None,
                    to: Some(PortPosition::East)
                },
                CanvasEvent::PortChange {
                    connection: id,
                    mode: Mode::Dest,
                    shape: b,
                    from: None,
                    to: Some(PortPosition::West)
                },
            ]
        );
        assert!(canvas.drain_events().is_empty());
    }

    #[test]
    fn fourth_outgoing_connection_shares_a_port() {
        let mut canvas = canvas();
        let hub = boxed(&mut canvas, 200.0, 200.0, 100.0, 50.0);
        let east = boxed(&mut canvas, 500.0, 200.0, 100.0, 50.0);
        let north = boxed(&mut canvas, 200.0, -100.0, 100.0, 50.0);
        let south = boxed(&mut canvas, 200.0, 500.0, 100.0, 50.0);
        let west = boxed(&mut canvas, -200.0, 200.0, 100.0, 50.0);
        for target in [east, north, south] {
            canvas.add_connection(hub, target).unwrap().unwrap();
        }
        assert_eq!(canvas.shape(hub).unwrap().committed(Mode::Orig), 3);

        let fourth = canvas.add_connection(hub, west).unwrap().unwrap();
        let port = canvas.connection(fourth).unwrap().orig_port().unwrap();
        assert_ne!(port, PortPosition::West);
        assert_eq!(canvas.shape(hub).unwrap().port_at(port).connections().len(), 2);
        assert_eq!(canvas.shape(hub).unwrap().committed(Mode::Orig), 3);
        assert_eq!(canvas.shape(hub).unwrap().port_at(PortPosition::West).mode(), None);
    }

    #[test]
    fn refused_connection_changes_nothing() {
        let mut canvas = canvas();
        let sink = canvas
            .add_shape_with_policy(
                "end",
                Point::new(0.0, 0.0),
                Size::new(36.0, 36.0),
                ConnectionPolicy::sink(),
            )
            .unwrap();
        let task = boxed(&mut canvas, 300.0, 0.0, 100.0, 50.0);
        let id = canvas.create_connection();
        assert!(!canvas.connect(id, sink, task).unwrap());
        assert_eq!(canvas.connection(id).unwrap().state(), ConnectionState::Unbound);
        assert!(canvas.drain_events().is_empty());
        assert_eq!(canvas.shape(sink).unwrap().connection_count(), 0);
        assert_eq!(canvas.shape(task).unwrap().connection_count(), 0);
        assert_eq!(canvas.add_connection(sink, task).unwrap(), None);
        assert_eq!(canvas.connections().count(), 1);
    }

    #[test]
    fn refused_reconnect_keeps_previous_pair() {
        let mut canvas = canvas();
        let a = boxed(&mut canvas, 0.0, 0.0, 100.0, 50.0);
        let b = boxed(&mut canvas, 300.0, 0.0, 100.0, 50.0);
        let sink = canvas
            .add_shape_with_policy(
                "end",
                Point::new(0.0, 300.0),
                Size::new(36.0, 36.0),
                ConnectionPolicy::sink(),
            )
            .unwrap();
        let id = canvas.add_connection(a, b).unwrap().unwrap();
        let points = canvas.connection(id).unwrap().points().to_vec();
        canvas.drain_events();

        assert!(!canvas.connect(id, sink, b).unwrap());
        let conn = canvas.connection(id).unwrap();
        assert_eq!(conn.orig_shape(), Some(a));
        assert_eq!(conn.orig_port(), Some(PortPosition::East));
        assert_eq!(conn.points(), points.as_slice());
        assert!(canvas.shape(a).unwrap().port_at(PortPosition::East).contains(id));
        assert!(canvas.drain_events().is_empty());
    }

    #[test]
    fn crossing_next_to_a_corner_still_hops() {
        let mut canvas = canvas();
        let c = boxed(&mut canvas, 4.0, 100.0, 40.0, 40.0);
        let d = boxed(&mut canvas, 4.0, 300.0, 40.0, 40.0);
        let upright = canvas.add_connection(c, d).unwrap().unwrap();
        assert_eq!(
            canvas.connection(upright).unwrap().points(),
            &[Point::new(24.0, 140.0), Point::new(24.0, 300.0)]
        );

        let a = boxed(&mut canvas, 0.0, 0.0, 40.0, 40.0);
        let b = boxed(&mut canvas, 50.0, 200.0, 40.0, 40.0);
        let elbow = canvas.add_connection(a, b).unwrap().unwrap();
        let conn = canvas.connection(elbow).unwrap();
        assert_eq!(
            conn.intersections().get(&1).unwrap(),
            &vec![Crossing {
                connection: upright,
                point: Point::new(24.0, 220.0)
            }]
        );
        assert!(canvas.connection(upright).unwrap().interceptors().contains(&elbow));
        // the corner gives way to the hop, which starts right at the bend
        assert_eq!(conn.path().commands[1], PathCommand::LineTo(Point::new(20.0, 220.0)));
        assert!(matches!(
            conn.path().commands[2],
            PathCommand::CurveTo { to, .. } if to == Point::new(34.0, 220.0)
        ));
    }

    #[test]
    fn refused_connect_leaves_a_reconnect_drag_alone() {
        let mut canvas = canvas();
        let a = boxed(&mut canvas, 0.0, 0.0, 100.0, 50.0);
        let b = boxed(&mut canvas, 300.0, 0.0, 100.0, 50.0);
        let sink = canvas
            .add_shape_with_policy(
                "end",
                Point::new(0.0, 300.0),
                Size::new(36.0, 36.0),
                ConnectionPolicy::sink(),
            )
            .unwrap();
        let id = canvas.add_connection(a, b).unwrap().unwrap();
        canvas.begin_reconnect(id, Mode::Dest).unwrap();
        canvas.drag_end_to(id, Point::new(200.0, 200.0)).unwrap();
        let points = canvas.connection(id).unwrap().points().to_vec();
        canvas.drain_events();

        assert!(!canvas.connect(id, sink, b).unwrap());
        let conn = canvas.connection(id).unwrap();
        assert_eq!(conn.state(), ConnectionState::Dragging);
        assert_eq!(conn.points(), points.as_slice());
        assert!(canvas.drain_events().is_empty());

        // an accepted connect ends the drag
        assert!(canvas.connect(id, b, a).unwrap());
        let conn = canvas.connection(id).unwrap();
        assert_eq!(conn.state(), ConnectionState::Bound);
        assert_eq!((conn.orig_shape(), conn.dest_shape()), (Some(b), Some(a)));
    }

    #[test]
    fn later_connection_hops_and_registers_as_interceptor() {
        let mut canvas = canvas();
        let (a, b, _) = crossing_pair(&mut canvas);
        let first = canvas.connection(a).unwrap();
        let second = canvas.connection(b).unwrap();
        assert_eq!(
            second.intersections().get(&0).unwrap(),
            &vec![Crossing {
                connection: a,
                point: Point::new(250.0, 25.0)
            }]
        );
        assert!(first.interceptors().contains(&b));
        assert!(first.intersections().is_empty());
        assert!(has_hop(second));
        assert!(!has_hop(first));
    }

    #[test]
    fn make_is_idempotent() {
        let mut canvas = canvas();
        let (a, b, _) = crossing_pair(&mut canvas);
        let before: Vec<_> = [a, b]
            .iter()
            .map(|id| {
                let conn = canvas.connection(*id).unwrap();
                (conn.points().to_vec(), conn.path().clone())
            })
            .collect();
        for _ in 0..2 {
            canvas.make(a).unwrap();
            canvas.make(b).unwrap();
        }
        for (id, (points, path)) in [a, b].iter().zip(before) {
            let conn = canvas.connection(*id).unwrap();
            assert_eq!(conn.points(), points.as_slice());
            assert_eq!(conn.path(), &path);
        }
        // the duplicate crossing stays with the connection that found it first
        assert!(canvas.connection(a).unwrap().intersections().is_empty());
    }

    #[test]
    fn moved_connection_takes_over_the_hop() {
        let mut canvas = canvas();
        let (a, b, p1) = crossing_pair(&mut canvas);
        // A now leaves p1 northward and still crosses B at (250, 25)
        canvas.move_shape(p1, 0.0, -400.0).unwrap();
        let second = canvas.connection(b).unwrap();
        assert!(!second.references(a));
        assert!(!has_hop(second));
        assert!(second.interceptors().contains(&a));
        let first = canvas.connection(a).unwrap();
        assert!(first.references(b));
        assert!(first.interceptors().is_empty());
        assert!(has_hop(first));
    }

    #[test]
    fn moving_apart_clears_the_hop() {
        let mut canvas = canvas();
        let (a, b, p1) = crossing_pair(&mut canvas);
        canvas.move_shape(p1, 600.0, 300.0).unwrap();
        let second = canvas.connection(b).unwrap();
        assert!(second.intersections().is_empty());
        assert!(!has_hop(second));
        assert!(!canvas.connection(a).unwrap().references(b));
    }

    #[test]
    fn dragging_skips_crossings_until_drop() {
        let mut canvas = canvas();
        let (a, b, p1) = crossing_pair(&mut canvas);
        canvas.begin_drag(p1).unwrap();
        canvas.move_shape(p1, 0.0, 100.0).unwrap();
        let moved = canvas.connection(a).unwrap();
        assert!(moved.crossings_stale());
        assert!(moved.intersections().is_empty());
        // B's hop over A's old geometry is gone
        assert!(!canvas.connection(b).unwrap().references(a));

        canvas.end_drag(p1).unwrap();
        let settled = canvas.connection(a).unwrap();
        assert!(!settled.crossings_stale());
        assert!(settled.references(b));
        assert!(canvas.connection(b).unwrap().interceptors().contains(&a));
    }

    #[test]
    fn resizing_skips_crossings_until_released() {
        let mut canvas = canvas();
        let (a, b, p1) = crossing_pair(&mut canvas);
        canvas.begin_resize(p1).unwrap();
        canvas.resize_shape(p1, 60.0, 50.0).unwrap();
        let resized = canvas.connection(a).unwrap();
        assert_eq!(resized.points()[0], Point::new(60.0, 25.0));
        assert!(resized.crossings_stale());
        assert!(resized.intersections().is_empty());
        assert!(!canvas.connection(b).unwrap().references(a));

        // a second connection recomputed mid-resize also waits
        canvas.make(b).unwrap();
        assert!(canvas.connection(b).unwrap().crossings_stale());
        assert!(canvas.connection(b).unwrap().intersections().is_empty());

        canvas.end_resize(p1).unwrap();
        let settled = canvas.connection(a).unwrap();
        assert!(!settled.crossings_stale());
        assert!(!canvas.connection(b).unwrap().crossings_stale());
        // A found the crossing first this time, so the hop is A's
        assert!(settled.references(b));
        assert!(has_hop(settled));
        assert!(!canvas.connection(b).unwrap().references(a));
    }

    #[test]
    fn removing_a_connection_cleans_both_sides() {
        let mut canvas = canvas();
        let (a, b, p1) = crossing_pair(&mut canvas);
        let p2 = canvas.connection(a).unwrap().dest_shape().unwrap();
        canvas.drain_events();
        canvas.remove_connection(a).unwrap();
        assert_eq!(
            canvas.drain_events(),
            vec![
                CanvasEvent::PortChange {
                    connection: a,
                    mode: Mode::Orig,
                    shape: p1,
                    from: Some(PortPosition::East),
                    to: None
                },
                CanvasEvent::PortChange {
                    connection: a,
                    mode: Mode::Dest,
                    shape: p2,
                    from: Some(PortPosition::West),
                    to: None
                },
                CanvasEvent::Disconnect {
                    connection: a,
                    orig: p1,
                    dest: p2
                },
            ]
        );
        let second = canvas.connection(b).unwrap();
        assert!(second.intersections().is_empty());
        assert!(!has_hop(second));
        assert_eq!(canvas.connection(a).unwrap().state(), ConnectionState::Removed);
        assert!(matches!(canvas.make(a), Err(Error::ConnectionRemoved(_))));

        canvas.remove_connection(b).unwrap();
        assert!(canvas.connections().next().is_none());
    }

    #[test]
    fn removing_a_shape_clears_every_crossing_record() {
        let mut canvas = canvas();
        let hub = boxed(&mut canvas, 0.0, 0.0, 100.0, 400.0);
        let t1 = boxed(&mut canvas, 600.0, 0.0, 100.0, 50.0);
        let t2 = boxed(&mut canvas, 600.0, 350.0, 100.0, 50.0);
        let x1 = canvas.add_connection(hub, t1).unwrap().unwrap();
        let x2 = canvas.add_connection(t2, hub).unwrap().unwrap();

        let mut crossers = Vec::new();
        for cx in [200.0, 260.0, 450.0] {
            let top = boxed(&mut canvas, cx - 50.0, -300.0, 100.0, 50.0);
            let bottom = boxed(&mut canvas, cx - 50.0, 700.0, 100.0, 50.0);
            crossers.push(canvas.add_connection(top, bottom).unwrap().unwrap());
        }
        for id in &crossers {
            let conn = canvas.connection(*id).unwrap();
            assert!(conn.references(x1) || conn.references(x2));
        }

        let removed = canvas.remove_shape(hub).unwrap();
        assert_eq!(removed, vec![x1, x2]);
        for id in &crossers {
            let conn = canvas.connection(*id).unwrap();
            assert!(!conn.references(x1));
            assert!(!conn.references(x2));
            assert!(conn.intersections().is_empty());
        }
        assert!(canvas.shape(hub).is_err());
        assert!(canvas.connected_shapes(t1).unwrap().is_empty());
    }

    #[test]
    fn reconnect_round_trip_matches_fresh_connection() {
        let mut canvas = canvas();
        let a = boxed(&mut canvas, 0.0, 0.0, 40.0, 40.0);
        let b = boxed(&mut canvas, 50.0, 200.0, 40.0, 40.0);
        let first = canvas.add_connection(a, b).unwrap().unwrap();
        let ports = {
            let conn = canvas.connection(first).unwrap();
            (conn.orig_port(), conn.dest_port(), conn.points().to_vec())
        };
        canvas.remove_connection(first).unwrap();
        let second = canvas.add_connection(a, b).unwrap().unwrap();
        let conn = canvas.connection(second).unwrap();
        assert_eq!((conn.orig_port(), conn.dest_port(), conn.points().to_vec()), ports);
    }

    #[test]
    fn cancelled_reconnect_restores_pair_and_ports() {
        let mut canvas = canvas();
        let a = boxed(&mut canvas, 0.0, 0.0, 100.0, 50.0);
        let b = boxed(&mut canvas, 300.0, 0.0, 100.0, 50.0);
        let c = boxed(&mut canvas, 0.0, 300.0, 100.0, 50.0);
        let id = canvas.add_connection(a, b).unwrap().unwrap();
        let points = canvas.connection(id).unwrap().points().to_vec();

        canvas.begin_reconnect(id, Mode::Dest).unwrap();
        assert_eq!(canvas.connection(id).unwrap().state(), ConnectionState::Dragging);
        assert!(!canvas.shape(b).unwrap().port_at(PortPosition::West).contains(id));

        canvas.drag_end_to(id, Point::new(60.0, 250.0)).unwrap();
        assert!(canvas.hover(id, c).unwrap());
        assert_eq!(canvas.shape(c).unwrap().connection_count(), 1);

        canvas.cancel_reconnect(id).unwrap();
        let conn = canvas.connection(id).unwrap();
        assert_eq!(conn.state(), ConnectionState::Bound);
        assert_eq!(conn.dest_shape(), Some(b));
        assert_eq!(conn.dest_port(), Some(PortPosition::West));
        assert_eq!(conn.points(), points.as_slice());
        assert_eq!(canvas.shape(c).unwrap().connection_count(), 0);
        assert!(canvas.shape(b).unwrap().port_at(PortPosition::West).contains(id));
    }

    #[test]
    fn finished_reconnect_moves_the_end() {
        let mut canvas = canvas();
        let a = boxed(&mut canvas, 0.0, 0.0, 100.0, 50.0);
        let b = boxed(&mut canvas, 300.0, 0.0, 100.0, 50.0);
        let c = boxed(&mut canvas, 0.0, 300.0, 100.0, 50.0);
        let id = canvas.add_connection(a, b).unwrap().unwrap();
        canvas.drain_events();

        canvas.begin_reconnect(id, Mode::Dest).unwrap();
        assert!(matches!(canvas.make(id), Ok(())));
        assert!(canvas.finish_reconnect(id, c).unwrap());
        let conn = canvas.connection(id).unwrap();
        assert_eq!(conn.dest_shape(), Some(c));
        assert_eq!(conn.dest_port(), Some(PortPosition::North));
        assert_eq!(conn.orig_port(), Some(PortPosition::South));
        assert_eq!(canvas.shape(b).unwrap().connection_count(), 0);

        let events = canvas.drain_events();
        assert!(events.contains(&CanvasEvent::Disconnect {
            connection: id,
            orig: a,
            dest: b
        }));
        assert!(events.contains(&CanvasEvent::Connect {
            connection: id,
            orig: a,
            dest: c
        }));
        assert_eq!(canvas.connected_shapes(a).unwrap(), vec![c]);
    }

    #[test]
    fn reconnect_calls_require_a_drag() {
        let mut canvas = canvas();
        let a = boxed(&mut canvas, 0.0, 0.0, 100.0, 50.0);
        let b = boxed(&mut canvas, 300.0, 0.0, 100.0, 50.0);
        let id = canvas.add_connection(a, b).unwrap().unwrap();
        assert!(matches!(
            canvas.drag_end_to(id, Point::new(1.0, 1.0)),
            Err(Error::NotDragging(_))
        ));
        assert!(matches!(canvas.cancel_reconnect(id), Err(Error::NotDragging(_))));
        let unbound = canvas.create_connection();
        assert!(matches!(canvas.make(unbound), Err(Error::NotBound(_))));
    }

    #[test]
    fn self_loop_uses_two_ports() {
        let mut canvas = canvas();
        let a = boxed(&mut canvas, 0.0, 0.0, 100.0, 50.0);
        let id = canvas.add_connection(a, a).unwrap().unwrap();
        let conn = canvas.connection(id).unwrap();
        assert_eq!(conn.orig_port(), Some(PortPosition::East));
        assert_eq!(conn.dest_port(), Some(PortPosition::South));
        assert_eq!(conn.points().len(), 5);
        assert_eq!(canvas.connected_shapes(a).unwrap(), vec![a]);
    }

    #[test]
    fn staged_edit_applies_once() {
        let mut canvas = canvas();
        let a = boxed(&mut canvas, 0.0, 0.0, 100.0, 50.0);
        let b = boxed(&mut canvas, 300.0, 0.0, 100.0, 50.0);
        let id = canvas.add_connection(a, b).unwrap().unwrap();
        let draft = canvas.edit_shape(b).unwrap().position(300.0, 100.0).size(80.0, 40.0);
        canvas.apply(draft).unwrap();
        let shape = canvas.shape(b).unwrap();
        assert_eq!(shape.position(), Point::new(300.0, 100.0));
        assert_eq!(shape.current_size(), Size::new(80.0, 40.0));
        let conn = canvas.connection(id).unwrap();
        assert_eq!(conn.points().last(), Some(&Point::new(300.0, 120.0)));

        let bad = canvas.edit_shape(b).unwrap().size(-1.0, 10.0);
        assert!(matches!(canvas.apply(bad), Err(Error::InvalidGeometry(_))));
    }

    #[test]
    fn recompute_guards_against_reentry() {
        let mut canvas = canvas();
        let a = boxed(&mut canvas, 0.0, 0.0, 100.0, 50.0);
        let b = boxed(&mut canvas, 300.0, 0.0, 100.0, 50.0);
        let id = canvas.add_connection(a, b).unwrap().unwrap();
        canvas.in_flight.insert(id);
        assert!(matches!(canvas.make(id), Err(Error::Reentrant(_))));
        canvas.in_flight.clear();
        assert!(canvas.make(id).is_ok());
    }

    #[test]
    fn unknown_ids_are_reported() {
        let mut canvas = canvas();
        assert!(matches!(canvas.shape(ShapeId(9)), Err(Error::UnknownShape(_))));
        assert!(matches!(
            canvas.connection(ConnectionId(3)),
            Err(Error::UnknownConnection(_))
        ));
        let a = boxed(&mut canvas, 0.0, 0.0, 100.0, 50.0);
        assert!(matches!(
            canvas.add_connection(a, ShapeId(42)),
            Err(Error::UnknownShape(_))
        ));
    }
}
