use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::{Axis, Bounds, Point};

use super::ConnectionId;

/// One of the four compass slots a port occupies on its shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortPosition {
    North,
    East,
    South,
    West,
}

impl PortPosition {
    pub const ALL: [PortPosition; 4] = [
        PortPosition::North,
        PortPosition::East,
        PortPosition::South,
        PortPosition::West,
    ];

    pub fn index(self) -> usize {
        match self {
            PortPosition::North => 0,
            PortPosition::East => 1,
            PortPosition::South => 2,
            PortPosition::West => 3,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Axis of the port's outward normal.
    pub fn orientation(self) -> Axis {
        match self {
            PortPosition::East | PortPosition::West => Axis::X,
            PortPosition::North | PortPosition::South => Axis::Y,
        }
    }

    /// Sign of the outward normal along [`Self::orientation`].
    pub fn direction(self) -> i8 {
        match self {
            PortPosition::East | PortPosition::South => 1,
            PortPosition::North | PortPosition::West => -1,
        }
    }

    /// Port on `axis` whose normal points along `direction` (0 counts as +1).
    pub fn facing(axis: Axis, direction: i8) -> Self {
        match (axis, direction >= 0) {
            (Axis::X, true) => PortPosition::East,
            (Axis::X, false) => PortPosition::West,
            (Axis::Y, true) => PortPosition::South,
            (Axis::Y, false) => PortPosition::North,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            PortPosition::North => PortPosition::South,
            PortPosition::East => PortPosition::West,
            PortPosition::South => PortPosition::North,
            PortPosition::West => PortPosition::East,
        }
    }

    /// Anchor point of this slot on `bounds`: the middle of the side.
    pub fn anchor(self, bounds: &Bounds) -> Point {
        let center = bounds.center();
        match self {
            PortPosition::North => Point::new(center.x, bounds.top),
            PortPosition::East => Point::new(bounds.right, center.y),
            PortPosition::South => Point::new(center.x, bounds.bottom),
            PortPosition::West => Point::new(bounds.left, center.y),
        }
    }
}

impl fmt::Display for PortPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PortPosition::North => "north",
            PortPosition::East => "east",
            PortPosition::South => "south",
            PortPosition::West => "west",
        };
        f.write_str(name)
    }
}

/// Whether a port (or a connection end) serves as source or target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Orig,
    Dest,
}

impl Mode {
    pub fn opposite(self) -> Self {
        match self {
            Mode::Orig => Mode::Dest,
            Mode::Dest => Mode::Orig,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Port {
    position: PortPosition,
    mode: Option<Mode>,
    connections: BTreeSet<ConnectionId>,
}

impl Port {
    pub fn new(position: PortPosition) -> Self {
        Self {
            position,
            mode: None,
            connections: BTreeSet::new(),
        }
    }

    pub fn position(&self) -> PortPosition {
        self.position
    }

    pub fn orientation(&self) -> Axis {
        self.position.orientation()
    }

    pub fn direction(&self) -> i8 {
        self.position.direction()
    }

    pub fn mode(&self) -> Option<Mode> {
        self.mode
    }

    pub fn connections(&self) -> &BTreeSet<ConnectionId> {
        &self.connections
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn contains(&self, connection: ConnectionId) -> bool {
        self.connections.contains(&connection)
    }

    /// Adds `connection` under `mode`. Returns false when the port is already
    /// committed to the opposite mode.
    pub(crate) fn add(&mut self, connection: ConnectionId, mode: Mode) -> bool {
        match self.mode {
            Some(current) if current != mode => false,
            _ => {
                self.mode = Some(mode);
                self.connections.insert(connection);
                true
            }
        }
    }

    /// Removes `connection`; the mode is cleared once the port is empty.
    pub(crate) fn remove(&mut self, connection: ConnectionId) -> bool {
        let removed = self.connections.remove(&connection);
        if self.connections.is_empty() {
            self.mode = None;
        }
        removed
    }
}
