use crate::canvas::PortPosition;
use crate::geometry::{Axis, Bounds, Overlap, RelativeDirection, overlapped_dimensions};

use super::PortPriorityStrategy;

/// Ports of both ends in descending preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRanking {
    pub orig: [PortPosition; 4],
    pub dest: [PortPosition; 4],
}

/// Prefers the port facing the other end, with the perpendicular ports as
/// fallbacks and the port facing away last.
#[derive(Debug, Clone, Copy, Default)]
pub struct CloserPortPriority;

impl PortPriorityStrategy for CloserPortPriority {
    fn rank(&self, orig: &Bounds, dest: &Bounds) -> PortRanking {
        let relative = RelativeDirection::between(orig.center(), dest.center());
        let overlap = overlapped_dimensions(orig, dest);
        let (orig_axis, dest_axis) = docking_axes(overlap, relative);
        PortRanking {
            orig: priority(orig_axis, relative),
            // the destination faces back toward the origin
            dest: priority(dest_axis, relative.reversed()),
        }
    }
}

/// Orientation each end docks along.
pub fn docking_axes(overlap: Overlap, relative: RelativeDirection) -> (Axis, Axis) {
    match (overlap.x, overlap.y) {
        (true, true) => (Axis::X, Axis::Y),
        // stacked in a column: route vertically
        (true, false) => (Axis::Y, Axis::Y),
        // side by side in a row: route horizontally
        (false, true) => (Axis::X, Axis::X),
        (false, false) => {
            if relative.x == 0 {
                (Axis::Y, Axis::Y)
            } else if relative.y == 0 {
                (Axis::X, Axis::X)
            } else {
                (Axis::Y, Axis::X)
            }
        }
    }
}

fn priority(axis: Axis, relative: RelativeDirection) -> [PortPosition; 4] {
    let primary = PortPosition::facing(axis, relative.get(axis));
    let cross = axis.cross();
    let cross_sign = if relative.get(cross) > 0 { 1 } else { -1 };
    let cross_first = PortPosition::facing(cross, cross_sign);
    [primary, cross_first, cross_first.opposite(), primary.opposite()]
}
