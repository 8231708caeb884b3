use crate::config::RoutingConfig;
use crate::error::{Error, Result};
use crate::geometry::{Axis, EPSILON, Point, RelativeDirection, sign};

use super::{PortDescriptor, WaypointStrategy};

/// Manhattan router: a local case analysis that pushes ports outward by the
/// stub length until the two ends can be joined by an elbow, a straight line
/// or an S-shaped jog.
#[derive(Debug, Clone, Copy, Default)]
pub struct RectangularWaypoints;

impl WaypointStrategy for RectangularWaypoints {
    fn waypoints(
        &self,
        orig: PortDescriptor,
        dest: PortDescriptor,
        config: &RoutingConfig,
    ) -> Result<Vec<Point>> {
        route(orig, dest, config.stub_length, config.max_routing_steps)
    }
}

/// Step the descriptor `stub` forward along its normal, then turn it onto the
/// cross axis facing `toward`.
fn advance(port: PortDescriptor, stub: f32, toward: Point) -> PortDescriptor {
    let point = port.point.offset(port.orientation, f32::from(port.direction) * stub);
    let orientation = port.orientation.cross();
    let direction = match sign(toward.get(orientation) - point.get(orientation)) {
        0 => 1,
        s => s,
    };
    PortDescriptor::new(point, orientation, direction)
}

pub fn route(
    orig: PortDescriptor,
    dest: PortDescriptor,
    stub: f32,
    max_steps: usize,
) -> Result<Vec<Point>> {
    if !orig.point.is_finite() || !dest.point.is_finite() {
        return Err(Error::InvalidGeometry("port anchor is not finite".to_string()));
    }

    let mut head: Vec<Point> = Vec::new();
    let mut tail: Vec<Point> = Vec::new();
    let mut orig = orig;
    let mut dest = dest;

    for _ in 0..max_steps {
        let relative = RelativeDirection::between(orig.point, dest.point);

        // The origin would have to double back immediately.
        if orig.direction != relative.get(orig.orientation) {
            orig = advance(orig, stub, dest.point);
            head.push(orig.point);
            continue;
        }
        if dest.direction != relative.reversed().get(dest.orientation) {
            dest = advance(dest, stub, orig.point);
            tail.push(dest.point);
            continue;
        }

        if orig.orientation != dest.orientation {
            // L-shape: leave along the origin axis, arrive along the destination axis.
            let elbow = match orig.orientation {
                Axis::X => Point::new(dest.point.x, orig.point.y),
                Axis::Y => Point::new(orig.point.x, dest.point.y),
            };
            // a leg that touches its port directly must be a full stub
            let orig_leg = (elbow.get(orig.orientation) - orig.point.get(orig.orientation)).abs();
            let dest_leg = (elbow.get(dest.orientation) - dest.point.get(dest.orientation)).abs();
            if head.is_empty() && orig_leg < stub {
                orig = advance(orig, stub, dest.point);
                head.push(orig.point);
                continue;
            }
            if tail.is_empty() && dest_leg < stub {
                dest = advance(dest, stub, orig.point);
                tail.push(dest.point);
                continue;
            }
            if !elbow.approx_eq(orig.point) && !elbow.approx_eq(dest.point) {
                head.push(elbow);
                return Ok(join(head, tail));
            }
            dest = advance(dest, stub, orig.point);
            tail.push(dest.point);
            continue;
        }

        let axis = orig.orientation;
        let cross = axis.cross();
        let secondary = (dest.point.get(cross) - orig.point.get(cross)).abs();
        if secondary < EPSILON {
            return Ok(join(head, tail));
        }

        let primary = (dest.point.get(axis) - orig.point.get(axis)).abs();
        if primary / 2.0 < stub && secondary / 2.0 >= stub {
            // Too short for a jog: detour around both stubs instead.
            let next_orig = advance(orig, stub, dest.point);
            let next_dest = advance(dest, stub, orig.point);
            orig = next_orig;
            dest = next_dest;
            head.push(orig.point);
            tail.push(dest.point);
            continue;
        }

        let half = (dest.point.get(axis) - orig.point.get(axis)) / 2.0;
        head.push(orig.point.offset(axis, half));
        head.push(dest.point.offset(axis, -half));
        return Ok(join(head, tail));
    }

    Err(Error::RoutingDidNotConverge { steps: max_steps })
}

fn join(mut head: Vec<Point>, tail: Vec<Point>) -> Vec<Point> {
    head.extend(tail.into_iter().rev());
    head
}
