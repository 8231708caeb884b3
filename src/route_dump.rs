use crate::canvas::{Canvas, Connection, ConnectionState, PortPosition, ShapeId};
use crate::geometry::Point;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct RouteDump {
    pub shapes: Vec<ShapeDump>,
    pub connections: Vec<ConnectionDump>,
}

#[derive(Debug, Serialize)]
pub struct ShapeDump {
    pub id: u32,
    pub label: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Connections held by each port, N/E/S/W.
    pub ports: [Vec<u32>; 4],
}

#[derive(Debug, Serialize)]
pub struct ConnectionDump {
    pub id: u32,
    pub state: ConnectionState,
    pub orig: Option<String>,
    pub dest: Option<String>,
    pub orig_port: Option<PortPosition>,
    pub dest_port: Option<PortPosition>,
    pub points: Vec<[f32; 2]>,
    pub crossings: Vec<CrossingDump>,
    pub d: String,
}

#[derive(Debug, Serialize)]
pub struct CrossingDump {
    pub segment: usize,
    pub connection: u32,
    pub point: [f32; 2],
}

fn xy(p: Point) -> [f32; 2] {
    [p.x, p.y]
}

impl RouteDump {
    pub fn from_canvas(canvas: &Canvas) -> Self {
        let shapes = canvas
            .shapes()
            .map(|shape| {
                let bounds = shape.bounds();
                ShapeDump {
                    id: shape.id().0,
                    label: shape.label().to_string(),
                    x: bounds.left,
                    y: bounds.top,
                    width: bounds.width(),
                    height: bounds.height(),
                    ports: shape
                        .ports()
                        .each_ref()
                        .map(|port| port.connections().iter().map(|conn| conn.0).collect()),
                }
            })
            .collect();

        let connections = canvas
            .connections()
            .map(|conn| ConnectionDump::new(canvas, conn))
            .collect();

        RouteDump {
            shapes,
            connections,
        }
    }
}

impl ConnectionDump {
    fn new(canvas: &Canvas, conn: &Connection) -> Self {
        let label = |shape: ShapeId| {
            canvas
                .shape(shape)
                .map(|shape| shape.label().to_string())
                .ok()
        };
        let crossings = conn
            .intersections()
            .iter()
            .flat_map(|(segment, hits)| {
                hits.iter().map(|hit| CrossingDump {
                    segment: *segment,
                    connection: hit.connection.0,
                    point: xy(hit.point),
                })
            })
            .collect();
        ConnectionDump {
            id: conn.id().0,
            state: conn.state(),
            orig: conn.orig_shape().and_then(label),
            dest: conn.dest_shape().and_then(label),
            orig_port: conn.orig_port(),
            dest_port: conn.dest_port(),
            points: conn.points().iter().copied().map(xy).collect(),
            crossings,
            d: conn.path().to_svg_d(),
        }
    }
}

pub fn write_route_dump(path: &Path, canvas: &Canvas) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = RouteDump::from_canvas(canvas);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Size;

    #[test]
    fn dump_lists_ports_points_and_path() {
        let mut canvas = Canvas::default();
        let a = canvas
            .add_shape("a", Point::new(0.0, 0.0), Size::new(100.0, 50.0))
            .unwrap();
        let b = canvas
            .add_shape("b", Point::new(300.0, 0.0), Size::new(100.0, 50.0))
            .unwrap();
        canvas.add_connection(a, b).unwrap().unwrap();

        let dump = RouteDump::from_canvas(&canvas);
        assert_eq!(dump.shapes.len(), 2);
        assert_eq!(dump.shapes[0].ports[1], vec![0]);
        assert_eq!(dump.shapes[1].ports[3], vec![0]);

        let conn = &dump.connections[0];
        assert_eq!(conn.orig.as_deref(), Some("a"));
        assert_eq!(conn.dest_port, Some(PortPosition::West));
        assert_eq!(conn.points, vec![[100.0, 25.0], [300.0, 25.0]]);
        assert!(conn.crossings.is_empty());

        let json = serde_json::to_value(&dump).unwrap();
        assert_eq!(json["connections"][0]["state"], "bound");
        assert_eq!(json["connections"][0]["d"], "M 100.00 25.00 L 300.00 25.00");
    }
}
