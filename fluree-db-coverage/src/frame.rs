//! Rectangle clipping of candidate rings against the working frame.
//!
//! Sutherland-Hodgman, one frame edge at a time. Vertices inside the frame
//! pass through untouched; new vertices land on the frame boundary, which
//! lies outside the query extent. Rings are clipped independently, so a
//! clipped hole can run along the frame edge next to its exterior; the
//! overlay's even-odd fill rule resolves that.

use crate::geometry::BBox;
use geo_types::{Coord, LineString, MultiPolygon, Polygon};

#[derive(Debug, Clone, Copy)]
enum Edge {
    Left,
    Right,
    Bottom,
    Top,
}

impl Edge {
    const ALL: [Edge; 4] = [Edge::Left, Edge::Right, Edge::Bottom, Edge::Top];

    fn is_inside(self, p: &Coord<f64>, rect: &BBox) -> bool {
        match self {
            Edge::Left => p.x >= rect.min_x,
            Edge::Right => p.x <= rect.max_x,
            Edge::Bottom => p.y >= rect.min_y,
            Edge::Top => p.y <= rect.max_y,
        }
    }

    /// Crossing of segment `p`-`q` with this edge. Only called when the
    /// endpoints lie on opposite sides, so the divisor is non-zero.
    fn intersect(self, p: &Coord<f64>, q: &Coord<f64>, rect: &BBox) -> Coord<f64> {
        let dx = q.x - p.x;
        let dy = q.y - p.y;
        match self {
            Edge::Left => Coord {
                x: rect.min_x,
                y: p.y + (rect.min_x - p.x) / dx * dy,
            },
            Edge::Right => Coord {
                x: rect.max_x,
                y: p.y + (rect.max_x - p.x) / dx * dy,
            },
            Edge::Bottom => Coord {
                x: p.x + (rect.min_y - p.y) / dy * dx,
                y: rect.min_y,
            },
            Edge::Top => Coord {
                x: p.x + (rect.max_y - p.y) / dy * dx,
                y: rect.max_y,
            },
        }
    }
}

fn clip_edge(vertices: &[Coord<f64>], edge: Edge, rect: &BBox) -> Vec<Coord<f64>> {
    let n = vertices.len();
    let mut output = Vec::with_capacity(n + 2);
    for i in 0..n {
        let current = &vertices[i];
        let next = &vertices[(i + 1) % n];
        match (edge.is_inside(current, rect), edge.is_inside(next, rect)) {
            (true, true) => output.push(*next),
            (true, false) => output.push(edge.intersect(current, next, rect)),
            (false, true) => {
                output.push(edge.intersect(current, next, rect));
                output.push(*next);
            }
            (false, false) => {}
        }
    }
    output
}

/// Clip one ring to `rect`. `None` when nothing of it remains.
fn clip_ring(ring: &LineString<f64>, rect: &BBox) -> Option<LineString<f64>> {
    let mut vertices = ring.0.clone();
    if vertices.len() > 1 && vertices.first() == vertices.last() {
        vertices.pop();
    }
    for edge in Edge::ALL {
        vertices = clip_edge(&vertices, edge, rect);
        if vertices.len() < 3 {
            return None;
        }
    }
    let mut ring = LineString::new(vertices);
    ring.close();
    Some(ring)
}

/// Clip every ring of `geom` to `rect`, leaving rings already inside it
/// as they are.
///
/// The output keeps ring roles but is only meaningful under even-odd fill;
/// it is not necessarily OGC-valid.
pub(crate) fn clip_to_rect(geom: &MultiPolygon<f64>, rect: &BBox) -> MultiPolygon<f64> {
    let clip = |ring: &LineString<f64>| match BBox::from_line_string(ring) {
        Some(bounds) if rect.contains(&bounds) => Some(ring.clone()),
        _ => clip_ring(ring, rect),
    };
    MultiPolygon::new(
        geom.0
            .iter()
            .filter_map(|polygon| {
                let exterior = clip(polygon.exterior())?;
                let interiors = polygon.interiors().iter().filter_map(clip).collect();
                Some(Polygon::new(exterior, interiors))
            })
            .collect(),
    )
}
