//! Shared helpers for fluree-db-coverage integration tests.

// Not every test crate uses every helper.
#![allow(dead_code)]

use fluree_db_coverage::{parse_wkt, CandidateFeature, GeometryOps};
use geo_types::{Geometry, MultiPolygon};
use std::collections::BTreeSet;

/// Identifier attribute used by the fixtures.
pub const ID_ATTR: &str = "tile_id";

/// WKT for an axis-aligned rectangle.
pub fn rect_wkt(x0: f64, y0: f64, x1: f64, y1: f64) -> String {
    format!("POLYGON(({x0} {y0}, {x1} {y0}, {x1} {y1}, {x0} {y1}, {x0} {y0}))")
}

/// WKT for a polygon through `points`, closed automatically.
pub fn polygon_wkt(points: &[(f64, f64)]) -> String {
    let mut coords: Vec<String> = points.iter().map(|(x, y)| format!("{x} {y}")).collect();
    if let Some(first) = coords.first().cloned() {
        coords.push(first);
    }
    format!("POLYGON(({}))", coords.join(", "))
}

/// Parse a WKT fixture.
pub fn geom(wkt: &str) -> Geometry<f64> {
    parse_wkt(wkt).expect("fixture WKT should parse")
}

/// Candidate carrying `id` under [`ID_ATTR`].
pub fn candidate(id: &str, wkt: &str) -> CandidateFeature {
    CandidateFeature::with_id(ID_ATTR, id, geom(wkt))
}

/// Rectangular candidate.
pub fn rect_candidate(id: &str, x0: f64, y0: f64, x1: f64, y1: f64) -> CandidateFeature {
    candidate(id, &rect_wkt(x0, y0, x1, y1))
}

/// The unit square query region.
pub fn unit_square() -> Geometry<f64> {
    geom(&rect_wkt(0.0, 0.0, 1.0, 1.0))
}

pub fn ids(ids: &[&str]) -> BTreeSet<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

/// Union of the (unclipped) geometries of the selected candidates.
pub fn selected_union(
    ops: &GeometryOps,
    candidates: &[CandidateFeature],
    selected: &BTreeSet<String>,
) -> Option<MultiPolygon<f64>> {
    let parts: Vec<MultiPolygon<f64>> = candidates
        .iter()
        .filter(|c| c.id(ID_ATTR).is_ok_and(|id| selected.contains(&id)))
        .map(|c| ops.snap(&c.geometry).expect("fixture geometry should snap"))
        .collect();
    ops.union_all(&parts)
}

/// Overlapping 3x3 grid of square tiles over the unit square.
///
/// Tiles are 0.4 wide at offsets 0, 0.3 and 0.6, named `r{row}c{col}`.
pub fn overlapping_grid() -> Vec<CandidateFeature> {
    let offsets = [0.0, 0.3, 0.6];
    let mut tiles = Vec::new();
    for (row, y) in offsets.iter().enumerate() {
        for (col, x) in offsets.iter().enumerate() {
            tiles.push(rect_candidate(
                &format!("r{row}c{col}"),
                *x,
                *y,
                x + 0.4,
                y + 0.4,
            ));
        }
    }
    tiles
}
