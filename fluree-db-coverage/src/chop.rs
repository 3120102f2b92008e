//! Partitioner: decomposes overlapping clipped features into atomic regions.
//!
//! Instead of computing a full planar arrangement, the working list of
//! regions (initially the clipped features themselves) is chopped against
//! each feature in turn. After every mask has been applied, no region
//! straddles a feature boundary, and every feature's footprint is a union of
//! regions. The pairwise strategy regenerates some regions more than once;
//! the final `dedup_keep_first` pass removes those copies.
//!
//! # Chopping one region against one mask
//!
//! | relation                 | output                                      |
//! |--------------------------|---------------------------------------------|
//! | object invalid           | nothing                                     |
//! | mask invalid             | object                                      |
//! | disjoint / touching      | object                                      |
//! | equal (within tolerance) | object                                      |
//! | object contains mask     | parts of `object − mask`, then `mask`       |
//! | mask contains object     | object                                      |
//! | overlapping              | parts of `object − mask`, `object ∩ mask`   |
//!
//! Only valid parts at least as large as the area tolerance are emitted.
//! [`GeometryOps::relation`] already reads a sliver overlap left by grid
//! rounding as touching or containment, so such slivers never split a region.

use crate::dedup::dedup_keep_first;
use crate::feature::Feature;
use crate::geometry::{GeometryOps, Relation};
use geo_types::MultiPolygon;
use rayon::prelude::*;

/// Output of [`chop_features`].
#[derive(Debug, Clone, Default)]
pub struct ChopResult {
    /// Deduplicated atomic regions.
    pub regions: Vec<MultiPolygon<f64>>,

    /// Regions in the working list before deduplication.
    pub emitted: usize,
}

/// Partition the clipped features into atomic regions.
///
/// Masks are applied in feature order. With `parallel`, the regions of the
/// working list are chopped against each mask on the rayon pool; output
/// order matches the sequential path.
pub fn chop_features(ops: &GeometryOps, features: &[Feature], parallel: bool) -> ChopResult {
    let mut working: Vec<MultiPolygon<f64>> =
        features.iter().map(|f| f.geometry.clone()).collect();

    for mask in features {
        working = chop_all(ops, working, &mask.geometry, parallel);
    }

    let emitted = working.len();
    let regions = dedup_keep_first(ops, working);

    tracing::trace!(emitted, regions = regions.len(), "Chopped features");

    ChopResult { regions, emitted }
}

/// Chop every region of `working` against `mask`.
pub fn chop_all(
    ops: &GeometryOps,
    working: Vec<MultiPolygon<f64>>,
    mask: &MultiPolygon<f64>,
    parallel: bool,
) -> Vec<MultiPolygon<f64>> {
    let mask_valid = ops.is_valid_polygonal(mask);
    let pieces: Vec<Vec<MultiPolygon<f64>>> = if parallel {
        working
            .into_par_iter()
            .map(|object| chop_region(ops, object, mask, mask_valid))
            .collect()
    } else {
        working
            .into_iter()
            .map(|object| chop_region(ops, object, mask, mask_valid))
            .collect()
    };
    pieces.into_iter().flatten().collect()
}

/// Chop one region against one mask.
pub fn chop(
    ops: &GeometryOps,
    object: MultiPolygon<f64>,
    mask: &MultiPolygon<f64>,
) -> Vec<MultiPolygon<f64>> {
    let mask_valid = ops.is_valid_polygonal(mask);
    chop_region(ops, object, mask, mask_valid)
}

fn chop_region(
    ops: &GeometryOps,
    object: MultiPolygon<f64>,
    mask: &MultiPolygon<f64>,
    mask_valid: bool,
) -> Vec<MultiPolygon<f64>> {
    if !ops.is_valid_polygonal(&object) {
        return Vec::new();
    }
    if !mask_valid {
        return vec![object];
    }

    match ops.relation(&object, mask) {
        Relation::Disjoint | Relation::Touching | Relation::Equal | Relation::ContainedBy => {
            vec![object]
        }
        Relation::Contains => {
            let remnant = ops
                .parts(mask)
                .fold(object, |acc, part| ops.difference(&acc, &part));
            let mut out: Vec<MultiPolygon<f64>> = ops
                .parts(&remnant)
                .filter(|part| ops.is_significant(part))
                .collect();
            out.push(mask.clone());
            out
        }
        Relation::Overlapping => {
            let outside = ops.difference(&object, mask);
            let inside = ops.intersection(&object, mask);
            ops.parts(&outside)
                .chain(ops.parts(&inside))
                .filter(|part| ops.is_significant(part))
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoverageConfig;
    use crate::geometry::BBox;
    use geo_types::{coord, Coord, LineString, Polygon, Rect};
    use std::f64::consts::TAU;

    fn ops() -> GeometryOps {
        GeometryOps::new(&CoverageConfig::default(), &BBox::new(0.0, 0.0, 3.0, 3.0))
    }

    fn unit_ops() -> GeometryOps {
        GeometryOps::new(&CoverageConfig::default(), &BBox::new(0.0, 0.0, 1.0, 1.0))
    }

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
        let r = Rect::new(coord! { x: x0, y: y0 }, coord! { x: x1, y: y1 });
        MultiPolygon::new(vec![r.to_polygon()])
    }

    fn total_area(ops: &GeometryOps, regions: &[MultiPolygon<f64>]) -> f64 {
        regions.iter().map(|r| ops.area(r)).sum()
    }

    fn polygon(points: &[(f64, f64)]) -> MultiPolygon<f64> {
        let ring: LineString<f64> = points.iter().map(|&(x, y)| Coord { x, y }).collect();
        MultiPolygon::new(vec![Polygon::new(ring, Vec::new())])
    }

    /// Regular `n`-gon around (`cx`, `cy`), first vertex at `phase` turns.
    fn regular(cx: f64, cy: f64, radius: f64, n: usize, phase: f64) -> MultiPolygon<f64> {
        let points: Vec<(f64, f64)> = (0..n)
            .map(|i| {
                let angle = TAU * (phase + i as f64 / n as f64);
                (cx + radius * angle.cos(), cy + radius * angle.sin())
            })
            .collect();
        polygon(&points)
    }

    /// Six mutually overlapping features with no axis-aligned edges.
    fn oblique_features(ops: &GeometryOps) -> Vec<Feature> {
        let half_root = 2f64.sqrt() / 2.0;
        [
            ("hex", regular(0.55, 0.5, 0.42, 6, 0.13)),
            ("pent", regular(0.35, 0.4, 0.3, 5, 0.71)),
            ("tri", polygon(&[(0.1, 0.2), (0.9, 1.0 / 3.0), (0.4, 0.95)])),
            ("wedge", polygon(&[(0.0, 1.0 / 7.0), (1.0, 0.0), (half_root, 1.0)])),
            ("quad", polygon(&[(0.05, 0.5), (0.6, 0.05), (0.95, 0.55), (0.3, 0.98)])),
            ("hept", regular(0.6, 0.65, 0.3, 7, 0.37)),
        ]
        .into_iter()
        .map(|(id, geometry)| Feature::new(id, ops.snap_multi(&geometry)))
        .collect()
    }

    fn assert_no_straddle(ops: &GeometryOps, regions: &[MultiPolygon<f64>], features: &[Feature]) {
        for region in regions {
            for feature in features {
                let inside = ops.covered_by(region, &feature.geometry);
                let outside =
                    ops.area(&ops.intersection(region, &feature.geometry)) < ops.area_tolerance();
                assert!(inside || outside, "region straddles {}", feature.id);
            }
        }
    }

    fn scenario() -> Vec<Feature> {
        vec![
            Feature::new("A", rect(0.0, 0.0, 0.6, 1.0)),
            Feature::new("B", rect(0.4, 0.0, 1.0, 1.0)),
            Feature::new("C", rect(0.0, 0.0, 1.0, 0.3)),
        ]
    }

    #[test]
    fn test_chop_invalid_object_is_dropped() {
        let ops = ops();
        let empty = MultiPolygon::new(Vec::new());
        assert!(chop(&ops, empty, &rect(0.0, 0.0, 1.0, 1.0)).is_empty());
    }

    #[test]
    fn test_chop_invalid_mask_keeps_object() {
        let ops = ops();
        let object = rect(0.0, 0.0, 1.0, 1.0);
        let out = chop(&ops, object.clone(), &MultiPolygon::new(Vec::new()));
        assert_eq!(out, vec![object]);
    }

    #[test]
    fn test_chop_disjoint_touching_equal_within_keep_object() {
        let ops = ops();
        let object = rect(0.0, 0.0, 1.0, 1.0);
        for mask in [
            rect(3.0, 3.0, 4.0, 4.0),
            rect(1.0, 0.0, 2.0, 1.0),
            rect(0.0, 0.0, 1.0, 1.0),
            rect(-1.0, -1.0, 2.0, 2.0),
        ] {
            assert_eq!(chop(&ops, object.clone(), &mask), vec![object.clone()]);
        }
    }

    #[test]
    fn test_chop_contains_emits_ring_and_mask() {
        let ops = ops();
        let object = rect(0.0, 0.0, 3.0, 3.0);
        let mask = rect(1.0, 1.0, 2.0, 2.0);

        let out = chop(&ops, object, &mask);

        assert_eq!(out.len(), 2);
        assert!((ops.area(&out[0]) - 8.0).abs() < 1e-9);
        assert_eq!(out[0].0[0].interiors().len(), 1);
        assert_eq!(out[1], mask);
    }

    #[test]
    fn test_chop_overlap_splits_object() {
        let ops = ops();
        let out = chop(&ops, rect(0.0, 0.0, 2.0, 1.0), &rect(1.0, -1.0, 3.0, 2.0));

        assert_eq!(out.len(), 2);
        assert!(ops.geometrically_equal(&out[0], &rect(0.0, 0.0, 1.0, 1.0)));
        assert!(ops.geometrically_equal(&out[1], &rect(1.0, 0.0, 2.0, 1.0)));
    }

    #[test]
    fn test_chop_overlap_emits_each_outside_part() {
        // A vertical bar through the middle splits the object into three.
        let ops = ops();
        let out = chop(&ops, rect(0.0, 0.0, 3.0, 1.0), &rect(1.0, -1.0, 2.0, 2.0));
        assert_eq!(out.len(), 3);
        assert!((total_area(&ops, &out) - 3.0).abs() < ops.area_tolerance());
    }

    #[test]
    fn test_chop_features_scenario_partition() {
        let ops = ops();
        let result = chop_features(&ops, &scenario(), false);

        // Three columns (x: 0-0.4, 0.4-0.6, 0.6-1) by two rows (y: 0-0.3, 0.3-1).
        assert_eq!(result.regions.len(), 6);
        assert!(result.emitted >= result.regions.len());
        assert!((total_area(&ops, &result.regions) - 1.0).abs() < ops.area_tolerance());
    }

    #[test]
    fn test_regions_never_straddle_features() {
        let ops = ops();
        let features = scenario();
        let result = chop_features(&ops, &features, false);
        assert_no_straddle(&ops, &result.regions, &features);
    }

    #[test]
    fn test_oblique_regions_are_disjoint() {
        let ops = unit_ops();
        let tol = ops.area_tolerance();
        let features = oblique_features(&ops);
        let result = chop_features(&ops, &features, false);
        let regions = &result.regions;
        assert!(regions.len() > features.len());

        // Disjoint regions: their areas add up to the area of the union.
        let union = ops.union_all(features.iter().map(|f| &f.geometry)).unwrap();
        assert!((total_area(&ops, regions) - ops.area(&union)).abs() < tol);
        let regions_union = ops.union_all(regions).unwrap();
        assert!(ops.geometrically_equal(&regions_union, &union));

        for (i, a) in regions.iter().enumerate() {
            for b in &regions[i + 1..] {
                let shared = ops.area(&ops.intersection(a, b));
                assert!(shared < tol, "regions overlap by {shared}");
            }
        }

        assert_no_straddle(&ops, regions, &features);
    }

    #[test]
    fn test_oblique_regions_agree_across_mask_orders() {
        let ops = unit_ops();
        let features = oblique_features(&ops);
        let mut reversed = features.clone();
        reversed.reverse();

        let forward = chop_features(&ops, &features, false);
        let backward = chop_features(&ops, &reversed, false);

        assert_eq!(forward.regions.len(), backward.regions.len());
        for region in &forward.regions {
            assert!(backward
                .regions
                .iter()
                .any(|other| ops.geometrically_equal(region, other)));
        }
    }

    #[test]
    fn test_oblique_split_with_redundant_inner_polygon() {
        // The unit square cut along y = (1 + x) / 3, plus a triangle
        // straddling the cut.
        let ops = unit_ops();
        let features: Vec<Feature> = [
            ("A1", polygon(&[(0.0, 0.0), (1.0, 0.0), (1.0, 2.0 / 3.0), (0.0, 1.0 / 3.0)])),
            ("A2", polygon(&[(0.0, 1.0 / 3.0), (1.0, 2.0 / 3.0), (1.0, 1.0), (0.0, 1.0)])),
            ("P", polygon(&[(0.2, 0.2), (0.8, 0.3), (0.5, 0.8)])),
        ]
        .into_iter()
        .map(|(id, geometry)| Feature::new(id, ops.snap_multi(&geometry)))
        .collect();

        let result = chop_features(&ops, &features, false);

        // A1 and A2 each split into the part inside P and the part outside.
        assert_eq!(result.regions.len(), 4);
        assert!((total_area(&ops, &result.regions) - 1.0).abs() < ops.area_tolerance());
        assert_no_straddle(&ops, &result.regions, &features);
    }

    #[test]
    fn test_mask_order_does_not_change_union() {
        let ops = ops();
        let features = scenario();
        let mut reversed = features.clone();
        reversed.reverse();

        let forward = chop_features(&ops, &features, false);
        let backward = chop_features(&ops, &reversed, false);

        let forward_union = ops.union_all(&forward.regions).unwrap();
        let backward_union = ops.union_all(&backward.regions).unwrap();
        assert!(ops.geometrically_equal(&forward_union, &backward_union));
        assert_eq!(forward.regions.len(), backward.regions.len());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let ops = ops();
        let features = scenario();
        let sequential = chop_features(&ops, &features, false);
        let parallel = chop_features(&ops, &features, true);
        assert_eq!(sequential.regions, parallel.regions);
        assert_eq!(sequential.emitted, parallel.emitted);
    }

    #[test]
    fn test_nested_feature_becomes_its_own_region() {
        let ops = ops();
        let features = vec![
            Feature::new("outer", rect(0.0, 0.0, 3.0, 3.0)),
            Feature::new("inner", rect(1.0, 1.0, 2.0, 2.0)),
        ];
        let result = chop_features(&ops, &features, false);

        assert_eq!(result.regions.len(), 2);
        assert!(result
            .regions
            .iter()
            .any(|r| ops.geometrically_equal(r, &rect(1.0, 1.0, 2.0, 2.0))));
    }
}
