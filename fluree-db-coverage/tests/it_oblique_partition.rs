//! Partitioning and selection over candidates with oblique edges, where
//! every cut point falls between grid points.

mod support;

use fluree_db_coverage::chop::chop_features;
use fluree_db_coverage::clip::clip_features;
use fluree_db_coverage::{CandidateFeature, CoverageConfig, CoverageGenerator, GeometryOps};
use geo_types::MultiPolygon;
use support::{candidate, ids, polygon_wkt, selected_union, unit_square, ID_ATTR};

fn generator() -> CoverageGenerator {
    CoverageGenerator::new(CoverageConfig::default()).unwrap()
}

fn oblique(id: &str, points: &[(f64, f64)]) -> CandidateFeature {
    candidate(id, &polygon_wkt(points))
}

/// Six overlapping candidates over the unit square; "sw" (x + y < 1.1)
/// and "ne" (x + y > 0.9) cover it between them.
fn oblique_candidates() -> Vec<CandidateFeature> {
    vec![
        oblique("sw", &[(-0.5, -0.5), (1.3, -0.2), (-0.2, 1.3)]),
        oblique("ne", &[(1.5, 1.5), (-0.3, 1.2), (1.2, -0.3)]),
        oblique("band", &[(-0.3, 0.35), (1.3, 0.05), (1.3, 0.6), (-0.3, 0.9)]),
        oblique("kite", &[(0.5, -0.2), (1.2, 0.5), (0.5, 1.2), (-0.2, 0.5)]),
        oblique("north", &[(-0.2, 0.8), (1.2, 0.7), (1.1, 1.3), (0.1, 1.25)]),
        oblique("west", &[(-0.4, -0.1), (0.3, 0.2), (0.45, 1.4), (-0.3, 1.1)]),
    ]
}

/// Oblique split of the unit square along y = (1 + x) / 3, plus a triangle
/// straddling the cut that the two halves make redundant.
fn split_with_inner_triangle() -> Vec<CandidateFeature> {
    vec![
        oblique("A1", &[(0.0, 0.0), (1.0, 0.0), (1.0, 2.0 / 3.0), (0.0, 1.0 / 3.0)]),
        oblique("A2", &[(0.0, 1.0 / 3.0), (1.0, 2.0 / 3.0), (1.0, 1.0), (0.0, 1.0)]),
        oblique("P", &[(0.2, 0.2), (0.8, 0.3), (0.5, 0.8)]),
    ]
}

/// Clip and chop `candidates` over the unit square the way a run does.
fn partition(candidates: &[CandidateFeature]) -> (GeometryOps, Vec<MultiPolygon<f64>>) {
    let ops = generator().ops_for(&unit_square()).unwrap();
    let query = ops.snap(&unit_square()).unwrap();
    let clipped = clip_features(&ops, candidates, &query, ID_ATTR).unwrap();
    let regions = chop_features(&ops, &clipped.features, false).regions;
    (ops, regions)
}

#[test]
fn test_oblique_regions_tile_the_query() {
    let candidates = oblique_candidates();
    let (ops, regions) = partition(&candidates);
    let tol = ops.area_tolerance();

    // The candidates cover the query, so disjoint regions sum to its area.
    let total: f64 = regions.iter().map(|r| ops.area(r)).sum();
    assert!((total - 1.0).abs() < tol, "region areas sum to {total}");

    for (i, a) in regions.iter().enumerate() {
        for b in &regions[i + 1..] {
            let shared = ops.area(&ops.intersection(a, b));
            assert!(shared < tol, "regions overlap by {shared}");
        }
    }
}

#[test]
fn test_oblique_regions_never_straddle_candidates() {
    let candidates = oblique_candidates();
    let (ops, regions) = partition(&candidates);
    let query = ops.snap(&unit_square()).unwrap();
    let features = clip_features(&ops, &candidates, &query, ID_ATTR)
        .unwrap()
        .features;

    for region in &regions {
        for feature in &features {
            let inside = ops.covered_by(region, &feature.geometry);
            let outside =
                ops.area(&ops.intersection(region, &feature.geometry)) < ops.area_tolerance();
            assert!(inside || outside, "region straddles {}", feature.id);
        }
    }
}

#[test]
fn test_oblique_candidates_cover_the_query() {
    let candidates = oblique_candidates();
    let report = generator()
        .generate(&unit_square(), &candidates, ID_ATTR)
        .unwrap();

    assert!(report.solution.is_complete());
    // Only "sw" reaches the (0, 0) corner.
    assert!(report.solution.mandatory.contains("sw"));
    assert!(report.selected().len() <= 3);

    let ops = generator().ops_for(&unit_square()).unwrap();
    let query = ops.snap(&unit_square()).unwrap();
    let union = selected_union(&ops, &candidates, report.selected()).unwrap();
    assert!(ops.covered_by(&query, &union));
}

#[test]
fn test_oblique_split_ignores_redundant_triangle() {
    let candidates = split_with_inner_triangle();
    let report = generator()
        .generate(&unit_square(), &candidates, ID_ATTR)
        .unwrap();

    // Each half splits into its part inside P and its part outside.
    assert_eq!(report.stats.atomic_regions, 4);
    assert_eq!(report.solution.mandatory, ids(&["A1", "A2"]));
    assert!(report.solution.steps.is_empty());
    assert_eq!(report.selected(), &ids(&["A1", "A2"]));
}

#[test]
fn test_identical_oblique_candidates_share_regions() {
    let triangle = [(-0.1, 0.05), (1.2, 1.0 / 3.0), (0.3, 1.1)];
    let candidates = vec![oblique("B", &triangle), oblique("A", &triangle)];
    let report = generator()
        .generate(&unit_square(), &candidates, ID_ATTR)
        .unwrap();

    assert_eq!(report.stats.atomic_regions, 1);
    assert!(report.solution.mandatory.is_empty());
    assert_eq!(report.selected(), &ids(&["A"]));
    assert_eq!(report.solution.steps[0].gain, 1);
}
