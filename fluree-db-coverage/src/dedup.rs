//! Tolerance-aware deduplication of atomic regions.
//!
//! Independent chops of different feature pairs over the same locus can
//! regenerate the same region more than once. Regions have no assigned
//! identity, so duplicates are detected geometrically and the first
//! occurrence wins.
//!
//! # Strategy
//!
//! 1. **Key match**: identical [`RegionKey`]s are duplicates (exact, O(1)).
//! 2. **Disjoint bounds**: if bboxes do not meet, the symmetric difference is
//!    the sum of both areas, so equality reduces to an area comparison.
//! 3. **Tolerance test**: otherwise fall back to
//!    [`GeometryOps::geometrically_equal`].

use crate::geometry::{BBox, GeometryOps, RegionKey};
use geo_types::MultiPolygon;
use rustc_hash::FxHashSet;

struct Kept {
    bbox: Option<BBox>,
    area: f64,
}

/// Deduplicate regions, keeping the first occurrence of each.
pub fn dedup_keep_first(
    ops: &GeometryOps,
    regions: impl IntoIterator<Item = MultiPolygon<f64>>,
) -> Vec<MultiPolygon<f64>> {
    let mut seen: FxHashSet<RegionKey> = FxHashSet::default();
    let mut kept: Vec<Kept> = Vec::new();
    let mut result: Vec<MultiPolygon<f64>> = Vec::new();

    for region in regions {
        let key = ops.region_key(&region);
        if seen.contains(&key) {
            continue;
        }

        let bbox = BBox::from_multi_polygon(&region);
        let area = ops.area(&region);
        let duplicate = kept.iter().zip(&result).any(|(other, other_region)| {
            match (&bbox, &other.bbox) {
                (Some(a), Some(b)) if !a.intersects(b) => {
                    area + other.area < ops.area_tolerance()
                }
                _ => ops.geometrically_equal(&region, other_region),
            }
        });
        if duplicate {
            continue;
        }

        seen.insert(key);
        kept.push(Kept { bbox, area });
        result.push(region);
    }

    result
}
