//! Mandatory-region detection.
//!
//! An identifier is mandatory when the union of its clipped parts is not
//! covered by the union of every other identifier's parts: it owns area that
//! no other candidate can substitute for, so every valid cover contains it.
//! The result seeds the set-cover solver.

use crate::feature::Feature;
use crate::geometry::GeometryOps;
use geo_types::MultiPolygon;
use std::collections::{BTreeMap, BTreeSet};

/// Identifiers whose clipped footprint is not covered by all other features.
///
/// An identifier is skipped (not forced mandatory) when its own union or the
/// union of the others is absent or invalid.
pub fn mandatory_ids(ops: &GeometryOps, features: &[Feature]) -> BTreeSet<String> {
    let mut by_id: BTreeMap<&str, Vec<&MultiPolygon<f64>>> = BTreeMap::new();
    for feature in features {
        by_id
            .entry(feature.id.as_str())
            .or_default()
            .push(&feature.geometry);
    }

    let mut mandatory = BTreeSet::new();

    for (&id, parts) in &by_id {
        let Some(this_geometry) = ops.union_all(parts.iter().copied()) else {
            continue;
        };
        let others = features
            .iter()
            .filter(|f| f.id != id)
            .map(|f| &f.geometry);
        let Some(other_geometry) = ops.union_all(others) else {
            tracing::trace!(id = %id, "No other features; skipping mandatory check");
            continue;
        };

        if !ops.is_valid_polygonal(&this_geometry) || !ops.is_valid_polygonal(&other_geometry) {
            tracing::debug!(id = %id, "Invalid union; skipping mandatory check");
            continue;
        }

        if !ops.covered_by(&this_geometry, &other_geometry) {
            mandatory.insert(id.to_string());
        }
    }

    mandatory
}
