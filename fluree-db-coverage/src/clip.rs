//! Clipper: intersects each candidate with the query region.
//!
//! Candidates are only ever clipped against the query, never against each
//! other. A candidate reaching past the working frame is first cut back to
//! it, so the clip itself runs on the grid. Results that are not a valid
//! Polygon/MultiPolygon after snapping, or smaller than the area tolerance,
//! are dropped silently; they simply contribute nothing.

use crate::error::Result;
use crate::feature::{CandidateFeature, Feature};
use crate::geometry::GeometryOps;
use geo_types::MultiPolygon;

/// Output of [`clip_features`].
#[derive(Debug, Clone, Default)]
pub struct ClipResult {
    /// Clipped features, in candidate order.
    pub features: Vec<Feature>,

    /// Number of candidates whose clip was empty, invalid, or a sliver.
    pub dropped: usize,
}

/// Clip every candidate to `query`.
///
/// `query` must already be snapped. Fails on the first candidate whose
/// identifier cannot be read or whose geometry has non-finite coordinates.
pub fn clip_features(
    ops: &GeometryOps,
    candidates: &[CandidateFeature],
    query: &MultiPolygon<f64>,
    id_attribute: &str,
) -> Result<ClipResult> {
    let mut result = ClipResult::default();

    for candidate in candidates {
        let id = candidate.id(id_attribute)?;
        let geometry = ops.snap(&candidate.geometry)?;

        if !ops.is_valid_polygonal(&geometry) {
            result.dropped += 1;
            tracing::trace!(id = %id, fid = %candidate.fid, "Dropping non-polygonal candidate");
            continue;
        }

        let clipped = ops.intersection(&ops.restrict_to_frame(&geometry), query);
        if !ops.is_significant(&clipped) {
            result.dropped += 1;
            tracing::trace!(id = %id, fid = %candidate.fid, "Dropping insignificant clip");
            continue;
        }

        result.features.push(Feature::new(id, clipped));
    }

    Ok(result)
}
