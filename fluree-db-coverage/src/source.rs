//! Feature source trait.
//!
//! Abstracts over the store that supplies candidate features. The coverage
//! engine only needs the candidates that intersect the query region; how a
//! store finds them (spatial index, attribute filter, remote call) is its
//! own business.
//!
//! [`MemoryFeatureSource`] keeps candidates in memory with a precomputed
//! bounding box per feature: a bbox prefilter rejects most candidates before
//! the exact `intersects` predicate runs.

use crate::error::Result;
use crate::feature::CandidateFeature;
use crate::geometry::{parse_wkt, BBox};
use geo::Intersects;
use geo_types::MultiPolygon;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Supplier of candidate features.
pub trait FeatureSource: Send + Sync {
    /// All features whose geometry intersects `query`.
    fn features_intersecting(&self, query: &MultiPolygon<f64>) -> Result<Vec<CandidateFeature>>;
}

struct SourceEntry {
    feature: CandidateFeature,
    bbox: Option<BBox>,
}

/// In-memory feature source with a bbox prefilter.
#[derive(Default)]
pub struct MemoryFeatureSource {
    entries: Vec<SourceEntry>,
}

impl MemoryFeatureSource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a feature.
    pub fn add(&mut self, feature: CandidateFeature) {
        let bbox = BBox::from_geometry(&feature.geometry);
        self.entries.push(SourceEntry { feature, bbox });
    }

    /// Parse `wkt` and add it as a feature.
    pub fn add_wkt(
        &mut self,
        fid: impl Into<String>,
        properties: Map<String, Value>,
        wkt: &str,
    ) -> Result<()> {
        let geometry = parse_wkt(wkt)?;
        self.add(CandidateFeature::new(fid, properties, geometry));
        Ok(())
    }

    /// Number of features.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the source is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all features in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &CandidateFeature> {
        self.entries.iter().map(|e| &e.feature)
    }

    /// Original (unclipped) features whose `id_attribute` is in `ids`, in
    /// insertion order. Features without a usable identifier are skipped.
    pub fn features_with_ids(
        &self,
        ids: &BTreeSet<String>,
        id_attribute: &str,
    ) -> Vec<&CandidateFeature> {
        self.iter()
            .filter(|f| f.id(id_attribute).is_ok_and(|id| ids.contains(&id)))
            .collect()
    }
}

impl FeatureSource for MemoryFeatureSource {
    fn features_intersecting(&self, query: &MultiPolygon<f64>) -> Result<Vec<CandidateFeature>> {
        let query_bbox = BBox::from_multi_polygon(query);

        let mut results = Vec::new();
        for entry in &self.entries {
            // Bbox prefilter
            if let (Some(query_bbox), Some(entry_bbox)) = (&query_bbox, &entry.bbox) {
                if !query_bbox.intersects(entry_bbox) {
                    continue;
                }
            }

            // Exact predicate
            if entry.feature.geometry.intersects(query) {
                results.push(entry.feature.clone());
            }
        }

        tracing::trace!(
            total = self.entries.len(),
            matched = results.len(),
            "Filtered candidates by query region"
        );

        Ok(results)
    }
}
