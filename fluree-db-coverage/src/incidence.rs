//! Incidence between feature identifiers and atomic regions.
//!
//! The primary view maps each feature identifier to the regions it covers;
//! its inverse maps each region to the identifiers covering it. Both are
//! ordered maps so that iteration, and everything downstream of it, is
//! deterministic.

use crate::feature::Feature;
use crate::geometry::{BBox, GeometryOps};
use geo_types::MultiPolygon;
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

/// Index of an atomic region in the deduplicated region list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegionId(pub usize);

/// Mapping from key to a set of values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncidenceMap<K: Ord, V: Ord> {
    map: BTreeMap<K, BTreeSet<V>>,
}

impl<K: Ord, V: Ord> Default for IncidenceMap<K, V> {
    fn default() -> Self {
        Self {
            map: BTreeMap::new(),
        }
    }
}

impl<K: Ord + Clone, V: Ord + Clone> IncidenceMap<K, V> {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `key → value`.
    pub fn add(&mut self, key: K, value: V) {
        self.map.entry(key).or_default().insert(value);
    }

    /// Values recorded for `key`.
    pub fn get(&self, key: &K) -> Option<&BTreeSet<V>> {
        self.map.get(key)
    }

    /// Keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.map.keys()
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &BTreeSet<V>)> {
        self.map.iter()
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Check if the map is empty.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Total number of recorded pairs.
    pub fn pair_count(&self) -> usize {
        self.map.values().map(BTreeSet::len).sum()
    }

    /// Swap keys and values across all recorded pairs.
    pub fn invert(&self) -> IncidenceMap<V, K> {
        let mut inverted = IncidenceMap::new();
        for (key, values) in &self.map {
            for value in values {
                inverted.add(value.clone(), key.clone());
            }
        }
        inverted
    }
}

/// Build the feature → region incidence.
///
/// A region is incident to a feature when it is covered by that feature's
/// clipped geometry (literally, or with a residual below the tolerance).
/// Regions are tested independently; with `parallel` they are tested on the
/// rayon pool and merged in region order.
pub fn build_incidence(
    ops: &GeometryOps,
    regions: &[MultiPolygon<f64>],
    features: &[Feature],
    parallel: bool,
) -> IncidenceMap<String, RegionId> {
    let feature_bboxes: Vec<Option<BBox>> = features
        .iter()
        .map(|f| BBox::from_multi_polygon(&f.geometry))
        .collect();

    let covering_features = |region: &MultiPolygon<f64>| -> Vec<usize> {
        let region_bbox = BBox::from_multi_polygon(region);
        // A sub-tolerance region is covered by everything; only larger
        // regions can be rejected on bounds alone.
        let can_prefilter = ops.area(region) >= ops.area_tolerance();
        features
            .iter()
            .enumerate()
            .filter(|(i, feature)| {
                if can_prefilter {
                    if let (Some(a), Some(b)) = (&region_bbox, &feature_bboxes[*i]) {
                        if !a.intersects(b) {
                            return false;
                        }
                    }
                }
                ops.covered_by(region, &feature.geometry)
            })
            .map(|(i, _)| i)
            .collect()
    };

    let per_region: Vec<Vec<usize>> = if parallel {
        regions.par_iter().map(covering_features).collect()
    } else {
        regions.iter().map(covering_features).collect()
    };

    let mut incidence = IncidenceMap::new();
    for (region_idx, coverers) in per_region.into_iter().enumerate() {
        for feature_idx in coverers {
            incidence.add(features[feature_idx].id.clone(), RegionId(region_idx));
        }
    }
    incidence
}
