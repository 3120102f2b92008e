//! Coverage generator.
//!
//! Runs the full pipeline for one query region:
//! 1. Fixes the precision grid for the query extent and snaps the query
//!    region onto it
//! 2. Clips every candidate to the query region
//! 3. Detects mandatory identifiers among the clipped features
//! 4. Chops the clipped features into deduplicated atomic regions
//! 5. Builds the feature ↔ region incidence
//! 6. Greedily solves the set cover, seeded with the mandatory identifiers
//!
//! # Usage
//!
//! ```ignore
//! let generator = CoverageGenerator::new(CoverageConfig::default())?;
//! let report = generator.generate(&query, &candidates, "tile_id")?;
//! if !report.solution.is_complete() {
//!     // gap in candidate coverage: report.solution.selected is the best partial cover
//! }
//! ```

use crate::chop::chop_features;
use crate::clip::clip_features;
use crate::config::CoverageConfig;
use crate::error::{CoverageError, Result};
use crate::feature::CandidateFeature;
use crate::geometry::{to_multi_polygon, BBox, GeometryOps};
use crate::incidence::{build_incidence, RegionId};
use crate::mandatory::mandatory_ids;
use crate::solver::{solve_greedy, CoverSolution};
use crate::source::FeatureSource;
use geo_types::{Geometry, MultiPolygon};
use std::collections::BTreeSet;

/// Statistics collected during one coverage run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverageStats {
    /// Number of candidates handed to the clipper.
    pub candidates: usize,

    /// Number of clipped features kept.
    pub clipped: usize,

    /// Number of candidates dropped (empty, invalid, or sliver clip).
    pub dropped: usize,

    /// Number of mandatory identifiers.
    pub mandatory: usize,

    /// Regions produced by chopping, before deduplication.
    pub chopped_regions: usize,

    /// Atomic regions after deduplication.
    pub atomic_regions: usize,

    /// Recorded (feature, region) incidence pairs.
    pub incidences: usize,

    /// Number of selected identifiers.
    pub selected: usize,
}

/// Solution plus run statistics.
#[derive(Debug, Clone, Default)]
pub struct CoverageReport {
    pub solution: CoverSolution,
    pub stats: CoverageStats,

    /// Grid spacing the run's geometry operations used.
    pub grid_spacing: f64,

    /// Effective area tolerance of the run.
    pub area_tolerance: f64,
}

impl CoverageReport {
    /// Selected feature identifiers.
    pub fn selected(&self) -> &BTreeSet<String> {
        &self.solution.selected
    }
}

/// Minimal-coverage generator.
pub struct CoverageGenerator {
    config: CoverageConfig,
}

impl CoverageGenerator {
    /// Create a generator, validating the configuration.
    pub fn new(config: CoverageConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Get the configuration.
    pub fn config(&self) -> &CoverageConfig {
        &self.config
    }

    /// Geometry adapter for a run over `query`: its grid and tolerance are
    /// sized to the query's bounding box.
    pub fn ops_for(&self, query: &Geometry<f64>) -> Result<GeometryOps> {
        if to_multi_polygon(query).is_none() {
            return Err(CoverageError::InvalidGeometry(
                "query region must be a Polygon or MultiPolygon".into(),
            ));
        }
        match BBox::from_geometry(query) {
            Some(extent) if extent.is_finite() => Ok(GeometryOps::new(&self.config, &extent)),
            Some(_) => Err(CoverageError::InvalidGeometry(
                "query region has non-finite bounds".into(),
            )),
            None => Err(CoverageError::InvalidGeometry("query region is empty".into())),
        }
    }

    /// Select a small set of identifiers whose features cover `query`.
    ///
    /// `candidates` should already be restricted to features intersecting
    /// the query; others are dropped by the clipper anyway. Identifiers are
    /// read from `id_attribute`.
    pub fn generate(
        &self,
        query: &Geometry<f64>,
        candidates: &[CandidateFeature],
        id_attribute: &str,
    ) -> Result<CoverageReport> {
        let ops = self.ops_for(query)?;
        let query = prepare_query(&ops, query)?;
        self.run(&ops, &query, candidates, id_attribute)
    }

    /// Fetch candidates intersecting `query` from `source`, then
    /// [`generate`](Self::generate).
    pub fn generate_from_source(
        &self,
        query: &Geometry<f64>,
        source: &dyn FeatureSource,
        id_attribute: &str,
    ) -> Result<CoverageReport> {
        let ops = self.ops_for(query)?;
        let query = prepare_query(&ops, query)?;
        let candidates = source.features_intersecting(&query)?;
        self.run(&ops, &query, &candidates, id_attribute)
    }

    fn run(
        &self,
        ops: &GeometryOps,
        query: &MultiPolygon<f64>,
        candidates: &[CandidateFeature],
        id_attribute: &str,
    ) -> Result<CoverageReport> {
        let _span = tracing::debug_span!(
            "coverage_generate",
            candidates = candidates.len(),
            id_attribute = id_attribute,
            parallel = self.config.parallel,
            grid_spacing = ops.spacing(),
            area_tolerance = ops.area_tolerance()
        )
        .entered();

        let mut stats = CoverageStats {
            candidates: candidates.len(),
            ..Default::default()
        };

        let clip = {
            let _span = tracing::debug_span!("coverage_clip").entered();
            clip_features(ops, candidates, query, id_attribute)?
        };
        stats.clipped = clip.features.len();
        stats.dropped = clip.dropped;
        let features = clip.features;

        let mandatory = {
            let _span = tracing::debug_span!("coverage_mandatory", features = features.len())
                .entered();
            mandatory_ids(ops, &features)
        };
        stats.mandatory = mandatory.len();

        let chopped = {
            let _span =
                tracing::debug_span!("coverage_chop", features = features.len()).entered();
            chop_features(ops, &features, self.config.parallel)
        };
        stats.chopped_regions = chopped.emitted;
        stats.atomic_regions = chopped.regions.len();

        let incidence = {
            let _span = tracing::debug_span!(
                "coverage_incidence",
                regions = chopped.regions.len(),
                features = features.len()
            )
            .entered();
            build_incidence(ops, &chopped.regions, &features, self.config.parallel)
        };
        stats.incidences = incidence.pair_count();

        let universe: BTreeSet<RegionId> = incidence.invert().keys().copied().collect();

        let solution = {
            let _span = tracing::debug_span!(
                "coverage_solve",
                universe = universe.len(),
                mandatory = mandatory.len()
            )
            .entered();
            solve_greedy(&universe, &incidence, &mandatory, self.config.parallel)
        };
        stats.selected = solution.selected.len();

        if solution.is_complete() {
            tracing::debug!(
                clipped = stats.clipped,
                regions = stats.atomic_regions,
                mandatory = stats.mandatory,
                selected = stats.selected,
                "Coverage complete"
            );
        } else {
            tracing::warn!(
                uncovered = solution.uncovered(),
                universe = solution.universe_size,
                selected = stats.selected,
                "Candidates cannot cover every region; returning partial cover"
            );
        }

        Ok(CoverageReport {
            solution,
            stats,
            grid_spacing: ops.spacing(),
            area_tolerance: ops.area_tolerance(),
        })
    }
}

fn prepare_query(ops: &GeometryOps, query: &Geometry<f64>) -> Result<MultiPolygon<f64>> {
    let snapped = ops.snap(query)?;
    if !ops.is_valid_polygonal(&snapped) {
        return Err(CoverageError::InvalidGeometry(
            "query region is empty or invalid after snapping".into(),
        ));
    }
    Ok(snapped)
}
