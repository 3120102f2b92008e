//! Minimal polygon coverage for Fluree DB.
//!
//! Given a query region and a set of candidate polygon features (survey
//! tiles, administrative zones, sensor footprints, ...), selects a small
//! subset of feature identifiers whose combined area covers the region.
//!
//! # Architecture
//!
//! ```text
//!   query region + candidates (pre-filtered by FeatureSource)
//!                      │
//!                      ▼
//!                   Clipper ──────────────────────────┐
//!                      │                              │
//!                      ▼                              ▼
//!          Chopper (pairwise, then dedup)   Mandatory-region detector
//!                      │                              │
//!                      ▼                              │
//!              Incidence builder                      │
//!          (feature ↔ atomic region)                  │
//!                      │                              │
//!                      ▼                              │
//!             Greedy set-cover solver ◄───────────────┘
//!                      │
//!                      ▼
//!            selected feature identifiers
//! ```
//!
//! Every boolean operation of a run executes on one fixed-precision grid,
//! sized to the query extent, and every fragile predicate falls back to an
//! area tolerance matched to that grid (see [`geometry`]).
//!
//! # Modules
//!
//! - [`config`]: Engine configuration (tolerance, grid, parallelism)
//! - [`geometry`]: Geometry adapter over the `geo` crate
//! - [`feature`]: Candidate and clipped feature types
//! - [`source`]: Feature source trait and in-memory implementation
//! - [`clip`]: Clipping candidates to the query region
//! - [`mandatory`]: Identifiers no other candidate can substitute for
//! - [`chop`]: Atomic-region partitioning
//! - [`incidence`]: Feature ↔ region incidence maps
//! - [`solver`]: Greedy set cover
//! - [`error`]: Error types

pub mod chop;
pub mod clip;
pub mod config;
pub(crate) mod dedup;
pub mod error;
pub mod feature;
mod frame;
mod generator;
pub mod geometry;
pub mod incidence;
pub mod mandatory;
pub mod solver;
pub mod source;

// Re-export key types
pub use config::CoverageConfig;
pub use error::{CoverageError, Result};
pub use feature::{CandidateFeature, Feature};
pub use generator::{CoverageGenerator, CoverageReport, CoverageStats};
pub use geometry::{parse_wkt, GeometryOps, Relation};
pub use incidence::{IncidenceMap, RegionId};
pub use solver::{CoverSolution, SelectionStep};
pub use source::{FeatureSource, MemoryFeatureSource};

use geo_types::Geometry;
use std::collections::BTreeSet;

/// Select feature identifiers covering `query` with the default
/// configuration.
///
/// Shorthand for [`CoverageGenerator::generate`]; use the generator directly
/// to inspect completeness and run statistics.
pub fn generate(
    query: &Geometry<f64>,
    candidates: &[CandidateFeature],
    id_attribute: &str,
) -> Result<BTreeSet<String>> {
    let generator = CoverageGenerator::new(CoverageConfig::default())?;
    let report = generator.generate(query, candidates, id_attribute)?;
    Ok(report.solution.selected)
}
