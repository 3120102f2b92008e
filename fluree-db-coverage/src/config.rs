//! Coverage engine configuration.
//!
//! The tolerance and snapping grid are explicit values threaded into
//! [`GeometryOps`](crate::geometry::GeometryOps) at construction, so callers
//! (and tests) can run the engine at different precisions. Both are upper
//! bounds on precision: a run over a wide extent gets a coarser grid, and a
//! coarser grid raises the effective tolerance to match.

use crate::error::{CoverageError, Result};
use serde::{Deserialize, Serialize};

/// Default area tolerance (square units of the working coordinate system).
pub const DEFAULT_AREA_TOLERANCE: f64 = 1e-10;

/// Default snapping grid scale, 2^30: coordinates are rounded to multiples of
/// `2^-30`. Finer grids are not representable by the overlay for unit-sized
/// extents.
pub const DEFAULT_GRID_SCALE: f64 = 1_073_741_824.0;

/// Configuration for a coverage run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverageConfig {
    /// Residual area below which two geometries are treated as covering or
    /// equalling each other. Acts as a floor; see
    /// [`GeometryOps::area_tolerance`](crate::geometry::GeometryOps::area_tolerance).
    /// Default: 1e-10
    pub area_tolerance: f64,

    /// Finest grid scale for snapping and boolean operations. Higher = finer
    /// grid. Rounded down to a power of two, and coarsened further when the
    /// working extent would not fit the overlay's integer range.
    /// Default: 2^30
    pub grid_scale: f64,

    /// Run per-region chopping, incidence tests, and gain computation on the
    /// rayon pool. Results are identical either way.
    /// Default: true
    pub parallel: bool,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            area_tolerance: DEFAULT_AREA_TOLERANCE,
            grid_scale: DEFAULT_GRID_SCALE,
            parallel: true,
        }
    }
}

impl CoverageConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the area tolerance.
    pub fn with_area_tolerance(mut self, area_tolerance: f64) -> Self {
        self.area_tolerance = area_tolerance;
        self
    }

    /// Set the snapping grid scale.
    pub fn with_grid_scale(mut self, grid_scale: f64) -> Self {
        self.grid_scale = grid_scale;
        self
    }

    /// Enable or disable rayon parallelism.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Check that tolerance and grid are usable.
    pub fn validate(&self) -> Result<()> {
        if !self.area_tolerance.is_finite() || self.area_tolerance <= 0.0 {
            return Err(CoverageError::Config(format!(
                "area_tolerance must be finite and positive, got {}",
                self.area_tolerance
            )));
        }
        if !self.grid_scale.is_finite() || self.grid_scale <= 0.0 {
            return Err(CoverageError::Config(format!(
                "grid_scale must be finite and positive, got {}",
                self.grid_scale
            )));
        }
        Ok(())
    }
}
