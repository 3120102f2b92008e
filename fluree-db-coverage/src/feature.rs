//! Feature data model.
//!
//! [`CandidateFeature`] is what the caller hands in: an arbitrary geometry
//! plus an attribute bag from which the cover identifier is read.
//! [`Feature`] is the engine's own value once a candidate has been clipped
//! to the query region. Identifiers are not unique: several features may
//! carry the same id and are then treated as parts of one logical feature.

use crate::error::{CoverageError, Result};
use geo_types::{Geometry, MultiPolygon};
use serde_json::{Map, Value};

/// Candidate feature as read from a feature store.
#[derive(Debug, Clone)]
pub struct CandidateFeature {
    /// Store-level feature identifier (used in error messages and as the
    /// fallback display name).
    pub fid: String,

    /// Attribute values.
    pub properties: Map<String, Value>,

    /// Source geometry, not yet clipped or snapped.
    pub geometry: Geometry<f64>,
}

impl CandidateFeature {
    /// Create a candidate.
    pub fn new(
        fid: impl Into<String>,
        properties: Map<String, Value>,
        geometry: Geometry<f64>,
    ) -> Self {
        Self {
            fid: fid.into(),
            properties,
            geometry,
        }
    }

    /// Create a candidate whose only attribute is `attribute = id`.
    pub fn with_id(
        attribute: &str,
        id: impl Into<String>,
        geometry: Geometry<f64>,
    ) -> Self {
        let id = id.into();
        let mut properties = Map::new();
        properties.insert(attribute.to_string(), Value::String(id.clone()));
        Self::new(id, properties, geometry)
    }

    /// Read the cover identifier from `attribute`.
    ///
    /// Strings are used verbatim; numbers and booleans use their JSON text.
    /// Missing, null, array, and object values are rejected.
    pub fn id(&self, attribute: &str) -> Result<String> {
        match self.properties.get(attribute) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(Value::Number(n)) => Ok(n.to_string()),
            Some(Value::Bool(b)) => Ok(b.to_string()),
            _ => Err(CoverageError::MissingIdAttribute {
                feature: self.fid.clone(),
                attribute: attribute.to_string(),
            }),
        }
    }
}

/// A clipped feature: identifier plus a snapped, valid polygonal geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: String,
    pub geometry: MultiPolygon<f64>,
}

impl Feature {
    pub fn new(id: impl Into<String>, geometry: MultiPolygon<f64>) -> Self {
        Self {
            id: id.into(),
            geometry,
        }
    }
}
