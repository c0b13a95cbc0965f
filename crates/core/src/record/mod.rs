//! Typed protected-area records
//!
//! Records move through the pipeline in two shapes:
//! - [`NormalizedRecord`]: typed attributes, geometry still as delivered
//!   (points allowed)
//! - [`ProtectedArea`]: polygonal geometry only, produced by point expansion
//!   and carried through repair, overlap resolution and area recomputation

mod categories;

pub use categories::{DesignationKind, ManagementCategory, Realm, Status};

use geo_types::{Geometry, MultiPolygon};
use serde::{Deserialize, Serialize};

/// Typed attributes shared by every stage. `None` is the explicit unknown marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attributes {
    pub id: String,
    pub name: Option<String>,
    pub status: Status,
    pub designation_kind: DesignationKind,
    pub management_category: Option<ManagementCategory>,
    pub realm: Realm,
    pub reported_area_km2: Option<f64>,
    pub established_year: Option<u16>,
    /// ISO3 country or region code
    pub region: Option<String>,
}

impl Attributes {
    /// Minimal attributes: a designated, national, terrestrial record
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            status: Status::Designated,
            designation_kind: DesignationKind::National,
            management_category: None,
            realm: Realm::Terrestrial,
            reported_area_km2: None,
            established_year: None,
            region: None,
        }
    }
}

/// Output of the attribute normalizer
#[derive(Debug, Clone)]
pub struct NormalizedRecord {
    pub attributes: Attributes,
    pub geometry: Geometry<f64>,
}

impl NormalizedRecord {
    pub fn new(attributes: Attributes, geometry: Geometry<f64>) -> Self {
        Self { attributes, geometry }
    }

    pub fn id(&self) -> &str {
        &self.attributes.id
    }
}

/// A record with polygonal geometry
#[derive(Debug, Clone)]
pub struct ProtectedArea {
    pub attributes: Attributes,
    pub geometry: MultiPolygon<f64>,
    /// Area derived from `geometry` under an equal-area projection.
    /// Set by the area recomputer; any geometry change resets it.
    pub computed_area_km2: Option<f64>,
}

impl ProtectedArea {
    pub fn new(attributes: Attributes, geometry: MultiPolygon<f64>) -> Self {
        Self {
            attributes,
            geometry,
            computed_area_km2: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.attributes.id
    }

    pub fn realm(&self) -> Realm {
        self.attributes.realm
    }

    /// New record carrying the same attributes but a different geometry.
    /// The computed area is cleared so it can never be stale.
    pub fn with_geometry(&self, geometry: MultiPolygon<f64>) -> Self {
        Self {
            attributes: self.attributes.clone(),
            geometry,
            computed_area_km2: None,
        }
    }
}
