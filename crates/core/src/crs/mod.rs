//! Coordinate Reference System handling
//!
//! paclean never reprojects between arbitrary CRSs. It only needs to know
//! whether the working CRS is geographic (longitude/latitude in degrees) or
//! an equal-area projection, and what its linear unit is.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Linear unit of a CRS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Units {
    Degrees,
    Metres,
    Kilometres,
}

impl Units {
    /// Kilometres per unit, `None` for angular units
    pub fn km_per_unit(&self) -> Option<f64> {
        match self {
            Units::Degrees => None,
            Units::Metres => Some(0.001),
            Units::Kilometres => Some(1.0),
        }
    }
}

/// EPSG codes of geographic CRSs in common use for conservation data
const GEOGRAPHIC_EPSG: &[u32] = &[4326, 4258, 4269, 4283, 4674, 4167];

/// Known equal-area projected CRSs (EPSG and ESRI authority codes), all in metres
const EQUAL_AREA_EPSG: &[u32] = &[
    6933,  // WGS 84 / NSIDC EASE-Grid 2.0 Global
    3035,  // ETRS89-extended / LAEA Europe
    5070,  // NAD83 / Conus Albers
    3410,  // NSIDC EASE-Grid Global
    54009, // World Mollweide
    54017, // World Behrmann
    54034, // World Cylindrical Equal Area
];

/// PROJ projection names that preserve area
const EQUAL_AREA_PROJ: &[&str] = &["laea", "aea", "moll", "cea", "eck4", "eck6", "sinu", "igh"];

/// Coordinate Reference System representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CRS {
    /// WKT representation
    wkt: Option<String>,
    /// EPSG (or ESRI) code if known
    epsg: Option<u32>,
    /// PROJ string if available
    proj: Option<String>,
}

impl CRS {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self {
            wkt: None,
            epsg: Some(code),
            proj: None,
        }
    }

    /// Create a CRS from a WKT string
    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        Self {
            wkt: Some(wkt.into()),
            epsg: None,
            proj: None,
        }
    }

    /// Create a CRS from a PROJ string
    pub fn from_proj(proj: impl Into<String>) -> Self {
        Self {
            wkt: None,
            epsg: None,
            proj: Some(proj.into()),
        }
    }

    /// WGS84 geographic CRS (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::from_epsg(4326)
    }

    /// World Mollweide (ESRI:54009)
    pub fn mollweide() -> Self {
        Self::from_epsg(54009)
    }

    /// A local Lambert azimuthal equal-area plane measured in kilometres.
    ///
    /// Handy for synthetic data and tests where coordinates are already km.
    pub fn local_equal_area_km() -> Self {
        Self::from_proj("+proj=laea +lat_0=0 +lon_0=0 +units=km")
    }

    /// Get EPSG code if known
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// Get WKT representation
    pub fn wkt(&self) -> Option<&str> {
        self.wkt.as_deref()
    }

    /// Get PROJ string
    pub fn proj(&self) -> Option<&str> {
        self.proj.as_deref()
    }

    fn proj_param(&self, key: &str) -> Option<&str> {
        let proj = self.proj.as_deref()?;
        proj.split_whitespace().find_map(|token| {
            token
                .trim_start_matches('+')
                .strip_prefix(key)
                .and_then(|rest| rest.strip_prefix('='))
        })
    }

    /// Whether coordinates are longitude/latitude in degrees
    pub fn is_geographic(&self) -> bool {
        if let Some(code) = self.epsg {
            return GEOGRAPHIC_EPSG.contains(&code);
        }
        if let Some(name) = self.proj_param("proj") {
            return matches!(name, "longlat" | "latlong" | "lonlat" | "latlon");
        }
        if let Some(wkt) = &self.wkt {
            let upper = wkt.trim_start().to_ascii_uppercase();
            return upper.starts_with("GEOGCS") || upper.starts_with("GEOGCRS");
        }
        false
    }

    /// Whether planar area in this CRS equals true area (up to the unit)
    pub fn is_equal_area(&self) -> bool {
        if let Some(code) = self.epsg {
            return EQUAL_AREA_EPSG.contains(&code);
        }
        self.proj_param("proj")
            .is_some_and(|name| EQUAL_AREA_PROJ.contains(&name))
    }

    /// Linear unit of the CRS
    pub fn units(&self) -> Units {
        if self.is_geographic() {
            return Units::Degrees;
        }
        match self.proj_param("units") {
            Some("km") => Units::Kilometres,
            _ => Units::Metres,
        }
    }

    /// Get a string identifier for this CRS
    pub fn identifier(&self) -> String {
        if let Some(code) = self.epsg {
            return format!("EPSG:{}", code);
        }
        if let Some(proj) = &self.proj {
            return proj.clone();
        }
        if let Some(wkt) = &self.wkt {
            return format!("WKT:{}", wkt.chars().take(50).collect::<String>());
        }
        "Unknown".to_string()
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

impl Default for CRS {
    fn default() -> Self {
        Self::wgs84()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crs_epsg() {
        let crs = CRS::from_epsg(4326);
        assert_eq!(crs.epsg(), Some(4326));
        assert_eq!(crs.identifier(), "EPSG:4326");
        assert!(crs.is_geographic());
        assert_eq!(crs.units(), Units::Degrees);
    }

    #[test]
    fn test_equal_area_detection() {
        assert!(CRS::mollweide().is_equal_area());
        assert!(CRS::from_epsg(6933).is_equal_area());
        assert!(!CRS::from_epsg(3857).is_equal_area());
        assert!(!CRS::wgs84().is_equal_area());
    }

    #[test]
    fn test_proj_string_units() {
        let crs = CRS::local_equal_area_km();
        assert!(crs.is_equal_area());
        assert!(!crs.is_geographic());
        assert_eq!(crs.units(), Units::Kilometres);
        assert_eq!(crs.units().km_per_unit(), Some(1.0));

        let metres = CRS::from_proj("+proj=moll +lon_0=0");
        assert_eq!(metres.units(), Units::Metres);

        let geographic = CRS::from_proj("+proj=longlat +datum=WGS84");
        assert!(geographic.is_geographic());
    }

    #[test]
    fn test_wkt_geographic() {
        let crs = CRS::from_wkt("GEOGCS[\"WGS 84\",DATUM[\"WGS_1984\"]]");
        assert!(crs.is_geographic());
    }
}
