//! Attribute normalization: sentinel codes and record filters

mod normalizer;
mod sentinel;

pub use normalizer::{normalize, AttributeNormalizer, NormalizeParams};
pub use sentinel::SentinelCodes;

/// Property keys read from raw features
pub mod fields {
    pub const ID: &str = "id";
    pub const NAME: &str = "name";
    pub const STATUS: &str = "status";
    pub const DESIGNATION_KIND: &str = "designation_kind";
    pub const MANAGEMENT_CATEGORY: &str = "management_category";
    pub const REALM: &str = "realm";
    pub const REPORTED_AREA: &str = "reported_area_km2";
    pub const ESTABLISHED_YEAR: &str = "established_year";
    pub const REGION: &str = "region";
}
