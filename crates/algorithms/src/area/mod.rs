//! Equal-area recomputation of record areas

mod recompute;

pub use recompute::{geometry_area_km2, recompute_areas, AreaParams, AreaRecomputer};
