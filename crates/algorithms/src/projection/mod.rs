//! Equal-area projections used for point expansion and area accounting

mod equal_area;

pub use equal_area::{EqualAreaProjection, AUTHALIC_RADIUS_KM};
