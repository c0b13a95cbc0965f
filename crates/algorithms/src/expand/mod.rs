//! Point-to-polygon expansion

mod circle;
mod expander;

pub use circle::{circle_ring, equal_area_radius, geographic_circle, planar_circle};
pub use expander::{expand_points, ExpandParams, PointExpander, MIN_SEGMENTS};
