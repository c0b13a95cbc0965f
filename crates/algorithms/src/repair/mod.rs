//! Precision snapping and topology repair

mod repairer;

pub use repairer::{repair_geometry, repair_records, GeometryRepairer, RepairError, RepairParams};
