//! Unattributed dissolve by cascaded union

mod cascade;

pub use cascade::{dissolve, dissolve_by, dissolve_with, DissolveOutput, DissolveParams, Dissolver};
