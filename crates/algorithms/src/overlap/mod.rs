//! Overlap resolution: first-registered-wins erasure within each realm

mod claimed;
mod precedence;
mod resolver;

pub use claimed::ClaimedArea;
pub use precedence::Precedence;
pub use resolver::{
    resolve_indexed, resolve_indexed_with, resolve_overlaps, OverlapParams, OverlapResolver, Resolution,
};
