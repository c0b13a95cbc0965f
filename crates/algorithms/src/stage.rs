//! Per-record stage outcomes

use paclean_core::{AuditEntry, AuditLog, Staged};

/// What a per-record stage did with one record
pub(crate) enum Outcome<T> {
    /// Record kept, possibly with informational notes
    Kept(T, Vec<AuditEntry>),
    Dropped(AuditEntry),
}

impl<T> Outcome<T> {
    pub(crate) fn kept(record: T) -> Self {
        Outcome::Kept(record, Vec::new())
    }
}

/// Split outcomes into surviving records and the audit log, keeping input order
pub(crate) fn collect_outcomes<T>(outcomes: Vec<Outcome<T>>) -> Staged<T> {
    let mut records = Vec::with_capacity(outcomes.len());
    let mut audit = AuditLog::new();
    for outcome in outcomes {
        match outcome {
            Outcome::Kept(record, notes) => {
                records.push(record);
                notes.into_iter().for_each(|n| audit.push(n));
            }
            Outcome::Dropped(entry) => {
                tracing::debug!("dropped {entry}");
                audit.push(entry);
            }
        }
    }
    Staged::new(records, audit)
}
