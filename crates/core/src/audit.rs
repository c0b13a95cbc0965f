//! Audit trail of every record that was altered or dropped
//!
//! No stage drops a record silently: each drop (and each informational
//! rewrite) leaves an [`AuditEntry`] naming the record, the stage and the
//! [`Issue`]. Stages return their own entries; callers merge them.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Pipeline stage that produced an audit entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Stage {
    Normalize,
    ExpandPoints,
    Repair,
    ResolveOverlaps,
    RecomputeArea,
    Dissolve,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Normalize => "normalize",
            Stage::ExpandPoints => "expand-points",
            Stage::Repair => "repair",
            Stage::ResolveOverlaps => "resolve-overlaps",
            Stage::RecomputeArea => "recompute-area",
            Stage::Dissolve => "dissolve",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to a single record
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum Issue {
    #[error("sentinel value `{value}` in `{field}` replaced with unknown")]
    SentinelNormalizationSkip { field: String, value: String },

    #[error("status `{status}` is not retained")]
    UnsupportedStatusExclusion { status: String },

    #[error("designation kind `{kind}` is excluded")]
    ExcludedDesignation { kind: String },

    #[error("unrecognised value `{value}` in `{field}`")]
    UnrecognisedAttribute { field: String, value: String },

    #[error("zero-area placeholder")]
    ZeroAreaPlaceholder,

    #[error("unsupported geometry type {kind}")]
    UnsupportedGeometry { kind: String },

    #[error("point record has no reported area")]
    PointWithoutAreaFailure,

    #[error("geometry still invalid after {attempts} repair attempts: {problem}")]
    GeometryRepairFailure { attempts: usize, problem: String },

    #[error("geometry collapsed below the precision grid")]
    CollapsedBelowPrecision,

    #[error("footprint fully claimed by earlier records")]
    FullySubsumed,

    #[error("overlap resolution failed: {reason}")]
    OverlapResolutionFailure { reason: String },

    #[error("computed area {computed_km2:.4} km2 differs from reported {reported_km2:.4} km2")]
    AreaDiscrepancy { reported_km2: f64, computed_km2: f64 },
}

impl Issue {
    /// Whether the record was removed from the output
    pub fn is_drop(&self) -> bool {
        !matches!(
            self,
            Issue::SentinelNormalizationSkip { .. } | Issue::AreaDiscrepancy { .. }
        )
    }

    /// Variant name, used as the counting key of the summary
    pub fn kind(&self) -> &'static str {
        match self {
            Issue::SentinelNormalizationSkip { .. } => "SentinelNormalizationSkip",
            Issue::UnsupportedStatusExclusion { .. } => "UnsupportedStatusExclusion",
            Issue::ExcludedDesignation { .. } => "ExcludedDesignation",
            Issue::UnrecognisedAttribute { .. } => "UnrecognisedAttribute",
            Issue::ZeroAreaPlaceholder => "ZeroAreaPlaceholder",
            Issue::UnsupportedGeometry { .. } => "UnsupportedGeometry",
            Issue::PointWithoutAreaFailure => "PointWithoutAreaFailure",
            Issue::GeometryRepairFailure { .. } => "GeometryRepairFailure",
            Issue::CollapsedBelowPrecision => "CollapsedBelowPrecision",
            Issue::FullySubsumed => "FullySubsumed",
            Issue::OverlapResolutionFailure { .. } => "OverlapResolutionFailure",
            Issue::AreaDiscrepancy { .. } => "AreaDiscrepancy",
        }
    }
}

/// One audit record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEntry {
    pub record_id: String,
    pub stage: Stage,
    pub issue: Issue,
}

impl AuditEntry {
    pub fn new(record_id: impl Into<String>, stage: Stage, issue: Issue) -> Self {
        Self {
            record_id: record_id.into(),
            stage,
            issue,
        }
    }
}

impl fmt::Display for AuditEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.stage, self.record_id, self.issue)
    }
}

/// Ordered list of audit entries
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AuditLog {
    entries: Vec<AuditEntry>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, record_id: impl Into<String>, stage: Stage, issue: Issue) {
        self.entries.push(AuditEntry::new(record_id, stage, issue));
    }

    pub fn push(&mut self, entry: AuditEntry) {
        self.entries.push(entry);
    }

    /// Append another log, keeping its order
    pub fn merge(&mut self, other: AuditLog) {
        self.entries.extend(other.entries);
    }

    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries whose record was removed
    pub fn drops(&self) -> impl Iterator<Item = &AuditEntry> {
        self.entries.iter().filter(|e| e.issue.is_drop())
    }

    /// Entries for one record id
    pub fn for_record<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a AuditEntry> + 'a {
        self.entries.iter().filter(move |e| e.record_id == id)
    }

    pub fn summary(&self) -> AuditSummary {
        let mut summary = AuditSummary::default();
        for entry in &self.entries {
            *summary
                .counts
                .entry(entry.stage)
                .or_default()
                .entry(entry.issue.kind())
                .or_default() += 1;
            if entry.issue.is_drop() {
                summary.dropped += 1;
            } else {
                summary.informational += 1;
            }
        }
        summary
    }
}

impl IntoIterator for AuditLog {
    type Item = AuditEntry;
    type IntoIter = std::vec::IntoIter<AuditEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl FromIterator<AuditEntry> for AuditLog {
    fn from_iter<I: IntoIterator<Item = AuditEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Counts of audit entries per stage and issue kind
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AuditSummary {
    pub counts: BTreeMap<Stage, BTreeMap<&'static str, usize>>,
    pub dropped: usize,
    pub informational: usize,
}

impl AuditSummary {
    pub fn count(&self, stage: Stage, kind: &str) -> usize {
        self.counts
            .get(&stage)
            .and_then(|kinds| kinds.get(kind))
            .copied()
            .unwrap_or(0)
    }
}

impl fmt::Display for AuditSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} records dropped, {} informational notes",
            self.dropped, self.informational
        )?;
        for (stage, kinds) in &self.counts {
            for (kind, n) in kinds {
                writeln!(f, "  {:<18} {:<28} {}", stage.as_str(), kind, n)?;
            }
        }
        Ok(())
    }
}

/// Records that survived a stage together with what the stage reported
#[derive(Debug, Clone)]
pub struct Staged<T> {
    pub records: Vec<T>,
    pub audit: AuditLog,
}

impl<T> Staged<T> {
    pub fn new(records: Vec<T>, audit: AuditLog) -> Self {
        Self { records, audit }
    }
}
