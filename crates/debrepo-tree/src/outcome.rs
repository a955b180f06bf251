use debrepo_core::{PackageId, Record, ResolveError};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueKind {
    Fetch,
    Decompress,
    MissingIdentity,
    PathConvention,
    UnsafePath,
    Io,
    LookupMiss,
    MalformedIdentifier,
}

impl IssueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Decompress => "decompress",
            Self::MissingIdentity => "missing-identity",
            Self::PathConvention => "path-convention",
            Self::UnsafePath => "unsafe-path",
            Self::Io => "io",
            Self::LookupMiss => "lookup-miss",
            Self::MalformedIdentifier => "malformed-identifier",
        }
    }

    /// Failures count against the batch; everything else is a skip.
    pub fn is_failure(self) -> bool {
        matches!(self, Self::Fetch | Self::Decompress | Self::Io)
    }
}

/// One item that could not be processed, with enough context to act on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemIssue {
    pub kind: IssueKind,
    pub subject: String,
    pub detail: String,
}

impl ItemIssue {
    pub fn new(kind: IssueKind, subject: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind,
            subject: subject.into(),
            detail: detail.into(),
        }
    }

    pub fn from_resolve(record: &Record, err: &ResolveError) -> Self {
        let kind = match err {
            ResolveError::MissingIdentity { .. } => IssueKind::MissingIdentity,
            ResolveError::PathConvention { .. } => IssueKind::PathConvention,
            ResolveError::UnsafePath { .. } => IssueKind::UnsafePath,
        };
        Self::new(kind, record.label(), err.to_string())
    }

    pub fn io(subject: impl Into<String>, err: &anyhow::Error) -> Self {
        Self::new(IssueKind::Io, subject, format!("{err:#}"))
    }

    pub fn lookup_miss(id: &PackageId) -> Self {
        Self::new(
            IssueKind::LookupMiss,
            id.to_string(),
            "identifier not present in tree",
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub succeeded: u64,
    pub failed: u64,
    pub skipped: u64,
}

impl BatchSummary {
    pub fn from_issues(succeeded: u64, issues: &[ItemIssue]) -> Self {
        let failed = issues.iter().filter(|issue| issue.kind.is_failure()).count() as u64;
        Self {
            succeeded,
            failed,
            skipped: issues.len() as u64 - failed,
        }
    }

    pub fn merge(&mut self, other: BatchSummary) {
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.skipped += other.skipped;
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProjectionReport {
    pub written: u64,
    pub unchanged: u64,
    pub issues: Vec<ItemIssue>,
}

impl ProjectionReport {
    pub fn summary(&self) -> BatchSummary {
        BatchSummary::from_issues(self.written + self.unchanged, &self.issues)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub kept: u64,
    pub removed_files: Vec<String>,
    pub removed_dirs: Vec<String>,
    pub issues: Vec<ItemIssue>,
}

impl ReconcileReport {
    pub fn summary(&self) -> BatchSummary {
        BatchSummary::from_issues(self.removed_files.len() as u64, &self.issues)
    }

    pub fn mutation_count(&self) -> usize {
        self.removed_files.len() + self.removed_dirs.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RemoveReport {
    pub removed: Vec<PackageId>,
    pub reconcile: ReconcileReport,
    pub issues: Vec<ItemIssue>,
}

impl RemoveReport {
    pub fn summary(&self) -> BatchSummary {
        let mut summary = BatchSummary::from_issues(self.removed.len() as u64, &self.issues);
        let reconcile = self.reconcile.summary();
        summary.failed += reconcile.failed;
        summary.skipped += reconcile.skipped;
        summary
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CopyReport {
    pub selected: u64,
    pub projection: ProjectionReport,
    pub issues: Vec<ItemIssue>,
}

impl CopyReport {
    pub fn summary(&self) -> BatchSummary {
        let mut summary = self.projection.summary();
        summary.merge(BatchSummary::from_issues(0, &self.issues));
        summary
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AggregateReport {
    pub files: u64,
    pub bytes: u64,
}
