//! Synchronizes a directory tree of one stanza file per record with a record set.
//!
//! Callers own the tree exclusively for the duration of an operation; nothing
//! here locks it, so concurrent runs against one root must be serialized by
//! the caller.

mod aggregator;
mod fs_ops;
mod outcome;
mod plan;
mod projector;
mod reconciler;
mod selector;

pub use aggregator::{aggregate, aggregate_to_string, read_tree_records};
pub use outcome::{
    AggregateReport, BatchSummary, CopyReport, IssueKind, ItemIssue, ProjectionReport,
    ReconcileReport, RemoveReport,
};
pub use plan::{plan_paths, PlannedRecord, ProjectionPlan};
pub use projector::{project_plan, project_records};
pub use reconciler::{reconcile_plan, reconcile_records};
pub use selector::{copy_records, remove_identifiers, CopySelection, RecordSelector};
