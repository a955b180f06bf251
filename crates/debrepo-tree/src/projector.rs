use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use debrepo_core::{serialize_record, PathResolver, Record};
use tracing::{debug, warn};

use crate::fs_ops::write_atomic;
use crate::outcome::{ItemIssue, ProjectionReport};
use crate::plan::{plan_paths, PlannedRecord, ProjectionPlan};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteOutcome {
    Written,
    Unchanged,
}

/// Writes one stanza file per record under `root`. A failing record is
/// reported and the rest are still written.
pub fn project_records(
    records: &[Record],
    root: &Path,
    resolver: &PathResolver,
) -> ProjectionReport {
    let plan = plan_paths(records, resolver);
    let mut report = project_plan(&plan, root);
    let mut issues = plan.issues;
    issues.append(&mut report.issues);
    report.issues = issues;
    report
}

/// Projects already-resolved entries; plan-level issues are left to the caller.
pub fn project_plan(plan: &ProjectionPlan<'_>, root: &Path) -> ProjectionReport {
    let mut report = ProjectionReport::default();
    for entry in &plan.entries {
        match write_entry(entry, root) {
            Ok(WriteOutcome::Written) => {
                debug!(path = %entry.path, record = %entry.record.label(), "wrote stanza file");
                report.written += 1;
            }
            Ok(WriteOutcome::Unchanged) => report.unchanged += 1,
            Err(err) => {
                warn!(path = %entry.path, error = %format!("{err:#}"), "failed writing stanza file");
                report.issues.push(ItemIssue::io(entry.path.clone(), &err));
            }
        }
    }
    report
}

fn write_entry(entry: &PlannedRecord<'_>, root: &Path) -> Result<WriteOutcome> {
    let target = root.join(&entry.path);
    let contents = serialize_record(entry.record);

    if let Ok(existing) = fs::read(&target) {
        if existing == contents.as_bytes() {
            return Ok(WriteOutcome::Unchanged);
        }
    }

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed creating directory {}", parent.display()))?;
    }
    write_atomic(&target, contents.as_bytes())?;
    Ok(WriteOutcome::Written)
}
