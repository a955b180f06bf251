use std::fs;
use std::path::Path;

use anyhow::Result;
use debrepo_core::{PathResolver, Record};
use tracing::{info, warn};

use crate::fs_ops::{
    collect_directories_deepest_first, collect_relative_file_paths, is_empty_dir,
    normalize_relative_path,
};
use crate::outcome::{ItemIssue, ReconcileReport};
use crate::plan::{plan_paths, ProjectionPlan};

/// Deletes every regular file under `root` that no record resolves to, then
/// prunes directories left empty. Records that cannot be resolved are reported
/// and contribute no expected path.
pub fn reconcile_records(
    records: &[Record],
    root: &Path,
    resolver: &PathResolver,
) -> Result<ReconcileReport> {
    let plan = plan_paths(records, resolver);
    let mut report = reconcile_plan(&plan, root)?;
    let mut issues = plan.issues;
    issues.append(&mut report.issues);
    report.issues = issues;
    Ok(report)
}

/// Converges `root` to exactly the paths in `plan`. A missing root is already
/// converged. Directories on the way to a planned file are left in place even
/// when empty, so a projection that follows does not recreate them.
pub fn reconcile_plan(plan: &ProjectionPlan<'_>, root: &Path) -> Result<ReconcileReport> {
    let mut report = ReconcileReport::default();
    if !root.is_dir() {
        return Ok(report);
    }

    let expected = plan.expected_paths();
    let expected_dirs = plan.expected_dirs();
    for relative_path in collect_relative_file_paths(root)? {
        if expected.contains(relative_path.as_str()) {
            report.kept += 1;
            continue;
        }

        match fs::remove_file(root.join(&relative_path)) {
            Ok(()) => {
                info!(path = %relative_path, "removed orphaned file");
                report.removed_files.push(relative_path);
            }
            Err(err) => {
                warn!(path = %relative_path, error = %err, "failed removing orphaned file");
                report.issues.push(ItemIssue::io(
                    relative_path,
                    &anyhow::Error::new(err).context("failed removing orphaned file"),
                ));
            }
        }
    }

    for dir in collect_directories_deepest_first(root)? {
        let relative_dir = dir
            .strip_prefix(root)
            .map(normalize_relative_path)
            .unwrap_or_else(|_| dir.display().to_string());
        if expected_dirs.contains(relative_dir.as_str()) {
            continue;
        }
        match is_empty_dir(&dir) {
            Ok(true) => match fs::remove_dir(&dir) {
                Ok(()) => {
                    info!(path = %relative_dir, "removed empty directory");
                    report.removed_dirs.push(relative_dir);
                }
                Err(err) => {
                    warn!(path = %relative_dir, error = %err, "failed removing empty directory");
                    report.issues.push(ItemIssue::io(
                        relative_dir,
                        &anyhow::Error::new(err).context("failed removing empty directory"),
                    ));
                }
            },
            Ok(false) => {}
            Err(err) => {
                warn!(path = %relative_dir, error = %err, "failed inspecting directory");
                report.issues.push(ItemIssue::io(
                    relative_dir,
                    &anyhow::Error::new(err).context("failed inspecting directory"),
                ));
            }
        }
    }

    Ok(report)
}
