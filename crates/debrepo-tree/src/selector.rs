use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use debrepo_core::{PackageId, PathResolver, Record};
use tracing::{info, warn};

use crate::aggregator::read_tree_records;
use crate::outcome::{CopyReport, IssueKind, ItemIssue, RemoveReport};
use crate::plan::plan_paths;
use crate::projector::project_plan;
use crate::reconciler::reconcile_plan;

/// A (Package, Version)-keyed view over a record sequence.
///
/// Several records may share one key (same package and version in another
/// component or architecture); a key addresses all of them. Records lacking
/// either identity field stay in the view but cannot be selected.
#[derive(Debug, Clone, Default)]
pub struct RecordSelector {
    keyed: BTreeMap<PackageId, Vec<(usize, Record)>>,
    unkeyed: Vec<(usize, Record)>,
}

impl RecordSelector {
    pub fn new(records: Vec<Record>) -> (Self, Vec<ItemIssue>) {
        let mut selector = Self::default();
        let mut issues = Vec::new();
        for (position, record) in records.into_iter().enumerate() {
            match record.identity() {
                Some(id) => selector
                    .keyed
                    .entry(id)
                    .or_default()
                    .push((position, record)),
                None => {
                    warn!(record = %record.label(), "record lacks Package or Version; not selectable");
                    issues.push(ItemIssue::new(
                        IssueKind::MissingIdentity,
                        record.label(),
                        "record lacks Package or Version",
                    ));
                    selector.unkeyed.push((position, record));
                }
            }
        }
        (selector, issues)
    }

    pub fn contains(&self, id: &PackageId) -> bool {
        self.keyed.contains_key(id)
    }

    pub fn get(&self, id: &PackageId) -> Option<Vec<&Record>> {
        self.keyed
            .get(id)
            .map(|entries| entries.iter().map(|(_, record)| record).collect())
    }

    pub fn keyed_len(&self) -> usize {
        self.keyed.len()
    }

    /// Removes and returns every record stored under `id`, in original order.
    pub fn take(&mut self, id: &PackageId) -> Vec<Record> {
        self.take_positioned(id)
            .into_iter()
            .map(|(_, record)| record)
            .collect()
    }

    /// Remaining records, keyed and unkeyed, in their original order.
    pub fn into_records(self) -> Vec<Record> {
        let mut remaining: Vec<(usize, Record)> = self.keyed.into_values().flatten().collect();
        remaining.extend(self.unkeyed);
        remaining.sort_by_key(|(position, _)| *position);
        remaining.into_iter().map(|(_, record)| record).collect()
    }

    fn take_positioned(&mut self, id: &PackageId) -> Vec<(usize, Record)> {
        self.keyed.remove(id).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopySelection {
    All,
    Only(Vec<PackageId>),
}

/// Drops the requested identifiers from the tree at `root`.
///
/// The surviving records are re-derived from disk and handed to the
/// reconciler as the new expected set, which deletes the files backing the
/// removed identifiers along with anything else no longer expected.
pub fn remove_identifiers(
    root: &Path,
    resolver: &PathResolver,
    ids: &[PackageId],
) -> Result<RemoveReport> {
    let mut report = RemoveReport::default();
    if !root.is_dir() {
        warn!(root = %root.display(), "output root does not exist; nothing to remove");
        report.issues.extend(ids.iter().map(ItemIssue::lookup_miss));
        return Ok(report);
    }

    let records = read_tree_records(root)?;
    ensure_layout_matches(&records, root, resolver)?;

    let (mut selector, identity_issues) = RecordSelector::new(records);
    report.issues.extend(identity_issues);

    for id in distinct(ids) {
        let taken = selector.take(id);
        if taken.is_empty() {
            info!(id = %id, "identifier not found");
            report.issues.push(ItemIssue::lookup_miss(id));
        } else {
            info!(id = %id, records = taken.len(), "removing identifier");
            report.removed.push(id.clone());
        }
    }

    let survivors = selector.into_records();
    let plan = plan_paths(&survivors, resolver);
    report.issues.extend(plan.issues.iter().cloned());
    report.reconcile = reconcile_plan(&plan, root)?;
    Ok(report)
}

/// Projects records from `source_root` into `destination_root` without
/// cleaning up anything already present at the destination.
pub fn copy_records(
    source_root: &Path,
    destination_root: &Path,
    resolver: &PathResolver,
    selection: &CopySelection,
) -> Result<CopyReport> {
    if !source_root.is_dir() {
        anyhow::bail!("source tree is not a directory: {}", source_root.display());
    }

    let records = read_tree_records(source_root)?;
    let mut report = CopyReport::default();
    let selected = match selection {
        CopySelection::All => records,
        CopySelection::Only(ids) => {
            let (mut selector, identity_issues) = RecordSelector::new(records);
            report.issues.extend(identity_issues);
            let mut picked = Vec::new();
            for id in distinct(ids) {
                let taken = selector.take_positioned(id);
                if taken.is_empty() {
                    info!(id = %id, "identifier not found in source tree");
                    report.issues.push(ItemIssue::lookup_miss(id));
                }
                picked.extend(taken);
            }
            picked.sort_by_key(|(position, _)| *position);
            picked.into_iter().map(|(_, record)| record).collect()
        }
    };
    report.selected = selected.len() as u64;

    fs::create_dir_all(destination_root).with_context(|| {
        format!(
            "failed creating destination root {}",
            destination_root.display()
        )
    })?;

    let plan = plan_paths(&selected, resolver);
    report.issues.extend(plan.issues.iter().cloned());
    report.projection = project_plan(&plan, destination_root);
    Ok(report)
}

/// `ids` in first-seen order with repeats dropped.
fn distinct(ids: &[PackageId]) -> Vec<&PackageId> {
    let mut seen = BTreeSet::new();
    ids.iter().filter(|id| seen.insert(*id)).collect()
}

/// Refuses to reconcile a tree whose files do not sit where the resolver
/// expects them; doing so would delete every file in it.
fn ensure_layout_matches(records: &[Record], root: &Path, resolver: &PathResolver) -> Result<()> {
    if records.is_empty() {
        return Ok(());
    }

    let plan = plan_paths(records, resolver);
    if plan
        .entries
        .iter()
        .any(|entry| root.join(&entry.path).is_file())
    {
        return Ok(());
    }

    anyhow::bail!(
        "tree-layout-mismatch: none of the {} records under {} resolve to an existing file with strip convention {}",
        records.len(),
        root.display(),
        resolver.convention()
    )
}
