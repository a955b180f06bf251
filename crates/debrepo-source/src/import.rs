use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use debrepo_core::{parse_str, IndexFamily, PathResolver, StripConventions};
use debrepo_tree::{
    plan_paths, project_plan, reconcile_plan, BatchSummary, IssueKind, ItemIssue,
    ProjectionReport, ReconcileReport,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::decompress::decompress_gzip;
use crate::fetch::IndexFetcher;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "location", rename_all = "lowercase")]
pub enum IndexLocation {
    Remote(String),
    Local(PathBuf),
}

/// One compressed index and the architecture-scoped root it is mirrored into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexSource {
    pub location: IndexLocation,
    pub family: IndexFamily,
    pub output_root: PathBuf,
}

impl IndexSource {
    pub fn label(&self) -> String {
        match &self.location {
            IndexLocation::Remote(url) => url.clone(),
            IndexLocation::Local(path) => path.display().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePlan {
    pub base_url: String,
    pub distributions: Vec<String>,
    pub components: Vec<String>,
    pub architectures: Vec<String>,
    pub output_root: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexSyncReport {
    pub source: String,
    pub output_root: PathBuf,
    pub records: u64,
    pub collisions: u64,
    pub reconcile: ReconcileReport,
    pub projection: ProjectionReport,
    pub issues: Vec<ItemIssue>,
}

impl IndexSyncReport {
    fn failed(source: &IndexSource, issue: ItemIssue) -> Self {
        Self {
            source: source.label(),
            output_root: source.output_root.clone(),
            issues: vec![issue],
            ..Self::default()
        }
    }

    pub fn summary(&self) -> BatchSummary {
        let mut summary = self.projection.summary();
        summary.merge(BatchSummary::from_issues(0, &self.issues));
        let reconcile = self.reconcile.summary();
        summary.failed += reconcile.failed;
        summary.skipped += reconcile.skipped;
        summary
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub sources: Vec<IndexSyncReport>,
    pub issues: Vec<ItemIssue>,
}

impl ImportReport {
    pub fn summary(&self) -> BatchSummary {
        let mut summary = BatchSummary::from_issues(0, &self.issues);
        for source in &self.sources {
            summary.merge(source.summary());
        }
        summary
    }
}

/// Every dist/component/arch index of a remote archive, in that nesting order.
pub fn remote_sources(plan: &RemotePlan) -> Vec<IndexSource> {
    let base_url = plan.base_url.trim_end_matches('/');
    let mut sources = Vec::new();
    for dist in &plan.distributions {
        for component in &plan.components {
            for arch in &plan.architectures {
                let family = IndexFamily::from_arch(arch);
                sources.push(IndexSource {
                    location: IndexLocation::Remote(format!(
                        "{base_url}/dists/{dist}/{component}/{arch}/{}",
                        family.index_file_name()
                    )),
                    family,
                    output_root: plan.output_root.join(dist).join(component).join(arch),
                });
            }
        }
    }
    sources
}

/// Finds `Packages.gz` and `Sources.gz` files below `local_root`; each mirrors
/// into the same relative directory under `output_root`.
pub fn discover_local_sources(
    local_root: &Path,
    output_root: &Path,
) -> Result<(Vec<IndexSource>, Vec<ItemIssue>)> {
    if !local_root.is_dir() {
        anyhow::bail!("local index directory not found: {}", local_root.display());
    }

    let mut found = Vec::new();
    let mut queue: VecDeque<PathBuf> = VecDeque::new();
    queue.push_back(local_root.to_path_buf());
    while let Some(dir) = queue.pop_front() {
        for entry in fs::read_dir(&dir)
            .with_context(|| format!("failed reading local directory {}", dir.display()))?
        {
            let entry = entry?;
            let path = entry.path();
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                queue.push_back(path);
            } else if file_type.is_file() {
                let family = entry
                    .file_name()
                    .to_str()
                    .and_then(IndexFamily::from_index_file_name);
                if let Some(family) = family {
                    found.push((path, family));
                }
            }
        }
    }
    found.sort_by(|left, right| left.0.cmp(&right.0));

    let mut sources = Vec::new();
    let mut issues = Vec::new();
    let mut claimed: HashMap<PathBuf, PathBuf> = HashMap::new();
    for (path, family) in found {
        let relative_dir = path
            .parent()
            .and_then(|parent| parent.strip_prefix(local_root).ok())
            .unwrap_or_else(|| Path::new(""));
        let source_root = output_root.join(relative_dir);

        if let Some(owner) = claimed.get(&source_root) {
            warn!(index = %path.display(), owner = %owner.display(), "index shares an output root; skipping");
            issues.push(ItemIssue::new(
                IssueKind::PathConvention,
                path.display().to_string(),
                format!(
                    "output root {} is already mirrored from {}",
                    source_root.display(),
                    owner.display()
                ),
            ));
            continue;
        }
        claimed.insert(source_root.clone(), path.clone());

        sources.push(IndexSource {
            location: IndexLocation::Local(path),
            family,
            output_root: source_root,
        });
    }

    Ok((sources, issues))
}

/// Mirrors each source in turn. A source that cannot be read or decoded is
/// reported and skipped; the remaining sources still run.
pub fn sync_sources(
    fetcher: &dyn IndexFetcher,
    sources: &[IndexSource],
    conventions: &StripConventions,
    on_source: &mut dyn FnMut(&IndexSyncReport),
) -> ImportReport {
    let mut report = ImportReport::default();
    for source in sources {
        let source_report = sync_source(fetcher, source, conventions);
        on_source(&source_report);
        report.sources.push(source_report);
    }
    report
}

fn sync_source(
    fetcher: &dyn IndexFetcher,
    source: &IndexSource,
    conventions: &StripConventions,
) -> IndexSyncReport {
    let label = source.label();
    info!(source = %label, family = source.family.as_str(), "processing index");

    let bytes = match &source.location {
        IndexLocation::Remote(url) => match fetcher.fetch(url) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(url = %url, error = %err, "skipping index that could not be fetched");
                return IndexSyncReport::failed(
                    source,
                    ItemIssue::new(IssueKind::Fetch, label, err.to_string()),
                );
            }
        },
        IndexLocation::Local(path) => match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping unreadable index");
                return IndexSyncReport::failed(
                    source,
                    ItemIssue::new(IssueKind::Io, label, err.to_string()),
                );
            }
        },
    };

    let text = match decompress_gzip(&bytes) {
        Ok(text) => text,
        Err(err) => {
            warn!(source = %label, error = %format!("{err:#}"), "skipping undecodable index");
            return IndexSyncReport::failed(
                source,
                ItemIssue::new(IssueKind::Decompress, label, format!("{err:#}")),
            );
        }
    };

    let mut report = sync_index_text(&text, source.family, &source.output_root, conventions);
    report.source = label;
    report
}

/// Parses index text and converges `output_root` to it: orphans are removed
/// first so nothing stale blocks a path, then one stanza file per record is written.
pub fn sync_index_text(
    text: &str,
    family: IndexFamily,
    output_root: &Path,
    conventions: &StripConventions,
) -> IndexSyncReport {
    let records = parse_str(text);
    let resolver = PathResolver::new(conventions.for_family(family));
    let plan = plan_paths(&records, &resolver);

    let mut report = IndexSyncReport {
        source: output_root.display().to_string(),
        output_root: output_root.to_path_buf(),
        records: records.len() as u64,
        collisions: plan.collisions,
        issues: plan.issues.clone(),
        ..IndexSyncReport::default()
    };

    match reconcile_plan(&plan, output_root) {
        Ok(reconcile) => report.reconcile = reconcile,
        Err(err) => {
            warn!(root = %output_root.display(), error = %format!("{err:#}"), "orphan cleanup failed");
            report.issues.push(ItemIssue::io(
                output_root.display().to_string(),
                &err,
            ));
        }
    }
    report.projection = project_plan(&plan, output_root);

    info!(
        root = %output_root.display(),
        records = report.records,
        written = report.projection.written,
        unchanged = report.projection.unchanged,
        removed = report.reconcile.removed_files.len(),
        "index mirrored"
    );
    report
}
