use std::collections::{HashMap, HashSet};

use debrepo_core::{PathResolver, Record};
use tracing::warn;

use crate::outcome::ItemIssue;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedRecord<'a> {
    pub path: String,
    pub record: &'a Record,
}

/// Records paired with their resolved paths, one entry per distinct path.
#[derive(Debug, Clone, Default)]
pub struct ProjectionPlan<'a> {
    pub entries: Vec<PlannedRecord<'a>>,
    pub issues: Vec<ItemIssue>,
    pub collisions: u64,
}

impl ProjectionPlan<'_> {
    pub fn expected_paths(&self) -> HashSet<&str> {
        self.entries.iter().map(|entry| entry.path.as_str()).collect()
    }

    /// Every directory that holds a planned file, at any depth.
    pub fn expected_dirs(&self) -> HashSet<&str> {
        let mut dirs = HashSet::new();
        for entry in &self.entries {
            let mut path = entry.path.as_str();
            while let Some((parent, _)) = path.rsplit_once('/') {
                if !dirs.insert(parent) {
                    break;
                }
                path = parent;
            }
        }
        dirs
    }
}

/// Resolves every record once. Unresolvable records become skip issues; when two
/// records share a path the later one wins.
pub fn plan_paths<'a>(
    records: impl IntoIterator<Item = &'a Record>,
    resolver: &PathResolver,
) -> ProjectionPlan<'a> {
    let mut plan = ProjectionPlan::default();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for record in records {
        let path = match resolver.resolve(record) {
            Ok(path) => path,
            Err(err) => {
                warn!(record = %record.label(), error = %err, "skipping record");
                plan.issues.push(ItemIssue::from_resolve(record, &err));
                continue;
            }
        };

        if let Some(&position) = positions.get(&path) {
            let previous = &plan.entries[position];
            warn!(
                path = %path,
                previous = %previous.record.label(),
                record = %record.label(),
                "records resolve to the same path; keeping the later one"
            );
            plan.entries[position].record = record;
            plan.collisions += 1;
            continue;
        }

        positions.insert(path.clone(), plan.entries.len());
        plan.entries.push(PlannedRecord { path, record });
    }

    plan
}
