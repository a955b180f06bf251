use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use debrepo_core::{parse_str, Record};
use tracing::debug;

use crate::fs_ops::collect_relative_file_paths;
use crate::outcome::AggregateReport;

/// Streams every stanza file under `root` into `sink`, in lexicographic path order.
///
/// Contents are copied as stored. A file that does not already end in a blank
/// line gets the missing line breaks so its last stanza cannot run into the
/// next file's first one.
pub fn aggregate<W: Write>(root: &Path, sink: &mut W) -> Result<AggregateReport> {
    if !root.is_dir() {
        anyhow::bail!("tree root is not a directory: {}", root.display());
    }

    let mut report = AggregateReport::default();
    for relative_path in collect_relative_file_paths(root)? {
        let path = root.join(&relative_path);
        let contents = fs::read(&path)
            .with_context(|| format!("failed reading stanza file {}", path.display()))?;
        sink.write_all(&contents)
            .with_context(|| format!("failed writing contents of {}", path.display()))?;
        let padding = terminator_padding(&contents);
        sink.write_all(padding)
            .with_context(|| format!("failed writing terminator after {}", path.display()))?;

        debug!(path = %relative_path, bytes = contents.len(), "aggregated stanza file");
        report.files += 1;
        report.bytes += (contents.len() + padding.len()) as u64;
    }

    Ok(report)
}

pub fn aggregate_to_string(root: &Path) -> Result<String> {
    let mut buffer = Vec::new();
    aggregate(root, &mut buffer)?;
    String::from_utf8(buffer)
        .with_context(|| format!("stanza tree is not valid UTF-8: {}", root.display()))
}

/// Rebuilds the record sequence stored under `root`; a missing root holds no records.
pub fn read_tree_records(root: &Path) -> Result<Vec<Record>> {
    if !root.exists() {
        return Ok(Vec::new());
    }
    Ok(parse_str(&aggregate_to_string(root)?))
}

fn terminator_padding(contents: &[u8]) -> &'static [u8] {
    if contents.is_empty() || contents.ends_with(b"\n\n") {
        b""
    } else if contents.ends_with(b"\n") {
        b"\n"
    } else {
        b"\n\n"
    }
}
