use std::io::{BufWriter, Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use debrepo_core::{parse_identifier_list, IdentifierList, IndexFamily, PathResolver};
use debrepo_source::{
    discover_local_sources, remote_sources, sync_sources, HttpFetcher, ImportReport,
    IndexFetcher, IndexSource, OfflineFetcher, RemotePlan,
};
use debrepo_tree::{
    aggregate, copy_records, remove_identifiers, BatchSummary, CopySelection, IssueKind,
    ItemIssue,
};
use serde::Serialize;
use tracing::warn;

use crate::completion::write_completions_script;
use crate::config::Settings;
use crate::render::{
    format_copy_lines, format_import_issue_lines, format_index_lines, format_remove_lines,
    TerminalRenderer,
};
use crate::Commands;

pub(crate) fn run(command: Commands, settings: &Settings, json: bool) -> Result<BatchSummary> {
    let renderer = TerminalRenderer::current();
    match command {
        Commands::ImportRepo { .. } => {
            let Some(base_url) = settings.base_url.clone() else {
                anyhow::bail!("import-repo needs an archive URL argument or base_url in the config");
            };
            let plan = RemotePlan {
                base_url,
                distributions: settings.distributions.clone(),
                components: settings.components.clone(),
                architectures: settings.architectures.clone(),
                output_root: settings.output_dir.clone(),
            };
            let sources = remote_sources(&plan);
            let fetcher = HttpFetcher::new(&settings.user_agent, settings.timeout)?;
            let report = import_sources(renderer, &fetcher, &sources, settings, Vec::new());
            finish(renderer, json, &report, report.summary())
        }
        Commands::ImportLocal { dir, .. } => {
            let (sources, issues) = discover_local_sources(&dir, &settings.output_dir)?;
            if sources.is_empty() {
                warn!(dir = %dir.display(), "no Packages.gz or Sources.gz found");
            }
            let report = import_sources(renderer, &OfflineFetcher, &sources, settings, issues);
            finish(renderer, json, &report, report.summary())
        }
        Commands::Export { input_dir } => {
            let stdout = std::io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            let report = aggregate(&input_dir, &mut writer)?;
            writer.flush().context("failed flushing export stream")?;
            let summary = BatchSummary {
                succeeded: report.files,
                ..BatchSummary::default()
            };
            if json {
                renderer.print_lines(&[serde_json::to_string(&report)?]);
            }
            renderer.print_summary(&summary);
            Ok(summary)
        }
        Commands::Remove { output_dir, family } => {
            let ids = read_identifiers_from_stdin()?;
            let resolver = resolver_for(settings, &output_dir, family);
            let report = remove_identifiers(&output_dir, &resolver, &ids.ids)?;
            let mut summary = report.summary();
            summary.merge(BatchSummary::from_issues(0, &malformed_issues(&ids)));
            renderer.print_lines(&format_remove_lines(&report));
            finish(renderer, json, &report, summary)
        }
        Commands::Copy {
            input_dir,
            output_dir,
            family,
            all,
        } => {
            let (selection, malformed) = if all {
                (CopySelection::All, Vec::new())
            } else {
                let ids = read_identifiers_from_stdin()?;
                let malformed = malformed_issues(&ids);
                (CopySelection::Only(ids.ids), malformed)
            };
            let resolver = resolver_for(settings, &output_dir, family);
            let report = copy_records(&input_dir, &output_dir, &resolver, &selection)?;
            let mut summary = report.summary();
            summary.merge(BatchSummary::from_issues(0, &malformed));
            renderer.print_lines(&format_copy_lines(&report));
            finish(renderer, json, &report, summary)
        }
        Commands::Completions { shell } => {
            let stdout = std::io::stdout();
            let mut writer = stdout.lock();
            write_completions_script(shell, &mut writer)?;
            Ok(BatchSummary::default())
        }
    }
}

fn import_sources(
    renderer: TerminalRenderer,
    fetcher: &dyn IndexFetcher,
    sources: &[IndexSource],
    settings: &Settings,
    discovery_issues: Vec<ItemIssue>,
) -> ImportReport {
    let mut progress = renderer.start_progress("import", sources.len() as u64);
    let mut report = sync_sources(fetcher, sources, &settings.conventions, &mut |source| {
        for line in format_index_lines(source) {
            progress.println(&line);
        }
        progress.advance();
    });
    progress.finish();

    report.issues = discovery_issues;
    renderer.print_lines(&format_import_issue_lines(&report));
    report
}

fn finish<T: Serialize>(
    renderer: TerminalRenderer,
    json: bool,
    report: &T,
    summary: BatchSummary,
) -> Result<BatchSummary> {
    if json {
        let rendered =
            serde_json::to_string_pretty(report).context("failed serializing report as JSON")?;
        println!("{rendered}");
    }
    renderer.print_summary(&summary);
    Ok(summary)
}

/// Binary unless told otherwise or the tree root is an arch directory named `source`.
pub(crate) fn resolver_for(
    settings: &Settings,
    root: &Path,
    family: Option<IndexFamily>,
) -> PathResolver {
    let family = family.unwrap_or_else(|| {
        root.file_name()
            .and_then(|name| name.to_str())
            .map_or(IndexFamily::Binary, IndexFamily::from_arch)
    });
    PathResolver::new(settings.conventions.for_family(family))
}

fn read_identifiers_from_stdin() -> Result<IdentifierList> {
    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("failed reading identifiers from stdin")?;
    Ok(parse_identifier_list(&input))
}

pub(crate) fn malformed_issues(ids: &IdentifierList) -> Vec<ItemIssue> {
    ids.malformed
        .iter()
        .map(|(line, text)| {
            warn!(line, text = %text, "ignoring malformed identifier");
            ItemIssue::new(
                IssueKind::MalformedIdentifier,
                text.clone(),
                format!("line {line} is not Package=Version"),
            )
        })
        .collect()
}
