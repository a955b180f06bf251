use std::io::IsTerminal;
use std::time::{Duration, Instant};

use anstyle::{AnsiColor, Effects, Style};
use debrepo_source::{ImportReport, IndexSyncReport};
use debrepo_tree::{BatchSummary, CopyReport, ItemIssue, RemoveReport};
use indicatif::{HumanCount, ProgressBar, ProgressStyle};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum OutputStyle {
    Plain,
    Rich,
}

pub(crate) fn current_output_style() -> OutputStyle {
    if std::env::var_os("NO_COLOR").is_some() || !std::io::stderr().is_terminal() {
        OutputStyle::Plain
    } else {
        OutputStyle::Rich
    }
}

/// Status lines go to stderr so stdout stays free for export streams and JSON.
#[derive(Copy, Clone, Debug)]
pub(crate) struct TerminalRenderer {
    style: OutputStyle,
}

pub(crate) struct TerminalProgress {
    style: OutputStyle,
    label: String,
    total: u64,
    current: u64,
    progress_bar: Option<ProgressBar>,
    started_at: Instant,
}

impl TerminalRenderer {
    pub(crate) fn from_style(style: OutputStyle) -> Self {
        Self { style }
    }

    pub(crate) fn current() -> Self {
        Self::from_style(current_output_style())
    }

    pub(crate) fn print_status(self, status: &str, message: &str) {
        let line = render_status_line(self.style, status, message);
        let rendered = match (self.style, status_style(status)) {
            (OutputStyle::Rich, Some(style)) => match line.split_once(' ') {
                Some((badge, rest)) => format!("{} {rest}", colorize(style, badge)),
                None => line,
            },
            _ => line,
        };
        eprintln!("{rendered}");
    }

    pub(crate) fn print_lines(self, lines: &[String]) {
        for line in lines {
            eprintln!("{line}");
        }
    }

    pub(crate) fn print_summary(self, summary: &BatchSummary) {
        let status = if summary.has_failures() { "warn" } else { "ok" };
        self.print_status(status, &format_summary_line(summary));
    }

    pub(crate) fn start_progress(self, label: &str, total: u64) -> TerminalProgress {
        let progress_bar = if self.style == OutputStyle::Rich {
            let progress_bar = ProgressBar::new(total.max(1));
            if let Ok(style) = ProgressStyle::with_template(
                "{spinner:.cyan.bold} {msg:<12} [{bar:20.cyan/blue}] {pos:>3}/{len:3} {elapsed_precise}",
            ) {
                progress_bar.set_style(style.tick_chars("<^>v ").progress_chars("=>-"));
            }
            progress_bar.set_message(label.to_string());
            progress_bar.enable_steady_tick(Duration::from_millis(80));
            Some(progress_bar)
        } else {
            None
        };

        TerminalProgress {
            style: self.style,
            label: label.to_string(),
            total,
            current: 0,
            progress_bar,
            started_at: Instant::now(),
        }
    }
}

impl TerminalProgress {
    pub(crate) fn advance(&mut self) {
        self.current = (self.current + 1).min(self.total);
        if let Some(progress_bar) = &self.progress_bar {
            progress_bar.set_position(self.current);
        }
    }

    /// Prints a line above the bar without tearing it.
    pub(crate) fn println(&self, line: &str) {
        match &self.progress_bar {
            Some(progress_bar) => progress_bar.suspend(|| eprintln!("{line}")),
            None => eprintln!("{line}"),
        }
    }

    pub(crate) fn finish(mut self) {
        let Some(progress_bar) = self.progress_bar.take() else {
            return;
        };

        progress_bar.finish_and_clear();
        if let Some(line) = render_progress_line(
            self.style,
            &self.label,
            self.current,
            self.total,
            Some(self.started_at.elapsed()),
        ) {
            eprintln!("{line}");
        }
    }
}

pub(crate) fn render_status_line(style: OutputStyle, status: &str, message: &str) -> String {
    match style {
        OutputStyle::Plain => message.to_string(),
        OutputStyle::Rich => format!("[{}] {message}", status.to_ascii_uppercase()),
    }
}

pub(crate) fn format_summary_line(summary: &BatchSummary) -> String {
    format!(
        "{} succeeded, {} failed, {} skipped",
        summary.succeeded, summary.failed, summary.skipped
    )
}

pub(crate) fn format_issue_line(issue: &ItemIssue) -> String {
    let verb = if issue.kind.is_failure() {
        "failed"
    } else {
        "skipped"
    };
    format!(
        "  {verb} [{}] {}: {}",
        issue.kind.as_str(),
        issue.subject,
        issue.detail
    )
}

pub(crate) fn format_index_lines(report: &IndexSyncReport) -> Vec<String> {
    let mut lines = vec![format!(
        "{}: {} records, {} written, {} unchanged, {} removed",
        report.source,
        report.records,
        report.projection.written,
        report.projection.unchanged,
        report.reconcile.removed_files.len()
    )];
    lines.extend(report.issues.iter().map(format_issue_line));
    lines.extend(report.projection.issues.iter().map(format_issue_line));
    lines.extend(report.reconcile.issues.iter().map(format_issue_line));
    lines
}

pub(crate) fn format_import_issue_lines(report: &ImportReport) -> Vec<String> {
    report.issues.iter().map(format_issue_line).collect()
}

pub(crate) fn format_remove_lines(report: &RemoveReport) -> Vec<String> {
    let mut lines: Vec<String> = report
        .removed
        .iter()
        .map(|id| format!("removed {id}"))
        .collect();
    lines.extend(
        report
            .reconcile
            .removed_files
            .iter()
            .map(|path| format!("  deleted {path}")),
    );
    lines.extend(report.issues.iter().map(format_issue_line));
    lines.extend(report.reconcile.issues.iter().map(format_issue_line));
    lines
}

pub(crate) fn format_copy_lines(report: &CopyReport) -> Vec<String> {
    let mut lines = vec![format!(
        "copied {} records: {} written, {} unchanged",
        report.selected, report.projection.written, report.projection.unchanged
    )];
    lines.extend(report.issues.iter().map(format_issue_line));
    lines.extend(report.projection.issues.iter().map(format_issue_line));
    lines
}

fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let millis = elapsed.subsec_millis();
    format!("{secs}.{millis:03}s")
}

fn status_style(status: &str) -> Option<Style> {
    let color = match status {
        "ok" => AnsiColor::BrightGreen,
        "warn" => AnsiColor::BrightYellow,
        "error" => AnsiColor::BrightRed,
        _ => return None,
    };
    Some(
        Style::new()
            .fg_color(Some(color.into()))
            .effects(Effects::BOLD),
    )
}

fn progress_label_style() -> Style {
    Style::new()
        .fg_color(Some(AnsiColor::BrightCyan.into()))
        .effects(Effects::BOLD)
}

fn progress_bar_style() -> Style {
    Style::new().fg_color(Some(AnsiColor::BrightBlue.into()))
}

fn colorize(style: Style, text: &str) -> String {
    format!("{}{}{}", style.render(), text, style.render_reset())
}

pub(crate) fn render_progress_line(
    style: OutputStyle,
    label: &str,
    current: u64,
    total: u64,
    elapsed: Option<Duration>,
) -> Option<String> {
    if style == OutputStyle::Plain {
        return None;
    }

    let width = 18_usize;
    let safe_total = total.max(1);
    let bounded_current = current.min(safe_total);
    let filled = ((bounded_current as usize) * width) / (safe_total as usize);
    let bar = format!(
        "{}{}",
        "=".repeat(filled),
        "-".repeat(width.saturating_sub(filled))
    );
    let percent = (bounded_current * 100) / safe_total;
    let counts = format!("{}/{}", HumanCount(current), HumanCount(total));
    let suffix = elapsed
        .map(|value| format!(" complete in {}", format_elapsed(value)))
        .unwrap_or_default();

    Some(format!(
        "{} [{}] {:>3}% {}{}",
        colorize(progress_label_style(), label),
        colorize(progress_bar_style(), &bar),
        percent,
        counts,
        suffix
    ))
}
