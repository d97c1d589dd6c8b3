//! Metrics output: per-run CSV, the append-only metrics log, console table.

use crate::domain::BuggyFileRanking;
use crate::error::Result;
use crate::eval::metrics::MetricsSummary;
use chrono::{DateTime, Local};
use console::style;
use std::fmt::Write as _;
use std::fs::{self, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use unicode_width::UnicodeWidthStr;

fn write_summary_lines(out: &mut String, summary: &MetricsSummary) {
    for hit in &summary.hits {
        let _ = writeln!(out, "hits@{}, {}/{}, {:.2}", hit.k, hit.hits, hit.total, hit.ratio());
    }
    out.push('\n');
    let _ = writeln!(out, "map, {:.3}", summary.map);
    out.push('\n');
    let _ = writeln!(out, "mrr, {:.3}", summary.mrr);
    out.push('\n');
    match summary.effectiveness {
        Some(eff) => {
            let _ = writeln!(out, "best effectiveness, {}", eff.best);
            let _ = writeln!(out, "worst effectiveness, {}", eff.worst);
            let _ = writeln!(out, "mean effectiveness, {:.3}", eff.mean);
        }
        None => {
            out.push_str("best effectiveness, n/a\n");
            out.push_str("worst effectiveness, n/a\n");
            out.push_str("mean effectiveness, n/a\n");
        }
    }
    out.push('\n');
    if let Some(improvement) = summary.improvement {
        let _ = writeln!(out, "relative improvement, {improvement:.3}");
    }
}

/// Full per-run report: aggregate rows followed by every ground-truth hit.
pub fn render_csv(summary: &MetricsSummary, rankings: &[Vec<BuggyFileRanking>]) -> String {
    let mut out = String::new();
    write_summary_lines(&mut out, summary);
    out.push_str("bug_id,file_path,rank\n");
    for ranking in rankings.iter().flatten() {
        let _ = writeln!(out, "{},{},{}", ranking.bug_id, ranking.file_path, ranking.rank);
    }
    out
}

/// Summary block appended to the metrics log after each loop.
pub fn render_log_block(loop_number: usize, summary: &MetricsSummary) -> String {
    let mut out = format!("running loop {loop_number}\n");
    write_summary_lines(&mut out, summary);
    if summary.improvement.is_some() {
        out.push('\n');
    }
    out
}

/// Write the per-run CSV as `<dir>/<MMDDYYHHMM>.csv`, adding a numeric suffix
/// when a run from the same minute already exists.
pub fn write_run_csv(dir: &Path, contents: &str, now: DateTime<Local>) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let stamp = now.format("%m%d%y%H%M").to_string();
    let mut path = dir.join(format!("{stamp}.csv"));
    let mut suffix = 1;
    while path.exists() {
        path = dir.join(format!("{stamp}-{suffix}.csv"));
        suffix += 1;
    }
    fs::write(&path, contents)?;
    tracing::debug!(path = %path.display(), "metrics written");
    Ok(path)
}

pub fn append_metrics_log(path: &Path, block: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(block.as_bytes())?;
    Ok(())
}

fn pad(cell: &str, width: usize) -> String {
    let fill = width.saturating_sub(UnicodeWidthStr::width(cell));
    format!("{cell}{}", " ".repeat(fill))
}

/// Console summary table.
pub fn render_table(title: &str, summary: &MetricsSummary) -> String {
    let mut rows: Vec<[String; 3]> = summary
        .hits
        .iter()
        .map(|h| [format!("Hits@{}", h.k), format!("{}/{}", h.hits, h.total), format!("{:.2}", h.ratio())])
        .collect();
    rows.push(["MAP".to_string(), String::new(), format!("{:.3}", summary.map)]);
    rows.push(["MRR".to_string(), String::new(), format!("{:.3}", summary.mrr)]);
    if let Some(eff) = summary.effectiveness {
        rows.push(["Effectiveness".to_string(), format!("{}..{}", eff.best, eff.worst), format!("{:.3}", eff.mean)]);
    }
    if let Some(improvement) = summary.improvement {
        rows.push(["Improvement".to_string(), String::new(), format!("{:+.3}", improvement)]);
    }

    let header = ["Metric", "Hits", "Value"];
    let mut widths = header.map(UnicodeWidthStr::width);
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(UnicodeWidthStr::width(cell.as_str()));
        }
    }

    let mut out = String::new();
    let _ = writeln!(out, "{}", style(title).bold());
    let _ = writeln!(
        out,
        "  {}  {}  {}",
        style(pad(header[0], widths[0])).cyan().bold(),
        style(pad(header[1], widths[1])).magenta().bold(),
        style(pad(header[2], widths[2])).green().bold()
    );
    for row in &rows {
        let _ = writeln!(
            out,
            "  {}  {}  {}",
            style(pad(&row[0], widths[0])).cyan(),
            style(pad(&row[1], widths[1])).magenta(),
            style(pad(&row[2], widths[2])).green()
        );
    }
    out
}
