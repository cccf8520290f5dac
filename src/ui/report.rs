use std::io::Write;

use anyhow::{Context, Result};

use super::relative::{ago, truncate};
use crate::poller::CycleReport;
use crate::usecase::badness::{MAX_BADNESS_SCORE, by_last_activity, last_activity};

/// Prints one cycle's outcome for `--once`.
pub fn print(report: &CycleReport, web_base: &str, json: bool) -> Result<()> {
    let mut out = std::io::stdout().lock();
    if json {
        serde_json::to_writer_pretty(&mut out, report).context("failed to encode report")?;
        writeln!(out)?;
        return Ok(());
    }
    for line in render_lines(report, web_base) {
        writeln!(out, "{line}")?;
    }
    Ok(())
}

pub fn render_lines(report: &CycleReport, web_base: &str) -> Vec<String> {
    let mut lines = vec![format!(
        "badness {}/{} for {} ({} pending)",
        report.score,
        MAX_BADNESS_SCORE,
        report.login,
        report.reviews.len()
    )];
    if report.reviews.is_empty() {
        lines.push("Your review queue is empty. Good on ya!".to_string());
    }
    for review in by_last_activity(&report.reviews) {
        lines.push(format!(
            "{} [from {}] [last updated {}] {}",
            truncate(&review.title, 60),
            review.author,
            ago(report.finished_at, last_activity(review)),
            review.web_url(web_base)
        ));
    }
    if report.failures > 0 {
        lines.push(format!("({} pull request(s) skipped)", report.failures));
    }
    lines
}
