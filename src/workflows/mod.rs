pub mod decision;
pub mod financial;
pub mod report;
pub mod social;
pub mod tourism;
pub mod weather;

use crate::charts::PlotError;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// A chart an analysis meant to produce, and whether it made it to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartOutput {
    pub path: PathBuf,
    pub error: Option<String>,
}

impl ChartOutput {
    /// A chart that was not drawn in this run, e.g. because its analysis failed.
    pub fn missing(path: PathBuf, reason: impl Into<String>) -> Self {
        Self {
            path,
            error: Some(reason.into()),
        }
    }

    pub fn rendered(&self) -> bool {
        self.error.is_none()
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Runs a chart renderer, logging instead of failing: a missing chart is
/// reported in the PDF, it does not abort the analysis.
pub(crate) fn render_chart<F>(path: PathBuf, render: F) -> ChartOutput
where
    F: FnOnce(&Path) -> Result<(), PlotError>,
{
    match render(&path) {
        Ok(()) => {
            info!(chart = %path.display(), "chart written");
            ChartOutput { path, error: None }
        }
        Err(err) => {
            warn!(chart = %path.display(), error = %err, "chart could not be rendered");
            ChartOutput {
                path,
                error: Some(err.to_string()),
            }
        }
    }
}

/// Formats a count with thousands separators, e.g. `1,234,567`.
pub fn format_count(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Formats money with two decimals and thousands separators, e.g. `-$120,921.32`.
pub fn format_currency(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}${}.{:02}", format_count(cents / 100), cents % 100)
}

fn write_numbered(out: &mut String, heading: &str, lines: &[&str]) {
    out.push_str(heading);
    out.push('\n');
    for (idx, line) in lines.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", idx + 1, line));
    }
}
