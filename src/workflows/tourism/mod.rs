mod domain;
mod jsonstat;
mod plots;
mod summary;

pub use domain::{region_slug, TourismRecord, TourismSchema, YearMonth};
pub use plots::{region_chart_names, TOTAL_CHART};
pub use summary::{
    monthly_by, monthly_totals, regions, seasonality, AccommodationShare, Facet, RegionSummary,
    TourismSummary,
};

use super::{format_count, write_numbered, ChartOutput};
use crate::config::PathConfig;
use jsonstat::Cube;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const RECORDS_CSV: &str = "tourism_records.csv";

#[derive(Debug)]
pub enum TourismError {
    Io { path: PathBuf, source: std::io::Error },
    Json(serde_json::Error),
    Csv(csv::Error),
    MissingLayout,
    MissingDimension(String),
    MissingCategoryIndex(String),
    DimensionSizeMismatch {
        dimension: String,
        expected: usize,
        actual: usize,
    },
    ShapeMismatch { expected: usize, actual: usize },
    InvalidPeriod(String),
    InvalidValue { index: usize, value: f64 },
    NoData { attempted: usize },
}

impl fmt::Display for TourismError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TourismError::Io { path, source } => {
                write!(f, "failed to read {}: {}", path.display(), source)
            }
            TourismError::Json(err) => write!(f, "invalid JSON-stat export: {}", err),
            TourismError::Csv(err) => write!(f, "failed to write tourism table: {}", err),
            TourismError::MissingLayout => {
                write!(f, "export does not declare matching dimension id and size lists")
            }
            TourismError::MissingDimension(id) => write!(f, "export has no '{}' dimension", id),
            TourismError::MissingCategoryIndex(id) => {
                write!(f, "dimension '{}' has no usable category index", id)
            }
            TourismError::DimensionSizeMismatch {
                dimension,
                expected,
                actual,
            } => write!(
                f,
                "dimension '{}' declares {} categories but lists {}",
                dimension, expected, actual
            ),
            TourismError::ShapeMismatch { expected, actual } => write!(
                f,
                "dimensions describe {} cells but the export has {} values",
                expected, actual
            ),
            TourismError::InvalidPeriod(label) => {
                write!(f, "'{}' is not a YYYYMmm period", label)
            }
            TourismError::InvalidValue { index, value } => {
                write!(f, "value #{} ({}) is not a valid visit count", index, value)
            }
            TourismError::NoData { attempted } => write!(
                f,
                "none of the {} tourism files could be loaded",
                attempted
            ),
        }
    }
}

impl std::error::Error for TourismError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TourismError::Io { source, .. } => Some(source),
            TourismError::Json(err) => Some(err),
            TourismError::Csv(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for TourismError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

impl From<csv::Error> for TourismError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

pub struct TourismImporter;

impl TourismImporter {
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        schema: &TourismSchema,
    ) -> Result<Vec<TourismRecord>, TourismError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| TourismError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw, schema)
    }

    pub fn from_json(raw: &str, schema: &TourismSchema) -> Result<Vec<TourismRecord>, TourismError> {
        Cube::from_json(raw)?.into_records(schema)
    }
}

/// Writes the flattened records as CSV, one row per cell of the export.
pub fn write_records_csv<W: Write>(writer: W, records: &[TourismRecord]) -> Result<(), TourismError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for record in records {
        csv_writer.serialize(record)?;
    }
    csv_writer.flush().map_err(|err| TourismError::Csv(err.into()))?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct TourismOutcome {
    pub records: Vec<TourismRecord>,
    pub regions: Vec<String>,
    pub summary: TourismSummary,
    pub charts: Vec<ChartOutput>,
    pub csv_export: Option<PathBuf>,
    pub skipped: Vec<SkippedFile>,
}

/// Loads every export, aggregates across regions and renders the charts.
/// Unreadable files are skipped; the run fails only when nothing loads.
pub fn run(
    paths: &PathConfig,
    files: &[PathBuf],
    schema: &TourismSchema,
) -> Result<TourismOutcome, TourismError> {
    let mut records = Vec::new();
    let mut skipped = Vec::new();

    for file in files {
        let path = paths.input(file);
        info!(file = %path.display(), "processing tourism export");
        match TourismImporter::from_path(&path, schema) {
            Ok(mut loaded) if !loaded.is_empty() => {
                info!(file = %path.display(), records = loaded.len(), "tourism export loaded");
                records.append(&mut loaded);
            }
            Ok(_) => {
                warn!(file = %path.display(), "tourism export is empty");
                skipped.push(SkippedFile {
                    path,
                    reason: "no values".to_string(),
                });
            }
            Err(err) => {
                warn!(file = %path.display(), error = %err, "skipping tourism export");
                skipped.push(SkippedFile {
                    path,
                    reason: err.to_string(),
                });
            }
        }
    }

    let summary = TourismSummary::build(&records).ok_or(TourismError::NoData {
        attempted: files.len(),
    })?;
    let regions = regions(&records);

    let csv_path = paths.output(RECORDS_CSV);
    let csv_export = match std::fs::File::create(&csv_path)
        .map_err(|source| TourismError::Io {
            path: csv_path.clone(),
            source,
        })
        .and_then(|file| write_records_csv(std::io::BufWriter::new(file), &records))
    {
        Ok(()) => Some(csv_path),
        Err(err) => {
            warn!(error = %err, "tourism table export failed");
            None
        }
    };

    let charts = plots::plot_all(&records, &regions, paths);

    Ok(TourismOutcome {
        records,
        regions,
        summary,
        charts,
        csv_export,
        skipped,
    })
}

/// Chart files the analysis aims to produce; used when it fails before plotting.
pub fn expected_charts(paths: &PathConfig) -> Vec<PathBuf> {
    vec![paths.output(TOTAL_CHART)]
}

impl TourismOutcome {
    pub fn render_text(&self) -> String {
        let summary = &self.summary;
        let mut out = String::new();
        out.push_str("Tourism Data Analysis Summary:\n");
        out.push_str("==============================\n");

        out.push_str(&format!(
            "1. Total Overnight Stays by Region ({}):\n",
            summary.latest_year
        ));
        for region in &summary.regions {
            out.push_str(&format!(
                "   - {}: {}\n",
                region.region,
                format_count(region.latest_year_total)
            ));
        }

        match summary.previous_year {
            Some(previous) => out.push_str(&format!(
                "\n2. Year-over-Year Growth by Region ({} vs {}):\n",
                summary.latest_year, previous
            )),
            None => out.push_str("\n2. Year-over-Year Growth by Region:\n"),
        }
        for region in &summary.regions {
            let growth = region
                .yoy_growth
                .map(|growth| format!("{:+.1}%", growth * 100.0))
                .unwrap_or_else(|| "not available".to_string());
            out.push_str(&format!("   - {}: {}\n", region.region, growth));
        }

        out.push_str("\n3. Most Popular Accommodation Type by Region:\n");
        for region in &summary.regions {
            match &region.top_accommodation {
                Some(top) => out.push_str(&format!(
                    "   - {}: {} ({} stays)\n",
                    region.region,
                    top.accommodation,
                    format_count(top.visits)
                )),
                None => out.push_str(&format!("   - {}: no data\n", region.region)),
            }
        }

        if !self.skipped.is_empty() {
            out.push_str("\nSkipped files:\n");
            for skipped in &self.skipped {
                out.push_str(&format!("   - {}: {}\n", skipped.path.display(), skipped.reason));
            }
        }

        out.push_str("\nPlots generated:\n");
        for chart in &self.charts {
            let status = if chart.rendered() { "" } else { " (not rendered)" };
            out.push_str(&format!("   - {}{}\n", chart.file_name(), status));
        }
        if let Some(path) = &self.csv_export {
            out.push_str(&format!("\nRecords exported to {}\n", path.display()));
        }

        out.push('\n');
        write_numbered(
            &mut out,
            "How to use this data:",
            &[
                "Analyze trends in tourism across different regions to inform the Business Launch Decision",
                "Compare the popularity of hotels vs. camping sites to guide your service offerings",
                "Use the total tourist numbers and growth rates to estimate potential market size for your Pricing Strategy",
                "Consider seasonal variations in the data to decide on your Operational Model",
                "Use the regional comparisons to determine the most promising locations for your business",
                "Analyze the nationality comparison to target specific markets and tailor your marketing strategies",
            ],
        );
        out
    }

    pub fn images(&self) -> Vec<ChartOutput> {
        self.charts.clone()
    }
}
