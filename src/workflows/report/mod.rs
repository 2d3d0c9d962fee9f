mod pdf;

pub use pdf::{write_report, PdfSummary};

use super::social::{self, PostSource, SocialOutcome};
use super::{decision, financial, tourism, weather, ChartOutput};
use crate::config::AppConfig;
use std::fmt;
use std::path::PathBuf;
use tracing::{error, info};

pub const REPORT_PDF: &str = "campervan_rental_analysis_report.pdf";
pub const REPORT_TITLE: &str = "Campervan Rental Business Analysis Report";

#[derive(Debug)]
pub enum ReportError {
    Pdf(printpdf::Error),
    Io { path: PathBuf, source: std::io::Error },
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportError::Pdf(err) => write!(f, "failed to build PDF report: {}", err),
            ReportError::Io { path, source } => {
                write!(f, "failed to write {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for ReportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReportError::Pdf(err) => Some(err),
            ReportError::Io { source, .. } => Some(source),
        }
    }
}

impl From<printpdf::Error> for ReportError {
    fn from(err: printpdf::Error) -> Self {
        Self::Pdf(err)
    }
}

/// The analyses in the order the report presents them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Analysis {
    Tourism,
    Weather,
    SocialMedia,
    Financial,
    Decision,
}

impl Analysis {
    pub fn ordered() -> [Analysis; 5] {
        [
            Analysis::Tourism,
            Analysis::Weather,
            Analysis::SocialMedia,
            Analysis::Financial,
            Analysis::Decision,
        ]
    }

    pub fn heading(self) -> &'static str {
        match self {
            Analysis::Tourism => "Tourism Data Analysis",
            Analysis::Weather => "Weather Data Analysis",
            Analysis::SocialMedia => "Social Media Sentiment Analysis",
            Analysis::Financial => "Financial Analysis",
            Analysis::Decision => "Decision Analysis",
        }
    }

    fn step_name(self) -> &'static str {
        match self {
            Analysis::Tourism => "tourism analysis",
            Analysis::Weather => "weather analysis",
            Analysis::SocialMedia => "social media analysis",
            Analysis::Financial => "financial analysis",
            Analysis::Decision => "decision analysis",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSection {
    pub analysis: Analysis,
    pub heading: String,
    pub body: String,
    /// Charts this section expects in the report. Only those rendered in this
    /// run are embedded; the rest get a placeholder page.
    pub images: Vec<ChartOutput>,
    pub failed: bool,
}

impl ReportSection {
    pub fn completed(analysis: Analysis, body: String, images: Vec<ChartOutput>) -> Self {
        Self {
            analysis,
            heading: analysis.heading().to_string(),
            body,
            images,
            failed: false,
        }
    }

    /// Error section; `expected` are the charts the analysis would have drawn.
    pub fn failed(analysis: Analysis, err: &dyn fmt::Display, expected: Vec<PathBuf>) -> Self {
        Self {
            analysis,
            heading: analysis.heading().to_string(),
            body: format!("Error running {}: {}", analysis.step_name(), err),
            images: not_produced(expected, "analysis failed"),
            failed: true,
        }
    }
}

fn not_produced(paths: Vec<PathBuf>, reason: &str) -> Vec<ChartOutput> {
    paths
        .into_iter()
        .map(|path| ChartOutput::missing(path, reason))
        .collect()
}

/// Everything the report needs beyond the loaded configuration.
#[derive(Debug, Default)]
pub struct ReportOptions<'a> {
    pub financial: financial::ProjectionInputs,
    /// Overrides the Twitter client built from the configured credentials.
    pub post_source: Option<&'a dyn PostSource>,
}

#[derive(Debug, Clone)]
pub struct ReportOutcome {
    pub sections: Vec<ReportSection>,
    pub pdf: PathBuf,
    pub pages: usize,
    /// Charts embedded in the PDF.
    pub embedded: Vec<PathBuf>,
    /// Charts that got a "not found" page instead.
    pub placeholders: Vec<PathBuf>,
}

impl ReportOutcome {
    pub fn failed_sections(&self) -> impl Iterator<Item = &ReportSection> {
        self.sections.iter().filter(|section| section.failed)
    }
}

/// Runs one analysis and turns its result into a section. A failure becomes
/// an error section; it never stops the report.
pub fn run_section(config: &AppConfig, options: &ReportOptions<'_>, analysis: Analysis) -> ReportSection {
    info!(analysis = analysis.step_name(), "running analysis");
    let section = build_section(config, options, analysis);
    if section.failed {
        error!(analysis = analysis.step_name(), error = %section.body, "analysis failed");
    }
    section
}

fn build_section(config: &AppConfig, options: &ReportOptions<'_>, analysis: Analysis) -> ReportSection {
    let paths = &config.paths;
    match analysis {
        Analysis::Tourism => match tourism::run(
            paths,
            &config.inputs.tourism_files,
            &tourism::TourismSchema::default(),
        ) {
            Ok(outcome) => ReportSection::completed(analysis, outcome.render_text(), outcome.images()),
            Err(err) => ReportSection::failed(analysis, &err, tourism::expected_charts(paths)),
        },
        Analysis::Weather => match weather::run(paths, &config.inputs.weather_file) {
            Ok(outcome) => ReportSection::completed(analysis, outcome.render_text(), outcome.images()),
            Err(err) => ReportSection::failed(analysis, &err, weather::expected_charts(paths)),
        },
        Analysis::SocialMedia => {
            let result = match options.post_source {
                Some(source) => Ok(social::analyze(
                    paths,
                    source,
                    &config.social.query,
                    config.social.max_posts,
                )),
                None => social::run(paths, &config.social),
            };
            match result {
                Ok(outcome @ SocialOutcome::Analyzed(_)) => {
                    ReportSection::completed(analysis, outcome.render_text(), outcome.images())
                }
                Ok(outcome @ SocialOutcome::NoData { .. }) => ReportSection::completed(
                    analysis,
                    outcome.render_text(),
                    not_produced(social::expected_charts(paths), "no posts were fetched"),
                ),
                Err(err) => ReportSection::failed(analysis, &err, social::expected_charts(paths)),
            }
        }
        Analysis::Financial => match financial::run(paths, &options.financial) {
            Ok(outcome) => ReportSection::completed(analysis, outcome.render_text(), outcome.images()),
            Err(err) => ReportSection::failed(analysis, &err, financial::expected_charts(paths)),
        },
        Analysis::Decision => match decision::run(paths) {
            Ok(outcome) => ReportSection::completed(analysis, outcome.render_text(), Vec::new()),
            Err(err) => ReportSection::failed(analysis, &err, Vec::new()),
        },
    }
}

pub fn collect_sections(config: &AppConfig, options: &ReportOptions<'_>) -> Vec<ReportSection> {
    Analysis::ordered()
        .into_iter()
        .map(|analysis| run_section(config, options, analysis))
        .collect()
}

/// Runs every analysis in order and writes the PDF report.
pub fn run(config: &AppConfig, options: &ReportOptions<'_>) -> Result<ReportOutcome, ReportError> {
    let sections = collect_sections(config, options);
    let images: Vec<ChartOutput> = sections
        .iter()
        .flat_map(|section| section.images.iter().cloned())
        .collect();

    let pdf = config.paths.output(REPORT_PDF);
    let summary = write_report(&pdf, REPORT_TITLE, &sections, &images)?;
    info!(
        report = %pdf.display(),
        pages = summary.pages,
        embedded = summary.embedded.len(),
        placeholders = summary.placeholders.len(),
        failed = sections.iter().filter(|section| section.failed).count(),
        "PDF report written"
    );

    Ok(ReportOutcome {
        sections,
        pdf,
        pages: summary.pages,
        embedded: summary.embedded,
        placeholders: summary.placeholders,
    })
}
