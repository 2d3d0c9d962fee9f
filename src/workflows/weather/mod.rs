mod parser;
mod summary;

pub use parser::{ParseStats, WeatherRecord};
pub use summary::{MonthExtreme, WeatherSummary};

use super::{render_chart, write_numbered, ChartOutput};
use crate::charts::{render_dual_axis_chart, CategoryAxis, DualAxisChart, Series};
use crate::config::PathConfig;
use plotters::style::RGBColor;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::info;

pub const WEATHER_CHART: &str = "weather_plot.png";

const MAX_TEMPERATURE_COLOR: RGBColor = RGBColor(214, 39, 40);
const MIN_TEMPERATURE_COLOR: RGBColor = RGBColor(31, 119, 180);
const PRECIPITATION_COLOR: RGBColor = RGBColor(44, 160, 44);

#[derive(Debug)]
pub enum WeatherError {
    Io { path: PathBuf, source: std::io::Error },
    Json(serde_json::Error),
    NoUsableRecords { rows: usize },
}

impl fmt::Display for WeatherError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeatherError::Io { path, source } => {
                write!(f, "failed to read {}: {}", path.display(), source)
            }
            WeatherError::Json(err) => write!(f, "invalid weather data: {}", err),
            WeatherError::NoUsableRecords { rows } => write!(
                f,
                "none of the {} weather rows has min/max temperature and precipitation",
                rows
            ),
        }
    }
}

impl std::error::Error for WeatherError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WeatherError::Io { source, .. } => Some(source),
            WeatherError::Json(err) => Some(err),
            WeatherError::NoUsableRecords { .. } => None,
        }
    }
}

impl From<serde_json::Error> for WeatherError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

/// Reads and filters a `{"data": [...]}` weather series.
pub fn load_records<R: Read>(reader: R) -> Result<(Vec<WeatherRecord>, ParseStats), WeatherError> {
    Ok(parser::parse_records(reader)?)
}

#[derive(Debug, Clone)]
pub struct WeatherOutcome {
    pub summary: WeatherSummary,
    pub stats: ParseStats,
    pub chart: ChartOutput,
}

pub fn run(paths: &PathConfig, file: &Path) -> Result<WeatherOutcome, WeatherError> {
    let path = paths.input(file);
    info!(file = %path.display(), "loading weather data");
    let handle = File::open(&path).map_err(|source| WeatherError::Io {
        path: path.clone(),
        source,
    })?;
    let (records, stats) = load_records(BufReader::new(handle))?;
    info!(
        rows = stats.rows,
        kept = records.len(),
        incomplete = stats.dropped_incomplete,
        inverted = stats.dropped_inverted,
        "weather rows filtered"
    );

    let summary =
        WeatherSummary::build(&records).ok_or(WeatherError::NoUsableRecords { rows: stats.rows })?;
    let chart = plot_weather(&records, &summary, paths.output(WEATHER_CHART));

    Ok(WeatherOutcome {
        summary,
        stats,
        chart,
    })
}

pub fn expected_charts(paths: &PathConfig) -> Vec<PathBuf> {
    vec![paths.output(WEATHER_CHART)]
}

fn plot_weather(records: &[WeatherRecord], summary: &WeatherSummary, path: PathBuf) -> ChartOutput {
    let indexed = |field: fn(&WeatherRecord) -> f64| {
        records
            .iter()
            .enumerate()
            .map(|(idx, record)| (idx, field(record)))
            .collect::<Vec<_>>()
    };
    let categories = CategoryAxis::new(
        records
            .iter()
            .map(|record| record.date.format("%Y-%m").to_string())
            .collect(),
    );
    let title = format!(
        "Monthly Weather Data ({}-{})",
        summary.first_year, summary.last_year
    );

    render_chart(path, |path| {
        render_dual_axis_chart(
            &DualAxisChart {
                title: &title,
                x_desc: "Date",
                left_desc: "Temperature (°C)",
                right_desc: "Precipitation (mm)",
                categories,
                lines: vec![
                    (
                        Series::new("Max Temperature", indexed(|r| r.tmax)),
                        MAX_TEMPERATURE_COLOR,
                    ),
                    (
                        Series::new("Min Temperature", indexed(|r| r.tmin)),
                        MIN_TEMPERATURE_COLOR,
                    ),
                ],
                bars: (
                    Series::new("Precipitation", indexed(|r| r.prcp)),
                    PRECIPITATION_COLOR,
                ),
            },
            path,
        )
    })
}

impl WeatherOutcome {
    pub fn render_text(&self) -> String {
        let s = &self.summary;
        let mut out = String::new();
        let heading = format!("Weather Data Analysis ({}-{}):", s.first_year, s.last_year);
        out.push_str(&heading);
        out.push('\n');
        out.push_str(&"=".repeat(heading.chars().count()));
        out.push('\n');

        match s.avg_temperature {
            Some(avg) => out.push_str(&format!("Average Temperature: {:.1}°C\n", avg)),
            None => out.push_str("Average Temperature: not reported\n"),
        }
        out.push_str(&format!(
            "Average Max Temperature: {:.1}°C\n",
            s.avg_max_temperature
        ));
        out.push_str(&format!(
            "Average Min Temperature: {:.1}°C\n",
            s.avg_min_temperature
        ));
        out.push_str(&format!(
            "Total Precipitation: {:.1} mm\n",
            s.total_precipitation
        ));
        out.push_str(&format!(
            "Average Monthly Precipitation: {:.1} mm\n",
            s.avg_precipitation
        ));

        out.push_str(&format!(
            "\nHottest month: {} with max temperature of {:.1}°C\n",
            s.hottest.month_label(),
            s.hottest.value
        ));
        out.push_str(&format!(
            "Coldest month: {} with min temperature of {:.1}°C\n",
            s.coldest.month_label(),
            s.coldest.value
        ));
        out.push_str(&format!(
            "Rainiest month: {} with precipitation of {:.1} mm\n",
            s.rainiest.month_label(),
            s.rainiest.value
        ));

        let dropped = self.stats.dropped_incomplete + self.stats.dropped_inverted + self.stats.dropped_undated;
        if dropped > 0 {
            out.push_str(&format!(
                "\n{} of {} months were left out for missing or inconsistent readings\n",
                dropped, self.stats.rows
            ));
        }

        if self.chart.rendered() {
            out.push_str(&format!("\nWeather plot generated: {}\n", self.chart.file_name()));
        } else {
            out.push_str(&format!("\nWeather plot not generated: {}\n", self.chart.file_name()));
        }

        out.push('\n');
        write_numbered(
            &mut out,
            "How to use this data:",
            &[
                "Analyze seasonal weather patterns to inform the Operational Model decision",
                "Use temperature and precipitation data for Demand Forecasting",
                "Consider weather conditions when deciding on Campervan Types",
                "Use weather data to estimate potential impact on Customer Satisfaction",
            ],
        );
        out
    }

    pub fn images(&self) -> Vec<ChartOutput> {
        vec![self.chart.clone()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(dir: &Path) -> PathConfig {
        PathConfig {
            data_dir: dir.to_path_buf(),
            output_dir: dir.to_path_buf(),
        }
    }

    #[test]
    fn run_summarizes_filtered_months() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::write(
            dir.path().join("weather.json"),
            r#"{"data": [
                {"date": "2014-01-01 00:00:00", "tavg": -1.0, "tmin": -5.0, "tmax": 3.0, "prcp": 150.0},
                {"date": "2014-07-01 00:00:00", "tavg": 15.0, "tmin": 11.0, "tmax": 21.0, "prcp": 70.0},
                {"date": "2015-07-01 00:00:00", "tavg": 16.0, "tmin": 12.0, "tmax": 23.0, "prcp": null}
            ]}"#,
        )
        .expect("fixture written");

        let outcome = run(&paths(dir.path()), &PathBuf::from("weather.json")).expect("weather runs");
        assert_eq!(outcome.summary.months, 2);
        assert_eq!(outcome.summary.hottest.value, 21.0);
        assert_eq!(outcome.stats.dropped_incomplete, 1);
        assert_eq!(outcome.chart.path, dir.path().join(WEATHER_CHART));

        let text = outcome.render_text();
        assert!(text.starts_with("Weather Data Analysis (2014-2014):"));
        assert!(text.contains("Hottest month: July 2014 with max temperature of 21.0°C"));
        assert!(text.contains("Total Precipitation: 220.0 mm"));
        assert!(text.contains("1 of 3 months were left out"));
        assert!(text.contains("How to use this data:"));
    }

    #[test]
    fn all_rows_unusable_is_a_typed_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::write(
            dir.path().join("weather.json"),
            r#"{"data": [{"date": "2014-01-01", "tavg": 1.0, "tmin": null, "tmax": 2.0, "prcp": 3.0}]}"#,
        )
        .expect("fixture written");

        let err = run(&paths(dir.path()), Path::new("weather.json")).expect_err("no usable rows");
        assert!(matches!(err, WeatherError::NoUsableRecords { rows: 1 }));
    }

    #[test]
    fn missing_file_reports_the_path() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = run(&paths(dir.path()), Path::new("absent.json")).expect_err("missing file");
        assert!(err.to_string().contains("absent.json"));
    }
}
