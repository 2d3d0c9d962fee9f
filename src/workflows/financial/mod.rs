mod projection;

pub use projection::{
    cash_flows, irr, npv, sensitivity, simulate, CashFlowProjection, InputError, IrrError,
    ProjectionInputs, SensitivityPoint, MAX_YEARS,
};

use super::{format_currency, render_chart, write_numbered, ChartOutput};
use crate::charts::{render_line_chart, CategoryAxis, LineChart, Series};
use crate::config::PathConfig;
use std::io::Write;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};

pub const CUMULATIVE_CHART: &str = "cumulative_cash_flows.png";
pub const SENSITIVITY_CHART: &str = "npv_sensitivity.png";
pub const SENSITIVITY_CSV: &str = "npv_sensitivity.csv";

const SENSITIVITY_STEPS: i32 = 2;
const SENSITIVITY_STEP: f64 = 0.1;

#[derive(Error, Debug)]
pub enum FinancialError {
    #[error("invalid projection inputs: {0}")]
    Inputs(#[from] InputError),

    #[error("failed to write sensitivity table: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to create {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct FinancialOutcome {
    pub projection: CashFlowProjection,
    pub sensitivity: Vec<SensitivityPoint>,
    pub charts: Vec<ChartOutput>,
    pub csv_export: Option<PathBuf>,
}

pub fn write_sensitivity_csv<W: Write>(
    writer: W,
    points: &[SensitivityPoint],
) -> Result<(), FinancialError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for point in points {
        csv_writer.serialize(point)?;
    }
    csv_writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

pub fn run(paths: &PathConfig, inputs: &ProjectionInputs) -> Result<FinancialOutcome, FinancialError> {
    inputs.validate()?;
    let projection = simulate(inputs);
    info!(
        npv = projection.npv,
        irr = ?projection.irr,
        years = inputs.years,
        "financial projection computed"
    );

    let sensitivity = sensitivity(inputs, SENSITIVITY_STEPS, SENSITIVITY_STEP);

    let csv_path = paths.output(SENSITIVITY_CSV);
    let csv_export = match std::fs::File::create(&csv_path)
        .map_err(|source| FinancialError::Io {
            path: csv_path.clone(),
            source,
        })
        .and_then(|file| write_sensitivity_csv(std::io::BufWriter::new(file), &sensitivity))
    {
        Ok(()) => Some(csv_path),
        Err(err) => {
            warn!(error = %err, "sensitivity table export failed");
            None
        }
    };

    let charts = vec![
        plot_cumulative(&projection, paths.output(CUMULATIVE_CHART)),
        plot_sensitivity(&sensitivity, paths.output(SENSITIVITY_CHART)),
    ];

    Ok(FinancialOutcome {
        projection,
        sensitivity,
        charts,
        csv_export,
    })
}

pub fn expected_charts(paths: &PathConfig) -> Vec<PathBuf> {
    vec![
        paths.output(CUMULATIVE_CHART),
        paths.output(SENSITIVITY_CHART),
    ]
}

fn plot_cumulative(projection: &CashFlowProjection, path: PathBuf) -> ChartOutput {
    let points = projection
        .cumulative()
        .into_iter()
        .enumerate()
        .collect();
    let years = CategoryAxis::new((0..projection.cash_flows.len()).map(|y| y.to_string()).collect());

    render_chart(path, |path| {
        render_line_chart(
            &LineChart {
                title: "Cumulative Cash Flows",
                x_desc: "Year",
                y_desc: "Cumulative Cash Flow",
                series: vec![Series::new("", points)],
                categories: years,
                zero_line: true,
            },
            path,
        )
    })
}

fn plot_sensitivity(points: &[SensitivityPoint], path: PathBuf) -> ChartOutput {
    let labels = points
        .iter()
        .map(|point| format!("{:+.0}%", point.revenue_change * 100.0))
        .collect();
    let series = points
        .iter()
        .enumerate()
        .map(|(idx, point)| (idx, point.npv))
        .collect();

    render_chart(path, |path| {
        render_line_chart(
            &LineChart {
                title: "NPV Sensitivity to Revenue Changes",
                x_desc: "Revenue Change (%)",
                y_desc: "NPV",
                series: vec![Series::new("", series)],
                categories: CategoryAxis::new(labels),
                zero_line: true,
            },
            path,
        )
    })
}

/// Rate as a percentage rounded to two decimals, without a `-0.00`.
fn percent(rate: f64) -> f64 {
    (rate * 10_000.0).round() / 100.0 + 0.0
}

impl FinancialOutcome {
    pub fn render_text(&self) -> String {
        let projection = &self.projection;
        let inputs = &projection.inputs;
        let mut out = String::new();

        out.push_str("Financial Projection Inputs:\n");
        out.push_str(&format!(
            "   - Initial investment: {}\n",
            format_currency(inputs.initial_investment)
        ));
        out.push_str(&format!(
            "   - Annual revenue: {}\n",
            format_currency(inputs.annual_revenue)
        ));
        out.push_str(&format!(
            "   - Annual costs: {}\n",
            format_currency(inputs.annual_costs)
        ));
        out.push_str(&format!(
            "   - Horizon: {} years at a {:.1}% discount rate\n\n",
            inputs.years,
            inputs.discount_rate * 100.0
        ));

        out.push_str(&format!(
            "Net Present Value (NPV): {}\n",
            format_currency(projection.npv)
        ));
        match projection.irr {
            Ok(rate) => out.push_str(&format!(
                "Internal Rate of Return (IRR): {:.2}%\n",
                percent(rate)
            )),
            Err(err) => {
                out.push_str("Internal Rate of Return (IRR): Could not be calculated\n");
                out.push_str(&format!("   ({})\n", err));
            }
        }
        match projection.payback_period() {
            Some(year) => out.push_str(&format!("Payback period: year {}\n", year)),
            None => out.push_str(&format!(
                "Payback period: not reached within {} years\n",
                inputs.years
            )),
        }

        out.push_str("\nNPV sensitivity to revenue changes:\n");
        for point in &self.sensitivity {
            out.push_str(&format!(
                "   - {:+.0}% revenue: {}\n",
                point.revenue_change * 100.0,
                format_currency(point.npv)
            ));
        }

        out.push_str("\nPlots generated:\n");
        for chart in &self.charts {
            let status = if chart.rendered() { "" } else { " (not rendered)" };
            out.push_str(&format!("   - {}{}\n", chart.file_name(), status));
        }
        if let Some(path) = &self.csv_export {
            out.push_str(&format!("\nSensitivity table exported to {}\n", path.display()));
        }

        out.push('\n');
        write_numbered(
            &mut out,
            "How to use this data:",
            &[
                "Use NPV to assess the overall profitability of the venture",
                "Compare IRR with the company's required rate of return to make the Business Launch Decision",
                "Analyze the cumulative cash flow plot to understand the payback period",
                "Adjust inputs (initial investment, revenue, costs) to compare different scenarios for Fleet Size and Pricing Strategy",
                "Use the sensitivity analysis to understand how changes in revenue affect the project's NPV",
            ],
        );
        out
    }

    pub fn images(&self) -> Vec<ChartOutput> {
        self.charts.clone()
    }
}
