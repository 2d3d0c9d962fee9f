use campervan_insights::config::AppConfig;
use campervan_insights::error::AppError;
use campervan_insights::telemetry;
use campervan_insights::workflows::report::{self, ReportOptions, REPORT_PDF};
use campervan_insights::workflows::tourism::TourismSchema;
use campervan_insights::workflows::{decision, financial, social, tourism, weather};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    name = "campervan-insights",
    about = "Market, weather, sentiment and financial analysis for a campervan rental business",
    version
)]
struct Cli {
    /// Directory the input datasets are read from (overrides APP_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    /// Directory charts, tables and the report are written to (overrides APP_OUTPUT_DIR)
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run every analysis and write the PDF report (default command)
    Report(FinancialArgs),
    /// Aggregate the JSON-stat tourism exports
    Tourism,
    /// Summarize the monthly weather series
    Weather,
    /// Score recent posts about campervan rentals
    Social,
    /// Project cash flows, NPV and IRR
    Financial(FinancialArgs),
    /// Evaluate the launch decision tree and write the diagrams
    Decision,
}

#[derive(Args, Debug, Default)]
struct FinancialArgs {
    /// Initial investment for campervans and equipment
    #[arg(long)]
    investment: Option<f64>,
    /// Estimated annual revenue
    #[arg(long)]
    revenue: Option<f64>,
    /// Estimated annual costs
    #[arg(long)]
    costs: Option<f64>,
    /// Projection period in years
    #[arg(long)]
    years: Option<u32>,
    /// Discount rate as a fraction, e.g. 0.1 for 10%
    #[arg(long)]
    discount_rate: Option<f64>,
}

impl FinancialArgs {
    fn inputs(&self) -> financial::ProjectionInputs {
        let defaults = financial::ProjectionInputs::default();
        financial::ProjectionInputs {
            initial_investment: self.investment.unwrap_or(defaults.initial_investment),
            annual_revenue: self.revenue.unwrap_or(defaults.annual_revenue),
            annual_costs: self.costs.unwrap_or(defaults.annual_costs),
            years: self.years.unwrap_or(defaults.years),
            discount_rate: self.discount_rate.unwrap_or(defaults.discount_rate),
        }
    }
}

fn main() {
    if let Err(err) = run_cli() {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();

    let mut config = AppConfig::load()?;
    if let Some(dir) = cli.data_dir {
        config.paths.data_dir = dir;
    }
    if let Some(dir) = cli.output_dir {
        config.paths.output_dir = dir;
    }
    telemetry::init(&config.telemetry, config.environment)?;
    std::fs::create_dir_all(&config.paths.output_dir)?;
    info!(
        environment = ?config.environment,
        data_dir = %config.paths.data_dir.display(),
        output_dir = %config.paths.output_dir.display(),
        "campervan insights starting"
    );

    let command = cli
        .command
        .unwrap_or_else(|| Command::Report(FinancialArgs::default()));

    match command {
        Command::Report(args) => run_report(&config, &args),
        Command::Tourism => {
            let outcome = tourism::run(
                &config.paths,
                &config.inputs.tourism_files,
                &TourismSchema::default(),
            )?;
            println!("{}", outcome.render_text());
            Ok(())
        }
        Command::Weather => {
            let outcome = weather::run(&config.paths, &config.inputs.weather_file)?;
            println!("{}", outcome.render_text());
            Ok(())
        }
        Command::Social => {
            let outcome = social::run(&config.paths, &config.social)?;
            println!("{}", outcome.render_text());
            Ok(())
        }
        Command::Financial(args) => {
            let outcome = financial::run(&config.paths, &args.inputs())?;
            println!("{}", outcome.render_text());
            Ok(())
        }
        Command::Decision => {
            let outcome = decision::run(&config.paths)?;
            println!("{}", outcome.render_text());
            Ok(())
        }
    }
}

fn run_report(config: &AppConfig, args: &FinancialArgs) -> Result<(), AppError> {
    let options = ReportOptions {
        financial: args.inputs(),
        post_source: None,
    };

    match report::run(config, &options) {
        Ok(outcome) => {
            for section in &outcome.sections {
                println!("{}", section.heading);
                println!("{}", "-".repeat(section.heading.len()));
                println!("{}", section.body);
            }
            println!("PDF report generated successfully ({} pages).", outcome.pages);
        }
        Err(err) => error!(error = %err, "error creating PDF report"),
    }

    let pdf = config.paths.output(REPORT_PDF);
    if pdf.exists() {
        println!("\nAnalysis complete. PDF report generated: {}", pdf.display());
        println!("\nNext steps:");
        for (idx, step) in NEXT_STEPS.iter().enumerate() {
            println!("{}. {}", idx + 1, step);
        }
    } else {
        println!("\nError: PDF report was not generated. Please check the error messages above.");
    }
    Ok(())
}

const NEXT_STEPS: [&str; 7] = [
    "Review the PDF report for a comprehensive overview of all analyses",
    "Use the insights from the tourism data to inform your Business Launch Decision and Pricing Strategy",
    "Consider the weather data when deciding on your Operational Model and Campervan Types",
    "Leverage the social media sentiment analysis for your Marketing Focus and Additional Services decisions",
    "Utilize the financial analysis to guide your Fleet Size decision and overall business strategy",
    "Conduct further analyses or gather more data in areas where you need additional clarity",
    "Make your final decisions based on the comprehensive data and analyses provided",
];
