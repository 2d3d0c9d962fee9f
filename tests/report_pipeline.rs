use campervan_insights::config::{
    AppConfig, AppEnvironment, InputConfig, PathConfig, SocialConfig, TelemetryConfig,
    TwitterConfig,
};
use campervan_insights::workflows::report::{self, Analysis, ReportOptions, REPORT_PDF};
use campervan_insights::workflows::social::{PostSource, SourceError};
use std::path::{Path, PathBuf};
use std::time::Duration;

const WEATHER_FIXTURE: &str = r#"{"data": [
    {"date": "2014-01-01 00:00:00", "tavg": -1.0, "tmin": -5.0, "tmax": 3.0, "prcp": 150.0},
    {"date": "2014-07-01 00:00:00", "tavg": 15.0, "tmin": 11.0, "tmax": 21.0, "prcp": 70.0},
    {"date": "2015-01-01 00:00:00", "tavg": 0.5, "tmin": -3.0, "tmax": 4.0, "prcp": 180.0},
    {"date": "2015-07-01 00:00:00", "tavg": 16.0, "tmin": 12.0, "tmax": 23.0, "prcp": 40.0}
]}"#;

#[derive(Debug)]
struct CannedPosts;

impl PostSource for CannedPosts {
    fn verify(&self) -> Result<String, SourceError> {
        Ok("fjord_vans".to_string())
    }

    fn search(&self, _query: &str, count: usize) -> Result<Vec<String>, SourceError> {
        Ok([
            "Amazing campervan weekend, beautiful views",
            "Awful experience, the motorhome broke down",
            "Renting an RV in Rogaland next month",
        ]
        .iter()
        .take(count)
        .map(|text| text.to_string())
        .collect())
    }
}

fn config_in(dir: &Path) -> AppConfig {
    AppConfig {
        environment: AppEnvironment::Test,
        paths: PathConfig {
            data_dir: dir.to_path_buf(),
            output_dir: dir.to_path_buf(),
        },
        telemetry: TelemetryConfig {
            log_level: "warn".to_string(),
        },
        inputs: InputConfig {
            tourism_files: vec![PathBuf::from("tourism_missing.json")],
            weather_file: PathBuf::from("weather.json"),
        },
        social: SocialConfig {
            query: "campervan rental".to_string(),
            max_posts: 10,
            http_timeout: Duration::from_secs(5),
            credentials: TwitterConfig::default(),
        },
    }
}

#[test]
fn report_keeps_going_when_an_analysis_fails() {
    let dir = tempfile::tempdir().expect("temp dir");
    std::fs::write(dir.path().join("weather.json"), WEATHER_FIXTURE).expect("fixture written");
    let config = config_in(dir.path());
    let source = CannedPosts;
    let options = ReportOptions {
        post_source: Some(&source),
        ..ReportOptions::default()
    };

    let outcome = report::run(&config, &options).expect("report written");

    let order: Vec<Analysis> = outcome.sections.iter().map(|section| section.analysis).collect();
    assert_eq!(order, Analysis::ordered().to_vec());

    let failed: Vec<Analysis> = outcome.failed_sections().map(|section| section.analysis).collect();
    assert_eq!(failed, vec![Analysis::Tourism]);
    assert!(outcome.sections[0]
        .body
        .starts_with("Error running tourism analysis:"));

    let weather = &outcome.sections[1];
    assert!(weather.body.contains("Weather Data Analysis (2014-2015):"));
    let social = &outcome.sections[2];
    assert!(social.body.contains("Total posts analyzed: 3"));
    let financial = &outcome.sections[3];
    assert!(financial.body.contains("Net Present Value (NPV): -$120,921.32"));
    let decision = &outcome.sections[4];
    assert!(decision.body.contains("Recommended: Yes"));

    assert_eq!(outcome.pdf, dir.path().join(REPORT_PDF));
    let bytes = std::fs::read(&outcome.pdf).expect("pdf readable");
    assert!(bytes.starts_with(b"%PDF"));
    assert!(outcome.pages >= 2);
    assert!(dir.path().join("campervan_decision_tree.dot").exists());
    assert!(dir.path().join("npv_sensitivity.csv").exists());
}

#[test]
fn missing_credentials_become_an_error_section() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = config_in(dir.path());

    let sections = report::collect_sections(&config, &ReportOptions::default());

    let failed: Vec<Analysis> = sections
        .iter()
        .filter(|section| section.failed)
        .map(|section| section.analysis)
        .collect();
    assert_eq!(
        failed,
        vec![Analysis::Tourism, Analysis::Weather, Analysis::SocialMedia]
    );
    assert!(sections[2]
        .body
        .starts_with("Error running social media analysis:"));
    let expected: Vec<PathBuf> = sections[2].images.iter().map(|chart| chart.path.clone()).collect();
    assert_eq!(expected, vec![dir.path().join("sentiment_analysis_plot.png")]);
    assert!(sections[2].images.iter().all(|chart| !chart.rendered()));
}

#[derive(Debug)]
struct QuietSearch;

impl PostSource for QuietSearch {
    fn verify(&self) -> Result<String, SourceError> {
        Ok("fjord_vans".to_string())
    }

    fn search(&self, _query: &str, _count: usize) -> Result<Vec<String>, SourceError> {
        Ok(Vec::new())
    }
}

#[test]
fn charts_left_over_from_an_earlier_run_are_not_embedded() {
    let dir = tempfile::tempdir().expect("temp dir");
    let leftover = dir.path().join("sentiment_analysis_plot.png");
    image::RgbImage::new(4, 4)
        .save(&leftover)
        .expect("leftover chart written");
    let config = config_in(dir.path());
    let source = QuietSearch;
    let options = ReportOptions {
        post_source: Some(&source),
        ..ReportOptions::default()
    };

    let outcome = report::run(&config, &options).expect("report written");

    let social = &outcome.sections[2];
    assert!(social.body.contains("Total posts analyzed: 0"));
    assert!(social.body.contains("No sentiment chart was produced."));
    assert!(!outcome.embedded.contains(&leftover));
    assert!(outcome.placeholders.contains(&leftover));
    // The tourism section failed, so its chart also gets a placeholder page.
    assert!(outcome
        .placeholders
        .contains(&dir.path().join("total_tourists_by_region.png")));
}
