mod client;
mod domain;
mod oauth;
mod polarity;

pub use client::{PostSource, SourceError, TwitterClient, TWITTER_API_BASE};
pub use domain::{Post, SentimentBreakdown, SentimentLabel, SentimentShares};
pub use polarity::polarity;

use super::{render_chart, write_numbered, ChartOutput};
use crate::charts::{render_pie_chart, PieSlice};
use crate::config::{ConfigError, PathConfig, SocialConfig};
use plotters::style::RGBColor;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};

pub const SENTIMENT_CHART: &str = "sentiment_analysis_plot.png";

const POSITIVE_COLOR: RGBColor = RGBColor(154, 205, 50);
const NEGATIVE_COLOR: RGBColor = RGBColor(240, 128, 128);
const NEUTRAL_COLOR: RGBColor = RGBColor(255, 215, 0);

#[derive(Error, Debug)]
pub enum SocialError {
    #[error(transparent)]
    Credentials(#[from] ConfigError),

    #[error("could not set up the Twitter client: {0}")]
    Client(#[from] SourceError),
}

#[derive(Debug, Clone)]
pub struct SocialAnalysis {
    pub account: String,
    pub query: String,
    pub posts: Vec<Post>,
    pub breakdown: SentimentBreakdown,
    pub chart: ChartOutput,
}

#[derive(Debug, Clone)]
pub enum SocialOutcome {
    Analyzed(SocialAnalysis),
    /// The source could not be reached or rejected the request.
    NoData { query: String, reason: String },
}

/// Builds a Twitter client from the configured credentials and analyzes the
/// configured query. Missing credentials fail before any request is made.
pub fn run(paths: &PathConfig, config: &SocialConfig) -> Result<SocialOutcome, SocialError> {
    let credentials = config.credentials.credentials()?;
    info!("Twitter API credentials loaded");
    let client = TwitterClient::new(credentials, config.http_timeout)?;
    Ok(analyze(paths, &client, &config.query, config.max_posts))
}

/// Fetches and scores posts from `source`. Source failures are logged and
/// reported as [`SocialOutcome::NoData`].
pub fn analyze(
    paths: &PathConfig,
    source: &dyn PostSource,
    query: &str,
    max_posts: usize,
) -> SocialOutcome {
    let fetched = source.verify().and_then(|account| {
        info!(account = %account, "connected to post source");
        info!(query, max_posts, "searching posts");
        source.search(query, max_posts).map(|texts| (account, texts))
    });

    let (account, texts) = match fetched {
        Ok(found) => found,
        Err(err) => {
            warn!(error = %err, "post source unavailable, continuing without sentiment data");
            return SocialOutcome::NoData {
                query: query.to_string(),
                reason: err.to_string(),
            };
        }
    };

    let posts: Vec<Post> = texts.into_iter().map(Post::score).collect();
    let breakdown = SentimentBreakdown::from_posts(&posts);
    info!(
        posts = posts.len(),
        positive = breakdown.positive,
        negative = breakdown.negative,
        neutral = breakdown.neutral,
        "posts scored"
    );
    let chart = plot_sentiment(&breakdown, paths.output(SENTIMENT_CHART));

    SocialOutcome::Analyzed(SocialAnalysis {
        account,
        query: query.to_string(),
        posts,
        breakdown,
        chart,
    })
}

pub fn expected_charts(paths: &PathConfig) -> Vec<PathBuf> {
    vec![paths.output(SENTIMENT_CHART)]
}

fn plot_sentiment(breakdown: &SentimentBreakdown, path: PathBuf) -> ChartOutput {
    let slices = [
        PieSlice {
            label: "Positive".to_string(),
            value: breakdown.positive as f64,
            color: POSITIVE_COLOR,
        },
        PieSlice {
            label: "Negative".to_string(),
            value: breakdown.negative as f64,
            color: NEGATIVE_COLOR,
        },
        PieSlice {
            label: "Neutral".to_string(),
            value: breakdown.neutral as f64,
            color: NEUTRAL_COLOR,
        },
    ];
    render_chart(path, |path| {
        render_pie_chart(
            "Sentiment Analysis of Tweets about Campervan Rentals",
            &slices,
            path,
        )
    })
}

impl SocialAnalysis {
    /// Highest and lowest scoring posts, for quoting in the report.
    pub fn extremes(&self) -> (Option<&Post>, Option<&Post>) {
        let most_positive = self
            .posts
            .iter()
            .filter(|post| post.label == SentimentLabel::Positive)
            .max_by(|a, b| a.polarity.total_cmp(&b.polarity));
        let most_negative = self
            .posts
            .iter()
            .filter(|post| post.label == SentimentLabel::Negative)
            .min_by(|a, b| a.polarity.total_cmp(&b.polarity));
        (most_positive, most_negative)
    }
}

impl SocialOutcome {
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        match self {
            SocialOutcome::NoData { query, reason } => {
                out.push_str(&format!("Searching for posts with query: {}\n", query));
                out.push_str(&format!("Failed to fetch posts: {}\n", reason));
                out.push_str("No sentiment data is available for this report.\n");
            }
            SocialOutcome::Analyzed(analysis) => {
                let shares = analysis.breakdown.shares();
                out.push_str(&format!("Authenticated account: @{}\n", analysis.account));
                out.push_str(&format!("Search query: {}\n", analysis.query));
                out.push_str(&format!("Total posts analyzed: {}\n", analysis.posts.len()));
                out.push_str(&format!(
                    "Positive posts percentage: {:.2}%\n",
                    shares.positive
                ));
                out.push_str(&format!(
                    "Negative posts percentage: {:.2}%\n",
                    shares.negative
                ));
                out.push_str(&format!(
                    "Neutral posts percentage: {:.2}%\n",
                    shares.neutral
                ));

                let (most_positive, most_negative) = analysis.extremes();
                if let Some(post) = most_positive {
                    out.push_str(&format!("\nMost positive post: \"{}\"\n", quote(&post.text)));
                }
                if let Some(post) = most_negative {
                    out.push_str(&format!("Most negative post: \"{}\"\n", quote(&post.text)));
                }

                if analysis.chart.rendered() {
                    out.push_str(&format!(
                        "\nData visualization saved as '{}'\n",
                        analysis.chart.file_name()
                    ));
                } else {
                    out.push_str("\nNo sentiment chart was produced.\n");
                }

                out.push('\n');
                write_numbered(
                    &mut out,
                    "How to use this data:",
                    &[
                        "Gauge public sentiment towards campervan rentals",
                        "Identify potential customer pain points or positive aspects to inform the Business Launch Decision",
                        "Use sentiment trends to guide the Marketing Focus decision",
                        "Analyze specific comments to inform Additional Services offerings",
                    ],
                );
            }
        }
        out
    }

    pub fn images(&self) -> Vec<ChartOutput> {
        match self {
            SocialOutcome::Analyzed(analysis) => vec![analysis.chart.clone()],
            SocialOutcome::NoData { .. } => Vec::new(),
        }
    }
}

/// Single-line excerpt of at most 140 characters.
fn quote(text: &str) -> String {
    const LIMIT: usize = 140;
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= LIMIT {
        flat
    } else {
        let cut: String = flat.chars().take(LIMIT - 3).collect();
        format!("{cut}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TwitterConfig;
    use std::cell::RefCell;
    use std::time::Duration;

    #[derive(Debug, Default)]
    struct FakeSource {
        posts: Vec<&'static str>,
        fail_verify: bool,
        searches: RefCell<Vec<(String, usize)>>,
    }

    impl PostSource for FakeSource {
        fn verify(&self) -> Result<String, SourceError> {
            if self.fail_verify {
                Err(SourceError::Status {
                    status: 401,
                    body: "Could not authenticate you".into(),
                })
            } else {
                Ok("vanlife_bot".into())
            }
        }

        fn search(&self, query: &str, count: usize) -> Result<Vec<String>, SourceError> {
            self.searches.borrow_mut().push((query.to_string(), count));
            Ok(self.posts.iter().take(count).map(|p| p.to_string()).collect())
        }
    }

    fn temp_paths() -> (tempfile::TempDir, PathConfig) {
        let dir = tempfile::tempdir().expect("temp dir");
        let paths = PathConfig {
            data_dir: dir.path().to_path_buf(),
            output_dir: dir.path().to_path_buf(),
        };
        (dir, paths)
    }

    #[test]
    fn analyze_scores_and_summarizes_posts() {
        let (_dir, paths) = temp_paths();
        let source = FakeSource {
            posts: vec![
                "Great campervan trip along the fjords",
                "Terrible service at the rental desk",
                "Picking up our RV tomorrow",
                "Really lovely motorhome, would recommend",
            ],
            ..FakeSource::default()
        };

        let outcome = analyze(&paths, &source, "campervan rental", 3);
        let SocialOutcome::Analyzed(analysis) = &outcome else {
            panic!("expected analyzed outcome, got {outcome:?}");
        };
        assert_eq!(source.searches.borrow().as_slice(), &[("campervan rental".to_string(), 3)]);
        assert_eq!(analysis.posts.len(), 3);
        assert_eq!(analysis.breakdown.positive, 1);
        assert_eq!(analysis.breakdown.negative, 1);
        assert_eq!(analysis.breakdown.neutral, 1);
        let images: Vec<PathBuf> = outcome.images().into_iter().map(|chart| chart.path).collect();
        assert_eq!(images, vec![paths.output(SENTIMENT_CHART)]);

        let text = outcome.render_text();
        assert!(text.contains("Authenticated account: @vanlife_bot"));
        assert!(text.contains("Positive posts percentage: 33.33%"));
        assert!(text.contains("Most negative post: \"Terrible service at the rental desk\""));
        assert!(text.contains("How to use this data:"));
    }

    #[test]
    fn source_failure_becomes_no_data() {
        let (_dir, paths) = temp_paths();
        let source = FakeSource {
            fail_verify: true,
            ..FakeSource::default()
        };
        let outcome = analyze(&paths, &source, "rv rental", 10);
        assert!(matches!(outcome, SocialOutcome::NoData { .. }));
        assert!(source.searches.borrow().is_empty(), "search skipped after failed verify");
        assert!(outcome.images().is_empty());
        assert!(outcome.render_text().contains("401"));
    }

    #[test]
    fn empty_search_reports_zero_percentages() {
        let (_dir, paths) = temp_paths();
        let source = FakeSource::default();
        let outcome = analyze(&paths, &source, "motorhome", 100);
        let SocialOutcome::Analyzed(analysis) = &outcome else {
            panic!("expected analyzed outcome");
        };
        assert!(!analysis.chart.rendered(), "empty pie is not drawn");
        assert!(outcome.render_text().contains("Positive posts percentage: 0.00%"));
    }

    #[test]
    fn missing_credentials_fail_before_any_request() {
        let (_dir, paths) = temp_paths();
        let config = SocialConfig {
            query: "campervan".into(),
            max_posts: 10,
            http_timeout: Duration::from_secs(1),
            credentials: TwitterConfig {
                consumer_key: Some("key".into()),
                ..TwitterConfig::default()
            },
        };
        let err = run(&paths, &config).expect_err("credentials incomplete");
        match err {
            SocialError::Credentials(ConfigError::MissingCredentials { missing }) => {
                assert_eq!(missing.len(), 3);
                assert!(!missing.contains(&"TWITTER_CONSUMER_KEY"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn long_posts_are_shortened_for_quoting() {
        let long = "word ".repeat(60);
        let quoted = quote(&long);
        assert_eq!(quoted.chars().count(), 140);
        assert!(quoted.ends_with("..."));
        assert_eq!(quote("short\nline"), "short line");
    }
}
