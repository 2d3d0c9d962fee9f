use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_SOCIAL_QUERY: &str = "campervan rental OR RV rental OR motorhome rental";
pub const DEFAULT_SOCIAL_MAX_POSTS: usize = 100;
pub const DEFAULT_TOURISM_FILES: [&str; 3] = [
    "tourism_stavanger.json",
    "tourism_haugesund.json",
    "tourism_ryfylket.json",
];
pub const DEFAULT_WEATHER_FILE: &str = "weather.json";

/// Distinguishes runtime behavior for different stages of the tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration, loaded once at process start.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub paths: PathConfig,
    pub telemetry: TelemetryConfig,
    pub inputs: InputConfig,
    pub social: SocialConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let data_dir = env::var("APP_DATA_DIR").unwrap_or_else(|_| ".".to_string());
        let output_dir = env::var("APP_OUTPUT_DIR").unwrap_or_else(|_| ".".to_string());

        let tourism_files = match env::var("TOURISM_FILES") {
            Ok(raw) => parse_file_list(&raw)?,
            Err(_) => DEFAULT_TOURISM_FILES.iter().map(PathBuf::from).collect(),
        };
        let weather_file = env::var("WEATHER_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_WEATHER_FILE));

        let query = env::var("SOCIAL_QUERY").unwrap_or_else(|_| DEFAULT_SOCIAL_QUERY.to_string());
        let max_posts = match env::var("SOCIAL_MAX_POSTS") {
            Ok(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|count| *count > 0)
                .ok_or(ConfigError::InvalidMaxPosts)?,
            Err(_) => DEFAULT_SOCIAL_MAX_POSTS,
        };
        let http_timeout_secs = env::var("HTTP_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidTimeout)?;

        Ok(Self {
            environment,
            paths: PathConfig {
                data_dir: PathBuf::from(data_dir),
                output_dir: PathBuf::from(output_dir),
            },
            telemetry: TelemetryConfig { log_level },
            inputs: InputConfig {
                tourism_files,
                weather_file,
            },
            social: SocialConfig {
                query,
                max_posts,
                http_timeout: Duration::from_secs(http_timeout_secs),
                credentials: TwitterConfig {
                    consumer_key: non_empty_var("TWITTER_CONSUMER_KEY"),
                    consumer_secret: non_empty_var("TWITTER_CONSUMER_SECRET"),
                    access_token: non_empty_var("TWITTER_ACCESS_TOKEN"),
                    access_token_secret: non_empty_var("TWITTER_ACCESS_TOKEN_SECRET"),
                },
            },
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_file_list(raw: &str) -> Result<Vec<PathBuf>, ConfigError> {
    let files: Vec<PathBuf> = raw
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(PathBuf::from)
        .collect();

    if files.is_empty() {
        return Err(ConfigError::EmptyTourismFiles);
    }
    Ok(files)
}

/// Where inputs are read from and where charts, tables and the report land.
#[derive(Debug, Clone)]
pub struct PathConfig {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl PathConfig {
    pub fn input(&self, file: &Path) -> PathBuf {
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.data_dir.join(file)
        }
    }

    pub fn output(&self, file: &str) -> PathBuf {
        self.output_dir.join(file)
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug, Clone)]
pub struct InputConfig {
    pub tourism_files: Vec<PathBuf>,
    pub weather_file: PathBuf,
}

#[derive(Debug, Clone)]
pub struct SocialConfig {
    pub query: String,
    pub max_posts: usize,
    pub http_timeout: Duration,
    pub credentials: TwitterConfig,
}

/// Raw credential slots as found in the environment. Use [`TwitterConfig::credentials`]
/// to obtain a validated set before touching the network.
#[derive(Clone, Default)]
pub struct TwitterConfig {
    pub consumer_key: Option<String>,
    pub consumer_secret: Option<String>,
    pub access_token: Option<String>,
    pub access_token_secret: Option<String>,
}

impl TwitterConfig {
    pub fn credentials(&self) -> Result<TwitterCredentials, ConfigError> {
        match (
            &self.consumer_key,
            &self.consumer_secret,
            &self.access_token,
            &self.access_token_secret,
        ) {
            (Some(consumer_key), Some(consumer_secret), Some(access_token), Some(token_secret)) => {
                Ok(TwitterCredentials {
                    consumer_key: consumer_key.clone(),
                    consumer_secret: consumer_secret.clone(),
                    access_token: access_token.clone(),
                    access_token_secret: token_secret.clone(),
                })
            }
            _ => Err(ConfigError::MissingCredentials {
                missing: self.missing_keys(),
            }),
        }
    }

    fn missing_keys(&self) -> Vec<&'static str> {
        [
            ("TWITTER_CONSUMER_KEY", &self.consumer_key),
            ("TWITTER_CONSUMER_SECRET", &self.consumer_secret),
            ("TWITTER_ACCESS_TOKEN", &self.access_token),
            ("TWITTER_ACCESS_TOKEN_SECRET", &self.access_token_secret),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_none())
        .map(|(key, _)| key)
        .collect()
    }
}

impl fmt::Debug for TwitterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwitterConfig")
            .field("missing", &self.missing_keys())
            .finish_non_exhaustive()
    }
}

/// A complete set of OAuth 1.0a user-context credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct TwitterCredentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
}

impl fmt::Debug for TwitterCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwitterCredentials")
            .field("consumer_key", &self.consumer_key)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidMaxPosts,
    InvalidTimeout,
    EmptyTourismFiles,
    MissingCredentials { missing: Vec<&'static str> },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidMaxPosts => {
                write!(f, "SOCIAL_MAX_POSTS must be a positive integer")
            }
            ConfigError::InvalidTimeout => {
                write!(f, "HTTP_TIMEOUT_SECS must be a whole number of seconds")
            }
            ConfigError::EmptyTourismFiles => {
                write!(f, "TOURISM_FILES must list at least one file")
            }
            ConfigError::MissingCredentials { missing } => write!(
                f,
                "Twitter API credentials are not set ({}). Please check your .env file.",
                missing.join(", ")
            ),
        }
    }
}

impl std::error::Error for ConfigError {}
