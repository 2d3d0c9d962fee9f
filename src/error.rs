use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::decision::DecisionError;
use crate::workflows::financial::FinancialError;
use crate::workflows::report::ReportError;
use crate::workflows::social::SocialError;
use crate::workflows::tourism::TourismError;
use crate::workflows::weather::WeatherError;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Tourism(TourismError),
    Weather(WeatherError),
    Social(SocialError),
    Financial(FinancialError),
    Decision(DecisionError),
    Report(ReportError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Tourism(err) => write!(f, "tourism analysis error: {}", err),
            AppError::Weather(err) => write!(f, "weather analysis error: {}", err),
            AppError::Social(err) => write!(f, "social media analysis error: {}", err),
            AppError::Financial(err) => write!(f, "financial analysis error: {}", err),
            AppError::Decision(err) => write!(f, "decision analysis error: {}", err),
            AppError::Report(err) => write!(f, "report error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Tourism(err) => Some(err),
            AppError::Weather(err) => Some(err),
            AppError::Social(err) => Some(err),
            AppError::Financial(err) => Some(err),
            AppError::Decision(err) => Some(err),
            AppError::Report(err) => Some(err),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<TourismError> for AppError {
    fn from(value: TourismError) -> Self {
        Self::Tourism(value)
    }
}

impl From<WeatherError> for AppError {
    fn from(value: WeatherError) -> Self {
        Self::Weather(value)
    }
}

impl From<SocialError> for AppError {
    fn from(value: SocialError) -> Self {
        Self::Social(value)
    }
}

impl From<FinancialError> for AppError {
    fn from(value: FinancialError) -> Self {
        Self::Financial(value)
    }
}

impl From<DecisionError> for AppError {
    fn from(value: DecisionError) -> Self {
        Self::Decision(value)
    }
}

impl From<ReportError> for AppError {
    fn from(value: ReportError) -> Self {
        Self::Report(value)
    }
}
