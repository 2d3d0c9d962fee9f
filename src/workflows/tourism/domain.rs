use chrono::{Datelike, NaiveDate};
use serde::{Serialize, Serializer};
use std::fmt;

/// A calendar month as used by statistics-office period codes (`2023M07`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth(NaiveDate);

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(Self)
    }

    /// Parses `YYYYMmm`, e.g. `2023M07`.
    pub fn parse_period(raw: &str) -> Option<Self> {
        let (year, month) = raw.trim().split_once(['M', 'm'])?;
        if year.len() != 4 || month.is_empty() || month.len() > 2 {
            return None;
        }
        Self::new(year.parse().ok()?, month.parse().ok()?)
    }

    pub fn year(self) -> i32 {
        self.0.year()
    }

    pub fn month(self) -> u32 {
        self.0.month()
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m"))
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One cell of the export: overnight stays for a region, accommodation type,
/// month and guest nationality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TourismRecord {
    pub region: String,
    pub accommodation: String,
    pub period: YearMonth,
    pub nationality: String,
    pub visits: u64,
}

/// Which dimension ids of the export carry which role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TourismSchema {
    pub region: String,
    pub accommodation: String,
    pub period: String,
    pub nationality: String,
}

impl Default for TourismSchema {
    fn default() -> Self {
        Self {
            region: "Region".to_string(),
            accommodation: "InnKvartering1".to_string(),
            period: "Tid".to_string(),
            nationality: "Landkoder2".to_string(),
        }
    }
}

/// File-name-safe version of a region name: keeps alphanumerics, spaces and
/// underscores, trims trailing whitespace and turns spaces into underscores.
pub fn region_slug(region: &str) -> String {
    region
        .chars()
        .filter(|ch| ch.is_alphanumeric() || *ch == ' ' || *ch == '_')
        .collect::<String>()
        .trim_end()
        .replace(' ', "_")
}
