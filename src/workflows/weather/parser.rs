use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::io::Read;
use tracing::{debug, warn};

/// A monthly observation with every field the analysis needs.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherRecord {
    pub date: NaiveDate,
    pub tavg: Option<f64>,
    pub tmin: f64,
    pub tmax: f64,
    pub prcp: f64,
}

#[derive(Debug, Deserialize)]
struct WeatherFile {
    data: Vec<WeatherRow>,
}

#[derive(Debug, Deserialize)]
struct WeatherRow {
    date: String,
    #[serde(default)]
    tavg: Option<f64>,
    #[serde(default)]
    tmin: Option<f64>,
    #[serde(default)]
    tmax: Option<f64>,
    #[serde(default)]
    prcp: Option<f64>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ParseStats {
    pub rows: usize,
    pub dropped_incomplete: usize,
    pub dropped_inverted: usize,
    pub dropped_undated: usize,
}

pub(crate) fn parse_records<R: Read>(
    reader: R,
) -> Result<(Vec<WeatherRecord>, ParseStats), serde_json::Error> {
    let file: WeatherFile = serde_json::from_reader(reader)?;
    let mut stats = ParseStats {
        rows: file.data.len(),
        ..ParseStats::default()
    };

    let mut records = Vec::with_capacity(file.data.len());
    for row in file.data {
        let Some(date) = parse_date(&row.date) else {
            warn!(date = %row.date, "weather row has an unreadable date");
            stats.dropped_undated += 1;
            continue;
        };
        let (Some(tmin), Some(tmax), Some(prcp)) = (row.tmin, row.tmax, row.prcp) else {
            debug!(%date, "dropping weather row with missing fields");
            stats.dropped_incomplete += 1;
            continue;
        };
        if tmax < tmin {
            warn!(%date, tmax, tmin, "dropping weather row with max below min");
            stats.dropped_inverted += 1;
            continue;
        }

        records.push(WeatherRecord {
            date,
            tavg: row.tavg,
            tmin,
            tmax,
            prcp,
        });
    }

    records.sort_by_key(|record| record.date);
    Ok((records, stats))
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.date());
    }
    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|dt| dt.date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn drops_incomplete_and_inverted_rows() {
        let raw = r#"{"data": [
            {"date": "2014-02-01", "tavg": 2.0, "tmin": -1.0, "tmax": 5.0, "prcp": 80.0},
            {"date": "2014-01-01 00:00:00", "tavg": null, "tmin": -3.0, "tmax": 3.0, "prcp": 120.5},
            {"date": "2014-03-01", "tavg": 4.0, "tmin": 1.0, "tmax": null, "prcp": 60.0},
            {"date": "2014-04-01", "tavg": 6.0, "tmin": 9.0, "tmax": 8.0, "prcp": 30.0},
            {"date": "April", "tmin": 1.0, "tmax": 2.0, "prcp": 3.0}
        ]}"#;
        let (records, stats) = parse_records(Cursor::new(raw)).expect("weather parses");

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].date, NaiveDate::from_ymd_opt(2014, 1, 1).expect("date"));
        assert_eq!(records[0].tavg, None);
        assert_eq!(
            stats,
            ParseStats {
                rows: 5,
                dropped_incomplete: 1,
                dropped_inverted: 1,
                dropped_undated: 1,
            }
        );
    }

    #[test]
    fn accepts_rfc3339_dates() {
        assert_eq!(
            parse_date("2020-06-01T00:00:00Z"),
            NaiveDate::from_ymd_opt(2020, 6, 1)
        );
        assert_eq!(parse_date(""), None);
    }
}
