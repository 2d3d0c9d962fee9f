use super::parser::WeatherRecord;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MonthExtreme {
    pub date: NaiveDate,
    pub value: f64,
}

impl MonthExtreme {
    /// `January 2014` style label.
    pub fn month_label(&self) -> String {
        self.date.format("%B %Y").to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherSummary {
    pub first_year: i32,
    pub last_year: i32,
    pub months: usize,
    /// Mean of the months that report an average temperature.
    pub avg_temperature: Option<f64>,
    pub avg_max_temperature: f64,
    pub avg_min_temperature: f64,
    pub total_precipitation: f64,
    pub avg_precipitation: f64,
    pub hottest: MonthExtreme,
    pub coldest: MonthExtreme,
    pub rainiest: MonthExtreme,
}

impl WeatherSummary {
    pub fn build(records: &[WeatherRecord]) -> Option<Self> {
        let first = records.first()?;
        let count = records.len() as f64;

        let tavgs: Vec<f64> = records.iter().filter_map(|record| record.tavg).collect();
        let avg_temperature =
            (!tavgs.is_empty()).then(|| tavgs.iter().sum::<f64>() / tavgs.len() as f64);
        let total_precipitation: f64 = records.iter().map(|record| record.prcp).sum();

        Some(Self {
            first_year: first.date.year(),
            last_year: records.iter().map(|r| r.date.year()).max().unwrap_or(first.date.year()),
            months: records.len(),
            avg_temperature,
            avg_max_temperature: records.iter().map(|r| r.tmax).sum::<f64>() / count,
            avg_min_temperature: records.iter().map(|r| r.tmin).sum::<f64>() / count,
            total_precipitation,
            avg_precipitation: total_precipitation / count,
            hottest: extreme(records, |r| r.tmax, Extreme::Max)?,
            coldest: extreme(records, |r| r.tmin, Extreme::Min)?,
            rainiest: extreme(records, |r| r.prcp, Extreme::Max)?,
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum Extreme {
    Max,
    Min,
}

/// Arg-max / arg-min over `field`; the earliest month wins a tie.
fn extreme<F>(records: &[WeatherRecord], field: F, kind: Extreme) -> Option<MonthExtreme>
where
    F: Fn(&WeatherRecord) -> f64,
{
    let mut best: Option<MonthExtreme> = None;
    for record in records {
        let value = field(record);
        let better = match (best, kind) {
            (None, _) => true,
            (Some(current), Extreme::Max) => value > current.value,
            (Some(current), Extreme::Min) => value < current.value,
        };
        if better {
            best = Some(MonthExtreme {
                date: record.date,
                value,
            });
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(year: i32, month: u32, tmin: f64, tmax: f64, prcp: f64) -> WeatherRecord {
        WeatherRecord {
            date: NaiveDate::from_ymd_opt(year, month, 1).expect("date"),
            tavg: Some((tmin + tmax) / 2.0),
            tmin,
            tmax,
            prcp,
        }
    }

    #[test]
    fn extremes_match_true_max_and_min() {
        let records = vec![
            record(2014, 1, -6.0, 2.0, 140.0),
            record(2014, 7, 12.0, 24.5, 60.0),
            record(2015, 2, -8.5, 1.0, 90.0),
            record(2015, 8, 11.0, 22.0, 180.0),
        ];
        let summary = WeatherSummary::build(&records).expect("summary");

        assert_eq!(summary.hottest.value, 24.5);
        assert_eq!(summary.hottest.month_label(), "July 2014");
        assert_eq!(summary.coldest.value, -8.5);
        assert_eq!(summary.coldest.month_label(), "February 2015");
        assert_eq!(summary.rainiest.value, 180.0);
        assert_eq!(summary.total_precipitation, 470.0);
        assert_eq!(summary.avg_precipitation, 117.5);
        assert_eq!((summary.first_year, summary.last_year), (2014, 2015));
    }

    #[test]
    fn ties_keep_the_earliest_month() {
        let records = vec![record(2014, 1, 0.0, 10.0, 5.0), record(2014, 2, 0.0, 10.0, 5.0)];
        let summary = WeatherSummary::build(&records).expect("summary");
        assert_eq!(summary.hottest.date.month(), 1);
    }

    #[test]
    fn missing_average_temperature_is_skipped_not_zeroed() {
        let mut records = vec![record(2014, 1, 0.0, 10.0, 5.0), record(2014, 2, 2.0, 12.0, 5.0)];
        records[1].tavg = None;
        let summary = WeatherSummary::build(&records).expect("summary");
        assert_eq!(summary.avg_temperature, Some(5.0));
    }

    #[test]
    fn empty_input_has_no_summary() {
        assert!(WeatherSummary::build(&[]).is_none());
    }
}
