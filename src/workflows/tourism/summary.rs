use super::domain::{TourismRecord, YearMonth};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Which label a monthly breakdown is split by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facet {
    Accommodation,
    Nationality,
}

impl Facet {
    fn key(self, record: &TourismRecord) -> &str {
        match self {
            Facet::Accommodation => &record.accommodation,
            Facet::Nationality => &record.nationality,
        }
    }
}

/// Regions in the order they first appear.
pub fn regions(records: &[TourismRecord]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    records
        .iter()
        .filter(|record| seen.insert(record.region.as_str()))
        .map(|record| record.region.clone())
        .collect()
}

pub fn monthly_totals(records: &[TourismRecord], region: &str) -> BTreeMap<YearMonth, u64> {
    let mut totals = BTreeMap::new();
    for record in records.iter().filter(|record| record.region == region) {
        *totals.entry(record.period).or_insert(0) += record.visits;
    }
    totals
}

pub fn monthly_by(
    records: &[TourismRecord],
    region: &str,
    facet: Facet,
) -> BTreeMap<String, BTreeMap<YearMonth, u64>> {
    let mut pivot: BTreeMap<String, BTreeMap<YearMonth, u64>> = BTreeMap::new();
    for record in records.iter().filter(|record| record.region == region) {
        *pivot
            .entry(facet.key(record).to_string())
            .or_default()
            .entry(record.period)
            .or_insert(0) += record.visits;
    }
    pivot
}

/// Mean stays per calendar month (index 0 = January) for each nationality,
/// averaged over every matching record in the region.
pub fn seasonality(records: &[TourismRecord], region: &str) -> BTreeMap<String, [Option<f64>; 12]> {
    let mut sums: BTreeMap<String, [(u64, u32); 12]> = BTreeMap::new();
    for record in records.iter().filter(|record| record.region == region) {
        let slot = &mut sums
            .entry(record.nationality.clone())
            .or_insert([(0, 0); 12])[record.period.month() as usize - 1];
        slot.0 += record.visits;
        slot.1 += 1;
    }

    sums.into_iter()
        .map(|(nationality, months)| {
            let means = months.map(|(total, count)| {
                (count > 0).then(|| total as f64 / f64::from(count))
            });
            (nationality, means)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionSummary {
    pub region: String,
    pub latest_year_total: u64,
    /// `None` when the earlier year has no stays to compare against.
    pub yoy_growth: Option<f64>,
    pub top_accommodation: Option<AccommodationShare>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccommodationShare {
    pub accommodation: String,
    pub visits: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TourismSummary {
    pub latest_year: i32,
    /// The year growth is measured against, if the data covers one.
    pub previous_year: Option<i32>,
    pub regions: Vec<RegionSummary>,
}

impl TourismSummary {
    /// Cross-region figures for the two most recent years in the data.
    pub fn build(records: &[TourismRecord]) -> Option<Self> {
        let years: BTreeSet<i32> = records.iter().map(|record| record.period.year()).collect();
        let mut recent = years.iter().rev();
        let latest_year = *recent.next()?;
        let previous_year = recent.next().copied();

        let regions = regions(records)
            .into_iter()
            .map(|region| {
                let mut by_year: BTreeMap<i32, u64> = BTreeMap::new();
                let mut by_accommodation: BTreeMap<&str, u64> = BTreeMap::new();
                for record in records.iter().filter(|record| record.region == region) {
                    *by_year.entry(record.period.year()).or_insert(0) += record.visits;
                    *by_accommodation
                        .entry(record.accommodation.as_str())
                        .or_insert(0) += record.visits;
                }

                let latest_year_total = by_year.get(&latest_year).copied().unwrap_or(0);
                let yoy_growth = previous_year
                    .and_then(|year| by_year.get(&year).copied())
                    .filter(|previous| *previous > 0)
                    .map(|previous| latest_year_total as f64 / previous as f64 - 1.0);

                // Ties go to the alphabetically first type so the result is stable.
                let top_accommodation = by_accommodation
                    .into_iter()
                    .rev()
                    .max_by_key(|(_, visits)| *visits)
                    .map(|(accommodation, visits)| AccommodationShare {
                        accommodation: accommodation.to_string(),
                        visits,
                    });

                RegionSummary {
                    region,
                    latest_year_total,
                    yoy_growth,
                    top_accommodation,
                }
            })
            .collect();

        Some(Self {
            latest_year,
            previous_year,
            regions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(region: &str, accommodation: &str, period: &str, nationality: &str, visits: u64) -> TourismRecord {
        TourismRecord {
            region: region.to_string(),
            accommodation: accommodation.to_string(),
            period: YearMonth::parse_period(period).expect("valid period"),
            nationality: nationality.to_string(),
            visits,
        }
    }

    fn sample() -> Vec<TourismRecord> {
        vec![
            record("Stavanger", "Hotels", "2023M07", "Norway", 100),
            record("Stavanger", "Camping", "2023M07", "Norway", 50),
            record("Stavanger", "Hotels", "2024M07", "Germany", 150),
            record("Stavanger", "Camping", "2024M07", "Germany", 90),
            record("Stavanger", "Camping", "2024M01", "Norway", 0),
            record("Ryfylke", "Camping", "2024M07", "Norway", 80),
        ]
    }

    #[test]
    fn regions_keep_first_seen_order() {
        assert_eq!(regions(&sample()), vec!["Stavanger", "Ryfylke"]);
    }

    #[test]
    fn monthly_totals_sum_across_labels() {
        let totals = monthly_totals(&sample(), "Stavanger");
        assert_eq!(totals[&YearMonth::new(2023, 7).expect("month")], 150);
        assert_eq!(totals[&YearMonth::new(2024, 7).expect("month")], 240);
        assert_eq!(totals.len(), 3);
    }

    #[test]
    fn monthly_by_facet_splits_series() {
        let pivot = monthly_by(&sample(), "Stavanger", Facet::Accommodation);
        assert_eq!(pivot.len(), 2);
        assert_eq!(pivot["Camping"][&YearMonth::new(2024, 7).expect("month")], 90);

        let by_nationality = monthly_by(&sample(), "Stavanger", Facet::Nationality);
        assert_eq!(by_nationality["Germany"].len(), 1);
    }

    #[test]
    fn seasonality_averages_per_calendar_month() {
        let season = seasonality(&sample(), "Stavanger");
        let norway = season["Norway"];
        assert_eq!(norway[6], Some(75.0));
        assert_eq!(norway[0], Some(0.0));
        assert_eq!(norway[3], None);
    }

    #[test]
    fn summary_compares_two_latest_years() {
        let summary = TourismSummary::build(&sample()).expect("records present");
        assert_eq!(summary.latest_year, 2024);
        assert_eq!(summary.previous_year, Some(2023));

        let stavanger = &summary.regions[0];
        assert_eq!(stavanger.latest_year_total, 240);
        let growth = stavanger.yoy_growth.expect("growth computed");
        assert!((growth - 0.6).abs() < 1e-12);
        let top = stavanger.top_accommodation.as_ref().expect("top accommodation");
        assert_eq!(top.accommodation, "Hotels");
        assert_eq!(top.visits, 250);

        let ryfylke = &summary.regions[1];
        assert_eq!(ryfylke.yoy_growth, None, "no 2023 data for Ryfylke");
    }

    #[test]
    fn empty_input_has_no_summary() {
        assert!(TourismSummary::build(&[]).is_none());
    }
}
