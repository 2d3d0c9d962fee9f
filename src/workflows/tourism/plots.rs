use super::domain::{region_slug, TourismRecord, YearMonth};
use super::summary::{monthly_by, monthly_totals, seasonality, Facet};
use crate::charts::{render_line_chart, CategoryAxis, LineChart, Series};
use crate::config::PathConfig;
use crate::workflows::{render_chart, ChartOutput};
use std::collections::{BTreeMap, BTreeSet};

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

pub const TOTAL_CHART: &str = "total_tourists_by_region.png";

/// File names of the per-region charts.
pub fn region_chart_names(region: &str) -> [String; 3] {
    let slug = region_slug(region);
    [
        format!("accommodation_comparison_{slug}.png"),
        format!("nationality_comparison_{slug}.png"),
        format!("seasonality_{slug}.png"),
    ]
}

/// Shared month axis so series from different regions line up.
struct MonthAxis {
    months: Vec<YearMonth>,
}

impl MonthAxis {
    fn from_records<'a>(records: impl Iterator<Item = &'a TourismRecord>) -> Self {
        let months: BTreeSet<YearMonth> = records.map(|record| record.period).collect();
        Self {
            months: months.into_iter().collect(),
        }
    }

    fn points(&self, values: &BTreeMap<YearMonth, u64>) -> Vec<(usize, f64)> {
        self.months
            .iter()
            .enumerate()
            .filter_map(|(idx, month)| values.get(month).map(|v| (idx, *v as f64)))
            .collect()
    }

    fn categories(&self) -> CategoryAxis {
        CategoryAxis::new(self.months.iter().map(YearMonth::to_string).collect())
    }
}

pub fn plot_all(records: &[TourismRecord], regions: &[String], paths: &PathConfig) -> Vec<ChartOutput> {
    let mut charts = vec![plot_total_tourists(records, regions, paths)];
    for region in regions {
        let [accommodation, nationality, season] = region_chart_names(region);
        charts.push(plot_facet_comparison(
            records,
            region,
            Facet::Accommodation,
            paths.output(&accommodation),
        ));
        charts.push(plot_facet_comparison(
            records,
            region,
            Facet::Nationality,
            paths.output(&nationality),
        ));
        charts.push(plot_seasonality(records, region, paths.output(&season)));
    }
    charts
}

fn plot_total_tourists(records: &[TourismRecord], regions: &[String], paths: &PathConfig) -> ChartOutput {
    let axis = MonthAxis::from_records(records.iter());
    let series = regions
        .iter()
        .map(|region| Series::new(region.clone(), axis.points(&monthly_totals(records, region))))
        .collect();

    render_chart(paths.output(TOTAL_CHART), |path| {
        render_line_chart(
            &LineChart {
                title: "Total Tourists by Region",
                x_desc: "Year",
                y_desc: "Number of Overnight Stays",
                series,
                categories: axis.categories(),
                zero_line: false,
            },
            path,
        )
    })
}

fn plot_facet_comparison(
    records: &[TourismRecord],
    region: &str,
    facet: Facet,
    path: std::path::PathBuf,
) -> ChartOutput {
    let axis = MonthAxis::from_records(records.iter().filter(|record| record.region == region));
    let series = monthly_by(records, region, facet)
        .into_iter()
        .map(|(label, values)| Series::new(label, axis.points(&values)))
        .collect();
    let title = match facet {
        Facet::Accommodation => format!("Accommodation Comparison - {region}"),
        Facet::Nationality => format!("Nationality Comparison - {region}"),
    };

    render_chart(path, |path| {
        render_line_chart(
            &LineChart {
                title: &title,
                x_desc: "Year",
                y_desc: "Number of Overnight Stays",
                series,
                categories: axis.categories(),
                zero_line: false,
            },
            path,
        )
    })
}

fn plot_seasonality(records: &[TourismRecord], region: &str, path: std::path::PathBuf) -> ChartOutput {
    let series = seasonality(records, region)
        .into_iter()
        .map(|(nationality, means)| {
            let points = means
                .iter()
                .enumerate()
                .filter_map(|(idx, mean)| mean.map(|value| (idx, value)))
                .collect();
            Series::new(nationality, points)
        })
        .collect();
    let title = format!("Average Monthly Tourists by Nationality - {region}");
    let months = CategoryAxis::new(MONTH_ABBREVIATIONS.iter().map(|m| m.to_string()).collect());

    render_chart(path, |path| {
        render_line_chart(
            &LineChart {
                title: &title,
                x_desc: "Month",
                y_desc: "Average Number of Overnight Stays",
                series,
                categories: months,
                zero_line: false,
            },
            path,
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_charts_use_sanitized_names() {
        let names = region_chart_names("Haugesund / Karmøy");
        assert_eq!(names[0], "accommodation_comparison_Haugesund__Karmøy.png");
        assert_eq!(names[2], "seasonality_Haugesund__Karmøy.png");
    }

    #[test]
    fn month_axis_aligns_sparse_series() {
        let records = vec![
            TourismRecord {
                region: "A".into(),
                accommodation: "Hotels".into(),
                period: YearMonth::new(2024, 1).expect("month"),
                nationality: "Norway".into(),
                visits: 5,
            },
            TourismRecord {
                region: "B".into(),
                accommodation: "Hotels".into(),
                period: YearMonth::new(2024, 3).expect("month"),
                nationality: "Norway".into(),
                visits: 7,
            },
        ];
        let axis = MonthAxis::from_records(records.iter());
        assert_eq!(axis.points(&monthly_totals(&records, "B")), vec![(1, 7.0)]);
        assert_eq!(axis.categories().len(), 2);
    }
}
