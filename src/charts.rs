//! PNG chart rendering shared by every analysis.
//!
//! Everything goes through the plotters bitmap backend so charts render in
//! headless environments. Every x-axis is categorical (months, periods,
//! years): callers hand over `(category index, value)` points plus a label
//! table, and the axis is segmented so each tick sits on a category.

use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::f64::consts::PI;
use std::ops::Range;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlotError {
    #[error("failed to create drawing area: {0}")]
    DrawingArea(String),

    #[error("failed to configure chart: {0}")]
    ChartConfig(String),

    #[error("failed to draw chart elements: {0}")]
    Drawing(String),

    #[error("invalid chart data: {0}")]
    InvalidData(String),
}

type Result<T> = core::result::Result<T, PlotError>;

const LINE_CHART_SIZE: (u32, u32) = (1200, 600);
const DUAL_AXIS_CHART_SIZE: (u32, u32) = (1500, 800);
const PIE_CHART_SIZE: (u32, u32) = (900, 900);

/// One named line on a chart; x is an index into the chart's categories.
#[derive(Debug, Clone)]
pub struct Series {
    pub name: String,
    pub points: Vec<(usize, f64)>,
}

impl Series {
    pub fn new(name: impl Into<String>, points: Vec<(usize, f64)>) -> Self {
        Self {
            name: name.into(),
            points,
        }
    }
}

/// Labels for the categories 0, 1, 2, ...
#[derive(Debug, Clone, Default)]
pub struct CategoryAxis {
    labels: Vec<String>,
}

impl CategoryAxis {
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    fn label_for(&self, value: &SegmentValue<usize>) -> String {
        match value {
            SegmentValue::CenterOf(idx) | SegmentValue::Exact(idx) => {
                self.labels.get(*idx).cloned().unwrap_or_default()
            }
            SegmentValue::Last => String::new(),
        }
    }

    /// Right edge of category `idx`.
    fn segment_end(&self, idx: usize) -> SegmentValue<usize> {
        if idx + 1 < self.labels.len() {
            SegmentValue::Exact(idx + 1)
        } else {
            SegmentValue::Last
        }
    }

    fn tick_count(&self) -> usize {
        self.labels.len().clamp(1, 24)
    }
}

fn centered(points: &[(usize, f64)]) -> impl Iterator<Item = (SegmentValue<usize>, f64)> + '_ {
    points.iter().map(|&(x, y)| (SegmentValue::CenterOf(x), y))
}

#[derive(Debug, Clone)]
pub struct LineChart<'a> {
    pub title: &'a str,
    pub x_desc: &'a str,
    pub y_desc: &'a str,
    pub series: Vec<Series>,
    pub categories: CategoryAxis,
    /// Draws a dashed red reference line at y = 0.
    pub zero_line: bool,
}

/// Renders a multi-series line chart with point markers and a legend.
pub fn render_line_chart(chart: &LineChart<'_>, output_path: &Path) -> Result<()> {
    let axis = &chart.categories;
    let points: Vec<(usize, f64)> = chart
        .series
        .iter()
        .flat_map(|series| series.points.iter().copied())
        .collect();
    if points.is_empty() || axis.is_empty() {
        return Err(PlotError::InvalidData(format!(
            "'{}' has no points to draw",
            chart.title
        )));
    }
    if let Some((x, _)) = points.iter().find(|(x, _)| *x >= axis.len()) {
        return Err(PlotError::InvalidData(format!(
            "'{}' has a point at category {} of {}",
            chart.title,
            x,
            axis.len()
        )));
    }

    let mut y_values: Vec<f64> = points.iter().map(|(_, y)| *y).collect();
    if chart.zero_line {
        y_values.push(0.0);
    }
    let y_range = padded_range(y_values.into_iter(), 0.08);

    let root = BitMapBackend::new(output_path, LINE_CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| PlotError::DrawingArea(e.to_string()))?;

    let mut context = ChartBuilder::on(&root)
        .caption(chart.title, ("sans-serif", 30))
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(100)
        .build_cartesian_2d((0..axis.len()).into_segmented(), y_range)
        .map_err(|e| PlotError::ChartConfig(e.to_string()))?;

    let category_formatter = |x: &SegmentValue<usize>| axis.label_for(x);
    let value_formatter = |y: &f64| format_number(*y);

    context
        .configure_mesh()
        .x_desc(chart.x_desc)
        .y_desc(chart.y_desc)
        .x_labels(axis.tick_count())
        .x_label_formatter(&category_formatter)
        .y_label_formatter(&value_formatter)
        .label_style(("sans-serif", 16))
        .draw()
        .map_err(|e| PlotError::Drawing(e.to_string()))?;

    for (idx, series) in chart.series.iter().enumerate() {
        let color = Palette99::pick(idx).mix(0.9);
        context
            .draw_series(LineSeries::new(
                centered(&series.points),
                color.stroke_width(2),
            ))
            .map_err(|e| PlotError::Drawing(e.to_string()))?
            .label(series.name.clone())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        context
            .draw_series(
                centered(&series.points).map(|point| Circle::new(point, 4, color.filled())),
            )
            .map_err(|e| PlotError::Drawing(e.to_string()))?;
    }

    if chart.zero_line {
        // One dash over the left half of every category.
        context
            .draw_series((0..axis.len()).map(|idx| {
                PathElement::new(
                    vec![
                        (SegmentValue::Exact(idx), 0.0),
                        (SegmentValue::CenterOf(idx), 0.0),
                    ],
                    RED.stroke_width(1),
                )
            }))
            .map_err(|e| PlotError::Drawing(e.to_string()))?;
    }

    if chart.series.len() > 1 || !chart.series.iter().all(|s| s.name.is_empty()) {
        context
            .configure_series_labels()
            .background_style(WHITE.mix(0.85))
            .border_style(BLACK)
            .position(SeriesLabelPosition::UpperLeft)
            .label_font(("sans-serif", 16))
            .draw()
            .map_err(|e| PlotError::Drawing(e.to_string()))?;
    }

    root.present()
        .map_err(|e| PlotError::Drawing(e.to_string()))?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct DualAxisChart<'a> {
    pub title: &'a str,
    pub x_desc: &'a str,
    pub left_desc: &'a str,
    pub right_desc: &'a str,
    pub categories: CategoryAxis,
    /// Lines against the left axis, each with its color.
    pub lines: Vec<(Series, RGBColor)>,
    /// Bars against the right axis.
    pub bars: (Series, RGBColor),
}

/// Renders lines on the left axis and translucent bars on a secondary right axis.
pub fn render_dual_axis_chart(chart: &DualAxisChart<'_>, output_path: &Path) -> Result<()> {
    if chart.categories.is_empty() {
        return Err(PlotError::InvalidData(format!(
            "'{}' has no categories",
            chart.title
        )));
    }

    let left_range = padded_range(
        chart
            .lines
            .iter()
            .flat_map(|(series, _)| series.points.iter().map(|(_, y)| *y)),
        0.08,
    );
    let bar_max = chart
        .bars
        .0
        .points
        .iter()
        .map(|(_, y)| *y)
        .fold(0.0_f64, f64::max);
    let right_range = 0.0..(if bar_max > 0.0 { bar_max * 1.1 } else { 1.0 });
    let axis = &chart.categories;

    let root = BitMapBackend::new(output_path, DUAL_AXIS_CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| PlotError::DrawingArea(e.to_string()))?;

    let mut context = ChartBuilder::on(&root)
        .caption(chart.title, ("sans-serif", 30))
        .margin(20)
        .x_label_area_size(70)
        .y_label_area_size(80)
        .right_y_label_area_size(80)
        .build_cartesian_2d((0..axis.len()).into_segmented(), left_range)
        .map_err(|e| PlotError::ChartConfig(e.to_string()))?
        .set_secondary_coord((0..axis.len()).into_segmented(), right_range);

    let category_formatter = |x: &SegmentValue<usize>| axis.label_for(x);
    context
        .configure_mesh()
        .x_desc(chart.x_desc)
        .y_desc(chart.left_desc)
        .x_labels(axis.tick_count())
        .x_label_formatter(&category_formatter)
        .label_style(("sans-serif", 16))
        .draw()
        .map_err(|e| PlotError::Drawing(e.to_string()))?;
    context
        .configure_secondary_axes()
        .y_desc(chart.right_desc)
        .label_style(("sans-serif", 16))
        .draw()
        .map_err(|e| PlotError::Drawing(e.to_string()))?;

    let (bars, bar_color) = &chart.bars;
    let bar_style = bar_color.mix(0.3).filled();
    context
        .draw_secondary_series(
            bars.points.iter().map(|&(x, y)| {
                Rectangle::new(
                    [(SegmentValue::Exact(x), 0.0), (axis.segment_end(x), y)],
                    bar_style,
                )
            }),
        )
        .map_err(|e| PlotError::Drawing(e.to_string()))?
        .label(bars.name.clone())
        .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], bar_style));

    for (series, color) in &chart.lines {
        let style = color.stroke_width(2);
        context
            .draw_series(LineSeries::new(centered(&series.points), style))
            .map_err(|e| PlotError::Drawing(e.to_string()))?
            .label(series.name.clone())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
    }

    context
        .configure_series_labels()
        .background_style(WHITE.mix(0.85))
        .border_style(BLACK)
        .position(SeriesLabelPosition::UpperLeft)
        .label_font(("sans-serif", 16))
        .draw()
        .map_err(|e| PlotError::Drawing(e.to_string()))?;

    root.present()
        .map_err(|e| PlotError::Drawing(e.to_string()))?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct PieSlice {
    pub label: String,
    pub value: f64,
    pub color: RGBColor,
}

/// Renders a pie chart starting at 12 o'clock and running counter-clockwise,
/// each wedge annotated with its share in percent.
pub fn render_pie_chart(title: &str, slices: &[PieSlice], output_path: &Path) -> Result<()> {
    let total: f64 = slices.iter().map(|slice| slice.value.max(0.0)).sum();
    if total <= 0.0 {
        return Err(PlotError::InvalidData(format!(
            "'{}' has nothing to divide",
            title
        )));
    }

    let root = BitMapBackend::new(output_path, PIE_CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| PlotError::DrawingArea(e.to_string()))?;
    let area = root
        .titled(title, ("sans-serif", 28))
        .map_err(|e| PlotError::DrawingArea(e.to_string()))?;

    let (width, height) = area.dim_in_pixel();
    let center = (width as f64 / 2.0, height as f64 / 2.0);
    let radius = width.min(height) as f64 * 0.35;
    let label_style = TextStyle::from(("sans-serif", 22).into_font())
        .pos(Pos::new(HPos::Center, VPos::Center));

    let mut start = PI / 2.0;
    for slice in slices.iter().filter(|slice| slice.value > 0.0) {
        let share = slice.value / total;
        let sweep = share * 2.0 * PI;
        let steps = ((sweep.to_degrees()).ceil() as usize).max(2);

        let mut outline = Vec::with_capacity(steps + 2);
        outline.push(to_pixel(center, 0.0, start));
        for step in 0..=steps {
            let angle = start + sweep * step as f64 / steps as f64;
            outline.push(to_pixel(center, radius, angle));
        }
        area.draw(&Polygon::new(outline, slice.color.filled()))
            .map_err(|e| PlotError::Drawing(e.to_string()))?;

        let middle = start + sweep / 2.0;
        area.draw(&Text::new(
            slice.label.clone(),
            to_pixel(center, radius * 1.18, middle),
            label_style.clone(),
        ))
        .map_err(|e| PlotError::Drawing(e.to_string()))?;
        area.draw(&Text::new(
            format!("{:.1}%", share * 100.0),
            to_pixel(center, radius * 0.6, middle),
            label_style.clone(),
        ))
        .map_err(|e| PlotError::Drawing(e.to_string()))?;

        start += sweep;
    }

    root.present()
        .map_err(|e| PlotError::Drawing(e.to_string()))?;
    Ok(())
}

fn to_pixel(center: (f64, f64), radius: f64, angle: f64) -> (i32, i32) {
    (
        (center.0 + radius * angle.cos()).round() as i32,
        (center.1 - radius * angle.sin()).round() as i32,
    )
}

/// Min/max of the values widened by `pad` of the span on both sides. A flat or
/// empty input still yields a drawable range.
pub fn padded_range(values: impl Iterator<Item = f64>, pad: f64) -> Range<f64> {
    let (min, max) = values
        .filter(|value| value.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), value| {
            (lo.min(value), hi.max(value))
        });

    if !min.is_finite() || !max.is_finite() {
        return 0.0..1.0;
    }
    if (max - min).abs() < f64::EPSILON {
        let half = if min == 0.0 { 1.0 } else { min.abs() * 0.1 };
        return (min - half)..(max + half);
    }

    let margin = (max - min) * pad;
    (min - margin)..(max + margin)
}

/// Axis label formatting: thousands as `k`, millions as `M`.
pub fn format_number(value: f64) -> String {
    let abs = value.abs();
    if abs >= 1_000_000.0 {
        format!("{:.1}M", value / 1_000_000.0)
    } else if abs >= 10_000.0 {
        format!("{:.0}k", value / 1_000.0)
    } else if abs >= 100.0 || abs == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.1}", value)
    }
}
