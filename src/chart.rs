#![cfg(feature = "web")]
use crate::dashboard::YearPoint;
use crate::error::{KpiError, Result};
use crate::kpi::{KPI_MAX, KpiRow};
use plotters::prelude::*;

/// Configuration options for chart generation
#[derive(Clone, Debug)]
pub struct ChartOptions {
    /// Title displayed at the top of the chart
    pub title: String,

    /// Label for the X-axis
    pub x_label: String,

    /// Label for the Y-axis
    pub y_label: String,

    /// Width of the chart in pixels
    pub width: u32,

    /// Height of the chart in pixels
    pub height: u32,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            title: "Chart".to_string(),
            x_label: String::new(),
            y_label: String::new(),
            width: 960,
            height: 420,
        }
    }
}

/// Bar chart of KPI per group, with the 5.0 target drawn as a line
///
/// # Returns
/// * The SVG document as a string
pub fn kpi_chart(rows: &[KpiRow], options: &ChartOptions) -> Result<String> {
    let labels: Vec<String> = rows.iter().map(|r| r.group.clone()).collect();
    let values: Vec<f64> = rows.iter().map(|r| r.kpi).collect();
    bar_chart(&labels, &values, Some(KPI_MAX), options)
}

/// Bar chart of distinct-title score totals per year
pub fn trend_chart(points: &[YearPoint], options: &ChartOptions) -> Result<String> {
    let labels: Vec<String> = points.iter().map(|p| p.year.to_string()).collect();
    let values: Vec<f64> = points.iter().map(|p| p.total_score).collect();
    bar_chart(&labels, &values, None, options)
}

/// Draws one bar per label on a segmented axis
///
/// Text is emitted as SVG `<text>` elements, so no font files are needed
/// on the server.
fn bar_chart(
    labels: &[String],
    values: &[f64],
    reference: Option<f64>,
    options: &ChartOptions,
) -> Result<String> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (options.width, options.height))
            .into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;

        let n = values.len().max(1);
        let y_max = values
            .iter()
            .copied()
            .fold(reference.unwrap_or(0.0), f64::max)
            .max(1.0)
            * 1.1;

        let mut chart = ChartBuilder::on(&root)
            .caption(&options.title, ("sans-serif", 24).into_font())
            .margin(10)
            .x_label_area_size(60)
            .y_label_area_size(50)
            .build_cartesian_2d((0..n).into_segmented(), 0f64..y_max)
            .map_err(draw_err)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(n)
            .x_label_formatter(&|v: &SegmentValue<usize>| match v {
                SegmentValue::CenterOf(i) => labels.get(*i).cloned().unwrap_or_default(),
                _ => String::new(),
            })
            .x_desc(&options.x_label)
            .y_desc(&options.y_label)
            .draw()
            .map_err(draw_err)?;

        chart
            .draw_series(values.iter().enumerate().map(|(i, v)| {
                let mut bar = Rectangle::new(
                    [(SegmentValue::Exact(i), 0.0), (SegmentValue::Exact(i + 1), *v)],
                    BLUE.mix(0.7).filled(),
                );
                bar.set_margin(0, 0, 6, 6);
                bar
            }))
            .map_err(draw_err)?;

        if let Some(target) = reference {
            chart
                .draw_series(LineSeries::new(
                    vec![(SegmentValue::Exact(0), target), (SegmentValue::Exact(n), target)],
                    RED.stroke_width(2),
                ))
                .map_err(draw_err)?;
        }

        root.present().map_err(draw_err)?;
    }

    Ok(svg)
}

fn draw_err<E: std::fmt::Display>(e: E) -> KpiError {
    KpiError::Chart(e.to_string())
}
