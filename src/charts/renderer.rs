//! Static Chart Renderer
//! Draws the report figure with plotters.
//!
//! Layout (three stacked panels under the figure title):
//! 1. Regional production by source
//! 2. Regional production vs. consumption, with national means per region
//! 3. Yearly withdrawals by sector, stacked per sub-daily bucket

use crate::config::ChartConfig;
use crate::report::ReportData;
use crate::stats::{DatedValue, SectorProfile};
use chrono::{Datelike, NaiveDate};
use log::info;
use plotters::coord::Shift;
use plotters::prelude::*;
use thiserror::Error;

const PRODUCTION_BLUE: RGBColor = RGBColor(31, 119, 180);
const CONSUMPTION_GREEN: RGBColor = RGBColor(44, 160, 44);
const SECTOR_COLORS: [RGBColor; 3] = [
    RGBColor(31, 119, 180), // Blue
    RGBColor(44, 160, 44),  // Green
    RGBColor(214, 39, 40),  // Red
];

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Drawing failed: {0}")]
    Drawing(String),
}

fn drawing<E: std::fmt::Display>(err: E) -> RenderError {
    RenderError::Drawing(err.to_string())
}

pub struct ReportRenderer;

impl ReportRenderer {
    /// Render the three panels into `chart.output_path`.
    pub fn render(report: &ReportData, chart: &ChartConfig) -> Result<(), RenderError> {
        let root =
            BitMapBackend::new(&chart.output_path, (chart.width, chart.height)).into_drawing_area();
        Self::draw_figure(&root, report, &chart.title)?;
        root.present().map_err(drawing)?;
        info!("Figure written to {}", chart.output_path.display());
        Ok(())
    }

    fn draw_figure<DB: DrawingBackend>(
        root: &DrawingArea<DB, Shift>,
        report: &ReportData,
        title: &str,
    ) -> Result<(), RenderError> {
        root.fill(&WHITE).map_err(drawing)?;
        let body = root.titled(title, ("sans-serif", 24)).map_err(drawing)?;
        let panels = body.split_evenly((3, 1));

        Self::draw_production_by_source(&panels[0], report)?;
        Self::draw_production_vs_consumption(&panels[1], report)?;
        Self::draw_withdrawals(&panels[2], &report.profiles)?;
        Ok(())
    }

    fn draw_production_by_source<DB: DrawingBackend>(
        area: &DrawingArea<DB, Shift>,
        report: &ReportData,
    ) -> Result<(), RenderError> {
        let series: Vec<(String, Vec<(f64, f64)>)> = report
            .source_labels
            .iter()
            .enumerate()
            .map(|(i, label)| {
                let points = report
                    .production
                    .iter()
                    .map(|r| (decimal_year(r.date), r.sources.get(i).copied().unwrap_or(0.0)))
                    .collect();
                (short_label(label), points)
            })
            .collect();

        let all_points: Vec<(f64, f64)> = series.iter().flat_map(|(_, p)| p.iter().copied()).collect();
        let (x_min, x_max) = axis_range(all_points.iter().map(|p| p.0));
        let (_, y_max) = axis_range(all_points.iter().map(|p| p.1).chain([0.0]));

        let mut chart = ChartBuilder::on(area)
            .caption("Electricity production by source", ("sans-serif", 16))
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(60)
            .build_cartesian_2d(x_min..x_max, 0.0..y_max)
            .map_err(drawing)?;

        chart
            .configure_mesh()
            .x_desc("Year")
            .y_desc("Production (GWh)")
            .x_label_formatter(&|x| format!("{:.0}", x))
            .draw()
            .map_err(drawing)?;

        for (i, (label, points)) in series.into_iter().enumerate() {
            let color = Palette99::pick(i).to_rgba();
            chart
                .draw_series(LineSeries::new(points, color.stroke_width(2)))
                .map_err(drawing)?
                .label(label)
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(drawing)?;
        Ok(())
    }

    fn draw_production_vs_consumption<DB: DrawingBackend>(
        area: &DrawingArea<DB, Shift>,
        report: &ReportData,
    ) -> Result<(), RenderError> {
        let production: Vec<(f64, f64)> = report
            .production
            .iter()
            .map(|r| (decimal_year(r.date), r.total_production()))
            .collect();
        let consumption: Vec<(f64, f64)> = report
            .consumption
            .iter()
            .filter_map(|r| r.consumption.map(|v| (decimal_year(r.date), v)))
            .collect();
        let national_production = dated_points(&report.national_production);
        let national_consumption = dated_points(&report.national_consumption);

        let lines = [
            ("Total Production", &production, PRODUCTION_BLUE.to_rgba(), 2),
            ("Total Consumption", &consumption, CONSUMPTION_GREEN.to_rgba(), 2),
            (
                "National Mean Production per region",
                &national_production,
                PRODUCTION_BLUE.mix(0.5),
                1,
            ),
            (
                "National Mean Consumed per region",
                &national_consumption,
                CONSUMPTION_GREEN.mix(0.5),
                1,
            ),
        ];

        let all_points: Vec<(f64, f64)> = lines
            .iter()
            .flat_map(|(_, points, _, _)| points.iter().copied())
            .collect();
        let (x_min, x_max) = axis_range(all_points.iter().map(|p| p.0));
        let (_, y_max) = axis_range(all_points.iter().map(|p| p.1).chain([0.0]));

        let mut chart = ChartBuilder::on(area)
            .caption("Production vs. Consumption", ("sans-serif", 16))
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(60)
            .build_cartesian_2d(x_min..x_max, 0.0..y_max)
            .map_err(drawing)?;

        chart
            .configure_mesh()
            .x_desc("Year")
            .y_desc("Production (GWh)")
            .x_label_formatter(&|x| format!("{:.0}", x))
            .draw()
            .map_err(drawing)?;

        for (label, points, color, width) in lines {
            chart
                .draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(width)))
                .map_err(drawing)?
                .label(label)
                .legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(width))
                });
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::LowerRight)
            .border_style(TRANSPARENT)
            .draw()
            .map_err(drawing)?;
        Ok(())
    }

    fn draw_withdrawals<DB: DrawingBackend>(
        area: &DrawingArea<DB, Shift>,
        profiles: &[SectorProfile],
    ) -> Result<(), RenderError> {
        let buckets: Vec<String> = profiles
            .first()
            .map(|p| p.buckets.clone())
            .unwrap_or_default();
        let stacks = stacked_bars(profiles, buckets.len());
        let (_, y_max) = axis_range(stacks.iter().flatten().map(|(_, top)| *top).chain([0.0]));
        let x_max = buckets.len().max(1) as f64;

        let mut chart = ChartBuilder::on(area)
            .caption("Withdrawals by sector", ("sans-serif", 16))
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(60)
            .build_cartesian_2d(0.0..x_max, 0.0..y_max)
            .map_err(drawing)?;

        let bucket_label = |x: &f64| {
            buckets
                .get(x.floor() as usize)
                .cloned()
                .unwrap_or_default()
        };
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_desc("Hour")
            .y_desc("Power Used (MWh)")
            .x_labels(buckets.len().clamp(1, 12))
            .x_label_formatter(&bucket_label)
            .draw()
            .map_err(drawing)?;

        for (i, (profile, bars)) in profiles.iter().zip(&stacks).enumerate() {
            let color = SECTOR_COLORS[i % SECTOR_COLORS.len()];
            chart
                .draw_series(bars.iter().enumerate().map(|(bucket, (bottom, top))| {
                    let x = bucket as f64;
                    Rectangle::new([(x + 0.1, *bottom), (x + 0.9, *top)], color.filled())
                }))
                .map_err(drawing)?
                .label(profile.label.as_str())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .border_style(TRANSPARENT)
            .draw()
            .map_err(drawing)?;
        Ok(())
    }
}

/// Year with the day of year as fraction, for a continuous time axis.
fn decimal_year(date: NaiveDate) -> f64 {
    date.year() as f64 + date.ordinal0() as f64 / 365.25
}

fn dated_points(values: &[DatedValue]) -> Vec<(f64, f64)> {
    values
        .iter()
        .map(|v| (decimal_year(v.date), v.value))
        .collect()
}

/// Label without the unit suffix, e.g. "Hydropower (GWh)" -> "Hydropower".
fn short_label(label: &str) -> String {
    label
        .split(" (")
        .next()
        .unwrap_or(label)
        .to_string()
}

/// Padded range covering `values`; falls back to `0..1` when there is nothing to span.
fn axis_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (min, max) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if min > max {
        return (0.0, 1.0);
    }
    if min == max {
        return (min - 0.5, max + 0.5);
    }
    let pad = (max - min) * 0.05;
    (min - pad, max + pad)
}

/// Per sector, the (bottom, top) of each bucket's bar, stacked in sector order.
fn stacked_bars(profiles: &[SectorProfile], bucket_count: usize) -> Vec<Vec<(f64, f64)>> {
    let mut base = vec![0.0; bucket_count];
    profiles
        .iter()
        .map(|profile| {
            base.iter_mut()
                .enumerate()
                .map(|(bucket, bottom)| {
                    let top = *bottom + profile.values.get(bucket).copied().unwrap_or(0.0);
                    let bar = (*bottom, top);
                    *bottom = top;
                    bar
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReportConfig;
    use std::fs;
    use std::path::Path;

    const PRODUCTION_CSV: &str = "\
Année;Région;Production nucléaire (GWh);Production thermique (GWh);Production hydraulique (GWh);Production éolienne (GWh);Production solaire (GWh);Production bioénergies (GWh)
2008;Provence-Alpes-Côte d'Azur;0;3500;7500;30;;150
2009;Provence-Alpes-Côte d'Azur;0;4000;8000;;500;200
";

    const CONSUMPTION_CSV: &str = "\
Année;Région;Consommation nette corrigée (GWh)
2008;Provence-Alpes-Côte d'Azur;41000.5
2009;Provence-Alpes-Côte d'Azur;40500.25
";

    const WITHDRAWALS_CSV: &str = "\
Date;Région;Code INSEE région;Secteur activité;Nombre de sites;Type;00h00;00h30;Total;Max;Min
2019-01-01;Provence-Alpes-Côte d'Azur;93;Tertiaire;10;RPT;3;4;7;4;3
2019-01-01;Provence-Alpes-Côte d'Azur;93;Grande Industrie;4;RPT;5;5;10;5;5
";

    fn fixture_config(dir: &Path, region: &str) -> ReportConfig {
        let write = |name: &str, content: &str| {
            let path = dir.join(name);
            fs::write(&path, content).unwrap();
            path
        };
        let mut config = ReportConfig {
            production_path: write("prod.csv", PRODUCTION_CSV),
            consumption_path: write("conso.csv", CONSUMPTION_CSV),
            withdrawals_path: write("withdrawals.csv", WITHDRAWALS_CSV),
            region: region.to_string(),
            ..ReportConfig::default()
        };
        config.chart.output_path = dir.join("figure.png");
        config
    }

    #[test]
    fn test_render_full_report() {
        let dir = tempfile::tempdir().unwrap();
        let config = fixture_config(dir.path(), "Provence-Alpes-Côte d'Azur");
        let report = ReportData::build(&config).unwrap();
        assert!(!report.production.is_empty());

        ReportRenderer::render(&report, &config.chart).unwrap();
        assert!(config.chart.output_path.is_file());
    }

    #[test]
    fn test_render_unknown_region_draws_empty_panels() {
        let dir = tempfile::tempdir().unwrap();
        let config = fixture_config(dir.path(), "Nowhere");
        let report = ReportData::build(&config).unwrap();
        assert!(report.production.is_empty());
        assert!(report.profiles.iter().all(SectorProfile::is_empty));

        ReportRenderer::render(&report, &config.chart).unwrap();
        assert!(config.chart.output_path.is_file());
    }

    fn profile(label: &str, values: Vec<f64>) -> SectorProfile {
        SectorProfile {
            label: label.to_string(),
            sector: label.to_string(),
            buckets: vec!["00h00".to_string(), "00h30".to_string()],
            year: if values.is_empty() { None } else { Some(2019) },
            values,
        }
    }

    #[test]
    fn test_axis_range_empty_falls_back() {
        assert_eq!(axis_range(std::iter::empty()), (0.0, 1.0));
        assert_eq!(axis_range([f64::NAN].into_iter()), (0.0, 1.0));
    }

    #[test]
    fn test_axis_range_degenerate_and_padded() {
        assert_eq!(axis_range([0.0, 0.0].into_iter()), (-0.5, 0.5));
        let (lo, hi) = axis_range([0.0, 100.0].into_iter());
        assert!(lo < 0.0 && hi > 100.0);
    }

    #[test]
    fn test_stacked_bars_accumulate_in_order() {
        let profiles = vec![
            profile("Tertiary", vec![1.0, 2.0]),
            profile("Other", Vec::new()),
            profile("Industrial", vec![3.0, 4.0]),
        ];
        let stacks = stacked_bars(&profiles, 2);
        assert_eq!(stacks[0], vec![(0.0, 1.0), (0.0, 2.0)]);
        assert_eq!(stacks[1], vec![(1.0, 1.0), (2.0, 2.0)]);
        assert_eq!(stacks[2], vec![(1.0, 4.0), (2.0, 6.0)]);
    }

    #[test]
    fn test_short_label_and_decimal_year() {
        assert_eq!(short_label("Hydropower (GWh)"), "Hydropower");
        assert_eq!(short_label("Bioenergy"), "Bioenergy");
        assert_eq!(decimal_year(NaiveDate::from_ymd_opt(2010, 1, 1).unwrap()), 2010.0);
    }
}
