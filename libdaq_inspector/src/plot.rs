// Rendering of decoded data with plotters. All figures are written as bitmaps (png/gif).
use plotters::coord::Shift;
use plotters::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;

use super::error::PlotError;
use super::histogram::{value_range, Histogram1D, Histogram2D};
use super::plane_sort::PlanePartition;
use super::table::{AdcRecord, TpColumn, TpRow, TpTable};

const FIGURE_SIZE: (u32, u32) = (1280, 960);
const COLORBAR_WIDTH: i32 = 180;
const VALIDATION_BINS: usize = 40;
const ANIMATION_BINS: usize = 100;
const FRAME_DELAY_MS: u32 = 250;
const COLORBAR_STEPS: usize = 128;
// Empty bins are drawn at this height on log axes
const LOG_FLOOR: f64 = 0.5;

const FONT: &str = "sans-serif";

/// Perceptually uniform sequential palette
pub const VIRIDIS: [(u8, u8, u8); 5] = [
    (68, 1, 84),
    (59, 82, 139),
    (33, 145, 140),
    (94, 201, 98),
    (253, 231, 37),
];

/// Diverging blue-white-red palette
pub const SEISMIC: [(u8, u8, u8); 5] = [
    (0, 0, 77),
    (0, 0, 255),
    (255, 255, 255),
    (255, 0, 0),
    (128, 0, 0),
];

/// The plots available for trigger primitive data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlotMode {
    Validation,
    Gif,
    Scatter,
}

impl PlotMode {
    pub const NAMES: [&'static str; 3] = ["validation", "gif", "scatter"];
}

impl FromStr for PlotMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "validation" => Ok(Self::Validation),
            "gif" => Ok(Self::Gif),
            "scatter" => Ok(Self::Scatter),
            _ => Err(format!("Unrecognized plot mode: {s}")),
        }
    }
}

impl Display for PlotMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Gif => write!(f, "gif"),
            Self::Scatter => write!(f, "scatter"),
        }
    }
}

/// Linear interpolation along a palette, t in [0, 1]
pub fn palette_color(stops: &[(u8, u8, u8)], t: f64) -> RGBColor {
    if stops.len() < 2 {
        return stops
            .first()
            .map(|s| RGBColor(s.0, s.1, s.2))
            .unwrap_or(BLACK);
    }
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let scaled = t * (stops.len() - 1) as f64;
    let idx = (scaled.floor() as usize).min(stops.len() - 2);
    let frac = scaled - idx as f64;
    let (a, b) = (stops[idx], stops[idx + 1]);
    let lerp = |lo: u8, hi: u8| (lo as f64 + (hi as f64 - lo as f64) * frac).round() as u8;
    RGBColor(lerp(a.0, b.0), lerp(a.1, b.1), lerp(a.2, b.2))
}

/// Make sure an output directory exists
pub fn prepare_out_directory(out_dir: &Path) -> Result<(), PlotError> {
    if !out_dir.exists() {
        log::info!("Creating output directory {}", out_dir.to_string_lossy());
        std::fs::create_dir_all(out_dir)?;
    }
    Ok(())
}

fn draw_colorbar<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    stops: &[(u8, u8, u8)],
    range: (f64, f64),
    label: &str,
) -> Result<(), PlotError> {
    let (min, max) = range;
    let mut chart = ChartBuilder::on(area)
        .margin_top(40)
        .margin_bottom(60)
        .margin_right(10)
        .y_label_area_size(90)
        .build_cartesian_2d(0.0..1.0, min..max)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_x_axis()
        .y_desc(label)
        .label_style((FONT, 16).into_font())
        .light_line_style(WHITE.mix(0.0))
        .draw()?;

    let step = (max - min) / COLORBAR_STEPS as f64;
    chart.draw_series((0..COLORBAR_STEPS).map(|idx| {
        let lo = min + idx as f64 * step;
        let color = palette_color(stops, (idx as f64 + 0.5) / COLORBAR_STEPS as f64);
        Rectangle::new([(0.0, lo), (1.0, lo + step)], color.filled())
    }))?;
    Ok(())
}

fn draw_step_histogram(hist: &Histogram1D, label: &str, path: &Path) -> Result<(), PlotError> {
    let root = BitMapBackend::new(path, FIGURE_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let y_max = (hist.max_count() as f64 * 2.0).max(1.0);
    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(
            hist.binning.min..hist.binning.max,
            (LOG_FLOOR..y_max).log_scale(),
        )?;
    chart
        .configure_mesh()
        .x_desc(label)
        .y_desc("counts")
        .label_style((FONT, 20).into_font())
        .axis_desc_style((FONT, 24).into_font())
        .light_line_style(WHITE.mix(0.0))
        .draw()?;

    let width = hist.binning.width();
    let mut points = Vec::with_capacity(2 * hist.counts.len() + 2);
    points.push((hist.binning.min, LOG_FLOOR));
    for (edge, count) in hist.bins() {
        let height = (count as f64).max(LOG_FLOOR);
        points.push((edge, height));
        points.push((edge + width, height));
    }
    points.push((hist.binning.max, LOG_FLOOR));
    chart.draw_series(LineSeries::new(points, &BLUE))?;

    root.present()?;
    Ok(())
}

/// Plot a step histogram with a log y axis of every trigger primitive column.
///
/// Writes `<out_dir>/<column>.png`.
pub fn plot_validation(rows: &[TpRow], out_dir: &Path) -> Result<(), PlotError> {
    if rows.is_empty() {
        log::warn!("No trigger primitives to plot, skipping validation plots");
        return Ok(());
    }
    prepare_out_directory(out_dir)?;
    for column in TpColumn::ALL {
        let values = column.values(rows);
        let Some(hist) = Histogram1D::from_values(&values, VALIDATION_BINS) else {
            log::warn!("No finite values in column {}, skipping", column.name());
            continue;
        };
        log::info!("Plotting {}", column.name());
        let path = out_dir.join(format!("{}.png", column.name()));
        draw_step_histogram(&hist, column.name(), &path)?;
    }
    Ok(())
}

/// Draw a 2D histogram with a log colour scale and its colour bar
fn draw_histogram_2d<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    hist: &Histogram2D,
    caption: &str,
) -> Result<(), PlotError> {
    let (main, bar) = area.split_horizontally(FIGURE_SIZE.0 as i32 - COLORBAR_WIDTH);
    let log_max = (hist.max_count().max(1) as f64).log10();

    let mut chart = ChartBuilder::on(&main)
        .caption(caption, (FONT, 32).into_font())
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(90)
        .build_cartesian_2d(hist.x.min..hist.x.max, hist.y.min..hist.y.max)?;
    chart
        .configure_mesh()
        .x_desc("channel")
        .y_desc("peak time")
        .label_style((FONT, 20).into_font())
        .axis_desc_style((FONT, 24).into_font())
        .light_line_style(WHITE.mix(0.0))
        .draw()?;

    let (x_width, y_width) = (hist.x.width(), hist.y.width());
    chart.draw_series(
        hist.counts
            .indexed_iter()
            .filter(|(_, count)| **count > 0)
            .map(|((ix, iy), count)| {
                let t = if log_max > 0.0 {
                    (*count as f64).log10() / log_max
                } else {
                    1.0
                };
                let x0 = hist.x.lower_edge(ix);
                let y0 = hist.y.lower_edge(iy);
                Rectangle::new(
                    [(x0, y0), (x0 + x_width, y0 + y_width)],
                    palette_color(&VIRIDIS, t).filled(),
                )
            }),
    )?;

    draw_colorbar(&bar, &VIRIDIS, (0.0, log_max.max(1.0)), "log10(counts)")?;
    Ok(())
}

/// Animate the channel vs peak time distribution, one frame per table.
///
/// Writes `<out_dir>/anim.gif`.
pub fn plot_animation(tables: &[TpTable], out_dir: &Path) -> Result<(), PlotError> {
    if tables.iter().all(|t| t.is_empty()) {
        log::warn!("No trigger primitives to animate, skipping gif");
        return Ok(());
    }
    prepare_out_directory(out_dir)?;
    let path = out_dir.join("anim.gif");
    let root = BitMapBackend::gif(&path, FIGURE_SIZE, FRAME_DELAY_MS)
        .map_err(|e| PlotError::DrawingError(e.to_string()))?
        .into_drawing_area();

    for (idx, table) in tables.iter().enumerate() {
        let channels = TpColumn::Channel.values(&table.rows);
        let peaks = TpColumn::TimePeak.values(&table.rows);
        let Some(hist) = Histogram2D::from_values(&channels, &peaks, ANIMATION_BINS, ANIMATION_BINS)
        else {
            log::warn!("Time slice {idx} has no trigger primitives, skipping frame");
            continue;
        };
        root.fill(&WHITE)?;
        draw_histogram_2d(&root, &hist, &format!("Time slice : {idx}"))?;
        root.present()?;
    }
    log::info!("Wrote animation to {}", path.to_string_lossy());
    Ok(())
}

/// Scatter channel vs peak time per plane, coloured by ADC integral.
///
/// Writes `<out_dir>/scatter_{u,v,z}.png`.
pub fn plot_plane_scatter(
    partition: &PlanePartition<TpRow>,
    out_dir: &Path,
) -> Result<(), PlotError> {
    prepare_out_directory(out_dir)?;
    for (plane, rows) in partition.planes() {
        if rows.is_empty() {
            log::warn!("Plane {plane} has no trigger primitives, skipping scatter plot");
            continue;
        }
        let channels = TpColumn::Channel.values(rows);
        let peaks = TpColumn::TimePeak.values(rows);
        let integrals = TpColumn::AdcIntegral.values(rows);
        let (Some(x), Some(y), Some(c)) = (
            value_range(&channels),
            value_range(&peaks),
            value_range(&integrals),
        ) else {
            continue;
        };

        let path = out_dir.join(format!("scatter_{}.png", plane.label()));
        let root = BitMapBackend::new(&path, FIGURE_SIZE).into_drawing_area();
        root.fill(&WHITE)?;
        let (main, bar) = root.split_horizontally(FIGURE_SIZE.0 as i32 - COLORBAR_WIDTH);

        let mut chart = ChartBuilder::on(&main)
            .caption(format!("Plane : {plane}"), (FONT, 32).into_font())
            .margin(10)
            .x_label_area_size(50)
            .y_label_area_size(90)
            .build_cartesian_2d(x.0..x.1, y.0..y.1)?;
        chart
            .configure_mesh()
            .x_desc("channel")
            .y_desc("peak time")
            .label_style((FONT, 20).into_font())
            .axis_desc_style((FONT, 24).into_font())
            .light_line_style(WHITE.mix(0.0))
            .draw()?;

        let (c_min, c_max) = c;
        chart.draw_series(channels.iter().zip(peaks.iter()).zip(integrals.iter()).map(
            |((channel, peak), integral)| {
                let color = palette_color(&VIRIDIS, (integral - c_min) / (c_max - c_min));
                Circle::new((*channel, *peak), 3, color.filled())
            },
        ))?;
        draw_colorbar(&bar, &VIRIDIS, c, "ADC integral")?;
        root.present()?;
        log::info!("Wrote {}", path.to_string_lossy());
    }
    Ok(())
}

/// Event display of raw data: pedestal subtracted ADC per channel and tick with a diverging
/// colour scale.
pub fn plot_adc_heatmap(record: &AdcRecord, path: &Path) -> Result<(), PlotError> {
    if record.adc.is_empty() {
        log::warn!("ADC record is empty, skipping event display");
        return Ok(());
    }
    let adc = record.pedestal_subtracted();
    let limit = adc.iter().fold(0.0f64, |acc, v| acc.max(v.abs())).max(1.0);
    let n_channels = record.n_channels() as f64;
    let n_ticks = record.n_ticks() as f64;

    let root = BitMapBackend::new(path, FIGURE_SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let (main, bar) = root.split_horizontally(FIGURE_SIZE.0 as i32 - COLORBAR_WIDTH);

    let caption = match &record.record {
        Some(id) => format!("{id} ({})", record.address),
        None => record.address.to_string(),
    };
    let mut chart = ChartBuilder::on(&main)
        .caption(caption, (FONT, 28).into_font())
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(90)
        .build_cartesian_2d(0.0..n_channels, 0.0..n_ticks)?;
    chart
        .configure_mesh()
        .x_desc("channel index")
        .y_desc("tick")
        .label_style((FONT, 20).into_font())
        .axis_desc_style((FONT, 24).into_font())
        .light_line_style(WHITE.mix(0.0))
        .draw()?;

    chart.draw_series(adc.indexed_iter().map(|((tick, column), value)| {
        let color = palette_color(&SEISMIC, (value / limit + 1.0) / 2.0);
        let (x, y) = (column as f64, tick as f64);
        Rectangle::new([(x, y), (x + 1.0, y + 1.0)], color.filled())
    }))?;
    draw_colorbar(&bar, &SEISMIC, (-limit, limit), "ADC - pedestal")?;

    root.present()?;
    log::info!("Wrote {}", path.to_string_lossy());
    Ok(())
}
