// ==============================================================================
// render.rs - Manhattan Plot Rendering
// ==============================================================================
// Description: Draws a computed layout to a PNG with plotters
// Author: Matt Barham
// Created: 2026-10-16
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================
// Sizes are given in inches (figure) and points (markers, fonts) and
// converted at a fixed 600 dpi.
// ==============================================================================

use anyhow::{Context, Result};
use plotters::prelude::*;
use plotters::series::DashedLineSeries;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::layout::ManhattanLayout;
use crate::output::AtomicOutput;

pub const DPI: f64 = 600.0;
const FONT_PT: f64 = 14.0;
const THRESHOLD_LINE_PT: f64 = 0.5;
const DASH_PT: f64 = 3.7;
const DASH_GAP_PT: f64 = 1.6;
const THRESHOLD_GRAY: RGBColor = RGBColor(128, 128, 128);

/// Dash and gap lengths in pixels; a "--" pattern scaled to the line width
fn threshold_dash() -> (u32, u32) {
    let scaled = |pt: f64| pt_to_px(pt * THRESHOLD_LINE_PT).round().max(1.0) as u32;
    (scaled(DASH_PT), scaled(DASH_GAP_PT))
}

/// Points to pixels at the output resolution
pub fn pt_to_px(pt: f64) -> f64 {
    pt * DPI / 72.0
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub title: String,
    /// Width and height in inches
    pub figsize: (f64, f64),
    /// Inner marker diameter in points
    pub point_size: f64,
    /// Border width around each marker in points
    pub stroke_size: f64,
    /// Height of the significance line on the -log10 scale
    pub threshold_y: f64,
}

impl RenderOptions {
    pub fn canvas_size(&self) -> (u32, u32) {
        let to_px = |inches: f64| (inches * DPI).round().max(1.0) as u32;
        (to_px(self.figsize.0), to_px(self.figsize.1))
    }

    /// Radii of the black border disc and the colored fill disc, in pixels
    fn marker_radii(&self) -> (u32, u32) {
        let radius = |diameter_pt: f64| (pt_to_px(diameter_pt) / 2.0).round().max(1.0) as u32;
        (
            radius(self.point_size + 2.0 * self.stroke_size),
            radius(self.point_size),
        )
    }
}

/// Render `layout` and atomically write it to `output_path`
pub fn render_png(layout: &ManhattanLayout, options: &RenderOptions, output_path: &Path) -> Result<PathBuf> {
    let (width, height) = options.canvas_size();
    debug!("Rendering {}x{} px canvas", width, height);

    let output = AtomicOutput::create(output_path, ".png")?;

    {
        let root = BitMapBackend::new(output.temp_path(), (width, height)).into_drawing_area();
        draw_manhattan(&root, layout, options).context("Failed to draw Manhattan plot")?;
        root.present().context("Failed to write PNG")?;
    }

    output.commit()
}

fn draw_manhattan<DB: DrawingBackend>(
    root: &DrawingArea<DB, plotters::coord::Shift>,
    layout: &ManhattanLayout,
    options: &RenderOptions,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    root.fill(&WHITE)?;

    let font_px = pt_to_px(FONT_PT);
    let font = || ("sans-serif", font_px).into_font();

    let x_range = layout.x_range();
    let y_range = layout.y_range(options.threshold_y);

    let mut chart = ChartBuilder::on(root)
        .caption(&options.title, font())
        .margin(pt_to_px(8.0) as u32)
        .x_label_area_size((font_px * 3.0) as u32)
        .y_label_area_size((font_px * 3.5) as u32)
        .build_cartesian_2d(x_range.clone(), y_range.clone())?;

    // Chromosome ticks are drawn below; the mesh only carries the y labels
    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(0)
        .x_desc("Chromosome")
        .y_desc("-log10(p-value)")
        .label_style(font())
        .axis_desc_style(font())
        .draw()?;

    let line_px = pt_to_px(THRESHOLD_LINE_PT).round().max(1.0) as u32;
    let (dash, gap) = threshold_dash();
    chart.draw_series(DashedLineSeries::new(
        vec![
            (x_range.start, options.threshold_y),
            (x_range.end, options.threshold_y),
        ],
        dash,
        gap,
        THRESHOLD_GRAY.stroke_width(line_px),
    ))?;

    let (outer, inner) = options.marker_radii();
    for tick in &layout.ticks {
        let points = &layout.points[tick.points.clone()];
        let (r, g, b) = points.first().map(|p| p.color()).unwrap_or((0, 0, 0));

        chart.draw_series(points.iter().map(|p| Circle::new((p.x, p.y), outer, BLACK.filled())))?;
        chart.draw_series(
            points
                .iter()
                .map(|p| Circle::new((p.x, p.y), inner, RGBColor(r, g, b).filled())),
        )?;
    }

    let label_style = TextStyle::from(font()).pos(Pos::new(HPos::Center, VPos::Top));
    let gap = (font_px * 0.3) as i32;
    for tick in &layout.ticks {
        let (px, py) = chart.backend_coord(&(tick.x, y_range.start));
        root.draw(&Text::new(tick.label.clone(), (px, py + gap), label_style.clone()))?;
    }

    Ok(())
}
