// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Edaflow-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Edaflow and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! The four chart stages of an analysis run.
//!
//! The numeric stages receive the numeric subset of the table (and also skip any text column
//! they are handed); the missing-value map receives the full table.

use super::palette::{categorical, coolwarm, viridis, BAR_FILL, UNDEFINED_FILL};
use super::svg::{truncate_with_ellipsis, Anchor, SvgCanvas, TextStyle};
use super::{ChartError, ChartImage, ChartKind, RenderContext};
use crate::ingest::summary::{format_stat, quantile};
use crate::model::{ColumnKind, Table};

const WIDTH: u32 = 960;
const HEIGHT: u32 = 600;
const TITLE_BAND: f64 = 48.0;
const HISTOGRAM_BINS: usize = 20;
const MAX_MISSING_BANDS: usize = 120;
const MAX_ANNOTATED_CELLS: usize = 15;
const AXIS_COLOR: &str = "#444444";
const MUTED_TEXT: &str = "#888888";

#[derive(Debug, Clone, Copy)]
struct PlotArea {
    x: f64,
    y: f64,
    w: f64,
    h: f64,
}

impl PlotArea {
    fn bottom(&self) -> f64 {
        self.y + self.h
    }

    fn right(&self) -> f64 {
        self.x + self.w
    }
}

fn draw_title(canvas: &mut SvgCanvas, title: &str) {
    let x = canvas.width() / 2.0;
    canvas.text(x, 30.0, title, &TextStyle::sized(18.0).anchored(Anchor::Middle).bold());
}

fn draw_axes(canvas: &mut SvgCanvas, plot: PlotArea) {
    canvas.line(plot.x, plot.bottom(), plot.right(), plot.bottom(), AXIS_COLOR, 1.0);
    canvas.line(plot.x, plot.y, plot.x, plot.bottom(), AXIS_COLOR, 1.0);
}

/// Finite values per numeric column, in column order.
fn numeric_series(table: &Table, chart: ChartKind) -> Result<Vec<(&str, Vec<f64>)>, ChartError> {
    let series = table
        .columns()
        .iter()
        .filter(|column| column.kind() == ColumnKind::Numeric)
        .map(|column| {
            let values = column.present_numbers().into_iter().filter(|v| v.is_finite()).collect();
            (column.name(), values)
        })
        .collect::<Vec<(&str, Vec<f64>)>>();

    if series.is_empty() {
        return Err(ChartError::NoColumns { chart });
    }
    if series.iter().all(|(_, values)| values.is_empty()) {
        return Err(ChartError::NoValues { chart });
    }
    Ok(series)
}

/// Bin counts over `[lo, hi]`; a constant series gets a unit-wide range around its value.
fn histogram(values: &[f64], bins: usize) -> (f64, f64, Vec<usize>) {
    let mut lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let mut hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }
    let mut counts = vec![0usize; bins];
    for value in values {
        let bin = (((value - lo) / (hi - lo)) * bins as f64).floor() as usize;
        counts[bin.min(bins - 1)] += 1;
    }
    (lo, hi, counts)
}

pub fn distribution(table: &Table) -> Result<ChartImage, ChartError> {
    let chart = ChartKind::Distribution;
    let series = numeric_series(table, chart)?;

    let grid_cols = (series.len() as f64).sqrt().ceil() as usize;
    let grid_rows = series.len().div_ceil(grid_cols);

    let mut context = RenderContext::acquire(chart, WIDTH, HEIGHT)?;
    let canvas = context.canvas();
    draw_title(canvas, chart.title());

    let cell_w = canvas.width() / grid_cols as f64;
    let cell_h = (canvas.height() - TITLE_BAND) / grid_rows as f64;
    let label_len = ((cell_w / 8.0) as usize).max(4);

    for (index, (name, values)) in series.iter().enumerate() {
        let x0 = (index % grid_cols) as f64 * cell_w;
        let y0 = TITLE_BAND + (index / grid_cols) as f64 * cell_h;
        let plot = PlotArea {
            x: x0 + 44.0,
            y: y0 + 26.0,
            w: (cell_w - 64.0).max(10.0),
            h: (cell_h - 56.0).max(10.0),
        };

        canvas.text(
            x0 + cell_w / 2.0,
            y0 + 16.0,
            &truncate_with_ellipsis(name, label_len),
            &TextStyle::sized(13.0).anchored(Anchor::Middle).bold(),
        );
        draw_axes(canvas, plot);

        if values.is_empty() {
            canvas.text(
                plot.x + plot.w / 2.0,
                plot.y + plot.h / 2.0,
                "no values",
                &TextStyle::sized(12.0).anchored(Anchor::Middle).fill(MUTED_TEXT),
            );
            continue;
        }

        let (lo, hi, counts) = histogram(values, HISTOGRAM_BINS);
        let max_count = counts.iter().copied().max().unwrap_or(0).max(1);
        let bar_w = plot.w / HISTOGRAM_BINS as f64;
        for (bin, count) in counts.iter().enumerate() {
            if *count == 0 {
                continue;
            }
            let bar_h = plot.h * *count as f64 / max_count as f64;
            canvas.rect_outlined(
                plot.x + bin as f64 * bar_w,
                plot.bottom() - bar_h,
                bar_w,
                bar_h,
                &BAR_FILL.hex(),
                "#ffffff",
            );
        }

        let tick = TextStyle::sized(10.0);
        canvas.text(plot.x, plot.bottom() + 14.0, &format_stat(lo), &tick);
        canvas.text(
            plot.right(),
            plot.bottom() + 14.0,
            &format_stat(hi),
            &tick.clone().anchored(Anchor::End),
        );
        canvas.text(plot.x - 4.0, plot.y + 8.0, &max_count.to_string(), &tick.anchored(Anchor::End));
    }

    Ok(context.encode())
}

pub fn spread(table: &Table) -> Result<ChartImage, ChartError> {
    let chart = ChartKind::Spread;
    let series = numeric_series(table, chart)?;

    let mut lo = series.iter().flat_map(|(_, v)| v.iter().copied()).fold(f64::INFINITY, f64::min);
    let mut hi =
        series.iter().flat_map(|(_, v)| v.iter().copied()).fold(f64::NEG_INFINITY, f64::max);
    if lo == hi {
        lo -= 1.0;
        hi += 1.0;
    }

    let mut context = RenderContext::acquire(chart, WIDTH, HEIGHT)?;
    let canvas = context.canvas();
    draw_title(canvas, chart.title());

    let plot = PlotArea {
        x: 80.0,
        y: TITLE_BAND + 10.0,
        w: canvas.width() - 110.0,
        h: canvas.height() - TITLE_BAND - 110.0,
    };
    draw_axes(canvas, plot);

    let to_y = |value: f64| plot.bottom() - (value - lo) / (hi - lo) * plot.h;
    for step in 0..=4 {
        let value = lo + (hi - lo) * f64::from(step) / 4.0;
        let y = to_y(value);
        canvas.line(plot.x - 4.0, y, plot.right(), y, "#e5e5e5", 1.0);
        canvas.text(
            plot.x - 8.0,
            y + 4.0,
            &format_stat(value),
            &TextStyle::sized(10.0).anchored(Anchor::End),
        );
    }

    let slot = plot.w / series.len() as f64;
    let box_w = (slot * 0.5).min(80.0);
    let colors = categorical(series.len());
    for (index, ((name, values), color)) in series.iter().zip(&colors).enumerate() {
        let center = plot.x + slot * (index as f64 + 0.5);
        canvas.text(
            center,
            plot.bottom() + 18.0,
            &truncate_with_ellipsis(name, 18),
            &TextStyle::sized(11.0).anchored(Anchor::End).rotated(-30.0),
        );
        if values.is_empty() {
            continue;
        }

        let mut sorted = values.clone();
        sorted.sort_by(f64::total_cmp);
        let (Some(q1), Some(median), Some(q3)) = (
            quantile(&sorted, 0.25),
            quantile(&sorted, 0.5),
            quantile(&sorted, 0.75),
        ) else {
            continue;
        };
        let iqr = q3 - q1;
        let low_fence = q1 - 1.5 * iqr;
        let high_fence = q3 + 1.5 * iqr;
        let whisker_low = sorted.iter().copied().find(|v| *v >= low_fence).unwrap_or(q1);
        let whisker_high = sorted.iter().rev().copied().find(|v| *v <= high_fence).unwrap_or(q3);

        canvas.line(center, to_y(whisker_low), center, to_y(q1), AXIS_COLOR, 1.0);
        canvas.line(center, to_y(q3), center, to_y(whisker_high), AXIS_COLOR, 1.0);
        for cap in [whisker_low, whisker_high] {
            canvas.line(center - box_w / 4.0, to_y(cap), center + box_w / 4.0, to_y(cap), AXIS_COLOR, 1.0);
        }
        canvas.rect_outlined(
            center - box_w / 2.0,
            to_y(q3),
            box_w,
            to_y(q1) - to_y(q3),
            &color.hex(),
            AXIS_COLOR,
        );
        canvas.line(center - box_w / 2.0, to_y(median), center + box_w / 2.0, to_y(median), "#111111", 2.0);
        for outlier in sorted.iter().filter(|v| **v < low_fence || **v > high_fence) {
            canvas.circle(center, to_y(*outlier), 2.5, AXIS_COLOR);
        }
    }

    Ok(context.encode())
}

/// Pearson correlation over rows where both values are present.
pub fn pearson(a: &[Option<f64>], b: &[Option<f64>]) -> Option<f64> {
    let pairs = a
        .iter()
        .zip(b)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .collect::<Vec<_>>();
    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;
    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        cov += (x - mean_x) * (y - mean_y);
        var_x += (x - mean_x).powi(2);
        var_y += (y - mean_y).powi(2);
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some((cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0))
}

pub fn correlation_matrix(table: &Table) -> (Vec<String>, Vec<Vec<Option<f64>>>) {
    let columns = table
        .columns()
        .iter()
        .filter_map(|column| column.numbers().map(|values| (column.name().to_owned(), values)))
        .collect::<Vec<_>>();
    let matrix = columns
        .iter()
        .map(|(_, a)| columns.iter().map(|(_, b)| pearson(a, b)).collect())
        .collect();
    (columns.into_iter().map(|(name, _)| name).collect(), matrix)
}

pub fn correlation(table: &Table) -> Result<ChartImage, ChartError> {
    let chart = ChartKind::Correlation;
    let (names, matrix) = correlation_matrix(table);
    if names.is_empty() {
        return Err(ChartError::NoColumns { chart });
    }

    let mut context = RenderContext::acquire(chart, WIDTH, HEIGHT)?;
    let canvas = context.canvas();
    draw_title(canvas, chart.title());

    let n = names.len();
    let side = (canvas.height() - TITLE_BAND - 120.0).min(canvas.width() - 360.0);
    let cell = side / n as f64;
    let origin_x = 180.0;
    let origin_y = TITLE_BAND + 20.0;
    let label_style = TextStyle::sized(11.0);

    for (row, values) in matrix.iter().enumerate() {
        let y = origin_y + row as f64 * cell;
        canvas.text(
            origin_x - 8.0,
            y + cell / 2.0 + 4.0,
            &truncate_with_ellipsis(&names[row], 22),
            &label_style.clone().anchored(Anchor::End),
        );
        for (col, value) in values.iter().enumerate() {
            let x = origin_x + col as f64 * cell;
            let fill = value.map_or(UNDEFINED_FILL, |r| coolwarm((r + 1.0) / 2.0));
            canvas.rect_outlined(x, y, cell, cell, &fill.hex(), "#ffffff");
            if n <= MAX_ANNOTATED_CELLS {
                let label = value.map_or_else(|| "nan".to_owned(), |r| format!("{r:.2}"));
                canvas.text(
                    x + cell / 2.0,
                    y + cell / 2.0 + 4.0,
                    &label,
                    &TextStyle::sized(11.0).anchored(Anchor::Middle).fill(fill.label_color()),
                );
            }
        }
    }
    for (col, name) in names.iter().enumerate() {
        let x = origin_x + (col as f64 + 0.5) * cell;
        canvas.text(
            x,
            origin_y + side + 14.0,
            &truncate_with_ellipsis(name, 22),
            &label_style.clone().anchored(Anchor::End).rotated(-45.0),
        );
    }

    // Color bar from -1 (bottom) to 1 (top).
    let bar_x = origin_x + side + 40.0;
    let steps = 40;
    let step_h = side / f64::from(steps);
    for step in 0..steps {
        let t = 1.0 - (f64::from(step) + 0.5) / f64::from(steps);
        canvas.rect(bar_x, origin_y + f64::from(step) * step_h, 18.0, step_h + 0.5, &coolwarm(t).hex());
    }
    for (value, y) in [(1.0, origin_y), (0.0, origin_y + side / 2.0), (-1.0, origin_y + side)] {
        canvas.text(bar_x + 24.0, y + 4.0, &format_stat(value), &TextStyle::sized(10.0));
    }

    Ok(context.encode())
}

pub fn missing_values(table: &Table) -> Result<ChartImage, ChartError> {
    let chart = ChartKind::MissingValues;
    if table.column_count() == 0 {
        return Err(ChartError::NoColumns { chart });
    }

    let mut context = RenderContext::acquire(chart, WIDTH, HEIGHT)?;
    let canvas = context.canvas();
    draw_title(canvas, chart.title());

    let plot = PlotArea {
        x: 70.0,
        y: TITLE_BAND + 10.0,
        w: canvas.width() - 200.0,
        h: canvas.height() - TITLE_BAND - 130.0,
    };
    let rows = table.row_count();
    let columns = table.columns();
    let cell_w = plot.w / columns.len() as f64;

    canvas.text(
        plot.x - 10.0,
        plot.y + plot.h / 2.0,
        "Rows",
        &TextStyle::sized(12.0).anchored(Anchor::Middle).rotated(-90.0),
    );
    canvas.text(plot.x - 4.0, plot.y + 10.0, "0", &TextStyle::sized(10.0).anchored(Anchor::End));
    canvas.text(
        plot.x - 4.0,
        plot.bottom(),
        &rows.to_string(),
        &TextStyle::sized(10.0).anchored(Anchor::End),
    );

    if rows == 0 {
        canvas.text(
            plot.x + plot.w / 2.0,
            plot.y + plot.h / 2.0,
            "no rows",
            &TextStyle::sized(12.0).anchored(Anchor::Middle).fill(MUTED_TEXT),
        );
    }

    // Rows are grouped into bands; a band's color is the share of missing cells in it.
    let bands = rows.min(MAX_MISSING_BANDS);
    let band_h = if bands == 0 { 0.0 } else { plot.h / bands as f64 };
    for (index, column) in columns.iter().enumerate() {
        let x = plot.x + index as f64 * cell_w;
        let mut run: Option<(usize, f64)> = None;
        for band in 0..=bands {
            let share = (band < bands).then(|| {
                let start = band * rows / bands;
                let end = ((band + 1) * rows / bands).max(start + 1);
                let missing = (start..end).filter(|&row| column.is_missing(row)).count();
                missing as f64 / (end - start) as f64
            });
            // Runs of equal color are merged into a single rectangle.
            match (run, share) {
                (Some((_, current)), Some(share)) if current == share => {}
                (previous, share) => {
                    if let Some((first, value)) = previous {
                        canvas.rect(
                            x,
                            plot.y + first as f64 * band_h,
                            cell_w,
                            (band - first) as f64 * band_h,
                            &viridis(value).hex(),
                        );
                    }
                    run = share.map(|share| (band, share));
                }
            }
        }

        canvas.text(
            x + cell_w / 2.0,
            plot.bottom() + 14.0,
            &truncate_with_ellipsis(column.name(), 20),
            &TextStyle::sized(11.0).anchored(Anchor::End).rotated(-45.0),
        );
    }

    let legend_x = plot.right() + 24.0;
    for (offset, (label, color)) in [("present", viridis(0.0)), ("missing", viridis(1.0))]
        .into_iter()
        .enumerate()
    {
        let y = plot.y + offset as f64 * 24.0;
        canvas.rect_outlined(legend_x, y, 16.0, 16.0, &color.hex(), AXIS_COLOR);
        canvas.text(legend_x + 22.0, y + 12.0, label, &TextStyle::sized(11.0));
    }

    Ok(context.encode())
}

#[cfg(test)]
mod tests {
    use super::{correlation, correlation_matrix, distribution, histogram, missing_values, pearson, spread};
    use crate::chart::{ChartError, ChartKind};
    use crate::model::{Column, Table};

    fn numeric_table() -> Table {
        Table::new(vec![
            Column::numeric("height", vec![Some(150.0), Some(160.0), Some(170.0), Some(180.0)]),
            Column::numeric("weight", vec![Some(50.0), Some(58.0), Some(71.0), Some(80.0)]),
            Column::numeric("blank", vec![None, None, None, None]),
        ])
        .expect("table")
    }

    fn svg(image: &crate::chart::ChartImage) -> &str {
        std::str::from_utf8(image.bytes()).expect("utf-8 svg")
    }

    #[test]
    fn histogram_puts_max_in_last_bin() {
        let (lo, hi, counts) = histogram(&[0.0, 5.0, 10.0], 4);
        assert_eq!((lo, hi), (0.0, 10.0));
        assert_eq!(counts, vec![1, 0, 1, 1]);

        let (lo, hi, counts) = histogram(&[2.0, 2.0], 2);
        assert_eq!((lo, hi), (1.5, 2.5));
        assert_eq!(counts.iter().sum::<usize>(), 2);
    }

    #[test]
    fn numeric_stages_label_every_column() {
        let table = numeric_table();
        for image in [distribution(&table), spread(&table), correlation(&table)] {
            let image = image.expect("render");
            let svg = svg(&image);
            assert!(svg.contains("height"));
            assert!(svg.contains("weight"));
        }
    }

    #[test]
    fn numeric_stages_reject_tables_without_values() {
        let text_only = Table::new(vec![Column::text("city", vec![Some("Hue".to_owned())])])
            .expect("table");
        assert_eq!(
            distribution(&text_only),
            Err(ChartError::NoColumns { chart: ChartKind::Distribution })
        );
        assert_eq!(correlation(&text_only), Err(ChartError::NoColumns { chart: ChartKind::Correlation }));

        let blank = Table::new(vec![Column::numeric("x", vec![None, None])]).expect("table");
        assert_eq!(spread(&blank), Err(ChartError::NoValues { chart: ChartKind::Spread }));
    }

    #[test]
    fn pearson_uses_pairwise_complete_rows() {
        let a = [Some(1.0), Some(2.0), Some(3.0), None];
        let b = [Some(2.0), Some(4.0), Some(6.0), Some(100.0)];
        assert!((pearson(&a, &b).expect("r") - 1.0).abs() < 1e-12);

        let constant = [Some(1.0), Some(1.0), Some(1.0), Some(1.0)];
        assert_eq!(pearson(&a, &constant), None);
        assert_eq!(pearson(&[Some(1.0)], &[Some(2.0)]), None);
    }

    #[test]
    fn correlation_matrix_marks_blank_columns_undefined() {
        let (names, matrix) = correlation_matrix(&numeric_table());
        assert_eq!(names, vec!["height", "weight", "blank"]);
        assert_eq!(matrix[0][0], Some(1.0));
        assert!(matrix[0][1].expect("r") > 0.99);
        assert_eq!(matrix[2][0], None);
        assert!(svg(&correlation(&numeric_table()).expect("render")).contains("nan"));
    }

    #[test]
    fn missing_value_map_handles_text_and_empty_tables() {
        let table = Table::new(vec![
            Column::text("city", vec![Some("Hue".to_owned()), None]),
            Column::numeric("x", vec![None, Some(1.0)]),
        ])
        .expect("table");
        let image = missing_values(&table).expect("render");
        assert!(svg(&image).contains("city"));
        assert!(svg(&image).contains("missing"));

        let no_rows = Table::new(vec![Column::numeric("x", Vec::new())]).expect("table");
        assert!(svg(&missing_values(&no_rows).expect("render")).contains("no rows"));

        assert_eq!(
            missing_values(&Table::default()),
            Err(ChartError::NoColumns { chart: ChartKind::MissingValues })
        );
    }
}
