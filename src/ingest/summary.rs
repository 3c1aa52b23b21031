// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Edaflow-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Edaflow and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Per-column descriptive statistics and their plain-text rendering.
//!
//! The text form is what the commentary model reads, so it favours a stable, aligned layout over
//! compactness. Statistics that do not apply to a column (e.g. `mean` of a text column) and
//! statistics that cannot be computed (e.g. `std` of a single value) render as [`MISSING_MARKER`].

use std::collections::HashMap;

use crate::model::{Column, ColumnData, ColumnKind, Table};

pub const MISSING_MARKER: &str = "N/A";

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSummary {
    pub name: String,
    pub kind: ColumnKind,
    pub count: usize,
    pub missing: usize,
    pub unique: Option<usize>,
    pub top: Option<String>,
    pub freq: Option<usize>,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q25: Option<f64>,
    pub q50: Option<f64>,
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

impl ColumnSummary {
    fn empty(column: &Column) -> Self {
        Self {
            name: column.name().to_owned(),
            kind: column.kind(),
            count: column.len() - column.missing_count(),
            missing: column.missing_count(),
            unique: None,
            top: None,
            freq: None,
            mean: None,
            std: None,
            min: None,
            q25: None,
            q50: None,
            q75: None,
            max: None,
        }
    }
}

pub fn describe(table: &Table) -> Vec<ColumnSummary> {
    table.columns().iter().map(describe_column).collect()
}

pub fn describe_column(column: &Column) -> ColumnSummary {
    let mut summary = ColumnSummary::empty(column);
    match column.data() {
        ColumnData::Numeric(_) => {
            let mut values = column.present_numbers();
            values.sort_by(f64::total_cmp);
            summary.mean = mean(&values);
            summary.std = std_dev(&values);
            summary.min = values.first().copied();
            summary.q25 = quantile(&values, 0.25);
            summary.q50 = quantile(&values, 0.5);
            summary.q75 = quantile(&values, 0.75);
            summary.max = values.last().copied();
        }
        ColumnData::Text(values) => {
            // value -> (count, first row seen); ties on count go to the earliest value.
            let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
            for (row, value) in values.iter().enumerate() {
                if let Some(value) = value {
                    counts.entry(value.as_str()).or_insert((0, row)).0 += 1;
                }
            }
            summary.unique = Some(counts.len());
            if let Some((top, (freq, _))) = counts
                .iter()
                .max_by(|(_, (a_count, a_row)), (_, (b_count, b_row))| {
                    a_count.cmp(b_count).then(b_row.cmp(a_row))
                })
            {
                summary.top = Some((*top).to_owned());
                summary.freq = Some(*freq);
            }
        }
    }
    summary
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator).
pub fn std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mean = mean(values)?;
    let squares = values.iter().map(|value| (value - mean).powi(2)).sum::<f64>();
    Some((squares / (values.len() - 1) as f64).sqrt())
}

/// Linear-interpolated quantile of an ascending slice.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

pub fn format_stat(value: f64) -> String {
    if value.is_nan() {
        return MISSING_MARKER.to_owned();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_owned();
    }
    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-3..1e9).contains(&magnitude) {
        return format!("{value:.4e}");
    }
    let fixed = format!("{value:.4}");
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        "0".to_owned()
    } else {
        trimmed.to_owned()
    }
}

/// Renders one line per column, aligned, with a header row.
pub fn render_summary(summaries: &[ColumnSummary]) -> String {
    const HEADER: [&str; 14] = [
        "column", "kind", "count", "missing", "unique", "top", "freq", "mean", "std", "min", "25%",
        "50%", "75%", "max",
    ];

    let opt_count = |value: Option<usize>| value.map_or(MISSING_MARKER.to_owned(), |v| v.to_string());
    let opt_stat = |value: Option<f64>| value.map_or(MISSING_MARKER.to_owned(), format_stat);

    let rows = summaries
        .iter()
        .map(|summary| {
            vec![
                summary.name.clone(),
                summary.kind.to_string(),
                summary.count.to_string(),
                summary.missing.to_string(),
                opt_count(summary.unique),
                summary.top.clone().unwrap_or_else(|| MISSING_MARKER.to_owned()),
                opt_count(summary.freq),
                opt_stat(summary.mean),
                opt_stat(summary.std),
                opt_stat(summary.min),
                opt_stat(summary.q25),
                opt_stat(summary.q50),
                opt_stat(summary.q75),
                opt_stat(summary.max),
            ]
        })
        .collect::<Vec<_>>();

    let mut widths = HEADER.map(|cell| cell.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_row(&mut out, HEADER.iter().copied(), &widths);
    for row in &rows {
        push_row(&mut out, row.iter().map(String::as_str), &widths);
    }
    out
}

fn push_row<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>, widths: &[usize]) {
    let line = cells
        .zip(widths)
        .map(|(cell, width)| {
            let pad = width.saturating_sub(cell.chars().count());
            format!("{cell}{}", " ".repeat(pad))
        })
        .collect::<Vec<_>>()
        .join("  ");
    out.push_str(line.trim_end());
    out.push('\n');
}

/// Summary text handed to the commentary model: a short header plus the per-column table.
pub fn summary_text(table: &Table) -> String {
    format!(
        "Rows: {}\nColumns: {}\nMissing cells: {}\n\n{}",
        table.row_count(),
        table.column_count(),
        table.missing_cells(),
        render_summary(&describe(table))
    )
}
