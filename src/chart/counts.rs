// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Edaflow-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Edaflow and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Per-class file counts derived from dataset paths, and their bar and pie renderings.
//!
//! A path such as `train/cats/001.jpg` counts toward the class `cats`: the second `/` segment,
//! taken only from paths with more than two segments.

use std::collections::HashMap;
use std::f64::consts::{FRAC_PI_2, TAU};
use std::fmt;

use super::palette::categorical;
use super::svg::{truncate_with_ellipsis, Anchor, CanvasError, SvgCanvas, TextStyle};
use super::{ChartImage, SVG_MIME};

const CLASS_SEGMENT: usize = 1;
const BAR_TITLE: &str = "Files per class";
const PIE_TITLE: &str = "Share of files per class";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountError {
    NoPaths,
    NoGroups,
}

impl fmt::Display for CountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoPaths => f.write_str("no file paths were provided"),
            Self::NoGroups => f.write_str("no class could be derived from the file paths"),
        }
    }
}

impl std::error::Error for CountError {}

/// Counts per class in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClassCounts {
    entries: Vec<(String, usize)>,
    /// Class name to its position in `entries`.
    index: HashMap<String, usize>,
}

impl ClassCounts {
    pub fn entries(&self) -> &[(String, usize)] {
        &self.entries
    }

    pub fn get(&self, class: &str) -> Option<usize> {
        self.index.get(class).map(|&position| self.entries[position].1)
    }

    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, count)| count).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn bump(&mut self, class: &str) {
        match self.index.get(class) {
            Some(&position) => self.entries[position].1 += 1,
            None => {
                self.index.insert(class.to_owned(), self.entries.len());
                self.entries.push((class.to_owned(), 1));
            }
        }
    }
}

pub fn count_by_class(paths: &[String]) -> Result<ClassCounts, CountError> {
    if paths.is_empty() {
        return Err(CountError::NoPaths);
    }

    let mut counts = ClassCounts::default();
    for path in paths {
        let segments = path.split('/').collect::<Vec<_>>();
        if segments.len() > 2 {
            counts.bump(segments[CLASS_SEGMENT]);
        }
    }

    if counts.is_empty() {
        return Err(CountError::NoGroups);
    }
    Ok(counts)
}

pub fn render_bar_chart(counts: &ClassCounts) -> Result<ChartImage, CanvasError> {
    let mut canvas = SvgCanvas::new(960, 600)?;
    let colors = categorical(counts.len());
    let title_x = canvas.width() / 2.0;
    canvas.text(title_x, 30.0, BAR_TITLE, &TextStyle::sized(18.0).anchored(Anchor::Middle).bold());

    let (x0, y0, w, h) = (80.0, 60.0, canvas.width() - 120.0, canvas.height() - 170.0);
    canvas.line(x0, y0 + h, x0 + w, y0 + h, "#444444", 1.0);
    canvas.line(x0, y0, x0, y0 + h, "#444444", 1.0);
    canvas.text(24.0, y0 + h / 2.0, "Files", &TextStyle::sized(12.0).anchored(Anchor::Middle).rotated(-90.0));
    canvas.text(x0 + w / 2.0, canvas.height() - 12.0, "Class", &TextStyle::sized(12.0).anchored(Anchor::Middle));

    let max = counts.entries().iter().map(|(_, count)| *count).max().unwrap_or(1).max(1);
    let slot = w / counts.len().max(1) as f64;
    let bar_w = slot * 0.7;
    for (index, ((class, count), color)) in counts.entries().iter().zip(&colors).enumerate() {
        let bar_h = h * *count as f64 / max as f64;
        let x = x0 + slot * index as f64 + (slot - bar_w) / 2.0;
        canvas.rect(x, y0 + h - bar_h, bar_w, bar_h, &color.hex());
        canvas.text(
            x + bar_w / 2.0,
            y0 + h - bar_h - 4.0,
            &count.to_string(),
            &TextStyle::sized(11.0).anchored(Anchor::Middle),
        );
        canvas.text(
            x + bar_w / 2.0,
            y0 + h + 16.0,
            &truncate_with_ellipsis(class, 18),
            &TextStyle::sized(11.0).anchored(Anchor::End).rotated(-30.0),
        );
    }

    Ok(ChartImage::new(SVG_MIME, canvas.finish().into_bytes()))
}

fn wedge_path(cx: f64, cy: f64, r: f64, start: f64, end: f64) -> String {
    let point = |angle: f64| (cx + r * angle.cos(), cy + r * angle.sin());
    let (sx, sy) = point(start);
    let (ex, ey) = point(end);
    let large_arc = u8::from(end - start > std::f64::consts::PI);
    format!("M {cx:.2} {cy:.2} L {sx:.2} {sy:.2} A {r:.2} {r:.2} 0 {large_arc} 1 {ex:.2} {ey:.2} Z")
}

pub fn render_pie_chart(counts: &ClassCounts) -> Result<ChartImage, CanvasError> {
    let mut canvas = SvgCanvas::new(800, 600)?;
    let colors = categorical(counts.len());
    canvas.text(300.0, 30.0, PIE_TITLE, &TextStyle::sized(18.0).anchored(Anchor::Middle).bold());

    let (cx, cy, r) = (300.0, 320.0, 230.0);
    let total = counts.total().max(1) as f64;
    // Wedges start at twelve o'clock and run clockwise.
    let mut angle = -FRAC_PI_2;
    for ((_, count), color) in counts.entries().iter().zip(&colors) {
        let share = *count as f64 / total;
        let sweep = share * TAU;
        if counts.len() == 1 {
            canvas.circle(cx, cy, r, &color.hex());
        } else {
            canvas.path(&wedge_path(cx, cy, r, angle, angle + sweep), &color.hex(), "#ffffff");
        }
        let middle = angle + sweep / 2.0;
        canvas.text(
            cx + r * 0.65 * middle.cos(),
            cy + r * 0.65 * middle.sin() + 4.0,
            &format!("{:.1}%", share * 100.0),
            &TextStyle::sized(12.0).anchored(Anchor::Middle).fill(color.label_color()),
        );
        angle += sweep;
    }

    let legend_x = 580.0;
    canvas.text(legend_x, 110.0, "Class", &TextStyle::sized(13.0).bold());
    for (index, ((class, count), color)) in counts.entries().iter().zip(&colors).enumerate() {
        let y = 124.0 + index as f64 * 22.0;
        canvas.rect(legend_x, y, 14.0, 14.0, &color.hex());
        canvas.text(
            legend_x + 20.0,
            y + 11.0,
            &format!("{} ({count})", truncate_with_ellipsis(class, 20)),
            &TextStyle::sized(11.0),
        );
    }

    Ok(ChartImage::new(SVG_MIME, canvas.finish().into_bytes()))
}
