// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Edaflow-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Edaflow and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Chart rendering.
//!
//! Charts are rendered to SVG and shipped as self-contained `data:` URLs, so a client can display
//! them long after the session that produced them is gone. Each chart gets its own
//! [`RenderContext`]; nothing is shared between renders, so stages can never observe each other's
//! drawing state.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::model::Table;

pub mod counts;
pub mod palette;
pub mod stages;
pub mod svg;

pub use counts::{count_by_class, render_bar_chart, render_pie_chart, ClassCounts, CountError};
pub use svg::{CanvasError, SvgCanvas};

pub const SVG_MIME: &str = "image/svg+xml";

/// The chart stages of an analysis run, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartKind {
    Distribution,
    Spread,
    Correlation,
    MissingValues,
}

impl ChartKind {
    /// Stages that only look at numeric columns.
    pub const NUMERIC: [ChartKind; 3] = [Self::Distribution, Self::Spread, Self::Correlation];

    pub fn title(self) -> &'static str {
        match self {
            Self::Distribution => "Distribution of numeric columns",
            Self::Spread => "Box plot of numeric columns",
            Self::Correlation => "Correlation matrix",
            Self::MissingValues => "Missing values map",
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            Self::Distribution => "distribution",
            Self::Spread => "spread",
            Self::Correlation => "correlation",
            Self::MissingValues => "missing_values",
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// An encoded chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartImage {
    mime: &'static str,
    bytes: Vec<u8>,
}

impl ChartImage {
    pub fn new(mime: &'static str, bytes: Vec<u8>) -> Self {
        Self { mime, bytes }
    }

    pub fn mime(&self) -> &'static str {
        self.mime
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartError {
    NoColumns { chart: ChartKind },
    NoValues { chart: ChartKind },
    Canvas { chart: ChartKind, source: CanvasError },
    Unavailable { chart: ChartKind, reason: String },
}

impl fmt::Display for ChartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoColumns { chart } => write!(f, "{chart}: no columns to plot"),
            Self::NoValues { chart } => write!(f, "{chart}: every value is missing"),
            Self::Canvas { chart, source } => write!(f, "{chart}: {source}"),
            Self::Unavailable { chart, reason } => write!(f, "{chart}: {reason}"),
        }
    }
}

impl std::error::Error for ChartError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Canvas { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Renders one chart stage. Implementations must be side-effect free.
pub trait ChartRenderer: Send + Sync {
    fn render(&self, kind: ChartKind, table: &Table) -> Result<ChartImage, ChartError>;
}

/// The built-in SVG renderer.
#[derive(Debug, Clone, Copy, Default)]
pub struct SvgChartRenderer;

impl ChartRenderer for SvgChartRenderer {
    fn render(&self, kind: ChartKind, table: &Table) -> Result<ChartImage, ChartError> {
        match kind {
            ChartKind::Distribution => stages::distribution(table),
            ChartKind::Spread => stages::spread(table),
            ChartKind::Correlation => stages::correlation(table),
            ChartKind::MissingValues => stages::missing_values(table),
        }
    }
}

/// Exclusive drawing surface for a single chart, released by [`RenderContext::encode`].
#[derive(Debug)]
pub struct RenderContext {
    chart: ChartKind,
    canvas: SvgCanvas,
}

impl RenderContext {
    pub fn acquire(chart: ChartKind, width: u32, height: u32) -> Result<Self, ChartError> {
        let canvas =
            SvgCanvas::new(width, height).map_err(|source| ChartError::Canvas { chart, source })?;
        Ok(Self { chart, canvas })
    }

    pub fn chart(&self) -> ChartKind {
        self.chart
    }

    pub fn canvas(&mut self) -> &mut SvgCanvas {
        &mut self.canvas
    }

    pub fn encode(self) -> ChartImage {
        ChartImage::new(SVG_MIME, self.canvas.finish().into_bytes())
    }
}
