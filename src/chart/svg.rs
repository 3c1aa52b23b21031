// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Edaflow-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Edaflow and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Anchor {
    #[default]
    Start,
    Middle,
    End,
}

impl Anchor {
    fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Middle => "middle",
            Self::End => "end",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub size: f64,
    pub anchor: Anchor,
    pub fill: String,
    pub bold: bool,
    pub rotate: Option<f64>,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            size: 12.0,
            anchor: Anchor::Start,
            fill: "#222222".to_owned(),
            bold: false,
            rotate: None,
        }
    }
}

impl TextStyle {
    pub fn sized(size: f64) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }

    pub fn anchored(mut self, anchor: Anchor) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn fill(mut self, fill: impl Into<String>) -> Self {
        self.fill = fill.into();
        self
    }

    pub fn rotated(mut self, degrees: f64) -> Self {
        self.rotate = Some(degrees);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanvasError {
    ZeroArea { width: u32, height: u32 },
}

impl fmt::Display for CanvasError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroArea { width, height } => {
                write!(f, "canvas must have a non-zero area, got {width}x{height}")
            }
        }
    }
}

impl std::error::Error for CanvasError {}

/// An append-only SVG document of fixed size.
///
/// Shapes are emitted in call order, so later calls paint over earlier ones.
#[derive(Debug, Clone, PartialEq)]
pub struct SvgCanvas {
    width: u32,
    height: u32,
    body: String,
}

impl SvgCanvas {
    pub fn new(width: u32, height: u32) -> Result<Self, CanvasError> {
        if width == 0 || height == 0 {
            return Err(CanvasError::ZeroArea { width, height });
        }
        let mut canvas = Self {
            width,
            height,
            body: String::new(),
        };
        canvas.rect(0.0, 0.0, f64::from(width), f64::from(height), "#ffffff");
        Ok(canvas)
    }

    pub fn width(&self) -> f64 {
        f64::from(self.width)
    }

    pub fn height(&self) -> f64 {
        f64::from(self.height)
    }

    pub fn rect(&mut self, x: f64, y: f64, width: f64, height: f64, fill: &str) {
        self.body.push_str(&format!(
            r#"<rect x="{}" y="{}" width="{}" height="{}" fill="{}"/>"#,
            num(x),
            num(y),
            num(width.max(0.0)),
            num(height.max(0.0)),
            escape_xml(fill)
        ));
    }

    pub fn rect_outlined(&mut self, x: f64, y: f64, width: f64, height: f64, fill: &str, stroke: &str) {
        self.body.push_str(&format!(
            r#"<rect x="{}" y="{}" width="{}" height="{}" fill="{}" stroke="{}" stroke-width="1"/>"#,
            num(x),
            num(y),
            num(width.max(0.0)),
            num(height.max(0.0)),
            escape_xml(fill),
            escape_xml(stroke)
        ));
    }

    pub fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, stroke: &str, stroke_width: f64) {
        self.body.push_str(&format!(
            r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-width="{}"/>"#,
            num(x1),
            num(y1),
            num(x2),
            num(y2),
            escape_xml(stroke),
            num(stroke_width)
        ));
    }

    pub fn circle(&mut self, cx: f64, cy: f64, r: f64, fill: &str) {
        self.body.push_str(&format!(
            r#"<circle cx="{}" cy="{}" r="{}" fill="{}"/>"#,
            num(cx),
            num(cy),
            num(r),
            escape_xml(fill)
        ));
    }

    /// Raw path data (`d` attribute); callers build it from numbers only.
    pub fn path(&mut self, d: &str, fill: &str, stroke: &str) {
        self.body.push_str(&format!(
            r#"<path d="{}" fill="{}" stroke="{}" stroke-width="1"/>"#,
            escape_xml(d),
            escape_xml(fill),
            escape_xml(stroke)
        ));
    }

    pub fn text(&mut self, x: f64, y: f64, content: &str, style: &TextStyle) {
        let transform = style
            .rotate
            .map(|degrees| format!(r#" transform="rotate({} {} {})""#, num(degrees), num(x), num(y)))
            .unwrap_or_default();
        let weight = if style.bold { r#" font-weight="bold""# } else { "" };
        self.body.push_str(&format!(
            r#"<text x="{}" y="{}" font-family="sans-serif" font-size="{}" text-anchor="{}" fill="{}"{weight}{transform}>{}</text>"#,
            num(x),
            num(y),
            num(style.size),
            style.anchor.as_str(),
            escape_xml(&style.fill),
            escape_xml(content)
        ));
    }

    pub fn finish(self) -> String {
        format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">{body}</svg>"#,
            w = self.width,
            h = self.height,
            body = self.body
        )
    }
}

/// Coordinates are written with one decimal; non-finite values collapse to 0.
fn num(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_owned();
    }
    let fixed = format!("{value:.1}");
    match fixed.strip_suffix(".0") {
        Some(whole) if whole != "-0" => whole.to_owned(),
        Some(_) => "0".to_owned(),
        None => fixed,
    }
}

pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            // Control characters are not allowed in XML 1.0 text.
            ch if ch.is_control() && !matches!(ch, '\n' | '\t') => {}
            ch => out.push(ch),
        }
    }
    out
}

pub fn truncate_with_ellipsis(text: &str, max_len: usize) -> String {
    if max_len == 0 {
        return String::new();
    }

    if text.chars().count() <= max_len {
        return text.to_owned();
    }

    if max_len == 1 {
        return "…".to_owned();
    }

    let mut out: String = text.chars().take(max_len - 1).collect();
    out.push('…');
    out
}
