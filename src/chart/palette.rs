// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Edaflow-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Edaflow and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }

    /// Relative luminance in 0..=1, used to pick a readable label color on top of a fill.
    pub fn luminance(self) -> f64 {
        (0.2126 * f64::from(self.0) + 0.7152 * f64::from(self.1) + 0.0722 * f64::from(self.2))
            / 255.0
    }

    pub fn label_color(self) -> &'static str {
        if self.luminance() > 0.55 {
            "#111111"
        } else {
            "#ffffff"
        }
    }
}

const VIRIDIS: [Rgb; 9] = [
    Rgb(68, 1, 84),
    Rgb(71, 44, 122),
    Rgb(59, 81, 139),
    Rgb(44, 113, 142),
    Rgb(33, 144, 141),
    Rgb(39, 173, 129),
    Rgb(92, 200, 99),
    Rgb(170, 220, 50),
    Rgb(253, 231, 37),
];

const COOLWARM: [Rgb; 5] = [
    Rgb(59, 76, 192),
    Rgb(141, 176, 254),
    Rgb(221, 221, 221),
    Rgb(244, 154, 123),
    Rgb(180, 4, 38),
];

pub const BAR_FILL: Rgb = Rgb(31, 119, 180);
pub const UNDEFINED_FILL: Rgb = Rgb(200, 200, 200);

fn interpolate(stops: &[Rgb], t: f64) -> Rgb {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    let scaled = t * (stops.len() - 1) as f64;
    let index = (scaled.floor() as usize).min(stops.len() - 2);
    let fraction = scaled - index as f64;
    let (a, b) = (stops[index], stops[index + 1]);
    let mix = |x: u8, y: u8| (f64::from(x) + (f64::from(y) - f64::from(x)) * fraction).round() as u8;
    Rgb(mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}

/// Sequential palette, dark purple at 0 to yellow at 1.
pub fn viridis(t: f64) -> Rgb {
    interpolate(&VIRIDIS, t)
}

/// Diverging palette, blue at 0, grey at 0.5, red at 1.
pub fn coolwarm(t: f64) -> Rgb {
    interpolate(&COOLWARM, t)
}

/// `count` colors spread evenly over viridis, skipping the near-black and near-white ends.
pub fn categorical(count: usize) -> Vec<Rgb> {
    match count {
        0 => Vec::new(),
        1 => vec![viridis(0.5)],
        _ => (0..count)
            .map(|index| viridis(0.1 + 0.8 * index as f64 / (count - 1) as f64))
            .collect(),
    }
}
