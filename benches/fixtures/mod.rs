// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Edaflow-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Edaflow and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

// Deterministic CSV fixtures (no RNG).

use std::fmt::Write as _;

#[derive(Debug, Clone, Copy)]
pub enum Case {
    Small,
    Medium,
    Wide,
}

impl Case {
    pub const ALL: [Case; 3] = [Case::Small, Case::Medium, Case::Wide];

    pub fn id(self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Wide => "wide",
        }
    }

    fn shape(self) -> (usize, usize) {
        match self {
            Self::Small => (200, 4),
            Self::Medium => (20_000, 6),
            Self::Wide => (2_000, 24),
        }
    }
}

/// A CSV with `numeric` columns of mixed scale, a text column, and a missing cell every 17th row
/// per column (staggered).
pub fn csv(case: Case) -> Vec<u8> {
    let (rows, numeric) = case.shape();
    let mut out = String::new();
    for column in 0..numeric {
        let _ = write!(out, "metric_{column},");
    }
    out.push_str("label\n");

    for row in 0..rows {
        for column in 0..numeric {
            if (row + column * 5) % 17 != 0 {
                // A cheap integer hash keeps values spread without an RNG.
                let mixed = (row as u64).wrapping_mul(2_654_435_761).wrapping_add(column as u64 * 97);
                let value = (mixed % 10_000) as f64 / 100.0 * (column + 1) as f64;
                let _ = write!(out, "{value:.2}");
            }
            out.push(',');
        }
        let _ = writeln!(out, "group_{}", row % 7);
    }
    out.into_bytes()
}
