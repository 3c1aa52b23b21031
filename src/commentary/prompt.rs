// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Edaflow-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Edaflow and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

pub const DEFAULT_LANGUAGE: &str = "English";

/// The commentary prompt for a rendered dataset summary.
pub fn build_prompt(summary: &str, language: &str) -> String {
    let language = match language.trim() {
        "" => DEFAULT_LANGUAGE,
        language => language,
    };
    format!(
        "You are a data analysis expert.\n\
         Read the following summary and write 8 to 10 observations in {language}, covering:\n\
         - Notable characteristics\n\
         - Main trends\n\
         - Columns with missing values, outliers, or unusual differences\n\
         - Notable correlations\n\
         Answer entirely in {language}.\n\
         \n\
         {summary}\n"
    )
}
