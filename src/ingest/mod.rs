// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Edaflow-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Edaflow and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Turning uploaded bytes into a [`crate::model::Table`] and describing it.

pub mod loader;
pub mod summary;

pub use loader::{
    decode_text, CsvLoader, ExcelLoader, LoadError, TabularLoader, TextEncoding, UploadLoader,
};
pub use summary::{describe, render_summary, summary_text, ColumnSummary, MISSING_MARKER};
