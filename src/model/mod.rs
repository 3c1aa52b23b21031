// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Edaflow-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Edaflow and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Core data types shared by the store, the pipeline and the HTTP surface.

pub mod event;
pub mod ids;
pub mod table;

pub use event::{AnalysisEvent, EventKind};
pub use ids::{Id, IdError, SessionId};
pub use table::{Column, ColumnData, ColumnKind, Table, TableError};
