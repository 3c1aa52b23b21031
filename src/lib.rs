// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Edaflow-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Edaflow and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Edaflow: streaming exploratory data analysis over HTTP.
//!
//! A client uploads a CSV file, then opens an event stream for the returned session and receives
//! progress logs, chart images and AI commentary in order, ending with a single `done` event.

pub mod chart;
pub mod commentary;
pub mod config;
pub mod ingest;
pub mod model;
pub mod pipeline;
pub mod server;
pub mod store;
