// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Edaflow-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Edaflow and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Ephemeral storage for uploads between `POST /start_analysis` and the stream request.
//!
//! Uploads live in memory only; nothing is staged on disk and nothing survives a restart.

pub mod session_store;

pub use session_store::{
    SessionStore, SessionStoreConfig, StagedUpload, StoreError, DEFAULT_MAX_PAYLOAD_BYTES,
    DEFAULT_SESSION_TTL,
};
