// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Edaflow-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Edaflow and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Streaming AI commentary.
//!
//! A [`CommentaryClient`] turns a prompt into a finite, ordered stream of text fragments. The
//! stream yields at most one error, after which it ends.

use std::fmt;
use std::time::Duration;

use futures::stream::BoxStream;

pub mod ollama;
pub mod prompt;

pub use ollama::{OllamaClient, OllamaConfig};
pub use prompt::{build_prompt, DEFAULT_LANGUAGE};

pub type TokenStream = BoxStream<'static, Result<String, CommentaryError>>;

#[derive(Debug)]
pub enum CommentaryError {
    /// The backend could not be reached or the connection broke mid-stream.
    Request { source: reqwest::Error },
    /// The backend answered with a non-success status.
    Status { status: u16, message: String },
    /// A streamed frame was not valid JSON of the expected shape.
    Decode { source: serde_json::Error },
    /// The backend reported an error in-band.
    Backend { message: String },
    /// Nothing arrived from the backend for the configured idle period.
    Timeout { idle: Duration },
    /// A frame grew past the size limit without a line terminator.
    FrameTooLong { limit: usize },
}

impl fmt::Display for CommentaryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request { source } => write!(f, "commentary request failed: {source}"),
            Self::Status { status, message } => {
                write!(f, "commentary backend returned status {status}: {message}")
            }
            Self::Decode { source } => write!(f, "invalid commentary frame: {source}"),
            Self::Backend { message } => write!(f, "commentary backend error: {message}"),
            Self::Timeout { idle } => write!(
                f,
                "commentary backend sent nothing for {} seconds",
                idle.as_secs_f64()
            ),
            Self::FrameTooLong { limit } => {
                write!(f, "commentary frame exceeds {limit} bytes without a newline")
            }
        }
    }
}

impl std::error::Error for CommentaryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Request { source } => Some(source),
            Self::Decode { source } => Some(source),
            Self::Status { .. }
            | Self::Backend { .. }
            | Self::Timeout { .. }
            | Self::FrameTooLong { .. } => None,
        }
    }
}

impl From<reqwest::Error> for CommentaryError {
    fn from(source: reqwest::Error) -> Self {
        Self::Request { source }
    }
}

impl From<serde_json::Error> for CommentaryError {
    fn from(source: serde_json::Error) -> Self {
        Self::Decode { source }
    }
}

/// Produces commentary for a prompt.
///
/// Implementations must not block; all I/O happens while the returned stream is polled.
pub trait CommentaryClient: Send + Sync {
    fn stream(&self, prompt: String) -> TokenStream;
}
