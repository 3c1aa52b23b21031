// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Edaflow-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Edaflow and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! HTTP surface.
//!
//! | route | purpose |
//! |---|---|
//! | `POST /start_analysis` | stage a multipart upload, answer with a session id |
//! | `GET /analysis_stream/{session_id}` | run the analysis, stream events as SSE |
//! | `POST /draw_chart` | bar chart of file counts per class |
//! | `POST /draw_pie_chart` | pie chart of file counts per class |
//! | `GET /healthz` | liveness and staged session count |

use std::future::Future;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;

use crate::pipeline::Pipeline;
use crate::store::SessionStore;

pub mod error;
pub mod routes;
pub mod stream;


pub use error::ApiError;

/// Room for multipart boundaries and headers on top of the payload limit.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct AppState {
    store: Arc<SessionStore>,
    pipeline: Pipeline,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            store: Arc::clone(pipeline.store()),
            pipeline,
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }
}

pub fn router(state: AppState) -> Router {
    let body_limit = state
        .store
        .config()
        .max_payload_bytes
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route("/start_analysis", post(routes::start_analysis))
        .route("/analysis_stream/{session_id}", get(routes::analysis_stream))
        .route("/draw_chart", post(routes::draw_chart))
        .route("/draw_pie_chart", post(routes::draw_pie_chart))
        .route("/healthz", get(routes::healthz))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "listening");
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}
