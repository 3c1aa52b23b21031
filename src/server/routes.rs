// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Edaflow-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Edaflow and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::stream::sse_response;
use super::{ApiError, AppState};
use crate::chart::{count_by_class, render_bar_chart, render_pie_chart, ChartImage, ClassCounts};
use crate::model::{AnalysisEvent, SessionId};
use crate::pipeline::{EventStream, DONE_MESSAGE};

const FILE_FIELD: &str = "file";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartAnalysisResponse {
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DrawChartRequest {
    #[serde(default)]
    pub file_paths: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartResponse {
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub sessions: usize,
}

pub async fn start_analysis(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<StartAnalysisResponse>, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().trim().to_owned();
        if filename.is_empty() {
            return Err(ApiError::NoFileSelected);
        }
        let payload = field.bytes().await?;
        let session_id = state.store().put(payload.to_vec(), filename.as_str())?;
        tracing::info!(session_id = %session_id, filename = %filename, bytes = payload.len(), "upload staged");
        return Ok(Json(StartAnalysisResponse {
            session_id: session_id.into_string(),
        }));
    }
    Err(ApiError::MissingFile)
}

pub async fn analysis_stream(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let events = match SessionId::new(session_id) {
        Ok(session_id) => state.pipeline().spawn(session_id).events,
        Err(err) => EventStream::from_events(vec![
            AnalysisEvent::error(format!("invalid session id: {err}")),
            AnalysisEvent::done(DONE_MESSAGE),
        ]),
    };
    sse_response(events)
}

fn class_counts(body: Result<Json<DrawChartRequest>, JsonRejection>) -> Result<ClassCounts, ApiError> {
    let Json(request) = body?;
    Ok(count_by_class(&request.file_paths)?)
}

fn chart_response(image: ChartImage) -> Json<ChartResponse> {
    Json(ChartResponse {
        image: image.to_data_url(),
    })
}

pub async fn draw_chart(
    body: Result<Json<DrawChartRequest>, JsonRejection>,
) -> Result<Json<ChartResponse>, ApiError> {
    let counts = class_counts(body)?;
    Ok(chart_response(render_bar_chart(&counts)?))
}

pub async fn draw_pie_chart(
    body: Result<Json<DrawChartRequest>, JsonRejection>,
) -> Result<Json<ChartResponse>, ApiError> {
    let counts = class_counts(body)?;
    Ok(chart_response(render_pie_chart(&counts)?))
}

pub async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_owned(),
        sessions: state.store().len(),
    })
}
