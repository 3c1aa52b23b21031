// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Edaflow-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Edaflow and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! The analysis run: staged upload in, ordered events out.
//!
//! A run consumes its session, loads the table, renders the chart stages one after another,
//! and streams AI commentary. Whatever happens, the last event is a single `done` (unless the
//! subscriber is already gone) and the run guard terminates exactly once.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt as _;
use tokio::task::JoinHandle;
use tracing::Instrument as _;

use crate::chart::{ChartKind, ChartRenderer, SvgChartRenderer};
use crate::commentary::{build_prompt, CommentaryClient, CommentaryError, DEFAULT_LANGUAGE};
use crate::config::Pacing;
use crate::ingest::{summary_text, LoadError, TabularLoader, UploadLoader};
use crate::model::{AnalysisEvent, SessionId, Table};
use crate::store::{SessionStore, StoreError};

pub mod run;
pub mod transport;


pub use run::{PipelineRun, RunState};
pub use transport::{channel, Disconnected, EventSink, EventStream};

pub const EVENT_CHANNEL_CAPACITY: usize = 64;
pub const DONE_MESSAGE: &str = "Analysis complete!";

pub const READING_MESSAGE: &str = "Reading uploaded data...";
pub const PREPARING_AI_MESSAGE: &str = "Preparing data for AI...";
pub const GENERATING_AI_MESSAGE: &str = "Generating AI commentary...";

#[derive(Debug)]
pub enum PipelineError {
    Session(StoreError),
    Load(LoadError),
    Commentary(CommentaryError),
    Worker(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Session(err) => write!(f, "{err}"),
            Self::Load(err) => write!(f, "could not read the uploaded file: {err}"),
            Self::Commentary(err) => write!(f, "{err}"),
            Self::Worker(reason) => write!(f, "analysis worker failed: {reason}"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Session(err) => Some(err),
            Self::Load(err) => Some(err),
            Self::Commentary(err) => Some(err),
            Self::Worker(_) => None,
        }
    }
}

/// Why a run stopped early.
enum Abort {
    Failed(PipelineError),
    Disconnected,
}

impl From<PipelineError> for Abort {
    fn from(err: PipelineError) -> Self {
        Self::Failed(err)
    }
}

impl From<Disconnected> for Abort {
    fn from(_: Disconnected) -> Self {
        Self::Disconnected
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Failed,
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub outcome: RunOutcome,
    /// Last state before the guard terminated the run.
    pub reached: RunState,
    pub tokens: usize,
}

#[derive(Debug)]
pub struct SpawnedRun {
    pub events: EventStream,
    pub task: JoinHandle<RunReport>,
}

#[derive(Clone)]
pub struct Pipeline {
    store: Arc<SessionStore>,
    loader: Arc<dyn TabularLoader>,
    charts: Arc<dyn ChartRenderer>,
    commentary: Arc<dyn CommentaryClient>,
    pacing: Pacing,
    language: String,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("sessions", &self.store.len())
            .field("pacing", &self.pacing)
            .field("language", &self.language)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    pub fn new(store: Arc<SessionStore>, commentary: Arc<dyn CommentaryClient>) -> Self {
        Self {
            store,
            loader: Arc::new(UploadLoader),
            charts: Arc::new(SvgChartRenderer),
            commentary,
            pacing: Pacing::default(),
            language: DEFAULT_LANGUAGE.to_owned(),
        }
    }

    pub fn with_loader(mut self, loader: Arc<dyn TabularLoader>) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_charts(mut self, charts: Arc<dyn ChartRenderer>) -> Self {
        self.charts = charts;
        self
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Starts a run on its own task and hands back the receiving end of its events.
    pub fn spawn(&self, session_id: SessionId) -> SpawnedRun {
        let (sink, events) = channel(EVENT_CHANNEL_CAPACITY);
        let pipeline = self.clone();
        let span = tracing::info_span!("analysis", session_id = %session_id);
        let task = tokio::spawn(async move { pipeline.run(&session_id, &sink).await }.instrument(span));
        SpawnedRun { events, task }
    }

    pub async fn run(&self, session_id: &SessionId, sink: &EventSink) -> RunReport {
        let mut run = PipelineRun::new(session_id.clone());
        let outcome = match self.drive(&mut run, sink).await {
            Ok(()) => RunOutcome::Completed,
            Err(Abort::Failed(err)) => {
                tracing::warn!(error = %err, state = %run.state(), "analysis run failed");
                match sink.emit(AnalysisEvent::error(err.to_string())).await {
                    Ok(()) => RunOutcome::Failed,
                    Err(Disconnected) => RunOutcome::Disconnected,
                }
            }
            Err(Abort::Disconnected) => RunOutcome::Disconnected,
        };

        let outcome = match outcome {
            RunOutcome::Disconnected => {
                tracing::info!(state = %run.state(), "subscriber disconnected");
                outcome
            }
            _ => match sink.emit(AnalysisEvent::done(DONE_MESSAGE)).await {
                Ok(()) => outcome,
                Err(Disconnected) => RunOutcome::Disconnected,
            },
        };

        run.terminate();
        RunReport {
            outcome,
            reached: run.reached(),
            tokens: run.tokens(),
        }
    }

    async fn drive(&self, run: &mut PipelineRun, sink: &EventSink) -> Result<(), Abort> {
        let upload = self
            .store
            .take(run.session_id())
            .map_err(PipelineError::Session)?;

        sink.emit(AnalysisEvent::log(READING_MESSAGE)).await?;
        self.pause(self.pacing.before_load, sink).await?;

        let loader = Arc::clone(&self.loader);
        let table = tokio::task::spawn_blocking(move || {
            let (filename, payload) = upload.into_parts();
            loader.load(&filename, &payload)
        })
        .await
        .map_err(|err| PipelineError::Worker(err.to_string()))?
        .map_err(PipelineError::Load)?;
        let table = Arc::new(table);
        run.advance(RunState::Loaded);
        tracing::info!(rows = table.row_count(), columns = table.column_count(), "table loaded");
        sink.emit(AnalysisEvent::log(format!(
            "Data loaded successfully: {} rows, {} columns. Starting analysis...",
            table.row_count(),
            table.column_count()
        )))
        .await?;

        run.advance(RunState::Charting);
        let numeric = Arc::new(table.select(&table.numeric_column_names()));
        if numeric.column_count() > 0 {
            for kind in ChartKind::NUMERIC {
                self.chart_stage(kind, Arc::clone(&numeric), sink).await?;
            }
        } else {
            tracing::debug!("no numeric columns, skipping numeric charts");
        }
        self.chart_stage(ChartKind::MissingValues, Arc::clone(&table), sink).await?;

        sink.emit(AnalysisEvent::log(PREPARING_AI_MESSAGE)).await?;
        run.advance(RunState::AwaitingAi);
        let prompt = build_prompt(&summary_text(&table), &self.language);
        sink.emit(AnalysisEvent::StartAi).await?;
        sink.emit(AnalysisEvent::log(GENERATING_AI_MESSAGE)).await?;

        run.advance(RunState::StreamingAi);
        let mut tokens = self.commentary.stream(prompt);
        loop {
            // Dropping `tokens` on disconnect cancels the backend request.
            let next = tokio::select! {
                biased;
                () = sink.closed() => return Err(Abort::Disconnected),
                next = tokens.next() => next,
            };
            match next {
                None => break,
                Some(Ok(text)) => {
                    run.record_token();
                    sink.emit(AnalysisEvent::ai_token(text)).await?;
                    self.pause(self.pacing.after_token, sink).await?;
                }
                Some(Err(err)) => return Err(PipelineError::Commentary(err).into()),
            }
        }
        Ok(())
    }

    /// Renders one chart. A failing stage degrades to a `log` event.
    async fn chart_stage(
        &self,
        kind: ChartKind,
        table: Arc<Table>,
        sink: &EventSink,
    ) -> Result<(), Abort> {
        self.pause(self.pacing.before_chart, sink).await?;

        let charts = Arc::clone(&self.charts);
        let rendered = tokio::task::spawn_blocking(move || charts.render(kind, &table))
            .await
            .map_err(|err| err.to_string())
            .and_then(|result| result.map_err(|err| err.to_string()));

        let event = match rendered {
            Ok(image) => {
                tracing::debug!(chart = kind.slug(), bytes = image.bytes().len(), "chart rendered");
                AnalysisEvent::chart(kind.title(), image.to_data_url())
            }
            Err(reason) => {
                tracing::warn!(chart = kind.slug(), error = %reason, "chart stage failed");
                AnalysisEvent::log(format!("Could not draw chart: {reason}"))
            }
        };
        sink.emit(event).await?;
        Ok(())
    }

    async fn pause(&self, delay: Duration, sink: &EventSink) -> Result<(), Abort> {
        if delay.is_zero() {
            return Ok(());
        }
        tokio::select! {
            () = sink.closed() => Err(Abort::Disconnected),
            () = tokio::time::sleep(delay) => Ok(()),
        }
    }
}
