// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Edaflow-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Edaflow and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;

use tokio::time::Instant;

use crate::model::SessionId;

/// Lifecycle of one analysis run. States only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RunState {
    Init,
    Loaded,
    Charting,
    AwaitingAi,
    StreamingAi,
    Terminated,
}

impl RunState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Loaded => "loaded",
            Self::Charting => "charting",
            Self::AwaitingAi => "awaiting_ai",
            Self::StreamingAi => "streaming_ai",
            Self::Terminated => "terminated",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State machine and cleanup guard for a run.
///
/// [`PipelineRun::terminate`] runs at most once, whether it is called explicitly or from `Drop`
/// (for example when the task driving the run is aborted).
#[derive(Debug)]
pub struct PipelineRun {
    session_id: SessionId,
    state: RunState,
    reached: RunState,
    tokens: usize,
    started_at: Instant,
}

impl PipelineRun {
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            state: RunState::Init,
            reached: RunState::Init,
            tokens: 0,
            started_at: Instant::now(),
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// The last state before termination.
    pub fn reached(&self) -> RunState {
        self.reached
    }

    pub fn tokens(&self) -> usize {
        self.tokens
    }

    pub fn advance(&mut self, next: RunState) {
        if next <= self.state || next == RunState::Terminated {
            tracing::warn!(from = %self.state, to = %next, "ignored backwards run transition");
            return;
        }
        tracing::debug!(from = %self.state, to = %next, "run transition");
        self.state = next;
        self.reached = next;
    }

    pub fn record_token(&mut self) {
        self.tokens += 1;
    }

    /// Returns `true` only for the call that actually terminated the run.
    pub fn terminate(&mut self) -> bool {
        if self.state == RunState::Terminated {
            return false;
        }
        self.state = RunState::Terminated;
        tracing::info!(
            session_id = %self.session_id,
            reached = %self.reached,
            tokens = self.tokens,
            elapsed_ms = self.started_at.elapsed().as_millis() as u64,
            "analysis run terminated"
        );
        true
    }
}

impl Drop for PipelineRun {
    fn drop(&mut self) {
        self.terminate();
    }
}

#[cfg(test)]
mod tests {
    use super::{PipelineRun, RunState};
    use crate::model::SessionId;

    fn run() -> PipelineRun {
        PipelineRun::new(SessionId::new("s-1").expect("id"))
    }

    #[test]
    fn transitions_only_move_forward() {
        let mut run = run();
        run.advance(RunState::Loaded);
        run.advance(RunState::Charting);
        run.advance(RunState::Loaded);
        assert_eq!(run.state(), RunState::Charting);

        run.advance(RunState::StreamingAi);
        assert_eq!(run.state(), RunState::StreamingAi);
        run.advance(RunState::Terminated);
        assert_eq!(run.state(), RunState::StreamingAi);
    }

    #[test]
    fn terminate_is_idempotent_and_keeps_reached_state() {
        let mut run = run();
        run.advance(RunState::Loaded);
        run.record_token();
        assert!(run.terminate());
        assert!(!run.terminate());
        assert_eq!(run.state(), RunState::Terminated);
        assert_eq!(run.reached(), RunState::Loaded);
        assert_eq!(run.tokens(), 1);

        run.advance(RunState::Charting);
        assert_eq!(run.state(), RunState::Terminated);
    }
}
