// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Edaflow-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Edaflow and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One message of an analysis run, in the order the pipeline produced it.
///
/// On the wire the variant name becomes the `type` field (`{"type":"ai_token","text":"..."}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnalysisEvent {
    Log { message: String },
    /// `image` is a self-contained `data:` URL; it never points at session-scoped storage.
    Chart { name: String, image: String },
    StartAi,
    AiToken { text: String },
    Error { message: String },
    Done { message: String },
}

impl AnalysisEvent {
    pub fn log(message: impl Into<String>) -> Self {
        Self::Log {
            message: message.into(),
        }
    }

    pub fn chart(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self::Chart {
            name: name.into(),
            image: image.into(),
        }
    }

    pub fn ai_token(text: impl Into<String>) -> Self {
        Self::AiToken { text: text.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn done(message: impl Into<String>) -> Self {
        Self::Done {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Self::Log { .. } => EventKind::Log,
            Self::Chart { .. } => EventKind::Chart,
            Self::StartAi => EventKind::StartAi,
            Self::AiToken { .. } => EventKind::AiToken,
            Self::Error { .. } => EventKind::Error,
            Self::Done { .. } => EventKind::Done,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Log,
    Chart,
    StartAi,
    AiToken,
    Error,
    Done,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Chart => "chart",
            Self::StartAi => "start_ai",
            Self::AiToken => "ai_token",
            Self::Error => "error",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::{AnalysisEvent, EventKind};

    #[test]
    fn serializes_with_type_tag() {
        let json = serde_json::to_value(AnalysisEvent::ai_token("Hello")).expect("json");
        assert_eq!(json, serde_json::json!({"type": "ai_token", "text": "Hello"}));

        let json = serde_json::to_value(AnalysisEvent::StartAi).expect("json");
        assert_eq!(json, serde_json::json!({"type": "start_ai"}));

        let json =
            serde_json::to_value(AnalysisEvent::chart("Box plot", "data:image/svg+xml;base64,AA"))
                .expect("json");
        assert_eq!(json["type"], "chart");
        assert_eq!(json["name"], "Box plot");
        assert_eq!(json["image"], "data:image/svg+xml;base64,AA");
    }

    #[test]
    fn kind_names_match_wire_tags() {
        for event in [
            AnalysisEvent::log("x"),
            AnalysisEvent::chart("c", "i"),
            AnalysisEvent::StartAi,
            AnalysisEvent::ai_token("t"),
            AnalysisEvent::error("e"),
            AnalysisEvent::done("d"),
        ] {
            let json = serde_json::to_value(&event).expect("json");
            assert_eq!(json["type"], event.kind().as_str());
        }
        assert_eq!(EventKind::StartAi.to_string(), "start_ai");
    }

    #[test]
    fn only_done_is_terminal() {
        assert!(AnalysisEvent::done("ok").is_terminal());
        assert!(!AnalysisEvent::error("boom").is_terminal());
    }
}
