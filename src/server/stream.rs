// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Edaflow-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Edaflow and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Server-sent event framing for analysis events.
//!
//! Each event becomes one message: `event: <kind>`, `id: <seq>` and a JSON `data` line holding the
//! event fields plus `seq` and `timestamp_ms`. Sequence numbers start at 1 per stream.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{Stream, StreamExt as _};

use crate::model::AnalysisEvent;
use crate::pipeline::EventStream;

pub const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

/// The JSON payload of one message.
pub fn envelope(seq: u64, event: &AnalysisEvent) -> Result<serde_json::Value, serde_json::Error> {
    let mut data = serde_json::to_value(event)?;
    if let Some(fields) = data.as_object_mut() {
        fields.insert("seq".to_owned(), seq.into());
        fields.insert("timestamp_ms".to_owned(), now_millis().into());
    }
    Ok(data)
}

pub fn encode(seq: u64, event: &AnalysisEvent) -> Result<Event, serde_json::Error> {
    let data = envelope(seq, event)?;
    Ok(Event::default()
        .event(event.kind().as_str())
        .id(seq.to_string())
        .data(data.to_string()))
}

pub fn sse_response(
    events: EventStream,
) -> Sse<impl Stream<Item = Result<Event, serde_json::Error>> + Send + 'static> {
    let messages = events
        .into_stream()
        .enumerate()
        .map(|(index, event)| encode(index as u64 + 1, &event));
    Sse::new(messages).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL).text("keep-alive"))
}

#[cfg(test)]
mod tests {
    use axum::response::IntoResponse as _;

    use super::{envelope, sse_response};
    use crate::model::AnalysisEvent;
    use crate::pipeline::EventStream;

    #[test]
    fn envelope_adds_sequence_and_timestamp() {
        let data = envelope(3, &AnalysisEvent::ai_token("hi")).expect("envelope");
        assert_eq!(data["type"], "ai_token");
        assert_eq!(data["text"], "hi");
        assert_eq!(data["seq"], 3);
        assert!(data["timestamp_ms"].as_u64().is_some_and(|ms| ms > 0));

        let data = envelope(1, &AnalysisEvent::StartAi).expect("envelope");
        assert_eq!(data["type"], "start_ai");
    }

    #[tokio::test]
    async fn response_frames_each_event() {
        let events = EventStream::from_events(vec![
            AnalysisEvent::log("hello"),
            AnalysisEvent::done("Analysis complete!"),
        ]);
        let response = sse_response(events).into_response();
        assert!(response
            .headers()
            .get(axum::http::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.contains("text/event-stream")));

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let body = String::from_utf8(bytes.to_vec()).expect("utf-8");
        assert!(body.contains("event: log\n"));
        assert!(body.contains("id: 1\n"));
        assert!(body.contains("\"message\":\"hello\""));
        assert!(body.contains("event: done\n"));
        assert!(body.contains("id: 2\n"));
    }
}
