// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Edaflow-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Edaflow and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Bounded, ordered event channel between a run and its subscriber.

use futures::stream::{self, Stream};
use tokio::sync::mpsc;

use crate::model::AnalysisEvent;

/// The subscriber went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Disconnected;

pub fn channel(capacity: usize) -> (EventSink, EventStream) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (EventSink { tx }, EventStream { rx })
}

#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::Sender<AnalysisEvent>,
}

impl EventSink {
    /// Waits for channel capacity, so a slow subscriber slows the run down.
    pub async fn emit(&self, event: AnalysisEvent) -> Result<(), Disconnected> {
        tracing::trace!(kind = %event.kind(), "emit");
        self.tx.send(event).await.map_err(|_| Disconnected)
    }

    /// Resolves once the subscriber has dropped its end.
    pub async fn closed(&self) {
        self.tx.closed().await;
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[derive(Debug)]
pub struct EventStream {
    rx: mpsc::Receiver<AnalysisEvent>,
}

impl EventStream {
    /// A stream that replays `events` and then ends, with no run behind it.
    pub fn from_events(events: Vec<AnalysisEvent>) -> Self {
        let (tx, rx) = mpsc::channel(events.len().max(1));
        for event in events {
            let sent = tx.try_send(event);
            debug_assert!(sent.is_ok(), "channel is sized for every replayed event");
        }
        Self { rx }
    }

    pub async fn recv(&mut self) -> Option<AnalysisEvent> {
        self.rx.recv().await
    }

    pub fn into_stream(self) -> impl Stream<Item = AnalysisEvent> + Send + 'static {
        stream::unfold(self.rx, |mut rx| async move {
            let event = rx.recv().await?;
            Some((event, rx))
        })
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt as _;

    use super::{channel, Disconnected, EventStream};
    use crate::model::AnalysisEvent;

    #[tokio::test]
    async fn events_arrive_in_order_and_end_with_the_sink() {
        let (sink, events) = channel(2);
        let producer = tokio::spawn(async move {
            for index in 0..5 {
                sink.emit(AnalysisEvent::log(index.to_string())).await.expect("emit");
            }
        });
        let received = events.into_stream().collect::<Vec<_>>().await;
        producer.await.expect("producer");
        let messages = received
            .into_iter()
            .map(|event| match event {
                AnalysisEvent::Log { message } => message,
                other => panic!("unexpected {other:?}"),
            })
            .collect::<Vec<_>>();
        assert_eq!(messages, vec!["0", "1", "2", "3", "4"]);
    }

    #[tokio::test]
    async fn dropping_the_stream_closes_the_sink() {
        let (sink, events) = channel(4);
        assert!(!sink.is_closed());
        drop(events);
        sink.closed().await;
        assert_eq!(sink.emit(AnalysisEvent::StartAi).await, Err(Disconnected));
    }

    #[tokio::test]
    async fn replayed_events_end_the_stream() {
        let mut events = EventStream::from_events(vec![
            AnalysisEvent::error("bad id"),
            AnalysisEvent::done("Analysis complete!"),
        ]);
        assert_eq!(events.recv().await, Some(AnalysisEvent::error("bad id")));
        assert!(events.recv().await.is_some_and(|event| event.is_terminal()));
        assert_eq!(events.recv().await, None);
    }

    #[tokio::test]
    async fn replay_keeps_every_event_regardless_of_count() {
        let logs = (0..100).map(|index| AnalysisEvent::log(index.to_string())).collect::<Vec<_>>();
        let replayed = EventStream::from_events(logs.clone()).into_stream().collect::<Vec<_>>().await;
        assert_eq!(replayed, logs);

        let mut empty = EventStream::from_events(Vec::new());
        assert_eq!(empty.recv().await, None);
    }
}
