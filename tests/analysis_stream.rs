// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Edaflow-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Edaflow and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use edaflow::commentary::{CommentaryClient, TokenStream};
use edaflow::config::Pacing;
use edaflow::pipeline::Pipeline;
use edaflow::server::AppState;
use edaflow::store::{SessionStore, SessionStoreConfig};
use futures::stream::{self, StreamExt as _};
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde_json::Value;
use tokio::sync::oneshot;

fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
}

fn read_fixture(name: &str) -> Vec<u8> {
    let path = fixtures_dir().join(name);
    fs::read(&path).unwrap_or_else(|err| panic!("failed to read {path:?}: {err}"))
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Streams fixed tokens, optionally never finishing afterwards.
struct FixedCommentary {
    tokens: Vec<&'static str>,
    hang: bool,
    dropped: Arc<AtomicBool>,
}

impl FixedCommentary {
    fn new(tokens: &[&'static str], hang: bool) -> Self {
        Self {
            tokens: tokens.to_vec(),
            hang,
            dropped: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl CommentaryClient for FixedCommentary {
    fn stream(&self, _prompt: String) -> TokenStream {
        let guard = DropFlag(Arc::clone(&self.dropped));
        let tokens = self.tokens.iter().map(|token| Ok((*token).to_owned())).collect::<Vec<_>>();
        let tail: TokenStream = if self.hang {
            stream::pending().boxed()
        } else {
            stream::empty().boxed()
        };
        stream::iter(tokens)
            .chain(tail)
            .map(move |item| {
                let _owned = &guard;
                item
            })
            .boxed()
    }
}

struct TestServer {
    base_url: String,
    shutdown: Option<oneshot::Sender<()>>,
    task: tokio::task::JoinHandle<std::io::Result<()>>,
}

impl TestServer {
    async fn start(commentary: Arc<FixedCommentary>, max_payload_bytes: usize) -> Self {
        let store = Arc::new(SessionStore::new(SessionStoreConfig {
            max_payload_bytes,
            ..SessionStoreConfig::default()
        }));
        let pipeline = Pipeline::new(store, commentary).with_pacing(Pacing::none());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr: SocketAddr = listener.local_addr().expect("local addr");
        let (tx, rx) = oneshot::channel::<()>();
        let task = tokio::spawn(edaflow::server::serve(listener, AppState::new(pipeline), async {
            let _ = rx.await;
        }));
        Self {
            base_url: format!("http://{addr}"),
            shutdown: Some(tx),
            task,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        tokio::time::timeout(Duration::from_secs(5), self.task)
            .await
            .expect("server shutdown timeout")
            .expect("server task")
            .expect("server result");
    }
}

#[derive(Debug)]
struct SseMessage {
    event: String,
    id: u64,
    data: Value,
}

fn parse_sse(body: &str) -> Vec<SseMessage> {
    body.split("\n\n")
        .filter_map(|block| {
            let mut event = None;
            let mut id = None;
            let mut data = None;
            for line in block.lines() {
                if let Some(value) = line.strip_prefix("event: ") {
                    event = Some(value.to_owned());
                } else if let Some(value) = line.strip_prefix("id: ") {
                    id = value.parse().ok();
                } else if let Some(value) = line.strip_prefix("data: ") {
                    data = Some(serde_json::from_str(value).expect("json data"));
                }
            }
            Some(SseMessage {
                event: event?,
                id: id?,
                data: data?,
            })
        })
        .collect()
}

async fn upload(client: &reqwest::Client, server: &TestServer, bytes: Vec<u8>, filename: &str) -> reqwest::Response {
    let form = Form::new().part("file", Part::bytes(bytes).file_name(filename.to_owned()));
    client
        .post(server.url("/start_analysis"))
        .multipart(form)
        .send()
        .await
        .expect("upload request")
}

async fn stream_events(client: &reqwest::Client, server: &TestServer, session_id: &str) -> Vec<SseMessage> {
    let response = client
        .get(server.url(&format!("/analysis_stream/{session_id}")))
        .send()
        .await
        .expect("stream request");
    assert_eq!(response.status(), StatusCode::OK);
    let body = tokio::time::timeout(Duration::from_secs(30), response.text())
        .await
        .expect("stream timeout")
        .expect("stream body");
    parse_sse(&body)
}

#[tokio::test]
async fn upload_then_stream_delivers_ordered_events() {
    let server = TestServer::start(Arc::new(FixedCommentary::new(&["Height ", "tracks weight."], false)), 1 << 20).await;
    let client = reqwest::Client::new();

    let response = upload(&client, &server, read_fixture("people.csv"), "people.csv").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("json");
    let session_id = body["session_id"].as_str().expect("session id").to_owned();

    let health: Value = client
        .get(server.url("/healthz"))
        .send()
        .await
        .expect("healthz")
        .json()
        .await
        .expect("json");
    assert_eq!(health["sessions"], 1);

    let messages = stream_events(&client, &server, &session_id).await;
    let kinds = messages.iter().map(|message| message.event.as_str()).collect::<Vec<_>>();
    assert_eq!(
        kinds,
        vec![
            "log", "log", "chart", "chart", "chart", "chart", "log", "start_ai", "log", "ai_token",
            "ai_token", "done"
        ]
    );
    for (index, message) in messages.iter().enumerate() {
        assert_eq!(message.id, index as u64 + 1);
        assert_eq!(message.data["seq"], index as u64 + 1);
        assert_eq!(message.data["type"], message.event.as_str());
        assert!(message.data["timestamp_ms"].is_u64());
    }
    assert!(messages[1].data["message"].as_str().is_some_and(|text| text.contains("5 rows, 4 columns")));
    for chart in messages.iter().filter(|message| message.event == "chart") {
        assert!(chart.data["image"]
            .as_str()
            .is_some_and(|image| image.starts_with("data:image/svg+xml;base64,")));
    }
    assert_eq!(messages[9].data["text"], "Height ");
    assert_eq!(messages[11].data["message"], "Analysis complete!");

    // The session is single-use.
    let replay = stream_events(&client, &server, &session_id).await;
    let kinds = replay.iter().map(|message| message.event.as_str()).collect::<Vec<_>>();
    assert_eq!(kinds, vec!["error", "done"]);

    let health: Value = client
        .get(server.url("/healthz"))
        .send()
        .await
        .expect("healthz")
        .json()
        .await
        .expect("json");
    assert_eq!(health["sessions"], 0);

    drop(client);
    server.stop().await;
}

#[tokio::test]
async fn workbook_upload_streams_like_csv() {
    let server = TestServer::start(Arc::new(FixedCommentary::new(&["ok"], false)), 1 << 20).await;
    let client = reqwest::Client::new();

    let response = upload(&client, &server, read_fixture("people.xlsx"), "people.xlsx").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("json");
    let session_id = body["session_id"].as_str().expect("session id").to_owned();

    let messages = stream_events(&client, &server, &session_id).await;
    let kinds = messages.iter().map(|message| message.event.as_str()).collect::<Vec<_>>();
    assert_eq!(
        kinds,
        vec!["log", "log", "chart", "chart", "chart", "chart", "log", "start_ai", "log", "ai_token", "done"]
    );
    assert!(messages[1].data["message"].as_str().is_some_and(|text| text.contains("5 rows, 4 columns")));

    drop(client);
    server.stop().await;
}

#[tokio::test]
async fn upload_errors_map_to_status_codes() {
    let server = TestServer::start(Arc::new(FixedCommentary::new(&[], false)), 1024).await;
    let client = reqwest::Client::new();

    let form = Form::new().text("note", "no file here");
    let response = client
        .post(server.url("/start_analysis"))
        .multipart(form)
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.expect("json");
    assert!(body["error"].is_string());

    let response = upload(&client, &server, b"a\n1\n".to_vec(), "").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = upload(&client, &server, vec![b'1'; 4096], "big.csv").await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body: Value = response.json().await.expect("json");
    assert!(body["error"].as_str().is_some_and(|error| error.contains("limit is 1024 bytes")));

    drop(client);
    server.stop().await;
}

#[tokio::test]
async fn class_count_charts_answer_with_images() {
    let server = TestServer::start(Arc::new(FixedCommentary::new(&[], false)), 1024).await;
    let client = reqwest::Client::new();
    let paths = serde_json::json!({"file_paths": ["ds/cat/1.jpg", "ds/dog/2.jpg", "ds/cat/3.jpg"]});

    for route in ["/draw_chart", "/draw_pie_chart"] {
        let response = client.post(server.url(route)).json(&paths).send().await.expect("request");
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = response.json().await.expect("json");
        assert!(body["image"]
            .as_str()
            .is_some_and(|image| image.starts_with("data:image/svg+xml;base64,")));
    }

    let response = client
        .post(server.url("/draw_chart"))
        .json(&serde_json::json!({"file_paths": ["top-level.jpg"]}))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    drop(client);
    server.stop().await;
}

#[tokio::test]
async fn client_disconnect_cancels_commentary() {
    let commentary = Arc::new(FixedCommentary::new(&["first"], true));
    let server = TestServer::start(Arc::clone(&commentary), 1 << 20).await;
    let client = reqwest::Client::new();

    let response = upload(&client, &server, read_fixture("people.csv"), "people.csv").await;
    let body: Value = response.json().await.expect("json");
    let session_id = body["session_id"].as_str().expect("session id").to_owned();

    let response = client
        .get(server.url(&format!("/analysis_stream/{session_id}")))
        .send()
        .await
        .expect("stream request");
    let mut body = response.bytes_stream();
    let mut seen = String::new();
    while !seen.contains("event: ai_token") {
        let chunk = tokio::time::timeout(Duration::from_secs(30), body.next())
            .await
            .expect("chunk timeout")
            .expect("stream ended early")
            .expect("chunk");
        seen.push_str(&String::from_utf8_lossy(&chunk));
    }
    drop(body);

    // The server notices the closed connection on its next write at the latest (keep-alive).
    tokio::time::timeout(Duration::from_secs(40), async {
        while !commentary.dropped.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("commentary stream was not dropped after disconnect");

    drop(client);
    server.stop().await;
}
