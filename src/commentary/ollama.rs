// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Edaflow-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Edaflow and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Ollama `/api/chat` client.
//!
//! With `stream: true` Ollama answers with newline-delimited JSON, one frame per fragment:
//! `{"message":{"role":"assistant","content":"..."},"done":false}`, closed by a frame with
//! `"done":true`. Errors arrive either as a non-success status or in-band as `{"error":"..."}`.

use std::time::Duration;

use futures::future::BoxFuture;
use futures::stream::{self, BoxStream};
use futures::{FutureExt as _, StreamExt as _};
use serde::{Deserialize, Serialize};

use super::{CommentaryClient, CommentaryError, TokenStream};

pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
pub const DEFAULT_MODEL: &str = "llama3";
const CHAT_PATH: &str = "/api/chat";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Covers model load time before the first frame as well as gaps between frames.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(120);
/// Longest NDJSON line accepted before the stream is abandoned.
pub const MAX_FRAME_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
    pub idle_timeout: Duration,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_URL.to_owned(),
            model: DEFAULT_MODEL.to_owned(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    idle_timeout: Duration,
}

impl OllamaClient {
    pub fn new(config: OllamaConfig) -> Result<Self, CommentaryError> {
        let client = reqwest::Client::builder().connect_timeout(CONNECT_TIMEOUT).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}{CHAT_PATH}", config.base_url.trim_end_matches('/')),
            model: config.model,
            idle_timeout: config.idle_timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl CommentaryClient for OllamaClient {
    fn stream(&self, prompt: String) -> TokenStream {
        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_owned(),
                content: prompt,
            }],
            stream: true,
        };
        let request = self.client.post(&self.endpoint).json(&body);
        tracing::debug!(endpoint = %self.endpoint, model = %self.model, "opening commentary stream");
        token_stream(Phase::Connecting {
            connect: open(request).boxed(),
            idle: self.idle_timeout,
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    role: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatFrame {
    #[serde(default)]
    message: Option<ChatMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

type ByteStream = BoxStream<'static, Result<Vec<u8>, CommentaryError>>;

async fn open(request: reqwest::RequestBuilder) -> Result<ByteStream, CommentaryError> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "failed to read error body".to_owned());
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|wrapper| wrapper.error)
            .unwrap_or(body);
        return Err(CommentaryError::Status {
            status: status.as_u16(),
            message,
        });
    }
    Ok(response
        .bytes_stream()
        .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(CommentaryError::from))
        .boxed())
}

enum Phase {
    Connecting {
        connect: BoxFuture<'static, Result<ByteStream, CommentaryError>>,
        idle: Duration,
    },
    Streaming {
        body: ByteStream,
        buffer: Vec<u8>,
        idle: Duration,
    },
    Finished,
}

fn token_stream(phase: Phase) -> TokenStream {
    stream::unfold(phase, advance).boxed()
}

/// What one decoded frame contributes to the token stream.
enum Frame {
    Token(String),
    Skip,
    Last(Option<String>),
}

fn decode_frame(line: &[u8]) -> Result<Frame, CommentaryError> {
    let frame: ChatFrame = serde_json::from_slice(line)?;
    if let Some(message) = frame.error {
        return Err(CommentaryError::Backend { message });
    }
    let text = frame.message.map(|message| message.content).filter(|text| !text.is_empty());
    Ok(match (text, frame.done) {
        (text, true) => Frame::Last(text),
        (Some(text), false) => Frame::Token(text),
        (None, false) => Frame::Skip,
    })
}

/// Pops the next complete line (without its terminator) off the front of `buffer`.
fn next_line(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
    let end = memchr::memchr(b'\n', buffer)?;
    let mut line = buffer.drain(..=end).collect::<Vec<_>>();
    line.pop();
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    Some(line)
}

fn is_blank(line: &[u8]) -> bool {
    line.iter().all(u8::is_ascii_whitespace)
}

async fn advance(mut phase: Phase) -> Option<(Result<String, CommentaryError>, Phase)> {
    loop {
        phase = match phase {
            Phase::Finished => return None,
            Phase::Connecting { connect, idle } => match tokio::time::timeout(idle, connect).await {
                Ok(Ok(body)) => Phase::Streaming {
                    body,
                    buffer: Vec::new(),
                    idle,
                },
                Ok(Err(err)) => return Some((Err(err), Phase::Finished)),
                Err(_) => return Some((Err(CommentaryError::Timeout { idle }), Phase::Finished)),
            },
            Phase::Streaming {
                mut body,
                mut buffer,
                idle,
            } => {
                let line = match next_line(&mut buffer) {
                    Some(line) => line,
                    None if buffer.len() > MAX_FRAME_BYTES => {
                        let err = CommentaryError::FrameTooLong {
                            limit: MAX_FRAME_BYTES,
                        };
                        return Some((Err(err), Phase::Finished));
                    }
                    None => match tokio::time::timeout(idle, body.next()).await {
                        Err(_) => {
                            tracing::warn!(?idle, "commentary backend stalled");
                            return Some((Err(CommentaryError::Timeout { idle }), Phase::Finished));
                        }
                        Ok(Some(Ok(chunk))) => {
                            buffer.extend_from_slice(&chunk);
                            phase = Phase::Streaming { body, buffer, idle };
                            continue;
                        }
                        Ok(Some(Err(err))) => return Some((Err(err), Phase::Finished)),
                        // A final frame without a trailing newline.
                        Ok(None) if !is_blank(&buffer) => {
                            return match decode_frame(&buffer) {
                                Ok(Frame::Token(text) | Frame::Last(Some(text))) => {
                                    Some((Ok(text), Phase::Finished))
                                }
                                Ok(Frame::Skip | Frame::Last(None)) => None,
                                Err(err) => Some((Err(err), Phase::Finished)),
                            };
                        }
                        Ok(None) => {
                            tracing::warn!("commentary stream closed without a final frame");
                            return None;
                        }
                    },
                };
                if is_blank(&line) {
                    phase = Phase::Streaming { body, buffer, idle };
                    continue;
                }
                match decode_frame(&line) {
                    Ok(Frame::Token(text)) => {
                        return Some((Ok(text), Phase::Streaming { body, buffer, idle }))
                    }
                    Ok(Frame::Skip) => Phase::Streaming { body, buffer, idle },
                    Ok(Frame::Last(Some(text))) => return Some((Ok(text), Phase::Finished)),
                    Ok(Frame::Last(None)) => return None,
                    Err(err) => return Some((Err(err), Phase::Finished)),
                }
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use futures::stream::{self, StreamExt as _};

    use super::{
        next_line, token_stream, OllamaClient, OllamaConfig, Phase, DEFAULT_IDLE_TIMEOUT,
        MAX_FRAME_BYTES,
    };
    use crate::commentary::{CommentaryClient, CommentaryError};

    fn body_of(chunks: &[&str]) -> Phase {
        let chunks = chunks
            .iter()
            .map(|chunk| Ok(chunk.as_bytes().to_vec()))
            .collect::<Vec<_>>();
        Phase::Streaming {
            body: stream::iter(chunks).boxed(),
            buffer: Vec::new(),
            idle: DEFAULT_IDLE_TIMEOUT,
        }
    }

    fn config(base_url: String) -> OllamaConfig {
        OllamaConfig {
            base_url,
            model: "tiny".to_owned(),
            ..OllamaConfig::default()
        }
    }

    async fn collect(phase: Phase) -> Vec<Result<String, CommentaryError>> {
        token_stream(phase).collect().await
    }

    #[test]
    fn next_line_strips_terminators() {
        let mut buffer = b"one\r\ntwo\nrest".to_vec();
        assert_eq!(next_line(&mut buffer), Some(b"one".to_vec()));
        assert_eq!(next_line(&mut buffer), Some(b"two".to_vec()));
        assert_eq!(next_line(&mut buffer), None);
        assert_eq!(buffer, b"rest");
    }

    #[tokio::test]
    async fn frames_split_across_chunks_decode_in_order() {
        let tokens = collect(body_of(&[
            "{\"message\":{\"role\":\"assistant\",\"content\":\"Hel\"},\"done\":false}\n{\"mess",
            "age\":{\"content\":\"lo\"},\"done\":false}\n\n",
            "{\"message\":{\"content\":\"\"},\"done\":false}\n",
            "{\"message\":{\"content\":\"\"},\"done\":true}\n",
            "{\"message\":{\"content\":\"ignored\"},\"done\":false}\n",
        ]))
        .await;
        let tokens = tokens.into_iter().collect::<Result<Vec<_>, _>>().expect("tokens");
        assert_eq!(tokens, vec!["Hel", "lo"]);
    }

    #[tokio::test]
    async fn in_band_error_ends_the_stream() {
        let items = collect(body_of(&[
            "{\"message\":{\"content\":\"a\"},\"done\":false}\n",
            "{\"error\":\"model crashed\"}\n",
            "{\"message\":{\"content\":\"b\"},\"done\":false}\n",
        ]))
        .await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().expect("token"), "a");
        assert!(matches!(
            &items[1],
            Err(CommentaryError::Backend { message }) if message == "model crashed"
        ));
    }

    #[tokio::test]
    async fn trailing_frame_without_newline_is_decoded() {
        let items = collect(body_of(&["{\"message\":{\"content\":\"end\"},\"done\":true}"])).await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_ref().expect("token"), "end");

        let items = collect(body_of(&["not json\n"])).await;
        assert!(matches!(items.as_slice(), [Err(CommentaryError::Decode { .. })]));
    }

    #[tokio::test]
    async fn oversized_frame_without_newline_is_rejected() {
        let huge = "x".repeat(MAX_FRAME_BYTES + 1);
        let items = collect(body_of(&[
            "{\"message\":{\"content\":\"a\"},\"done\":false}\n",
            huge.as_str(),
            "\n",
        ]))
        .await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().expect("token"), "a");
        assert!(matches!(
            &items[1],
            Err(CommentaryError::FrameTooLong { limit }) if *limit == MAX_FRAME_BYTES
        ));
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn streams_tokens_from_a_live_endpoint() {
        let router = Router::new().route(
            "/api/chat",
            post(|Json(request): Json<serde_json::Value>| async move {
                assert_eq!(request["stream"], true);
                assert_eq!(request["model"], "tiny");
                let prompt = request["messages"][0]["content"].as_str().unwrap_or_default();
                format!(
                    "{}\n{}\n",
                    serde_json::json!({"message": {"content": prompt.to_uppercase()}, "done": false}),
                    serde_json::json!({"message": {"content": ""}, "done": true}),
                )
            }),
        );
        let base_url = serve(router).await;
        let client = OllamaClient::new(config(format!("{base_url}/"))).expect("client");
        assert!(client.endpoint().ends_with("/api/chat"));

        let tokens = client.stream("hi".to_owned()).collect::<Vec<_>>().await;
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].as_ref().expect("token"), "HI");
    }

    #[tokio::test]
    async fn error_status_carries_backend_message() {
        let router = Router::new().route(
            "/api/chat",
            post(|| async {
                (
                    StatusCode::NOT_FOUND,
                    Json(serde_json::json!({"error": "model 'tiny' not found"})),
                )
            }),
        );
        let client = OllamaClient::new(config(serve(router).await)).expect("client");

        let items = client.stream("hi".to_owned()).collect::<Vec<_>>().await;
        assert!(matches!(
            items.as_slice(),
            [Err(CommentaryError::Status { status: 404, message })] if message.contains("not found")
        ));
    }

    #[tokio::test]
    async fn stalled_backend_times_out_after_idle_period() {
        let router = Router::new().route(
            "/api/chat",
            post(|| async {
                let first = serde_json::json!({"message": {"content": "a"}, "done": false});
                let frames = stream::iter([Ok::<_, Infallible>(format!("{first}\n"))])
                    .chain(stream::pending());
                Body::from_stream(frames)
            }),
        );
        let client = OllamaClient::new(OllamaConfig {
            idle_timeout: Duration::from_millis(200),
            ..config(serve(router).await)
        })
        .expect("client");

        let items = tokio::time::timeout(
            Duration::from_secs(5),
            client.stream("hi".to_owned()).collect::<Vec<_>>(),
        )
        .await
        .expect("stream ends once the backend goes quiet");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().expect("token"), "a");
        assert!(matches!(
            &items[1],
            Err(CommentaryError::Timeout { idle }) if *idle == Duration::from_millis(200)
        ));
    }
}
