// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Edaflow-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Edaflow and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Edaflow server entrypoint.
//!
//! Configuration comes from defaults, then `EDAFLOW_*` environment variables, then the flags
//! below. Logging goes to stderr and follows `RUST_LOG` (default `edaflow=info`).

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use edaflow::commentary::OllamaClient;
use edaflow::config::{
    ConfigError, Pacing, ServerConfig, DEFAULT_PORT, ENV_BIND, ENV_LANGUAGE, ENV_MAX_UPLOAD_BYTES,
    ENV_MODEL, ENV_NO_PACING, ENV_OLLAMA_TIMEOUT_SECS, ENV_OLLAMA_URL, ENV_PORT,
    ENV_SESSION_TTL_SECS,
};
use edaflow::pipeline::Pipeline;
use edaflow::server::AppState;
use edaflow::store::SessionStore;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "edaflow=info";

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--bind <ip>] [--port <port>] [--session-ttl-secs <secs>] [--max-upload-bytes <bytes>]\n  {program} [--model <name>] [--ollama-url <url>] [--ollama-timeout-secs <secs>]\n  {program} [--language <name>] [--no-pacing]\n\nServes the analysis API on http://<bind>:<port> (default 127.0.0.1:{DEFAULT_PORT}).\nEvery flag can also be set through its environment variable:\n  {ENV_BIND}, {ENV_PORT}, {ENV_SESSION_TTL_SECS}, {ENV_MAX_UPLOAD_BYTES},\n  {ENV_MODEL}, {ENV_OLLAMA_URL}, {ENV_OLLAMA_TIMEOUT_SECS}, {ENV_LANGUAGE}, {ENV_NO_PACING}.\nFlags win over environment variables.\n\n--no-pacing drops the delays between events that make a run readable when watched live."
    );
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct CliOptions {
    help: bool,
    bind: Option<String>,
    port: Option<String>,
    session_ttl_secs: Option<String>,
    max_upload_bytes: Option<String>,
    model: Option<String>,
    ollama_url: Option<String>,
    ollama_timeout_secs: Option<String>,
    language: Option<String>,
    no_pacing: bool,
}

fn set_once(slot: &mut Option<String>, value: Option<String>) -> Result<(), ()> {
    if slot.is_some() {
        return Err(());
    }
    *slot = Some(value.ok_or(())?);
    Ok(())
}

fn parse_options(mut args: impl Iterator<Item = String>) -> Result<CliOptions, ()> {
    let mut options = CliOptions::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => options.help = true,
            "--bind" => set_once(&mut options.bind, args.next())?,
            "--port" => set_once(&mut options.port, args.next())?,
            "--session-ttl-secs" => set_once(&mut options.session_ttl_secs, args.next())?,
            "--max-upload-bytes" => set_once(&mut options.max_upload_bytes, args.next())?,
            "--model" => set_once(&mut options.model, args.next())?,
            "--ollama-url" => set_once(&mut options.ollama_url, args.next())?,
            "--ollama-timeout-secs" => set_once(&mut options.ollama_timeout_secs, args.next())?,
            "--language" => set_once(&mut options.language, args.next())?,
            "--no-pacing" => {
                if options.no_pacing {
                    return Err(());
                }
                options.no_pacing = true;
            }
            _ => return Err(()),
        }
    }

    Ok(options)
}

impl CliOptions {
    fn apply(self, config: &mut ServerConfig) -> Result<(), ConfigError> {
        if let Some(value) = self.bind {
            config.set_bind("--bind", &value)?;
        }
        if let Some(value) = self.port {
            config.set_port("--port", &value)?;
        }
        if let Some(value) = self.session_ttl_secs {
            config.set_session_ttl_secs("--session-ttl-secs", &value)?;
        }
        if let Some(value) = self.max_upload_bytes {
            config.set_max_upload_bytes("--max-upload-bytes", &value)?;
        }
        if let Some(value) = self.model {
            config.ollama.model = value;
        }
        if let Some(value) = self.ollama_url {
            config.set_ollama_url("--ollama-url", &value)?;
        }
        if let Some(value) = self.ollama_timeout_secs {
            config.set_ollama_timeout_secs("--ollama-timeout-secs", &value)?;
        }
        if let Some(value) = self.language {
            config.language = value;
        }
        if self.no_pacing {
            config.pacing = Pacing::none();
        }
        Ok(())
    }
}

/// How often expired uploads are swept: a quarter of the TTL, between 1 and 60 seconds.
fn sweep_interval(ttl: Duration) -> Duration {
    (ttl / 4).clamp(Duration::from_secs(1), Duration::from_secs(60))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

fn main() {
    let result = (|| -> Result<(), Box<dyn Error>> {
        let mut args = std::env::args();
        let program = args.next().unwrap_or_else(|| "edaflow".to_owned());

        let options = match parse_options(args) {
            Ok(options) if !options.help => options,
            Ok(_) => {
                print_usage(&program);
                return Ok(());
            }
            Err(()) => {
                print_usage(&program);
                std::process::exit(2);
            }
        };

        let config = ServerConfig::from_env().and_then(|mut config| {
            options.apply(&mut config)?;
            Ok(config)
        });
        let config = match config {
            Ok(config) => config,
            Err(err) => {
                eprintln!("edaflow: {err}");
                std::process::exit(2);
            }
        };

        init_tracing();

        let store = Arc::new(SessionStore::new(config.store_config()));
        let commentary = Arc::new(OllamaClient::new(config.ollama.clone())?);
        let pipeline = Pipeline::new(Arc::clone(&store), commentary)
            .with_pacing(config.pacing)
            .with_language(config.language.clone());

        let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;

        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::bind(config.socket_addr()).await?;
            tracing::info!(
                model = %config.ollama.model,
                ollama_url = %config.ollama.base_url,
                session_ttl_secs = config.session_ttl.as_secs(),
                pacing = !config.pacing.is_none(),
                "starting edaflow"
            );

            let sweeper = store.spawn_sweeper(sweep_interval(config.session_ttl));
            let served = edaflow::server::serve(listener, AppState::new(pipeline), shutdown_signal()).await;
            sweeper.abort();
            served?;
            Ok::<(), Box<dyn Error>>(())
        })?;

        Ok(())
    })();

    if let Err(err) = result {
        eprintln!("edaflow: {err}");
        std::process::exit(1);
    }
}
