// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Edaflow-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Edaflow and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Server configuration.
//!
//! Values come from defaults, then `EDAFLOW_*` environment variables, then command-line flags
//! (applied by the binary on top of [`ServerConfig::from_env`]).

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::commentary::{OllamaConfig, DEFAULT_LANGUAGE};
use crate::store::{SessionStoreConfig, DEFAULT_MAX_PAYLOAD_BYTES, DEFAULT_SESSION_TTL};

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_BIND: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

pub const ENV_BIND: &str = "EDAFLOW_BIND";
pub const ENV_PORT: &str = "EDAFLOW_PORT";
pub const ENV_SESSION_TTL_SECS: &str = "EDAFLOW_SESSION_TTL_SECS";
pub const ENV_MAX_UPLOAD_BYTES: &str = "EDAFLOW_MAX_UPLOAD_BYTES";
pub const ENV_MODEL: &str = "EDAFLOW_MODEL";
pub const ENV_OLLAMA_URL: &str = "EDAFLOW_OLLAMA_URL";
pub const ENV_OLLAMA_TIMEOUT_SECS: &str = "EDAFLOW_OLLAMA_TIMEOUT_SECS";
pub const ENV_LANGUAGE: &str = "EDAFLOW_LANGUAGE";
pub const ENV_NO_PACING: &str = "EDAFLOW_NO_PACING";

/// Delays that make a run readable when watched live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub before_load: Duration,
    pub before_chart: Duration,
    pub after_token: Duration,
}

impl Pacing {
    pub const fn none() -> Self {
        Self {
            before_load: Duration::ZERO,
            before_chart: Duration::ZERO,
            after_token: Duration::ZERO,
        }
    }

    pub fn is_none(&self) -> bool {
        *self == Self::none()
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            before_load: Duration::from_millis(1000),
            before_chart: Duration::from_millis(1500),
            after_token: Duration::from_millis(20),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind: IpAddr,
    pub port: u16,
    pub session_ttl: Duration,
    pub max_upload_bytes: usize,
    pub ollama: OllamaConfig,
    pub language: String,
    pub pacing: Pacing,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND,
            port: DEFAULT_PORT,
            session_ttl: DEFAULT_SESSION_TTL,
            max_upload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            ollama: OllamaConfig::default(),
            language: DEFAULT_LANGUAGE.to_owned(),
            pacing: Pacing::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub key: String,
    pub value: String,
    pub reason: &'static str,
}

impl ConfigError {
    fn new(key: &str, value: &str, reason: &'static str) -> Self {
        Self {
            key: key.to_owned(),
            value: value.to_owned(),
            reason,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid value {:?} for {}: {}", self.value, self.key, self.reason)
    }
}

impl std::error::Error for ConfigError {}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from defaults overridden by whatever `lookup` returns for each `EDAFLOW_*`
    /// key. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(value) = get(ENV_BIND) {
            config.set_bind(ENV_BIND, &value)?;
        }
        if let Some(value) = get(ENV_PORT) {
            config.set_port(ENV_PORT, &value)?;
        }
        if let Some(value) = get(ENV_SESSION_TTL_SECS) {
            config.set_session_ttl_secs(ENV_SESSION_TTL_SECS, &value)?;
        }
        if let Some(value) = get(ENV_MAX_UPLOAD_BYTES) {
            config.set_max_upload_bytes(ENV_MAX_UPLOAD_BYTES, &value)?;
        }
        if let Some(value) = get(ENV_MODEL) {
            config.ollama.model = value;
        }
        if let Some(value) = get(ENV_OLLAMA_URL) {
            config.set_ollama_url(ENV_OLLAMA_URL, &value)?;
        }
        if let Some(value) = get(ENV_OLLAMA_TIMEOUT_SECS) {
            config.set_ollama_timeout_secs(ENV_OLLAMA_TIMEOUT_SECS, &value)?;
        }
        if let Some(value) = get(ENV_LANGUAGE) {
            config.language = value;
        }
        if let Some(value) = get(ENV_NO_PACING) {
            if parse_flag(ENV_NO_PACING, &value)? {
                config.pacing = Pacing::none();
            }
        }
        Ok(config)
    }

    pub fn set_bind(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.bind = value
            .trim()
            .parse()
            .map_err(|_| ConfigError::new(key, value, "expected an IP address"))?;
        Ok(())
    }

    pub fn set_port(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.port = value
            .trim()
            .parse()
            .map_err(|_| ConfigError::new(key, value, "expected a port number (0-65535)"))?;
        Ok(())
    }

    pub fn set_session_ttl_secs(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let secs: u64 = value
            .trim()
            .parse()
            .map_err(|_| ConfigError::new(key, value, "expected a number of seconds"))?;
        if secs == 0 {
            return Err(ConfigError::new(key, value, "must be at least 1 second"));
        }
        self.session_ttl = Duration::from_secs(secs);
        Ok(())
    }

    pub fn set_max_upload_bytes(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let bytes: usize = value
            .trim()
            .parse()
            .map_err(|_| ConfigError::new(key, value, "expected a byte count"))?;
        if bytes == 0 {
            return Err(ConfigError::new(key, value, "must be at least 1 byte"));
        }
        self.max_upload_bytes = bytes;
        Ok(())
    }

    pub fn set_ollama_url(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        if !(value.starts_with("http://") || value.starts_with("https://")) {
            return Err(ConfigError::new(key, value, "expected an http:// or https:// URL"));
        }
        self.ollama.base_url = value.to_owned();
        Ok(())
    }

    /// How long a commentary stream may stay silent before the run reports an error.
    pub fn set_ollama_timeout_secs(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let secs: u64 = value
            .trim()
            .parse()
            .map_err(|_| ConfigError::new(key, value, "expected a number of seconds"))?;
        if secs == 0 {
            return Err(ConfigError::new(key, value, "must be at least 1 second"));
        }
        self.ollama.idle_timeout = Duration::from_secs(secs);
        Ok(())
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    pub fn store_config(&self) -> SessionStoreConfig {
        SessionStoreConfig {
            ttl: self.session_ttl,
            max_payload_bytes: self.max_upload_bytes,
        }
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::new(key, value, "expected true or false")),
    }
}
