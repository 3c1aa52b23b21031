// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Edaflow-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Edaflow and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::model::SessionId;

pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(300);
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 32 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStoreConfig {
    pub ttl: Duration,
    pub max_payload_bytes: usize,
}

impl Default for SessionStoreConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_SESSION_TTL,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }
}

/// An upload waiting for its analysis stream to be opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedUpload {
    filename: String,
    payload: Vec<u8>,
    created_at: Instant,
}

impl StagedUpload {
    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn into_parts(self) -> (String, Vec<u8>) {
        (self.filename, self.payload)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    SessionNotFound { session_id: SessionId },
    EmptyPayload,
    PayloadTooLarge { size: usize, limit: usize },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SessionNotFound { session_id } => {
                write!(f, "session {session_id} has expired or does not exist")
            }
            Self::EmptyPayload => f.write_str("uploaded file is empty"),
            Self::PayloadTooLarge { size, limit } => {
                write!(f, "uploaded file is {size} bytes, limit is {limit} bytes")
            }
        }
    }
}

impl std::error::Error for StoreError {}

/// Ephemeral, in-memory map from session id to uploaded payload.
///
/// Every entry leaves the map exactly once: through [`SessionStore::take`] (first caller wins),
/// through expiry, or when the process exits. Expired entries are never handed out, even if the
/// sweeper has not reached them yet.
#[derive(Debug)]
pub struct SessionStore {
    entries: Mutex<HashMap<SessionId, StagedUpload>>,
    config: SessionStoreConfig,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(SessionStoreConfig::default())
    }
}

impl SessionStore {
    pub fn new(config: SessionStoreConfig) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> SessionStoreConfig {
        self.config
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SessionId, StagedUpload>> {
        // Entries are plain data; a panic mid-insert cannot leave one half-written.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_expired(&self, upload: &StagedUpload, now: Instant) -> bool {
        now.saturating_duration_since(upload.created_at) >= self.config.ttl
    }

    pub fn put(&self, payload: Vec<u8>, filename: impl Into<String>) -> Result<SessionId, StoreError> {
        if payload.is_empty() {
            return Err(StoreError::EmptyPayload);
        }
        if payload.len() > self.config.max_payload_bytes {
            return Err(StoreError::PayloadTooLarge {
                size: payload.len(),
                limit: self.config.max_payload_bytes,
            });
        }

        let upload = StagedUpload {
            filename: filename.into(),
            payload,
            created_at: Instant::now(),
        };
        let size = upload.payload.len();

        let mut entries = self.lock();
        let session_id = loop {
            let candidate = SessionId::generate();
            if !entries.contains_key(&candidate) {
                break candidate;
            }
        };
        entries.insert(session_id.clone(), upload);
        drop(entries);

        tracing::debug!(session_id = %session_id, bytes = size, "staged upload");
        Ok(session_id)
    }

    /// Removes and returns the entry for `session_id`.
    ///
    /// The lookup and the removal happen under one lock, so concurrent callers racing on the same
    /// id see exactly one success; everyone else gets `SessionNotFound`.
    pub fn take(&self, session_id: &SessionId) -> Result<StagedUpload, StoreError> {
        let now = Instant::now();
        let removed = self.lock().remove(session_id);
        match removed {
            Some(upload) if !self.is_expired(&upload, now) => {
                tracing::debug!(session_id = %session_id, "took staged upload");
                Ok(upload)
            }
            Some(_) => {
                tracing::debug!(session_id = %session_id, "staged upload expired before take");
                Err(StoreError::SessionNotFound {
                    session_id: session_id.clone(),
                })
            }
            None => Err(StoreError::SessionNotFound {
                session_id: session_id.clone(),
            }),
        }
    }

    pub fn contains(&self, session_id: &SessionId) -> bool {
        let now = Instant::now();
        self.lock()
            .get(session_id)
            .is_some_and(|upload| !self.is_expired(upload, now))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every expired entry and returns how many were evicted.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, upload| !self.is_expired(upload, now));
        let evicted = before - entries.len();
        drop(entries);

        if evicted > 0 {
            tracing::info!(evicted, "evicted expired sessions");
        }
        evicted
    }

    /// Runs [`SessionStore::sweep_expired`] every `every` until the store is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let store: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(store) = store.upgrade() else {
                    break;
                };
                store.sweep_expired();
            }
        })
    }
}
