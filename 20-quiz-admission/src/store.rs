//! Versioned session storage.
//!
//! The controller never mutates a backing directly. It reads a
//! [`Versioned`] snapshot, builds the next session in memory and hands it
//! back with the version it started from. The write lands only if nobody else
//! committed in between; otherwise the caller gets
//! [`CommitOutcome::Conflict`] and starts over from a fresh read.
//!
//! Two backings share this contract:
//!
//! - [`MemorySessionStore`] keeps the session in process memory.
//! - [`KvSessionStore`] serialises the whole session as one JSON record in a
//!   [`KvBackend`], so multi-key skew between phase, list and count cannot
//!   happen even when the backend is remote.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::session::Session;

/// Optimistic concurrency token. Version 0 means "never written".
pub type Version = u64;

/// Key under which [`KvSessionStore`] keeps the session record.
pub const SESSION_KEY: &str = "quiz:session";

/// A value paired with the version it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<T> {
    pub version: Version,
    pub value: T,
}

/// Result of a conditional write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The write landed and the record now has this version.
    Committed(Version),
    /// Someone else committed first; nothing was written.
    Conflict,
}

/// Snapshot/commit contract the admission controller is written against.
#[async_trait]
pub trait SessionStore: Send + Sync + fmt::Debug {
    /// Reads the whole session as one consistent snapshot.
    async fn read_session(&self) -> Result<Versioned<Session>, StoreError>;

    /// Replaces the session only if its version is still `expected`.
    async fn write_session_if_unchanged(
        &self,
        expected: Version,
        session: &Session,
    ) -> Result<CommitOutcome, StoreError>;
}

/// Process-local backing. The version check and the write happen under one
/// lock.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    current: Mutex<Versioned<Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for Versioned<Session> {
    fn default() -> Self {
        Self {
            version: 0,
            value: Session::new(),
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn read_session(&self) -> Result<Versioned<Session>, StoreError> {
        Ok(self.current.lock().await.clone())
    }

    async fn write_session_if_unchanged(
        &self,
        expected: Version,
        session: &Session,
    ) -> Result<CommitOutcome, StoreError> {
        let mut current = self.current.lock().await;
        if current.version != expected {
            return Ok(CommitOutcome::Conflict);
        }
        current.version += 1;
        current.value = session.clone();
        Ok(CommitOutcome::Committed(current.version))
    }
}

/// Minimal key-value contract a shared external store has to offer.
#[async_trait]
pub trait KvBackend: Send + Sync + fmt::Debug {
    /// Returns the stored bytes and their version, or `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<(Vec<u8>, Version)>, StoreError>;

    /// Stores `value` if the key's version is still `expected` (0 for an
    /// absent key). Returns the new version, or `None` on a version mismatch.
    async fn compare_and_set(
        &self,
        key: &str,
        expected: Version,
        value: Vec<u8>,
    ) -> Result<Option<Version>, StoreError>;
}

/// In-process [`KvBackend`], standing in for a remote key-value service.
#[derive(Debug, Default)]
pub struct MemoryKv {
    entries: Mutex<HashMap<String, (Vec<u8>, Version)>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvBackend for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<(Vec<u8>, Version)>, StoreError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: Version,
        value: Vec<u8>,
    ) -> Result<Option<Version>, StoreError> {
        let mut entries = self.entries.lock().await;
        let current = entries.get(key).map_or(0, |(_, version)| *version);
        if current != expected {
            return Ok(None);
        }
        let next = current + 1;
        entries.insert(key.to_string(), (value, next));
        Ok(Some(next))
    }
}

/// Session store that keeps the session as one composite record in a
/// [`KvBackend`].
#[derive(Debug)]
pub struct KvSessionStore<B> {
    backend: B,
    key: String,
}

impl<B: KvBackend> KvSessionStore<B> {
    pub fn new(backend: B) -> Self {
        Self::with_key(backend, SESSION_KEY)
    }

    pub fn with_key(backend: B, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

#[async_trait]
impl<B: KvBackend> SessionStore for KvSessionStore<B> {
    async fn read_session(&self) -> Result<Versioned<Session>, StoreError> {
        match self.backend.get(&self.key).await? {
            Some((bytes, version)) => {
                let value = serde_json::from_slice(&bytes)
                    .map_err(|e| StoreError::Codec(e.to_string()))?;
                Ok(Versioned { version, value })
            }
            None => Ok(Versioned::default()),
        }
    }

    async fn write_session_if_unchanged(
        &self,
        expected: Version,
        session: &Session,
    ) -> Result<CommitOutcome, StoreError> {
        let bytes = serde_json::to_vec(session).map_err(|e| StoreError::Codec(e.to_string()))?;
        let outcome = match self.backend.compare_and_set(&self.key, expected, bytes).await? {
            Some(version) => CommitOutcome::Committed(version),
            None => CommitOutcome::Conflict,
        };
        Ok(outcome)
    }
}
