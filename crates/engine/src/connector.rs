// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connector seams to the external collaborators: record source,
//! target/source system client, macro command runner, and action hooks.

use async_trait::async_trait;
use provis_core::{Disposition, MatchStatus, TaskConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// One externally-observed identity record, pre-matched against the
/// authoritative store by the realm/record source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub id: String,
    pub match_status: MatchStatus,
    /// Opaque attribute payload, forwarded to the client untouched.
    #[serde(default)]
    pub attrs: serde_json::Value,
}

impl CandidateRecord {
    pub fn unmatched(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            match_status: MatchStatus::Unmatched,
            attrs: serde_json::Value::Null,
        }
    }

    pub fn matched(id: impl Into<String>, identity: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            match_status: MatchStatus::Matched {
                identity: identity.into(),
                vanished: false,
            },
            attrs: serde_json::Value::Null,
        }
    }

    pub fn vanished(id: impl Into<String>, identity: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            match_status: MatchStatus::Matched {
                identity: identity.into(),
                vanished: true,
            },
            attrs: serde_json::Value::Null,
        }
    }
}

/// Failure opening or reading the candidate record sequence. Always fatal
/// for the run (the sequence is restartable only via a new run).
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    #[error("record source unavailable: {0}")]
    Unavailable(String),
    #[error("record source read failed: {0}")]
    Read(String),
}

/// Typed failure from the external target/source system.
#[derive(Debug, Clone, Error)]
pub enum ApplyError {
    #[error("rejected by external system: {0}")]
    Rejected(String),
    #[error("external system unreachable: {0}")]
    Unreachable(String),
    #[error("apply timed out")]
    Timeout,
}

/// Lazy sequence of candidate records for one run.
pub type RecordStream = Box<dyn Iterator<Item = Result<CandidateRecord, SourceError>> + Send>;

/// Produces the candidate records for a task's scope and filter, each
/// pre-matched against the authoritative store.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Open the record sequence for one run. `since` is the start time
    /// (epoch ms) of the last successful run, set only for incremental
    /// pull.
    async fn open(&self, task: &TaskConfig, since: Option<u64>)
        -> Result<RecordStream, SourceError>;
}

/// Performs CREATE/UPDATE/DELETE against the external identity system.
#[async_trait]
pub trait ProvisioningClient: Send + Sync {
    /// Apply one disposition. Implementations should honor `timeout` as a
    /// per-call bound; the engine additionally enforces it.
    async fn apply(
        &self,
        record: &CandidateRecord,
        disposition: Disposition,
        timeout: Duration,
    ) -> Result<(), ApplyError>;

    /// Stamp the sync-state attribute on the authoritative record after a
    /// successful apply.
    async fn sync_status(
        &self,
        record: &CandidateRecord,
        disposition: Disposition,
    ) -> Result<(), ApplyError>;
}

/// Executes one macro command within a realm.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &str, realm: &str) -> Result<(), ApplyError>;
}

/// Invokes post-processing action hooks after a successful apply.
/// Hook failure is reported but never reverts the apply.
#[async_trait]
pub trait HookRegistry: Send + Sync {
    async fn invoke(
        &self,
        hook: &str,
        record: &CandidateRecord,
        disposition: Disposition,
    ) -> Result<(), String>;
}
