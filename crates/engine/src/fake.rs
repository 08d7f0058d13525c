// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake connectors for deterministic testing
#![cfg_attr(coverage_nightly, coverage(off))]

use crate::connector::{
    ApplyError, CandidateRecord, CommandRunner, HookRegistry, ProvisioningClient, RecordSource,
    RecordStream, SourceError,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use provis_core::{Disposition, TaskConfig};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Recorded call to the fake connector
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectorCall {
    Open {
        task: String,
        since: Option<u64>,
    },
    Apply {
        record_id: String,
        disposition: Disposition,
    },
    SyncStatus {
        record_id: String,
    },
    Command {
        name: String,
        realm: String,
    },
    Hook {
        name: String,
        record_id: String,
    },
}

struct FakeState {
    records: Vec<CandidateRecord>,
    calls: Vec<ConnectorCall>,
    open_error: Option<String>,
    read_error_after: Option<usize>,
    failing_records: HashSet<String>,
    failing_commands: HashSet<String>,
    failing_hooks: HashSet<String>,
    apply_delay: Option<Duration>,
}

/// Fake connector implementing every connector seam.
///
/// Allows scripting per-record failures and records all calls.
#[derive(Clone)]
pub struct FakeConnector {
    inner: Arc<Mutex<FakeState>>,
}

impl Default for FakeConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeConnector {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeState {
                records: Vec::new(),
                calls: Vec::new(),
                open_error: None,
                read_error_after: None,
                failing_records: HashSet::new(),
                failing_commands: HashSet::new(),
                failing_hooks: HashSet::new(),
                apply_delay: None,
            })),
        }
    }

    /// Records the source will serve, in order.
    pub fn with_records(self, records: Vec<CandidateRecord>) -> Self {
        self.set_records(records);
        self
    }

    /// Replace the records the source will serve.
    pub fn set_records(&self, records: Vec<CandidateRecord>) {
        self.inner.lock().records = records;
    }

    /// Make `apply` fail for the given record id.
    pub fn fail_apply(&self, record_id: &str) {
        self.inner.lock().failing_records.insert(record_id.to_string());
    }

    /// Make the given macro command fail.
    pub fn fail_command(&self, command: &str) {
        self.inner.lock().failing_commands.insert(command.to_string());
    }

    /// Make the given hook fail.
    pub fn fail_hook(&self, hook: &str) {
        self.inner.lock().failing_hooks.insert(hook.to_string());
    }

    /// Make `open` fail with the given message.
    pub fn set_open_error(&self, message: &str) {
        self.inner.lock().open_error = Some(message.to_string());
    }

    /// Make the record stream error after serving `n` records.
    pub fn set_read_error_after(&self, n: usize) {
        self.inner.lock().read_error_after = Some(n);
    }

    /// Delay every apply/command by the given duration.
    pub fn set_apply_delay(&self, delay: Duration) {
        self.inner.lock().apply_delay = Some(delay);
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<ConnectorCall> {
        self.inner.lock().calls.clone()
    }

    /// The `since` argument seen by the most recent `open`.
    pub fn last_since(&self) -> Option<Option<u64>> {
        self.inner.lock().calls.iter().rev().find_map(|c| match c {
            ConnectorCall::Open { since, .. } => Some(*since),
            _ => None,
        })
    }

    fn delay(&self) -> Option<Duration> {
        self.inner.lock().apply_delay
    }
}

#[async_trait]
impl RecordSource for FakeConnector {
    async fn open(
        &self,
        task: &TaskConfig,
        since: Option<u64>,
    ) -> Result<RecordStream, SourceError> {
        let (records, error_after) = {
            let mut state = self.inner.lock();
            state.calls.push(ConnectorCall::Open {
                task: task.name.clone(),
                since,
            });
            if let Some(msg) = &state.open_error {
                return Err(SourceError::Unavailable(msg.clone()));
            }
            (state.records.clone(), state.read_error_after)
        };

        let iter = records
            .into_iter()
            .map(Ok)
            .enumerate()
            .map(move |(i, item)| match error_after {
                Some(n) if i >= n => Err(SourceError::Read("stream broke".to_string())),
                _ => item,
            });
        Ok(Box::new(iter))
    }
}

#[async_trait]
impl ProvisioningClient for FakeConnector {
    async fn apply(
        &self,
        record: &CandidateRecord,
        disposition: Disposition,
        _timeout: Duration,
    ) -> Result<(), ApplyError> {
        if let Some(delay) = self.delay() {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.inner.lock();
        state.calls.push(ConnectorCall::Apply {
            record_id: record.id.clone(),
            disposition,
        });
        if state.failing_records.contains(&record.id) {
            return Err(ApplyError::Rejected(format!("scripted failure: {}", record.id)));
        }
        Ok(())
    }

    async fn sync_status(
        &self,
        record: &CandidateRecord,
        _disposition: Disposition,
    ) -> Result<(), ApplyError> {
        self.inner.lock().calls.push(ConnectorCall::SyncStatus {
            record_id: record.id.clone(),
        });
        Ok(())
    }
}

#[async_trait]
impl CommandRunner for FakeConnector {
    async fn run(&self, command: &str, realm: &str) -> Result<(), ApplyError> {
        if let Some(delay) = self.delay() {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.inner.lock();
        state.calls.push(ConnectorCall::Command {
            name: command.to_string(),
            realm: realm.to_string(),
        });
        if state.failing_commands.contains(command) {
            return Err(ApplyError::Rejected(format!("scripted failure: {}", command)));
        }
        Ok(())
    }
}

#[async_trait]
impl HookRegistry for FakeConnector {
    async fn invoke(
        &self,
        hook: &str,
        record: &CandidateRecord,
        _disposition: Disposition,
    ) -> Result<(), String> {
        let mut state = self.inner.lock();
        state.calls.push(ConnectorCall::Hook {
            name: hook.to_string(),
            record_id: record.id.clone(),
        });
        if state.failing_hooks.contains(hook) {
            return Err(format!("hook '{}' failed", hook));
        }
        Ok(())
    }
}
