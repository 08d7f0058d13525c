// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Keyed store for run summaries.

use crate::error::StoreError;
use parking_lot::RwLock;
use provis_core::{RunKey, RunOutcome, TaskKey, TaskRun};
use std::collections::HashMap;

/// Persistence contract for run summaries.
pub trait RunStore: Send + Sync {
    fn get(&self, key: &RunKey) -> Result<TaskRun, StoreError>;
    fn save(&self, run: TaskRun) -> Result<(), StoreError>;
    /// Runs for a task, most recent first.
    fn list_runs(&self, task_key: &TaskKey) -> Result<Vec<TaskRun>, StoreError>;
    /// Start time of the most recent successful run, for incremental pull.
    fn last_success_ms(&self, task_key: &TaskKey) -> Result<Option<u64>, StoreError>;
}

/// In-memory run store.
#[derive(Default)]
pub struct MemoryRunStore {
    runs: RwLock<HashMap<RunKey, TaskRun>>,
}

impl MemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RunStore for MemoryRunStore {
    fn get(&self, key: &RunKey) -> Result<TaskRun, StoreError> {
        self.runs
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::RunNotFound(key.to_string()))
    }

    fn save(&self, run: TaskRun) -> Result<(), StoreError> {
        tracing::debug!(
            run = %run.run_key,
            task = %run.task_key,
            outcome = %run.outcome,
            "saving run summary"
        );
        self.runs.write().insert(run.run_key.clone(), run);
        Ok(())
    }

    fn list_runs(&self, task_key: &TaskKey) -> Result<Vec<TaskRun>, StoreError> {
        let mut runs: Vec<TaskRun> = self
            .runs
            .read()
            .values()
            .filter(|r| &r.task_key == task_key)
            .cloned()
            .collect();
        runs.sort_by(|a, b| b.started_at_ms.cmp(&a.started_at_ms));
        Ok(runs)
    }

    fn last_success_ms(&self, task_key: &TaskKey) -> Result<Option<u64>, StoreError> {
        Ok(self
            .runs
            .read()
            .values()
            .filter(|r| &r.task_key == task_key && r.outcome == RunOutcome::Success)
            .map(|r| r.started_at_ms)
            .max())
    }
}

#[cfg(test)]
#[path = "run_store_tests.rs"]
mod tests;
