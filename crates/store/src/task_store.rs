// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Keyed store for task definitions.

use crate::error::StoreError;
use parking_lot::RwLock;
use provis_core::{TaskConfig, TaskKey};
use std::collections::HashMap;

/// Keyed persistence contract for task definitions.
///
/// The store holds only validated tasks; the service layer validates
/// before calling `save`.
pub trait TaskStore: Send + Sync {
    fn get(&self, key: &TaskKey) -> Result<TaskConfig, StoreError>;
    fn list(&self) -> Result<Vec<TaskConfig>, StoreError>;
    fn save(&self, task: TaskConfig) -> Result<(), StoreError>;
    fn delete(&self, key: &TaskKey) -> Result<(), StoreError>;
}

/// In-memory task store.
#[derive(Default)]
pub struct MemoryTaskStore {
    tasks: RwLock<HashMap<TaskKey, TaskConfig>>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TaskStore for MemoryTaskStore {
    fn get(&self, key: &TaskKey) -> Result<TaskConfig, StoreError> {
        self.tasks
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::TaskNotFound(key.to_string()))
    }

    fn list(&self) -> Result<Vec<TaskConfig>, StoreError> {
        let mut tasks: Vec<TaskConfig> = self.tasks.read().values().cloned().collect();
        // Deterministic listing order for display and tests
        tasks.sort_by(|a, b| {
            let ka = a.key.as_ref().map(|k| k.as_str());
            let kb = b.key.as_ref().map(|k| k.as_str());
            ka.cmp(&kb)
        });
        Ok(tasks)
    }

    fn save(&self, task: TaskConfig) -> Result<(), StoreError> {
        let Some(key) = task.key.clone() else {
            return Err(StoreError::Unavailable(
                "refusing to save a task without a key".to_string(),
            ));
        };
        self.tasks.write().insert(key, task);
        Ok(())
    }

    fn delete(&self, key: &TaskKey) -> Result<(), StoreError> {
        match self.tasks.write().remove(key) {
            Some(_) => Ok(()),
            None => Err(StoreError::TaskNotFound(key.to_string())),
        }
    }
}

#[cfg(test)]
#[path = "task_store_tests.rs"]
mod tests;
