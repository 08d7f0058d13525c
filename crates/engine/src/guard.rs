// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run guard: per-task run-level concurrency control.

use parking_lot::Mutex;
use provis_core::TaskKey;
use std::collections::HashMap;

/// Outcome of asking the guard to admit a triggered run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The run may start now.
    Granted,
    /// A run is already in flight; this trigger is queued as the single
    /// follow-up run that launches when the current one completes.
    Queued,
    /// A run is in flight and a follow-up is already queued; this trigger
    /// is skipped (logged, recorded, never silently lost beyond the one).
    Denied,
}

#[derive(Debug, Default)]
struct TaskGuardState {
    running: usize,
    follow_up_queued: bool,
}

/// Mediates run-level concurrency per task.
///
/// Serialized tasks (no concurrent settings) get at most one running
/// instance; tasks that opted into concurrent settings are admitted
/// unconditionally — their per-record work is bounded by the execution
/// pool instead.
#[derive(Debug, Default)]
pub struct RunGuard {
    states: Mutex<HashMap<TaskKey, TaskGuardState>>,
}

impl RunGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask to admit a triggered run. `serialized` is false when the task
    /// carries concurrent settings.
    pub fn try_admit(&self, key: &TaskKey, serialized: bool) -> Admission {
        let mut states = self.states.lock();
        let state = states.entry(key.clone()).or_default();

        if !serialized || state.running == 0 {
            state.running += 1;
            return Admission::Granted;
        }
        if !state.follow_up_queued {
            state.follow_up_queued = true;
            tracing::warn!(task = %key, "run in flight, queueing one follow-up");
            return Admission::Queued;
        }
        tracing::warn!(task = %key, "run in flight and follow-up queued, skipping trigger");
        Admission::Denied
    }

    /// Release a completed run's slot. Returns true when a queued
    /// follow-up should be launched by the caller (which re-admits).
    pub fn release(&self, key: &TaskKey) -> bool {
        let mut states = self.states.lock();
        let Some(state) = states.get_mut(key) else {
            // Task deleted mid-run; nothing to release or relaunch.
            return false;
        };
        state.running = state.running.saturating_sub(1);
        if state.running == 0 && state.follow_up_queued {
            state.follow_up_queued = false;
            return true;
        }
        if state.running == 0 && !state.follow_up_queued {
            states.remove(key);
        }
        false
    }

    /// Number of currently running instances for a task.
    pub fn running(&self, key: &TaskKey) -> usize {
        self.states.lock().get(key).map_or(0, |s| s.running)
    }

    /// Forget a task entirely: drops its queued follow-up so no orphan run
    /// launches after deletion.
    pub fn clear(&self, key: &TaskKey) {
        self.states.lock().remove(key);
    }
}

#[cfg(test)]
#[path = "guard_tests.rs"]
mod tests;
