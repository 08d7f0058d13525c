// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cron trigger scheduling

use chrono::{DateTime, Utc};
use croner::Cron;
use provis_core::{TaskKey, ValidationError};
use std::collections::HashMap;

/// Scheduler entry
#[derive(Debug, Clone)]
struct Entry {
    cron: Cron,
    next: DateTime<Utc>,
}

/// Tracks the next cron occurrence per task and drains due triggers.
///
/// The scheduler is a single logical timer source: triggers never
/// self-overlap here; run-level concurrency is the run guard's job.
#[derive(Debug, Default)]
pub struct CronScheduler {
    entries: HashMap<TaskKey, Entry>,
}

/// Parse and validate a cron expression (seconds field optional).
pub fn parse_cron(expr: &str) -> Result<Cron, ValidationError> {
    Cron::new(expr)
        .with_seconds_optional()
        .parse()
        .map_err(|e| ValidationError::InvalidCron {
            expr: expr.to_string(),
            reason: e.to_string(),
        })
}

/// Convert engine epoch milliseconds into the scheduler's time base.
pub fn utc_from_epoch_ms(ms: u64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms as i64).unwrap_or_default()
}

impl CronScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the cron schedule for a task.
    pub fn schedule(
        &mut self,
        key: TaskKey,
        expr: &str,
        now: DateTime<Utc>,
    ) -> Result<(), ValidationError> {
        let cron = parse_cron(expr)?;
        let next = cron
            .find_next_occurrence(&now, false)
            .map_err(|e| ValidationError::InvalidCron {
                expr: expr.to_string(),
                reason: e.to_string(),
            })?;
        self.entries.insert(key, Entry { cron, next });
        Ok(())
    }

    /// Drop a task's schedule (deletion, deactivation, cron removal).
    pub fn unschedule(&mut self, key: &TaskKey) {
        self.entries.remove(key);
    }

    pub fn is_scheduled(&self, key: &TaskKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Drain tasks whose next occurrence has arrived, advancing each to
    /// its following occurrence. A task that can no longer produce an
    /// occurrence is unscheduled.
    pub fn due(&mut self, now: DateTime<Utc>) -> Vec<TaskKey> {
        let mut fired = Vec::new();
        let mut exhausted = Vec::new();

        for (key, entry) in &mut self.entries {
            if entry.next > now {
                continue;
            }
            fired.push(key.clone());
            match entry.cron.find_next_occurrence(&now, false) {
                Ok(next) => entry.next = next,
                Err(e) => {
                    tracing::warn!(task = %key, error = %e, "no further cron occurrence");
                    exhausted.push(key.clone());
                }
            }
        }

        for key in exhausted {
            self.entries.remove(&key);
        }

        // Deterministic trigger order when several tasks fire together
        fired.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        fired
    }

    /// Next occurrence across all scheduled tasks.
    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.entries.values().map(|e| e.next).min()
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
