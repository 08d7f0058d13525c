// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run records: one execution instance of a task and its per-record results.

use crate::rule::Disposition;
use crate::task::TaskKey;
use serde::{Deserialize, Serialize};
use std::fmt;

crate::define_id! {
    /// Unique identifier for a task run.
    #[derive(Default)]
    pub struct RunKey;
}

/// Overall outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every record applied (or was a recorded no-op).
    Success,
    /// Some records failed but the continuation policy tolerated them.
    Partial,
    /// The run aborted, was cancelled, or was denied admission.
    Failed,
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Success => write!(f, "success"),
            RunOutcome::Partial => write!(f, "partial"),
            RunOutcome::Failed => write!(f, "failed"),
        }
    }
}

/// Why a run finished with [`RunOutcome::Failed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Explicit operator stop request.
    Cancelled,
    /// The run guard refused admission (serialization policy skip).
    GuardDenied,
    /// Infrastructure failure (store unreachable, source unopenable).
    Fatal,
    /// A per-record failure aborted the run (no continuation policy).
    RecordFailure,
}

impl fmt::Display for FinishReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FinishReason::Cancelled => write!(f, "cancelled"),
            FinishReason::GuardDenied => write!(f, "guard-denied"),
            FinishReason::Fatal => write!(f, "fatal"),
            FinishReason::RecordFailure => write!(f, "record-failure"),
        }
    }
}

/// Per-record result status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// The disposition executed against the external system.
    Applied,
    /// No external side effect; still recorded for audit.
    Noop,
    /// The apply failed.
    Failed,
    /// The apply failed and was captured as a remediation item.
    Remediated,
    /// Admitted to the run but never applied; the run was cancelled
    /// first. Recorded so the summary accounts for every admitted record.
    Cancelled,
}

/// Result for one record (or one macro command) within a run.
///
/// `seq` is the provisional sequence assigned at submission; the persisted
/// run preserves submission order even though completions may interleave.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordResult {
    pub seq: u64,
    pub record_id: String,
    /// Absent for macro command entries, which carry no rule disposition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disposition: Option<Disposition>,
    pub status: RecordStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Post-apply hook failures; reported, never reverting the apply.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hook_errors: Vec<String>,
}

/// Aggregate counts, retained even when per-record detail is discarded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounts {
    pub total: u64,
    pub applied: u64,
    pub noop: u64,
    pub failed: u64,
    pub remediated: u64,
    pub cancelled: u64,
}

impl RunCounts {
    pub fn tally(records: &[RecordResult]) -> Self {
        let mut counts = Self::default();
        for r in records {
            counts.total += 1;
            match r.status {
                RecordStatus::Applied => counts.applied += 1,
                RecordStatus::Noop => counts.noop += 1,
                RecordStatus::Failed => counts.failed += 1,
                RecordStatus::Remediated => counts.remediated += 1,
                RecordStatus::Cancelled => counts.cancelled += 1,
            }
        }
        counts
    }
}

/// One execution instance of a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRun {
    pub run_key: RunKey,
    pub task_key: TaskKey,
    pub started_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at_ms: Option<u64>,
    pub outcome: RunOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
    #[serde(default)]
    pub counts: RunCounts,
    /// Ordered by submission sequence. May be empty when the task's
    /// `save_execs` policy discards detail.
    #[serde(default)]
    pub records: Vec<RecordResult>,
}

impl TaskRun {
    /// Copy with per-record detail dropped (for `save_execs = false`);
    /// outcome and counts are retained for scheduling and audit.
    pub fn without_records(mut self) -> Self {
        self.records.clear();
        self
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
