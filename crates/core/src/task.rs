// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Provisioning task model: scheduled-task fields plus per-variant specifics.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

crate::define_id! {
    /// Unique identifier for a task definition.
    ///
    /// Assigned once at creation and never reused; a draft submitted to
    /// `create` carries no key yet.
    #[derive(Default)]
    pub struct TaskKey;
}

/// The top-level realm every scope falls back to when left blank.
pub const ROOT_REALM: &str = "/";

/// Policy applied when an external record matches an authoritative record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchingRule {
    Update,
    Ignore,
    Skip,
}

impl fmt::Display for MatchingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchingRule::Update => write!(f, "UPDATE"),
            MatchingRule::Ignore => write!(f, "IGNORE"),
            MatchingRule::Skip => write!(f, "SKIP"),
        }
    }
}

/// Policy applied when an external record has no authoritative counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnmatchingRule {
    Assign,
    Provision,
    Ignore,
}

impl fmt::Display for UnmatchingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnmatchingRule::Assign => write!(f, "ASSIGN"),
            UnmatchingRule::Provision => write!(f, "PROVISION"),
            UnmatchingRule::Ignore => write!(f, "IGNORE"),
        }
    }
}

/// How a pull task selects candidate records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PullMode {
    FullReconciliation,
    Incremental,
    FilteredReconciliation,
}

impl fmt::Display for PullMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PullMode::FullReconciliation => write!(f, "FULL_RECONCILIATION"),
            PullMode::Incremental => write!(f, "INCREMENTAL"),
            PullMode::FilteredReconciliation => write!(f, "FILTERED_RECONCILIATION"),
        }
    }
}

/// Bounded-pool parameters for per-record apply work.
///
/// All three fields are required together: a task either opts into
/// concurrent execution with a fully-populated settings block or carries
/// none at all. Partially-populated JSON fails deserialization since no
/// field has a default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcurrentSettings {
    pub core_pool_size: usize,
    pub max_pool_size: usize,
    pub queue_capacity: usize,
}

/// Fields shared by pull and push tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvisioningCommon {
    pub matching_rule: MatchingRule,
    pub unmatching_rule: UnmatchingRule,
    pub perform_create: bool,
    pub perform_update: bool,
    pub perform_delete: bool,
    /// When true, a successful apply also stamps a sync-state attribute on
    /// the authoritative record. Never changes the disposition.
    pub sync_status: bool,
    /// Ordered post-processing hook identifiers, invoked after a
    /// successful apply.
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrent_settings: Option<ConcurrentSettings>,
}

impl Default for ProvisioningCommon {
    fn default() -> Self {
        Self {
            matching_rule: MatchingRule::Update,
            unmatching_rule: UnmatchingRule::Provision,
            perform_create: true,
            perform_update: true,
            perform_delete: false,
            sync_status: false,
            actions: Vec::new(),
            concurrent_settings: None,
        }
    }
}

/// Macro task specifics: an ordered command list executed within a realm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroSpec {
    pub realm: String,
    /// Ordered command identifiers; each becomes one entry in the run.
    #[serde(default)]
    pub commands: Vec<String>,
    #[serde(default)]
    pub continue_on_error: bool,
    /// When false, the persisted run keeps the outcome and counts but
    /// drops per-command detail.
    #[serde(default = "default_true")]
    pub save_execs: bool,
}

fn default_true() -> bool {
    true
}

/// Pull task specifics: reconcile external records into a destination realm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullSpec {
    #[serde(flatten)]
    pub provisioning: ProvisioningCommon,
    pub pull_mode: PullMode,
    /// Identifier of the filter used to select candidates. Meaningful only
    /// under `FILTERED_RECONCILIATION`; cleared otherwise at write time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recon_filter_builder: Option<String>,
    pub destination_realm: String,
    /// Capture per-record apply failures as remediation items instead of
    /// aborting the run.
    #[serde(default)]
    pub remediation: bool,
}

/// Push task specifics: propagate authoritative records outward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushSpec {
    #[serde(flatten)]
    pub provisioning: ProvisioningCommon,
    pub source_realm: String,
    /// Boolean search expressions keyed by target-system object class,
    /// evaluated in insertion order.
    #[serde(default)]
    pub filters: IndexMap<String, String>,
}

/// Per-variant task specifics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskSpec {
    Generic,
    Macro(MacroSpec),
    Pull(PullSpec),
    Push(PushSpec),
}

/// Tag-only variant of [`TaskSpec`] for variant-immutability checks and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Generic,
    Macro,
    Pull,
    Push,
}

impl From<&TaskSpec> for TaskKind {
    fn from(spec: &TaskSpec) -> Self {
        match spec {
            TaskSpec::Generic => TaskKind::Generic,
            TaskSpec::Macro(_) => TaskKind::Macro,
            TaskSpec::Pull(_) => TaskKind::Pull,
            TaskSpec::Push(_) => TaskKind::Push,
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Generic => write!(f, "generic"),
            TaskKind::Macro => write!(f, "macro"),
            TaskKind::Pull => write!(f, "pull"),
            TaskKind::Push => write!(f, "push"),
        }
    }
}

/// A scheduled task definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Absent on create drafts; assigned by the service, immutable after.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<TaskKey>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub active: bool,
    /// Identifier of the executable unit; immutable once a key is assigned.
    pub job_delegate: String,
    /// Absent means manually-triggered only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron_expression: Option<String>,
    #[serde(flatten)]
    pub spec: TaskSpec,
}

impl TaskConfig {
    pub fn kind(&self) -> TaskKind {
        TaskKind::from(&self.spec)
    }

    /// Provisioning fields, when this is a pull or push task.
    pub fn provisioning(&self) -> Option<&ProvisioningCommon> {
        match &self.spec {
            TaskSpec::Pull(p) => Some(&p.provisioning),
            TaskSpec::Push(p) => Some(&p.provisioning),
            TaskSpec::Generic | TaskSpec::Macro(_) => None,
        }
    }

    pub fn concurrent_settings(&self) -> Option<ConcurrentSettings> {
        self.provisioning().and_then(|p| p.concurrent_settings)
    }

    /// Whole-run serialization applies unless the task opted into
    /// concurrent settings.
    pub fn is_serialized(&self) -> bool {
        self.concurrent_settings().is_none()
    }

    /// The realm scoping this task's candidate records.
    pub fn scope(&self) -> &str {
        match &self.spec {
            TaskSpec::Generic => ROOT_REALM,
            TaskSpec::Macro(m) => &m.realm,
            TaskSpec::Pull(p) => &p.destination_realm,
            TaskSpec::Push(p) => &p.source_realm,
        }
    }

    /// Tolerate per-record failures and keep the run going.
    pub fn continues_on_failure(&self) -> bool {
        match &self.spec {
            TaskSpec::Macro(m) => m.continue_on_error,
            TaskSpec::Pull(p) => p.remediation,
            TaskSpec::Generic | TaskSpec::Push(_) => false,
        }
    }

    /// Capture failures as remediation items (pull only).
    pub fn remediation(&self) -> bool {
        matches!(&self.spec, TaskSpec::Pull(p) if p.remediation)
    }

    /// Keep per-record detail in the persisted run.
    pub fn save_execs(&self) -> bool {
        match &self.spec {
            TaskSpec::Macro(m) => m.save_execs,
            _ => true,
        }
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
