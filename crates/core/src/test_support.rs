// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::task::{
    MacroSpec, ProvisioningCommon, PullMode, PullSpec, PushSpec, TaskConfig, TaskSpec, ROOT_REALM,
};
use indexmap::IndexMap;

// ── Task factory functions ──────────────────────────────────────────────────

/// Pull task draft: full reconciliation into the root realm, default rules.
pub fn pull_task() -> TaskConfig {
    TaskConfig {
        key: None,
        name: "pull users".to_string(),
        description: String::new(),
        active: true,
        job_delegate: "PullJobDelegate".to_string(),
        cron_expression: None,
        spec: TaskSpec::Pull(PullSpec {
            provisioning: ProvisioningCommon::default(),
            pull_mode: PullMode::FullReconciliation,
            recon_filter_builder: None,
            destination_realm: ROOT_REALM.to_string(),
            remediation: false,
        }),
    }
}

/// Push task draft sourcing from the root realm, no filters.
pub fn push_task() -> TaskConfig {
    TaskConfig {
        key: None,
        name: "push users".to_string(),
        description: String::new(),
        active: true,
        job_delegate: "PushJobDelegate".to_string(),
        cron_expression: None,
        spec: TaskSpec::Push(PushSpec {
            provisioning: ProvisioningCommon::default(),
            source_realm: ROOT_REALM.to_string(),
            filters: IndexMap::new(),
        }),
    }
}

/// Macro task draft running the given commands in the root realm.
pub fn macro_task(commands: &[&str]) -> TaskConfig {
    TaskConfig {
        key: None,
        name: "macro".to_string(),
        description: String::new(),
        active: true,
        job_delegate: "MacroJobDelegate".to_string(),
        cron_expression: None,
        spec: TaskSpec::Macro(MacroSpec {
            realm: ROOT_REALM.to_string(),
            commands: commands.iter().map(|c| c.to_string()).collect(),
            continue_on_error: false,
            save_execs: true,
        }),
    }
}

/// Generic scheduled task draft (no variant specifics).
pub fn generic_task() -> TaskConfig {
    TaskConfig {
        key: None,
        name: "housekeeping".to_string(),
        description: String::new(),
        active: true,
        job_delegate: "NotificationJobDelegate".to_string(),
        cron_expression: None,
        spec: TaskSpec::Generic,
    }
}
