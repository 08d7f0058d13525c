// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Validate-on-write checks for task definitions.

use crate::task::{PullMode, TaskConfig, TaskKind, TaskSpec, ROOT_REALM};
use thiserror::Error;

/// Malformed task configuration. Never persisted; surfaces synchronously
/// to the caller of create/update.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("field '{0}' must not be blank")]
    BlankField(&'static str),
    #[error("reconFilterBuilder is required when pullMode is FILTERED_RECONCILIATION")]
    MissingReconFilterBuilder,
    #[error("invalid concurrent settings: {0}")]
    InvalidConcurrentSettings(String),
    #[error("invalid cron expression '{expr}': {reason}")]
    InvalidCron { expr: String, reason: String },
    #[error("task key cannot be changed")]
    KeyChanged,
    #[error("task variant cannot be changed from {from} to {to}")]
    VariantChanged { from: TaskKind, to: TaskKind },
    #[error("draft must not carry a key (assigned at creation)")]
    DraftHasKey,
    #[error("task not found: {0}")]
    UnknownTask(String),
}

/// Fill write-time defaults: blank realm scopes fall back to the root
/// realm, and a recon filter builder is cleared (disabled) unless the pull
/// mode is FILTERED_RECONCILIATION.
pub fn normalize(task: &mut TaskConfig) {
    match &mut task.spec {
        TaskSpec::Macro(m) => {
            if m.realm.trim().is_empty() {
                m.realm = ROOT_REALM.to_string();
            }
        }
        TaskSpec::Pull(p) => {
            if p.destination_realm.trim().is_empty() {
                p.destination_realm = ROOT_REALM.to_string();
            }
            if p.pull_mode != PullMode::FilteredReconciliation {
                p.recon_filter_builder = None;
            }
        }
        TaskSpec::Generic | TaskSpec::Push(_) => {}
    }
}

/// Checks shared by create and update.
fn validate_fields(task: &TaskConfig) -> Result<(), ValidationError> {
    if task.name.trim().is_empty() {
        return Err(ValidationError::BlankField("name"));
    }
    if task.job_delegate.trim().is_empty() {
        return Err(ValidationError::BlankField("jobDelegate"));
    }

    match &task.spec {
        TaskSpec::Generic => {}
        TaskSpec::Macro(m) => {
            if m.realm.trim().is_empty() {
                return Err(ValidationError::BlankField("realm"));
            }
        }
        TaskSpec::Pull(p) => {
            if p.destination_realm.trim().is_empty() {
                return Err(ValidationError::BlankField("destinationRealm"));
            }
            if p.pull_mode == PullMode::FilteredReconciliation
                && p.recon_filter_builder
                    .as_deref()
                    .map_or(true, |f| f.trim().is_empty())
            {
                return Err(ValidationError::MissingReconFilterBuilder);
            }
        }
        TaskSpec::Push(p) => {
            if p.source_realm.trim().is_empty() {
                return Err(ValidationError::BlankField("sourceRealm"));
            }
        }
    }

    if let Some(settings) = task.concurrent_settings() {
        if settings.core_pool_size < 1 || settings.max_pool_size < 1 || settings.queue_capacity < 1
        {
            return Err(ValidationError::InvalidConcurrentSettings(
                "all pool parameters must be >= 1".to_string(),
            ));
        }
        if settings.core_pool_size > settings.max_pool_size {
            return Err(ValidationError::InvalidConcurrentSettings(format!(
                "corePoolSize {} exceeds maxPoolSize {}",
                settings.core_pool_size, settings.max_pool_size
            )));
        }
    }

    Ok(())
}

/// Validate a draft about to be created. The draft must not carry a key;
/// one is assigned by the caller after validation passes.
pub fn validate_create(task: &TaskConfig) -> Result<(), ValidationError> {
    if task.key.is_some() {
        return Err(ValidationError::DraftHasKey);
    }
    validate_fields(task)
}

/// Validate an update against the stored task. Any field may change
/// except the key and the concrete variant.
pub fn validate_update(existing: &TaskConfig, updated: &TaskConfig) -> Result<(), ValidationError> {
    if updated.key != existing.key {
        return Err(ValidationError::KeyChanged);
    }
    if updated.kind() != existing.kind() {
        return Err(ValidationError::VariantChanged {
            from: existing.kind(),
            to: updated.kind(),
        });
    }
    validate_fields(updated)
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
