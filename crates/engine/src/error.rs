// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the engine runtime

use provis_core::ValidationError;
use provis_store::StoreError;
use thiserror::Error;

/// Errors that can occur in the provisioning engine.
///
/// Only `Validation` and `Store` surface synchronously to API callers;
/// run-time failures are captured into the persisted run summary since
/// triggers are asynchronous and have no caller to report to.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("run admission denied for task {0}")]
    GuardDenied(String),
    #[error("run not found: {0}")]
    RunNotFound(String),
    #[error("fatal: {0}")]
    Fatal(String),
}
