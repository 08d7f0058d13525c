// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Provisioning engine: cron scheduling, run admission, the bounded
//! execution pool, and the pipeline runner that drives task runs.

pub mod connector;
pub mod error;
#[cfg(any(test, feature = "test-support"))]
pub mod fake;
pub mod guard;
pub mod pool;
pub mod runner;
pub mod scheduler;
pub mod service;

pub use connector::{
    ApplyError, CandidateRecord, CommandRunner, HookRegistry, ProvisioningClient, RecordSource,
    RecordStream, SourceError,
};
pub use error::EngineError;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{ConnectorCall, FakeConnector};
pub use guard::{Admission, RunGuard};
pub use pool::{effective_settings, ApplyJob, ExecutionPool};
pub use runner::{CancelFlag, PipelineRunner, DEFAULT_APPLY_TIMEOUT, OVERLOAD_BACKOFF};
pub use scheduler::{parse_cron, utc_from_epoch_ms, CronScheduler};
pub use service::ProvisioningService;
