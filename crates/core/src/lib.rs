// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! provis-core: domain model for the provis identity-provisioning engine

pub mod clock;
pub mod id;
pub mod rule;
pub mod run;
pub mod task;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod validate;

pub use clock::{Clock, FakeClock, SystemClock};
pub use id::{IdGen, SequentialIdGen, UuidIdGen};
pub use rule::{disposition, Disposition, MatchStatus, NoopReason};
pub use run::{FinishReason, RecordResult, RecordStatus, RunCounts, RunKey, RunOutcome, TaskRun};
pub use task::{
    ConcurrentSettings, MacroSpec, MatchingRule, ProvisioningCommon, PullMode, PullSpec, PushSpec,
    TaskConfig, TaskKey, TaskKind, TaskSpec, UnmatchingRule, ROOT_REALM,
};
pub use validate::{normalize, validate_create, validate_update, ValidationError};
