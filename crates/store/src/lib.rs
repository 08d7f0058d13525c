// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! provis-store: keyed stores for task definitions and run summaries

pub mod error;
pub mod run_store;
pub mod task_store;

pub use error::StoreError;
pub use run_store::{MemoryRunStore, RunStore};
pub use task_store::{MemoryTaskStore, TaskStore};
