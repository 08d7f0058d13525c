// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded execution pool for per-record apply work.
//!
//! Admission order mirrors the classic thread-pool contract: fill the core
//! workers, then the bounded queue, then scale out to the ceiling, then
//! reject. The pool's counters and queue are the only state shared across
//! workers; everything else flows through the result sink the submitted
//! jobs carry.

use parking_lot::Mutex;
use provis_core::ConcurrentSettings;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// One unit of apply work. Jobs own their inputs and report through the
/// sink they capture; the pool never inspects results.
pub type ApplyJob = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Pool parameters when a task carries no concurrent settings: a single
/// worker applying records sequentially, one slot of lookahead.
pub fn effective_settings(settings: Option<ConcurrentSettings>) -> ConcurrentSettings {
    settings.unwrap_or(ConcurrentSettings {
        core_pool_size: 1,
        max_pool_size: 1,
        queue_capacity: 1,
    })
}

#[derive(Default)]
struct PoolState {
    running: usize,
    queued: VecDeque<ApplyJob>,
}

/// Bounded worker pool scoped to one task run.
#[derive(Clone)]
pub struct ExecutionPool {
    state: Arc<Mutex<PoolState>>,
    settings: ConcurrentSettings,
}

impl ExecutionPool {
    pub fn new(settings: ConcurrentSettings) -> Self {
        Self {
            state: Arc::new(Mutex::new(PoolState::default())),
            settings,
        }
    }

    /// Submit a job, or hand it back when the pool is saturated
    /// (`max_pool_size` workers busy and `queue_capacity` jobs waiting).
    /// Saturation is backpressure, not failure: callers retry after
    /// yielding, they never drop the job silently.
    pub fn try_submit(&self, job: ApplyJob) -> Result<(), ApplyJob> {
        let mut state = self.state.lock();

        if state.running < self.settings.core_pool_size {
            state.running += 1;
            self.spawn_worker(job);
            return Ok(());
        }
        if state.queued.len() < self.settings.queue_capacity {
            state.queued.push_back(job);
            return Ok(());
        }
        if state.running < self.settings.max_pool_size {
            state.running += 1;
            self.spawn_worker(job);
            return Ok(());
        }
        Err(job)
    }

    /// Workers drain the queue after their own job, then retire.
    fn spawn_worker(&self, job: ApplyJob) {
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let mut job = job;
            loop {
                job.await;
                let next = {
                    let mut s = state.lock();
                    match s.queued.pop_front() {
                        Some(next) => next,
                        None => {
                            s.running -= 1;
                            break;
                        }
                    }
                };
                job = next;
            }
        });
    }

    /// Currently busy workers.
    pub fn running(&self) -> usize {
        self.state.lock().running
    }

    /// Jobs waiting in the backlog.
    pub fn queued(&self) -> usize {
        self.state.lock().queued.len()
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
