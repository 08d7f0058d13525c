// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Provisioning service: task lifecycle, triggering, and run tracking.

use crate::error::EngineError;
use crate::guard::{Admission, RunGuard};
use crate::runner::{CancelFlag, PipelineRunner};
use crate::scheduler::{parse_cron, utc_from_epoch_ms, CronScheduler};
use parking_lot::Mutex;
use provis_core::{
    normalize, validate_create, validate_update, Clock, FinishReason, IdGen, RunCounts, RunKey,
    RunOutcome, TaskConfig, TaskKey, TaskRun,
};
use provis_store::{RunStore, StoreError, TaskStore};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;

struct ActiveRun {
    task_key: TaskKey,
    cancel: CancelFlag,
    handle: Option<JoinHandle<()>>,
}

struct ServiceInner<C: Clock, G: IdGen> {
    tasks: Arc<dyn TaskStore>,
    runs: Arc<dyn RunStore>,
    runner: PipelineRunner<C>,
    guard: RunGuard,
    scheduler: Mutex<CronScheduler>,
    active: Mutex<HashMap<RunKey, ActiveRun>>,
    clock: C,
    ids: G,
}

/// Front door for task management and run control.
///
/// Cheap to clone; all state lives behind the shared inner.
pub struct ProvisioningService<C: Clock, G: IdGen> {
    inner: Arc<ServiceInner<C, G>>,
}

impl<C: Clock, G: IdGen> Clone for ProvisioningService<C, G> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Clock, G: IdGen + 'static> ProvisioningService<C, G> {
    pub fn new(
        tasks: Arc<dyn TaskStore>,
        runs: Arc<dyn RunStore>,
        runner: PipelineRunner<C>,
        clock: C,
        ids: G,
    ) -> Self {
        Self {
            inner: Arc::new(ServiceInner {
                tasks,
                runs,
                runner,
                guard: RunGuard::new(),
                scheduler: Mutex::new(CronScheduler::new()),
                active: Mutex::new(HashMap::new()),
                clock,
                ids,
            }),
        }
    }

    /// Validate and persist a new task, assigning its key. Nothing is
    /// stored if validation fails.
    pub fn create_task(&self, mut task: TaskConfig) -> Result<TaskConfig, EngineError> {
        normalize(&mut task);
        validate_create(&task)?;
        if let Some(expr) = &task.cron_expression {
            parse_cron(expr)?;
        }
        let key = TaskKey::from(self.inner.ids.next());
        task.key = Some(key.clone());
        self.inner.tasks.save(task.clone())?;
        tracing::info!(task = %key, name = %task.name, kind = %task.kind(), "task created");
        self.reschedule(&key, &task);
        Ok(task)
    }

    /// Validate and persist changes to an existing task. The key and the
    /// task variant are immutable.
    pub fn update_task(&self, mut task: TaskConfig) -> Result<TaskConfig, EngineError> {
        let key = task
            .key
            .clone()
            .ok_or_else(|| StoreError::TaskNotFound("task without key".to_string()))?;
        let existing = self.inner.tasks.get(&key)?;
        normalize(&mut task);
        validate_update(&existing, &task)?;
        if let Some(expr) = &task.cron_expression {
            parse_cron(expr)?;
        }
        self.inner.tasks.save(task.clone())?;
        tracing::info!(task = %key, "task updated");
        self.reschedule(&key, &task);
        Ok(task)
    }

    /// Delete a task, cancelling its active runs and dropping any queued
    /// follow-up and cron schedule. Persisted run history is kept.
    pub fn delete_task(&self, key: &TaskKey) -> Result<(), EngineError> {
        self.inner.tasks.get(key)?;
        {
            let active = self.inner.active.lock();
            for run in active.values().filter(|r| &r.task_key == key) {
                run.cancel.cancel();
            }
        }
        self.inner.guard.clear(key);
        self.inner.scheduler.lock().unschedule(key);
        self.inner.tasks.delete(key)?;
        tracing::info!(task = %key, "task deleted");
        Ok(())
    }

    pub fn get_task(&self, key: &TaskKey) -> Result<TaskConfig, EngineError> {
        Ok(self.inner.tasks.get(key)?)
    }

    pub fn list_tasks(&self) -> Result<Vec<TaskConfig>, EngineError> {
        Ok(self.inner.tasks.list()?)
    }

    /// Trigger a run now. The returned key identifies either the launched
    /// run or, when the guard turns the trigger away, the persisted
    /// skip record.
    pub fn trigger_run(&self, key: &TaskKey) -> Result<RunKey, EngineError> {
        let task = self.inner.tasks.get(key)?;
        if !task.active {
            return Err(EngineError::GuardDenied(format!(
                "task {} is inactive",
                key
            )));
        }

        match self.inner.guard.try_admit(key, task.is_serialized()) {
            Admission::Granted => Ok(self.launch(task)),
            Admission::Queued | Admission::Denied => Ok(self.record_guard_skip(key)?),
        }
    }

    /// Cooperatively cancel a running run.
    pub fn cancel_run(&self, run_key: &RunKey) -> Result<(), EngineError> {
        let active = self.inner.active.lock();
        match active.get(run_key) {
            Some(run) => {
                run.cancel.cancel();
                tracing::info!(run = %run_key, "cancellation requested");
                Ok(())
            }
            None => Err(EngineError::RunNotFound(run_key.to_string())),
        }
    }

    /// Fetch a run summary from the store.
    pub fn get_run(&self, run_key: &RunKey) -> Result<TaskRun, EngineError> {
        Ok(self.inner.runs.get(run_key)?)
    }

    /// Run summaries for a task, most recent first.
    pub fn list_runs(&self, key: &TaskKey) -> Result<Vec<TaskRun>, EngineError> {
        Ok(self.inner.runs.list_runs(key)?)
    }

    /// Fire every task whose cron occurrence has arrived. Callers drive
    /// this from their tick loop; the scheduler holds no timer of its own.
    pub fn poll_schedule(&self) -> Result<Vec<RunKey>, EngineError> {
        let now = utc_from_epoch_ms(self.inner.clock.epoch_ms());
        let due = self.inner.scheduler.lock().due(now);
        let mut launched = Vec::new();
        for key in due {
            match self.trigger_run(&key) {
                Ok(run_key) => launched.push(run_key),
                Err(e) => {
                    tracing::warn!(task = %key, error = %e, "scheduled trigger failed")
                }
            }
        }
        Ok(launched)
    }

    /// Next scheduled occurrence, if any task has one.
    pub fn next_deadline_ms(&self) -> Option<u64> {
        self.inner
            .scheduler
            .lock()
            .next_deadline()
            .map(|dt| dt.timestamp_millis().max(0) as u64)
    }

    /// Wait for an active run to complete and return its summary.
    /// Runs that already finished are read straight from the store.
    pub async fn await_run(&self, run_key: &RunKey) -> Result<TaskRun, EngineError> {
        let handle = {
            let mut active = self.inner.active.lock();
            active.get_mut(run_key).and_then(|run| run.handle.take())
        };
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                return Err(EngineError::Fatal(format!("run task panicked: {}", e)));
            }
        }
        self.get_run(run_key)
    }

    fn reschedule(&self, key: &TaskKey, task: &TaskConfig) {
        let mut scheduler = self.inner.scheduler.lock();
        match (&task.cron_expression, task.active) {
            (Some(expr), true) => {
                let now = utc_from_epoch_ms(self.inner.clock.epoch_ms());
                if let Err(e) = scheduler.schedule(key.clone(), expr, now) {
                    // Expression already validated; reachable only for
                    // expressions with no future occurrence.
                    tracing::warn!(task = %key, error = %e, "task left unscheduled");
                }
            }
            _ => scheduler.unschedule(key),
        }
    }

    fn launch(&self, task: TaskConfig) -> RunKey {
        let run_key = RunKey::from(self.inner.ids.next());
        let task_key = task.key.clone().unwrap_or_default();
        let cancel = CancelFlag::new();

        // Register before spawning so the run can deregister itself no
        // matter how quickly it completes.
        self.inner.active.lock().insert(
            run_key.clone(),
            ActiveRun {
                task_key: task_key.clone(),
                cancel: cancel.clone(),
                handle: None,
            },
        );

        let service = self.clone();
        let spawn_run_key = run_key.clone();
        let handle = tokio::spawn(async move {
            service
                .inner
                .runner
                .run(&task, spawn_run_key.clone(), cancel)
                .await;
            service.finish(&spawn_run_key, &task_key);
        });
        if let Some(run) = self.inner.active.lock().get_mut(&run_key) {
            run.handle = Some(handle);
        }
        run_key
    }

    /// Post-run bookkeeping: deregister, release the guard, and launch the
    /// queued follow-up when there is one.
    fn finish(&self, run_key: &RunKey, task_key: &TaskKey) {
        self.inner.active.lock().remove(run_key);
        if self.inner.guard.release(task_key) {
            // Follow-up reads the task fresh; it may have been updated or
            // deleted while the run was in flight.
            match self.inner.tasks.get(task_key) {
                Ok(task) if task.active => {
                    if self.inner.guard.try_admit(task_key, task.is_serialized())
                        == Admission::Granted
                    {
                        let run_key = self.launch(task);
                        tracing::info!(task = %task_key, run = %run_key, "follow-up run launched");
                    }
                }
                Ok(_) | Err(StoreError::TaskNotFound(_)) => {
                    tracing::info!(task = %task_key, "follow-up dropped, task gone or inactive")
                }
                Err(e) => {
                    tracing::error!(task = %task_key, error = %e, "follow-up dropped, store unreachable")
                }
            }
        }
    }

    /// Persist an auditable record for a trigger the guard turned away.
    fn record_guard_skip(&self, task_key: &TaskKey) -> Result<RunKey, EngineError> {
        let run_key = RunKey::from(self.inner.ids.next());
        let now = self.inner.clock.epoch_ms();
        let run = TaskRun {
            run_key: run_key.clone(),
            task_key: task_key.clone(),
            started_at_ms: now,
            finished_at_ms: Some(now),
            outcome: RunOutcome::Failed,
            finish_reason: Some(FinishReason::GuardDenied),
            counts: RunCounts::default(),
            records: Vec::new(),
        };
        self.inner.runs.save(run)?;
        tracing::warn!(task = %task_key, run = %run_key, "trigger skipped, run already in flight");
        Ok(run_key)
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
