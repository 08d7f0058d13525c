// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline runner: drives one task run end-to-end.

use crate::connector::{
    ApplyError, CandidateRecord, CommandRunner, HookRegistry, ProvisioningClient, RecordSource,
};
use crate::pool::{effective_settings, ApplyJob, ExecutionPool};
use provis_core::{
    disposition, Clock, Disposition, FinishReason, MacroSpec, ProvisioningCommon, PullMode,
    RecordResult, RecordStatus, RunCounts, RunKey, RunOutcome, TaskConfig, TaskKey, TaskRun,
    TaskSpec,
};
use provis_store::RunStore;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Cooperative per-run cancellation flag.
///
/// Workers check it before starting a record's apply step; in-flight I/O
/// is never forcibly interrupted.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Default per-call bound for apply operations.
pub const DEFAULT_APPLY_TIMEOUT: Duration = Duration::from_secs(30);

/// How long the runner yields when the pool pushes back.
pub const OVERLOAD_BACKOFF: Duration = Duration::from_millis(10);

/// Drives single task runs: streams candidates, computes dispositions,
/// dispatches apply work to the bounded pool, aggregates outcomes, and
/// persists the run summary.
pub struct PipelineRunner<C: Clock> {
    run_store: Arc<dyn RunStore>,
    source: Arc<dyn RecordSource>,
    client: Arc<dyn ProvisioningClient>,
    commands: Arc<dyn CommandRunner>,
    hooks: Arc<dyn HookRegistry>,
    clock: C,
    apply_timeout: Duration,
}

impl<C: Clock> PipelineRunner<C> {
    pub fn new(
        run_store: Arc<dyn RunStore>,
        source: Arc<dyn RecordSource>,
        client: Arc<dyn ProvisioningClient>,
        commands: Arc<dyn CommandRunner>,
        hooks: Arc<dyn HookRegistry>,
        clock: C,
    ) -> Self {
        Self {
            run_store,
            source,
            client,
            commands,
            hooks,
            clock,
            apply_timeout: DEFAULT_APPLY_TIMEOUT,
        }
    }

    /// Override the per-call apply timeout.
    pub fn with_apply_timeout(mut self, timeout: Duration) -> Self {
        self.apply_timeout = timeout;
        self
    }

    /// Execute one run and persist its summary. Run-time errors are
    /// captured into the summary, never propagated: the trigger that
    /// started the run has no caller to report to.
    pub async fn run(&self, task: &TaskConfig, run_key: RunKey, cancel: CancelFlag) -> TaskRun {
        let task_key = task.key.clone().unwrap_or_default();
        let started_at_ms = self.clock.epoch_ms();
        tracing::info!(task = %task_key, run = %run_key, kind = %task.kind(), "run started");

        let (records, mut finish) = match &task.spec {
            TaskSpec::Macro(m) => self.run_macro(m, &cancel).await,
            TaskSpec::Generic => self.run_delegate(task, &cancel).await,
            TaskSpec::Pull(_) | TaskSpec::Push(_) => {
                self.run_provisioning(task, &task_key, &cancel).await
            }
        };

        let counts = RunCounts::tally(&records);
        let outcome = match finish {
            Some(_) => RunOutcome::Failed,
            // Cancellation can land after the stream loop has ended,
            // leaving only the cancelled record entries behind.
            None if counts.cancelled > 0 => {
                finish = Some(FinishReason::Cancelled);
                RunOutcome::Failed
            }
            None if counts.failed > 0 && !task.continues_on_failure() => {
                finish = Some(FinishReason::RecordFailure);
                RunOutcome::Failed
            }
            None if counts.failed + counts.remediated > 0 => RunOutcome::Partial,
            None => RunOutcome::Success,
        };

        let mut run = TaskRun {
            run_key: run_key.clone(),
            task_key: task_key.clone(),
            started_at_ms,
            finished_at_ms: Some(self.clock.epoch_ms()),
            outcome,
            finish_reason: finish,
            counts,
            records,
        };
        if !task.save_execs() {
            run = run.without_records();
        }

        if let Err(e) = self.run_store.save(run.clone()) {
            tracing::error!(task = %task_key, run = %run_key, error = %e, "failed to persist run summary");
        }
        tracing::info!(
            task = %task_key,
            run = %run_key,
            outcome = %run.outcome,
            total = run.counts.total,
            failed = run.counts.failed,
            "run finished"
        );
        run
    }

    /// Macro runs execute the task's command list sequentially.
    async fn run_macro(
        &self,
        spec: &MacroSpec,
        cancel: &CancelFlag,
    ) -> (Vec<RecordResult>, Option<FinishReason>) {
        let mut results = Vec::new();
        let mut finish = None;

        for (seq, command) in spec.commands.iter().enumerate() {
            if cancel.is_cancelled() {
                finish = Some(FinishReason::Cancelled);
                break;
            }
            match self.run_command(command, &spec.realm).await {
                Ok(()) => results.push(command_result(seq as u64, command, RecordStatus::Applied, None)),
                Err(e) => {
                    tracing::warn!(command = %command, error = %e, "macro command failed");
                    results.push(command_result(
                        seq as u64,
                        command,
                        RecordStatus::Failed,
                        Some(e.to_string()),
                    ));
                    if !spec.continue_on_error {
                        finish = Some(FinishReason::RecordFailure);
                        break;
                    }
                }
            }
        }
        (results, finish)
    }

    /// Generic scheduled tasks run their job delegate once.
    async fn run_delegate(
        &self,
        task: &TaskConfig,
        cancel: &CancelFlag,
    ) -> (Vec<RecordResult>, Option<FinishReason>) {
        if cancel.is_cancelled() {
            return (Vec::new(), Some(FinishReason::Cancelled));
        }
        match self.run_command(&task.job_delegate, task.scope()).await {
            Ok(()) => (
                vec![command_result(0, &task.job_delegate, RecordStatus::Applied, None)],
                None,
            ),
            Err(e) => (
                vec![command_result(
                    0,
                    &task.job_delegate,
                    RecordStatus::Failed,
                    Some(e.to_string()),
                )],
                Some(FinishReason::RecordFailure),
            ),
        }
    }

    async fn run_command(&self, command: &str, realm: &str) -> Result<(), ApplyError> {
        match tokio::time::timeout(self.apply_timeout, self.commands.run(command, realm)).await {
            Ok(res) => res,
            Err(_) => Err(ApplyError::Timeout),
        }
    }

    /// Pull/push runs: stream candidates through the rule engine and the
    /// bounded pool.
    async fn run_provisioning(
        &self,
        task: &TaskConfig,
        task_key: &TaskKey,
        cancel: &CancelFlag,
    ) -> (Vec<RecordResult>, Option<FinishReason>) {
        let Some(prov) = task.provisioning().cloned() else {
            return (Vec::new(), Some(FinishReason::Fatal));
        };
        let remediation = task.remediation();

        // Incremental pull picks up from the last successful run.
        let since = match &task.spec {
            TaskSpec::Pull(p) if p.pull_mode == PullMode::Incremental => {
                match self.run_store.last_success_ms(task_key) {
                    Ok(since) => since,
                    Err(e) => {
                        tracing::error!(task = %task_key, error = %e, "store unreachable, aborting run");
                        return (Vec::new(), Some(FinishReason::Fatal));
                    }
                }
            }
            _ => None,
        };

        let stream = match self.source.open(task, since).await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!(task = %task_key, error = %e, "failed to open record source");
                return (Vec::new(), Some(FinishReason::Fatal));
            }
        };

        let pool = ExecutionPool::new(effective_settings(task.concurrent_settings()));
        let (result_tx, mut result_rx) = mpsc::unbounded_channel::<RecordResult>();
        let abort = Arc::new(AtomicBool::new(false));
        let mut results: Vec<RecordResult> = Vec::new();
        let mut finish = None;
        let mut seq: u64 = 0;

        for item in stream {
            if cancel.is_cancelled() {
                finish = Some(FinishReason::Cancelled);
                break;
            }
            if abort.load(Ordering::SeqCst) {
                finish = Some(FinishReason::RecordFailure);
                break;
            }
            let record = match item {
                Ok(record) => record,
                Err(e) => {
                    tracing::error!(task = %task_key, error = %e, "record source failed mid-stream");
                    finish = Some(FinishReason::Fatal);
                    break;
                }
            };

            let disp = disposition(&record.match_status, &prov);
            let this_seq = seq;
            seq += 1;

            if !disp.has_side_effect() {
                tracing::debug!(record = %record.id, disposition = %disp, "recorded without side effect");
                results.push(RecordResult {
                    seq: this_seq,
                    record_id: record.id,
                    disposition: Some(disp),
                    status: RecordStatus::Noop,
                    error: None,
                    hook_errors: Vec::new(),
                });
                continue;
            }

            let record_id = record.id.clone();
            let mut job: ApplyJob = Box::pin(self.apply_job(
                record,
                disp,
                this_seq,
                prov.clone(),
                remediation,
                result_tx.clone(),
                abort.clone(),
                cancel.clone(),
            ));

            // Saturation is retryable backpressure: yield and try again.
            loop {
                match pool.try_submit(job) {
                    Ok(()) => break,
                    Err(returned) => {
                        job = returned;
                        tracing::debug!(task = %task_key, "pool overloaded, backing off");
                        tokio::time::sleep(OVERLOAD_BACKOFF).await;
                        if cancel.is_cancelled() {
                            // The record was never admitted; keep its
                            // summary entry anyway.
                            results.push(RecordResult {
                                seq: this_seq,
                                record_id,
                                disposition: Some(disp),
                                status: RecordStatus::Cancelled,
                                error: None,
                                hook_errors: Vec::new(),
                            });
                            finish = Some(FinishReason::Cancelled);
                            break;
                        }
                    }
                }
            }
            if finish.is_some() {
                break;
            }
        }

        // Collect everything dispatched; completion order may differ from
        // submission order, the summary is re-ordered by sequence.
        drop(result_tx);
        while let Some(result) = result_rx.recv().await {
            results.push(result);
        }
        results.sort_by_key(|r| r.seq);

        (results, finish)
    }

    /// Build the pool job for one record's disposition.
    #[allow(clippy::too_many_arguments)]
    fn apply_job(
        &self,
        record: CandidateRecord,
        disp: Disposition,
        seq: u64,
        prov: ProvisioningCommon,
        remediation: bool,
        result_tx: mpsc::UnboundedSender<RecordResult>,
        abort: Arc<AtomicBool>,
        cancel: CancelFlag,
    ) -> impl Future<Output = ()> + Send + 'static {
        let client = Arc::clone(&self.client);
        let hooks = Arc::clone(&self.hooks);
        let timeout = self.apply_timeout;

        async move {
            // Checked before starting, never mid-I/O. Cancelled records
            // still produce a summary entry so every admitted record is
            // accounted for.
            if cancel.is_cancelled() {
                let _ = result_tx.send(RecordResult {
                    seq,
                    record_id: record.id,
                    disposition: Some(disp),
                    status: RecordStatus::Cancelled,
                    error: None,
                    hook_errors: Vec::new(),
                });
                return;
            }

            let applied = match tokio::time::timeout(timeout, client.apply(&record, disp, timeout))
                .await
            {
                Ok(res) => res,
                Err(_) => Err(ApplyError::Timeout),
            };

            let result = match applied {
                Ok(()) => {
                    let mut hook_errors = Vec::new();
                    if prov.sync_status {
                        if let Err(e) = client.sync_status(&record, disp).await {
                            tracing::warn!(record = %record.id, error = %e, "sync status stamp failed");
                            hook_errors.push(format!("syncStatus: {}", e));
                        }
                    }
                    for hook in &prov.actions {
                        if let Err(e) = hooks.invoke(hook, &record, disp).await {
                            tracing::warn!(record = %record.id, hook = %hook, error = %e, "action hook failed");
                            hook_errors.push(format!("{}: {}", hook, e));
                        }
                    }
                    RecordResult {
                        seq,
                        record_id: record.id,
                        disposition: Some(disp),
                        status: RecordStatus::Applied,
                        error: None,
                        hook_errors,
                    }
                }
                Err(e) if remediation => {
                    tracing::warn!(record = %record.id, error = %e, "apply failed, captured as remediation item");
                    RecordResult {
                        seq,
                        record_id: record.id,
                        disposition: Some(Disposition::Remediate),
                        status: RecordStatus::Remediated,
                        error: Some(format!("{} failed: {}", disp, e)),
                        hook_errors: Vec::new(),
                    }
                }
                Err(e) => {
                    tracing::error!(record = %record.id, disposition = %disp, error = %e, "apply failed");
                    abort.store(true, Ordering::SeqCst);
                    RecordResult {
                        seq,
                        record_id: record.id,
                        disposition: Some(disp),
                        status: RecordStatus::Failed,
                        error: Some(e.to_string()),
                        hook_errors: Vec::new(),
                    }
                }
            };
            let _ = result_tx.send(result);
        }
    }
}

fn command_result(
    seq: u64,
    command: &str,
    status: RecordStatus,
    error: Option<String>,
) -> RecordResult {
    RecordResult {
        seq,
        record_id: command.to_string(),
        disposition: None,
        status,
        error,
        hook_errors: Vec::new(),
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
