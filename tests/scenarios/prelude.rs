//! Shared harness for the behavioral scenarios.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

pub use provis_core::test_support::{generic_task, macro_task, pull_task, push_task};
pub use provis_core::{
    ConcurrentSettings, Disposition, FakeClock, FinishReason, MatchingRule, PullMode,
    RecordStatus, RunKey, RunOutcome, SequentialIdGen, TaskConfig, TaskKey, TaskSpec,
    UnmatchingRule, ValidationError,
};
pub use provis_engine::{
    CandidateRecord, ConnectorCall, EngineError, FakeConnector, PipelineRunner,
    ProvisioningService,
};
pub use provis_store::{MemoryRunStore, MemoryTaskStore, RunStore};
use std::sync::Arc;
use std::time::Duration;

pub type Service = ProvisioningService<FakeClock, SequentialIdGen>;

/// Service wired to a single fake connector and a manual clock.
pub fn harness() -> (Service, FakeConnector, FakeClock) {
    let fake = FakeConnector::new();
    let clock = FakeClock::new();
    let tasks = Arc::new(MemoryTaskStore::new());
    let runs = Arc::new(MemoryRunStore::new());
    let runner = PipelineRunner::new(
        Arc::clone(&runs) as Arc<dyn RunStore>,
        Arc::new(fake.clone()),
        Arc::new(fake.clone()),
        Arc::new(fake.clone()),
        Arc::new(fake.clone()),
        clock.clone(),
    );
    let service = ProvisioningService::new(tasks, runs, runner, clock.clone(), SequentialIdGen::new("k"));
    (service, fake, clock)
}

/// Poll until the condition holds or the scenario times out.
pub async fn until<F: Fn() -> bool>(cond: F) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition never met");
}

/// Mutable access to a pull task's spec.
pub fn pull_spec(task: &mut TaskConfig) -> &mut provis_core::PullSpec {
    match &mut task.spec {
        TaskSpec::Pull(p) => p,
        _ => panic!("not a pull task"),
    }
}

/// Mutable access to a macro task's spec.
pub fn macro_spec(task: &mut TaskConfig) -> &mut provis_core::MacroSpec {
    match &mut task.spec {
        TaskSpec::Macro(m) => m,
        _ => panic!("not a macro task"),
    }
}
