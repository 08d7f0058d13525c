//! Run-level concurrency scenarios: the run guard and the bounded pool.

use crate::prelude::*;

#[tokio::test]
async fn a_serialized_task_never_runs_twice_at_once() {
    let (svc, fake, _clock) = harness();
    fake.set_records(vec![CandidateRecord::unmatched("ext-1")]);
    let task = svc.create_task(pull_task()).unwrap();
    let key = task.key.unwrap();

    let first = svc.trigger_run(&key).unwrap();
    let second = svc.trigger_run(&key).unwrap();
    let third = svc.trigger_run(&key).unwrap();

    // The second and third triggers are audited as guard-denied runs.
    for skipped in [&second, &third] {
        let run = svc.get_run(skipped).unwrap();
        assert_eq!(run.outcome, RunOutcome::Failed);
        assert_eq!(run.finish_reason, Some(FinishReason::GuardDenied));
        assert_eq!(run.counts.total, 0);
    }

    assert_eq!(
        svc.await_run(&first).await.unwrap().outcome,
        RunOutcome::Success
    );

    // Exactly one follow-up run launches after the first completes; the
    // denied trigger never turns into a run of its own.
    let probe = svc.clone();
    let probe_key = key.clone();
    until(move || {
        probe
            .list_runs(&probe_key)
            .unwrap()
            .iter()
            .filter(|r| r.outcome == RunOutcome::Success)
            .count()
            == 2
    })
    .await;
    assert_eq!(svc.list_runs(&key).unwrap().len(), 4);
}

#[tokio::test]
async fn concurrent_settings_lift_the_run_guard() {
    let (svc, fake, _clock) = harness();
    fake.set_records(vec![CandidateRecord::unmatched("ext-1")]);

    let mut draft = pull_task();
    pull_spec(&mut draft).provisioning.concurrent_settings = Some(ConcurrentSettings {
        core_pool_size: 2,
        max_pool_size: 4,
        queue_capacity: 8,
    });
    let task = svc.create_task(draft).unwrap();
    let key = task.key.unwrap();

    let first = svc.trigger_run(&key).unwrap();
    let second = svc.trigger_run(&key).unwrap();

    assert_eq!(
        svc.await_run(&first).await.unwrap().outcome,
        RunOutcome::Success
    );
    assert_eq!(
        svc.await_run(&second).await.unwrap().outcome,
        RunOutcome::Success
    );
    assert_eq!(svc.list_runs(&key).unwrap().len(), 2);
}

#[tokio::test]
async fn a_bounded_pool_still_applies_every_record() {
    let (svc, fake, _clock) = harness();
    let records: Vec<CandidateRecord> = (0..20)
        .map(|i| CandidateRecord::unmatched(format!("ext-{:02}", i)))
        .collect();
    fake.set_records(records);

    let mut draft = pull_task();
    pull_spec(&mut draft).provisioning.concurrent_settings = Some(ConcurrentSettings {
        core_pool_size: 2,
        max_pool_size: 3,
        queue_capacity: 2,
    });
    let task = svc.create_task(draft).unwrap();

    let run_key = svc.trigger_run(&task.key.unwrap()).unwrap();
    let run = svc.await_run(&run_key).await.unwrap();

    // Backpressure delays submissions but never drops records, and the
    // summary keeps submission order.
    assert_eq!(run.outcome, RunOutcome::Success);
    assert_eq!(run.counts.applied, 20);
    let ids: Vec<&str> = run.records.iter().map(|r| r.record_id.as_str()).collect();
    let mut sorted = ids.clone();
    sorted.sort_unstable();
    assert_eq!(ids, sorted);
}

#[tokio::test]
async fn cancellation_stops_admitting_new_work() {
    let (svc, fake, _clock) = harness();
    fake.set_records(vec![
        CandidateRecord::unmatched("ext-1"),
        CandidateRecord::unmatched("ext-2"),
    ]);
    let task = svc.create_task(pull_task()).unwrap();

    let run_key = svc.trigger_run(&task.key.unwrap()).unwrap();
    svc.cancel_run(&run_key).unwrap();

    let run = svc.await_run(&run_key).await.unwrap();
    assert_eq!(run.outcome, RunOutcome::Failed);
    assert_eq!(run.finish_reason, Some(FinishReason::Cancelled));
    assert!(fake
        .calls()
        .iter()
        .all(|c| !matches!(c, ConnectorCall::Apply { .. })));
}
