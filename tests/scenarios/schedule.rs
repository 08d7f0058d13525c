//! Cron scheduling scenarios, driven by a manual clock.

use crate::prelude::*;
use std::time::Duration;

#[tokio::test]
async fn a_scheduled_task_fires_when_its_occurrence_arrives() {
    let (svc, fake, clock) = harness();
    fake.set_records(vec![CandidateRecord::unmatched("ext-1")]);

    let mut draft = pull_task();
    draft.cron_expression = Some("* * * * *".to_string());
    let task = svc.create_task(draft).unwrap();
    let key = task.key.unwrap();

    assert!(svc.poll_schedule().unwrap().is_empty());

    clock.advance(Duration::from_secs(60));
    let launched = svc.poll_schedule().unwrap();
    assert_eq!(launched.len(), 1);

    let run = svc.await_run(&launched[0]).await.unwrap();
    assert_eq!(run.outcome, RunOutcome::Success);
    assert_eq!(run.task_key, key);
}

#[tokio::test]
async fn each_occurrence_fires_exactly_once() {
    let (svc, fake, clock) = harness();
    fake.set_records(vec![CandidateRecord::unmatched("ext-1")]);

    let mut draft = pull_task();
    draft.cron_expression = Some("* * * * *".to_string());
    let task = svc.create_task(draft).unwrap();
    let key = task.key.unwrap();

    clock.advance(Duration::from_secs(60));
    let launched = svc.poll_schedule().unwrap();
    assert_eq!(launched.len(), 1);
    svc.await_run(&launched[0]).await.unwrap();

    // Polling again within the same minute stays quiet.
    assert!(svc.poll_schedule().unwrap().is_empty());

    clock.advance(Duration::from_secs(60));
    assert_eq!(svc.poll_schedule().unwrap().len(), 1);
    let _ = svc.list_runs(&key).unwrap();
}

#[tokio::test]
async fn a_late_poll_catches_up_with_a_single_run() {
    let (svc, fake, clock) = harness();
    fake.set_records(vec![CandidateRecord::unmatched("ext-1")]);

    let mut draft = pull_task();
    draft.cron_expression = Some("* * * * *".to_string());
    let task = svc.create_task(draft).unwrap();
    let key = task.key.unwrap();

    // Several occurrences pass while the poller is away.
    clock.advance(Duration::from_secs(5 * 60));
    let launched = svc.poll_schedule().unwrap();
    assert_eq!(launched.len(), 1);

    svc.await_run(&launched[0]).await.unwrap();
    assert_eq!(svc.list_runs(&key).unwrap().len(), 1);
}

#[tokio::test]
async fn a_schedule_overlapping_its_own_run_is_guarded() {
    let (svc, fake, clock) = harness();
    fake.set_records(vec![CandidateRecord::unmatched("ext-1")]);
    fake.set_apply_delay(Duration::from_millis(50));

    let mut draft = pull_task();
    draft.cron_expression = Some("* * * * *".to_string());
    let task = svc.create_task(draft).unwrap();
    let key = task.key.unwrap();

    clock.advance(Duration::from_secs(60));
    let first = svc.poll_schedule().unwrap();
    assert_eq!(first.len(), 1);

    // Next occurrence fires while the first run is still applying.
    clock.advance(Duration::from_secs(60));
    let second = svc.poll_schedule().unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(
        svc.get_run(&second[0]).unwrap().finish_reason,
        Some(FinishReason::GuardDenied)
    );

    // The queued follow-up still runs the missed occurrence.
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
}

#[tokio::test]
async fn manual_tasks_never_appear_in_the_schedule() {
    let (svc, _fake, clock) = harness();
    svc.create_task(pull_task()).unwrap();

    assert_eq!(svc.next_deadline_ms(), None);
    clock.advance(Duration::from_secs(3600));
    assert!(svc.poll_schedule().unwrap().is_empty());
}
