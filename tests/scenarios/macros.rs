//! Macro task scenarios: ordered command lists and continue-on-error.

use crate::prelude::*;

#[tokio::test]
async fn commands_run_in_order_within_the_realm() {
    let (svc, fake, _clock) = harness();

    let mut draft = macro_task(&["create-group", "assign-members", "notify-owner"]);
    macro_spec(&mut draft).realm = "/teams".to_string();
    let task = svc.create_task(draft).unwrap();

    let run_key = svc.trigger_run(&task.key.unwrap()).unwrap();
    let run = svc.await_run(&run_key).await.unwrap();

    assert_eq!(run.outcome, RunOutcome::Success);
    assert_eq!(run.counts.applied, 3);

    let commands: Vec<(String, String)> = fake
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            ConnectorCall::Command { name, realm } => Some((name, realm)),
            _ => None,
        })
        .collect();
    assert_eq!(
        commands,
        vec![
            ("create-group".to_string(), "/teams".to_string()),
            ("assign-members".to_string(), "/teams".to_string()),
            ("notify-owner".to_string(), "/teams".to_string()),
        ]
    );
}

#[tokio::test]
async fn continue_on_error_attempts_every_command() {
    let (svc, fake, _clock) = harness();
    fake.fail_command("cmd-3");

    let mut draft = macro_task(&["cmd-1", "cmd-2", "cmd-3", "cmd-4", "cmd-5"]);
    macro_spec(&mut draft).continue_on_error = true;
    let task = svc.create_task(draft).unwrap();

    let run_key = svc.trigger_run(&task.key.unwrap()).unwrap();
    let run = svc.await_run(&run_key).await.unwrap();

    // One failure out of five, and the remaining commands still ran.
    assert_eq!(run.outcome, RunOutcome::Partial);
    assert_eq!(run.counts.total, 5);
    assert_eq!(run.counts.applied, 4);
    assert_eq!(run.counts.failed, 1);
    assert_eq!(run.records[2].status, RecordStatus::Failed);
    assert!(run.records[2].error.is_some());
}

#[tokio::test]
async fn the_first_failure_stops_a_strict_macro() {
    let (svc, fake, _clock) = harness();
    fake.fail_command("cmd-2");

    let task = svc
        .create_task(macro_task(&["cmd-1", "cmd-2", "cmd-3"]))
        .unwrap();

    let run_key = svc.trigger_run(&task.key.unwrap()).unwrap();
    let run = svc.await_run(&run_key).await.unwrap();

    assert_eq!(run.outcome, RunOutcome::Failed);
    assert_eq!(run.finish_reason, Some(FinishReason::RecordFailure));
    assert_eq!(run.counts.total, 2);
    assert!(!fake
        .calls()
        .iter()
        .any(|c| matches!(c, ConnectorCall::Command { name, .. } if name == "cmd-3")));
}

#[tokio::test]
async fn opting_out_of_exec_detail_keeps_only_the_counts() {
    let (svc, _fake, _clock) = harness();

    let mut draft = macro_task(&["a", "b", "c"]);
    macro_spec(&mut draft).save_execs = false;
    let task = svc.create_task(draft).unwrap();

    let run_key = svc.trigger_run(&task.key.unwrap()).unwrap();
    let run = svc.await_run(&run_key).await.unwrap();

    assert_eq!(run.outcome, RunOutcome::Success);
    assert_eq!(run.counts.total, 3);
    assert!(run.records.is_empty());
}
