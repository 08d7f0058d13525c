//! Task lifecycle scenarios: create/update/delete semantics and their
//! interaction with runs in flight.

use crate::prelude::*;

#[tokio::test]
async fn keys_are_assigned_once_and_never_change() {
    let (svc, _fake, _clock) = harness();

    let created = svc.create_task(pull_task()).unwrap();
    let key = created.key.clone().unwrap();

    // Re-keying on update is rejected.
    let mut rekeyed = created.clone();
    rekeyed.key = Some(TaskKey::from("forged"));
    assert!(matches!(
        svc.update_task(rekeyed),
        Err(EngineError::Validation(ValidationError::KeyChanged))
    ));
    assert_eq!(svc.get_task(&key).unwrap(), created);
}

#[tokio::test]
async fn the_variant_is_fixed_at_creation() {
    let (svc, _fake, _clock) = harness();
    let created = svc.create_task(pull_task()).unwrap();

    let mut changed = macro_task(&["cmd"]);
    changed.key = created.key.clone();
    assert!(matches!(
        svc.update_task(changed),
        Err(EngineError::Validation(ValidationError::VariantChanged {
            ..
        }))
    ));
}

#[tokio::test]
async fn rule_changes_take_effect_on_the_next_run() {
    let (svc, fake, _clock) = harness();
    fake.set_records(vec![CandidateRecord::unmatched("ext-1")]);
    let mut task = svc.create_task(pull_task()).unwrap();
    let key = task.key.clone().unwrap();

    let first = svc.trigger_run(&key).unwrap();
    let run = svc.await_run(&first).await.unwrap();
    assert_eq!(run.records[0].disposition, Some(Disposition::Create));

    pull_spec(&mut task).provisioning.unmatching_rule = UnmatchingRule::Ignore;
    svc.update_task(task).unwrap();

    let second = svc.trigger_run(&key).unwrap();
    let run = svc.await_run(&second).await.unwrap();
    assert_eq!(run.counts.noop, 1);
    assert_eq!(run.counts.applied, 0);
}

#[tokio::test]
async fn deleting_a_task_cancels_its_run_and_keeps_the_history() {
    let (svc, fake, _clock) = harness();
    fake.set_records(vec![CandidateRecord::unmatched("ext-1")]);
    let task = svc.create_task(pull_task()).unwrap();
    let key = task.key.unwrap();

    let run_key = svc.trigger_run(&key).unwrap();
    svc.delete_task(&key).unwrap();

    let run = svc.await_run(&run_key).await.unwrap();
    assert_eq!(run.finish_reason, Some(FinishReason::Cancelled));

    assert!(svc.get_task(&key).is_err());
    assert_eq!(svc.list_runs(&key).unwrap().len(), 1);
}

#[tokio::test]
async fn deleting_an_unknown_task_fails() {
    let (svc, _fake, _clock) = harness();
    assert!(matches!(
        svc.delete_task(&TaskKey::from("missing")),
        Err(EngineError::Store(_))
    ));
}

#[tokio::test]
async fn bad_pool_settings_are_rejected_at_the_door() {
    let (svc, _fake, _clock) = harness();

    let mut draft = pull_task();
    pull_spec(&mut draft).provisioning.concurrent_settings = Some(ConcurrentSettings {
        core_pool_size: 4,
        max_pool_size: 2,
        queue_capacity: 8,
    });

    assert!(matches!(
        svc.create_task(draft),
        Err(EngineError::Validation(
            ValidationError::InvalidConcurrentSettings(_)
        ))
    ));
}

#[tokio::test]
async fn partial_pool_settings_do_not_deserialize() {
    // All three pool parameters travel together or not at all.
    let result: Result<TaskConfig, _> = serde_json::from_value(serde_json::json!({
        "name": "pull users",
        "active": true,
        "job_delegate": "PullJobDelegate",
        "kind": "pull",
        "matching_rule": "UPDATE",
        "unmatching_rule": "PROVISION",
        "perform_create": true,
        "perform_update": true,
        "perform_delete": false,
        "sync_status": false,
        "pull_mode": "FULL_RECONCILIATION",
        "destination_realm": "/",
        "concurrent_settings": { "core_pool_size": 2 },
    }));
    assert!(result.is_err());
}
