//! End-to-end campaign lifecycles against the in-memory store.
//!
//! These tests verify that:
//! - A fresh campaign is guarded, provisioned and completed across passes
//! - A forced stop honours the grace period and aborts in-flight work
//! - A convergence timeout leaves the campaign untouched for redelivery
//! - Restarts bring a finished campaign back to a fresh run

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

mod common;

use common::{guarded, mixed_experiments, Harness, TestResult};

use chaos_operator::chaos_core::{
    ChaosEngine, CleanupPolicy, DesiredState, EnginePhase, ExperimentState, ExperimentStatus,
    ObjectKey, ObjectKind, Pod, TargetSelector, GUARD_FINALIZER, STOPPED_VERDICT,
};
use chaos_operator::chaos_reconciler::{Error, EventReason, Handler, ReconcileOutcome};
use chaos_operator::chaos_store::{
    DeleteOptions, ObjectStore, ObjectStoreExt, OperationKind, PropagationPolicy, StoreOperation,
};

fn nginx() -> TargetSelector {
    TargetSelector::new("app=nginx", "", "deployment")
}

fn is_guarded(engine: &ChaosEngine) -> bool {
    engine.metadata.finalizers.iter().any(|f| f == GUARD_FINALIZER)
}

/// Test the natural lifecycle of a campaign.
///
/// # GIVEN
/// An active campaign with no phase and one experiment
///
/// # WHEN
/// It is reconciled, its runner is provisioned and the runner finishes
///
/// # THEN
/// The guard goes on first, the runner comes next, and the campaign ends
/// completed with its desired state settled on stop
#[tokio::test]
async fn test_campaign_runs_to_completion() -> TestResult {
    let mut harness = Harness::new()?;
    let engine = harness
        .store
        .insert(
            ChaosEngine::new("litmus", "nginx-chaos")
                .with_desired_state(DesiredState::Active)
                .with_experiment("pod-delete")
                .with_target(nginx()),
        )
        .await?;
    let key = engine.key();
    let runner_key = ObjectKey::new("litmus", "nginx-chaos-runner");

    // Pass 1: guard only.
    let outcome = harness.reconciler.reconcile(&key).await?;
    assert!(!outcome.is_settled());
    let stored = harness.engine(&key).await?;
    assert!(is_guarded(&stored));
    assert_eq!(stored.phase(), Some(EnginePhase::Initialized));
    assert_eq!(harness.reasons(), vec![EventReason::Initialized]);
    assert!(harness.store.snapshot::<Pod>(&runner_key).await.is_none());

    // Pass 2: runner created, phase unchanged.
    let outcome = harness.reconciler.reconcile(&key).await?;
    assert_eq!(outcome, ReconcileOutcome::done(Handler::Provision));
    assert!(harness.store.snapshot::<Pod>(&runner_key).await.is_some());
    assert_eq!(
        harness.engine(&key).await?.phase(),
        Some(EnginePhase::Initialized)
    );

    // Pass 3: runner finished.
    harness.finish_runner(&engine).await?;
    harness.reconciler.reconcile(&key).await?;
    let stored = harness.engine(&key).await?;
    assert_eq!(stored.phase(), Some(EnginePhase::Completed));
    assert_eq!(stored.desired_state(), DesiredState::Stopped);
    assert!(harness.reasons().contains(&EventReason::Completed));

    // Pass 4: retained runner stays under the default policy.
    let outcome = harness.reconciler.reconcile(&key).await?;
    assert_eq!(outcome, ReconcileOutcome::done(Handler::CompleteStop));
    assert!(harness.store.snapshot::<Pod>(&runner_key).await.is_some());
    Ok(())
}

/// Test that completion cleanup removes pods under the delete policy.
#[tokio::test]
async fn test_completion_cleanup_honours_delete_policy() -> TestResult {
    let harness = Harness::new()?;
    let engine = harness
        .store
        .insert(guarded(
            ChaosEngine::new("litmus", "engine")
                .with_desired_state(DesiredState::Stopped)
                .with_phase(EnginePhase::Completed)
                .with_cleanup_policy(CleanupPolicy::Delete),
        ))
        .await?;
    harness.child_pod(&engine, "engine-runner").await?;

    let outcome = harness.reconciler.reconcile(&engine.key()).await?;

    assert_eq!(outcome, ReconcileOutcome::done(Handler::CompleteStop));
    assert!(harness.store.objects::<Pod>("litmus").await.is_empty());
    Ok(())
}

/// Test a forced stop.
///
/// # GIVEN
/// A stopped but initialized campaign with a grace period of 5 seconds,
/// two child pods that linger for two reads after deletion and
/// experiments in every state
///
/// # WHEN
/// It is reconciled
///
/// # THEN
/// Pods are force deleted with that grace period and waited out, the
/// campaign is stopped, the guard is gone and only in-flight experiments
/// are aborted
#[tokio::test]
async fn test_forced_stop_tears_down_children() -> TestResult {
    let mut harness = Harness::new()?;
    harness.store.set_deletion_lag(2).await;
    let engine = harness
        .store
        .insert(mixed_experiments(guarded(
            ChaosEngine::new("litmus", "engine")
                .with_desired_state(DesiredState::Stopped)
                .with_phase(EnginePhase::Initialized)
                .with_grace_period(5),
        )))
        .await?;
    harness.child_pod(&engine, "engine-runner").await?;
    harness.child_pod(&engine, "pod-delete-helper").await?;

    let outcome = harness.reconciler.reconcile(&engine.key()).await?;

    assert_eq!(outcome, ReconcileOutcome::done(Handler::ForceStop));
    let expected = DeleteOptions {
        propagation_policy: Some(PropagationPolicy::Background),
        grace_period_seconds: Some(5),
    };
    let pod_deletes: Vec<DeleteOptions> = harness
        .store
        .operations()
        .await
        .into_iter()
        .filter_map(|op| match op {
            StoreOperation::DeleteAllOf {
                kind: ObjectKind::Pod,
                options,
                ..
            } => Some(options),
            _ => None,
        })
        .collect();
    assert_eq!(pod_deletes, vec![expected]);
    assert!(harness.store.objects::<Pod>("litmus").await.is_empty());
    let pod_lists = harness
        .store
        .operations()
        .await
        .iter()
        .filter(|op| op.operation() == OperationKind::List && op.kind() == ObjectKind::Pod)
        .count();
    // One listing before the delete, then three polls until the pods expire.
    assert_eq!(pod_lists, 4);

    let stored = harness.engine(&engine.key()).await?;
    assert_eq!(stored.phase(), Some(EnginePhase::Stopped));
    assert!(!is_guarded(&stored));
    let states: Vec<(ExperimentState, &str)> = stored
        .status
        .experiments
        .iter()
        .map(|e| (e.status.clone(), e.verdict.as_str()))
        .collect();
    assert_eq!(
        states,
        vec![
            (ExperimentState::Aborted, STOPPED_VERDICT),
            (ExperimentState::Aborted, STOPPED_VERDICT),
            (ExperimentState::Completed, ""),
        ]
    );
    assert!(harness.reasons().contains(&EventReason::Stopped));
    Ok(())
}

/// Test a convergence timeout.
///
/// # GIVEN
/// A stopped, initialized campaign whose pods never disappear
///
/// # WHEN
/// It is reconciled twice
///
/// # THEN
/// Each pass times out, the phase and guard are kept, and the second pass
/// repeats the forced delete
#[tokio::test]
async fn test_convergence_timeout_keeps_campaign() -> TestResult {
    let harness = Harness::new()?;
    harness.store.set_deletion_lag(u32::MAX).await;
    let engine = harness
        .store
        .insert(guarded(
            ChaosEngine::new("litmus", "engine")
                .with_desired_state(DesiredState::Stopped)
                .with_phase(EnginePhase::Initialized),
        ))
        .await?;
    harness.child_pod(&engine, "engine-runner").await?;

    for _ in 0..2 {
        let result = harness.reconciler.reconcile(&engine.key()).await;
        assert!(matches!(result, Err(Error::ConvergenceTimeout { .. })));

        let stored = harness.engine(&engine.key()).await?;
        assert_eq!(stored.phase(), Some(EnginePhase::Initialized));
        assert!(is_guarded(&stored));
    }

    let forced = harness
        .store
        .operations()
        .await
        .iter()
        .filter(|op| op.operation() == OperationKind::DeleteAllOf && op.kind() == ObjectKind::Pod)
        .count();
    assert_eq!(forced, 2);
    Ok(())
}

/// Test that deleting a campaign releases it.
#[tokio::test]
async fn test_deleted_campaign_is_released() -> TestResult {
    let mut harness = Harness::new()?;
    let engine = harness
        .store
        .insert(guarded(
            ChaosEngine::new("litmus", "engine")
                .with_desired_state(DesiredState::Active)
                .with_phase(EnginePhase::Initialized),
        ))
        .await?;
    harness.child_pod(&engine, "engine-runner").await?;
    harness
        .store
        .delete(ObjectKind::ChaosEngine, &engine.key(), &DeleteOptions::default())
        .await?;

    let outcome = harness.reconciler.reconcile(&engine.key()).await?;

    assert_eq!(outcome, ReconcileOutcome::done(Handler::Delete));
    assert!(harness
        .store
        .snapshot::<ChaosEngine>(&engine.key())
        .await
        .is_none());
    assert!(harness.store.objects::<Pod>("litmus").await.is_empty());
    assert!(harness.reasons().contains(&EventReason::Stopped));

    let again = harness.reconciler.reconcile(&engine.key()).await?;
    assert_eq!(again, ReconcileOutcome::noop());
    Ok(())
}

/// Test restarting an aborted campaign.
#[tokio::test]
async fn test_reactivated_abort_starts_fresh_run() -> TestResult {
    let mut harness = Harness::new()?;
    let engine = harness
        .store
        .insert(mixed_experiments(guarded(
            ChaosEngine::new("litmus", "engine")
                .with_experiment("pod-delete")
                .with_target(nginx())
                .with_desired_state(DesiredState::Active)
                .with_phase(EnginePhase::Stopped),
        )))
        .await?;

    let outcome = harness.reconciler.reconcile(&engine.key()).await?;
    assert_eq!(outcome, ReconcileOutcome::done(Handler::RestartAfterAbort));
    assert!(harness.reasons().contains(&EventReason::RestartInProgress));

    let stored = harness.engine(&engine.key()).await?;
    assert_eq!(stored.phase(), Some(EnginePhase::Initialized));
    assert!(stored.status.experiments.is_empty());

    // Still guarded, so the next pass provisions straight away.
    let outcome = harness.reconciler.reconcile(&engine.key()).await?;
    assert_eq!(outcome, ReconcileOutcome::done(Handler::Provision));
    Ok(())
}

/// Test restarting a completed campaign.
#[tokio::test]
async fn test_reactivated_completion_is_announced_again() -> TestResult {
    let mut harness = Harness::new()?;
    let engine = harness
        .store
        .insert(guarded(
            ChaosEngine::new("litmus", "engine")
                .with_experiment("pod-delete")
                .with_desired_state(DesiredState::Active)
                .with_phase(EnginePhase::Completed),
        ))
        .await?;

    let outcome = harness.reconciler.reconcile(&engine.key()).await?;
    assert_eq!(
        outcome,
        ReconcileOutcome::done(Handler::RestartAfterComplete)
    );
    assert!(!is_guarded(&harness.engine(&engine.key()).await?));

    let outcome = harness.reconciler.reconcile(&engine.key()).await?;
    assert!(!outcome.is_settled());
    assert!(harness.reasons().contains(&EventReason::Initialized));
    assert!(is_guarded(&harness.engine(&engine.key()).await?));
    Ok(())
}

/// Test a restart whose previous runner is slow to go away.
///
/// # GIVEN
/// A campaign that ran to completion and was reactivated, in a store that
/// keeps deleted pods visible for three more reads
///
/// # WHEN
/// It is reconciled until provisioning settles
///
/// # THEN
/// Provisioning requeues while the old runner terminates, then launches a
/// fresh runner, and the new run is never judged by the old one
#[tokio::test]
async fn test_restart_after_completion_waits_for_old_runner() -> TestResult {
    let mut harness = Harness::new()?;
    harness.store.set_deletion_lag(3).await;
    let engine = harness
        .store
        .insert(
            ChaosEngine::new("litmus", "nginx-chaos")
                .with_desired_state(DesiredState::Active)
                .with_experiment("pod-delete")
                .with_target(nginx()),
        )
        .await?;
    let key = engine.key();
    let runner_key = ObjectKey::new("litmus", "nginx-chaos-runner");

    harness.reconciler.reconcile(&key).await?;
    harness.reconciler.reconcile(&key).await?;
    harness.finish_runner(&engine).await?;
    harness.reconciler.reconcile(&key).await?;
    let completed = harness.engine(&key).await?;
    assert_eq!(completed.phase(), Some(EnginePhase::Completed));

    let reactivated = completed.clone().with_desired_state(DesiredState::Active);
    harness.store.patch_object(&completed, &reactivated).await?;

    let outcome = harness.reconciler.reconcile(&key).await?;
    assert_eq!(
        outcome,
        ReconcileOutcome::done(Handler::RestartAfterComplete)
    );
    let outcome = harness.reconciler.reconcile(&key).await?;
    assert!(!outcome.is_settled());

    let outcome = harness.reconciler.reconcile(&key).await?;
    assert_eq!(outcome.handler, Some(Handler::Provision));
    assert!(!outcome.is_settled());
    let stored = harness.engine(&key).await?;
    assert_eq!(stored.phase(), Some(EnginePhase::Initialized));
    assert_eq!(stored.desired_state(), DesiredState::Active);

    let mut waits = 0;
    let outcome = loop {
        let outcome = harness.reconciler.reconcile(&key).await?;
        if outcome.is_settled() || waits == 5 {
            break outcome;
        }
        waits += 1;
    };
    assert_eq!(outcome, ReconcileOutcome::done(Handler::Provision));

    let runner = harness.store.snapshot::<Pod>(&runner_key).await;
    assert!(runner.is_some_and(|pod| !pod.metadata.is_deleting()));
    let stored = harness.engine(&key).await?;
    assert_eq!(stored.phase(), Some(EnginePhase::Initialized));
    assert_eq!(stored.desired_state(), DesiredState::Active);
    Ok(())
}

/// A running experiment next to one in a state only the runner knows.
fn with_skipped_experiment(mut engine: ChaosEngine) -> ChaosEngine {
    engine.status.experiments = vec![
        ExperimentStatus::new("pod-delete", ExperimentState::Running),
        ExperimentStatus::new("chaos-check", ExperimentState::from("Skipped".to_string())),
    ];
    engine
}

/// Test stopping a campaign whose runner reported an unfamiliar state.
///
/// # GIVEN
/// A stopped, initialized campaign with a running experiment and a
/// `Skipped` one
///
/// # WHEN
/// It is reconciled
///
/// # THEN
/// The running experiment is aborted and the `Skipped` entry is written
/// back untouched
#[tokio::test]
async fn test_unknown_experiment_state_survives_forced_stop() -> TestResult {
    let harness = Harness::new()?;
    let engine = harness
        .store
        .insert(with_skipped_experiment(guarded(
            ChaosEngine::new("litmus", "engine")
                .with_desired_state(DesiredState::Stopped)
                .with_phase(EnginePhase::Initialized),
        )))
        .await?;
    harness.child_pod(&engine, "engine-runner").await?;

    let outcome = harness.reconciler.reconcile(&engine.key()).await?;

    assert_eq!(outcome, ReconcileOutcome::done(Handler::ForceStop));
    let stored = harness.engine(&engine.key()).await?;
    assert_eq!(stored.phase(), Some(EnginePhase::Stopped));
    let states: Vec<(&str, &str)> = stored
        .status
        .experiments
        .iter()
        .map(|e| (e.status.as_str(), e.verdict.as_str()))
        .collect();
    assert_eq!(states, vec![("Aborted", STOPPED_VERDICT), ("Skipped", "")]);
    Ok(())
}

/// Test deleting a campaign whose runner reported an unfamiliar state.
#[tokio::test]
async fn test_campaign_with_unknown_experiment_state_is_released() -> TestResult {
    let harness = Harness::new()?;
    let engine = harness
        .store
        .insert(with_skipped_experiment(guarded(
            ChaosEngine::new("litmus", "engine")
                .with_desired_state(DesiredState::Active)
                .with_phase(EnginePhase::Initialized),
        )))
        .await?;
    harness
        .store
        .delete(ObjectKind::ChaosEngine, &engine.key(), &DeleteOptions::default())
        .await?;

    let outcome = harness.reconciler.reconcile(&engine.key()).await?;

    assert_eq!(outcome, ReconcileOutcome::done(Handler::Delete));
    assert!(harness
        .store
        .snapshot::<ChaosEngine>(&engine.key())
        .await
        .is_none());
    Ok(())
}
