//! Simulation lifecycle through the service

mod common;

use common::{actor_id, FixedRoster, Harness, StaticEnricher, CAST};
use world_sim::core::error::SimError;
use world_sim::entity::action::ActionStatus;
use world_sim::provider::decision::ActionProposal;
use world_sim::simulation::SimulationStatus;
use world_sim::store::SimulationStore;

#[tokio::test]
async fn test_create_installs_roster() {
    let h = Harness::new();
    let sim = h.service.create("  Will the transit strike end?  ").await.unwrap();

    assert_eq!(sim.status, SimulationStatus::Created);
    assert_eq!(sim.question, "Will the transit strike end?");
    assert_eq!(sim.time_unit, "week");
    assert_eq!(sim.simulation_duration, 8);
    assert_eq!(sim.current_round, 0);
    let names: Vec<_> = sim.actors.iter().map(|a| a.identifier.as_str()).collect();
    assert_eq!(names, CAST.iter().map(|(id, _)| *id).collect::<Vec<_>>());
    assert!(sim.actors.iter().all(|a| !a.enriched));

    let stored = h.store.load(sim.simulation_id).await.unwrap();
    assert_eq!(stored, sim);
}

#[tokio::test]
async fn test_empty_question_rejected() {
    let h = Harness::new();
    let err = h.service.create("   ").await.unwrap_err();
    assert!(matches!(err, SimError::Validation(_)));
    assert_eq!(h.store.len().await, 0);
}

#[tokio::test]
async fn test_roster_failure_marks_failed() {
    let h = Harness::with(FixedRoster { fail: true }, StaticEnricher::default());
    let sim = h.service.create("Will the strike end?").await.unwrap();

    assert_eq!(sim.status, SimulationStatus::Failed);
    assert!(sim.actors.is_empty());
    let stored = h.store.load(sim.simulation_id).await.unwrap();
    assert_eq!(stored.status, SimulationStatus::Failed);

    let err = h.service.enrich(sim.simulation_id).await.unwrap_err();
    assert!(matches!(err, SimError::InvalidState { .. }));
}

#[tokio::test]
async fn test_partial_enrichment_can_resume() {
    let h = Harness::with(
        FixedRoster { fail: false },
        StaticEnricher::failing_for(&["Press"]),
    );
    let sim = h.service.create("Will the strike end?").await.unwrap();
    let id = sim.simulation_id;

    let report = h.service.enrich(id).await.unwrap();
    assert_eq!(report.status, SimulationStatus::Created);
    assert_eq!(report.enriched.len(), 2);
    assert_eq!(report.failed, vec![actor_id(&sim, "Press")]);

    let partial = h.service.simulation(id).await.unwrap();
    assert_eq!(partial.status, SimulationStatus::Created);
    let mayor = partial.actor(actor_id(&sim, "Mayor")).unwrap();
    assert!(mayor.enriched);
    assert_eq!(mayor.memory.as_deref(), Some("Mayor history"));

    // rounds are refused until everyone is researched
    let err = h.service.process_round(id).await.unwrap_err();
    assert!(matches!(err, SimError::InvalidState { .. }));

    h.enricher.heal();
    let report = h.service.enrich(id).await.unwrap();
    assert_eq!(report.status, SimulationStatus::Enriched);
    // finished actors are not researched twice
    assert_eq!(report.enriched, vec![actor_id(&sim, "Press")]);
    assert!(report.failed.is_empty());

    let done = h.service.simulation(id).await.unwrap();
    assert!(done.all_enriched());
    assert_eq!(done.actor(mayor.actor_id).unwrap(), mayor);
}

#[tokio::test]
async fn test_enrich_twice_is_a_no_op() {
    let h = Harness::new();
    let sim = h.ready().await;

    let report = h.service.enrich(sim.simulation_id).await.unwrap();
    assert!(report.enriched.is_empty());
    assert_eq!(report.status, SimulationStatus::Enriched);
    assert_eq!(h.service.simulation(sim.simulation_id).await.unwrap(), sim);
}

#[tokio::test]
async fn test_schedule_rejects_past_round() {
    let h = Harness::new();
    let sim = h.ready().await;
    let id = sim.simulation_id;
    let mayor = actor_id(&sim, "Mayor");

    h.service.process_round(id).await.unwrap();
    h.service.process_round(id).await.unwrap();

    let err = h
        .service
        .schedule_action(id, mayor, ActionProposal::new("Too late", 1, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, SimError::Validation(_)));

    let action = h
        .service
        .schedule_action(id, mayor, ActionProposal::new("Just in time", 2, 1))
        .await
        .unwrap();
    assert_eq!(action.target_round, 2);
    assert!((0.0..1.0).contains(&action.random_seed));
}

#[tokio::test]
async fn test_schedule_rejects_second_action_same_round() {
    let h = Harness::new();
    let sim = h.ready().await;
    let id = sim.simulation_id;
    let union = actor_id(&sim, "Union");

    h.service
        .schedule_action(id, union, ActionProposal::new("March", 1, 1))
        .await
        .unwrap();
    let err = h
        .service
        .schedule_action(id, union, ActionProposal::new("Rally", 1, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, SimError::Validation(_)));
    assert_eq!(h.service.scheduled_actions(id, 1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_schedule_rejects_overlong_action() {
    let h = Harness::new();
    let sim = h.ready().await;
    let long = "x".repeat(h.service.config().max_action_chars + 1);

    let err = h
        .service
        .schedule_action(
            sim.simulation_id,
            actor_id(&sim, "Press"),
            ActionProposal::new(long, 0, 1),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SimError::Validation(_)));
}

#[tokio::test]
async fn test_cancelled_action_is_not_resolved() {
    let h = Harness::new();
    let sim = h.ready().await;
    let id = sim.simulation_id;
    let press = actor_id(&sim, "Press");

    h.service
        .schedule_action(id, press, ActionProposal::new("Leak memo", 1, 1))
        .await
        .unwrap();
    h.service.cancel_action(id, 1, press).await.unwrap();

    let scheduled = h.service.scheduled_actions(id, 1).await.unwrap();
    assert_eq!(scheduled[0].status, ActionStatus::Cancelled);

    // cancelling again finds nothing live
    let err = h.service.cancel_action(id, 1, press).await.unwrap_err();
    assert!(matches!(err, SimError::ActionNotFound { round: 1, .. }));

    h.service.process_round(id).await.unwrap();
    let report = h.service.process_round(id).await.unwrap();
    assert_eq!(report.actions_resolved, 0);
    assert!(h.service.round(id, 1).await.unwrap().action_results.is_empty());
}

#[tokio::test]
async fn test_actor_state_defaults_to_latest_round() {
    let h = Harness::new();
    let sim = h.ready().await;
    let id = sim.simulation_id;
    let mayor = actor_id(&sim, "Mayor");

    let err = h.service.actor_state(id, mayor, None).await.unwrap_err();
    assert!(matches!(err, SimError::StateNotFound { .. }));

    h.service.process_round(id).await.unwrap();
    h.service.process_round(id).await.unwrap();

    let latest = h.service.actor_state(id, mayor, None).await.unwrap();
    assert_eq!(latest.round_number, 1);
    let first = h.service.actor_state(id, mayor, Some(0)).await.unwrap();
    assert_eq!(first.round_number, 0);

    let err = h.service.actor_state(id, mayor, Some(7)).await.unwrap_err();
    assert!(matches!(err, SimError::StateNotFound { round: 7, .. }));
    let err = h.service.round(id, 7).await.unwrap_err();
    assert!(matches!(err, SimError::RoundNotFound(7)));
    assert_eq!(h.service.rounds(id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_propose_decision_does_not_queue() {
    let h = Harness::new();
    let sim = h.ready().await;
    let id = sim.simulation_id;
    let union = actor_id(&sim, "Union");

    h.decisions.plan(
        "Union",
        0,
        world_sim::provider::decision::Decision::single(ActionProposal::new("Strike", 0, 2)),
    );
    let decision = h.service.propose_decision(id, union).await.unwrap();
    assert_eq!(decision.actions[0].action, "Strike");
    assert!(h.service.scheduled_actions(id, 0).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_and_list() {
    let h = Harness::new();
    let first = h.ready().await;
    let second = h.ready().await;

    let listed = h.service.list(10).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].simulation_id, second.simulation_id);
    assert_eq!(listed[0].actors_count, CAST.len());

    h.service.delete(first.simulation_id).await.unwrap();
    let err = h.service.simulation(first.simulation_id).await.unwrap_err();
    assert!(matches!(err, SimError::SimulationNotFound(_)));
    assert_eq!(h.service.list(10).await.unwrap().len(), 1);

    let err = h.service.delete(first.simulation_id).await.unwrap_err();
    assert!(matches!(err, SimError::SimulationNotFound(_)));
}

#[tokio::test]
async fn test_unknown_simulation_leaves_no_lock_behind() {
    let h = Harness::new();
    let missing = world_sim::core::types::SimulationId::new();

    assert!(h.service.process_round(missing).await.unwrap_err().is_not_found());
    assert!(h.service.enrich(missing).await.unwrap_err().is_not_found());
    assert!(h.service.delete(missing).await.unwrap_err().is_not_found());
    assert_eq!(h.service.lock_count().await, 0);

    let sim = h.ready().await;
    h.service.process_round(sim.simulation_id).await.unwrap();
    assert_eq!(h.service.lock_count().await, 1);
    h.service.delete(sim.simulation_id).await.unwrap();
    assert_eq!(h.service.lock_count().await, 0);
}

#[tokio::test]
async fn test_schedule_rejects_endless_action() {
    let h = Harness::new();
    let sim = h.ready().await;
    let id = sim.simulation_id;

    let err = h
        .service
        .schedule_action(
            id,
            actor_id(&sim, "Union"),
            ActionProposal::new("Forever strike", 1, u32::MAX),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SimError::Validation(_)));
    assert!(h.service.scheduled_actions(id, 1).await.unwrap().is_empty());

    h.service.process_round(id).await.unwrap();
    let report = h.service.process_round(id).await.unwrap();
    assert_eq!(report.round, 1);
}
