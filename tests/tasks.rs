//! Background round tasks

mod common;

use common::{actor_id, Harness};
use std::sync::Arc;
use world_sim::core::types::SimulationId;
use world_sim::provider::decision::ActionProposal;
use world_sim::simulation::{RoundTasks, TaskStatus};

#[tokio::test]
async fn test_submitted_round_succeeds() {
    let h = Harness::new();
    let sim = h.ready().await;
    let id = sim.simulation_id;
    h.service
        .schedule_action(id, actor_id(&sim, "Mayor"), ActionProposal::new("Veto bill", 0, 1))
        .await
        .unwrap();

    let Harness { service, .. } = h;
    let service = Arc::new(service);
    let tasks = RoundTasks::new(service.clone());

    let ticket = tasks.submit(id).await;
    assert_eq!(ticket.simulation_id, id);

    match tasks.wait(ticket).await.unwrap() {
        TaskStatus::Succeeded { report } => {
            assert_eq!(report.round, 0);
            assert_eq!(report.actions_resolved, 1);
        }
        other => panic!("unexpected status {:?}", other),
    }
    assert!(tasks.status(ticket).await.unwrap().is_finished());
    assert_eq!(service.simulation(id).await.unwrap().current_round, 1);

    assert_eq!(tasks.prune().await, 1);
    assert!(tasks.status(ticket).await.is_err());
}

#[tokio::test]
async fn test_rounds_for_one_simulation_run_in_order() {
    let h = Harness::new();
    let sim = h.ready().await;
    let id = sim.simulation_id;

    let Harness { service, .. } = h;
    let service = Arc::new(service);
    let tasks = RoundTasks::new(service.clone());

    let mut tickets = Vec::new();
    for _ in 0..3 {
        tickets.push(tasks.submit(id).await);
    }

    let mut rounds = Vec::new();
    for ticket in tickets {
        match tasks.wait(ticket).await.unwrap() {
            TaskStatus::Succeeded { report } => rounds.push(report.round),
            other => panic!("unexpected status {:?}", other),
        }
    }
    rounds.sort_unstable();
    assert_eq!(rounds, vec![0, 1, 2]);
    assert_eq!(service.simulation(id).await.unwrap().rounds.len(), 3);
}

#[tokio::test]
async fn test_round_runs_on_a_spawned_task() {
    let h = Harness::new();
    let sim = h.ready().await;
    let id = sim.simulation_id;

    let Harness { service, .. } = h;
    let service = Arc::new(service);
    let worker = service.clone();
    let report = tokio::spawn(async move { worker.process_round(id).await })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(report.round, 0);
    assert_eq!(service.simulation(id).await.unwrap().current_round, 1);
}

#[tokio::test]
async fn test_failed_round_reports_message() {
    let h = Harness::new();
    let tasks = RoundTasks::new(Arc::new(h.service));
    let missing = SimulationId::new();

    let ticket = tasks.submit(missing).await;
    match tasks.wait(ticket).await.unwrap() {
        TaskStatus::Failed { message } => {
            assert!(message.contains(&missing.to_string()));
        }
        other => panic!("unexpected status {:?}", other),
    }
}

#[tokio::test]
async fn test_task_status_serialization() {
    let json = serde_json::to_value(TaskStatus::Failed {
        message: "boom".into(),
    })
    .unwrap();
    assert_eq!(json["state"], "failed");
    assert_eq!(json["message"], "boom");
}
