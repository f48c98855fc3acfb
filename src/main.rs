//! World Sim - command line entry point
//!
//! Creates, enriches and steps simulations stored as JSON documents on disk.
//! LLM settings come from the environment (LLM_API_KEY, LLM_API_URL, LLM_MODEL
//! and the per-role LLM_*_MODEL overrides).

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use world_sim::core::config::{EngineConfig, LlmConfig};
use world_sim::core::error::{Result, SimError};
use world_sim::core::types::{ActorId, Round, SimulationId};
use world_sim::entity::simulation::Simulation;
use world_sim::llm::llm_providers;
use world_sim::provider::decision::{ActionProposal, TextLimits};
use world_sim::simulation::{RoundTasks, SimulationService, TaskStatus};
use world_sim::store::{FileStore, SimulationStore};

/// Round-based social simulation driven by LLM actors
#[derive(Parser, Debug)]
#[command(name = "world-sim")]
#[command(about = "Simulate how a social question plays out, one round at a time")]
struct Args {
    /// Engine config (TOML); defaults apply for missing keys
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the directory holding simulation documents
    #[arg(long)]
    store_dir: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a simulation and generate its actors
    Create { question: String },
    /// Research every actor not yet enriched
    Enrich { id: SimulationId },
    /// Process one or more rounds
    Step {
        id: SimulationId,
        #[arg(long, default_value_t = 1)]
        rounds: u32,
    },
    /// Process rounds until the simulation completes or reaches its duration
    Run { id: SimulationId },
    /// Queue an action for an actor (by id or identifier)
    Schedule {
        id: SimulationId,
        actor: String,
        action: String,
        /// Target round; defaults to the current round
        #[arg(long)]
        round: Option<Round>,
        #[arg(long, default_value_t = 1)]
        duration: u32,
    },
    /// Cancel an actor's pending action in a round
    Cancel {
        id: SimulationId,
        actor: String,
        #[arg(long)]
        round: Round,
    },
    /// Preview what an actor would decide now
    Propose { id: SimulationId, actor: String },
    /// Show a simulation's status and transcript
    Show { id: SimulationId },
    /// List stored simulations, newest first
    List {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Show an actor's private state
    State {
        id: SimulationId,
        actor: String,
        /// Defaults to the latest processed round
        #[arg(long)]
        round: Option<Round>,
    },
    /// Delete a simulation document
    Delete { id: SimulationId },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("world_sim=info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => EngineConfig::from_toml_file(path)?,
        None => EngineConfig::default(),
    };
    if let Some(dir) = &args.store_dir {
        config.store_dir = dir.clone();
    }
    config.validate()?;

    let store: Arc<dyn SimulationStore> = Arc::new(FileStore::open(config.store_dir.clone()).await?);

    match args.command {
        Command::Show { id } => {
            let sim = store.load(id).await?;
            if args.json {
                print_json(&sim)?;
            } else {
                print_simulation(&sim);
            }
        }
        Command::List { limit } => {
            let summaries = store.list(limit).await?;
            if args.json {
                print_json(&summaries)?;
            } else {
                for s in summaries {
                    println!(
                        "{}  {:<17} round {:<3} actors {:<3} {}",
                        s.simulation_id, s.status, s.current_round, s.actors_count, s.question
                    );
                }
            }
        }
        Command::Delete { id } => {
            store.delete(id).await?;
            println!("Deleted {}", id);
        }
        command => {
            let service = Arc::new(build_service(store, config)?);
            run_command(service, command, args.json).await?;
        }
    }

    Ok(())
}

fn build_service(store: Arc<dyn SimulationStore>, config: EngineConfig) -> Result<SimulationService> {
    let llm = LlmConfig::from_env()?;
    let limits = TextLimits {
        max_action_chars: config.max_action_chars,
        max_message_chars: config.max_message_chars,
    };
    Ok(SimulationService::new(store, llm_providers(&llm, limits), config))
}

async fn run_command(service: Arc<SimulationService>, command: Command, json: bool) -> Result<()> {
    match command {
        Command::Create { question } => {
            let sim = service.create(&question).await?;
            if json {
                print_json(&sim.summary())?;
            } else {
                println!("Created {} ({})", sim.simulation_id, sim.status);
                for actor in &sim.actors {
                    println!("  {:<24} {}", actor.identifier, actor.role_in_simulation);
                }
            }
        }
        Command::Enrich { id } => {
            let report = service.enrich(id).await?;
            if json {
                print_json(&report)?;
            } else {
                println!(
                    "Enriched {} actor(s), {} failed; status {}",
                    report.enriched.len(),
                    report.failed.len(),
                    report.status
                );
            }
        }
        Command::Step { id, rounds } => {
            let tasks = RoundTasks::new(service.clone());
            for _ in 0..rounds {
                if !step(&tasks, id, json).await? {
                    break;
                }
            }
        }
        Command::Run { id } => {
            let tasks = RoundTasks::new(service.clone());
            loop {
                let sim = service.simulation(id).await?;
                if sim.status.is_terminal() || sim.current_round >= sim.simulation_duration {
                    println!("Stopped at round {} ({})", sim.current_round, sim.status);
                    break;
                }
                if !step(&tasks, id, json).await? {
                    break;
                }
            }
        }
        Command::Schedule {
            id,
            actor,
            action,
            round,
            duration,
        } => {
            let sim = service.simulation(id).await?;
            let actor = resolve(&sim, &actor)?;
            let proposal = ActionProposal::new(action, round.unwrap_or(sim.current_round), duration);
            let scheduled = service.schedule_action(id, actor, proposal).await?;
            if json {
                print_json(&scheduled)?;
            } else {
                println!(
                    "Scheduled for round {} (seed {:.3})",
                    scheduled.target_round, scheduled.random_seed
                );
            }
        }
        Command::Cancel { id, actor, round } => {
            let sim = service.simulation(id).await?;
            let actor = resolve(&sim, &actor)?;
            service.cancel_action(id, round, actor).await?;
            println!("Cancelled");
        }
        Command::Propose { id, actor } => {
            let sim = service.simulation(id).await?;
            let actor = resolve(&sim, &actor)?;
            print_json(&service.propose_decision(id, actor).await?)?;
        }
        Command::State { id, actor, round } => {
            let sim = service.simulation(id).await?;
            let actor = resolve(&sim, &actor)?;
            print_json(&service.actor_state(id, actor, round).await?)?;
        }
        Command::Show { .. } | Command::List { .. } | Command::Delete { .. } => {}
    }
    Ok(())
}

/// Submit one round and wait for it; false once the simulation has completed
async fn step(tasks: &RoundTasks, id: SimulationId, json: bool) -> Result<bool> {
    let ticket = tasks.submit(id).await;
    match tasks.wait(ticket).await? {
        TaskStatus::Succeeded { report } => {
            if json {
                print_json(&report)?;
            } else {
                println!(
                    "Round {}: {} resolved, {} scheduled, {} delivered, status {}",
                    report.round,
                    report.actions_resolved,
                    report.actions_scheduled,
                    report.messages_delivered,
                    report.status
                );
            }
            Ok(report.continue_simulation)
        }
        TaskStatus::Failed { message } => Err(SimError::TaskFailed(message)),
        TaskStatus::Queued | TaskStatus::Running => Ok(true),
    }
}

fn resolve(sim: &Simulation, reference: &str) -> Result<ActorId> {
    sim.resolve_actor(reference)
        .map(|a| a.actor_id)
        .ok_or_else(|| SimError::Validation(format!("no actor named {:?}", reference)))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_simulation(sim: &Simulation) {
    println!("=== {} ===", sim.question);
    println!(
        "{} | {} | round {} / {} ({})",
        sim.simulation_id, sim.status, sim.current_round, sim.simulation_duration, sim.time_unit
    );
    println!();
    println!("Actors:");
    for actor in &sim.actors {
        let mark = if actor.enriched { "*" } else { " " };
        println!("  {} {:<24} {}", mark, actor.identifier, actor.role_in_simulation);
    }
    for record in &sim.rounds {
        println!();
        println!("--- Round {} ---", record.round_number);
        println!("{}", record.world_state_summary);
        for result in &record.action_results {
            let who = sim
                .actor(result.actor_id)
                .map(|a| a.identifier.as_str())
                .unwrap_or("Unknown");
            println!(
                "  {} -> {:?} ({:?}): {}",
                who, result.outcome, result.outcome_quality, result.action
            );
        }
    }
}
