// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Suspend/resume walkthrough
//!
//! Drives one agent through create, start, suspend, a stale resume (rejected),
//! the correct resume and completion, then optionally resets it. Every event
//! published along the way is printed in order.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use agent_host_core::application::agent_service::{AgentService, AgentServiceError};
use agent_host_core::domain::agent::AgentError;
use agent_host_core::domain::events::AgentEvent;
use agent_host_core::domain::execution_state::{ExecutionState, MessageRole, MessageSnapshot, PendingToolCall};
use agent_host_core::domain::host_config::AgentHostConfig;
use agent_host_core::domain::identity::{AgentId, AgentType, ConversationId, UserId};
use agent_host_core::domain::session::{ClientAction, ClientResponse};
use agent_host_core::infrastructure::event_bus::{EventBus, EventBusError};

const TOOL_CALL_ID: &str = "call-quiz-1";

#[derive(Args, Debug, Clone)]
pub struct ScenarioArgs {
    /// Owner of the agent created for the walkthrough
    #[arg(long, default_value = "demo-user")]
    pub owner: String,

    /// Agent type (tutor, thought, evaluator, coach, connector, wellness, planner, researcher)
    #[arg(long, default_value = "tutor")]
    pub agent_type: AgentType,

    /// Archive the agent afterwards and create its replacement
    #[arg(long)]
    pub reset: bool,

    /// Print events as JSON lines
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub agent_id: AgentId,
    pub resumed_iteration: u32,
    pub stale_response_rejected: bool,
    pub final_version: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replacement_id: Option<AgentId>,
}

pub async fn handle_command(args: ScenarioArgs, config_override: Option<PathBuf>) -> Result<()> {
    let config = AgentHostConfig::load_or_default(config_override).context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;

    let bus = EventBus::new(config.spec.event_bus.capacity);
    let mut receiver = bus.subscribe();
    let service = AgentService::from_config(&config)
        .await
        .context("Failed to initialise agent service")?
        .with_publisher(Arc::new(bus.clone()));

    let report = run(&service, &args).await?;
    info!(agent_id = %report.agent_id, version = report.final_version, "Walkthrough finished");

    let mut events = Vec::new();
    loop {
        match receiver.try_recv() {
            Ok(event) => events.push(event),
            Err(EventBusError::Empty) | Err(EventBusError::Closed) => break,
            Err(EventBusError::Lagged(n)) => {
                eprintln!("{}", format!("⚠ {} events dropped, raise spec.event_bus.capacity", n).yellow());
            }
        }
    }

    if args.json {
        for event in &events {
            println!("{}", serde_json::to_string(event)?);
        }
        println!("{}", serde_json::to_string(&report)?);
    } else {
        print_events(&events);
        print_report(&report);
    }

    Ok(())
}

/// Execute the walkthrough against `service`.
pub async fn run(service: &AgentService, args: &ScenarioArgs) -> Result<ScenarioReport> {
    let agent_id = service
        .create_agent(UserId::new(args.owner.clone()), args.agent_type, Some("walkthrough".to_string()))
        .await?
        .output;

    service
        .start_session(agent_id, ConversationId::new(format!("conv-{}", agent_id)), "walkthrough", None)
        .await?;

    let mut checkpoint = ExecutionState::new(chrono::Utc::now())
        .with_message(MessageSnapshot::new(MessageRole::User, "Quiz me on fractions"))
        .with_pending_tool_call(PendingToolCall::new(TOOL_CALL_ID, "render_quiz", json!({"questions": 3})));
    checkpoint.iteration = 1;

    service
        .suspend_execution(
            agent_id,
            checkpoint,
            ClientAction::new(TOOL_CALL_ID, "multiple_choice", json!({"question": "1/2 + 1/4 = ?"})),
        )
        .await?;

    let stale_response_rejected = match service
        .resume_execution(agent_id, ClientResponse::new("call-stale", json!({"answer": "3/4"})))
        .await
    {
        Err(AgentServiceError::Domain(AgentError::ToolCallMismatch { .. })) => true,
        Err(e) => return Err(e.into()),
        Ok(_) => false,
    };

    let resumed = service
        .resume_execution(agent_id, ClientResponse::new(TOOL_CALL_ID, json!({"answer": "3/4"})))
        .await?;
    let resumed_iteration = resumed.output.iteration;

    let completed = service
        .complete_session(agent_id, Some("quiz answered".to_string()))
        .await?;

    let replacement_id = if args.reset {
        Some(service.reset_agent(agent_id, "walkthrough reset").await?.output)
    } else {
        None
    };

    Ok(ScenarioReport {
        agent_id,
        resumed_iteration,
        stale_response_rejected,
        final_version: completed.state.version,
        replacement_id,
    })
}

fn print_events(events: &[AgentEvent]) {
    println!("{}", "Events:".bold());
    for (i, event) in events.iter().enumerate() {
        println!(
            "  {:>2}. {} {} {}",
            i + 1,
            event.timestamp().format("%H:%M:%S%.3f").to_string().dimmed(),
            event.event_type().cyan(),
            event.agent_id()
        );
    }
    println!();
}

fn print_report(report: &ScenarioReport) {
    println!("{}", "Walkthrough:".bold());
    println!("  Agent: {}", report.agent_id);
    println!("  Resumed at iteration: {}", report.resumed_iteration);
    if report.stale_response_rejected {
        println!("  {}", "✓ Stale tool_call_id rejected".green());
    } else {
        println!("  {}", "✗ Stale tool_call_id accepted".red());
    }
    println!("  Stored version: {}", report.final_version);
    if let Some(replacement) = report.replacement_id {
        println!("  Replacement agent: {}", replacement);
    }
}
