// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Domain events for the Agent aggregate.
//!
//! Every successful command on [`crate::domain::agent::Agent`] produces exactly
//! one [`AgentEvent`]. The event is applied to `AgentState` through a single
//! exhaustive `match` and then handed to the publication port. Events are
//! published for projections and analytics; persisted state, not the event
//! stream, is the source of truth.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::execution_state::ExecutionState;
use crate::domain::identity::{AgentAssignment, AgentId, AgentType, UserId};
use crate::domain::session::{ClientAction, Session, SessionId, SessionItem};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    AgentCreated {
        agent_id: AgentId,
        owner_user_id: UserId,
        agent_type: AgentType,
        name: Option<String>,
        max_history_size: usize,
        created_at: DateTime<Utc>,
    },

    PreferencesUpdated {
        agent_id: AgentId,
        preferences: HashMap<String, serde_json::Value>,
        updated_at: DateTime<Utc>,
    },

    SessionStarted {
        agent_id: AgentId,
        session: Session,
        started_at: DateTime<Utc>,
    },

    /// Execution loop checkpointed while waiting on the client
    ExecutionSuspended {
        agent_id: AgentId,
        session_id: SessionId,
        execution_state: ExecutionState,
        pending_action: ClientAction,
        suspended_at: DateTime<Utc>,
    },

    ExecutionResumed {
        agent_id: AgentId,
        session_id: SessionId,
        tool_call_id: String,
        response: serde_json::Value,
        resumed_at: DateTime<Utc>,
    },

    ClientActionRequested {
        agent_id: AgentId,
        session_id: SessionId,
        action: ClientAction,
        requested_at: DateTime<Utc>,
    },

    ClientResponseReceived {
        agent_id: AgentId,
        session_id: SessionId,
        tool_call_id: String,
        response: serde_json::Value,
        item: Option<SessionItem>,
        received_at: DateTime<Utc>,
    },

    SessionUiStateUpdated {
        agent_id: AgentId,
        session_id: SessionId,
        ui_state: serde_json::Value,
        updated_at: DateTime<Utc>,
    },

    SessionCompleted {
        agent_id: AgentId,
        session_id: SessionId,
        summary: Option<String>,
        completed_at: DateTime<Utc>,
    },

    SessionTerminated {
        agent_id: AgentId,
        session_id: SessionId,
        reason: String,
        terminated_at: DateTime<Utc>,
    },

    AgentArchived {
        agent_id: AgentId,
        reason: String,
        archived_at: DateTime<Utc>,
    },

    UserAssigned {
        agent_id: AgentId,
        assignment: AgentAssignment,
    },

    UserUnassigned {
        agent_id: AgentId,
        user_id: UserId,
        unassigned_by: UserId,
        unassigned_at: DateTime<Utc>,
    },
}

impl AgentEvent {
    pub fn agent_id(&self) -> AgentId {
        match self {
            AgentEvent::AgentCreated { agent_id, .. }
            | AgentEvent::PreferencesUpdated { agent_id, .. }
            | AgentEvent::SessionStarted { agent_id, .. }
            | AgentEvent::ExecutionSuspended { agent_id, .. }
            | AgentEvent::ExecutionResumed { agent_id, .. }
            | AgentEvent::ClientActionRequested { agent_id, .. }
            | AgentEvent::ClientResponseReceived { agent_id, .. }
            | AgentEvent::SessionUiStateUpdated { agent_id, .. }
            | AgentEvent::SessionCompleted { agent_id, .. }
            | AgentEvent::SessionTerminated { agent_id, .. }
            | AgentEvent::AgentArchived { agent_id, .. }
            | AgentEvent::UserAssigned { agent_id, .. }
            | AgentEvent::UserUnassigned { agent_id, .. } => *agent_id,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            AgentEvent::AgentCreated { created_at, .. } => *created_at,
            AgentEvent::PreferencesUpdated { updated_at, .. } => *updated_at,
            AgentEvent::SessionStarted { started_at, .. } => *started_at,
            AgentEvent::ExecutionSuspended { suspended_at, .. } => *suspended_at,
            AgentEvent::ExecutionResumed { resumed_at, .. } => *resumed_at,
            AgentEvent::ClientActionRequested { requested_at, .. } => *requested_at,
            AgentEvent::ClientResponseReceived { received_at, .. } => *received_at,
            AgentEvent::SessionUiStateUpdated { updated_at, .. } => *updated_at,
            AgentEvent::SessionCompleted { completed_at, .. } => *completed_at,
            AgentEvent::SessionTerminated { terminated_at, .. } => *terminated_at,
            AgentEvent::AgentArchived { archived_at, .. } => *archived_at,
            AgentEvent::UserAssigned { assignment, .. } => assignment.assigned_at,
            AgentEvent::UserUnassigned { unassigned_at, .. } => *unassigned_at,
        }
    }

    /// Stable external name used on the wire.
    pub fn event_type(&self) -> &'static str {
        match self {
            AgentEvent::AgentCreated { .. } => "agent.created",
            AgentEvent::PreferencesUpdated { .. } => "agent.preferences.updated",
            AgentEvent::SessionStarted { .. } => "agent.session.started",
            AgentEvent::ExecutionSuspended { .. } => "agent.execution.suspended",
            AgentEvent::ExecutionResumed { .. } => "agent.execution.resumed",
            AgentEvent::ClientActionRequested { .. } => "agent.client.action.requested",
            AgentEvent::ClientResponseReceived { .. } => "agent.client.response.received",
            AgentEvent::SessionUiStateUpdated { .. } => "agent.session.ui_state.updated",
            AgentEvent::SessionCompleted { .. } => "agent.session.completed",
            AgentEvent::SessionTerminated { .. } => "agent.session.terminated",
            AgentEvent::AgentArchived { .. } => "agent.archived",
            AgentEvent::UserAssigned { .. } => "agent.user.assigned",
            AgentEvent::UserUnassigned { .. } => "agent.user.unassigned",
        }
    }
}
