// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Agent Aggregate
//!
//! [`Agent`] is the only entry point for mutating an [`AgentState`]. Every
//! command follows the same shape:
//!
//! 1. check preconditions against the current state
//! 2. build exactly one [`AgentEvent`]
//! 3. apply it to the state
//! 4. queue it for publication (`take_events`)
//!
//! Validation always runs before the event is built, so a rejected command
//! leaves both the state and the pending event list untouched.
//!
//! ## Execution Continuation
//!
//! ```text
//! executor ── suspend_execution(snapshot, action) ──▶ state persisted, process may exit
//!    ...minutes or days later, any process...
//! client  ── resume_execution(response) ──▶ tool_call_id checked ──▶ snapshot returned
//! ```
//!
//! The aggregate does no I/O and holds no locks. Concurrent writers are
//! serialised by the repository's compare-and-swap on `version`.

use chrono::Utc;
use std::collections::HashMap;
use thiserror::Error;
use tracing::warn;

use crate::domain::events::AgentEvent;
use crate::domain::execution_state::ExecutionState;
use crate::domain::identity::{AgentAssignment, AgentId, AgentType, AssignmentRole, ConversationId, UserId};
use crate::domain::session::{ClientAction, ClientResponse, Session, SessionId, SessionItem};
use crate::domain::state::AgentState;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AgentError {
    #[error("Agent {0} already has an active session")]
    SessionAlreadyActive(AgentId),

    #[error("Agent {0} has no active session")]
    NoActiveSession(AgentId),

    #[error("Session {0} is not awaiting a client action")]
    NotSuspended(SessionId),

    #[error("Agent {0} has no execution state to resume")]
    NoExecutionState(AgentId),

    #[error("Session {0} has no pending client action")]
    NoPendingAction(SessionId),

    #[error("Agent {0} is already archived")]
    AlreadyArchived(AgentId),

    #[error("Agent {0} cannot be archived while a session is in progress")]
    SessionInProgress(AgentId),

    #[error("User {user_id} is already assigned to agent {agent_id}")]
    UserAlreadyAssigned { agent_id: AgentId, user_id: UserId },

    #[error("User {user_id} is not assigned to agent {agent_id}")]
    UserNotAssigned { agent_id: AgentId, user_id: UserId },

    #[error("User {user_id} holds the last primary assignment on agent {agent_id}")]
    LastPrimaryAssignment { agent_id: AgentId, user_id: UserId },

    #[error("Agent {0} is archived")]
    AgentArchived(AgentId),

    #[error("Tool call mismatch: expected {expected}, received {received}")]
    ToolCallMismatch { expected: String, received: String },
}

/// Coarse classification used for logging and metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentErrorKind {
    /// Caller-correctable; retrying the same input against the same state fails again
    Precondition,
    /// Stale or mis-routed client response
    CorrelationMismatch,
}

impl AgentError {
    pub fn kind(&self) -> AgentErrorKind {
        match self {
            AgentError::ToolCallMismatch { .. } => AgentErrorKind::CorrelationMismatch,
            _ => AgentErrorKind::Precondition,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Agent {
    state: AgentState,
    pending_events: Vec<AgentEvent>,
}

impl Agent {
    /// Create a brand-new agent with a fresh random identifier.
    ///
    /// The owner becomes the sole `Primary` assignee.
    pub fn create(
        owner_user_id: UserId,
        agent_type: AgentType,
        name: Option<String>,
        max_history_size: usize,
    ) -> Self {
        let agent_id = AgentId::new();
        let created_at = Utc::now();
        let state = AgentState::genesis(agent_id, &owner_user_id, agent_type, &name, max_history_size, created_at);
        let event = AgentEvent::AgentCreated {
            agent_id,
            owner_user_id,
            agent_type,
            name,
            max_history_size,
            created_at,
        };
        Self {
            state,
            pending_events: vec![event],
        }
    }

    /// Rehydrate from a loaded state. No events are produced.
    pub fn from_state(state: AgentState) -> Self {
        Self {
            state,
            pending_events: Vec::new(),
        }
    }

    pub fn id(&self) -> AgentId {
        self.state.id
    }

    pub fn version(&self) -> u64 {
        self.state.version
    }

    pub fn state(&self) -> &AgentState {
        &self.state
    }

    pub fn into_state(self) -> AgentState {
        self.state
    }

    pub fn pending_events(&self) -> &[AgentEvent] {
        &self.pending_events
    }

    /// Drain the events produced since load (or since the last drain).
    pub fn take_events(&mut self) -> Vec<AgentEvent> {
        std::mem::take(&mut self.pending_events)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn is_archived(&self) -> bool {
        self.state.is_archived()
    }

    pub fn active_session(&self) -> Option<&Session> {
        self.state.active_session.as_ref()
    }

    pub fn has_active_session(&self) -> bool {
        self.state.active_session.is_some()
    }

    pub fn is_suspended(&self) -> bool {
        self.active_session()
            .map(|s| s.is_awaiting_client_action())
            .unwrap_or(false)
    }

    pub fn pending_action(&self) -> Option<&ClientAction> {
        self.active_session().and_then(|s| s.pending_action.as_ref())
    }

    pub fn assignment_for(&self, user_id: &UserId) -> Option<&AgentAssignment> {
        self.state.assignment_for(user_id)
    }

    /// Any assignee except an observer may drive sessions.
    pub fn can_interact(&self, user_id: &UserId) -> bool {
        !self.is_archived()
            && self
                .assignment_for(user_id)
                .map(|a| a.role.can_interact())
                .unwrap_or(false)
    }

    // ========================================================================
    // Commands
    // ========================================================================

    pub fn update_preferences(
        &mut self,
        preferences: HashMap<String, serde_json::Value>,
    ) -> Result<(), AgentError> {
        self.ensure_not_archived()?;

        self.record(AgentEvent::PreferencesUpdated {
            agent_id: self.id(),
            preferences,
            updated_at: Utc::now(),
        });
        Ok(())
    }

    pub fn start_session(
        &mut self,
        conversation_id: ConversationId,
        session_type: impl Into<String>,
        session_id: Option<SessionId>,
    ) -> Result<Session, AgentError> {
        self.ensure_not_archived()?;
        if self.has_active_session() {
            return Err(AgentError::SessionAlreadyActive(self.id()));
        }

        let now = Utc::now();
        let mut session = Session::new(
            session_id.unwrap_or_default(),
            conversation_id,
            session_type,
            now,
        );
        session.activate();

        self.record(AgentEvent::SessionStarted {
            agent_id: self.id(),
            session: session.clone(),
            started_at: now,
        });
        Ok(session)
    }

    /// Checkpoint the executor's loop while it waits on the client.
    ///
    /// Overwrites any snapshot left from an earlier suspension in the same
    /// session.
    pub fn suspend_execution(
        &mut self,
        execution_state: ExecutionState,
        pending_action: ClientAction,
    ) -> Result<(), AgentError> {
        let session_id = self.require_active_session()?.session_id;

        self.record(AgentEvent::ExecutionSuspended {
            agent_id: self.id(),
            session_id,
            execution_state,
            pending_action,
            suspended_at: Utc::now(),
        });
        Ok(())
    }

    /// Validate the client's response against the checkpoint and hand the
    /// checkpoint back to the executor.
    ///
    /// The response must answer the session's current pending action and, when
    /// the snapshot carries one, its pending tool call. The returned value is
    /// the snapshot exactly as it was suspended. The stored snapshot is kept
    /// until the loop suspends again or the session ends.
    pub fn resume_execution(&mut self, response: ClientResponse) -> Result<ExecutionState, AgentError> {
        let session = self.require_active_session()?;
        if !session.is_awaiting_client_action() {
            return Err(AgentError::NotSuspended(session.session_id));
        }
        let session_id = session.session_id;
        let awaited = session.pending_action.as_ref().map(|a| a.tool_call_id.clone());

        let execution_state = self
            .state
            .execution_state
            .clone()
            .ok_or(AgentError::NoExecutionState(self.id()))?;

        if let Some(expected) = awaited.as_deref() {
            self.check_correlation(expected, &response.tool_call_id, "resume_execution")?;
        }
        if let Some(expected) = execution_state.pending_call_id() {
            self.check_correlation(expected, &response.tool_call_id, "resume_execution")?;
        }

        self.record(AgentEvent::ExecutionResumed {
            agent_id: self.id(),
            session_id,
            tool_call_id: response.tool_call_id,
            response: response.response,
            resumed_at: Utc::now(),
        });
        Ok(execution_state)
    }

    /// Single-step client interaction: the executor keeps its own loop state,
    /// so no continuation is persisted.
    pub fn request_client_action(&mut self, action: ClientAction) -> Result<(), AgentError> {
        let session_id = self.require_active_session()?.session_id;

        self.record(AgentEvent::ClientActionRequested {
            agent_id: self.id(),
            session_id,
            action,
            requested_at: Utc::now(),
        });
        Ok(())
    }

    pub fn receive_client_response(
        &mut self,
        response: ClientResponse,
        item_data: Option<serde_json::Value>,
    ) -> Result<(), AgentError> {
        let session = self.require_active_session()?;
        let session_id = session.session_id;
        let expected = session
            .pending_action
            .as_ref()
            .map(|a| a.tool_call_id.clone())
            .ok_or(AgentError::NoPendingAction(session_id))?;

        self.check_correlation(&expected, &response.tool_call_id, "receive_client_response")?;

        let now = Utc::now();
        self.record(AgentEvent::ClientResponseReceived {
            agent_id: self.id(),
            session_id,
            tool_call_id: response.tool_call_id,
            response: response.response,
            item: item_data.map(|data| SessionItem::new(data, now)),
            received_at: now,
        });
        Ok(())
    }

    pub fn update_ui_state(&mut self, ui_state: serde_json::Value) -> Result<(), AgentError> {
        let session_id = self.require_active_session()?.session_id;

        self.record(AgentEvent::SessionUiStateUpdated {
            agent_id: self.id(),
            session_id,
            ui_state,
            updated_at: Utc::now(),
        });
        Ok(())
    }

    pub fn complete_session(&mut self, summary: Option<String>) -> Result<(), AgentError> {
        let session_id = self.require_active_session()?.session_id;

        self.record(AgentEvent::SessionCompleted {
            agent_id: self.id(),
            session_id,
            summary,
            completed_at: Utc::now(),
        });
        Ok(())
    }

    /// Abandon the active session regardless of what the executor is doing.
    pub fn terminate_session(&mut self, reason: impl Into<String>) -> Result<(), AgentError> {
        let session_id = self.require_active_session()?.session_id;

        self.record(AgentEvent::SessionTerminated {
            agent_id: self.id(),
            session_id,
            reason: reason.into(),
            terminated_at: Utc::now(),
        });
        Ok(())
    }

    /// Irreversible.
    pub fn archive(&mut self, reason: impl Into<String>) -> Result<(), AgentError> {
        if self.is_archived() {
            return Err(AgentError::AlreadyArchived(self.id()));
        }
        if self.has_active_session() {
            return Err(AgentError::SessionInProgress(self.id()));
        }

        self.record(AgentEvent::AgentArchived {
            agent_id: self.id(),
            reason: reason.into(),
            archived_at: Utc::now(),
        });
        Ok(())
    }

    pub fn assign_user(
        &mut self,
        user_id: UserId,
        role: AssignmentRole,
        assigned_by: UserId,
    ) -> Result<(), AgentError> {
        self.ensure_not_archived()?;
        if self.assignment_for(&user_id).is_some() {
            return Err(AgentError::UserAlreadyAssigned {
                agent_id: self.id(),
                user_id,
            });
        }

        self.record(AgentEvent::UserAssigned {
            agent_id: self.id(),
            assignment: AgentAssignment::new(user_id, role, assigned_by, Utc::now()),
        });
        Ok(())
    }

    pub fn unassign_user(&mut self, user_id: UserId, unassigned_by: UserId) -> Result<(), AgentError> {
        self.ensure_not_archived()?;
        let assignment = self
            .assignment_for(&user_id)
            .ok_or_else(|| AgentError::UserNotAssigned {
                agent_id: self.id(),
                user_id: user_id.clone(),
            })?;
        if assignment.is_primary() && self.state.primary_count() == 1 {
            return Err(AgentError::LastPrimaryAssignment {
                agent_id: self.id(),
                user_id,
            });
        }

        self.record(AgentEvent::UserUnassigned {
            agent_id: self.id(),
            user_id,
            unassigned_by,
            unassigned_at: Utc::now(),
        });
        Ok(())
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn record(&mut self, event: AgentEvent) {
        self.state.apply(&event);
        self.pending_events.push(event);
    }

    fn ensure_not_archived(&self) -> Result<(), AgentError> {
        if self.is_archived() {
            return Err(AgentError::AgentArchived(self.id()));
        }
        Ok(())
    }

    fn require_active_session(&self) -> Result<&Session, AgentError> {
        self.state
            .active_session
            .as_ref()
            .ok_or(AgentError::NoActiveSession(self.state.id))
    }

    fn check_correlation(&self, expected: &str, received: &str, command: &'static str) -> Result<(), AgentError> {
        if expected == received {
            return Ok(());
        }
        warn!(
            target: "security",
            agent_id = %self.id(),
            command,
            expected,
            received,
            "Rejected client response with mismatched tool_call_id"
        );
        metrics::counter!("agent_tool_call_mismatch_total", "command" => command).increment(1);
        Err(AgentError::ToolCallMismatch {
            expected: expected.to_string(),
            received: received.to_string(),
        })
    }
}
