// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Agent State Container
//!
//! [`AgentState`] is the full persisted shape of an agent. It is only ever
//! mutated by [`AgentState::apply`], one exhaustive `match` over
//! [`AgentEvent`]. Replaying the events a sequence of commands produced onto a
//! freshly created state yields the same state the commands left behind.
//!
//! ## Storage Representation
//!
//! The struct is stored as JSON. Fields added after `schema_version` 1 must be
//! optional or carry a `#[serde(default)]`; existing fields are never
//! repurposed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

use crate::domain::events::AgentEvent;
use crate::domain::execution_state::ExecutionState;
use crate::domain::identity::{
    AgentAssignment, AgentId, AgentStatus, AgentType, AssignmentRole, UserId,
};
use crate::domain::session::Session;

pub const AGENT_STATE_SCHEMA_VERSION: u32 = 1;
pub const DEFAULT_MAX_HISTORY_SIZE: usize = 20;

fn default_max_history_size() -> usize {
    DEFAULT_MAX_HISTORY_SIZE
}

fn default_schema_version() -> u32 {
    AGENT_STATE_SCHEMA_VERSION
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    pub id: AgentId,
    pub owner_user_id: UserId,
    pub agent_type: AgentType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub status: AgentStatus,
    pub assignments: Vec<AgentAssignment>,

    #[serde(default)]
    pub preferences: HashMap<String, serde_json::Value>,

    // Interaction counters
    #[serde(default)]
    pub total_sessions: u64,
    #[serde(default)]
    pub total_interactions: u64,
    #[serde(default)]
    pub successful_completions: u64,

    #[serde(default)]
    pub active_session: Option<Session>,

    /// Continuation of a suspended execution loop
    #[serde(default)]
    pub execution_state: Option<ExecutionState>,

    /// Finished sessions, most recent first
    #[serde(default)]
    pub session_history: VecDeque<Session>,

    #[serde(default = "default_max_history_size")]
    pub max_history_size: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_reason: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Revision this state was loaded at; 0 until first stored
    #[serde(default)]
    pub version: u64,

    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
}

impl AgentState {
    /// State right after `AgentCreated`, before any other event.
    pub(crate) fn genesis(
        agent_id: AgentId,
        owner_user_id: &UserId,
        agent_type: AgentType,
        name: &Option<String>,
        max_history_size: usize,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: agent_id,
            owner_user_id: owner_user_id.clone(),
            agent_type,
            name: name.clone(),
            status: AgentStatus::Active,
            assignments: vec![AgentAssignment::new(
                owner_user_id.clone(),
                AssignmentRole::Primary,
                owner_user_id.clone(),
                created_at,
            )],
            preferences: HashMap::new(),
            total_sessions: 0,
            total_interactions: 0,
            successful_completions: 0,
            active_session: None,
            execution_state: None,
            session_history: VecDeque::new(),
            max_history_size,
            archived_at: None,
            archive_reason: None,
            created_at,
            updated_at: created_at,
            version: 0,
            schema_version: AGENT_STATE_SCHEMA_VERSION,
        }
    }

    /// Rebuild a state from an event sequence starting with `AgentCreated`.
    ///
    /// Returns `None` if the sequence is empty or does not start with a
    /// creation event.
    pub fn from_events<'a>(events: impl IntoIterator<Item = &'a AgentEvent>) -> Option<Self> {
        let mut events = events.into_iter();
        let mut state = match events.next()? {
            AgentEvent::AgentCreated {
                agent_id,
                owner_user_id,
                agent_type,
                name,
                max_history_size,
                created_at,
            } => Self::genesis(*agent_id, owner_user_id, *agent_type, name, *max_history_size, *created_at),
            _ => return None,
        };
        for event in events {
            state.apply(event);
        }
        Some(state)
    }

    /// Apply one event. Preconditions are the command's job; `apply` never
    /// fails and never inspects anything but the event and current state.
    pub fn apply(&mut self, event: &AgentEvent) {
        match event {
            AgentEvent::AgentCreated {
                agent_id,
                owner_user_id,
                agent_type,
                name,
                max_history_size,
                created_at,
            } => {
                let version = self.version;
                *self = Self::genesis(*agent_id, owner_user_id, *agent_type, name, *max_history_size, *created_at);
                self.version = version;
            }
            AgentEvent::PreferencesUpdated { preferences, .. } => {
                self.preferences
                    .extend(preferences.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            AgentEvent::SessionStarted { session, .. } => {
                self.active_session = Some(session.clone());
                self.total_sessions += 1;
            }
            AgentEvent::ExecutionSuspended {
                execution_state,
                pending_action,
                suspended_at,
                ..
            } => {
                if let Some(session) = self.active_session.as_mut() {
                    session.suspend(pending_action.clone(), *suspended_at);
                }
                self.execution_state = Some(execution_state.clone());
            }
            AgentEvent::ExecutionResumed { .. } => {
                // execution_state stays in place until the next suspend or
                // until the session ends
                if let Some(session) = self.active_session.as_mut() {
                    session.clear_pending_action();
                }
                self.total_interactions += 1;
            }
            AgentEvent::ClientActionRequested { action, .. } => {
                if let Some(session) = self.active_session.as_mut() {
                    session.await_client(action.clone());
                }
            }
            AgentEvent::ClientResponseReceived { item, .. } => {
                if let Some(session) = self.active_session.as_mut() {
                    session.clear_pending_action();
                    if let Some(item) = item {
                        session.push_item(item.clone());
                    }
                }
                self.total_interactions += 1;
            }
            AgentEvent::SessionUiStateUpdated { ui_state, .. } => {
                if let Some(session) = self.active_session.as_mut() {
                    session.ui_state = ui_state.clone();
                }
            }
            AgentEvent::SessionCompleted {
                summary,
                completed_at,
                ..
            } => {
                self.retire_active_session(|s| s.complete(summary.clone(), *completed_at));
                self.successful_completions += 1;
            }
            AgentEvent::SessionTerminated {
                reason,
                terminated_at,
                ..
            } => {
                self.retire_active_session(|s| s.terminate(reason.clone(), *terminated_at));
            }
            AgentEvent::AgentArchived {
                reason,
                archived_at,
                ..
            } => {
                self.status = AgentStatus::Archived;
                self.archive_reason = Some(reason.clone());
                self.archived_at = Some(*archived_at);
            }
            AgentEvent::UserAssigned { assignment, .. } => {
                self.assignments.push(assignment.clone());
            }
            AgentEvent::UserUnassigned { user_id, .. } => {
                self.assignments.retain(|a| &a.user_id != user_id);
            }
        }
        self.updated_at = event.timestamp();
    }

    fn retire_active_session(&mut self, finish: impl FnOnce(&mut Session)) {
        if let Some(mut session) = self.active_session.take() {
            finish(&mut session);
            self.session_history.push_front(session);
            self.session_history.truncate(self.max_history_size);
        }
        self.execution_state = None;
    }

    pub fn is_archived(&self) -> bool {
        self.status == AgentStatus::Archived
    }

    pub fn assignment_for(&self, user_id: &UserId) -> Option<&AgentAssignment> {
        self.assignments.iter().find(|a| &a.user_id == user_id)
    }

    pub fn primary_count(&self) -> usize {
        self.assignments.iter().filter(|a| a.is_primary()).count()
    }
}
