// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Session Value Object
//!
//! A [`Session`] is one bounded interaction episode owned by an agent. It has
//! no repository of its own: it lives inside `AgentState::active_session` while
//! running and inside `AgentState::session_history` once finished.
//!
//! ## Session Lifecycle
//!
//! ```text
//! PENDING ──start──▶ ACTIVE ◀──resume/response──▶ AWAITING_CLIENT_ACTION
//!                      │                                  │
//!                      └──────────complete/terminate──────┴──▶ COMPLETED | TERMINATED
//! ```
//!
//! `Pending` only exists while the session is being constructed. `Completed`
//! and `Terminated` are absorbing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::identity::ConversationId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    Active,
    AwaitingClientAction,
    Completed,
    Terminated,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Terminated)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::AwaitingClientAction => "awaiting_client_action",
            Self::Completed => "completed",
            Self::Terminated => "terminated",
        }
    }
}

/// Something the client UI must render before the execution can continue.
///
/// `tool_call_id` is the correlation token: the matching [`ClientResponse`]
/// must carry exactly the same value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientAction {
    pub tool_call_id: String,
    /// Widget the client should render (e.g. "multiple_choice", "free_text")
    pub widget_type: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl ClientAction {
    pub fn new(tool_call_id: impl Into<String>, widget_type: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            widget_type: widget_type.into(),
            payload,
        }
    }
}

/// The client's answer to a [`ClientAction`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientResponse {
    pub tool_call_id: String,
    #[serde(default)]
    pub response: serde_json::Value,
}

impl ClientResponse {
    pub fn new(tool_call_id: impl Into<String>, response: serde_json::Value) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            response,
        }
    }
}

/// Structured interaction record appended to a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionItem {
    pub item_id: String,
    pub data: serde_json::Value,
    pub recorded_at: DateTime<Utc>,
}

impl SessionItem {
    pub fn new(data: serde_json::Value, recorded_at: DateTime<Utc>) -> Self {
        Self {
            item_id: Uuid::new_v4().to_string(),
            data,
            recorded_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: SessionId,
    pub conversation_id: ConversationId,
    pub session_type: String,
    pub status: SessionStatus,

    #[serde(default)]
    pub items: Vec<SessionItem>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_item_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_action: Option<ClientAction>,

    /// Set while an executor checkpoint waits on `pending_action`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspended_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub ui_state: serde_json::Value,

    pub started_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminated_reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl Session {
    /// Construct a session in the transient `Pending` state.
    pub fn new(
        session_id: SessionId,
        conversation_id: ConversationId,
        session_type: impl Into<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id,
            conversation_id,
            session_type: session_type.into(),
            status: SessionStatus::Pending,
            items: Vec::new(),
            current_item_id: None,
            pending_action: None,
            suspended_at: None,
            ui_state: serde_json::Value::Null,
            started_at,
            completed_at: None,
            terminated_reason: None,
            summary: None,
        }
    }

    pub fn is_awaiting_client_action(&self) -> bool {
        self.status == SessionStatus::AwaitingClientAction
    }

    pub(crate) fn activate(&mut self) {
        self.status = SessionStatus::Active;
    }

    pub(crate) fn await_client(&mut self, action: ClientAction) {
        self.pending_action = Some(action);
        self.suspended_at = None;
        self.status = SessionStatus::AwaitingClientAction;
    }

    pub(crate) fn suspend(&mut self, action: ClientAction, at: DateTime<Utc>) {
        self.await_client(action);
        self.suspended_at = Some(at);
    }

    pub(crate) fn clear_pending_action(&mut self) {
        self.pending_action = None;
        self.suspended_at = None;
        self.status = SessionStatus::Active;
    }

    pub(crate) fn push_item(&mut self, item: SessionItem) {
        self.current_item_id = Some(item.item_id.clone());
        self.items.push(item);
    }

    pub(crate) fn complete(&mut self, summary: Option<String>, at: DateTime<Utc>) {
        self.status = SessionStatus::Completed;
        self.pending_action = None;
        self.suspended_at = None;
        self.summary = summary;
        self.completed_at = Some(at);
    }

    pub(crate) fn terminate(&mut self, reason: String, at: DateTime<Utc>) {
        self.status = SessionStatus::Terminated;
        self.pending_action = None;
        self.suspended_at = None;
        self.terminated_reason = Some(reason);
        self.completed_at = Some(at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session() -> Session {
        Session::new(SessionId::new(), ConversationId::from("c1"), "learning", Utc::now())
    }

    #[test]
    fn test_new_session_is_pending() {
        let s = session();
        assert_eq!(s.status, SessionStatus::Pending);
        assert!(s.items.is_empty());
        assert!(s.pending_action.is_none());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(SessionStatus::Completed.is_terminal());
        assert!(SessionStatus::Terminated.is_terminal());
        assert!(!SessionStatus::AwaitingClientAction.is_terminal());
        assert!(!SessionStatus::Pending.is_terminal());
    }

    #[test]
    fn test_push_item_tracks_current() {
        let mut s = session();
        s.activate();
        s.push_item(SessionItem::new(json!({"answer": 42}), Utc::now()));
        let id = s.items[0].item_id.clone();
        assert_eq!(s.current_item_id.as_deref(), Some(id.as_str()));
    }

    #[test]
    fn test_session_deserializes_without_optional_fields() {
        let json = json!({
            "session_id": "123e4567-e89b-12d3-a456-426614174000",
            "conversation_id": "c1",
            "session_type": "learning",
            "status": "awaiting_client_action",
            "started_at": "2026-01-01T00:00:00Z"
        });
        let s: Session = serde_json::from_value(json).unwrap();
        assert!(s.is_awaiting_client_action());
        assert!(s.items.is_empty());
        assert!(s.summary.is_none());
        assert_eq!(s.ui_state, serde_json::Value::Null);
    }
}
