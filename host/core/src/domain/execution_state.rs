// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Execution State (continuation snapshot)
//!
//! [`ExecutionState`] is everything an executor needs to pick a suspended
//! tool-calling loop back up without replaying LLM calls: the message history,
//! the loop counters and the tool call the loop is blocked on.
//!
//! The snapshot is pure data. Nothing (thread, connection, lock) is held while
//! an agent is suspended, so any process that can load the agent can resume it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::session::ClientResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallSnapshot {
    pub call_id: String,
    pub tool_name: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageSnapshot {
    pub role: MessageRole,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallSnapshot>,
    /// Set on `Tool` messages: the call this message answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl MessageSnapshot {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Tool,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }
}

/// The tool call the loop is blocked on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingToolCall {
    pub call_id: String,
    pub tool_name: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

impl PendingToolCall {
    pub fn new(call_id: impl Into<String>, tool_name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            arguments,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionState {
    #[serde(default)]
    pub conversation_snapshot: Vec<MessageSnapshot>,
    #[serde(default)]
    pub iteration: u32,
    #[serde(default)]
    pub tool_calls_made: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_tool_call: Option<PendingToolCall>,
    pub started_at: DateTime<Utc>,
    /// Wall-clock time the loop has spent running, excluding suspensions
    #[serde(default)]
    pub elapsed_ms: u64,
}

impl ExecutionState {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            conversation_snapshot: Vec::new(),
            iteration: 0,
            tool_calls_made: 0,
            pending_tool_call: None,
            started_at,
            elapsed_ms: 0,
        }
    }

    pub fn with_message(mut self, message: MessageSnapshot) -> Self {
        self.conversation_snapshot.push(message);
        self
    }

    pub fn with_pending_tool_call(mut self, call: PendingToolCall) -> Self {
        self.pending_tool_call = Some(call);
        self
    }

    pub fn pending_call_id(&self) -> Option<&str> {
        self.pending_tool_call.as_ref().map(|c| c.call_id.as_str())
    }

    /// Next loop step after the client answered the pending call: the response
    /// becomes a tool result message, the iteration advances and the pending
    /// call is cleared.
    pub fn continue_with(&self, response: &ClientResponse) -> ExecutionState {
        let mut next = self.clone();
        next.conversation_snapshot.push(MessageSnapshot::tool_result(
            response.tool_call_id.clone(),
            response.response.to_string(),
        ));
        next.pending_tool_call = None;
        next.iteration += 1;
        next.tool_calls_made += 1;
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn suspended_state() -> ExecutionState {
        ExecutionState::new(Utc::now())
            .with_message(MessageSnapshot::new(MessageRole::User, "quiz me"))
            .with_pending_tool_call(PendingToolCall::new("tc1", "render_quiz", json!({"questions": 3})))
    }

    #[test]
    fn test_pending_call_id() {
        assert_eq!(suspended_state().pending_call_id(), Some("tc1"));
        assert_eq!(ExecutionState::new(Utc::now()).pending_call_id(), None);
    }

    #[test]
    fn test_continue_with_appends_tool_result() {
        let state = suspended_state();
        let next = state.continue_with(&ClientResponse::new("tc1", json!({"ok": true})));

        assert_eq!(next.iteration, state.iteration + 1);
        assert_eq!(next.tool_calls_made, 1);
        assert!(next.pending_tool_call.is_none());

        let last = next.conversation_snapshot.last().unwrap();
        assert_eq!(last.role, MessageRole::Tool);
        assert_eq!(last.tool_call_id.as_deref(), Some("tc1"));
        assert_eq!(last.content, r#"{"ok":true}"#);
    }

    #[test]
    fn test_snapshot_survives_storage_representation() {
        let state = suspended_state();
        let stored = serde_json::to_string(&state).unwrap();
        let restored: ExecutionState = serde_json::from_str(&stored).unwrap();
        assert_eq!(restored, state);
    }
}
