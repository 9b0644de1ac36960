// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Agent Identity & Assignment Model
//!
//! Identifiers are always drawn from a fresh random source. An [`AgentId`] is
//! never derived from the owner or the agent type, so an agent can be archived
//! and recreated for the same owner without colliding with its history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(pub Uuid);

impl AgentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for AgentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque user identifier issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Reference to a conversation owned elsewhere. Foreign key only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConversationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Closed set of agent specialisations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentType {
    Tutor,
    Thought,
    Evaluator,
    Coach,
    Connector,
    Wellness,
    Planner,
    Researcher,
}

impl AgentType {
    pub const ALL: [AgentType; 8] = [
        AgentType::Tutor,
        AgentType::Thought,
        AgentType::Evaluator,
        AgentType::Coach,
        AgentType::Connector,
        AgentType::Wellness,
        AgentType::Planner,
        AgentType::Researcher,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentType::Tutor => "tutor",
            AgentType::Thought => "thought",
            AgentType::Evaluator => "evaluator",
            AgentType::Coach => "coach",
            AgentType::Connector => "connector",
            AgentType::Wellness => "wellness",
            AgentType::Planner => "planner",
            AgentType::Researcher => "researcher",
        }
    }
}

impl fmt::Display for AgentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown agent type: {0}")]
pub struct UnknownAgentType(pub String);

impl FromStr for AgentType {
    type Err = UnknownAgentType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        AgentType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| UnknownAgentType(s.to_string()))
    }
}

/// Agent-level lifecycle. `Archived` is absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Active,
    Archived,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Active => "active",
            AgentStatus::Archived => "archived",
        }
    }
}

/// Role granted to a user on a shared agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentRole {
    Primary,
    Shared,
    Mentee,
    Observer,
}

impl AssignmentRole {
    /// Observers can read the agent but never drive a session.
    pub fn can_interact(&self) -> bool {
        !matches!(self, AssignmentRole::Observer)
    }
}

/// A (user, role) grant permitting interaction with an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentAssignment {
    pub user_id: UserId,
    pub role: AssignmentRole,
    pub assigned_at: DateTime<Utc>,
    pub assigned_by: UserId,
}

impl AgentAssignment {
    pub fn new(user_id: UserId, role: AssignmentRole, assigned_by: UserId, assigned_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            role,
            assigned_at,
            assigned_by,
        }
    }

    pub fn is_primary(&self) -> bool {
        self.role == AssignmentRole::Primary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_ids_are_random() {
        assert_ne!(AgentId::new(), AgentId::new());
    }

    #[test]
    fn test_agent_id_from_string() {
        let uuid_str = "123e4567-e89b-12d3-a456-426614174000";
        let id = AgentId::from_string(uuid_str).unwrap();
        assert_eq!(id.to_string(), uuid_str);
        assert!(AgentId::from_string("not-a-uuid").is_err());
    }

    #[test]
    fn test_agent_type_parse() {
        assert_eq!("tutor".parse::<AgentType>().unwrap(), AgentType::Tutor);
        assert_eq!(" Researcher ".parse::<AgentType>().unwrap(), AgentType::Researcher);
        assert!("concierge".parse::<AgentType>().is_err());

        for agent_type in AgentType::ALL {
            assert_eq!(agent_type.as_str().parse::<AgentType>().unwrap(), agent_type);
        }
    }

    #[test]
    fn test_agent_type_serde_name() {
        let json = serde_json::to_string(&AgentType::Wellness).unwrap();
        assert_eq!(json, "\"wellness\"");
    }

    #[test]
    fn test_observer_cannot_interact() {
        assert!(AssignmentRole::Primary.can_interact());
        assert!(AssignmentRole::Mentee.can_interact());
        assert!(!AssignmentRole::Observer.can_interact());
    }
}
