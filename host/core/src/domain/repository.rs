// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Agent Repository Port
//!
//! Persistence contract for the Agent aggregate. The interface lives in the
//! domain layer and is implemented in `crate::infrastructure::repositories`.
//!
//! | Implementation | Backend |
//! |----------------|---------|
//! | `InMemoryAgentRepository` | `Arc<RwLock<HashMap>>`, development and tests |
//! | `PostgresAgentRepository` | `agents` table, `state_json JSONB` |
//!
//! ## Optimistic Concurrency
//!
//! Every stored state carries a monotonically increasing `version`. `save` is a
//! compare-and-swap: it succeeds only if the stored version still equals
//! `expected_version` and returns the new version. Version `0` means the agent
//! has never been stored, so saving with `expected_version == 0` is an insert.

use async_trait::async_trait;

use crate::domain::events::AgentEvent;
use crate::domain::identity::AgentId;
use crate::domain::state::AgentState;

/// Storage backend enum for pluggable persistence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    InMemory,
    PostgreSQL(PostgresConfig),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresConfig {
    pub connection_string: String,
}

/// Publication port for agent events, called after each successful save
#[async_trait]
pub trait AgentEventPublisher: Send + Sync {
    async fn publish(&self, event: AgentEvent) -> anyhow::Result<()>;
}

#[async_trait]
pub trait AgentRepository: Send + Sync {
    /// Load the latest stored state. `state.version` holds the stored version.
    async fn load(&self, id: AgentId) -> Result<AgentState, RepositoryError>;

    /// Compare-and-swap write. Returns the new version.
    async fn save(&self, state: &AgentState, expected_version: u64) -> Result<u64, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Agent not found: {0}")]
    NotFound(AgentId),

    #[error("Version conflict on agent {agent_id}: expected {expected}, found {actual}")]
    VersionConflict {
        agent_id: AgentId,
        expected: u64,
        actual: u64,
    },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl RepositoryError {
    pub fn is_version_conflict(&self) -> bool {
        matches!(self, RepositoryError::VersionConflict { .. })
    }
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        RepositoryError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}
