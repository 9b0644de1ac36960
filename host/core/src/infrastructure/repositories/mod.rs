// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! Infrastructure implementations of the [`AgentRepository`] port.
//!
//! - **PostgresAgentRepository**: production storage, one JSONB document per
//!   agent plus a `version` column used for compare-and-swap
//! - **InMemoryAgentRepository**: `HashMap` storage for tests and development,
//!   with the same version semantics
//!
//! # Usage
//!
//! ```no_run
//! # async fn run(database_url: &str) -> anyhow::Result<()> {
//! use agent_host_core::domain::repository::AgentRepository;
//! use agent_host_core::infrastructure::repositories::PostgresAgentRepository;
//! use sqlx::PgPool;
//!
//! let pool = PgPool::connect(database_url).await?;
//! let repo = PostgresAgentRepository::new(pool);
//! repo.ensure_schema().await?;
//! # Ok(())
//! # }
//! ```

pub mod postgres_agent;

pub use postgres_agent::PostgresAgentRepository;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

use crate::domain::identity::AgentId;
use crate::domain::repository::{AgentRepository, RepositoryError};
use crate::domain::state::AgentState;

#[derive(Clone, Default)]
pub struct InMemoryAgentRepository {
    agents: Arc<RwLock<HashMap<AgentId, AgentState>>>,
}

impl InMemoryAgentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.agents.read().map(|a| a.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> RepositoryError {
    RepositoryError::Database(format!("repository lock poisoned: {}", e))
}

#[async_trait]
impl AgentRepository for InMemoryAgentRepository {
    async fn load(&self, id: AgentId) -> Result<AgentState, RepositoryError> {
        let agents = self.agents.read().map_err(poisoned)?;
        agents.get(&id).cloned().ok_or(RepositoryError::NotFound(id))
    }

    async fn save(&self, state: &AgentState, expected_version: u64) -> Result<u64, RepositoryError> {
        let mut agents = self.agents.write().map_err(poisoned)?;

        let actual = agents.get(&state.id).map(|s| s.version).unwrap_or(0);
        if actual != expected_version {
            return Err(RepositoryError::VersionConflict {
                agent_id: state.id,
                expected: expected_version,
                actual,
            });
        }

        let new_version = expected_version + 1;
        let mut stored = state.clone();
        stored.version = new_version;
        agents.insert(state.id, stored);

        debug!(agent_id = %state.id, version = new_version, "Stored agent state");
        Ok(new_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::agent::Agent;
    use crate::domain::identity::{AgentType, UserId};

    fn new_state() -> AgentState {
        Agent::create(UserId::from("u1"), AgentType::Tutor, None, 20).into_state()
    }

    #[tokio::test]
    async fn test_insert_then_load() {
        let repo = InMemoryAgentRepository::new();
        let state = new_state();

        assert!(matches!(repo.load(state.id).await, Err(RepositoryError::NotFound(_))));

        let version = repo.save(&state, 0).await.unwrap();
        assert_eq!(version, 1);

        let loaded = repo.load(state.id).await.unwrap();
        assert_eq!(loaded.version, 1);
        assert_eq!(loaded.owner_user_id, state.owner_user_id);
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn test_insert_twice_conflicts() {
        let repo = InMemoryAgentRepository::new();
        let state = new_state();
        repo.save(&state, 0).await.unwrap();

        let err = repo.save(&state, 0).await.unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::VersionConflict { expected: 0, actual: 1, .. }
        ));
    }

    #[tokio::test]
    async fn test_stale_writer_loses() {
        let repo = InMemoryAgentRepository::new();
        let state = new_state();
        repo.save(&state, 0).await.unwrap();

        let first = repo.load(state.id).await.unwrap();
        let second = repo.load(state.id).await.unwrap();

        assert_eq!(repo.save(&first, first.version).await.unwrap(), 2);

        let err = repo.save(&second, second.version).await.unwrap_err();
        assert!(err.is_version_conflict());
        assert_eq!(repo.load(state.id).await.unwrap().version, 2);
    }
}
