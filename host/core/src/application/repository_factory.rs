// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Repository Factory - Application Layer
//!
//! Creates the concrete [`AgentRepository`] for the configured
//! [`StorageBackend`], keeping the domain layer free of infrastructure types.

use std::sync::Arc;
use tracing::info;

use crate::domain::repository::{AgentRepository, RepositoryError, StorageBackend};
use crate::infrastructure::repositories::{InMemoryAgentRepository, PostgresAgentRepository};

/// Creates an AgentRepository implementation based on the configured backend.
///
/// The PostgreSQL backend connects eagerly and makes sure the `agents` table
/// exists.
pub async fn create_agent_repository(backend: &StorageBackend) -> Result<Arc<dyn AgentRepository>, RepositoryError> {
    match backend {
        StorageBackend::InMemory => {
            info!("Using in-memory agent repository");
            Ok(Arc::new(InMemoryAgentRepository::new()))
        }
        StorageBackend::PostgreSQL(config) => {
            info!("Using PostgreSQL agent repository");
            let repository = PostgresAgentRepository::connect(&config.connection_string).await?;
            repository.ensure_schema().await?;
            Ok(Arc::new(repository))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::agent::Agent;
    use crate::domain::identity::{AgentType, UserId};

    #[tokio::test]
    async fn test_in_memory_backend() {
        let repository = create_agent_repository(&StorageBackend::InMemory).await.unwrap();
        let state = Agent::create(UserId::from("u1"), AgentType::Coach, None, 20).into_state();
        assert_eq!(repository.save(&state, 0).await.unwrap(), 1);
    }
}
