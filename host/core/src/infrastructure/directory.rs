// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! In-memory [`AgentDirectory`] projection.
//!
//! Built purely from published [`AgentEvent`]s. Register it as a publisher on
//! the [`AgentService`](crate::application::agent_service::AgentService), or
//! feed it from an [`EventBus`](super::event_bus::EventBus) subscription.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

use crate::domain::repository::AgentEventPublisher;
use crate::domain::directory::{AgentDirectory, AgentSummary};
use crate::domain::events::AgentEvent;
use crate::domain::identity::{AgentId, AgentStatus, AgentType, AssignmentRole, UserId};
use crate::domain::repository::RepositoryError;

#[derive(Clone, Default)]
pub struct InMemoryAgentDirectory {
    entries: Arc<RwLock<HashMap<AgentId, AgentSummary>>>,
}

impl InMemoryAgentDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event into the read model. Events for agents the directory
    /// never saw created are ignored.
    pub fn project(&self, event: &AgentEvent) -> Result<(), RepositoryError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| RepositoryError::Database(format!("directory lock poisoned: {}", e)))?;

        if let AgentEvent::AgentCreated {
            agent_id,
            owner_user_id,
            agent_type,
            name,
            created_at,
            ..
        } = event
        {
            entries.insert(
                *agent_id,
                AgentSummary {
                    agent_id: *agent_id,
                    owner_user_id: owner_user_id.clone(),
                    agent_type: *agent_type,
                    name: name.clone(),
                    status: AgentStatus::Active,
                    assigned_users: vec![(owner_user_id.clone(), AssignmentRole::Primary)],
                    has_active_session: false,
                    created_at: *created_at,
                    updated_at: *created_at,
                },
            );
            return Ok(());
        }

        let Some(summary) = entries.get_mut(&event.agent_id()) else {
            debug!(agent_id = %event.agent_id(), event_type = event.event_type(), "Ignoring event for unknown agent");
            return Ok(());
        };

        match event {
            AgentEvent::SessionStarted { .. } => summary.has_active_session = true,
            AgentEvent::SessionCompleted { .. } | AgentEvent::SessionTerminated { .. } => {
                summary.has_active_session = false
            }
            AgentEvent::AgentArchived { .. } => summary.status = AgentStatus::Archived,
            AgentEvent::UserAssigned { assignment, .. } => {
                summary
                    .assigned_users
                    .push((assignment.user_id.clone(), assignment.role));
            }
            AgentEvent::UserUnassigned { user_id, .. } => {
                summary.assigned_users.retain(|(u, _)| u != user_id);
            }
            _ => {}
        }
        summary.updated_at = event.timestamp();
        Ok(())
    }

    fn read<T>(&self, f: impl FnOnce(&HashMap<AgentId, AgentSummary>) -> T) -> Result<T, RepositoryError> {
        let entries = self
            .entries
            .read()
            .map_err(|e| RepositoryError::Database(format!("directory lock poisoned: {}", e)))?;
        Ok(f(&entries))
    }
}

#[async_trait]
impl AgentDirectory for InMemoryAgentDirectory {
    async fn find_active_by_owner_and_type(
        &self,
        owner_user_id: &UserId,
        agent_type: AgentType,
    ) -> Result<Option<AgentSummary>, RepositoryError> {
        self.read(|entries| {
            entries
                .values()
                .filter(|s| s.is_active() && &s.owner_user_id == owner_user_id && s.agent_type == agent_type)
                .max_by_key(|s| s.created_at)
                .cloned()
        })
    }

    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<AgentSummary>, RepositoryError> {
        self.read(|entries| {
            let mut found: Vec<_> = entries
                .values()
                .filter(|s| s.assigned_users.iter().any(|(u, _)| u == user_id))
                .cloned()
                .collect();
            found.sort_by_key(|s| s.created_at);
            found
        })
    }

    async fn list_active(&self) -> Result<Vec<AgentSummary>, RepositoryError> {
        self.read(|entries| {
            let mut active: Vec<_> = entries.values().filter(|s| s.is_active()).cloned().collect();
            active.sort_by_key(|s| s.created_at);
            active
        })
    }
}

#[async_trait]
impl AgentEventPublisher for InMemoryAgentDirectory {
    async fn publish(&self, event: AgentEvent) -> anyhow::Result<()> {
        self.project(&event)?;
        Ok(())
    }
}
