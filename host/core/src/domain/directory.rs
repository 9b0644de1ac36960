// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Agent Directory read model.
//!
//! The aggregate never answers "which agent does this owner have for this
//! type"; that lookup lives here, fed by published [`AgentEvent`]s. Archived
//! agents stay in the directory but drop out of the active queries, so an
//! archive-and-recreate leaves exactly one active agent per (owner, type).
//!
//! [`AgentEvent`]: crate::domain::events::AgentEvent

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::identity::{AgentId, AgentStatus, AgentType, AssignmentRole, UserId};
use crate::domain::repository::RepositoryError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSummary {
    pub agent_id: AgentId,
    pub owner_user_id: UserId,
    pub agent_type: AgentType,
    pub name: Option<String>,
    pub status: AgentStatus,
    pub assigned_users: Vec<(UserId, AssignmentRole)>,
    pub has_active_session: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AgentSummary {
    pub fn is_active(&self) -> bool {
        self.status == AgentStatus::Active
    }
}

#[async_trait]
pub trait AgentDirectory: Send + Sync {
    async fn find_active_by_owner_and_type(
        &self,
        owner_user_id: &UserId,
        agent_type: AgentType,
    ) -> Result<Option<AgentSummary>, RepositoryError>;

    /// Agents the user is assigned to in any role, archived included.
    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<AgentSummary>, RepositoryError>;

    async fn list_active(&self) -> Result<Vec<AgentSummary>, RepositoryError>;
}
