// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Agent Repository
//!
//! Production `AgentRepository` backed by the `agents` table. The full
//! [`AgentState`] is stored as `state_json`; `owner_user_id`, `agent_type` and
//! `status` are copied into columns for operational queries only.
//!
//! Compare-and-swap is expressed in SQL:
//! - `expected_version == 0`: `INSERT ... ON CONFLICT (id) DO NOTHING`
//! - otherwise: `UPDATE ... WHERE id = $1 AND version = $expected`
//!
//! Zero affected rows means another writer got there first.

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::Row;
use tracing::debug;

use crate::domain::identity::AgentId;
use crate::domain::repository::{AgentRepository, RepositoryError};
use crate::domain::state::AgentState;

const SCHEMA: &str = include_str!("../../../migrations/0001_create_agents.sql");

pub struct PostgresAgentRepository {
    pool: PgPool,
}

impl PostgresAgentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(connection_string: &str) -> Result<Self, RepositoryError> {
        let pool = PgPool::connect(connection_string)
            .await
            .map_err(|e| RepositoryError::Database(format!("Failed to connect to PostgreSQL: {}", e)))?;
        Ok(Self::new(pool))
    }

    /// Create the `agents` table and its index if missing.
    pub async fn ensure_schema(&self) -> Result<(), RepositoryError> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    async fn current_version(&self, id: AgentId) -> Result<u64, RepositoryError> {
        let row = sqlx::query("SELECT version FROM agents WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => from_db_version(row.try_get("version")?),
            None => Ok(0),
        }
    }
}

fn to_db_version(version: u64) -> Result<i64, RepositoryError> {
    i64::try_from(version).map_err(|_| RepositoryError::Database(format!("version {} out of range", version)))
}

fn from_db_version(version: i64) -> Result<u64, RepositoryError> {
    u64::try_from(version).map_err(|_| RepositoryError::Database(format!("stored version {} is negative", version)))
}

#[async_trait]
impl AgentRepository for PostgresAgentRepository {
    async fn load(&self, id: AgentId) -> Result<AgentState, RepositoryError> {
        let row = sqlx::query("SELECT state_json, version FROM agents WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepositoryError::NotFound(id))?;

        let state_json: serde_json::Value = row.try_get("state_json")?;
        let version = from_db_version(row.try_get("version")?)?;

        let mut state: AgentState = serde_json::from_value(state_json)?;
        // The column is authoritative
        state.version = version;
        Ok(state)
    }

    async fn save(&self, state: &AgentState, expected_version: u64) -> Result<u64, RepositoryError> {
        let new_version = expected_version + 1;

        let mut stored = state.clone();
        stored.version = new_version;
        let state_json = serde_json::to_value(&stored)?;

        let result = if expected_version == 0 {
            sqlx::query(
                r#"
                INSERT INTO agents (
                    id, owner_user_id, agent_type, status, state_json,
                    version, schema_version, created_at, updated_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                ON CONFLICT (id) DO NOTHING
                "#,
            )
            .bind(state.id.0)
            .bind(state.owner_user_id.as_str())
            .bind(state.agent_type.as_str())
            .bind(state.status.as_str())
            .bind(&state_json)
            .bind(to_db_version(new_version)?)
            .bind(state.schema_version as i32)
            .bind(state.created_at)
            .bind(state.updated_at)
            .execute(&self.pool)
            .await?
        } else {
            sqlx::query(
                r#"
                UPDATE agents SET
                    status = $2,
                    state_json = $3,
                    version = $4,
                    schema_version = $5,
                    updated_at = $6
                WHERE id = $1 AND version = $7
                "#,
            )
            .bind(state.id.0)
            .bind(state.status.as_str())
            .bind(&state_json)
            .bind(to_db_version(new_version)?)
            .bind(state.schema_version as i32)
            .bind(state.updated_at)
            .bind(to_db_version(expected_version)?)
            .execute(&self.pool)
            .await?
        };

        if result.rows_affected() == 0 {
            let actual = self.current_version(state.id).await?;
            return Err(RepositoryError::VersionConflict {
                agent_id: state.id,
                expected: expected_version,
                actual,
            });
        }

        debug!(agent_id = %state.id, version = new_version, "Stored agent state");
        Ok(new_version)
    }
}
