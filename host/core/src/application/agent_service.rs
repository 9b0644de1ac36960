// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # AgentService: load, command, save, publish
//!
//! Application service wrapping the [`Agent`] aggregate with persistence and
//! event publication. Every command runs the same cycle:
//!
//! ```text
//! load(id) ──▶ Agent::from_state ──▶ command ──▶ save(state, loaded_version)
//!                    ▲                                   │
//!                    └────── VersionConflict (retry) ────┤
//!                                                        ▼ Ok(new_version)
//!                                               publish(events, in order)
//! ```
//!
//! Conflicts are retried from a fresh load up to `max_save_retries` attempts;
//! the command closure is re-run against the newer state each time, so its
//! preconditions are re-checked. Domain errors are never retried.
//!
//! Events are published only after a successful save. Publisher failures are
//! logged and do not fail the command: the stored state is the source of truth.

use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::application::repository_factory::create_agent_repository;
use crate::domain::agent::{Agent, AgentError, AgentErrorKind};
use crate::domain::events::AgentEvent;
use crate::domain::execution_state::ExecutionState;
use crate::domain::host_config::AgentHostConfig;
use crate::domain::identity::{AgentId, AgentType, AssignmentRole, ConversationId, UserId};
use crate::domain::repository::{AgentEventPublisher, AgentRepository, RepositoryError};
use crate::domain::session::{ClientAction, ClientResponse, Session, SessionId};
use crate::domain::state::{AgentState, DEFAULT_MAX_HISTORY_SIZE};

pub const DEFAULT_MAX_SAVE_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum AgentServiceError {
    #[error(transparent)]
    Domain(#[from] AgentError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl AgentServiceError {
    pub fn as_domain(&self) -> Option<&AgentError> {
        match self {
            AgentServiceError::Domain(e) => Some(e),
            AgentServiceError::Repository(_) | AgentServiceError::Configuration(_) => None,
        }
    }

    pub fn is_version_conflict(&self) -> bool {
        matches!(self, AgentServiceError::Repository(e) if e.is_version_conflict())
    }

    fn outcome_label(&self) -> &'static str {
        match self {
            AgentServiceError::Domain(e) => match e.kind() {
                AgentErrorKind::Precondition => "rejected",
                AgentErrorKind::CorrelationMismatch => "mismatch",
            },
            AgentServiceError::Repository(e) if e.is_version_conflict() => "conflict",
            AgentServiceError::Repository(_) | AgentServiceError::Configuration(_) => "error",
        }
    }
}

/// Result of a stored command.
#[derive(Debug, Clone)]
pub struct CommandOutcome<T> {
    pub output: T,
    /// State as stored, `version` set to the new version
    pub state: AgentState,
    /// Events produced by the command, in application order
    pub events: Vec<AgentEvent>,
}

pub struct AgentService {
    repository: Arc<dyn AgentRepository>,
    publishers: Vec<Arc<dyn AgentEventPublisher>>,
    max_save_retries: u32,
    max_history_size: usize,
}

impl AgentService {
    pub fn new(repository: Arc<dyn AgentRepository>) -> Self {
        Self {
            repository,
            publishers: Vec::new(),
            max_save_retries: DEFAULT_MAX_SAVE_RETRIES,
            max_history_size: DEFAULT_MAX_HISTORY_SIZE,
        }
    }

    /// Build from configuration: repository from `spec.storage`, retry budget
    /// and history size from `spec.concurrency` and `spec.agents`. The
    /// configuration is validated first.
    pub async fn from_config(config: &AgentHostConfig) -> Result<Self, AgentServiceError> {
        config
            .validate()
            .map_err(|e| AgentServiceError::Configuration(e.to_string()))?;
        let repository = create_agent_repository(&config.storage_backend()).await?;
        Ok(Self::new(repository)
            .with_max_save_retries(config.spec.concurrency.max_save_retries)
            .with_max_history_size(config.spec.agents.max_history_size))
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn AgentEventPublisher>) -> Self {
        self.publishers.push(publisher);
        self
    }

    /// Total attempts per command; values below 1 are treated as 1.
    pub fn with_max_save_retries(mut self, retries: u32) -> Self {
        self.max_save_retries = retries.max(1);
        self
    }

    /// History cap given to agents created by this service.
    pub fn with_max_history_size(mut self, size: usize) -> Self {
        self.max_history_size = size;
        self
    }

    pub fn repository(&self) -> &Arc<dyn AgentRepository> {
        &self.repository
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    pub async fn create_agent(
        &self,
        owner_user_id: UserId,
        agent_type: AgentType,
        name: Option<String>,
    ) -> Result<CommandOutcome<AgentId>, AgentServiceError> {
        let agent = Agent::create(owner_user_id, agent_type, name, self.max_history_size);
        let outcome = self.insert(agent).await;
        record_outcome("create", &outcome);
        let outcome = outcome?;
        info!(agent_id = %outcome.output, agent_type = %agent_type, "Created agent");
        Ok(outcome)
    }

    pub async fn get_agent(&self, agent_id: AgentId) -> Result<Agent, AgentServiceError> {
        let state = self.repository.load(agent_id).await?;
        Ok(Agent::from_state(state))
    }

    /// Archive `agent_id` and create its replacement under a fresh identifier.
    ///
    /// The replacement keeps the owner, type, name, preferences and every
    /// non-owner assignment. Fails with `SessionInProgress` while the old
    /// agent has an active session.
    pub async fn reset_agent(
        &self,
        agent_id: AgentId,
        reason: impl Into<String>,
    ) -> Result<CommandOutcome<AgentId>, AgentServiceError> {
        let reason = reason.into();
        let archived = self
            .execute(agent_id, "archive", |agent| agent.archive(reason.clone()))
            .await?;
        let old = archived.state;

        let mut replacement = Agent::create(
            old.owner_user_id.clone(),
            old.agent_type,
            old.name.clone(),
            old.max_history_size,
        );
        if !old.preferences.is_empty() {
            replacement.update_preferences(old.preferences.clone())?;
        }
        for assignment in old.assignments.iter().filter(|a| a.user_id != old.owner_user_id) {
            replacement.assign_user(assignment.user_id.clone(), assignment.role, old.owner_user_id.clone())?;
        }

        let outcome = self.insert(replacement).await;
        record_outcome("reset", &outcome);
        let outcome = outcome?;
        info!(
            old_agent_id = %agent_id,
            new_agent_id = %outcome.output,
            reason = %reason,
            "Reset agent"
        );
        Ok(outcome)
    }

    // ========================================================================
    // Commands
    // ========================================================================

    pub async fn update_preferences(
        &self,
        agent_id: AgentId,
        preferences: HashMap<String, serde_json::Value>,
    ) -> Result<CommandOutcome<()>, AgentServiceError> {
        self.execute(agent_id, "update_preferences", |agent| {
            agent.update_preferences(preferences.clone())
        })
        .await
    }

    pub async fn start_session(
        &self,
        agent_id: AgentId,
        conversation_id: ConversationId,
        session_type: impl Into<String>,
        session_id: Option<SessionId>,
    ) -> Result<CommandOutcome<Session>, AgentServiceError> {
        let session_type = session_type.into();
        // Pin the id so a retry starts the same session
        let session_id = session_id.unwrap_or_default();
        self.execute(agent_id, "start_session", |agent| {
            agent.start_session(conversation_id.clone(), session_type.clone(), Some(session_id))
        })
        .await
    }

    pub async fn suspend_execution(
        &self,
        agent_id: AgentId,
        execution_state: ExecutionState,
        pending_action: ClientAction,
    ) -> Result<CommandOutcome<()>, AgentServiceError> {
        self.execute(agent_id, "suspend_execution", |agent| {
            agent.suspend_execution(execution_state.clone(), pending_action.clone())
        })
        .await
    }

    pub async fn resume_execution(
        &self,
        agent_id: AgentId,
        response: ClientResponse,
    ) -> Result<CommandOutcome<ExecutionState>, AgentServiceError> {
        self.execute(agent_id, "resume_execution", |agent| {
            agent.resume_execution(response.clone())
        })
        .await
    }

    pub async fn request_client_action(
        &self,
        agent_id: AgentId,
        action: ClientAction,
    ) -> Result<CommandOutcome<()>, AgentServiceError> {
        self.execute(agent_id, "request_client_action", |agent| {
            agent.request_client_action(action.clone())
        })
        .await
    }

    pub async fn receive_client_response(
        &self,
        agent_id: AgentId,
        response: ClientResponse,
        item_data: Option<serde_json::Value>,
    ) -> Result<CommandOutcome<()>, AgentServiceError> {
        self.execute(agent_id, "receive_client_response", |agent| {
            agent.receive_client_response(response.clone(), item_data.clone())
        })
        .await
    }

    pub async fn update_ui_state(
        &self,
        agent_id: AgentId,
        ui_state: serde_json::Value,
    ) -> Result<CommandOutcome<()>, AgentServiceError> {
        self.execute(agent_id, "update_ui_state", |agent| {
            agent.update_ui_state(ui_state.clone())
        })
        .await
    }

    pub async fn complete_session(
        &self,
        agent_id: AgentId,
        summary: Option<String>,
    ) -> Result<CommandOutcome<()>, AgentServiceError> {
        self.execute(agent_id, "complete_session", |agent| {
            agent.complete_session(summary.clone())
        })
        .await
    }

    pub async fn terminate_session(
        &self,
        agent_id: AgentId,
        reason: impl Into<String>,
    ) -> Result<CommandOutcome<()>, AgentServiceError> {
        let reason = reason.into();
        self.execute(agent_id, "terminate_session", |agent| {
            agent.terminate_session(reason.clone())
        })
        .await
    }

    pub async fn archive_agent(
        &self,
        agent_id: AgentId,
        reason: impl Into<String>,
    ) -> Result<CommandOutcome<()>, AgentServiceError> {
        let reason = reason.into();
        self.execute(agent_id, "archive", |agent| agent.archive(reason.clone()))
            .await
    }

    pub async fn assign_user(
        &self,
        agent_id: AgentId,
        user_id: UserId,
        role: AssignmentRole,
        assigned_by: UserId,
    ) -> Result<CommandOutcome<()>, AgentServiceError> {
        self.execute(agent_id, "assign_user", |agent| {
            agent.assign_user(user_id.clone(), role, assigned_by.clone())
        })
        .await
    }

    pub async fn unassign_user(
        &self,
        agent_id: AgentId,
        user_id: UserId,
        unassigned_by: UserId,
    ) -> Result<CommandOutcome<()>, AgentServiceError> {
        self.execute(agent_id, "unassign_user", |agent| {
            agent.unassign_user(user_id.clone(), unassigned_by.clone())
        })
        .await
    }

    /// Run `command` against the latest stored state and store the result.
    ///
    /// `command` may run more than once; it must not have side effects
    /// outside the aggregate.
    pub async fn execute<T, F>(
        &self,
        agent_id: AgentId,
        command_name: &'static str,
        command: F,
    ) -> Result<CommandOutcome<T>, AgentServiceError>
    where
        T: Send,
        F: FnMut(&mut Agent) -> Result<T, AgentError> + Send,
    {
        let outcome = self.run_with_retries(agent_id, command_name, command).await;
        record_outcome(command_name, &outcome);
        match &outcome {
            Ok(o) => debug!(agent_id = %agent_id, command = command_name, version = o.state.version, "Command stored"),
            Err(e) => debug!(agent_id = %agent_id, command = command_name, error = %e, "Command failed"),
        }
        outcome
    }

    async fn run_with_retries<T, F>(
        &self,
        agent_id: AgentId,
        command_name: &'static str,
        mut command: F,
    ) -> Result<CommandOutcome<T>, AgentServiceError>
    where
        T: Send,
        F: FnMut(&mut Agent) -> Result<T, AgentError> + Send,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;

            let state = self.repository.load(agent_id).await?;
            let expected_version = state.version;
            let mut agent = Agent::from_state(state);

            let output = command(&mut agent)?;
            let events = agent.take_events();
            let mut state = agent.into_state();

            match self.repository.save(&state, expected_version).await {
                Ok(new_version) => {
                    state.version = new_version;
                    self.publish_all(&events).await;
                    return Ok(CommandOutcome { output, state, events });
                }
                Err(e) if e.is_version_conflict() => {
                    metrics::counter!("agent_version_conflicts_total", "command" => command_name).increment(1);
                    if attempt >= self.max_save_retries {
                        warn!(
                            agent_id = %agent_id,
                            command = command_name,
                            attempts = attempt,
                            "Giving up after repeated version conflicts"
                        );
                        return Err(e.into());
                    }
                    debug!(
                        agent_id = %agent_id,
                        command = command_name,
                        attempt,
                        "Version conflict, retrying from a fresh load"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn insert(&self, agent: Agent) -> Result<CommandOutcome<AgentId>, AgentServiceError> {
        let agent_id = agent.id();
        let mut agent = agent;
        let events = agent.take_events();
        let mut state = agent.into_state();

        state.version = self.repository.save(&state, 0).await?;
        self.publish_all(&events).await;
        Ok(CommandOutcome {
            output: agent_id,
            state,
            events,
        })
    }

    async fn publish_all(&self, events: &[AgentEvent]) {
        for event in events {
            for publisher in &self.publishers {
                if let Err(e) = publisher.publish(event.clone()).await {
                    warn!(
                        agent_id = %event.agent_id(),
                        event_type = event.event_type(),
                        error = %e,
                        "Failed to publish agent event"
                    );
                }
            }
        }
    }
}

fn record_outcome<T>(command: &'static str, outcome: &Result<T, AgentServiceError>) {
    let label = match outcome {
        Ok(_) => "ok",
        Err(e) => e.outcome_label(),
    };
    metrics::counter!("agent_commands_total", "command" => command, "outcome" => label).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::repositories::InMemoryAgentRepository;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    struct MockEventBus {
        events: Arc<Mutex<Vec<AgentEvent>>>,
    }

    impl MockEventBus {
        fn new() -> Self {
            Self {
                events: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn event_types(&self) -> Vec<&'static str> {
            self.events.lock().unwrap().iter().map(|e| e.event_type()).collect()
        }
    }

    #[async_trait]
    impl AgentEventPublisher for MockEventBus {
        async fn publish(&self, event: AgentEvent) -> anyhow::Result<()> {
            self.events.lock().unwrap().push(event);
            Ok(())
        }
    }

    struct FailingPublisher;

    #[async_trait]
    impl AgentEventPublisher for FailingPublisher {
        async fn publish(&self, _event: AgentEvent) -> anyhow::Result<()> {
            anyhow::bail!("broker unavailable")
        }
    }

    /// Bumps the stored version behind the service's back the first
    /// `conflicts` times `save` is called.
    struct ContendedRepository {
        inner: InMemoryAgentRepository,
        conflicts: AtomicU32,
    }

    #[async_trait]
    impl AgentRepository for ContendedRepository {
        async fn load(&self, id: AgentId) -> Result<AgentState, RepositoryError> {
            self.inner.load(id).await
        }

        async fn save(&self, state: &AgentState, expected_version: u64) -> Result<u64, RepositoryError> {
            if expected_version > 0 && self.conflicts.load(Ordering::SeqCst) > 0 {
                self.conflicts.fetch_sub(1, Ordering::SeqCst);
                let current = self.inner.load(state.id).await?;
                self.inner.save(&current, current.version).await?;
            }
            self.inner.save(state, expected_version).await
        }
    }

    fn service_with_bus() -> (AgentService, Arc<MockEventBus>) {
        let bus = Arc::new(MockEventBus::new());
        let service = AgentService::new(Arc::new(InMemoryAgentRepository::new())).with_publisher(bus.clone());
        (service, bus)
    }

    #[tokio::test]
    async fn test_create_stores_and_publishes() {
        let (service, bus) = service_with_bus();

        let created = service
            .create_agent(UserId::from("u1"), AgentType::Tutor, None)
            .await
            .unwrap();
        assert_eq!(created.state.version, 1);
        assert_eq!(bus.event_types(), vec!["agent.created"]);

        let agent = service.get_agent(created.output).await.unwrap();
        assert_eq!(agent.version(), 1);
        assert_eq!(agent.state().max_history_size, DEFAULT_MAX_HISTORY_SIZE);
    }

    #[tokio::test]
    async fn test_rejected_command_stores_nothing() {
        let (service, bus) = service_with_bus();
        let id = service
            .create_agent(UserId::from("u1"), AgentType::Tutor, None)
            .await
            .unwrap()
            .output;

        let err = service.complete_session(id, None).await.unwrap_err();
        assert_eq!(err.as_domain(), Some(&AgentError::NoActiveSession(id)));
        assert_eq!(service.get_agent(id).await.unwrap().version(), 1);
        assert_eq!(bus.event_types().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_agent() {
        let (service, _) = service_with_bus();
        let err = service.archive_agent(AgentId::new(), "x").await.unwrap_err();
        assert!(matches!(err, AgentServiceError::Repository(RepositoryError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_conflict_is_retried() {
        let inner = InMemoryAgentRepository::new();
        let repository = Arc::new(ContendedRepository {
            inner: inner.clone(),
            conflicts: AtomicU32::new(2),
        });
        let service = AgentService::new(repository).with_max_save_retries(3);

        let id = service
            .create_agent(UserId::from("u1"), AgentType::Coach, None)
            .await
            .unwrap()
            .output;
        let outcome = service
            .start_session(id, ConversationId::from("c1"), "coaching", None)
            .await
            .unwrap();

        // create=1, two foreign writes, then ours
        assert_eq!(outcome.state.version, 4);
        assert!(outcome.state.active_session.is_some());
        assert_eq!(outcome.events.len(), 1);
    }

    #[tokio::test]
    async fn test_conflict_surfaces_when_retries_exhausted() {
        let repository = Arc::new(ContendedRepository {
            inner: InMemoryAgentRepository::new(),
            conflicts: AtomicU32::new(5),
        });
        let service = AgentService::new(repository).with_max_save_retries(2);

        let id = service
            .create_agent(UserId::from("u1"), AgentType::Coach, None)
            .await
            .unwrap()
            .output;
        let err = service
            .update_preferences(id, HashMap::from([("tone".to_string(), json!("calm"))]))
            .await
            .unwrap_err();
        assert!(err.is_version_conflict());
    }

    #[tokio::test]
    async fn test_publisher_failure_does_not_fail_command() {
        let service = AgentService::new(Arc::new(InMemoryAgentRepository::new()))
            .with_publisher(Arc::new(FailingPublisher));

        let created = service
            .create_agent(UserId::from("u1"), AgentType::Wellness, None)
            .await
            .unwrap();
        assert_eq!(created.state.version, 1);
    }

    #[tokio::test]
    async fn test_reset_carries_preferences_and_assignments() {
        let (service, _) = service_with_bus();
        let old = service
            .create_agent(UserId::from("u1"), AgentType::Tutor, Some("Ada".into()))
            .await
            .unwrap()
            .output;
        service
            .update_preferences(old, HashMap::from([("tone".to_string(), json!("warm"))]))
            .await
            .unwrap();
        service
            .assign_user(old, UserId::from("u2"), AssignmentRole::Mentee, UserId::from("u1"))
            .await
            .unwrap();

        let reset = service.reset_agent(old, "fresh start").await.unwrap();
        assert_ne!(reset.output, old);

        let new_state = reset.state;
        assert_eq!(new_state.name.as_deref(), Some("Ada"));
        assert_eq!(new_state.preferences["tone"], json!("warm"));
        assert_eq!(new_state.assignments.len(), 2);
        assert_eq!(new_state.total_sessions, 0);

        let old_agent = service.get_agent(old).await.unwrap();
        assert!(old_agent.is_archived());
        assert_eq!(old_agent.state().archive_reason.as_deref(), Some("fresh start"));
    }

    #[tokio::test]
    async fn test_reset_refused_during_session() {
        let (service, _) = service_with_bus();
        let id = service
            .create_agent(UserId::from("u1"), AgentType::Tutor, None)
            .await
            .unwrap()
            .output;
        service
            .start_session(id, ConversationId::from("c1"), "learning", None)
            .await
            .unwrap();

        let err = service.reset_agent(id, "reset").await.unwrap_err();
        assert_eq!(err.as_domain(), Some(&AgentError::SessionInProgress(id)));
    }

    #[tokio::test]
    async fn test_from_config_rejects_invalid_config() {
        let mut config = AgentHostConfig::default();
        config.spec.agents.max_history_size = 0;

        let err = AgentService::from_config(&config).await.err().unwrap();
        assert!(matches!(err, AgentServiceError::Configuration(_)));
        assert!(err.to_string().contains("max_history_size"));
    }
}
