// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use agent_host_core::application::agent_service::AgentService;
use agent_host_core::domain::directory::AgentDirectory;
use agent_host_core::domain::identity::{AgentStatus, AgentType, AssignmentRole, ConversationId, UserId};
use agent_host_core::infrastructure::directory::InMemoryAgentDirectory;
use agent_host_core::infrastructure::event_bus::EventBus;
use agent_host_core::infrastructure::repositories::InMemoryAgentRepository;
use std::sync::Arc;

fn service_with_directory() -> (AgentService, InMemoryAgentDirectory) {
    let directory = InMemoryAgentDirectory::new();
    let service =
        AgentService::new(Arc::new(InMemoryAgentRepository::new())).with_publisher(Arc::new(directory.clone()));
    (service, directory)
}

#[tokio::test]
async fn test_archive_and_recreate_yields_fresh_identity() {
    let (service, directory) = service_with_directory();
    let owner = UserId::from("u1");

    let old_id = service
        .create_agent(owner.clone(), AgentType::Tutor, None)
        .await
        .unwrap()
        .output;
    service
        .start_session(old_id, ConversationId::from("c1"), "learning", None)
        .await
        .unwrap();
    service.terminate_session(old_id, "user ended").await.unwrap();

    let new_id = service.reset_agent(old_id, "reset").await.unwrap().output;
    assert_ne!(new_id, old_id);

    let active = directory
        .find_active_by_owner_and_type(&owner, AgentType::Tutor)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(active.agent_id, new_id);

    let listed: Vec<_> = directory.list_active().await.unwrap().into_iter().map(|s| s.agent_id).collect();
    assert_eq!(listed, vec![new_id]);

    // The archived agent stays loadable for audit
    let old = service.get_agent(old_id).await.unwrap();
    assert_eq!(old.state().status, AgentStatus::Archived);
    assert_eq!(old.state().session_history.len(), 1);

    let owned = directory.find_by_user(&owner).await.unwrap();
    assert_eq!(owned.len(), 2);
    assert!(owned.iter().any(|s| s.agent_id == old_id && !s.is_active()));
}

#[tokio::test]
async fn test_shared_agent_visible_to_assignees() {
    let (service, directory) = service_with_directory();
    let agent_id = service
        .create_agent(UserId::from("mentor"), AgentType::Coach, None)
        .await
        .unwrap()
        .output;
    service
        .assign_user(agent_id, UserId::from("mentee"), AssignmentRole::Mentee, UserId::from("mentor"))
        .await
        .unwrap();

    let shared = directory.find_by_user(&UserId::from("mentee")).await.unwrap();
    assert_eq!(shared.len(), 1);
    assert!(shared[0]
        .assigned_users
        .contains(&(UserId::from("mentee"), AssignmentRole::Mentee)));

    let agent = service.get_agent(agent_id).await.unwrap();
    assert!(agent.can_interact(&UserId::from("mentee")));
}

#[tokio::test]
async fn test_directory_fed_from_event_bus() {
    let bus = EventBus::new(64);
    let directory = InMemoryAgentDirectory::new();
    let mut receiver = bus.subscribe();
    let service = AgentService::new(Arc::new(InMemoryAgentRepository::new())).with_publisher(Arc::new(bus.clone()));

    let agent_id = service
        .create_agent(UserId::from("u9"), AgentType::Connector, Some("Hub".to_string()))
        .await
        .unwrap()
        .output;
    service
        .start_session(agent_id, ConversationId::from("c1"), "networking", None)
        .await
        .unwrap();

    for _ in 0..2 {
        let event = receiver.recv().await.unwrap();
        directory.project(&event).unwrap();
    }

    let summary = directory
        .find_active_by_owner_and_type(&UserId::from("u9"), AgentType::Connector)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(summary.name.as_deref(), Some("Hub"));
    assert!(summary.has_active_session);
}
