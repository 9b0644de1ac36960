// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use agent_host_core::application::agent_service::AgentService;
use agent_host_core::domain::host_config::{AgentHostConfig, StorageBackendKind};
use agent_host_core::domain::identity::{AgentType, ConversationId, UserId};
use std::io::Write;
use tempfile::NamedTempFile;

const CONFIG: &str = r#"
apiVersion: agent-host/v1
kind: AgentHostConfig
metadata:
  name: test-host
  labels:
    environment: test
spec:
  agents:
    max_history_size: 2
  storage:
    backend: in_memory
  concurrency:
    max_save_retries: 5
  event_bus:
    capacity: 64
  observability:
    logging:
      level: debug
      format: json
"#;

#[test]
fn test_load_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(CONFIG.as_bytes()).unwrap();

    let config = AgentHostConfig::from_yaml_file(file.path()).unwrap();
    assert_eq!(config.metadata.name, "test-host");
    assert_eq!(config.spec.storage.backend, StorageBackendKind::InMemory);
    assert_eq!(config.spec.concurrency.max_save_retries, 5);
    assert_eq!(config.spec.observability.logging.format, "json");
    assert!(config.validate().is_ok());
}

#[test]
fn test_explicit_path_must_exist() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.yaml");
    assert!(AgentHostConfig::load_or_default(Some(missing)).is_err());
}

#[test]
fn test_yaml_file_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("agent-host-config.yaml");

    let mut config = AgentHostConfig::default();
    config.metadata.name = "written".to_string();
    config.spec.agents.max_history_size = 9;
    config.to_yaml_file(&path).unwrap();

    let loaded = AgentHostConfig::from_yaml_file(&path).unwrap();
    assert_eq!(loaded, config);
}

#[tokio::test]
async fn test_service_honours_configured_history_size() {
    let config = AgentHostConfig::from_yaml_str(CONFIG).unwrap();
    let service = AgentService::from_config(&config).await.unwrap();

    let agent_id = service
        .create_agent(UserId::from("u1"), AgentType::Thought, None)
        .await
        .unwrap()
        .output;
    for i in 0..3 {
        service
            .start_session(agent_id, ConversationId::new(format!("c{i}")), "reflection", None)
            .await
            .unwrap();
        service.complete_session(agent_id, None).await.unwrap();
    }

    let agent = service.get_agent(agent_id).await.unwrap();
    assert_eq!(agent.state().max_history_size, 2);
    assert_eq!(agent.state().session_history.len(), 2);
    assert_eq!(agent.state().total_sessions, 3);
}
