// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Agent Domain Layer
//!
//! Pure domain types. No I/O dependencies beyond the port traits.
//!
//! | Module | Key Types |
//! |--------|-----------|
//! | [`identity`] | `AgentId`, `UserId`, `AgentType`, `AgentAssignment` |
//! | [`session`] | `Session`, `SessionStatus`, `ClientAction`, `ClientResponse` |
//! | [`execution_state`] | `ExecutionState`, `PendingToolCall`, `MessageSnapshot` |
//! | [`events`] | `AgentEvent` |
//! | [`state`] | `AgentState` (persisted container, event application) |
//! | [`agent`] | `Agent` aggregate command surface, `AgentError` |
//! | [`repository`] | `AgentRepository` and `AgentEventPublisher` ports, `RepositoryError` |
//! | [`directory`] | `AgentDirectory` read-model port |
//! | [`host_config`] | `AgentHostConfig` manifest |

pub mod identity;
pub mod session;
pub mod execution_state;
pub mod events;
pub mod state;
pub mod agent;
pub mod repository;
pub mod directory;
pub mod host_config;

pub use identity::*;
pub use session::*;
pub use execution_state::*;
pub use events::*;
pub use state::*;
pub use agent::*;
