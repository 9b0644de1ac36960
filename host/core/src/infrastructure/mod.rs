// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Infrastructure Layer
//!
//! Adapters for the domain ports.
//!
//! | Module | Adapter |
//! |--------|---------|
//! | [`repositories`] | `InMemoryAgentRepository`, `PostgresAgentRepository` |
//! | [`event_bus`] | `EventBus` (tokio broadcast) |
//! | [`directory`] | `InMemoryAgentDirectory` projection |

pub mod directory;
pub mod event_bus;
pub mod repositories;

pub use directory::InMemoryAgentDirectory;
pub use event_bus::{EventBus, EventBusError};
pub use repositories::{InMemoryAgentRepository, PostgresAgentRepository};
