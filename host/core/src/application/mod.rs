// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Application Layer
//!
//! Use cases over the Agent aggregate: [`agent_service::AgentService`] runs
//! commands through load, save and publish; [`repository_factory`] picks the
//! storage adapter from configuration.

pub mod agent_service;
pub mod repository_factory;

pub use agent_service::{AgentService, AgentServiceError, CommandOutcome};
