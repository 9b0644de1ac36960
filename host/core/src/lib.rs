// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # `agent-host-core`: Stateful Agent Aggregate
//!
//! Owns user-bound agent instances whose conversational execution survives
//! process restarts. An execution loop that needs a client-side action is
//! checkpointed into the agent's persisted state and resumed later, by any
//! process, once the matching client response arrives.
//!
//! ## Crate Layout
//!
//! | Module | Layer | Contents |
//! |--------|-------|----------|
//! | [`domain`] | Domain | `Agent` aggregate, `AgentState`, `Session`, `ExecutionState`, `AgentEvent`, ports |
//! | [`application`] | Application | `AgentService` unit of work, repository factory |
//! | [`infrastructure`] | Infrastructure | In-memory and PostgreSQL repositories, event bus, agent directory |

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
