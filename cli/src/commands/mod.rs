// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the agent host CLI

pub mod config;
pub mod scenario;

pub use self::config::ConfigCommand;
pub use self::scenario::ScenarioArgs;
