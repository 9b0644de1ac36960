// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Agent host CLI library - exposes the command implementations for testing

pub mod commands;
