// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod network;
pub mod settings;

pub use network::{NetworkConfig, DEFAULT_CANARY_RPC};
pub use settings::{load_dotenv, EnvVar, Settings};
