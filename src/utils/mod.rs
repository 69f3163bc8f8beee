// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod logging;
pub mod time;

pub use time::{human_time, now_ms, pluralize, shorten_string};
