// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Commands that are reserved but not available yet.

use anyhow::Result;

pub const NOT_IMPLEMENTED: &str = "Not implemented yet!";

fn not_implemented(command: &str) -> Result<()> {
    tracing::debug!("{} called", command);
    println!("{}", NOT_IMPLEMENTED);
    Ok(())
}

pub fn login() -> Result<()> {
    not_implemented("login")
}

pub fn logout() -> Result<()> {
    not_implemented("logout")
}

pub fn run() -> Result<()> {
    not_implemented("run")
}

pub fn test() -> Result<()> {
    not_implemented("test")
}

pub fn jobs(job_id: &str) -> Result<()> {
    not_implemented(&format!("jobs {}", job_id))
}

/// Live coding needs the processor relay, which the CLI does not speak yet
pub fn live() -> Result<()> {
    not_implemented("live")
}
