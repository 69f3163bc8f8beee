// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Decides when environment variables are sent to the processors.
//!
//! Variables go out once, either when every replica acknowledged the job or
//! shortly before the job starts, whichever happens first. The trigger only
//! tracks state; the caller owns the clock and the timer.

use std::time::Duration;
use tracing::debug;

/// How long before the start time variables are sent at the latest
pub const ENV_VARS_LEAD_TIME: Duration = Duration::from_secs(2 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerAction {
    None,
    FireNow,
    /// Start a timer that calls [`EnvVarTrigger::on_deadline`] at `at_ms`
    Arm { at_ms: u64 },
}

#[derive(Debug, Clone)]
pub struct EnvVarTrigger {
    replicas: u8,
    start_time_ms: u64,
    armed_at: Option<u64>,
    fired: bool,
}

impl EnvVarTrigger {
    pub fn new(replicas: u8, start_time_ms: u64) -> Self {
        Self {
            replicas,
            start_time_ms,
            armed_at: None,
            fired: false,
        }
    }

    pub fn deadline_ms(&self) -> u64 {
        self.start_time_ms
            .saturating_sub(ENV_VARS_LEAD_TIME.as_millis() as u64)
    }

    pub fn fired(&self) -> bool {
        self.fired
    }

    pub fn armed_at(&self) -> Option<u64> {
        self.armed_at
    }

    fn fire(&mut self) -> TriggerAction {
        self.fired = true;
        self.armed_at = None;
        TriggerAction::FireNow
    }

    /// `count` is the cumulative number of acknowledgements
    pub fn on_acknowledged(&mut self, count: u8, now_ms: u64) -> TriggerAction {
        if self.fired {
            debug!("Environment variables already set, ignoring acknowledgement {}", count);
            return TriggerAction::None;
        }
        if count >= self.replicas {
            debug!("All {} replicas acknowledged", self.replicas);
            return self.fire();
        }
        if now_ms >= self.deadline_ms() {
            debug!("Start is less than two minutes away");
            return self.fire();
        }
        if self.armed_at.is_some() {
            return TriggerAction::None;
        }
        let at_ms = self.deadline_ms();
        debug!("Environment variables scheduled in {}ms", at_ms - now_ms);
        self.armed_at = Some(at_ms);
        TriggerAction::Arm { at_ms }
    }

    /// Timer elapsed; `true` if the caller should send the variables now
    pub fn on_deadline(&mut self) -> bool {
        if self.fired || self.armed_at.is_none() {
            return false;
        }
        self.fire();
        true
    }
}
