// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Chain values in the form the rest of the CLI works with.
//!
//! These mirror the marketplace storage items but carry SS58 addresses and
//! plain integers instead of raw codec types, so they serialize cleanly into
//! deployment records and JSON output.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::project::registration::Schedule;

/// Origin of a job registration. Acurast origins hold an SS58 address,
/// foreign origins the hex encoded address bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MultiOrigin {
    Acurast(String),
    Tezos(String),
    Ethereum(String),
    AlephZero(String),
    Vara(String),
    Ethereum20(String),
    Solana(String),
}

impl MultiOrigin {
    pub fn address(&self) -> &str {
        match self {
            MultiOrigin::Acurast(a)
            | MultiOrigin::Tezos(a)
            | MultiOrigin::Ethereum(a)
            | MultiOrigin::AlephZero(a)
            | MultiOrigin::Vara(a)
            | MultiOrigin::Ethereum20(a)
            | MultiOrigin::Solana(a) => a,
        }
    }
}

/// `[origin, number]`, serialized as `[{"acurast": "5..."}, 42]`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub MultiOrigin, pub u128);

impl JobId {
    pub fn acurast(owner: &str, number: u128) -> Self {
        JobId(MultiOrigin::Acurast(owner.to_string()), number)
    }

    pub fn number(&self) -> u128 {
        self.1
    }

    pub fn origin(&self) -> &MultiOrigin {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.1)
    }
}

/// Marketplace status of a registered job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Open,
    Matched,
    /// Number of processors that acknowledged the assignment
    Assigned(u8),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PubKey {
    SECP256r1(String),
    SECP256k1(String),
    ED25519(String),
    SECP256r1Encryption(String),
    SECP256k1Encryption(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionSpecifier {
    All,
    Index(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Sla {
    pub total: u64,
    pub met: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobAssignment {
    pub slot: u8,
    pub start_delay: u64,
    pub fee_per_execution: u128,
    pub acknowledged: bool,
    pub sla: Sla,
    /// Hex encoded keys, `0x` prefixed as read from chain
    pub pub_keys: Vec<PubKey>,
    pub execution: ExecutionSpecifier,
}

/// Assignment of one processor to a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobAssignmentInfo {
    pub id: JobId,
    pub processor: String,
    pub assignment: JobAssignment,
}

/// Registration as stored on chain, reduced to what listings show
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredJob {
    pub id: JobId,
    pub script: String,
    pub schedule: Schedule,
    pub slots: u8,
    pub reward: u128,
}

/// Encrypted variables addressed to one processor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessorEnvironment {
    pub processor: String,
    /// Compressed public key of the encrypting side
    pub public_key: Vec<u8>,
    /// `(name, iv || ciphertext || tag)` pairs
    pub variables: Vec<(Vec<u8>, Vec<u8>)>,
}
