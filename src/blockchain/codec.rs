// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Typed SCALE representations of the Acurast pallet types.
//!
//! Values are encoded against the runtime metadata by field and variant name,
//! so these structs only need to agree with the chain on names and shapes.

use std::str::FromStr;
use subxt::events::StaticEvent;
use subxt::ext::scale_decode::DecodeAsType;
use subxt::ext::scale_encode::EncodeAsType;
use subxt::utils::AccountId32;

use super::error::ChainError;
use super::types::{
    ExecutionSpecifier, JobAssignment, JobId, JobStatus, MultiOrigin, ProcessorEnvironment,
    PubKey, RegisteredJob, Sla,
};
use crate::project::registration::{
    AssignmentStrategy, JobRegistration, JobRequirements, Schedule,
};
use crate::project::types::{MultiOriginKind, RequiredModule, ReuseKeysFrom, Runtime, ScriptMutability};

pub const ACURAST_PALLET: &str = "Acurast";
pub const MARKETPLACE_PALLET: &str = "AcurastMarketplace";

pub fn parse_account(address: &str) -> Result<AccountId32, ChainError> {
    AccountId32::from_str(address).map_err(|_| ChainError::InvalidAddress(address.to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq, EncodeAsType, DecodeAsType)]
#[encode_as_type(crate_path = "subxt::ext::scale_encode")]
#[decode_as_type(crate_path = "subxt::ext::scale_decode")]
pub enum ChainMultiOrigin {
    Acurast(AccountId32),
    Tezos(Vec<u8>),
    Ethereum(Vec<u8>),
    AlephZero(AccountId32),
    Vara(AccountId32),
    Ethereum20(Vec<u8>),
    Solana(Vec<u8>),
}

impl ChainMultiOrigin {
    pub fn from_kind(kind: MultiOriginKind, address: &str) -> Result<Self, ChainError> {
        let bytes = || {
            hex::decode(address.trim_start_matches("0x"))
                .map_err(|_| ChainError::InvalidAddress(address.to_string()))
        };
        Ok(match kind {
            MultiOriginKind::Acurast => ChainMultiOrigin::Acurast(parse_account(address)?),
            MultiOriginKind::AlephZero => ChainMultiOrigin::AlephZero(parse_account(address)?),
            MultiOriginKind::Vara => ChainMultiOrigin::Vara(parse_account(address)?),
            MultiOriginKind::Tezos => ChainMultiOrigin::Tezos(address.as_bytes().to_vec()),
            MultiOriginKind::Ethereum => ChainMultiOrigin::Ethereum(bytes()?),
            MultiOriginKind::Ethereum20 => ChainMultiOrigin::Ethereum20(bytes()?),
            MultiOriginKind::Solana => ChainMultiOrigin::Solana(address.as_bytes().to_vec()),
        })
    }

    pub fn to_local(&self) -> MultiOrigin {
        let hex_of = |b: &[u8]| format!("0x{}", hex::encode(b));
        match self {
            ChainMultiOrigin::Acurast(a) => MultiOrigin::Acurast(a.to_string()),
            ChainMultiOrigin::AlephZero(a) => MultiOrigin::AlephZero(a.to_string()),
            ChainMultiOrigin::Vara(a) => MultiOrigin::Vara(a.to_string()),
            ChainMultiOrigin::Tezos(b) => {
                MultiOrigin::Tezos(String::from_utf8_lossy(b).to_string())
            }
            ChainMultiOrigin::Ethereum(b) => MultiOrigin::Ethereum(hex_of(b)),
            ChainMultiOrigin::Ethereum20(b) => MultiOrigin::Ethereum20(hex_of(b)),
            ChainMultiOrigin::Solana(b) => {
                MultiOrigin::Solana(String::from_utf8_lossy(b).to_string())
            }
        }
    }
}

/// `(origin, sequence number)` as used for storage keys and call arguments
pub type ChainJobId = (ChainMultiOrigin, u128);

pub fn chain_job_id(job_id: &JobId) -> Result<ChainJobId, ChainError> {
    let origin = match job_id.origin() {
        MultiOrigin::Acurast(a) => ChainMultiOrigin::from_kind(MultiOriginKind::Acurast, a)?,
        MultiOrigin::Tezos(a) => ChainMultiOrigin::from_kind(MultiOriginKind::Tezos, a)?,
        MultiOrigin::Ethereum(a) => ChainMultiOrigin::from_kind(MultiOriginKind::Ethereum, a)?,
        MultiOrigin::AlephZero(a) => ChainMultiOrigin::from_kind(MultiOriginKind::AlephZero, a)?,
        MultiOrigin::Vara(a) => ChainMultiOrigin::from_kind(MultiOriginKind::Vara, a)?,
        MultiOrigin::Ethereum20(a) => {
            ChainMultiOrigin::from_kind(MultiOriginKind::Ethereum20, a)?
        }
        MultiOrigin::Solana(a) => ChainMultiOrigin::from_kind(MultiOriginKind::Solana, a)?,
    };
    Ok((origin, job_id.number()))
}

pub fn local_job_id(id: &ChainJobId) -> JobId {
    JobId(id.0.to_local(), id.1)
}

#[derive(Debug, Clone, PartialEq, Eq, EncodeAsType, DecodeAsType)]
#[encode_as_type(crate_path = "subxt::ext::scale_encode")]
#[decode_as_type(crate_path = "subxt::ext::scale_decode")]
pub struct ChainSchedule {
    pub duration: u64,
    pub start_time: u64,
    pub end_time: u64,
    pub interval: u64,
    pub max_start_delay: u64,
}

impl From<&Schedule> for ChainSchedule {
    fn from(s: &Schedule) -> Self {
        Self {
            duration: s.duration,
            start_time: s.start_time,
            end_time: s.end_time,
            interval: s.interval,
            max_start_delay: s.max_start_delay,
        }
    }
}

impl From<&ChainSchedule> for Schedule {
    fn from(s: &ChainSchedule) -> Self {
        Self {
            duration: s.duration,
            start_time: s.start_time,
            end_time: s.end_time,
            interval: s.interval,
            max_start_delay: s.max_start_delay,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EncodeAsType, DecodeAsType)]
#[encode_as_type(crate_path = "subxt::ext::scale_encode")]
#[decode_as_type(crate_path = "subxt::ext::scale_decode")]
pub enum ChainJobModule {
    DataEncryption,
    LLM,
}

impl From<RequiredModule> for ChainJobModule {
    fn from(m: RequiredModule) -> Self {
        match m {
            RequiredModule::DataEncryption => ChainJobModule::DataEncryption,
            RequiredModule::Llm => ChainJobModule::LLM,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, EncodeAsType, DecodeAsType)]
#[encode_as_type(crate_path = "subxt::ext::scale_encode")]
#[decode_as_type(crate_path = "subxt::ext::scale_decode")]
pub struct ChainPlannedExecution {
    pub source: AccountId32,
    pub start_delay: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, EncodeAsType, DecodeAsType)]
#[encode_as_type(crate_path = "subxt::ext::scale_encode")]
#[decode_as_type(crate_path = "subxt::ext::scale_decode")]
pub enum ChainAssignmentStrategy {
    Single(Option<Vec<ChainPlannedExecution>>),
    Competing,
}

#[derive(Debug, Clone, PartialEq, Eq, EncodeAsType, DecodeAsType)]
#[encode_as_type(crate_path = "subxt::ext::scale_encode")]
#[decode_as_type(crate_path = "subxt::ext::scale_decode")]
pub struct ChainVersion {
    pub platform: u32,
    pub build_number: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, EncodeAsType, DecodeAsType)]
#[encode_as_type(crate_path = "subxt::ext::scale_encode")]
#[decode_as_type(crate_path = "subxt::ext::scale_decode")]
pub struct ChainProcessorVersionRequirements {
    pub min: Vec<ChainVersion>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EncodeAsType, DecodeAsType)]
#[encode_as_type(crate_path = "subxt::ext::scale_encode")]
#[decode_as_type(crate_path = "subxt::ext::scale_decode")]
pub enum ChainRuntime {
    NodeJS,
    NodeJSWithBundle,
    Shell,
}

impl From<Runtime> for ChainRuntime {
    fn from(r: Runtime) -> Self {
        match r {
            Runtime::NodeJS => ChainRuntime::NodeJS,
            Runtime::NodeJSWithBundle => ChainRuntime::NodeJSWithBundle,
            Runtime::Shell => ChainRuntime::Shell,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, EncodeAsType, DecodeAsType)]
#[encode_as_type(crate_path = "subxt::ext::scale_encode")]
#[decode_as_type(crate_path = "subxt::ext::scale_decode")]
pub struct ChainJobRequirements {
    pub assignment_strategy: ChainAssignmentStrategy,
    pub slots: u8,
    pub reward: u128,
    pub min_reputation: Option<u128>,
    pub processor_version: Option<ChainProcessorVersionRequirements>,
    pub runtime: ChainRuntime,
}

#[derive(Debug, Clone, PartialEq, Eq, EncodeAsType, DecodeAsType)]
#[encode_as_type(crate_path = "subxt::ext::scale_encode")]
#[decode_as_type(crate_path = "subxt::ext::scale_decode")]
pub struct ChainRegistrationExtra {
    pub requirements: ChainJobRequirements,
}

#[derive(Debug, Clone, PartialEq, Eq, EncodeAsType, DecodeAsType)]
#[encode_as_type(crate_path = "subxt::ext::scale_encode")]
#[decode_as_type(crate_path = "subxt::ext::scale_decode")]
pub struct ChainJobRegistration {
    pub script: Vec<u8>,
    pub allowed_sources: Option<Vec<AccountId32>>,
    pub allow_only_verified_sources: bool,
    pub schedule: ChainSchedule,
    pub memory: u32,
    pub network_requests: u32,
    pub storage: u32,
    pub required_modules: Vec<ChainJobModule>,
    pub extra: ChainRegistrationExtra,
}

fn chain_requirements(req: &JobRequirements) -> Result<ChainJobRequirements, ChainError> {
    let assignment_strategy = match &req.assignment_strategy {
        AssignmentStrategy::Single { instant_match } => {
            let planned = match instant_match {
                Some(items) => Some(
                    items
                        .iter()
                        .map(|item| {
                            Ok(ChainPlannedExecution {
                                source: parse_account(&item.source)?,
                                start_delay: item.start_delay,
                            })
                        })
                        .collect::<Result<Vec<_>, ChainError>>()?,
                ),
                None => None,
            };
            ChainAssignmentStrategy::Single(planned)
        }
        AssignmentStrategy::Competing => ChainAssignmentStrategy::Competing,
    };

    Ok(ChainJobRequirements {
        assignment_strategy,
        slots: req.slots,
        reward: req.reward,
        min_reputation: req.min_reputation,
        processor_version: req.processor_version.as_ref().map(|pv| {
            ChainProcessorVersionRequirements {
                min: pv
                    .min
                    .iter()
                    .map(|v| ChainVersion {
                        platform: v.platform,
                        build_number: v.build_number,
                    })
                    .collect(),
            }
        }),
        runtime: req.runtime.into(),
    })
}

impl TryFrom<&JobRegistration> for ChainJobRegistration {
    type Error = ChainError;

    fn try_from(job: &JobRegistration) -> Result<Self, Self::Error> {
        let allowed_sources = match &job.allowed_sources {
            Some(sources) => Some(
                sources
                    .iter()
                    .map(|s| parse_account(s))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            None => None,
        };

        Ok(Self {
            script: job.script.as_bytes().to_vec(),
            allowed_sources,
            allow_only_verified_sources: job.allow_only_verified_sources,
            schedule: (&job.schedule).into(),
            memory: job.memory,
            network_requests: job.network_requests,
            storage: job.storage,
            required_modules: job
                .required_modules
                .iter()
                .flatten()
                .map(|m| (*m).into())
                .collect(),
            extra: ChainRegistrationExtra {
                requirements: chain_requirements(&job.extra.requirements)?,
            },
        })
    }
}

impl ChainJobRegistration {
    pub fn to_registered(&self, id: JobId) -> RegisteredJob {
        RegisteredJob {
            id,
            script: String::from_utf8_lossy(&self.script).to_string(),
            schedule: (&self.schedule).into(),
            slots: self.extra.requirements.slots,
            reward: self.extra.requirements.reward,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EncodeAsType, DecodeAsType)]
#[encode_as_type(crate_path = "subxt::ext::scale_encode")]
#[decode_as_type(crate_path = "subxt::ext::scale_decode")]
pub enum ChainScriptMutability {
    Immutable,
    Mutable,
}

impl From<ScriptMutability> for ChainScriptMutability {
    fn from(m: ScriptMutability) -> Self {
        match m {
            ScriptMutability::Immutable => ChainScriptMutability::Immutable,
            ScriptMutability::Mutable => ChainScriptMutability::Mutable,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, DecodeAsType)]
#[decode_as_type(crate_path = "subxt::ext::scale_decode")]
pub enum ChainJobStatus {
    Open,
    Matched,
    Assigned(u8),
}

impl From<ChainJobStatus> for JobStatus {
    fn from(s: ChainJobStatus) -> Self {
        match s {
            ChainJobStatus::Open => JobStatus::Open,
            ChainJobStatus::Matched => JobStatus::Matched,
            ChainJobStatus::Assigned(n) => JobStatus::Assigned(n),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, DecodeAsType)]
#[decode_as_type(crate_path = "subxt::ext::scale_decode")]
pub enum ChainPubKey {
    SECP256r1(Vec<u8>),
    SECP256k1(Vec<u8>),
    ED25519(Vec<u8>),
    SECP256r1Encryption(Vec<u8>),
    SECP256k1Encryption(Vec<u8>),
}

impl From<&ChainPubKey> for PubKey {
    fn from(k: &ChainPubKey) -> Self {
        let hex_of = |b: &[u8]| format!("0x{}", hex::encode(b));
        match k {
            ChainPubKey::SECP256r1(b) => PubKey::SECP256r1(hex_of(b)),
            ChainPubKey::SECP256k1(b) => PubKey::SECP256k1(hex_of(b)),
            ChainPubKey::ED25519(b) => PubKey::ED25519(hex_of(b)),
            ChainPubKey::SECP256r1Encryption(b) => PubKey::SECP256r1Encryption(hex_of(b)),
            ChainPubKey::SECP256k1Encryption(b) => PubKey::SECP256k1Encryption(hex_of(b)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, DecodeAsType)]
#[decode_as_type(crate_path = "subxt::ext::scale_decode")]
pub enum ChainExecutionSpecifier {
    All,
    Index(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, DecodeAsType)]
#[decode_as_type(crate_path = "subxt::ext::scale_decode")]
pub struct ChainSla {
    pub total: u64,
    pub met: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, DecodeAsType)]
#[decode_as_type(crate_path = "subxt::ext::scale_decode")]
pub struct ChainAssignment {
    pub slot: u8,
    pub start_delay: u64,
    pub fee_per_execution: u128,
    pub acknowledged: bool,
    pub sla: ChainSla,
    pub pub_keys: Vec<ChainPubKey>,
    pub execution: ChainExecutionSpecifier,
}

impl From<&ChainAssignment> for JobAssignment {
    fn from(a: &ChainAssignment) -> Self {
        JobAssignment {
            slot: a.slot,
            start_delay: a.start_delay,
            fee_per_execution: a.fee_per_execution,
            acknowledged: a.acknowledged,
            sla: Sla {
                total: a.sla.total,
                met: a.sla.met,
            },
            pub_keys: a.pub_keys.iter().map(PubKey::from).collect(),
            execution: match a.execution {
                ChainExecutionSpecifier::All => ExecutionSpecifier::All,
                ChainExecutionSpecifier::Index(i) => ExecutionSpecifier::Index(i),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, EncodeAsType)]
#[encode_as_type(crate_path = "subxt::ext::scale_encode")]
pub struct ChainEnvironment {
    pub public_key: Vec<u8>,
    pub variables: Vec<(Vec<u8>, Vec<u8>)>,
}

pub fn chain_environments(
    environments: &[ProcessorEnvironment],
) -> Result<Vec<(AccountId32, ChainEnvironment)>, ChainError> {
    environments
        .iter()
        .map(|env| {
            Ok((
                parse_account(&env.processor)?,
                ChainEnvironment {
                    public_key: env.public_key.clone(),
                    variables: env.variables.clone(),
                },
            ))
        })
        .collect()
}

// Call argument structs, field names match the extrinsic parameters

#[derive(Debug, Clone, EncodeAsType)]
#[encode_as_type(crate_path = "subxt::ext::scale_encode")]
pub struct DeployCall {
    pub registration: ChainJobRegistration,
    pub mutability: ChainScriptMutability,
    pub reuse_keys_from: Option<ChainJobId>,
    pub min_metrics: Option<Vec<(u8, u128, u128)>>,
}

impl DeployCall {
    pub fn new(job: &JobRegistration) -> Result<Self, ChainError> {
        let reuse_keys_from = match &job.reuse_keys_from {
            Some(ReuseKeysFrom(kind, address, number)) => {
                Some((ChainMultiOrigin::from_kind(*kind, address)?, *number))
            }
            None => None,
        };
        Ok(Self {
            registration: ChainJobRegistration::try_from(job)?,
            mutability: job.mutability.into(),
            reuse_keys_from,
            min_metrics: None,
        })
    }
}

#[derive(Debug, Clone, EncodeAsType)]
#[encode_as_type(crate_path = "subxt::ext::scale_encode")]
pub struct DeregisterCall {
    pub job_id: u128,
}

#[derive(Debug, Clone, EncodeAsType)]
#[encode_as_type(crate_path = "subxt::ext::scale_encode")]
pub struct SetEnvironmentsCall {
    pub job_id: u128,
    pub environments: Vec<(AccountId32, ChainEnvironment)>,
}

#[derive(Debug, Clone, EncodeAsType)]
#[encode_as_type(crate_path = "subxt::ext::scale_encode")]
pub struct EditScriptCall {
    pub job_id: ChainJobId,
    pub script: Vec<u8>,
}

#[derive(Debug, Clone, EncodeAsType)]
#[encode_as_type(crate_path = "subxt::ext::scale_encode")]
pub struct TransferEditorCall {
    pub job_id: ChainJobId,
    pub new_editor: Option<AccountId32>,
}

/// Emitted by `Acurast.deploy` once the registration is stored
#[derive(Debug, Clone, DecodeAsType)]
#[decode_as_type(crate_path = "subxt::ext::scale_decode")]
pub struct JobRegistrationStoredV2(pub ChainJobId);

impl StaticEvent for JobRegistrationStoredV2 {
    const PALLET: &'static str = ACURAST_PALLET;
    const EVENT: &'static str = "JobRegistrationStoredV2";
}
