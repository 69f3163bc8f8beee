// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod client;
pub mod codec;
pub mod error;
pub mod marketplace;
pub mod mock;
pub mod types;
pub mod wallet;

pub use client::AcurastClient;
pub use error::ChainError;
pub use marketplace::{Marketplace, Registered, StatusStream};
pub use mock::MockMarketplace;
pub use types::{
    JobAssignment, JobAssignmentInfo, JobId, JobStatus, MultiOrigin, ProcessorEnvironment,
    PubKey, RegisteredJob,
};
pub use wallet::Wallet;
