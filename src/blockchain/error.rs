// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("Failed to connect to {url}: {reason}")]
    Connection { url: String, reason: String },
    /// Extrinsic dispatch failed inside a pallet
    #[error("{section}.{name}: {docs}")]
    Dispatch {
        section: String,
        name: String,
        docs: String,
    },
    #[error("Transaction failed: {0}")]
    Transaction(String),
    #[error("Failed to decode {what}: {reason}")]
    Decode { what: String, reason: String },
    #[error("Invalid address {0}")]
    InvalidAddress(String),
    #[error("Invalid mnemonic: {0}")]
    InvalidMnemonic(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Subxt(#[from] subxt::Error),
}

impl ChainError {
    /// Map a subxt error, decoding module errors against the runtime metadata
    pub fn from_subxt(err: subxt::Error) -> Self {
        if let subxt::Error::Runtime(subxt::error::DispatchError::Module(module_err)) = &err {
            if let Ok(details) = module_err.details() {
                return ChainError::Dispatch {
                    section: details.pallet.name().to_string(),
                    name: details.variant.name.clone(),
                    docs: details.variant.docs.join(" "),
                };
            }
        }
        ChainError::Subxt(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_display() {
        let err = ChainError::Dispatch {
            section: "AcurastMarketplace".to_string(),
            name: "JobRegistrationStartInPast".to_string(),
            docs: "Start time lies in the past.".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "AcurastMarketplace.JobRegistrationStartInPast: Start time lies in the past."
        );
    }
}
