// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::str::FromStr;
use subxt::utils::AccountId32;
use subxt_signer::sr25519::Keypair;
use subxt_signer::SecretUri;
use tracing::debug;

use super::error::ChainError;

/// sr25519 signer derived from `ACURAST_MNEMONIC`
#[derive(Clone)]
pub struct Wallet {
    keypair: Keypair,
}

impl Wallet {
    /// Accepts a mnemonic phrase or a secret URI such as `//Alice`
    pub fn from_mnemonic(mnemonic: &str) -> Result<Self, ChainError> {
        let uri = SecretUri::from_str(mnemonic.trim())
            .map_err(|e| ChainError::InvalidMnemonic(e.to_string()))?;
        let keypair =
            Keypair::from_uri(&uri).map_err(|e| ChainError::InvalidMnemonic(e.to_string()))?;
        let wallet = Self { keypair };
        debug!("Loaded wallet {}", wallet.address());
        Ok(wallet)
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }

    pub fn account_id(&self) -> AccountId32 {
        self.keypair.public_key().to_account_id()
    }

    /// SS58 address with the generic substrate prefix
    pub fn address(&self) -> String {
        self.account_id().to_string()
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet").field("address", &self.address()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dev_uri() {
        let wallet = Wallet::from_mnemonic("//Alice").unwrap();
        assert_eq!(
            wallet.address(),
            "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY"
        );
    }

    #[test]
    fn test_invalid_mnemonic() {
        assert!(matches!(
            Wallet::from_mnemonic("not a valid phrase at all"),
            Err(ChainError::InvalidMnemonic(_))
        ));
    }
}
