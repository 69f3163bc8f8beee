// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use serde::{Deserialize, Serialize};

pub const DEFAULT_CANARY_RPC: &str = "wss://canarynet-ws-1.acurast.com";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub name: String,
    pub rpc_url: String,
    pub native_token: TokenInfo,
    pub links: NetworkLinks,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenInfo {
    pub symbol: String,
    pub decimals: u8,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NetworkLinks {
    pub console: String,
    pub docs: String,
    pub faucet: String,
    pub explorer: String,
    pub telegram_bot: String,
    pub telegram_group: String,
    pub discord: String,
}

impl NetworkConfig {
    pub fn canary() -> Self {
        NetworkConfig {
            name: "Acurast Canary".to_string(),
            rpc_url: std::env::var("ACURAST_RPC")
                .ok()
                .filter(|rpc| !rpc.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CANARY_RPC.to_string()),
            native_token: TokenInfo {
                symbol: "cACU".to_string(),
                decimals: 12,
            },
            links: NetworkLinks {
                console: "https://console.acurast.com".to_string(),
                docs: "https://docs.acurast.com/".to_string(),
                faucet: "https://faucet.acurast.com/".to_string(),
                explorer: "https://polkadot.js.org/apps/?rpc=wss://acurast-canarynet-ws.prod.gke.acurast.com#/explorer".to_string(),
                telegram_bot: "https://t.me/AcurastBot".to_string(),
                telegram_group: "https://t.me/acurastnetwork".to_string(),
                discord: "https://discord.gg/wqgC6b6aKe".to_string(),
            },
        }
    }

    pub fn faucet_link(&self, address: &str) -> String {
        format!("https://faucet.acurast.com?address={}", address)
    }

    pub fn console_job_link(&self, owner: &str, job_number: u128) -> String {
        format!(
            "{}/job-detail/acurast-{}-{}",
            self.links.console, owner, job_number
        )
    }

    /// Scale a human-readable token amount to the smallest unit
    pub fn units(&self, amount: u128) -> u128 {
        amount * 10u128.pow(self.native_token.decimals as u32)
    }
}
