// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! [`Marketplace`] implementation talking to an Acurast node over RPC.

use async_trait::async_trait;
use futures::StreamExt;
use subxt::blocks::ExtrinsicEvents;
use subxt::dynamic::Value;
use subxt::ext::scale_encode::EncodeAsFields;
use subxt::ext::scale_value::At;
use subxt::storage::Storage;
use subxt::tx::{DefaultPayload, TxStatus};
use subxt::utils::AccountId32;
use subxt::{OnlineClient, PolkadotConfig};
use tracing::{debug, info, warn};

use super::codec::{
    chain_environments, chain_job_id, local_job_id, parse_account, ChainAssignment, ChainJobId,
    ChainJobRegistration, ChainJobStatus, ChainMultiOrigin, DeployCall, DeregisterCall,
    EditScriptCall, JobRegistrationStoredV2, SetEnvironmentsCall, TransferEditorCall,
    ACURAST_PALLET, MARKETPLACE_PALLET,
};
use super::error::ChainError;
use super::marketplace::{Marketplace, Registered, StatusStream};
use super::types::{JobAssignmentInfo, JobId, JobStatus, ProcessorEnvironment, RegisteredJob};
use super::wallet::Wallet;
use crate::project::JobRegistration;

type Api = OnlineClient<PolkadotConfig>;

pub struct AcurastClient {
    api: Api,
    wallet: Option<Wallet>,
}

fn decode_err<E: std::fmt::Display>(what: &str) -> impl Fn(E) -> ChainError + '_ {
    move |e| ChainError::Decode {
        what: what.to_string(),
        reason: e.to_string(),
    }
}

fn origin_value(origin: &ChainMultiOrigin) -> Value {
    match origin {
        ChainMultiOrigin::Acurast(a) => Value::unnamed_variant("Acurast", [Value::from_bytes(a.0)]),
        ChainMultiOrigin::AlephZero(a) => {
            Value::unnamed_variant("AlephZero", [Value::from_bytes(a.0)])
        }
        ChainMultiOrigin::Vara(a) => Value::unnamed_variant("Vara", [Value::from_bytes(a.0)]),
        ChainMultiOrigin::Tezos(b) => Value::unnamed_variant("Tezos", [Value::from_bytes(b)]),
        ChainMultiOrigin::Ethereum(b) => {
            Value::unnamed_variant("Ethereum", [Value::from_bytes(b)])
        }
        ChainMultiOrigin::Ethereum20(b) => {
            Value::unnamed_variant("Ethereum20", [Value::from_bytes(b)])
        }
        ChainMultiOrigin::Solana(b) => Value::unnamed_variant("Solana", [Value::from_bytes(b)]),
    }
}

fn job_id_value(id: &ChainJobId) -> Value {
    Value::unnamed_composite([origin_value(&id.0), Value::u128(id.1)])
}

/// Key bytes end with the raw value of the last `Blake2_128Concat` key
fn trailing_bytes<const N: usize>(key_bytes: &[u8]) -> Option<[u8; N]> {
    if key_bytes.len() < N {
        return None;
    }
    let mut out = [0u8; N];
    out.copy_from_slice(&key_bytes[key_bytes.len() - N..]);
    Some(out)
}

async fn fetch_statuses(
    storage: &Storage<PolkadotConfig, Api>,
    ids: &[ChainJobId],
) -> Result<Vec<Option<JobStatus>>, ChainError> {
    let mut statuses = Vec::with_capacity(ids.len());
    for id in ids {
        let address = subxt::dynamic::storage(
            MARKETPLACE_PALLET,
            "StoredJobStatus",
            vec![origin_value(&id.0), Value::u128(id.1)],
        );
        let status = match storage.fetch(&address).await.map_err(ChainError::from_subxt)? {
            Some(thunk) => Some(
                thunk
                    .as_type::<ChainJobStatus>()
                    .map_err(decode_err("job status"))?
                    .into(),
            ),
            None => None,
        };
        statuses.push(status);
    }
    Ok(statuses)
}

impl AcurastClient {
    /// Connect to `url`; `ws://` endpoints are allowed for local nodes
    pub async fn connect(url: &str, wallet: Option<Wallet>) -> Result<Self, ChainError> {
        let api = if url.starts_with("ws://") || url.starts_with("http://") {
            Api::from_insecure_url(url).await
        } else {
            Api::from_url(url).await
        }
        .map_err(|e| ChainError::Connection {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        info!("Connected to {}", url);
        Ok(Self { api, wallet })
    }

    fn wallet(&self) -> Result<&Wallet, ChainError> {
        self.wallet
            .as_ref()
            .ok_or_else(|| ChainError::InvalidMnemonic("no signing account configured".to_string()))
    }

    async fn latest_storage(&self) -> Result<Storage<PolkadotConfig, Api>, ChainError> {
        self.api
            .storage()
            .at_latest()
            .await
            .map_err(ChainError::from_subxt)
    }

    /// Sign, submit and wait for the extrinsic to land in a best block
    async fn submit<Call: EncodeAsFields>(
        &self,
        pallet: &str,
        call: &str,
        data: Call,
    ) -> Result<(String, ExtrinsicEvents<PolkadotConfig>), ChainError> {
        let wallet = self.wallet()?;
        let payload = DefaultPayload::new(pallet, call, data);
        let mut progress = self
            .api
            .tx()
            .sign_and_submit_then_watch_default(&payload, wallet.keypair())
            .await
            .map_err(ChainError::from_subxt)?;
        let tx_hash = format!("0x{}", hex::encode(progress.extrinsic_hash().as_bytes()));
        debug!("Submitted {}.{} as {}", pallet, call, tx_hash);

        while let Some(status) = progress.next().await {
            match status.map_err(ChainError::from_subxt)? {
                TxStatus::InBestBlock(in_block) | TxStatus::InFinalizedBlock(in_block) => {
                    let events = in_block
                        .wait_for_success()
                        .await
                        .map_err(ChainError::from_subxt)?;
                    info!("{}.{} included, tx {}", pallet, call, tx_hash);
                    return Ok((tx_hash, events));
                }
                TxStatus::Error { message }
                | TxStatus::Invalid { message }
                | TxStatus::Dropped { message } => {
                    warn!("{}.{} failed: {}", pallet, call, message);
                    return Err(ChainError::Transaction(message));
                }
                _ => continue,
            }
        }
        Err(ChainError::Transaction(format!(
            "Transaction {} was not included",
            tx_hash
        )))
    }
}

#[async_trait]
impl Marketplace for AcurastClient {
    fn account(&self) -> String {
        self.wallet
            .as_ref()
            .map(|w| w.address())
            .unwrap_or_default()
    }

    async fn free_balance(&self, address: &str) -> Result<u128, ChainError> {
        let account = parse_account(address)?;
        let query = subxt::dynamic::storage("System", "Account", vec![Value::from_bytes(account.0)]);
        let info = self
            .latest_storage()
            .await?
            .fetch(&query)
            .await
            .map_err(ChainError::from_subxt)?;
        let Some(info) = info else {
            return Ok(0);
        };
        let value = info.to_value().map_err(decode_err("account info"))?;
        Ok(value
            .at("data")
            .at("free")
            .and_then(|free| free.as_u128())
            .unwrap_or(0))
    }

    async fn register_job(&self, job: &JobRegistration) -> Result<Registered, ChainError> {
        let call = DeployCall::new(job)?;
        let (tx_hash, events) = self.submit(ACURAST_PALLET, "deploy", call).await?;

        let mut job_ids = Vec::new();
        for event in events.find::<JobRegistrationStoredV2>() {
            let event = event.map_err(decode_err("JobRegistrationStoredV2"))?;
            job_ids.push(local_job_id(&event.0));
        }
        Ok(Registered { tx_hash, job_ids })
    }

    async fn watch_job_statuses(&self, ids: &[JobId]) -> Result<StatusStream, ChainError> {
        let ids = ids
            .iter()
            .map(chain_job_id)
            .collect::<Result<Vec<_>, _>>()?;
        let blocks = self
            .api
            .blocks()
            .subscribe_best()
            .await
            .map_err(ChainError::from_subxt)?;

        let stream = blocks.then(move |block| {
            let ids = ids.clone();
            async move {
                let block = block.map_err(ChainError::from_subxt)?;
                debug!("Checking job status at block #{}", block.number());
                fetch_statuses(&block.storage(), &ids).await
            }
        });
        Ok(Box::pin(stream))
    }

    async fn assigned_processors(&self, id: &JobId) -> Result<Vec<String>, ChainError> {
        let id = chain_job_id(id)?;
        let query = subxt::dynamic::storage(
            MARKETPLACE_PALLET,
            "AssignedProcessors",
            vec![job_id_value(&id)],
        );
        let mut entries = self
            .latest_storage()
            .await?
            .iter(query)
            .await
            .map_err(ChainError::from_subxt)?;

        let mut processors = Vec::new();
        while let Some(entry) = entries.next().await {
            let entry = entry.map_err(ChainError::from_subxt)?;
            if let Some(bytes) = trailing_bytes::<32>(&entry.key_bytes) {
                processors.push(AccountId32(bytes).to_string());
            }
        }
        Ok(processors)
    }

    async fn job_assignments(
        &self,
        id: &JobId,
        processors: &[String],
    ) -> Result<Vec<JobAssignmentInfo>, ChainError> {
        let chain_id = chain_job_id(id)?;
        let storage = self.latest_storage().await?;

        let mut infos = Vec::new();
        for processor in processors {
            let account = parse_account(processor)?;
            let query = subxt::dynamic::storage(
                MARKETPLACE_PALLET,
                "StoredMatches",
                vec![Value::from_bytes(account.0), job_id_value(&chain_id)],
            );
            let Some(thunk) = storage.fetch(&query).await.map_err(ChainError::from_subxt)? else {
                continue;
            };
            let assignment = thunk
                .as_type::<ChainAssignment>()
                .map_err(decode_err("assignment"))?;
            infos.push(JobAssignmentInfo {
                id: id.clone(),
                processor: processor.clone(),
                assignment: (&assignment).into(),
            });
        }
        Ok(infos)
    }

    async fn set_environments(
        &self,
        id: &JobId,
        environments: &[ProcessorEnvironment],
    ) -> Result<String, ChainError> {
        let call = SetEnvironmentsCall {
            job_id: id.number(),
            environments: chain_environments(environments)?,
        };
        let (tx_hash, _) = self.submit(ACURAST_PALLET, "set_environments", call).await?;
        Ok(tx_hash)
    }

    async fn deregister_job(&self, id: &JobId) -> Result<String, ChainError> {
        let call = DeregisterCall { job_id: id.number() };
        let (tx_hash, _) = self.submit(ACURAST_PALLET, "deregister", call).await?;
        Ok(tx_hash)
    }

    async fn edit_script(&self, id: &JobId, script: &str) -> Result<String, ChainError> {
        let call = EditScriptCall {
            job_id: chain_job_id(id)?,
            script: script.as_bytes().to_vec(),
        };
        let (tx_hash, _) = self.submit(MARKETPLACE_PALLET, "edit_script", call).await?;
        Ok(tx_hash)
    }

    async fn transfer_editor(
        &self,
        id: &JobId,
        new_editor: Option<&str>,
    ) -> Result<String, ChainError> {
        let call = TransferEditorCall {
            job_id: chain_job_id(id)?,
            new_editor: new_editor.map(parse_account).transpose()?,
        };
        let (tx_hash, _) = self
            .submit(MARKETPLACE_PALLET, "transfer_editor", call)
            .await?;
        Ok(tx_hash)
    }

    async fn registered_jobs(&self, owner: &str) -> Result<Vec<RegisteredJob>, ChainError> {
        let origin = ChainMultiOrigin::Acurast(parse_account(owner)?);
        let query = subxt::dynamic::storage(
            ACURAST_PALLET,
            "StoredJobRegistration",
            vec![origin_value(&origin)],
        );
        let mut entries = self
            .latest_storage()
            .await?
            .iter(query)
            .await
            .map_err(ChainError::from_subxt)?;

        let mut jobs = Vec::new();
        while let Some(entry) = entries.next().await {
            let entry = entry.map_err(ChainError::from_subxt)?;
            let Some(number) = trailing_bytes::<16>(&entry.key_bytes).map(u128::from_le_bytes)
            else {
                continue;
            };
            match entry.value.as_type::<ChainJobRegistration>() {
                Ok(registration) => {
                    let id = local_job_id(&(origin.clone(), number));
                    jobs.push(registration.to_registered(id));
                }
                Err(e) => warn!("Skipping job {} with undecodable registration: {}", number, e),
            }
        }
        debug!("Found {} registered jobs for {}", jobs.len(), owner);
        Ok(jobs)
    }
}
