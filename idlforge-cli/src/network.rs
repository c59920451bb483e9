//! RPC endpoint and cluster helpers.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use solana_client::client_error::ClientError;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_client::GetConfirmedSignaturesForAddress2Config;
use solana_client::rpc_config::RpcTransactionConfig;
use solana_client::rpc_response::RpcConfirmedTransactionStatusWithSignature;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use solana_transaction_status::option_serializer::OptionSerializer;
use solana_transaction_status::UiTransactionEncoding;
use tracing::debug;

use crate::browse::TxRecord;
use crate::tx::{program_error_code, Endpoint, ExecutionError, SubmissionStatus};

pub const MAINNET_URL: &str = "https://api.mainnet-beta.solana.com";
pub const DEVNET_URL: &str = "https://api.devnet.solana.com";
pub const TESTNET_URL: &str = "https://api.testnet.solana.com";
pub const LOCALNET_URL: &str = "http://127.0.0.1:8899";

/// Most signatures one `getSignaturesForAddress` call returns.
pub const MAX_SIGNATURES: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cluster {
    MainnetBeta,
    Devnet,
    Testnet,
    Localnet,
    Custom,
}

impl Cluster {
    /// Guess the cluster from an RPC URL.
    pub fn detect(url: &str) -> Self {
        let url = url.to_lowercase();
        if url.contains("devnet") {
            Cluster::Devnet
        } else if url.contains("testnet") {
            Cluster::Testnet
        } else if url.contains("mainnet") {
            Cluster::MainnetBeta
        } else if url.contains("localhost") || url.contains("127.0.0.1") {
            Cluster::Localnet
        } else {
            Cluster::Custom
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Cluster::MainnetBeta => "mainnet-beta",
            Cluster::Devnet => "devnet",
            Cluster::Testnet => "testnet",
            Cluster::Localnet => "localnet",
            Cluster::Custom => "custom",
        }
    }

    pub fn preset_url(&self) -> Option<&'static str> {
        match self {
            Cluster::MainnetBeta => Some(MAINNET_URL),
            Cluster::Devnet => Some(DEVNET_URL),
            Cluster::Testnet => Some(TESTNET_URL),
            Cluster::Localnet => Some(LOCALNET_URL),
            Cluster::Custom => None,
        }
    }

    /// Explorer link for a transaction on this cluster.
    pub fn explorer_tx_url(&self, signature: &str) -> String {
        match self {
            Cluster::MainnetBeta => format!("https://solscan.io/tx/{}", signature),
            other => format!("https://solscan.io/tx/{}?cluster={}", signature, other.name()),
        }
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Expand a cluster moniker (`devnet`, `m`, `localhost`, ...) to its URL.
/// Anything else is taken as a URL.
pub fn resolve_rpc_url(input: &str) -> String {
    let cluster = match input {
        "mainnet" | "mainnet-beta" | "m" => Cluster::MainnetBeta,
        "devnet" | "d" => Cluster::Devnet,
        "testnet" | "t" => Cluster::Testnet,
        "localnet" | "localhost" | "l" => Cluster::Localnet,
        _ => Cluster::Custom,
    };
    cluster.preset_url().unwrap_or(input).to_string()
}

/// [`Endpoint`] over a JSON-RPC node.
pub struct RpcEndpoint {
    client: RpcClient,
    commitment: CommitmentConfig,
}

impl RpcEndpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_commitment(url, CommitmentConfig::confirmed())
    }

    pub fn with_commitment(url: impl Into<String>, commitment: CommitmentConfig) -> Self {
        Self {
            client: RpcClient::new_with_commitment(url.into(), commitment),
            commitment,
        }
    }

    pub fn cluster(&self) -> Cluster {
        Cluster::detect(&self.client.url())
    }

    /// `getHealth` followed by `getVersion`; returns the node version.
    pub async fn check_health(&self) -> Result<String, ExecutionError> {
        self.client.get_health().await.map_err(ExecutionError::network)?;
        let version = self.client.get_version().await.map_err(ExecutionError::network)?;
        Ok(version.solana_core)
    }

    /// Raw data of every account owned by `program`.
    pub async fn program_accounts(&self, program: &Pubkey) -> Result<Vec<(Pubkey, Vec<u8>)>, ExecutionError> {
        let accounts = self
            .client
            .get_program_accounts(program)
            .await
            .map_err(ExecutionError::network)?;
        debug!(%program, count = accounts.len(), "fetched program accounts");
        Ok(accounts.into_iter().map(|(key, account)| (key, account.data)).collect())
    }

    /// The newest signatures that touched `program`, newest first.
    pub async fn recent_signatures(&self, program: &Pubkey, limit: usize) -> Result<Vec<TxRecord>, ExecutionError> {
        let config = GetConfirmedSignaturesForAddress2Config {
            before: None,
            until: None,
            limit: Some(limit.clamp(1, MAX_SIGNATURES)),
            commitment: Some(self.commitment),
        };
        let statuses = self
            .client
            .get_signatures_for_address_with_config(program, config)
            .await
            .map_err(ExecutionError::network)?;
        Ok(statuses.into_iter().map(tx_record).collect())
    }
}

fn tx_record(status: RpcConfirmedTransactionStatusWithSignature) -> TxRecord {
    TxRecord {
        signature: status.signature,
        slot: status.slot,
        block_time: status.block_time,
        error: status.err.map(|e| e.to_string()),
        memo: status.memo,
    }
}

fn submit_error(err: ClientError) -> ExecutionError {
    match err.get_transaction_error() {
        Some(tx_err) => ExecutionError::ProgramRejected {
            code: program_error_code(&tx_err),
            message: tx_err.to_string(),
        },
        None => ExecutionError::network(err),
    }
}

#[async_trait]
impl Endpoint for RpcEndpoint {
    fn url(&self) -> String {
        self.client.url()
    }

    async fn latest_blockhash(&self) -> Result<Hash, ExecutionError> {
        self.client.get_latest_blockhash().await.map_err(ExecutionError::network)
    }

    async fn submit(&self, tx: &Transaction) -> Result<Signature, ExecutionError> {
        self.client.send_transaction(tx).await.map_err(submit_error)
    }

    async fn status(&self, signature: &Signature) -> Result<SubmissionStatus, ExecutionError> {
        let response = self
            .client
            .get_signature_statuses(&[*signature])
            .await
            .map_err(ExecutionError::network)?;
        let status = match response.value.into_iter().next().flatten() {
            Some(status) => status,
            None => return Ok(SubmissionStatus::Pending),
        };
        debug!(%signature, confirmations = ?status.confirmations, "signature status");
        if let Some(err) = status.err.clone() {
            return Ok(SubmissionStatus::Rejected(err));
        }
        if status.satisfies_commitment(self.commitment) {
            Ok(SubmissionStatus::Confirmed)
        } else {
            Ok(SubmissionStatus::Pending)
        }
    }

    async fn logs(&self, signature: &Signature) -> Result<Vec<String>, ExecutionError> {
        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::Json),
            commitment: Some(self.commitment),
            max_supported_transaction_version: Some(0),
        };
        let tx = self
            .client
            .get_transaction_with_config(signature, config)
            .await
            .map_err(ExecutionError::network)?;
        let logs = match tx.transaction.meta.map(|meta| meta.log_messages) {
            Some(OptionSerializer::Some(logs)) => logs,
            _ => Vec::new(),
        };
        Ok(logs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cluster_detection() {
        assert_eq!(Cluster::detect("https://api.devnet.solana.com"), Cluster::Devnet);
        assert_eq!(Cluster::detect("https://api.mainnet-beta.solana.com"), Cluster::MainnetBeta);
        assert_eq!(Cluster::detect("http://localhost:8899"), Cluster::Localnet);
        assert_eq!(Cluster::detect("https://rpc.example.org"), Cluster::Custom);
    }

    #[test]
    fn monikers_expand() {
        assert_eq!(resolve_rpc_url("devnet"), DEVNET_URL);
        assert_eq!(resolve_rpc_url("l"), LOCALNET_URL);
        assert_eq!(resolve_rpc_url("https://rpc.example.org"), "https://rpc.example.org");
    }

    #[test]
    fn explorer_links_carry_the_cluster() {
        assert_eq!(Cluster::MainnetBeta.explorer_tx_url("abc"), "https://solscan.io/tx/abc");
        assert_eq!(
            Cluster::Devnet.explorer_tx_url("abc"),
            "https://solscan.io/tx/abc?cluster=devnet"
        );
    }
}
