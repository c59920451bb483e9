//! Keypair-file signer.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{read_keypair_file, Keypair, Signature, Signer};
use solana_sdk::transaction::Transaction;
use thiserror::Error;
use tracing::debug;

use crate::tx::{Endpoint, ExecutionError, WalletSigner};

/// `~/.config/solana/id.json`, the Solana CLI's default keypair location.
pub fn default_keypair_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config").join("solana").join("id.json"))
}

#[derive(Error, Debug)]
pub enum WalletError {
    #[error("failed to read keypair {}: {message}", .path.display())]
    Read { path: PathBuf, message: String },
}

/// Signs with a local keypair and submits through the given endpoint.
pub struct KeypairSigner {
    keypair: Keypair,
}

impl KeypairSigner {
    pub fn new(keypair: Keypair) -> Self {
        Self { keypair }
    }

    pub fn from_file(path: &Path) -> Result<Self, WalletError> {
        read_keypair_file(path).map(Self::new).map_err(|e| WalletError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl WalletSigner for KeypairSigner {
    fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    async fn sign_and_send(&self, mut tx: Transaction, endpoint: &dyn Endpoint) -> Result<Signature, ExecutionError> {
        let blockhash = endpoint.latest_blockhash().await?;
        tx.try_sign(&[&self.keypair], blockhash)
            .map_err(|e| ExecutionError::Invalid {
                message: format!("signing failed: {}", e),
            })?;
        debug!(signer = %self.keypair.pubkey(), %blockhash, "transaction signed");
        endpoint.submit(&tx).await
    }
}
