#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use idlforge_cli::config::ExecutionConfig;
use idlforge_cli::tx::{Endpoint, ExecutionError, SubmissionStatus};
use idlforge_cli::wallet::KeypairSigner;
use idlforge_core::form::CallInputState;
use idlforge_core::schema::Schema;
use idlforge_core::session::Session;
use serde_json::{json, Value as JsonValue};
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature};
use solana_sdk::transaction::Transaction;

pub const VAULT: &str = include_str!("../../../idlforge-core/tests/fixtures/vault.json");

pub fn vault_session() -> Session {
    Session::new(Schema::from_json(VAULT).unwrap(), None).unwrap()
}

pub fn signer() -> KeypairSigner {
    KeypairSigner::new(Keypair::new())
}

/// Short timings so timeouts resolve quickly.
pub fn fast_config() -> ExecutionConfig {
    ExecutionConfig::default()
        .with_confirm_timeout(Duration::from_millis(200))
        .with_poll_interval(Duration::from_millis(10))
        .with_batch_delay(Duration::from_millis(5))
}

/// A complete `deposit` form for `owner`.
pub fn deposit_state(session: &Session, owner: &Pubkey, amount: u64) -> CallInputState {
    let call = session.call("deposit").unwrap();
    let vault = Pubkey::find_program_address(&[b"vault", owner.as_ref()], &session.program_id()).0;
    let args: BTreeMap<String, JsonValue> = [
        ("amount".to_string(), json!(amount.to_string())),
        ("memo".to_string(), json!("")),
    ]
    .into_iter()
    .collect();
    let accounts: BTreeMap<String, String> = [
        ("vault".to_string(), vault.to_string()),
        ("owner".to_string(), owner.to_string()),
    ]
    .into_iter()
    .collect();
    CallInputState::from_values(call, &args, &accounts)
}

/// What the endpoint reports for each submission, in order.
#[derive(Debug, Clone)]
pub enum Script {
    /// Pending for `n` polls, then confirmed.
    ConfirmAfter(usize),
    /// Rejected on the first poll.
    Reject(solana_sdk::transaction::TransactionError),
    /// Refused at submission.
    Refuse(ExecutionError),
    /// Never leaves pending.
    Hang,
}

#[derive(Default)]
pub struct MockEndpoint {
    scripts: Mutex<VecDeque<Script>>,
    current: Mutex<Option<(Script, usize)>>,
    pub submitted: Mutex<Vec<Transaction>>,
    pub logs: Vec<String>,
    pub fail_logs: bool,
}

impl MockEndpoint {
    pub fn new(scripts: impl IntoIterator<Item = Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into_iter().collect()),
            ..Default::default()
        }
    }

    pub fn with_logs(mut self, logs: &[&str]) -> Self {
        self.logs = logs.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn submissions(&self) -> usize {
        self.submitted.lock().unwrap().len()
    }
}

#[async_trait]
impl Endpoint for MockEndpoint {
    fn url(&self) -> String {
        "mock://ledger".to_string()
    }

    async fn latest_blockhash(&self) -> Result<Hash, ExecutionError> {
        Ok(Hash::new_unique())
    }

    async fn submit(&self, tx: &Transaction) -> Result<Signature, ExecutionError> {
        let script = self.scripts.lock().unwrap().pop_front().unwrap_or(Script::ConfirmAfter(0));
        if let Script::Refuse(err) = script {
            return Err(err);
        }
        self.submitted.lock().unwrap().push(tx.clone());
        *self.current.lock().unwrap() = Some((script, 0));
        Ok(tx.signatures[0])
    }

    async fn status(&self, _signature: &Signature) -> Result<SubmissionStatus, ExecutionError> {
        let mut current = self.current.lock().unwrap();
        let Some((script, polls)) = current.as_mut() else {
            return Ok(SubmissionStatus::Pending);
        };
        *polls += 1;
        Ok(match script {
            Script::ConfirmAfter(n) if *polls > *n => SubmissionStatus::Confirmed,
            Script::Reject(err) => SubmissionStatus::Rejected(err.clone()),
            _ => SubmissionStatus::Pending,
        })
    }

    async fn logs(&self, _signature: &Signature) -> Result<Vec<String>, ExecutionError> {
        if self.fail_logs {
            return Err(ExecutionError::network("logs unavailable"));
        }
        Ok(self.logs.clone())
    }
}
