//! Transaction building, submission and confirmation.
//!
//! The [`Executor`] turns a validated form into a single-instruction
//! transaction, hands it to a [`WalletSigner`] and polls the [`Endpoint`]
//! until the network reports a terminal state or the confirmation timeout
//! runs out. It never retries; that is the caller's decision.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use idlforge_core::form::CallInputState;
use idlforge_core::hex::decode_bytes_32;
use idlforge_core::parse::coerce;
use idlforge_core::resolve::resolve;
use idlforge_core::serialize::encode_call;
use idlforge_core::session::Session;
use idlforge_core::validation;
use serde::{Deserialize, Serialize};
use solana_sdk::hash::Hash;
use solana_sdk::instruction::{AccountMeta, Instruction, InstructionError};
use solana_sdk::message::Message;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::{Transaction, TransactionError};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::ExecutionConfig;

/// Why an execution did not produce a confirmed result.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionError {
    /// The call is incomplete or malformed; fix the input and try again
    #[error("call is not submittable: {message}")]
    Invalid { message: String },

    #[error("network failure: {message}")]
    NetworkFailure { message: String },

    /// The program (or runtime) refused the transaction. `code` is the
    /// custom program error code exactly as reported.
    #[error("transaction rejected: {message}")]
    ProgramRejected { code: Option<u32>, message: String },

    /// No terminal status arrived in time. The transaction may still land.
    #[error("no terminal status for {signature} before the timeout; outcome unknown")]
    Timeout { signature: String },

    #[error("instruction `{name}` is not defined by the current program")]
    UnknownCall { name: String },

    #[error("another execution is already in flight")]
    Busy,

    #[error("stopped before this case ran")]
    Cancelled,
}

impl ExecutionError {
    /// Network failures and timeouts may succeed unchanged on a later
    /// attempt; everything else needs different input first.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ExecutionError::NetworkFailure { .. } | ExecutionError::Timeout { .. })
    }

    pub fn network(e: impl std::fmt::Display) -> Self {
        ExecutionError::NetworkFailure { message: e.to_string() }
    }

    fn invalid(e: impl std::fmt::Display) -> Self {
        ExecutionError::Invalid { message: e.to_string() }
    }
}

/// Custom program error code carried by a transaction error, if any.
pub fn program_error_code(err: &TransactionError) -> Option<u32> {
    match err {
        TransactionError::InstructionError(_, InstructionError::Custom(code)) => Some(*code),
        _ => None,
    }
}

/// One account as it was placed in the instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountUse {
    pub name: String,
    pub address: String,
    pub writable: bool,
    pub signer: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub signature: String,
    pub accounts: Vec<AccountUse>,
    pub logs: Vec<String>,
}

/// Network-reported state of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionStatus {
    Pending,
    Confirmed,
    Rejected(TransactionError),
}

/// Request/response channel to a ledger node.
#[async_trait]
pub trait Endpoint: Send + Sync {
    fn url(&self) -> String;

    async fn latest_blockhash(&self) -> Result<Hash, ExecutionError>;

    /// Send a signed transaction. A rejection during preflight surfaces as
    /// [`ExecutionError::ProgramRejected`].
    async fn submit(&self, tx: &Transaction) -> Result<Signature, ExecutionError>;

    async fn status(&self, signature: &Signature) -> Result<SubmissionStatus, ExecutionError>;

    async fn logs(&self, signature: &Signature) -> Result<Vec<String>, ExecutionError>;
}

/// Signs and submits on behalf of one identity. Key material never leaves
/// the implementation.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    fn pubkey(&self) -> Pubkey;

    async fn sign_and_send(&self, tx: Transaction, endpoint: &dyn Endpoint) -> Result<Signature, ExecutionError>;
}

/// Admits one execution (or one batch run) at a time.
#[derive(Debug, Clone, Default)]
pub struct ExecutionGate {
    busy: Arc<AtomicBool>,
}

impl ExecutionGate {
    /// Fails with [`ExecutionError::Busy`] instead of waiting.
    pub fn try_acquire(&self) -> Result<GateGuard, ExecutionError> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ExecutionError::Busy)?;
        Ok(GateGuard {
            busy: Arc::clone(&self.busy),
        })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Releases the gate when dropped.
#[derive(Debug)]
pub struct GateGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for GateGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

pub struct Executor {
    config: ExecutionConfig,
    gate: ExecutionGate,
}

impl Executor {
    pub fn new(config: ExecutionConfig) -> Self {
        Self {
            config,
            gate: ExecutionGate::default(),
        }
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    pub fn gate(&self) -> &ExecutionGate {
        &self.gate
    }

    /// Validate, encode, sign, submit and wait for the call in `state`.
    pub async fn execute(
        &self,
        session: &Session,
        state: &CallInputState,
        signer: &dyn WalletSigner,
        endpoint: &dyn Endpoint,
    ) -> Result<ExecutionResult, ExecutionError> {
        let _guard = self.gate.try_acquire()?;
        self.run_once(session, state, signer, endpoint).await
    }

    /// One attempt without touching the gate; the caller holds it.
    pub(crate) async fn run_once(
        &self,
        session: &Session,
        state: &CallInputState,
        signer: &dyn WalletSigner,
        endpoint: &dyn Endpoint,
    ) -> Result<ExecutionResult, ExecutionError> {
        let (instruction, accounts) = compose_instruction(session, state)?;
        info!(
            instruction = %state.call,
            program = %session.program_id(),
            endpoint = %endpoint.url(),
            data_len = instruction.data.len(),
            "submitting transaction"
        );

        let payer = signer.pubkey();
        let tx = Transaction::new_unsigned(Message::new(&[instruction], Some(&payer)));
        let signature = signer.sign_and_send(tx, endpoint).await.map_err(|e| describe_rejection(session, e))?;
        info!(%signature, "transaction submitted, waiting for confirmation");

        self.await_confirmation(session, endpoint, &signature).await?;
        info!(%signature, "transaction confirmed");

        let logs = match endpoint.logs(&signature).await {
            Ok(logs) => logs,
            Err(e) => {
                warn!(%signature, error = %e, "could not fetch transaction logs");
                Vec::new()
            }
        };

        Ok(ExecutionResult {
            signature: signature.to_string(),
            accounts,
            logs,
        })
    }

    async fn await_confirmation(
        &self,
        session: &Session,
        endpoint: &dyn Endpoint,
        signature: &Signature,
    ) -> Result<(), ExecutionError> {
        let poll = async {
            loop {
                match endpoint.status(signature).await {
                    Ok(SubmissionStatus::Confirmed) => return Ok(()),
                    Ok(SubmissionStatus::Rejected(err)) => return Err(rejection(session, &err)),
                    Ok(SubmissionStatus::Pending) => debug!(%signature, "still pending"),
                    Err(e) => warn!(%signature, error = %e, "status check failed, will retry"),
                }
                tokio::time::sleep(self.config.poll_interval).await;
            }
        };
        match tokio::time::timeout(self.config.confirm_timeout, poll).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(%signature, timeout = ?self.config.confirm_timeout, "confirmation timed out");
                Err(ExecutionError::Timeout {
                    signature: signature.to_string(),
                })
            }
        }
    }
}

/// Build the instruction for `state` after re-validating it.
///
/// Accounts follow declaration order. An empty or unreadable optional
/// account is passed as the program id, and an empty fixed-address account
/// gets its declared address.
pub fn compose_instruction(
    session: &Session,
    state: &CallInputState,
) -> Result<(Instruction, Vec<AccountUse>), ExecutionError> {
    let call = session.call(&state.call).ok_or_else(|| ExecutionError::UnknownCall {
        name: state.call.clone(),
    })?;
    let registry = session.schema().types();

    let report = validation::check(registry, call, state);
    if !report.is_ok() {
        return Err(ExecutionError::invalid(report));
    }

    let null = serde_json::Value::Null;
    let mut values = Vec::with_capacity(call.args.len());
    for spec in &call.args {
        let shape = resolve(&spec.ty, registry).map_err(ExecutionError::invalid)?;
        let raw = state.args.get(&spec.name).unwrap_or(&null);
        let value = coerce(raw, &shape)
            .map_err(|e| ExecutionError::invalid(format!("{}: {}", spec.name, e)))?;
        values.push(value);
    }
    let data = encode_call(call, registry, &values).map_err(ExecutionError::invalid)?;

    let program_id = session.program_id();
    let mut metas = Vec::with_capacity(call.accounts.len());
    let mut uses = Vec::with_capacity(call.accounts.len());
    for spec in &call.accounts {
        let entered = state
            .accounts
            .get(&spec.name)
            .map(|input| input.address.trim())
            .filter(|a| !a.is_empty());
        let entered = match entered.map(|text| (text, decode_bytes_32(text))) {
            Some((text, Err(_))) if spec.optional => {
                warn!(account = %spec.name, address = text, "unreadable optional account left out");
                None
            }
            Some((_, Err(_))) => {
                return Err(ExecutionError::invalid(format!("account {}: bad address", spec.name)));
            }
            Some((_, Ok(bytes))) => Some(Pubkey::new_from_array(bytes)),
            None => None,
        };
        let meta = match (entered, spec.address) {
            (Some(key), _) => account_meta(key, spec.writable, spec.signer),
            (None, Some(fixed)) => account_meta(fixed, spec.writable, spec.signer),
            (None, None) if spec.optional => AccountMeta::new_readonly(program_id, false),
            (None, None) => {
                return Err(ExecutionError::invalid(format!("account {} has no address", spec.name)));
            }
        };
        uses.push(AccountUse {
            name: spec.name.clone(),
            address: meta.pubkey.to_string(),
            writable: meta.is_writable,
            signer: meta.is_signer,
        });
        metas.push(meta);
    }

    Ok((
        Instruction {
            program_id,
            accounts: metas,
            data,
        },
        uses,
    ))
}

fn account_meta(key: Pubkey, writable: bool, signer: bool) -> AccountMeta {
    if writable {
        AccountMeta::new(key, signer)
    } else {
        AccountMeta::new_readonly(key, signer)
    }
}

fn rejection(session: &Session, err: &TransactionError) -> ExecutionError {
    let code = program_error_code(err);
    ExecutionError::ProgramRejected {
        code,
        message: rejection_message(session, code, err.to_string()),
    }
}

/// Attach the program's own error name to a preflight rejection.
fn describe_rejection(session: &Session, err: ExecutionError) -> ExecutionError {
    match err {
        ExecutionError::ProgramRejected { code, message } => ExecutionError::ProgramRejected {
            code,
            message: rejection_message(session, code, message),
        },
        other => other,
    }
}

fn rejection_message(session: &Session, code: Option<u32>, fallback: String) -> String {
    match code.and_then(|c| session.schema().error_for_code(c)) {
        Some(def) => match &def.msg {
            Some(msg) => format!("{} ({}): {}", def.name, def.code, msg),
            None => format!("{} ({})", def.name, def.code),
        },
        None => fallback,
    }
}
