use std::fs;

use anyhow::{anyhow, Context, Result};
use idlforge_core::hex::decode_bytes_32;
use idlforge_core::schema::Schema;
use idlforge_core::session::Session;
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;
use tracing::debug;

use crate::args::{Cli, Command};
use crate::config::ExecutionConfig;
use crate::network::{resolve_rpc_url, RpcEndpoint};
use crate::tx::Executor;
use crate::wallet::{default_keypair_path, KeypairSigner};

mod accounts;
mod call;
mod health;
mod pda;
mod suite;
mod txs;

pub async fn dispatch(cli: Cli) -> Result<()> {
    match &cli.command {
        Command::Idl => idl(&cli),
        Command::Call {
            instruction,
            dry_run,
            args,
        } => call::run(&cli, instruction, *dry_run, args).await,
        Command::Pda { seeds, refs, owner } => pda::run(&cli, seeds, refs, owner.as_deref()),
        Command::Health => health::run(&cli).await,
        Command::Accounts { type_name } => accounts::run(&cli, type_name.as_deref()).await,
        Command::Txs { limit } => txs::run(&cli, *limit).await,
        Command::Suite { action } => suite::run(&cli, action).await,
    }
}

fn idl(cli: &Cli) -> Result<()> {
    let session = load_session(cli)?;
    if cli.json {
        print_json(&crate::inspect::summarize(&session))
    } else {
        crate::inspect::print_idl(&session);
        Ok(())
    }
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn parse_pubkey(text: &str) -> Result<Pubkey> {
    decode_bytes_32(text.trim())
        .map(Pubkey::new_from_array)
        .map_err(|e| anyhow!("'{}' is not a valid address: {}", text, e))
}

/// Load the IDL and bind it to the configured (or declared) program id.
pub(crate) fn load_session(cli: &Cli) -> Result<Session> {
    let path = cli
        .idl
        .as_ref()
        .ok_or_else(|| anyhow!("no IDL given; pass --idl <FILE> or set IDLFORGE_IDL"))?;
    let text = fs::read_to_string(path).with_context(|| format!("failed to read IDL {}", path.display()))?;
    let schema = Schema::from_json(&text).with_context(|| format!("failed to load IDL {}", path.display()))?;
    let program_id = cli.program_id.as_deref().map(parse_pubkey).transpose()?;
    let session = Session::new(schema, program_id)?;
    debug!(program = %session.program_id(), calls = session.schema().calls().len(), "session loaded");
    Ok(session)
}

pub(crate) fn load_signer(cli: &Cli) -> Result<KeypairSigner> {
    let path = match &cli.keypair {
        Some(path) => path.clone(),
        None => default_keypair_path().ok_or_else(|| anyhow!("no home directory; pass --keypair <FILE>"))?,
    };
    Ok(KeypairSigner::from_file(&path)?)
}

pub(crate) fn endpoint(cli: &Cli) -> RpcEndpoint {
    RpcEndpoint::new(resolve_rpc_url(&cli.rpc_url))
}

pub(crate) fn executor(cli: &Cli) -> Executor {
    Executor::new(ExecutionConfig::default().with_confirm_timeout(cli.timeout))
}
