use std::collections::HashMap;

use anyhow::{anyhow, bail, Result};
use idlforge_core::hex::hex_encode;
use idlforge_core::schema::CallDefinition;
use idlforge_core::session::Session;
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;
use tracing::warn;

use crate::args::Cli;
use crate::cli::{
    fill_form, flag_name, parse_instruction_args, print_help, print_instruction_help, wants_help, FilledForm,
};
use crate::cmd::{endpoint, executor, load_session, load_signer, print_json};
use crate::tx::{compose_instruction, AccountUse, Endpoint, WalletSigner};

#[derive(Debug, Serialize)]
struct DryRun {
    instruction: String,
    program_id: String,
    accounts: Vec<AccountUse>,
    data: String,
}

/// Find an instruction by IDL name or by its command-line spelling.
pub(crate) fn find_call<'a>(session: &'a Session, name: &str) -> Result<&'a CallDefinition> {
    session
        .call(name)
        .or_else(|| session.schema().calls().iter().find(|c| flag_name(&c.name) == name))
        .ok_or_else(|| {
            let known: Vec<String> = session.schema().calls().iter().map(|c| flag_name(&c.name)).collect();
            anyhow!("unknown instruction '{}'; available: {}", name, known.join(", "))
        })
}

/// Fill a form for `call` from parsed flags, reporting what was derived.
pub(crate) fn form_from_flags(
    session: &Session,
    call: &CallDefinition,
    values: &HashMap<String, String>,
    signer: Option<&Pubkey>,
    quiet: bool,
) -> Result<FilledForm> {
    let filled = fill_form(session, call, values, signer).map_err(|e| anyhow!(e))?;
    if !quiet {
        for (name, address) in &filled.derived {
            println!("  📦 {} → {} (PDA)", name, address);
        }
        for (name, err) in &filled.underived {
            eprintln!("  ⚠️  {} not derived: {}", name, err);
        }
    }
    Ok(filled)
}

pub async fn run(cli: &Cli, instruction: &str, dry_run: bool, args: &[String]) -> Result<()> {
    let session = load_session(cli)?;
    let call = match find_call(&session, instruction) {
        Ok(call) => call,
        Err(e) => {
            if !cli.json {
                print_help(session.schema(), "idlforge");
                println!();
            }
            return Err(e);
        }
    };
    let values = parse_instruction_args(args).map_err(|e| anyhow!(e))?;
    if wants_help(&values) {
        print_instruction_help(session.schema(), call);
        return Ok(());
    }
    let dry_run = dry_run || values.contains_key("dry-run");

    let signer = match load_signer(cli) {
        Ok(signer) => Some(signer),
        Err(e) if dry_run => {
            warn!(error = %e, "no keypair, signer accounts must be given explicitly");
            None
        }
        Err(e) => return Err(e),
    };
    let payer = signer.as_ref().map(|s| s.pubkey());

    if !cli.json {
        println!("📋 Instruction: {}", call.name);
    }
    let filled = form_from_flags(&session, call, &values, payer.as_ref(), cli.json)?;
    let state = filled
        .form
        .current()
        .ok_or_else(|| anyhow!("no instruction selected"))?;

    if dry_run {
        let (ix, accounts) = compose_instruction(&session, state)?;
        let out = DryRun {
            instruction: call.name.clone(),
            program_id: ix.program_id.to_string(),
            accounts,
            data: hex_encode(&ix.data),
        };
        if cli.json {
            return print_json(&out);
        }
        println!();
        println!("Accounts:");
        for acc in &out.accounts {
            let mut flags = vec![];
            if acc.writable {
                flags.push("mut");
            }
            if acc.signer {
                flags.push("signer");
            }
            println!("  {} → {} {}", acc.name, acc.address, flags.join(" "));
        }
        println!();
        println!("🔧 Transaction:");
        println!("  program: {}", out.program_id);
        println!("  data ({} bytes): {}", ix.data.len(), out.data);
        println!();
        println!("⚠️  Dry run — omit --dry-run to submit the transaction.");
        return Ok(());
    }

    let Some(signer) = signer else {
        bail!("a keypair is required to submit");
    };
    let endpoint = endpoint(cli);
    if !cli.json {
        println!("📤 Submitting to {}...", endpoint.url());
    }
    let result = executor(cli).execute(&session, state, &signer, &endpoint).await?;

    if cli.json {
        return print_json(&result);
    }
    println!("✅ Transaction confirmed");
    println!("   signature: {}", result.signature);
    println!("   explorer:  {}", endpoint.cluster().explorer_tx_url(&result.signature));
    if !result.logs.is_empty() {
        println!();
        println!("Logs:");
        for line in &result.logs {
            println!("  {}", line);
        }
    }
    Ok(())
}
