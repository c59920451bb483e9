use std::path::Path;

use anyhow::{anyhow, bail, Result};
use tracing::warn;

use crate::args::{Cli, SuiteCommand};
use crate::batch::{BatchRunner, RunStatus, StopSignal, TestRunResult};
use crate::cli::{parse_instruction_args, print_instruction_help, wants_help};
use crate::cmd::call::{find_call, form_from_flags};
use crate::cmd::{endpoint, executor, load_session, load_signer, print_json};
use crate::suite::{TestCase, TestSuite};
use crate::tx::WalletSigner;

pub async fn run(cli: &Cli, action: &SuiteCommand) -> Result<()> {
    match action {
        SuiteCommand::New { file, name } => new(cli, file, name),
        SuiteCommand::Add {
            file,
            name,
            instruction,
            args,
        } => add(cli, file, name, instruction, args),
        SuiteCommand::List { file } => list(cli, file),
        SuiteCommand::Remove { file, case } => remove(cli, file, case),
        SuiteCommand::Run { file, delay, fail_fast } => run_suite(cli, file, *delay, *fail_fast).await,
    }
}

fn new(cli: &Cli, file: &Path, name: &str) -> Result<()> {
    if file.exists() {
        bail!("{} already exists", file.display());
    }
    let session = load_session(cli)?;
    let suite = TestSuite::new(name, session.program_id().to_string());
    suite.save(file)?;
    if cli.json {
        return print_json(&suite);
    }
    println!("✅ Suite '{}' created at {}", suite.name, file.display());
    Ok(())
}

fn add(cli: &Cli, file: &Path, name: &str, instruction: &str, args: &[String]) -> Result<()> {
    let session = load_session(cli)?;
    let call = find_call(&session, instruction)?;
    let values = parse_instruction_args(args).map_err(|e| anyhow!(e))?;
    if wants_help(&values) {
        print_instruction_help(session.schema(), call);
        return Ok(());
    }
    let mut suite = TestSuite::load(file)?;

    let payer = match load_signer(cli) {
        Ok(signer) => Some(signer.pubkey()),
        Err(e) => {
            warn!(error = %e, "no keypair, signer accounts are saved as given");
            None
        }
    };
    let filled = form_from_flags(&session, call, &values, payer.as_ref(), cli.json)?;
    let state = filled
        .form
        .current()
        .ok_or_else(|| anyhow!("no instruction selected"))?;

    let case = TestCase::from_state(name, &session, state);
    let id = suite.add_case(case);
    suite.save(file)?;
    if cli.json {
        return print_json(&serde_json::json!({ "id": id, "name": name }));
    }
    println!("✅ Added '{}' ({}) to {}", name, id, suite.name);
    Ok(())
}

fn list(cli: &Cli, file: &Path) -> Result<()> {
    let suite = TestSuite::load(file)?;
    if cli.json {
        return print_json(&suite);
    }
    println!("📋 {} — {} case(s), program {}", suite.name, suite.test_cases.len(), suite.program_id);
    for case in &suite.test_cases {
        let id = case.id.to_string();
        println!("  {}  {:<24} {}", &id[..8], case.name, case.instruction);
    }
    Ok(())
}

fn remove(cli: &Cli, file: &Path, key: &str) -> Result<()> {
    let mut suite = TestSuite::load(file)?;
    let removed = suite.remove_case(key)?;
    suite.save(file)?;
    if cli.json {
        return print_json(&removed);
    }
    println!("✅ Removed '{}' from {}", removed.name, suite.name);
    Ok(())
}

fn print_update(result: &TestRunResult) {
    match result.status {
        RunStatus::Pending => {}
        RunStatus::Running => println!("▶️  {}", result.case_name),
        RunStatus::Success => println!(
            "✅ {} ({:.1?}) {}",
            result.case_name,
            result.duration,
            result.signature.as_deref().unwrap_or("")
        ),
        RunStatus::Failure => {
            let error = result.error.as_ref().map(ToString::to_string).unwrap_or_default();
            println!("❌ {}: {}", result.case_name, error);
        }
    }
}

async fn run_suite(cli: &Cli, file: &Path, delay: std::time::Duration, fail_fast: bool) -> Result<()> {
    let suite = TestSuite::load(file)?;
    let session = load_session(cli)?;
    if suite.program_id != session.program_id().to_string() {
        warn!(
            recorded = %suite.program_id,
            current = %session.program_id(),
            "suite was recorded against a different program"
        );
    }
    let signer = load_signer(cli)?;
    let endpoint = endpoint(cli);
    let executor = executor(cli);

    let stop = StopSignal::new();
    let on_interrupt = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, stopping after the current case");
            on_interrupt.stop();
        }
    });

    if !cli.json {
        println!("📤 Running '{}' ({} case(s))", suite.name, suite.test_cases.len());
    }
    let runner = BatchRunner::new(&executor, &session, &signer, &endpoint)
        .with_delay(delay)
        .with_fail_fast(fail_fast);
    let quiet = cli.json;
    let report = runner
        .run(&suite.test_cases, &stop, |_, result| {
            if !quiet {
                print_update(result);
            }
        })
        .await?;

    if cli.json {
        print_json(&report)?;
    } else {
        println!();
        println!(
            "{} passed, {} failed, {} total",
            report.summary.success, report.summary.failure, report.summary.total
        );
    }
    if report.summary.failure > 0 {
        bail!("{} case(s) failed", report.summary.failure);
    }
    Ok(())
}
