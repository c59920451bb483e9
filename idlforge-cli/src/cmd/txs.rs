use anyhow::Result;
use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::args::Cli;
use crate::browse::{tx_stats, TxRecord, TxStats};
use crate::cmd::{endpoint, load_session, print_json};
use crate::tx::Endpoint;

#[derive(Debug, Serialize)]
struct TxHistory {
    program_id: String,
    cluster: String,
    stats: TxStats,
    transactions: Vec<TxRecord>,
}

fn block_time(record: &TxRecord) -> String {
    record
        .block_time
        .and_then(|t| OffsetDateTime::from_unix_timestamp(t).ok())
        .and_then(|t| t.format(&Rfc3339).ok())
        .unwrap_or_else(|| "-".to_string())
}

pub async fn run(cli: &Cli, limit: usize) -> Result<()> {
    let session = load_session(cli)?;
    let endpoint = endpoint(cli);
    if !cli.json {
        println!("📤 Fetching signatures of {} from {}...", session.program_id(), endpoint.url());
    }
    let transactions = endpoint.recent_signatures(&session.program_id(), limit).await?;
    let cluster = endpoint.cluster();
    let history = TxHistory {
        program_id: session.program_id().to_string(),
        cluster: cluster.to_string(),
        stats: tx_stats(&transactions),
        transactions,
    };

    if cli.json {
        return print_json(&history);
    }
    let stats = &history.stats;
    println!();
    println!(
        "📋 {} transaction(s): {} succeeded, {} failed ({:.1}% success rate)",
        stats.total, stats.succeeded, stats.failed, stats.success_rate
    );
    println!();
    for record in &history.transactions {
        let status = if record.succeeded() { "✅" } else { "❌" };
        println!("  {} {}  slot {}  {}", status, record.signature, record.slot, block_time(record));
        if let Some(error) = &record.error {
            println!("     error: {}", error);
        }
        if let Some(memo) = &record.memo {
            println!("     memo: {}", memo);
        }
        println!("     {}", cluster.explorer_tx_url(&record.signature));
    }
    Ok(())
}
