use anyhow::{anyhow, Result};

use crate::args::Cli;
use crate::browse::{decode_accounts, select_account_types};
use crate::cmd::{endpoint, load_session, print_json};
use crate::tx::Endpoint;

pub async fn run(cli: &Cli, type_name: Option<&str>) -> Result<()> {
    let session = load_session(cli)?;
    let schema = session.schema();
    let selected = select_account_types(schema, type_name).map_err(|e| anyhow!(e))?;

    let endpoint = endpoint(cli);
    if !cli.json {
        println!("📤 Fetching accounts of {} from {}...", session.program_id(), endpoint.url());
    }
    let raw = endpoint.program_accounts(&session.program_id()).await?;
    let pages = selected
        .into_iter()
        .map(|account| decode_accounts(schema, account, &raw))
        .collect::<Result<Vec<_>, _>>()?;

    if cli.json {
        return print_json(&pages);
    }
    for page in &pages {
        println!();
        println!("📦 {} ({} account(s))", page.account_type, page.accounts.len());
        for account in &page.accounts {
            println!("  {}", account.address);
            for line in serde_json::to_string_pretty(&account.data)?.lines() {
                println!("    {}", line);
            }
        }
        for (address, error) in &page.undecodable {
            eprintln!("  ⚠️  {} does not decode: {}", address, error);
        }
    }
    Ok(())
}
