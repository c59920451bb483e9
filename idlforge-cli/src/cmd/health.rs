use anyhow::Result;
use serde::Serialize;

use crate::args::Cli;
use crate::cmd::{endpoint, print_json};
use crate::tx::Endpoint;

#[derive(Debug, Serialize)]
struct Health {
    url: String,
    cluster: String,
    ok: bool,
    version: Option<String>,
    error: Option<String>,
}

pub async fn run(cli: &Cli) -> Result<()> {
    let endpoint = endpoint(cli);
    let outcome = endpoint.check_health().await;
    let out = Health {
        url: endpoint.url(),
        cluster: endpoint.cluster().to_string(),
        ok: outcome.is_ok(),
        version: outcome.as_ref().ok().cloned(),
        error: outcome.as_ref().err().map(ToString::to_string),
    };
    if cli.json {
        print_json(&out)?;
    } else if let Some(version) = &out.version {
        println!("✅ {} ({}) is healthy, solana-core {}", out.url, out.cluster, version);
    } else {
        eprintln!("❌ {} ({}): {}", out.url, out.cluster, out.error.as_deref().unwrap_or("unreachable"));
    }
    outcome?;
    Ok(())
}
