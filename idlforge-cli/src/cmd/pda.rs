use std::collections::HashMap;

use anyhow::{anyhow, Result};
use idlforge_core::pda::{derive_from_seeds, SeedComponent};
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;

use crate::args::Cli;
use crate::cmd::{load_session, parse_pubkey, print_json};

#[derive(Debug, Serialize)]
struct Derived {
    address: String,
    bump: u8,
    program: String,
    seeds: Vec<String>,
}

pub fn run(cli: &Cli, seeds: &[SeedComponent], refs: &[String], owner: Option<&str>) -> Result<()> {
    let program = match owner {
        Some(text) => parse_pubkey(text)?,
        None => load_session(cli)?.program_id(),
    };

    let mut accounts: HashMap<String, Pubkey> = HashMap::new();
    for entry in refs {
        let (name, address) = entry
            .split_once('=')
            .ok_or_else(|| anyhow!("--ref '{}' must look like name=address", entry))?;
        accounts.insert(name.trim().to_string(), parse_pubkey(address)?);
    }

    let (address, bump) = derive_from_seeds(&program, seeds, &accounts)?;
    let out = Derived {
        address: address.to_string(),
        bump,
        program: program.to_string(),
        seeds: seeds.iter().map(ToString::to_string).collect(),
    };
    if cli.json {
        return print_json(&out);
    }
    println!("📦 {}", out.address);
    println!("   bump:    {}", out.bump);
    println!("   program: {}", out.program);
    println!("   seeds:   {}", out.seeds.join(", "));
    Ok(())
}
