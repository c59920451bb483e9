//! Building forms from command-line flags.

mod common;

use std::collections::HashMap;

use common::vault_session;
use idlforge_cli::cli::{fill_form, parse_instruction_args};
use idlforge_cli::tx::compose_instruction;
use solana_sdk::pubkey::Pubkey;

fn flags(args: &[&str]) -> HashMap<String, String> {
    let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
    parse_instruction_args(&args).unwrap()
}

#[test]
fn signer_fills_owner_and_vault_is_derived() {
    let session = vault_session();
    let call = session.call("deposit").unwrap();
    let owner = Pubkey::new_unique();

    let filled = fill_form(&session, call, &flags(&["--amount", "10", "--dry-run"]), Some(&owner)).unwrap();

    let expected = Pubkey::find_program_address(&[b"vault", owner.as_ref()], &session.program_id()).0;
    assert_eq!(filled.derived, vec![("vault".to_string(), expected)]);
    assert!(filled.underived.is_empty());
    let state = filled.form.current().unwrap();
    assert_eq!(state.accounts["owner"].address, owner.to_string());
    assert!(compose_instruction(&session, state).is_ok());
}

#[test]
fn explicit_account_wins_over_the_signer() {
    let session = vault_session();
    let call = session.call("deposit").unwrap();
    let owner = Pubkey::new_unique();
    let other = Pubkey::new_unique();

    let values = flags(&["--amount", "1", "--owner-account", &other.to_string()]);
    let filled = fill_form(&session, call, &values, Some(&owner)).unwrap();
    let state = filled.form.current().unwrap();
    assert_eq!(state.accounts["owner"].address, other.to_string());
}

#[test]
fn argument_seeds_come_from_struct_fields() {
    let session = vault_session();
    let call = session.call("configure").unwrap();
    let admin = Pubkey::new_unique();
    let params = format!(
        r#"{{"fee_bps": 5, "mode": "Withdraw", "admins": ["{}"], "tag": "0x61626364"}}"#,
        admin
    );

    let filled = fill_form(&session, call, &flags(&["--params", &params]), Some(&admin)).unwrap();
    let expected = Pubkey::find_program_address(&[b"config", b"abcd"], &session.program_id()).0;
    assert_eq!(filled.derived, vec![("config".to_string(), expected)]);
}

#[test]
fn missing_seed_input_is_reported_not_fatal() {
    let session = vault_session();
    let call = session.call("configure").unwrap();

    let filled = fill_form(&session, call, &HashMap::new(), None).unwrap();
    assert!(filled.derived.is_empty());
    assert_eq!(filled.underived.len(), 1);
    assert_eq!(filled.underived[0].0, "config");
}

#[test]
fn unknown_flags_are_rejected() {
    let session = vault_session();
    let call = session.call("deposit").unwrap();
    let err = fill_form(&session, call, &flags(&["--amont", "1"]), None).unwrap_err();
    assert!(err.contains("--amont"));
}
