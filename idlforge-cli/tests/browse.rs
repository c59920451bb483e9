//! Decoding fetched program accounts by type.

mod common;

use common::vault_session;
use idlforge_cli::browse::{decode_accounts, select_account_types};
use idlforge_core::parse::coerce;
use idlforge_core::resolve::resolve;
use idlforge_core::serialize::{account_discriminator, to_bytes};
use idlforge_core::types::TypeRef;
use serde_json::json;
use solana_sdk::pubkey::Pubkey;

fn stored_vault(owner: &Pubkey, balance: u64) -> Vec<u8> {
    let session = vault_session();
    let shape = resolve(&TypeRef::Named("Vault".into()), session.schema().types()).unwrap();
    let raw = json!({
        "owner": owner.to_string(),
        "balance": balance.to_string(),
        "config": { "fee_bps": "5", "mode": "Withdraw", "admins": [], "tag": "0x00000000" },
        "memo": null,
        "bump": "255",
    });
    let value = coerce(&raw, &shape).unwrap();
    let mut data = account_discriminator("Vault").to_vec();
    data.extend(to_bytes(&value, &shape).unwrap());
    data
}

#[test]
fn only_matching_discriminators_are_decoded() {
    let session = vault_session();
    let vault = session.schema().account_type("Vault").unwrap();
    let owner = Pubkey::new_unique();
    let good = Pubkey::new_unique();
    let foreign = Pubkey::new_unique();
    let broken = Pubkey::new_unique();

    let raw = vec![
        (good, stored_vault(&owner, 42)),
        (foreign, vec![9u8; 64]),
        (broken, account_discriminator("Vault")[..].iter().copied().chain([1, 2, 3]).collect()),
    ];
    let page = decode_accounts(session.schema(), vault, &raw).unwrap();

    assert_eq!(page.account_type, "Vault");
    assert_eq!(page.accounts.len(), 1);
    assert_eq!(page.accounts[0].address, good.to_string());
    assert_eq!(page.accounts[0].data["owner"], json!(owner.to_string()));
    assert_eq!(page.accounts[0].data["balance"], json!("42"));
    assert_eq!(page.undecodable.len(), 1);
    assert_eq!(page.undecodable[0].0, broken.to_string());
}

#[test]
fn account_types_are_selected_by_name() {
    let session = vault_session();
    let schema = session.schema();
    assert_eq!(select_account_types(schema, None).unwrap().len(), 1);
    assert_eq!(select_account_types(schema, Some("vault")).unwrap()[0].name, "Vault");
    let err = select_account_types(schema, Some("Pool")).unwrap_err();
    assert!(err.contains("available: Vault"));
}
