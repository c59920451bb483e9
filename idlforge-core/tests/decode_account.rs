//! Reading stored account data back through the schema's types.

use borsh::BorshSerialize;
use idlforge_core::error::{DecodeError, SchemaError};
use idlforge_core::parse::{coerce, render};
use idlforge_core::resolve::resolve;
use idlforge_core::schema::Schema;
use idlforge_core::serialize::{account_discriminator, decode, decode_account, to_bytes};
use idlforge_core::types::{PrimitiveKind, ResolvedShape, TypeRef, Value};
use serde_json::json;
use solana_program::pubkey::Pubkey;

const VAULT: &str = include_str!("fixtures/vault.json");
const ESCROW: &str = include_str!("fixtures/legacy_escrow.json");

/// What the fixture program writes into a vault account.
mod program {
    use super::BorshSerialize;

    #[derive(BorshSerialize)]
    pub enum Mode {
        #[allow(dead_code)]
        Deposit { amount: u64 },
        #[allow(dead_code)]
        Withdraw,
        Lock(i64),
    }

    #[derive(BorshSerialize)]
    pub struct Config {
        pub fee_bps: u16,
        pub mode: Mode,
        pub admins: Vec<[u8; 32]>,
        pub tag: [u8; 4],
    }

    #[derive(BorshSerialize)]
    pub struct Vault {
        pub owner: [u8; 32],
        pub balance: u64,
        pub config: Config,
        pub memo: Option<String>,
        pub bump: u8,
    }
}

fn field<'a>(value: &'a Value, name: &str) -> &'a Value {
    match value {
        Value::Struct(fields) => &fields.iter().find(|(n, _)| n == name).unwrap().1,
        other => panic!("not a struct: {:?}", other),
    }
}

fn stored_vault(owner: Pubkey, admin: Pubkey) -> Vec<u8> {
    let vault = program::Vault {
        owner: owner.to_bytes(),
        balance: 1_500,
        config: program::Config {
            fee_bps: 30,
            mode: program::Mode::Lock(-7),
            admins: vec![admin.to_bytes()],
            tag: *b"main",
        },
        memo: Some("rent".into()),
        bump: 254,
    };
    let mut data = account_discriminator("Vault").to_vec();
    vault.serialize(&mut data).unwrap();
    // allocated space is larger than the struct
    data.extend_from_slice(&[0u8; 16]);
    data
}

#[test]
fn account_written_by_the_program_decodes() {
    let schema = Schema::from_json(VAULT).unwrap();
    let vault = schema.account_type("Vault").unwrap();
    assert_eq!(vault.discriminator, account_discriminator("Vault"));

    let owner = Pubkey::new_unique();
    let admin = Pubkey::new_unique();
    let value = decode_account(&stored_vault(owner, admin), vault, schema.types()).unwrap();

    assert_eq!(field(&value, "owner"), &Value::Pubkey(owner));
    assert_eq!(field(&value, "balance"), &Value::U64(1_500));
    assert_eq!(field(&value, "bump"), &Value::U8(254));
    let config = field(&value, "config");
    assert_eq!(field(config, "fee_bps"), &Value::U16(30));
    assert!(matches!(field(config, "mode"), Value::Enum { variant, index: 2, .. } if variant == "Lock"));

    let shape = resolve(&TypeRef::Named("Vault".into()), schema.types()).unwrap();
    let rendered = render(&value, &shape);
    assert_eq!(rendered["balance"], json!("1500"));
    assert_eq!(rendered["memo"], json!("rent"));
    assert_eq!(rendered["config"]["tag"], json!("0x6d61696e"));
    assert_eq!(rendered["config"]["admins"][0], json!(admin.to_string()));
}

#[test]
fn other_account_types_are_refused() {
    let schema = Schema::from_json(VAULT).unwrap();
    let vault = schema.account_type("vault").unwrap();
    let mut data = stored_vault(Pubkey::new_unique(), Pubkey::new_unique());
    data[..8].copy_from_slice(&account_discriminator("Offer"));

    let err = decode_account(&data, vault, schema.types()).unwrap_err();
    assert!(matches!(err, DecodeError::Discriminator { .. }));
    assert!(err.to_string().contains("d308e82b02987577"));
}

#[test]
fn short_account_data_is_truncated() {
    let schema = Schema::from_json(VAULT).unwrap();
    let vault = schema.account_type("Vault").unwrap();
    let data = stored_vault(Pubkey::new_unique(), Pubkey::new_unique());

    assert!(matches!(
        decode_account(&data[..4], vault, schema.types()),
        Err(DecodeError::Truncated { what: "discriminator", needed: 4, .. })
    ));
    assert!(matches!(
        decode_account(&data[..8 + 40], vault, schema.types()),
        Err(DecodeError::Truncated { offset: 48, .. })
    ));
}

#[test]
fn coerced_config_survives_encode_then_decode() {
    let schema = Schema::from_json(VAULT).unwrap();
    let configure = schema.call("configure").unwrap();
    let shape = schema.resolve_arg(configure, "params").unwrap();

    let admin = Pubkey::new_unique();
    for mode in [json!({ "Deposit": { "amount": "9" } }), json!("Withdraw"), json!({ "Lock": ["-3"] })] {
        let raw = json!({ "fee_bps": "25", "mode": mode, "admins": [admin.to_string()], "tag": "0x01020304" });
        let value = coerce(&raw, &shape).unwrap();
        let bytes = to_bytes(&value, &shape).unwrap();
        assert_eq!(decode(&bytes, &shape).unwrap(), value);
    }
}

#[test]
fn maps_and_floats_decode_in_wire_order() {
    let shape = ResolvedShape::Map(
        Box::new(ResolvedShape::Primitive(PrimitiveKind::String)),
        Box::new(ResolvedShape::Primitive(PrimitiveKind::F64)),
    );
    let value = coerce(&json!({ "b": "2.5", "a": "-1" }), &shape).unwrap();
    let bytes = to_bytes(&value, &shape).unwrap();
    let decoded = decode(&bytes, &shape).unwrap();
    assert_eq!(decoded, value);
    let Value::Map(entries) = decoded else { panic!("not a map") };
    assert_eq!(entries[0].0, Value::String("a".into()));
}

#[test]
fn bad_tags_and_text_are_rejected() {
    let flag = ResolvedShape::Primitive(PrimitiveKind::Bool);
    assert!(matches!(decode(&[2], &flag), Err(DecodeError::InvalidTag { what: "bool", .. })));

    let text = ResolvedShape::Primitive(PrimitiveKind::String);
    assert!(matches!(
        decode(&[2, 0, 0, 0, 0xff, 0xfe], &text),
        Err(DecodeError::Invalid { what: "string", offset: 4, .. })
    ));

    let schema = Schema::from_json(VAULT).unwrap();
    let mode = resolve(&TypeRef::Named("Mode".into()), schema.types()).unwrap();
    assert!(matches!(decode(&[3], &mode), Err(DecodeError::InvalidTag { what: "enum", tag: 3, .. })));
}

#[test]
fn legacy_accounts_get_computed_discriminators() {
    let schema = Schema::from_json(ESCROW).unwrap();
    let offer = schema.account_type("Offer").unwrap();
    assert_eq!(offer.discriminator, [215, 88, 60, 71, 170, 162, 73, 229]);
    assert_eq!(schema.accounts().len(), 1);
}

#[test]
fn account_without_a_layout_is_a_schema_error() {
    let json = r#"{
        "address": "11111111111111111111111111111111",
        "metadata": { "name": "ghost", "version": "0.1.0" },
        "instructions": [],
        "accounts": [ { "name": "Ghost", "discriminator": [1, 2, 3, 4, 5, 6, 7, 8] } ]
    }"#;
    assert!(matches!(Schema::from_json(json), Err(SchemaError::InvalidIdl(_))));
}
