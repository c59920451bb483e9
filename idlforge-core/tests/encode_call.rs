//! Instruction data must match what a program's own borsh types produce.

use borsh::BorshSerialize;
use idlforge_core::error::EncodeError;
use idlforge_core::parse::coerce;
use idlforge_core::schema::Schema;
use idlforge_core::serialize::encode_call;
use idlforge_core::types::Value;
use serde_json::json;

const VAULT: &str = include_str!("fixtures/vault.json");

/// Mirrors of the fixture program's argument types.
mod program {
    use super::BorshSerialize;

    #[derive(BorshSerialize)]
    pub enum Mode {
        Deposit { amount: u64 },
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
    pub struct DepositArgs {
        pub amount: u64,
        pub memo: Option<String>,
    }
}

#[test]
fn initialize_is_just_the_discriminator() {
    let schema = Schema::from_json(VAULT).unwrap();
    let call = schema.call("initialize").unwrap();
    let data = encode_call(call, schema.types(), &[]).unwrap();
    assert_eq!(data, vec![175, 175, 109, 31, 13, 152, 155, 237]);
}

#[test]
fn deposit_matches_borsh() {
    let schema = Schema::from_json(VAULT).unwrap();
    let call = schema.call("deposit").unwrap();
    let args = vec![
        Value::U64(1_000),
        Value::Option(Some(Box::new(Value::String("rent".into())))),
    ];
    let data = encode_call(call, schema.types(), &args).unwrap();

    let mut expected = call.discriminator.to_vec();
    program::DepositArgs {
        amount: 1_000,
        memo: Some("rent".into()),
    }
    .serialize(&mut expected)
    .unwrap();
    assert_eq!(data, expected);
}

#[test]
fn nested_struct_and_enum_match_borsh() {
    let schema = Schema::from_json(VAULT).unwrap();
    let call = schema.call("configure").unwrap();
    let shape = schema.resolve_arg(call, "params").unwrap();
    let admin = [7u8; 32];
    let admin_b58 = solana_program::pubkey::Pubkey::new_from_array(admin).to_string();

    let cases = [
        (
            json!({ "fee_bps": "5", "mode": { "Deposit": { "amount": "77" } }, "admins": [admin_b58], "tag": "0x01020304" }),
            program::Config {
                fee_bps: 5,
                mode: program::Mode::Deposit { amount: 77 },
                admins: vec![admin],
                tag: [1, 2, 3, 4],
            },
        ),
        (
            json!({ "fee_bps": "0", "mode": "Withdraw", "admins": [], "tag": "00000000" }),
            program::Config {
                fee_bps: 0,
                mode: program::Mode::Withdraw,
                admins: vec![],
                tag: [0; 4],
            },
        ),
        (
            json!({ "fee_bps": "9", "mode": { "Lock": ["-1"] }, "admins": [], "tag": [9, 9, 9, 9] }),
            program::Config {
                fee_bps: 9,
                mode: program::Mode::Lock(-1),
                admins: vec![],
                tag: [9; 4],
            },
        ),
    ];

    for (raw, mirror) in cases {
        let value = coerce(&raw, &shape).unwrap();
        let data = encode_call(call, schema.types(), &[value]).unwrap();
        let mut expected = call.discriminator.to_vec();
        mirror.serialize(&mut expected).unwrap();
        assert_eq!(data, expected, "input {}", raw);
    }
}

#[test]
fn wrong_argument_count_is_rejected() {
    let schema = Schema::from_json(VAULT).unwrap();
    let call = schema.call("deposit").unwrap();
    assert_eq!(
        encode_call(call, schema.types(), &[Value::U64(1)]).unwrap_err(),
        EncodeError::ArgumentCount {
            expected: 2,
            actual: 1
        }
    );
}
