//! Coercing raw form input against resolved shapes, and rendering it back.

use idlforge_core::error::CoercionErrorKind;
use idlforge_core::parse::{coerce, coerce_str, render};
use idlforge_core::schema::Schema;
use idlforge_core::types::{PrimitiveKind, ResolvedField, ResolvedShape, ResolvedVariant, Value};
use serde_json::json;
use solana_program::pubkey::Pubkey;

const VAULT: &str = include_str!("fixtures/vault.json");

fn owner_amount() -> ResolvedShape {
    ResolvedShape::Struct {
        name: "Transfer".into(),
        fields: vec![
            ResolvedField {
                name: "owner".into(),
                shape: ResolvedShape::Primitive(PrimitiveKind::Pubkey),
            },
            ResolvedField {
                name: "amount".into(),
                shape: ResolvedShape::Primitive(PrimitiveKind::U64),
            },
        ],
        tuple: false,
    }
}

fn deposit_or_withdraw() -> ResolvedShape {
    ResolvedShape::Enum {
        name: "Action".into(),
        variants: vec![
            ResolvedVariant {
                name: "Deposit".into(),
                index: 0,
                fields: vec![ResolvedField {
                    name: "amount".into(),
                    shape: ResolvedShape::Primitive(PrimitiveKind::U64),
                }],
                tuple: false,
            },
            ResolvedVariant {
                name: "Withdraw".into(),
                index: 1,
                fields: vec![],
                tuple: false,
            },
        ],
    }
}

fn config_shape() -> ResolvedShape {
    let schema = Schema::from_json(VAULT).unwrap();
    let configure = schema.call("configure").unwrap();
    schema.resolve_arg(configure, "params").unwrap()
}

#[test]
fn empty_owner_fails_while_amount_coerces() {
    let errors = coerce(&json!({ "owner": "", "amount": "100" }), &owner_amount()).unwrap_err();
    assert_eq!(errors.len(), 1);
    let owner = errors.at("owner").unwrap();
    assert!(matches!(
        owner.kind,
        CoercionErrorKind::InvalidLength | CoercionErrorKind::InvalidFormat
    ));
    assert!(errors.at("amount").is_none());
}

#[test]
fn every_bad_field_is_reported() {
    let errors = coerce(&json!({ "owner": "not!base58", "amount": "-3" }), &owner_amount()).unwrap_err();
    assert_eq!(errors.at("owner").unwrap().kind, CoercionErrorKind::InvalidFormat);
    assert_eq!(errors.at("amount").unwrap().kind, CoercionErrorKind::OutOfRange);
}

#[test]
fn missing_field_is_an_error_but_extra_keys_are_ignored() {
    let errors = coerce(&json!({ "amount": "1", "note": "hi" }), &owner_amount()).unwrap_err();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors.at("owner").unwrap().kind, CoercionErrorKind::InvalidFormat);
}

#[test]
fn unit_variant_ignores_payload() {
    let shape = deposit_or_withdraw();
    let expected = Value::Enum {
        variant: "Withdraw".into(),
        index: 1,
        fields: vec![],
    };
    assert_eq!(coerce_str("Withdraw", &shape).unwrap(), expected);
    assert_eq!(
        coerce(&json!({ "Withdraw": { "amount": "nonsense" } }), &shape).unwrap(),
        expected
    );
}

#[test]
fn fielded_variant_coerces_its_payload() {
    let shape = deposit_or_withdraw();
    let value = coerce(&json!({ "deposit": { "amount": "9" } }), &shape).unwrap();
    assert_eq!(
        value,
        Value::Enum {
            variant: "Deposit".into(),
            index: 0,
            fields: vec![("amount".into(), Value::U64(9))],
        }
    );
    let errors = coerce(&json!({ "Deposit": {} }), &shape).unwrap_err();
    assert!(errors.at("Deposit.amount").is_some());
}

#[test]
fn unknown_tag_is_unknown_variant() {
    let errors = coerce_str("Borrow", &deposit_or_withdraw()).unwrap_err();
    assert_eq!(errors.0[0].kind, CoercionErrorKind::UnknownVariant);
}

#[test]
fn nested_errors_carry_full_paths() {
    let raw = json!({
        "fee_bps": "70000",
        "mode": "Withdraw",
        "admins": [Pubkey::new_unique().to_string(), "bad"],
        "tag": "0x0102"
    });
    let errors = coerce(&raw, &config_shape()).unwrap_err();
    assert_eq!(errors.len(), 3);
    assert_eq!(errors.at("fee_bps").unwrap().kind, CoercionErrorKind::OutOfRange);
    assert!(errors.at("admins[1]").is_some());
    assert_eq!(errors.at("tag").unwrap().kind, CoercionErrorKind::InvalidLength);
}

#[test]
fn struct_accepts_json_text() {
    let admin = Pubkey::new_unique();
    let text = format!(
        r#"{{"fee_bps": 25, "mode": {{"Lock": ["-5"]}}, "admins": ["{}"], "tag": "deadbeef"}}"#,
        admin
    );
    let value = coerce_str(&text, &config_shape()).unwrap();
    assert_eq!(value.field("fee_bps"), Some(&Value::U16(25)));
    assert_eq!(
        value.field("mode"),
        Some(&Value::Enum {
            variant: "Lock".into(),
            index: 2,
            fields: vec![("0".into(), Value::I64(-5))],
        })
    );
    assert_eq!(value.field("admins"), Some(&Value::Vec(vec![Value::Pubkey(admin)])));
}

#[test]
fn render_then_coerce_is_stable() {
    let shape = config_shape();
    let inputs = [
        json!({
            "fee_bps": "30",
            "mode": { "Deposit": { "amount": "18446744073709551615" } },
            "admins": [],
            "tag": "0x00ff10aa"
        }),
        json!({
            "fee_bps": 0,
            "mode": "withdraw",
            "admins": format!("{},{}", Pubkey::new_unique(), Pubkey::new_unique()),
            "tag": [1, 2, 3, 4]
        }),
        json!({
            "fee_bps": "65535",
            "mode": { "Lock": "-9223372036854775808" },
            "admins": [Pubkey::new_unique().to_string()],
            "tag": "cafebabe"
        }),
    ];
    for raw in inputs {
        let first = coerce(&raw, &shape).unwrap();
        let again = coerce(&render(&first, &shape), &shape).unwrap();
        assert_eq!(first, again, "raw input {}", raw);
    }
}

#[test]
fn render_round_trips_options_maps_and_floats() {
    let shape = ResolvedShape::Map(
        Box::new(ResolvedShape::Primitive(PrimitiveKind::String)),
        Box::new(ResolvedShape::Option(Box::new(ResolvedShape::Primitive(PrimitiveKind::F32)))),
    );
    let raw = json!({ "b": "1.25", "a": null });
    let first = coerce(&raw, &shape).unwrap();
    let rendered = render(&first, &shape);
    assert_eq!(rendered, json!([["a", null], ["b", "1.25"]]));
    assert_eq!(coerce(&rendered, &shape).unwrap(), first);

    let f32_shape = ResolvedShape::Primitive(PrimitiveKind::F32);
    for edge in [f32::MAX, f32::MIN, f32::MIN_POSITIVE] {
        let value = coerce_str(&edge.to_string(), &f32_shape).unwrap();
        assert_eq!(value, Value::F32(edge));
        let again = coerce(&render(&value, &f32_shape), &f32_shape).unwrap();
        assert_eq!(again, value);
    }
    let exact_max = coerce_str("340282346638528859811704183484516925440", &f32_shape).unwrap();
    assert_eq!(coerce(&render(&exact_max, &f32_shape), &f32_shape).unwrap(), exact_max);
    let too_big = coerce_str("1e39", &f32_shape).unwrap_err();
    assert_eq!(too_big.0[0].kind, CoercionErrorKind::OutOfRange);
}

#[test]
fn integers_accept_hex_text() {
    let u64_shape = ResolvedShape::Primitive(PrimitiveKind::U64);
    assert_eq!(coerce_str("0x10", &u64_shape).unwrap(), Value::U64(16));
    assert_eq!(coerce_str("0XfF", &u64_shape).unwrap(), Value::U64(255));
    assert_eq!(
        coerce_str("-0x80", &ResolvedShape::Primitive(PrimitiveKind::I8)).unwrap(),
        Value::I8(-128)
    );
    assert_eq!(
        coerce_str("0x100", &ResolvedShape::Primitive(PrimitiveKind::U8)).unwrap_err().0[0].kind,
        CoercionErrorKind::OutOfRange
    );
    assert_eq!(coerce_str("0x", &u64_shape).unwrap_err().0[0].kind, CoercionErrorKind::InvalidFormat);
    assert_eq!(coerce_str("0xzz", &u64_shape).unwrap_err().0[0].kind, CoercionErrorKind::InvalidFormat);
}

#[test]
fn bare_hex_is_only_for_fixed_byte_arrays() {
    let bytes = ResolvedShape::Primitive(PrimitiveKind::Bytes);
    assert_eq!(coerce_str("0xdeadbeef", &bytes).unwrap(), Value::Bytes(vec![0xde, 0xad, 0xbe, 0xef]));
    assert!(coerce_str("deadbeef", &bytes).is_err());

    let tag = ResolvedShape::Array(Box::new(ResolvedShape::Primitive(PrimitiveKind::U8)), 4);
    let expected = Value::Array([0xde, 0xad, 0xbe, 0xef].into_iter().map(Value::U8).collect());
    assert_eq!(coerce_str("deadbeef", &tag).unwrap(), expected);
    assert_eq!(coerce_str("0xdeadbeef", &tag).unwrap(), expected);
}
