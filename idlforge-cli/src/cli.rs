//! CLI helpers: instruction help, argument parsing, form filling.

use std::collections::HashMap;

use idlforge_core::error::DerivationError;
use idlforge_core::form::FormState;
use idlforge_core::pda::derive_account;
use idlforge_core::schema::{to_snake_case, CallDefinition, Schema};
use idlforge_core::session::Session;
use idlforge_core::types::{PrimitiveKind, ResolvedShape};
use serde_json::Value as JsonValue;
use solana_sdk::pubkey::Pubkey;
use tracing::debug;

/// Flags accepted after the instruction name that are not call inputs.
const RESERVED_FLAGS: &[&str] = &["help", "h", "dry-run"];

/// Print every instruction with its flags.
pub fn print_help(schema: &Schema, binary_name: &str) {
    println!("🔧 {} v{} — IDL-driven calls", schema.name, schema.version);
    println!();
    println!("USAGE:");
    println!("  {} call <INSTRUCTION> [--<ARG> <VALUE>]... [--<ACCOUNT>-account <ADDRESS>]...", binary_name);
    println!();
    println!("INSTRUCTIONS:");
    for call in schema.calls() {
        let args: Vec<String> = call
            .args
            .iter()
            .map(|a| {
                let hint = schema
                    .resolve_arg(call, &a.name)
                    .map(|shape| type_hint(&shape))
                    .unwrap_or_else(|_| a.ty.to_string());
                format!("--{} <{}>", flag_name(&a.name), hint)
            })
            .collect();
        let accounts: Vec<String> = call
            .accounts
            .iter()
            .filter(|a| a.seeds.is_none() && a.address.is_none() && !a.signer)
            .map(|a| format!("--{}-account <BASE58>", flag_name(&a.name)))
            .collect();
        let all: Vec<String> = args.into_iter().chain(accounts).collect();
        println!("  {:<20} {}", flag_name(&call.name), all.join(" "));
    }
    println!();
    println!("TYPE FORMATS:");
    println!("  u8..u128, i8..i128    Decimal number (0x-prefixed hex accepted)");
    println!("  bytes, Vec<u8>        0x-prefixed hex or a byte list");
    println!("  [u8; N]               Hex string, 0x prefix optional");
    println!("  pubkey                Base58 address");
    println!("  Vec<T>, [T; N]        Comma-separated or JSON array");
    println!("  structs, enums        JSON object; unit variants by name");
    println!();
    println!("Signer accounts default to the keypair. Accounts with seeds are derived automatically.");
}

/// Print detailed help for a single instruction.
pub fn print_instruction_help(schema: &Schema, call: &CallDefinition) {
    println!("📋 {} — {} account(s), {} arg(s)", call.name, call.accounts.len(), call.args.len());
    for line in &call.docs {
        println!("   {}", line);
    }
    println!();
    println!("ACCOUNTS:");
    for acc in &call.accounts {
        let mut flags = vec![];
        if acc.writable {
            flags.push("mut");
        }
        if acc.signer {
            flags.push("signer");
        }
        if acc.optional {
            flags.push("optional");
        }
        let flags_str = if flags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", flags.join(", "))
        };
        let note = if let Some(template) = &acc.seeds {
            let seeds: Vec<String> = template.seeds.iter().map(ToString::to_string).collect();
            format!(" (PDA: {})", seeds.join(", "))
        } else if let Some(address) = &acc.address {
            format!(" (fixed: {})", address)
        } else {
            String::new()
        };
        println!("  --{}-account{}{}", flag_name(&acc.name), flags_str, note);
    }
    println!();
    println!("ARGS:");
    for arg in &call.args {
        let hint = schema
            .resolve_arg(call, &arg.name)
            .map(|shape| type_hint(&shape))
            .unwrap_or_else(|e| format!("unresolvable: {}", e));
        println!("  --{:<25} {} ({}) — format: {}", flag_name(&arg.name), arg.name, arg.ty, hint);
    }
}

/// Parse `--key value` pairs. A flag with no value becomes `"true"`.
pub fn parse_instruction_args(args: &[String]) -> Result<HashMap<String, String>, String> {
    let mut map = HashMap::new();
    let mut i = 0;
    while i < args.len() {
        let Some(key) = args[i].strip_prefix("--") else {
            return Err(format!("unexpected argument '{}'; expected --<name> <value>", args[i]));
        };
        if i + 1 < args.len() && !args[i + 1].starts_with("--") {
            map.insert(key.to_string(), args[i + 1].clone());
            i += 2;
        } else {
            map.insert(key.to_string(), "true".to_string());
            i += 1;
        }
    }
    Ok(map)
}

pub fn wants_help(values: &HashMap<String, String>) -> bool {
    values.contains_key("help") || values.contains_key("h")
}

/// The result of filling a form from command-line values.
#[derive(Debug)]
pub struct FilledForm {
    pub form: FormState,
    pub derived: Vec<(String, Pubkey)>,
    /// Seeded accounts that could not be derived, with the reason.
    pub underived: Vec<(String, DerivationError)>,
}

/// Select `call` and copy `values` into the form, fill signer slots with
/// `signer`, then derive every seeded account left empty.
///
/// Derivation repeats while it makes progress, so a PDA seeded by another
/// PDA resolves regardless of declaration order.
pub fn fill_form(
    session: &Session,
    call: &CallDefinition,
    values: &HashMap<String, String>,
    signer: Option<&Pubkey>,
) -> Result<FilledForm, String> {
    let mut form = FormState::new();
    form.select(call);

    for (key, value) in values {
        if RESERVED_FLAGS.contains(&key.as_str()) {
            continue;
        }
        if let Some(arg) = call.args.iter().find(|a| flag_name(&a.name) == *key) {
            form.set_argument(&arg.name, JsonValue::String(value.clone()))
                .map_err(|e| e.to_string())?;
        } else if let Some(acc) = key
            .strip_suffix("-account")
            .and_then(|flag| call.accounts.iter().find(|a| flag_name(&a.name) == flag))
        {
            form.set_account(&acc.name, value.clone()).map_err(|e| e.to_string())?;
        } else {
            return Err(format!("unknown option --{} for '{}'", key, call.name));
        }
    }

    if let Some(signer) = signer {
        let filled = form.fill_signers(call, signer).map_err(|e| e.to_string())?;
        debug!(filled, %signer, "signer slots filled");
    }

    let mut pending: Vec<&str> = call
        .accounts
        .iter()
        .filter(|a| a.seeds.is_some())
        .filter(|a| {
            form.current()
                .and_then(|s| s.accounts.get(&a.name))
                .map_or(false, |input| input.is_empty())
        })
        .map(|a| a.name.as_str())
        .collect();
    let mut derived = Vec::new();
    let mut underived = Vec::new();
    loop {
        underived.clear();
        let before = pending.len();
        let mut still = Vec::new();
        for name in pending {
            match derive_account(session, &mut form, name) {
                Ok(address) => derived.push((name.to_string(), address)),
                Err(e) => {
                    underived.push((name.to_string(), e));
                    still.push(name);
                }
            }
        }
        pending = still;
        if pending.is_empty() || pending.len() == before {
            break;
        }
    }

    Ok(FilledForm { form, derived, underived })
}

// ─── String utilities ────────────────────────────────────────────

pub fn snake_to_kebab(s: &str) -> String {
    s.replace('_', "-")
}

/// Command-line spelling of an IDL name: `tokens.tokenProgram` → `tokens-token-program`.
pub fn flag_name(name: &str) -> String {
    snake_to_kebab(&to_snake_case(name)).replace('.', "-")
}

/// Short input format for a resolved type.
pub fn type_hint(shape: &ResolvedShape) -> String {
    match shape {
        ResolvedShape::Primitive(p) => match p {
            p if p.is_integer() => "NUMBER".to_string(),
            PrimitiveKind::F32 | PrimitiveKind::F64 => "DECIMAL".to_string(),
            PrimitiveKind::Bool => "true|false".to_string(),
            PrimitiveKind::String => "TEXT".to_string(),
            PrimitiveKind::Bytes => "HEX".to_string(),
            PrimitiveKind::Pubkey => "BASE58".to_string(),
            other => other.to_string().to_uppercase(),
        },
        ResolvedShape::Array(_, len) if shape.is_byte_sequence() => format!("HEX{}", len * 2),
        ResolvedShape::Vec(_) if shape.is_byte_sequence() => "HEX".to_string(),
        ResolvedShape::Vec(inner) => format!("LIST<{}>", type_hint(inner)),
        ResolvedShape::Array(inner, len) => format!("[{}; {}]", type_hint(inner), len),
        ResolvedShape::Option(inner) => format!("OPT<{}>", type_hint(inner)),
        ResolvedShape::Map(k, v) => format!("MAP<{}, {}>", type_hint(k), type_hint(v)),
        ResolvedShape::Struct { name, .. } => format!("JSON {}", name),
        ResolvedShape::Enum { variants, .. } => {
            let names: Vec<&str> = variants.iter().map(|v| v.name.as_str()).collect();
            names.join("|")
        }
    }
}
