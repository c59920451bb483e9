//! IDL inspection: what a loaded program exposes.

use idlforge_core::resolve::resolve;
use idlforge_core::schema::{Schema, TypeBody};
use idlforge_core::session::Session;
use idlforge_core::types::TypeRef;
use serde::Serialize;

use crate::cli::type_hint;

#[derive(Debug, Serialize)]
pub struct IdlSummary<'a> {
    pub name: &'a str,
    pub version: &'a str,
    pub program_id: String,
    pub schema: &'a Schema,
}

pub fn summarize(session: &Session) -> IdlSummary<'_> {
    let schema = session.schema();
    IdlSummary {
        name: &schema.name,
        version: &schema.version,
        program_id: session.program_id().to_string(),
        schema,
    }
}

/// Print instructions, types and errors of the session's program.
pub fn print_idl(session: &Session) {
    let schema = session.schema();
    println!("📦 {} v{}", schema.name, schema.version);
    println!("   program id: {}", session.program_id());
    if schema.address.is_some_and(|a| a != session.program_id()) {
        println!("   ⚠️  overrides the IDL address {}", schema.address.map(|a| a.to_string()).unwrap_or_default());
    }
    println!();

    println!("INSTRUCTIONS ({}):", schema.calls().len());
    for call in schema.calls() {
        let disc: Vec<String> = call.discriminator.iter().map(|b| b.to_string()).collect();
        println!("  {} [{}]", call.name, disc.join(","));
        for arg in &call.args {
            println!("    arg  {}: {}", arg.name, arg.ty);
        }
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
            if acc.seeds.is_some() {
                flags.push("pda");
            }
            println!("    acct {} {}", acc.name, flags.join(" "));
        }
    }

    if !schema.types().is_empty() {
        println!();
        println!("TYPES ({}):", schema.types().len());
        for def in schema.types().iter() {
            let kind = match &def.body {
                TypeBody::Struct { .. } => "struct",
                TypeBody::Enum { .. } => "enum",
                TypeBody::Alias(_) => "alias",
            };
            let hint = resolve(&TypeRef::Named(def.name.clone()), schema.types())
                .map(|shape| type_hint(&shape))
                .unwrap_or_else(|e| e.to_string());
            println!("  {} {} — {}", kind, def.name, hint);
        }
    }

    if !schema.accounts().is_empty() {
        println!();
        println!("ACCOUNTS ({}):", schema.accounts().len());
        for account in schema.accounts() {
            let disc: Vec<String> = account.discriminator.iter().map(|b| b.to_string()).collect();
            println!("  {} [{}]", account.name, disc.join(","));
        }
    }

    if !schema.errors().is_empty() {
        println!();
        println!("ERRORS ({}):", schema.errors().len());
        for err in schema.errors() {
            println!("  {} {}  {}", err.code, err.name, err.msg.as_deref().unwrap_or(""));
        }
    }
}
