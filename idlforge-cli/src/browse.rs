//! Read-side views of a deployed program: its stored accounts, decoded
//! through the IDL, and its recent transaction history.

use idlforge_core::error::SchemaError;
use idlforge_core::parse::render;
use idlforge_core::resolve::resolve;
use idlforge_core::schema::{AccountType, Schema};
use idlforge_core::serialize::decode_prefix;
use idlforge_core::types::TypeRef;
use serde::Serialize;
use serde_json::Value as JsonValue;
use solana_sdk::pubkey::Pubkey;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedAccount {
    pub address: String,
    /// The account struct in the same text form the call flags accept.
    pub data: JsonValue,
}

/// Every account of one type owned by the program.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountPage {
    pub account_type: String,
    pub accounts: Vec<DecodedAccount>,
    /// Address and error for data that carries the type's discriminator
    /// but does not decode.
    pub undecodable: Vec<(String, String)>,
}

/// Pick out the accounts of `account` from raw program accounts and decode
/// them. Data with another discriminator belongs to another type and is
/// skipped.
pub fn decode_accounts(
    schema: &Schema,
    account: &AccountType,
    raw: &[(Pubkey, Vec<u8>)],
) -> Result<AccountPage, SchemaError> {
    let shape = resolve(&TypeRef::Named(account.name.clone()), schema.types())?;
    let mut page = AccountPage {
        account_type: account.name.clone(),
        accounts: Vec::new(),
        undecodable: Vec::new(),
    };
    for (address, data) in raw {
        let Some(body) = data.strip_prefix(&account.discriminator[..]) else {
            continue;
        };
        match decode_prefix(body, &shape) {
            Ok((value, _)) => page.accounts.push(DecodedAccount {
                address: address.to_string(),
                data: render(&value, &shape),
            }),
            Err(e) => {
                warn!(%address, account = %account.name, error = %e, "account data does not decode");
                page.undecodable.push((address.to_string(), e.to_string()));
            }
        }
    }
    debug!(
        account = %account.name,
        decoded = page.accounts.len(),
        failed = page.undecodable.len(),
        "accounts decoded"
    );
    Ok(page)
}

/// Resolve the account types to browse: one by name, or all of them.
pub fn select_account_types<'a>(schema: &'a Schema, name: Option<&str>) -> Result<Vec<&'a AccountType>, String> {
    if schema.accounts().is_empty() {
        return Err(format!("{} declares no account types", schema.name));
    }
    match name {
        None => Ok(schema.accounts().iter().collect()),
        Some(name) => schema.account_type(name).map(|a| vec![a]).ok_or_else(|| {
            let known: Vec<&str> = schema.accounts().iter().map(|a| a.name.as_str()).collect();
            format!("unknown account type '{}'; available: {}", name, known.join(", "))
        }),
    }
}

/// One signature from the program's history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TxRecord {
    pub signature: String,
    pub slot: u64,
    /// Unix seconds, when the node knows it.
    pub block_time: Option<i64>,
    pub error: Option<String>,
    pub memo: Option<String>,
}

impl TxRecord {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TxStats {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Percentage of successful transactions; 0 when there are none.
    pub success_rate: f64,
}

pub fn tx_stats(records: &[TxRecord]) -> TxStats {
    let total = records.len();
    let succeeded = records.iter().filter(|r| r.succeeded()).count();
    let success_rate = if total == 0 {
        0.0
    } else {
        succeeded as f64 * 100.0 / total as f64
    };
    TxStats {
        total,
        succeeded,
        failed: total - succeeded,
        success_rate,
    }
}
