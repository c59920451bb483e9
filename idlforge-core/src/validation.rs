//! Submittability checks for a composed call.
//!
//! Pure and cheap enough to run on every edit: nothing here touches the
//! network or mutates the form.

use std::fmt;

use serde::Serialize;

use crate::error::CoercionErrors;
use crate::form::CallInputState;
use crate::hex::decode_bytes_32;
use crate::parse::{coerce, is_empty_input};
use crate::resolve::resolve;
use crate::schema::{CallDefinition, TypeRegistry};

/// Everything that keeps a call from being submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub missing_arguments: Vec<String>,
    /// Argument name with the errors its input produced.
    pub invalid_arguments: Vec<(String, CoercionErrors)>,
    pub missing_accounts: Vec<String>,
    pub invalid_accounts: Vec<String>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.missing_arguments.is_empty()
            && self.invalid_arguments.is_empty()
            && self.missing_accounts.is_empty()
            && self.invalid_accounts.is_empty()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if !self.missing_arguments.is_empty() {
            parts.push(format!("missing arguments: {}", self.missing_arguments.join(", ")));
        }
        for (name, errors) in &self.invalid_arguments {
            parts.push(format!("invalid argument {}: {}", name, errors));
        }
        if !self.missing_accounts.is_empty() {
            parts.push(format!("missing accounts: {}", self.missing_accounts.join(", ")));
        }
        if !self.invalid_accounts.is_empty() {
            parts.push(format!("invalid account addresses: {}", self.invalid_accounts.join(", ")));
        }
        if parts.is_empty() {
            return f.write_str("ok");
        }
        f.write_str(&parts.join("; "))
    }
}

/// Check every argument and account of `call` against `state`.
///
/// Arguments must be non-empty and coerce cleanly, except option-typed ones
/// which may be empty. Required accounts need an address, either entered or
/// fixed by the schema; a seed list that was never derived does not count.
/// An address entered for a required account must decode to 32 bytes. An
/// optional account whose text does not decode is treated as left empty.
pub fn check(registry: &TypeRegistry, call: &CallDefinition, state: &CallInputState) -> ValidationReport {
    let mut report = ValidationReport::default();

    for arg in &call.args {
        let shape = match resolve(&arg.ty, registry) {
            Ok(shape) => shape,
            Err(e) => {
                report.invalid_arguments.push((arg.name.clone(), schema_failure(e.to_string())));
                continue;
            }
        };
        let raw = state.args.get(&arg.name);
        let empty = raw.map(is_empty_input).unwrap_or(true);
        if empty && !shape.is_option() {
            report.missing_arguments.push(arg.name.clone());
            continue;
        }
        let null = serde_json::Value::Null;
        if let Err(errors) = coerce(raw.unwrap_or(&null), &shape) {
            report.invalid_arguments.push((arg.name.clone(), errors));
        }
    }

    for account in &call.accounts {
        let entered = state
            .accounts
            .get(&account.name)
            .map(|input| input.address.trim())
            .filter(|a| !a.is_empty());
        match entered {
            Some(text) if account.is_required() => {
                if decode_bytes_32(text).is_err() {
                    report.invalid_accounts.push(account.name.clone());
                }
            }
            Some(_) => {}
            None if account.is_required() && account.address.is_none() => {
                report.missing_accounts.push(account.name.clone());
            }
            None => {}
        }
    }

    report
}

/// True when `call` can be submitted with `state` as it stands.
pub fn is_submittable(registry: &TypeRegistry, call: &CallDefinition, state: &CallInputState) -> bool {
    check(registry, call, state).is_ok()
}

fn schema_failure(message: String) -> CoercionErrors {
    use crate::error::{CoercionError, CoercionErrorKind, FieldPath};
    CoercionErrors(vec![CoercionError {
        path: FieldPath::root(),
        kind: CoercionErrorKind::InvalidFormat,
        message,
    }])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::CallDefinition;

    #[test]
    fn call_without_inputs_is_always_submittable() {
        let call = CallDefinition {
            name: "ping".into(),
            docs: vec![],
            discriminator: [0; 8],
            args: vec![],
            accounts: vec![],
        };
        let state = CallInputState::empty(&call);
        assert!(is_submittable(&TypeRegistry::new(), &call, &state));
        assert_eq!(check(&TypeRegistry::new(), &call, &state).to_string(), "ok");
    }

    #[test]
    fn garbage_in_an_optional_slot_does_not_block() {
        use crate::schema::AccountSpec;

        let call = CallDefinition {
            name: "poke".into(),
            docs: vec![],
            discriminator: [0; 8],
            args: vec![],
            accounts: vec![AccountSpec {
                name: "referrer".into(),
                writable: false,
                signer: false,
                optional: true,
                address: None,
                seeds: None,
            }],
        };
        let mut state = CallInputState::empty(&call);
        if let Some(input) = state.accounts.get_mut("referrer") {
            input.address = "not-an-address".into();
        }
        assert!(is_submittable(&TypeRegistry::new(), &call, &state));
    }
}
