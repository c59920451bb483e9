//! Raw input cache for the instruction being composed.
//!
//! [`FormState`] is the single writer for the selected call's input. It
//! stores raw values only; coercion happens when the validator or the
//! executor reads them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use solana_program::pubkey::Pubkey;

use crate::error::FormError;
use crate::pda::{SeedComponent, SeedKind};
use crate::schema::CallDefinition;

/// Raw input for one account slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInput {
    /// Address text as entered or as last derived.
    pub address: String,
    /// Seed list for derived accounts; empty otherwise.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub seeds: Vec<SeedComponent>,
}

impl AccountInput {
    pub fn is_empty(&self) -> bool {
        self.address.trim().is_empty()
    }
}

/// Raw input for one call: exactly one entry per declared argument and account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallInputState {
    pub call: String,
    pub args: BTreeMap<String, JsonValue>,
    pub accounts: BTreeMap<String, AccountInput>,
}

impl CallInputState {
    /// Fresh state: empty arguments, empty addresses, seed templates copied in.
    pub fn empty(call: &CallDefinition) -> Self {
        let args = call
            .args
            .iter()
            .map(|a| (a.name.clone(), JsonValue::String(String::new())))
            .collect();
        let accounts = call
            .accounts
            .iter()
            .map(|a| {
                let seeds = a.seeds.as_ref().map(|t| t.seeds.clone()).unwrap_or_default();
                (a.name.clone(), AccountInput { address: String::new(), seeds })
            })
            .collect();
        Self {
            call: call.name.clone(),
            args,
            accounts,
        }
    }

    /// State seeded from saved values. Keys the call does not declare are
    /// dropped and missing ones start empty.
    pub fn from_values(
        call: &CallDefinition,
        args: &BTreeMap<String, JsonValue>,
        accounts: &BTreeMap<String, String>,
    ) -> Self {
        let mut state = Self::empty(call);
        for (name, slot) in state.args.iter_mut() {
            if let Some(v) = args.get(name) {
                *slot = v.clone();
            }
        }
        for (name, slot) in state.accounts.iter_mut() {
            if let Some(v) = accounts.get(name) {
                slot.address = v.clone();
            }
        }
        state
    }

    /// Account addresses as plain text, for saving.
    pub fn account_addresses(&self) -> BTreeMap<String, String> {
        self.accounts
            .iter()
            .map(|(name, input)| (name.clone(), input.address.clone()))
            .collect()
    }
}

/// Holds the input for at most one selected call.
#[derive(Debug, Clone, Default)]
pub struct FormState {
    state: Option<CallInputState>,
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&CallInputState> {
        self.state.as_ref()
    }

    pub fn selected(&self) -> Option<&str> {
        self.state.as_ref().map(|s| s.call.as_str())
    }

    /// Select `call`. Switching to a different call replaces the whole
    /// state; reselecting the current call keeps what was entered.
    pub fn select(&mut self, call: &CallDefinition) {
        if self.selected() != Some(call.name.as_str()) {
            self.state = Some(CallInputState::empty(call));
        }
    }

    /// Replace the state wholesale, e.g. from a saved test case.
    pub fn load(&mut self, state: CallInputState) {
        self.state = Some(state);
    }

    pub fn clear(&mut self) {
        self.state = None;
    }

    fn state_mut(&mut self) -> Result<&mut CallInputState, FormError> {
        self.state.as_mut().ok_or(FormError::NoCallSelected)
    }

    fn account_mut(&mut self, name: &str) -> Result<&mut AccountInput, FormError> {
        self.state_mut()?
            .accounts
            .get_mut(name)
            .ok_or_else(|| FormError::UnknownAccount(name.to_string()))
    }

    pub fn set_argument(&mut self, name: &str, raw: impl Into<JsonValue>) -> Result<(), FormError> {
        let slot = self
            .state_mut()?
            .args
            .get_mut(name)
            .ok_or_else(|| FormError::UnknownArgument(name.to_string()))?;
        *slot = raw.into();
        Ok(())
    }

    /// Overwrite an account's address. Its seed list is left alone.
    pub fn set_account(&mut self, name: &str, raw: impl Into<String>) -> Result<(), FormError> {
        self.account_mut(name)?.address = raw.into();
        Ok(())
    }

    /// Put `signer` into every signer slot that is still empty.
    pub fn fill_signers(&mut self, call: &CallDefinition, signer: &Pubkey) -> Result<usize, FormError> {
        let state = self.state_mut()?;
        let mut filled = 0;
        for spec in call.accounts.iter().filter(|a| a.signer) {
            if let Some(input) = state.accounts.get_mut(&spec.name) {
                if input.is_empty() {
                    input.address = signer.to_string();
                    filled += 1;
                }
            }
        }
        Ok(filled)
    }

    pub fn seeds(&self, account: &str) -> Result<&[SeedComponent], FormError> {
        let state = self.state.as_ref().ok_or(FormError::NoCallSelected)?;
        state
            .accounts
            .get(account)
            .map(|a| a.seeds.as_slice())
            .ok_or_else(|| FormError::UnknownAccount(account.to_string()))
    }

    pub fn push_seed(&mut self, account: &str, seed: SeedComponent) -> Result<(), FormError> {
        self.account_mut(account)?.seeds.push(seed);
        Ok(())
    }

    pub fn remove_seed(&mut self, account: &str, index: usize) -> Result<SeedComponent, FormError> {
        let input = self.account_mut(account)?;
        check_index(account, index, input.seeds.len())?;
        Ok(input.seeds.remove(index))
    }

    pub fn update_seed(&mut self, account: &str, index: usize, seed: SeedComponent) -> Result<(), FormError> {
        *self.seed_mut(account, index)? = seed;
        Ok(())
    }

    pub fn set_seed_kind(&mut self, account: &str, index: usize, kind: SeedKind) -> Result<(), FormError> {
        self.seed_mut(account, index)?.kind = kind;
        Ok(())
    }

    pub fn set_seed_value(&mut self, account: &str, index: usize, value: impl Into<String>) -> Result<(), FormError> {
        self.seed_mut(account, index)?.value = value.into();
        Ok(())
    }

    fn seed_mut(&mut self, account: &str, index: usize) -> Result<&mut SeedComponent, FormError> {
        let input = self.account_mut(account)?;
        check_index(account, index, input.seeds.len())?;
        Ok(&mut input.seeds[index])
    }
}

fn check_index(account: &str, index: usize, len: usize) -> Result<(), FormError> {
    if index >= len {
        return Err(FormError::SeedIndex {
            account: account.to_string(),
            index,
            len,
        });
    }
    Ok(())
}
