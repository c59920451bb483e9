//! Program-derived address computation from typed seed lists.
//!
//! Each account slot with a seed template owns an editable list of
//! [`SeedComponent`]s (see [`crate::form::FormState`]). Deriving turns every
//! seed into its canonical bytes, runs the network's bump search and writes
//! the result back into the slot.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use solana_program::pubkey::{Pubkey, MAX_SEEDS, MAX_SEED_LEN};
use tracing::debug;

use crate::error::{DerivationError, FormError};
use crate::form::{CallInputState, FormState};
use crate::hex::{decode_bytes_32, hex_decode, hex_encode};
use crate::parse::{coerce, is_empty_input};
use crate::schema::CallDefinition;
use crate::serialize::to_bytes;
use crate::session::Session;
use crate::types::{as_byte_slice, ResolvedShape, Value};

/// How a seed's value turns into bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedKind {
    /// Hex literal
    Bytes,
    Utf8,
    U8,
    U16,
    U32,
    U64,
    U128,
    /// Base58 address literal
    Pubkey,
    /// Current address of another account slot
    Account,
    /// Current value of an instruction argument (dotted path into structs)
    Arg,
}

impl SeedKind {
    pub fn name(&self) -> &'static str {
        match self {
            SeedKind::Bytes => "bytes",
            SeedKind::Utf8 => "utf8",
            SeedKind::U8 => "u8",
            SeedKind::U16 => "u16",
            SeedKind::U32 => "u32",
            SeedKind::U64 => "u64",
            SeedKind::U128 => "u128",
            SeedKind::Pubkey => "pubkey",
            SeedKind::Account => "account",
            SeedKind::Arg => "arg",
        }
    }
}

impl fmt::Display for SeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SeedKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "bytes" | "hex" => SeedKind::Bytes,
            "utf8" | "string" | "str" => SeedKind::Utf8,
            "u8" => SeedKind::U8,
            "u16" => SeedKind::U16,
            "u32" => SeedKind::U32,
            "u64" => SeedKind::U64,
            "u128" => SeedKind::U128,
            "pubkey" => SeedKind::Pubkey,
            "account" => SeedKind::Account,
            "arg" => SeedKind::Arg,
            other => return Err(format!("unknown seed kind '{}'", other)),
        })
    }
}

/// One typed seed. `value` is kept as entered so the form can edit it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedComponent {
    pub kind: SeedKind,
    pub value: String,
}

impl SeedComponent {
    pub fn new(kind: SeedKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    pub fn utf8(value: impl Into<String>) -> Self {
        Self::new(SeedKind::Utf8, value)
    }

    pub fn account(name: impl Into<String>) -> Self {
        Self::new(SeedKind::Account, name)
    }

    pub fn arg(path: impl Into<String>) -> Self {
        Self::new(SeedKind::Arg, path)
    }

    pub fn bytes(bytes: &[u8]) -> Self {
        Self::new(SeedKind::Bytes, format!("0x{}", hex_encode(bytes)))
    }

    /// Constant bytes from an IDL; printable ASCII stays readable as text.
    pub fn from_const_bytes(bytes: &[u8]) -> Self {
        if !bytes.is_empty() && bytes.iter().all(|b| (0x20..0x7f).contains(b)) {
            Self::utf8(String::from_utf8_lossy(bytes).into_owned())
        } else {
            Self::bytes(bytes)
        }
    }
}

impl fmt::Display for SeedComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.value)
    }
}

/// Parses `kind:value`, e.g. `utf8:vault` or `account:owner`.
impl FromStr for SeedComponent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, value) = s
            .split_once(':')
            .ok_or_else(|| format!("seed '{}' must look like kind:value", s))?;
        Ok(Self::new(kind.trim().parse()?, value))
    }
}

/// Seeds declared for an account, plus the owning program when it is not
/// the program being called.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedTemplate {
    pub seeds: Vec<SeedComponent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<SeedComponent>,
}

/// Source of values for `account` and `arg` seeds.
pub trait SeedResolver {
    fn account(&self, name: &str) -> Option<Pubkey>;

    fn argument(&self, _path: &str) -> Option<(Value, ResolvedShape)> {
        None
    }
}

impl SeedResolver for () {
    fn account(&self, _name: &str) -> Option<Pubkey> {
        None
    }
}

impl SeedResolver for HashMap<String, Pubkey> {
    fn account(&self, name: &str) -> Option<Pubkey> {
        self.get(name).copied()
    }
}

/// Resolves references against the form being edited.
pub struct FormResolver<'a> {
    session: &'a Session,
    call: &'a CallDefinition,
    state: &'a CallInputState,
}

impl<'a> FormResolver<'a> {
    pub fn new(session: &'a Session, call: &'a CallDefinition, state: &'a CallInputState) -> Self {
        Self { session, call, state }
    }
}

impl SeedResolver for FormResolver<'_> {
    fn account(&self, name: &str) -> Option<Pubkey> {
        let entered = self
            .state
            .accounts
            .get(name)
            .map(|input| input.address.trim())
            .filter(|a| !a.is_empty());
        match entered {
            Some(text) => decode_bytes_32(text).ok().map(Pubkey::new_from_array),
            None => self.call.account(name).and_then(|spec| spec.address),
        }
    }

    fn argument(&self, path: &str) -> Option<(Value, ResolvedShape)> {
        let mut parts = path.split('.');
        let arg = parts.next()?;
        let raw = self.state.args.get(arg)?;
        if is_empty_input(raw) {
            return None;
        }
        let shape = self.session.schema().resolve_arg(self.call, arg).ok()?;
        let mut value = coerce(raw, &shape).ok()?;
        let mut shape = shape;
        for part in parts {
            let ResolvedShape::Struct { fields, .. } = &shape else {
                return None;
            };
            let next_shape = fields.iter().find(|f| f.name == part)?.shape.clone();
            let next_value = value.field(part)?.clone();
            value = next_value;
            shape = next_shape;
        }
        Some((value, shape))
    }
}

/// Seed bytes for a typed value: text as UTF-8, keys as 32 bytes, integers
/// little-endian, byte strings raw, anything else borsh-encoded.
pub fn value_seed_bytes(value: &Value, shape: &ResolvedShape) -> Result<Vec<u8>, String> {
    Ok(match value {
        Value::String(s) => s.as_bytes().to_vec(),
        Value::Pubkey(key) => key.to_bytes().to_vec(),
        Value::Bytes(b) => b.clone(),
        Value::Bool(b) => vec![u8::from(*b)],
        Value::U8(v) => vec![*v],
        Value::U16(v) => v.to_le_bytes().to_vec(),
        Value::U32(v) => v.to_le_bytes().to_vec(),
        Value::U64(v) => v.to_le_bytes().to_vec(),
        Value::U128(v) => v.to_le_bytes().to_vec(),
        Value::I8(v) => v.to_le_bytes().to_vec(),
        Value::I16(v) => v.to_le_bytes().to_vec(),
        Value::I32(v) => v.to_le_bytes().to_vec(),
        Value::I64(v) => v.to_le_bytes().to_vec(),
        Value::I128(v) => v.to_le_bytes().to_vec(),
        Value::Vec(items) | Value::Array(items) if shape.is_byte_sequence() => {
            as_byte_slice(items).unwrap_or_default()
        }
        other => to_bytes(other, shape).map_err(|e| e.to_string())?,
    })
}

/// Canonical bytes of one seed.
pub fn encode_seed<R: SeedResolver + ?Sized>(
    index: usize,
    seed: &SeedComponent,
    resolver: &R,
) -> Result<Vec<u8>, DerivationError> {
    let invalid = |message: String| DerivationError::InvalidSeed { index, message };
    let text = seed.value.trim();

    macro_rules! le_int {
        ($t:ty) => {
            text.parse::<$t>()
                .map(|v| v.to_le_bytes().to_vec())
                .map_err(|e| invalid(format!("'{}' is not a valid {}: {}", text, stringify!($t), e)))
        };
    }

    match seed.kind {
        SeedKind::Bytes => hex_decode(text).map_err(invalid),
        // Text seeds keep surrounding whitespace.
        SeedKind::Utf8 => Ok(seed.value.as_bytes().to_vec()),
        SeedKind::U8 => le_int!(u8),
        SeedKind::U16 => le_int!(u16),
        SeedKind::U32 => le_int!(u32),
        SeedKind::U64 => le_int!(u64),
        SeedKind::U128 => le_int!(u128),
        SeedKind::Pubkey => decode_bytes_32(text)
            .map(|b| b.to_vec())
            .map_err(|_| invalid(format!("'{}' is not a valid address", text))),
        SeedKind::Account => resolver
            .account(text)
            .map(|key| key.to_bytes().to_vec())
            .ok_or_else(|| DerivationError::UnresolvedReference {
                index,
                name: text.to_string(),
            }),
        SeedKind::Arg => {
            let (value, shape) = resolver
                .argument(text)
                .ok_or_else(|| DerivationError::UnresolvedReference {
                    index,
                    name: text.to_string(),
                })?;
            value_seed_bytes(&value, &shape).map_err(invalid)
        }
    }
}

/// Find the canonical program address for already-encoded seeds.
///
/// The bump search starts at 255 and walks down to the first off-curve
/// result, as the runtime does.
pub fn derive_address(program: &Pubkey, seeds: &[Vec<u8>]) -> Result<(Pubkey, u8), DerivationError> {
    // One slot is reserved for the bump.
    let max = MAX_SEEDS - 1;
    if seeds.len() > max {
        return Err(DerivationError::TooManySeeds { count: seeds.len(), max });
    }
    if let Some((index, seed)) = seeds.iter().enumerate().find(|(_, s)| s.len() > MAX_SEED_LEN) {
        return Err(DerivationError::SeedTooLong {
            index,
            len: seed.len(),
            max: MAX_SEED_LEN,
        });
    }
    let refs: Vec<&[u8]> = seeds.iter().map(Vec::as_slice).collect();
    Pubkey::try_find_program_address(&refs, program).ok_or(DerivationError::NoViableBump)
}

/// Encode `seeds` with `resolver` and derive the address under `program`.
pub fn derive_from_seeds<R: SeedResolver + ?Sized>(
    program: &Pubkey,
    seeds: &[SeedComponent],
    resolver: &R,
) -> Result<(Pubkey, u8), DerivationError> {
    let bytes = seeds
        .iter()
        .enumerate()
        .map(|(i, seed)| encode_seed(i, seed, resolver))
        .collect::<Result<Vec<_>, _>>()?;
    derive_address(program, &bytes)
}

/// Derive `account` from its current seed list and write the address into
/// the form. The seed list is kept so the derivation can be repeated.
pub fn derive_account(session: &Session, form: &mut FormState, account: &str) -> Result<Pubkey, DerivationError> {
    let (address, bump) = {
        let state = form.current().ok_or(FormError::NoCallSelected)?;
        let call = session
            .call(&state.call)
            .ok_or_else(|| DerivationError::UnknownCall(state.call.clone()))?;
        let input = state
            .accounts
            .get(account)
            .ok_or_else(|| FormError::UnknownAccount(account.to_string()))?;
        let resolver = FormResolver::new(session, call, state);

        let program = match call
            .account(account)
            .and_then(|spec| spec.seeds.as_ref())
            .and_then(|template| template.program.as_ref())
        {
            Some(seed) => {
                let index = input.seeds.len();
                let bytes = encode_seed(index, seed, &resolver)?;
                let key = <[u8; 32]>::try_from(bytes.as_slice()).map_err(|_| DerivationError::InvalidSeed {
                    index,
                    message: format!("owning program must be 32 bytes, got {}", bytes.len()),
                })?;
                Pubkey::new_from_array(key)
            }
            None => session.program_id(),
        };
        derive_from_seeds(&program, &input.seeds, &resolver)?
    };
    debug!(account, %address, bump, "derived program address");
    form.set_account(account, address.to_string())?;
    Ok(address)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_text_round_trips() {
        let seed: SeedComponent = "utf8:vault".parse().unwrap();
        assert_eq!(seed, SeedComponent::utf8("vault"));
        assert_eq!(seed.to_string(), "utf8:vault");
        assert!("vault".parse::<SeedComponent>().is_err());
        assert!("blob:vault".parse::<SeedComponent>().is_err());
    }

    #[test]
    fn integer_seeds_are_little_endian() {
        let bytes = encode_seed(0, &SeedComponent::new(SeedKind::U16, "258"), &()).unwrap();
        assert_eq!(bytes, vec![2, 1]);
        let err = encode_seed(0, &SeedComponent::new(SeedKind::U8, "256"), &()).unwrap_err();
        assert!(matches!(err, DerivationError::InvalidSeed { index: 0, .. }));
    }

    #[test]
    fn missing_reference_is_reported() {
        let err = encode_seed(1, &SeedComponent::account("owner"), &()).unwrap_err();
        assert_eq!(
            err,
            DerivationError::UnresolvedReference {
                index: 1,
                name: "owner".into()
            }
        );
    }

    #[test]
    fn seed_limits_are_enforced() {
        let program = Pubkey::new_unique();
        let long = vec![vec![0u8; 33]];
        assert!(matches!(
            derive_address(&program, &long),
            Err(DerivationError::SeedTooLong { index: 0, len: 33, .. })
        ));
        let many = vec![vec![1u8]; 16];
        assert!(matches!(
            derive_address(&program, &many),
            Err(DerivationError::TooManySeeds { count: 16, max: 15 })
        ));
    }

    #[test]
    fn matches_runtime_derivation() {
        let program = Pubkey::new_unique();
        let owner = Pubkey::new_unique();
        let mut accounts = HashMap::new();
        accounts.insert("owner".to_string(), owner);
        let seeds = vec![SeedComponent::utf8("vault"), SeedComponent::account("owner")];
        let (address, bump) = derive_from_seeds(&program, &seeds, &accounts).unwrap();
        let expected = Pubkey::find_program_address(&[b"vault", owner.as_ref()], &program);
        assert_eq!((address, bump), expected);
    }
}
