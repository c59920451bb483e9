//! IDL (Interface Definition Language) wire types for Anchor programs.
//!
//! Anchor emits the program interface as a JSON file. Two layouts are in
//! circulation: the current one (`address` + `metadata`, explicit
//! discriminators, `writable`/`signer` flags, byte-array seed constants) and
//! the legacy one (`name`/`version` at the top level, `isMut`/`isSigner`,
//! typed seed constants, account structs under `accounts`). This module
//! deserializes both into one set of types; [`crate::schema::Schema`] turns
//! them into the normalized form the composer works with.

use serde::{Deserialize, Serialize};

/// Top-level IDL for an Anchor program.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnchorIdl {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<IdlMetadata>,
    /// Legacy layout only; the current layout keeps this in `metadata`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Legacy layout only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub instructions: Vec<IdlInstruction>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accounts: Vec<IdlAccountType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<IdlTypeDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<IdlError>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdlMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Some legacy IDLs record the deployed address here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// An instruction in the IDL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdlInstruction {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub docs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<Vec<u8>>,
    pub accounts: Vec<IdlAccountItem>,
    pub args: Vec<IdlArg>,
}

/// An account slot, or a named group of slots (Anchor composite accounts).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdlAccountItem {
    Group(IdlAccountGroup),
    Single(IdlAccount),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdlAccountGroup {
    pub name: String,
    pub accounts: Vec<IdlAccountItem>,
}

/// An account expected by an instruction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdlAccount {
    pub name: String,
    #[serde(default, alias = "isMut", skip_serializing_if = "is_false")]
    pub writable: bool,
    #[serde(default, alias = "isSigner", skip_serializing_if = "is_false")]
    pub signer: bool,
    #[serde(default, alias = "isOptional", skip_serializing_if = "is_false")]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub docs: Vec<String>,
    /// Fixed address (system program, sysvars, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pda: Option<IdlPda>,
}

fn is_false(v: &bool) -> bool {
    !v
}

/// PDA derivation specification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdlPda {
    pub seeds: Vec<IdlSeed>,
    /// Owning program when it is not the program being called.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<IdlSeed>,
}

/// A seed component for PDA derivation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum IdlSeed {
    /// `value` is a byte array in the current layout and a typed scalar
    /// (described by `type`) in the legacy one.
    #[serde(rename = "const")]
    Const {
        #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
        type_: Option<IdlType>,
        value: serde_json::Value,
    },
    #[serde(rename = "account")]
    Account { path: String },
    #[serde(rename = "arg")]
    Arg { path: String },
}

/// An instruction argument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdlArg {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: IdlType,
}

/// Type representation in the IDL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdlType {
    Primitive(String),
    Vec { vec: Box<IdlType> },
    Option { option: Box<IdlType> },
    Defined { defined: IdlDefinedRef },
    Array { array: (Box<IdlType>, usize) },
    Map {
        #[serde(rename = "hashMap", alias = "bTreeMap")]
        map: (Box<IdlType>, Box<IdlType>),
    },
}

/// Reference to a user-defined type: a bare name (legacy) or `{ "name": .. }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdlDefinedRef {
    Name(String),
    Named {
        name: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        generics: Vec<serde_json::Value>,
    },
}

impl IdlDefinedRef {
    pub fn name(&self) -> &str {
        match self {
            IdlDefinedRef::Name(name) => name,
            IdlDefinedRef::Named { name, .. } => name,
        }
    }
}

/// Account type definition in the IDL.
///
/// The legacy layout carries the struct layout inline; the current layout
/// only names the account and keeps the layout under `types`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdlAccountType {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<Vec<u8>>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_: Option<IdlTypeDefTy>,
}

/// Named type definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdlTypeDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub docs: Vec<String>,
    #[serde(rename = "type")]
    pub type_: IdlTypeDefTy,
}

/// Body of a type definition (struct, enum or alias).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum IdlTypeDefTy {
    Struct {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fields: Option<IdlDefinedFields>,
    },
    Enum { variants: Vec<IdlEnumVariant> },
    Type { alias: IdlType },
}

/// Struct or variant fields: named (`{ name, type }`) or positional.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdlDefinedFields {
    Named(Vec<IdlField>),
    Tuple(Vec<IdlType>),
}

/// A field in a struct type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdlField {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: IdlType,
}

/// An enum variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdlEnumVariant {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<IdlDefinedFields>,
}

/// Error definition in the IDL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdlError {
    pub code: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

impl AnchorIdl {
    /// Parse an IDL from its JSON text.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize the IDL to pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn program_name(&self) -> &str {
        self.metadata
            .as_ref()
            .and_then(|m| m.name.as_deref())
            .or(self.name.as_deref())
            .unwrap_or("program")
    }

    pub fn program_version(&self) -> &str {
        self.metadata
            .as_ref()
            .and_then(|m| m.version.as_deref())
            .or(self.version.as_deref())
            .unwrap_or("0.0.0")
    }

    /// Declared deployment address, if the IDL carries one.
    pub fn program_address(&self) -> Option<&str> {
        self.address
            .as_deref()
            .or_else(|| self.metadata.as_ref().and_then(|m| m.address.as_deref()))
    }
}
