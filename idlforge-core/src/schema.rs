//! Normalized program schema.
//!
//! The schema is built once from an [`AnchorIdl`] and is read-only after
//! that. Every argument type is resolved while loading so that broken
//! schemas fail immediately instead of at the first keystroke.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::Serialize;
use solana_program::pubkey::Pubkey;
use tracing::debug;

use crate::error::SchemaError;
use crate::idl::{
    AnchorIdl, IdlAccount, IdlAccountItem, IdlDefinedFields, IdlPda, IdlSeed, IdlType, IdlTypeDefTy,
};
use crate::pda::{SeedComponent, SeedKind, SeedTemplate};
use crate::resolve::resolve;
use crate::serialize::sighash;
use crate::types::{PrimitiveKind, ResolvedShape, TypeRef};

/// A declared field of a struct or variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDef {
    pub name: String,
    pub ty: TypeRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantDef {
    pub name: String,
    pub fields: Vec<FieldDef>,
    pub tuple: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TypeBody {
    Struct { fields: Vec<FieldDef>, tuple: bool },
    Enum { variants: Vec<VariantDef> },
    Alias(TypeRef),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeDefinition {
    pub name: String,
    pub body: TypeBody,
}

/// Named composite types keyed by unique name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TypeRegistry {
    types: BTreeMap<String, TypeDefinition>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition; names must be unique.
    pub fn insert(&mut self, def: TypeDefinition) -> Result<(), SchemaError> {
        if self.types.contains_key(&def.name) {
            return Err(SchemaError::DuplicateType(def.name));
        }
        self.types.insert(def.name.clone(), def);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeDefinition> {
        self.types.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArgumentSpec {
    pub name: String,
    pub ty: TypeRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountSpec {
    /// Group members are flattened as `group.member`.
    pub name: String,
    pub writable: bool,
    pub signer: bool,
    pub optional: bool,
    pub address: Option<Pubkey>,
    pub seeds: Option<SeedTemplate>,
}

impl AccountSpec {
    pub fn is_required(&self) -> bool {
        !self.optional
    }
}

/// One callable instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallDefinition {
    pub name: String,
    pub docs: Vec<String>,
    pub discriminator: [u8; 8],
    pub args: Vec<ArgumentSpec>,
    pub accounts: Vec<AccountSpec>,
}

impl CallDefinition {
    pub fn argument(&self, name: &str) -> Option<&ArgumentSpec> {
        self.args.iter().find(|a| a.name == name)
    }

    pub fn account(&self, name: &str) -> Option<&AccountSpec> {
        self.accounts.iter().find(|a| a.name == name)
    }
}

/// An on-chain account layout the program owns.
///
/// The layout is the registry type of the same name; stored data starts
/// with the 8-byte discriminator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountType {
    pub name: String,
    pub discriminator: [u8; 8],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorDefinition {
    pub code: u32,
    pub name: String,
    pub msg: Option<String>,
}

/// Immutable description of a program's callable operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Schema {
    pub name: String,
    pub version: String,
    pub address: Option<Pubkey>,
    calls: Vec<CallDefinition>,
    types: TypeRegistry,
    accounts: Vec<AccountType>,
    errors: Vec<ErrorDefinition>,
}

impl Schema {
    /// Parse and normalize an IDL from JSON text.
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let idl = AnchorIdl::from_json(json).map_err(|e| SchemaError::InvalidIdl(e.to_string()))?;
        Self::from_idl(&idl)
    }

    /// Normalize an IDL, resolving every type once to surface schema errors.
    pub fn from_idl(idl: &AnchorIdl) -> Result<Self, SchemaError> {
        let mut types = TypeRegistry::new();
        for def in &idl.types {
            types.insert(type_definition(&def.name, &def.type_)?)?;
        }
        // Legacy IDLs describe account layouts inline.
        let mut accounts = Vec::with_capacity(idl.accounts.len());
        for account in &idl.accounts {
            if let Some(body) = &account.type_ {
                types.insert(type_definition(&account.name, body)?)?;
            }
            let discriminator = match &account.discriminator {
                Some(bytes) => <[u8; 8]>::try_from(bytes.as_slice()).map_err(|_| {
                    SchemaError::InvalidIdl(format!(
                        "account `{}` has a {}-byte discriminator, expected 8",
                        account.name,
                        bytes.len()
                    ))
                })?,
                None => sighash("account", &account.name),
            };
            accounts.push(AccountType {
                name: account.name.clone(),
                discriminator,
            });
        }

        let address = match idl.program_address() {
            Some(text) => Some(parse_address(text)?),
            None => None,
        };

        let mut calls = Vec::with_capacity(idl.instructions.len());
        for ix in &idl.instructions {
            if calls.iter().any(|c: &CallDefinition| c.name == ix.name) {
                return Err(SchemaError::InvalidIdl(format!(
                    "instruction `{}` is defined more than once",
                    ix.name
                )));
            }
            let discriminator = match &ix.discriminator {
                Some(bytes) => <[u8; 8]>::try_from(bytes.as_slice()).map_err(|_| {
                    SchemaError::InvalidIdl(format!(
                        "instruction `{}` has a {}-byte discriminator, expected 8",
                        ix.name,
                        bytes.len()
                    ))
                })?,
                None => sighash("global", &to_snake_case(&ix.name)),
            };
            let args = ix
                .args
                .iter()
                .map(|a| {
                    Ok(ArgumentSpec {
                        name: a.name.clone(),
                        ty: TypeRef::from_idl(&a.type_)?,
                    })
                })
                .collect::<Result<Vec<_>, SchemaError>>()?;
            let mut accounts = Vec::new();
            flatten_accounts(&ix.accounts, "", &mut accounts)?;
            calls.push(CallDefinition {
                name: ix.name.clone(),
                docs: ix.docs.clone(),
                discriminator,
                args,
                accounts,
            });
        }

        let schema = Schema {
            name: idl.program_name().to_string(),
            version: idl.program_version().to_string(),
            address,
            calls,
            types,
            accounts,
            errors: idl
                .errors
                .iter()
                .map(|e| ErrorDefinition {
                    code: e.code,
                    name: e.name.clone(),
                    msg: e.msg.clone(),
                })
                .collect(),
        };
        schema.check_resolvable()?;
        debug!(
            program = %schema.name,
            instructions = schema.calls.len(),
            types = schema.types.len(),
            accounts = schema.accounts.len(),
            "schema loaded"
        );
        Ok(schema)
    }

    fn check_resolvable(&self) -> Result<(), SchemaError> {
        for def in self.types.iter() {
            resolve(&TypeRef::Named(def.name.clone()), &self.types)?;
        }
        for account in &self.accounts {
            if self.types.get(&account.name).is_none() {
                return Err(SchemaError::InvalidIdl(format!(
                    "account `{}` has no type definition",
                    account.name
                )));
            }
        }
        for call in &self.calls {
            for arg in &call.args {
                resolve(&arg.ty, &self.types)?;
            }
        }
        Ok(())
    }

    pub fn calls(&self) -> &[CallDefinition] {
        &self.calls
    }

    pub fn call(&self, name: &str) -> Option<&CallDefinition> {
        self.calls.iter().find(|c| c.name == name)
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn accounts(&self) -> &[AccountType] {
        &self.accounts
    }

    /// Find an account type by name, ignoring case.
    pub fn account_type(&self, name: &str) -> Option<&AccountType> {
        self.accounts
            .iter()
            .find(|a| a.name == name)
            .or_else(|| self.accounts.iter().find(|a| a.name.eq_ignore_ascii_case(name)))
    }

    pub fn errors(&self) -> &[ErrorDefinition] {
        &self.errors
    }

    /// Look up a program error by the custom code the runtime reports.
    pub fn error_for_code(&self, code: u32) -> Option<&ErrorDefinition> {
        self.errors.iter().find(|e| e.code == code)
    }

    pub fn error_name(&self, code: u32) -> Option<&str> {
        self.error_for_code(code).map(|e| e.name.as_str())
    }

    /// Resolve the shape of one argument of `call`.
    pub fn resolve_arg(&self, call: &CallDefinition, arg: &str) -> Result<ResolvedShape, SchemaError> {
        let spec = call
            .argument(arg)
            .ok_or_else(|| SchemaError::UnknownType(format!("{}.{}", call.name, arg)))?;
        resolve(&spec.ty, &self.types)
    }
}

fn parse_address(text: &str) -> Result<Pubkey, SchemaError> {
    Pubkey::from_str(text).map_err(|_| SchemaError::InvalidIdl(format!("`{}` is not a valid address", text)))
}

fn fields_from_idl(fields: Option<&IdlDefinedFields>) -> Result<(Vec<FieldDef>, bool), SchemaError> {
    match fields {
        None => Ok((Vec::new(), false)),
        Some(IdlDefinedFields::Named(named)) => {
            let defs = named
                .iter()
                .map(|f| {
                    Ok(FieldDef {
                        name: f.name.clone(),
                        ty: TypeRef::from_idl(&f.type_)?,
                    })
                })
                .collect::<Result<Vec<_>, SchemaError>>()?;
            Ok((defs, false))
        }
        Some(IdlDefinedFields::Tuple(types)) => {
            let defs = types
                .iter()
                .enumerate()
                .map(|(i, ty)| {
                    Ok(FieldDef {
                        name: i.to_string(),
                        ty: TypeRef::from_idl(ty)?,
                    })
                })
                .collect::<Result<Vec<_>, SchemaError>>()?;
            Ok((defs, true))
        }
    }
}

fn type_definition(name: &str, body: &IdlTypeDefTy) -> Result<TypeDefinition, SchemaError> {
    let body = match body {
        IdlTypeDefTy::Struct { fields } => {
            let (fields, tuple) = fields_from_idl(fields.as_ref())?;
            TypeBody::Struct { fields, tuple }
        }
        IdlTypeDefTy::Enum { variants } => {
            if variants.len() > usize::from(u8::MAX) + 1 {
                return Err(SchemaError::InvalidIdl(format!(
                    "enum `{}` has {} variants, more than a u8 discriminant allows",
                    name,
                    variants.len()
                )));
            }
            let variants = variants
                .iter()
                .map(|v| {
                    let (fields, tuple) = fields_from_idl(v.fields.as_ref())?;
                    Ok(VariantDef {
                        name: v.name.clone(),
                        fields,
                        tuple,
                    })
                })
                .collect::<Result<Vec<_>, SchemaError>>()?;
            TypeBody::Enum { variants }
        }
        IdlTypeDefTy::Type { alias } => TypeBody::Alias(TypeRef::from_idl(alias)?),
    };
    Ok(TypeDefinition {
        name: name.to_string(),
        body,
    })
}

fn flatten_accounts(items: &[IdlAccountItem], prefix: &str, out: &mut Vec<AccountSpec>) -> Result<(), SchemaError> {
    for item in items {
        match item {
            IdlAccountItem::Group(group) => {
                let prefix = format!("{}{}.", prefix, group.name);
                flatten_accounts(&group.accounts, &prefix, out)?;
            }
            IdlAccountItem::Single(account) => out.push(account_spec(account, prefix)?),
        }
    }
    Ok(())
}

fn account_spec(account: &IdlAccount, prefix: &str) -> Result<AccountSpec, SchemaError> {
    let address = match &account.address {
        Some(text) => Some(parse_address(text)?),
        None => None,
    };
    let seeds = match &account.pda {
        Some(pda) => Some(seed_template(pda, prefix)?),
        None => None,
    };
    Ok(AccountSpec {
        name: format!("{}{}", prefix, account.name),
        writable: account.writable,
        signer: account.signer,
        optional: account.optional,
        address,
        seeds,
    })
}

fn seed_template(pda: &IdlPda, prefix: &str) -> Result<SeedTemplate, SchemaError> {
    let seeds = pda
        .seeds
        .iter()
        .map(|s| seed_component(s, prefix))
        .collect::<Result<Vec<_>, _>>()?;
    let program = match &pda.program {
        Some(seed) => Some(seed_component(seed, prefix)?),
        None => None,
    };
    Ok(SeedTemplate { seeds, program })
}

/// Translate an IDL seed into an editable seed component.
///
/// Account references inside a group are relative to that group, so they
/// get the group prefix when it names a sibling.
fn seed_component(seed: &IdlSeed, prefix: &str) -> Result<SeedComponent, SchemaError> {
    match seed {
        IdlSeed::Account { path } => Ok(SeedComponent::new(SeedKind::Account, format!("{}{}", prefix, path))),
        IdlSeed::Arg { path } => Ok(SeedComponent::new(SeedKind::Arg, path.clone())),
        IdlSeed::Const { type_, value } => const_seed(type_.as_ref(), value),
    }
}

fn const_seed(type_: Option<&IdlType>, value: &serde_json::Value) -> Result<SeedComponent, SchemaError> {
    let invalid = || SchemaError::InvalidIdl(format!("unsupported constant seed `{}`", value));
    match value {
        serde_json::Value::Array(items) => {
            let bytes = items
                .iter()
                .map(|b| b.as_u64().and_then(|b| u8::try_from(b).ok()))
                .collect::<Option<Vec<u8>>>()
                .ok_or_else(invalid)?;
            Ok(SeedComponent::from_const_bytes(&bytes))
        }
        serde_json::Value::String(text) => {
            let kind = match type_ {
                Some(IdlType::Primitive(name)) if PrimitiveKind::from_idl_name(name) == Some(PrimitiveKind::Pubkey) => {
                    SeedKind::Pubkey
                }
                _ => SeedKind::Utf8,
            };
            Ok(SeedComponent::new(kind, text.clone()))
        }
        serde_json::Value::Number(n) => {
            let kind = match type_ {
                Some(IdlType::Primitive(name)) => match PrimitiveKind::from_idl_name(name) {
                    Some(PrimitiveKind::U8) => SeedKind::U8,
                    Some(PrimitiveKind::U16) => SeedKind::U16,
                    Some(PrimitiveKind::U32) => SeedKind::U32,
                    Some(PrimitiveKind::U128) => SeedKind::U128,
                    _ => SeedKind::U64,
                },
                _ => SeedKind::U64,
            };
            Ok(SeedComponent::new(kind, n.to_string()))
        }
        _ => Err(invalid()),
    }
}

/// Convert `camelCase`/`PascalCase` to `snake_case`, keeping acronyms together.
pub fn to_snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev = if i > 0 { chars.get(i - 1).copied() } else { None };
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p == '_' => false,
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next.map(|n| n.is_lowercase()).unwrap_or(false),
                _ => false,
            };
            if boundary {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
