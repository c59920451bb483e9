//! Core types for the composer.
//!
//! [`TypeRef`] is what the schema declares, [`ResolvedShape`] is that
//! declaration with every named type expanded, and [`Value`] is a typed
//! value built against a shape.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use solana_program::pubkey::Pubkey;

use crate::error::SchemaError;

/// Leaf types understood by the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    Bool,
    U8,
    U16,
    U32,
    U64,
    U128,
    I8,
    I16,
    I32,
    I64,
    I128,
    F32,
    F64,
    String,
    Bytes,
    Pubkey,
}

impl PrimitiveKind {
    /// Parse an IDL primitive name. `publicKey` is the legacy spelling.
    pub fn from_idl_name(name: &str) -> Option<Self> {
        let kind = match name {
            "bool" => PrimitiveKind::Bool,
            "u8" => PrimitiveKind::U8,
            "u16" => PrimitiveKind::U16,
            "u32" => PrimitiveKind::U32,
            "u64" => PrimitiveKind::U64,
            "u128" => PrimitiveKind::U128,
            "i8" => PrimitiveKind::I8,
            "i16" => PrimitiveKind::I16,
            "i32" => PrimitiveKind::I32,
            "i64" => PrimitiveKind::I64,
            "i128" => PrimitiveKind::I128,
            "f32" => PrimitiveKind::F32,
            "f64" => PrimitiveKind::F64,
            "string" | "String" => PrimitiveKind::String,
            "bytes" => PrimitiveKind::Bytes,
            "pubkey" | "publicKey" => PrimitiveKind::Pubkey,
            _ => return None,
        };
        Some(kind)
    }

    pub fn name(&self) -> &'static str {
        match self {
            PrimitiveKind::Bool => "bool",
            PrimitiveKind::U8 => "u8",
            PrimitiveKind::U16 => "u16",
            PrimitiveKind::U32 => "u32",
            PrimitiveKind::U64 => "u64",
            PrimitiveKind::U128 => "u128",
            PrimitiveKind::I8 => "i8",
            PrimitiveKind::I16 => "i16",
            PrimitiveKind::I32 => "i32",
            PrimitiveKind::I64 => "i64",
            PrimitiveKind::I128 => "i128",
            PrimitiveKind::F32 => "f32",
            PrimitiveKind::F64 => "f64",
            PrimitiveKind::String => "string",
            PrimitiveKind::Bytes => "bytes",
            PrimitiveKind::Pubkey => "pubkey",
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            PrimitiveKind::U8
                | PrimitiveKind::U16
                | PrimitiveKind::U32
                | PrimitiveKind::U64
                | PrimitiveKind::U128
                | PrimitiveKind::I8
                | PrimitiveKind::I16
                | PrimitiveKind::I32
                | PrimitiveKind::I64
                | PrimitiveKind::I128
        )
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A type as declared by the schema, before named types are expanded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeRef {
    Primitive(PrimitiveKind),
    Vec(Box<TypeRef>),
    Array(Box<TypeRef>, usize),
    Option(Box<TypeRef>),
    Map(Box<TypeRef>, Box<TypeRef>),
    Named(String),
}

impl TypeRef {
    /// Convert an IDL type, rejecting primitive names the encoder does not know.
    pub fn from_idl(ty: &crate::idl::IdlType) -> Result<Self, SchemaError> {
        use crate::idl::IdlType;
        Ok(match ty {
            IdlType::Primitive(name) => TypeRef::Primitive(
                PrimitiveKind::from_idl_name(name)
                    .ok_or_else(|| SchemaError::UnknownType(name.clone()))?,
            ),
            IdlType::Vec { vec } => TypeRef::Vec(Box::new(Self::from_idl(vec)?)),
            IdlType::Option { option } => TypeRef::Option(Box::new(Self::from_idl(option)?)),
            IdlType::Defined { defined } => TypeRef::Named(defined.name().to_string()),
            IdlType::Array { array } => TypeRef::Array(Box::new(Self::from_idl(&array.0)?), array.1),
            IdlType::Map { map } => TypeRef::Map(
                Box::new(Self::from_idl(&map.0)?),
                Box::new(Self::from_idl(&map.1)?),
            ),
        })
    }

    pub fn is_option(&self) -> bool {
        matches!(self, TypeRef::Option(_))
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Primitive(p) => write!(f, "{}", p),
            TypeRef::Vec(inner) => write!(f, "Vec<{}>", inner),
            TypeRef::Array(inner, len) => write!(f, "[{}; {}]", inner, len),
            TypeRef::Option(inner) => write!(f, "Option<{}>", inner),
            TypeRef::Map(k, v) => write!(f, "Map<{}, {}>", k, v),
            TypeRef::Named(name) => f.write_str(name),
        }
    }
}

/// A named field inside a resolved struct or variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedField {
    pub name: String,
    pub shape: ResolvedShape,
}

/// An enum variant with its own (possibly empty) field list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedVariant {
    pub name: String,
    /// Borsh discriminant.
    pub index: u8,
    pub fields: Vec<ResolvedField>,
    /// Positional fields, named `"0"`, `"1"`, ...
    pub tuple: bool,
}

impl ResolvedVariant {
    pub fn is_unit(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A fully expanded type: no named references remain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ResolvedShape {
    Primitive(PrimitiveKind),
    Vec(Box<ResolvedShape>),
    Array(Box<ResolvedShape>, usize),
    Option(Box<ResolvedShape>),
    Map(Box<ResolvedShape>, Box<ResolvedShape>),
    Struct {
        name: String,
        fields: Vec<ResolvedField>,
        tuple: bool,
    },
    Enum {
        name: String,
        variants: Vec<ResolvedVariant>,
    },
}

impl ResolvedShape {
    pub fn is_option(&self) -> bool {
        matches!(self, ResolvedShape::Option(_))
    }

    /// `Vec<u8>` and `[u8; N]` take hex input instead of element lists.
    pub fn is_byte_sequence(&self) -> bool {
        match self {
            ResolvedShape::Vec(inner) | ResolvedShape::Array(inner, _) => {
                **inner == ResolvedShape::Primitive(PrimitiveKind::U8)
            }
            _ => false,
        }
    }

    /// Short description used in error messages.
    pub fn describe(&self) -> String {
        match self {
            ResolvedShape::Primitive(p) => p.to_string(),
            ResolvedShape::Vec(inner) => format!("Vec<{}>", inner.describe()),
            ResolvedShape::Array(inner, len) => format!("[{}; {}]", inner.describe(), len),
            ResolvedShape::Option(inner) => format!("Option<{}>", inner.describe()),
            ResolvedShape::Map(k, v) => format!("Map<{}, {}>", k.describe(), v.describe()),
            ResolvedShape::Struct { name, .. } => format!("struct {}", name),
            ResolvedShape::Enum { name, .. } => format!("enum {}", name),
        }
    }
}

/// A typed value built against a [`ResolvedShape`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    U128(u128),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    I128(i128),
    F32(f32),
    F64(f64),
    String(String),
    Bytes(Vec<u8>),
    Pubkey(Pubkey),
    Vec(Vec<Value>),
    Array(Vec<Value>),
    Option(Option<Box<Value>>),
    /// Entries kept sorted by key.
    Map(Vec<(Value, Value)>),
    Struct(Vec<(String, Value)>),
    Enum {
        variant: String,
        index: u8,
        fields: Vec<(String, Value)>,
    },
}

impl Value {
    /// Short name of the variant, used in shape-mismatch errors.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::U8(_) => "u8",
            Value::U16(_) => "u16",
            Value::U32(_) => "u32",
            Value::U64(_) => "u64",
            Value::U128(_) => "u128",
            Value::I8(_) => "i8",
            Value::I16(_) => "i16",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::I128(_) => "i128",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Pubkey(_) => "pubkey",
            Value::Vec(_) => "vec",
            Value::Array(_) => "array",
            Value::Option(_) => "option",
            Value::Map(_) => "map",
            Value::Struct(_) => "struct",
            Value::Enum { .. } => "enum",
        }
    }

    /// Field of a struct value by name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Struct(fields) | Value::Enum { fields, .. } => {
                fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
            }
            _ => None,
        }
    }

    /// Ordering used for map keys; matches the key type's natural order.
    pub fn key_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::U8(a), Value::U8(b)) => a.cmp(b),
            (Value::U16(a), Value::U16(b)) => a.cmp(b),
            (Value::U32(a), Value::U32(b)) => a.cmp(b),
            (Value::U64(a), Value::U64(b)) => a.cmp(b),
            (Value::U128(a), Value::U128(b)) => a.cmp(b),
            (Value::I8(a), Value::I8(b)) => a.cmp(b),
            (Value::I16(a), Value::I16(b)) => a.cmp(b),
            (Value::I32(a), Value::I32(b)) => a.cmp(b),
            (Value::I64(a), Value::I64(b)) => a.cmp(b),
            (Value::I128(a), Value::I128(b)) => a.cmp(b),
            (Value::F32(a), Value::F32(b)) => a.total_cmp(b),
            (Value::F64(a), Value::F64(b)) => a.total_cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Bytes(a), Value::Bytes(b)) => a.cmp(b),
            (Value::Pubkey(a), Value::Pubkey(b)) => a.cmp(b),
            _ => self.to_string().cmp(&other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{}", v),
            Value::U8(v) => write!(f, "{}", v),
            Value::U16(v) => write!(f, "{}", v),
            Value::U32(v) => write!(f, "{}", v),
            Value::U64(v) => write!(f, "{}", v),
            Value::U128(v) => write!(f, "{}", v),
            Value::I8(v) => write!(f, "{}", v),
            Value::I16(v) => write!(f, "{}", v),
            Value::I32(v) => write!(f, "{}", v),
            Value::I64(v) => write!(f, "{}", v),
            Value::I128(v) => write!(f, "{}", v),
            Value::F32(v) => write!(f, "{}", v),
            Value::F64(v) => write!(f, "{}", v),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Bytes(bytes) => write!(f, "0x{}", hex::encode(bytes)),
            Value::Pubkey(key) => write!(f, "{}", key),
            Value::Vec(items) | Value::Array(items) => {
                if let Some(bytes) = as_byte_slice(items) {
                    return write!(f, "0x{}", hex::encode(bytes));
                }
                let strs: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", strs.join(", "))
            }
            Value::Option(None) => write!(f, "None"),
            Value::Option(Some(inner)) => write!(f, "Some({})", inner),
            Value::Map(entries) => {
                let strs: Vec<String> = entries.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
                write!(f, "{{{}}}", strs.join(", "))
            }
            Value::Struct(fields) => {
                let strs: Vec<String> = fields.iter().map(|(n, v)| format!("{}: {}", n, v)).collect();
                write!(f, "{{ {} }}", strs.join(", "))
            }
            Value::Enum { variant, fields, .. } => {
                if fields.is_empty() {
                    return write!(f, "{}", variant);
                }
                let strs: Vec<String> = fields.iter().map(|(n, v)| format!("{}: {}", n, v)).collect();
                write!(f, "{} {{ {} }}", variant, strs.join(", "))
            }
        }
    }
}

/// The raw bytes of a `u8` sequence, or `None` for any other element type.
pub fn as_byte_slice(items: &[Value]) -> Option<Vec<u8>> {
    if items.is_empty() {
        return None;
    }
    items
        .iter()
        .map(|v| match v {
            Value::U8(b) => Some(*b),
            _ => None,
        })
        .collect()
}
