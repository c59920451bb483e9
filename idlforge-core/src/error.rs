//! Structured error types for the instruction composer.
//!
//! Each stage has its own error type so callers can tell a broken schema
//! (fatal to the load) from a bad form field (fixable by the user).

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or resolving a schema.
///
/// These are fatal to the current schema load; there is no recovery other
/// than supplying a corrected IDL.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// A named type (or primitive) that the IDL does not define
    #[error("unknown type `{0}`")]
    UnknownType(String),

    /// Resolution revisited a type already on the active path
    #[error("cyclic type reference: {}", .0.join(" -> "))]
    CyclicType(Vec<String>),

    /// Two definitions share a name
    #[error("type `{0}` is defined more than once")]
    DuplicateType(String),

    /// Structurally valid JSON that does not describe a usable program
    #[error("invalid IDL: {0}")]
    InvalidIdl(String),

    /// Neither the IDL nor the caller supplied a program address
    #[error("no program address: the IDL does not declare one and none was given")]
    MissingProgramId,
}

/// Classification of a single coercion failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoercionErrorKind {
    InvalidFormat,
    OutOfRange,
    InvalidLength,
    UnknownVariant,
}

impl fmt::Display for CoercionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CoercionErrorKind::InvalidFormat => "invalid format",
            CoercionErrorKind::OutOfRange => "out of range",
            CoercionErrorKind::InvalidLength => "invalid length",
            CoercionErrorKind::UnknownVariant => "unknown variant",
        };
        f.write_str(s)
    }
}

/// One step into a nested value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

/// Location of a value inside an argument, e.g. `params.items[2].amount`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldPath(pub Vec<PathSegment>);

impl FieldPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<value>");
        }
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Field(name) if i == 0 => write!(f, "{}", name)?,
                PathSegment::Field(name) => write!(f, ".{}", name)?,
                PathSegment::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}

/// A single field that failed to coerce.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{path}: {kind}: {message}")]
pub struct CoercionError {
    pub path: FieldPath,
    pub kind: CoercionErrorKind,
    pub message: String,
}

/// Every field error found while coercing one raw input.
///
/// Coercion does not stop at the first bad field so a form can highlight
/// all of them at once.
#[derive(Error, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoercionErrors(pub Vec<CoercionError>);

impl CoercionErrors {
    pub fn iter(&self) -> impl Iterator<Item = &CoercionError> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The error reported at `path` (rendered form, e.g. `"owner"`), if any.
    pub fn at(&self, path: &str) -> Option<&CoercionError> {
        self.0.iter().find(|e| e.path.to_string() == path)
    }

    /// Prefix every path with `segment`, used when an argument name is known.
    pub fn nested_under(mut self, segment: PathSegment) -> Self {
        for error in &mut self.0 {
            error.path.0.insert(0, segment.clone());
        }
        self
    }
}

impl fmt::Display for CoercionErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|e| e.to_string()).collect();
        f.write_str(&parts.join("; "))
    }
}

/// Failure to lay out a value in its binary form.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// The value does not have the structure its shape describes
    #[error("value does not match shape: expected {expected}, found {found}")]
    ShapeMismatch { expected: String, found: String },

    /// Wrong number of arguments for the call
    #[error("expected {expected} arguments, got {actual}")]
    ArgumentCount { expected: usize, actual: usize },

    /// Collection longer than a u32 length prefix can describe
    #[error("{what} has {len} elements, more than a u32 prefix allows")]
    TooLong { what: &'static str, len: usize },

    /// The underlying writer or borsh rejected the value
    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl From<std::io::Error> for EncodeError {
    fn from(e: std::io::Error) -> Self {
        EncodeError::Serialization(e.to_string())
    }
}

/// Errors while reading Borsh data back into values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("data ends at offset {offset}, {needed} more bytes needed for {what}")]
    Truncated {
        what: &'static str,
        offset: usize,
        needed: usize,
    },

    /// A bool, option or enum tag outside its range
    #[error("invalid {what} tag {tag} at offset {offset}")]
    InvalidTag { what: &'static str, tag: u8, offset: usize },

    #[error("invalid {what} at offset {offset}: {message}")]
    Invalid {
        what: &'static str,
        offset: usize,
        message: String,
    },

    #[error("{0} bytes left over after the value")]
    TrailingBytes(usize),

    #[error("account discriminator is {found}, expected {expected}")]
    Discriminator { expected: String, found: String },

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Errors while editing or using a form.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("no instruction is selected")]
    NoCallSelected,

    #[error("instruction has no argument named `{0}`")]
    UnknownArgument(String),

    #[error("instruction has no account named `{0}`")]
    UnknownAccount(String),

    #[error("account `{account}` has {len} seeds, index {index} is out of bounds")]
    SeedIndex {
        account: String,
        index: usize,
        len: usize,
    },
}

/// Errors raised by address derivation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DerivationError {
    #[error(transparent)]
    Form(#[from] FormError),

    /// The seed's literal value cannot be encoded as its kind
    #[error("seed {index}: {message}")]
    InvalidSeed { index: usize, message: String },

    /// The seed references an account or argument with no usable value yet
    #[error("seed {index}: `{name}` has no value yet")]
    UnresolvedReference { index: usize, name: String },

    #[error("seed {index} is {len} bytes, the maximum is {max}")]
    SeedTooLong { index: usize, len: usize, max: usize },

    #[error("{count} seeds given, at most {max} are allowed")]
    TooManySeeds { count: usize, max: usize },

    /// No bump produced an off-curve address
    #[error("no valid bump found for these seeds")]
    NoViableBump,

    #[error("instruction `{0}` is not defined by the current program")]
    UnknownCall(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_path_display() {
        let path = FieldPath(vec![
            PathSegment::Field("params".into()),
            PathSegment::Field("items".into()),
            PathSegment::Index(2),
            PathSegment::Field("amount".into()),
        ]);
        assert_eq!(path.to_string(), "params.items[2].amount");
        assert_eq!(FieldPath::root().to_string(), "<value>");
    }

    #[test]
    fn nested_under_prefixes_every_error() {
        let errors = CoercionErrors(vec![CoercionError {
            path: FieldPath(vec![PathSegment::Index(1)]),
            kind: CoercionErrorKind::OutOfRange,
            message: "too big".into(),
        }])
        .nested_under(PathSegment::Field("amounts".into()));
        assert!(errors.at("amounts[1]").is_some());
    }
}
