//! # idlforge core
//!
//! Schema-driven instruction composition for Anchor programs: load an IDL,
//! resolve its types, coerce raw form input into typed values, derive
//! program addresses, validate a call and encode its instruction data, and
//! decode stored account data against the same types.
//! Everything here is pure computation; submission lives in `idlforge-cli`.

pub mod error;
pub mod form;
pub mod hex;
pub mod idl;
pub mod parse;
pub mod pda;
pub mod resolve;
pub mod schema;
pub mod serialize;
pub mod session;
pub mod types;
pub mod validation;

pub mod prelude {
    pub use crate::error::{
        CoercionError, CoercionErrorKind, CoercionErrors, DecodeError, DerivationError, EncodeError, FormError,
        SchemaError,
    };
    pub use crate::form::{AccountInput, CallInputState, FormState};
    pub use crate::idl::AnchorIdl;
    pub use crate::parse::{coerce, coerce_str, render};
    pub use crate::pda::{derive_account, derive_address, SeedComponent, SeedKind, SeedTemplate};
    pub use crate::resolve::resolve;
    pub use crate::schema::{AccountSpec, AccountType, ArgumentSpec, CallDefinition, Schema, TypeRegistry};
    pub use crate::serialize::{decode, decode_account, encode_call};
    pub use crate::session::Session;
    pub use crate::types::{PrimitiveKind, ResolvedShape, TypeRef, Value};
    pub use crate::validation::{check, is_submittable, ValidationReport};
}
