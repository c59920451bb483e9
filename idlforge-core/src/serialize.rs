//! Borsh encoding of coerced values and instruction data.
//!
//! Layout: integers and floats little-endian, `bool` as one byte, strings
//! and byte strings with a u32 length prefix, pubkeys as 32 raw bytes,
//! vectors and maps with a u32 count, fixed arrays unprefixed, options as a
//! presence byte, enums as a u8 discriminant followed by the variant fields.
//! [`decode`] reads the same layout back.

use std::io::Write;

use borsh::{BorshDeserialize, BorshSerialize};
use sha2::{Digest, Sha256};
use solana_program::pubkey::Pubkey;
use tracing::debug;

use crate::error::{DecodeError, EncodeError};
use crate::hex::hex_encode;
use crate::resolve::resolve;
use crate::schema::{AccountType, CallDefinition, TypeRegistry};
use crate::types::{PrimitiveKind, ResolvedField, ResolvedShape, TypeRef, Value};

/// Anchor's 8-byte selector: `sha256("<namespace>:<name>")[..8]`.
pub fn sighash(namespace: &str, name: &str) -> [u8; 8] {
    let digest = Sha256::digest(format!("{}:{}", namespace, name).as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[..8]);
    out
}

/// Discriminator Anchor prefixes to the data of account type `name`.
pub fn account_discriminator(name: &str) -> [u8; 8] {
    sighash("account", name)
}

/// Encode `args` (in declared order) as instruction data for `call`.
pub fn encode_call(call: &CallDefinition, registry: &TypeRegistry, args: &[Value]) -> Result<Vec<u8>, EncodeError> {
    if args.len() != call.args.len() {
        return Err(EncodeError::ArgumentCount {
            expected: call.args.len(),
            actual: args.len(),
        });
    }
    let mut out = call.discriminator.to_vec();
    for (spec, value) in call.args.iter().zip(args) {
        let shape = resolve(&spec.ty, registry)?;
        encode_value(&mut out, value, &shape)?;
    }
    debug!(instruction = %call.name, len = out.len(), "encoded instruction data");
    Ok(out)
}

/// Encode a single value to a fresh buffer.
pub fn to_bytes(value: &Value, shape: &ResolvedShape) -> Result<Vec<u8>, EncodeError> {
    let mut out = Vec::new();
    encode_value(&mut out, value, shape)?;
    Ok(out)
}

pub fn encode_value<W: Write>(out: &mut W, value: &Value, shape: &ResolvedShape) -> Result<(), EncodeError> {
    match (shape, value) {
        (ResolvedShape::Primitive(kind), _) => encode_primitive(out, *kind, value),
        (ResolvedShape::Vec(inner), Value::Vec(items)) => {
            write_len(out, "vec", items.len())?;
            for item in items {
                encode_value(out, item, inner)?;
            }
            Ok(())
        }
        (ResolvedShape::Array(inner, len), Value::Array(items)) => {
            if items.len() != *len {
                return Err(mismatch(shape, value));
            }
            for item in items {
                encode_value(out, item, inner)?;
            }
            Ok(())
        }
        (ResolvedShape::Option(_), Value::Option(None)) => {
            out.write_all(&[0])?;
            Ok(())
        }
        (ResolvedShape::Option(inner), Value::Option(Some(v))) => {
            out.write_all(&[1])?;
            encode_value(out, v, inner)
        }
        (ResolvedShape::Map(key, val), Value::Map(entries)) => {
            write_len(out, "map", entries.len())?;
            let mut sorted: Vec<&(Value, Value)> = entries.iter().collect();
            sorted.sort_by(|a, b| a.0.key_cmp(&b.0));
            for (k, v) in sorted {
                encode_value(out, k, key)?;
                encode_value(out, v, val)?;
            }
            Ok(())
        }
        (ResolvedShape::Struct { fields, .. }, Value::Struct(values)) => encode_fields(out, fields, values),
        (ResolvedShape::Enum { variants, .. }, Value::Enum { variant, fields, .. }) => {
            let def = variants
                .iter()
                .find(|v| &v.name == variant)
                .ok_or_else(|| mismatch(shape, value))?;
            out.write_all(&[def.index])?;
            encode_fields(out, &def.fields, fields)
        }
        _ => Err(mismatch(shape, value)),
    }
}

fn encode_fields<W: Write>(out: &mut W, fields: &[ResolvedField], values: &[(String, Value)]) -> Result<(), EncodeError> {
    for field in fields {
        let value = values
            .iter()
            .find(|(name, _)| name == &field.name)
            .map(|(_, v)| v)
            .ok_or_else(|| EncodeError::ShapeMismatch {
                expected: format!("field `{}`", field.name),
                found: "nothing".into(),
            })?;
        encode_value(out, value, &field.shape)?;
    }
    Ok(())
}

fn encode_primitive<W: Write>(out: &mut W, kind: PrimitiveKind, value: &Value) -> Result<(), EncodeError> {
    match (kind, value) {
        (PrimitiveKind::Bool, Value::Bool(v)) => v.serialize(out)?,
        (PrimitiveKind::U8, Value::U8(v)) => v.serialize(out)?,
        (PrimitiveKind::U16, Value::U16(v)) => v.serialize(out)?,
        (PrimitiveKind::U32, Value::U32(v)) => v.serialize(out)?,
        (PrimitiveKind::U64, Value::U64(v)) => v.serialize(out)?,
        (PrimitiveKind::U128, Value::U128(v)) => v.serialize(out)?,
        (PrimitiveKind::I8, Value::I8(v)) => v.serialize(out)?,
        (PrimitiveKind::I16, Value::I16(v)) => v.serialize(out)?,
        (PrimitiveKind::I32, Value::I32(v)) => v.serialize(out)?,
        (PrimitiveKind::I64, Value::I64(v)) => v.serialize(out)?,
        (PrimitiveKind::I128, Value::I128(v)) => v.serialize(out)?,
        (PrimitiveKind::F32, Value::F32(v)) => v.serialize(out)?,
        (PrimitiveKind::F64, Value::F64(v)) => v.serialize(out)?,
        (PrimitiveKind::String, Value::String(s)) => {
            write_len(out, "string", s.len())?;
            out.write_all(s.as_bytes())?;
        }
        (PrimitiveKind::Bytes, Value::Bytes(b)) => {
            write_len(out, "bytes", b.len())?;
            out.write_all(b)?;
        }
        (PrimitiveKind::Pubkey, Value::Pubkey(key)) => out.write_all(key.as_ref())?,
        _ => {
            return Err(EncodeError::ShapeMismatch {
                expected: kind.to_string(),
                found: value.kind_name().to_string(),
            })
        }
    }
    Ok(())
}

fn write_len<W: Write>(out: &mut W, what: &'static str, len: usize) -> Result<(), EncodeError> {
    let len32 = u32::try_from(len).map_err(|_| EncodeError::TooLong { what, len })?;
    out.write_all(&len32.to_le_bytes())?;
    Ok(())
}

fn mismatch(shape: &ResolvedShape, value: &Value) -> EncodeError {
    EncodeError::ShapeMismatch {
        expected: shape.describe(),
        found: value.kind_name().to_string(),
    }
}

/// Decode exactly one value of `shape`; leftover bytes are an error.
pub fn decode(bytes: &[u8], shape: &ResolvedShape) -> Result<Value, DecodeError> {
    let (value, used) = decode_prefix(bytes, shape)?;
    match bytes.len() - used {
        0 => Ok(value),
        extra => Err(DecodeError::TrailingBytes(extra)),
    }
}

/// Decode one value from the front of `bytes`, returning it with the number
/// of bytes it took.
pub fn decode_prefix(bytes: &[u8], shape: &ResolvedShape) -> Result<(Value, usize), DecodeError> {
    let mut reader = Reader { data: bytes, pos: 0 };
    let value = reader.value(shape)?;
    Ok((value, reader.pos))
}

/// Decode stored account data: the discriminator, then the account struct.
///
/// Accounts are usually allocated larger than their contents, so bytes
/// after the struct are ignored.
pub fn decode_account(data: &[u8], account: &AccountType, registry: &TypeRegistry) -> Result<Value, DecodeError> {
    let shape = resolve(&TypeRef::Named(account.name.clone()), registry)?;
    let mut reader = Reader { data, pos: 0 };
    let found = reader.take(8, "discriminator")?;
    if found != account.discriminator {
        return Err(DecodeError::Discriminator {
            expected: hex_encode(&account.discriminator),
            found: hex_encode(found),
        });
    }
    reader.value(&shape)
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize, what: &'static str) -> Result<&'a [u8], DecodeError> {
        let left = self.data.len() - self.pos;
        if left < n {
            return Err(DecodeError::Truncated {
                what,
                offset: self.pos,
                needed: n - left,
            });
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn read<T: BorshDeserialize>(&mut self, what: &'static str) -> Result<T, DecodeError> {
        let offset = self.pos;
        let bytes = self.take(std::mem::size_of::<T>(), what)?;
        T::try_from_slice(bytes).map_err(|e| DecodeError::Invalid {
            what,
            offset,
            message: e.to_string(),
        })
    }

    fn tag(&mut self, what: &'static str) -> Result<(u8, usize), DecodeError> {
        let offset = self.pos;
        Ok((self.read::<u8>(what)?, offset))
    }

    fn length(&mut self, what: &'static str) -> Result<usize, DecodeError> {
        let n = self.read::<u32>(what)?;
        Ok(n as usize)
    }

    fn value(&mut self, shape: &ResolvedShape) -> Result<Value, DecodeError> {
        match shape {
            ResolvedShape::Primitive(kind) => self.primitive(*kind),
            ResolvedShape::Vec(inner) => {
                let n = self.length("vec length")?;
                self.items(n, inner).map(Value::Vec)
            }
            ResolvedShape::Array(inner, n) => self.items(*n, inner).map(Value::Array),
            ResolvedShape::Option(inner) => match self.tag("option")? {
                (0, _) => Ok(Value::Option(None)),
                (1, _) => Ok(Value::Option(Some(Box::new(self.value(inner)?)))),
                (tag, offset) => Err(DecodeError::InvalidTag {
                    what: "option",
                    tag,
                    offset,
                }),
            },
            ResolvedShape::Map(key, val) => {
                let n = self.length("map length")?;
                let mut entries = Vec::with_capacity(n.min(self.data.len() - self.pos));
                for _ in 0..n {
                    let k = self.value(key)?;
                    let v = self.value(val)?;
                    entries.push((k, v));
                }
                Ok(Value::Map(entries))
            }
            ResolvedShape::Struct { fields, .. } => self.fields(fields).map(Value::Struct),
            ResolvedShape::Enum { variants, .. } => {
                let (index, offset) = self.tag("enum")?;
                let def = variants.iter().find(|v| v.index == index).ok_or(DecodeError::InvalidTag {
                    what: "enum",
                    tag: index,
                    offset,
                })?;
                Ok(Value::Enum {
                    variant: def.name.clone(),
                    index,
                    fields: self.fields(&def.fields)?,
                })
            }
        }
    }

    fn items(&mut self, n: usize, inner: &ResolvedShape) -> Result<Vec<Value>, DecodeError> {
        // Capacity is capped by the bytes left, not by the prefix.
        let mut items = Vec::with_capacity(n.min(self.data.len() - self.pos));
        for _ in 0..n {
            items.push(self.value(inner)?);
        }
        Ok(items)
    }

    fn fields(&mut self, fields: &[ResolvedField]) -> Result<Vec<(String, Value)>, DecodeError> {
        let mut out = Vec::with_capacity(fields.len());
        for field in fields {
            out.push((field.name.clone(), self.value(&field.shape)?));
        }
        Ok(out)
    }

    fn primitive(&mut self, kind: PrimitiveKind) -> Result<Value, DecodeError> {
        Ok(match kind {
            PrimitiveKind::Bool => match self.tag("bool")? {
                (0, _) => Value::Bool(false),
                (1, _) => Value::Bool(true),
                (tag, offset) => return Err(DecodeError::InvalidTag { what: "bool", tag, offset }),
            },
            PrimitiveKind::U8 => Value::U8(self.read("u8")?),
            PrimitiveKind::U16 => Value::U16(self.read("u16")?),
            PrimitiveKind::U32 => Value::U32(self.read("u32")?),
            PrimitiveKind::U64 => Value::U64(self.read("u64")?),
            PrimitiveKind::U128 => Value::U128(self.read("u128")?),
            PrimitiveKind::I8 => Value::I8(self.read("i8")?),
            PrimitiveKind::I16 => Value::I16(self.read("i16")?),
            PrimitiveKind::I32 => Value::I32(self.read("i32")?),
            PrimitiveKind::I64 => Value::I64(self.read("i64")?),
            PrimitiveKind::I128 => Value::I128(self.read("i128")?),
            PrimitiveKind::F32 => Value::F32(self.read("f32")?),
            PrimitiveKind::F64 => Value::F64(self.read("f64")?),
            PrimitiveKind::String => {
                let n = self.length("string length")?;
                let offset = self.pos;
                let bytes = self.take(n, "string")?;
                let text = std::str::from_utf8(bytes).map_err(|e| DecodeError::Invalid {
                    what: "string",
                    offset,
                    message: e.to_string(),
                })?;
                Value::String(text.to_string())
            }
            PrimitiveKind::Bytes => {
                let n = self.length("bytes length")?;
                Value::Bytes(self.take(n, "bytes")?.to_vec())
            }
            PrimitiveKind::Pubkey => Value::Pubkey(Pubkey::new_from_array(self.read("pubkey")?)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_sighash_matches_anchor() {
        assert_eq!(sighash("global", "initialize"), [175, 175, 109, 31, 13, 152, 155, 237]);
    }

    #[test]
    fn option_and_string_layout() {
        let shape = ResolvedShape::Option(Box::new(ResolvedShape::Primitive(PrimitiveKind::String)));
        let bytes = to_bytes(
            &Value::Option(Some(Box::new(Value::String("hi".into())))),
            &shape,
        )
        .unwrap();
        assert_eq!(bytes, vec![1, 2, 0, 0, 0, b'h', b'i']);
        assert_eq!(to_bytes(&Value::Option(None), &shape).unwrap(), vec![0]);
    }

    #[test]
    fn decode_reads_the_option_layout_back() {
        let shape = ResolvedShape::Option(Box::new(ResolvedShape::Primitive(PrimitiveKind::String)));
        assert_eq!(
            decode(&[1, 2, 0, 0, 0, b'h', b'i'], &shape).unwrap(),
            Value::Option(Some(Box::new(Value::String("hi".into()))))
        );
        assert_eq!(
            decode(&[2], &shape),
            Err(DecodeError::InvalidTag {
                what: "option",
                tag: 2,
                offset: 0
            })
        );
        assert_eq!(decode(&[0, 9], &shape), Err(DecodeError::TrailingBytes(1)));
    }

    #[test]
    fn account_discriminator_matches_anchor() {
        assert_eq!(account_discriminator("Vault"), [211, 8, 232, 43, 2, 152, 117, 119]);
    }

    #[test]
    fn mismatched_value_is_rejected() {
        let err = to_bytes(&Value::Bool(true), &ResolvedShape::Primitive(PrimitiveKind::U8)).unwrap_err();
        assert!(matches!(err, EncodeError::ShapeMismatch { .. }));
    }
}
