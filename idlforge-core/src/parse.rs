//! Shape-aware coercion of raw form input into typed values.
//!
//! Raw input is JSON: whatever a form field or command-line flag produced,
//! usually a string. [`coerce`] walks the input alongside a
//! [`ResolvedShape`], collecting every field error with its path instead of
//! stopping at the first. [`render`] is the inverse and produces input that
//! [`coerce`] accepts again unchanged.

use serde_json::{Map as JsonMap, Value as JsonValue};
use solana_program::pubkey::Pubkey;

use crate::error::{CoercionError, CoercionErrorKind, CoercionErrors, FieldPath, PathSegment};
use crate::hex::{decode_bytes_32, hex_decode, hex_encode, strip_hex_prefix, KeyDecodeError};
use crate::types::{as_byte_slice, PrimitiveKind, ResolvedField, ResolvedShape, ResolvedVariant, Value};

/// Coerce raw input against `shape`.
pub fn coerce(raw: &JsonValue, shape: &ResolvedShape) -> Result<Value, CoercionErrors> {
    let mut c = Coercion::default();
    let value = c.value(raw, shape);
    match value {
        Some(v) if c.errors.is_empty() => Ok(v),
        _ => Err(CoercionErrors(c.errors)),
    }
}

/// Coerce a single text field, as typed on a command line.
pub fn coerce_str(raw: &str, shape: &ResolvedShape) -> Result<Value, CoercionErrors> {
    coerce(&JsonValue::String(raw.to_string()), shape)
}

/// Null and blank text count as "no input".
pub fn is_empty_input(raw: &JsonValue) -> bool {
    match raw {
        JsonValue::Null => true,
        JsonValue::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

#[derive(Default)]
struct Coercion {
    path: Vec<PathSegment>,
    errors: Vec<CoercionError>,
}

impl Coercion {
    fn fail<T>(&mut self, kind: CoercionErrorKind, message: impl Into<String>) -> Option<T> {
        self.errors.push(CoercionError {
            path: FieldPath(self.path.clone()),
            kind,
            message: message.into(),
        });
        None
    }

    fn nested<T>(&mut self, segment: PathSegment, f: impl FnOnce(&mut Self) -> Option<T>) -> Option<T> {
        self.path.push(segment);
        let out = f(self);
        self.path.pop();
        out
    }

    fn value(&mut self, raw: &JsonValue, shape: &ResolvedShape) -> Option<Value> {
        match shape {
            ResolvedShape::Primitive(kind) => self.primitive(raw, *kind),
            ResolvedShape::Vec(_) if shape.is_byte_sequence() => {
                let bytes = self.bytes(raw, None)?;
                Some(Value::Vec(bytes.into_iter().map(Value::U8).collect()))
            }
            ResolvedShape::Array(_, len) if shape.is_byte_sequence() => {
                let bytes = self.bytes(raw, Some(*len))?;
                Some(Value::Array(bytes.into_iter().map(Value::U8).collect()))
            }
            ResolvedShape::Vec(inner) => {
                let items = self.list(raw)?;
                self.elements(&items, inner).map(Value::Vec)
            }
            ResolvedShape::Array(inner, len) => {
                let items = self.list(raw)?;
                if items.len() != *len {
                    return self.fail(
                        CoercionErrorKind::InvalidLength,
                        format!("expected {} elements, got {}", len, items.len()),
                    );
                }
                self.elements(&items, inner).map(Value::Array)
            }
            ResolvedShape::Option(inner) => {
                if is_empty_input(raw) {
                    Some(Value::Option(None))
                } else {
                    self.value(raw, inner).map(|v| Value::Option(Some(Box::new(v))))
                }
            }
            ResolvedShape::Map(key, value) => self.map(raw, key, value),
            ResolvedShape::Struct { fields, tuple, .. } => {
                self.fields(raw, fields, *tuple).map(Value::Struct)
            }
            ResolvedShape::Enum { name, variants } => self.enumeration(raw, name, variants),
        }
    }

    fn primitive(&mut self, raw: &JsonValue, kind: PrimitiveKind) -> Option<Value> {
        match kind {
            PrimitiveKind::Bool => match raw {
                JsonValue::Bool(b) => Some(Value::Bool(*b)),
                JsonValue::String(s) if s.trim().eq_ignore_ascii_case("true") => Some(Value::Bool(true)),
                JsonValue::String(s) if s.trim().eq_ignore_ascii_case("false") => Some(Value::Bool(false)),
                other => self.fail(
                    CoercionErrorKind::InvalidFormat,
                    format!("expected true or false, got {}", other),
                ),
            },
            PrimitiveKind::String => match raw {
                JsonValue::String(s) => Some(Value::String(s.clone())),
                other => self.fail(CoercionErrorKind::InvalidFormat, format!("expected text, got {}", other)),
            },
            PrimitiveKind::Bytes => self.bytes(raw, None).map(Value::Bytes),
            PrimitiveKind::Pubkey => self.pubkey(raw).map(Value::Pubkey),
            PrimitiveKind::F32 | PrimitiveKind::F64 => self.float(raw, kind),
            _ => self.integer(raw, kind),
        }
    }

    fn integer(&mut self, raw: &JsonValue, kind: PrimitiveKind) -> Option<Value> {
        let text = match raw {
            JsonValue::Number(n) => n.to_string(),
            JsonValue::String(s) => s.trim().to_string(),
            other => {
                return self.fail(
                    CoercionErrorKind::InvalidFormat,
                    format!("expected a {} number, got {}", kind, other),
                )
            }
        };
        let parsed = match parse_int_text(&text) {
            Ok(n) => n,
            Err(kind_) => {
                let message = match kind_ {
                    CoercionErrorKind::OutOfRange => format!("`{}` does not fit in {}", text, kind),
                    _ => format!("`{}` is not a whole number", text),
                };
                return self.fail(kind_, message);
            }
        };

        macro_rules! fit {
            ($variant:ident, $t:ty) => {
                match parsed {
                    IntText::Pos(v) => <$t>::try_from(v).ok(),
                    IntText::Neg(v) => <$t>::try_from(v).ok(),
                }
                .map(Value::$variant)
            };
        }

        let value = match kind {
            PrimitiveKind::U8 => fit!(U8, u8),
            PrimitiveKind::U16 => fit!(U16, u16),
            PrimitiveKind::U32 => fit!(U32, u32),
            PrimitiveKind::U64 => fit!(U64, u64),
            PrimitiveKind::U128 => fit!(U128, u128),
            PrimitiveKind::I8 => fit!(I8, i8),
            PrimitiveKind::I16 => fit!(I16, i16),
            PrimitiveKind::I32 => fit!(I32, i32),
            PrimitiveKind::I64 => fit!(I64, i64),
            PrimitiveKind::I128 => fit!(I128, i128),
            _ => None,
        };
        match value {
            Some(v) => Some(v),
            None => self.fail(
                CoercionErrorKind::OutOfRange,
                format!("`{}` does not fit in {}", text, kind),
            ),
        }
    }

    fn float(&mut self, raw: &JsonValue, kind: PrimitiveKind) -> Option<Value> {
        let parsed = match raw {
            JsonValue::Number(n) => n.as_f64(),
            JsonValue::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        let v = match parsed {
            Some(v) if v.is_finite() => v,
            _ => {
                return self.fail(
                    CoercionErrorKind::InvalidFormat,
                    format!("expected a finite {} number, got {}", kind, raw),
                )
            }
        };
        if kind == PrimitiveKind::F64 {
            return Some(Value::F64(v));
        }
        let narrowed = v as f32;
        if narrowed.is_infinite() {
            return self.fail(CoercionErrorKind::OutOfRange, format!("`{}` does not fit in f32", v));
        }
        Some(Value::F32(narrowed))
    }

    fn pubkey(&mut self, raw: &JsonValue) -> Option<Pubkey> {
        let text = match raw {
            JsonValue::String(s) => s.trim(),
            other => {
                return self.fail(
                    CoercionErrorKind::InvalidFormat,
                    format!("expected a base58 address, got {}", other),
                )
            }
        };
        match decode_bytes_32(text) {
            Ok(bytes) => Some(Pubkey::new_from_array(bytes)),
            Err(KeyDecodeError::Length(0)) => {
                self.fail(CoercionErrorKind::InvalidLength, "address is empty")
            }
            Err(KeyDecodeError::Length(n)) => self.fail(
                CoercionErrorKind::InvalidLength,
                format!("address decodes to {} bytes, expected 32", n),
            ),
            Err(KeyDecodeError::Format) => self.fail(
                CoercionErrorKind::InvalidFormat,
                format!("`{}` is not a base58 address", text),
            ),
        }
    }

    /// Byte strings: `0x` hex, a list of numbers, or (fixed length only)
    /// bare hex of exactly twice the length.
    fn bytes(&mut self, raw: &JsonValue, fixed: Option<usize>) -> Option<Vec<u8>> {
        let bytes = match raw {
            JsonValue::String(s) => {
                let s = s.trim();
                if let Some(digits) = strip_hex_prefix(s) {
                    match hex_decode(digits) {
                        Ok(b) => b,
                        Err(e) => return self.fail(CoercionErrorKind::InvalidFormat, e),
                    }
                } else if fixed.map(|n| n > 0 && s.len() == n * 2).unwrap_or(false)
                    && s.chars().all(|c| c.is_ascii_hexdigit())
                {
                    match hex_decode(s) {
                        Ok(b) => b,
                        Err(e) => return self.fail(CoercionErrorKind::InvalidFormat, e),
                    }
                } else if s.is_empty() {
                    Vec::new()
                } else if s.starts_with('[') {
                    match serde_json::from_str::<JsonValue>(s) {
                        Ok(parsed @ JsonValue::Array(_)) => return self.bytes(&parsed, fixed),
                        _ => return self.fail(CoercionErrorKind::InvalidFormat, "malformed byte list"),
                    }
                } else {
                    let items: Vec<JsonValue> = s.split(',').map(|p| JsonValue::String(p.trim().to_string())).collect();
                    return self.bytes(&JsonValue::Array(items), fixed);
                }
            }
            JsonValue::Array(items) => {
                let parsed: Vec<Option<u8>> = items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| {
                        self.nested(PathSegment::Index(i), |c| match c.integer(item, PrimitiveKind::U8) {
                            Some(Value::U8(b)) => Some(b),
                            _ => None,
                        })
                    })
                    .collect();
                parsed.into_iter().collect::<Option<Vec<u8>>>()?
            }
            other => {
                return self.fail(
                    CoercionErrorKind::InvalidFormat,
                    format!("expected 0x-prefixed hex or a byte list, got {}", other),
                )
            }
        };
        match fixed {
            Some(n) if bytes.len() != n => self.fail(
                CoercionErrorKind::InvalidLength,
                format!("expected {} bytes, got {}", n, bytes.len()),
            ),
            _ => Some(bytes),
        }
    }

    /// A JSON array, JSON array text, or comma-delimited text.
    fn list(&mut self, raw: &JsonValue) -> Option<Vec<JsonValue>> {
        match raw {
            JsonValue::Array(items) => Some(items.clone()),
            JsonValue::String(s) => {
                let s = s.trim();
                if s.is_empty() {
                    Some(Vec::new())
                } else if s.starts_with('[') {
                    match serde_json::from_str::<JsonValue>(s) {
                        Ok(JsonValue::Array(items)) => Some(items),
                        _ => self.fail(CoercionErrorKind::InvalidFormat, "malformed list"),
                    }
                } else {
                    Some(s.split(',').map(|p| JsonValue::String(p.trim().to_string())).collect())
                }
            }
            other => self.fail(CoercionErrorKind::InvalidFormat, format!("expected a list, got {}", other)),
        }
    }

    fn elements(&mut self, items: &[JsonValue], shape: &ResolvedShape) -> Option<Vec<Value>> {
        let values: Vec<Option<Value>> = items
            .iter()
            .enumerate()
            .map(|(i, item)| self.nested(PathSegment::Index(i), |c| c.value(item, shape)))
            .collect();
        values.into_iter().collect()
    }

    fn map(&mut self, raw: &JsonValue, key: &ResolvedShape, value: &ResolvedShape) -> Option<Value> {
        let pairs: Vec<(JsonValue, JsonValue)> = match raw {
            JsonValue::Object(obj) => obj
                .iter()
                .map(|(k, v)| (JsonValue::String(k.clone()), v.clone()))
                .collect(),
            JsonValue::Array(items) => {
                let mut pairs = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    match item {
                        JsonValue::Array(pair) if pair.len() == 2 => pairs.push((pair[0].clone(), pair[1].clone())),
                        _ => {
                            return self.nested(PathSegment::Index(i), |c| {
                                c.fail(CoercionErrorKind::InvalidFormat, "expected a [key, value] pair")
                            })
                        }
                    }
                }
                pairs
            }
            JsonValue::String(s) if s.trim().is_empty() => Vec::new(),
            JsonValue::String(s) => match serde_json::from_str::<JsonValue>(s.trim()) {
                Ok(parsed @ (JsonValue::Object(_) | JsonValue::Array(_))) => return self.map(&parsed, key, value),
                _ => return self.fail(CoercionErrorKind::InvalidFormat, "malformed map"),
            },
            other => return self.fail(CoercionErrorKind::InvalidFormat, format!("expected a map, got {}", other)),
        };

        let entries: Vec<Option<(Value, Value)>> = pairs
            .iter()
            .map(|(k, v)| {
                let label = match k {
                    JsonValue::String(s) => s.clone(),
                    other => other.to_string(),
                };
                self.nested(PathSegment::Field(label), |c| {
                    let k = c.value(k, key);
                    let v = c.value(v, value);
                    Some((k?, v?))
                })
            })
            .collect();
        let mut entries: Vec<(Value, Value)> = entries.into_iter().collect::<Option<_>>()?;
        entries.sort_by(|a, b| a.0.key_cmp(&b.0));
        if let Some(dup) = entries.windows(2).find(|w| w[0].0 == w[1].0) {
            let message = format!("duplicate key {}", dup[0].0);
            return self.fail(CoercionErrorKind::InvalidFormat, message);
        }
        Some(Value::Map(entries))
    }

    /// Struct or variant fields. Missing non-option fields are reported at
    /// their own path; keys the shape does not declare are ignored.
    fn fields(&mut self, raw: &JsonValue, fields: &[ResolvedField], tuple: bool) -> Option<Vec<(String, Value)>> {
        if let JsonValue::String(s) = raw {
            let text = s.trim();
            return match serde_json::from_str::<JsonValue>(text) {
                Ok(parsed @ (JsonValue::Object(_) | JsonValue::Array(_))) => self.fields(&parsed, fields, tuple),
                _ if tuple && fields.len() == 1 => self.fields(&JsonValue::Array(vec![raw.clone()]), fields, tuple),
                _ => self.fail(CoercionErrorKind::InvalidFormat, "expected an object of fields"),
            };
        }

        let supplied: Vec<Option<&JsonValue>> = match raw {
            JsonValue::Object(obj) => fields.iter().map(|f| obj.get(&f.name)).collect(),
            JsonValue::Array(items) if tuple => {
                if items.len() != fields.len() {
                    return self.fail(
                        CoercionErrorKind::InvalidLength,
                        format!("expected {} fields, got {}", fields.len(), items.len()),
                    );
                }
                items.iter().map(Some).collect()
            }
            other if tuple && fields.len() == 1 => {
                let single = other.clone();
                return self.fields(&JsonValue::Array(vec![single]), fields, tuple);
            }
            other => {
                return self.fail(
                    CoercionErrorKind::InvalidFormat,
                    format!("expected an object of fields, got {}", other),
                )
            }
        };

        let values: Vec<Option<(String, Value)>> = fields
            .iter()
            .zip(supplied)
            .map(|(field, raw_field)| {
                self.nested(PathSegment::Field(field.name.clone()), |c| {
                    let value = match raw_field {
                        Some(v) => c.value(v, &field.shape),
                        None if field.shape.is_option() => Some(Value::Option(None)),
                        None => c.fail(CoercionErrorKind::InvalidFormat, "missing field"),
                    };
                    value.map(|v| (field.name.clone(), v))
                })
            })
            .collect();
        values.into_iter().collect()
    }

    fn enumeration(&mut self, raw: &JsonValue, name: &str, variants: &[ResolvedVariant]) -> Option<Value> {
        let (tag, payload) = match raw {
            JsonValue::String(s) => {
                let s = s.trim();
                if s.starts_with('{') {
                    match serde_json::from_str::<JsonValue>(s) {
                        Ok(parsed @ JsonValue::Object(_)) => return self.enumeration(&parsed, name, variants),
                        _ => return self.fail(CoercionErrorKind::InvalidFormat, "malformed variant object"),
                    }
                }
                (s.to_string(), None)
            }
            JsonValue::Object(obj) if obj.len() == 1 => {
                let (tag, payload) = obj.iter().next()?;
                (tag.clone(), Some(payload))
            }
            other => {
                return self.fail(
                    CoercionErrorKind::InvalidFormat,
                    format!("expected a variant of {}, got {}", name, other),
                )
            }
        };

        let Some(variant) = find_variant(variants, &tag) else {
            let known: Vec<&str> = variants.iter().map(|v| v.name.as_str()).collect();
            return self.fail(
                CoercionErrorKind::UnknownVariant,
                format!("`{}` is not a variant of {} (expected one of: {})", tag, name, known.join(", ")),
            );
        };

        if variant.is_unit() {
            return Some(Value::Enum {
                variant: variant.name.clone(),
                index: variant.index,
                fields: Vec::new(),
            });
        }

        let fields = self.nested(PathSegment::Field(variant.name.clone()), |c| match payload {
            Some(p) => c.fields(p, &variant.fields, variant.tuple),
            None => c.fail(
                CoercionErrorKind::InvalidFormat,
                format!("variant {} needs its fields", variant.name),
            ),
        })?;
        Some(Value::Enum {
            variant: variant.name.clone(),
            index: variant.index,
            fields,
        })
    }
}

enum IntText {
    Pos(u128),
    Neg(i128),
}

fn parse_int_text(text: &str) -> Result<IntText, CoercionErrorKind> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    if let Some(hex) = strip_hex_prefix(digits) {
        if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CoercionErrorKind::InvalidFormat);
        }
        let magnitude = u128::from_str_radix(hex, 16).map_err(|_| CoercionErrorKind::OutOfRange)?;
        return if negative {
            0i128
                .checked_sub_unsigned(magnitude)
                .map(IntText::Neg)
                .ok_or(CoercionErrorKind::OutOfRange)
        } else {
            Ok(IntText::Pos(magnitude))
        };
    }
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(CoercionErrorKind::InvalidFormat);
    }
    if negative {
        text.parse::<i128>()
            .map(IntText::Neg)
            .map_err(|_| CoercionErrorKind::OutOfRange)
    } else {
        digits
            .parse::<u128>()
            .map(IntText::Pos)
            .map_err(|_| CoercionErrorKind::OutOfRange)
    }
}

fn normalize_tag(s: &str) -> String {
    s.chars().filter(|c| *c != '_').flat_map(|c| c.to_lowercase()).collect()
}

fn find_variant<'a>(variants: &'a [ResolvedVariant], tag: &str) -> Option<&'a ResolvedVariant> {
    variants.iter().find(|v| v.name == tag).or_else(|| {
        let wanted = normalize_tag(tag);
        variants.iter().find(|v| normalize_tag(&v.name) == wanted)
    })
}

/// Render a value back into raw input that [`coerce`] accepts.
pub fn render(value: &Value, shape: &ResolvedShape) -> JsonValue {
    match (value, shape) {
        (Value::Bool(b), _) => JsonValue::Bool(*b),
        (Value::String(s), _) => JsonValue::String(s.clone()),
        (Value::Bytes(bytes), _) => JsonValue::String(format!("0x{}", hex_encode(bytes))),
        (Value::Pubkey(key), _) => JsonValue::String(key.to_string()),
        (Value::Vec(items), ResolvedShape::Vec(inner)) | (Value::Array(items), ResolvedShape::Array(inner, _)) => {
            if shape.is_byte_sequence() {
                let bytes = as_byte_slice(items).unwrap_or_default();
                return JsonValue::String(format!("0x{}", hex_encode(&bytes)));
            }
            JsonValue::Array(items.iter().map(|v| render(v, inner)).collect())
        }
        (Value::Option(None), _) => JsonValue::Null,
        (Value::Option(Some(inner)), ResolvedShape::Option(inner_shape)) => render(inner, inner_shape),
        (Value::Map(entries), ResolvedShape::Map(k, v)) => JsonValue::Array(
            entries
                .iter()
                .map(|(key, value)| JsonValue::Array(vec![render(key, k), render(value, v)]))
                .collect(),
        ),
        (Value::Struct(values), ResolvedShape::Struct { fields, tuple, .. }) => render_fields(values, fields, *tuple),
        (Value::Enum { variant, fields: values, .. }, ResolvedShape::Enum { variants, .. }) => {
            match variants.iter().find(|v| &v.name == variant) {
                Some(v) if !v.is_unit() => {
                    let mut obj = JsonMap::new();
                    obj.insert(variant.clone(), render_fields(values, &v.fields, v.tuple));
                    JsonValue::Object(obj)
                }
                _ => JsonValue::String(variant.clone()),
            }
        }
        // Integers and floats render as decimal text.
        (other, _) => JsonValue::String(other.to_string()),
    }
}

fn render_fields(values: &[(String, Value)], fields: &[ResolvedField], tuple: bool) -> JsonValue {
    let rendered = values.iter().map(|(name, value)| {
        let rendered = match fields.iter().find(|f| &f.name == name) {
            Some(field) => render(value, &field.shape),
            None => JsonValue::String(value.to_string()),
        };
        (name.clone(), rendered)
    });
    if tuple {
        JsonValue::Array(rendered.map(|(_, v)| v).collect())
    } else {
        JsonValue::Object(rendered.collect())
    }
}
