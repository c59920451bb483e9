//! Text encodings for byte values: hex with an optional `0x` prefix, and
//! 32-byte keys given as base58 or hex.

use base58::FromBase58;
use thiserror::Error;

pub fn hex_encode(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Strip a leading `0x` / `0X`, if any.
pub fn strip_hex_prefix(s: &str) -> Option<&str> {
    s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))
}

pub fn hex_decode(s: &str) -> Result<Vec<u8>, String> {
    let digits = strip_hex_prefix(s).unwrap_or(s);
    if digits.len() % 2 != 0 {
        return Err(format!("hex string has odd length: {}", digits.len()));
    }
    hex::decode(digits).map_err(|e| format!("invalid hex: {}", e))
}

/// Why a 32-byte key failed to decode.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyDecodeError {
    /// Decoded cleanly but to the wrong number of bytes
    #[error("decodes to {0} bytes, expected 32")]
    Length(usize),
    /// Neither base58 nor hex
    #[error("not base58 or 64 hex digits")]
    Format,
}

/// Decode a 32-byte value from base58, falling back to hex.
pub fn decode_bytes_32(input: &str) -> Result<[u8; 32], KeyDecodeError> {
    if input.is_empty() {
        return Err(KeyDecodeError::Length(0));
    }
    let base58 = input.from_base58().ok();
    if let Some(bytes) = &base58 {
        if let Ok(key) = <[u8; 32]>::try_from(bytes.as_slice()) {
            return Ok(key);
        }
    }
    let digits = strip_hex_prefix(input).unwrap_or(input);
    if digits.len() == 64 && digits.chars().all(|c| c.is_ascii_hexdigit()) {
        let bytes = hex::decode(digits).map_err(|_| KeyDecodeError::Format)?;
        return <[u8; 32]>::try_from(bytes.as_slice()).map_err(|_| KeyDecodeError::Length(bytes.len()));
    }
    match base58 {
        Some(bytes) => Err(KeyDecodeError::Length(bytes.len())),
        None => Err(KeyDecodeError::Format),
    }
}
