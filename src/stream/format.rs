//! Terminal value formats.
//!
//! A format is the rule interpreting a terminal element's payload bytes.
//! The set is fixed per protocol version: big-endian unsigned integers in
//! their minimal width, UTF-8 strings, raw byte strings, and the
//! fixed-width digest/address/signature forms.

use crate::crypto::{Address, Hash256, Signature};
use crate::error::{ProtocolError, Result};

/// A terminal payload encoding.
///
/// Formats are stateless; implementations are zero-sized types used as
/// type arguments: `reader.read_value::<UintFormat>()`.
pub trait ValueFormat {
    type Value;

    /// Format name for diagnostics.
    const NAME: &'static str;

    fn encode(value: &Self::Value, out: &mut Vec<u8>) -> Result<()>;
    fn decode(payload: &[u8]) -> Result<Self::Value>;
}

fn invalid<T>(name: &'static str, reason: impl Into<String>) -> Result<T> {
    Err(ProtocolError::InvalidValue {
        element: name,
        reason: reason.into(),
    })
}

/// Unsigned integer, big-endian, minimal width. Zero encodes as a single
/// zero byte; an empty payload also decodes to zero.
pub struct UintFormat;

impl ValueFormat for UintFormat {
    type Value = u64;
    const NAME: &'static str = "uint";

    fn encode(value: &u64, out: &mut Vec<u8>) -> Result<()> {
        let be = value.to_be_bytes();
        let skip = (value.leading_zeros() / 8).min(7) as usize;
        out.extend_from_slice(&be[skip..]);
        Ok(())
    }

    fn decode(payload: &[u8]) -> Result<u64> {
        if payload.len() > 8 {
            return invalid(Self::NAME, format!("{} bytes exceed u64", payload.len()));
        }
        let mut value = 0u64;
        for byte in payload {
            value = (value << 8) | u64::from(*byte);
        }
        Ok(value)
    }
}

/// UTF-8 string.
pub struct Utf8Format;

impl ValueFormat for Utf8Format {
    type Value = String;
    const NAME: &'static str = "utf8";

    fn encode(value: &String, out: &mut Vec<u8>) -> Result<()> {
        out.extend_from_slice(value.as_bytes());
        Ok(())
    }

    fn decode(payload: &[u8]) -> Result<String> {
        match std::str::from_utf8(payload) {
            Ok(text) => Ok(text.to_string()),
            Err(e) => invalid(Self::NAME, e.to_string()),
        }
    }
}

/// Uninterpreted byte string.
pub struct RawFormat;

impl ValueFormat for RawFormat {
    type Value = Vec<u8>;
    const NAME: &'static str = "raw";

    fn encode(value: &Vec<u8>, out: &mut Vec<u8>) -> Result<()> {
        out.extend_from_slice(value);
        Ok(())
    }

    fn decode(payload: &[u8]) -> Result<Vec<u8>> {
        Ok(payload.to_vec())
    }
}

/// A 32-byte Keccak digest.
pub struct HashFormat;

impl ValueFormat for HashFormat {
    type Value = Hash256;
    const NAME: &'static str = "hash256";

    fn encode(value: &Hash256, out: &mut Vec<u8>) -> Result<()> {
        out.extend_from_slice(value.as_bytes());
        Ok(())
    }

    fn decode(payload: &[u8]) -> Result<Hash256> {
        match Hash256::from_slice(payload) {
            Some(hash) => Ok(hash),
            None => invalid(Self::NAME, format!("expected 32 bytes, got {}", payload.len())),
        }
    }
}

/// A 20-byte signer address.
pub struct AddressFormat;

impl ValueFormat for AddressFormat {
    type Value = Address;
    const NAME: &'static str = "address";

    fn encode(value: &Address, out: &mut Vec<u8>) -> Result<()> {
        out.extend_from_slice(value.as_bytes());
        Ok(())
    }

    fn decode(payload: &[u8]) -> Result<Address> {
        match Address::from_slice(payload) {
            Some(address) => Ok(address),
            None => invalid(Self::NAME, format!("expected 20 bytes, got {}", payload.len())),
        }
    }
}

/// A 65-byte recoverable signature.
pub struct SignatureFormat;

impl ValueFormat for SignatureFormat {
    type Value = Signature;
    const NAME: &'static str = "signature";

    fn encode(value: &Signature, out: &mut Vec<u8>) -> Result<()> {
        out.extend_from_slice(&value.to_bytes());
        Ok(())
    }

    fn decode(payload: &[u8]) -> Result<Signature> {
        match Signature::from_slice(payload) {
            Some(signature) => Ok(signature),
            None => invalid(Self::NAME, format!("expected 65 bytes, got {}", payload.len())),
        }
    }
}

/// A 16-byte billing session identifier.
pub struct SessionFormat;

impl ValueFormat for SessionFormat {
    type Value = [u8; 16];
    const NAME: &'static str = "session";

    fn encode(value: &[u8; 16], out: &mut Vec<u8>) -> Result<()> {
        out.extend_from_slice(value);
        Ok(())
    }

    fn decode(payload: &[u8]) -> Result<[u8; 16]> {
        match <[u8; 16]>::try_from(payload) {
            Ok(session) => Ok(session),
            Err(_) => invalid(Self::NAME, format!("expected 16 bytes, got {}", payload.len())),
        }
    }
}
