//! The signing capability boundary.
//!
//! Signatures are ECDSA over secp256k1 with low-S canonicalization and a
//! one-byte recovery discriminant, 65 bytes on the wire: `r(32) | s(32) |
//! v(1)`. The curve math itself lives outside this crate; the codec only
//! needs `sign(hash) -> signature` and `recover(hash, signature) ->
//! address`, injected per conversation.

use crate::crypto::hash::{Address, Hash256};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A 65-byte recoverable signature.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub r: [u8; 32],
    pub s: [u8; 32],
    pub v: u8,
}

impl Signature {
    pub const LEN: usize = 65;

    pub fn to_bytes(self) -> [u8; 65] {
        let mut out = [0u8; 65];
        out[..32].copy_from_slice(&self.r);
        out[32..64].copy_from_slice(&self.s);
        out[64] = self.v;
        out
    }

    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != Self::LEN {
            return None;
        }
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..64]);
        Some(Self { r, s, v: bytes[64] })
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature(0x{}…, v={})", hex::encode(&self.r[..4]), self.v)
    }
}

/// Produces signatures over codec-computed digests.
///
/// Implementations own the private key; the codec never sees it.
pub trait Signer {
    /// The address signatures from this signer recover to.
    fn address(&self) -> Address;

    /// Sign a digest, producing a recoverable signature.
    fn sign(&self, digest: &Hash256) -> Result<Signature>;
}

/// Recovers the signing address from a digest and signature.
pub trait Recoverer {
    fn recover(&self, digest: &Hash256, signature: &Signature) -> Result<Address>;
}
