//! Deterministic signer/recovery stand-ins for tests and loopback rigs.
//!
//! `MockSigner` is NOT a real signature scheme and offers no security: it
//! exists so the capture/sign/verify plumbing can be exercised end to end
//! without a curve implementation. Its one honored contract is the one the
//! codec relies on: `recover(digest, sign(digest)) == address()`, and a
//! recovery over a *different* digest yields a different address.

use crate::crypto::hash::{keccak256, Address, Hash256};
use crate::crypto::signer::{Recoverer, Signature, Signer};
use crate::error::Result;

/// A deterministic test signer bound to a fixed 32-byte secret.
#[derive(Clone)]
pub struct MockSigner {
    secret: [u8; 32],
}

impl MockSigner {
    pub fn new(secret: [u8; 32]) -> Self {
        Self { secret }
    }

    /// A fixed well-known test key.
    pub fn test_key() -> Self {
        Self::new(keccak256(b"meshdb-protocol test key").0)
    }

    fn padded_address(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out[12..].copy_from_slice(&self.address().0);
        out
    }
}

impl Signer for MockSigner {
    fn address(&self) -> Address {
        let digest = keccak256(&self.secret);
        Address::from_slice(&digest.0[12..]).expect("20-byte tail")
    }

    fn sign(&self, digest: &Hash256) -> Result<Signature> {
        // s binds the secret to the digest; r hides the padded address
        // under a digest-dependent mask so recovery depends on the digest.
        let mut s_input = Vec::with_capacity(64);
        s_input.extend_from_slice(&self.secret);
        s_input.extend_from_slice(&digest.0);
        let s = keccak256(&s_input).0;

        let mut mask_input = Vec::with_capacity(64);
        mask_input.extend_from_slice(&digest.0);
        mask_input.extend_from_slice(&s);
        let mask = keccak256(&mask_input).0;

        let padded = self.padded_address();
        let mut r = [0u8; 32];
        for i in 0..32 {
            r[i] = padded[i] ^ mask[i];
        }

        Ok(Signature { r, s, v: 27 })
    }
}

/// Recovery counterpart of [`MockSigner`]. Stateless.
#[derive(Clone, Copy, Default)]
pub struct MockRecovery;

impl Recoverer for MockRecovery {
    fn recover(&self, digest: &Hash256, signature: &Signature) -> Result<Address> {
        let mut mask_input = Vec::with_capacity(64);
        mask_input.extend_from_slice(&digest.0);
        mask_input.extend_from_slice(&signature.s);
        let mask = keccak256(&mask_input).0;

        let mut padded = [0u8; 32];
        for i in 0..32 {
            padded[i] = signature.r[i] ^ mask[i];
        }
        Ok(Address::from_slice(&padded[12..]).expect("20-byte tail"))
    }
}
