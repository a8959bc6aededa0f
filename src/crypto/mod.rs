//! # Cryptographic Types and Capabilities
//!
//! Digest newtypes and the external signing capability boundary.
//!
//! The codec hashes content with Keccak-256 and carries 65-byte
//! recoverable ECDSA signatures, but it never implements the curve
//! itself: signing and address recovery are capabilities injected by the
//! consuming daemon through the [`Signer`] and [`Recoverer`] traits.
//!
//! ## Components
//! - **hash**: `Hash256`, `Address`, Keccak-256 helper
//! - **signer**: `Signature` wire form and the capability traits
//! - **testing**: a deterministic in-process stand-in for tests and
//!   loopback rigs

pub mod hash;
pub mod signer;
pub mod testing;

pub use hash::{keccak256, Address, Hash256};
pub use signer::{Recoverer, Signature, Signer};
