//! # Error Types
//!
//! Comprehensive error handling for the wire-protocol codec.
//!
//! This module defines all error variants that can occur while framing,
//! parsing, or emitting protocol streams, from low-level I/O errors to
//! signature verification failures.
//!
//! ## Error Categories
//! - **I/O Errors**: failures of the underlying byte source or sink
//! - **Framing Errors**: bad magic number, checksum mismatch, revision mismatch
//! - **Structural Errors**: truncated or malformed element headers, nesting overruns
//! - **Validation Errors**: constraint violations in decoded values
//! - **Signature Errors**: signer capability failures and recovered-address mismatches
//!
//! Application-level failures (per-entry modification errors, per-result
//! recollection errors) are *not* represented here; they travel in-band as
//! `OperationResult::Error` values inside a normal response payload.
//!
//! All errors implement `std::error::Error` for interoperability.

use crate::core::tag::TagCode;
use crate::core::version::Revision;
use crate::crypto::Address;
use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
/// Static strings are borrowed, avoiding heap allocations for common error cases.
pub mod constants {
    /// Structural errors
    pub const ERR_TRUNCATED_HEADER: &str = "stream ended inside an element header";
    pub const ERR_TRUNCATED_VALUE: &str = "stream ended inside a value";
    pub const ERR_TRUNCATED_PACKET: &str = "stream ended inside the packet header";
    pub const ERR_LENGTH_RUN: &str = "length run exceeds the maximum encodable width";
    pub const ERR_CODE_TOO_LONG: &str = "tag code exceeds the maximum code width";
    pub const ERR_SIZE_OVERFLOW: &str = "value does not fit the maximum encodable width";
    pub const ERR_EMPTY_CODE: &str = "tag code must not be empty";

    /// Codec misuse
    pub const ERR_VALUE_PENDING: &str = "a terminal value must be read or skipped before advancing";
    pub const ERR_NO_VALUE: &str = "no terminal value is pending";
    pub const ERR_NOT_CONTAINER: &str = "begin() requires a container element";
    pub const ERR_NOT_VALUE: &str = "write() requires a terminal element";
    pub const ERR_UNBALANCED_END: &str = "end() called with no open container";
    pub const ERR_OPEN_FRAMES: &str = "finish() called with containers still open";
    pub const ERR_CAPTURE_ROOT: &str = "a capture scope requires an open container";
    pub const ERR_CAPTURE_OPEN: &str = "a capture scope outlives its container frame";
    pub const ERR_CAPTURE_NONE: &str = "no capture scope is open";
    pub const ERR_CAPTURE_DEPTH: &str = "capture scope must close in the frame that opened it";
}

/// Primary error type for all codec operations.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("bad magic number: expected C001BA5E, found {}", hex::encode_upper(.0))]
    BadMagic([u8; 4]),

    #[error("packet header checksum mismatch: expected {expected:08X}, computed {actual:08X}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("protocol revision mismatch: local {local}, remote {remote}")]
    RevisionMismatch { local: Revision, remote: Revision },

    #[error("truncated stream: {0}")]
    Truncated(&'static str),

    #[error("malformed variable-length encoding: {0}")]
    MalformedVarint(&'static str),

    #[error("element size {0} exceeds the configured maximum")]
    OversizedElement(u64),

    #[error("nesting depth {0} exceeds the configured maximum")]
    DepthExceeded(usize),

    #[error("element {element} overruns its parent: needs {needed} bytes, {remaining} remain")]
    NestingOverrun {
        element: String,
        needed: u64,
        remaining: u64,
    },

    #[error("unexpected element {found} in {context}")]
    UnexpectedElement {
        context: &'static str,
        found: String,
    },

    #[error("unknown element {code} in {context}")]
    UnknownElement {
        context: &'static str,
        code: TagCode,
    },

    #[error("required element {element} missing from {context}")]
    MissingElement {
        context: &'static str,
        element: &'static str,
    },

    #[error("invalid value for {element}: {reason}")]
    InvalidValue {
        element: &'static str,
        reason: String,
    },

    #[error("invalid consistency level: {0}")]
    InvalidConsistency(String),

    #[error("recovered signer {recovered} does not match declared signer {declared}")]
    SignerMismatch {
        declared: Address,
        recovered: Address,
    },

    #[error("signing capability failed: {0}")]
    SignatureError(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("codec misuse: {0}")]
    Misuse(&'static str),
}

impl ProtocolError {
    /// Whether this error is fatal to the whole channel (framing layer),
    /// as opposed to fatal only to the current read.
    pub fn is_framing(&self) -> bool {
        matches!(
            self,
            ProtocolError::BadMagic(_)
                | ProtocolError::ChecksumMismatch { .. }
                | ProtocolError::RevisionMismatch { .. }
        )
    }

    /// Collect this error's message chain, outermost first.
    ///
    /// Used to populate the message list of a best-effort error response.
    pub fn message_chain(&self) -> Vec<String> {
        let mut out = vec![self.to_string()];
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            out.push(err.to_string());
            source = err.source();
        }
        out
    }
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
