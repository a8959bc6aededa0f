//! Channel handshake: the packet-header exchange that opens a channel.
//!
//! The opening side writes its packet header unconditionally; the
//! accepting side validates magic, checksum, and revision. Revisions
//! (major + minor) must match exactly; maintenance differences are
//! tolerated. On rejection the acceptor still attempts a best-effort
//! framed error message before tearing the channel down.

use crate::config::CodecConfig;
use crate::core::packet;
use crate::core::version::Version;
use crate::error::{ProtocolError, Result};
use crate::protocol::response::{encode_error_message, ErrorMessage};
use crate::stream::writer::StreamingWriter;
use std::io::{Read, Write};
use tracing::{debug, warn};

/// Wire error codes carried by a framed error message.
pub mod error_codes {
    pub const BAD_MAGIC: u64 = 0x01;
    pub const CHECKSUM_MISMATCH: u64 = 0x02;
    pub const REVISION_MISMATCH: u64 = 0x03;
    pub const STRUCTURAL: u64 = 0x10;
    pub const OTHER: u64 = 0xFF;
}

/// The wire error code for a codec failure.
pub fn error_code(error: &ProtocolError) -> u64 {
    match error {
        ProtocolError::BadMagic(_) => error_codes::BAD_MAGIC,
        ProtocolError::ChecksumMismatch { .. } => error_codes::CHECKSUM_MISMATCH,
        ProtocolError::RevisionMismatch { .. } => error_codes::REVISION_MISMATCH,
        ProtocolError::Truncated(_)
        | ProtocolError::MalformedVarint(_)
        | ProtocolError::OversizedElement(_)
        | ProtocolError::DepthExceeded(_)
        | ProtocolError::NestingOverrun { .. }
        | ProtocolError::UnexpectedElement { .. }
        | ProtocolError::UnknownElement { .. }
        | ProtocolError::MissingElement { .. } => error_codes::STRUCTURAL,
        _ => error_codes::OTHER,
    }
}

/// Open a channel: write the local packet header.
pub fn open_channel<W: Write>(sink: &mut W, version: Version) -> Result<()> {
    debug!(%version, "opening channel");
    packet::write_header(sink, version)
}

/// Accept a channel: read and validate the remote packet header.
///
/// Fails with [`ProtocolError::RevisionMismatch`] when the remote
/// revision differs from the local one.
pub fn accept_channel<R: Read>(src: &mut R, local: Version) -> Result<Version> {
    let remote = packet::read_header(src)?;
    if remote.revision() != local.revision() {
        warn!(%local, %remote, "rejecting channel with mismatched revision");
        return Err(ProtocolError::RevisionMismatch {
            local: local.revision(),
            remote: remote.revision(),
        });
    }
    debug!(%remote, "accepted channel");
    Ok(remote)
}

/// Best-effort rejection: write a framed error message for `error` before
/// the caller tears the channel down. Failures to deliver the report are
/// swallowed; the original error is what matters.
pub fn reject<W: Write>(sink: W, config: CodecConfig, error: &ProtocolError) {
    let mut writer = StreamingWriter::new(sink, config);
    let report = ErrorMessage {
        code: error_code(error),
        messages: error.message_chain(),
    };
    if encode_error_message(&mut writer, &report)
        .and_then(|()| writer.flush())
        .is_err()
    {
        debug!("peer gone before the rejection report could be written");
    }
}
