//! Packet header framing: magic number, checksum, protocol version.
//!
//! Every channel starts with a fixed 13-byte header, big-endian:
//!
//! ```text
//! [Magic C0 01 BA 5E] [CRC32(4)] [Reserved(2)=0] [Major(2)] [Minor(2)] [Maintenance(2)]
//! ```
//!
//! The CRC32 covers only the trailing 8 bytes (reserved + version fields),
//! yet precedes them in the stream. The writer therefore stages those 8
//! bytes in a buffer, accumulates the checksum, and only then emits magic,
//! checksum, and payload. This exact layout is wire-normative; do not
//! "fix" it to the checksum-after-payload order.

use crate::config::MAGIC_BYTES;
use crate::core::version::Version;
use crate::error::{constants, ProtocolError, Result};
use std::io::{Read, Write};
use tracing::{debug, warn};

/// Total header width in bytes.
pub const HEADER_LEN: usize = 16;

fn read_exact_or<R: Read>(src: &mut R, buf: &mut [u8]) -> Result<()> {
    match src.read_exact(buf) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            Err(ProtocolError::Truncated(constants::ERR_TRUNCATED_PACKET))
        }
        Err(e) => Err(e.into()),
    }
}

/// Write the packet header for a freshly opened channel.
pub fn write_header<W: Write>(sink: &mut W, version: Version) -> Result<()> {
    let mut payload = [0u8; 8];
    payload[2..4].copy_from_slice(&version.major.to_be_bytes());
    payload[4..6].copy_from_slice(&version.minor.to_be_bytes());
    payload[6..8].copy_from_slice(&version.maintenance.to_be_bytes());

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&payload);
    let crc = hasher.finalize();

    sink.write_all(&MAGIC_BYTES)?;
    sink.write_all(&crc.to_be_bytes())?;
    sink.write_all(&payload)?;

    debug!(%version, "wrote packet header");
    Ok(())
}

/// Read and validate a packet header, returning the remote version.
pub fn read_header<R: Read>(src: &mut R) -> Result<Version> {
    let mut magic = [0u8; 4];
    read_exact_or(src, &mut magic)?;
    if magic != MAGIC_BYTES {
        warn!(found = %hex::encode_upper(magic), "rejected stream with bad magic");
        return Err(ProtocolError::BadMagic(magic));
    }

    let mut crc_bytes = [0u8; 4];
    read_exact_or(src, &mut crc_bytes)?;
    let expected = u32::from_be_bytes(crc_bytes);

    let mut payload = [0u8; 8];
    read_exact_or(src, &mut payload)?;
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&payload);
    let actual = hasher.finalize();
    if actual != expected {
        warn!(expected, actual, "rejected packet header with bad checksum");
        return Err(ProtocolError::ChecksumMismatch { expected, actual });
    }

    // Reserved bytes are discarded without inspection.
    let version = Version::new(
        u16::from_be_bytes([payload[2], payload[3]]),
        u16::from_be_bytes([payload[4], payload[5]]),
        u16::from_be_bytes([payload[6], payload[7]]),
    );
    debug!(%version, "accepted packet header");
    Ok(version)
}
