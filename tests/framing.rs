#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Packet-framing integrity tests: checksum coverage, magic detection,
//! and the revision handshake policy.

use meshdb_protocol::core::packet::{read_header, write_header, HEADER_LEN};
use meshdb_protocol::core::version::Version;
use meshdb_protocol::error::ProtocolError;
use meshdb_protocol::protocol::handshake::{accept_channel, open_channel};

fn header_bytes(version: Version) -> Vec<u8> {
    let mut buf = Vec::new();
    write_header(&mut buf, version).expect("write header");
    buf
}

#[test]
fn test_header_roundtrip() {
    let buf = header_bytes(Version::new(3, 1, 4));
    assert_eq!(buf.len(), HEADER_LEN);
    let version = read_header(&mut buf.as_slice()).expect("read header");
    assert_eq!(version, Version::new(3, 1, 4));
}

#[test]
fn test_every_checksummed_bit_is_protected() {
    // Flipping any single bit of the 8 CRC-covered bytes must surface as
    // a checksum mismatch, never as a silently different version.
    let clean = header_bytes(Version::new(1, 0, 2));
    for bit in 0..64 {
        let mut corrupted = clean.clone();
        corrupted[8 + bit / 8] ^= 1 << (bit % 8);
        match read_header(&mut corrupted.as_slice()) {
            Err(ProtocolError::ChecksumMismatch { expected, actual }) => {
                assert_ne!(expected, actual, "bit {bit}");
            }
            other => panic!("bit {bit}: expected checksum mismatch, got {other:?}"),
        }
    }
}

#[test]
fn test_magic_corruption_is_a_distinct_failure() {
    let clean = header_bytes(Version::new(1, 0, 2));
    for bit in 0..32 {
        let mut corrupted = clean.clone();
        corrupted[bit / 8] ^= 1 << (bit % 8);
        assert!(
            matches!(
                read_header(&mut corrupted.as_slice()),
                Err(ProtocolError::BadMagic(_))
            ),
            "bit {bit} should fail as bad magic"
        );
    }
}

#[test]
fn test_corrupted_crc_field_detected() {
    let mut buf = header_bytes(Version::new(1, 0, 2));
    buf[5] ^= 0x10;
    assert!(matches!(
        read_header(&mut buf.as_slice()),
        Err(ProtocolError::ChecksumMismatch { .. })
    ));
}

#[test]
fn test_empty_and_truncated_streams() {
    assert!(matches!(
        read_header(&mut [].as_slice()),
        Err(ProtocolError::Truncated(_))
    ));
    let buf = header_bytes(Version::new(1, 0, 2));
    for len in 1..buf.len() {
        let result = read_header(&mut &buf[..len]);
        assert!(
            matches!(result, Err(ProtocolError::Truncated(_))),
            "prefix of {len} bytes should be truncated, got {result:?}"
        );
    }
}

#[test]
fn test_handshake_revision_policy() {
    let local = Version::new(1, 0, 2);

    // Maintenance drift is tolerated.
    let mut channel = Vec::new();
    open_channel(&mut channel, Version::new(1, 0, 9)).expect("open");
    assert!(accept_channel(&mut channel.as_slice(), local).is_ok());

    // Minor drift is not.
    let mut channel = Vec::new();
    open_channel(&mut channel, Version::new(1, 1, 2)).expect("open");
    match accept_channel(&mut channel.as_slice(), local) {
        Err(ProtocolError::RevisionMismatch { local, remote }) => {
            assert_eq!(local.minor, 0);
            assert_eq!(remote.minor, 1);
        }
        other => panic!("expected revision mismatch, got {other:?}"),
    }

    // Major drift is not.
    let mut channel = Vec::new();
    open_channel(&mut channel, Version::new(2, 0, 2)).expect("open");
    assert!(matches!(
        accept_channel(&mut channel.as_slice(), local),
        Err(ProtocolError::RevisionMismatch { .. })
    ));
}
