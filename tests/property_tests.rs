//! Property-based tests using proptest
//!
//! These tests validate codec invariants across a wide range of randomly
//! generated inputs, ensuring robust behavior under all conditions.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use meshdb_protocol::config::CodecConfig;
use meshdb_protocol::core::packet::{read_header, write_header};
use meshdb_protocol::core::varlen::{encode_size, read_size, MAX_SIZE_VALUE};
use meshdb_protocol::core::version::Version;
use meshdb_protocol::crypto::testing::{MockRecovery, MockSigner};
use meshdb_protocol::protocol::request::encode_request;
use meshdb_protocol::protocol::{
    ConsistencyLevel, Conversation, Entry, EntryHeader, Field, FieldValue, Message,
    ModificationRequest, Request,
};
use meshdb_protocol::stream::format::{UintFormat, ValueFormat};
use meshdb_protocol::stream::writer::StreamingWriter;
use proptest::prelude::*;

fn leading_zero_bits(bytes: &[u8]) -> usize {
    let mut zeros = 0;
    for byte in bytes {
        if *byte == 0 {
            zeros += 8;
        } else {
            zeros += byte.leading_zeros() as usize;
            break;
        }
    }
    zeros
}

// Property: any encodable size value round-trips, and the encoding is
// self-describing (leading zero bits = width - 1).
proptest! {
    #[test]
    fn prop_varlen_roundtrip(value in 0..=MAX_SIZE_VALUE) {
        let encoded = encode_size(value).expect("encode");
        let mut src = encoded.as_slice();
        let (decoded, raw) = read_size(&mut src).expect("decode");

        prop_assert_eq!(decoded, value);
        prop_assert_eq!(raw.as_slice(), encoded.as_slice());
        prop_assert!(src.is_empty());
        prop_assert_eq!(leading_zero_bits(encoded.as_slice()), encoded.len() - 1);
    }
}

// Property: varlen encoding is minimal - one byte narrower never fits.
proptest! {
    #[test]
    fn prop_varlen_is_minimal(value in 128..=MAX_SIZE_VALUE) {
        let encoded = encode_size(value).expect("encode");
        let narrower_bits = 7 * (encoded.len() - 1) as u32;
        prop_assert!(value >= (1u64 << narrower_bits));
    }
}

// Property: unsigned integer payloads round-trip at minimal width.
proptest! {
    #[test]
    fn prop_uint_format_roundtrip(value: u64) {
        let mut out = Vec::new();
        UintFormat::encode(&value, &mut out).expect("encode");
        prop_assert!(out.len() <= 8 && !out.is_empty());
        prop_assert_eq!(UintFormat::decode(&out).expect("decode"), value);
    }
}

// Property: any version triple survives the packet header.
proptest! {
    #[test]
    fn prop_packet_header_roundtrip(major: u16, minor: u16, maintenance: u16) {
        let version = Version::new(major, minor, maintenance);
        let mut buf = Vec::new();
        write_header(&mut buf, version).expect("write");
        prop_assert_eq!(read_header(&mut buf.as_slice()).expect("read"), version);
    }
}

// Property: header serialization is deterministic.
proptest! {
    #[test]
    fn prop_packet_header_deterministic(major: u16, minor: u16, maintenance: u16) {
        let version = Version::new(major, minor, maintenance);
        let mut first = Vec::new();
        let mut second = Vec::new();
        write_header(&mut first, version).expect("write");
        write_header(&mut second, version).expect("write");
        prop_assert_eq!(first, second);
    }
}

// Property: arbitrary field payload bytes survive a full message
// round-trip, including the signed header around them.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]
    #[test]
    fn prop_field_payload_roundtrip(payload in prop::collection::vec(any::<u8>(), 0..512)) {
        let header = EntryHeader {
            tablespace: "t1".to_string(),
            table: "t2".to_string(),
            entry_type: 0,
            timestamp: 1,
            entry_version: 1,
            network_id: 60,
            old_hash: None,
            fields_hash: meshdb_protocol::crypto::keccak256(b"unset"),
        };
        let fields = vec![Field {
            name: "data".to_string(),
            type_name: "binary".to_string(),
            value: FieldValue::Raw(payload.clone()),
        }];
        let request = Request::Modification(ModificationRequest {
            consistency: ConsistencyLevel::Quorum,
            message_id: 1,
            entries: vec![Entry::new(header, fields, vec![])],
        });

        let mut buf = Vec::new();
        let mut writer = StreamingWriter::new(&mut buf, CodecConfig::default());
        encode_request(&mut writer, &request, &MockSigner::test_key()).expect("encode");
        writer.flush().expect("flush");

        let mut conversation = Conversation::new(buf.as_slice(), Vec::new(), CodecConfig::default());
        let message = conversation.receive(&MockRecovery).expect("decode").expect("message");
        match message {
            Message::Request(Request::Modification(decoded)) => {
                prop_assert_eq!(
                    &decoded.entries[0].fields[0].value,
                    &FieldValue::Raw(payload)
                );
            }
            other => prop_assert!(false, "wrong variant: {:?}", other),
        }
    }
}

// Property: an unknown element wrapping arbitrary bytes never disturbs
// its siblings when skipping is enabled.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]
    #[test]
    fn prop_unknown_skip_is_transparent(garbage in prop::collection::vec(any::<u8>(), 0..256)) {
        use meshdb_protocol::core::tag::TagCode;
        use meshdb_protocol::protocol::schema;

        let mut buf = Vec::new();
        let mut writer = StreamingWriter::new(&mut buf, CodecConfig::default());
        writer.begin(&schema::MODIFICATION_REQUEST).expect("begin");
        writer.write_value::<UintFormat>(&schema::CONSISTENCY, &0).expect("consistency");
        writer.write_opaque(TagCode::from_numeric(0x99), &garbage).expect("opaque");
        writer.write_value::<UintFormat>(&schema::MESSAGE_ID, &99).expect("id");
        writer.end().expect("end");
        writer.flush().expect("flush");

        let mut conversation = Conversation::new(buf.as_slice(), Vec::new(), CodecConfig::default());
        let message = conversation.receive(&MockRecovery).expect("decode").expect("message");
        match message {
            Message::Request(Request::Modification(decoded)) => {
                prop_assert_eq!(decoded.message_id, 99);
            }
            other => prop_assert!(false, "wrong variant: {:?}", other),
        }
    }
}
