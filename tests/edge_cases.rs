#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Adversarial and boundary-condition tests: truncation, overruns,
//! oversized claims, depth limits, and codec misuse.

use meshdb_protocol::config::CodecConfig;
use meshdb_protocol::core::registry::ElementType;
use meshdb_protocol::crypto::testing::{MockRecovery, MockSigner};
use meshdb_protocol::protocol::request::encode_request;
use meshdb_protocol::protocol::schema;
use meshdb_protocol::protocol::{
    ConsistencyLevel, Conversation, ModificationRequest, Request,
};
use meshdb_protocol::stream::event::EventKind;
use meshdb_protocol::stream::format::{UintFormat, Utf8Format};
use meshdb_protocol::stream::reader::StreamingReader;
use meshdb_protocol::stream::writer::StreamingWriter;
use meshdb_protocol::ProtocolError;

fn minimal_request_bytes() -> Vec<u8> {
    let request = Request::Modification(ModificationRequest {
        consistency: ConsistencyLevel::Quorum,
        message_id: 1,
        entries: vec![],
    });
    let mut buf = Vec::new();
    let mut writer = StreamingWriter::new(&mut buf, CodecConfig::default());
    encode_request(&mut writer, &request, &MockSigner::test_key()).expect("encode");
    writer.flush().expect("flush");
    buf
}

fn try_decode(bytes: &[u8], config: CodecConfig) -> Result<(), ProtocolError> {
    let mut conversation = Conversation::new(bytes, Vec::new(), config);
    while conversation.receive(&MockRecovery)?.is_some() {}
    Ok(())
}

#[test]
fn test_every_truncation_point_fails_cleanly() {
    let bytes = minimal_request_bytes();
    for len in 0..bytes.len() {
        if len == 0 {
            // An empty stream is a clean end, not an error.
            assert!(try_decode(&[], CodecConfig::default()).is_ok());
            continue;
        }
        let result = try_decode(&bytes[..len], CodecConfig::default());
        assert!(
            result.is_err(),
            "prefix of {len}/{} bytes decoded successfully",
            bytes.len()
        );
    }
}

#[test]
fn test_child_overrunning_parent_rejected() {
    // A root container claiming 3 bytes whose child claims 10.
    let bytes = [
        0x1E, 0x54, 0x49, 0x45, // ModificationRequest
        0x83, // size 3
        0xEC, // MessageId
        0x8A, // size 10
        0x00, // one byte of padding so the header itself parses
    ];
    assert!(matches!(
        try_decode(&bytes, CodecConfig::default()),
        Err(ProtocolError::NestingOverrun { .. })
    ));
}

#[test]
fn test_oversized_element_rejected_before_allocation() {
    let config = CodecConfig::default_with_overrides(|c| c.max_element_size = 64);
    // Root claims 100 bytes against a 64-byte limit.
    let bytes = [0x1E, 0x54, 0x49, 0x45, 0xE4];
    match try_decode(&bytes, config) {
        Err(ProtocolError::OversizedElement(claimed)) => assert_eq!(claimed, 100),
        other => panic!("expected oversized element, got {other:?}"),
    }
}

#[test]
fn test_pending_value_must_be_consumed() {
    let bytes = minimal_request_bytes();
    let mut reader = StreamingReader::new(
        bytes.as_slice(),
        schema::registry(),
        schema::CTX_ROOT,
        CodecConfig::default(),
    );
    let root = reader.next().expect("next").expect("begin");
    assert!(root.is_begin(&schema::MODIFICATION_REQUEST));
    let value = reader.next().expect("next").expect("begin");
    assert_eq!(value.kind, EventKind::Begin);
    assert!(matches!(value.ty, ElementType::Known(_)));
    // Advancing with the terminal value still pending is misuse.
    assert!(matches!(
        reader.next(),
        Err(ProtocolError::Misuse(_))
    ));
}

#[test]
fn test_skip_disposes_pending_value() {
    let bytes = minimal_request_bytes();
    let mut reader = StreamingReader::new(
        bytes.as_slice(),
        schema::registry(),
        schema::CTX_ROOT,
        CodecConfig::default(),
    );
    reader.next().expect("next").expect("root");
    reader.next().expect("next").expect("consistency");
    reader.skip().expect("skip consistency");
    reader.next().expect("next").expect("message id");
    assert_eq!(reader.read_value::<UintFormat>().expect("value"), 1);
    let end = reader.next().expect("next").expect("end");
    assert!(end.is_end(&schema::MODIFICATION_REQUEST));
    assert!(reader.next().expect("next").is_none());
}

#[test]
fn test_function_nesting_depth_capped_on_decode() {
    // Hand-build a filter whose predicate nests past the configured cap.
    // The writer itself has no per-function limit when driven manually.
    let depth = 200;
    let mut buf = Vec::new();
    let mut writer = StreamingWriter::new(&mut buf, CodecConfig::default());
    writer.begin(&schema::RECOLLECTION_REQUEST).expect("begin");
    writer
        .write_value::<UintFormat>(&schema::CONSISTENCY, &0)
        .expect("consistency");
    writer
        .write_value::<UintFormat>(&schema::MESSAGE_ID, &1)
        .expect("id");
    writer
        .write_value::<Utf8Format>(&schema::TABLESPACE_NAME, &"t1".to_string())
        .expect("tablespace");
    writer
        .write_value::<Utf8Format>(&schema::TABLE_NAME, &"t2".to_string())
        .expect("table");
    writer.begin(&schema::FILTER_LIST).expect("list");
    writer.begin(&schema::FILTER).expect("filter");
    writer
        .write_value::<Utf8Format>(&schema::FIELD_NAME, &"f".to_string())
        .expect("field");
    for _ in 0..depth {
        writer.begin(&schema::FUNCTION).expect("function");
        writer
            .write_value::<Utf8Format>(&schema::FUNCTION_NAME, &"not".to_string())
            .expect("name");
    }
    for _ in 0..depth {
        writer.end().expect("end function");
    }
    writer.end().expect("end filter");
    writer.end().expect("end list");
    writer.end().expect("end root");
    writer.flush().expect("flush");

    assert!(matches!(
        try_decode(&buf, CodecConfig::default()),
        Err(ProtocolError::DepthExceeded(_))
    ));
}

#[test]
fn test_writer_misuse_is_an_error_not_a_panic() {
    let mut buf = Vec::new();
    let mut writer = StreamingWriter::new(&mut buf, CodecConfig::default());

    // end() with nothing open.
    assert!(matches!(
        writer.end(),
        Err(ProtocolError::Misuse(_))
    ));
    // begin() with a terminal element.
    assert!(matches!(
        writer.begin(&schema::MESSAGE_ID),
        Err(ProtocolError::Misuse(_))
    ));
    // write_value() with a container element.
    assert!(matches!(
        writer.write_value::<UintFormat>(&schema::ENTRY, &1),
        Err(ProtocolError::Misuse(_))
    ));
    // Captures need an open container.
    assert!(matches!(
        writer.begin_capture(),
        Err(ProtocolError::Misuse(_))
    ));
    // A capture scope may not outlive its frame.
    writer.begin(&schema::MODIFICATION_REQUEST).expect("begin");
    writer.begin_capture().expect("capture");
    assert!(matches!(
        writer.end(),
        Err(ProtocolError::Misuse(_))
    ));
}

#[test]
fn test_garbage_streams_fail_cleanly() {
    let cases: &[&[u8]] = &[
        &[0x00],                         // zero-width tag code
        &[0x00, 0x00, 0x00, 0x00],       // endless length run
        &[0xFF],                         // tag with no size
        &[0x1E, 0x54, 0x49, 0x45],       // known tag, truncated size
        &[0x1E, 0x54, 0x49, 0x45, 0x40], // size field cut short
    ];
    for bytes in cases {
        assert!(
            try_decode(bytes, CodecConfig::default()).is_err(),
            "garbage {bytes:02X?} decoded successfully"
        );
    }
}

#[test]
fn test_deep_unknown_nesting_without_skip_hits_depth_limit() {
    // Repeated odd (structural) unknown tags, each claiming the rest of
    // the stream, force frame growth when skipping is disabled.
    let config = CodecConfig::default_with_overrides(|c| {
        c.skip_unknown = false;
        c.max_nesting_depth = 16;
    });
    let mut bytes = Vec::new();
    for depth in (0..32u64).rev() {
        bytes.extend_from_slice(&[0x99, 0x80 | (depth * 2) as u8]);
    }

    let mut reader = StreamingReader::new(
        bytes.as_slice(),
        schema::registry(),
        schema::CTX_ROOT,
        config,
    );
    let mut result = Ok(None);
    for _ in 0..64 {
        result = reader.next();
        match &result {
            Ok(Some(_)) => continue,
            _ => break,
        }
    }
    assert!(matches!(
        result,
        Err(ProtocolError::DepthExceeded(_))
    ));
}
