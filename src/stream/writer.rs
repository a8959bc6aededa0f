//! Staged streaming writer for the tagged-element format.
//!
//! A container's size prefix must be emitted before its content, so each
//! open container is staged in its own buffer; `end()` measures the
//! buffer, then renders tag, size, and content into the parent frame (or
//! the sink at root level). Terminal values are rendered in place, since
//! their payload width is known up front.
//!
//! Capture scopes mirror the reader's: a scope records an offset into the
//! current frame's staged bytes, and closing it digests everything staged
//! in that frame since. Because children are spliced into their parent in
//! wire order, the digested span is byte-identical to what a reader-side
//! capture over the same range observes.

use crate::config::CodecConfig;
use crate::core::registry::ElementDef;
use crate::core::tag::TagCode;
use crate::core::varlen;
use crate::crypto::{keccak256, Hash256};
use crate::error::{constants, ProtocolError, Result};
use crate::stream::format::ValueFormat;
use bytes::{BufMut, BytesMut};
use std::io::Write;
use tracing::trace;

struct WriteFrame {
    def: &'static ElementDef,
    buf: BytesMut,
}

struct CaptureScope {
    depth: usize,
    offset: usize,
}

/// The streaming event sink of one conversation direction.
pub struct StreamingWriter<W: Write> {
    sink: W,
    config: CodecConfig,
    frames: Vec<WriteFrame>,
    captures: Vec<CaptureScope>,
}

impl<W: Write> StreamingWriter<W> {
    pub fn new(sink: W, config: CodecConfig) -> Self {
        Self {
            sink,
            config,
            frames: Vec::new(),
            captures: Vec::new(),
        }
    }

    /// Current nesting depth.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// The codec configuration this writer runs under.
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Open a container element.
    pub fn begin(&mut self, def: &'static ElementDef) -> Result<()> {
        if !def.is_structural() {
            return Err(ProtocolError::Misuse(constants::ERR_NOT_CONTAINER));
        }
        if self.frames.len() >= self.config.max_nesting_depth {
            return Err(ProtocolError::DepthExceeded(self.frames.len() + 1));
        }
        trace!(element = def.name, "container opened");
        self.frames.push(WriteFrame {
            def,
            buf: BytesMut::new(),
        });
        Ok(())
    }

    /// Close the innermost container, rendering its measured extent into
    /// the parent frame or the sink.
    pub fn end(&mut self) -> Result<()> {
        let frame = self
            .frames
            .pop()
            .ok_or(ProtocolError::Misuse(constants::ERR_UNBALANCED_END))?;
        if self
            .captures
            .last()
            .is_some_and(|capture| capture.depth > self.frames.len())
        {
            return Err(ProtocolError::Misuse(constants::ERR_CAPTURE_OPEN));
        }
        let size = varlen::encode_size(frame.buf.len() as u64)?;
        self.emit(frame.def.code.as_bytes())?;
        self.emit(size.as_slice())?;
        self.emit(&frame.buf)?;
        trace!(element = frame.def.name, size = frame.buf.len(), "container closed");
        Ok(())
    }

    /// Write one terminal element: tag, measured size, encoded payload.
    pub fn write_value<F: ValueFormat>(
        &mut self,
        def: &'static ElementDef,
        value: &F::Value,
    ) -> Result<()> {
        if def.is_structural() {
            return Err(ProtocolError::Misuse(constants::ERR_NOT_VALUE));
        }
        let mut payload = Vec::new();
        F::encode(value, &mut payload)?;
        self.write_opaque_bytes(def.code.as_bytes(), &payload)
    }

    /// Re-emit an element verbatim from its code and payload bytes, e.g.
    /// when relaying content under tags this side does not model.
    pub fn write_opaque(&mut self, code: TagCode, payload: &[u8]) -> Result<()> {
        self.write_opaque_bytes(code.as_bytes(), payload)
    }

    fn write_opaque_bytes(&mut self, code: &[u8], payload: &[u8]) -> Result<()> {
        let size = varlen::encode_size(payload.len() as u64)?;
        self.emit(code)?;
        self.emit(size.as_slice())?;
        self.emit(payload)?;
        Ok(())
    }

    /// Open a capture scope over the current container's staged bytes.
    pub fn begin_capture(&mut self) -> Result<()> {
        let frame = self
            .frames
            .last()
            .ok_or(ProtocolError::Misuse(constants::ERR_CAPTURE_ROOT))?;
        self.captures.push(CaptureScope {
            depth: self.frames.len(),
            offset: frame.buf.len(),
        });
        Ok(())
    }

    /// Close the innermost capture scope, digesting everything staged in
    /// its frame since it opened.
    pub fn end_capture(&mut self) -> Result<Hash256> {
        let capture = self
            .captures
            .pop()
            .ok_or(ProtocolError::Misuse(constants::ERR_CAPTURE_NONE))?;
        if capture.depth != self.frames.len() {
            return Err(ProtocolError::Misuse(constants::ERR_CAPTURE_DEPTH));
        }
        let frame = self.frames.last().expect("capture depth is nonzero");
        Ok(keccak256(&frame.buf[capture.offset..]))
    }

    /// Flush the sink. Only valid with no containers open.
    pub fn flush(&mut self) -> Result<()> {
        if !self.frames.is_empty() {
            return Err(ProtocolError::Misuse(constants::ERR_OPEN_FRAMES));
        }
        self.sink.flush()?;
        Ok(())
    }

    /// Flush and release the sink. Only valid with no containers open.
    pub fn finish(mut self) -> Result<W> {
        self.flush()?;
        Ok(self.sink)
    }

    fn emit(&mut self, bytes: &[u8]) -> Result<()> {
        match self.frames.last_mut() {
            Some(parent) => parent.buf.put_slice(bytes),
            None => self.sink.write_all(bytes)?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::schema;
    use crate::stream::format::{UintFormat, Utf8Format};
    use crate::stream::reader::StreamingReader;

    #[test]
    fn nested_sizes_are_measured() {
        let mut buf = Vec::new();
        let mut writer = StreamingWriter::new(&mut buf, CodecConfig::default());
        writer.begin(&schema::ENTRY).unwrap();
        writer.begin(&schema::FIELD_LIST).unwrap();
        writer.end().unwrap();
        writer.end().unwrap();
        writer.flush().unwrap();
        // Entry(0xE1) wraps an empty FieldList(0xD1): [E1 82 D1 80].
        assert_eq!(buf, vec![0xE1, 0x82, 0xD1, 0x80]);
    }

    #[test]
    fn write_and_read_captures_agree() {
        // The digest of a sub-range taken while writing must equal the
        // digest taken over the same range while reading it back, with
        // the closing element's header excluded on both sides.
        let mut buf = Vec::new();
        let mut writer = StreamingWriter::new(&mut buf, CodecConfig::default());
        writer.begin(&schema::MODIFICATION_REQUEST).unwrap();
        writer.begin(&schema::ENTRY).unwrap();
        writer.begin(&schema::ENTRY_HEADER).unwrap();
        writer.begin_capture().unwrap();
        writer
            .write_value::<Utf8Format>(&schema::TABLESPACE_NAME, &"t1".to_string())
            .unwrap();
        writer
            .write_value::<UintFormat>(&schema::ENTRY_TYPE, &3)
            .unwrap();
        let written_digest = writer.end_capture().unwrap();
        writer
            .write_value::<UintFormat>(&schema::NETWORK_ID, &60)
            .unwrap();
        writer.end().unwrap();
        writer.end().unwrap();
        writer.end().unwrap();
        writer.flush().unwrap();

        let mut reader = StreamingReader::new(
            buf.as_slice(),
            schema::registry(),
            schema::CTX_ROOT,
            CodecConfig::default(),
        );
        reader.next().unwrap().unwrap(); // Begin ModificationRequest
        reader.next().unwrap().unwrap(); // Begin Entry
        reader.next().unwrap().unwrap(); // Begin EntryHeader
        reader.begin_capture().unwrap();
        reader.next().unwrap().unwrap(); // Begin TablespaceName
        assert_eq!(reader.read_value::<Utf8Format>().unwrap(), "t1");
        reader.next().unwrap().unwrap(); // Begin EntryType
        assert_eq!(reader.read_value::<UintFormat>().unwrap(), 3);
        let event = reader.next().unwrap().unwrap(); // Begin NetworkId
        assert!(event.is_begin(&schema::NETWORK_ID));
        // NetworkId's own header is still pending and must not leak into
        // the closed capture.
        let read_digest = reader.end_capture().unwrap();
        assert_eq!(written_digest, read_digest);
    }

    #[test]
    fn exact_exhaustion_cascades_end_events() {
        let mut buf = Vec::new();
        let mut writer = StreamingWriter::new(&mut buf, CodecConfig::default());
        writer.begin(&schema::ENTRY).unwrap();
        writer.begin(&schema::FIELD_LIST).unwrap();
        writer.begin(&schema::FIELD).unwrap();
        writer
            .write_value::<Utf8Format>(&schema::FIELD_NAME, &"f".to_string())
            .unwrap();
        writer.end().unwrap();
        writer.end().unwrap();
        writer.end().unwrap();
        writer.flush().unwrap();

        let mut reader = StreamingReader::new(
            buf.as_slice(),
            schema::registry(),
            schema::CTX_MODIFICATION_REQUEST,
            CodecConfig::default(),
        );
        // Reading the innermost value exhausts every ancestor at once;
        // the closures surface as consecutive End events.
        assert!(reader.next().unwrap().unwrap().is_begin(&schema::ENTRY));
        assert!(reader.next().unwrap().unwrap().is_begin(&schema::FIELD_LIST));
        assert!(reader.next().unwrap().unwrap().is_begin(&schema::FIELD));
        assert!(reader.next().unwrap().unwrap().is_begin(&schema::FIELD_NAME));
        reader.read_value::<Utf8Format>().unwrap();
        assert!(reader.next().unwrap().unwrap().is_end(&schema::FIELD));
        assert!(reader.next().unwrap().unwrap().is_end(&schema::FIELD_LIST));
        assert!(reader.next().unwrap().unwrap().is_end(&schema::ENTRY));
        assert!(reader.next().unwrap().is_none());
    }
}
