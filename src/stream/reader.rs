//! Pull-based streaming reader for the tagged-element format.
//!
//! The reader surfaces a flat sequence of [`Event`]s from a blocking byte
//! source, maintaining an explicit stack of open containers with
//! remaining-byte accounting. Each child element's full extent (header
//! plus payload) is charged against its parent on sight, so a child that
//! claims more bytes than its parent has left fails immediately, and a
//! container whose bytes are exactly exhausted closes in cascade through
//! its ancestors on subsequent `next()` calls.
//!
//! Unknown tag codes are skipped silently when `skip_unknown` is set,
//! which is the forward-compatibility path: the unknown element's size
//! prefix tells the reader how many bytes to discard while staying
//! aligned.
//!
//! ## Capture scopes
//!
//! A capture scope accumulates every physically consumed byte into a
//! Keccak-256 digest. Header bytes are attributed *lazily*: after `next()`
//! returns an element's Begin event, that element's own header bytes are
//! still pending, and a capture closed at that point excludes them. This
//! is the window that lets a signed-subtree digest exclude the signature
//! element that terminates it.

use crate::config::CodecConfig;
use crate::core::registry::{ContextId, ElementDef, ElementType, Registry};
use crate::core::varlen;
use crate::crypto::Hash256;
use crate::error::{constants, ProtocolError, Result};
use crate::stream::event::Event;
use crate::stream::format::ValueFormat;
use sha3::{Digest, Keccak256};
use std::io::Read;
use tracing::{debug, trace};

const SKIP_CHUNK: usize = 8 * 1024;

/// One open element on the reader's stack.
pub struct Frame {
    ty: ElementType,
    remaining: u64,
    scope: ContextId,
    value: bool,
}

impl Frame {
    pub fn element(&self) -> &ElementType {
        &self.ty
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn is_value(&self) -> bool {
        self.value
    }
}

/// The streaming event source of one conversation direction.
pub struct StreamingReader<R> {
    src: R,
    registry: &'static Registry,
    root: ContextId,
    config: CodecConfig,
    stack: Vec<Frame>,
    /// Header bytes consumed from the source but not yet attributed to
    /// capture scopes.
    held: Vec<u8>,
    captures: Vec<Keccak256>,
}

impl<R: Read> StreamingReader<R> {
    pub fn new(
        src: R,
        registry: &'static Registry,
        root: ContextId,
        config: CodecConfig,
    ) -> Self {
        Self {
            src,
            registry,
            root,
            config,
            stack: Vec::new(),
            held: Vec::new(),
            captures: Vec::new(),
        }
    }

    /// Current nesting depth.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// The codec configuration this reader runs under.
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// The innermost open element.
    pub fn stack_peek(&self) -> Option<&Frame> {
        self.stack.last()
    }

    /// An ancestor frame, `0` being the innermost.
    pub fn stack_get(&self, from_top: usize) -> Option<&Frame> {
        self.stack.iter().rev().nth(from_top)
    }

    /// Distance from the top to the nearest enclosing element of the given
    /// type, if any.
    pub fn stack_search(&self, def: &'static ElementDef) -> Option<usize> {
        self.stack
            .iter()
            .rev()
            .position(|frame| frame.ty.is(def))
    }

    /// Pull the next structural event.
    ///
    /// Returns `None` on a clean end of stream at the root level. A
    /// terminal element surfaces a single Begin; the value must then be
    /// read or skipped before the next call.
    pub fn next(&mut self) -> Result<Option<Event>> {
        loop {
            if let Some(top) = self.stack.last() {
                if top.value {
                    return Err(ProtocolError::Misuse(constants::ERR_VALUE_PENDING));
                }
                if top.remaining == 0 {
                    let frame = self.stack.pop().expect("frame peeked");
                    trace!(element = %frame.ty.describe(), "container closed");
                    return Ok(Some(Event::end(frame.ty)));
                }
            }

            let first = match self.next_source_byte()? {
                Some(byte) => byte,
                None if self.stack.is_empty() => return Ok(None),
                None => return Err(ProtocolError::Truncated(constants::ERR_TRUNCATED_HEADER)),
            };

            // Attribute the previous element's header before consuming further.
            self.flush_held();
            let code = varlen::read_code_continuing(first, &mut self.src)?;
            let (size, size_raw) = varlen::read_size(&mut self.src)?;
            self.held.extend_from_slice(code.as_bytes());
            self.held.extend_from_slice(size_raw.as_slice());

            if size > self.config.max_element_size {
                return Err(ProtocolError::OversizedElement(size));
            }

            let header_len = (code.width() + size_raw.len()) as u64;
            let scope = self.current_scope();
            let ty = self.registry.resolve_or_unknown(scope, code);

            // A child's full extent is charged to its parent on sight.
            if let Some(parent) = self.stack.last_mut() {
                let needed = header_len + size;
                if parent.remaining < needed {
                    return Err(ProtocolError::NestingOverrun {
                        element: ty.describe(),
                        needed,
                        remaining: parent.remaining,
                    });
                }
                parent.remaining -= needed;
            }

            if ty.is_unknown() && self.config.skip_unknown {
                debug!(code = %code, size, context = self.registry.context_name(scope),
                    "skipping unknown element");
                // The skipped element is still part of any enclosing signed
                // range: attribute its header, then its content, in order.
                self.flush_held();
                self.consume(size)?;
                continue;
            }

            if self.stack.len() >= self.config.max_nesting_depth {
                return Err(ProtocolError::DepthExceeded(self.stack.len() + 1));
            }

            let structural = ty.is_structural();
            let child_scope = match &ty {
                ElementType::Known(def) => def.scope().unwrap_or(scope),
                ElementType::Unknown { .. } => scope,
            };
            self.stack.push(Frame {
                ty: ty.clone(),
                remaining: size,
                scope: child_scope,
                value: !structural,
            });
            trace!(element = %ty.describe(), size, "element opened");
            return Ok(Some(Event::begin(ty)));
        }
    }

    /// Materialize the pending terminal value under the given format.
    ///
    /// Consumes the value's payload, pops its frame, and emits no End
    /// event for it.
    pub fn read_value<F: ValueFormat>(&mut self) -> Result<F::Value> {
        match self.stack.last() {
            Some(top) if top.value => {}
            _ => return Err(ProtocolError::Misuse(constants::ERR_NO_VALUE)),
        }
        let size = self.stack.last().expect("value peeked").remaining;
        self.flush_held();
        let payload = self.read_exact_captured(size)?;
        self.stack.pop();
        F::decode(&payload)
    }

    /// Discard the innermost open element entirely: its remaining payload
    /// is consumed (still feeding capture scopes) and no further events
    /// are emitted for it.
    pub fn skip(&mut self) -> Result<()> {
        let remaining = match self.stack.last() {
            Some(top) => top.remaining,
            None => return Err(ProtocolError::Misuse(constants::ERR_NO_VALUE)),
        };
        self.flush_held();
        self.consume(remaining)?;
        let frame = self.stack.pop().expect("frame peeked");
        trace!(element = %frame.ty.describe(), "element skipped");
        Ok(())
    }

    /// Open a capture scope. Bytes consumed from here on feed the scope's
    /// digest; the pending header of the element whose Begin was just
    /// surfaced is *not* included.
    pub fn begin_capture(&mut self) -> Result<()> {
        if self.stack.is_empty() {
            return Err(ProtocolError::Misuse(constants::ERR_CAPTURE_ROOT));
        }
        self.flush_held();
        self.captures.push(Keccak256::new());
        Ok(())
    }

    /// Close the innermost capture scope and finalize its digest.
    ///
    /// Header bytes still pending attribution are excluded, which is what
    /// lets a caller close the scope upon seeing a signature element's
    /// Begin event and obtain a digest of everything before it.
    pub fn end_capture(&mut self) -> Result<Hash256> {
        let hasher = self
            .captures
            .pop()
            .ok_or(ProtocolError::Misuse(constants::ERR_CAPTURE_NONE))?;
        Ok(Hash256(hasher.finalize().into()))
    }

    fn current_scope(&self) -> ContextId {
        self.stack.last().map_or(self.root, |frame| frame.scope)
    }

    fn flush_held(&mut self) {
        if self.held.is_empty() {
            return;
        }
        for capture in &mut self.captures {
            capture.update(&self.held);
        }
        self.held.clear();
    }

    fn next_source_byte(&mut self) -> Result<Option<u8>> {
        let mut byte = [0u8; 1];
        loop {
            match self.src.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn read_exact_captured(&mut self, size: u64) -> Result<Vec<u8>> {
        let mut payload = vec![0u8; size as usize];
        if let Err(e) = self.src.read_exact(&mut payload) {
            return Err(if e.kind() == std::io::ErrorKind::UnexpectedEof {
                ProtocolError::Truncated(constants::ERR_TRUNCATED_VALUE)
            } else {
                e.into()
            });
        }
        for capture in &mut self.captures {
            capture.update(&payload);
        }
        Ok(payload)
    }

    fn consume(&mut self, mut remaining: u64) -> Result<()> {
        let mut scratch = [0u8; SKIP_CHUNK];
        while remaining > 0 {
            let want = remaining.min(SKIP_CHUNK as u64) as usize;
            if let Err(e) = self.src.read_exact(&mut scratch[..want]) {
                return Err(if e.kind() == std::io::ErrorKind::UnexpectedEof {
                    ProtocolError::Truncated(constants::ERR_TRUNCATED_VALUE)
                } else {
                    e.into()
                });
            }
            for capture in &mut self.captures {
                capture.update(&scratch[..want]);
            }
            remaining -= want as u64;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::schema;
    use crate::stream::format::Utf8Format;
    use crate::stream::writer::StreamingWriter;

    #[test]
    fn stack_inspection_tracks_ancestry() {
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
        reader.next().unwrap(); // Begin Entry
        reader.next().unwrap(); // Begin FieldList
        reader.next().unwrap(); // Begin Field
        assert_eq!(reader.depth(), 3);
        assert!(reader.stack_peek().unwrap().element().is(&schema::FIELD));
        assert!(reader.stack_get(2).unwrap().element().is(&schema::ENTRY));
        assert_eq!(reader.stack_search(&schema::FIELD_LIST), Some(1));
        assert_eq!(reader.stack_search(&schema::CHEQUE_LIST), None);
        assert!(reader.stack_get(3).is_none());
    }
}
