//! The per-exchange session object.
//!
//! A `Conversation` owns one reader/writer pair over a channel that has
//! already passed the packet-header handshake. It is the single surface
//! message codecs drive: structural events, typed values, skips, capture
//! scopes, and whole-message send/receive. One conversation is strictly
//! single-threaded; concurrency comes from running many conversations,
//! which share nothing but the immutable tag registry.

use crate::config::CodecConfig;
use crate::core::registry::{ElementDef, ElementType};
use crate::core::version::Version;
use crate::crypto::{Hash256, Recoverer, Signer};
use crate::error::{ProtocolError, Result};
use crate::protocol::handshake;
use crate::protocol::request::{self, Request};
use crate::protocol::response::{self, ErrorMessage, Response};
use crate::protocol::schema;
use crate::protocol::Message;
use crate::stream::event::{Event, EventKind};
use crate::stream::format::ValueFormat;
use crate::stream::reader::StreamingReader;
use crate::stream::writer::StreamingWriter;
use std::io::{Read, Write};

/// One message exchange session over an open channel.
pub struct Conversation<R, W: Write> {
    reader: StreamingReader<R>,
    writer: StreamingWriter<W>,
}

impl<R: Read, W: Write> Conversation<R, W> {
    /// Wrap an already-validated channel.
    pub fn new(source: R, sink: W, config: CodecConfig) -> Self {
        Self {
            reader: StreamingReader::new(
                source,
                schema::registry(),
                schema::CTX_ROOT,
                config.clone(),
            ),
            writer: StreamingWriter::new(sink, config),
        }
    }

    /// Open a channel as the initiating side: write the packet header,
    /// then wrap the streams.
    pub fn open(source: R, mut sink: W, config: CodecConfig, version: Version) -> Result<Self> {
        handshake::open_channel(&mut sink, version)?;
        sink.flush()?;
        Ok(Self::new(source, sink, config))
    }

    /// Accept a channel: validate the remote packet header, then wrap the
    /// streams. On rejection a best-effort error message is written before
    /// the error is returned.
    pub fn accept(
        mut source: R,
        mut sink: W,
        config: CodecConfig,
        local: Version,
    ) -> Result<(Self, Version)> {
        match handshake::accept_channel(&mut source, local) {
            Ok(remote) => Ok((Self::new(source, sink, config), remote)),
            Err(error) => {
                handshake::reject(&mut sink, config, &error);
                Err(error)
            }
        }
    }

    /// Encode and flush one request. Signed sub-elements are signed with
    /// the given capability.
    pub fn send_request(&mut self, request: &Request, signer: &dyn Signer) -> Result<()> {
        request::encode_request(&mut self.writer, request, signer)?;
        self.writer.flush()
    }

    /// Encode and flush one response.
    pub fn send_response(&mut self, response: &Response, signer: &dyn Signer) -> Result<()> {
        response::encode_response(&mut self.writer, response, signer)?;
        self.writer.flush()
    }

    /// Encode and flush one framed error message.
    pub fn send_error(&mut self, error: &ErrorMessage) -> Result<()> {
        response::encode_error_message(&mut self.writer, error)?;
        self.writer.flush()
    }

    /// Decode the next message, verifying signed sub-elements with the
    /// given recovery capability. Returns `None` on a clean end of stream.
    pub fn receive(&mut self, recoverer: &dyn Recoverer) -> Result<Option<Message>> {
        let event = match self.reader.next()? {
            Some(event) => event,
            None => return Ok(None),
        };
        if event.kind != EventKind::Begin {
            return Err(ProtocolError::UnexpectedElement {
                context: "Root",
                found: event.ty.describe(),
            });
        }
        let reader = &mut self.reader;
        let message = if event.ty.is(&schema::MODIFICATION_REQUEST) {
            Message::Request(Request::Modification(request::decode_modification(
                reader, recoverer,
            )?))
        } else if event.ty.is(&schema::RECOLLECTION_REQUEST) {
            Message::Request(Request::Recollection(request::decode_recollection(
                reader, recoverer,
            )?))
        } else if event.ty.is(&schema::HEALING_REQUEST) {
            Message::Request(Request::Healing(request::decode_healing(
                reader, recoverer,
            )?))
        } else if event.ty.is(&schema::SCHEMA_REQUEST) {
            Message::Request(Request::Schema(request::decode_schema(reader)?))
        } else if event.ty.is(&schema::BILLING_REQUEST) {
            Message::Request(Request::Billing(request::decode_billing(
                reader, recoverer,
            )?))
        } else if event.ty.is(&schema::MODIFICATION_RESPONSE) {
            let (message_id, results) =
                response::decode_result_response(reader, &schema::MODIFICATION_RESPONSE)?;
            Message::Response(Response::Modification(response::ModificationResponse {
                message_id,
                results,
            }))
        } else if event.ty.is(&schema::RECOLLECTION_RESPONSE) {
            Message::Response(Response::Recollection(
                response::decode_recollection_response(reader, recoverer)?,
            ))
        } else if event.ty.is(&schema::HEALING_RESPONSE) {
            let (message_id, results) =
                response::decode_result_response(reader, &schema::HEALING_RESPONSE)?;
            Message::Response(Response::Healing(response::HealingResponse {
                message_id,
                results,
            }))
        } else if event.ty.is(&schema::SCHEMA_RESPONSE) {
            Message::Response(Response::Schema(response::decode_schema_response(reader)?))
        } else if event.ty.is(&schema::BILLING_RESPONSE) {
            let (message_id, results) =
                response::decode_result_response(reader, &schema::BILLING_RESPONSE)?;
            Message::Response(Response::Billing(response::BillingResponse {
                message_id,
                results,
            }))
        } else if event.ty.is(&schema::ERROR) {
            Message::Error(response::decode_error_message(reader)?)
        } else {
            return Err(ProtocolError::UnexpectedElement {
                context: "Root",
                found: event.ty.describe(),
            });
        };
        Ok(Some(message))
    }

    // ---- streaming surface, for handlers that drive the codec directly ----

    /// Pull the next structural event from the channel.
    pub fn next(&mut self) -> Result<Option<Event>> {
        self.reader.next()
    }

    /// Push one structural event to the channel.
    pub fn accept_event(&mut self, event: &Event) -> Result<()> {
        match (&event.ty, event.kind) {
            (ElementType::Known(def), EventKind::Begin) => self.writer.begin(*def),
            (_, EventKind::End) => self.writer.end(),
            _ => Err(ProtocolError::Misuse(
                "cannot open an unknown element on the write side",
            )),
        }
    }

    /// Read the pending terminal value.
    pub fn read<F: ValueFormat>(&mut self) -> Result<F::Value> {
        self.reader.read_value::<F>()
    }

    /// Write one terminal element.
    pub fn write<F: ValueFormat>(
        &mut self,
        def: &'static ElementDef,
        value: &F::Value,
    ) -> Result<()> {
        self.writer.write_value::<F>(def, value)
    }

    /// Discard the innermost open element on the read side.
    pub fn skip(&mut self) -> Result<()> {
        self.reader.skip()
    }

    /// Open a capture scope on the read side.
    pub fn begin_read_capture(&mut self) -> Result<()> {
        self.reader.begin_capture()
    }

    /// Close the innermost read-side capture scope.
    pub fn end_read_capture(&mut self) -> Result<Hash256> {
        self.reader.end_capture()
    }

    /// Open a capture scope on the write side.
    pub fn begin_write_capture(&mut self) -> Result<()> {
        self.writer.begin_capture()
    }

    /// Close the innermost write-side capture scope.
    pub fn end_write_capture(&mut self) -> Result<Hash256> {
        self.writer.end_capture()
    }

    /// Direct access to the reading half.
    pub fn reader(&mut self) -> &mut StreamingReader<R> {
        &mut self.reader
    }

    /// Direct access to the writing half.
    pub fn writer(&mut self) -> &mut StreamingWriter<W> {
        &mut self.writer
    }
}
