//! Response variants, per-item results, and the framed error message.
//!
//! Application-level failures never abort a channel: a response carries a
//! Success or Error result per item, and sibling items are unaffected.
//! The framed [`ErrorMessage`] is different — it reports a channel-level
//! failure (bad revision, framing fault) as the last message before
//! teardown.

use crate::core::registry::ElementDef;
use crate::crypto::{Hash256, Recoverer, Signer};
use crate::error::{ProtocolError, Result};
use crate::protocol::entry::{
    decode_entry_header, decode_field_list, encode_entry_header, encode_field, EntryHeader,
    Field,
};
use crate::protocol::schema;
use crate::protocol::signed::Attestation;
use crate::stream::event::EventKind;
use crate::stream::format::{HashFormat, UintFormat, Utf8Format};
use crate::stream::reader::StreamingReader;
use crate::stream::writer::StreamingWriter;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use tracing::debug;

/// The closed set of response kinds.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub enum Response {
    Modification(ModificationResponse),
    Recollection(RecollectionResponse),
    Healing(HealingResponse),
    Schema(SchemaResponse),
    Billing(BillingResponse),
}

/// Per-item outcome, reported in-band alongside sibling results.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub enum OperationResult {
    Success {
        /// Content hash of the accepted item.
        hash: Hash256,
    },
    Error {
        /// Content hash of the offending item.
        hash: Hash256,
        /// Human-readable message chain, outermost first.
        messages: Vec<String>,
    },
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct ModificationResponse {
    pub message_id: u64,
    pub results: Vec<OperationResult>,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct RecollectionResponse {
    pub message_id: u64,
    pub results: Vec<RecollectionResult>,
}

/// One recollection result: a matched entry or a per-result error.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub enum RecollectionResult {
    Entry(RecollectionEntry),
    Error { hash: Hash256, messages: Vec<String> },
}

/// A matched entry: its signed header plus retrieved and computed fields.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct RecollectionEntry {
    pub header: EntryHeader,
    /// Verified signing envelope; populated on decode, ignored on encode.
    pub attestation: Option<Attestation>,
    pub fields: Vec<Field>,
    pub computed: Vec<Field>,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct HealingResponse {
    pub message_id: u64,
    pub results: Vec<OperationResult>,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct SchemaResponse {
    pub message_id: u64,
    pub fields: Vec<SchemaField>,
}

/// One field descriptor of a table schema.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    pub type_name: String,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct BillingResponse {
    pub message_id: u64,
    pub results: Vec<OperationResult>,
}

/// A channel-level error report: numeric code plus a message chain.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub code: u64,
    pub messages: Vec<String>,
}

pub fn encode_response<W: Write>(
    writer: &mut StreamingWriter<W>,
    response: &Response,
    signer: &dyn Signer,
) -> Result<()> {
    match response {
        Response::Modification(response) => {
            debug!(message_id = response.message_id, "encoding modification response");
            writer.begin(&schema::MODIFICATION_RESPONSE)?;
            writer.write_value::<UintFormat>(&schema::MESSAGE_ID, &response.message_id)?;
            for result in &response.results {
                encode_operation_result(writer, result)?;
            }
            writer.end()
        }
        Response::Recollection(response) => {
            debug!(message_id = response.message_id, "encoding recollection response");
            writer.begin(&schema::RECOLLECTION_RESPONSE)?;
            writer.write_value::<UintFormat>(&schema::MESSAGE_ID, &response.message_id)?;
            for result in &response.results {
                match result {
                    RecollectionResult::Entry(entry) => {
                        encode_recollection_entry(writer, entry, signer)?;
                    }
                    RecollectionResult::Error { hash, messages } => {
                        encode_result_error(writer, hash, messages)?;
                    }
                }
            }
            writer.end()
        }
        Response::Healing(response) => {
            debug!(message_id = response.message_id, "encoding healing response");
            writer.begin(&schema::HEALING_RESPONSE)?;
            writer.write_value::<UintFormat>(&schema::MESSAGE_ID, &response.message_id)?;
            for result in &response.results {
                encode_operation_result(writer, result)?;
            }
            writer.end()
        }
        Response::Schema(response) => {
            debug!(message_id = response.message_id, "encoding schema response");
            writer.begin(&schema::SCHEMA_RESPONSE)?;
            writer.write_value::<UintFormat>(&schema::MESSAGE_ID, &response.message_id)?;
            for field in &response.fields {
                writer.begin(&schema::SCHEMA_FIELD)?;
                writer.write_value::<Utf8Format>(&schema::FIELD_NAME, &field.name)?;
                writer.write_value::<Utf8Format>(&schema::FIELD_TYPE, &field.type_name)?;
                writer.end()?;
            }
            writer.end()
        }
        Response::Billing(response) => {
            debug!(message_id = response.message_id, "encoding billing response");
            writer.begin(&schema::BILLING_RESPONSE)?;
            writer.write_value::<UintFormat>(&schema::MESSAGE_ID, &response.message_id)?;
            for result in &response.results {
                encode_operation_result(writer, result)?;
            }
            writer.end()
        }
    }
}

pub fn encode_error_message<W: Write>(
    writer: &mut StreamingWriter<W>,
    error: &ErrorMessage,
) -> Result<()> {
    debug!(code = error.code, "encoding error message");
    writer.begin(&schema::ERROR)?;
    writer.write_value::<UintFormat>(&schema::ERROR_CODE, &error.code)?;
    for message in &error.messages {
        writer.write_value::<Utf8Format>(&schema::ERROR_MESSAGE, message)?;
    }
    writer.end()
}

fn encode_operation_result<W: Write>(
    writer: &mut StreamingWriter<W>,
    result: &OperationResult,
) -> Result<()> {
    match result {
        OperationResult::Success { hash } => {
            writer.begin(&schema::RESULT_SUCCESS)?;
            writer.write_value::<HashFormat>(&schema::ENTRY_HASH, hash)?;
            writer.end()
        }
        OperationResult::Error { hash, messages } => encode_result_error(writer, hash, messages),
    }
}

fn encode_result_error<W: Write>(
    writer: &mut StreamingWriter<W>,
    hash: &Hash256,
    messages: &[String],
) -> Result<()> {
    writer.begin(&schema::RESULT_ERROR)?;
    writer.write_value::<HashFormat>(&schema::ENTRY_HASH, hash)?;
    for message in messages {
        writer.write_value::<Utf8Format>(&schema::ERROR_MESSAGE, message)?;
    }
    writer.end()
}

fn encode_recollection_entry<W: Write>(
    writer: &mut StreamingWriter<W>,
    entry: &RecollectionEntry,
    signer: &dyn Signer,
) -> Result<()> {
    writer.begin(&schema::RECOLLECTION_RESULT)?;
    encode_entry_header(writer, &entry.header, signer)?;
    writer.begin(&schema::FIELD_LIST)?;
    for field in &entry.fields {
        encode_field(writer, field)?;
    }
    writer.end()?;
    if !entry.computed.is_empty() {
        writer.begin(&schema::COMPUTED_LIST)?;
        for field in &entry.computed {
            encode_field(writer, field)?;
        }
        writer.end()?;
    }
    writer.end()
}

/// Decode the shared message-id + result-list body of a modification,
/// healing, or billing response; the root's Begin event has already
/// surfaced.
pub(crate) fn decode_result_response<R: Read>(
    reader: &mut StreamingReader<R>,
    root: &'static ElementDef,
) -> Result<(u64, Vec<OperationResult>)> {
    let mut message_id = None;
    let mut results = Vec::new();
    loop {
        let event = super::next_event(reader)?;
        match event.kind {
            EventKind::Begin if event.ty.is(&schema::MESSAGE_ID) => {
                message_id = Some(reader.read_value::<UintFormat>()?);
            }
            EventKind::Begin if event.ty.is(&schema::RESULT_SUCCESS) => {
                results.push(decode_result_success(reader)?);
            }
            EventKind::Begin if event.ty.is(&schema::RESULT_ERROR) => {
                let (hash, messages) = decode_result_error(reader)?;
                results.push(OperationResult::Error { hash, messages });
            }
            EventKind::End if event.ty.is(root) => {
                return Ok((
                    message_id.ok_or(ProtocolError::MissingElement {
                        context: root.name,
                        element: schema::MESSAGE_ID.name,
                    })?,
                    results,
                ));
            }
            _ => return Err(super::unexpected(root.name, &event)),
        }
    }
}

fn decode_result_success<R: Read>(reader: &mut StreamingReader<R>) -> Result<OperationResult> {
    let context = schema::RESULT_SUCCESS.name;
    let mut hash = None;
    loop {
        let event = super::next_event(reader)?;
        match event.kind {
            EventKind::Begin if event.ty.is(&schema::ENTRY_HASH) => {
                hash = Some(reader.read_value::<HashFormat>()?);
            }
            EventKind::End if event.ty.is(&schema::RESULT_SUCCESS) => {
                return Ok(OperationResult::Success {
                    hash: hash.ok_or(ProtocolError::MissingElement {
                        context,
                        element: schema::ENTRY_HASH.name,
                    })?,
                });
            }
            _ => return Err(super::unexpected(context, &event)),
        }
    }
}

fn decode_result_error<R: Read>(
    reader: &mut StreamingReader<R>,
) -> Result<(Hash256, Vec<String>)> {
    let context = schema::RESULT_ERROR.name;
    let mut hash = None;
    let mut messages = Vec::new();
    loop {
        let event = super::next_event(reader)?;
        match event.kind {
            EventKind::Begin if event.ty.is(&schema::ENTRY_HASH) => {
                hash = Some(reader.read_value::<HashFormat>()?);
            }
            EventKind::Begin if event.ty.is(&schema::ERROR_MESSAGE) => {
                messages.push(reader.read_value::<Utf8Format>()?);
            }
            EventKind::End if event.ty.is(&schema::RESULT_ERROR) => {
                return Ok((
                    hash.ok_or(ProtocolError::MissingElement {
                        context,
                        element: schema::ENTRY_HASH.name,
                    })?,
                    messages,
                ));
            }
            _ => return Err(super::unexpected(context, &event)),
        }
    }
}

/// Decode a recollection response; its Begin event has already surfaced.
pub(crate) fn decode_recollection_response<R: Read>(
    reader: &mut StreamingReader<R>,
    recoverer: &dyn Recoverer,
) -> Result<RecollectionResponse> {
    let context = schema::RECOLLECTION_RESPONSE.name;
    let mut message_id = None;
    let mut results = Vec::new();
    loop {
        let event = super::next_event(reader)?;
        match event.kind {
            EventKind::Begin if event.ty.is(&schema::MESSAGE_ID) => {
                message_id = Some(reader.read_value::<UintFormat>()?);
            }
            EventKind::Begin if event.ty.is(&schema::RECOLLECTION_RESULT) => {
                results.push(RecollectionResult::Entry(decode_recollection_entry(
                    reader, recoverer,
                )?));
            }
            EventKind::Begin if event.ty.is(&schema::RESULT_ERROR) => {
                let (hash, messages) = decode_result_error(reader)?;
                results.push(RecollectionResult::Error { hash, messages });
            }
            EventKind::End if event.ty.is(&schema::RECOLLECTION_RESPONSE) => {
                return Ok(RecollectionResponse {
                    message_id: message_id.ok_or(ProtocolError::MissingElement {
                        context,
                        element: schema::MESSAGE_ID.name,
                    })?,
                    results,
                });
            }
            _ => return Err(super::unexpected(context, &event)),
        }
    }
}

fn decode_recollection_entry<R: Read>(
    reader: &mut StreamingReader<R>,
    recoverer: &dyn Recoverer,
) -> Result<RecollectionEntry> {
    let context = schema::RECOLLECTION_RESULT.name;
    let mut header = None;
    let mut fields = Vec::new();
    let mut computed = Vec::new();
    loop {
        let event = super::next_event(reader)?;
        match event.kind {
            EventKind::Begin if event.ty.is(&schema::ENTRY_HEADER) => {
                header = Some(decode_entry_header(reader, recoverer)?);
            }
            EventKind::Begin if event.ty.is(&schema::FIELD_LIST) => {
                decode_field_list(reader, &schema::FIELD_LIST, &mut fields)?;
            }
            EventKind::Begin if event.ty.is(&schema::COMPUTED_LIST) => {
                decode_field_list(reader, &schema::COMPUTED_LIST, &mut computed)?;
            }
            EventKind::End if event.ty.is(&schema::RECOLLECTION_RESULT) => {
                let (header, attestation) = header.ok_or(ProtocolError::MissingElement {
                    context,
                    element: schema::ENTRY_HEADER.name,
                })?;
                return Ok(RecollectionEntry {
                    header,
                    attestation: Some(attestation),
                    fields,
                    computed,
                });
            }
            _ => return Err(super::unexpected(context, &event)),
        }
    }
}

/// Decode a schema response; its Begin event has already surfaced.
pub(crate) fn decode_schema_response<R: Read>(
    reader: &mut StreamingReader<R>,
) -> Result<SchemaResponse> {
    let context = schema::SCHEMA_RESPONSE.name;
    let mut message_id = None;
    let mut fields = Vec::new();
    loop {
        let event = super::next_event(reader)?;
        match event.kind {
            EventKind::Begin if event.ty.is(&schema::MESSAGE_ID) => {
                message_id = Some(reader.read_value::<UintFormat>()?);
            }
            EventKind::Begin if event.ty.is(&schema::SCHEMA_FIELD) => {
                fields.push(decode_schema_field(reader)?);
            }
            EventKind::End if event.ty.is(&schema::SCHEMA_RESPONSE) => {
                return Ok(SchemaResponse {
                    message_id: message_id.ok_or(ProtocolError::MissingElement {
                        context,
                        element: schema::MESSAGE_ID.name,
                    })?,
                    fields,
                });
            }
            _ => return Err(super::unexpected(context, &event)),
        }
    }
}

fn decode_schema_field<R: Read>(reader: &mut StreamingReader<R>) -> Result<SchemaField> {
    let context = schema::SCHEMA_FIELD.name;
    let mut name = None;
    let mut type_name = None;
    loop {
        let event = super::next_event(reader)?;
        match event.kind {
            EventKind::Begin if event.ty.is(&schema::FIELD_NAME) => {
                name = Some(reader.read_value::<Utf8Format>()?);
            }
            EventKind::Begin if event.ty.is(&schema::FIELD_TYPE) => {
                type_name = Some(reader.read_value::<Utf8Format>()?);
            }
            EventKind::End if event.ty.is(&schema::SCHEMA_FIELD) => {
                return Ok(SchemaField {
                    name: name.ok_or(ProtocolError::MissingElement {
                        context,
                        element: schema::FIELD_NAME.name,
                    })?,
                    type_name: type_name.ok_or(ProtocolError::MissingElement {
                        context,
                        element: schema::FIELD_TYPE.name,
                    })?,
                });
            }
            _ => return Err(super::unexpected(context, &event)),
        }
    }
}

/// Decode a framed error message; its Begin event has already surfaced.
pub(crate) fn decode_error_message<R: Read>(
    reader: &mut StreamingReader<R>,
) -> Result<ErrorMessage> {
    let context = schema::ERROR.name;
    let mut code = None;
    let mut messages = Vec::new();
    loop {
        let event = super::next_event(reader)?;
        match event.kind {
            EventKind::Begin if event.ty.is(&schema::ERROR_CODE) => {
                code = Some(reader.read_value::<UintFormat>()?);
            }
            EventKind::Begin if event.ty.is(&schema::ERROR_MESSAGE) => {
                messages.push(reader.read_value::<Utf8Format>()?);
            }
            EventKind::End if event.ty.is(&schema::ERROR) => {
                return Ok(ErrorMessage {
                    code: code.ok_or(ProtocolError::MissingElement {
                        context,
                        element: schema::ERROR_CODE.name,
                    })?,
                    messages,
                });
            }
            _ => return Err(super::unexpected(context, &event)),
        }
    }
}
