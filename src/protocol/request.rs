//! Request variants and their codecs.
//!
//! A closed sum over the five request kinds, dispatched by exhaustive
//! matching at the encode site and by root tag at the decode site, so an
//! unhandled variant is a compile-time error rather than a runtime gap.

use crate::crypto::{Recoverer, Signer};
use crate::error::{ProtocolError, Result};
use crate::protocol::cheque::{decode_cheque, encode_cheque, Cheque};
use crate::protocol::consistency::{encode_consistency, ConsistencyLevel, ConsistencyParts};
use crate::protocol::entry::{decode_entry, encode_entry, Entry};
use crate::protocol::function::{decode_function, encode_function, Function};
use crate::protocol::schema;
use crate::stream::event::EventKind;
use crate::stream::format::{UintFormat, Utf8Format};
use crate::stream::reader::StreamingReader;
use crate::stream::writer::StreamingWriter;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use tracing::debug;

/// The closed set of request kinds.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub enum Request {
    Modification(ModificationRequest),
    Recollection(RecollectionRequest),
    Healing(HealingRequest),
    Schema(SchemaRequest),
    Billing(BillingRequest),
}

/// Insert/update/delete a batch of entries.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct ModificationRequest {
    pub consistency: ConsistencyLevel,
    pub message_id: u64,
    pub entries: Vec<Entry>,
}

/// Select entries from one table.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct RecollectionRequest {
    pub consistency: ConsistencyLevel,
    pub message_id: u64,
    pub tablespace: String,
    pub table: String,
    pub retrieves: Vec<Retrieve>,
    pub filters: Vec<Filter>,
    pub cheques: Vec<Cheque>,
}

/// One selector of a recollection: a plain field or a computed value.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub enum Retrieve {
    Field(String),
    Compute {
        function: Function,
        alias: Option<String>,
        result_type: String,
    },
}

/// One predicate of a recollection filter list.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub predicate: Function,
}

/// Repair a lagging replica with full entries.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct HealingRequest {
    pub message_id: u64,
    pub entries: Vec<Entry>,
}

/// Fetch the field schema of one table.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct SchemaRequest {
    pub message_id: u64,
    pub tablespace: String,
    pub table: String,
}

/// Redeem a batch of cheques.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct BillingRequest {
    pub message_id: u64,
    pub cheques: Vec<Cheque>,
}

pub fn encode_request<W: Write>(
    writer: &mut StreamingWriter<W>,
    request: &Request,
    signer: &dyn Signer,
) -> Result<()> {
    match request {
        Request::Modification(request) => encode_modification(writer, request, signer),
        Request::Recollection(request) => encode_recollection(writer, request, signer),
        Request::Healing(request) => encode_healing(writer, request, signer),
        Request::Schema(request) => encode_schema(writer, request),
        Request::Billing(request) => encode_billing(writer, request, signer),
    }
}

fn encode_modification<W: Write>(
    writer: &mut StreamingWriter<W>,
    request: &ModificationRequest,
    signer: &dyn Signer,
) -> Result<()> {
    debug!(message_id = request.message_id, entries = request.entries.len(),
        "encoding modification request");
    writer.begin(&schema::MODIFICATION_REQUEST)?;
    encode_consistency(writer, request.consistency)?;
    writer.write_value::<UintFormat>(&schema::MESSAGE_ID, &request.message_id)?;
    for entry in &request.entries {
        encode_entry(writer, entry, signer)?;
    }
    writer.end()
}

fn encode_recollection<W: Write>(
    writer: &mut StreamingWriter<W>,
    request: &RecollectionRequest,
    signer: &dyn Signer,
) -> Result<()> {
    debug!(message_id = request.message_id, "encoding recollection request");
    writer.begin(&schema::RECOLLECTION_REQUEST)?;
    encode_consistency(writer, request.consistency)?;
    writer.write_value::<UintFormat>(&schema::MESSAGE_ID, &request.message_id)?;
    writer.write_value::<Utf8Format>(&schema::TABLESPACE_NAME, &request.tablespace)?;
    writer.write_value::<Utf8Format>(&schema::TABLE_NAME, &request.table)?;
    if !request.retrieves.is_empty() {
        writer.begin(&schema::RETRIEVE_LIST)?;
        for retrieve in &request.retrieves {
            match retrieve {
                Retrieve::Field(name) => {
                    writer.write_value::<Utf8Format>(&schema::RETRIEVE_FIELD, name)?;
                }
                Retrieve::Compute {
                    function,
                    alias,
                    result_type,
                } => {
                    writer.begin(&schema::RETRIEVE_COMPUTE)?;
                    encode_function(writer, function)?;
                    if let Some(alias) = alias {
                        writer.write_value::<Utf8Format>(&schema::ALIAS, alias)?;
                    }
                    writer.write_value::<Utf8Format>(&schema::RESULT_TYPE, result_type)?;
                    writer.end()?;
                }
            }
        }
        writer.end()?;
    }
    if !request.filters.is_empty() {
        writer.begin(&schema::FILTER_LIST)?;
        for filter in &request.filters {
            writer.begin(&schema::FILTER)?;
            writer.write_value::<Utf8Format>(&schema::FIELD_NAME, &filter.field)?;
            encode_function(writer, &filter.predicate)?;
            writer.end()?;
        }
        writer.end()?;
    }
    if !request.cheques.is_empty() {
        writer.begin(&schema::CHEQUE_LIST)?;
        for cheque in &request.cheques {
            encode_cheque(writer, cheque, signer)?;
        }
        writer.end()?;
    }
    writer.end()
}

fn encode_healing<W: Write>(
    writer: &mut StreamingWriter<W>,
    request: &HealingRequest,
    signer: &dyn Signer,
) -> Result<()> {
    debug!(message_id = request.message_id, entries = request.entries.len(),
        "encoding healing request");
    writer.begin(&schema::HEALING_REQUEST)?;
    writer.write_value::<UintFormat>(&schema::MESSAGE_ID, &request.message_id)?;
    for entry in &request.entries {
        encode_entry(writer, entry, signer)?;
    }
    writer.end()
}

fn encode_schema<W: Write>(
    writer: &mut StreamingWriter<W>,
    request: &SchemaRequest,
) -> Result<()> {
    debug!(message_id = request.message_id, "encoding schema request");
    writer.begin(&schema::SCHEMA_REQUEST)?;
    writer.write_value::<UintFormat>(&schema::MESSAGE_ID, &request.message_id)?;
    writer.write_value::<Utf8Format>(&schema::TABLESPACE_NAME, &request.tablespace)?;
    writer.write_value::<Utf8Format>(&schema::TABLE_NAME, &request.table)?;
    writer.end()
}

fn encode_billing<W: Write>(
    writer: &mut StreamingWriter<W>,
    request: &BillingRequest,
    signer: &dyn Signer,
) -> Result<()> {
    debug!(message_id = request.message_id, cheques = request.cheques.len(),
        "encoding billing request");
    writer.begin(&schema::BILLING_REQUEST)?;
    writer.write_value::<UintFormat>(&schema::MESSAGE_ID, &request.message_id)?;
    if !request.cheques.is_empty() {
        writer.begin(&schema::CHEQUE_LIST)?;
        for cheque in &request.cheques {
            encode_cheque(writer, cheque, signer)?;
        }
        writer.end()?;
    }
    writer.end()
}

/// Decode a modification request; its Begin event has already surfaced.
pub(crate) fn decode_modification<R: Read>(
    reader: &mut StreamingReader<R>,
    recoverer: &dyn Recoverer,
) -> Result<ModificationRequest> {
    let context = schema::MODIFICATION_REQUEST.name;
    let mut parts = ConsistencyParts::default();
    let mut message_id = None;
    let mut entries = Vec::new();

    loop {
        let event = super::next_event(reader)?;
        match event.kind {
            EventKind::Begin if event.ty.is(&schema::CONSISTENCY_KIND) => {
                parts.set_kind(reader.read_value::<UintFormat>()?);
            }
            EventKind::Begin if event.ty.is(&schema::CONSISTENCY) => {
                parts.set_value(reader.read_value::<UintFormat>()?);
            }
            EventKind::Begin if event.ty.is(&schema::MESSAGE_ID) => {
                message_id = Some(reader.read_value::<UintFormat>()?);
            }
            EventKind::Begin if event.ty.is(&schema::ENTRY) => {
                entries.push(decode_entry(reader, recoverer)?);
            }
            EventKind::End if event.ty.is(&schema::MODIFICATION_REQUEST) => {
                return Ok(ModificationRequest {
                    consistency: parts.finish(context)?,
                    message_id: message_id.ok_or(ProtocolError::MissingElement {
                        context,
                        element: schema::MESSAGE_ID.name,
                    })?,
                    entries,
                });
            }
            _ => return Err(super::unexpected(context, &event)),
        }
    }
}

/// Decode a recollection request; its Begin event has already surfaced.
pub(crate) fn decode_recollection<R: Read>(
    reader: &mut StreamingReader<R>,
    recoverer: &dyn Recoverer,
) -> Result<RecollectionRequest> {
    let context = schema::RECOLLECTION_REQUEST.name;
    let mut parts = ConsistencyParts::default();
    let mut message_id = None;
    let mut tablespace = None;
    let mut table = None;
    let mut retrieves = Vec::new();
    let mut filters = Vec::new();
    let mut cheques = Vec::new();

    loop {
        let event = super::next_event(reader)?;
        match event.kind {
            EventKind::Begin if event.ty.is(&schema::CONSISTENCY_KIND) => {
                parts.set_kind(reader.read_value::<UintFormat>()?);
            }
            EventKind::Begin if event.ty.is(&schema::CONSISTENCY) => {
                parts.set_value(reader.read_value::<UintFormat>()?);
            }
            EventKind::Begin if event.ty.is(&schema::MESSAGE_ID) => {
                message_id = Some(reader.read_value::<UintFormat>()?);
            }
            EventKind::Begin if event.ty.is(&schema::TABLESPACE_NAME) => {
                tablespace = Some(reader.read_value::<Utf8Format>()?);
            }
            EventKind::Begin if event.ty.is(&schema::TABLE_NAME) => {
                table = Some(reader.read_value::<Utf8Format>()?);
            }
            EventKind::Begin if event.ty.is(&schema::RETRIEVE_LIST) => {
                decode_retrieve_list(reader, &mut retrieves)?;
            }
            EventKind::Begin if event.ty.is(&schema::FILTER_LIST) => {
                decode_filter_list(reader, &mut filters)?;
            }
            EventKind::Begin if event.ty.is(&schema::CHEQUE_LIST) => loop {
                let event = super::next_event(reader)?;
                if event.is_begin(&schema::CHEQUE) {
                    cheques.push(decode_cheque(reader, recoverer)?);
                } else if event.is_end(&schema::CHEQUE_LIST) {
                    break;
                } else {
                    return Err(super::unexpected(schema::CHEQUE_LIST.name, &event));
                }
            },
            EventKind::End if event.ty.is(&schema::RECOLLECTION_REQUEST) => {
                return Ok(RecollectionRequest {
                    consistency: parts.finish(context)?,
                    message_id: message_id.ok_or(ProtocolError::MissingElement {
                        context,
                        element: schema::MESSAGE_ID.name,
                    })?,
                    tablespace: tablespace.ok_or(ProtocolError::MissingElement {
                        context,
                        element: schema::TABLESPACE_NAME.name,
                    })?,
                    table: table.ok_or(ProtocolError::MissingElement {
                        context,
                        element: schema::TABLE_NAME.name,
                    })?,
                    retrieves,
                    filters,
                    cheques,
                });
            }
            _ => return Err(super::unexpected(context, &event)),
        }
    }
}

fn decode_retrieve_list<R: Read>(
    reader: &mut StreamingReader<R>,
    retrieves: &mut Vec<Retrieve>,
) -> Result<()> {
    loop {
        let event = super::next_event(reader)?;
        match event.kind {
            EventKind::Begin if event.ty.is(&schema::RETRIEVE_FIELD) => {
                retrieves.push(Retrieve::Field(reader.read_value::<Utf8Format>()?));
            }
            EventKind::Begin if event.ty.is(&schema::RETRIEVE_COMPUTE) => {
                retrieves.push(decode_compute(reader)?);
            }
            EventKind::End if event.ty.is(&schema::RETRIEVE_LIST) => return Ok(()),
            _ => return Err(super::unexpected(schema::RETRIEVE_LIST.name, &event)),
        }
    }
}

fn decode_compute<R: Read>(reader: &mut StreamingReader<R>) -> Result<Retrieve> {
    let context = schema::RETRIEVE_COMPUTE.name;
    let mut function = None;
    let mut alias = None;
    let mut result_type = None;
    loop {
        let event = super::next_event(reader)?;
        match event.kind {
            EventKind::Begin if event.ty.is(&schema::FUNCTION) => {
                function = Some(decode_function(reader)?);
            }
            EventKind::Begin if event.ty.is(&schema::ALIAS) => {
                alias = Some(reader.read_value::<Utf8Format>()?);
            }
            EventKind::Begin if event.ty.is(&schema::RESULT_TYPE) => {
                result_type = Some(reader.read_value::<Utf8Format>()?);
            }
            EventKind::End if event.ty.is(&schema::RETRIEVE_COMPUTE) => {
                return Ok(Retrieve::Compute {
                    function: function.ok_or(ProtocolError::MissingElement {
                        context,
                        element: schema::FUNCTION.name,
                    })?,
                    alias,
                    result_type: result_type.ok_or(ProtocolError::MissingElement {
                        context,
                        element: schema::RESULT_TYPE.name,
                    })?,
                });
            }
            _ => return Err(super::unexpected(context, &event)),
        }
    }
}

fn decode_filter_list<R: Read>(
    reader: &mut StreamingReader<R>,
    filters: &mut Vec<Filter>,
) -> Result<()> {
    loop {
        let event = super::next_event(reader)?;
        match event.kind {
            EventKind::Begin if event.ty.is(&schema::FILTER) => {
                filters.push(decode_filter(reader)?);
            }
            EventKind::End if event.ty.is(&schema::FILTER_LIST) => return Ok(()),
            _ => return Err(super::unexpected(schema::FILTER_LIST.name, &event)),
        }
    }
}

fn decode_filter<R: Read>(reader: &mut StreamingReader<R>) -> Result<Filter> {
    let context = schema::FILTER.name;
    let mut field = None;
    let mut predicate = None;
    loop {
        let event = super::next_event(reader)?;
        match event.kind {
            EventKind::Begin if event.ty.is(&schema::FIELD_NAME) => {
                field = Some(reader.read_value::<Utf8Format>()?);
            }
            EventKind::Begin if event.ty.is(&schema::FUNCTION) => {
                predicate = Some(decode_function(reader)?);
            }
            EventKind::End if event.ty.is(&schema::FILTER) => {
                return Ok(Filter {
                    field: field.ok_or(ProtocolError::MissingElement {
                        context,
                        element: schema::FIELD_NAME.name,
                    })?,
                    predicate: predicate.ok_or(ProtocolError::MissingElement {
                        context,
                        element: schema::FUNCTION.name,
                    })?,
                });
            }
            _ => return Err(super::unexpected(context, &event)),
        }
    }
}

/// Decode a healing request; its Begin event has already surfaced.
pub(crate) fn decode_healing<R: Read>(
    reader: &mut StreamingReader<R>,
    recoverer: &dyn Recoverer,
) -> Result<HealingRequest> {
    let context = schema::HEALING_REQUEST.name;
    let mut message_id = None;
    let mut entries = Vec::new();
    loop {
        let event = super::next_event(reader)?;
        match event.kind {
            EventKind::Begin if event.ty.is(&schema::MESSAGE_ID) => {
                message_id = Some(reader.read_value::<UintFormat>()?);
            }
            EventKind::Begin if event.ty.is(&schema::ENTRY) => {
                entries.push(decode_entry(reader, recoverer)?);
            }
            EventKind::End if event.ty.is(&schema::HEALING_REQUEST) => {
                return Ok(HealingRequest {
                    message_id: message_id.ok_or(ProtocolError::MissingElement {
                        context,
                        element: schema::MESSAGE_ID.name,
                    })?,
                    entries,
                });
            }
            _ => return Err(super::unexpected(context, &event)),
        }
    }
}

/// Decode a schema request; its Begin event has already surfaced.
pub(crate) fn decode_schema<R: Read>(
    reader: &mut StreamingReader<R>,
) -> Result<SchemaRequest> {
    let context = schema::SCHEMA_REQUEST.name;
    let mut message_id = None;
    let mut tablespace = None;
    let mut table = None;
    loop {
        let event = super::next_event(reader)?;
        match event.kind {
            EventKind::Begin if event.ty.is(&schema::MESSAGE_ID) => {
                message_id = Some(reader.read_value::<UintFormat>()?);
            }
            EventKind::Begin if event.ty.is(&schema::TABLESPACE_NAME) => {
                tablespace = Some(reader.read_value::<Utf8Format>()?);
            }
            EventKind::Begin if event.ty.is(&schema::TABLE_NAME) => {
                table = Some(reader.read_value::<Utf8Format>()?);
            }
            EventKind::End if event.ty.is(&schema::SCHEMA_REQUEST) => {
                return Ok(SchemaRequest {
                    message_id: message_id.ok_or(ProtocolError::MissingElement {
                        context,
                        element: schema::MESSAGE_ID.name,
                    })?,
                    tablespace: tablespace.ok_or(ProtocolError::MissingElement {
                        context,
                        element: schema::TABLESPACE_NAME.name,
                    })?,
                    table: table.ok_or(ProtocolError::MissingElement {
                        context,
                        element: schema::TABLE_NAME.name,
                    })?,
                });
            }
            _ => return Err(super::unexpected(context, &event)),
        }
    }
}

/// Decode a billing request; its Begin event has already surfaced.
pub(crate) fn decode_billing<R: Read>(
    reader: &mut StreamingReader<R>,
    recoverer: &dyn Recoverer,
) -> Result<BillingRequest> {
    let context = schema::BILLING_REQUEST.name;
    let mut message_id = None;
    let mut cheques = Vec::new();
    loop {
        let event = super::next_event(reader)?;
        match event.kind {
            EventKind::Begin if event.ty.is(&schema::MESSAGE_ID) => {
                message_id = Some(reader.read_value::<UintFormat>()?);
            }
            EventKind::Begin if event.ty.is(&schema::CHEQUE_LIST) => loop {
                let event = super::next_event(reader)?;
                if event.is_begin(&schema::CHEQUE) {
                    cheques.push(decode_cheque(reader, recoverer)?);
                } else if event.is_end(&schema::CHEQUE_LIST) {
                    break;
                } else {
                    return Err(super::unexpected(schema::CHEQUE_LIST.name, &event));
                }
            },
            EventKind::End if event.ty.is(&schema::BILLING_REQUEST) => {
                return Ok(BillingRequest {
                    message_id: message_id.ok_or(ProtocolError::MissingElement {
                        context,
                        element: schema::MESSAGE_ID.name,
                    })?,
                    cheques,
                });
            }
            _ => return Err(super::unexpected(context, &event)),
        }
    }
}
