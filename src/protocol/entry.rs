//! Entries: the payload vocabulary of modification and healing requests.
//!
//! An entry is a signed header, a field list, and an optional cheque
//! list. The header signature covers the header's own serialized bytes up
//! to the signer element; see [`crate::protocol::signed`].

use crate::core::registry::ElementDef;
use crate::crypto::{keccak256, Hash256, Recoverer, Signer};
use crate::error::{ProtocolError, Result};
use crate::protocol::cheque::{decode_cheque, encode_cheque, Cheque};
use crate::protocol::schema;
use crate::protocol::signed::{decode_signed_tail, encode_signed_tail, Attestation};
use crate::stream::event::EventKind;
use crate::stream::format::{HashFormat, RawFormat, UintFormat, Utf8Format};
use crate::stream::reader::StreamingReader;
use crate::stream::writer::StreamingWriter;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// The signed descriptor of one entry mutation.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct EntryHeader {
    pub tablespace: String,
    pub table: String,
    /// Mutation kind, e.g. insert/update/delete, carried as a raw numeric
    /// discriminant owned by the coordinator.
    pub entry_type: u64,
    /// Milliseconds since the epoch.
    pub timestamp: u64,
    pub entry_version: u64,
    pub network_id: u64,
    /// Hash of the entry's previous content; absent for inserts.
    pub old_hash: Option<Hash256>,
    /// Digest over the entry's field set; see [`fields_digest`].
    pub fields_hash: Hash256,
}

/// A field is either its content hash alone or a typed raw value.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub enum FieldValue {
    Hash(Hash256),
    Raw(Vec<u8>),
}

/// One typed field of an entry.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    /// Declared value type, interpreted by the schema layer, opaque here.
    pub type_name: String,
    pub value: FieldValue,
}

impl Field {
    /// The field's content hash: carried directly for hash-only fields,
    /// derived from the raw bytes otherwise.
    pub fn content_hash(&self) -> Hash256 {
        match &self.value {
            FieldValue::Hash(hash) => *hash,
            FieldValue::Raw(bytes) => keccak256(bytes),
        }
    }
}

/// Digest over a field set: the Keccak-256 of the concatenated per-field
/// content hashes, in order.
pub fn fields_digest(fields: &[Field]) -> Hash256 {
    let mut concat = Vec::with_capacity(fields.len() * Hash256::LEN);
    for field in fields {
        concat.extend_from_slice(field.content_hash().as_bytes());
    }
    keccak256(&concat)
}

/// One entry mutation: signed header, fields, optional cheques.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Entry {
    pub header: EntryHeader,
    /// Verified signing envelope; populated on decode, ignored on encode.
    pub attestation: Option<Attestation>,
    pub fields: Vec<Field>,
    pub cheques: Vec<Cheque>,
}

impl Entry {
    /// Assemble an entry, filling the header's field-set digest from the
    /// given fields.
    pub fn new(mut header: EntryHeader, fields: Vec<Field>, cheques: Vec<Cheque>) -> Self {
        header.fields_hash = fields_digest(&fields);
        Self {
            header,
            attestation: None,
            fields,
            cheques,
        }
    }
}

pub(crate) fn encode_entry<W: Write>(
    writer: &mut StreamingWriter<W>,
    entry: &Entry,
    signer: &dyn Signer,
) -> Result<()> {
    writer.begin(&schema::ENTRY)?;
    encode_entry_header(writer, &entry.header, signer)?;
    writer.begin(&schema::FIELD_LIST)?;
    for field in &entry.fields {
        encode_field(writer, field)?;
    }
    writer.end()?;
    if !entry.cheques.is_empty() {
        writer.begin(&schema::CHEQUE_LIST)?;
        for cheque in &entry.cheques {
            encode_cheque(writer, cheque, signer)?;
        }
        writer.end()?;
    }
    writer.end()
}

pub(crate) fn encode_entry_header<W: Write>(
    writer: &mut StreamingWriter<W>,
    header: &EntryHeader,
    signer: &dyn Signer,
) -> Result<()> {
    writer.begin(&schema::ENTRY_HEADER)?;
    writer.begin_capture()?;
    writer.write_value::<Utf8Format>(&schema::TABLESPACE_NAME, &header.tablespace)?;
    writer.write_value::<Utf8Format>(&schema::TABLE_NAME, &header.table)?;
    writer.write_value::<UintFormat>(&schema::ENTRY_TYPE, &header.entry_type)?;
    writer.write_value::<UintFormat>(&schema::ENTRY_TIMESTAMP, &header.timestamp)?;
    writer.write_value::<UintFormat>(&schema::ENTRY_VERSION, &header.entry_version)?;
    writer.write_value::<UintFormat>(&schema::NETWORK_ID, &header.network_id)?;
    if let Some(old_hash) = &header.old_hash {
        writer.write_value::<HashFormat>(&schema::OLD_HASH, old_hash)?;
    }
    writer.write_value::<HashFormat>(&schema::FIELDS_HASH, &header.fields_hash)?;
    encode_signed_tail(writer, signer)?;
    Ok(())
}

pub(crate) fn encode_field<W: Write>(
    writer: &mut StreamingWriter<W>,
    field: &Field,
) -> Result<()> {
    writer.begin(&schema::FIELD)?;
    writer.write_value::<Utf8Format>(&schema::FIELD_NAME, &field.name)?;
    writer.write_value::<Utf8Format>(&schema::FIELD_TYPE, &field.type_name)?;
    match &field.value {
        FieldValue::Hash(hash) => {
            writer.write_value::<HashFormat>(&schema::FIELD_HASH, hash)?;
        }
        FieldValue::Raw(bytes) => {
            writer.write_value::<RawFormat>(&schema::FIELD_VALUE, bytes)?;
        }
    }
    writer.end()
}

/// Decode one entry; the Entry container's Begin event has already
/// surfaced.
pub(crate) fn decode_entry<R: Read>(
    reader: &mut StreamingReader<R>,
    recoverer: &dyn Recoverer,
) -> Result<Entry> {
    let mut header = None;
    let mut fields = Vec::new();
    let mut cheques = Vec::new();

    loop {
        let event = super::next_event(reader)?;
        match event.kind {
            EventKind::Begin if event.ty.is(&schema::ENTRY_HEADER) => {
                header = Some(decode_entry_header(reader, recoverer)?);
            }
            EventKind::Begin if event.ty.is(&schema::FIELD_LIST) => {
                decode_field_list(reader, &schema::FIELD_LIST, &mut fields)?;
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
            EventKind::End if event.ty.is(&schema::ENTRY) => {
                let (header, attestation) = header.ok_or(ProtocolError::MissingElement {
                    context: schema::ENTRY.name,
                    element: schema::ENTRY_HEADER.name,
                })?;
                return Ok(Entry {
                    header,
                    attestation: Some(attestation),
                    fields,
                    cheques,
                });
            }
            _ => return Err(super::unexpected(schema::ENTRY.name, &event)),
        }
    }
}

/// Decode a signed entry header; its Begin event has already surfaced.
pub(crate) fn decode_entry_header<R: Read>(
    reader: &mut StreamingReader<R>,
    recoverer: &dyn Recoverer,
) -> Result<(EntryHeader, Attestation)> {
    reader.begin_capture()?;
    let mut tablespace = None;
    let mut table = None;
    let mut entry_type = None;
    let mut timestamp = None;
    let mut entry_version = None;
    let mut network_id = None;
    let mut old_hash = None;
    let mut fields_hash = None;

    loop {
        let event = super::next_event(reader)?;
        match event.kind {
            EventKind::Begin if event.ty.is(&schema::TABLESPACE_NAME) => {
                tablespace = Some(reader.read_value::<Utf8Format>()?);
            }
            EventKind::Begin if event.ty.is(&schema::TABLE_NAME) => {
                table = Some(reader.read_value::<Utf8Format>()?);
            }
            EventKind::Begin if event.ty.is(&schema::ENTRY_TYPE) => {
                entry_type = Some(reader.read_value::<UintFormat>()?);
            }
            EventKind::Begin if event.ty.is(&schema::ENTRY_TIMESTAMP) => {
                timestamp = Some(reader.read_value::<UintFormat>()?);
            }
            EventKind::Begin if event.ty.is(&schema::ENTRY_VERSION) => {
                entry_version = Some(reader.read_value::<UintFormat>()?);
            }
            EventKind::Begin if event.ty.is(&schema::NETWORK_ID) => {
                network_id = Some(reader.read_value::<UintFormat>()?);
            }
            EventKind::Begin if event.ty.is(&schema::OLD_HASH) => {
                old_hash = Some(reader.read_value::<HashFormat>()?);
            }
            EventKind::Begin if event.ty.is(&schema::FIELDS_HASH) => {
                fields_hash = Some(reader.read_value::<HashFormat>()?);
            }
            EventKind::Begin if event.ty.is(&schema::SIGNER) => {
                let attestation =
                    decode_signed_tail(reader, recoverer, &schema::ENTRY_HEADER)?;
                let header = EntryHeader {
                    tablespace: tablespace.ok_or(missing(schema::TABLESPACE_NAME.name))?,
                    table: table.ok_or(missing(schema::TABLE_NAME.name))?,
                    entry_type: entry_type.ok_or(missing(schema::ENTRY_TYPE.name))?,
                    timestamp: timestamp.ok_or(missing(schema::ENTRY_TIMESTAMP.name))?,
                    entry_version: entry_version.ok_or(missing(schema::ENTRY_VERSION.name))?,
                    network_id: network_id.ok_or(missing(schema::NETWORK_ID.name))?,
                    old_hash,
                    fields_hash: fields_hash.ok_or(missing(schema::FIELDS_HASH.name))?,
                };
                return Ok((header, attestation));
            }
            EventKind::End if event.ty.is(&schema::ENTRY_HEADER) => {
                return Err(missing(schema::SIGNATURE.name));
            }
            _ => return Err(super::unexpected(schema::ENTRY_HEADER.name, &event)),
        }
    }
}

/// Decode the fields of a field or computed list; the list container's
/// Begin event has already surfaced.
pub(crate) fn decode_field_list<R: Read>(
    reader: &mut StreamingReader<R>,
    list: &'static ElementDef,
    fields: &mut Vec<Field>,
) -> Result<()> {
    loop {
        let event = super::next_event(reader)?;
        if event.is_begin(&schema::FIELD) {
            fields.push(decode_field(reader)?);
        } else if event.is_end(list) {
            return Ok(());
        } else {
            return Err(super::unexpected(list.name, &event));
        }
    }
}

fn decode_field<R: Read>(reader: &mut StreamingReader<R>) -> Result<Field> {
    let mut name = None;
    let mut type_name = None;
    let mut value = None;

    loop {
        let event = super::next_event(reader)?;
        match event.kind {
            EventKind::Begin if event.ty.is(&schema::FIELD_NAME) => {
                name = Some(reader.read_value::<Utf8Format>()?);
            }
            EventKind::Begin if event.ty.is(&schema::FIELD_TYPE) => {
                type_name = Some(reader.read_value::<Utf8Format>()?);
            }
            EventKind::Begin if event.ty.is(&schema::FIELD_HASH) => {
                if value.is_some() {
                    return Err(super::unexpected(schema::FIELD.name, &event));
                }
                value = Some(FieldValue::Hash(reader.read_value::<HashFormat>()?));
            }
            EventKind::Begin if event.ty.is(&schema::FIELD_VALUE) => {
                if value.is_some() {
                    return Err(super::unexpected(schema::FIELD.name, &event));
                }
                value = Some(FieldValue::Raw(reader.read_value::<RawFormat>()?));
            }
            EventKind::End if event.ty.is(&schema::FIELD) => {
                return Ok(Field {
                    name: name.ok_or(ProtocolError::MissingElement {
                        context: schema::FIELD.name,
                        element: schema::FIELD_NAME.name,
                    })?,
                    type_name: type_name.ok_or(ProtocolError::MissingElement {
                        context: schema::FIELD.name,
                        element: schema::FIELD_TYPE.name,
                    })?,
                    value: value.ok_or(ProtocolError::MissingElement {
                        context: schema::FIELD.name,
                        element: schema::FIELD_VALUE.name,
                    })?,
                });
            }
            _ => return Err(super::unexpected(schema::FIELD.name, &event)),
        }
    }
}

fn missing(element: &'static str) -> ProtocolError {
    ProtocolError::MissingElement {
        context: schema::ENTRY_HEADER.name,
        element,
    }
}
