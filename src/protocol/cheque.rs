//! Cheques: signed micro-payment records attached to entries and billing
//! exchanges.

use crate::crypto::{Address, Recoverer, Signer};
use crate::error::{ProtocolError, Result};
use crate::protocol::schema;
use crate::protocol::signed::{decode_signed_tail, encode_signed_tail, Attestation};
use crate::stream::format::{AddressFormat, SessionFormat, UintFormat, Utf8Format};
use crate::stream::event::EventKind;
use crate::stream::reader::StreamingReader;
use crate::stream::writer::StreamingWriter;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// A signed micro-payment record.
///
/// Network, tablespace, and table are optional: a cheque attached to an
/// entry inherits them from its surroundings, while a standalone billing
/// cheque pins them explicitly.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Cheque {
    /// Billing session identifier.
    pub session: [u8; 16],
    /// Sequence number within the session.
    pub number: u64,
    /// Issue timestamp, milliseconds since the epoch.
    pub timestamp: u64,
    pub amount: u64,
    pub network_id: Option<u64>,
    pub tablespace: Option<String>,
    pub table: Option<String>,
    /// Receipt addresses acknowledging the payment.
    pub receipts: Vec<Address>,
    /// Verified signing envelope; populated on decode, ignored on encode
    /// (re-emission signs afresh).
    pub attestation: Option<Attestation>,
}

pub(crate) fn encode_cheque<W: Write>(
    writer: &mut StreamingWriter<W>,
    cheque: &Cheque,
    signer: &dyn Signer,
) -> Result<()> {
    writer.begin(&schema::CHEQUE)?;
    writer.begin_capture()?;
    writer.write_value::<SessionFormat>(&schema::CHEQUE_SESSION, &cheque.session)?;
    writer.write_value::<UintFormat>(&schema::CHEQUE_NUMBER, &cheque.number)?;
    writer.write_value::<UintFormat>(&schema::CHEQUE_TIMESTAMP, &cheque.timestamp)?;
    writer.write_value::<UintFormat>(&schema::CHEQUE_AMOUNT, &cheque.amount)?;
    if let Some(network_id) = cheque.network_id {
        writer.write_value::<UintFormat>(&schema::CHEQUE_NETWORK_ID, &network_id)?;
    }
    if let Some(tablespace) = &cheque.tablespace {
        writer.write_value::<Utf8Format>(&schema::CHEQUE_TABLESPACE, tablespace)?;
    }
    if let Some(table) = &cheque.table {
        writer.write_value::<Utf8Format>(&schema::CHEQUE_TABLE, table)?;
    }
    if !cheque.receipts.is_empty() {
        writer.begin(&schema::ADDRESS_LIST)?;
        for receipt in &cheque.receipts {
            writer.write_value::<AddressFormat>(&schema::ADDRESS, receipt)?;
        }
        writer.end()?;
    }
    encode_signed_tail(writer, signer)?;
    Ok(())
}

/// Decode one cheque; the Cheque container's Begin event has already
/// surfaced.
pub(crate) fn decode_cheque<R: Read>(
    reader: &mut StreamingReader<R>,
    recoverer: &dyn Recoverer,
) -> Result<Cheque> {
    reader.begin_capture()?;
    let mut session = None;
    let mut number = None;
    let mut timestamp = None;
    let mut amount = None;
    let mut network_id = None;
    let mut tablespace = None;
    let mut table = None;
    let mut receipts = Vec::new();

    loop {
        let event = super::next_event(reader)?;
        match event.kind {
            EventKind::Begin if event.ty.is(&schema::CHEQUE_SESSION) => {
                session = Some(reader.read_value::<SessionFormat>()?);
            }
            EventKind::Begin if event.ty.is(&schema::CHEQUE_NUMBER) => {
                number = Some(reader.read_value::<UintFormat>()?);
            }
            EventKind::Begin if event.ty.is(&schema::CHEQUE_TIMESTAMP) => {
                timestamp = Some(reader.read_value::<UintFormat>()?);
            }
            EventKind::Begin if event.ty.is(&schema::CHEQUE_AMOUNT) => {
                amount = Some(reader.read_value::<UintFormat>()?);
            }
            EventKind::Begin if event.ty.is(&schema::CHEQUE_NETWORK_ID) => {
                network_id = Some(reader.read_value::<UintFormat>()?);
            }
            EventKind::Begin if event.ty.is(&schema::CHEQUE_TABLESPACE) => {
                tablespace = Some(reader.read_value::<Utf8Format>()?);
            }
            EventKind::Begin if event.ty.is(&schema::CHEQUE_TABLE) => {
                table = Some(reader.read_value::<Utf8Format>()?);
            }
            EventKind::Begin if event.ty.is(&schema::ADDRESS_LIST) => loop {
                let event = super::next_event(reader)?;
                if event.is_begin(&schema::ADDRESS) {
                    receipts.push(reader.read_value::<AddressFormat>()?);
                } else if event.is_end(&schema::ADDRESS_LIST) {
                    break;
                } else {
                    return Err(super::unexpected(schema::ADDRESS_LIST.name, &event));
                }
            },
            EventKind::Begin if event.ty.is(&schema::SIGNER) => {
                let attestation = decode_signed_tail(reader, recoverer, &schema::CHEQUE)?;
                return Ok(Cheque {
                    session: session.ok_or(missing(schema::CHEQUE_SESSION.name))?,
                    number: number.ok_or(missing(schema::CHEQUE_NUMBER.name))?,
                    timestamp: timestamp.ok_or(missing(schema::CHEQUE_TIMESTAMP.name))?,
                    amount: amount.ok_or(missing(schema::CHEQUE_AMOUNT.name))?,
                    network_id,
                    tablespace,
                    table,
                    receipts,
                    attestation: Some(attestation),
                });
            }
            EventKind::End if event.ty.is(&schema::CHEQUE) => {
                return Err(missing(schema::SIGNATURE.name));
            }
            _ => return Err(super::unexpected(schema::CHEQUE.name, &event)),
        }
    }
}

fn missing(element: &'static str) -> ProtocolError {
    ProtocolError::MissingElement {
        context: schema::CHEQUE.name,
        element,
    }
}
