//! # Protocol Layer
//!
//! The message vocabulary and the machinery that moves it: tag tables,
//! request/response models with their codecs, signed sub-element capture,
//! the channel handshake, and the per-exchange conversation object.
//!
//! ## Components
//! - **schema**: every context and tag code of the vocabulary
//! - **consistency**: agreement thresholds (quorum / count / percent)
//! - **entry**, **cheque**: the signed payload structures
//! - **function**: recursive filter/compute trees, coded iteratively
//! - **request**, **response**: the closed message sums and their codecs
//! - **signed**: capture-based signing and verification of sub-elements
//! - **handshake**: packet-header exchange and revision policy
//! - **conversation**: the session surface tying reader and writer together

pub mod cheque;
pub mod consistency;
pub mod conversation;
pub mod entry;
pub mod function;
pub mod handshake;
pub mod request;
pub mod response;
pub mod schema;
pub mod signed;

pub use cheque::Cheque;
pub use consistency::ConsistencyLevel;
pub use conversation::Conversation;
pub use entry::{fields_digest, Entry, EntryHeader, Field, FieldValue};
pub use function::{Argument, Function};
pub use request::{
    BillingRequest, Filter, HealingRequest, ModificationRequest, RecollectionRequest, Request,
    Retrieve, SchemaRequest,
};
pub use response::{
    BillingResponse, ErrorMessage, HealingResponse, ModificationResponse, OperationResult,
    RecollectionEntry, RecollectionResponse, RecollectionResult, Response, SchemaField,
    SchemaResponse,
};
pub use signed::Attestation;

use crate::error::{ProtocolError, Result};
use crate::stream::event::Event;
use crate::stream::reader::StreamingReader;
use serde::{Deserialize, Serialize};
use std::io::Read;

/// Any framed message: a request, a response, or an error report.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub enum Message {
    Request(Request),
    Response(Response),
    Error(ErrorMessage),
}

/// Pull the next event, treating end-of-stream inside a message as
/// truncation.
pub(crate) fn next_event<R: Read>(reader: &mut StreamingReader<R>) -> Result<Event> {
    reader
        .next()?
        .ok_or(ProtocolError::Truncated(
            crate::error::constants::ERR_TRUNCATED_HEADER,
        ))
}

/// Build the decode error for an element that has no business appearing
/// where it did.
pub(crate) fn unexpected(context: &'static str, event: &Event) -> ProtocolError {
    if event.ty.is_unknown() {
        ProtocolError::UnknownElement {
            context,
            code: event.ty.code(),
        }
    } else {
        ProtocolError::UnexpectedElement {
            context,
            found: event.ty.describe(),
        }
    }
}
