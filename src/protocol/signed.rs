//! Signed sub-element capture.
//!
//! An entry header or cheque is signed over exactly its own serialized
//! bytes, from just after its begin tag up to (not including) the signer
//! element. Both directions use the stream layer's capture scopes:
//!
//! - **write**: open a capture right after `begin()`, emit the data
//!   elements, close the capture, sign the digest, then emit signer and
//!   signature;
//! - **read**: open a capture right after the container's Begin event,
//!   consume the data elements, and close the capture upon seeing the
//!   signer element's Begin — whose header bytes are still pending and
//!   therefore excluded, reproducing the writer-side digest bit for bit.
//!
//! Re-emitting received data produces a fresh signature; the codec never
//! replays a stored one.

use crate::crypto::{Address, Hash256, Recoverer, Signature, Signer};
use crate::error::{ProtocolError, Result};
use crate::protocol::schema;
use crate::stream::format::{AddressFormat, SignatureFormat};
use crate::stream::reader::StreamingReader;
use crate::stream::writer::StreamingWriter;
use crate::core::registry::ElementDef;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use tracing::trace;

/// The verified signing envelope recovered from a decoded element.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Attestation {
    /// Declared signer address.
    pub signer: Address,
    /// The 65-byte recoverable signature as received.
    pub signature: Signature,
    /// Digest of the signed byte range.
    pub digest: Hash256,
}

/// Close the current capture, sign its digest, and emit the signed tail
/// (signer, signature, container end).
pub(crate) fn encode_signed_tail<W: Write>(
    writer: &mut StreamingWriter<W>,
    signer: &dyn Signer,
) -> Result<Attestation> {
    let digest = writer.end_capture()?;
    let signature = signer.sign(&digest)?;
    let address = signer.address();
    writer.write_value::<AddressFormat>(&schema::SIGNER, &address)?;
    writer.write_value::<SignatureFormat>(&schema::SIGNATURE, &signature)?;
    writer.end()?;
    trace!(signer = %address, digest = %digest, "signed element emitted");
    Ok(Attestation {
        signer: address,
        signature,
        digest,
    })
}

/// Consume the signed tail of `container` after its signer element's
/// Begin event has surfaced: finalize the capture, read signer and
/// signature, and verify the recovered address.
pub(crate) fn decode_signed_tail<R: Read>(
    reader: &mut StreamingReader<R>,
    recoverer: &dyn Recoverer,
    container: &'static ElementDef,
) -> Result<Attestation> {
    let digest = reader.end_capture()?;
    let declared = reader.read_value::<AddressFormat>()?;

    let event = super::next_event(reader)?;
    if !event.is_begin(&schema::SIGNATURE) {
        return Err(ProtocolError::UnexpectedElement {
            context: container.name,
            found: event.ty.describe(),
        });
    }
    let signature = reader.read_value::<SignatureFormat>()?;

    let event = super::next_event(reader)?;
    if !event.is_end(container) {
        return Err(ProtocolError::UnexpectedElement {
            context: container.name,
            found: event.ty.describe(),
        });
    }

    let recovered = recoverer.recover(&digest, &signature)?;
    if recovered != declared {
        return Err(ProtocolError::SignerMismatch {
            declared,
            recovered,
        });
    }
    trace!(signer = %declared, digest = %digest, "signed element verified");
    Ok(Attestation {
        signer: declared,
        signature,
        digest,
    })
}
