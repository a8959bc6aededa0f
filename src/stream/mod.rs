//! # Streaming Element Layer
//!
//! Pull-based reading and staged writing of the tagged-element format.
//!
//! A stream is a flat sequence of events: container begin/end pairs and
//! terminal values. The reader maintains an explicit stack of open
//! containers with remaining-byte accounting; the writer stages each
//! container in a buffer so its size prefix can be measured before
//! emission. Both sides support capture scopes that accumulate every
//! physically transferred byte into a Keccak-256 digest, which is how
//! hashes and signatures are computed over exactly the serialized bytes
//! of a sub-element.
//!
//! ## Components
//! - **Event**: the begin/end atom exchanged with message codecs
//! - **Format**: terminal value encodings (integers, strings, digests, …)
//! - **Reader**: `StreamingReader`, the event source
//! - **Writer**: `StreamingWriter`, the event sink

pub mod event;
pub mod format;
pub mod reader;
pub mod writer;

pub use event::{Event, EventKind};
pub use reader::StreamingReader;
pub use writer::StreamingWriter;
