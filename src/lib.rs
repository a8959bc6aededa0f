//! # meshdb-protocol
//!
//! Wire-protocol codec core for the MeshDB distributed database.
//!
//! This crate turns typed, signed, hierarchical database messages —
//! modification, recollection, healing, schema, and billing exchanges —
//! into a self-framed binary stream and back. It owns the packet framing
//! (magic number, checksum, version), the tagged-element binary format
//! with context-dependent tag resolution, the streaming reader/writer
//! with byte-level capture for hashing and signing sub-ranges, and the
//! message-type hierarchy built on top.
//!
//! It deliberately does *not* own sockets, threads, persistence, or the
//! elliptic-curve primitive: transports feed it byte streams, and signing
//! is injected through the [`crypto::Signer`] / [`crypto::Recoverer`]
//! capability traits.
//!
//! ## Layers
//! - [`core`]: varlen encodings, tag codes, versions, packet header, tag
//!   registry
//! - [`stream`]: the pull-based event reader, the staged writer, value
//!   formats, capture scopes
//! - [`protocol`]: the message vocabulary, signed payloads, handshake,
//!   and the [`protocol::Conversation`] session surface
//! - [`crypto`]: digests and the external signing boundary
//!
//! ## Example
//! ```rust,no_run
//! use meshdb_protocol::config::{CodecConfig, PROTOCOL_VERSION};
//! use meshdb_protocol::crypto::testing::MockRecovery;
//! use meshdb_protocol::protocol::{Conversation, Message};
//! use std::net::TcpStream;
//!
//! fn serve(stream: TcpStream) -> meshdb_protocol::error::Result<()> {
//!     let source = stream.try_clone()?;
//!     let (mut conversation, _remote) =
//!         Conversation::accept(source, stream, CodecConfig::default(), PROTOCOL_VERSION)?;
//!     while let Some(message) = conversation.receive(&MockRecovery)? {
//!         match message {
//!             Message::Request(_request) => { /* dispatch to the coordinator */ }
//!             Message::Response(_) | Message::Error(_) => break,
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Concurrency
//! A conversation is strictly single-threaded and pull-based. Run one per
//! accepted channel; the only shared state is the immutable tag registry,
//! which is safe for unsynchronized concurrent reads.

pub mod config;
pub mod core;
pub mod crypto;
pub mod error;
pub mod protocol;
pub mod stream;

pub use config::CodecConfig;
pub use error::{ProtocolError, Result};

pub use crate::core::version::{Revision, Version};
pub use crate::protocol::{Conversation, Message, Request, Response};
