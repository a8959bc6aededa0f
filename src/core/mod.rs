//! # Core Wire Primitives
//!
//! Low-level building blocks of the binary format: variable-length
//! encodings, tag codes, protocol versions, packet framing, and the
//! element-type registry.
//!
//! ## Components
//! - **Varlen**: self-describing variable-length sizes and code widths
//! - **Tag**: opaque tag-code identifiers with the low-bit structural convention
//! - **Version**: protocol version triples and revision comparison
//! - **Packet**: the fixed packet header (magic bytes, CRC32, version)
//! - **Registry**: the context DAG mapping tag codes to element descriptors
//!
//! ## Wire Format
//! ```text
//! [Magic(4)] [CRC32(4)] [Reserved(2)] [Major(2)] [Minor(2)] [Maintenance(2)]
//! [Code(1..8)] [Size(1..9)] [Payload(Size)]   -- repeated, nested
//! ```
//!
//! ## Security
//! - Size prefixes are validated against a configurable limit before allocation
//! - Magic bytes prevent accidental misinterpretation of foreign streams

pub mod packet;
pub mod registry;
pub mod tag;
pub mod varlen;
pub mod version;
