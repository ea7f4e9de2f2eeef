//! Parley protocol
//!
//! JSON frames exchanged with the real-time chat transport, plus the REST
//! payloads the client consumes. The broker owns the protocol; these types
//! mirror its shapes (`type`-tagged objects, camelCase fields).
//!
//! # Components
//!
//! - [`ClientFrame`]: frames the client sends
//! - [`ServerFrame`]: frames the broker pushes
//! - [`rest`]: history and unread-count payloads
//! - [`encode`]/[`decode`]: size-checked JSON codec

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod errors;
mod frame;
pub mod rest;

pub use errors::{ProtocolError, Result};
pub use frame::{ClientFrame, MAX_FRAME_SIZE, ServerFrame, decode, decode_client, encode, encode_server};
