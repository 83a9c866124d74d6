//! Courier wire protocol.
//!
//! Defines the typed request/response events exchanged between clients and
//! the relay server, and the framing used to carry them over a transport
//! stream.
//!
//! ## Layout
//!
//! - [`payloads`] - payload structs for each event
//! - [`ClientRequest`] / [`ServerEvent`] - tagged event enums
//! - [`codec`] - fixed header + CBOR payload framing
//!
//! Every inbound payload has a fixed, validated field set; frames that fail
//! to decode are rejected before they reach any business logic.

pub mod codec;
pub mod payloads;

mod request;
mod response;

pub use codec::{CodecError, FrameHeader, FrameKind, HEADER_LEN, MAX_PAYLOAD};
pub use request::ClientRequest;
pub use response::ServerEvent;
