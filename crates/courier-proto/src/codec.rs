//! Frame codec.
//!
//! Every message on the wire is a fixed 8-byte header followed by a CBOR
//! payload. The header is parsed zero-copy; the payload length is bounded
//! before any allocation happens, so a hostile peer cannot ask the server
//! to buffer an arbitrary amount of data.

use serde::{Serialize, de::DeserializeOwned};
use zerocopy::{
    FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned,
    little_endian::{U16, U32},
};

use crate::{ClientRequest, ServerEvent};

/// Frame magic, "CR" little-endian.
pub const MAGIC: u16 = 0x5243;

/// Current protocol version.
pub const VERSION: u8 = 1;

/// Size of the fixed frame header in bytes.
pub const HEADER_LEN: usize = 8;

/// Maximum payload size (media rides inside the CBOR payload).
pub const MAX_PAYLOAD: usize = 1 << 20;

/// Whether a frame carries a client request or a server event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameKind {
    /// Client-to-server request
    Request = 0,
    /// Server-to-client event
    Event = 1,
}

impl FrameKind {
    fn from_wire(value: u8) -> Result<Self, CodecError> {
        match value {
            0 => Ok(Self::Request),
            1 => Ok(Self::Event),
            other => Err(CodecError::UnknownKind(other)),
        }
    }
}

/// Fixed-size frame header.
///
/// Layout (little-endian): magic u16, version u8, kind u8, payload_len u32.
#[derive(Debug, Clone, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct FrameHeader {
    magic: U16,
    version: u8,
    kind: u8,
    payload_len: U32,
}

impl FrameHeader {
    /// Build a header for an outgoing frame.
    pub fn new(kind: FrameKind, payload_len: u32) -> Self {
        Self {
            magic: U16::new(MAGIC),
            version: VERSION,
            kind: kind as u8,
            payload_len: U32::new(payload_len),
        }
    }

    /// Parse and validate a header from the start of `bytes`.
    ///
    /// # Errors
    ///
    /// Returns `CodecError` if the input is shorter than [`HEADER_LEN`], the
    /// magic or version is wrong, the kind byte is unknown, or the declared
    /// payload exceeds [`MAX_PAYLOAD`].
    pub fn parse(bytes: &[u8]) -> Result<&Self, CodecError> {
        let header_bytes = bytes
            .get(..HEADER_LEN)
            .ok_or(CodecError::Truncated { need: HEADER_LEN, have: bytes.len() })?;
        let header = Self::ref_from_bytes(header_bytes)
            .map_err(|_| CodecError::Truncated { need: HEADER_LEN, have: bytes.len() })?;

        if header.magic.get() != MAGIC {
            return Err(CodecError::BadMagic(header.magic.get()));
        }
        if header.version != VERSION {
            return Err(CodecError::UnsupportedVersion(header.version));
        }
        FrameKind::from_wire(header.kind)?;
        if header.payload_len() > MAX_PAYLOAD {
            return Err(CodecError::PayloadTooLarge(header.payload_len()));
        }

        Ok(header)
    }

    /// Frame kind declared by this header.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::UnknownKind` if the kind byte is not a known
    /// [`FrameKind`]. Headers obtained through [`FrameHeader::parse`] are
    /// already validated, so this only fails for headers read some other
    /// way.
    pub fn kind(&self) -> Result<FrameKind, CodecError> {
        FrameKind::from_wire(self.kind)
    }

    /// Declared payload length in bytes.
    pub fn payload_len(&self) -> usize {
        self.payload_len.get() as usize
    }
}

/// Errors from frame encoding and decoding.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Input shorter than the structure being parsed
    #[error("truncated frame: need {need} bytes, have {have}")]
    Truncated {
        /// Bytes required
        need: usize,
        /// Bytes available
        have: usize,
    },

    /// Wrong frame magic
    #[error("bad frame magic: {0:#06x}")]
    BadMagic(u16),

    /// Protocol version this build does not speak
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(u8),

    /// Unknown frame kind byte
    #[error("unknown frame kind: {0}")]
    UnknownKind(u8),

    /// Declared payload exceeds `MAX_PAYLOAD`
    #[error("payload too large: {0} bytes")]
    PayloadTooLarge(usize),

    /// Frame kind does not match what the caller expected
    #[error("unexpected frame kind: expected {expected:?}, got {actual:?}")]
    KindMismatch {
        /// Kind the caller asked to decode
        expected: FrameKind,
        /// Kind declared by the header
        actual: FrameKind,
    },

    /// CBOR serialization failed
    #[error("encode failed: {0}")]
    Encode(String),

    /// CBOR deserialization failed
    #[error("decode failed: {0}")]
    Decode(String),
}

fn encode<T: Serialize>(kind: FrameKind, value: &T) -> Result<Vec<u8>, CodecError> {
    let mut payload = Vec::new();
    ciborium::ser::into_writer(value, &mut payload)
        .map_err(|e| CodecError::Encode(e.to_string()))?;

    if payload.len() > MAX_PAYLOAD {
        return Err(CodecError::PayloadTooLarge(payload.len()));
    }

    let header = FrameHeader::new(kind, payload.len() as u32);
    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.extend_from_slice(header.as_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

fn decode<T: DeserializeOwned>(kind: FrameKind, frame: &[u8]) -> Result<T, CodecError> {
    let header = FrameHeader::parse(frame)?;
    let actual = header.kind()?;
    if actual != kind {
        return Err(CodecError::KindMismatch { expected: kind, actual });
    }

    let need = HEADER_LEN + header.payload_len();
    let payload = frame
        .get(HEADER_LEN..need)
        .ok_or(CodecError::Truncated { need, have: frame.len() })?;

    ciborium::de::from_reader(payload).map_err(|e| CodecError::Decode(e.to_string()))
}

/// Encode a client request into a complete frame.
///
/// # Errors
///
/// Returns `CodecError` if CBOR encoding fails or the payload exceeds
/// [`MAX_PAYLOAD`].
pub fn encode_request(request: &ClientRequest) -> Result<Vec<u8>, CodecError> {
    encode(FrameKind::Request, request)
}

/// Decode a client request from a complete frame.
///
/// # Errors
///
/// Returns `CodecError` if the header is invalid, the frame is truncated,
/// or the payload is not a valid request.
pub fn decode_request(frame: &[u8]) -> Result<ClientRequest, CodecError> {
    decode(FrameKind::Request, frame)
}

/// Encode a server event into a complete frame.
///
/// # Errors
///
/// Returns `CodecError` if CBOR encoding fails or the payload exceeds
/// [`MAX_PAYLOAD`].
pub fn encode_event(event: &ServerEvent) -> Result<Vec<u8>, CodecError> {
    encode(FrameKind::Event, event)
}

/// Decode a server event from a complete frame.
///
/// # Errors
///
/// Returns `CodecError` if the header is invalid, the frame is truncated,
/// or the payload is not a valid event.
pub fn decode_event(frame: &[u8]) -> Result<ServerEvent, CodecError> {
    decode(FrameKind::Event, frame)
}

/// Decode a request payload that was read separately from its header.
///
/// Used by the server, which reads the fixed header first and then exactly
/// `payload_len` bytes from the stream.
///
/// # Errors
///
/// Returns `CodecError::Decode` if the payload is not a valid request.
pub fn decode_request_payload(payload: &[u8]) -> Result<ClientRequest, CodecError> {
    ciborium::de::from_reader(payload).map_err(|e| CodecError::Decode(e.to_string()))
}
