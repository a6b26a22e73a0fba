use bytes::Bytes;

use crate::header::Header;

/// An RTP packet: a header plus an owned payload.
///
/// The payload is opaque to everything except the codec-specific
/// descriptor parsers in [`crate::codec`] — the pacer and filter only ever
/// look at its length.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Packet {
    pub header: Header,
    pub payload: Bytes,
}

impl Packet {
    pub fn new(header: Header, payload: Bytes) -> Self {
        Self { header, payload }
    }
}
