//! A minimal RTP header.
//!
//! The transports that feed this crate (ICE/DTLS/SRTP, out of scope here)
//! are assumed to have already depacketized the wire format; this is the
//! shape the relay core actually consumes.

/// An already-parsed RTP header.
///
/// `timestamp` and `sequence_number` are wrap-aware 32- and 16-bit counters
/// respectively; use [`crate::sequence`] to compare or unwrap them.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub timestamp: u32,
    pub sequence_number: u16,
    pub payload_type: u8,
    pub marker: bool,
    pub ssrc: u32,
}
