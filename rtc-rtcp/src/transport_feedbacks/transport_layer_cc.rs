//! Transport-Wide Congestion Control feedback (RTPFB, fmt=15).
//!
//! <https://datatracker.ietf.org/doc/html/draft-holmer-rmcat-transport-wide-cc-extensions-01>
//!
//! Real TWCC feedback packs per-packet status into run-length/status-vector
//! chunks plus a parallel delta array; decoding that wire format is out of
//! scope for this crate (the transport layer already did it). What arrives
//! here is the flattened per-packet list: one entry per reported transport
//! sequence number, in send order, with a receive delta already extracted
//! from its chunk.
pub const TICK_MICROS: i64 = 250;

/// One packet-status-chunk entry, still keyed by the local clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TwccEntry {
    pub seq: u16,
    pub received: bool,
    /// Arrival delta relative to the previous *received* entry, in
    /// 250-microsecond ticks, per the wire format's `RecvDelta`. `None`
    /// when `received` is false.
    pub remote_arrival_delta_ticks: Option<i64>,
}

/// A decoded TWCC feedback report (RTPFB, fmt=15).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportLayerCc {
    pub sender_ssrc: u32,
    pub media_ssrc: u32,
    /// The remote clock's reference time for the first entry, in
    /// milliseconds; later entries' absolute arrival time is reconstructed
    /// by accumulating `remote_arrival_delta_ticks` from here.
    pub base_receive_time_ms: i64,
    pub entries: Vec<TwccEntry>,
}
