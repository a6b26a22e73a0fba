#![warn(rust_2018_idioms)]
#![allow(dead_code)]

//! Minimal already-parsed RTCP feedback shapes.
//!
//! The transport layer (SRTP/DTLS, out of scope here) is assumed to have
//! already decoded RTCP packets down to these shapes before they reach the
//! relay core: a picture-loss indication to forward verbatim, and a
//! transport-wide congestion control report whose packet-status chunks
//! have already been unpacked into a flat per-packet list.

pub mod packet;
pub mod payload_feedbacks;
pub mod transport_feedbacks;

pub use packet::RtcpPacket;
pub use payload_feedbacks::picture_loss_indication::PictureLossIndication;
pub use transport_feedbacks::transport_layer_cc::{TransportLayerCc, TwccEntry};
