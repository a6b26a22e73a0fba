use crate::payload_feedbacks::picture_loss_indication::PictureLossIndication;
use crate::transport_feedbacks::transport_layer_cc::TransportLayerCc;

/// RTCP feedback codepoint numbers this crate recognizes.
pub const FMT_PSFB_PLI: u8 = 1;
pub const FMT_RTPFB_TWCC: u8 = 15;

/// The subset of RTCP packet types the relay core reacts to.
///
/// Any RTCP packet type not listed here is represented by `Other` and is
/// neither forwarded nor consumed — only PLI passthrough and TWCC
/// consumption are specified.
#[derive(Debug, Clone, PartialEq)]
pub enum RtcpPacket {
    Psfb(PictureLossIndication),
    Rtpfb(TransportLayerCc),
    Other,
}
