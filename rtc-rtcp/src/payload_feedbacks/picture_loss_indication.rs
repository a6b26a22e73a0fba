/// A Picture Loss Indication (PSFB, fmt=1): a request for a keyframe.
///
/// Forwarded from the egress track to the ingress track unmodified; the
/// relay core never inspects its contents beyond routing.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PictureLossIndication {
    pub sender_ssrc: u32,
    pub media_ssrc: u32,
}
