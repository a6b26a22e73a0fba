//! VP9 payload descriptor parsing.
//!
//! Ported from the reference `Vp9PayloadDescriptor.parse` with the offset
//! bookkeeping corrected: the original only ever advances the cursor by one
//! byte after the picture-ID field regardless of whether it was one or two
//! bytes wide.

use shared::error::{Error, Result};

// First octet bit masks (MSB first): I P L F B E V -
const FLAG_I: u8 = 0b1000_0000;
const FLAG_P: u8 = 0b0100_0000;
const FLAG_L: u8 = 0b0010_0000;
const FLAG_F: u8 = 0b0001_0000;
const FLAG_B: u8 = 0b0000_1000;
const FLAG_E: u8 = 0b0000_0100;
const FLAG_V: u8 = 0b0000_0010;

// Extended picture ID M bit (MSB of the picture-ID octet).
const PICTURE_ID_M: u8 = 0b1000_0000;
const PICTURE_ID_MASK_7BIT: u8 = 0b0111_1111;

const LAYER_SID_SHIFT: u8 = 1;
const LAYER_SID_MASK: u8 = 0x07;
const LAYER_TID_SHIFT: u8 = 5;
const LAYER_TID_MASK: u8 = 0x07;

/// A parsed VP9 payload descriptor prefix.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Vp9Descriptor {
    pub picture_id: Option<u16>,
    pub tid: u8,
    pub sid: Option<u8>,
    pub keyframe: bool,
}

impl Vp9Descriptor {
    /// Parse the VP9 descriptor prefix of an RTP payload.
    ///
    /// Returns `Err` on a truncated input; callers must then treat the
    /// packet as `tid = 0` so a malformed descriptor never drops the base
    /// layer (see [`Vp9Descriptor::base_layer_fallback`]).
    pub fn parse(data: &[u8]) -> Result<Self> {
        let first = *data.first().ok_or(Error::ErrShortPacket)?;

        let has_picture_id = first & FLAG_I != 0;
        let inter_predicted = first & FLAG_P != 0;
        let has_layer_indices = first & FLAG_L != 0;
        let start_of_frame = first & FLAG_B != 0;

        let mut offset = 1;
        let mut picture_id = None;
        if has_picture_id {
            let id_byte = *data.get(offset).ok_or(Error::ErrShortPacket)?;
            if id_byte & PICTURE_ID_M != 0 {
                let low = *data.get(offset + 1).ok_or(Error::ErrShortPacket)?;
                picture_id = Some((((id_byte & PICTURE_ID_MASK_7BIT) as u16) << 8) | low as u16);
                offset += 2;
            } else {
                picture_id = Some((id_byte & PICTURE_ID_MASK_7BIT) as u16);
                offset += 1;
            }
        }

        let mut sid = None;
        let mut tid = 0u8;
        if has_layer_indices {
            let layer_byte = *data.get(offset).ok_or(Error::ErrShortPacket)?;
            sid = Some((layer_byte >> LAYER_SID_SHIFT) & LAYER_SID_MASK);
            tid = (layer_byte >> LAYER_TID_SHIFT) & LAYER_TID_MASK;
        }

        let keyframe = !inter_predicted && start_of_frame && matches!(sid, None | Some(0));

        Ok(Self {
            picture_id,
            tid,
            sid,
            keyframe,
        })
    }

    /// The fail-closed fallback for a descriptor that failed to parse:
    /// base layer, not a keyframe indication either way.
    pub fn base_layer_fallback() -> Self {
        Self {
            picture_id: None,
            tid: 0,
            sid: None,
            keyframe: false,
        }
    }

    /// Parse, falling back to [`Vp9Descriptor::base_layer_fallback`] on any
    /// error so a malformed packet is always treated as base layer rather
    /// than dropped.
    pub fn parse_or_base_layer(data: &[u8]) -> Self {
        match Self::parse(data) {
            Ok(d) => d,
            Err(_) => {
                log::warn!("vp9: truncated descriptor, falling back to base layer");
                Self::base_layer_fallback()
            }
        }
    }
}
