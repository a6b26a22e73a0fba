//! VP9 RTP payload descriptor.
//!
//! <https://datatracker.ietf.org/doc/html/draft-ietf-payload-vp9>
//!
//! Only the prefix needed to identify the temporal layer of a packet is
//! parsed; the rest of the descriptor (scalability structure, reference
//! indices) is out of scope.

mod descriptor;

pub use descriptor::Vp9Descriptor;
