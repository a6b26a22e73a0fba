//! End-to-end wiring tests for the relay orchestrator: an in-memory
//! channel-backed track standing in for a real RTP/RTCP transport.

use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{Mutex, mpsc};
use tokio::time::timeout;

use rtc_relay::{RelayConfig, RelayOrchestrator, Track};
use rtcp::{PictureLossIndication, RtcpPacket};
use rtp::Packet;
use rtp::header::Header;

const VP9_PAYLOAD_TYPE: u8 = 98;

struct ChannelTrack {
    media_rx: Mutex<mpsc::UnboundedReceiver<Packet>>,
    media_tx: mpsc::UnboundedSender<Packet>,
    feedback_rx: Mutex<mpsc::UnboundedReceiver<RtcpPacket>>,
    feedback_tx: mpsc::UnboundedSender<RtcpPacket>,
}

struct ChannelTrackEnds {
    track: ChannelTrack,
    media_in: mpsc::UnboundedSender<Packet>,
    media_out: mpsc::UnboundedReceiver<Packet>,
    feedback_in: mpsc::UnboundedSender<RtcpPacket>,
    feedback_out: mpsc::UnboundedReceiver<RtcpPacket>,
}

impl ChannelTrack {
    fn pair() -> ChannelTrackEnds {
        let (in_media_tx, in_media_rx) = mpsc::unbounded_channel();
        let (out_media_tx, out_media_rx) = mpsc::unbounded_channel();
        let (in_fb_tx, in_fb_rx) = mpsc::unbounded_channel();
        let (out_fb_tx, out_fb_rx) = mpsc::unbounded_channel();
        let track = ChannelTrack {
            media_rx: Mutex::new(in_media_rx),
            media_tx: out_media_tx,
            feedback_rx: Mutex::new(in_fb_rx),
            feedback_tx: out_fb_tx,
        };
        ChannelTrackEnds {
            track,
            media_in: in_media_tx,
            media_out: out_media_rx,
            feedback_in: in_fb_tx,
            feedback_out: out_fb_rx,
        }
    }
}

impl Track for ChannelTrack {
    async fn recv(&self) -> Option<Packet> {
        self.media_rx.lock().await.recv().await
    }

    async fn send(&self, pkt: Packet) {
        let _ = self.media_tx.send(pkt);
    }

    async fn read_feedback(&self) -> Option<RtcpPacket> {
        self.feedback_rx.lock().await.recv().await
    }

    async fn send_feedback(&self, pkt: RtcpPacket) {
        let _ = self.feedback_tx.send(pkt);
    }
}

fn vp9_packet(seq: u16, tid: u8) -> Packet {
    // L flag set, temporal-layer-id packed into the upper 3 bits of the
    // following layer-indices octet, no picture id.
    let payload = vec![0b0010_0000, tid << 5];
    Packet::new(
        Header {
            sequence_number: seq,
            payload_type: VP9_PAYLOAD_TYPE,
            ..Default::default()
        },
        Bytes::from(payload),
    )
}

#[tokio::test]
async fn base_layer_packets_flow_end_to_end() {
    let mut ingress = ChannelTrack::pair();
    let mut egress = ChannelTrack::pair();

    let mut orchestrator: RelayOrchestrator<ChannelTrack, ChannelTrack> =
        RelayOrchestrator::new(RelayConfig::default());
    orchestrator.bind_ingress(ingress.track);
    orchestrator.bind_egress(egress.track);

    ingress.media_in.send(vp9_packet(0, 0)).unwrap();

    let forwarded = timeout(Duration::from_secs(1), egress.media_out.recv())
        .await
        .expect("did not time out")
        .expect("channel open");
    assert_eq!(forwarded.header.sequence_number, 0);
}

#[tokio::test]
async fn picture_loss_indication_passes_through_to_ingress() {
    let mut ingress = ChannelTrack::pair();
    let egress = ChannelTrack::pair();

    let mut orchestrator: RelayOrchestrator<ChannelTrack, ChannelTrack> =
        RelayOrchestrator::new(RelayConfig::default());
    orchestrator.bind_ingress(ingress.track);
    orchestrator.bind_egress(egress.track);

    let pli = RtcpPacket::Psfb(PictureLossIndication {
        sender_ssrc: 1,
        media_ssrc: 2,
    });
    egress.feedback_in.send(pli.clone()).unwrap();

    let forwarded = timeout(Duration::from_secs(1), ingress.feedback_out.recv())
        .await
        .expect("did not time out")
        .expect("channel open");
    assert_eq!(forwarded, pli);
}

#[tokio::test]
async fn packets_sent_before_egress_is_bound_still_flow_once_it_is() {
    let mut ingress = ChannelTrack::pair();

    let mut orchestrator: RelayOrchestrator<ChannelTrack, ChannelTrack> =
        RelayOrchestrator::new(RelayConfig::default());
    orchestrator.bind_ingress(ingress.track);
    ingress.media_in.send(vp9_packet(0, 0)).unwrap();

    // Nothing drains the ingress queue yet: no task has started.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut egress = ChannelTrack::pair();
    orchestrator.bind_egress(egress.track);

    let forwarded = timeout(Duration::from_secs(1), egress.media_out.recv())
        .await
        .expect("did not time out")
        .expect("channel open");
    assert_eq!(forwarded.header.sequence_number, 0);
}
