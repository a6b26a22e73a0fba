//! Wires the temporal-layer filter, bandwidth estimator and pacer into a
//! running relay session: one ingress track, one egress track, three
//! cooperating tasks.

use std::sync::Arc;

use tokio::sync::Mutex;

use rtcp::RtcpPacket;
use rtp::Packet;
use rtp::codec::vp9::Vp9Descriptor;

use crate::bwe::{Bwe, BweConfig};
use crate::clock::Clock;
use crate::filter::{FilterConfig, TemporalLayerFilter};
use crate::pacer::{Pacer, PacerConfig, PacerHandle};
use crate::twcc::SendHistory;

/// VP9 is the only payload type the filter and descriptor parser know how
/// to interpret; anything else rides through unfiltered media tracks this
/// relay doesn't otherwise model.
const VP9_PAYLOAD_TYPE: u8 = 98;

const SEND_HISTORY_SIZE: u16 = 1 << 15;

/// One bidirectional RTP/RTCP leg the relay reads from or writes to.
///
/// Methods take `&self` so a single track can be held by more than one
/// task (e.g. the relay task reads ingress while the feedback task also
/// writes to it) behind a shared `Arc`.
pub trait Track: Send + Sync + 'static {
    /// Receive the next media packet, or `None` once the track is closed.
    async fn recv(&self) -> Option<Packet>;

    /// Send a media packet.
    async fn send(&self, pkt: Packet);

    /// Receive the next feedback packet, or `None` once the track is closed.
    async fn read_feedback(&self) -> Option<RtcpPacket>;

    /// Send a feedback packet (used for PLI passthrough back to ingress).
    async fn send_feedback(&self, pkt: RtcpPacket);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RelayConfig {
    pub pacer: PacerConfig,
    pub filter: FilterConfig,
    pub bwe: BweConfig,
}

/// Owns the shared filter/estimator/pacer state for one relayed flow and
/// spawns its tasks once both legs are bound.
///
/// `bind_ingress`/`bind_egress` can be called in either order; the tasks
/// start only once both are present, mirroring the two independent
/// negotiations (recvonly/sendonly) a real session establishes.
pub struct RelayOrchestrator<In: Track, Out: Track> {
    ingress: Option<Arc<In>>,
    egress: Option<Arc<Out>>,
    pacer: Option<Pacer>,
    pacer_handle: PacerHandle,
    filter: Arc<Mutex<TemporalLayerFilter>>,
    bwe: Arc<Mutex<Bwe>>,
    send_history: Arc<Mutex<SendHistory>>,
    clock: Arc<Clock>,
    started: bool,
}

impl<In: Track, Out: Track> RelayOrchestrator<In, Out> {
    pub fn new(config: RelayConfig) -> Self {
        let pacer = Pacer::new(config.pacer);
        let pacer_handle = pacer.handle();
        Self {
            ingress: None,
            egress: None,
            pacer: Some(pacer),
            pacer_handle,
            filter: Arc::new(Mutex::new(TemporalLayerFilter::new(config.filter))),
            bwe: Arc::new(Mutex::new(Bwe::new(config.bwe))),
            send_history: Arc::new(Mutex::new(SendHistory::new(SEND_HISTORY_SIZE).unwrap())),
            clock: Arc::new(Clock::new()),
            started: false,
        }
    }

    pub fn bind_ingress(&mut self, track: In) {
        self.ingress = Some(Arc::new(track));
        self.maybe_start();
    }

    pub fn bind_egress(&mut self, track: Out) {
        self.egress = Some(Arc::new(track));
        self.maybe_start();
    }

    fn maybe_start(&mut self) {
        if self.started {
            return;
        }
        let (Some(ingress), Some(egress)) = (self.ingress.clone(), self.egress.clone()) else {
            return;
        };
        let Some(pacer) = self.pacer.take() else {
            return;
        };
        self.started = true;

        tokio::spawn(relay_task(
            ingress.clone(),
            self.filter.clone(),
            self.pacer_handle.clone(),
            self.clock.clone(),
        ));
        tokio::spawn(pacing_task(
            pacer,
            egress.clone(),
            self.send_history.clone(),
            self.clock.clone(),
        ));
        tokio::spawn(feedback_task(
            ingress,
            egress,
            self.bwe.clone(),
            self.filter.clone(),
            self.pacer_handle.clone(),
            self.send_history.clone(),
        ));
    }
}

async fn relay_task<In: Track>(
    ingress: Arc<In>,
    filter: Arc<Mutex<TemporalLayerFilter>>,
    pacer: PacerHandle,
    clock: Arc<Clock>,
) {
    loop {
        let Some(pkt) = ingress.recv().await else {
            log::debug!("relay task exiting: ingress closed");
            break;
        };
        if pkt.payload.is_empty() || pkt.header.payload_type != VP9_PAYLOAD_TYPE {
            continue;
        }

        let descriptor = Vp9Descriptor::parse_or_base_layer(&pkt.payload);
        let now_ms = clock.now_ms();
        let data_bytes = pkt.payload.len();

        let admitted = {
            let mut filter = filter.lock().await;
            filter.add_video_sample(0, descriptor.tid, data_bytes, now_ms)
        };
        if admitted {
            pacer.enqueue(pkt);
        }
    }
}

async fn pacing_task<Out: Track>(
    mut pacer: Pacer,
    egress: Arc<Out>,
    send_history: Arc<Mutex<SendHistory>>,
    clock: Arc<Clock>,
) {
    while let Some(pkt) = pacer.read_queue().await {
        let now_ms = clock.now_ms();
        {
            let mut history = send_history.lock().await;
            history.record(pkt.header.sequence_number, now_ms, pkt.payload.len());
        }
        egress.send(pkt).await;
    }
    log::debug!("pacing task exiting: pacer output closed");
}

async fn feedback_task<In: Track, Out: Track>(
    ingress: Arc<In>,
    egress: Arc<Out>,
    bwe: Arc<Mutex<Bwe>>,
    filter: Arc<Mutex<TemporalLayerFilter>>,
    pacer: PacerHandle,
    send_history: Arc<Mutex<SendHistory>>,
) {
    loop {
        let Some(pkt) = egress.read_feedback().await else {
            log::debug!("feedback task exiting: egress closed");
            break;
        };

        match pkt {
            RtcpPacket::Psfb(pli) => {
                ingress.send_feedback(RtcpPacket::Psfb(pli)).await;
            }
            RtcpPacket::Rtpfb(report) => {
                let results = {
                    let history = send_history.lock().await;
                    crate::twcc::correlate(&report, &history)
                };

                for result in results {
                    if !result.received {
                        continue;
                    }
                    let new_bitrate = {
                        let mut bwe = bwe.lock().await;
                        bwe.add(result.receive_ms, result.send_ms, result.payload_size)
                    };
                    if let Some(bitrate_bps) = new_bitrate {
                        filter.lock().await.update_available_bitrate(bitrate_bps);
                        pacer.update_bitrate(bitrate_bps);
                    }
                }
            }
            RtcpPacket::Other => {}
        }
    }
}
