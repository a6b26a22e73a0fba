//! Multi-class prioritized variant of the pacer (C7): same leaky-bucket
//! budget arithmetic, but with frame-aware, priority-ordered admission and
//! mid-frame residual re-insertion under pressure.

use std::collections::{BTreeMap, VecDeque};

use rtp::Packet;
use rtp::sequence::Uint32Unwrapper;

use crate::pacer::PacerConfig;

/// Priority classes. Lower numeric value wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum MediaPriority {
    Rtx = 0,
    Audio = 1,
    Video = 3,
    Other = 4,
}

type FrameKey = (u8, i64);
type FrameQueue = BTreeMap<FrameKey, VecDeque<Packet>>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriorityPacerConfig {
    pub pacer: PacerConfig,
    /// Advisory eviction policy: beyond this many queued frames in the
    /// lowest-priority non-empty class, the oldest are dropped. `None`
    /// disables eviction.
    pub max_frames_per_class: Option<usize>,
}

impl Default for PriorityPacerConfig {
    fn default() -> Self {
        Self {
            pacer: PacerConfig::default(),
            max_frames_per_class: Some(10),
        }
    }
}

/// Same budget arithmetic as [`crate::pacer::Pacer`], driven externally by
/// [`PriorityPacer::run`] rather than an internal ticking task.
struct Budget {
    config: PacerConfig,
    target_bitrate_bps: u64,
    max_bytes_in_budget: i64,
    bytes_remaining: i64,
}

impl Budget {
    fn new(config: PacerConfig, initial_bitrate_bps: u64) -> Self {
        let mut budget = Self {
            config,
            target_bitrate_bps: 0,
            max_bytes_in_budget: 0,
            bytes_remaining: 0,
        };
        budget.update_bitrate(initial_bitrate_bps);
        budget
    }

    fn update_bitrate(&mut self, bitrate_bps: u64) {
        self.target_bitrate_bps = (bitrate_bps as f64 * self.config.headroom) as u64;
        self.max_bytes_in_budget =
            (self.target_bitrate_bps as f64 / 8.0 * self.config.bucket_seconds) as i64;
        self.bytes_remaining = self
            .bytes_remaining
            .clamp(-self.max_bytes_in_budget, self.max_bytes_in_budget);
    }

    fn add_budget(&mut self, delta_ms: i64) {
        let step = (self.target_bitrate_bps as f64 / 8.0 * delta_ms as f64 / 1000.0) as i64;
        self.bytes_remaining = if self.bytes_remaining < 0 {
            (self.bytes_remaining + step).min(self.max_bytes_in_budget)
        } else {
            step.min(self.max_bytes_in_budget)
        };
    }

    fn use_budget(&mut self, data_bytes: i64) {
        self.bytes_remaining = (self.bytes_remaining - data_bytes).max(-self.max_bytes_in_budget);
    }
}

const DEFAULT_INITIAL_BITRATE_BPS: u64 = 1_000_000;

/// A priority-class, frame-aware leaky-bucket pacer.
///
/// `input_queue`: `priority_class -> (layer, unwrapped_ts) -> packet list`.
pub struct PriorityPacer {
    config: PriorityPacerConfig,
    input_queue: BTreeMap<u8, FrameQueue>,
    output: VecDeque<Packet>,
    budget: Budget,
    timestamp_unwrapper: Uint32Unwrapper,
    last_ms: i64,
}

impl PriorityPacer {
    pub fn new(config: PriorityPacerConfig) -> Self {
        Self {
            budget: Budget::new(config.pacer, DEFAULT_INITIAL_BITRATE_BPS),
            config,
            input_queue: BTreeMap::new(),
            output: VecDeque::new(),
            timestamp_unwrapper: Uint32Unwrapper::new(),
            last_ms: 0,
        }
    }

    pub fn update_bitrate(&mut self, bitrate_bps: u64) {
        self.budget.update_bitrate(bitrate_bps);
    }

    /// Queue a packet under `media_priority`, with `layer` defaulting to 0
    /// (non-layered media: audio, RTX, other).
    pub fn enqueue(&mut self, pkt: Packet, media_priority: MediaPriority, layer: u8) {
        self.maybe_drop_old_frame();

        let ts = self.timestamp_unwrapper.unwrap(pkt.header.timestamp);
        let class = self.input_queue.entry(media_priority as u8).or_default();
        class.entry((layer, ts)).or_default().push_back(pkt);
    }

    /// Suspending dequeue from the output queue (drained by `run`).
    pub fn pop(&mut self) -> Option<Packet> {
        self.output.pop_front()
    }

    /// Drive the pacer forward to `now_ms`. The first call only records
    /// the reference time and emits nothing.
    pub fn run(&mut self, now_ms: i64) {
        if self.last_ms == 0 {
            self.last_ms = now_ms;
            return;
        }

        let delta_ms = now_ms - self.last_ms;
        self.last_ms = now_ms;
        self.budget.add_budget(delta_ms);

        let mut frame_key: Option<FrameKey> = None;
        let mut frame: VecDeque<Packet> = VecDeque::new();

        while self.budget.bytes_remaining > 0 {
            if frame.is_empty() {
                match self.pop_highest_priority_frame() {
                    Some((key, f)) => {
                        frame_key = Some(key);
                        frame = f;
                    }
                    None => break,
                }
            }
            let Some(pkt) = frame.pop_front() else { break };
            let len = pkt.payload.len() as i64;
            self.output.push_back(pkt);
            self.budget.use_budget(len);
        }

        if !frame.is_empty() && self.budget.bytes_remaining <= 0 {
            let (layer, ts) = frame_key.expect("a non-empty frame always carries its key");
            let raised_key = (layer.saturating_sub(1), ts);
            self.input_queue
                .entry(MediaPriority::Video as u8)
                .or_default()
                .insert(raised_key, frame);
        }
    }

    fn pop_highest_priority_frame(&mut self) -> Option<(FrameKey, VecDeque<Packet>)> {
        for class in self.input_queue.values_mut() {
            if let Some((&key, _)) = class.iter().next() {
                let frame = class.remove(&key).unwrap();
                return Some((key, frame));
            }
        }
        None
    }

    fn maybe_drop_old_frame(&mut self) {
        let Some(max_frames) = self.config.max_frames_per_class else {
            return;
        };

        let lowest_priority_class = self
            .input_queue
            .iter()
            .rev()
            .find(|(_, frames)| !frames.is_empty())
            .map(|(&class, _)| class);

        let Some(class) = lowest_priority_class else {
            return;
        };

        let frames = self.input_queue.get_mut(&class).unwrap();
        while frames.len() > max_frames {
            if let Some((&key, _)) = frames.iter().next() {
                frames.remove(&key);
                log::warn!("priority pacer dropping oldest frame in class {class}");
            }
        }
    }
}

impl Default for PriorityPacer {
    fn default() -> Self {
        Self::new(PriorityPacerConfig::default())
    }
}
