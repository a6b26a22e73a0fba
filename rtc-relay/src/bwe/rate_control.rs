//! AIMD rate-control state machine driven by the overuse detector.

use super::overuse_detector::OveruseState;

/// A packet's worth of payload used for the additive-increase step, in
/// bytes. No exact MTU is specified upstream; a typical RTP packet size is
/// used.
const PACKET_SIZE_BYTES: f64 = 1200.0;

/// How close the current rate must climb back to the last decrease point,
/// as a fraction of it, before increase switches from multiplicative to
/// additive.
const NEAR_CONGESTION_POINT_RATIO: f64 = 0.97;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateControlState {
    Hold,
    Increase,
    Decrease,
}

pub struct RateControl {
    state: RateControlState,
    current_rate_bps: u64,
    last_decrease_rate_bps: Option<u64>,
    decrease_factor: f64,
    increase_factor: f64,
    response_interval_ms: i64,
    last_update_ms: Option<i64>,
}

impl RateControl {
    pub fn new(
        initial_rate_bps: u64,
        decrease_factor: f64,
        increase_factor: f64,
        response_interval_ms: i64,
    ) -> Self {
        Self {
            state: RateControlState::Hold,
            current_rate_bps: initial_rate_bps,
            last_decrease_rate_bps: None,
            decrease_factor,
            increase_factor,
            response_interval_ms,
            last_update_ms: None,
        }
    }

    pub fn state(&self) -> RateControlState {
        self.state
    }

    pub fn current_rate_bps(&self) -> u64 {
        self.current_rate_bps
    }

    /// Apply one overuse-detector verdict, rate-limited to at most one
    /// output per response interval. Returns the new estimate only on the
    /// calls that actually update it.
    pub fn update(
        &mut self,
        overuse_state: OveruseState,
        measured_rate_bps: u64,
        now_ms: i64,
    ) -> Option<u64> {
        if let Some(last) = self.last_update_ms
            && now_ms - last < self.response_interval_ms
        {
            return None;
        }
        self.last_update_ms = Some(now_ms);

        match overuse_state {
            OveruseState::OverUsing => {
                let decreased = (measured_rate_bps as f64 * self.decrease_factor) as u64;
                if decreased < self.current_rate_bps {
                    self.last_decrease_rate_bps = Some(self.current_rate_bps);
                    self.current_rate_bps = decreased;
                }
                self.state = RateControlState::Decrease;
            }
            OveruseState::UnderUsing => {
                self.state = RateControlState::Hold;
            }
            OveruseState::Normal | OveruseState::Hold => {
                let near_congestion_point = self
                    .last_decrease_rate_bps
                    .is_some_and(|r| self.current_rate_bps as f64 >= r as f64 * NEAR_CONGESTION_POINT_RATIO);

                if near_congestion_point {
                    let half_packet_bits = PACKET_SIZE_BYTES / 2.0 * 8.0;
                    let added = half_packet_bits * 1000.0 / self.response_interval_ms as f64;
                    self.current_rate_bps += added as u64;
                } else {
                    self.current_rate_bps = (self.current_rate_bps as f64 * self.increase_factor) as u64;
                }
                self.state = RateControlState::Increase;
            }
        }

        Some(self.current_rate_bps)
    }
}
