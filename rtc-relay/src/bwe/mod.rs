//! Delay-based bandwidth estimator: approximates the send-side delay-based
//! controller of transport-wide congestion control (arrival grouping,
//! trendline filter, overuse detector, AIMD rate control).

mod arrival_group;
mod overuse_detector;
mod rate_control;
mod trendline;

pub use overuse_detector::OveruseState;
pub use rate_control::RateControlState;

use arrival_group::{ArrivalGroup, Grouper};
use overuse_detector::OveruseDetector;
use rate_control::RateControl;
use trendline::TrendlineEstimator;

use crate::rate_counter::RateCounter;

/// Window used to estimate the measured receive-side throughput fed into
/// the decrease branch of rate control.
const MEASURED_RATE_WINDOW_MS: i64 = 2000;

const DEFAULT_INITIAL_RATE_BPS: u64 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BweConfig {
    pub decrease_factor: f64,
    pub increase_factor: f64,
    pub response_interval_ms: i64,
    pub overuse_threshold_init_ms: f64,
    pub trendline_smoothing_coef: f64,
    pub initial_rate_bps: u64,
}

impl Default for BweConfig {
    fn default() -> Self {
        Self {
            decrease_factor: 0.85,
            increase_factor: 1.08,
            response_interval_ms: 100,
            overuse_threshold_init_ms: 12.5,
            trendline_smoothing_coef: 0.9,
            initial_rate_bps: DEFAULT_INITIAL_RATE_BPS,
        }
    }
}

impl BweConfig {
    pub fn with_decrease_factor(mut self, v: f64) -> Self {
        self.decrease_factor = v;
        self
    }

    pub fn with_increase_factor(mut self, v: f64) -> Self {
        self.increase_factor = v;
        self
    }

    pub fn with_response_interval_ms(mut self, v: i64) -> Self {
        self.response_interval_ms = v;
        self
    }
}

/// Delay-based bandwidth estimator.
///
/// Ingests correlated TWCC samples one at a time (already sorted by
/// `receive_ms` upstream) and yields an updated bitrate estimate at most
/// once per response interval.
pub struct Bwe {
    grouper: Grouper,
    prev_group: Option<ArrivalGroup>,
    trendline: TrendlineEstimator,
    overuse: OveruseDetector,
    rate_control: RateControl,
    measured_rate: RateCounter,
}

impl Bwe {
    pub fn new(config: BweConfig) -> Self {
        Self {
            grouper: Grouper::new(),
            prev_group: None,
            trendline: TrendlineEstimator::new(config.trendline_smoothing_coef),
            overuse: OveruseDetector::new(config.overuse_threshold_init_ms),
            rate_control: RateControl::new(
                config.initial_rate_bps,
                config.decrease_factor,
                config.increase_factor,
                config.response_interval_ms,
            ),
            measured_rate: RateCounter::new(MEASURED_RATE_WINDOW_MS),
        }
    }

    /// Feed one correlated TWCC sample. Returns `Some(bitrate_bps)` at most
    /// once per response interval; otherwise `None`.
    pub fn add(&mut self, receive_ms: i64, send_ms: i64, payload_size: usize) -> Option<u64> {
        self.measured_rate.add(payload_size as u64, receive_ms);

        let closed = self.grouper.add(send_ms, receive_ms, payload_size)?;
        let prev = self.prev_group.replace(closed)?;

        let send_delta_ms = (closed.last_send_ms - prev.last_send_ms) as f64;
        let recv_delta_ms = (closed.last_receive_ms - prev.last_receive_ms) as f64;
        let modified_trend = self.trendline.update(recv_delta_ms, send_delta_ms, closed.last_receive_ms as f64);
        let overuse_state = self.overuse.detect(modified_trend, closed.last_receive_ms);

        let measured_rate_bps = self.measured_rate.rate(receive_ms).unwrap_or(0);
        self.rate_control.update(overuse_state, measured_rate_bps, receive_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_estimate_until_two_groups_have_closed() {
        let mut bwe = Bwe::new(BweConfig::default());
        assert_eq!(bwe.add(0, 0, 100), None);
    }

    #[test]
    fn growing_delay_eventually_decreases_the_estimate() {
        let mut bwe = Bwe::new(BweConfig::default());
        let mut last_estimate = None;
        let mut send_ms: i64 = 0;
        let mut receive_ms: i64 = 0;
        for _ in 0..200 {
            if let Some(bitrate) = bwe.add(receive_ms, send_ms, 1200) {
                last_estimate = Some(bitrate);
            }
            send_ms += 10;
            receive_ms += 11; // 1ms of extra delay accrues each sample
        }
        let initial = BweConfig::default().initial_rate_bps;
        assert!(last_estimate.is_some());
        assert!((last_estimate.unwrap() as f64) < initial as f64 * 0.85 + 1.0);
    }
}
