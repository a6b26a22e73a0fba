//! Trendline-slope delay gradient filter.
//!
//! Accumulates the inter-group delay gradient and fits a line through a
//! sliding window of the running accumulation, the same shape as the
//! trendline filter in WebRTC's delay-based controller.

use std::collections::VecDeque;

const WINDOW_SIZE: usize = 20;
const THRESHOLD_GAIN: f64 = 4.0;
const MIN_NUM_DELTAS: u32 = 60;

pub struct TrendlineEstimator {
    smoothing_coef: f64,
    num_of_deltas: u32,
    accumulated_delay_ms: f64,
    smoothed_delay_ms: f64,
    history: VecDeque<(f64, f64)>,
}

impl TrendlineEstimator {
    pub fn new(smoothing_coef: f64) -> Self {
        Self {
            smoothing_coef,
            num_of_deltas: 0,
            accumulated_delay_ms: 0.0,
            smoothed_delay_ms: 0.0,
            history: VecDeque::with_capacity(WINDOW_SIZE),
        }
    }

    /// Feed one inter-group delta and return the current modified trend,
    /// ready to compare against the overuse detector's threshold.
    pub fn update(&mut self, recv_delta_ms: f64, send_delta_ms: f64, arrival_time_ms: f64) -> f64 {
        let delay_gradient_ms = recv_delta_ms - send_delta_ms;
        self.num_of_deltas += 1;
        self.accumulated_delay_ms += delay_gradient_ms;
        self.smoothed_delay_ms = self.smoothing_coef * self.smoothed_delay_ms
            + (1.0 - self.smoothing_coef) * self.accumulated_delay_ms;

        self.history.push_back((arrival_time_ms, self.smoothed_delay_ms));
        if self.history.len() > WINDOW_SIZE {
            self.history.pop_front();
        }

        let trend = if self.history.len() == WINDOW_SIZE {
            self.linear_slope()
        } else {
            0.0
        };

        trend * self.num_of_deltas.min(MIN_NUM_DELTAS) as f64 * THRESHOLD_GAIN
    }

    /// Least-squares slope of `smoothed_delay_ms` over `arrival_time_ms`.
    fn linear_slope(&self) -> f64 {
        let n = self.history.len() as f64;
        let mean_x: f64 = self.history.iter().map(|(x, _)| x).sum::<f64>() / n;
        let mean_y: f64 = self.history.iter().map(|(_, y)| y).sum::<f64>() / n;

        let mut numerator = 0.0;
        let mut denominator = 0.0;
        for (x, y) in &self.history {
            numerator += (x - mean_x) * (y - mean_y);
            denominator += (x - mean_x) * (x - mean_x);
        }

        if denominator.abs() < f64::EPSILON {
            0.0
        } else {
            numerator / denominator
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_delay_stays_near_zero() {
        let mut est = TrendlineEstimator::new(0.9);
        let mut last = 0.0;
        for i in 0..40 {
            last = est.update(10.0, 10.0, i as f64 * 10.0);
        }
        assert!(last.abs() < 1.0);
    }

    #[test]
    fn growing_delay_produces_positive_trend() {
        let mut est = TrendlineEstimator::new(0.9);
        let mut last = 0.0;
        for i in 0..60 {
            // Each group's receive delta outpaces its send delta by a
            // steadily growing amount, modeling a congesting link.
            last = est.update(10.0 + i as f64, 10.0, i as f64 * 10.0);
        }
        assert!(last > 0.0);
    }
}
