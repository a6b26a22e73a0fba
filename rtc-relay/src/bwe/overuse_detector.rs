//! Overuse detector: classifies the delay trend against an adaptive
//! threshold and debounces the "overusing" verdict over a short window.

/// Link delay classification driving the rate-control state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OveruseState {
    /// Not enough history yet to classify.
    Hold,
    Normal,
    OverUsing,
    UnderUsing,
}

const K_UP: f64 = 0.01;
const K_DOWN: f64 = 0.00018;
const MAX_TIME_DELTA_MS: f64 = 100.0;
const OVERUSE_TIME_THRESHOLD_MS: f64 = 10.0;

pub struct OveruseDetector {
    threshold_ms: f64,
    last_update_ms: Option<i64>,
    prev_trend: f64,
    time_over_using_ms: f64,
    overuse_count: u32,
}

impl OveruseDetector {
    pub fn new(initial_threshold_ms: f64) -> Self {
        Self {
            threshold_ms: initial_threshold_ms,
            last_update_ms: None,
            prev_trend: 0.0,
            time_over_using_ms: 0.0,
            overuse_count: 0,
        }
    }

    pub fn detect(&mut self, modified_trend: f64, now_ms: i64) -> OveruseState {
        let time_delta_ms = self
            .last_update_ms
            .map(|last| (now_ms - last) as f64)
            .unwrap_or(0.0);
        self.last_update_ms = Some(now_ms);

        let state = if modified_trend > self.threshold_ms {
            self.time_over_using_ms += time_delta_ms;
            self.overuse_count += 1;
            if self.time_over_using_ms > OVERUSE_TIME_THRESHOLD_MS
                && self.overuse_count > 1
                && modified_trend >= self.prev_trend
            {
                OveruseState::OverUsing
            } else {
                OveruseState::Normal
            }
        } else if modified_trend < -self.threshold_ms {
            self.time_over_using_ms = 0.0;
            self.overuse_count = 0;
            OveruseState::UnderUsing
        } else {
            self.time_over_using_ms = 0.0;
            self.overuse_count = 0;
            OveruseState::Normal
        };

        self.update_threshold(modified_trend, time_delta_ms);
        self.prev_trend = modified_trend;
        state
    }

    fn update_threshold(&mut self, modified_trend: f64, time_delta_ms: f64) {
        if time_delta_ms <= 0.0 {
            return;
        }
        let time_delta_ms = time_delta_ms.min(MAX_TIME_DELTA_MS);
        let k = if modified_trend.abs() < self.threshold_ms {
            K_DOWN
        } else {
            K_UP
        };
        self.threshold_ms += time_delta_ms * k * (modified_trend.abs() - self.threshold_ms);
        self.threshold_ms = self.threshold_ms.clamp(6.0, 600.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sustained_positive_trend_eventually_overuses() {
        let mut detector = OveruseDetector::new(12.5);
        let mut last = OveruseState::Hold;
        for i in 0..20i64 {
            last = detector.detect(50.0, i * 10);
        }
        assert_eq!(last, OveruseState::OverUsing);
    }

    #[test]
    fn negative_trend_is_underusing() {
        let mut detector = OveruseDetector::new(12.5);
        let state = detector.detect(-50.0, 10);
        assert_eq!(state, OveruseState::UnderUsing);
    }

    #[test]
    fn small_trend_is_normal() {
        let mut detector = OveruseDetector::new(12.5);
        let state = detector.detect(1.0, 10);
        assert_eq!(state, OveruseState::Normal);
    }
}
