//! Temporal-layer admission filter: decides, per VP9 packet, whether a
//! sample is forwarded downstream.

use std::collections::BTreeMap;

use crate::rate_counter::RateCounter;

/// Fixed divisor applied to the raw available-bitrate estimate before any
/// admission decision, independent of the constructor's usage coefficients.
const AVAILABLE_BANDWIDTH_USAGE: f64 = 0.98;

const DEFAULT_FRAME_SIZE_KB: f64 = 5.0;
const LAYERS_PRINT_INTERVAL_MS: i64 = 1000;

const TX_RATE_WINDOW_MS: i64 = 2000;
const SHORT_TX_RATE_WINDOW_MS: i64 = 500;
const OTHER_RATE_WINDOW_MS: i64 = 2000;

/// Per-`(flow_id, tid)` observed rate, discovered lazily and never removed.
pub struct VideoTemporalLayerInfo {
    pub flow_id: u32,
    pub temporal_layer: u8,
    pub rate: RateCounter,
}

impl VideoTemporalLayerInfo {
    fn new(flow_id: u32, temporal_layer: u8) -> Self {
        Self {
            flow_id,
            temporal_layer,
            rate: RateCounter::default(),
        }
    }

    fn trace_line(&self, now_ms: i64) -> String {
        format!(
            "LayerInfo(flow={}, layer={}, rate={:?})",
            self.flow_id,
            self.temporal_layer,
            self.rate.rate(now_ms)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterConfig {
    pub usage_coef: f64,
    pub burst_usage_coef: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            usage_coef: AVAILABLE_BANDWIDTH_USAGE,
            burst_usage_coef: 1.10,
        }
    }
}

impl FilterConfig {
    pub fn with_usage_coef(mut self, v: f64) -> Self {
        self.usage_coef = v;
        self
    }

    pub fn with_burst_usage_coef(mut self, v: f64) -> Self {
        self.burst_usage_coef = v;
        self
    }
}

pub struct TemporalLayerFilter {
    layers: BTreeMap<(u32, u8), VideoTemporalLayerInfo>,
    tx_rate: RateCounter,
    short_tx_rate: RateCounter,
    other_rate: RateCounter,
    available_bitrate: Option<u64>,
    last_print_ms: Option<i64>,
    usage_coef: f64,
    burst_usage_coef: f64,
}

impl TemporalLayerFilter {
    pub fn new(config: FilterConfig) -> Self {
        Self {
            layers: BTreeMap::new(),
            tx_rate: RateCounter::new(TX_RATE_WINDOW_MS),
            short_tx_rate: RateCounter::new(SHORT_TX_RATE_WINDOW_MS),
            other_rate: RateCounter::new(OTHER_RATE_WINDOW_MS),
            available_bitrate: None,
            last_print_ms: None,
            usage_coef: config.usage_coef,
            burst_usage_coef: config.burst_usage_coef,
        }
    }

    pub fn update_available_bitrate(&mut self, bitrate_bps: u64) {
        self.available_bitrate = Some(bitrate_bps);
    }

    pub fn add_other_sample(&mut self, data_bytes: usize, now_ms: i64) {
        self.print_layers(now_ms);
        self.other_rate.add(data_bytes as u64, now_ms);
        self.tx_rate.add(data_bytes as u64, now_ms);
        self.short_tx_rate.add(data_bytes as u64, now_ms);
    }

    /// Decide whether a video sample on `(flow_id, layer)` is admitted.
    /// Base layer (`layer == 0`) always passes.
    pub fn add_video_sample(&mut self, flow_id: u32, layer: u8, data_bytes: usize, now_ms: i64) -> bool {
        self.print_layers(now_ms);

        self.layers
            .entry((flow_id, layer))
            .or_insert_with(|| VideoTemporalLayerInfo::new(flow_id, layer));

        let current_layer_need = {
            let current = self.layers.get_mut(&(flow_id, layer)).unwrap();
            current.rate.add(data_bytes as u64, now_ms);
            current.rate.rate(now_ms).unwrap_or(0)
        };

        let actual = self.tx_rate.rate(now_ms).unwrap_or(0);
        let actual_short = self.short_tx_rate.rate(now_ms).unwrap_or(0);

        let mut prior_need = self.other_rate.rate(now_ms).unwrap_or(0);
        for (&(f, l), info) in self.layers.iter_mut() {
            if (f, l) == (flow_id, layer) {
                break;
            }
            prior_need += info.rate.rate(now_ms).unwrap_or(0);
        }

        let total_need = prior_need + current_layer_need;
        let total_available = (self.available_bitrate.unwrap_or(0) as f64 * AVAILABLE_BANDWIDTH_USAGE) as u64;

        let do_pass = 'decision: {
            if layer == 0 {
                break 'decision true;
            }
            if total_need <= total_available {
                break 'decision true;
            }
            if total_available <= prior_need {
                break 'decision false;
            }
            if (actual as f64 + data_bytes as f64 * 8.0) > total_available as f64 * self.usage_coef {
                break 'decision false;
            }
            if (actual_short as f64 + data_bytes as f64 * 8.0) > total_available as f64 * self.burst_usage_coef {
                break 'decision false;
            }
            // Partial-pass heuristic: admit when the running rate still
            // has room for one more average-sized frame.
            actual as f64 + DEFAULT_FRAME_SIZE_KB * 8000.0 < total_available as f64
        };

        if do_pass {
            self.tx_rate.add(data_bytes as u64, now_ms);
            self.short_tx_rate.add(data_bytes as u64, now_ms);
        }

        do_pass
    }

    fn print_layers(&mut self, now_ms: i64) {
        if let Some(last) = self.last_print_ms
            && now_ms - last < LAYERS_PRINT_INTERVAL_MS
        {
            return;
        }
        self.last_print_ms = Some(now_ms);

        if log::log_enabled!(log::Level::Trace) {
            let mut line = String::new();
            for info in self.layers.values() {
                line.push_str(&info.trace_line(now_ms));
                line.push_str(", ");
            }
            log::trace!(
                "filter: available={:?} actual={:?} short={:?} layers=({})",
                self.available_bitrate,
                self.tx_rate.rate(now_ms),
                self.short_tx_rate.rate(now_ms),
                line
            );
        }
    }
}

impl Default for TemporalLayerFilter {
    fn default() -> Self {
        Self::new(FilterConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_layer_always_passes_without_bandwidth_estimate() {
        let mut filter = TemporalLayerFilter::default();
        for t in (0..1000).step_by(33) {
            assert!(filter.add_video_sample(0, 0, 1500, t));
        }
    }

    #[test]
    fn base_layer_floor_with_available_bitrate() {
        let mut filter = TemporalLayerFilter::default();
        filter.update_available_bitrate(100_000);
        for i in 0..10 {
            assert!(filter.add_video_sample(0, 0, 1500, i * 33));
        }
    }

    #[test]
    fn full_headroom_passes_every_layer() {
        let mut filter = TemporalLayerFilter::default();
        filter.update_available_bitrate(u64::MAX / 4);
        for t in (0..2000).step_by(33) {
            assert!(filter.add_video_sample(0, 0, 1200, t));
            assert!(filter.add_video_sample(0, 1, 1200, t));
            assert!(filter.add_video_sample(0, 2, 1200, t));
        }
    }

    #[test]
    fn congestion_drops_the_enhancement_layer() {
        let mut filter = TemporalLayerFilter::default();
        filter.update_available_bitrate(200_000);
        let mut layer0_passes = 0;
        let mut layer1_total = 0;
        let mut layer1_passes = 0;
        let mut t: i64 = 0;
        // layer 0 at ~150kbps, layer 1 at ~200kbps on top, over ~2s.
        while t < 2000 {
            if filter.add_video_sample(0, 0, 625, t) {
                layer0_passes += 1;
            }
            layer1_total += 1;
            if filter.add_video_sample(0, 1, 833, t) {
                layer1_passes += 1;
            }
            t += 33;
        }
        assert_eq!(layer0_passes, layer1_total);
        assert!((layer1_passes as f64 / layer1_total as f64) < 0.2);
    }
}
