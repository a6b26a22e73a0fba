//! TWCC feedback assembly: correlating remote arrival reports with local
//! send-time history into records the bandwidth estimator can consume.

mod send_history;

pub use send_history::SendHistory;

use rtcp::transport_feedbacks::transport_layer_cc::{TransportLayerCc, TICK_MICROS};

/// One fully correlated TWCC sample: a transport sequence number's send and
/// (if received) receive time, ready for the bandwidth estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TwccResult {
    pub seq: u16,
    pub send_ms: i64,
    pub receive_ms: i64,
    pub payload_size: usize,
    pub received: bool,
}

/// Correlate a decoded TWCC feedback report against local send history.
///
/// Entries whose sequence number has no send-history record (the sender's
/// history already evicted it) are dropped. The returned list is sorted
/// ascending by `receive_ms`, per the feedback model's delivery contract.
pub fn correlate(feedback: &TransportLayerCc, history: &SendHistory) -> Vec<TwccResult> {
    let mut receive_ms = feedback.base_receive_time_ms;
    let mut results = Vec::with_capacity(feedback.entries.len());

    for entry in &feedback.entries {
        if let Some(ticks) = entry.remote_arrival_delta_ticks {
            receive_ms += ticks * TICK_MICROS / 1000;
        }

        let Some((send_ms, payload_size)) = history.get(entry.seq) else {
            log::warn!("dropping twcc entry for unknown seq {}", entry.seq);
            continue;
        };

        results.push(TwccResult {
            seq: entry.seq,
            send_ms,
            receive_ms,
            payload_size,
            received: entry.received,
        });
    }

    results.sort_by_key(|r| r.receive_ms);
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtcp::transport_feedbacks::transport_layer_cc::TwccEntry;

    fn feedback(base_ms: i64, entries: Vec<TwccEntry>) -> TransportLayerCc {
        TransportLayerCc {
            sender_ssrc: 1,
            media_ssrc: 2,
            base_receive_time_ms: base_ms,
            entries,
        }
    }

    #[test]
    fn correlates_against_send_history() {
        let mut history = SendHistory::new(8).unwrap();
        history.record(0, 1000, 100);
        history.record(1, 1005, 150);

        let fb = feedback(
            2000,
            vec![
                TwccEntry {
                    seq: 0,
                    received: true,
                    remote_arrival_delta_ticks: Some(0),
                },
                TwccEntry {
                    seq: 1,
                    received: true,
                    remote_arrival_delta_ticks: Some(40), // 10ms
                },
            ],
        );

        let results = correlate(&fb, &history);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].send_ms, 1000);
        assert_eq!(results[0].receive_ms, 2000);
        assert_eq!(results[1].send_ms, 1005);
        assert_eq!(results[1].receive_ms, 2010);
    }

    #[test]
    fn drops_unknown_sequence_numbers() {
        let history = SendHistory::new(8).unwrap();
        let fb = feedback(
            1000,
            vec![TwccEntry {
                seq: 42,
                received: true,
                remote_arrival_delta_ticks: Some(0),
            }],
        );
        assert!(correlate(&fb, &history).is_empty());
    }

    #[test]
    fn output_is_sorted_by_receive_ms_even_when_entry_order_is_not() {
        let mut history = SendHistory::new(8).unwrap();
        history.record(0, 100, 10);
        history.record(1, 110, 10);
        history.record(2, 120, 10);

        // Cumulative deltas are accumulated in entry order, so the
        // resulting receive_ms values are deliberately out of order here:
        // seq=0 -> 1000, seq=1 -> 1300, seq=2 -> 1100.
        let fb = feedback(
            1000,
            vec![
                TwccEntry {
                    seq: 0,
                    received: true,
                    remote_arrival_delta_ticks: Some(0),
                },
                TwccEntry {
                    seq: 1,
                    received: true,
                    remote_arrival_delta_ticks: Some(1200), // +300ms
                },
                TwccEntry {
                    seq: 2,
                    received: true,
                    remote_arrival_delta_ticks: Some(-800), // -200ms
                },
            ],
        );

        let results = correlate(&fb, &history);
        let receive_times: Vec<i64> = results.iter().map(|r| r.receive_ms).collect();
        let mut sorted = receive_times.clone();
        sorted.sort();
        assert_eq!(receive_times, sorted);
        assert_eq!(
            results.iter().map(|r| r.seq).collect::<Vec<_>>(),
            vec![0, 2, 1]
        );
    }
}
