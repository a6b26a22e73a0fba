//! Arrival grouping: folding packets sent close together into a single
//! burst so the delay gradient is computed between bursts, not packets.

/// A maximal burst of packets whose sends and arrivals stayed within the
/// grouping window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrivalGroup {
    pub first_send_ms: i64,
    pub first_receive_ms: i64,
    pub last_send_ms: i64,
    pub last_receive_ms: i64,
    pub payload_size: u64,
}

/// Send-time span within which packets are always folded into the same
/// group, regardless of arrival skew.
const SEND_TIME_GROUP_LENGTH_MS: i64 = 5;

/// Extra arrival/departure skew, beyond the send delta, needed to split a
/// group even when the send-time gap alone would not.
const BURST_THRESHOLD_MS: i64 = 0;

/// Incrementally folds `(send_ms, receive_ms, payload_size)` samples into
/// [`ArrivalGroup`]s, emitting a group each time a new one is opened.
pub struct Grouper {
    current: Option<ArrivalGroup>,
}

impl Grouper {
    pub fn new() -> Self {
        Self { current: None }
    }

    /// Feed one TWCC sample. Returns the just-closed group when this sample
    /// opens a new one.
    pub fn add(&mut self, send_ms: i64, receive_ms: i64, payload_size: usize) -> Option<ArrivalGroup> {
        let payload_size = payload_size as u64;
        match &mut self.current {
            None => {
                self.current = Some(ArrivalGroup {
                    first_send_ms: send_ms,
                    first_receive_ms: receive_ms,
                    last_send_ms: send_ms,
                    last_receive_ms: receive_ms,
                    payload_size,
                });
                None
            }
            Some(group) => {
                let send_delta = send_ms - group.last_send_ms;
                let arrival_delta = receive_ms - group.last_receive_ms;
                let starts_new_group = send_delta > SEND_TIME_GROUP_LENGTH_MS
                    || (arrival_delta > 0
                        && send_delta > 0
                        && arrival_delta > send_delta + BURST_THRESHOLD_MS);

                if starts_new_group {
                    let closed = *group;
                    self.current = Some(ArrivalGroup {
                        first_send_ms: send_ms,
                        first_receive_ms: receive_ms,
                        last_send_ms: send_ms,
                        last_receive_ms: receive_ms,
                        payload_size,
                    });
                    Some(closed)
                } else {
                    group.last_send_ms = send_ms;
                    group.last_receive_ms = receive_ms;
                    group.payload_size += payload_size;
                    None
                }
            }
        }
    }
}

impl Default for Grouper {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sample_opens_a_group_silently() {
        let mut grouper = Grouper::new();
        assert_eq!(grouper.add(0, 0, 100), None);
    }

    #[test]
    fn samples_within_burst_window_fold_together() {
        let mut grouper = Grouper::new();
        grouper.add(0, 0, 100);
        assert_eq!(grouper.add(3, 3, 100), None);
        assert_eq!(grouper.add(5, 5, 100), None);
    }

    #[test]
    fn send_gap_beyond_window_closes_the_group() {
        let mut grouper = Grouper::new();
        grouper.add(0, 0, 100);
        grouper.add(2, 2, 100);
        let closed = grouper.add(10, 10, 100).expect("group should close");
        assert_eq!(closed.first_send_ms, 0);
        assert_eq!(closed.last_send_ms, 2);
        assert_eq!(closed.payload_size, 200);
    }
}
