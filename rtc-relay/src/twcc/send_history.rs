//! Local send-time history keyed by transport-wide sequence number.
//!
//! Same circular-array-by-sequence-number shape as an RTX send buffer, but
//! storing just what TWCC correlation needs: when the packet was handed to
//! the transport and how large its payload was.

const UINT16_SIZE_HALF: u16 = 1 << 15;

#[derive(Debug, Clone, Copy)]
struct Entry {
    seq: u16,
    send_ms: i64,
    payload_size: usize,
}

/// Records `(send_ms, payload_size)` per transport sequence number so TWCC
/// feedback can be correlated back to a send time.
pub struct SendHistory {
    entries: Vec<Option<Entry>>,
    size: u16,
    highest_added: u16,
    started: bool,
}

impl SendHistory {
    /// `size` must be a power of two between 1 and 32768.
    pub fn new(size: u16) -> Option<Self> {
        let is_valid = (0..=15).any(|i| size == 1 << i);
        if !is_valid {
            return None;
        }
        Some(Self {
            entries: vec![None; size as usize],
            size,
            highest_added: 0,
            started: false,
        })
    }

    pub fn record(&mut self, seq: u16, send_ms: i64, payload_size: usize) {
        let entry = Entry {
            seq,
            send_ms,
            payload_size,
        };

        if !self.started {
            self.entries[(seq % self.size) as usize] = Some(entry);
            self.highest_added = seq;
            self.started = true;
            return;
        }

        let diff = seq.wrapping_sub(self.highest_added);
        if diff == 0 {
            return;
        } else if diff < UINT16_SIZE_HALF {
            let mut i = self.highest_added.wrapping_add(1);
            while i != seq {
                let idx = (i % self.size) as usize;
                self.entries[idx] = None;
                i = i.wrapping_add(1);
            }
            self.highest_added = seq;
        }

        let idx = (seq % self.size) as usize;
        self.entries[idx] = Some(entry);
    }

    /// Look up `(send_ms, payload_size)` for a reported sequence number,
    /// returning `None` if it was never recorded or has since been evicted.
    pub fn get(&self, seq: u16) -> Option<(i64, usize)> {
        if !self.started {
            return None;
        }

        let diff = self.highest_added.wrapping_sub(seq);
        if diff >= UINT16_SIZE_HALF || diff >= self.size {
            return None;
        }

        let entry = self.entries[(seq % self.size) as usize].as_ref()?;
        if entry.seq != seq {
            return None;
        }
        Some((entry.send_ms, entry.payload_size))
    }
}

impl Default for SendHistory {
    fn default() -> Self {
        // 32768 is the largest valid power-of-two size and comfortably
        // covers a feedback round-trip's worth of in-flight packets.
        Self::new(1 << 15).expect("1 << 15 is a valid send history size")
    }
}
