//! The single monotonic millisecond source every rate and budget
//! calculation in a session is measured against.

use std::time::Instant;

use shared::time::SystemInstant;

pub struct Clock {
    epoch: Instant,
    system: SystemInstant,
}

impl Clock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            system: SystemInstant::now(),
        }
    }

    pub fn now_ms(&self) -> i64 {
        self.epoch.elapsed().as_millis() as i64
    }

    /// NTP time, used only at the RTCP report boundary.
    pub fn ntp(&self) -> u64 {
        self.system.ntp(Instant::now())
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}
