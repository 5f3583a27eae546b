//! Frontend lock status (`FE_READ_STATUS`).

/// `fe_status` bits from `<linux/dvb/frontend.h>`.
pub const FE_HAS_SIGNAL: u32 = 0x01;
pub const FE_HAS_CARRIER: u32 = 0x02;
pub const FE_HAS_VITERBI: u32 = 0x04;
pub const FE_HAS_SYNC: u32 = 0x08;
pub const FE_HAS_LOCK: u32 = 0x10;
pub const FE_TIMEDOUT: u32 = 0x20;
pub const FE_REINIT: u32 = 0x40;

/// Decoded frontend status flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Status {
    /// Found something above the noise level.
    pub has_signal: bool,
    /// Found a DVB signal.
    pub has_carrier: bool,
    /// FEC inner coding (Viterbi, LDPC or other) is stable.
    pub has_viterbi: bool,
    /// Synchronization bytes were found.
    pub has_sync: bool,
    /// Digital TV was locked and everything is working.
    pub has_lock: bool,
    /// No lock within the last about 2 seconds.
    pub timed_out: bool,
    /// Frontend was reinitialized.
    pub reinit: bool,
}

impl Status {
    /// Decode a raw `fe_status` mask. Unknown bits are ignored.
    pub fn from_bits(bits: u32) -> Self {
        Self {
            has_signal: bits & FE_HAS_SIGNAL != 0,
            has_carrier: bits & FE_HAS_CARRIER != 0,
            has_viterbi: bits & FE_HAS_VITERBI != 0,
            has_sync: bits & FE_HAS_SYNC != 0,
            has_lock: bits & FE_HAS_LOCK != 0,
            timed_out: bits & FE_TIMEDOUT != 0,
            reinit: bits & FE_REINIT != 0,
        }
    }

    /// Flags paired with their exported label names, in a fixed order.
    pub fn flags(&self) -> [(&'static str, bool); 7] {
        [
            ("has_signal", self.has_signal),
            ("has_carrier", self.has_carrier),
            ("has_viterbi", self.has_viterbi),
            ("has_sync", self.has_sync),
            ("has_lock", self.has_lock),
            ("timedout", self.timed_out),
            ("reinit", self.reinit),
        ]
    }
}
