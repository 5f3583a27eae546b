//! DVBv5 statistics (`DTV_STAT_*`) and their normalization.
//!
//! The kernel returns each statistic as a `struct dtv_fe_stats`: a layer
//! count followed by up to [`MAX_DTV_STATS`] packed `struct dtv_stats`
//! records. Every record starts with a scale byte that decides how the
//! following 8-byte value must be read:
//!
//! ```text
//! +------+-------+------------------+-------+-----
//! | len  | scale | uvalue / svalue  | scale | ...
//! |  u8  |  u8   |  u64 / i64 (NE)  |  u8   |
//! +------+-------+------------------+-------+-----
//! ```
//!
//! [`ScaledStat`] keeps the scale and the matching payload together so the
//! value can never be read under the wrong interpretation.

use bytes::Buf;

use crate::error::{Error, Result};

/// `enum fecap_scale_params` values.
pub const FE_SCALE_NOT_AVAILABLE: u8 = 0;
pub const FE_SCALE_DECIBEL: u8 = 1;
pub const FE_SCALE_RELATIVE: u8 = 2;
pub const FE_SCALE_COUNTER: u8 = 3;

/// Maximum number of layers in one `struct dtv_fe_stats`.
pub const MAX_DTV_STATS: usize = 4;

/// Size of one packed `struct dtv_stats` record.
pub const DTV_STATS_SIZE: usize = 9;

/// Decibel values are reported in 0.001 dB units.
pub const DECIBEL_UNIT: f64 = 0.001;

/// Full scale of a relative value (100%).
pub const RELATIVE_FULL_SCALE: f64 = 65535.0;

/// The statistics queried from every frontend, with their `DTV_STAT_*` numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum StatCommand {
    SignalStrength = 62,
    Cnr = 63,
    PreErrorBitCount = 64,
    PreTotalBitCount = 65,
    PostErrorBitCount = 66,
    PostTotalBitCount = 67,
    ErrorBlockCount = 68,
    TotalBlockCount = 69,
}

impl StatCommand {
    /// Every tracked statistic, in query order.
    pub const ALL: [StatCommand; 8] = [
        StatCommand::SignalStrength,
        StatCommand::Cnr,
        StatCommand::PreErrorBitCount,
        StatCommand::PreTotalBitCount,
        StatCommand::PostErrorBitCount,
        StatCommand::PostTotalBitCount,
        StatCommand::ErrorBlockCount,
        StatCommand::TotalBlockCount,
    ];

    /// The `DTV_STAT_*` property number.
    pub fn cmd(self) -> u32 {
        self as u32
    }

    /// Whether the hardware may report this statistic as a level (dB or ratio)
    /// rather than a counter.
    pub fn is_level(self) -> bool {
        matches!(self, StatCommand::SignalStrength | StatCommand::Cnr)
    }
}

/// One scaled statistic record, tagged by its scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaledStat {
    /// The frontend cannot measure this value right now.
    NotAvailable,
    /// Signed value in 0.001 dB units.
    Decibel(i64),
    /// Unsigned value where 65535 is 100%.
    Relative(u64),
    /// Unsigned event counter.
    Counter(u64),
    /// A scale this crate does not know about.
    Unknown(u8),
}

impl ScaledStat {
    /// Build a record from its scale byte and the raw bits of the value union.
    pub fn from_raw(scale: u8, value: u64) -> Self {
        match scale {
            FE_SCALE_NOT_AVAILABLE => ScaledStat::NotAvailable,
            FE_SCALE_DECIBEL => ScaledStat::Decibel(value as i64),
            FE_SCALE_RELATIVE => ScaledStat::Relative(value),
            FE_SCALE_COUNTER => ScaledStat::Counter(value),
            other => ScaledStat::Unknown(other),
        }
    }
}

/// Decode the first layer of a `struct dtv_fe_stats` taken from a property union.
///
/// Returns `Ok(None)` when the property carries no records, which is how the
/// kernel signals an unsupported statistic.
pub fn decode_fe_stats(command: StatCommand, mut buf: &[u8]) -> Result<Option<ScaledStat>> {
    if buf.is_empty() {
        return Err(Error::Decode {
            command,
            reason: "empty property buffer".to_string(),
        });
    }

    let len = buf.get_u8() as usize;
    if len == 0 {
        return Ok(None);
    }
    if len > MAX_DTV_STATS {
        return Err(Error::Decode {
            command,
            reason: format!("layer count {} exceeds {}", len, MAX_DTV_STATS),
        });
    }
    if buf.remaining() < DTV_STATS_SIZE {
        return Err(Error::Decode {
            command,
            reason: format!("expected {} bytes, got {}", DTV_STATS_SIZE, buf.remaining()),
        });
    }

    let scale = buf.get_u8();
    let value = buf.get_u64_ne();
    Ok(Some(ScaledStat::from_raw(scale, value)))
}

/// A statistic value converted to real units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Normalized {
    /// Decibels.
    Decibel(f64),
    /// Fraction of full scale, in `[0, 1]`.
    Ratio(f64),
    /// Raw count.
    Count(u64),
}

/// Convert a scaled record to real units. Unavailable or unknown scales
/// produce no value.
pub fn normalize(stat: &ScaledStat) -> Option<Normalized> {
    match *stat {
        ScaledStat::Decibel(v) => Some(Normalized::Decibel(v as f64 * DECIBEL_UNIT)),
        ScaledStat::Relative(v) => Some(Normalized::Ratio(v as f64 / RELATIVE_FULL_SCALE)),
        ScaledStat::Counter(v) => Some(Normalized::Count(v)),
        ScaledStat::NotAvailable | ScaledStat::Unknown(_) => None,
    }
}

/// A level the hardware may report either in decibels or as a ratio.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LevelStat {
    pub decibel: Option<f64>,
    pub ratio: Option<f64>,
}

/// Normalized statistics of one frontend.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Stats {
    pub signal_strength: LevelStat,
    pub cnr: LevelStat,
    pub pre_error_bit_count: Option<u64>,
    pub pre_total_bit_count: Option<u64>,
    pub post_error_bit_count: Option<u64>,
    pub post_total_bit_count: Option<u64>,
    pub error_block_count: Option<u64>,
    pub total_block_count: Option<u64>,
}

impl Stats {
    /// Fold raw records into their slots.
    ///
    /// Level statistics accept decibel and ratio values; counters accept only
    /// counter values. Anything else leaves the slot empty.
    pub fn from_raw<I>(records: I) -> Self
    where
        I: IntoIterator<Item = (StatCommand, ScaledStat)>,
    {
        let mut stats = Stats::default();
        for (command, raw) in records {
            let Some(value) = normalize(&raw) else {
                continue;
            };

            if command.is_level() {
                let level = match command {
                    StatCommand::SignalStrength => &mut stats.signal_strength,
                    _ => &mut stats.cnr,
                };
                match value {
                    Normalized::Decibel(db) => level.decibel = Some(db),
                    Normalized::Ratio(r) => level.ratio = Some(r),
                    Normalized::Count(_) => {}
                }
                continue;
            }

            let Normalized::Count(count) = value else {
                continue;
            };
            let slot = match command {
                StatCommand::PreErrorBitCount => &mut stats.pre_error_bit_count,
                StatCommand::PreTotalBitCount => &mut stats.pre_total_bit_count,
                StatCommand::PostErrorBitCount => &mut stats.post_error_bit_count,
                StatCommand::PostTotalBitCount => &mut stats.post_total_bit_count,
                StatCommand::ErrorBlockCount => &mut stats.error_block_count,
                StatCommand::TotalBlockCount => &mut stats.total_block_count,
                StatCommand::SignalStrength | StatCommand::Cnr => continue,
            };
            *slot = Some(count);
        }
        stats
    }
}
