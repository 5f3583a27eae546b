//! Metric observations produced by one collection pass.

/// How the sink should type an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// A 0/1 status flag.
    Status,
    Gauge,
    /// Cumulative value reported by the hardware.
    Counter,
}

/// The metric families exported per frontend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metric {
    Status,
    SignalStrengthDecibels,
    SignalStrengthRatio,
    CnrDecibels,
    CnrRatio,
    PreErrorBytes,
    PreBytes,
    PostErrorBytes,
    PostBytes,
    ErrorBlocks,
    Blocks,
}

impl Metric {
    /// Metric name without namespace or subsystem.
    pub fn name(self) -> &'static str {
        match self {
            Metric::Status => "status",
            Metric::SignalStrengthDecibels => "signal_strength_decibels",
            Metric::SignalStrengthRatio => "signal_strength_ratio",
            Metric::CnrDecibels => "CNR_decibels",
            Metric::CnrRatio => "CNR_ratio",
            Metric::PreErrorBytes => "pre_error_bytes_total",
            Metric::PreBytes => "pre_bytes_total",
            Metric::PostErrorBytes => "post_error_bytes_total",
            Metric::PostBytes => "post_bytes_total",
            Metric::ErrorBlocks => "error_blocks_total",
            Metric::Blocks => "blocks_total",
        }
    }

    pub fn help(self) -> &'static str {
        match self {
            Metric::Status => "Status information about the DVB frontend devices.",
            Metric::SignalStrengthDecibels | Metric::SignalStrengthRatio => {
                "Signal strength level at the analog part of the tuner or of the demod."
            }
            Metric::CnrDecibels | Metric::CnrRatio => "Signal to Noise ratio for the main carrier.",
            Metric::PreErrorBytes => "Total number of error bytes before the inner code.",
            Metric::PreBytes => "Total number of bytes received before the inner code.",
            Metric::PostErrorBytes => "Total number of error bytes after the inner code.",
            Metric::PostBytes => "Total number of bytes received after the inner code.",
            Metric::ErrorBlocks => "Total number of error blocks.",
            Metric::Blocks => "Total number of received blocks.",
        }
    }

    pub fn kind(self) -> ValueKind {
        match self {
            Metric::Status => ValueKind::Status,
            Metric::SignalStrengthDecibels
            | Metric::SignalStrengthRatio
            | Metric::CnrDecibels
            | Metric::CnrRatio => ValueKind::Gauge,
            _ => ValueKind::Counter,
        }
    }

    /// Label names, in the order label values are stored on observations.
    pub fn label_names(self) -> &'static [&'static str] {
        match self {
            Metric::Status => &["status", "adapter", "frontend"],
            _ => &["adapter", "frontend"],
        }
    }
}

/// One named, labeled, typed data point.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub metric: Metric,
    pub labels: Vec<(&'static str, String)>,
    pub value: f64,
    pub kind: ValueKind,
}

impl Observation {
    pub fn new(metric: Metric, labels: Vec<(&'static str, String)>, value: f64) -> Self {
        Self {
            metric,
            labels,
            value,
            kind: metric.kind(),
        }
    }

    /// Label values in [`Metric::label_names`] order.
    pub fn label_values(&self) -> Vec<&str> {
        self.labels.iter().map(|(_, v)| v.as_str()).collect()
    }
}
