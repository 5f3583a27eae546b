//! Prometheus exposition of collected observations.
//!
//! Frontend metrics are registered into a fresh [`Registry`] on every scrape,
//! so devices that disappear drop out of the output immediately. Metrics about
//! the exporter itself live in [`HandlerMetrics`] for the whole process
//! lifetime.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use prometheus::proto::MetricFamily;
use prometheus::{
    CounterVec, Encoder, GaugeVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

use crate::observation::{Metric, Observation, ValueKind};

/// Default metric namespace.
pub const DEFAULT_NAMESPACE: &str = "dvb";

/// Subsystem of all per-frontend metrics.
pub const SUBSYSTEM: &str = "frontend";

/// Content type of the text exposition format.
pub const CONTENT_TYPE: &str = prometheus::TEXT_FORMAT;

fn opts(metric: Metric, namespace: &str) -> Opts {
    Opts::new(metric.name(), metric.help())
        .namespace(namespace)
        .subsystem(SUBSYSTEM)
}

/// Turn one pass worth of observations into metric families.
pub fn gather_observations(
    observations: &[Observation],
    namespace: &str,
) -> prometheus::Result<Vec<MetricFamily>> {
    let registry = Registry::new();
    let mut gauges: HashMap<Metric, GaugeVec> = HashMap::new();
    let mut counters: HashMap<Metric, CounterVec> = HashMap::new();

    for obs in observations {
        let labels = obs.label_values();
        match obs.kind {
            ValueKind::Status | ValueKind::Gauge => {
                let vec = match gauges.entry(obs.metric) {
                    Entry::Occupied(e) => e.into_mut(),
                    Entry::Vacant(e) => {
                        let vec = GaugeVec::new(opts(obs.metric, namespace), obs.metric.label_names())?;
                        registry.register(Box::new(vec.clone()))?;
                        e.insert(vec)
                    }
                };
                vec.get_metric_with_label_values(&labels)?.set(obs.value);
            }
            ValueKind::Counter => {
                let vec = match counters.entry(obs.metric) {
                    Entry::Occupied(e) => e.into_mut(),
                    Entry::Vacant(e) => {
                        let vec = CounterVec::new(opts(obs.metric, namespace), obs.metric.label_names())?;
                        registry.register(Box::new(vec.clone()))?;
                        e.insert(vec)
                    }
                };
                // Fresh registry: the counter starts at zero and ends at the
                // hardware's cumulative value.
                vec.get_metric_with_label_values(&labels)?.inc_by(obs.value);
            }
        }
    }

    Ok(registry.gather())
}

/// Encode metric families in the text exposition format.
pub fn render(mut families: Vec<MetricFamily>) -> prometheus::Result<String> {
    families.sort_by(|a, b| a.get_name().cmp(b.get_name()));
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

/// RAII marker for one in-flight scrape.
pub struct InFlight<'a> {
    gauge: &'a IntGauge,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.gauge.dec();
    }
}

/// Metrics about the metrics handler itself.
pub struct HandlerMetrics {
    registry: Registry,
    requests: IntCounterVec,
    in_flight: IntGauge,
}

impl HandlerMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let requests = IntCounterVec::new(
            Opts::new(
                "promhttp_metric_handler_requests_total",
                "Total number of scrapes by HTTP status code.",
            ),
            &["code"],
        )?;
        let in_flight = IntGauge::new(
            "promhttp_metric_handler_requests_in_flight",
            "Current number of scrapes being served.",
        )?;
        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(in_flight.clone()))?;

        for code in ["200", "500", "503"] {
            requests.with_label_values(&[code]);
        }

        #[cfg(target_os = "linux")]
        registry.register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        ))?;

        Ok(Self {
            registry,
            requests,
            in_flight,
        })
    }

    /// Mark a scrape as in flight until the returned guard is dropped.
    pub fn start(&self) -> InFlight<'_> {
        self.in_flight.inc();
        InFlight {
            gauge: &self.in_flight,
        }
    }

    /// Count a finished scrape by its response code.
    pub fn record(&self, code: u16) {
        self.requests
            .with_label_values(&[code.to_string().as_str()])
            .inc();
    }

    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::tests::half_broken_tree;
    use crate::collector::Collector;

    fn sample(text: &str, prefix: &str) -> Option<f64> {
        text.lines()
            .find(|l| l.starts_with(prefix))
            .and_then(|l| l.rsplit(' ').next())
            .and_then(|v| v.parse().ok())
    }

    #[test]
    fn test_render_pass() {
        let observations = Collector::new(half_broken_tree()).collect();
        let text = render(gather_observations(&observations, DEFAULT_NAMESPACE).unwrap()).unwrap();

        assert!(text.contains("# TYPE dvb_frontend_status gauge"));
        assert!(text.contains("# TYPE dvb_frontend_signal_strength_decibels gauge"));
        assert!(text.contains("# TYPE dvb_frontend_pre_error_bytes_total counter"));
        assert!(text.contains(
            "# HELP dvb_frontend_CNR_ratio Signal to Noise ratio for the main carrier."
        ));
        assert_eq!(text.lines().filter(|l| l.starts_with("dvb_frontend_status{")).count(), 7);
        let flag = |name: &str| {
            text.lines()
                .find(|l| l.contains(&format!("status=\"{}\"", name)))
                .and_then(|l| l.rsplit(' ').next())
                .and_then(|v| v.parse::<f64>().ok())
        };
        assert_eq!(flag("has_lock"), Some(1.0));
        assert_eq!(flag("reinit"), Some(0.0));

        assert_eq!(sample(&text, "dvb_frontend_signal_strength_decibels{"), Some(-5.0));
        assert_eq!(sample(&text, "dvb_frontend_CNR_ratio{"), Some(1.0));
        assert_eq!(sample(&text, "dvb_frontend_pre_error_bytes_total{"), Some(100.0));
        assert_eq!(sample(&text, "dvb_frontend_error_blocks_total{"), Some(3.0));

        // Absent statistics must not show up as zero
        assert!(!text.contains("dvb_frontend_signal_strength_ratio"));
        assert!(!text.contains("dvb_frontend_blocks_total"));
        assert!(!text.contains("frontend=\"1\""));
    }

    #[test]
    fn test_custom_namespace() {
        let observations = Collector::new(half_broken_tree()).collect();
        let text = render(gather_observations(&observations, "tuner").unwrap()).unwrap();
        assert!(text.contains("# TYPE tuner_frontend_status gauge"));
        assert!(!text.contains("dvb_frontend_"));
    }

    #[test]
    fn test_empty_pass() {
        let families = gather_observations(&[], DEFAULT_NAMESPACE).unwrap();
        assert!(families.is_empty());
        assert_eq!(render(families).unwrap(), "");
    }

    #[test]
    fn test_label_mismatch_is_an_error() {
        let bad = Observation::new(Metric::Status, vec![("adapter", "0".to_string())], 1.0);
        assert!(gather_observations(&[bad], DEFAULT_NAMESPACE).is_err());
    }

    #[test]
    fn test_handler_metrics() {
        let handler = HandlerMetrics::new().unwrap();
        {
            let _guard = handler.start();
            let text = render(handler.gather()).unwrap();
            assert_eq!(sample(&text, "promhttp_metric_handler_requests_in_flight"), Some(1.0));
        }
        handler.record(200);
        handler.record(200);

        let text = render(handler.gather()).unwrap();
        assert_eq!(sample(&text, "promhttp_metric_handler_requests_in_flight"), Some(0.0));
        assert_eq!(
            sample(&text, "promhttp_metric_handler_requests_total{code=\"200\"}"),
            Some(2.0)
        );
        assert_eq!(
            sample(&text, "promhttp_metric_handler_requests_total{code=\"500\"}"),
            Some(0.0)
        );
    }
}
