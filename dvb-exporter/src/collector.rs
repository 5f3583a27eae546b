//! Collection pass over every frontend on the host.
//!
//! A pass enumerates adapters, then frontends per adapter, and reads status
//! and statistics from each frontend. Failures are kept per device: a
//! frontend that cannot be opened or read only loses its own observations.

use log::{debug, error, warn};

use linux_dvb::{DeviceId, DeviceTree, Error, FrontendDevice, Stats, Status};

use crate::observation::{Metric, Observation};

/// Status and statistics read from one frontend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub status: Status,
    pub stats: Stats,
}

/// Outcome of probing one adapter or frontend.
#[derive(Debug)]
pub enum Probe {
    /// The adapter's frontends could not be listed.
    Adapter { adapter: u32, error: Error },
    /// A frontend was probed.
    Frontend {
        id: DeviceId,
        result: Result<Reading, Error>,
    },
}

/// Convert a bit counter to bytes.
pub fn bits_to_bytes(bits: u64) -> f64 {
    bits as f64 / 8.0
}

fn bool_to_value(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

impl Reading {
    /// Observations for this reading. Absent statistics are left out.
    pub fn observations(&self, id: DeviceId) -> Vec<Observation> {
        let adapter = id.adapter.to_string();
        let frontend = id.frontend.to_string();
        let device_labels = || {
            vec![
                ("adapter", adapter.clone()),
                ("frontend", frontend.clone()),
            ]
        };

        let mut out = Vec::with_capacity(17);
        for (flag, set) in self.status.flags() {
            let mut labels = vec![("status", flag.to_string())];
            labels.extend(device_labels());
            out.push(Observation::new(Metric::Status, labels, bool_to_value(set)));
        }

        let stats = &self.stats;
        let values = [
            (Metric::SignalStrengthDecibels, stats.signal_strength.decibel),
            (Metric::SignalStrengthRatio, stats.signal_strength.ratio),
            (Metric::CnrDecibels, stats.cnr.decibel),
            (Metric::CnrRatio, stats.cnr.ratio),
            (Metric::PreErrorBytes, stats.pre_error_bit_count.map(bits_to_bytes)),
            (Metric::PreBytes, stats.pre_total_bit_count.map(bits_to_bytes)),
            (Metric::PostErrorBytes, stats.post_error_bit_count.map(bits_to_bytes)),
            (Metric::PostBytes, stats.post_total_bit_count.map(bits_to_bytes)),
            (Metric::ErrorBlocks, stats.error_block_count.map(|c| c as f64)),
            (Metric::Blocks, stats.total_block_count.map(|c| c as f64)),
        ];
        for (metric, value) in values {
            if let Some(value) = value {
                out.push(Observation::new(metric, device_labels(), value));
            }
        }
        out
    }
}

/// Runs collection passes against a device tree.
#[derive(Debug, Clone)]
pub struct Collector<T> {
    tree: T,
}

impl<T: DeviceTree> Collector<T> {
    pub fn new(tree: T) -> Self {
        Self { tree }
    }

    #[cfg(test)]
    pub(crate) fn tree(&self) -> &T {
        &self.tree
    }

    /// Read one frontend. The handle is released before this returns,
    /// whichever step fails.
    pub fn read(&self, id: DeviceId) -> Result<Reading, Error> {
        let device = self.tree.open(id)?;
        let status = device.read_status()?;
        let stats = device.stats()?;
        Ok(Reading { status, stats })
    }

    /// Probe every frontend. Fails only when the adapter list itself is
    /// unavailable.
    pub fn probe(&self) -> Result<Vec<Probe>, Error> {
        let adapters = self.tree.list_adapters()?;

        let mut probes = Vec::new();
        for adapter in adapters {
            let frontends = match self.tree.list_frontends(adapter) {
                Ok(frontends) => frontends,
                Err(error) => {
                    probes.push(Probe::Adapter { adapter, error });
                    continue;
                }
            };
            for frontend in frontends {
                let id = DeviceId::new(adapter, frontend);
                probes.push(Probe::Frontend {
                    id,
                    result: self.read(id),
                });
            }
        }
        Ok(probes)
    }

    /// Run one pass and return the observations of every healthy frontend.
    pub fn collect(&self) -> Vec<Observation> {
        let probes = match self.probe() {
            Ok(probes) => probes,
            Err(e) => {
                error!("Failed to list adapters: {}", e);
                return Vec::new();
            }
        };

        let mut observations = Vec::new();
        let mut healthy = 0usize;
        let mut failed = 0usize;
        for probe in probes {
            match probe {
                Probe::Adapter { adapter, error } => {
                    failed += 1;
                    error!("Failed to list frontends of adapter{}: {}", adapter, error);
                }
                Probe::Frontend { id, result: Ok(reading) } => {
                    healthy += 1;
                    observations.extend(reading.observations(id));
                }
                Probe::Frontend { id, result: Err(e) } => {
                    failed += 1;
                    warn!("Failed to collect from {}: {}", id, e);
                }
            }
        }

        debug!(
            "Collection pass done: frontends={}, failures={}, observations={}",
            healthy,
            failed,
            observations.len()
        );
        observations
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use linux_dvb::status::{FE_HAS_CARRIER, FE_HAS_LOCK, FE_HAS_SIGNAL, FE_HAS_SYNC, FE_HAS_VITERBI};
    use linux_dvb::{ScaledStat, StatCommand};

    use crate::observation::ValueKind;

    #[derive(Debug, Clone, Default)]
    pub(crate) struct FakeFrontend {
        pub status: u32,
        pub records: Vec<(StatCommand, ScaledStat)>,
        pub fail_status: bool,
        pub fail_stats: bool,
    }

    pub(crate) struct FakeHandle {
        device: FakeFrontend,
        path: PathBuf,
        open: Arc<AtomicUsize>,
    }

    impl Drop for FakeHandle {
        fn drop(&mut self) {
            self.open.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn io_error(op: &'static str, path: &PathBuf) -> Error {
        Error::Io {
            op,
            path: path.clone(),
            source: io::Error::from_raw_os_error(5),
        }
    }

    impl FrontendDevice for FakeHandle {
        fn read_status(&self) -> linux_dvb::Result<Status> {
            if self.device.fail_status {
                return Err(io_error("FE_READ_STATUS", &self.path));
            }
            Ok(Status::from_bits(self.device.status))
        }

        fn raw_stats(&self) -> linux_dvb::Result<Vec<(StatCommand, ScaledStat)>> {
            if self.device.fail_stats {
                return Err(io_error("FE_GET_PROPERTY", &self.path));
            }
            Ok(self.device.records.clone())
        }
    }

    /// In-memory device tree. Frontends listed but missing from `devices`
    /// fail to open.
    #[derive(Default)]
    pub(crate) struct FakeTree {
        pub adapters: Option<Vec<u32>>,
        pub frontends: HashMap<u32, Option<Vec<u32>>>,
        pub devices: HashMap<DeviceId, FakeFrontend>,
        pub open: Arc<AtomicUsize>,
    }

    impl FakeTree {
        pub fn open_handles(&self) -> usize {
            self.open.load(Ordering::SeqCst)
        }
    }

    impl DeviceTree for FakeTree {
        type Device = FakeHandle;

        fn list_adapters(&self) -> linux_dvb::Result<Vec<u32>> {
            self.adapters.clone().ok_or_else(|| Error::Enumeration {
                path: PathBuf::from("/dev/dvb"),
                source: io::Error::from(io::ErrorKind::NotFound),
            })
        }

        fn list_frontends(&self, adapter: u32) -> linux_dvb::Result<Vec<u32>> {
            self.frontends
                .get(&adapter)
                .cloned()
                .flatten()
                .ok_or_else(|| Error::Enumeration {
                    path: PathBuf::from(format!("/dev/dvb/adapter{}", adapter)),
                    source: io::Error::from(io::ErrorKind::PermissionDenied),
                })
        }

        fn open(&self, id: DeviceId) -> linux_dvb::Result<FakeHandle> {
            let path = PathBuf::from(format!("/dev/dvb/{}", id));
            let device = self.devices.get(&id).cloned().ok_or_else(|| Error::Open {
                path: path.clone(),
                source: io::Error::from(io::ErrorKind::NotFound),
            })?;
            self.open.fetch_add(1, Ordering::SeqCst);
            Ok(FakeHandle {
                device,
                path,
                open: Arc::clone(&self.open),
            })
        }
    }

    pub(crate) fn locked_frontend() -> FakeFrontend {
        FakeFrontend {
            status: FE_HAS_SIGNAL | FE_HAS_CARRIER | FE_HAS_VITERBI | FE_HAS_SYNC | FE_HAS_LOCK,
            records: vec![
                (StatCommand::SignalStrength, ScaledStat::Decibel(-5000)),
                (StatCommand::Cnr, ScaledStat::Relative(65535)),
                (StatCommand::PreErrorBitCount, ScaledStat::Counter(800)),
                (StatCommand::PreTotalBitCount, ScaledStat::Counter(8_000_000)),
                (StatCommand::ErrorBlockCount, ScaledStat::Counter(3)),
                (StatCommand::TotalBlockCount, ScaledStat::NotAvailable),
            ],
            ..Default::default()
        }
    }

    /// One adapter with two frontends; frontend 1 cannot be opened.
    pub(crate) fn half_broken_tree() -> FakeTree {
        let mut tree = FakeTree {
            adapters: Some(vec![0]),
            ..Default::default()
        };
        tree.frontends.insert(0, Some(vec![0, 1]));
        tree.devices.insert(DeviceId::new(0, 0), locked_frontend());
        tree
    }

    fn find<'a>(obs: &'a [Observation], metric: Metric, frontend: &str) -> Option<&'a Observation> {
        obs.iter().find(|o| {
            o.metric == metric && o.labels.iter().any(|(k, v)| *k == "frontend" && v == frontend)
        })
    }

    fn device_observations<'a>(obs: &'a [Observation], frontend: &str) -> Vec<&'a Observation> {
        obs.iter()
            .filter(|o| o.labels.iter().any(|(k, v)| *k == "frontend" && v == frontend))
            .collect()
    }

    #[test]
    fn test_failed_open_does_not_affect_other_frontends() {
        let tree = half_broken_tree();
        let collector = Collector::new(tree);
        let obs = collector.collect();

        // 7 status flags + 2 levels + 3 counters
        assert_eq!(device_observations(&obs, "0").len(), 12);
        assert!(device_observations(&obs, "1").is_empty());
        assert_eq!(obs.len(), 12);
        assert_eq!(collector.tree().open_handles(), 0);
    }

    #[test]
    fn test_values() {
        let obs = Collector::new(half_broken_tree()).collect();

        let lock = obs
            .iter()
            .find(|o| o.labels.contains(&("status", "has_lock".to_string())))
            .unwrap();
        assert_eq!(lock.value, 1.0);
        assert_eq!(lock.kind, ValueKind::Status);
        let timedout = obs
            .iter()
            .find(|o| o.labels.contains(&("status", "timedout".to_string())))
            .unwrap();
        assert_eq!(timedout.value, 0.0);

        assert_eq!(find(&obs, Metric::SignalStrengthDecibels, "0").unwrap().value, -5.0);
        assert!(find(&obs, Metric::SignalStrengthRatio, "0").is_none());
        assert_eq!(find(&obs, Metric::CnrRatio, "0").unwrap().value, 1.0);
        assert!(find(&obs, Metric::CnrDecibels, "0").is_none());

        let pre_errors = find(&obs, Metric::PreErrorBytes, "0").unwrap();
        assert_eq!(pre_errors.value, 100.0);
        assert_eq!(pre_errors.kind, ValueKind::Counter);
        assert_eq!(find(&obs, Metric::PreBytes, "0").unwrap().value, 1_000_000.0);
        assert_eq!(find(&obs, Metric::ErrorBlocks, "0").unwrap().value, 3.0);
        assert!(find(&obs, Metric::Blocks, "0").is_none());
        assert!(find(&obs, Metric::PostBytes, "0").is_none());
    }

    #[test]
    fn test_bits_to_bytes() {
        assert_eq!(bits_to_bytes(800), 100.0);
        assert_eq!(bits_to_bytes(0), 0.0);
    }

    #[test]
    fn test_adapter_root_failure_yields_nothing() {
        let collector = Collector::new(FakeTree::default());
        assert!(matches!(collector.probe(), Err(Error::Enumeration { .. })));
        assert!(collector.collect().is_empty());
    }

    #[test]
    fn test_frontend_listing_failure_is_scoped_to_adapter() {
        let mut tree = FakeTree {
            adapters: Some(vec![0, 1]),
            ..Default::default()
        };
        tree.frontends.insert(0, None);
        tree.frontends.insert(1, Some(vec![0]));
        tree.devices.insert(DeviceId::new(1, 0), FakeFrontend::default());
        let collector = Collector::new(tree);

        let probes = collector.probe().unwrap();
        assert_eq!(probes.len(), 2);
        assert!(matches!(probes[0], Probe::Adapter { adapter: 0, .. }));
        assert!(matches!(
            probes[1],
            Probe::Frontend { id: DeviceId { adapter: 1, frontend: 0 }, result: Ok(_) }
        ));

        let obs = collector.collect();
        assert_eq!(obs.len(), 7);
        assert!(obs.iter().all(|o| o.labels.contains(&("adapter", "1".to_string()))));
    }

    #[test]
    fn test_read_failures_release_handle_and_drop_device() {
        let mut tree = half_broken_tree();
        tree.frontends.insert(0, Some(vec![0, 2, 3]));
        tree.devices.insert(
            DeviceId::new(0, 2),
            FakeFrontend { fail_status: true, ..locked_frontend() },
        );
        tree.devices.insert(
            DeviceId::new(0, 3),
            FakeFrontend { fail_stats: true, ..locked_frontend() },
        );
        let collector = Collector::new(tree);

        assert!(matches!(
            collector.read(DeviceId::new(0, 2)),
            Err(Error::Io { op: "FE_READ_STATUS", .. })
        ));
        assert_eq!(collector.tree().open_handles(), 0);
        assert!(matches!(
            collector.read(DeviceId::new(0, 3)),
            Err(Error::Io { op: "FE_GET_PROPERTY", .. })
        ));
        assert_eq!(collector.tree().open_handles(), 0);

        let obs = collector.collect();
        assert_eq!(device_observations(&obs, "0").len(), 12);
        assert!(device_observations(&obs, "2").is_empty());
        assert!(device_observations(&obs, "3").is_empty());
        assert_eq!(collector.tree().open_handles(), 0);
    }

    #[test]
    fn test_unsupported_stats_are_omitted() {
        let mut tree = FakeTree {
            adapters: Some(vec![0]),
            ..Default::default()
        };
        tree.frontends.insert(0, Some(vec![0]));
        tree.devices.insert(
            DeviceId::new(0, 0),
            FakeFrontend {
                records: vec![
                    (StatCommand::SignalStrength, ScaledStat::NotAvailable),
                    (StatCommand::Cnr, ScaledStat::Unknown(9)),
                    (StatCommand::PostErrorBitCount, ScaledStat::Decibel(10)),
                ],
                ..Default::default()
            },
        );

        let obs = Collector::new(tree).collect();
        assert_eq!(obs.len(), 7);
        assert!(obs.iter().all(|o| o.metric == Metric::Status && o.value == 0.0));
    }

    #[test]
    fn test_repeated_passes_are_identical() {
        let collector = Collector::new(half_broken_tree());
        let first = collector.collect();
        let second = collector.collect();
        assert_eq!(first, second);

        let mut keys: Vec<_> = first.iter().map(|o| (o.metric, o.labels.clone())).collect();
        let total = keys.len();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), total, "series must be unique within a pass");
    }

    #[test]
    fn test_reading_status_labels() {
        let reading = Reading {
            status: Status::from_bits(FE_HAS_LOCK),
            stats: Stats::default(),
        };
        let obs = reading.observations(DeviceId::new(3, 1));
        assert_eq!(obs.len(), 7);
        assert_eq!(obs[4].label_values(), ["has_lock", "3", "1"]);
        assert_eq!(obs[4].value, 1.0);
        assert!(obs.iter().filter(|o| o.value == 1.0).count() == 1);
    }
}
