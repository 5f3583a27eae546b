//! Read-only access to Linux DVB frontends.
//!
//! This crate enumerates the adapters and frontends under `/dev/dvb`, reads
//! their lock status and signal statistics through the frontend ioctls, and
//! normalizes the kernel's scaled statistic records into typed values.
//!
//! # Example
//!
//! ```rust,no_run
//! use linux_dvb::{DevDvb, DeviceId, DeviceTree, FrontendDevice};
//!
//! let tree = DevDvb::default();
//! for adapter in tree.list_adapters()? {
//!     for frontend in tree.list_frontends(adapter)? {
//!         let id = DeviceId::new(adapter, frontend);
//!         let fe = tree.open(id)?;
//!         let status = fe.read_status()?;
//!         let stats = fe.stats()?;
//!         println!("{id}: lock={} strength={:?}", status.has_lock, stats.signal_strength);
//!     }
//! }
//! # Ok::<(), linux_dvb::Error>(())
//! ```

pub mod enumerate;
pub mod error;
pub mod frontend;
pub mod stats;
pub mod status;

pub use enumerate::{list_adapters, list_frontends};
pub use error::{Error, Result};
pub use frontend::{
    DevDvb, DeviceId, DeviceTree, Frontend, FrontendDevice, DEFAULT_ROOT, DTV_PROPERTY_UNION_SIZE,
};
pub use stats::{normalize, LevelStat, Normalized, ScaledStat, StatCommand, Stats};
pub use status::Status;
