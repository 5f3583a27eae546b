//! Frontend device handles.
//!
//! A [`Frontend`] owns one open `/dev/dvb/adapterA/frontendF` node. The file
//! is closed when the handle is dropped, so every exit path releases it.

use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::enumerate;
use crate::error::{Error, Result};
use crate::stats::{decode_fe_stats, ScaledStat, StatCommand, Stats};
use crate::status::Status;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(not(target_os = "linux"))]
mod unsupported;

#[cfg(target_os = "linux")]
use self::linux as sys;
#[cfg(not(target_os = "linux"))]
use self::unsupported as sys;

/// Default location of the DVB device tree.
pub const DEFAULT_ROOT: &str = "/dev/dvb";

/// Size of the value union inside `struct dtv_property`.
///
/// The largest member is the buffer variant: 32 data bytes, a `u32` length,
/// three reserved `u32`s and a reserved pointer, so the size follows the
/// target's pointer width (56 on 64-bit, 52 on 32-bit).
pub const DTV_PROPERTY_UNION_SIZE: usize = 32 + 4 + 12 + std::mem::size_of::<*const ()>();

/// Identifies one frontend on the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId {
    pub adapter: u32,
    pub frontend: u32,
}

impl DeviceId {
    pub fn new(adapter: u32, frontend: u32) -> Self {
        Self { adapter, frontend }
    }

    /// Device node path under `root`.
    pub fn path(&self, root: &Path) -> PathBuf {
        enumerate::adapter_dir(root, self.adapter).join(format!("frontend{}", self.frontend))
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "adapter{}/frontend{}", self.adapter, self.frontend)
    }
}

/// Read-only queries on an open frontend.
pub trait FrontendDevice {
    /// Read the lock status bits.
    fn read_status(&self) -> Result<Status>;

    /// Query every tracked statistic in one round trip. Statistics the
    /// device does not support are left out.
    fn raw_stats(&self) -> Result<Vec<(StatCommand, ScaledStat)>>;

    /// Query and normalize the statistics.
    fn stats(&self) -> Result<Stats> {
        Ok(Stats::from_raw(self.raw_stats()?))
    }
}

/// A place frontends can be discovered and opened from.
pub trait DeviceTree {
    type Device: FrontendDevice;

    fn list_adapters(&self) -> Result<Vec<u32>>;

    fn list_frontends(&self, adapter: u32) -> Result<Vec<u32>>;

    fn open(&self, id: DeviceId) -> Result<Self::Device>;
}

/// The host's DVB device tree.
#[derive(Debug, Clone)]
pub struct DevDvb {
    root: PathBuf,
}

impl DevDvb {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Default for DevDvb {
    fn default() -> Self {
        DevDvb::new(DEFAULT_ROOT)
    }
}

impl DeviceTree for DevDvb {
    type Device = Frontend;

    fn list_adapters(&self) -> Result<Vec<u32>> {
        enumerate::list_adapters(&self.root)
    }

    fn list_frontends(&self, adapter: u32) -> Result<Vec<u32>> {
        enumerate::list_frontends(&self.root, adapter)
    }

    fn open(&self, id: DeviceId) -> Result<Frontend> {
        Frontend::open(&self.root, id)
    }
}

/// An open frontend device node.
#[derive(Debug)]
pub struct Frontend {
    file: File,
    path: PathBuf,
}

impl Frontend {
    /// Open a frontend read-only. Status and statistics queries do not need
    /// write access, and a read-only open does not conflict with a process
    /// that is tuning the device.
    pub fn open(root: &Path, id: DeviceId) -> Result<Self> {
        let path = id.path(root);
        let file = File::open(&path).map_err(|source| Error::Open {
            path: path.clone(),
            source,
        })?;
        log::trace!("Opened {:?}", path);
        Ok(Self { file, path })
    }

    /// Release the device. Dropping the handle has the same effect.
    pub fn close(self) {}
}

impl FrontendDevice for Frontend {
    fn read_status(&self) -> Result<Status> {
        sys::read_status(&self.file)
            .map(Status::from_bits)
            .map_err(|source| Error::Io {
                op: "FE_READ_STATUS",
                path: self.path.clone(),
                source,
            })
    }

    fn raw_stats(&self) -> Result<Vec<(StatCommand, ScaledStat)>> {
        let properties =
            sys::get_stat_properties(&self.file, &StatCommand::ALL).map_err(|source| {
                Error::Io {
                    op: "FE_GET_PROPERTY",
                    path: self.path.clone(),
                    source,
                }
            })?;

        let mut records = Vec::with_capacity(properties.len());
        for (command, union) in properties {
            match decode_fe_stats(command, &union) {
                Ok(Some(stat)) => records.push((command, stat)),
                Ok(None) => log::trace!("{:?}: {:?} not supported", self.path, command),
                Err(e) => log::debug!("{:?}: {}", self.path, e),
            }
        }
        Ok(records)
    }
}

impl Drop for Frontend {
    fn drop(&mut self) {
        log::trace!("Closing {:?}", self.path);
    }
}
