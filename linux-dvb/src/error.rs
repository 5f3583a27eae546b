//! Error types for DVB device access.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::stats::StatCommand;

/// Errors raised while enumerating or querying frontend devices.
#[derive(Error, Debug)]
pub enum Error {
    /// A device directory could not be listed.
    #[error("Failed to list {}: {source}", path.display())]
    Enumeration {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A frontend device could not be opened.
    #[error("Failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A query ioctl failed on an open frontend.
    #[error("{op} failed on {}: {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A returned statistic record has a shape we do not understand.
    #[error("Malformed {command:?} record: {reason}")]
    Decode { command: StatCommand, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
