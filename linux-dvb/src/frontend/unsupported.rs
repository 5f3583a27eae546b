use std::fs::File;
use std::io::{self, ErrorKind};

use super::DTV_PROPERTY_UNION_SIZE;
use crate::stats::StatCommand;

const UNSUPPORTED_MSG: &str = "DVB frontend ioctls are only available on Linux";

pub(super) fn read_status(_file: &File) -> io::Result<u32> {
    Err(io::Error::new(ErrorKind::Unsupported, UNSUPPORTED_MSG))
}

pub(super) fn get_stat_properties(
    _file: &File,
    _commands: &[StatCommand],
) -> io::Result<Vec<(StatCommand, [u8; DTV_PROPERTY_UNION_SIZE])>> {
    Err(io::Error::new(ErrorKind::Unsupported, UNSUPPORTED_MSG))
}
