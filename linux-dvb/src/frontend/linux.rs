use std::fs::File;
use std::io;
use std::os::fd::AsRawFd;

use nix::ioctl_read;

use super::DTV_PROPERTY_UNION_SIZE;
use crate::stats::StatCommand;

/// `struct dtv_property` from `<linux/dvb/frontend.h>`.
///
/// The value union is kept as bytes and decoded separately.
#[repr(C, packed)]
#[derive(Clone, Copy)]
#[allow(dead_code)]
struct DtvProperty {
    cmd: u32,
    reserved: [u32; 3],
    u: [u8; DTV_PROPERTY_UNION_SIZE],
    result: i32,
}

#[cfg(target_pointer_width = "64")]
const _: () = assert!(std::mem::size_of::<DtvProperty>() == 76);
#[cfg(target_pointer_width = "32")]
const _: () = assert!(std::mem::size_of::<DtvProperty>() == 72);

impl DtvProperty {
    fn request(cmd: u32) -> Self {
        Self {
            cmd,
            reserved: [0; 3],
            u: [0; DTV_PROPERTY_UNION_SIZE],
            result: 0,
        }
    }
}

/// `struct dtv_properties`.
#[repr(C)]
struct DtvProperties {
    num: u32,
    props: *mut DtvProperty,
}

ioctl_read!(fe_read_status, b'o', 69, u32);
ioctl_read!(fe_get_property, b'o', 83, DtvProperties);

pub(super) fn read_status(file: &File) -> io::Result<u32> {
    let mut bits: u32 = 0;
    // SAFETY: FE_READ_STATUS writes a single fe_status_t into `bits`.
    unsafe { fe_read_status(file.as_raw_fd(), &mut bits) }?;
    Ok(bits)
}

pub(super) fn get_stat_properties(
    file: &File,
    commands: &[StatCommand],
) -> io::Result<Vec<(StatCommand, [u8; DTV_PROPERTY_UNION_SIZE])>> {
    let mut props: Vec<DtvProperty> = commands
        .iter()
        .map(|c| DtvProperty::request(c.cmd()))
        .collect();
    let mut request = DtvProperties {
        num: props.len() as u32,
        props: props.as_mut_ptr(),
    };

    // SAFETY: `request.props` points at `request.num` initialized properties
    // that outlive the call; the kernel only writes inside them.
    unsafe { fe_get_property(file.as_raw_fd(), &mut request) }?;

    Ok(commands
        .iter()
        .zip(props.iter())
        .map(|(command, prop)| (*command, prop.u))
        .collect())
}
