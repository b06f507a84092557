use crate::cursor::EntryCursor;
use crate::err::Result;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Bits without a name are retained as-is.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
    pub struct VolumeFlags: u16 {
        const DIRTY               = 0x0001;
        const RESIZE_LOG_FILE     = 0x0002;
        const UPGRADE_ON_MOUNT    = 0x0004;
        const MOUNTED_ON_NT4      = 0x0008;
        const DELETE_USN_UNDERWAY = 0x0010;
        const REPAIR_OBJECT_IDS   = 0x0020;
        const MODIFIED_BY_CHKDSK  = 0x8000;
    }
}

/// $VOLUME_INFORMATION (found in entry 3, `$Volume`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct VolumeInformation {
    pub major_version: u8,
    pub minor_version: u8,
    pub flags: VolumeFlags,
}

impl VolumeInformation {
    pub fn parse(value: &mut EntryCursor) -> Result<Self> {
        value.skip(8)?;
        let major_version = value.read_u8()?;
        let minor_version = value.read_u8()?;
        let flags = VolumeFlags::from_bits_retain(value.read_u16()?);
        Ok(Self {
            major_version,
            minor_version,
            flags,
        })
    }

    pub fn is_dirty(&self) -> bool {
        self.flags.contains(VolumeFlags::DIRTY)
    }
}

/// $VOLUME_NAME: the whole value is one UTF-16 string.
pub fn parse_volume_name(value: &mut EntryCursor) -> Result<String> {
    let units = value.remaining() / 2;
    value.read_utf16(units)
}
