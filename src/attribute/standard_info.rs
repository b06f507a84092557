use crate::cursor::EntryCursor;
use crate::err::Result;
use crate::time::FileTime;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// DOS-style file attributes ($STANDARD_INFORMATION and $FILE_NAME).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
    pub struct FileAttributeFlags: u32 {
        const READONLY            = 0x0000_0001;
        const HIDDEN              = 0x0000_0002;
        const SYSTEM              = 0x0000_0004;
        const ARCHIVE             = 0x0000_0020;
        const DEVICE              = 0x0000_0040;
        const NORMAL              = 0x0000_0080;
        const TEMPORARY           = 0x0000_0100;
        const SPARSE_FILE         = 0x0000_0200;
        const REPARSE_POINT       = 0x0000_0400;
        const COMPRESSED          = 0x0000_0800;
        const OFFLINE             = 0x0000_1000;
        const NOT_CONTENT_INDEXED = 0x0000_2000;
        const ENCRYPTED           = 0x0000_4000;
        const DIRECTORY           = 0x1000_0000;
        const INDEX_VIEW          = 0x2000_0000;
    }
}

impl FileAttributeFlags {
    /// "READONLY | HIDDEN", or "None" when no known bit is set.
    pub fn describe(&self) -> String {
        let names: Vec<&str> = self.iter_names().map(|(name, _)| name).collect();
        if names.is_empty() {
            "None".to_string()
        } else {
            names.join(" | ")
        }
    }
}

/// Parsed $STANDARD_INFORMATION (covers v0 & v1, optionally v2).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StandardInformation {
    pub created: FileTime,
    pub modified: FileTime,
    pub mft_modified: FileTime,
    pub accessed: FileTime,
    pub file_attributes: FileAttributeFlags,
    pub max_versions: u32,
    pub version_number: u32,
    pub class_id: u32,
    pub owner_id: Option<u32>,
    pub security_id: Option<u32>,
    pub quota_charged: Option<u64>,
    pub usn: Option<u64>,
}

impl StandardInformation {
    /// The 48-byte NTFS 1.x prefix is required, the 3.x tail is optional.
    pub fn parse(value: &mut EntryCursor) -> Result<Self> {
        let created = value.read_filetime()?;
        let modified = value.read_filetime()?;
        let mft_modified = value.read_filetime()?;
        let accessed = value.read_filetime()?;
        let file_attributes = FileAttributeFlags::from_bits_retain(value.read_u32()?);
        let max_versions = value.read_u32()?;
        let version_number = value.read_u32()?;
        let class_id = value.read_u32()?;
        let owner_id = value.read_u32().ok();
        let security_id = value.read_u32().ok();
        let quota_charged = value.read_u64().ok();
        let usn = value.read_u64().ok();
        Ok(Self {
            created,
            modified,
            mft_modified,
            accessed,
            file_attributes,
            max_versions,
            version_number,
            class_id,
            owner_id,
            security_id,
            quota_charged,
            usn,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::err::DecodeError;

    fn raw(len: usize) -> Vec<u8> {
        let mut buf = vec![0u8; len];
        for (i, t) in [1u64, 2, 3, u64::MAX].iter().enumerate() {
            buf[i * 8..i * 8 + 8].copy_from_slice(&t.to_le_bytes());
        }
        buf[32..36].copy_from_slice(&0x0000_0026u32.to_le_bytes());
        buf
    }

    #[test]
    fn short_layout_leaves_tail_empty() {
        let buf = raw(48);
        let si = StandardInformation::parse(&mut EntryCursor::new(&buf)).unwrap();
        assert!(si.created.is_valid());
        assert!(si.mft_modified.is_valid());
        assert_eq!(si.accessed, FileTime::Invalid(u64::MAX));
        assert!(si.file_attributes.contains(FileAttributeFlags::HIDDEN));
        assert_eq!(si.file_attributes.describe(), "HIDDEN | SYSTEM | ARCHIVE");
        assert_eq!(si.owner_id, None);
        assert_eq!(si.usn, None);
    }

    #[test]
    fn long_layout_reads_tail() {
        let mut buf = raw(72);
        buf[52..56].copy_from_slice(&0x0100u32.to_le_bytes());
        buf[64..72].copy_from_slice(&0xDEADu64.to_le_bytes());
        let si = StandardInformation::parse(&mut EntryCursor::new(&buf)).unwrap();
        assert_eq!(si.owner_id, Some(0));
        assert_eq!(si.security_id, Some(0x0100));
        assert_eq!(si.quota_charged, Some(0));
        assert_eq!(si.usn, Some(0xDEAD));
    }

    #[test]
    fn truncated_prefix_fails() {
        let buf = raw(48);
        let err = StandardInformation::parse(&mut EntryCursor::new(&buf[..20])).unwrap_err();
        assert!(matches!(err, DecodeError::BufferUnderrun { .. }));
    }
}
