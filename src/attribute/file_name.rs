use crate::attribute::standard_info::FileAttributeFlags;
use crate::cursor::EntryCursor;
use crate::err::Result;
use crate::time::FileTime;
use crate::types::FileReference;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum FileNamespace {
    Posix,
    Win32,
    Dos,
    Win32AndDos,
    Unknown(u8),
}

impl FileNamespace {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => FileNamespace::Posix,
            1 => FileNamespace::Win32,
            2 => FileNamespace::Dos,
            3 => FileNamespace::Win32AndDos,
            other => FileNamespace::Unknown(other),
        }
    }
}

/// Parsed $FILE_NAME attribute.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FileName {
    pub parent: FileReference,
    pub created: FileTime,
    pub modified: FileTime,
    pub mft_modified: FileTime,
    pub accessed: FileTime,
    pub allocated_size: u64,
    pub real_size: u64,
    pub flags: FileAttributeFlags,
    pub reparse_value: u32,
    pub namespace: FileNamespace,
    pub name: String,
}

impl FileName {
    /// 66 fixed bytes followed by `name_length` UTF-16 code units.
    pub fn parse(value: &mut EntryCursor) -> Result<Self> {
        let parent = value.read_file_reference()?;
        let created = value.read_filetime()?;
        let modified = value.read_filetime()?;
        let mft_modified = value.read_filetime()?;
        let accessed = value.read_filetime()?;
        let allocated_size = value.read_u64()?;
        let real_size = value.read_u64()?;
        let flags = FileAttributeFlags::from_bits_retain(value.read_u32()?);
        let reparse_value = value.read_u32()?;
        let name_length = value.read_u8()?;
        let namespace = FileNamespace::from_raw(value.read_u8()?);
        let name = value.read_utf16(name_length as usize)?;
        Ok(Self {
            parent,
            created,
            modified,
            mft_modified,
            accessed,
            allocated_size,
            real_size,
            flags,
            reparse_value,
            namespace,
            name,
        })
    }
}
