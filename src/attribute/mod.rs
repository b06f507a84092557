// Sources:
// - https://dubeyko.com/development/FileSystems/NTFS/ntfsdoc.pdf
// - https://learn.microsoft.com/windows/win32/devnotes/attribute-list-entry

pub mod attribute_list;
pub mod file_name;
pub mod object_id;
pub mod security;
pub mod standard_info;
pub mod volume;

use crate::cursor::EntryCursor;
use crate::err::{DecodeError, Result};
use log::debug;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{self, Display};

pub use attribute_list::AttributeListEntry;
pub use file_name::{FileName, FileNamespace};
pub use object_id::ObjectId;
pub use security::{AceHeader, Acl, SecurityDescriptor, SecurityDescriptorControl};
pub use standard_info::{FileAttributeFlags, StandardInformation};
pub use volume::{VolumeFlags, VolumeInformation};

/// Attribute type codes. Anything unmapped is carried as `Unknown(raw)`.
/// Serialized as the raw 32-bit code so it can key a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AttributeType {
    StandardInformation,
    AttributeList,
    FileName,
    ObjectId,
    SecurityDescriptor,
    VolumeName,
    VolumeInformation,
    Data,
    IndexRoot,
    IndexAllocation,
    EndOfAttributes,
    Unknown(u32),
}

impl AttributeType {
    pub const END_MARKER: u32 = 0xFFFF_FFFF;

    /// The ten types the decoder knows by name, in type-code order.
    pub const KNOWN: [AttributeType; 10] = [
        AttributeType::StandardInformation,
        AttributeType::AttributeList,
        AttributeType::FileName,
        AttributeType::ObjectId,
        AttributeType::SecurityDescriptor,
        AttributeType::VolumeName,
        AttributeType::VolumeInformation,
        AttributeType::Data,
        AttributeType::IndexRoot,
        AttributeType::IndexAllocation,
    ];

    pub fn from_code(code: u32) -> Self {
        match code {
            0x10 => Self::StandardInformation,
            0x20 => Self::AttributeList,
            0x30 => Self::FileName,
            0x40 => Self::ObjectId,
            0x50 => Self::SecurityDescriptor,
            0x60 => Self::VolumeName,
            0x70 => Self::VolumeInformation,
            0x80 => Self::Data,
            0x90 => Self::IndexRoot,
            0xA0 => Self::IndexAllocation,
            Self::END_MARKER => Self::EndOfAttributes,
            other => Self::Unknown(other),
        }
    }

    pub fn code(&self) -> u32 {
        match self {
            Self::StandardInformation => 0x10,
            Self::AttributeList => 0x20,
            Self::FileName => 0x30,
            Self::ObjectId => 0x40,
            Self::SecurityDescriptor => 0x50,
            Self::VolumeName => 0x60,
            Self::VolumeInformation => 0x70,
            Self::Data => 0x80,
            Self::IndexRoot => 0x90,
            Self::IndexAllocation => 0xA0,
            Self::EndOfAttributes => Self::END_MARKER,
            Self::Unknown(raw) => *raw,
        }
    }

    /// Lower-case key used by projections.
    pub fn key(&self) -> String {
        match self {
            Self::StandardInformation => "standard_information".into(),
            Self::AttributeList => "attribute_list".into(),
            Self::FileName => "file_name".into(),
            Self::ObjectId => "object_id".into(),
            Self::SecurityDescriptor => "security_descriptor".into(),
            Self::VolumeName => "volume_name".into(),
            Self::VolumeInformation => "volume_information".into(),
            Self::Data => "data".into(),
            Self::IndexRoot => "index_root".into(),
            Self::IndexAllocation => "index_allocation".into(),
            Self::EndOfAttributes => "end_of_attributes".into(),
            Self::Unknown(raw) => format!("unknown_0x{:X}", raw),
        }
    }
}

impl Serialize for AttributeType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.code())
    }
}

impl<'de> Deserialize<'de> for AttributeType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        u32::deserialize(deserializer).map(AttributeType::from_code)
    }
}

impl Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            AttributeType::StandardInformation => "$STANDARD_INFORMATION",
            AttributeType::AttributeList => "$ATTRIBUTE_LIST",
            AttributeType::FileName => "$FILE_NAME",
            AttributeType::ObjectId => "$OBJECT_ID",
            AttributeType::SecurityDescriptor => "$SECURITY_DESCRIPTOR",
            AttributeType::VolumeName => "$VOLUME_NAME",
            AttributeType::VolumeInformation => "$VOLUME_INFORMATION",
            AttributeType::Data => "$DATA",
            AttributeType::IndexRoot => "$INDEX_ROOT",
            AttributeType::IndexAllocation => "$INDEX_ALLOCATION",
            AttributeType::EndOfAttributes => "END_OF_ATTRIBUTES",
            AttributeType::Unknown(raw) => return write!(f, "UNKNOWN(0x{:X})", raw),
        };
        f.write_str(name)
    }
}

/// Where the attribute value lives.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub enum AttributeForm {
    Resident {
        value_length: u32,
        value_offset: u16,
        resident_flags: u8,
    },
    /// Stored outside the entry. The runs are never resolved.
    NonResident {
        lowest_vcn: u64,
        highest_vcn: u64,
        mapping_pairs_offset: u16,
        compression_unit: u16,
        allocated_size: u64,
        real_size: u64,
        initialized_size: u64,
    },
}

/// Common header preceding every attribute body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AttributeHeader {
    pub type_code: AttributeType,
    pub record_length: u32,
    pub form: AttributeForm,
    pub name_length: u8,
    pub name_offset: u16,
    pub name: Option<String>,
    pub flags: u16,
    pub attribute_id: u16,
}

impl AttributeHeader {
    /// Parse the header starting at the cursor position. `name_offset` and
    /// `value_offset` are relative to that position.
    ///
    /// A name that cannot be read is recorded as `None`; only an underrun in
    /// the fixed prefix fails the header.
    pub fn parse(cursor: &mut EntryCursor) -> Result<Self> {
        let start = cursor.position();
        let type_code = AttributeType::from_code(cursor.read_u32()?);
        let record_length = cursor.read_u32()?;
        let form_code = cursor.read_u8()?;
        let name_length = cursor.read_u8()?;
        let name_offset = cursor.read_u16()?;
        let flags = cursor.read_u16()?;
        let attribute_id = cursor.read_u16()?;

        let form = if form_code == 0 {
            let value_length = cursor.read_u32()?;
            let value_offset = cursor.read_u16()?;
            let resident_flags = cursor.read_u8()?;
            AttributeForm::Resident {
                value_length,
                value_offset,
                resident_flags,
            }
        } else {
            let lowest_vcn = cursor.read_u64()?;
            let highest_vcn = cursor.read_u64()?;
            let mapping_pairs_offset = cursor.read_u16()?;
            let compression_unit = cursor.read_u16()?;
            cursor.skip(4)?;
            let allocated_size = cursor.read_u64()?;
            let real_size = cursor.read_u64()?;
            let initialized_size = cursor.read_u64()?;
            AttributeForm::NonResident {
                lowest_vcn,
                highest_vcn,
                mapping_pairs_offset,
                compression_unit,
                allocated_size,
                real_size,
                initialized_size,
            }
        };

        let name = if name_length > 0 {
            let mut named = cursor.clone();
            match named
                .seek(start + name_offset as usize)
                .and_then(|_| named.read_utf16(name_length as usize))
            {
                Ok(name) => Some(name),
                Err(e) => {
                    debug!("Attribute {} at offset {}: name unreadable ({})", type_code, start, e);
                    None
                }
            }
        } else {
            None
        };

        Ok(Self {
            type_code,
            record_length,
            form,
            name_length,
            name_offset,
            name,
            flags,
            attribute_id,
        })
    }

    pub fn is_resident(&self) -> bool {
        matches!(self.form, AttributeForm::Resident { .. })
    }

    /// Declared size of the value: resident length or non-resident real size.
    pub fn value_size(&self) -> u64 {
        match self.form {
            AttributeForm::Resident { value_length, .. } => u64::from(value_length),
            AttributeForm::NonResident { real_size, .. } => real_size,
        }
    }
}

/// Decoded attribute value, one variant per supported type.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub enum AttributeBody {
    StandardInformation(StandardInformation),
    AttributeList(Vec<AttributeListEntry>),
    FileName(FileName),
    ObjectId(ObjectId),
    SecurityDescriptor(SecurityDescriptor),
    VolumeName(String),
    VolumeInformation(VolumeInformation),
    /// Present in the entry but not decoded: $DATA, index attributes,
    /// unknown types and every non-resident attribute.
    Absent,
}

/// One attribute as found in an entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Attribute {
    /// Offset of the attribute header within the entry.
    pub offset: usize,
    pub header: AttributeHeader,
    pub body: AttributeBody,
}

/// Decode the body of the attribute whose header starts at `attr_start`.
///
/// The value cursor is bounded to the declared value region, clamped to the
/// attribute record, so no body decoder can read into a sibling attribute.
pub fn decode_body(
    cursor: &EntryCursor,
    attr_start: usize,
    header: &AttributeHeader,
) -> Result<AttributeBody> {
    let AttributeForm::Resident {
        value_length,
        value_offset,
        ..
    } = header.form
    else {
        return Ok(AttributeBody::Absent);
    };

    let record = cursor
        .window(attr_start, header.record_length as usize)
        .map_err(|e| e.for_attribute(header.type_code))?;
    let value_start = attr_start + value_offset as usize;
    if value_start > record.end() {
        return Err(DecodeError::AttributeDecodeFailed {
            type_code: header.type_code,
            reason: format!(
                "value offset {} lies outside the {} byte attribute record",
                value_offset, header.record_length
            ),
        });
    }
    let mut value = record
        .window(value_start, value_length as usize)
        .map_err(|e| e.for_attribute(header.type_code))?;
    decode_value(header.type_code, &mut value).map_err(|e| e.for_attribute(header.type_code))
}

fn decode_value(type_code: AttributeType, value: &mut EntryCursor) -> Result<AttributeBody> {
    Ok(match type_code {
        AttributeType::StandardInformation => {
            AttributeBody::StandardInformation(StandardInformation::parse(value)?)
        }
        AttributeType::AttributeList => AttributeBody::AttributeList(attribute_list::parse(value)?),
        AttributeType::FileName => AttributeBody::FileName(FileName::parse(value)?),
        AttributeType::ObjectId => AttributeBody::ObjectId(ObjectId::parse(value)?),
        AttributeType::SecurityDescriptor => {
            AttributeBody::SecurityDescriptor(SecurityDescriptor::parse(value)?)
        }
        AttributeType::VolumeName => AttributeBody::VolumeName(volume::parse_volume_name(value)?),
        AttributeType::VolumeInformation => {
            AttributeBody::VolumeInformation(VolumeInformation::parse(value)?)
        }
        AttributeType::Data
        | AttributeType::IndexRoot
        | AttributeType::IndexAllocation
        | AttributeType::EndOfAttributes
        | AttributeType::Unknown(_) => AttributeBody::Absent,
    })
}
