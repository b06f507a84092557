use crate::attribute::AttributeType;
use crate::cursor::EntryCursor;
use crate::err::Result;
use crate::types::FileReference;
use log::debug;
use serde::{Deserialize, Serialize};

/// Fixed size of an $ATTRIBUTE_LIST entry before its name.
const ENTRY_FIXED_SIZE: usize = 26;

/// One entry of an $ATTRIBUTE_LIST. `base_record` is not followed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AttributeListEntry {
    pub type_code: AttributeType,
    pub record_length: u16,
    pub name: Option<String>,
    pub starting_vcn: u64,
    pub base_record: FileReference,
    pub attribute_id: u16,
}

/// Walk entries until the value is consumed. A malformed entry ends the
/// list; entries decoded before it are kept.
pub fn parse(value: &mut EntryCursor) -> Result<Vec<AttributeListEntry>> {
    let mut entries = Vec::new();
    let mut offset = value.start();
    while offset + ENTRY_FIXED_SIZE <= value.end() {
        let mut entry_cursor = value.window(offset, value.end() - offset)?;
        match parse_entry(&mut entry_cursor) {
            Ok(Some(entry)) => {
                offset += entry.record_length as usize;
                entries.push(entry);
            }
            Ok(None) => break,
            Err(e) => {
                debug!(
                    "Attribute list stopped after {} entries at offset {}: {}",
                    entries.len(),
                    offset,
                    e
                );
                break;
            }
        }
    }
    Ok(entries)
}

fn parse_entry(cursor: &mut EntryCursor) -> Result<Option<AttributeListEntry>> {
    let start = cursor.position();
    let type_code = AttributeType::from_code(cursor.read_u32()?);
    if type_code == AttributeType::EndOfAttributes {
        return Ok(None);
    }
    let record_length = cursor.read_u16()?;
    let name_length = cursor.read_u8()?;
    let name_offset = cursor.read_u8()?;
    let starting_vcn = cursor.read_u64()?;
    let base_record = cursor.read_file_reference()?;
    let attribute_id = cursor.read_u16()?;

    if (record_length as usize) < ENTRY_FIXED_SIZE || record_length as usize > cursor.end() - start
    {
        debug!(
            "Attribute list entry at offset {} declares an inconsistent length {}",
            start, record_length
        );
        return Ok(None);
    }

    let name = if name_length > 0 {
        cursor.seek(start + name_offset as usize)?;
        Some(cursor.read_utf16(name_length as usize)?)
    } else {
        None
    };

    Ok(Some(AttributeListEntry {
        type_code,
        record_length,
        name,
        starting_vcn,
        base_record,
        attribute_id,
    }))
}
