// Sources:
// - https://dubeyko.com/development/FileSystems/NTFS/ntfsdoc.pdf
// - https://en.wikipedia.org/wiki/NTFS

use crate::cursor::EntryCursor;
use crate::err::Result;
use crate::types::FileReference;
use bitflags::bitflags;
use log::debug;
use serde::{Deserialize, Serialize};

/// Size of one MFT entry.
pub const ENTRY_SIZE: usize = 1024;
/// Size of the fixed record header.
pub const ENTRY_HEADER_SIZE: usize = 48;
const SECTOR_SIZE: usize = 512;

/// Classification of the multi-sector magic. Never trusted beyond that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum Signature {
    File,
    Baad,
    Corrupt,
}

impl Signature {
    pub fn from_magic(magic: &[u8; 4]) -> Self {
        match magic {
            b"FILE" => Signature::File,
            b"BAAD" => Signature::Baad,
            _ => Signature::Corrupt,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Signature::File => "FILE",
            Signature::Baad => "BAAD",
            Signature::Corrupt => "CORRUPT",
        }
    }
}

bitflags! {
    /// Only the two low bits have a fixed meaning; other bits are kept raw.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
    pub struct EntryFlags: u16 {
        const ACTIVE    = 0x0001;
        const HAS_INDEX = 0x0002;
    }
}

/// Fixed header found at offset 0 of every entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EntryHeader {
    pub magic: [u8; 4],
    pub signature: Signature,
    pub usa_offset: u16,
    pub usa_count: u16,
    pub log_file_sequence_number: u64,
    pub sequence_number: u16,
    pub reference_count: u16,
    pub first_attribute_offset: u16,
    pub flags: EntryFlags,
    pub used_size: u32,
    pub total_size: u32,
    pub base_record: FileReference,
    pub first_attribute_id: u16,
    pub record_number: u32,
}

impl EntryHeader {
    /// Single fixed-layout read, no branching on content.
    pub fn parse(cursor: &mut EntryCursor) -> Result<Self> {
        let magic = cursor.read_array::<4>()?;
        let usa_offset = cursor.read_u16()?;
        let usa_count = cursor.read_u16()?;
        let log_file_sequence_number = cursor.read_u64()?;
        let sequence_number = cursor.read_u16()?;
        let reference_count = cursor.read_u16()?;
        let first_attribute_offset = cursor.read_u16()?;
        let flags = EntryFlags::from_bits_retain(cursor.read_u16()?);
        let used_size = cursor.read_u32()?;
        let total_size = cursor.read_u32()?;
        let base_record = cursor.read_file_reference()?;
        let first_attribute_id = cursor.read_u16()?;
        cursor.skip(2)?;
        let record_number = cursor.read_u32()?;

        let signature = Signature::from_magic(&magic);
        if signature != Signature::File {
            debug!(
                "Entry {} carries signature {} ({:02X?})",
                record_number,
                signature.as_str(),
                magic
            );
        }

        Ok(Self {
            magic,
            signature,
            usa_offset,
            usa_count,
            log_file_sequence_number,
            sequence_number,
            reference_count,
            first_attribute_offset,
            flags,
            used_size,
            total_size,
            base_record,
            first_attribute_id,
            record_number,
        })
    }

    pub fn is_active(&self) -> bool {
        self.flags.contains(EntryFlags::ACTIVE)
    }

    pub fn has_index(&self) -> bool {
        self.flags.contains(EntryFlags::HAS_INDEX)
    }

    /// `used_size` clamped to the entry, the scan never goes past it.
    pub fn scan_limit(&self) -> usize {
        (self.used_size as usize).min(ENTRY_SIZE)
    }
}

/// Outcome of applying the update-sequence array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum FixupStatus {
    Applied,
    NotPresent,
    /// The array does not fit inside the entry.
    OutOfBounds,
    /// The sector trailer did not carry the update-sequence number.
    Mismatch { sector: usize },
}

// At the end of every 512-byte sector NTFS overwrites the last two bytes with the
// update-sequence number. The original words live in the array after it.
// The buffer is only modified once every sector has been verified.
pub fn apply_fixups(buf: &mut [u8], usa_offset: usize, usa_count: usize) -> FixupStatus {
    if usa_count == 0 {
        return FixupStatus::NotPresent;
    }
    if usa_offset + 2 * usa_count > buf.len() || (usa_count - 1) * SECTOR_SIZE > buf.len() {
        debug!("Update sequence array lies outside the entry, fixups skipped.");
        return FixupStatus::OutOfBounds;
    }

    let usn = [buf[usa_offset], buf[usa_offset + 1]];
    for sector in 1..usa_count {
        let sector_end = sector * SECTOR_SIZE - 2;
        if buf[sector_end] != usn[0] || buf[sector_end + 1] != usn[1] {
            debug!("Bad update sequence number at sector {}, fixups skipped.", sector);
            return FixupStatus::Mismatch { sector };
        }
    }

    for sector in 1..usa_count {
        let sector_end = sector * SECTOR_SIZE - 2;
        let fix_pos = usa_offset + 2 * sector;
        buf[sector_end] = buf[fix_pos];
        buf[sector_end + 1] = buf[fix_pos + 1];
    }
    debug!("Applied {} fixups.", usa_count - 1);
    FixupStatus::Applied
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_header() -> Vec<u8> {
        let mut buf = vec![0u8; ENTRY_SIZE];
        buf[0..4].copy_from_slice(b"FILE");
        buf[4..6].copy_from_slice(&48u16.to_le_bytes());
        buf[6..8].copy_from_slice(&3u16.to_le_bytes());
        buf[8..16].copy_from_slice(&0x1122_3344u64.to_le_bytes());
        buf[16..18].copy_from_slice(&7u16.to_le_bytes());
        buf[18..20].copy_from_slice(&2u16.to_le_bytes());
        buf[20..22].copy_from_slice(&56u16.to_le_bytes());
        buf[22..24].copy_from_slice(&0x0007u16.to_le_bytes());
        buf[24..28].copy_from_slice(&416u32.to_le_bytes());
        buf[28..32].copy_from_slice(&1024u32.to_le_bytes());
        buf[32..40].copy_from_slice(&0x0003_0000_0000_0010u64.to_le_bytes());
        buf[40..42].copy_from_slice(&6u16.to_le_bytes());
        buf[44..48].copy_from_slice(&42u32.to_le_bytes());
        buf
    }

    #[test]
    fn parses_every_field() {
        let buf = raw_header();
        let header = EntryHeader::parse(&mut EntryCursor::new(&buf)).unwrap();
        assert_eq!(header.signature, Signature::File);
        assert_eq!(header.usa_offset, 48);
        assert_eq!(header.usa_count, 3);
        assert_eq!(header.log_file_sequence_number, 0x1122_3344);
        assert_eq!(header.sequence_number, 7);
        assert_eq!(header.reference_count, 2);
        assert_eq!(header.first_attribute_offset, 56);
        assert!(header.is_active());
        assert!(header.has_index());
        assert_eq!(header.flags.bits(), 0x0007);
        assert_eq!(header.used_size, 416);
        assert_eq!(header.total_size, 1024);
        assert_eq!(header.base_record.segment_number, 0x10);
        assert_eq!(header.base_record.sequence_number, 3);
        assert_eq!(header.first_attribute_id, 6);
        assert_eq!(header.record_number, 42);
    }

    #[test]
    fn classifies_signatures() {
        assert_eq!(Signature::from_magic(b"FILE"), Signature::File);
        assert_eq!(Signature::from_magic(b"BAAD"), Signature::Baad);
        assert_eq!(Signature::from_magic(b"\0\0\0\0"), Signature::Corrupt);
    }

    #[test]
    fn short_buffer_is_an_underrun() {
        let buf = raw_header();
        assert!(EntryHeader::parse(&mut EntryCursor::new(&buf[..40])).is_err());
    }

    #[test]
    fn fixups_restore_sector_trailers() {
        let mut buf = raw_header();
        buf[48..50].copy_from_slice(&[0xAB, 0xCD]);
        buf[50..52].copy_from_slice(&[0x11, 0x22]);
        buf[52..54].copy_from_slice(&[0x33, 0x44]);
        buf[510..512].copy_from_slice(&[0xAB, 0xCD]);
        buf[1022..1024].copy_from_slice(&[0xAB, 0xCD]);
        assert_eq!(apply_fixups(&mut buf, 48, 3), FixupStatus::Applied);
        assert_eq!(&buf[510..512], &[0x11, 0x22]);
        assert_eq!(&buf[1022..1024], &[0x33, 0x44]);
    }

    #[test]
    fn fixup_mismatch_leaves_buffer_untouched() {
        let mut buf = raw_header();
        buf[48..50].copy_from_slice(&[0xAB, 0xCD]);
        buf[510..512].copy_from_slice(&[0xAB, 0xCD]);
        let before = buf.clone();
        assert_eq!(
            apply_fixups(&mut buf, 48, 3),
            FixupStatus::Mismatch { sector: 2 }
        );
        assert_eq!(buf, before);
        assert_eq!(apply_fixups(&mut buf, 1020, 3), FixupStatus::OutOfBounds);
        assert_eq!(apply_fixups(&mut buf, 48, 0), FixupStatus::NotPresent);
    }
}
