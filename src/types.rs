use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Reference to another MFT entry (48-bit segment + 16-bit sequence).
/// Never dereferenced by the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
pub struct FileReference {
    pub segment_number: u64,
    pub sequence_number: u16,
}

impl FileReference {
    pub fn from_raw(raw: u64) -> Self {
        Self {
            segment_number: raw & 0x0000_FFFF_FFFF_FFFF,
            sequence_number: (raw >> 48) as u16,
        }
    }
}

impl Display for FileReference {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} (seq {})", self.segment_number, self.sequence_number)
    }
}

/// Mixed-endian GUID as stored by Windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Guid {
    pub data1: u32,
    pub data2: u16,
    pub data3: u16,
    pub data4: [u8; 8],
}

impl Guid {
    pub fn from_bytes(raw: &[u8; 16]) -> Self {
        let mut data4 = [0u8; 8];
        data4.copy_from_slice(&raw[8..16]);
        Self {
            data1: LittleEndian::read_u32(&raw[0..4]),
            data2: LittleEndian::read_u16(&raw[4..6]),
            data3: LittleEndian::read_u16(&raw[6..8]),
            data4,
        }
    }
}

impl Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{:08X}-{:04X}-{:04X}-{:02X}{:02X}-{:02X}{:02X}{:02X}{:02X}{:02X}{:02X}",
            self.data1,
            self.data2,
            self.data3,
            self.data4[0],
            self.data4[1],
            self.data4[2],
            self.data4[3],
            self.data4[4],
            self.data4[5],
            self.data4[6],
            self.data4[7]
        )
    }
}

/// Windows security identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Sid {
    pub revision: u8,
    /// Big-endian 48-bit authority.
    pub identifier_authority: [u8; 6],
    pub sub_authorities: Vec<u32>,
}

impl Sid {
    pub fn authority(&self) -> u64 {
        self.identifier_authority
            .iter()
            .fold(0u64, |acc, b| (acc << 8) | u64::from(*b))
    }
}

impl Display for Sid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "S-{}-{}", self.revision, self.authority())?;
        for sub in &self.sub_authorities {
            write!(f, "-{}", sub)?;
        }
        Ok(())
    }
}
