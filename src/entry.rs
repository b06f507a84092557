// Sources:
// - https://dubeyko.com/development/FileSystems/NTFS/ntfsdoc.pdf
// - https://en.wikipedia.org/wiki/NTFS

use crate::attribute::{
    self, Attribute, AttributeBody, AttributeHeader, AttributeType, FileName, StandardInformation,
};
use crate::cursor::EntryCursor;
use crate::err::{DecodeError, Result};
use crate::header::{ENTRY_HEADER_SIZE, ENTRY_SIZE, EntryHeader, FixupStatus, apply_fixups};
use crate::types::FileReference;
use log::{debug, warn};
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attributes grouped by type, each group in on-disk order.
pub type AttributeMap = BTreeMap<AttributeType, Vec<Attribute>>;

/// An attribute that was present but whose body failed to decode.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AttributeFailure {
    pub offset: usize,
    pub type_code: AttributeType,
    pub attribute_id: u16,
    pub reason: String,
}

/// Why the attribute scan stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum ScanEnd {
    Terminator,
    /// The next attribute would start or end past `used_size`.
    UsedSizeReached,
    ZeroLength,
    HeaderUnreadable,
}

/// A fully decoded 1 KiB MFT entry. Built once per buffer, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DecodedEntry {
    pub header: EntryHeader,
    /// Hex MD5 of the 1024 raw bytes, taken before fixups are applied.
    pub md5: String,
    pub fixups: FixupStatus,
    pub attributes: AttributeMap,
    pub failures: Vec<AttributeFailure>,
    pub scan_end: ScanEnd,
}

impl DecodedEntry {
    /// Decode one raw entry. Only a buffer too short to hold an entry is
    /// fatal; every attribute-level problem is recorded and skipped.
    pub fn from_bytes(raw: &[u8]) -> Result<Self> {
        if raw.len() < ENTRY_SIZE {
            return Err(DecodeError::EntryHeaderUnreadable {
                len: raw.len(),
                expected: ENTRY_SIZE,
            });
        }
        // we need a private copy so we can patch the USNs in-place
        let mut buf = [0u8; ENTRY_SIZE];
        buf.copy_from_slice(&raw[..ENTRY_SIZE]);
        let md5 = hex::encode(Md5::digest(buf));

        let header = EntryHeader::parse(&mut EntryCursor::new(&buf)).map_err(|_| {
            DecodeError::EntryHeaderUnreadable {
                len: raw.len(),
                expected: ENTRY_SIZE,
            }
        })?;

        let fixups = apply_fixups(
            &mut buf,
            header.usa_offset as usize,
            header.usa_count as usize,
        );
        if matches!(fixups, FixupStatus::Mismatch { .. } | FixupStatus::OutOfBounds) {
            warn!(
                "Entry {}: fixups not applied ({:?}), decoding raw sectors.",
                header.record_number, fixups
            );
        }

        let mut scan = AttributeScan::new(&buf, &header);
        let scan_end = scan.run();

        Ok(Self {
            header,
            md5,
            fixups,
            attributes: scan.attributes,
            failures: scan.failures,
            scan_end,
        })
    }

    /// Attributes of one type, in on-disk order.
    pub fn attributes_of(&self, type_code: AttributeType) -> &[Attribute] {
        self.attributes
            .get(&type_code)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn count(&self, type_code: AttributeType) -> usize {
        self.attributes_of(type_code).len()
    }

    /// Every attribute, in the order it appears in the entry.
    pub fn attributes_in_order(&self) -> Vec<&Attribute> {
        let mut all: Vec<&Attribute> = self.attributes.values().flatten().collect();
        all.sort_by_key(|a| a.offset);
        all
    }

    pub fn standard_information(&self) -> Option<&StandardInformation> {
        self.attributes_of(AttributeType::StandardInformation)
            .iter()
            .find_map(|a| match &a.body {
                AttributeBody::StandardInformation(si) => Some(si),
                _ => None,
            })
    }

    /// Every $FILE_NAME (long, DOS and hard-link names).
    pub fn file_names(&self) -> Vec<&FileName> {
        self.attributes_of(AttributeType::FileName)
            .iter()
            .filter_map(|a| match &a.body {
                AttributeBody::FileName(fname) => Some(fname),
                _ => None,
            })
            .collect()
    }

    /// Return the first (usually long) name, if present.
    pub fn primary_name(&self) -> Option<&str> {
        self.file_names().first().map(|f| f.name.as_str())
    }

    /// Parent directory (from the first $FILE_NAME attribute).
    pub fn parent(&self) -> Option<FileReference> {
        self.file_names().first().map(|f| f.parent)
    }

    pub fn is_active(&self) -> bool {
        self.header.is_active()
    }

    pub fn is_directory(&self) -> bool {
        self.header.has_index()
    }
}

/// Transient scan state, dropped once the entry is built.
struct AttributeScan<'a> {
    cursor: EntryCursor<'a>,
    record_number: u32,
    offset: usize,
    limit: usize,
    attributes: AttributeMap,
    failures: Vec<AttributeFailure>,
}

impl<'a> AttributeScan<'a> {
    fn new(buf: &'a [u8], header: &EntryHeader) -> Self {
        Self {
            cursor: EntryCursor::new(buf),
            record_number: header.record_number,
            offset: header.first_attribute_offset as usize,
            limit: header.scan_limit(),
            attributes: AttributeMap::new(),
            failures: Vec::new(),
        }
    }

    /// Each iteration advances by a strictly positive `record_length` or stops.
    fn run(&mut self) -> ScanEnd {
        if self.offset < ENTRY_HEADER_SIZE {
            debug!(
                "Entry {}: first attribute offset {} overlaps the header",
                self.record_number, self.offset
            );
        }
        loop {
            if self.offset + 4 > self.limit {
                debug!(
                    "Entry {}: reached used size {} at offset {}",
                    self.record_number, self.limit, self.offset
                );
                return ScanEnd::UsedSizeReached;
            }
            match self.step() {
                Some(end) => return end,
                None => continue,
            }
        }
    }

    fn step(&mut self) -> Option<ScanEnd> {
        let start = self.offset;
        let mut cursor = self.cursor.clone();
        let type_code = cursor
            .seek(start)
            .and_then(|_| cursor.read_u32())
            .map(AttributeType::from_code);
        if let Ok(AttributeType::EndOfAttributes) = type_code {
            debug!("Entry {}: end of attributes at {}", self.record_number, start);
            return Some(ScanEnd::Terminator);
        }

        let header = match cursor.seek(start).and_then(|_| AttributeHeader::parse(&mut cursor)) {
            Ok(header) => header,
            Err(e) => {
                debug!(
                    "Entry {}: attribute header at {} unreadable: {}",
                    self.record_number, start, e
                );
                return Some(ScanEnd::HeaderUnreadable);
            }
        };

        let record_length = header.record_length as usize;
        if record_length == 0 {
            debug!(
                "Entry {}: zero length {} attribute at {}",
                self.record_number, header.type_code, start
            );
            return Some(ScanEnd::ZeroLength);
        }
        if start + record_length > self.limit {
            debug!(
                "Entry {}: {} attribute at {} ({} bytes) runs past used size {}",
                self.record_number, header.type_code, start, record_length, self.limit
            );
            return Some(ScanEnd::UsedSizeReached);
        }

        match attribute::decode_body(&self.cursor, start, &header) {
            Ok(body) => {
                self.attributes
                    .entry(header.type_code)
                    .or_default()
                    .push(Attribute {
                        offset: start,
                        header,
                        body,
                    });
            }
            Err(e) => {
                warn!(
                    "Entry {}: {} attribute #{} at offset {} skipped: {}",
                    self.record_number, header.type_code, header.attribute_id, start, e
                );
                self.failures.push(AttributeFailure {
                    offset: start,
                    type_code: header.type_code,
                    attribute_id: header.attribute_id,
                    reason: e.to_string(),
                });
            }
        }

        // the declared length is authoritative, whatever happened to the body
        self.offset = start + record_length;
        None
    }
}
