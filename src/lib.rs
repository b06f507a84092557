// Sources:
// - https://dubeyko.com/development/FileSystems/NTFS/ntfsdoc.pdf
// - https://en.wikipedia.org/wiki/NTFS

//! Decode raw 1 KiB NTFS `$MFT` entries into structured records.
//!
//! The decoder is a pure function of one buffer: no I/O and no shared
//! state, so callers may decode entries on as many threads as they like.

pub mod attribute;
pub mod cursor;
pub mod entry;
pub mod err;
pub mod header;
pub mod projection;
pub mod time;
pub mod types;

pub use attribute::{Attribute, AttributeBody, AttributeHeader, AttributeType};
pub use entry::{AttributeFailure, DecodedEntry, ScanEnd};
pub use err::{DecodeError, Result};
pub use header::{ENTRY_SIZE, EntryHeader, Signature};
pub use time::FileTime;

/// Decode one raw entry. See [`DecodedEntry::from_bytes`].
pub fn decode_entry(raw: &[u8]) -> Result<DecodedEntry> {
    DecodedEntry::from_bytes(raw)
}
