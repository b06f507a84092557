//! Bounds-checked little-endian reader over an MFT entry buffer.
//!
//! Positions are absolute offsets into the entry. A cursor may be narrowed
//! to a window (an attribute value, an ACL, ...) so that a decoder can never
//! read past the region its header declared. A failed read leaves the
//! position untouched.

use crate::err::{DecodeError, Result};
use crate::time::FileTime;
use crate::types::{FileReference, Guid, Sid};
use byteorder::{ByteOrder, LittleEndian};

#[derive(Debug, Clone)]
pub struct EntryCursor<'a> {
    buf: &'a [u8],
    start: usize,
    end: usize,
    pos: usize,
}

impl<'a> EntryCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            start: 0,
            end: buf.len(),
            pos: 0,
        }
    }

    /// A cursor restricted to `[offset, offset + len)`, clamped to this
    /// cursor's own window. Fails if `offset` lies outside the window.
    pub fn window(&self, offset: usize, len: usize) -> Result<EntryCursor<'a>> {
        if offset < self.start || offset > self.end {
            return Err(DecodeError::BufferUnderrun {
                offset,
                wanted: len,
                remaining: 0,
            });
        }
        let end = offset.saturating_add(len).min(self.end);
        Ok(EntryCursor {
            buf: self.buf,
            start: offset,
            end,
            pos: offset,
        })
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn remaining(&self) -> usize {
        self.end - self.pos
    }

    pub fn seek(&mut self, offset: usize) -> Result<()> {
        if offset < self.start || offset > self.end {
            return Err(DecodeError::BufferUnderrun {
                offset,
                wanted: 0,
                remaining: 0,
            });
        }
        self.pos = offset;
        Ok(())
    }

    pub fn skip(&mut self, count: usize) -> Result<()> {
        self.take(count).map(|_| ())
    }

    fn take(&mut self, wanted: usize) -> Result<&'a [u8]> {
        if wanted > self.remaining() {
            return Err(DecodeError::BufferUnderrun {
                offset: self.pos,
                wanted,
                remaining: self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + wanted];
        self.pos += wanted;
        Ok(slice)
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        self.take(count)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(LittleEndian::read_u64(self.take(8)?))
    }

    /// 48-bit segment number followed by a 16-bit sequence number.
    pub fn read_file_reference(&mut self) -> Result<FileReference> {
        self.read_u64().map(FileReference::from_raw)
    }

    /// Underruns are errors, out-of-range values become `FileTime::Invalid`.
    pub fn read_filetime(&mut self) -> Result<FileTime> {
        self.read_u64().map(FileTime::from_raw)
    }

    pub fn read_guid(&mut self) -> Result<Guid> {
        let bytes = self.read_array::<16>()?;
        Ok(Guid::from_bytes(&bytes))
    }

    pub fn read_sid(&mut self) -> Result<Sid> {
        let checkpoint = self.pos;
        let sid = self.read_sid_fields();
        if sid.is_err() {
            self.pos = checkpoint;
        }
        sid
    }

    fn read_sid_fields(&mut self) -> Result<Sid> {
        let revision = self.read_u8()?;
        let count = self.read_u8()? as usize;
        let identifier_authority = self.read_array::<6>()?;
        let raw = self.take(count * 4)?;
        let sub_authorities = raw.chunks_exact(4).map(LittleEndian::read_u32).collect();
        Ok(Sid {
            revision,
            identifier_authority,
            sub_authorities,
        })
    }

    /// Read `units` UTF-16LE code units. Invalid sequences are replaced with
    /// U+FFFD rather than failing.
    pub fn read_utf16(&mut self, units: usize) -> Result<String> {
        let raw = self.take(units * 2)?;
        let wide: Vec<u16> = raw.chunks_exact(2).map(LittleEndian::read_u16).collect();
        Ok(String::from_utf16_lossy(&wide))
    }
}
