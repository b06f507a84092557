// Sources:
// - https://learn.microsoft.com/windows/win32/api/winnt/ns-winnt-security_descriptor_relative
// - https://learn.microsoft.com/windows/win32/api/winnt/ns-winnt-acl
// - https://learn.microsoft.com/windows/win32/api/winnt/ns-winnt-ace_header

use crate::cursor::EntryCursor;
use crate::err::Result;
use crate::types::Sid;
use bitflags::bitflags;
use log::debug;
use serde::{Deserialize, Serialize};

const ACL_HEADER_SIZE: usize = 8;
const ACE_HEADER_SIZE: usize = 4;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
    pub struct SecurityDescriptorControl: u16 {
        const OWNER_DEFAULTED       = 0x0001;
        const GROUP_DEFAULTED       = 0x0002;
        const DACL_PRESENT          = 0x0004;
        const DACL_DEFAULTED        = 0x0008;
        const SACL_PRESENT          = 0x0010;
        const SACL_DEFAULTED        = 0x0020;
        const DACL_AUTO_INHERIT_REQ = 0x0100;
        const SACL_AUTO_INHERIT_REQ = 0x0200;
        const DACL_AUTO_INHERITED   = 0x0400;
        const SACL_AUTO_INHERITED   = 0x0800;
        const DACL_PROTECTED        = 0x1000;
        const SACL_PROTECTED        = 0x2000;
        const RM_CONTROL_VALID      = 0x4000;
        const SELF_RELATIVE         = 0x8000;
    }
}

/// ACE header only, the ACE body is never decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct AceHeader {
    pub ace_type: u8,
    pub flags: u8,
    pub size: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Acl {
    pub revision: u8,
    pub size: u16,
    pub ace_count: u16,
    pub entries: Vec<AceHeader>,
}

impl Acl {
    /// Walk ACE headers by their declared size. An ACE that would run past
    /// the ACL stops the walk, the entries read so far are kept.
    pub fn parse(cursor: &EntryCursor, offset: usize) -> Result<Self> {
        let mut header = cursor.window(offset, ACL_HEADER_SIZE)?;
        let revision = header.read_u8()?;
        header.skip(1)?;
        let size = header.read_u16()?;
        let ace_count = header.read_u16()?;

        let mut entries = Vec::new();
        let body_start = offset + ACL_HEADER_SIZE;
        let body_len = (size as usize).saturating_sub(ACL_HEADER_SIZE);
        let body = cursor.window(body_start, body_len)?;
        let acl_end = body.end();
        let mut pos = body_start;
        while pos + ACE_HEADER_SIZE <= acl_end {
            let mut ace = body.window(pos, ACE_HEADER_SIZE)?;
            let ace_type = ace.read_u8()?;
            let flags = ace.read_u8()?;
            let ace_size = ace.read_u16()?;
            if (ace_size as usize) < ACE_HEADER_SIZE || pos + ace_size as usize > acl_end {
                debug!("ACE at offset {} declares size {}, ACL walk stopped", pos, ace_size);
                break;
            }
            entries.push(AceHeader {
                ace_type,
                flags,
                size: ace_size,
            });
            pos += ace_size as usize;
        }

        Ok(Self {
            revision,
            size,
            ace_count,
            entries,
        })
    }
}

/// Self-relative security descriptor. Every component is decoded on its own:
/// a bad DACL does not hide the owner or group.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SecurityDescriptor {
    pub revision: u8,
    pub control: SecurityDescriptorControl,
    pub owner_sid: Option<Sid>,
    pub group_sid: Option<Sid>,
    pub sacl: Option<Acl>,
    pub dacl: Option<Acl>,
}

impl SecurityDescriptor {
    /// Component offsets are relative to the start of the descriptor.
    pub fn parse(value: &mut EntryCursor) -> Result<Self> {
        let base = value.position();
        let revision = value.read_u8()?;
        value.skip(1)?;
        let control = SecurityDescriptorControl::from_bits_retain(value.read_u16()?);
        let owner_offset = value.read_u32()? as usize;
        let group_offset = value.read_u32()? as usize;
        let sacl_offset = value.read_u32()? as usize;
        let dacl_offset = value.read_u32()? as usize;
        let value: &EntryCursor = value;

        let sid_at = |offset: usize, what: &str| -> Option<Sid> {
            if offset == 0 {
                return None;
            }
            let mut c = value.clone();
            match c.seek(base.saturating_add(offset)).and_then(|_| c.read_sid()) {
                Ok(sid) => Some(sid),
                Err(e) => {
                    debug!("{} SID at offset {} unreadable: {}", what, offset, e);
                    None
                }
            }
        };
        let acl_at = |offset: usize, what: &str| -> Option<Acl> {
            if offset == 0 {
                return None;
            }
            match Acl::parse(value, base.saturating_add(offset)) {
                Ok(acl) => Some(acl),
                Err(e) => {
                    debug!("{} at offset {} unreadable: {}", what, offset, e);
                    None
                }
            }
        };

        Ok(Self {
            revision,
            control,
            owner_sid: sid_at(owner_offset, "Owner"),
            group_sid: sid_at(group_offset, "Group"),
            sacl: acl_at(sacl_offset, "SACL"),
            dacl: acl_at(dacl_offset, "DACL"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sid_bytes(subs: &[u32]) -> Vec<u8> {
        let mut out = vec![1, subs.len() as u8, 0, 0, 0, 0, 0, 5];
        for s in subs {
            out.extend_from_slice(&s.to_le_bytes());
        }
        out
    }

    fn acl_bytes(ace_sizes: &[u16]) -> Vec<u8> {
        let total: usize = ACL_HEADER_SIZE + ace_sizes.iter().map(|s| *s as usize).sum::<usize>();
        let mut out = vec![2, 0];
        out.extend_from_slice(&(total as u16).to_le_bytes());
        out.extend_from_slice(&(ace_sizes.len() as u16).to_le_bytes());
        out.extend_from_slice(&[0, 0]);
        for size in ace_sizes {
            let mut ace = vec![0u8; *size as usize];
            ace[1] = 0x10;
            ace[2..4].copy_from_slice(&size.to_le_bytes());
            out.extend(ace);
        }
        out
    }

    /// header | owner | group | dacl
    fn descriptor(dacl_offset: Option<u32>) -> Vec<u8> {
        let owner = sid_bytes(&[32, 544]);
        let group = sid_bytes(&[18]);
        let dacl = acl_bytes(&[20, 24]);
        let owner_off = 20u32;
        let group_off = owner_off + owner.len() as u32;
        let dacl_off = group_off + group.len() as u32;
        let mut out = vec![1, 0];
        out.extend_from_slice(&0x8004u16.to_le_bytes());
        out.extend_from_slice(&owner_off.to_le_bytes());
        out.extend_from_slice(&group_off.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&dacl_offset.unwrap_or(dacl_off).to_le_bytes());
        out.extend(owner);
        out.extend(group);
        out.extend(dacl);
        out
    }

    #[test]
    fn decodes_owner_group_and_dacl() {
        let buf = descriptor(None);
        let sd = SecurityDescriptor::parse(&mut EntryCursor::new(&buf)).unwrap();
        assert_eq!(sd.revision, 1);
        assert!(sd.control.contains(SecurityDescriptorControl::DACL_PRESENT));
        assert!(sd.control.contains(SecurityDescriptorControl::SELF_RELATIVE));
        assert_eq!(sd.owner_sid.unwrap().to_string(), "S-1-5-32-544");
        assert_eq!(sd.group_sid.unwrap().to_string(), "S-1-5-18");
        assert_eq!(sd.sacl, None);
        let dacl = sd.dacl.unwrap();
        assert_eq!(dacl.ace_count, 2);
        assert_eq!(dacl.entries.len(), 2);
        assert_eq!(dacl.entries[1].size, 24);
        assert_eq!(dacl.entries[0].flags, 0x10);
    }

    #[test]
    fn out_of_range_dacl_keeps_sids() {
        let buf = descriptor(Some(0x4000));
        let sd = SecurityDescriptor::parse(&mut EntryCursor::new(&buf)).unwrap();
        assert!(sd.owner_sid.is_some());
        assert!(sd.group_sid.is_some());
        assert_eq!(sd.dacl, None);
    }

    #[test]
    fn oversized_ace_keeps_partial_acl() {
        let mut buf = acl_bytes(&[20, 24]);
        // second ACE claims more than the ACL holds
        let second = ACL_HEADER_SIZE + 20;
        buf[second + 2..second + 4].copy_from_slice(&200u16.to_le_bytes());
        let acl = Acl::parse(&EntryCursor::new(&buf), 0).unwrap();
        assert_eq!(acl.entries.len(), 1);
    }
}
