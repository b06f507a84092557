use crate::cursor::EntryCursor;
use crate::err::Result;
use crate::types::Guid;
use serde::{Deserialize, Serialize};

/// $OBJECT_ID: up to four GUIDs, usually only the first is present.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ObjectId {
    pub object_id: Option<Guid>,
    pub birth_volume_id: Option<Guid>,
    pub birth_object_id: Option<Guid>,
    pub domain_id: Option<Guid>,
}

impl ObjectId {
    /// Each GUID is read only if a full 16 bytes remain.
    pub fn parse(value: &mut EntryCursor) -> Result<Self> {
        let mut next = || value.read_guid().ok();
        Ok(Self {
            object_id: next(),
            birth_volume_id: next(),
            birth_object_id: next(),
            domain_id: next(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_value_has_only_object_id() {
        let mut buf = vec![0x11u8; 16];
        buf.extend([0x22u8; 10]);
        let oid = ObjectId::parse(&mut EntryCursor::new(&buf)).unwrap();
        assert_eq!(
            oid.object_id.map(|g| g.to_string()).as_deref(),
            Some("11111111-1111-1111-1111-111111111111")
        );
        assert_eq!(oid.birth_volume_id, None);
        assert_eq!(oid.domain_id, None);
    }

    #[test]
    fn full_value_has_all_four() {
        let buf = [0xABu8; 64];
        let oid = ObjectId::parse(&mut EntryCursor::new(&buf)).unwrap();
        assert!(oid.object_id.is_some());
        assert!(oid.birth_volume_id.is_some());
        assert!(oid.birth_object_id.is_some());
        assert!(oid.domain_id.is_some());
    }
}
