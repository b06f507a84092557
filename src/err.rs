use crate::attribute::AttributeType;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DecodeError>;

/// Failures that can occur while decoding a single MFT entry.
///
/// Only `EntryHeaderUnreadable` is fatal for a whole entry. Every other
/// variant is caught by the smallest decoder that can still make progress.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("buffer underrun at offset {offset}: wanted {wanted} bytes, {remaining} remaining")]
    BufferUnderrun {
        offset: usize,
        wanted: usize,
        remaining: usize,
    },

    #[error("FILETIME value 0x{0:016X} is outside the representable calendar range")]
    InvalidTimestamp(u64),

    #[error("failed to decode {type_code} attribute: {reason}")]
    AttributeDecodeFailed {
        type_code: AttributeType,
        reason: String,
    },

    #[error("entry header is unreadable: got {len} bytes, an entry is {expected} bytes")]
    EntryHeaderUnreadable { len: usize, expected: usize },
}

impl DecodeError {
    /// Wrap a lower level failure so it is scoped to one attribute.
    pub fn for_attribute(self, type_code: AttributeType) -> Self {
        match self {
            DecodeError::AttributeDecodeFailed { .. } => self,
            other => DecodeError::AttributeDecodeFailed {
                type_code,
                reason: other.to_string(),
            },
        }
    }
}
