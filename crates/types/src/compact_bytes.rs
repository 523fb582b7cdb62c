//! LSP2 `CompactBytesArray` codec
//!
//! Each element is prefixed with its length as a 2-byte big-endian integer:
//! `len(e0) ‖ e0 ‖ len(e1) ‖ e1 ‖ ...`. The empty byte string is a valid,
//! empty array.

use crate::Bytes;
use thiserror::Error;

/// Largest element a 2-byte length prefix can describe
pub const MAX_ELEMENT_LEN: usize = u16::MAX as usize;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompactBytesError {
    #[error("truncated length prefix at offset {offset}")]
    TruncatedLength { offset: usize },

    #[error("element at offset {offset} declares {length} bytes but only {available} remain")]
    ElementOutOfBounds {
        offset: usize,
        length: usize,
        available: usize,
    },

    #[error("element of {length} bytes does not fit a 2-byte length prefix")]
    ElementTooLong { length: usize },
}

/// Lazily walks the elements of an encoded array.
///
/// Yields an error once and then stops when the encoding is malformed.
#[derive(Debug, Clone)]
pub struct CompactBytesIter<'a> {
    data: &'a [u8],
    offset: usize,
    failed: bool,
}

impl<'a> Iterator for CompactBytesIter<'a> {
    type Item = Result<&'a [u8], CompactBytesError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.data.len() {
            return None;
        }

        let offset = self.offset;
        let remaining = &self.data[offset..];
        if remaining.len() < 2 {
            self.failed = true;
            return Some(Err(CompactBytesError::TruncatedLength { offset }));
        }

        let length = u16::from_be_bytes([remaining[0], remaining[1]]) as usize;
        let available = remaining.len() - 2;
        if length > available {
            self.failed = true;
            return Some(Err(CompactBytesError::ElementOutOfBounds {
                offset,
                length,
                available,
            }));
        }

        self.offset += 2 + length;
        Some(Ok(&remaining[2..2 + length]))
    }
}

/// Iterate over the elements of `data` without allocating
pub fn iter(data: &[u8]) -> CompactBytesIter<'_> {
    CompactBytesIter {
        data,
        offset: 0,
        failed: false,
    }
}

/// Decode every element, failing on the first malformed one
pub fn decode(data: &[u8]) -> Result<Vec<&[u8]>, CompactBytesError> {
    iter(data).collect()
}

/// Encode `items` as a `CompactBytesArray`
pub fn encode<I, T>(items: I) -> Result<Bytes, CompactBytesError>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let mut out = Vec::new();
    for item in items {
        let item = item.as_ref();
        let length = u16::try_from(item.len())
            .map_err(|_| CompactBytesError::ElementTooLong { length: item.len() })?;
        out.extend_from_slice(&length.to_be_bytes());
        out.extend_from_slice(item);
    }
    Ok(out.into())
}
