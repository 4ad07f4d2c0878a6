//! Entry header decoding
//!
//! Each record in a TECMP log stream starts with a 16-byte header:
//!
//! ```text
//! Byte 0-3:   Interface ID
//! Byte 4-11:  Timestamp field (bit 63 = not synchronized, bit 62 reserved, rest = ns)
//! Byte 12-13: Declared payload length
//! Byte 14-15: Data flags (layout depends on the data type)
//! ```
//!
//! Header values are accepted as-is; consumers clamp `declared_length` themselves.

use crate::cursor::ByteCursor;
use crate::types::{EntryHeader, OutOfBounds};

/// Size of the entry header including the data-flags word
pub const ENTRY_HEADER_LEN: usize = 16;

const TIMESTAMP_NOT_SYNCED: u64 = 0x8000_0000_0000_0000;
const TIMESTAMP_RESERVED: u64 = 0x4000_0000_0000_0000;
const TIMESTAMP_NS_MASK: u64 = 0x3FFF_FFFF_FFFF_FFFF;

/// Decoder for the fixed per-record header
pub struct EntryHeaderDecoder;

impl EntryHeaderDecoder {
    /// Check whether the 16 bytes at `at` are end-of-stream padding
    ///
    /// Padding is recognised by a zero interface id, zero raw timestamp and zero
    /// declared length; the flag word is not inspected.
    pub fn is_sentinel(cursor: &ByteCursor<'_>, at: usize) -> bool {
        matches!(
            (cursor.read_u32(at), cursor.read_u64(at + 4), cursor.read_u16(at + 12)),
            (Ok(0), Ok(0), Ok(0))
        )
    }

    /// Decode the header starting at `at`
    ///
    /// Only fails if fewer than [`ENTRY_HEADER_LEN`] bytes remain.
    pub fn decode(cursor: &ByteCursor<'_>, at: usize) -> Result<EntryHeader, OutOfBounds> {
        cursor.slice(at, ENTRY_HEADER_LEN)?;

        let interface_id = cursor.read_u32(at)?;
        let timestamp_raw = cursor.read_u64(at + 4)?;
        let declared_length = cursor.read_u16(at + 12)?;
        let type_flags = cursor.read_u16(at + 14)?;

        Ok(EntryHeader {
            interface_id,
            timestamp_ns: timestamp_raw & TIMESTAMP_NS_MASK,
            time_sync_flag: timestamp_raw & TIMESTAMP_NOT_SYNCED != 0,
            timestamp_reserved: timestamp_raw & TIMESTAMP_RESERVED != 0,
            declared_length,
            type_flags,
        })
    }
}
