//! LIN payloads
//!
//! ```text
//! Byte 0:   Protected identifier (bits 0-5 ID, bits 6-7 parity)
//! Byte 1:   Data length
//! Byte 2-n: Data
//! Trailer:  Checksum (1 byte)
//! ```

use super::{clamp_len, PayloadContext, PayloadOutput, PayloadResult};
use crate::cursor::ByteCursor;
use crate::handoff::BusKind;
use crate::types::{DecodedBody, LinChecksumKind, LinFrame};
use bitflags::bitflags;

bitflags! {
    /// Data flags of LIN records
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LinFlags: u16 {
        const COLLISION = 0x0001;
        const PARITY_ERROR = 0x0002;
        const NO_SLAVE_RESPONSE = 0x0004;
        const WAKEUP = 0x0008;
        const SHORT_WAKEUP = 0x0010;
        const SLEEP = 0x0020;
        const TX = 0x4000;
        const OVERFLOW = 0x8000;
    }
}

const LIN_ID_MASK: u8 = 0x3F;
const LENGTH_OFFSET: usize = 1;
const DATA_OFFSET: usize = 2;
/// Master request / slave response frames always use the classic checksum
const DIAGNOSTIC_IDS: [u8; 2] = [0x3C, 0x3D];

/// Decode a LIN payload
pub fn decode(payload: &[u8], ctx: &PayloadContext<'_>) -> PayloadResult {
    let cursor = ByteCursor::new(payload);
    let mut diagnostics = Vec::new();

    let pid = cursor.read_u8(0)?;
    let id = pid & LIN_ID_MASK;
    let parity = pid >> 6;

    let declared = cursor.read_u8(LENGTH_OFFSET)? as usize;
    let data_len = clamp_len(
        declared,
        cursor.remaining(DATA_OFFSET),
        LENGTH_OFFSET,
        &mut diagnostics,
    );
    let data = cursor.slice(DATA_OFFSET, data_len)?;

    let checksum_offset = DATA_OFFSET + data_len;
    let checksum = if data_len > 0 && cursor.remaining(checksum_offset) >= 1 {
        Some(cursor.read_u8(checksum_offset)?)
    } else {
        None
    };
    let checksum_kind = checksum.map(|c| classify_checksum(pid, data, c));

    let flags = LinFlags::from_bits_retain(ctx.type_flags);
    let handed_off = ctx.hand_off(BusKind::Lin, data);

    let frame = LinFrame {
        id,
        parity,
        parity_valid: calculate_parity(id) == pid & !LIN_ID_MASK,
        data: data.to_vec(),
        checksum,
        checksum_kind,
        collision: flags.contains(LinFlags::COLLISION),
        parity_error: flags.contains(LinFlags::PARITY_ERROR),
        no_slave_response: flags.contains(LinFlags::NO_SLAVE_RESPONSE),
        wakeup: flags.contains(LinFlags::WAKEUP),
        short_wakeup: flags.contains(LinFlags::SHORT_WAKEUP),
        sleep: flags.contains(LinFlags::SLEEP),
    };

    Ok(PayloadOutput::new(DecodedBody::Lin(frame))
        .with_diagnostics(diagnostics)
        .with_handoff(handed_off))
}

/// Parity bits (P0 at bit 6, P1 at bit 7) for a 6-bit identifier
fn calculate_parity(id: u8) -> u8 {
    let p0 = (id ^ (id >> 1) ^ (id >> 2) ^ (id >> 4)) & 1;
    let p1 = !((id >> 1) ^ (id >> 3) ^ (id >> 4) ^ (id >> 5)) & 1;
    (p0 << 6) | (p1 << 7)
}

/// Inverted modulo-256 sum with end-around carry
fn carry_sum(seed: u8, data: &[u8]) -> u8 {
    let mut sum: u16 = seed as u16;
    for &byte in data {
        sum += byte as u16;
        if sum > 0xFF {
            sum = (sum & 0xFF) + 1;
        }
    }
    !(sum as u8)
}

fn classify_checksum(pid: u8, data: &[u8], checksum: u8) -> LinChecksumKind {
    let classic = carry_sum(0, data);
    if DIAGNOSTIC_IDS.contains(&(pid & LIN_ID_MASK)) {
        return if checksum == classic {
            LinChecksumKind::Classic
        } else {
            LinChecksumKind::Invalid
        };
    }

    if checksum == carry_sum(pid, data) {
        LinChecksumKind::Enhanced
    } else if checksum == classic {
        LinChecksumKind::Classic
    } else {
        LinChecksumKind::Invalid
    }
}
