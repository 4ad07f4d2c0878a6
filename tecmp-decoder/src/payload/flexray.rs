//! FlexRay payloads
//!
//! ```text
//! Byte 0:   Cycle
//! Byte 1-2: Frame ID
//! Byte 3:   Data length
//! Byte 4-n: Data
//! Trailer:  Header CRC (2 bytes, 11 significant bits), frame CRC (3 bytes)
//! ```

use super::{clamp_len, PayloadContext, PayloadOutput, PayloadResult};
use crate::cursor::ByteCursor;
use crate::handoff::BusKind;
use crate::types::{DecodedBody, Diagnostic, DiagnosticKind, FlexRayFrame};
use bitflags::bitflags;

bitflags! {
    /// Data flags of FlexRay records
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FlexRayFlags: u16 {
        const NULL_FRAME = 0x0001;
        const STARTUP = 0x0002;
        const SYNC = 0x0004;
        const WAKEUP_SYMBOL = 0x0008;
        const PAYLOAD_PREAMBLE = 0x0010;
        const COLLISION_AVOIDANCE = 0x0020;
        const HEADER_CRC_ERROR = 0x1000;
        const FRAME_CRC_ERROR = 0x2000;
        const TX = 0x4000;
        const OVERFLOW = 0x8000;
    }
}

const LENGTH_OFFSET: usize = 3;
const DATA_OFFSET: usize = 4;
const HEADER_CRC_MAX: u16 = 0x07FF;

/// Decode a FlexRay data payload
pub fn decode(payload: &[u8], ctx: &PayloadContext<'_>) -> PayloadResult {
    let cursor = ByteCursor::new(payload);
    let mut diagnostics = Vec::new();

    let cycle = cursor.read_u8(0)?;
    let frame_id = cursor.read_u16(1)?;
    let declared = cursor.read_u8(LENGTH_OFFSET)? as usize;
    let data_len = clamp_len(
        declared,
        cursor.remaining(DATA_OFFSET),
        LENGTH_OFFSET,
        &mut diagnostics,
    );
    let data = cursor.slice(DATA_OFFSET, data_len)?;

    let mut offset = DATA_OFFSET + data_len;
    let header_crc = if cursor.remaining(offset) >= 2 {
        let crc = cursor.read_u16(offset)?;
        if crc > HEADER_CRC_MAX {
            log::debug!("FlexRay header CRC 0x{:X} exceeds 11 bits", crc);
            diagnostics.push(Diagnostic::new(DiagnosticKind::HeaderCrcOverflow, offset));
        }
        offset += 2;
        Some(crc)
    } else {
        None
    };
    let frame_crc = if header_crc.is_some() && cursor.remaining(offset) >= 3 {
        Some(cursor.read_u24(offset)?)
    } else {
        None
    };

    let flags = FlexRayFlags::from_bits_retain(ctx.type_flags);
    let handed_off = ctx.hand_off(BusKind::FlexRay, data);

    let frame = FlexRayFrame {
        cycle,
        frame_id,
        data: data.to_vec(),
        header_crc,
        frame_crc,
        null_frame: flags.contains(FlexRayFlags::NULL_FRAME),
        startup: flags.contains(FlexRayFlags::STARTUP),
        sync: flags.contains(FlexRayFlags::SYNC),
        wakeup_symbol: flags.contains(FlexRayFlags::WAKEUP_SYMBOL),
        payload_preamble: flags.contains(FlexRayFlags::PAYLOAD_PREAMBLE),
        collision_avoidance: flags.contains(FlexRayFlags::COLLISION_AVOIDANCE),
        header_crc_error: flags.contains(FlexRayFlags::HEADER_CRC_ERROR),
        frame_crc_error: flags.contains(FlexRayFlags::FRAME_CRC_ERROR),
    };

    Ok(PayloadOutput::new(DecodedBody::FlexRay(frame))
        .with_diagnostics(diagnostics)
        .with_handoff(handed_off))
}
