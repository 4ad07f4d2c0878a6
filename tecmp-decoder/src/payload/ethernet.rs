//! Ethernet payloads
//!
//! Ethernet and 10BASE-T1S records carry a complete frame that goes straight to the
//! Ethernet collaborator. Raw Ethernet records start on the wire level:
//!
//! ```text
//! 0x55 .. 0x55   Preamble
//! SFD / SMD      Start delimiter (0xD5 or an 802.3br SMD)
//! [frag count]   Only after SMD-C
//! frame bytes
//! ```

use super::{PayloadContext, PayloadOutput, PayloadResult};
use crate::cursor::ByteCursor;
use crate::handoff::BusKind;
use crate::types::{DecodedBody, EthernetFrameRef, StartFrameDelimiter};

const PREAMBLE_BYTE: u8 = 0x55;
const SFD: u8 = 0xD5;
const SMD_VERIFY: u8 = 0x07;
const SMD_RESPOND: u8 = 0x19;
/// SMD-S0..S3; the fragment counter uses the same encoding
const SMD_START: [u8; 4] = [0xE6, 0x4C, 0x7F, 0xB3];
const SMD_CONTINUATION: [u8; 4] = [0x61, 0x52, 0x9E, 0x2A];

/// Decode a frame-level Ethernet payload (Ethernet, 10BASE-T1S)
pub fn decode(payload: &[u8], ctx: &PayloadContext<'_>) -> PayloadResult {
    let cursor = ByteCursor::new(payload);
    let frame = cursor.tail(0);
    let handed_off = ctx.hand_off(BusKind::Ethernet, frame);

    Ok(PayloadOutput::new(DecodedBody::Ethernet(EthernetFrameRef {
        preamble_len: 0,
        sfd: None,
        fragment_count: None,
        frame: frame.to_vec(),
    }))
    .with_handoff(handed_off))
}

/// Decode a raw Ethernet payload, detecting preamble and start delimiter
///
/// Only frames behind the original SFD are offered to the Ethernet collaborator.
pub fn decode_raw(payload: &[u8], ctx: &PayloadContext<'_>) -> PayloadResult {
    let cursor = ByteCursor::new(payload);
    let preamble_len = payload.iter().take_while(|&&b| b == PREAMBLE_BYTE).count();

    let mut offset = preamble_len;
    let sfd = if cursor.remaining(offset) > 0 {
        let delimiter = classify_delimiter(cursor.read_u8(offset)?);
        offset += 1;
        Some(delimiter)
    } else {
        None
    };

    let mut fragment_count = None;
    if let Some(StartFrameDelimiter::Continuation(_)) = sfd {
        if cursor.remaining(offset) > 0 {
            fragment_count = frame_counter(cursor.read_u8(offset)?);
            offset += 1;
        }
    }

    let frame = cursor.tail(offset);
    let handed_off = match sfd {
        Some(StartFrameDelimiter::Original) => ctx.hand_off(BusKind::Ethernet, frame),
        Some(other) => {
            log::debug!("Raw Ethernet delimiter {:?} recorded without decoding", other);
            false
        }
        None => false,
    };

    Ok(PayloadOutput::new(DecodedBody::Ethernet(EthernetFrameRef {
        preamble_len,
        sfd,
        fragment_count,
        frame: frame.to_vec(),
    }))
    .with_handoff(handed_off))
}

fn frame_counter(byte: u8) -> Option<u8> {
    SMD_START.iter().position(|&b| b == byte).map(|i| i as u8)
}

fn classify_delimiter(byte: u8) -> StartFrameDelimiter {
    match byte {
        SFD => StartFrameDelimiter::Original,
        SMD_VERIFY => StartFrameDelimiter::Verify,
        SMD_RESPOND => StartFrameDelimiter::Respond,
        _ => {
            if let Some(n) = frame_counter(byte) {
                StartFrameDelimiter::Start(n)
            } else if let Some(n) = SMD_CONTINUATION.iter().position(|&b| b == byte) {
                StartFrameDelimiter::Continuation(n as u8)
            } else {
                StartFrameDelimiter::Unknown(byte)
            }
        }
    }
}
