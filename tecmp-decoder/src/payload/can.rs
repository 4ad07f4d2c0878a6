//! CAN and CAN-FD payloads
//!
//! ```text
//! Byte 0-3: Identifier (bit 31 set = 29-bit extended ID)
//! Byte 4:   Data length
//! Byte 5-n: Data
//! Trailer:  CRC (classic: 2 bytes, 15 bits; FD: 3 bytes, 17 or 21 bits)
//! ```

use super::{clamp_len, PayloadContext, PayloadOutput, PayloadResult};
use crate::cursor::ByteCursor;
use crate::handoff::BusKind;
use crate::registry::DataType;
use crate::types::{CanFrame, DecodedBody};
use bitflags::bitflags;

bitflags! {
    /// Data flags of CAN and CAN-FD records
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CanFlags: u16 {
        const ACK = 0x0001;
        const RTR = 0x0002;
        const ESI = 0x0004;
        const ERROR = 0x0010;
        const BRS = 0x0020;
        const TX = 0x4000;
        const OVERFLOW = 0x8000;
    }
}

const ID_EXTENDED: u32 = 0x8000_0000;
const ID_MASK_29: u32 = 0x1FFF_FFFF;
const ID_MASK_11: u32 = 0x0000_07FF;

const LENGTH_OFFSET: usize = 4;
const DATA_OFFSET: usize = 5;

const CRC15_MASK: u32 = 0x7FFF;
const CRC17_MASK: u32 = 0x1_FFFF;
const CRC21_MASK: u32 = 0x1F_FFFF;
/// CAN-FD frames up to this many data bytes carry a 17-bit CRC
const CRC17_MAX_DATA: usize = 16;

/// Decode a CAN or CAN-FD payload
pub fn decode(payload: &[u8], ctx: &PayloadContext<'_>) -> PayloadResult {
    let cursor = ByteCursor::new(payload);
    let mut diagnostics = Vec::new();
    let fd = ctx.data_type == DataType::CanFdData as u16;

    let raw_id = cursor.read_u32(0)?;
    let extended = raw_id & ID_EXTENDED != 0;
    let id = if extended { raw_id & ID_MASK_29 } else { raw_id & ID_MASK_11 };

    let declared = cursor.read_u8(LENGTH_OFFSET)? as usize;
    let data_len = clamp_len(
        declared,
        cursor.remaining(DATA_OFFSET),
        LENGTH_OFFSET,
        &mut diagnostics,
    );
    let data = cursor.slice(DATA_OFFSET, data_len)?;

    let crc_offset = DATA_OFFSET + data_len;
    let crc = if fd {
        let mask = if data_len <= CRC17_MAX_DATA { CRC17_MASK } else { CRC21_MASK };
        if cursor.remaining(crc_offset) >= 3 {
            Some(cursor.read_u24(crc_offset)? & mask)
        } else {
            None
        }
    } else if cursor.remaining(crc_offset) >= 2 {
        Some(cursor.read_u16(crc_offset)? as u32 & CRC15_MASK)
    } else {
        None
    };

    let flags = CanFlags::from_bits_retain(ctx.type_flags);
    let bus_kind = if fd { BusKind::CanFd } else { BusKind::Can };
    let handed_off = ctx.hand_off(bus_kind, data);

    let frame = CanFrame {
        id,
        extended,
        fd,
        data: data.to_vec(),
        ack: flags.contains(CanFlags::ACK),
        rtr: flags.contains(CanFlags::RTR),
        esi: flags.contains(CanFlags::ESI),
        brs: flags.contains(CanFlags::BRS),
        error_frame: flags.contains(CanFlags::ERROR),
        crc,
    };

    Ok(PayloadOutput::new(DecodedBody::Can(frame))
        .with_diagnostics(diagnostics)
        .with_handoff(handed_off))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DecoderConfig;
    use crate::handoff::SubProtocolHandoff;
    use crate::payload::test_support::context;
    use crate::types::{Diagnostic, DiagnosticKind};

    fn can_payload(raw_id: u32, declared_len: u8, data: &[u8], trailer: &[u8]) -> Vec<u8> {
        let mut payload = raw_id.to_be_bytes().to_vec();
        payload.push(declared_len);
        payload.extend_from_slice(data);
        payload.extend_from_slice(trailer);
        payload
    }

    fn decode_can(payload: &[u8], data_type: DataType, flags: u16) -> PayloadOutput {
        let config = DecoderConfig::default();
        let ctx = context(&config, data_type as u16, flags, payload);
        decode(payload, &ctx).expect("payload long enough")
    }

    fn frame(output: &PayloadOutput) -> &CanFrame {
        match &output.body {
            DecodedBody::Can(frame) => frame,
            other => panic!("Expected CAN body, got {:?}", other),
        }
    }

    #[test]
    fn test_standard_frame_with_ack() {
        let data = [1, 2, 3, 4, 5, 6, 7, 8];
        let payload = can_payload(0x123, 8, &data, &[]);
        let output = decode_can(&payload, DataType::CanData, CanFlags::ACK.bits());
        let frame = frame(&output);

        assert_eq!(frame.id, 0x123);
        assert!(!frame.extended);
        assert!(!frame.fd);
        assert_eq!(frame.data, data.to_vec());
        assert!(frame.ack);
        assert!(!frame.rtr);
        assert_eq!(frame.crc, None);
        assert!(output.diagnostics.is_empty());
    }

    #[test]
    fn test_extended_id() {
        let payload = can_payload(0x8000_0000 | 0x18DA_F110, 0, &[], &[]);
        let output = decode_can(&payload, DataType::CanData, 0);
        let frame = frame(&output);
        assert!(frame.extended);
        assert_eq!(frame.id, 0x18DA_F110);
    }

    #[test]
    fn test_standard_id_ignores_high_bits() {
        let payload = can_payload(0x0000_F923, 0, &[], &[]);
        let output = decode_can(&payload, DataType::CanData, 0);
        assert_eq!(frame(&output).id, 0x123);
    }

    #[test]
    fn test_declared_length_clamped() {
        let payload = can_payload(0x100, 20, &[0xAA, 0xBB, 0xCC, 0xDD], &[]);
        let output = decode_can(&payload, DataType::CanData, 0);

        assert_eq!(frame(&output).data, vec![0xAA, 0xBB, 0xCC, 0xDD]);
        assert_eq!(
            output.diagnostics,
            vec![Diagnostic::new(DiagnosticKind::LengthMismatch, 4)]
        );
    }

    #[test]
    fn test_classic_crc15() {
        let payload = can_payload(0x100, 2, &[0x01, 0x02], &[0xFF, 0xFF]);
        let output = decode_can(&payload, DataType::CanData, 0);
        assert_eq!(frame(&output).crc, Some(0x7FFF));
    }

    #[test]
    fn test_fd_crc_width_depends_on_length() {
        let short = can_payload(0x100, 16, &[0u8; 16], &[0xFF, 0xFF, 0xFF]);
        let output = decode_can(&short, DataType::CanFdData, CanFlags::BRS.bits());
        assert!(frame(&output).fd);
        assert!(frame(&output).brs);
        assert_eq!(frame(&output).crc, Some(0x1_FFFF));

        let long = can_payload(0x100, 20, &[0u8; 20], &[0xFF, 0xFF, 0xFF]);
        let output = decode_can(&long, DataType::CanFdData, 0);
        assert_eq!(frame(&output).crc, Some(0x1F_FFFF));
    }

    #[test]
    fn test_fd_crc_needs_three_bytes() {
        let payload = can_payload(0x100, 1, &[0x01], &[0xAB, 0xCD]);
        let output = decode_can(&payload, DataType::CanFdData, 0);
        assert_eq!(frame(&output).crc, None);
    }

    #[test]
    fn test_truncated_identifier_is_out_of_bounds() {
        let config = DecoderConfig::default();
        let payload = [0x00, 0x00, 0x01];
        let ctx = context(&config, DataType::CanData as u16, 0, &payload);
        let err = decode(&payload, &ctx).unwrap_err();
        assert_eq!(err.offset, 0);
    }

    #[test]
    fn test_handoff_receives_data_and_bus_id() {
        let config = DecoderConfig::default().map_bus_id(1, 42);
        let handoff = |kind: BusKind, bus_id: u16, data: &[u8]| {
            kind == BusKind::Can && bus_id == 42 && data == [0xDE, 0xAD]
        };
        let payload = can_payload(0x7E8, 2, &[0xDE, 0xAD], &[]);
        let ctx = PayloadContext {
            data_type: DataType::CanData as u16,
            interface_id: 1,
            type_flags: 0,
            declared_length: payload.len() as u16,
            config: &config,
            handoff: &handoff as &dyn SubProtocolHandoff,
        };
        let output = decode(&payload, &ctx).unwrap();
        assert!(output.handed_off);
    }
}
