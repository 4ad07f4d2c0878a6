//! GPIO payloads: up to four bytes of digital line levels, decoded positionally

use super::{PayloadContext, PayloadOutput, PayloadResult};
use crate::cursor::ByteCursor;
use crate::types::{DecodedBody, GpioSnapshot};

const MAX_GPIO_BYTES: usize = 4;

pub fn decode(payload: &[u8], _ctx: &PayloadContext<'_>) -> PayloadResult {
    let cursor = ByteCursor::new(payload);
    let bytes = cursor.slice(0, cursor.len().min(MAX_GPIO_BYTES))?;
    let levels = bytes
        .iter()
        .enumerate()
        .fold(0u32, |acc, (i, &b)| acc | (b as u32) << (8 * i));

    Ok(PayloadOutput::new(DecodedBody::Gpio(GpioSnapshot {
        levels,
        line_count: (bytes.len() * 8) as u8,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DecoderConfig;
    use crate::payload::test_support::context;
    use crate::registry::DataType;

    fn decode_gpio(payload: &[u8]) -> GpioSnapshot {
        let config = DecoderConfig::default();
        let ctx = context(&config, DataType::Gpio as u16, 0, payload);
        match decode(payload, &ctx).unwrap().body {
            DecodedBody::Gpio(snapshot) => snapshot,
            other => panic!("Expected GPIO body, got {:?}", other),
        }
    }

    #[test]
    fn test_line_positions() {
        let snapshot = decode_gpio(&[0x01, 0x80]);
        assert_eq!(snapshot.line_count, 16);
        assert_eq!(snapshot.line(0), Some(true));
        assert_eq!(snapshot.line(7), Some(false));
        assert_eq!(snapshot.line(15), Some(true));
        assert_eq!(snapshot.line(16), None);
    }

    #[test]
    fn test_extra_bytes_ignored() {
        let snapshot = decode_gpio(&[0xFF, 0xFF, 0xFF, 0xFF, 0xAA]);
        assert_eq!(snapshot.line_count, 32);
        assert_eq!(snapshot.levels, u32::MAX);
    }

    #[test]
    fn test_empty_payload() {
        let snapshot = decode_gpio(&[]);
        assert_eq!(snapshot.line_count, 0);
        assert!(snapshot.lines().is_empty());
    }
}
