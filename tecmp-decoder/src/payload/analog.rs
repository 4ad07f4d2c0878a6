//! Analog sample payloads
//!
//! Plain analog records carry a sequence of 16-bit samples; the data flags select the
//! sample period, a decimal scale factor and the physical unit:
//!
//! ```text
//! Bit 15:     Overflow
//! Bit 11-14:  Sample time code
//! Bit 7-8:    Factor code (0.1, 0.01, 0.001, 0.0001)
//! Bit 2-4:    Unit code (V, A, W, Ah, °C, raw)
//! Bit 1:      Under threshold
//! Bit 0:      Over threshold
//! ```
//!
//! The alternative encoding carries its own 16-byte prefix:
//!
//! ```text
//! Byte 0-1:   Flags (bits 0-1: 0 = i16 samples, 1 = i32 samples)
//! Byte 2:     Unit code
//! Byte 3:     Reserved
//! Byte 4-7:   Sample interval in seconds (f32)
//! Byte 8-11:  Offset (f32)
//! Byte 12-15: Scalar (f32)
//! Byte 16-n:  Samples, value = raw * scalar + offset
//! ```

use super::{PayloadContext, PayloadOutput, PayloadResult};
use crate::cursor::ByteCursor;
use crate::types::{AnalogSamples, AnalogUnit, DecodedBody, Diagnostic, DiagnosticKind};
use bitflags::bitflags;

bitflags! {
    /// Single-bit data flags of analog records
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AnalogFlags: u16 {
        const OVER_THRESHOLD = 0x0001;
        const UNDER_THRESHOLD = 0x0002;
        const OVERFLOW = 0x8000;
    }
}

const SAMPLE_TIME_MASK: u16 = 0x7800;
const SAMPLE_TIME_SHIFT: u16 = 11;
const FACTOR_MASK: u16 = 0x0180;
const FACTOR_SHIFT: u16 = 7;
const UNIT_MASK: u16 = 0x001C;
const UNIT_SHIFT: u16 = 2;

const FACTORS: [f64; 4] = [0.1, 0.01, 0.001, 0.0001];

/// Sample period per sample time code; code 0 is unspecified
const SAMPLE_TIMES_S: [Option<f64>; 16] = [
    None,
    Some(2.5),
    Some(1.0),
    Some(0.5),
    Some(0.25),
    Some(0.1),
    Some(0.05),
    Some(0.025),
    Some(0.01),
    Some(0.005),
    Some(0.0025),
    Some(0.001),
    Some(0.0005),
    Some(0.00025),
    Some(0.0001),
    Some(0.00005),
];

const ALT_PREFIX_LEN: usize = 16;
const ALT_DATATYPE_MASK: u16 = 0x0003;

/// Scale factor selected by the data flags
pub fn scale_factor(type_flags: u16) -> f64 {
    FACTORS[((type_flags & FACTOR_MASK) >> FACTOR_SHIFT) as usize]
}

/// Unit selected by the data flags
pub fn unit(type_flags: u16) -> AnalogUnit {
    AnalogUnit::from_code(((type_flags & UNIT_MASK) >> UNIT_SHIFT) as u8)
}

/// Sample period in seconds selected by the data flags
pub fn sample_interval(type_flags: u16) -> Option<f64> {
    SAMPLE_TIMES_S[((type_flags & SAMPLE_TIME_MASK) >> SAMPLE_TIME_SHIFT) as usize]
}

/// Decode a plain analog payload
///
/// A trailing odd byte is not a sample and is ignored.
pub fn decode(payload: &[u8], ctx: &PayloadContext<'_>) -> PayloadResult {
    let cursor = ByteCursor::new(payload);
    let factor = scale_factor(ctx.type_flags);
    let count = cursor.len() / 2;

    let mut raw = Vec::with_capacity(count);
    for i in 0..count {
        let sample = if ctx.config.analog_samples_signed {
            cursor.read_i16(i * 2)? as i64
        } else {
            cursor.read_u16(i * 2)? as i64
        };
        raw.push(sample);
    }
    let values = raw.iter().map(|&r| factor * r as f64).collect();

    let flags = AnalogFlags::from_bits_retain(ctx.type_flags);
    Ok(PayloadOutput::new(DecodedBody::Analog(AnalogSamples {
        unit: unit(ctx.type_flags),
        sample_interval_s: sample_interval(ctx.type_flags),
        raw,
        values,
        over_threshold: flags.contains(AnalogFlags::OVER_THRESHOLD),
        under_threshold: flags.contains(AnalogFlags::UNDER_THRESHOLD),
    })))
}

/// Decode an analog-alt payload
pub fn decode_alt(payload: &[u8], _ctx: &PayloadContext<'_>) -> PayloadResult {
    let cursor = ByteCursor::new(payload);
    let mut diagnostics = Vec::new();

    let flags = cursor.read_u16(0)?;
    let unit = AnalogUnit::from_code(cursor.read_u8(2)?);
    let interval = cursor.read_f32(4)?;
    let offset = cursor.read_f32(8)? as f64;
    let scalar = cursor.read_f32(12)? as f64;

    let width = match flags & ALT_DATATYPE_MASK {
        0 => Some(2),
        1 => Some(4),
        other => {
            log::debug!("Unsupported analog-alt sample datatype {}", other);
            diagnostics.push(Diagnostic::new(DiagnosticKind::UnsupportedEncoding, 0));
            None
        }
    };

    let mut raw = Vec::new();
    if let Some(width) = width {
        let count = cursor.remaining(ALT_PREFIX_LEN) / width;
        raw.reserve(count);
        for i in 0..count {
            let at = ALT_PREFIX_LEN + i * width;
            let sample = if width == 2 {
                cursor.read_i16(at)? as i64
            } else {
                cursor.read_i32(at)? as i64
            };
            raw.push(sample);
        }
    }
    let values = raw.iter().map(|&r| r as f64 * scalar + offset).collect();

    Ok(PayloadOutput::new(DecodedBody::Analog(AnalogSamples {
        unit,
        sample_interval_s: Some(interval as f64),
        raw,
        values,
        over_threshold: false,
        under_threshold: false,
    }))
    .with_diagnostics(diagnostics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DecoderConfig;
    use crate::payload::test_support::context;
    use crate::registry::DataType;

    const FACTOR_0_01: u16 = 1 << FACTOR_SHIFT;

    fn samples(output: PayloadOutput) -> AnalogSamples {
        match output.body {
            DecodedBody::Analog(samples) => samples,
            other => panic!("Expected analog body, got {:?}", other),
        }
    }

    fn alt_payload(flags: u16, unit: u8, interval: f32, offset: f32, scalar: f32) -> Vec<u8> {
        let mut payload = flags.to_be_bytes().to_vec();
        payload.push(unit);
        payload.push(0);
        payload.extend_from_slice(&interval.to_be_bytes());
        payload.extend_from_slice(&offset.to_be_bytes());
        payload.extend_from_slice(&scalar.to_be_bytes());
        payload
    }

    #[test]
    fn test_scaled_volts() {
        let config = DecoderConfig::default();
        let payload = 1234i16.to_be_bytes();
        let ctx = context(&config, DataType::Analog as u16, FACTOR_0_01, &payload);
        let samples = samples(decode(&payload, &ctx).unwrap());

        assert_eq!(samples.unit, AnalogUnit::Volt);
        assert_eq!(samples.raw, vec![1234]);
        assert!((samples.values[0] - 12.34).abs() < 1e-9);
    }

    #[test]
    fn test_signed_versus_unsigned_samples() {
        let payload = [0xFF, 0xFE];
        let signed = DecoderConfig::default();
        let ctx = context(&signed, DataType::Analog as u16, 0, &payload);
        assert_eq!(samples(decode(&payload, &ctx).unwrap()).raw, vec![-2]);

        let unsigned = DecoderConfig::default().with_signed_analog_samples(false);
        let ctx = context(&unsigned, DataType::Analog as u16, 0, &payload);
        assert_eq!(samples(decode(&payload, &ctx).unwrap()).raw, vec![65534]);
    }

    #[test]
    fn test_dangling_byte_not_a_sample() {
        let config = DecoderConfig::default();
        let payload = [0x00, 0x0A, 0x00, 0x14, 0x7F];
        let ctx = context(&config, DataType::Analog as u16, 0, &payload);
        let samples = samples(decode(&payload, &ctx).unwrap());
        assert_eq!(samples.raw, vec![10, 20]);
        assert_eq!(samples.values.len(), 2);
    }

    #[test]
    fn test_flag_fields() {
        // sample time code 11 (1 ms), factor 0.001, unit °C, over threshold
        let flags = (11 << SAMPLE_TIME_SHIFT) | (2 << FACTOR_SHIFT) | (4 << UNIT_SHIFT) | 0x0001;
        assert_eq!(sample_interval(flags), Some(0.001));
        assert_eq!(scale_factor(flags), 0.001);
        assert_eq!(unit(flags), AnalogUnit::Celsius);
        assert_eq!(unit(7 << UNIT_SHIFT), AnalogUnit::Raw);

        let config = DecoderConfig::default();
        let ctx = context(&config, DataType::Analog as u16, flags, &[]);
        let samples = samples(decode(&[], &ctx).unwrap());
        assert!(samples.over_threshold);
        assert!(!samples.under_threshold);
        assert!(samples.raw.is_empty());
    }

    #[test]
    fn test_alt_int16_samples() {
        let mut payload = alt_payload(0, 1, 0.5, 1.0, 0.5);
        payload.extend_from_slice(&(-4i16).to_be_bytes());
        payload.extend_from_slice(&10i16.to_be_bytes());
        payload.push(0xEE);

        let config = DecoderConfig::default();
        let ctx = context(&config, DataType::AnalogAlt as u16, 0, &payload);
        let samples = samples(decode_alt(&payload, &ctx).unwrap());

        assert_eq!(samples.unit, AnalogUnit::Ampere);
        assert_eq!(samples.sample_interval_s, Some(0.5));
        assert_eq!(samples.raw, vec![-4, 10]);
        assert_eq!(samples.values, vec![-1.0, 6.0]);
    }

    #[test]
    fn test_alt_int32_samples() {
        let mut payload = alt_payload(1, 0, 0.001, -2.0, 2.0);
        payload.extend_from_slice(&100_000i32.to_be_bytes());

        let config = DecoderConfig::default();
        let ctx = context(&config, DataType::AnalogAlt as u16, 0, &payload);
        let samples = samples(decode_alt(&payload, &ctx).unwrap());

        assert_eq!(samples.raw, vec![100_000]);
        assert_eq!(samples.values, vec![199_998.0]);
    }

    #[test]
    fn test_alt_unsupported_datatype() {
        let mut payload = alt_payload(2, 0, 1.0, 0.0, 1.0);
        payload.extend_from_slice(&[0, 1, 0, 2]);

        let config = DecoderConfig::default();
        let ctx = context(&config, DataType::AnalogAlt as u16, 0, &payload);
        let output = decode_alt(&payload, &ctx).unwrap();

        assert_eq!(
            output.diagnostics,
            vec![Diagnostic::new(DiagnosticKind::UnsupportedEncoding, 0)]
        );
        assert!(samples(output).raw.is_empty());
    }

    #[test]
    fn test_alt_short_prefix_is_out_of_bounds() {
        let payload = alt_payload(0, 0, 1.0, 0.0, 1.0);
        let config = DecoderConfig::default();
        let ctx = context(&config, DataType::AnalogAlt as u16, 0, &payload[..10]);
        assert!(decode_alt(&payload[..10], &ctx).is_err());
    }
}
