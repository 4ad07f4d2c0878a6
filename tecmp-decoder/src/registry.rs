//! Data-type tag dispatch
//!
//! Maps a 16-bit data-type tag to the decoder for its payloads. Native decoders are
//! matched on [`DataType`]; callers can add or override tags at runtime with
//! [`PayloadDecoderRegistry::register`]. Dispatch is total: every tag yields a body.

use crate::payload::{self, PayloadContext, PayloadOutput, PayloadResult};
use crate::types::{DataTypeTag, DecodedBody, Diagnostic, DiagnosticKind};
use std::collections::HashMap;
use std::fmt;

/// Signature of an externally registered payload decoder
///
/// Arguments are the payload slice, the record's type flags and its declared length.
/// Diagnostic offsets are relative to the payload.
pub type ExternalDecoderFn = fn(&[u8], u16, u16) -> (DecodedBody, Vec<Diagnostic>);

/// Known data-type tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum DataType {
    None = 0x0000,
    CanRaw = 0x0001,
    CanData = 0x0002,
    CanFdData = 0x0003,
    Lin = 0x0004,
    FlexRayRaw = 0x0007,
    FlexRayData = 0x0008,
    Gpio = 0x000A,
    Rs232Ascii = 0x0010,
    Rs232Raw = 0x0011,
    Rs232Sla = 0x0012,
    Analog = 0x0020,
    AnalogSla = 0x0021,
    AnalogAlt = 0x0022,
    Ethernet = 0x0080,
    EthernetRaw = 0x0081,
    Ethernet10BaseT1s = 0x0082,
    XcpData = 0x00A0,
    MipiCsi2V = 0x0101,
    MipiCsi2L = 0x0102,
    Spi = 0x0103,
    I2c = 0x0104,
}

impl DataType {
    pub fn from_u16(tag: DataTypeTag) -> Option<Self> {
        let data_type = match tag {
            0x0000 => DataType::None,
            0x0001 => DataType::CanRaw,
            0x0002 => DataType::CanData,
            0x0003 => DataType::CanFdData,
            0x0004 => DataType::Lin,
            0x0007 => DataType::FlexRayRaw,
            0x0008 => DataType::FlexRayData,
            0x000A => DataType::Gpio,
            0x0010 => DataType::Rs232Ascii,
            0x0011 => DataType::Rs232Raw,
            0x0012 => DataType::Rs232Sla,
            0x0020 => DataType::Analog,
            0x0021 => DataType::AnalogSla,
            0x0022 => DataType::AnalogAlt,
            0x0080 => DataType::Ethernet,
            0x0081 => DataType::EthernetRaw,
            0x0082 => DataType::Ethernet10BaseT1s,
            0x00A0 => DataType::XcpData,
            0x0101 => DataType::MipiCsi2V,
            0x0102 => DataType::MipiCsi2L,
            0x0103 => DataType::Spi,
            0x0104 => DataType::I2c,
            _ => return None,
        };
        Some(data_type)
    }

    pub fn name(&self) -> &'static str {
        match self {
            DataType::None => "None",
            DataType::CanRaw => "CAN Raw",
            DataType::CanData => "CAN Data",
            DataType::CanFdData => "CAN-FD Data",
            DataType::Lin => "LIN",
            DataType::FlexRayRaw => "FlexRay Raw",
            DataType::FlexRayData => "FlexRay Data",
            DataType::Gpio => "GPIO",
            DataType::Rs232Ascii => "RS232 ASCII",
            DataType::Rs232Raw => "RS232 Raw",
            DataType::Rs232Sla => "RS232 Slave",
            DataType::Analog => "Analog",
            DataType::AnalogSla => "Analog Slave",
            DataType::AnalogAlt => "Analog Alt",
            DataType::Ethernet => "Ethernet",
            DataType::EthernetRaw => "Ethernet Raw",
            DataType::Ethernet10BaseT1s => "Ethernet 10BASE-T1S",
            DataType::XcpData => "XCP Data",
            DataType::MipiCsi2V => "MIPI CSI-2 V",
            DataType::MipiCsi2L => "MIPI CSI-2 L",
            DataType::Spi => "SPI",
            DataType::I2c => "I2C",
        }
    }

    /// Native decoder for this data type, if the core decodes it
    fn native_decoder(&self) -> Option<fn(&[u8], &PayloadContext<'_>) -> PayloadResult> {
        match self {
            DataType::CanData | DataType::CanFdData => Some(payload::can::decode),
            DataType::Lin => Some(payload::lin::decode),
            DataType::FlexRayData => Some(payload::flexray::decode),
            DataType::Gpio => Some(payload::gpio::decode),
            DataType::Analog => Some(payload::analog::decode),
            DataType::AnalogAlt => Some(payload::analog::decode_alt),
            DataType::Ethernet | DataType::Ethernet10BaseT1s => Some(payload::ethernet::decode),
            DataType::EthernetRaw => Some(payload::ethernet::decode_raw),
            DataType::I2c => Some(payload::i2c::decode),
            _ => None,
        }
    }
}

/// Human-readable name for any tag
pub fn data_type_name(tag: DataTypeTag) -> &'static str {
    DataType::from_u16(tag).map_or("Unknown", |t| t.name())
}

/// Tag to decoder dispatch table
#[derive(Clone, Default)]
pub struct PayloadDecoderRegistry {
    extensions: HashMap<DataTypeTag, ExternalDecoderFn>,
}

impl fmt::Debug for PayloadDecoderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<_> = self.extensions.keys().copied().collect();
        tags.sort_unstable();
        f.debug_struct("PayloadDecoderRegistry")
            .field("registered_tags", &tags)
            .finish()
    }
}

impl PayloadDecoderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a decoder for `tag`, returning the previously registered one
    ///
    /// Registered decoders take precedence over native ones.
    pub fn register(
        &mut self,
        tag: DataTypeTag,
        decoder: ExternalDecoderFn,
    ) -> Option<ExternalDecoderFn> {
        log::debug!("Registering external decoder for data type 0x{:04X}", tag);
        self.extensions.insert(tag, decoder)
    }

    pub fn is_registered(&self, tag: DataTypeTag) -> bool {
        self.extensions.contains_key(&tag)
    }

    /// Whether `tag` is neither registered nor a known data type
    pub fn is_unknown(&self, tag: DataTypeTag) -> bool {
        !self.is_registered(tag) && DataType::from_u16(tag).is_none()
    }

    /// Decode one payload. Never fails; problems become diagnostics.
    pub fn decode(&self, payload: &[u8], ctx: &PayloadContext<'_>) -> PayloadOutput {
        let tag = ctx.data_type;

        if let Some(decoder) = self.extensions.get(&tag) {
            log::debug!("Dispatching data type 0x{:04X} to external decoder", tag);
            let (body, diagnostics) = decoder(payload, ctx.type_flags, ctx.declared_length);
            return PayloadOutput::new(body).with_diagnostics(diagnostics);
        }

        let Some(data_type) = DataType::from_u16(tag) else {
            return PayloadOutput::new(DecodedBody::RawBytes(payload.to_vec()))
                .with_diagnostics(vec![Diagnostic::new(DiagnosticKind::UnknownTag, 0)]);
        };

        let Some(decoder) = data_type.native_decoder() else {
            log::debug!("{} payload kept as raw bytes", data_type.name());
            return PayloadOutput::new(DecodedBody::RawBytes(payload.to_vec()));
        };

        match decoder(payload, ctx) {
            Ok(output) => output,
            Err(err) => {
                log::debug!("{} payload not decodable: {}", data_type.name(), err);
                let at_offset = err.offset.min(payload.len());
                PayloadOutput::new(DecodedBody::RawBytes(payload.to_vec()))
                    .with_diagnostics(vec![Diagnostic::new(DiagnosticKind::OutOfBounds, at_offset)])
            }
        }
    }
}
