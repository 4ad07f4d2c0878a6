//! Fixed-format payload decoders (CAN, FlexRay, LIN, GPIO, analog, I2C, Ethernet)
//!
//! Each decoder consumes one clamped payload slice and produces a typed body plus
//! payload-relative diagnostics. Decoders read through [`ByteCursor`] and use `?` on
//! [`OutOfBounds`]; the registry turns such an error into a raw-bytes fallback.
//!
//! [`ByteCursor`]: crate::cursor::ByteCursor

use crate::config::DecoderConfig;
use crate::handoff::{BusKind, SubProtocolHandoff};
use crate::types::{DataTypeTag, DecodedBody, Diagnostic, DiagnosticKind, OutOfBounds};

pub mod analog;
pub mod can;
pub mod ethernet;
pub mod flexray;
pub mod gpio;
pub mod i2c;
pub mod lin;

/// Everything a native decoder may need besides the payload bytes
pub struct PayloadContext<'a> {
    pub data_type: DataTypeTag,
    pub interface_id: u32,
    pub type_flags: u16,
    pub declared_length: u16,
    pub config: &'a DecoderConfig,
    pub handoff: &'a dyn SubProtocolHandoff,
}

impl PayloadContext<'_> {
    /// Bus ID reported to the sub-protocol handoff
    pub fn bus_id(&self) -> u16 {
        self.config.bus_id_for(self.interface_id)
    }

    /// Offer an extracted payload to the sub-protocol collaborator
    pub fn hand_off(&self, bus_kind: BusKind, payload: &[u8]) -> bool {
        let bus_id = self.bus_id();
        let decoded = self.handoff.try_decode(bus_kind, bus_id, payload);
        log::trace!(
            "Handoff {} bus {} ({} bytes): {}",
            bus_kind,
            bus_id,
            payload.len(),
            if decoded { "decoded" } else { "kept opaque" }
        );
        decoded
    }
}

/// Result of decoding one payload
#[derive(Debug, Clone, PartialEq)]
pub struct PayloadOutput {
    pub body: DecodedBody,
    /// Diagnostics with payload-relative offsets
    pub diagnostics: Vec<Diagnostic>,
    pub handed_off: bool,
}

impl PayloadOutput {
    pub fn new(body: DecodedBody) -> Self {
        Self {
            body,
            diagnostics: Vec::new(),
            handed_off: false,
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: Vec<Diagnostic>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn with_handoff(mut self, handed_off: bool) -> Self {
        self.handed_off = handed_off;
        self
    }
}

/// Return type of native decoders
pub type PayloadResult = std::result::Result<PayloadOutput, OutOfBounds>;

/// Clamp a declared sub-payload length to what is available
///
/// Records a `LengthMismatch` at `field_offset` when clamping was necessary.
pub(crate) fn clamp_len(
    declared: usize,
    available: usize,
    field_offset: usize,
    diagnostics: &mut Vec<Diagnostic>,
) -> usize {
    if declared > available {
        log::debug!(
            "Sub-payload length {} at payload offset {} exceeds {} available bytes, clamping",
            declared,
            field_offset,
            available
        );
        diagnostics.push(Diagnostic::new(DiagnosticKind::LengthMismatch, field_offset));
        available
    } else {
        declared
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::handoff::NoHandoff;

    pub(crate) static NO_HANDOFF: NoHandoff = NoHandoff;

    /// Context with default configuration and no handoff
    pub(crate) fn context<'a>(
        config: &'a DecoderConfig,
        data_type: DataTypeTag,
        type_flags: u16,
        payload: &[u8],
    ) -> PayloadContext<'a> {
        PayloadContext {
            data_type,
            interface_id: 1,
            type_flags,
            declared_length: payload.len() as u16,
            config,
            handoff: &NO_HANDOFF,
        }
    }
}
