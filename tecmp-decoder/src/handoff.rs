//! Hand-off of extracted payloads to full protocol decoders
//!
//! The core only extracts a bounded payload and its bus metadata. Decoding the CAN,
//! FlexRay, LIN or Ethernet content itself is left to a collaborator implementing
//! [`SubProtocolHandoff`].

use serde::Serialize;
use std::fmt;

/// Bus family of a payload handed off for further decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BusKind {
    Can,
    CanFd,
    FlexRay,
    Lin,
    Ethernet,
}

impl fmt::Display for BusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusKind::Can => write!(f, "CAN"),
            BusKind::CanFd => write!(f, "CAN-FD"),
            BusKind::FlexRay => write!(f, "FlexRay"),
            BusKind::Lin => write!(f, "LIN"),
            BusKind::Ethernet => write!(f, "Ethernet"),
        }
    }
}

/// Collaborator that attempts to decode an extracted sub-payload
///
/// Returns true if it decoded the payload; on false the record keeps its
/// payload as opaque bytes.
pub trait SubProtocolHandoff {
    fn try_decode(&self, bus_kind: BusKind, bus_id: u16, payload: &[u8]) -> bool;
}

/// Handoff that never decodes anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHandoff;

impl SubProtocolHandoff for NoHandoff {
    fn try_decode(&self, _bus_kind: BusKind, _bus_id: u16, _payload: &[u8]) -> bool {
        false
    }
}

impl<F> SubProtocolHandoff for F
where
    F: Fn(BusKind, u16, &[u8]) -> bool,
{
    fn try_decode(&self, bus_kind: BusKind, bus_id: u16, payload: &[u8]) -> bool {
        self(bus_kind, bus_id, payload)
    }
}
