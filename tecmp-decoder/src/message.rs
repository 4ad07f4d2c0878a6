//! TECMP message framing
//!
//! Every TECMP message starts with a 12-byte header:
//!
//! ```text
//! Byte 0-1:   Device ID
//! Byte 2-3:   Counter
//! Byte 4:     Version
//! Byte 5:     Message type
//! Byte 6-7:   Data type (tag of every entry in a log stream)
//! Byte 8-9:   Reserved
//! Byte 10-11: Device flags
//! ```
//!
//! Log stream messages carry an entry stream; counter and time-sync events carry a
//! small fixed body. All other message kinds are returned opaque.

use crate::cursor::ByteCursor;
use crate::registry::data_type_name;
use crate::types::{DataTypeTag, DecoderError, OutOfBounds, Record, Result};
use bitflags::bitflags;
use serde::Serialize;
use std::fmt;

pub const MESSAGE_HEADER_LEN: usize = 12;

bitflags! {
    /// Device flags of the message header
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DeviceFlags: u16 {
        const END_OF_SEGMENT = 0x0001;
        const START_OF_SEGMENT = 0x0002;
        const SPY = 0x0004;
        const MULTI_FRAME = 0x0008;
        const DEVICE_OVERFLOW = 0x8000;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MessageKind {
    ControlMessage,
    StatusDevice,
    StatusBus,
    LogStream,
    StatusConfig,
    ReplayData,
    CounterEvent,
    TimeSyncEvent,
    Unknown(u8),
}

impl MessageKind {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0x00 => MessageKind::ControlMessage,
            0x01 => MessageKind::StatusDevice,
            0x02 => MessageKind::StatusBus,
            0x03 => MessageKind::LogStream,
            0x04 => MessageKind::StatusConfig,
            0x0A => MessageKind::ReplayData,
            0x0B => MessageKind::CounterEvent,
            0x0C => MessageKind::TimeSyncEvent,
            other => MessageKind::Unknown(other),
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageKind::ControlMessage => write!(f, "Control Message"),
            MessageKind::StatusDevice => write!(f, "Status Device"),
            MessageKind::StatusBus => write!(f, "Status Bus"),
            MessageKind::LogStream => write!(f, "Log Stream"),
            MessageKind::StatusConfig => write!(f, "Status Configuration"),
            MessageKind::ReplayData => write!(f, "Replay Data"),
            MessageKind::CounterEvent => write!(f, "Counter Event"),
            MessageKind::TimeSyncEvent => write!(f, "TimeSync Event"),
            MessageKind::Unknown(value) => write!(f, "Unknown (0x{:02X})", value),
        }
    }
}

/// Outer TECMP message header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MessageHeader {
    pub device_id: u16,
    pub counter: u16,
    pub version: u8,
    pub message_type: u8,
    pub data_type: DataTypeTag,
    pub reserved: u16,
    pub device_flags: u16,
}

impl MessageHeader {
    /// Decode the header at the start of `buf`
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < MESSAGE_HEADER_LEN {
            return Err(DecoderError::TruncatedMessage {
                len: buf.len(),
                needed: MESSAGE_HEADER_LEN,
            });
        }
        let cursor = ByteCursor::new(buf);
        Ok(Self {
            device_id: cursor.read_u16(0)?,
            counter: cursor.read_u16(2)?,
            version: cursor.read_u8(4)?,
            message_type: cursor.read_u8(5)?,
            data_type: cursor.read_u16(6)?,
            reserved: cursor.read_u16(8)?,
            device_flags: cursor.read_u16(10)?,
        })
    }

    pub fn kind(&self) -> MessageKind {
        MessageKind::from_u8(self.message_type)
    }

    pub fn flags(&self) -> DeviceFlags {
        DeviceFlags::from_bits_retain(self.device_flags)
    }

    pub fn data_type_name(&self) -> &'static str {
        data_type_name(self.data_type)
    }

    pub fn end_of_segment(&self) -> bool {
        self.flags().contains(DeviceFlags::END_OF_SEGMENT)
    }

    pub fn start_of_segment(&self) -> bool {
        self.flags().contains(DeviceFlags::START_OF_SEGMENT)
    }

    pub fn spy(&self) -> bool {
        self.flags().contains(DeviceFlags::SPY)
    }

    pub fn multi_frame(&self) -> bool {
        self.flags().contains(DeviceFlags::MULTI_FRAME)
    }

    /// The capture module dropped data before this message
    pub fn device_overflow(&self) -> bool {
        self.flags().contains(DeviceFlags::DEVICE_OVERFLOW)
    }
}

/// Counter event: the capture module noticed a gap in a bus message counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CounterEvent {
    pub device_id: u16,
    pub interface_id: u16,
    pub expected: u16,
    pub received: u16,
}

impl CounterEvent {
    pub fn decode(body: &[u8]) -> std::result::Result<Self, OutOfBounds> {
        let cursor = ByteCursor::new(body);
        Ok(Self {
            device_id: cursor.read_u16(0)?,
            interface_id: cursor.read_u16(2)?,
            expected: cursor.read_u16(4)?,
            received: cursor.read_u16(6)?,
        })
    }

    /// Number of counter values skipped, modulo 2^16
    pub fn lost(&self) -> u16 {
        self.received.wrapping_sub(self.expected)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TimeSyncStatus {
    Unknown,
    Synchronized,
    NotSynchronized,
    Reserved(u8),
}

impl TimeSyncStatus {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => TimeSyncStatus::Unknown,
            1 => TimeSyncStatus::Synchronized,
            2 => TimeSyncStatus::NotSynchronized,
            other => TimeSyncStatus::Reserved(other),
        }
    }
}

/// Time-sync event: the synchronization state of an interface changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeSyncEvent {
    pub device_id: u16,
    pub interface_id: u16,
    pub reserved: u8,
    pub status: TimeSyncStatus,
}

impl TimeSyncEvent {
    pub fn decode(body: &[u8]) -> std::result::Result<Self, OutOfBounds> {
        let cursor = ByteCursor::new(body);
        Ok(Self {
            device_id: cursor.read_u16(0)?,
            interface_id: cursor.read_u16(2)?,
            reserved: cursor.read_u8(4)?,
            status: TimeSyncStatus::from_u8(cursor.read_u8(5)?),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum MessageBody {
    Records(Vec<Record>),
    CounterEvent(CounterEvent),
    TimeSyncEvent(TimeSyncEvent),
    /// Body of a message kind that is not decoded
    Opaque(Vec<u8>),
}

/// One decoded TECMP message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub header: MessageHeader,
    pub body: MessageBody,
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        self.header.kind()
    }

    /// Records of a log stream message, empty for every other kind
    pub fn records(&self) -> &[Record] {
        match &self.body {
            MessageBody::Records(records) => records,
            _ => &[],
        }
    }
}
