//! Core types for the TECMP decoder library
//!
//! This module defines all the fundamental types that the decoder emits when walking
//! a TECMP entry stream. Every value here is created, fully populated and handed to the
//! caller within a single decode call; nothing is retained between buffers.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Timestamp type used throughout the decoder
pub type Timestamp = DateTime<Utc>;

/// Result type for decoder operations
pub type Result<T> = std::result::Result<T, DecoderError>;

/// 16-bit data-type discriminant selecting which payload shape follows an entry header
pub type DataTypeTag = u16;

/// A bounds-checked read would have extended past the end of the buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("read of {len} bytes at offset {offset} exceeds buffer of {available} bytes")]
pub struct OutOfBounds {
    /// Offset the read started at
    pub offset: usize,
    /// Number of bytes requested
    pub len: usize,
    /// Total number of bytes in the buffer
    pub available: usize,
}

/// Errors that can occur during decoding
///
/// None of these are raised for malformed entries inside a log stream; those are
/// reported as [`Diagnostic`]s on the affected [`Record`].
#[derive(Debug, thiserror::Error)]
pub enum DecoderError {
    #[error(transparent)]
    OutOfBounds(#[from] OutOfBounds),

    #[error("TECMP message too short: {len} bytes, need at least {needed}")]
    TruncatedMessage { len: usize, needed: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Fixed 16-byte prefix preceding every record in an entry stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EntryHeader {
    /// Capture-module interface the record was observed on
    pub interface_id: u32,
    /// Timestamp in nanoseconds (low 62 bits of the timestamp field)
    pub timestamp_ns: u64,
    /// Bit 63 of the timestamp field; true means the clock was NOT synchronized
    pub time_sync_flag: bool,
    /// Bit 62 of the timestamp field, reserved
    pub timestamp_reserved: bool,
    /// Payload length as declared on the wire. Never trusted without clamping.
    pub declared_length: u16,
    /// Raw type-specific flag word
    pub type_flags: u16,
}

impl EntryHeader {
    /// Data-flags bit set when the capture module dropped data before this record
    pub const FLAG_OVERFLOW: u16 = 0x8000;
    /// Data-flags bit set when the record was transmitted by the capture module itself
    pub const FLAG_TX: u16 = 0x4000;

    /// Convert timestamp from nanoseconds to DateTime<Utc>
    pub fn timestamp(&self) -> Timestamp {
        let secs = (self.timestamp_ns / 1_000_000_000) as i64;
        let nsecs = (self.timestamp_ns % 1_000_000_000) as u32;
        DateTime::from_timestamp(secs, nsecs).unwrap_or_default()
    }

    /// True when the capture module reported its clock as synchronized
    pub fn is_time_synchronized(&self) -> bool {
        !self.time_sync_flag
    }

    /// Overflow bit of the flag word
    pub fn overflow(&self) -> bool {
        self.type_flags & Self::FLAG_OVERFLOW != 0
    }

    /// Transmitted-by-device bit of the flag word
    ///
    /// Analog records reuse bit 14 as part of their sample-time field.
    pub fn transmitted_by_device(&self) -> bool {
        self.type_flags & Self::FLAG_TX != 0
    }
}

/// Kinds of non-fatal problems attached to a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DiagnosticKind {
    /// A declared length exceeded the bytes actually available; the read was clamped
    LengthMismatch,
    /// A CRC field held a value outside its defined bit width
    HeaderCrcOverflow,
    /// No native or registered decoder exists for the data-type tag
    UnknownTag,
    /// A decoder's read would have overrun its payload; the record fell back to raw bytes
    OutOfBounds,
    /// The payload selects an encoding this decoder does not handle
    UnsupportedEncoding,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::LengthMismatch => write!(f, "length mismatch"),
            DiagnosticKind::HeaderCrcOverflow => write!(f, "header CRC overflow"),
            DiagnosticKind::UnknownTag => write!(f, "unknown data type"),
            DiagnosticKind::OutOfBounds => write!(f, "out of bounds"),
            DiagnosticKind::UnsupportedEncoding => write!(f, "unsupported encoding"),
        }
    }
}

/// A non-fatal decode problem
///
/// Decoders report `at_offset` relative to their payload slice; the walker rebases it
/// so that records handed to the caller carry absolute buffer offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub at_offset: usize,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, at_offset: usize) -> Self {
        Self { kind, at_offset }
    }
}

/// One decoded entry of a TECMP log stream
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    /// Offset of the entry header within the input buffer
    pub offset: usize,
    pub header: EntryHeader,
    /// Data-type tag taken from the enclosing message
    pub tag: DataTypeTag,
    /// Payload length after clamping to the bytes actually present
    pub payload_len: usize,
    pub body: DecodedBody,
    pub diagnostics: Vec<Diagnostic>,
    /// True if the external sub-protocol handoff reported a successful decode
    pub handed_off: bool,
}

impl Record {
    /// Get the timestamp of this record
    pub fn timestamp(&self) -> Timestamp {
        self.header.timestamp()
    }

    /// Check whether a diagnostic of the given kind is attached
    pub fn has_diagnostic(&self, kind: DiagnosticKind) -> bool {
        self.diagnostics.iter().any(|d| d.kind == kind)
    }
}

/// Decoded payload of a record; exactly one variant per record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum DecodedBody {
    Can(CanFrame),
    FlexRay(FlexRayFrame),
    Lin(LinFrame),
    Gpio(GpioSnapshot),
    Analog(AnalogSamples),
    I2c(Vec<I2cOperation>),
    Ethernet(EthernetFrameRef),
    /// Payload preserved verbatim
    RawBytes(Vec<u8>),
}

impl DecodedBody {
    /// Short name of the variant, used for logging and text output
    pub fn kind_name(&self) -> &'static str {
        match self {
            DecodedBody::Can(_) => "CAN",
            DecodedBody::FlexRay(_) => "FlexRay",
            DecodedBody::Lin(_) => "LIN",
            DecodedBody::Gpio(_) => "GPIO",
            DecodedBody::Analog(_) => "Analog",
            DecodedBody::I2c(_) => "I2C",
            DecodedBody::Ethernet(_) => "Ethernet",
            DecodedBody::RawBytes(_) => "Raw",
        }
    }
}

/// CAN or CAN-FD frame extracted from a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanFrame {
    /// CAN message ID (11-bit or 29-bit)
    pub id: u32,
    /// True if this is an extended (29-bit) CAN ID
    pub extended: bool,
    /// True if the record came from a CAN-FD data type
    pub fd: bool,
    /// Frame data bytes (clamped to what the record actually carried)
    pub data: Vec<u8>,
    pub ack: bool,
    pub rtr: bool,
    /// Error state indicator (CAN-FD)
    pub esi: bool,
    /// Bit rate switch (CAN-FD)
    pub brs: bool,
    /// The capture module flagged this as an error frame
    pub error_frame: bool,
    /// Trailing CRC (15, 17 or 21 bits), when present
    pub crc: Option<u32>,
}

/// FlexRay frame extracted from a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlexRayFrame {
    pub cycle: u8,
    pub frame_id: u16,
    pub data: Vec<u8>,
    /// Raw 2-byte header CRC; values above 0x7FF carry a `HeaderCrcOverflow` diagnostic
    pub header_crc: Option<u16>,
    /// 24-bit frame CRC
    pub frame_crc: Option<u32>,
    pub null_frame: bool,
    pub startup: bool,
    pub sync: bool,
    pub wakeup_symbol: bool,
    pub payload_preamble: bool,
    pub collision_avoidance: bool,
    pub header_crc_error: bool,
    pub frame_crc_error: bool,
}

/// How a LIN checksum matched the frame contents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LinChecksumKind {
    /// Sum over data bytes only (LIN 1.x, diagnostic frames)
    Classic,
    /// Sum over protected identifier and data bytes (LIN 2.x)
    Enhanced,
    /// Matches neither scheme
    Invalid,
}

/// LIN frame extracted from a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinFrame {
    /// 6-bit frame identifier
    pub id: u8,
    /// The two parity bits as received
    pub parity: u8,
    /// True if the received parity matches the identifier
    pub parity_valid: bool,
    pub data: Vec<u8>,
    pub checksum: Option<u8>,
    pub checksum_kind: Option<LinChecksumKind>,
    pub collision: bool,
    pub parity_error: bool,
    pub no_slave_response: bool,
    pub wakeup: bool,
    pub short_wakeup: bool,
    pub sleep: bool,
}

impl LinFrame {
    /// Protected identifier byte (identifier plus parity bits)
    pub fn protected_id(&self) -> u8 {
        (self.parity << 6) | self.id
    }
}

/// Levels of up to 32 digital input lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GpioSnapshot {
    /// Line `n` is bit `n % 8` of payload byte `n / 8`
    pub levels: u32,
    /// Number of lines present in the payload (8 per byte, at most 32)
    pub line_count: u8,
}

impl GpioSnapshot {
    /// Level of a single line, or None if the payload did not carry it
    pub fn line(&self, index: u8) -> Option<bool> {
        if index < self.line_count {
            Some(self.levels & (1 << index) != 0)
        } else {
            None
        }
    }

    /// All line levels in order
    pub fn lines(&self) -> Vec<bool> {
        (0..self.line_count).map(|i| self.levels & (1 << i) != 0).collect()
    }
}

/// Physical unit of analog samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AnalogUnit {
    Volt,
    Ampere,
    Watt,
    AmpereHour,
    Celsius,
    /// Undefined unit; values are reported unscaled by any unit semantics
    Raw,
}

impl AnalogUnit {
    /// Map a unit selector code to a unit
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => AnalogUnit::Volt,
            1 => AnalogUnit::Ampere,
            2 => AnalogUnit::Watt,
            3 => AnalogUnit::AmpereHour,
            4 => AnalogUnit::Celsius,
            _ => AnalogUnit::Raw,
        }
    }

    /// Engineering unit symbol (e.g., "V", "°C")
    pub fn symbol(&self) -> &'static str {
        match self {
            AnalogUnit::Volt => "V",
            AnalogUnit::Ampere => "A",
            AnalogUnit::Watt => "W",
            AnalogUnit::AmpereHour => "Ah",
            AnalogUnit::Celsius => "°C",
            AnalogUnit::Raw => "",
        }
    }
}

impl fmt::Display for AnalogUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalogUnit::Raw => write!(f, "raw"),
            other => write!(f, "{}", other.symbol()),
        }
    }
}

/// A block of analog samples with their physical values
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalogSamples {
    pub unit: AnalogUnit,
    /// Sampling period in seconds, when the encoding specifies one
    pub sample_interval_s: Option<f64>,
    /// Raw integer samples as read from the wire
    pub raw: Vec<i64>,
    /// Physical values, one per raw sample
    pub values: Vec<f64>,
    /// A sample exceeded the upper threshold
    pub over_threshold: bool,
    /// A sample fell below the lower threshold
    pub under_threshold: bool,
}

/// I2C address width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum I2cAddressing {
    SevenBit,
    TenBit,
}

/// I2C transfer direction (R/W bit of the address byte)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum I2cDirection {
    Write,
    Read,
}

/// Condition that ended an I2C operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum I2cTermination {
    Ack,
    Nack,
    AckRepeatedStart,
    NackRepeatedStart,
    /// The payload ran out before an explicit terminating control byte
    StreamEnd,
}

/// One addressed I2C bus operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct I2cOperation {
    pub address: u16,
    pub addressing: I2cAddressing,
    pub direction: I2cDirection,
    pub bytes: Vec<u8>,
    pub terminated_by: I2cTermination,
}

/// Start-of-frame delimiter found after a raw Ethernet preamble
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StartFrameDelimiter {
    /// Classic 802.3 SFD (0xD5); the frame is handed to the Ethernet collaborator
    Original,
    /// 802.3br verify SMD
    Verify,
    /// 802.3br respond SMD
    Respond,
    /// 802.3br start of preemptable frame, frame counter 0..=3
    Start(u8),
    /// 802.3br continuation fragment, frame counter 0..=3
    Continuation(u8),
    Unknown(u8),
}

/// Ethernet frame carried in a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EthernetFrameRef {
    /// Number of leading 0x55 preamble bytes (always 0 for non-raw data types)
    pub preamble_len: usize,
    /// Delimiter following the preamble (raw Ethernet only)
    pub sfd: Option<StartFrameDelimiter>,
    /// Fragment count byte following a continuation SMD
    pub fragment_count: Option<u8>,
    /// Bytes after preamble, delimiter and fragment count
    pub frame: Vec<u8>,
}
