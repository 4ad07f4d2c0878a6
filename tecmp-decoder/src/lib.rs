//! TECMP Decoder Library
//!
//! A stateless, reusable library for decoding TECMP capture-module traffic: CAN,
//! CAN-FD, LIN, FlexRay, GPIO, analog, I2C and Ethernet records multiplexed into a
//! single framed stream.
//!
//! # Architecture
//!
//! This library is intentionally minimal and focused on decoding:
//! - Walks entry streams with a bounded walker that always makes forward progress
//! - Dispatches each payload on its data-type tag to a fixed-format decoder
//! - Reports malformed input as per-record diagnostics instead of errors
//! - Offers extracted bus payloads to an optional sub-protocol handoff
//!
//! The library does NOT:
//! - Decode the CAN, FlexRay, LIN or Ethernet protocols carried inside records
//! - Render records for display (see the name tables in [`names`])
//! - Read from the network or replay captures
//!
//! All higher-level functionality is in the application layer (tecmp-cli).
//!
//! # Example Usage
//!
//! ```no_run
//! use tecmp_decoder::{Decoder, DecoderConfig, MessageBody};
//! use std::path::Path;
//!
//! let config = DecoderConfig::new()
//!     .with_signed_analog_samples(true)
//!     .with_interface_filter(vec![1, 2]);
//! let decoder = Decoder::new().with_config(config);
//!
//! let message = decoder.decode_file(Path::new("capture.tecmp")).unwrap();
//! if let MessageBody::Records(records) = &message.body {
//!     for record in records {
//!         println!("{} {:?}", record.timestamp(), record.body);
//!     }
//! }
//! ```

// Public modules
pub mod config;
pub mod cursor;
pub mod decoder;
pub mod handoff;
pub mod header;
pub mod message;
pub mod names;
pub mod payload;
pub mod registry;
pub mod types;
pub mod walker;

// Re-export main types for convenience
pub use config::{BusIdMapping, DecoderConfig};
pub use cursor::ByteCursor;
pub use decoder::Decoder;
pub use handoff::{BusKind, NoHandoff, SubProtocolHandoff};
pub use header::{EntryHeaderDecoder, ENTRY_HEADER_LEN};
pub use message::{
    CounterEvent, Message, MessageBody, MessageHeader, MessageKind, TimeSyncEvent,
    TimeSyncStatus,
};
pub use names::{NameCategory, NameConfig, NameResolver, NameTable};
pub use registry::{DataType, ExternalDecoderFn, PayloadDecoderRegistry};
pub use types::{
    AnalogSamples, AnalogUnit, CanFrame, DataTypeTag, DecodedBody, DecoderError, Diagnostic,
    DiagnosticKind, EntryHeader, EthernetFrameRef, FlexRayFrame, GpioSnapshot, I2cAddressing,
    I2cDirection, I2cOperation, I2cTermination, LinChecksumKind, LinFrame, OutOfBounds, Record,
    Result, StartFrameDelimiter, Timestamp,
};
pub use walker::{RecordStreamWalker, WalkerState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
