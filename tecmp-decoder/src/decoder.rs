//! Main decoder API
//!
//! This module provides the primary interface for the decoder library.
//! The Decoder struct owns the payload registry, the configuration and the
//! sub-protocol handoff, and is the entry point for decoding entry streams,
//! whole TECMP messages and capture files.

use crate::config::DecoderConfig;
use crate::cursor::ByteCursor;
use crate::handoff::{NoHandoff, SubProtocolHandoff};
use crate::message::{
    CounterEvent, Message, MessageBody, MessageHeader, MessageKind, TimeSyncEvent,
    MESSAGE_HEADER_LEN,
};
use crate::registry::{ExternalDecoderFn, PayloadDecoderRegistry};
use crate::types::{DataTypeTag, Record, Result};
use crate::walker::RecordStreamWalker;
use std::path::Path;

/// The main decoder struct - entry point for all decoding operations
///
/// A `Decoder` holds no per-buffer state, so one instance can be shared between
/// threads that each decode their own buffers.
pub struct Decoder {
    registry: PayloadDecoderRegistry,
    config: DecoderConfig,
    handoff: Box<dyn SubProtocolHandoff + Send + Sync>,
}

impl Decoder {
    /// Create a decoder with default configuration and no sub-protocol handoff
    pub fn new() -> Self {
        Self {
            registry: PayloadDecoderRegistry::new(),
            config: DecoderConfig::default(),
            handoff: Box::new(NoHandoff),
        }
    }

    pub fn with_config(mut self, config: DecoderConfig) -> Self {
        self.config = config;
        self
    }

    /// Offer extracted CAN, FlexRay, LIN and Ethernet payloads to `handoff`
    ///
    /// # Example
    /// ```
    /// use tecmp_decoder::{BusKind, Decoder};
    ///
    /// let decoder = Decoder::new().with_handoff(|kind: BusKind, bus_id: u16, payload: &[u8]| {
    ///     println!("{} frame on bus {}: {} bytes", kind, bus_id, payload.len());
    ///     false
    /// });
    /// assert_eq!(decoder.config().max_records, None);
    /// ```
    pub fn with_handoff<H>(mut self, handoff: H) -> Self
    where
        H: SubProtocolHandoff + Send + Sync + 'static,
    {
        self.handoff = Box::new(handoff);
        self
    }

    /// Register an external decoder for a data-type tag
    ///
    /// Returns the decoder previously registered for `tag`, if any.
    pub fn register(
        &mut self,
        tag: DataTypeTag,
        decoder: ExternalDecoderFn,
    ) -> Option<ExternalDecoderFn> {
        self.registry.register(tag, decoder)
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn registry(&self) -> &PayloadDecoderRegistry {
        &self.registry
    }

    /// Lazily walk an entry stream whose records all carry `tag`
    pub fn entries<'a>(&'a self, buf: &'a [u8], tag: DataTypeTag) -> RecordStreamWalker<'a> {
        RecordStreamWalker::new(buf, tag, &self.registry, &self.config, self.handoff.as_ref())
    }

    /// Decode an entry stream into a list of records
    pub fn decode_entries(&self, buf: &[u8], tag: DataTypeTag) -> Vec<Record> {
        self.entries(buf, tag).collect()
    }

    /// Decode one complete TECMP message
    ///
    /// Only a message too short for its header, or an event body too short for its
    /// fields, is an error. Problems inside a log stream are reported as diagnostics.
    ///
    /// # Example
    /// ```
    /// use tecmp_decoder::{Decoder, MessageBody};
    ///
    /// let mut buf = vec![0x00, 0x01, 0x00, 0x01, 0x03, 0x03, 0x00, 0x0A, 0x00, 0x00, 0x00, 0x00];
    /// buf.extend_from_slice(&[0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0x05]);
    ///
    /// let message = Decoder::new().decode_message(&buf).unwrap();
    /// assert_eq!(message.records().len(), 1);
    /// ```
    pub fn decode_message(&self, buf: &[u8]) -> Result<Message> {
        let header = MessageHeader::decode(buf)?;
        let body = ByteCursor::new(buf).tail(MESSAGE_HEADER_LEN);
        log::debug!(
            "Message from device 0x{:04X}: {}, counter {}, {} body bytes",
            header.device_id,
            header.kind(),
            header.counter,
            body.len()
        );

        let body = match header.kind() {
            MessageKind::LogStream => {
                let records = self
                    .entries(buf, header.data_type)
                    .starting_at(MESSAGE_HEADER_LEN)
                    .collect();
                MessageBody::Records(records)
            }
            MessageKind::CounterEvent => MessageBody::CounterEvent(CounterEvent::decode(body)?),
            MessageKind::TimeSyncEvent => {
                MessageBody::TimeSyncEvent(TimeSyncEvent::decode(body)?)
            }
            kind => {
                log::trace!("{} body kept opaque", kind);
                MessageBody::Opaque(body.to_vec())
            }
        };

        Ok(Message { header, body })
    }

    /// Read a file holding one binary TECMP message and decode it
    pub fn decode_file(&self, path: &Path) -> Result<Message> {
        log::info!("Decoding TECMP message file: {:?}", path);
        let buf = std::fs::read(path)?;
        let message = self.decode_message(&buf)?;
        log::info!(
            "Decoded {} message with {} records from {:?}",
            message.kind(),
            message.records().len(),
            path
        );
        Ok(message)
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}
