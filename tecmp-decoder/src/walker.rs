//! Record stream walker
//!
//! Iterates over the entries of a log stream body. Each iteration consumes one
//! 16-byte entry header plus its payload (clamped to what is left in the buffer),
//! so a buffer of N bytes yields at most `ceil(N / 16)` iterations whatever the
//! declared lengths say.

use crate::config::DecoderConfig;
use crate::cursor::ByteCursor;
use crate::handoff::SubProtocolHandoff;
use crate::header::{EntryHeaderDecoder, ENTRY_HEADER_LEN};
use crate::payload::{clamp_len, PayloadContext};
use crate::registry::{data_type_name, PayloadDecoderRegistry};
use crate::types::{DataTypeTag, Diagnostic, Record};
use std::collections::HashSet;

/// Offset of the declared-length field inside the entry header
const LENGTH_FIELD_OFFSET: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkerState {
    Scanning,
    Done,
}

/// Lazy iterator over the records of one entry stream
pub struct RecordStreamWalker<'a> {
    cursor: ByteCursor<'a>,
    tag: DataTypeTag,
    registry: &'a PayloadDecoderRegistry,
    config: &'a DecoderConfig,
    handoff: &'a dyn SubProtocolHandoff,
    state: WalkerState,
    iterations: usize,
    emitted: usize,
    warned_tags: HashSet<DataTypeTag>,
}

impl<'a> RecordStreamWalker<'a> {
    pub fn new(
        buf: &'a [u8],
        tag: DataTypeTag,
        registry: &'a PayloadDecoderRegistry,
        config: &'a DecoderConfig,
        handoff: &'a dyn SubProtocolHandoff,
    ) -> Self {
        Self {
            cursor: ByteCursor::new(buf),
            tag,
            registry,
            config,
            handoff,
            state: WalkerState::Scanning,
            iterations: 0,
            emitted: 0,
            warned_tags: HashSet::new(),
        }
    }

    /// Start walking at `offset` instead of the beginning of `buf`
    ///
    /// Record and diagnostic offsets stay relative to `buf`.
    pub fn starting_at(mut self, offset: usize) -> Self {
        self.cursor.advance(offset);
        self
    }

    pub fn state(&self) -> WalkerState {
        self.state
    }

    /// Number of entry headers consumed so far, including filtered ones
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Offset of the next entry header
    pub fn position(&self) -> usize {
        self.cursor.position()
    }

    fn finish(&mut self) -> Option<Record> {
        self.state = WalkerState::Done;
        None
    }

    fn warn_unknown_tag(&mut self) {
        if self.registry.is_unknown(self.tag) && self.warned_tags.insert(self.tag) {
            log::warn!(
                "No decoder for data type 0x{:04X}, payloads kept as raw bytes",
                self.tag
            );
        }
    }
}

impl Iterator for RecordStreamWalker<'_> {
    type Item = Record;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.state == WalkerState::Done {
                return None;
            }
            if let Some(max) = self.config.max_records {
                if self.emitted >= max {
                    log::debug!("Record budget of {} reached", max);
                    return self.finish();
                }
            }

            let offset = self.cursor.position();
            if self.cursor.remaining(offset) < ENTRY_HEADER_LEN {
                return self.finish();
            }
            if EntryHeaderDecoder::is_sentinel(&self.cursor, offset) {
                log::debug!("Zero padding at offset {}, stream done", offset);
                return self.finish();
            }
            let Ok(header) = EntryHeaderDecoder::decode(&self.cursor, offset) else {
                return self.finish();
            };
            self.iterations += 1;

            let payload_start = offset + ENTRY_HEADER_LEN;
            let mut diagnostics = Vec::new();
            let payload_len = clamp_len(
                header.declared_length as usize,
                self.cursor.remaining(payload_start),
                offset + LENGTH_FIELD_OFFSET,
                &mut diagnostics,
            );
            self.cursor.advance(ENTRY_HEADER_LEN + payload_len);

            if !self.config.should_process_interface(header.interface_id) {
                log::trace!(
                    "Skipping record at offset {} from interface {}",
                    offset,
                    header.interface_id
                );
                continue;
            }

            let Ok(payload) = self.cursor.slice(payload_start, payload_len) else {
                return self.finish();
            };
            self.warn_unknown_tag();

            let ctx = PayloadContext {
                data_type: self.tag,
                interface_id: header.interface_id,
                type_flags: header.type_flags,
                declared_length: header.declared_length,
                config: self.config,
                handoff: self.handoff,
            };
            let output = self.registry.decode(payload, &ctx);
            diagnostics.extend(
                output
                    .diagnostics
                    .into_iter()
                    .map(|d| Diagnostic::new(d.kind, payload_start.saturating_add(d.at_offset))),
            );

            log::trace!(
                "Record at offset {}: interface {}, {} bytes of {}",
                offset,
                header.interface_id,
                payload_len,
                data_type_name(self.tag)
            );
            self.emitted += 1;

            return Some(Record {
                offset,
                header,
                tag: self.tag,
                payload_len,
                body: output.body,
                diagnostics,
                handed_off: output.handed_off,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handoff::NoHandoff;
    use crate::registry::DataType;
    use crate::types::{DecodedBody, DiagnosticKind};

    fn entry(interface_id: u32, declared_length: u16, flags: u16, payload: &[u8]) -> Vec<u8> {
        let mut buf = interface_id.to_be_bytes().to_vec();
        buf.extend_from_slice(&1_000u64.to_be_bytes());
        buf.extend_from_slice(&declared_length.to_be_bytes());
        buf.extend_from_slice(&flags.to_be_bytes());
        buf.extend_from_slice(payload);
        buf
    }

    fn walk(buf: &[u8], tag: u16, config: &DecoderConfig) -> (Vec<Record>, WalkerState, usize) {
        let registry = PayloadDecoderRegistry::new();
        let mut walker = RecordStreamWalker::new(buf, tag, &registry, config, &NoHandoff);
        let records: Vec<_> = walker.by_ref().collect();
        (records, walker.state(), walker.iterations())
    }

    #[test]
    fn test_two_gpio_records() {
        let mut buf = entry(1, 1, 0, &[0x01]);
        buf.extend(entry(2, 2, 0, &[0xFF, 0x00]));
        let (records, state, iterations) = walk(&buf, DataType::Gpio as u16, &DecoderConfig::default());

        assert_eq!(records.len(), 2);
        assert_eq!(state, WalkerState::Done);
        assert_eq!(iterations, 2);
        assert_eq!(records[0].offset, 0);
        assert_eq!(records[1].offset, 17);
        assert_eq!(records[1].header.interface_id, 2);
        assert_eq!(records[1].payload_len, 2);
        assert_eq!(records[0].header.timestamp_ns, 1_000);
    }

    #[test]
    fn test_zero_padding_ends_stream() {
        let mut buf = entry(1, 1, 0, &[0x01]);
        buf.extend_from_slice(&[0u8; 16]);
        buf.extend(entry(3, 1, 0, &[0x01]));
        let (records, state, _) = walk(&buf, DataType::Gpio as u16, &DecoderConfig::default());
        assert_eq!(records.len(), 1);
        assert_eq!(state, WalkerState::Done);
    }

    #[test]
    fn test_short_tail_ignored() {
        let mut buf = entry(1, 1, 0, &[0x01]);
        buf.extend_from_slice(&[0xAA; 15]);
        let (records, _, iterations) = walk(&buf, DataType::Gpio as u16, &DecoderConfig::default());
        assert_eq!(records.len(), 1);
        assert_eq!(iterations, 1);
    }

    #[test]
    fn test_declared_length_clamped_to_buffer() {
        let buf = entry(1, 0xFFFF, 0, &[0x01, 0x02]);
        let (records, _, _) = walk(&buf, DataType::Gpio as u16, &DecoderConfig::default());

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].payload_len, 2);
        assert_eq!(
            records[0].diagnostics,
            vec![Diagnostic::new(DiagnosticKind::LengthMismatch, 12)]
        );
    }

    #[test]
    fn test_payload_diagnostics_are_absolute() {
        // CAN payload declaring 20 data bytes with only 4 present
        let mut can = 0x100u32.to_be_bytes().to_vec();
        can.push(20);
        can.extend_from_slice(&[1, 2, 3, 4]);
        let mut buf = entry(1, can.len() as u16, 0, &can);
        buf.extend(entry(1, can.len() as u16, 0, &can));
        let (records, _, _) = walk(&buf, DataType::CanData as u16, &DecoderConfig::default());

        assert_eq!(
            records[0].diagnostics,
            vec![Diagnostic::new(DiagnosticKind::LengthMismatch, 16 + 4)]
        );
        assert_eq!(
            records[1].diagnostics,
            vec![Diagnostic::new(DiagnosticKind::LengthMismatch, 25 + 16 + 4)]
        );
    }

    #[test]
    fn test_truncated_payload_aborts_only_its_record() {
        // Three bytes cannot hold a CAN identifier
        let mut buf = entry(1, 3, 0, &[0x01, 0x02, 0x03]);
        let mut can = 0x123u32.to_be_bytes().to_vec();
        can.extend_from_slice(&[2, 0xAA, 0xBB]);
        buf.extend(entry(1, can.len() as u16, 0, &can));
        let (records, state, _) = walk(&buf, DataType::CanData as u16, &DecoderConfig::default());

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].body, DecodedBody::RawBytes(vec![0x01, 0x02, 0x03]));
        assert_eq!(
            records[0].diagnostics,
            vec![Diagnostic::new(DiagnosticKind::OutOfBounds, 16)]
        );
        assert_eq!(records[1].offset, 19);
        match &records[1].body {
            DecodedBody::Can(frame) => {
                assert_eq!(frame.id, 0x123);
                assert_eq!(frame.data, vec![0xAA, 0xBB]);
            }
            other => panic!("Expected CAN frame, got {:?}", other),
        }
        assert_eq!(state, WalkerState::Done);
    }

    #[test]
    fn test_external_diagnostic_offset_saturates() {
        fn far_away(payload: &[u8], _flags: u16, _len: u16) -> (DecodedBody, Vec<Diagnostic>) {
            (
                DecodedBody::RawBytes(payload.to_vec()),
                vec![Diagnostic::new(DiagnosticKind::UnsupportedEncoding, usize::MAX)],
            )
        }
        let mut registry = PayloadDecoderRegistry::new();
        registry.register(0x0F00, far_away);
        let config = DecoderConfig::default();
        let buf = entry(1, 1, 0, &[0x01]);
        let records: Vec<_> =
            RecordStreamWalker::new(&buf, 0x0F00, &registry, &config, &NoHandoff).collect();

        assert_eq!(records[0].diagnostics[0].at_offset, usize::MAX);
    }

    #[test]
    fn test_unknown_tag_records_raw_bytes() {
        let mut buf = entry(1, 2, 0, &[0xDE, 0xAD]);
        buf.extend(entry(1, 1, 0, &[0xBE]));
        let (records, _, _) = walk(&buf, 0x7777, &DecoderConfig::default());

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].body, DecodedBody::RawBytes(vec![0xDE, 0xAD]));
        assert!(records[0].has_diagnostic(DiagnosticKind::UnknownTag));
        assert_eq!(records[1].diagnostics, vec![Diagnostic::new(DiagnosticKind::UnknownTag, 34)]);
    }

    #[test]
    fn test_max_records_budget() {
        let mut buf = Vec::new();
        for i in 0..5 {
            buf.extend(entry(i, 1, 0, &[0x01]));
        }
        let config = DecoderConfig::default().with_max_records(3);
        let (records, state, _) = walk(&buf, DataType::Gpio as u16, &config);
        assert_eq!(records.len(), 3);
        assert_eq!(state, WalkerState::Done);
    }

    #[test]
    fn test_interface_filter_still_advances() {
        let mut buf = entry(1, 1, 0, &[0x01]);
        buf.extend(entry(2, 1, 0, &[0x02]));
        buf.extend(entry(1, 1, 0, &[0x03]));
        let config = DecoderConfig::default().with_interface_filter(vec![1]);
        let (records, _, iterations) = walk(&buf, DataType::Gpio as u16, &config);

        assert_eq!(records.len(), 2);
        assert_eq!(iterations, 3);
        assert_eq!(records[1].offset, 34);
    }

    #[test]
    fn test_empty_buffer() {
        let (records, state, iterations) = walk(&[], DataType::Gpio as u16, &DecoderConfig::default());
        assert!(records.is_empty());
        assert_eq!(state, WalkerState::Done);
        assert_eq!(iterations, 0);
    }
}
