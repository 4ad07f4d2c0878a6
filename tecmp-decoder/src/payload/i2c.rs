//! I2C bus operation segmentation
//!
//! I2C records have no length fields. The payload is a byte stream in which every
//! address or data byte is followed by a control byte:
//!
//! ```text
//! 0x00  NACK
//! 0x01  ACK
//! 0x02  NACK + repeated start
//! 0x03  ACK + repeated start
//! ```
//!
//! Operation boundaries are inferred from these control values alone. 10-bit
//! addresses take a second address byte, and the usual "write address, repeated
//! start, read" sequence of a 10-bit device is folded into a single read operation.

use super::{PayloadContext, PayloadOutput, PayloadResult};
use crate::cursor::ByteCursor;
use crate::types::{
    DecodedBody, I2cAddressing, I2cDirection, I2cOperation, I2cTermination, OutOfBounds,
};

const CONTROL_NACK: u8 = 0x00;
const CONTROL_NACK_RS: u8 = 0x02;
const CONTROL_ACK_RS: u8 = 0x03;

const TEN_BIT_MASK: u8 = 0xF8;
const TEN_BIT_PREFIX: u8 = 0xF0;

/// Parsing state of [`I2cStreamDecoder`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum I2cState {
    AwaitAddress,
    AwaitControl,
    TenBitAddrByte2,
    AwaitControl2,
    TransferBytes,
    Done,
}

/// Interpretation of a control byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Continue,
    Nack,
    RepeatedStart(I2cTermination),
}

impl Control {
    fn from_byte(byte: u8) -> Self {
        match byte {
            CONTROL_NACK => Control::Nack,
            CONTROL_NACK_RS => Control::RepeatedStart(I2cTermination::NackRepeatedStart),
            CONTROL_ACK_RS => Control::RepeatedStart(I2cTermination::AckRepeatedStart),
            _ => Control::Continue,
        }
    }
}

/// Operation under construction
struct Pending {
    address: u16,
    addressing: I2cAddressing,
    direction: I2cDirection,
    first_byte: u8,
    needs_second_byte: bool,
    bytes: Vec<u8>,
}

impl Pending {
    fn finish(self, terminated_by: I2cTermination) -> I2cOperation {
        I2cOperation {
            address: self.address,
            addressing: self.addressing,
            direction: self.direction,
            bytes: self.bytes,
            terminated_by,
        }
    }
}

fn direction(byte: u8) -> I2cDirection {
    if byte & 0x01 == 0 {
        I2cDirection::Write
    } else {
        I2cDirection::Read
    }
}

/// State machine splitting one payload into I2C operations
pub struct I2cStreamDecoder<'a> {
    cursor: ByteCursor<'a>,
    pos: usize,
    state: I2cState,
    pending: Option<Pending>,
    operations: Vec<I2cOperation>,
}

impl<'a> I2cStreamDecoder<'a> {
    pub fn new(payload: &'a [u8]) -> Self {
        Self {
            cursor: ByteCursor::new(payload),
            pos: 0,
            state: I2cState::AwaitAddress,
            pending: None,
            operations: Vec::new(),
        }
    }

    pub fn state(&self) -> I2cState {
        self.state
    }

    /// Run the machine to completion and return the operations found
    pub fn run(mut self) -> Result<Vec<I2cOperation>, OutOfBounds> {
        while self.state != I2cState::Done {
            self.step()?;
        }
        if self.cursor.remaining(self.pos) > 0 {
            log::debug!(
                "I2C stream ended with {} unconsumed bytes",
                self.cursor.remaining(self.pos)
            );
        }
        Ok(self.operations)
    }

    fn next_byte(&mut self) -> Result<Option<u8>, OutOfBounds> {
        if self.cursor.remaining(self.pos) == 0 {
            return Ok(None);
        }
        let byte = self.cursor.read_u8(self.pos)?;
        self.pos += 1;
        Ok(Some(byte))
    }

    /// Close the pending operation and move to `next`
    fn finish(&mut self, terminated_by: I2cTermination, next: I2cState) {
        if let Some(pending) = self.pending.take() {
            self.operations.push(pending.finish(terminated_by));
        }
        self.state = next;
    }

    /// Close the pending operation because the payload ran out
    fn finish_at_end(&mut self) {
        self.finish(I2cTermination::StreamEnd, I2cState::Done);
    }

    /// Apply a control byte; returns true when the operation continues
    fn apply_control(&mut self, control: Control) -> bool {
        match control {
            Control::Nack => {
                self.finish(I2cTermination::Nack, I2cState::Done);
                false
            }
            Control::RepeatedStart(termination) => {
                self.finish(termination, I2cState::AwaitAddress);
                false
            }
            Control::Continue => true,
        }
    }

    fn step(&mut self) -> Result<(), OutOfBounds> {
        match self.state {
            I2cState::AwaitAddress => {
                let Some(byte) = self.next_byte()? else {
                    self.state = I2cState::Done;
                    return Ok(());
                };
                let ten_bit = byte & TEN_BIT_MASK == TEN_BIT_PREFIX;
                let (address, addressing) = if ten_bit {
                    ((((byte >> 1) & 0x03) as u16) << 8, I2cAddressing::TenBit)
                } else {
                    ((byte >> 1) as u16, I2cAddressing::SevenBit)
                };
                self.pending = Some(Pending {
                    address,
                    addressing,
                    direction: direction(byte),
                    first_byte: byte,
                    needs_second_byte: ten_bit,
                    bytes: Vec::new(),
                });
                self.state = I2cState::AwaitControl;
            }
            I2cState::AwaitControl => {
                let Some(byte) = self.next_byte()? else {
                    self.finish_at_end();
                    return Ok(());
                };
                if self.apply_control(Control::from_byte(byte)) {
                    let needs_second_byte =
                        self.pending.as_ref().map_or(false, |p| p.needs_second_byte);
                    self.state = if needs_second_byte {
                        I2cState::TenBitAddrByte2
                    } else {
                        I2cState::TransferBytes
                    };
                }
            }
            I2cState::TenBitAddrByte2 => {
                let Some(byte) = self.next_byte()? else {
                    self.finish_at_end();
                    return Ok(());
                };
                if let Some(pending) = self.pending.as_mut() {
                    pending.address |= byte as u16;
                    pending.needs_second_byte = false;
                }
                self.state = I2cState::AwaitControl2;
            }
            I2cState::AwaitControl2 => {
                let Some(byte) = self.next_byte()? else {
                    self.finish_at_end();
                    return Ok(());
                };
                let control = Control::from_byte(byte);
                if let Control::RepeatedStart(_) = control {
                    if self.ten_bit_read_follows() {
                        // Sr + first address byte with R set: the same device is now read
                        self.pos += 1;
                        if let Some(pending) = self.pending.as_mut() {
                            pending.direction = I2cDirection::Read;
                        }
                        self.state = I2cState::AwaitControl;
                        return Ok(());
                    }
                }
                if self.apply_control(control) {
                    self.state = I2cState::TransferBytes;
                }
            }
            I2cState::TransferBytes => {
                if self.cursor.remaining(self.pos) < 2 {
                    // odd trailing byte is alignment padding
                    self.finish_at_end();
                    return Ok(());
                }
                let pair = self.cursor.slice(self.pos, 2)?;
                self.pos += 2;
                if let Some(pending) = self.pending.as_mut() {
                    pending.bytes.push(pair[0]);
                }
                self.apply_control(Control::from_byte(pair[1]));
            }
            I2cState::Done => {}
        }
        Ok(())
    }

    /// Whether the next byte repeats the pending 10-bit header with the read bit set
    fn ten_bit_read_follows(&self) -> bool {
        let Some(pending) = self.pending.as_ref() else {
            return false;
        };
        match self.cursor.read_u8(self.pos) {
            Ok(next) => next >> 1 == pending.first_byte >> 1 && next & 0x01 == 1,
            Err(_) => false,
        }
    }
}

/// Decode an I2C payload into its bus operations
pub fn decode(payload: &[u8], _ctx: &PayloadContext<'_>) -> PayloadResult {
    let operations = I2cStreamDecoder::new(payload).run()?;
    Ok(PayloadOutput::new(DecodedBody::I2c(operations)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(payload: &[u8]) -> Vec<I2cOperation> {
        I2cStreamDecoder::new(payload).run().unwrap()
    }

    #[test]
    fn test_single_write_ended_by_nack() {
        let ops = run(&[0xA2, 0x01, 0x55, 0x01, 0x66, 0x00]);
        assert_eq!(
            ops,
            vec![I2cOperation {
                address: 0x51,
                addressing: I2cAddressing::SevenBit,
                direction: I2cDirection::Write,
                bytes: vec![0x55, 0x66],
                terminated_by: I2cTermination::Nack,
            }]
        );
    }

    #[test]
    fn test_nack_ends_whole_slice() {
        let ops = run(&[0xA2, 0x00, 0xA3, 0x01, 0x10, 0x00]);
        assert_eq!(ops.len(), 1);
        assert!(ops[0].bytes.is_empty());
        assert_eq!(ops[0].terminated_by, I2cTermination::Nack);
    }

    #[test]
    fn test_repeated_start_splits_operations() {
        // write register 0x10, Sr, read two bytes
        let ops = run(&[0xA2, 0x01, 0x10, 0x03, 0xA3, 0x01, 0x42, 0x01, 0x43, 0x00]);
        assert_eq!(ops.len(), 2);

        assert_eq!(ops[0].direction, I2cDirection::Write);
        assert_eq!(ops[0].bytes, vec![0x10]);
        assert_eq!(ops[0].terminated_by, I2cTermination::AckRepeatedStart);

        assert_eq!(ops[1].address, 0x51);
        assert_eq!(ops[1].direction, I2cDirection::Read);
        assert_eq!(ops[1].bytes, vec![0x42, 0x43]);
        assert_eq!(ops[1].terminated_by, I2cTermination::Nack);
    }

    #[test]
    fn test_repeated_start_on_address() {
        let ops = run(&[0xA2, 0x02, 0x20, 0x01, 0x01, 0x00]);
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].terminated_by, I2cTermination::NackRepeatedStart);
        assert!(ops[0].bytes.is_empty());
        assert_eq!(ops[1].address, 0x10);
        assert_eq!(ops[1].bytes, vec![0x01]);
    }

    #[test]
    fn test_ten_bit_write() {
        let ops = run(&[0xF4, 0x01, 0x23, 0x01, 0xAA, 0x00]);
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].addressing, I2cAddressing::TenBit);
        assert_eq!(ops[0].address, 0x223);
        assert_eq!(ops[0].direction, I2cDirection::Write);
        assert_eq!(ops[0].bytes, vec![0xAA]);
    }

    #[test]
    fn test_ten_bit_read_sequence_folded() {
        // 11110 10 0, ACK, low byte, ACK+Sr, 11110 10 1, ACK, data, NACK
        let ops = run(&[0xF4, 0x01, 0x23, 0x03, 0xF5, 0x01, 0x99, 0x00]);
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].address, 0x223);
        assert_eq!(ops[0].direction, I2cDirection::Read);
        assert_eq!(ops[0].bytes, vec![0x99]);
        assert_eq!(ops[0].terminated_by, I2cTermination::Nack);
    }

    #[test]
    fn test_ten_bit_repeated_start_to_other_device() {
        let ops = run(&[0xF4, 0x01, 0x23, 0x03, 0xA2, 0x01, 0x07, 0x00]);
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].terminated_by, I2cTermination::AckRepeatedStart);
        assert_eq!(ops[1].addressing, I2cAddressing::SevenBit);
        assert_eq!(ops[1].address, 0x51);
    }

    #[test]
    fn test_odd_trailing_byte_dropped() {
        let ops = run(&[0xA2, 0x01, 0x55, 0x01, 0x66]);
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].bytes, vec![0x55]);
        assert_eq!(ops[0].terminated_by, I2cTermination::StreamEnd);
    }

    #[test]
    fn test_acked_bytes_then_truncation_is_stream_end() {
        // Every byte acknowledged, but no NACK or repeated start closes the transfer
        let ops = run(&[0xA2, 0x01, 0x55, 0x01]);
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].bytes, vec![0x55]);
        assert_eq!(ops[0].terminated_by, I2cTermination::StreamEnd);
    }

    #[test]
    fn test_stream_end_before_control() {
        let ops = run(&[0xA2]);
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].terminated_by, I2cTermination::StreamEnd);
        assert!(run(&[]).is_empty());
    }

    #[test]
    fn test_unknown_control_continues_like_ack() {
        let ops = run(&[0xA2, 0x7E, 0x55, 0x00]);
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].bytes, vec![0x55]);
    }

    #[test]
    fn test_initial_state() {
        let decoder = I2cStreamDecoder::new(&[0xA2]);
        assert_eq!(decoder.state(), I2cState::AwaitAddress);
    }
}
