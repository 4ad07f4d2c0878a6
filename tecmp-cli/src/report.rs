//! Report generation
//!
//! Renders decoded messages as human-readable text or as one JSON document per
//! message. Names for devices and interfaces come from the configured name tables.

use crate::config::OutputFormat;
use anyhow::{Context, Result};
use tecmp_decoder::{
    ByteCursor, DecodedBody, Message, MessageBody, MessageKind, NameCategory, NameResolver,
    Record,
};

/// Render one message in the requested format
pub fn render(message: &Message, format: OutputFormat, names: &dyn NameResolver) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(message, names)),
        OutputFormat::Json => {
            serde_json::to_string(message).context("Failed to serialize message to JSON")
        }
    }
}

fn display_name(names: &dyn NameResolver, category: NameCategory, id: u32) -> String {
    match names.lookup_name(category, id) {
        Some(name) => format!("{} (0x{:X})", name, id),
        None => format!("0x{:X}", id),
    }
}

/// Text rendering: a header line followed by one line per record or event
pub fn render_text(message: &Message, names: &dyn NameResolver) -> String {
    let header = &message.header;
    let mut lines = vec![format!(
        "{} #{} from {} [{}]{}",
        message.kind(),
        header.counter,
        display_name(names, NameCategory::Device, header.device_id as u32),
        header.data_type_name(),
        if header.device_overflow() { " OVERFLOW" } else { "" }
    )];

    match &message.body {
        MessageBody::Records(records) => {
            for record in records {
                lines.push(render_record(record, names));
            }
        }
        MessageBody::CounterEvent(event) => lines.push(format!(
            "  counter gap on {}: expected {}, received {}, lost {}",
            display_name(names, NameCategory::Interface, event.interface_id as u32),
            event.expected,
            event.received,
            event.lost()
        )),
        MessageBody::TimeSyncEvent(event) => lines.push(format!(
            "  time sync on {}: {:?}",
            display_name(names, NameCategory::Interface, event.interface_id as u32),
            event.status
        )),
        MessageBody::Opaque(bytes) => {
            let control = match message.kind() {
                MessageKind::ControlMessage => ByteCursor::new(bytes).read_u16(2).ok(),
                _ => None,
            };
            match control {
                Some(id) => lines.push(format!(
                    "  control message {}, {} bytes",
                    display_name(names, NameCategory::ControlMessage, id as u32),
                    bytes.len()
                )),
                None => lines.push(format!("  {} bytes: {}", bytes.len(), hex::encode(bytes))),
            }
        }
    }

    lines.join("\n")
}

fn render_record(record: &Record, names: &dyn NameResolver) -> String {
    let mut line = format!(
        "  @{:<6} {} {} {}",
        record.offset,
        record.timestamp().format("%Y-%m-%d %H:%M:%S%.9f"),
        display_name(names, NameCategory::Interface, record.header.interface_id),
        body_summary(&record.body)
    );
    if !record.header.is_time_synchronized() {
        line.push_str(" (unsynced)");
    }
    if record.handed_off {
        line.push_str(" -> handed off");
    }
    for diagnostic in &record.diagnostics {
        line.push_str(&format!(" !{}@{}", diagnostic.kind, diagnostic.at_offset));
    }
    line
}

/// One-line summary of a decoded payload
pub fn body_summary(body: &DecodedBody) -> String {
    match body {
        DecodedBody::Can(frame) => format!(
            "CAN{} {:>8} [{}] {}{}",
            if frame.fd { "-FD" } else { "" },
            if frame.extended {
                format!("{:08X}x", frame.id)
            } else {
                format!("{:03X}", frame.id)
            },
            frame.data.len(),
            hex::encode_upper(&frame.data),
            if frame.error_frame { " ERROR" } else { "" }
        ),
        DecodedBody::FlexRay(frame) => format!(
            "FlexRay slot {} cycle {} [{}] {}",
            frame.frame_id,
            frame.cycle,
            frame.data.len(),
            hex::encode_upper(&frame.data)
        ),
        DecodedBody::Lin(frame) => format!(
            "LIN {:02X} [{}] {}",
            frame.id,
            frame.data.len(),
            hex::encode_upper(&frame.data)
        ),
        DecodedBody::Gpio(snapshot) => {
            let levels: String = snapshot
                .lines()
                .iter()
                .map(|high| if *high { '1' } else { '0' })
                .collect();
            format!("GPIO {}", levels)
        }
        DecodedBody::Analog(samples) => {
            let values: Vec<String> = samples
                .values
                .iter()
                .map(|value| format!("{:.4}", value))
                .collect();
            format!("Analog [{}] {}", values.join(", "), samples.unit)
        }
        DecodedBody::I2c(operations) => {
            let ops: Vec<String> = operations
                .iter()
                .map(|op| {
                    format!(
                        "{:?} 0x{:X} {} ({:?})",
                        op.direction,
                        op.address,
                        hex::encode_upper(&op.bytes),
                        op.terminated_by
                    )
                })
                .collect();
            format!("I2C {}", ops.join("; "))
        }
        DecodedBody::Ethernet(frame) => match frame.sfd {
            Some(sfd) => format!(
                "Ethernet {} bytes, preamble {}, {:?}",
                frame.frame.len(),
                frame.preamble_len,
                sfd
            ),
            None => format!("Ethernet {} bytes", frame.frame.len()),
        },
        DecodedBody::RawBytes(bytes) => format!("Raw {}", hex::encode_upper(bytes)),
    }
}
