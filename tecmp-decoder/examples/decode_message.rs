//! Standalone TECMP message decoder tool
//!
//! Decodes one binary TECMP message from a file and prints its records together
//! with a summary of what was found.
//!
//! Usage:
//!   decode_message <message.bin> [--limit <count>] [--unsigned-analog] [--verbose]
//!
//! Example:
//!   decode_message capture_0001.bin --limit 20

use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;
use tecmp_decoder::{DecodedBody, Decoder, DecoderConfig, MessageBody, Record};

#[derive(Default)]
struct DecoderStats {
    records: usize,
    with_diagnostics: usize,
    handed_off: usize,
    by_kind: BTreeMap<&'static str, usize>,
}

impl DecoderStats {
    fn add(&mut self, record: &Record) {
        self.records += 1;
        if !record.diagnostics.is_empty() {
            self.with_diagnostics += 1;
        }
        if record.handed_off {
            self.handed_off += 1;
        }
        *self.by_kind.entry(record.body.kind_name()).or_insert(0) += 1;
    }

    fn print_summary(&self) {
        println!("\n=== DECODING SUMMARY ===");
        println!("Records: {}", self.records);
        println!("Records with diagnostics: {}", self.with_diagnostics);
        println!("Handed off: {}", self.handed_off);
        for (kind, count) in &self.by_kind {
            println!("  {}: {}", kind, count);
        }
    }
}

fn print_record(record: &Record, verbose: bool) {
    let summary = match &record.body {
        DecodedBody::Can(frame) => format!(
            "CAN{} 0x{:X} [{}] {:02X?}",
            if frame.fd { "-FD" } else { "" },
            frame.id,
            frame.data.len(),
            frame.data
        ),
        DecodedBody::FlexRay(frame) => {
            format!("FlexRay slot {} cycle {} {:02X?}", frame.frame_id, frame.cycle, frame.data)
        }
        DecodedBody::Lin(frame) => format!("LIN 0x{:02X} {:02X?}", frame.id, frame.data),
        DecodedBody::Gpio(snapshot) => format!("GPIO {:?}", snapshot.lines()),
        DecodedBody::Analog(samples) => format!("Analog {:?} {}", samples.values, samples.unit),
        DecodedBody::I2c(ops) => format!("I2C {} operations", ops.len()),
        DecodedBody::Ethernet(frame) => format!("Ethernet {} bytes", frame.frame.len()),
        DecodedBody::RawBytes(bytes) => format!("Raw {} bytes", bytes.len()),
    };
    println!(
        "[{}] if={} {}",
        record.timestamp().format("%H:%M:%S%.9f"),
        record.header.interface_id,
        summary
    );
    if verbose {
        for diagnostic in &record.diagnostics {
            println!("    ! {} at offset {}", diagnostic.kind, diagnostic.at_offset);
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!(
            "Usage: {} <message.bin> [--limit <count>] [--unsigned-analog] [--verbose]",
            args[0]
        );
        std::process::exit(1);
    }

    let path = PathBuf::from(&args[1]);
    let mut config = DecoderConfig::new();
    let mut verbose = false;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--limit" => {
                i += 1;
                if i < args.len() {
                    config = config.with_max_records(args[i].parse()?);
                }
            }
            "--unsigned-analog" => config = config.with_signed_analog_samples(false),
            "--verbose" | "-v" => verbose = true,
            other => eprintln!("Unknown argument: {}", other),
        }
        i += 1;
    }

    let decoder = Decoder::new().with_config(config);
    let message = decoder.decode_file(&path)?;
    println!(
        "=== {} from device 0x{:04X} ({}) ===",
        message.kind(),
        message.header.device_id,
        message.header.data_type_name()
    );

    let mut stats = DecoderStats::default();
    match &message.body {
        MessageBody::Records(records) => {
            for record in records {
                print_record(record, verbose);
                stats.add(record);
            }
        }
        MessageBody::CounterEvent(event) => println!("{:?}, lost {}", event, event.lost()),
        MessageBody::TimeSyncEvent(event) => println!("{:?}", event),
        MessageBody::Opaque(bytes) => println!("{} opaque bytes", bytes.len()),
    }

    stats.print_summary();
    Ok(())
}
