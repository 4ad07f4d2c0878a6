//! TECMP Decoder CLI Application
//!
//! This is the command-line interface for the TECMP stream decoder.
//! It uses the tecmp-decoder library and adds:
//! - TOML configuration (decoder options, bus id mappings, display names)
//! - Hex-dump input with one message per line, decoded in parallel
//! - Binary message files (`--raw`)
//! - Text and JSON output

use anyhow::{Context, Result};
use clap::Parser;
use rayon::prelude::*;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tecmp_decoder::{Decoder, Message, NameTable};

mod config;
mod input;
mod report;

use config::{AppConfig, OutputFormat};

/// TECMP Decoder - Decode captured TECMP messages
#[derive(Parser, Debug)]
#[command(name = "tecmp-cli")]
#[command(about = "Decode TECMP telemetry messages (hex dumps or binary files)", long_about = None)]
#[command(version)]
struct Args {
    /// Input files: one hex-encoded message per line, or binary messages with --raw
    #[arg(value_name = "FILE", required = true)]
    inputs: Vec<PathBuf>,

    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Treat each input file as a single binary TECMP message
    #[arg(long)]
    raw: bool,

    /// Output format (overrides the configuration file)
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Maximum number of records to decode per message
    #[arg(long, value_name = "COUNT")]
    max_records: Option<usize>,

    /// Number of worker threads for hex-dump input (default: all cores)
    #[arg(short, long, value_name = "N")]
    jobs: Option<usize>,

    /// Verbosity level (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    log::info!("TECMP Decoder CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using decoder library v{}", tecmp_decoder::VERSION);

    let config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => AppConfig::default(),
    };

    let mut decoder_config = config.decoder.clone();
    if let Some(max) = args.max_records {
        decoder_config = decoder_config.with_max_records(max);
    }
    let decoder = Decoder::new().with_config(decoder_config);
    let names = NameTable::from(&config.names);
    let format = args.format.unwrap_or(config.output.format);
    log::debug!("{} display names loaded, output format {:?}", names.len(), format);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(args.jobs.unwrap_or(0))
        .build()
        .context("Failed to build worker pool")?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut failures = 0usize;

    for path in &args.inputs {
        if args.raw {
            match decoder.decode_file(path) {
                Ok(message) => {
                    writeln!(out, "{}", report::render(&message, format, &names)?)?;
                }
                Err(e) => {
                    eprintln!("{}: {}", path.display(), e);
                    failures += 1;
                }
            }
            continue;
        }

        let results = pool.install(|| decode_hex_file(&decoder, path))?;
        for (line, result) in results {
            match result {
                Ok(message) => {
                    writeln!(out, "{}", report::render(&message, format, &names)?)?;
                }
                Err(e) => {
                    eprintln!("{}:{}: {:#}", path.display(), line, e);
                    failures += 1;
                }
            }
        }
    }

    check_failures(failures)
}

/// Turn undecodable inputs into a failing exit status
fn check_failures(failures: usize) -> Result<()> {
    if failures > 0 {
        anyhow::bail!("{} message(s) could not be decoded", failures);
    }
    Ok(())
}

/// Decode every message of a hex-dump file, preserving line order
fn decode_hex_file(decoder: &Decoder, path: &Path) -> Result<Vec<(usize, Result<Message>)>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file: {:?}", path))?;
    let lines = input::parse_hex_lines(&content);
    log::info!("Decoding {} messages from {:?}", lines.len(), path);

    Ok(lines
        .into_par_iter()
        .map(|(line, bytes)| {
            let message = bytes.and_then(|bytes| {
                decoder.decode_message(&bytes).map_err(anyhow::Error::from)
            });
            (line, message)
        })
        .collect())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_file_keeps_line_order() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# two messages and one bad line").unwrap();
        writeln!(file, "0001000103040000000000000000").unwrap();
        writeln!(file, "zz").unwrap();
        writeln!(file, "000200020300000000000000").unwrap();
        file.flush().unwrap();

        let results = decode_hex_file(&Decoder::new(), file.path()).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].0, 2);
        assert_eq!(results[0].1.as_ref().unwrap().header.device_id, 1);
        assert!(results[1].1.is_err());
        assert_eq!(results[2].1.as_ref().unwrap().header.counter, 2);
    }

    #[test]
    fn test_failures_give_error_exit() {
        assert!(check_failures(0).is_ok());
        let err = check_failures(3).unwrap_err();
        assert_eq!(err.to_string(), "3 message(s) could not be decoded");
    }

    #[test]
    fn test_args_parse() {
        let args = Args::parse_from(["tecmp-cli", "capture.txt", "--format", "json", "-vv"]);
        assert_eq!(args.inputs, vec![PathBuf::from("capture.txt")]);
        assert_eq!(args.format, Some(OutputFormat::Json));
        assert_eq!(args.verbose, 2);
        assert!(!args.raw);
    }
}
