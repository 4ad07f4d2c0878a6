//! Decoder configuration types
//!
//! This module defines the minimal configuration needed by the decoder library.
//! Configuration is passed explicitly to each decode pass; the library keeps no
//! process-wide settings.

use crate::types::{DecoderError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Configuration for the decoder library
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Interpret 16-bit analog samples as two's complement (false = unsigned)
    #[serde(default = "default_true")]
    pub analog_samples_signed: bool,

    /// Optional: stop a decode pass after this many records
    #[serde(default)]
    pub max_records: Option<usize>,

    /// Optional: only emit records from these interface IDs
    #[serde(default)]
    pub interface_filter: Option<Vec<u32>>,

    /// Interface ID to bus ID mappings used when handing payloads off
    #[serde(default)]
    pub bus_ids: Vec<BusIdMapping>,
}

fn default_true() -> bool {
    true
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            analog_samples_signed: true,
            max_records: None,
            interface_filter: None,
            bus_ids: Vec::new(),
        }
    }
}

/// Maps a capture-module interface to the bus ID reported to sub-protocol decoders
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct BusIdMapping {
    pub interface_id: u32,
    pub bus_id: u16,
}

impl DecoderConfig {
    /// Create a new decoder configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: choose signed or unsigned analog samples
    pub fn with_signed_analog_samples(mut self, signed: bool) -> Self {
        self.analog_samples_signed = signed;
        self
    }

    /// Builder method: cap the number of records per decode pass
    pub fn with_max_records(mut self, max: usize) -> Self {
        self.max_records = Some(max);
        self
    }

    /// Builder method: set interface filter
    pub fn with_interface_filter(mut self, interfaces: Vec<u32>) -> Self {
        self.interface_filter = Some(interfaces);
        self
    }

    /// Builder method: map an interface ID to a bus ID
    pub fn map_bus_id(mut self, interface_id: u32, bus_id: u16) -> Self {
        self.bus_ids.retain(|m| m.interface_id != interface_id);
        self.bus_ids.push(BusIdMapping { interface_id, bus_id });
        self
    }

    /// Reject settings that cannot come from the builder methods
    ///
    /// Configuration files may list one interface twice with different bus IDs, or
    /// an interface filter that admits nothing.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashMap::new();
        for mapping in &self.bus_ids {
            if let Some(previous) = seen.insert(mapping.interface_id, mapping.bus_id) {
                if previous != mapping.bus_id {
                    return Err(DecoderError::InvalidConfig(format!(
                        "interface 0x{:X} mapped to bus IDs {} and {}",
                        mapping.interface_id, previous, mapping.bus_id
                    )));
                }
            }
        }
        if matches!(&self.interface_filter, Some(interfaces) if interfaces.is_empty()) {
            return Err(DecoderError::InvalidConfig(
                "interface filter is empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Check if records from an interface should be emitted
    pub fn should_process_interface(&self, interface_id: u32) -> bool {
        match &self.interface_filter {
            Some(interfaces) => interfaces.contains(&interface_id),
            None => true,
        }
    }

    /// Bus ID for an interface: the configured mapping, else the low 16 bits
    pub fn bus_id_for(&self, interface_id: u32) -> u16 {
        self.bus_ids
            .iter()
            .find(|m| m.interface_id == interface_id)
            .map(|m| m.bus_id)
            .unwrap_or((interface_id & 0xFFFF) as u16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoder_config_builder() {
        let config = DecoderConfig::new()
            .with_signed_analog_samples(false)
            .with_max_records(10)
            .with_interface_filter(vec![1, 2])
            .map_bus_id(0x0001_0003, 7);

        assert!(!config.analog_samples_signed);
        assert_eq!(config.max_records, Some(10));
        assert_eq!(config.interface_filter, Some(vec![1, 2]));
        assert_eq!(config.bus_ids.len(), 1);
    }

    #[test]
    fn test_defaults() {
        let config = DecoderConfig::new();
        assert!(config.analog_samples_signed);
        assert!(config.max_records.is_none());
        assert!(config.should_process_interface(99));
    }

    #[test]
    fn test_interface_filter_logic() {
        let config = DecoderConfig::new().with_interface_filter(vec![1, 2]);
        assert!(config.should_process_interface(1));
        assert!(!config.should_process_interface(3));
    }

    #[test]
    fn test_bus_id_mapping() {
        let config = DecoderConfig::new().map_bus_id(0x10, 3).map_bus_id(0x10, 4);
        assert_eq!(config.bus_id_for(0x10), 4);
        assert_eq!(config.bus_ids.len(), 1);
        assert_eq!(config.bus_id_for(0x0002_0005), 5);
    }

    #[test]
    fn test_validate() {
        assert!(DecoderConfig::new().map_bus_id(1, 2).validate().is_ok());

        let mut config = DecoderConfig::new().map_bus_id(1, 2);
        config.bus_ids.push(BusIdMapping { interface_id: 1, bus_id: 3 });
        assert!(matches!(config.validate(), Err(DecoderError::InvalidConfig(_))));

        let config = DecoderConfig::new().with_interface_filter(Vec::new());
        assert!(matches!(config.validate(), Err(DecoderError::InvalidConfig(_))));
    }
}
