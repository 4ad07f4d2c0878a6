//! Display-name lookup for devices, interfaces and control messages
//!
//! Names never influence decoding; they are only used when a caller projects records
//! into a human-readable form. Tables are owned by the caller and passed in explicitly.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Category of identifier being named
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameCategory {
    Device,
    Interface,
    ControlMessage,
}

/// Resolves identifiers to human-readable names
pub trait NameResolver {
    fn lookup_name(&self, category: NameCategory, id: u32) -> Option<&str>;
}

/// A single id/name pair as written in configuration files
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NameEntry {
    pub id: u32,
    pub name: String,
}

/// Serializable form of the name tables
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NameConfig {
    #[serde(default)]
    pub devices: Vec<NameEntry>,
    #[serde(default)]
    pub interfaces: Vec<NameEntry>,
    #[serde(default)]
    pub control_messages: Vec<NameEntry>,
}

/// In-memory name tables
#[derive(Debug, Clone, Default)]
pub struct NameTable {
    tables: HashMap<NameCategory, HashMap<u32, String>>,
}

impl NameTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a name
    pub fn insert(&mut self, category: NameCategory, id: u32, name: impl Into<String>) {
        self.tables.entry(category).or_default().insert(id, name.into());
    }

    /// Builder method: add a name
    pub fn with_name(mut self, category: NameCategory, id: u32, name: impl Into<String>) -> Self {
        self.insert(category, id, name);
        self
    }

    /// Number of names across all categories
    pub fn len(&self) -> usize {
        self.tables.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<&NameConfig> for NameTable {
    fn from(config: &NameConfig) -> Self {
        let mut table = NameTable::new();
        let sections = [
            (NameCategory::Device, &config.devices),
            (NameCategory::Interface, &config.interfaces),
            (NameCategory::ControlMessage, &config.control_messages),
        ];
        for (category, entries) in sections {
            for entry in entries {
                table.insert(category, entry.id, entry.name.clone());
            }
        }
        table
    }
}

impl NameResolver for NameTable {
    fn lookup_name(&self, category: NameCategory, id: u32) -> Option<&str> {
        self.tables
            .get(&category)
            .and_then(|names| names.get(&id))
            .map(String::as_str)
    }
}
