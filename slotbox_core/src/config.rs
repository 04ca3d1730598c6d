use serde::Deserialize;
use std::path::PathBuf;

/// Resource caps applied to everything an input can size: slot counts,
/// slot lengths, line lengths, binary length/count prefixes.
///
/// Every field has a conservative default so the interpreters are safe to
/// run on untrusted input without any configuration file present.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct Limits {
    /// Highest admissible slot index + 1 in a handle table.
    #[serde(default = "default_max_slots")]
    pub max_slots: usize,
    /// Maximum element count of a single slot.
    #[serde(default = "default_max_slot_len")]
    pub max_slot_len: usize,
    /// Maximum byte length of one text input line.
    #[serde(default = "default_max_line_len")]
    pub max_line_len: usize,
    /// Maximum byte length a binary length prefix may declare.
    #[serde(default = "default_max_field_len")]
    pub max_field_len: usize,
    /// Maximum value a binary count prefix (records, fields, nodes, edges)
    /// may declare.
    #[serde(default = "default_max_records")]
    pub max_records: usize,
}

fn default_max_slots() -> usize {
    4096
}
fn default_max_slot_len() -> usize {
    1 << 20
}
fn default_max_line_len() -> usize {
    64 * 1024
}
fn default_max_field_len() -> usize {
    1 << 20
}
fn default_max_records() -> usize {
    1 << 16
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_slots: default_max_slots(),
            max_slot_len: default_max_slot_len(),
            max_line_len: default_max_line_len(),
            max_field_len: default_max_field_len(),
            max_records: default_max_records(),
        }
    }
}

/// Top-level configuration, loaded from a TOML file with a `[limits]` table.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct SlotboxConfig {
    #[serde(default)]
    pub limits: Limits,
}

impl SlotboxConfig {
    pub fn load_from_file(path: &PathBuf) -> Result<Self, anyhow::Error> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file at {:?}: {}", path, e))?;

        let config: SlotboxConfig = toml::from_str(&content).map_err(|e| {
            anyhow::anyhow!("Failed to parse TOML from config file {:?}: {}", path, e)
        })?;

        Ok(config)
    }
}
