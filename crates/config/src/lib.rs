// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Bytes per bus word. Every address in a scenario must be a multiple of this.
pub const WORD_BYTES: u32 = 4;

/// Default schema version for YAML scenarios
fn default_schema_version() -> String {
    "1.0".to_string()
}

fn default_delay_in_irq() -> u32 {
    1
}

fn default_memory_size() -> String {
    "16KiB".to_string()
}

fn default_settle_ticks() -> u64 {
    128
}

fn default_max_ticks() -> u64 {
    10_000
}

/// The data words streamed into the engine.
///
/// Either an explicit list, or `count` giving the ramp `start..start + count`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum DataSpec {
    Words {
        words: Vec<u32>,
    },
    Ramp {
        #[serde(default)]
        start: u32,
        count: u32,
    },
}

impl DataSpec {
    pub fn words(&self) -> Vec<u32> {
        match self {
            DataSpec::Words { words } => words.clone(),
            DataSpec::Ramp { start, count } => (*start..start + count).collect(),
        }
    }

    /// A ramp must end within the `u32` range.
    pub fn check_range(&self) -> Result<()> {
        if let DataSpec::Ramp { start, count } = self {
            if start.checked_add(*count).is_none() {
                anyhow::bail!(
                    "Ramp of {} words from {:#010x} overflows a 32-bit word",
                    count,
                    start
                );
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            DataSpec::Words { words } => words.is_empty(),
            DataSpec::Ramp { count, .. } => *count == 0,
        }
    }
}

/// A memory region and the words expected in it after the scenario.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RegionExpectation {
    pub address: u32,
    #[serde(flatten)]
    pub data: DataSpec,
}

/// A memory region that must still read as zero after the scenario.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct UntouchedRegion {
    pub address: u32,
    pub words: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Expectations {
    #[serde(default)]
    pub bursts: Option<u64>,
    #[serde(default)]
    pub regions: Vec<RegionExpectation>,
    #[serde(default)]
    pub untouched: Vec<UntouchedRegion>,
}

/// One verification scenario for the double-buffered write engine.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    pub name: String,
    /// Destination buffers, in the order they are handed to the engine.
    pub addresses: Vec<u32>,
    /// Size of one destination buffer in bytes.
    pub block_size: u32,
    /// Ticks to wait after an interrupt before pushing the next address.
    #[serde(default = "default_delay_in_irq")]
    pub delay_in_irq: u32,
    pub data: DataSpec,
    #[serde(default = "default_memory_size")]
    pub memory_size: String, // e.g. "16KiB"
    #[serde(default = "default_settle_ticks")]
    pub settle_ticks: u64,
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,
    #[serde(default)]
    pub expect: Expectations,
}

impl ScenarioConfig {
    /// Scenario with the documented defaults for everything but the essentials.
    pub fn new(name: &str, addresses: Vec<u32>, block_size: u32, data: DataSpec) -> Self {
        Self {
            schema_version: default_schema_version(),
            name: name.to_string(),
            addresses,
            block_size,
            delay_in_irq: default_delay_in_irq(),
            data,
            memory_size: default_memory_size(),
            settle_ticks: default_settle_ticks(),
            max_ticks: default_max_ticks(),
            expect: Expectations::default(),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scenario at {:?}", path.as_ref()))?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let scenario: Self =
            serde_yaml::from_str(yaml).context("Failed to parse Scenario YAML")?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn validate(&self) -> Result<()> {
        if self.schema_version != "1.0" {
            anyhow::bail!(
                "Unsupported schema_version '{}'. Supported versions: '1.0'",
                self.schema_version
            );
        }

        if self.addresses.len() < 2 {
            anyhow::bail!(
                "At least 2 addresses must be provided, got {}",
                self.addresses.len()
            );
        }

        if let Some(addr) = self.addresses.iter().find(|a| *a % WORD_BYTES != 0) {
            anyhow::bail!("Address {:#010x} must be word-aligned", addr);
        }

        if self.block_size == 0 || self.block_size % WORD_BYTES != 0 {
            anyhow::bail!(
                "Limit 'block_size' must be a non-zero multiple of {} bytes, got {}",
                WORD_BYTES,
                self.block_size
            );
        }

        if self.data.is_empty() {
            anyhow::bail!("Scenario 'data' cannot be empty");
        }
        self.data.check_range().context("Invalid scenario 'data'")?;

        if self.max_ticks == 0 {
            anyhow::bail!("Limit 'max_ticks' must be greater than zero");
        }

        let memory = self.memory_bytes()?;
        if memory % WORD_BYTES as u64 != 0 {
            anyhow::bail!("Memory size {} is not a whole number of words", memory);
        }

        for region in &self.expect.regions {
            if region.address % WORD_BYTES != 0 {
                anyhow::bail!("Expected region {:#010x} must be word-aligned", region.address);
            }
            region
                .data
                .check_range()
                .with_context(|| format!("Invalid expected region {:#010x}", region.address))?;
        }

        Ok(())
    }

    pub fn memory_bytes(&self) -> Result<u64> {
        parse_size(&self.memory_size)
            .with_context(|| format!("Invalid memory_size '{}'", self.memory_size))
    }
}

pub fn parse_size(size_str: &str) -> Result<u64> {
    use human_size::{Byte, Size, SpecificSize};
    let s: Size = size_str
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid size format: {}", e))?;
    let bytes: SpecificSize<Byte> = s.into();
    Ok(bytes.value() as u64)
}
