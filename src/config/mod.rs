//! Kernel configuration loading
//!
//! A kernel config is a JSON document carrying the kernel source text, the
//! layout properties the encoder must match, and the kernel's argument
//! declarations, where every buffer size is an arithmetic expression over
//! the matrix dimensions (see [`expr`]).

pub mod expr;

use std::fs;
use std::path::Path;

use serde::{Deserialize, Deserializer};

use crate::error::{Error, Result};

/// One declared kernel argument: a variable name, its address space, and a
/// size expression string.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArgDescr {
    /// Variable name in the kernel source
    pub variable: String,
    /// OpenCL-style address space ("global", "local")
    pub address_space: String,
    /// Size expression over `v_MWidthC_1`, `v_MHeight_2`, `v_VLength_3`
    pub size: String,
}

/// Layout-relevant kernel properties.
///
/// Generated kernels record which map primitives produced them and which
/// matrix layout they read; the encoder derives its flags from
/// `array_type`, `chunk_size`, and `split_size`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KernelProperties {
    /// Outer map primitive name
    #[serde(default = "nothing")]
    pub outer_map: String,
    /// Inner map primitive name
    #[serde(default = "nothing")]
    pub inner_map: String,
    /// Second inner map primitive name
    #[serde(default = "nothing")]
    pub inner_map2: String,
    /// Matrix layout the kernel reads ("ragged_array" selects RSA)
    #[serde(default = "nothing")]
    pub array_type: String,
    /// Row-width split factor; widths are padded to this modulo when > 1
    #[serde(default = "one", deserialize_with = "int_or_string")]
    pub split_size: u32,
    /// Row-chunking factor; heights are padded to this modulo when > 1
    #[serde(default = "one", deserialize_with = "int_or_string")]
    pub chunk_size: u32,
}

impl KernelProperties {
    /// Whether the kernel reads the ragged self-describing layout
    pub fn is_ragged(&self) -> bool {
        self.array_type == "ragged_array"
    }
}

fn nothing() -> String {
    "nothing".to_string()
}

fn one() -> u32 {
    1
}

/// Configs written by older generators carry numeric properties as JSON
/// strings; accept both spellings.
fn int_or_string<'de, D: Deserializer<'de>>(de: D) -> std::result::Result<u32, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(u32),
        Str(String),
    }
    match Raw::deserialize(de)? {
        Raw::Int(v) => Ok(v),
        Raw::Str(s) => s.parse::<u32>().map_err(serde::de::Error::custom),
    }
}

/// A loaded kernel configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KernelConfig {
    /// Kernel name, used in result reporting
    pub name: String,
    /// Kernel source text, compiled at benchmark time
    pub source: String,
    /// Layout properties
    pub properties: KernelProperties,
    /// Declared input arguments, in kernel parameter order
    #[serde(default)]
    pub input_args: Vec<ArgDescr>,
    /// The output buffer argument
    pub output_arg: ArgDescr,
    /// Temporary global buffers, in declaration order
    #[serde(default)]
    pub temp_globals: Vec<ArgDescr>,
    /// Temporary workgroup-local buffers, in declaration order
    #[serde(default)]
    pub temp_locals: Vec<ArgDescr>,
}

impl KernelConfig {
    /// Load a kernel config from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Load`] for unreadable files or invalid JSON.
    /// Callers treat this as fatal.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| Error::load(path.display().to_string(), e.to_string()))?;
        Self::from_json(&text)
            .map_err(|e| Error::load(path.display().to_string(), e.to_string()))
    }

    /// Parse a kernel config from JSON text.
    pub fn from_json(text: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
