//! Core data structures for BCI2000 recordings.
//!
//! This module defines the fundamental types used throughout the library:
//! - Header fields and sample formats
//! - State vector layout
//! - Parameter definitions
//! - Cursor origins and read-size selectors

use std::collections::BTreeMap;

use super::error::{Bci2kError, Result};

/// Reference point for a cursor move, in samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOrigin {
    /// Relative to the first sample.
    Start,
    /// Relative to the current cursor.
    Current,
    /// Relative to one past the last sample.
    End,
}

impl TryFrom<i32> for SeekOrigin {
    type Error = Bci2kError;

    /// Maps the conventional `whence` integers (0, 1, 2) to an origin.
    fn try_from(whence: i32) -> Result<Self> {
        match whence {
            0 => Ok(Self::Start),
            1 => Ok(Self::Current),
            2 => Ok(Self::End),
            _ => Err(Bci2kError::InvalidArgument(format!(
                "unknown seek origin: {}",
                whence
            ))),
        }
    }
}

/// How many samples a read should cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleCount {
    /// Everything that is left (for `read`) or the whole recording (for `decode`).
    All,
    Count(usize),
}

impl SampleCount {
    /// Resolves to a concrete count given how many samples remain.
    pub fn resolve(self, remaining: usize) -> usize {
        match self {
            SampleCount::All => remaining,
            SampleCount::Count(n) => n.min(remaining),
        }
    }
}

impl From<usize> for SampleCount {
    fn from(n: usize) -> Self {
        SampleCount::Count(n)
    }
}

/// Which states a decode should extract.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StateSelector {
    #[default]
    All,
    Named(Vec<String>),
}

/// Binary type of one signal value in a sample frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Int16,
    Int32,
    Float32,
}

impl DataFormat {
    /// Width of one encoded value in bytes.
    pub fn value_width(&self) -> usize {
        match self {
            DataFormat::Int16 => 2,
            DataFormat::Int32 | DataFormat::Float32 => 4,
        }
    }
}

impl TryFrom<&str> for DataFormat {
    type Error = Bci2kError;
    fn try_from(value: &str) -> Result<Self> {
        match value {
            "int16" => Ok(Self::Int16),
            "int32" => Ok(Self::Int32),
            "float32" => Ok(Self::Float32),
            other => Err(Bci2kError::UnsupportedDataFormat(other.to_string())),
        }
    }
}

impl std::fmt::Display for DataFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            DataFormat::Int16 => write!(f, "int16"),
            DataFormat::Int32 => write!(f, "int32"),
            DataFormat::Float32 => write!(f, "float32"),
        }
    }
}

/// Location of one named state inside the per-sample state vector.
///
/// A state occupies `length` bits starting at bit `bit_location` of byte
/// `byte_location`. Bits are numbered LSB first and continue into the
/// following bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateDefinition {
    pub name: String,
    pub length: u32,
    /// Initial value recorded in the header. Not used for decoding.
    pub default_value: u64,
    pub byte_location: usize,
    pub bit_location: u32,
}

impl StateDefinition {
    /// Absolute bit offset of the state's least significant bit.
    pub fn bit_offset(&self) -> usize {
        self.byte_location * 8 + self.bit_location as usize
    }
}

/// Value payload of a parameter line.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Scalar(String),
    List(Vec<String>),
    Matrix {
        rows: usize,
        cols: usize,
        row_labels: Vec<String>,
        col_labels: Vec<String>,
        /// Row-major values.
        values: Vec<String>,
    },
    /// Tokens of a line whose value layout could not be structured.
    Raw(Vec<String>),
}

/// One entry of the `[ Parameter Definition ]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub section: String,
    pub data_type: String,
    pub name: String,
    pub value: ParamValue,
    pub comment: Option<String>,
}

impl Parameter {
    /// Interprets a scalar parameter as a number, ignoring a unit suffix
    /// such as `Hz` or `muV`.
    pub fn as_f64(&self) -> Option<f64> {
        match &self.value {
            ParamValue::Scalar(s) => crate::bci2k::utils::parse_leading_f64(s),
            _ => None,
        }
    }

    /// Interprets a list parameter as numbers, ignoring unit suffixes.
    pub fn as_f64_list(&self) -> Option<Vec<f64>> {
        match &self.value {
            ParamValue::List(items) => items
                .iter()
                .map(|s| crate::bci2k::utils::parse_leading_f64(s))
                .collect(),
            _ => None,
        }
    }
}

/// Parameters of a recording, keyed by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters {
    entries: BTreeMap<String, Parameter>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a parameter, replacing an earlier definition with the same name.
    pub fn insert(&mut self, param: Parameter) -> Option<Parameter> {
        self.entries.insert(param.name.clone(), param)
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over parameters in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.entries.values()
    }
}

/// Complete parsed header of a `.dat` file.
#[derive(Debug, Clone)]
pub struct DatHeader {
    /// `BCI2000V=` value; absent in version 1.0 files.
    pub file_version: Option<String>,
    pub header_len: u64,
    pub source_channels: usize,
    pub state_vector_len: usize,
    pub data_format: DataFormat,
    pub states: Vec<StateDefinition>,
    pub parameters: Parameters,
}

impl DatHeader {
    /// Byte length of one sample frame (all channels plus the state vector).
    pub fn frame_len(&self) -> usize {
        self.source_channels * self.data_format.value_width() + self.state_vector_len
    }

    pub fn state(&self, name: &str) -> Option<&StateDefinition> {
        self.states.iter().find(|s| s.name == name)
    }
}
