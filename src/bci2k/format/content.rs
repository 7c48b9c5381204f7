//! # Sample Frame Decoding
//!
//! The binary section of a `.dat` file is a sequence of fixed-size frames,
//! one per sample:
//!
//! ```text
//! [SourceCh × DataFormat]  channel values, little endian
//! [StatevectorLen bytes]   packed state bits, LSB first
//! ```
//!
//! This module turns a buffer of whole frames into a `(channels, samples)`
//! signal matrix and one `(1, samples)` row per requested state. It does no
//! I/O; the stream reads the bytes.

use byteorder::{ByteOrder, LittleEndian};
use log::{debug, trace};
use ndarray::Array2;

use crate::bci2k::types::decoder::RawStates;
use crate::bci2k::types::error::{Bci2kError, Result};
use crate::bci2k::types::models::{DataFormat, DatHeader, Parameters, StateDefinition};

/// Per-channel scaling from raw values to physical units:
/// `(raw - offset) * gain`.
#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    pub gains: Vec<f64>,
    pub offsets: Vec<f64>,
}

impl Calibration {
    /// Reads `SourceChGain` and `SourceChOffset`. A missing parameter means
    /// gain 1 / offset 0 for every channel.
    pub fn from_parameters(params: &Parameters, channels: usize) -> Result<Self> {
        let gains = channel_list(params, "SourceChGain", channels, 1.0)?;
        let offsets = channel_list(params, "SourceChOffset", channels, 0.0)?;
        Ok(Self { gains, offsets })
    }

    pub fn apply(&self, channel: usize, raw: f64) -> f64 {
        (raw - self.offsets[channel]) * self.gains[channel]
    }
}

fn channel_list(
    params: &Parameters,
    name: &str,
    channels: usize,
    default: f64,
) -> Result<Vec<f64>> {
    let Some(param) = params.get(name) else {
        debug!("No {} parameter; using {} for all channels", name, default);
        return Ok(vec![default; channels]);
    };
    let values = param
        .as_f64_list()
        .ok_or_else(|| Bci2kError::InvalidFormat(format!("{} is not a numeric list", name)))?;
    if values.len() != channels {
        return Err(Bci2kError::InvalidFormat(format!(
            "{} has {} entries but the file has {} channels",
            name,
            values.len(),
            channels
        )));
    }
    Ok(values)
}

/// Extracts one state value from a packed state vector.
pub fn extract_state(vector: &[u8], state: &StateDefinition) -> u64 {
    let first = state.bit_offset();
    (0..state.length as usize).fold(0u64, |acc, k| {
        let bit = first + k;
        let set = (vector[bit / 8] >> (bit % 8)) & 1;
        acc | (u64::from(set) << k)
    })
}

/// Decodes `samples` whole frames from `buf`.
///
/// `calibration` of `None` keeps raw values.
pub fn decode_frames(
    buf: &[u8],
    samples: usize,
    header: &DatHeader,
    states: &[&StateDefinition],
    calibration: Option<&Calibration>,
) -> Result<(Array2<f64>, RawStates)> {
    let frame_len = header.frame_len();
    if buf.len() != samples * frame_len {
        return Err(Bci2kError::SizeMismatch {
            context: "sample frames",
            expected: (samples * frame_len) as u64,
            found: buf.len() as u64,
        });
    }
    trace!("Decoding {} frames of {} bytes", samples, frame_len);

    let channels = header.source_channels;
    let width = header.data_format.value_width();
    let signal_len = channels * width;

    let mut signals = Array2::<f64>::zeros((channels, samples));
    let mut rows: Vec<Array2<u64>> = states.iter().map(|_| Array2::zeros((1, samples))).collect();

    for (j, frame) in buf.chunks_exact(frame_len).enumerate() {
        for (ch, value) in frame[..signal_len].chunks_exact(width).enumerate() {
            let raw = read_value(value, header.data_format);
            signals[[ch, j]] = match calibration {
                Some(cal) => cal.apply(ch, raw),
                None => raw,
            };
        }
        let vector = &frame[signal_len..];
        for (row, state) in rows.iter_mut().zip(states) {
            row[[0, j]] = extract_state(vector, state);
        }
    }

    let raw_states = states.iter().map(|s| s.name.clone()).zip(rows).collect();
    Ok((signals, raw_states))
}

fn read_value(bytes: &[u8], format: DataFormat) -> f64 {
    match format {
        DataFormat::Int16 => f64::from(LittleEndian::read_i16(bytes)),
        DataFormat::Int32 => f64::from(LittleEndian::read_i32(bytes)),
        DataFormat::Float32 => f64::from(LittleEndian::read_f32(bytes)),
    }
}
