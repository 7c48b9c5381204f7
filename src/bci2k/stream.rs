//! Seekable decoder over a BCI2000 `.dat` file.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use log::{debug, info, trace, warn};

use super::format::content::{self, Calibration};
use super::format::header;
use super::types::decoder::{RawStates, SampleDecoder};
use super::types::error::{Bci2kError, Result};
use super::types::models::*;
use ndarray::Array2;

/// A `.dat` file opened for decoding.
///
/// The header is parsed once at open. Sample frames are read on demand for
/// each [`decode`](SampleDecoder::decode) call, starting at the cursor.
/// Closing drops the file handle but keeps the header and the cursor, so
/// metadata stays available.
#[derive(Debug)]
pub struct DatStream {
    path: PathBuf,
    file: Option<BufReader<File>>,
    header: DatHeader,
    total_samples: u64,
    cursor: u64,
}

impl DatStream {
    /// Open a `.dat` file and parse its header.
    ///
    /// # Errors
    /// Returns an error if:
    /// - File cannot be opened
    /// - The header is malformed or uses an unsupported data format
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening BCI2000 file: {}", path.display());
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();
        let mut file = BufReader::new(file);

        let header = header::parse(&mut file)?;

        let frame_len = header.frame_len() as u64;
        if frame_len == 0 {
            return Err(Bci2kError::InvalidFormat("Sample frames have zero length".to_string()));
        }
        let data_len = file_len.saturating_sub(header.header_len);
        let total_samples = data_len / frame_len;
        if data_len % frame_len != 0 {
            warn!(
                "{} trailing bytes after the last whole frame are ignored",
                data_len % frame_len
            );
        }

        info!(
            "BCI2000 file opened: {} samples x {} channels, {} states",
            total_samples,
            header.source_channels,
            header.states.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            file: Some(file),
            header,
            total_samples,
            cursor: 0,
        })
    }

    pub fn header(&self) -> &DatHeader {
        &self.header
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SampleDecoder for DatStream {
    fn close(&mut self) {
        if self.file.take().is_some() {
            info!("Closed BCI2000 file: {}", self.path.display());
        }
    }

    fn is_closed(&self) -> bool {
        self.file.is_none()
    }

    fn decode(
        &mut self,
        count: SampleCount,
        states: &StateSelector,
        apply_gain: bool,
    ) -> Result<(Array2<f64>, RawStates)> {
        if self.file.is_none() {
            return Err(Bci2kError::Closed);
        }
        let start = if count == SampleCount::All { 0 } else { self.cursor };
        let samples = count.resolve((self.total_samples - start) as usize);
        let selected = select_states(&self.header, states)?;
        let calibration = if apply_gain {
            let channels = self.header.source_channels;
            Some(Calibration::from_parameters(&self.header.parameters, channels)?)
        } else {
            None
        };

        let frame_len = self.header.frame_len();
        let mut buf = vec![0u8; samples * frame_len];
        let file = self.file.as_mut().ok_or(Bci2kError::Closed)?;
        file.seek(SeekFrom::Start(self.header.header_len + start * frame_len as u64))?;
        file.read_exact(&mut buf)?;
        trace!("Read {} samples at {} from {}", samples, start, self.path.display());

        let decoded =
            content::decode_frames(&buf, samples, &self.header, &selected, calibration.as_ref())?;
        // The cursor only moves once the whole window decoded.
        self.cursor = start + samples as u64;
        Ok(decoded)
    }

    fn seek(&mut self, offset: i64, origin: SeekOrigin) -> Result<u64> {
        let base = match origin {
            SeekOrigin::Start => 0,
            SeekOrigin::Current => self.cursor as i64,
            SeekOrigin::End => self.total_samples as i64,
        };
        let wanted = base.saturating_add(offset);
        let target = wanted.clamp(0, self.total_samples as i64);
        if target != wanted {
            debug!("Seek target {} clamped to {}", wanted, target);
        }
        self.cursor = target as u64;
        Ok(self.cursor)
    }

    fn tell(&self) -> u64 {
        self.cursor
    }

    fn total_samples(&self) -> u64 {
        self.total_samples
    }

    fn channel_count(&self) -> usize {
        self.header.source_channels
    }

    fn sampling_rate(&self) -> Result<f64> {
        self.header
            .parameters
            .get("SamplingRate")
            .and_then(Parameter::as_f64)
            .ok_or_else(|| {
                Bci2kError::InvalidFormat(
                    "SamplingRate parameter is missing or not numeric".to_string(),
                )
            })
    }

    fn parameters(&self) -> &Parameters {
        &self.header.parameters
    }
}

fn select_states<'h>(
    header: &'h DatHeader,
    selector: &StateSelector,
) -> Result<Vec<&'h StateDefinition>> {
    match selector {
        StateSelector::All => Ok(header.states.iter().collect()),
        StateSelector::Named(names) => names
            .iter()
            .map(|name| header.state(name).ok_or_else(|| Bci2kError::KeyNotFound(name.clone())))
            .collect(),
    }
}
