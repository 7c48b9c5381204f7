//! # bci2k-reader
//!
//! Random-access reader for BCI2000 `.dat` recordings.
//!
//! A recording is a `(channels, samples)` signal matrix plus named state rows.
//! [`Bci2kReader`] addresses it by sample index, slice or boolean mask, either
//! from an in-memory cache or by re-decoding the file on every request.
//!
//! ```no_run
//! use bci2k_reader::{Bci2kReader, SampleSlice};
//!
//! # fn main() -> bci2k_reader::Result<()> {
//! let mut reader = Bci2kReader::open("eeg1_1.dat", true)?;
//! let mask = reader.states()?.mask_where("StimulusCode", |v| v == 1)?;
//! let (signals, states) = reader.at(mask)?;
//! let (window, _) = reader.at(SampleSlice::between(100, 200).with_step(2))?;
//! # Ok(())
//! # }
//! ```
pub mod bci2k;

// Re-export the main types for convenience
pub use bci2k::{
    reader::{Bci2kReader, Block},
    selection::{BoolMask, NormalizedSlice, SampleSelector, SampleSlice, runs_of},
    states::{StateContainer, StateIndex, StateSelection},
    stream::DatStream,
    types::{
        decoder::{RawStates, SampleDecoder},
        error::{Bci2kError, Result},
        models::{
            DataFormat, DatHeader, ParamValue, Parameter, Parameters, SampleCount, SeekOrigin,
            StateDefinition, StateSelector,
        },
    },
};
