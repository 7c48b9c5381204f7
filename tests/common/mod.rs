//! Synthetic BCI2000 fixtures shared by the integration tests.
//!
//! The fixture mirrors the layout of a real 64-channel EEG recording:
//! 19696 int16 samples, 8 states, per-channel gain and offset.
#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

use bci2k_reader::{
    Bci2kReader, DatStream, Parameters, RawStates, Result, SampleCount, SampleDecoder, SeekOrigin,
    StateSelector,
};
use ndarray::Array2;
use tempfile::TempDir;

pub const CHANNELS: usize = 64;
pub const SAMPLES: usize = 19696;
pub const SAMPLING_RATE: f64 = 256.0;
const STATE_VECTOR_LEN: usize = 6;

/// (name, length, byte location, bit location)
pub const STATES: [(&str, u32, usize, u32); 8] = [
    ("Running", 1, 0, 0),
    ("Recording", 1, 0, 1),
    ("SourceTime", 16, 0, 2),
    ("StimulusTime", 16, 2, 2),
    ("StimulusCode", 5, 4, 2),
    ("StimulusType", 1, 4, 7),
    ("StimulusBegin", 1, 5, 0),
    ("PhaseInSequence", 2, 5, 1),
];

pub struct Fixture {
    _dir: TempDir,
    pub path: PathBuf,
}

impl Fixture {
    pub fn open(&self, use_cache: bool) -> Bci2kReader {
        Bci2kReader::open(&self.path, use_cache).expect("open fixture")
    }

    pub fn open_counting(&self, use_cache: bool) -> Bci2kReader<CountingDecoder> {
        let inner = DatStream::open(&self.path).expect("open fixture");
        Bci2kReader::from_decoder(CountingDecoder { inner, decodes: 0 }, use_cache)
    }
}

pub fn raw_value(ch: usize, j: usize) -> i16 {
    ((ch * 31 + j * 7) % 2000) as i16 - 1000
}

pub fn gain(ch: usize) -> f64 {
    0.25 * (ch % 4 + 1) as f64
}

pub fn offset(ch: usize) -> f64 {
    (ch % 3) as f64
}

pub fn expected_signal(ch: usize, j: usize) -> f64 {
    (f64::from(raw_value(ch, j)) - offset(ch)) * gain(ch)
}

/// Stimulus 1..=5 for the first 200 samples of every 250-sample block,
/// cycling through 0..6; 0 in between.
pub fn stimulus_code(j: usize) -> u64 {
    if j % 250 < 200 { ((j / 250) % 6) as u64 } else { 0 }
}

pub fn state_value(name: &str, j: usize) -> u64 {
    match name {
        "Running" | "Recording" => 1,
        "SourceTime" => (j % 65536) as u64,
        "StimulusTime" => ((j * 3) % 65536) as u64,
        "StimulusCode" => stimulus_code(j),
        "StimulusType" => u64::from(stimulus_code(j) == 1),
        "StimulusBegin" => u64::from(j % 250 == 0),
        "PhaseInSequence" => (j % 4) as u64,
        other => panic!("unknown fixture state {}", other),
    }
}

fn set_bits(vector: &mut [u8], first_bit: usize, length: u32, value: u64) {
    for k in 0..length as usize {
        if (value >> k) & 1 == 1 {
            let bit = first_bit + k;
            vector[bit / 8] |= 1 << (bit % 8);
        }
    }
}

fn header_text() -> String {
    let mut body = String::from("[ State Vector Definition ]\r\n");
    for (name, length, byte, bit) in STATES {
        body.push_str(&format!("{} {} 0 {} {}\r\n", name, length, byte, bit));
    }
    body.push_str("[ Parameter Definition ]\r\n");
    body.push_str(concat!(
        "Source:Signal%20Properties:DataIOFilter int SamplingRate= 256Hz 256Hz 1 % ",
        "// sample rate\r\n"
    ));
    let gains: Vec<String> = (0..CHANNELS).map(|ch| gain(ch).to_string()).collect();
    body.push_str(&format!(
        "Source:Signal%20Properties:DataIOFilter floatlist SourceChGain= {} {} // gains\r\n",
        CHANNELS,
        gains.join(" ")
    ));
    let offsets: Vec<String> = (0..CHANNELS).map(|ch| offset(ch).to_string()).collect();
    body.push_str(&format!(
        "Source:Signal%20Properties:DataIOFilter floatlist SourceChOffset= {} {} // offsets\r\n",
        CHANNELS,
        offsets.join(" ")
    ));
    body.push_str("Storage:Documentation string SubjectName= Test%20Subject // name\r\n");
    body.push_str("\r\n");

    let first = |len: usize| {
        format!(
            "BCI2000V= 1.1 HeaderLen= {:>8} SourceCh= {} StatevectorLen= {} DataFormat= int16\r\n",
            len, CHANNELS, STATE_VECTOR_LEN
        )
    };
    let total = first(0).len() + body.len();
    first(total) + &body
}

/// Writes the fixture recording into a fresh temporary directory.
pub fn write_fixture() -> Fixture {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("eeg1_1.dat");

    let mut bytes = header_text().into_bytes();
    bytes.reserve(SAMPLES * (CHANNELS * 2 + STATE_VECTOR_LEN));
    for j in 0..SAMPLES {
        for ch in 0..CHANNELS {
            bytes.extend_from_slice(&raw_value(ch, j).to_le_bytes());
        }
        let mut vector = [0u8; STATE_VECTOR_LEN];
        for (name, length, byte, bit) in STATES {
            set_bits(&mut vector, byte * 8 + bit as usize, length, state_value(name, j));
        }
        bytes.extend_from_slice(&vector);
    }
    fs::write(&path, bytes).expect("write fixture");

    Fixture { _dir: dir, path }
}

/// Writes `bytes` as a `.dat` file into a fresh temporary directory.
pub fn write_bytes(bytes: &[u8]) -> Fixture {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("custom.dat");
    fs::write(&path, bytes).expect("write fixture");
    Fixture { _dir: dir, path }
}

/// A 2-channel, 20-sample recording with one `Running` state and the given
/// parameter lines. Raw sample `j` of channel `ch` is `10 * j + ch`.
pub fn small_recording(parameter_lines: &[&str]) -> Vec<u8> {
    let mut body = String::from("[ State Vector Definition ]\r\nRunning 1 0 0 0\r\n");
    body.push_str("[ Parameter Definition ]\r\n");
    for line in parameter_lines {
        body.push_str(line);
        body.push_str("\r\n");
    }
    body.push_str("\r\n");
    let first = |len: usize| {
        format!("HeaderLen= {:>8} SourceCh= 2 StatevectorLen= 1 DataFormat= int16\r\n", len)
    };
    let total = first(0).len() + body.len();

    let mut bytes = (first(total) + &body).into_bytes();
    for j in 0..20i16 {
        for ch in 0..2i16 {
            bytes.extend_from_slice(&(10 * j + ch).to_le_bytes());
        }
        bytes.push(1);
    }
    bytes
}

/// Expected `(channels, samples)` signal matrix for the given sample positions.
pub fn expected_signals(positions: &[usize]) -> Array2<f64> {
    Array2::from_shape_fn((CHANNELS, positions.len()), |(ch, k)| {
        expected_signal(ch, positions[k])
    })
}

/// Decoder wrapper that counts `decode` calls.
#[derive(Debug)]
pub struct CountingDecoder {
    inner: DatStream,
    pub decodes: usize,
}

impl SampleDecoder for CountingDecoder {
    fn close(&mut self) {
        self.inner.close()
    }

    fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    fn decode(
        &mut self,
        count: SampleCount,
        states: &StateSelector,
        apply_gain: bool,
    ) -> Result<(Array2<f64>, RawStates)> {
        self.decodes += 1;
        self.inner.decode(count, states, apply_gain)
    }

    fn seek(&mut self, offset: i64, origin: SeekOrigin) -> Result<u64> {
        self.inner.seek(offset, origin)
    }

    fn tell(&self) -> u64 {
        self.inner.tell()
    }

    fn total_samples(&self) -> u64 {
        self.inner.total_samples()
    }

    fn channel_count(&self) -> usize {
        self.inner.channel_count()
    }

    fn sampling_rate(&self) -> Result<f64> {
        self.inner.sampling_rate()
    }

    fn parameters(&self) -> &Parameters {
        self.inner.parameters()
    }
}

/// Decoder wrapper that never returns more than `max_samples` per call.
#[derive(Debug)]
pub struct TruncatingDecoder {
    inner: DatStream,
    pub max_samples: usize,
}

impl TruncatingDecoder {
    pub fn open(fixture: &Fixture, max_samples: usize) -> Self {
        let inner = DatStream::open(&fixture.path).expect("open fixture");
        Self { inner, max_samples }
    }
}

impl SampleDecoder for TruncatingDecoder {
    fn close(&mut self) {
        self.inner.close()
    }

    fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    fn decode(
        &mut self,
        count: SampleCount,
        states: &StateSelector,
        apply_gain: bool,
    ) -> Result<(Array2<f64>, RawStates)> {
        if count == SampleCount::All {
            self.inner.seek(0, SeekOrigin::Start)?;
        }
        let remaining = (self.inner.total_samples() - self.inner.tell()) as usize;
        let wanted = count.resolve(remaining).min(self.max_samples);
        self.inner.decode(SampleCount::Count(wanted), states, apply_gain)
    }

    fn seek(&mut self, offset: i64, origin: SeekOrigin) -> Result<u64> {
        self.inner.seek(offset, origin)
    }

    fn tell(&self) -> u64 {
        self.inner.tell()
    }

    fn total_samples(&self) -> u64 {
        self.inner.total_samples()
    }

    fn channel_count(&self) -> usize {
        self.inner.channel_count()
    }

    fn sampling_rate(&self) -> Result<f64> {
        self.inner.sampling_rate()
    }

    fn parameters(&self) -> &Parameters {
        self.inner.parameters()
    }
}
