use std::borrow::Cow;
use std::path::Path;

use log::{debug, info, trace};
use ndarray::{Array2, s};

use super::selection::{BoolMask, NormalizedSlice, SampleSelector, Selection, take_samples};
use super::states::StateContainer;
use super::stream::DatStream;
use super::types::decoder::SampleDecoder;
use super::types::error::{Bci2kError, Result};
use super::types::models::{Parameters, SampleCount, SeekOrigin, StateSelector};

/// A signal block with the states of the same samples.
pub type Block = (Array2<f64>, StateContainer);

/// The whole recording, decoded.
#[derive(Debug, Clone)]
struct Recording {
    signals: Array2<f64>,
    states: StateContainer,
}

/// Where a whole-recording request was served from.
enum Whole<'a> {
    Cached(&'a Recording),
    Fresh(Recording),
}

/// Random-access reader for BCI2000 recordings.
///
/// Samples can be addressed by index, slice or boolean mask through
/// [`at`](Self::at), or read sequentially from the cursor with
/// [`read`](Self::read). Two access modes serve the same results:
///
/// - **cached**: the first whole-recording request ([`signals`](Self::signals),
///   [`states`](Self::states) or [`read_all`](Self::read_all)) decodes the
///   file once; later reads are served from memory.
/// - **streaming**: every request seeks the decoder and decodes just the
///   samples it needs. Nothing is retained.
///
/// The cursor belongs to the decoder. `signals` and `states` restore it;
/// `read` advances it; index and slice access restore it; mask access leaves
/// it at the end of the last run.
///
/// Closing releases the file handle. A populated cache stays usable after
/// close; streaming reads then fail with [`Bci2kError::Closed`]. The handle is
/// also released when the reader is dropped.
#[derive(Debug)]
pub struct Bci2kReader<D: SampleDecoder = DatStream> {
    decoder: D,
    cache: Option<Recording>,
    use_cache: bool,
}

impl Bci2kReader<DatStream> {
    /// Open a BCI2000 `.dat` file.
    ///
    /// # Arguments
    /// * `path` - File path to the `.dat` file
    /// * `use_cache` - Keep the whole recording in memory once it has been decoded
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or its header is invalid.
    pub fn open(path: impl AsRef<Path>, use_cache: bool) -> Result<Self> {
        Ok(Self::from_decoder(DatStream::open(path)?, use_cache))
    }
}

impl<D: SampleDecoder> Bci2kReader<D> {
    /// Wraps an already opened decoder.
    pub fn from_decoder(decoder: D, use_cache: bool) -> Self {
        Self {
            decoder,
            cache: None,
            use_cache,
        }
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    /// Releases the decoder's file handle. Cached data stays available.
    pub fn close(&mut self) {
        self.decoder.close();
    }

    pub fn is_closed(&self) -> bool {
        self.decoder.is_closed()
    }

    /// Current cursor, in samples.
    pub fn position(&self) -> u64 {
        self.decoder.tell()
    }

    /// Moves the cursor. Never touches the cache.
    pub fn seek(&mut self, offset: i64, origin: SeekOrigin) -> Result<u64> {
        self.decoder.seek(offset, origin)
    }

    /// Moves the cursor with a `whence` integer: 0 start, 1 current, 2 end.
    pub fn seek_whence(&mut self, offset: i64, whence: i32) -> Result<u64> {
        self.seek(offset, SeekOrigin::try_from(whence)?)
    }

    /// Turns caching on or off for later requests. Does not fill or clear the cache.
    pub fn set_cache_enabled(&mut self, flag: bool) {
        self.use_cache = flag;
    }

    pub fn cache_enabled(&self) -> bool {
        self.use_cache
    }

    /// Whether a decoded copy of the recording is held in memory.
    pub fn is_cached(&self) -> bool {
        self.cache.is_some()
    }

    /// Drops the cached recording. The caching flag is kept.
    pub fn purge(&mut self) {
        if self.cache.take().is_some() {
            info!("Purged cached recording");
        }
    }

    pub fn parameters(&self) -> &Parameters {
        self.decoder.parameters()
    }

    pub fn sampling_rate(&self) -> Result<f64> {
        self.decoder.sampling_rate()
    }

    /// Total samples in the recording.
    pub fn len(&self) -> usize {
        self.decoder.total_samples() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn channel_count(&self) -> usize {
        self.decoder.channel_count()
    }

    /// The whole signal matrix, `(channels, samples)`, gain applied.
    ///
    /// Served from the cache if one exists (whether or not caching is still
    /// enabled). Otherwise the file is decoded, and the result is cached when
    /// caching is enabled. The cursor is left where it was.
    pub fn signals(&mut self) -> Result<Cow<'_, Array2<f64>>> {
        Ok(match self.whole()? {
            Whole::Cached(rec) => Cow::Borrowed(&rec.signals),
            Whole::Fresh(rec) => Cow::Owned(rec.signals),
        })
    }

    /// The states of the whole recording. Same caching and cursor behavior as
    /// [`signals`](Self::signals).
    pub fn states(&mut self) -> Result<Cow<'_, StateContainer>> {
        Ok(match self.whole()? {
            Whole::Cached(rec) => Cow::Borrowed(&rec.states),
            Whole::Fresh(rec) => Cow::Owned(rec.states),
        })
    }

    /// Reads `count` samples starting at the cursor and advances it.
    ///
    /// `SampleCount::All` reads to the end. With caching enabled and a cache
    /// present the samples come from memory and `apply_gain` is ignored.
    pub fn read(&mut self, count: impl Into<SampleCount>, apply_gain: bool) -> Result<Block> {
        let count = count.into();
        let pos = self.decoder.tell() as usize;
        let remaining = self.len().saturating_sub(pos);
        let samples = count.resolve(remaining);

        if self.use_cache
            && let Some(rec) = &self.cache
        {
            trace!("Serving {} samples at {} from cache", samples, pos);
            let window = Selection::Slice(NormalizedSlice {
                start: pos as isize,
                stop: (pos + samples) as isize,
                step: 1,
            });
            let block = (take_samples(&rec.signals, &window), rec.states.take(&window));
            self.decoder.seek((pos + samples) as i64, SeekOrigin::Start)?;
            return Ok(block);
        }

        let (signals, raw_states) =
            self.decoder
                .decode(SampleCount::Count(samples), &StateSelector::All, apply_gain)?;
        Ok((signals, StateContainer::from_entries(raw_states)?))
    }

    /// The whole recording.
    ///
    /// Served from the cache when caching is enabled and a cache exists.
    /// Otherwise the file is decoded with the given gain setting and, when
    /// caching is enabled, kept. The cursor ends at the end of the recording
    /// unless the cache answered.
    pub fn read_all(
        &mut self,
        apply_gain: bool,
    ) -> Result<(Cow<'_, Array2<f64>>, Cow<'_, StateContainer>)> {
        if !self.use_cache {
            let rec = self.decode_recording(apply_gain)?;
            return Ok((Cow::Owned(rec.signals), Cow::Owned(rec.states)));
        }
        let recording = match self.cache.take() {
            Some(rec) => rec,
            None => {
                let rec = self.decode_recording(apply_gain)?;
                info!("Cached {} samples x {} channels", rec.signals.ncols(), rec.signals.nrows());
                rec
            }
        };
        let rec = &*self.cache.insert(recording);
        Ok((Cow::Borrowed(&rec.signals), Cow::Borrowed(&rec.states)))
    }

    /// Samples selected by index, slice or boolean mask.
    ///
    /// - An index `i` selects `[i, i+1)`; negative counts from the end.
    /// - A slice follows the usual `start:stop:step` rules: negative bounds count
    ///   from the end, out-of-range bounds clamp.
    /// - A mask must have one entry per sample.
    ///
    /// In streaming mode a stepped slice reads the whole contiguous range it
    /// spans and subsamples in memory, and a mask is read run by run, leaving
    /// the cursor at the end of the last run. Either way the states carry every
    /// key, even when nothing is selected.
    pub fn at(&mut self, selector: impl Into<SampleSelector>) -> Result<Block> {
        let selector = selector.into();
        let selection = selector.resolve(self.len())?;

        if self.use_cache
            && let Some(rec) = &self.cache
        {
            trace!("Selecting {} samples from cache", selection.len());
            return Ok((take_samples(&rec.signals, &selection), rec.states.take(&selection)));
        }

        match selection {
            Selection::Slice(slice) => self.read_slice(slice),
            Selection::Mask(mask) => self.read_runs(mask),
        }
    }

    fn read_slice(&mut self, slice: NormalizedSlice) -> Result<Block> {
        let range = slice.enclosing();
        let saved = self.decoder.tell();

        self.decoder.seek(range.start as i64, SeekOrigin::Start)?;
        let block = self.read(range.len(), true);
        self.decoder.seek(saved as i64, SeekOrigin::Start)?;
        let (signals, states) = block?;

        if signals.ncols() != range.len() {
            return Err(Bci2kError::ShortRead {
                expected: range.len(),
                found: signals.ncols(),
            });
        }
        let local = Selection::Slice(slice.relative_to(range.start));
        Ok((take_samples(&signals, &local), states.take(&local)))
    }

    fn read_runs(&mut self, mask: &BoolMask) -> Result<Block> {
        let runs = mask.runs();
        debug!("Streaming {} masked samples in {} runs", mask.count(), runs.len());

        let mut signals = Array2::<f64>::zeros((self.channel_count(), mask.count()));
        // Zero-sample read: every state key, no columns yet.
        let (_, mut states) = self.read(SampleCount::Count(0), true)?;
        let mut filled = 0;
        for (start, stop) in runs {
            let len = stop - start;
            self.decoder.seek(start as i64, SeekOrigin::Start)?;
            let (block, block_states) = self.read(len, true)?;
            if block.ncols() != len {
                return Err(Bci2kError::ShortRead {
                    expected: len,
                    found: block.ncols(),
                });
            }
            signals.slice_mut(s![.., filled..filled + len]).assign(&block);
            states.append(block_states)?;
            filled += len;
        }
        Ok((signals, states))
    }

    fn whole(&mut self) -> Result<Whole<'_>> {
        let recording = match self.cache.take() {
            Some(rec) => rec,
            None => {
                let pos = self.decoder.tell();
                let decoded = self.decode_recording(true);
                self.decoder.seek(pos as i64, SeekOrigin::Start)?;
                let rec = decoded?;
                if !self.use_cache {
                    return Ok(Whole::Fresh(rec));
                }
                info!("Cached {} samples x {} channels", rec.signals.ncols(), rec.signals.nrows());
                rec
            }
        };
        Ok(Whole::Cached(self.cache.insert(recording)))
    }

    fn decode_recording(&mut self, apply_gain: bool) -> Result<Recording> {
        let (signals, raw_states) = self
            .decoder
            .decode(SampleCount::All, &StateSelector::All, apply_gain)?;
        Ok(Recording {
            signals,
            states: StateContainer::from_entries(raw_states)?,
        })
    }
}
