//! The decoder contract the random-access reader is built on.

use ndarray::Array2;

use super::error::Result;
use super::models::{Parameters, SampleCount, SeekOrigin, StateSelector};

/// Named raw state rows, each of shape `(1, samples)`, in header order.
pub type RawStates = Vec<(String, Array2<u64>)>;

/// A decoder that turns regions of a recording into signal and state buffers.
///
/// The decoder owns the one cursor of the stream. Every `seek` and every
/// `decode` moves it; callers that need a stable cursor save and restore it
/// with [`tell`](SampleDecoder::tell) and [`seek`](SampleDecoder::seek).
pub trait SampleDecoder {
    /// Releases the underlying handle. Metadata and the cursor stay available.
    fn close(&mut self);

    fn is_closed(&self) -> bool;

    /// Decodes samples into a `(channels, samples)` signal matrix and the raw
    /// state rows.
    ///
    /// - `SampleCount::All` rewinds and decodes the whole recording, leaving
    ///   the cursor at the end.
    /// - `SampleCount::Count(n)` decodes `min(n, remaining)` samples from the
    ///   cursor and advances it by that many.
    fn decode(
        &mut self,
        count: SampleCount,
        states: &StateSelector,
        apply_gain: bool,
    ) -> Result<(Array2<f64>, RawStates)>;

    /// Moves the cursor and returns the new position. Targets outside
    /// `[0, total_samples]` are clamped.
    fn seek(&mut self, offset: i64, origin: SeekOrigin) -> Result<u64>;

    /// Current cursor, in samples from the start.
    fn tell(&self) -> u64;

    fn total_samples(&self) -> u64;

    fn channel_count(&self) -> usize;

    fn sampling_rate(&self) -> Result<f64>;

    fn parameters(&self) -> &Parameters;
}
