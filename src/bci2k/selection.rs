//! Sample-axis selection shared by the reader and the state container.
//!
//! A caller addresses samples with a [`SampleSelector`]: a single index, a
//! `start:stop:step` slice, or a boolean time mask. Before use, a selector is
//! resolved against the number of samples it addresses:
//!
//! - integers and slices become a [`NormalizedSlice`] with the usual
//!   end-relative and clamping rules,
//! - masks are checked for length and kept as-is.
//!
//! [`runs_of`] decomposes a mask into the maximal contiguous runs of `true`
//! that a streaming reader fetches one by one.

use std::iter;
use std::ops::{Range, RangeFrom, RangeFull, RangeTo};

use ndarray::{Array2, ArrayBase, Axis, Data, Dimension, Slice};

use super::types::error::{Bci2kError, Result};

/// A `start:stop:step` slice over the sample axis.
///
/// `None` bounds mean "from the beginning" / "to the end" (in the direction of
/// `step`). Negative bounds count from the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleSlice {
    pub start: Option<isize>,
    pub stop: Option<isize>,
    pub step: isize,
}

impl SampleSlice {
    pub fn new(start: Option<isize>, stop: Option<isize>, step: isize) -> Self {
        Self { start, stop, step }
    }

    /// `start:stop`
    pub fn between(start: isize, stop: isize) -> Self {
        Self::new(Some(start), Some(stop), 1)
    }

    /// `start:`
    pub fn from_start(start: isize) -> Self {
        Self::new(Some(start), None, 1)
    }

    /// `:stop`
    pub fn up_to(stop: isize) -> Self {
        Self::new(None, Some(stop), 1)
    }

    /// `:`
    pub fn full() -> Self {
        Self::new(None, None, 1)
    }

    pub fn with_step(self, step: isize) -> Self {
        Self { step, ..self }
    }
}

impl From<Range<isize>> for SampleSlice {
    fn from(r: Range<isize>) -> Self {
        Self::between(r.start, r.end)
    }
}

impl From<RangeFrom<isize>> for SampleSlice {
    fn from(r: RangeFrom<isize>) -> Self {
        Self::from_start(r.start)
    }
}

impl From<RangeTo<isize>> for SampleSlice {
    fn from(r: RangeTo<isize>) -> Self {
        Self::up_to(r.end)
    }
}

impl From<RangeFull> for SampleSlice {
    fn from(_: RangeFull) -> Self {
        Self::full()
    }
}

/// A slice resolved against a concrete axis length.
///
/// Bounds are clamped into the axis: for a positive step
/// `0 <= start, stop <= len`; for a negative step `-1 <= start, stop <= len - 1`
/// where `-1` stands for "before the first sample".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizedSlice {
    pub start: isize,
    pub stop: isize,
    pub step: isize,
}

impl NormalizedSlice {
    pub fn new(slice: &SampleSlice, axis_len: usize) -> Result<Self> {
        let step = slice.step;
        if step == 0 {
            return Err(Bci2kError::InvalidArgument("slice step cannot be zero".to_string()));
        }
        let len = axis_len as isize;
        let (lower, upper) = if step < 0 { (-1, len - 1) } else { (0, len) };
        let clamp = |v: isize| {
            if v < 0 {
                (v + len).max(lower)
            } else {
                v.min(upper)
            }
        };
        let start = slice
            .start
            .map(clamp)
            .unwrap_or(if step < 0 { upper } else { lower });
        let stop = slice
            .stop
            .map(clamp)
            .unwrap_or(if step < 0 { lower } else { upper });
        Ok(Self { start, stop, step })
    }

    /// A single sample `[i, i+1)`. Negative `i` counts from the end; anything
    /// still out of range yields an empty slice.
    pub fn single(index: isize, axis_len: usize) -> Self {
        let len = axis_len as isize;
        let i = if index < 0 { index.saturating_add(len) } else { index };
        let start = i.clamp(0, len);
        let stop = i.saturating_add(1).clamp(0, len);
        Self { start, stop: stop.max(start), step: 1 }
    }

    /// Number of selected samples.
    pub fn len(&self) -> usize {
        let (span, step) = if self.step > 0 {
            (self.stop - self.start, self.step)
        } else {
            (self.start - self.stop, -self.step)
        };
        if span <= 0 { 0 } else { ((span - 1) / step + 1) as usize }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The contiguous sample range a step-1 read must cover to serve this slice.
    ///
    /// For a positive step this is the whole `[start, stop)`, not the tighter
    /// span ending at the last selected sample.
    pub fn enclosing(&self) -> Range<usize> {
        if self.is_empty() {
            let at = self.start.max(0) as usize;
            return at..at;
        }
        if self.step > 0 {
            self.start as usize..self.stop as usize
        } else {
            (self.stop + 1) as usize..(self.start + 1) as usize
        }
    }

    /// Shifts the slice so that sample `offset` becomes sample 0.
    pub fn relative_to(&self, offset: usize) -> Self {
        let offset = offset as isize;
        Self {
            start: self.start - offset,
            stop: self.stop - offset,
            step: self.step,
        }
    }

    /// Positions of the selected samples, in selection order.
    pub fn positions(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len()).map(move |k| (self.start + k as isize * self.step) as usize)
    }

    fn as_axis_slice(&self) -> Slice {
        if self.is_empty() {
            return Slice::new(0, Some(0), 1);
        }
        let range = self.enclosing();
        // ndarray walks a negative-step range from its end, which is `start`.
        Slice::new(range.start as isize, Some(range.end as isize), self.step)
    }
}

/// A boolean time mask; `true` marks samples to keep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoolMask {
    bits: Vec<bool>,
}

impl BoolMask {
    /// Builds a mask from an ndarray of rank 1, or rank 2 with one axis of
    /// length 1 (a `(1, N)` row or an `(N, 1)` column).
    pub fn from_array<S, D>(array: &ArrayBase<S, D>) -> Result<Self>
    where
        S: Data<Elem = bool>,
        D: Dimension,
    {
        let shape = array.shape();
        match shape.len() {
            1 => {}
            2 if shape[0] == 1 || shape[1] == 1 => {}
            _ => {
                return Err(Bci2kError::InvalidArgument(format!(
                    "mask must be 1-D, (1, N) or (N, 1); got shape {:?}",
                    shape
                )));
            }
        }
        Ok(Self { bits: array.iter().copied().collect() })
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.bits
    }

    /// Number of `true` entries.
    pub fn count(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    pub fn positions(&self) -> Vec<usize> {
        self.bits
            .iter()
            .enumerate()
            .filter_map(|(i, &b)| b.then_some(i))
            .collect()
    }

    pub fn runs(&self) -> Vec<(usize, usize)> {
        runs_of(&self.bits)
    }

    fn check_len(&self, axis_len: usize) -> Result<()> {
        if self.bits.len() != axis_len {
            return Err(Bci2kError::InvalidArgument(format!(
                "mask length {} does not match {} samples",
                self.bits.len(),
                axis_len
            )));
        }
        Ok(())
    }
}

impl From<Vec<bool>> for BoolMask {
    fn from(bits: Vec<bool>) -> Self {
        Self { bits }
    }
}

impl From<&[bool]> for BoolMask {
    fn from(bits: &[bool]) -> Self {
        Self { bits: bits.to_vec() }
    }
}

/// Splits a mask into its maximal runs of `true`, as half-open
/// `(start, stop)` pairs in ascending order.
///
/// The mask is conceptually padded with `false` on both sides; every change
/// of value is an edge, and consecutive edges pair up into runs.
pub fn runs_of(mask: &[bool]) -> Vec<(usize, usize)> {
    let mut edges = Vec::new();
    let mut prev = false;
    for (i, &bit) in mask.iter().chain(iter::once(&false)).enumerate() {
        if bit != prev {
            edges.push(i);
            prev = bit;
        }
    }
    edges.chunks_exact(2).map(|pair| (pair[0], pair[1])).collect()
}

/// What to take along the sample axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleSelector {
    /// One sample; negative counts from the end.
    Index(isize),
    Range(SampleSlice),
    Mask(BoolMask),
}

impl SampleSelector {
    /// Resolves the selector against an axis of `axis_len` samples.
    pub fn resolve(&self, axis_len: usize) -> Result<Selection<'_>> {
        match self {
            SampleSelector::Index(i) => Ok(Selection::Slice(NormalizedSlice::single(*i, axis_len))),
            SampleSelector::Range(slice) => {
                Ok(Selection::Slice(NormalizedSlice::new(slice, axis_len)?))
            }
            SampleSelector::Mask(mask) => {
                mask.check_len(axis_len)?;
                Ok(Selection::Mask(mask))
            }
        }
    }
}

impl From<isize> for SampleSelector {
    fn from(i: isize) -> Self {
        SampleSelector::Index(i)
    }
}

impl From<SampleSlice> for SampleSelector {
    fn from(slice: SampleSlice) -> Self {
        SampleSelector::Range(slice)
    }
}

impl From<Range<isize>> for SampleSelector {
    fn from(r: Range<isize>) -> Self {
        SampleSelector::Range(r.into())
    }
}

impl From<RangeFrom<isize>> for SampleSelector {
    fn from(r: RangeFrom<isize>) -> Self {
        SampleSelector::Range(r.into())
    }
}

impl From<RangeTo<isize>> for SampleSelector {
    fn from(r: RangeTo<isize>) -> Self {
        SampleSelector::Range(r.into())
    }
}

impl From<RangeFull> for SampleSelector {
    fn from(r: RangeFull) -> Self {
        SampleSelector::Range(r.into())
    }
}

impl From<BoolMask> for SampleSelector {
    fn from(mask: BoolMask) -> Self {
        SampleSelector::Mask(mask)
    }
}

/// A selector resolved against a concrete axis length.
#[derive(Debug, Clone, Copy)]
pub enum Selection<'a> {
    Slice(NormalizedSlice),
    Mask(&'a BoolMask),
}

impl Selection<'_> {
    /// Number of samples the selection yields.
    pub fn len(&self) -> usize {
        match self {
            Selection::Slice(s) => s.len(),
            Selection::Mask(m) => m.count(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Copies the selected columns of a `(rows, samples)` buffer.
///
/// Row count is preserved; a single-sample selection yields one column.
pub fn take_samples<T: Clone>(array: &Array2<T>, selection: &Selection<'_>) -> Array2<T> {
    match selection {
        Selection::Slice(s) => array.slice_axis(Axis(1), s.as_axis_slice()).to_owned(),
        Selection::Mask(m) => array.select(Axis(1), &m.positions()),
    }
}
