//! Named per-sample state rows with sample-axis slicing.
//!
//! A [`StateContainer`] maps each state name to a `(1, samples)` row. All rows
//! share one sample count, so the container can be sliced along the sample
//! axis exactly like the signal matrix it came with:
//!
//! ```
//! # use bci2k_reader::{StateContainer, SampleSlice, SampleSelector};
//! # use ndarray::Array2;
//! # fn main() -> bci2k_reader::Result<()> {
//! let states = StateContainer::from_entries(vec![
//!     ("Running".to_string(), Array2::from_elem((1, 300), 1u64)),
//! ])?;
//! let window = states.slice_by(&SampleSlice::between(1, 100).into())?;
//! assert_eq!(window.get("Running")?.dim(), (1, 99));
//! # Ok(())
//! # }
//! ```

use ndarray::{Array2, Axis, concatenate};

use super::selection::{BoolMask, SampleSelector, Selection, take_samples};
use super::types::error::{Bci2kError, Result};

/// Argument of [`StateContainer::select`]: a state name or a sample selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateIndex {
    Key(String),
    Samples(SampleSelector),
}

impl From<&str> for StateIndex {
    fn from(name: &str) -> Self {
        StateIndex::Key(name.to_string())
    }
}

impl From<SampleSelector> for StateIndex {
    fn from(selector: SampleSelector) -> Self {
        StateIndex::Samples(selector)
    }
}

/// Result of [`StateContainer::select`].
#[derive(Debug, Clone, PartialEq)]
pub enum StateSelection<'a> {
    Values(&'a Array2<u64>),
    States(StateContainer),
}

/// An insertion-ordered collection of equally long state rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateContainer {
    entries: Vec<(String, Array2<u64>)>,
}

impl StateContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a container, checking that every row has shape `(1, n)` with
    /// the same `n` and that names are unique.
    pub fn from_entries(entries: impl IntoIterator<Item = (String, Array2<u64>)>) -> Result<Self> {
        let mut container = Self::new();
        for (name, values) in entries {
            container.insert(name, values)?;
        }
        Ok(container)
    }

    /// Adds a state row. Fails if the name is taken or the row does not fit
    /// the container's sample count.
    pub fn insert(&mut self, name: String, values: Array2<u64>) -> Result<()> {
        if values.nrows() != 1 {
            return Err(Bci2kError::InvalidArgument(format!(
                "state '{}' must have exactly one row, got {}",
                name,
                values.nrows()
            )));
        }
        if let Some(n) = self.sample_count()
            && values.ncols() != n
        {
            return Err(Bci2kError::InvalidArgument(format!(
                "state '{}' has {} samples, container has {}",
                name,
                values.ncols(),
                n
            )));
        }
        if self.contains(&name) {
            return Err(Bci2kError::InvalidArgument(format!("duplicate state '{}'", name)));
        }
        self.entries.push((name, values));
        Ok(())
    }

    /// The `(1, samples)` row of one state.
    pub fn get(&self, name: &str) -> Result<&Array2<u64>> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
            .ok_or_else(|| Bci2kError::KeyNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Array2<u64>)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of states.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Samples per state, or `None` for an empty container.
    pub fn sample_count(&self) -> Option<usize> {
        self.entries.first().map(|(_, v)| v.ncols())
    }

    /// `(number of states, samples)`.
    ///
    /// An empty container has no sample count to report and fails with
    /// [`Bci2kError::EmptyStates`].
    pub fn shape(&self) -> Result<(usize, usize)> {
        let samples = self.sample_count().ok_or(Bci2kError::EmptyStates)?;
        Ok((self.entries.len(), samples))
    }

    /// Slices every state the same way along the sample axis.
    ///
    /// An integer selector keeps one column per state rather than dropping the
    /// axis. An empty container slices to an empty container.
    pub fn slice_by(&self, selector: &SampleSelector) -> Result<StateContainer> {
        let selection = selector.resolve(self.sample_count().unwrap_or(0))?;
        Ok(self.take(&selection))
    }

    pub(crate) fn take(&self, selection: &Selection<'_>) -> StateContainer {
        StateContainer {
            entries: self
                .entries
                .iter()
                .map(|(name, values)| (name.clone(), take_samples(values, selection)))
                .collect(),
        }
    }

    /// Key lookup or sample slicing, chosen by the index variant.
    pub fn select(&self, index: impl Into<StateIndex>) -> Result<StateSelection<'_>> {
        match index.into() {
            StateIndex::Key(name) => self.get(&name).map(StateSelection::Values),
            StateIndex::Samples(selector) => self.slice_by(&selector).map(StateSelection::States),
        }
    }

    /// Appends `other` along the sample axis.
    ///
    /// Into an empty container every state of `other` is taken over as-is;
    /// otherwise both must hold the same state names.
    pub fn append(&mut self, other: StateContainer) -> Result<()> {
        if self.entries.is_empty() {
            self.entries = other.entries;
            return Ok(());
        }
        if other.len() != self.len() || !other.names().all(|n| self.contains(n)) {
            return Err(Bci2kError::InvalidArgument(
                "cannot append states with a different set of names".to_string(),
            ));
        }
        for (name, values) in self.entries.iter_mut() {
            let tail = other.get(name)?;
            *values = concatenate(Axis(1), &[values.view(), tail.view()])
                .map_err(|e| {
                    Bci2kError::InvalidArgument(format!(
                        "cannot append state '{}': {}",
                        name, e
                    ))
                })?;
        }
        Ok(())
    }

    /// A time mask with `true` wherever `predicate` holds for the named state.
    pub fn mask_where(&self, name: &str, predicate: impl Fn(u64) -> bool) -> Result<BoolMask> {
        let values = self.get(name)?;
        Ok(BoolMask::from(values.iter().map(|&v| predicate(v)).collect::<Vec<_>>()))
    }
}
