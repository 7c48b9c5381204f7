//! File format parsing layer for BCI2000 `.dat` recordings.
//!
//! This module provides the parsing layer between raw file I/O in
//! [`DatStream`](crate::bci2k::stream::DatStream) and the typed header and
//! sample buffers.
//!
//! # Module Organization
//!
//! - [`header`]: Parses the text header (first line, states, parameters)
//! - [`parameters`]: Parses individual parameter definition lines
//! - [`content`]: Decodes binary sample frames into signals and states
//!
//! # Architecture
//!
//! ```text
//! File Structure:
//! ┌──────────────────────────┐
//! │  First line              │ ← header::parse()
//! │  [ State Vector Def. ]   │
//! │  [ Parameter Def. ]      │ ← parameters::parse_line()
//! ├──────────────────────────┤  byte HeaderLen
//! │  Frame 0                 │ ← content::decode_frames()
//! │  Frame 1                 │
//! │  ...                     │
//! └──────────────────────────┘
//! ```

pub mod content;
pub mod header;
pub mod parameters;
