//! Core BCI2000 reader module

pub mod format;
pub mod reader;
pub mod selection;
pub mod states;
pub mod stream;
pub mod types;
mod utils;
