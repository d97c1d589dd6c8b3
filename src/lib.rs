//! redwing: bug localization for Android apps
//!
//! Ranks a repository's source files by how likely they are to contain a
//! reported bug. Methods are chunked and embedded, files are scored by
//! similarity to the bug report, and screens and components seen in a GUI
//! reproduction trace narrow and reorder the ranking.

pub mod chunk;
pub mod cli;
pub mod config;
pub mod domain;
pub mod encode;
pub mod error;
pub mod eval;
pub mod gui;
pub mod pipeline;
pub mod preprocess;
pub mod rank;
pub mod scan;
pub mod store;
pub mod utils;

pub use error::{LocalizeError, Result};
