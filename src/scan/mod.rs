//! Source-tree scanning with gitignore support

pub mod scanner;

pub use scanner::{FileScanner, ScanStats};
