//! Shared helpers: text decoding, hashing, path handling

pub mod encoding;
pub mod hashing;
pub mod paths;

pub use encoding::{is_binary_file, read_file_safe, DEFAULT_SAMPLE_SIZE};
pub use hashing::content_hash;
pub use paths::{file_name_of, normalize_path, relative_route};
