//! Filesystem layer for treesync
//!
//! Provides tree-relative path handling, content fingerprints, tree
//! enumeration and the I/O primitives the sync engine mutates trees with.

pub mod config;
pub mod error;
pub mod fingerprint;
pub mod io;
pub mod ops;
pub mod path;
pub mod tree;

pub use config::ConfigStore;
pub use error::{Error, Result};
pub use fingerprint::{Fingerprint, fingerprint_bytes, fingerprint_file};
pub use ops::{FileOps, StdFileOps};
pub use path::RelativePath;
pub use tree::{TreeListing, TreeWalker};
