//! Cross-system photo identity
//!
//! The two databases share no keys, so a photo is identified by its lowercased
//! filename plus its exact size in bytes. Two different files with the same name
//! and size are treated as one photo.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PhotoKey {
    pub filename: String,
    pub filesize: i64,
}

impl PhotoKey {
    /// Build a key, or `None` when the filename is empty or the size is missing or zero
    pub fn new(filename: Option<&str>, filesize: Option<i64>) -> Option<Self> {
        let filename = filename.filter(|f| !f.is_empty())?;
        let filesize = filesize.filter(|s| *s != 0)?;
        Some(Self {
            filename: filename.to_lowercase(),
            filesize,
        })
    }
}

impl fmt::Display for PhotoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} bytes)", self.filename, self.filesize)
    }
}
