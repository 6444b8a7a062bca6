//! The storage collaborator.
//!
//! Documents never touch bytes directly; they go through a [`Store`], which
//! keeps the core testable and lets remote backends (HTTP, signed object
//! storage) plug in without changing the model. The core ships the
//! filesystem backend; `satcat-remote` adds the rest.

use crate::error::{Error, Result};
use std::fmt::Debug;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Byte-level access to a document location.
///
/// Implementations map their transport failures onto [`Error::NotFound`]
/// (the location does not exist) and [`Error::Transport`] (everything
/// else). The core never retries.
pub trait Store: Debug {
    /// Fetch the bytes at a location.
    fn fetch(&self, location: &str) -> Result<Vec<u8>>;

    /// Write bytes to a location, creating any missing parents.
    fn store(&self, location: &str, bytes: &[u8]) -> Result<()>;

    /// Whether a location currently exists.
    fn exists(&self, location: &str) -> bool;
}

/// Filesystem-backed storage.
#[derive(Debug, Clone, Default)]
pub struct FileStore;

impl FileStore {
    pub fn shared() -> Arc<dyn Store> {
        Arc::new(FileStore)
    }
}

impl Store for FileStore {
    fn fetch(&self, location: &str) -> Result<Vec<u8>> {
        match fs::read(location) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(location.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, location: &str, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = Path::new(location).parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(location, bytes)?;
        Ok(())
    }

    fn exists(&self, location: &str) -> bool {
        Path::new(location).exists()
    }
}
