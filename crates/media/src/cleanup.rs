//! Scoped ownership of transient attachment files.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Files created while handling a single inbound message.
///
/// Every tracked file is removed when the guard is dropped, on every exit
/// path of the owning call.
#[derive(Debug, Default)]
pub struct TransientMedia {
    files: Vec<PathBuf>,
}

impl TransientMedia {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&mut self, path: PathBuf) {
        self.files.push(path);
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn remove(path: &Path) {
        match std::fs::remove_file(path) {
            Ok(()) => debug!(path = %path.display(), "removed transient media"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {},
            Err(e) => warn!(path = %path.display(), error = %e, "failed to remove transient media"),
        }
    }
}

impl Drop for TransientMedia {
    fn drop(&mut self) {
        for path in self.files.drain(..) {
            Self::remove(&path);
        }
    }
}
