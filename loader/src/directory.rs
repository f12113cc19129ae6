use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use common::ClassIdentifier;
use tracing::trace;

use crate::{LoadError, ReadClass};

/// Class files laid out below a root directory by package.
pub struct Directory {
    root: PathBuf,
}

impl Directory {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

impl ReadClass for Directory {
    fn read_class(&mut self, identifier: &ClassIdentifier) -> Result<Vec<u8>, LoadError> {
        let path = self.root.join(identifier.path());
        trace!("looking for {identifier} at {}", path.display());

        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(LoadError::NotFound(identifier.clone())),
            Err(err) => Err(LoadError::unexpected(
                identifier,
                anyhow::Error::new(err).context(format!("unable to read {}", path.display())),
            )),
        }
    }
}
