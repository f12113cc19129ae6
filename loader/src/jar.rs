use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use anyhow::{Context, Result};
use common::ClassIdentifier;
use tracing::{debug, trace};
use zip::{ZipArchive, result::ZipError};

use crate::{LoadError, ReadClass};

/// A zip archive of class files: a jar, or a jmod whose classes live
/// below `classes/`.
pub struct Jar<R: Read + Seek = File> {
    archive: ZipArchive<R>,
    prefix: &'static str,
}

impl Jar<File> {
    pub fn open(path: &Path) -> Result<Self> {
        Self::new(File::open(path)?)
    }

    pub fn open_jmod(path: &Path) -> Result<Self> {
        let mut jar = Self::open(path).with_context(|| format!("unable to open module {}", path.display()))?;
        jar.prefix = "classes/";
        Ok(jar)
    }
}

impl<R: Read + Seek> Jar<R> {
    pub fn new(reader: R) -> Result<Self> {
        let archive = ZipArchive::new(reader)?;
        debug!("opened archive with {} entries", archive.len());
        Ok(Self { archive, prefix: "" })
    }

    /// Names of all `.class` entries, in archive order.
    pub fn class_files(&self) -> Vec<String> {
        self.archive
            .file_names()
            .filter(|name| name.starts_with(self.prefix) && name.ends_with(".class"))
            .map(str::to_string)
            .collect()
    }

    pub fn entry(&mut self, name: &str) -> Result<Vec<u8>> {
        let mut r = self.archive.by_name(name)?;
        let mut contents = Vec::new();
        r.read_to_end(&mut contents)?;
        Ok(contents)
    }
}

impl<R: Read + Seek> ReadClass for Jar<R> {
    fn read_class(&mut self, identifier: &ClassIdentifier) -> Result<Vec<u8>, LoadError> {
        let name = format!("{}{}", self.prefix, identifier.path());
        trace!("looking for {identifier} at {name}");

        let mut r = match self.archive.by_name(&name) {
            Ok(r) => r,
            Err(ZipError::FileNotFound) => return Err(LoadError::NotFound(identifier.clone())),
            Err(err) => return Err(LoadError::unexpected(identifier, err)),
        };

        let mut contents = Vec::new();
        r.read_to_end(&mut contents)
            .with_context(|| format!("unable to inflate {name}"))
            .map_err(|err| LoadError::unexpected(identifier, err))?;
        Ok(contents)
    }
}
