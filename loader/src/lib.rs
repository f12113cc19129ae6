//! Looks up class bytes on a class path and decodes them.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use classfile::{ClassRecord, DecodeOptions};
use common::ClassIdentifier;
use thiserror::Error;
use tracing::{debug, warn};

pub mod directory;
pub mod hierarchy;
pub mod jar;

pub use directory::Directory;
pub use hierarchy::ClassHierarchy;
pub use jar::Jar;

/// Why a class could not be loaded. Only [`LoadError::NotFound`] is an
/// expected outcome, everything else is a broken installation or input.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("class {0} not found")]
    NotFound(ClassIdentifier),

    #[error("unexpected failure loading class {identifier}")]
    UnexpectedFailure {
        identifier: ClassIdentifier,
        #[source]
        source: anyhow::Error,
    },
}

impl LoadError {
    pub fn unexpected(identifier: &ClassIdentifier, source: impl Into<anyhow::Error>) -> Self {
        Self::UnexpectedFailure {
            identifier: identifier.clone(),
            source: source.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// A place class files can be read from.
pub trait ReadClass {
    fn read_class(&mut self, identifier: &ClassIdentifier) -> Result<Vec<u8>, LoadError>;
}

/// Sources searched in order; the first one holding a class wins.
pub struct ClassPath {
    sources: Vec<Box<dyn ReadClass>>,
}

impl ClassPath {
    pub fn new(sources: Vec<Box<dyn ReadClass>>) -> Self {
        Self { sources }
    }

    /// Directories are searched as class file trees, anything else is
    /// opened as a jar.
    pub fn from_entries<P: AsRef<Path>>(entries: &[P]) -> anyhow::Result<Self> {
        let mut sources: Vec<Box<dyn ReadClass>> = Vec::with_capacity(entries.len());
        for entry in entries {
            let entry = entry.as_ref();
            if entry.is_dir() {
                sources.push(Box::new(Directory::new(entry)));
            } else {
                let jar = Jar::open(entry).with_context(|| format!("unable to open {}", entry.display()))?;
                sources.push(Box::new(jar));
            }
        }
        Ok(Self::new(sources))
    }

    /// Entries of the `CLASSPATH` environment variable followed by the
    /// `java.base` module of `JAVA_HOME`, when either is set.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut entries: Vec<PathBuf> = match env::var_os("CLASSPATH") {
            Some(class_path) => env::split_paths(&class_path)
                .filter(|entry| !entry.as_os_str().is_empty())
                .collect(),
            None => Vec::new(),
        };

        let mut class_path = Self::from_entries(&entries)?;
        if let Some(java_home) = env::var_os("JAVA_HOME") {
            let java_base = PathBuf::from(java_home).join("jmods/java.base.jmod");
            if java_base.is_file() {
                class_path.sources.push(Box::new(Jar::open_jmod(&java_base)?));
                entries.push(java_base);
            }
        }

        debug!("class path: {entries:?}");
        Ok(class_path)
    }

    /// Searches the sources of `other` after the ones already present.
    pub fn append(&mut self, other: ClassPath) {
        self.sources.extend(other.sources);
    }

    /// Raw bytes of the first matching class file.
    pub fn read(&mut self, identifier: &ClassIdentifier) -> Result<Vec<u8>, LoadError> {
        for source in &mut self.sources {
            match source.read_class(identifier) {
                Ok(bytes) => return Ok(bytes),
                Err(LoadError::NotFound(_)) => continue,
                Err(err) => return Err(err),
            }
        }

        Err(LoadError::NotFound(identifier.clone()))
    }

    /// Loads and decodes a class. A class missing from every source is
    /// `Ok(None)`; unreadable or malformed class files are errors.
    pub fn from_runtime(&mut self, identifier: &ClassIdentifier) -> Result<Option<ClassRecord>, LoadError> {
        let bytes = match self.read(identifier) {
            Ok(bytes) => bytes,
            Err(LoadError::NotFound(_)) => {
                debug!("class {identifier} is not on the class path");
                return Ok(None);
            }
            Err(err) => {
                warn!("{err}");
                return Err(err);
            }
        };

        let class = classfile::decode(&bytes, DecodeOptions::default())
            .map_err(|err| LoadError::unexpected(identifier, err))?;

        let expected = identifier.internal_name();
        if class.name != expected {
            return Err(LoadError::unexpected(
                identifier,
                anyhow!("class file declares {} instead of {expected}", class.name),
            ));
        }

        debug!("loaded class {identifier} ({} bytes)", bytes.len());
        Ok(Some(class))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::fs;
    use std::path::PathBuf;

    use classfile::{ClassRecord, EncodeOptions};

    use super::*;

    /// A fresh directory below the system temp directory.
    pub fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("loader-{}-{name}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    pub fn init_tracing() {
        use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

        let _ = tracing_subscriber::registry()
            .with(fmt::layer().with_test_writer())
            .with(EnvFilter::from_default_env())
            .try_init();
    }

    pub fn class_bytes(name: &str) -> Vec<u8> {
        classfile::encode(&ClassRecord::new(name), EncodeOptions::none()).unwrap()
    }

    fn identifier(raw: &str) -> ClassIdentifier {
        ClassIdentifier::parse(raw).unwrap()
    }

    fn directory_with(name: &str, files: &[(&str, &[u8])]) -> Directory {
        let root = temp_dir(name);
        for (path, contents) in files {
            let path = root.join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, contents).unwrap();
        }
        Directory::new(root)
    }

    #[test]
    fn missing_class_is_none() {
        let mut class_path = ClassPath::new(vec![Box::new(directory_with("missing", &[]))]);
        assert!(class_path.from_runtime(&identifier("a.Missing")).unwrap().is_none());
        assert!(class_path.read(&identifier("a.Missing")).unwrap_err().is_not_found());
    }

    #[test]
    fn present_class_is_decoded() {
        let bytes = class_bytes("a/b/Present");
        let source = directory_with("present", &[("a/b/Present.class", bytes.as_slice())]);
        let mut class_path = ClassPath::new(vec![Box::new(source)]);

        let class = class_path.from_runtime(&identifier("a.b.Present")).unwrap().unwrap();
        assert_eq!(class.name, "a/b/Present");
    }

    #[test]
    fn corrupt_class_is_unexpected() {
        init_tracing();
        let source = directory_with("corrupt", &[("a/Broken.class", b"\xCA\xFE\xBA\xBE\x00\x00".as_slice())]);
        let mut class_path = ClassPath::new(vec![Box::new(source)]);

        let err = class_path.from_runtime(&identifier("a.Broken")).unwrap_err();
        assert!(matches!(err, LoadError::UnexpectedFailure { .. }));
    }

    #[test]
    fn misnamed_class_is_unexpected() {
        init_tracing();
        let bytes = class_bytes("a/Other");
        let source = directory_with("misnamed", &[("a/Named.class", bytes.as_slice())]);
        let mut class_path = ClassPath::new(vec![Box::new(source)]);

        assert!(matches!(
            class_path.from_runtime(&identifier("a/Named")),
            Err(LoadError::UnexpectedFailure { .. })
        ));
    }

    #[test]
    fn sources_are_searched_in_order() {
        let shared = class_bytes("a/Shared");
        let only = class_bytes("a/Only");
        let first = directory_with("order-first", &[("a/Shared.class", shared.as_slice())]);
        let second = directory_with(
            "order-second",
            &[
                ("a/Shared.class", b"not a class".as_slice()),
                ("a/Only.class", only.as_slice()),
            ],
        );
        let mut class_path = ClassPath::new(vec![Box::new(first)]);
        class_path.append(ClassPath::new(vec![Box::new(second)]));

        assert!(class_path.from_runtime(&identifier("a.Shared")).unwrap().is_some());
        assert!(class_path.from_runtime(&identifier("a.Only")).unwrap().is_some());
    }
}
