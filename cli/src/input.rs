use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use loader::Jar;
use tracing::{debug, trace};

/// Class file bytes together with the archive style path they came from.
pub struct ClassInput {
    /// `a/b/C.class` for archive entries and directory members, the file
    /// name for a class given directly.
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Every class reachable from `paths`: `*.class` files as given, whatever
/// their content, directories searched recursively for `*.class`, anything
/// else opened as a jar.
pub fn collect(paths: &[PathBuf]) -> Result<Vec<ClassInput>> {
    let mut inputs = Vec::new();
    for path in paths {
        if path.is_dir() {
            from_directory(path, path, &mut inputs)?;
        } else if is_class_file(path) {
            let name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            let bytes = fs::read(path).with_context(|| format!("unable to read {}", path.display()))?;
            inputs.push(ClassInput { name, bytes });
        } else {
            from_jar(path, &mut inputs)?;
        }
    }

    debug!("collected {} classes", inputs.len());
    Ok(inputs)
}

pub fn is_class_file(path: &Path) -> bool {
    path.extension().is_some_and(|extension| extension == "class")
}

fn from_directory(root: &Path, directory: &Path, inputs: &mut Vec<ClassInput>) -> Result<()> {
    let mut entries = fs::read_dir(directory)
        .with_context(|| format!("unable to list {}", directory.display()))?
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|entry| entry.path());

    for entry in entries {
        let path = entry.path();
        if path.is_dir() {
            from_directory(root, &path, inputs)?;
            continue;
        }
        if !is_class_file(&path) {
            continue;
        }

        let name = path
            .strip_prefix(root)
            .unwrap_or(&path)
            .components()
            .map(|component| component.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        trace!("found {name}");
        let bytes = fs::read(&path).with_context(|| format!("unable to read {}", path.display()))?;
        inputs.push(ClassInput { name, bytes });
    }
    Ok(())
}

fn from_jar(path: &Path, inputs: &mut Vec<ClassInput>) -> Result<()> {
    let mut jar = Jar::open(path).with_context(|| format!("{} is neither a class file nor a jar", path.display()))?;
    for name in jar.class_files() {
        let bytes = jar
            .entry(&name)
            .with_context(|| format!("unable to read {name} from {}", path.display()))?;
        inputs.push(ClassInput { name, bytes });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("classtool-{}-{name}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn broken_class_files_are_still_classes() {
        let dir = temp_dir("broken");
        let path = dir.join("x.class");
        fs::write(&path, b"abc").unwrap();

        let inputs = collect(&[path]).unwrap();
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].name, "x.class");
        assert_eq!(classfile::get_version(&inputs[0].bytes), 52);
        assert_eq!(classfile::get_access(&inputs[0].bytes), 0);
    }

    #[test]
    fn directories_yield_class_files_only() {
        let dir = temp_dir("tree");
        fs::create_dir_all(dir.join("a/b")).unwrap();
        fs::write(dir.join("a/b/C.class"), b"\xCA\xFE\xBA\xBE").unwrap();
        fs::write(dir.join("a/notes.txt"), b"ignored").unwrap();

        let names: Vec<_> = collect(&[dir]).unwrap().into_iter().map(|input| input.name).collect();
        assert_eq!(names, vec!["a/b/C.class".to_string()]);
    }

    #[test]
    fn other_files_must_be_jars() {
        let dir = temp_dir("not-a-jar");
        let path = dir.join("lib.jar");
        fs::write(&path, b"abc").unwrap();
        assert!(collect(&[path]).is_err());
    }
}
