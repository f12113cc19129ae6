use anyhow::{Result, bail};
use std::fmt::Debug;
use std::fmt::Display;

/// Identifies a class using package and name
#[derive(Clone, Eq, Hash, PartialEq)]
pub struct ClassIdentifier {
    /// Dotted package, empty for the default package.
    pub package: String,
    /// Simple name, `Outer$Inner` for nested classes.
    pub name: String,
}

impl ClassIdentifier {
    pub fn new(package: String, name: String) -> Self {
        Self { package, name }
    }

    /// Accepts binary names (`java.lang.String`), internal names
    /// (`java/lang/String`) and object descriptors (`Ljava/lang/String;`).
    /// Array descriptors resolve to their element class.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim_start_matches('[');
        let raw = match raw.strip_prefix('L') {
            Some(inner) if raw.ends_with(';') => &inner[..inner.len() - 1],
            _ => raw,
        };
        let raw = raw.strip_suffix(".class").unwrap_or(raw);

        if raw.is_empty() || raw.contains(';') {
            bail!("invalid class identifier {raw:?}");
        }

        let raw = raw.replace('/', ".");
        let (package, name) = match raw.rsplit_once('.') {
            Some((package, name)) => (package.to_owned(), name.to_owned()),
            None => (String::new(), raw.clone()),
        };
        if name.is_empty() || (!package.is_empty() && package.split('.').any(str::is_empty)) {
            bail!("invalid class identifier {raw:?}");
        }

        Ok(Self { package, name })
    }

    /// `java/lang/String`, as it appears inside class files.
    pub fn internal_name(&self) -> String {
        if self.package.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", self.package.replace('.', "/"), self.name)
        }
    }

    /// `java.lang.String`
    pub fn binary_name(&self) -> String {
        if self.package.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.package, self.name)
        }
    }

    /// Location of the class inside a jar or below a class path directory,
    /// always `/`-separated.
    pub fn path(&self) -> String {
        format!("{}.class", self.internal_name())
    }
}

impl Display for ClassIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.binary_name())
    }
}

impl Debug for ClassIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.package, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_slashes() {
        let class_identifier = ClassIdentifier::parse("java/lang/System").unwrap();
        assert_eq!(class_identifier.package, "java.lang");
        assert_eq!(class_identifier.name, "System");
    }

    #[test]
    fn test_parse_dots() {
        let class_identifier = ClassIdentifier::parse("java.lang.System").unwrap();
        assert_eq!(class_identifier.package, "java.lang");
        assert_eq!(class_identifier.name, "System");
    }

    #[test]
    fn test_parse_no_package() {
        let class_identifier = ClassIdentifier::parse("System").unwrap();
        assert_eq!(class_identifier.package, "");
        assert_eq!(class_identifier.name, "System");
        assert_eq!(class_identifier.internal_name(), "System");
    }

    #[test]
    fn test_parse_from_field_descriptor_array() {
        let class_identifier = ClassIdentifier::parse("[[Ljava/lang/System;").unwrap();
        assert_eq!(class_identifier.package, "java.lang");
        assert_eq!(class_identifier.name, "System");
    }

    #[test]
    fn test_parse_nested_class() {
        let class_identifier = ClassIdentifier::parse("java/util/Map$Entry").unwrap();
        assert_eq!(class_identifier.name, "Map$Entry");
        assert_eq!(class_identifier.binary_name(), "java.util.Map$Entry");
    }

    #[test]
    fn test_parse_file_name() {
        let class_identifier = ClassIdentifier::parse("a/b/C.class").unwrap();
        assert_eq!(class_identifier.internal_name(), "a/b/C");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(ClassIdentifier::parse("").is_err());
        assert!(ClassIdentifier::parse("java.lang.").is_err());
        assert!(ClassIdentifier::parse("a..B").is_err());
    }

    #[test]
    fn test_path() {
        let class_identifier = ClassIdentifier::new("java.lang".to_owned(), "System".to_owned());
        assert_eq!(class_identifier.path(), "java/lang/System.class");
        assert_eq!(class_identifier.internal_name(), "java/lang/System");
        assert_eq!(class_identifier.to_string(), "java.lang.System");
    }
}
