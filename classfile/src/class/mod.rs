use crate::class::{
    access_flags::AccessFlags,
    annotation::Annotations,
    attribute::Attribute,
    field::FieldRecord,
    method::MethodRecord,
};

pub mod access_flags;
pub mod annotation;
pub mod attribute;
pub mod constant;
pub mod constant_pool;
pub mod descriptor;
pub mod field;
pub mod frame;
pub mod instruction;
pub mod method;

/// Class file major version of Java 8.
pub const V1_8: u16 = 52;

/// Distance between a major version and the Java release it belongs to,
/// e.g. Java 8 is 52 (44 + 8).
pub const VERSION_OFFSET: u16 = 44;

/// Representation of a class, interface or module with every constant pool
/// reference resolved.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassRecord {
    pub minor_version: u16,
    pub major_version: u16,
    pub access: AccessFlags,
    /// Internal name, e.g. `java/lang/String`.
    pub name: String,
    /// Absent only for `java/lang/Object` and `module-info`.
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<FieldRecord>,
    pub methods: Vec<MethodRecord>,
    pub source_file: Option<String>,
    pub source_debug_extension: Option<Vec<u8>>,
    pub annotations: Annotations,
    pub attributes: Vec<Attribute>,
}

impl ClassRecord {
    /// A public Java 8 class extending `java/lang/Object`, with no members.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            minor_version: 0,
            major_version: V1_8,
            access: AccessFlags::PUBLIC | AccessFlags::SUPER,
            name: name.into(),
            super_name: Some("java/lang/Object".to_string()),
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            source_file: None,
            source_debug_extension: None,
            annotations: Annotations::default(),
            attributes: Vec::new(),
        }
    }

    /// The Java release the class targets (52 → 8).
    pub fn java_release(&self) -> u16 {
        self.major_version.saturating_sub(VERSION_OFFSET)
    }
}
