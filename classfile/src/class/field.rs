use crate::class::{
    access_flags::AccessFlags,
    annotation::Annotations,
    attribute::{Attribute, KnownAttribute},
    constant::Constant,
};

#[derive(Clone, Debug, PartialEq)]
pub struct FieldRecord {
    pub access: AccessFlags,
    pub name: String,
    pub descriptor: String,
    /// Initial value from the `ConstantValue` attribute.
    pub value: Option<Constant>,
    pub annotations: Annotations,
    pub attributes: Vec<Attribute>,
}

impl FieldRecord {
    pub fn new(access: AccessFlags, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            access,
            name: name.into(),
            descriptor: descriptor.into(),
            value: None,
            annotations: Annotations::default(),
            attributes: Vec::new(),
        }
    }

    pub fn is_static(&self) -> bool {
        self.access.is_static()
    }

    pub fn signature(&self) -> Option<&str> {
        self.attributes.iter().find_map(|attr| match attr {
            Attribute::Known(KnownAttribute::Signature(signature)) => Some(signature.as_str()),
            _ => None,
        })
    }
}
