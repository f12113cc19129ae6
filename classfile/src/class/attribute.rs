use crate::class::{
    access_flags::AccessFlags,
    annotation::{Annotation, ElementValue},
};

pub const CODE: &str = "Code";
pub const CONSTANT_VALUE: &str = "ConstantValue";
pub const STACK_MAP_TABLE: &str = "StackMapTable";
pub const EXCEPTIONS: &str = "Exceptions";
pub const INNER_CLASSES: &str = "InnerClasses";
pub const ENCLOSING_METHOD: &str = "EnclosingMethod";
pub const SYNTHETIC: &str = "Synthetic";
pub const SIGNATURE: &str = "Signature";
pub const SOURCE_FILE: &str = "SourceFile";
pub const SOURCE_DEBUG_EXTENSION: &str = "SourceDebugExtension";
pub const LINE_NUMBER_TABLE: &str = "LineNumberTable";
pub const LOCAL_VARIABLE_TABLE: &str = "LocalVariableTable";
pub const LOCAL_VARIABLE_TYPE_TABLE: &str = "LocalVariableTypeTable";
pub const DEPRECATED: &str = "Deprecated";
pub const RUNTIME_VISIBLE_ANNOTATIONS: &str = "RuntimeVisibleAnnotations";
pub const RUNTIME_INVISIBLE_ANNOTATIONS: &str = "RuntimeInvisibleAnnotations";
pub const RUNTIME_VISIBLE_PARAMETER_ANNOTATIONS: &str = "RuntimeVisibleParameterAnnotations";
pub const RUNTIME_INVISIBLE_PARAMETER_ANNOTATIONS: &str = "RuntimeInvisibleParameterAnnotations";
pub const RUNTIME_VISIBLE_TYPE_ANNOTATIONS: &str = "RuntimeVisibleTypeAnnotations";
pub const RUNTIME_INVISIBLE_TYPE_ANNOTATIONS: &str = "RuntimeInvisibleTypeAnnotations";
pub const ANNOTATION_DEFAULT: &str = "AnnotationDefault";
pub const BOOTSTRAP_METHODS: &str = "BootstrapMethods";
pub const METHOD_PARAMETERS: &str = "MethodParameters";
pub const NEST_HOST: &str = "NestHost";
pub const NEST_MEMBERS: &str = "NestMembers";
pub const PERMITTED_SUBCLASSES: &str = "PermittedSubclasses";

/// An attribute kept in a record's generic attribute bag.
#[derive(Clone, Debug, PartialEq)]
pub enum Attribute {
    Known(KnownAttribute),
    Raw(RawAttribute),
}

impl Attribute {
    pub fn name(&self) -> &str {
        match self {
            Self::Known(known) => known.name(),
            Self::Raw(raw) => &raw.name,
        }
    }
}

/// Attributes the reader understands but that have no dedicated slot in the
/// records.
#[derive(Clone, Debug, PartialEq)]
pub enum KnownAttribute {
    Signature(String),
    Deprecated,
    Synthetic,
    InnerClasses(Vec<InnerClass>),
    EnclosingMethod(EnclosingMethod),
    NestHost(String),
    NestMembers(Vec<String>),
    PermittedSubclasses(Vec<String>),
    MethodParameters(Vec<MethodParameter>),
    AnnotationDefault(ElementValue),
    ParameterAnnotations {
        visible: bool,
        parameters: Vec<Vec<Annotation>>,
    },
}

impl KnownAttribute {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Signature(_) => SIGNATURE,
            Self::Deprecated => DEPRECATED,
            Self::Synthetic => SYNTHETIC,
            Self::InnerClasses(_) => INNER_CLASSES,
            Self::EnclosingMethod(_) => ENCLOSING_METHOD,
            Self::NestHost(_) => NEST_HOST,
            Self::NestMembers(_) => NEST_MEMBERS,
            Self::PermittedSubclasses(_) => PERMITTED_SUBCLASSES,
            Self::MethodParameters(_) => METHOD_PARAMETERS,
            Self::AnnotationDefault(_) => ANNOTATION_DEFAULT,
            Self::ParameterAnnotations { visible: true, .. } => {
                RUNTIME_VISIBLE_PARAMETER_ANNOTATIONS
            }
            Self::ParameterAnnotations { visible: false, .. } => {
                RUNTIME_INVISIBLE_PARAMETER_ANNOTATIONS
            }
        }
    }
}

/// An attribute the reader does not interpret, carried over byte for byte.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawAttribute {
    pub name: String,
    pub info: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InnerClass {
    pub name: String,
    pub outer_name: Option<String>,
    pub inner_name: Option<String>,
    pub access: AccessFlags,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnclosingMethod {
    pub owner: String,
    /// Name and descriptor, absent for classes not directly inside a method.
    pub method: Option<(String, String)>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodParameter {
    pub name: Option<String>,
    pub access: AccessFlags,
}
