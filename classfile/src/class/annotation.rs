use crate::class::instruction::Label;

#[derive(Clone, Debug, PartialEq)]
pub struct Annotation {
    /// Field descriptor of the annotation interface, e.g. `Ljava/lang/Deprecated;`.
    pub descriptor: String,
    pub values: Vec<ElementValuePair>,
}

impl Annotation {
    pub fn new(descriptor: impl Into<String>) -> Self {
        Self {
            descriptor: descriptor.into(),
            values: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ElementValuePair {
    pub name: String,
    pub value: ElementValue,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ElementValue {
    Byte(i8),
    Char(u16),
    Double(f64),
    Float(f32),
    Int(i32),
    Long(i64),
    Short(i16),
    Boolean(bool),
    String(String),
    Enum { descriptor: String, name: String },
    /// Return descriptor of the class literal, `V` for `void.class`.
    Class(String),
    Annotation(Annotation),
    Array(Vec<ElementValue>),
}

/// The four annotation attributes a class, field or method can carry.
///
/// `None` means the attribute is absent, which is not the same as present
/// and empty.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Annotations {
    pub visible: Option<Vec<Annotation>>,
    pub invisible: Option<Vec<Annotation>>,
    pub visible_type: Option<Vec<TypeAnnotation>>,
    pub invisible_type: Option<Vec<TypeAnnotation>>,
}

impl Annotations {
    pub fn is_empty(&self) -> bool {
        self.visible.is_none()
            && self.invisible.is_none()
            && self.visible_type.is_none()
            && self.invisible_type.is_none()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TypeAnnotation {
    pub target: TypeAnnotationTarget,
    pub path: Vec<TypePathEntry>,
    pub annotation: Annotation,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TypePathEntry {
    pub kind: u8,
    pub argument_index: u8,
}

/// `target_type` together with its `target_info`. Targets inside a method
/// body refer to instructions through labels.
#[derive(Clone, Debug, PartialEq)]
pub enum TypeAnnotationTarget {
    /// 0x00 class, 0x01 method type parameter.
    TypeParameter { target_type: u8, index: u8 },
    /// 0x10; 65535 denotes the superclass.
    Supertype(u16),
    /// 0x11 class, 0x12 method type parameter bound.
    TypeParameterBound {
        target_type: u8,
        parameter: u8,
        bound: u8,
    },
    /// 0x13 field, 0x14 return or constructed type, 0x15 receiver.
    Empty(u8),
    /// 0x16
    FormalParameter(u8),
    /// 0x17
    Throws(u16),
    /// 0x40 local variable, 0x41 resource variable.
    LocalVariable {
        target_type: u8,
        ranges: Vec<LocalVariableRange>,
    },
    /// 0x42, index into the exception table.
    Catch(u16),
    /// 0x43 instanceof, 0x44 new, 0x45 `::new`, 0x46 `::name`.
    Offset { target_type: u8, label: Label },
    /// 0x47..=0x4B casts and explicit type arguments.
    TypeArgument {
        target_type: u8,
        label: Label,
        index: u8,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LocalVariableRange {
    pub start: Label,
    pub end: Label,
    pub index: u16,
}
