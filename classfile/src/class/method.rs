use crate::class::{
    access_flags::AccessFlags,
    annotation::{Annotations, TypeAnnotation},
    attribute::{Attribute, RawAttribute},
    frame::Frames,
    instruction::{Instruction, Label},
};

#[derive(Clone, Debug, PartialEq)]
pub struct MethodRecord {
    pub access: AccessFlags,
    pub name: String,
    pub descriptor: String,
    /// Checked exceptions from the `Exceptions` attribute.
    pub exceptions: Vec<String>,
    /// Absent for abstract and native methods.
    pub code: Option<Code>,
    pub annotations: Annotations,
    pub attributes: Vec<Attribute>,
}

impl MethodRecord {
    pub fn new(access: AccessFlags, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            access,
            name: name.into(),
            descriptor: descriptor.into(),
            exceptions: Vec::new(),
            code: None,
            annotations: Annotations::default(),
            attributes: Vec::new(),
        }
    }

    pub fn is_static(&self) -> bool {
        self.access.is_static()
    }

    pub fn is_constructor(&self) -> bool {
        self.name == "<init>"
    }
}

/// The body of a method (`Code` attribute).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Code {
    pub max_stack: u16,
    pub max_locals: u16,
    pub instructions: Vec<Instruction>,
    pub exception_table: Vec<ExceptionHandler>,
    pub line_numbers: Option<Vec<LineNumber>>,
    pub local_variables: Option<Vec<LocalVariable>>,
    /// `LocalVariableTypeTable`; `descriptor` holds the generic signature.
    pub local_variable_types: Option<Vec<LocalVariable>>,
    pub frames: Option<Frames>,
    pub visible_type_annotations: Option<Vec<TypeAnnotation>>,
    pub invisible_type_annotations: Option<Vec<TypeAnnotation>>,
    pub attributes: Vec<RawAttribute>,
}

impl Code {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self {
            instructions,
            ..Self::default()
        }
    }

    /// The label past the last instruction.
    pub fn end(&self) -> Label {
        Label::from(self.instructions.len())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExceptionHandler {
    pub start: Label,
    pub end: Label,
    pub handler: Label,
    /// `None` catches everything (`finally`).
    pub catch_type: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineNumber {
    pub start: Label,
    pub line: u16,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalVariable {
    pub start: Label,
    pub end: Label,
    pub name: String,
    pub descriptor: String,
    pub index: u16,
}
