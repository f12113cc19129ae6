//! Encoding of a [`ClassRecord`] into class file bytes.
//!
//! The constant pool is rebuilt from scratch: entries are interned in the
//! order the record is walked (class, super class, interfaces, fields,
//! methods, class attributes, bootstrap methods), so equal records always
//! encode to equal bytes.

use std::collections::HashMap;

use tracing::debug;

use crate::{
    analysis::{ObjectHierarchy, TypeHierarchy},
    class::{
        ClassRecord,
        attribute::{self, Attribute, KnownAttribute},
        constant::{BootstrapMethod, Constant, Handle},
        constant_pool::{ConstantPoolBuilder, CpIndex},
        field::FieldRecord,
        method::MethodRecord,
    },
    error::{Result, invalid},
    magic::MAGIC,
    util::Out,
};

mod annotation;
mod code;

/// What the writer computes instead of taking it from the record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Recompute every `StackMapTable` from the instructions. Implies
    /// `compute_maxs`.
    pub compute_frames: bool,
    /// Recompute `max_stack` and `max_locals` of every method body.
    pub compute_maxs: bool,
}

impl EncodeOptions {
    /// Sizes and frames are written as the record has them.
    pub const fn none() -> Self {
        Self {
            compute_frames: false,
            compute_maxs: false,
        }
    }

    pub const fn maxs() -> Self {
        Self {
            compute_frames: false,
            compute_maxs: true,
        }
    }

    pub const fn frames() -> Self {
        Self {
            compute_frames: true,
            compute_maxs: true,
        }
    }
}

/// Serializes `class`, merging reference types for computed frames into
/// `java/lang/Object`.
pub fn encode(class: &ClassRecord, options: EncodeOptions) -> Result<Vec<u8>> {
    encode_with(class, options, &ObjectHierarchy)
}

/// Serializes `class`, asking `hierarchy` for common super classes while
/// computing frames.
pub fn encode_with(
    class: &ClassRecord,
    options: EncodeOptions,
    hierarchy: &dyn TypeHierarchy,
) -> Result<Vec<u8>> {
    if class.name.is_empty() {
        invalid!("class has no name");
    }

    let mut w = Writer {
        cp: ConstantPoolBuilder::default(),
        bootstrap_methods: Vec::new(),
        bootstrap_indices: HashMap::new(),
        options,
        hierarchy,
        owner: &class.name,
        major_version: class.major_version,
    };

    let mut body = Vec::new();
    body.u2(class.access.bits());
    body.u2(w.cp.class(&class.name)?.0);
    match &class.super_name {
        Some(super_name) => body.u2(w.cp.class(super_name)?.0),
        None => body.u2(0),
    }

    body.u2(count(class.interfaces.len(), "interfaces")?);
    for interface in &class.interfaces {
        body.u2(w.cp.class(interface)?.0);
    }

    body.u2(count(class.fields.len(), "fields")?);
    for field in &class.fields {
        w.field(&mut body, field)?;
    }

    body.u2(count(class.methods.len(), "methods")?);
    for method in &class.methods {
        w.method(&mut body, method)?;
    }

    let mut attributes = Attributes::default();
    if let Some(source_file) = &class.source_file {
        let mut info = Vec::new();
        info.u2(w.cp.utf8(source_file)?.0);
        attributes.push(&mut w.cp, attribute::SOURCE_FILE, &info)?;
    }
    if let Some(extension) = &class.source_debug_extension {
        attributes.push(&mut w.cp, attribute::SOURCE_DEBUG_EXTENSION, extension)?;
    }
    w.annotation_attributes(&mut attributes, &class.annotations)?;
    w.attributes(&mut attributes, &class.attributes)?;
    w.bootstrap_methods_attribute(&mut attributes)?;
    attributes.write(&mut body)?;

    let mut out = Vec::with_capacity(body.len() + 16 * w.cp.len());
    out.u4(MAGIC);
    out.u2(class.minor_version);
    out.u2(class.major_version);
    w.cp.write(&mut out)?;
    out.extend_from_slice(&body);

    debug!(
        "encoded class {} ({} bytes, {} constant pool slots)",
        class.name,
        out.len(),
        w.cp.len()
    );
    Ok(out)
}

fn count(len: usize, what: &str) -> Result<u16> {
    match u16::try_from(len) {
        Ok(count) => Ok(count),
        Err(_) => invalid!("{len} {what} do not fit a class file"),
    }
}

/// An `attributes_count`-prefixed attribute table under construction.
#[derive(Default)]
pub(crate) struct Attributes {
    count: usize,
    bytes: Vec<u8>,
}

impl Attributes {
    pub fn push(&mut self, cp: &mut ConstantPoolBuilder, name: &str, info: &[u8]) -> Result<()> {
        let Ok(length) = u32::try_from(info.len()) else {
            invalid!("{name} attribute of {} bytes", info.len());
        };
        self.bytes.u2(cp.utf8(name)?.0);
        self.bytes.u4(length);
        self.bytes.extend_from_slice(info);
        self.count += 1;
        Ok(())
    }

    pub fn write(self, out: &mut Vec<u8>) -> Result<()> {
        out.u2(count(self.count, "attributes")?);
        out.extend_from_slice(&self.bytes);
        Ok(())
    }
}

pub(crate) struct Writer<'a> {
    pub cp: ConstantPoolBuilder,
    bootstrap_methods: Vec<(CpIndex, Vec<CpIndex>)>,
    bootstrap_indices: HashMap<(CpIndex, Vec<CpIndex>), u16>,
    options: EncodeOptions,
    hierarchy: &'a dyn TypeHierarchy,
    owner: &'a str,
    major_version: u16,
}

impl Writer<'_> {
    pub fn constant(&mut self, constant: &Constant) -> Result<CpIndex> {
        match constant {
            Constant::Integer(value) => self.cp.integer(*value),
            Constant::Float(value) => self.cp.float(*value),
            Constant::Long(value) => self.cp.long(*value),
            Constant::Double(value) => self.cp.double(*value),
            Constant::String(value) => self.cp.string(value),
            Constant::Class(name) => self.cp.class(name),
            Constant::MethodType(descriptor) => self.cp.method_type(descriptor),
            Constant::MethodHandle(handle) => self.handle(handle),
            Constant::Dynamic(dynamic) => {
                let bootstrap = self.bootstrap_method(&dynamic.bootstrap)?;
                self.cp.dynamic(bootstrap, &dynamic.name, &dynamic.descriptor)
            }
        }
    }

    fn handle(&mut self, handle: &Handle) -> Result<CpIndex> {
        if !(1..=9).contains(&handle.kind) {
            invalid!("invalid method handle kind {}", handle.kind);
        }
        let reference = if handle.is_field() {
            self.cp.field_ref(&handle.owner, &handle.name, &handle.descriptor)?
        } else {
            self.cp
                .method_ref(&handle.owner, &handle.name, &handle.descriptor, handle.interface)?
        };
        self.cp.method_handle(handle.kind, reference)
    }

    /// Index of `bootstrap` in the `BootstrapMethods` attribute, adding it
    /// the first time it is seen.
    pub fn bootstrap_method(&mut self, bootstrap: &BootstrapMethod) -> Result<u16> {
        let handle = self.handle(&bootstrap.handle)?;
        let mut arguments = Vec::with_capacity(bootstrap.arguments.len());
        for argument in &bootstrap.arguments {
            arguments.push(self.constant(argument)?);
        }

        let key = (handle, arguments);
        if let Some(index) = self.bootstrap_indices.get(&key) {
            return Ok(*index);
        }

        let index = count(self.bootstrap_methods.len(), "bootstrap methods")?;
        self.bootstrap_methods.push(key.clone());
        self.bootstrap_indices.insert(key, index);
        Ok(index)
    }

    fn bootstrap_methods_attribute(&mut self, attributes: &mut Attributes) -> Result<()> {
        if self.bootstrap_methods.is_empty() {
            return Ok(());
        }

        let mut info = Vec::new();
        info.u2(count(self.bootstrap_methods.len(), "bootstrap methods")?);
        for (handle, arguments) in &self.bootstrap_methods {
            info.u2(handle.0);
            info.u2(count(arguments.len(), "bootstrap arguments")?);
            for argument in arguments {
                info.u2(argument.0);
            }
        }
        attributes.push(&mut self.cp, attribute::BOOTSTRAP_METHODS, &info)
    }

    fn field(&mut self, out: &mut Vec<u8>, field: &FieldRecord) -> Result<()> {
        if field.name.is_empty() {
            invalid!("field without a name in {}", self.owner);
        }

        out.u2(field.access.bits());
        out.u2(self.cp.utf8(&field.name)?.0);
        out.u2(self.cp.utf8(&field.descriptor)?.0);

        let mut attributes = Attributes::default();
        if let Some(value) = &field.value {
            let mut info = Vec::new();
            info.u2(self.constant(value)?.0);
            attributes.push(&mut self.cp, attribute::CONSTANT_VALUE, &info)?;
        }
        self.annotation_attributes(&mut attributes, &field.annotations)?;
        self.attributes(&mut attributes, &field.attributes)?;
        attributes.write(out)
    }

    fn method(&mut self, out: &mut Vec<u8>, method: &MethodRecord) -> Result<()> {
        if method.name.is_empty() {
            invalid!("method without a name in {}", self.owner);
        }

        out.u2(method.access.bits());
        out.u2(self.cp.utf8(&method.name)?.0);
        out.u2(self.cp.utf8(&method.descriptor)?.0);

        let mut attributes = Attributes::default();
        if let Some(code) = &method.code {
            let info = self.code(method, code)?;
            attributes.push(&mut self.cp, attribute::CODE, &info)?;
        }
        if !method.exceptions.is_empty() {
            let info = self.class_names(&method.exceptions)?;
            attributes.push(&mut self.cp, attribute::EXCEPTIONS, &info)?;
        }
        self.annotation_attributes(&mut attributes, &method.annotations)?;
        self.attributes(&mut attributes, &method.attributes)?;
        attributes.write(out)
    }

    fn class_names(&mut self, names: &[String]) -> Result<Vec<u8>> {
        let mut info = Vec::with_capacity(2 + 2 * names.len());
        info.u2(count(names.len(), "classes")?);
        for name in names {
            info.u2(self.cp.class(name)?.0);
        }
        Ok(info)
    }

    fn optional_class(&mut self, name: Option<&str>) -> Result<u16> {
        Ok(match name {
            Some(name) => self.cp.class(name)?.0,
            None => 0,
        })
    }

    fn optional_utf8(&mut self, value: Option<&str>) -> Result<u16> {
        Ok(match value {
            Some(value) => self.cp.utf8(value)?.0,
            None => 0,
        })
    }

    fn attributes(&mut self, attributes: &mut Attributes, list: &[Attribute]) -> Result<()> {
        for attribute in list {
            match attribute {
                Attribute::Known(known) => {
                    let info = self.known_attribute(known)?;
                    attributes.push(&mut self.cp, known.name(), &info)?;
                }
                Attribute::Raw(raw) => attributes.push(&mut self.cp, &raw.name, &raw.info)?,
            }
        }
        Ok(())
    }

    fn known_attribute(&mut self, attribute: &KnownAttribute) -> Result<Vec<u8>> {
        let mut info = Vec::new();
        match attribute {
            KnownAttribute::Signature(signature) => info.u2(self.cp.utf8(signature)?.0),
            KnownAttribute::Deprecated | KnownAttribute::Synthetic => {}
            KnownAttribute::InnerClasses(inner_classes) => {
                info.u2(count(inner_classes.len(), "inner classes")?);
                for inner_class in inner_classes {
                    info.u2(self.cp.class(&inner_class.name)?.0);
                    info.u2(self.optional_class(inner_class.outer_name.as_deref())?);
                    info.u2(self.optional_utf8(inner_class.inner_name.as_deref())?);
                    info.u2(inner_class.access.bits());
                }
            }
            KnownAttribute::EnclosingMethod(enclosing) => {
                info.u2(self.cp.class(&enclosing.owner)?.0);
                match &enclosing.method {
                    Some((name, descriptor)) => info.u2(self.cp.name_and_type(name, descriptor)?.0),
                    None => info.u2(0),
                }
            }
            KnownAttribute::NestHost(host) => info.u2(self.cp.class(host)?.0),
            KnownAttribute::NestMembers(names) | KnownAttribute::PermittedSubclasses(names) => {
                info = self.class_names(names)?;
            }
            KnownAttribute::MethodParameters(parameters) => {
                let Ok(length) = u8::try_from(parameters.len()) else {
                    invalid!("{} method parameters", parameters.len());
                };
                info.u1(length);
                for parameter in parameters {
                    info.u2(self.optional_utf8(parameter.name.as_deref())?);
                    info.u2(parameter.access.bits());
                }
            }
            KnownAttribute::AnnotationDefault(value) => self.element_value(&mut info, value)?,
            KnownAttribute::ParameterAnnotations { parameters, .. } => {
                let Ok(length) = u8::try_from(parameters.len()) else {
                    invalid!("annotations for {} parameters", parameters.len());
                };
                info.u1(length);
                for annotations in parameters {
                    self.annotations(&mut info, annotations)?;
                }
            }
        }
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ClassFileError,
        class::{
            access_flags::AccessFlags,
            annotation::{Annotation, ElementValue, ElementValuePair},
            attribute::{InnerClass, RawAttribute},
            constant::{ConstantDynamic, REF_INVOKE_STATIC},
            instruction::Instruction,
            method::Code,
        },
        opcodes::*,
        reader::{DecodeOptions, decode},
        test_support::{init_tracing, minimal_class},
    };

    fn bootstrap() -> BootstrapMethod {
        BootstrapMethod {
            handle: Handle {
                kind: REF_INVOKE_STATIC,
                owner: "a/Bootstraps".to_string(),
                name: "make".to_string(),
                descriptor: "()Ljava/lang/invoke/CallSite;".to_string(),
                interface: false,
            },
            arguments: vec![Constant::Integer(7), Constant::String("x".to_string())],
        }
    }

    fn rich_class() -> ClassRecord {
        let mut class = ClassRecord::new("a/Rich");
        class.interfaces.push("java/io/Serializable".to_string());
        class.source_file = Some("Rich.java".to_string());

        let mut field = FieldRecord::new(AccessFlags::STATIC | AccessFlags::FINAL, "LIMIT", "J");
        field.value = Some(Constant::Long(1 << 40));
        let mut annotation = Annotation::new("La/Marker;");
        annotation.values.push(ElementValuePair {
            name: "value".to_string(),
            value: ElementValue::Array(vec![ElementValue::Int(1), ElementValue::Char(u16::from(b'c'))]),
        });
        field.annotations.visible = Some(vec![annotation]);
        class.fields.push(field);

        let mut method = MethodRecord::new(AccessFlags::STATIC, "make", "()Ljava/lang/Object;");
        method.code = Some(Code {
            max_stack: 1,
            max_locals: 0,
            ..Code::new(vec![
                Instruction::InvokeDynamic {
                    name: "get".to_string(),
                    descriptor: "()Ljava/lang/Object;".to_string(),
                    bootstrap: bootstrap(),
                },
                Instruction::Simple(ARETURN),
            ])
        });
        method.exceptions.push("java/io/IOException".to_string());
        class.methods.push(method);

        class.attributes.push(Attribute::Known(KnownAttribute::InnerClasses(vec![InnerClass {
            name: "a/Rich$Inner".to_string(),
            outer_name: Some("a/Rich".to_string()),
            inner_name: Some("Inner".to_string()),
            access: AccessFlags::STATIC,
        }])));
        class.attributes.push(Attribute::Raw(RawAttribute {
            name: "a.Custom".to_string(),
            info: vec![9, 9],
        }));
        class
    }

    #[test]
    fn decoded_record_survives_reencoding() {
        init_tracing();
        let class = rich_class();
        let bytes = encode(&class, EncodeOptions::none()).unwrap();
        assert_eq!(decode(&bytes, DecodeOptions::default()).unwrap(), class);
    }

    #[test]
    fn encoding_is_deterministic() {
        let class = rich_class();
        assert_eq!(
            encode(&class, EncodeOptions::none()).unwrap(),
            encode(&class, EncodeOptions::none()).unwrap()
        );
    }

    #[test]
    fn reencoding_minimal_class_is_stable() {
        let bytes = minimal_class();
        let class = decode(&bytes, DecodeOptions::default()).unwrap();
        let once = encode(&class, EncodeOptions::none()).unwrap();
        let twice = encode(&decode(&once, DecodeOptions::default()).unwrap(), EncodeOptions::none()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn bootstrap_methods_are_shared() {
        let mut class = rich_class();
        let dynamic = Constant::Dynamic(ConstantDynamic {
            name: "c".to_string(),
            descriptor: "I".to_string(),
            bootstrap: bootstrap(),
        });
        class.fields[0].value = None;
        let code = class.methods[0].code.as_mut().unwrap();
        code.instructions.insert(0, Instruction::Ldc(dynamic));
        code.instructions.insert(1, Instruction::Simple(POP));

        let bytes = encode(&class, EncodeOptions::maxs()).unwrap();
        let decoded = decode(&bytes, DecodeOptions::default()).unwrap();
        assert_eq!(
            decoded.methods[0].code.as_ref().unwrap().instructions,
            class.methods[0].code.as_ref().unwrap().instructions
        );

        let mut w = Writer {
            cp: ConstantPoolBuilder::default(),
            bootstrap_methods: Vec::new(),
            bootstrap_indices: HashMap::new(),
            options: EncodeOptions::none(),
            hierarchy: &ObjectHierarchy,
            owner: "a/B",
            major_version: 52,
        };
        assert_eq!(w.bootstrap_method(&bootstrap()).unwrap(), 0);
        assert_eq!(w.bootstrap_method(&bootstrap()).unwrap(), 0);
        assert_eq!(w.bootstrap_methods.len(), 1);
    }

    #[test]
    fn empty_names_are_refused() {
        let class = ClassRecord::new("");
        assert!(matches!(
            encode(&class, EncodeOptions::none()),
            Err(ClassFileError::InvalidRecord(_))
        ));

        let mut class = ClassRecord::new("a/B");
        class.methods.push(MethodRecord::new(AccessFlags::PUBLIC, "", "()V"));
        assert!(encode(&class, EncodeOptions::none()).is_err());
    }

    #[test]
    fn compute_frames_implies_maxs() {
        let mut class = ClassRecord::new("a/B");
        let mut method = MethodRecord::new(AccessFlags::STATIC, "f", "(JJ)J");
        method.code = Some(Code::new(vec![
            Instruction::Var {
                opcode: LLOAD,
                index: 0,
            },
            Instruction::Var {
                opcode: LLOAD,
                index: 2,
            },
            Instruction::Simple(LADD),
            Instruction::Simple(LRETURN),
        ]));
        class.methods.push(method);

        let bytes = encode(&class, EncodeOptions::frames()).unwrap();
        let code = decode(&bytes, DecodeOptions::default()).unwrap().methods[0]
            .code
            .clone()
            .unwrap();
        assert_eq!((code.max_stack, code.max_locals), (4, 4));

        let bytes = encode(&class, EncodeOptions::none()).unwrap();
        let code = decode(&bytes, DecodeOptions::default()).unwrap().methods[0]
            .code
            .clone()
            .unwrap();
        assert_eq!((code.max_stack, code.max_locals), (0, 0));
    }
}
