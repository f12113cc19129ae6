//! Decoding of class file bytes into a [`ClassRecord`].

use tracing::{debug, trace};

use crate::{
    class::{
        ClassRecord,
        access_flags::AccessFlags,
        annotation::Annotations,
        attribute::{self, Attribute, KnownAttribute, RawAttribute},
        constant::{BootstrapMethod, Constant, ConstantDynamic, Handle},
        constant_pool::{ConstantPool, CpIndex, CpInfo},
        field::FieldRecord,
        method::MethodRecord,
    },
    error::{Result, bail},
    magic::MAGIC,
    util::Cursor,
};

mod annotation;
mod code;

pub(crate) use code::LabelMap;

/// What to leave out, or reshape, while decoding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Drop `SourceFile`, `SourceDebugExtension`, `LineNumberTable`,
    /// `LocalVariableTable`, `LocalVariableTypeTable` and `MethodParameters`.
    pub skip_debug: bool,
    /// Drop `StackMapTable`.
    pub skip_frames: bool,
    /// Decode `StackMapTable` into [`Frames::Expanded`](crate::class::frame::Frames::Expanded).
    pub expand_frames: bool,
}

/// Bootstrapped constants may refer to other bootstrapped constants; a
/// well-formed file never nests this deep.
const MAX_CONSTANT_DEPTH: usize = 32;

struct RawBootstrapMethod {
    handle: CpIndex,
    arguments: Vec<CpIndex>,
}

/// Decoding state shared by every part of one class file.
pub(crate) struct Context {
    pub cp: ConstantPool,
    bootstrap_methods: Vec<RawBootstrapMethod>,
    pub options: DecodeOptions,
}

/// Parses `bytes` into a record.
pub fn decode(bytes: &[u8], options: DecodeOptions) -> Result<ClassRecord> {
    let mut r = Cursor::new(bytes);
    let (minor_version, major_version, cp) = header(&mut r)?;

    let body = r.position();
    let bootstrap_methods = find_bootstrap_methods(&mut r, &cp)?;
    r.set_position(body);

    let mut cx = Context::new(cp, options);
    cx.bootstrap_methods = bootstrap_methods;

    let access = AccessFlags(r.u2()?);
    let name = cx.cp.class_name(r.u2()?.into())?.to_string();
    let super_name = cx.cp.optional_class_name(r.u2()?.into())?.map(str::to_string);

    let interfaces_count = r.u2()?;
    let mut interfaces = Vec::with_capacity(interfaces_count.into());
    for _ in 0..interfaces_count {
        interfaces.push(cx.cp.class_name(r.u2()?.into())?.to_string());
    }

    let fields_count = r.u2()?;
    trace!("parsing {fields_count} fields");
    let mut fields = Vec::with_capacity(fields_count.into());
    for _ in 0..fields_count {
        fields.push(field(&mut r, &cx)?);
    }

    let methods_count = r.u2()?;
    trace!("parsing {methods_count} methods");
    let mut methods = Vec::with_capacity(methods_count.into());
    for _ in 0..methods_count {
        methods.push(method(&mut r, &cx, &name)?);
    }

    let mut class = ClassRecord {
        minor_version,
        major_version,
        access,
        name,
        super_name,
        interfaces,
        fields,
        methods,
        source_file: None,
        source_debug_extension: None,
        annotations: Annotations::default(),
        attributes: Vec::new(),
    };
    class_attributes(&mut r, &cx, &mut class)?;

    if !r.is_empty() {
        bail!("{} trailing bytes after the class attributes", r.remaining());
    }

    debug!(
        "decoded class {} (version {}.{}, {} fields, {} methods)",
        class.name,
        class.major_version,
        class.minor_version,
        class.fields.len(),
        class.methods.len()
    );
    Ok(class)
}

/// Reads only as far as the class access flags.
pub fn decode_access(bytes: &[u8]) -> Result<AccessFlags> {
    let mut r = Cursor::new(bytes);
    header(&mut r)?;
    Ok(AccessFlags(r.u2()?))
}

fn header(r: &mut Cursor) -> Result<(u16, u16, ConstantPool)> {
    let magic = r.u4()?;
    if magic != MAGIC {
        bail!("invalid magic number 0x{magic:x}");
    }

    let minor_version = r.u2()?;
    let major_version = r.u2()?;

    let constant_pool_count = r.u2()?;
    let cp = ConstantPool::new(r, constant_pool_count)?;

    Ok((minor_version, major_version, cp))
}

/// Walks past the members to the class attributes and parses
/// `BootstrapMethods`, which constants and `invokedynamic` refer to.
fn find_bootstrap_methods(r: &mut Cursor, cp: &ConstantPool) -> Result<Vec<RawBootstrapMethod>> {
    r.skip(6)?;
    let interfaces_count = r.u2()?;
    r.skip(2 * interfaces_count as usize)?;

    for _ in 0..2 {
        let members_count = r.u2()?;
        for _ in 0..members_count {
            r.skip(6)?;
            let attributes_count = r.u2()?;
            for _ in 0..attributes_count {
                r.skip(2)?;
                let length = r.u4()?;
                r.skip(length as usize)?;
            }
        }
    }

    let mut bootstrap_methods = Vec::new();
    let attributes_count = r.u2()?;
    for _ in 0..attributes_count {
        let name_index = r.u2()?.into();
        let length = r.u4()?;
        let mut sub = r.sub(length as usize)?;

        if cp.utf8(name_index)? != attribute::BOOTSTRAP_METHODS {
            continue;
        }

        let count = sub.u2()?;
        for _ in 0..count {
            let handle = sub.u2()?.into();
            let arguments_count = sub.u2()?;
            let mut arguments = Vec::with_capacity(arguments_count.into());
            for _ in 0..arguments_count {
                arguments.push(sub.u2()?.into());
            }
            bootstrap_methods.push(RawBootstrapMethod { handle, arguments });
        }

        if !sub.is_empty() {
            bail!("BootstrapMethods attribute has {} unread bytes", sub.remaining());
        }
    }

    Ok(bootstrap_methods)
}

impl Context {
    pub fn new(cp: ConstantPool, options: DecodeOptions) -> Self {
        Self {
            cp,
            bootstrap_methods: Vec::new(),
            options,
        }
    }

    /// Resolves a loadable constant.
    pub fn constant(&self, index: CpIndex) -> Result<Constant> {
        self.constant_at_depth(index, 0)
    }

    fn constant_at_depth(&self, index: CpIndex, depth: usize) -> Result<Constant> {
        Ok(match self.cp.get(index)? {
            CpInfo::Integer(value) => Constant::Integer(*value),
            CpInfo::Float(bits) => Constant::Float(f32::from_bits(*bits)),
            CpInfo::Long(value) => Constant::Long(*value),
            CpInfo::Double(bits) => Constant::Double(f64::from_bits(*bits)),
            CpInfo::String { string_index } => Constant::String(self.cp.utf8(*string_index)?.to_string()),
            CpInfo::Class { name_index } => Constant::Class(self.cp.utf8(*name_index)?.to_string()),
            CpInfo::MethodType { descriptor_index } => {
                Constant::MethodType(self.cp.utf8(*descriptor_index)?.to_string())
            }
            CpInfo::MethodHandle { .. } => Constant::MethodHandle(self.handle(index)?),
            CpInfo::Dynamic {
                bootstrap_method_attr_index,
                name_and_type_index,
            } => {
                let (name, descriptor) = self.cp.name_and_type(*name_and_type_index)?;
                Constant::Dynamic(ConstantDynamic {
                    name: name.to_string(),
                    descriptor: descriptor.to_string(),
                    bootstrap: self.bootstrap_method(*bootstrap_method_attr_index, depth)?,
                })
            }
            item => bail!("constant pool index {} ({}) is not loadable", index.0, item.kind()),
        })
    }

    pub fn handle(&self, index: CpIndex) -> Result<Handle> {
        let CpInfo::MethodHandle {
            reference_kind,
            reference_index,
        } = self.cp.get(index)?
        else {
            bail!("expected MethodHandle at constant pool index {}", index.0);
        };

        if !(1..=9).contains(reference_kind) {
            bail!("invalid method handle kind {reference_kind}");
        }

        let member = self.cp.member_ref(*reference_index)?;
        Ok(Handle {
            kind: *reference_kind,
            owner: member.owner.to_string(),
            name: member.name.to_string(),
            descriptor: member.descriptor.to_string(),
            interface: member.interface,
        })
    }

    pub fn bootstrap_method(&self, index: u16, depth: usize) -> Result<BootstrapMethod> {
        if depth > MAX_CONSTANT_DEPTH {
            bail!("bootstrap method arguments nested more than {MAX_CONSTANT_DEPTH} deep");
        }

        let Some(raw) = self.bootstrap_methods.get(index as usize) else {
            bail!("invalid bootstrap method index {index}");
        };

        let mut arguments = Vec::with_capacity(raw.arguments.len());
        for argument in &raw.arguments {
            arguments.push(self.constant_at_depth(*argument, depth + 1)?);
        }

        Ok(BootstrapMethod {
            handle: self.handle(raw.handle)?,
            arguments,
        })
    }
}

/// Calls `f` for each attribute of a `attributes_count`-prefixed table with
/// a cursor over just its payload, which `f` has to consume entirely.
pub(crate) fn each_attribute<'a>(
    r: &mut Cursor<'a>,
    cp: &ConstantPool,
    mut f: impl FnMut(&str, &mut Cursor<'a>) -> Result<()>,
) -> Result<()> {
    let attributes_count = r.u2()?;
    for _ in 0..attributes_count {
        let name_index = r.u2()?.into();
        let length = r.u4()?;
        let name = cp.utf8(name_index)?;
        let mut sub = r.sub(length as usize)?;

        f(name, &mut sub)?;

        if !sub.is_empty() {
            bail!("{name} attribute has {} unread bytes", sub.remaining());
        }
    }
    Ok(())
}

pub(crate) fn raw(name: &str, r: &mut Cursor) -> Result<RawAttribute> {
    Ok(RawAttribute {
        name: name.to_string(),
        info: r.bytes(r.remaining())?.to_vec(),
    })
}

pub(crate) fn skip_rest(r: &mut Cursor) -> Result<()> {
    r.skip(r.remaining())
}

fn class_names(r: &mut Cursor, cx: &Context) -> Result<Vec<String>> {
    let count = r.u2()?;
    let mut names = Vec::with_capacity(count.into());
    for _ in 0..count {
        names.push(cx.cp.class_name(r.u2()?.into())?.to_string());
    }
    Ok(names)
}

/// Handles the attributes classes, fields and methods have in common.
/// Returns `false` when `name` is not one of them.
fn common_attribute(
    name: &str,
    r: &mut Cursor,
    cx: &Context,
    annotations: &mut Annotations,
    attributes: &mut Vec<Attribute>,
) -> Result<bool> {
    match name {
        attribute::RUNTIME_VISIBLE_ANNOTATIONS => {
            annotations.visible = Some(annotation::annotations(r, cx)?)
        }
        attribute::RUNTIME_INVISIBLE_ANNOTATIONS => {
            annotations.invisible = Some(annotation::annotations(r, cx)?)
        }
        attribute::RUNTIME_VISIBLE_TYPE_ANNOTATIONS => {
            annotations.visible_type = Some(annotation::type_annotations(r, cx, None)?)
        }
        attribute::RUNTIME_INVISIBLE_TYPE_ANNOTATIONS => {
            annotations.invisible_type = Some(annotation::type_annotations(r, cx, None)?)
        }
        attribute::SIGNATURE => attributes.push(Attribute::Known(KnownAttribute::Signature(
            cx.cp.utf8(r.u2()?.into())?.to_string(),
        ))),
        attribute::DEPRECATED => attributes.push(Attribute::Known(KnownAttribute::Deprecated)),
        attribute::SYNTHETIC => attributes.push(Attribute::Known(KnownAttribute::Synthetic)),
        _ => return Ok(false),
    }
    Ok(true)
}

fn field(r: &mut Cursor, cx: &Context) -> Result<FieldRecord> {
    let access = AccessFlags(r.u2()?);
    let name = cx.cp.utf8(r.u2()?.into())?;
    let descriptor = cx.cp.utf8(r.u2()?.into())?;
    let mut field = FieldRecord::new(access, name, descriptor);

    each_attribute(r, &cx.cp, |name, sub| {
        if common_attribute(name, sub, cx, &mut field.annotations, &mut field.attributes)? {
            return Ok(());
        }

        match name {
            attribute::CONSTANT_VALUE => field.value = Some(cx.constant(sub.u2()?.into())?),
            _ => field.attributes.push(Attribute::Raw(raw(name, sub)?)),
        }
        Ok(())
    })?;

    Ok(field)
}

fn method(r: &mut Cursor, cx: &Context, owner: &str) -> Result<MethodRecord> {
    let access = AccessFlags(r.u2()?);
    let name = cx.cp.utf8(r.u2()?.into())?;
    let descriptor = cx.cp.utf8(r.u2()?.into())?;
    let mut method = MethodRecord::new(access, name, descriptor);
    trace!("parsing method {name}{descriptor}");

    each_attribute(r, &cx.cp, |name, sub| {
        if common_attribute(name, sub, cx, &mut method.annotations, &mut method.attributes)? {
            return Ok(());
        }

        match name {
            attribute::CODE => {
                if method.code.is_some() {
                    bail!("method {}{} has more than one Code attribute", method.name, method.descriptor);
                }
                method.code = Some(code::code(sub, cx, owner, &method)?);
            }
            attribute::EXCEPTIONS => method.exceptions = class_names(sub, cx)?,
            attribute::METHOD_PARAMETERS if cx.options.skip_debug => skip_rest(sub)?,
            attribute::METHOD_PARAMETERS => {
                let count = sub.u1()?;
                let mut parameters = Vec::with_capacity(count.into());
                for _ in 0..count {
                    parameters.push(attribute::MethodParameter {
                        name: cx.cp.optional_utf8(sub.u2()?.into())?.map(str::to_string),
                        access: AccessFlags(sub.u2()?),
                    });
                }
                method
                    .attributes
                    .push(Attribute::Known(KnownAttribute::MethodParameters(parameters)));
            }
            attribute::ANNOTATION_DEFAULT => method.attributes.push(Attribute::Known(
                KnownAttribute::AnnotationDefault(annotation::element_value(sub, cx)?),
            )),
            attribute::RUNTIME_VISIBLE_PARAMETER_ANNOTATIONS
            | attribute::RUNTIME_INVISIBLE_PARAMETER_ANNOTATIONS => {
                let count = sub.u1()?;
                let mut parameters = Vec::with_capacity(count.into());
                for _ in 0..count {
                    parameters.push(annotation::annotations(sub, cx)?);
                }
                method
                    .attributes
                    .push(Attribute::Known(KnownAttribute::ParameterAnnotations {
                        visible: name == attribute::RUNTIME_VISIBLE_PARAMETER_ANNOTATIONS,
                        parameters,
                    }));
            }
            _ => method.attributes.push(Attribute::Raw(raw(name, sub)?)),
        }
        Ok(())
    })?;

    Ok(method)
}

fn class_attributes(r: &mut Cursor, cx: &Context, class: &mut ClassRecord) -> Result<()> {
    each_attribute(r, &cx.cp, |name, sub| {
        if common_attribute(name, sub, cx, &mut class.annotations, &mut class.attributes)? {
            return Ok(());
        }

        match name {
            attribute::SOURCE_FILE | attribute::SOURCE_DEBUG_EXTENSION if cx.options.skip_debug => {
                skip_rest(sub)?
            }
            attribute::SOURCE_FILE => {
                class.source_file = Some(cx.cp.utf8(sub.u2()?.into())?.to_string())
            }
            attribute::SOURCE_DEBUG_EXTENSION => {
                class.source_debug_extension = Some(sub.bytes(sub.remaining())?.to_vec())
            }
            // resolved into the constants and instructions referring to it
            attribute::BOOTSTRAP_METHODS => skip_rest(sub)?,
            attribute::INNER_CLASSES => {
                let count = sub.u2()?;
                let mut inner_classes = Vec::with_capacity(count.into());
                for _ in 0..count {
                    inner_classes.push(attribute::InnerClass {
                        name: cx.cp.class_name(sub.u2()?.into())?.to_string(),
                        outer_name: cx.cp.optional_class_name(sub.u2()?.into())?.map(str::to_string),
                        inner_name: cx.cp.optional_utf8(sub.u2()?.into())?.map(str::to_string),
                        access: AccessFlags(sub.u2()?),
                    });
                }
                class
                    .attributes
                    .push(Attribute::Known(KnownAttribute::InnerClasses(inner_classes)));
            }
            attribute::ENCLOSING_METHOD => {
                let owner = cx.cp.class_name(sub.u2()?.into())?.to_string();
                let method_index = CpIndex(sub.u2()?);
                let method = if method_index.is_none() {
                    None
                } else {
                    let (name, descriptor) = cx.cp.name_and_type(method_index)?;
                    Some((name.to_string(), descriptor.to_string()))
                };
                class
                    .attributes
                    .push(Attribute::Known(KnownAttribute::EnclosingMethod(
                        attribute::EnclosingMethod { owner, method },
                    )));
            }
            attribute::NEST_HOST => class.attributes.push(Attribute::Known(KnownAttribute::NestHost(
                cx.cp.class_name(sub.u2()?.into())?.to_string(),
            ))),
            attribute::NEST_MEMBERS => class.attributes.push(Attribute::Known(
                KnownAttribute::NestMembers(class_names(sub, cx)?),
            )),
            attribute::PERMITTED_SUBCLASSES => class.attributes.push(Attribute::Known(
                KnownAttribute::PermittedSubclasses(class_names(sub, cx)?),
            )),
            _ => class.attributes.push(Attribute::Raw(raw(name, sub)?)),
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ClassFileError,
        class::{
            attribute::{MethodParameter, RawAttribute},
            frame::{Frame, Frames, StackMapFrame, VerificationType},
            instruction::{Instruction, Label},
        },
        opcodes::*,
        test_support::{ClassBuilder, minimal_class},
    };

    /// `void m(int x) { if (x != 0) {} }` with one frame at the return.
    fn class_with_frames() -> Vec<u8> {
        ClassBuilder::new("Frames")
            .method("m", "(I)V", &[ILOAD_1, IFEQ, 0x00, 0x04, NOP, RETURN], &[])
            .stack_map(&[0x00, 0x01, 0x05])
            .build()
    }

    fn class_with_debug_info() -> Vec<u8> {
        ClassBuilder::new("Dbg")
            .source_file("Dbg.java")
            .class_attribute("SourceDebugExtension", b"SMAP")
            .method("m", "(I)V", &[ILOAD_1, POP, RETURN], &[(0, 7)])
            .local_variable(0, 3, "this", "LDbg;", 0)
            .local_variable(0, 3, "x", "I", 1)
            .local_variable_type(0, 3, "this", "LDbg<TT;>;", 0)
            .parameter("x", AccessFlags::FINAL)
            .build()
    }

    #[test]
    fn minimal_class_decodes() {
        let class = decode(&minimal_class(), DecodeOptions::default()).unwrap();
        assert_eq!(class.name, "Hello");
        assert_eq!(class.super_name.as_deref(), Some("java/lang/Object"));
        assert_eq!(class.major_version, 52);
        assert_eq!(class.access, AccessFlags::PUBLIC | AccessFlags::SUPER);
        assert_eq!(class.methods.len(), 1);

        let method = &class.methods[0];
        assert_eq!(method.name, "run");
        assert_eq!(method.descriptor, "()V");
        let code = method.code.as_ref().unwrap();
        assert_eq!(code.instructions, vec![Instruction::Simple(RETURN)]);
    }

    #[test]
    fn major_version_matches_header_bytes() {
        let bytes = ClassBuilder::new("V").version(61).build();
        let class = decode(&bytes, DecodeOptions::default()).unwrap();
        assert_eq!(class.major_version, u16::from_be_bytes([bytes[6], bytes[7]]));
        assert_eq!(class.java_release(), 17);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = minimal_class();
        bytes[0] = 0xCB;
        assert!(matches!(
            decode(&bytes, DecodeOptions::default()),
            Err(ClassFileError::MalformedClassFile(_))
        ));
    }

    #[test]
    fn rejects_truncation_anywhere() {
        let bytes = minimal_class();
        for length in 0..bytes.len() {
            assert!(
                decode(&bytes[..length], DecodeOptions::default()).is_err(),
                "decoding {length} of {} bytes should fail",
                bytes.len()
            );
        }
    }

    #[test]
    fn rejects_trailing_bytes() {
        let mut bytes = minimal_class();
        bytes.push(0);
        assert!(decode(&bytes, DecodeOptions::default()).is_err());
    }

    #[test]
    fn keeps_unknown_attributes_verbatim() {
        let bytes = ClassBuilder::new("Raw")
            .class_attribute("com.example.Custom", &[1, 2, 3])
            .build();
        let class = decode(&bytes, DecodeOptions::default()).unwrap();
        assert_eq!(
            class.attributes,
            vec![Attribute::Raw(RawAttribute {
                name: "com.example.Custom".to_string(),
                info: vec![1, 2, 3],
            })]
        );
    }

    #[test]
    fn skip_debug_drops_source_file() {
        let bytes = ClassBuilder::new("Src").source_file("Src.java").build();

        let full = decode(&bytes, DecodeOptions::default()).unwrap();
        assert_eq!(full.source_file.as_deref(), Some("Src.java"));

        let stripped = decode(
            &bytes,
            DecodeOptions {
                skip_debug: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(stripped.source_file, None);
    }

    #[test]
    fn frames_are_kept_compressed_by_default() {
        let class = decode(&class_with_frames(), DecodeOptions::default()).unwrap();
        assert_eq!(
            class.methods[0].code.as_ref().unwrap().frames,
            Some(Frames::Compressed(vec![StackMapFrame::Same { target: Label(3) }]))
        );
    }

    #[test]
    fn skip_frames_drops_stack_map_table() {
        let options = DecodeOptions {
            skip_frames: true,
            ..Default::default()
        };
        let class = decode(&class_with_frames(), options).unwrap();
        let code = class.methods[0].code.as_ref().unwrap();
        assert_eq!(code.frames, None);
        assert!(code.attributes.is_empty());
    }

    #[test]
    fn expand_frames_spells_out_locals() {
        let options = DecodeOptions {
            expand_frames: true,
            ..Default::default()
        };
        let class = decode(&class_with_frames(), options).unwrap();
        assert_eq!(
            class.methods[0].code.as_ref().unwrap().frames,
            Some(Frames::Expanded(vec![Frame {
                target: Label(3),
                locals: vec![VerificationType::Object("Frames".to_string()), VerificationType::Integer],
                stack: vec![],
            }]))
        );
    }

    #[test]
    fn debug_info_is_decoded() {
        let class = decode(&class_with_debug_info(), DecodeOptions::default()).unwrap();
        assert_eq!(class.source_debug_extension.as_deref(), Some(b"SMAP".as_slice()));

        let method = &class.methods[0];
        let code = method.code.as_ref().unwrap();
        assert_eq!(code.line_numbers.as_ref().map(Vec::len), Some(1));
        let names: Vec<_> = code
            .local_variables
            .iter()
            .flatten()
            .map(|local| (local.name.as_str(), local.start, local.end))
            .collect();
        assert_eq!(names, vec![("this", Label(0), Label(3)), ("x", Label(0), Label(3))]);
        assert_eq!(code.local_variable_types.as_ref().map(Vec::len), Some(1));
        assert_eq!(
            method.attributes,
            vec![Attribute::Known(KnownAttribute::MethodParameters(vec![MethodParameter {
                name: Some("x".to_string()),
                access: AccessFlags::FINAL,
            }]))]
        );
    }

    #[test]
    fn skip_debug_drops_every_debug_attribute() {
        let options = DecodeOptions {
            skip_debug: true,
            ..Default::default()
        };
        let class = decode(&class_with_debug_info(), options).unwrap();
        assert_eq!(class.source_file, None);
        assert_eq!(class.source_debug_extension, None);
        assert!(class.attributes.is_empty());

        let method = &class.methods[0];
        let code = method.code.as_ref().unwrap();
        assert_eq!(code.line_numbers, None);
        assert_eq!(code.local_variables, None);
        assert_eq!(code.local_variable_types, None);
        assert!(code.attributes.is_empty());
        assert!(method.attributes.is_empty());
    }

    #[test]
    fn decode_access_reads_only_the_header() {
        let bytes = ClassBuilder::new("A")
            .access(AccessFlags::PUBLIC | AccessFlags::FINAL)
            .build();
        // the members and attributes are never looked at
        let header_len = bytes.len() - 8;
        assert_eq!(
            decode_access(&bytes[..header_len]).unwrap(),
            AccessFlags::PUBLIC | AccessFlags::FINAL
        );
        assert_eq!(
            decode_access(&bytes).unwrap(),
            AccessFlags::PUBLIC | AccessFlags::FINAL
        );
    }
}
