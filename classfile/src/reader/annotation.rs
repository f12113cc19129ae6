use crate::{
    class::{
        annotation::{
            Annotation, ElementValue, ElementValuePair, LocalVariableRange, TypeAnnotation,
            TypeAnnotationTarget, TypePathEntry,
        },
        constant_pool::{CpIndex, CpInfo},
    },
    error::{Result, bail},
    reader::{Context, LabelMap},
    util::Cursor,
};

/// Annotations nested inside element values deeper than this are rejected.
const MAX_NESTING: usize = 64;

pub fn annotations(r: &mut Cursor, cx: &Context) -> Result<Vec<Annotation>> {
    let count = r.u2()?;
    let mut annotations = Vec::with_capacity(count.into());
    for _ in 0..count {
        annotations.push(annotation(r, cx, 0)?);
    }
    Ok(annotations)
}

fn annotation(r: &mut Cursor, cx: &Context, depth: usize) -> Result<Annotation> {
    let descriptor = cx.cp.utf8(r.u2()?.into())?;
    let pairs_count = r.u2()?;
    let mut annotation = Annotation::new(descriptor);
    for _ in 0..pairs_count {
        let name = cx.cp.utf8(r.u2()?.into())?.to_string();
        let value = value(r, cx, depth)?;
        annotation.values.push(ElementValuePair { name, value });
    }
    Ok(annotation)
}

pub fn element_value(r: &mut Cursor, cx: &Context) -> Result<ElementValue> {
    value(r, cx, 0)
}

fn integer(cx: &Context, index: CpIndex) -> Result<i32> {
    match cx.cp.get(index)? {
        CpInfo::Integer(value) => Ok(*value),
        item => bail!("expected Integer at constant pool index {}, got {}", index.0, item.kind()),
    }
}

fn value(r: &mut Cursor, cx: &Context, depth: usize) -> Result<ElementValue> {
    if depth > MAX_NESTING {
        bail!("annotation values nested more than {MAX_NESTING} deep");
    }

    let tag = r.u1()?;
    Ok(match tag {
        b'B' => ElementValue::Byte(integer(cx, r.u2()?.into())? as i8),
        b'C' => ElementValue::Char(integer(cx, r.u2()?.into())? as u16),
        b'I' => ElementValue::Int(integer(cx, r.u2()?.into())?),
        b'S' => ElementValue::Short(integer(cx, r.u2()?.into())? as i16),
        b'Z' => ElementValue::Boolean(integer(cx, r.u2()?.into())? != 0),
        b'D' => match cx.cp.get(r.u2()?.into())? {
            CpInfo::Double(bits) => ElementValue::Double(f64::from_bits(*bits)),
            item => bail!("expected Double for element value, got {}", item.kind()),
        },
        b'F' => match cx.cp.get(r.u2()?.into())? {
            CpInfo::Float(bits) => ElementValue::Float(f32::from_bits(*bits)),
            item => bail!("expected Float for element value, got {}", item.kind()),
        },
        b'J' => match cx.cp.get(r.u2()?.into())? {
            CpInfo::Long(value) => ElementValue::Long(*value),
            item => bail!("expected Long for element value, got {}", item.kind()),
        },
        b's' => ElementValue::String(cx.cp.utf8(r.u2()?.into())?.to_string()),
        b'e' => ElementValue::Enum {
            descriptor: cx.cp.utf8(r.u2()?.into())?.to_string(),
            name: cx.cp.utf8(r.u2()?.into())?.to_string(),
        },
        b'c' => ElementValue::Class(cx.cp.utf8(r.u2()?.into())?.to_string()),
        b'@' => ElementValue::Annotation(annotation(r, cx, depth + 1)?),
        b'[' => {
            let count = r.u2()?;
            let mut values = Vec::with_capacity(count.into());
            for _ in 0..count {
                values.push(value(r, cx, depth + 1)?);
            }
            ElementValue::Array(values)
        }
        _ => bail!("invalid element value tag {tag}"),
    })
}

/// Type annotations of a class, field or method (`labels` is `None`), or of
/// a method body.
pub fn type_annotations(
    r: &mut Cursor,
    cx: &Context,
    labels: Option<&LabelMap>,
) -> Result<Vec<TypeAnnotation>> {
    let count = r.u2()?;
    let mut annotations = Vec::with_capacity(count.into());
    for _ in 0..count {
        let target = target(r, labels)?;

        let path_length = r.u1()?;
        let mut path = Vec::with_capacity(path_length.into());
        for _ in 0..path_length {
            path.push(TypePathEntry {
                kind: r.u1()?,
                argument_index: r.u1()?,
            });
        }

        annotations.push(TypeAnnotation {
            target,
            path,
            annotation: annotation(r, cx, 0)?,
        });
    }
    Ok(annotations)
}

fn target(r: &mut Cursor, labels: Option<&LabelMap>) -> Result<TypeAnnotationTarget> {
    let target_type = r.u1()?;

    let code_labels = || match labels {
        Some(labels) => Ok(labels),
        None => bail!("type annotation target 0x{target_type:x} outside of a method body"),
    };

    Ok(match target_type {
        0x00 | 0x01 => TypeAnnotationTarget::TypeParameter {
            target_type,
            index: r.u1()?,
        },
        0x10 => TypeAnnotationTarget::Supertype(r.u2()?),
        0x11 | 0x12 => TypeAnnotationTarget::TypeParameterBound {
            target_type,
            parameter: r.u1()?,
            bound: r.u1()?,
        },
        0x13..=0x15 => TypeAnnotationTarget::Empty(target_type),
        0x16 => TypeAnnotationTarget::FormalParameter(r.u1()?),
        0x17 => TypeAnnotationTarget::Throws(r.u2()?),
        0x40 | 0x41 => {
            let labels = code_labels()?;
            let count = r.u2()?;
            let mut ranges = Vec::with_capacity(count.into());
            for _ in 0..count {
                let start = r.u2()? as usize;
                let length = r.u2()? as usize;
                ranges.push(LocalVariableRange {
                    start: labels.label(start)?,
                    end: labels.label(start + length)?,
                    index: r.u2()?,
                });
            }
            TypeAnnotationTarget::LocalVariable { target_type, ranges }
        }
        0x42 => TypeAnnotationTarget::Catch(r.u2()?),
        0x43..=0x46 => {
            let labels = code_labels()?;
            TypeAnnotationTarget::Offset {
                target_type,
                label: labels.label(r.u2()?.into())?,
            }
        }
        0x47..=0x4B => {
            let labels = code_labels()?;
            TypeAnnotationTarget::TypeArgument {
                target_type,
                label: labels.label(r.u2()?.into())?,
                index: r.u1()?,
            }
        }
        _ => bail!("invalid type annotation target type 0x{target_type:x}"),
    })
}
