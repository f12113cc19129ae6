use crate::{
    class::{
        annotation::{Annotation, Annotations, ElementValue, TypeAnnotation, TypeAnnotationTarget},
        attribute,
        instruction::Label,
    },
    error::{Result, invalid},
    util::Out,
    writer::{Attributes, Writer, count},
};

/// Offset of `label` within the code laid out as `offsets`.
pub(super) fn offset(offsets: &[u32], label: Label) -> Result<u16> {
    match offsets.get(label.index()) {
        Some(offset) => Ok(*offset as u16),
        None => invalid!("label {} is past the end of the code", label.0),
    }
}

impl Writer<'_> {
    /// Writes the four annotation attributes that are present.
    pub(super) fn annotation_attributes(
        &mut self,
        attributes: &mut Attributes,
        annotations: &Annotations,
    ) -> Result<()> {
        if let Some(visible) = &annotations.visible {
            let mut info = Vec::new();
            self.annotations(&mut info, visible)?;
            attributes.push(&mut self.cp, attribute::RUNTIME_VISIBLE_ANNOTATIONS, &info)?;
        }
        if let Some(invisible) = &annotations.invisible {
            let mut info = Vec::new();
            self.annotations(&mut info, invisible)?;
            attributes.push(&mut self.cp, attribute::RUNTIME_INVISIBLE_ANNOTATIONS, &info)?;
        }
        self.type_annotation_attributes(
            attributes,
            annotations.visible_type.as_deref(),
            annotations.invisible_type.as_deref(),
            None,
        )
    }

    pub(super) fn type_annotation_attributes(
        &mut self,
        attributes: &mut Attributes,
        visible: Option<&[TypeAnnotation]>,
        invisible: Option<&[TypeAnnotation]>,
        offsets: Option<&[u32]>,
    ) -> Result<()> {
        if let Some(visible) = visible {
            let mut info = Vec::new();
            self.type_annotations(&mut info, visible, offsets)?;
            attributes.push(&mut self.cp, attribute::RUNTIME_VISIBLE_TYPE_ANNOTATIONS, &info)?;
        }
        if let Some(invisible) = invisible {
            let mut info = Vec::new();
            self.type_annotations(&mut info, invisible, offsets)?;
            attributes.push(&mut self.cp, attribute::RUNTIME_INVISIBLE_TYPE_ANNOTATIONS, &info)?;
        }
        Ok(())
    }

    pub(super) fn annotations(&mut self, out: &mut Vec<u8>, annotations: &[Annotation]) -> Result<()> {
        out.u2(count(annotations.len(), "annotations")?);
        for annotation in annotations {
            self.annotation(out, annotation)?;
        }
        Ok(())
    }

    fn annotation(&mut self, out: &mut Vec<u8>, annotation: &Annotation) -> Result<()> {
        out.u2(self.cp.utf8(&annotation.descriptor)?.0);
        out.u2(count(annotation.values.len(), "annotation values")?);
        for pair in &annotation.values {
            out.u2(self.cp.utf8(&pair.name)?.0);
            self.element_value(out, &pair.value)?;
        }
        Ok(())
    }

    pub(super) fn element_value(&mut self, out: &mut Vec<u8>, value: &ElementValue) -> Result<()> {
        match value {
            ElementValue::Byte(value) => {
                out.u1(b'B');
                out.u2(self.cp.integer((*value).into())?.0);
            }
            ElementValue::Char(value) => {
                out.u1(b'C');
                out.u2(self.cp.integer((*value).into())?.0);
            }
            ElementValue::Double(value) => {
                out.u1(b'D');
                out.u2(self.cp.double(*value)?.0);
            }
            ElementValue::Float(value) => {
                out.u1(b'F');
                out.u2(self.cp.float(*value)?.0);
            }
            ElementValue::Int(value) => {
                out.u1(b'I');
                out.u2(self.cp.integer(*value)?.0);
            }
            ElementValue::Long(value) => {
                out.u1(b'J');
                out.u2(self.cp.long(*value)?.0);
            }
            ElementValue::Short(value) => {
                out.u1(b'S');
                out.u2(self.cp.integer((*value).into())?.0);
            }
            ElementValue::Boolean(value) => {
                out.u1(b'Z');
                out.u2(self.cp.integer((*value).into())?.0);
            }
            ElementValue::String(value) => {
                out.u1(b's');
                out.u2(self.cp.utf8(value)?.0);
            }
            ElementValue::Enum { descriptor, name } => {
                out.u1(b'e');
                out.u2(self.cp.utf8(descriptor)?.0);
                out.u2(self.cp.utf8(name)?.0);
            }
            ElementValue::Class(descriptor) => {
                out.u1(b'c');
                out.u2(self.cp.utf8(descriptor)?.0);
            }
            ElementValue::Annotation(annotation) => {
                out.u1(b'@');
                self.annotation(out, annotation)?;
            }
            ElementValue::Array(values) => {
                out.u1(b'[');
                out.u2(count(values.len(), "array values")?);
                for value in values {
                    self.element_value(out, value)?;
                }
            }
        }
        Ok(())
    }

    fn type_annotations(
        &mut self,
        out: &mut Vec<u8>,
        annotations: &[TypeAnnotation],
        offsets: Option<&[u32]>,
    ) -> Result<()> {
        out.u2(count(annotations.len(), "type annotations")?);
        for annotation in annotations {
            target(out, &annotation.target, offsets)?;

            let Ok(path_length) = u8::try_from(annotation.path.len()) else {
                invalid!("type path of {} entries", annotation.path.len());
            };
            out.u1(path_length);
            for entry in &annotation.path {
                out.u1(entry.kind);
                out.u1(entry.argument_index);
            }

            self.annotation(out, &annotation.annotation)?;
        }
        Ok(())
    }
}

fn target(out: &mut Vec<u8>, target: &TypeAnnotationTarget, offsets: Option<&[u32]>) -> Result<()> {
    let code_offsets = || match offsets {
        Some(offsets) => Ok(offsets),
        None => invalid!("type annotation refers to instructions outside of a method body"),
    };

    match target {
        TypeAnnotationTarget::TypeParameter { target_type, index } => {
            out.u1(*target_type);
            out.u1(*index);
        }
        TypeAnnotationTarget::Supertype(index) => {
            out.u1(0x10);
            out.u2(*index);
        }
        TypeAnnotationTarget::TypeParameterBound {
            target_type,
            parameter,
            bound,
        } => {
            out.u1(*target_type);
            out.u1(*parameter);
            out.u1(*bound);
        }
        TypeAnnotationTarget::Empty(target_type) => out.u1(*target_type),
        TypeAnnotationTarget::FormalParameter(index) => {
            out.u1(0x16);
            out.u1(*index);
        }
        TypeAnnotationTarget::Throws(index) => {
            out.u1(0x17);
            out.u2(*index);
        }
        TypeAnnotationTarget::LocalVariable { target_type, ranges } => {
            let offsets = code_offsets()?;
            out.u1(*target_type);
            out.u2(count(ranges.len(), "local variable ranges")?);
            for range in ranges {
                let start = offset(offsets, range.start)?;
                let end = offset(offsets, range.end)?;
                if end < start {
                    invalid!("local variable range ends before it starts");
                }
                out.u2(start);
                out.u2(end - start);
                out.u2(range.index);
            }
        }
        TypeAnnotationTarget::Catch(index) => {
            out.u1(0x42);
            out.u2(*index);
        }
        TypeAnnotationTarget::Offset { target_type, label } => {
            let offsets = code_offsets()?;
            out.u1(*target_type);
            out.u2(offset(offsets, *label)?);
        }
        TypeAnnotationTarget::TypeArgument {
            target_type,
            label,
            index,
        } => {
            let offsets = code_offsets()?;
            out.u1(*target_type);
            out.u2(offset(offsets, *label)?);
            out.u1(*index);
        }
    }
    Ok(())
}
