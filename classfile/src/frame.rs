//! Conversion between the delta-encoded frames of a `StackMapTable` and
//! frames with their locals spelled out.

use crate::{
    class::{
        access_flags::AccessFlags,
        descriptor::{BaseType, FieldType, MethodDescriptor},
        frame::{Frame, StackMapFrame, VerificationType},
    },
    error::{Result, bail},
};

/// The verification type of a value of `field_type`.
pub fn verification_type(field_type: &FieldType) -> VerificationType {
    match field_type {
        FieldType::BaseType(BaseType::Float) => VerificationType::Float,
        FieldType::BaseType(BaseType::Long) => VerificationType::Long,
        FieldType::BaseType(BaseType::Double) => VerificationType::Double,
        FieldType::BaseType(_) => VerificationType::Integer,
        FieldType::ObjectType { class_name } => VerificationType::Object(class_name.clone()),
        FieldType::ComponentType(_) => VerificationType::Object(field_type.descriptor()),
    }
}

/// Locals on entry of a method: `this` unless static, then the parameters.
/// Inside a constructor `this` is uninitialized until the super constructor
/// returns.
pub fn initial_locals(
    owner: &str,
    access: AccessFlags,
    name: &str,
    descriptor: &str,
) -> Result<Vec<VerificationType>> {
    let descriptor = MethodDescriptor::new(descriptor)?;

    let mut locals = Vec::with_capacity(descriptor.parameters.len() + 1);
    if !access.is_static() {
        if name == "<init>" && owner != "java/lang/Object" {
            locals.push(VerificationType::UninitializedThis);
        } else {
            locals.push(VerificationType::Object(owner.to_string()));
        }
    }
    locals.extend(descriptor.parameters.iter().map(verification_type));
    Ok(locals)
}

/// Replays `frames` starting from `initial`.
pub fn expand(initial: &[VerificationType], frames: &[StackMapFrame]) -> Result<Vec<Frame>> {
    let mut locals = initial.to_vec();
    let mut expanded = Vec::with_capacity(frames.len());

    for frame in frames {
        let stack = match frame {
            StackMapFrame::Same { .. } => Vec::new(),
            StackMapFrame::SameLocals1StackItem { stack, .. } => vec![stack.clone()],
            StackMapFrame::Chop { count, .. } => {
                let count = *count as usize;
                if count > locals.len() {
                    bail!("frame chops {count} of {} locals", locals.len());
                }
                locals.truncate(locals.len() - count);
                Vec::new()
            }
            StackMapFrame::Append { locals: added, .. } => {
                locals.extend(added.iter().cloned());
                Vec::new()
            }
            StackMapFrame::Full {
                locals: full,
                stack,
                ..
            } => {
                locals = full.clone();
                stack.clone()
            }
        };

        expanded.push(Frame {
            target: frame.target(),
            locals: locals.clone(),
            stack,
        });
    }

    Ok(expanded)
}

/// Picks the smallest encoding for each frame relative to its predecessor.
pub fn compress(initial: &[VerificationType], frames: &[Frame]) -> Vec<StackMapFrame> {
    let mut previous = initial;
    let mut compressed = Vec::with_capacity(frames.len());

    for frame in frames {
        let target = frame.target;
        let locals = frame.locals.as_slice();

        let delta = locals.len() as isize - previous.len() as isize;
        let compact = if locals == previous && frame.stack.is_empty() {
            StackMapFrame::Same { target }
        } else if locals == previous && frame.stack.len() == 1 {
            StackMapFrame::SameLocals1StackItem {
                target,
                stack: frame.stack[0].clone(),
            }
        } else if frame.stack.is_empty() && (-3..0).contains(&delta) && previous.starts_with(locals) {
            StackMapFrame::Chop {
                target,
                count: (-delta) as u8,
            }
        } else if frame.stack.is_empty() && (1..=3).contains(&delta) && locals.starts_with(previous) {
            StackMapFrame::Append {
                target,
                locals: locals[previous.len()..].to_vec(),
            }
        } else {
            StackMapFrame::Full {
                target,
                locals: locals.to_vec(),
                stack: frame.stack.clone(),
            }
        };

        compressed.push(compact);
        previous = locals;
    }

    compressed
}
