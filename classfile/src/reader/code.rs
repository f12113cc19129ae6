use tracing::trace;

use crate::{
    class::{
        attribute,
        constant_pool::CpInfo,
        frame::{Frames, StackMapFrame, VerificationType},
        instruction::{Instruction, Label},
        method::{Code, ExceptionHandler, LineNumber, LocalVariable, MethodRecord},
    },
    error::{Result, bail},
    frame,
    opcodes::*,
    reader::{Context, annotation, each_attribute, raw, skip_rest},
    util::Cursor,
};

/// Maps bytecode offsets of one method body to instruction labels.
pub(crate) struct LabelMap {
    /// One slot per offset plus one for the end of the code.
    labels: Vec<Option<Label>>,
}

impl LabelMap {
    fn new(offsets: &[u32], code_length: usize) -> Self {
        let mut labels = vec![None; code_length + 1];
        for (index, offset) in offsets.iter().enumerate() {
            labels[*offset as usize] = Some(Label::from(index));
        }
        labels[code_length] = Some(Label::from(offsets.len()));
        Self { labels }
    }

    fn get(&self, offset: usize) -> Option<Label> {
        self.labels.get(offset).copied().flatten()
    }

    /// The instruction starting at `offset`, or the end of the code.
    pub fn label(&self, offset: usize) -> Result<Label> {
        match self.get(offset) {
            Some(label) => Ok(label),
            None => bail!("offset {offset} is not an instruction boundary"),
        }
    }

    /// The instruction starting at `offset`; the end of the code is refused.
    fn instruction(&self, offset: usize) -> Result<Label> {
        if offset + 1 >= self.labels.len() {
            bail!("offset {offset} is past the last instruction");
        }
        self.label(offset)
    }
}

pub fn code(r: &mut Cursor, cx: &Context, owner: &str, method: &MethodRecord) -> Result<Code> {
    let max_stack = r.u2()?;
    let max_locals = r.u2()?;

    let code_length = r.u4()? as usize;
    if code_length > u16::MAX as usize {
        bail!("code of {}{} is {code_length} bytes long", method.name, method.descriptor);
    }

    let bytecode = r.bytes(code_length)?;
    let (mut instructions, offsets) = instructions(bytecode, cx)?;
    let labels = LabelMap::new(&offsets, code_length);

    // targets were decoded as absolute offsets
    for instruction in &mut instructions {
        for target in instruction.targets_mut() {
            *target = labels.instruction(target.index())?;
        }
    }

    let exception_table_length = r.u2()?;
    let mut exception_table = Vec::with_capacity(exception_table_length.into());
    for _ in 0..exception_table_length {
        let start = labels.instruction(r.u2()?.into())?;
        let end = labels.label(r.u2()?.into())?;
        let handler = labels.instruction(r.u2()?.into())?;
        let catch_type = cx.cp.optional_class_name(r.u2()?.into())?.map(str::to_string);
        if start >= end {
            bail!("empty exception handler range in {}{}", method.name, method.descriptor);
        }
        exception_table.push(ExceptionHandler {
            start,
            end,
            handler,
            catch_type,
        });
    }

    let mut code = Code {
        max_stack,
        max_locals,
        instructions,
        exception_table,
        ..Code::default()
    };

    each_attribute(r, &cx.cp, |name, sub| {
        match name {
            attribute::LINE_NUMBER_TABLE
            | attribute::LOCAL_VARIABLE_TABLE
            | attribute::LOCAL_VARIABLE_TYPE_TABLE
                if cx.options.skip_debug =>
            {
                skip_rest(sub)?
            }
            attribute::STACK_MAP_TABLE if cx.options.skip_frames => skip_rest(sub)?,
            attribute::LINE_NUMBER_TABLE => {
                let line_numbers = code.line_numbers.get_or_insert_with(Vec::new);
                let count = sub.u2()?;
                for _ in 0..count {
                    let start_pc = sub.u2()? as usize;
                    let line = sub.u2()?;
                    if let Some(start) = labels.get(start_pc) {
                        line_numbers.push(LineNumber { start, line });
                    }
                }
            }
            attribute::LOCAL_VARIABLE_TABLE => {
                let local_variables = code.local_variables.get_or_insert_with(Vec::new);
                local_variables.extend(local_variables_table(sub, cx, &labels)?);
            }
            attribute::LOCAL_VARIABLE_TYPE_TABLE => {
                let local_variable_types = code.local_variable_types.get_or_insert_with(Vec::new);
                local_variable_types.extend(local_variables_table(sub, cx, &labels)?);
            }
            attribute::STACK_MAP_TABLE => {
                let frames = stack_map_table(sub, cx, &labels)?;
                code.frames = Some(if cx.options.expand_frames {
                    let initial = frame::initial_locals(
                        owner,
                        method.access,
                        &method.name,
                        &method.descriptor,
                    )?;
                    Frames::Expanded(frame::expand(&initial, &frames)?)
                } else {
                    Frames::Compressed(frames)
                });
            }
            attribute::RUNTIME_VISIBLE_TYPE_ANNOTATIONS => {
                code.visible_type_annotations =
                    Some(annotation::type_annotations(sub, cx, Some(&labels))?)
            }
            attribute::RUNTIME_INVISIBLE_TYPE_ANNOTATIONS => {
                code.invisible_type_annotations =
                    Some(annotation::type_annotations(sub, cx, Some(&labels))?)
            }
            _ => code.attributes.push(raw(name, sub)?),
        }
        Ok(())
    })?;

    trace!(
        "decoded {} instructions of {}{}",
        code.instructions.len(),
        method.name,
        method.descriptor
    );
    Ok(code)
}

/// Entries whose range does not line up with instructions are dropped.
fn local_variables_table(r: &mut Cursor, cx: &Context, labels: &LabelMap) -> Result<Vec<LocalVariable>> {
    let count = r.u2()?;
    let mut local_variables = Vec::with_capacity(count.into());
    for _ in 0..count {
        let start_pc = r.u2()? as usize;
        let length = r.u2()? as usize;
        let name = cx.cp.utf8(r.u2()?.into())?;
        let descriptor = cx.cp.utf8(r.u2()?.into())?;
        let index = r.u2()?;

        let (Some(start), Some(end)) = (labels.get(start_pc), labels.get(start_pc + length)) else {
            continue;
        };
        local_variables.push(LocalVariable {
            start,
            end,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            index,
        });
    }
    Ok(local_variables)
}

fn stack_map_table(r: &mut Cursor, cx: &Context, labels: &LabelMap) -> Result<Vec<StackMapFrame>> {
    let count = r.u2()?;
    let mut frames = Vec::with_capacity(count.into());
    let mut offset: Option<usize> = None;

    for _ in 0..count {
        let frame_type = r.u1()?;

        let delta = match frame_type {
            0..=63 => frame_type as usize,
            64..=127 => (frame_type - 64) as usize,
            128..=246 => bail!("reserved stack map frame type {frame_type}"),
            _ => r.u2()? as usize,
        };
        let next = match offset {
            None => delta,
            Some(previous) => previous + delta + 1,
        };
        offset = Some(next);
        let target = labels.instruction(next)?;

        frames.push(match frame_type {
            0..=63 | 251 => StackMapFrame::Same { target },
            64..=127 | 247 => StackMapFrame::SameLocals1StackItem {
                target,
                stack: verification_type(r, cx, labels)?,
            },
            248..=250 => StackMapFrame::Chop {
                target,
                count: 251 - frame_type,
            },
            252..=254 => {
                let mut locals = Vec::with_capacity((frame_type - 251).into());
                for _ in 251..frame_type {
                    locals.push(verification_type(r, cx, labels)?);
                }
                StackMapFrame::Append { target, locals }
            }
            _ => {
                let locals = verification_types(r, cx, labels)?;
                let stack = verification_types(r, cx, labels)?;
                StackMapFrame::Full {
                    target,
                    locals,
                    stack,
                }
            }
        });
    }

    Ok(frames)
}

fn verification_types(r: &mut Cursor, cx: &Context, labels: &LabelMap) -> Result<Vec<VerificationType>> {
    let count = r.u2()?;
    let mut types = Vec::with_capacity(count.into());
    for _ in 0..count {
        types.push(verification_type(r, cx, labels)?);
    }
    Ok(types)
}

fn verification_type(r: &mut Cursor, cx: &Context, labels: &LabelMap) -> Result<VerificationType> {
    let tag = r.u1()?;
    Ok(match tag {
        0 => VerificationType::Top,
        1 => VerificationType::Integer,
        2 => VerificationType::Float,
        3 => VerificationType::Double,
        4 => VerificationType::Long,
        5 => VerificationType::Null,
        6 => VerificationType::UninitializedThis,
        7 => VerificationType::Object(cx.cp.class_name(r.u2()?.into())?.to_string()),
        8 => VerificationType::Uninitialized(labels.instruction(r.u2()?.into())?),
        _ => bail!("invalid verification type tag {tag}"),
    })
}

/// Decodes the bytecode into instructions whose branch targets still hold
/// absolute offsets, together with the offset of each instruction.
fn instructions(bytecode: &[u8], cx: &Context) -> Result<(Vec<Instruction>, Vec<u32>)> {
    let mut r = Cursor::new(bytecode);
    let mut instructions = Vec::new();
    let mut offsets = Vec::new();

    while !r.is_empty() {
        let offset = r.position();
        offsets.push(offset as u32);
        instructions.push(instruction(&mut r, cx, offset)?);
    }

    Ok((instructions, offsets))
}

fn branch(offset: usize, relative: i32) -> Result<Label> {
    let target = offset as i64 + relative as i64;
    if !(0..=u16::MAX as i64).contains(&target) {
        bail!("branch at offset {offset} jumps to {target}");
    }
    Ok(Label(target as u32))
}

fn instruction(r: &mut Cursor, cx: &Context, offset: usize) -> Result<Instruction> {
    let opcode = r.u1()?;

    Ok(match opcode {
        NOP..=DCONST_1
        | IALOAD..=SALOAD
        | IASTORE..=LXOR
        | I2L..=DCMPG
        | IRETURN..=RETURN
        | ARRAYLENGTH
        | ATHROW
        | MONITORENTER
        | MONITOREXIT => Instruction::Simple(opcode),
        BIPUSH => Instruction::IntPush {
            opcode,
            value: r.i1()?.into(),
        },
        SIPUSH => Instruction::IntPush {
            opcode,
            value: r.i2()?,
        },
        LDC | LDC_W | LDC2_W => {
            let index = if opcode == LDC { r.u1()?.into() } else { r.u2()? };
            let constant = cx.constant(index.into())?;
            if constant.is_wide() != (opcode == LDC2_W) {
                bail!("{} at offset {offset} loads constant #{index} of the wrong size", opcode_name(opcode));
            }
            Instruction::Ldc(constant)
        }
        ILOAD..=ALOAD | ISTORE..=ASTORE | RET => Instruction::Var {
            opcode,
            index: r.u1()?.into(),
        },
        ILOAD_0..=ALOAD_3 => Instruction::Var {
            opcode: ILOAD + (opcode - ILOAD_0) / 4,
            index: ((opcode - ILOAD_0) % 4).into(),
        },
        ISTORE_0..=ASTORE_3 => Instruction::Var {
            opcode: ISTORE + (opcode - ISTORE_0) / 4,
            index: ((opcode - ISTORE_0) % 4).into(),
        },
        IINC => Instruction::Iinc {
            index: r.u1()?.into(),
            increment: r.i1()?.into(),
        },
        IFEQ..=JSR | IFNULL | IFNONNULL => Instruction::Jump {
            opcode,
            target: branch(offset, r.i2()?.into())?,
        },
        GOTO_W | JSR_W => Instruction::Jump {
            opcode,
            target: branch(offset, r.i4()?)?,
        },
        TABLESWITCH | LOOKUPSWITCH => {
            // operands are 4-byte aligned relative to the start of the code
            let padding = (4 - (offset + 1) % 4) % 4;
            r.skip(padding)?;
            let default = branch(offset, r.i4()?)?;

            if opcode == TABLESWITCH {
                let low = r.i4()?;
                let high = r.i4()?;
                if low > high {
                    bail!("tableswitch at offset {offset} has low {low} above high {high}");
                }
                let count = (high as i64 - low as i64 + 1) as usize;
                if count.saturating_mul(4) > r.remaining() {
                    bail!("tableswitch at offset {offset} has {count} targets");
                }
                let mut targets = Vec::with_capacity(count);
                for _ in 0..count {
                    targets.push(branch(offset, r.i4()?)?);
                }
                Instruction::TableSwitch {
                    default,
                    low,
                    high,
                    targets,
                }
            } else {
                let count = r.i4()?;
                if count < 0 || (count as usize).saturating_mul(8) > r.remaining() {
                    bail!("lookupswitch at offset {offset} has {count} pairs");
                }
                let mut pairs = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    let key = r.i4()?;
                    pairs.push((key, branch(offset, r.i4()?)?));
                }
                Instruction::LookupSwitch { default, pairs }
            }
        }
        GETSTATIC..=PUTFIELD => {
            let index = r.u2()?.into();
            let member = cx.cp.member_ref(index)?;
            if !member.field {
                bail!("{} at offset {offset} does not reference a field", opcode_name(opcode));
            }
            Instruction::Field {
                opcode,
                owner: member.owner.to_string(),
                name: member.name.to_string(),
                descriptor: member.descriptor.to_string(),
            }
        }
        INVOKEVIRTUAL..=INVOKEINTERFACE => {
            let index = r.u2()?.into();
            if opcode == INVOKEINTERFACE {
                // count and a zero byte, both derived from the descriptor
                r.skip(2)?;
            }
            let member = cx.cp.member_ref(index)?;
            if member.field {
                bail!("{} at offset {offset} references a field", opcode_name(opcode));
            }
            Instruction::Method {
                opcode,
                owner: member.owner.to_string(),
                name: member.name.to_string(),
                descriptor: member.descriptor.to_string(),
                interface: member.interface,
            }
        }
        INVOKEDYNAMIC => {
            let index = r.u2()?.into();
            r.skip(2)?;
            let CpInfo::InvokeDynamic {
                bootstrap_method_attr_index,
                name_and_type_index,
            } = cx.cp.get(index)?
            else {
                bail!("invokedynamic at offset {offset} does not reference InvokeDynamic");
            };
            let (name, descriptor) = cx.cp.name_and_type(*name_and_type_index)?;
            Instruction::InvokeDynamic {
                name: name.to_string(),
                descriptor: descriptor.to_string(),
                bootstrap: cx.bootstrap_method(*bootstrap_method_attr_index, 0)?,
            }
        }
        NEW | ANEWARRAY | CHECKCAST | INSTANCEOF => Instruction::Type {
            opcode,
            class: cx.cp.class_name(r.u2()?.into())?.to_string(),
        },
        NEWARRAY => {
            let atype = r.u1()?;
            if !(T_BOOLEAN..=T_LONG).contains(&atype) {
                bail!("newarray at offset {offset} has invalid type {atype}");
            }
            Instruction::NewArray(atype)
        }
        MULTIANEWARRAY => {
            let class = cx.cp.class_name(r.u2()?.into())?.to_string();
            let dimensions = r.u1()?;
            if dimensions == 0 {
                bail!("multianewarray at offset {offset} has no dimensions");
            }
            Instruction::MultiANewArray { class, dimensions }
        }
        WIDE => {
            let opcode = r.u1()?;
            match opcode {
                ILOAD..=ALOAD | ISTORE..=ASTORE | RET => Instruction::Var {
                    opcode,
                    index: r.u2()?,
                },
                IINC => Instruction::Iinc {
                    index: r.u2()?,
                    increment: r.i2()?,
                },
                _ => bail!("wide at offset {offset} modifies opcode 0x{opcode:x}"),
            }
        }
        _ => bail!("invalid opcode 0x{opcode:x} at offset {offset}"),
    })
}

fn opcode_name(opcode: u8) -> &'static str {
    name(opcode).unwrap_or("?")
}
