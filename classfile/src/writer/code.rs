use std::borrow::Cow;

use tracing::{trace, warn};

use crate::{
    ClassFileError, analysis,
    class::{
        attribute,
        descriptor::MethodDescriptor,
        frame::{Frames, StackMapFrame, VerificationType},
        instruction::{Instruction, Label},
        method::{Code, LocalVariable, MethodRecord},
    },
    error::{Result, invalid},
    frame,
    opcodes::*,
    util::Out,
    writer::{Attributes, Writer, annotation::offset, count},
};

/// Longest method body the `u2` offsets of a class file can address.
const MAX_CODE_LENGTH: usize = u16::MAX as usize;

impl Writer<'_> {
    /// Builds the `Code` attribute of `method`.
    pub(super) fn code(&mut self, method: &MethodRecord, code: &Code) -> Result<Vec<u8>> {
        check_labels(code).map_err(|err| in_method(err, method))?;

        let compute_frames = self.options.compute_frames && self.major_version >= 50;
        let analyzed = if self.options.compute_maxs || self.options.compute_frames {
            // dead code is rewritten in place, the record stays untouched
            let mut analyzed = code.clone();
            match analysis::analyze(self.owner, method, &mut analyzed, self.hierarchy, compute_frames) {
                Ok(analysis) => Some((analyzed, analysis)),
                Err(err) => {
                    warn!(
                        "keeping declared sizes and frames of {}.{}{}: {err}",
                        self.owner, method.name, method.descriptor
                    );
                    None
                }
            }
        } else {
            None
        };

        let (code, max_stack, max_locals, computed) = match analyzed {
            Some((analyzed, analysis)) => (
                Cow::Owned(analyzed),
                analysis.max_stack,
                analysis.max_locals,
                Some(analysis.frames),
            ),
            None => (Cow::Borrowed(code), code.max_stack, code.max_locals, None),
        };

        let frames = match computed {
            Some(Some(frames)) if frames.is_empty() => None,
            Some(Some(frames)) => Some(frame::compress(&self.initial_locals(method)?, &frames)),
            // frames are not written below Java 6 even when asked for
            Some(None) if self.options.compute_frames => None,
            Some(None) | None => match &code.frames {
                None => None,
                Some(Frames::Compressed(frames)) => Some(frames.clone()),
                Some(Frames::Expanded(frames)) => {
                    Some(frame::compress(&self.initial_locals(method)?, frames))
                }
            },
        };

        let (bytecode, offsets) = self
            .bytecode(&code.instructions)
            .map_err(|err| in_method(err, method))?;

        let mut info = Vec::with_capacity(bytecode.len() + 32);
        info.u2(max_stack);
        info.u2(max_locals);
        info.u4(bytecode.len() as u32);
        info.extend_from_slice(&bytecode);

        info.u2(count(code.exception_table.len(), "exception handlers")?);
        for handler in &code.exception_table {
            info.u2(offset(&offsets, handler.start)?);
            info.u2(offset(&offsets, handler.end)?);
            info.u2(offset(&offsets, handler.handler)?);
            info.u2(self.optional_class(handler.catch_type.as_deref())?);
        }

        let mut attributes = Attributes::default();
        if let Some(line_numbers) = &code.line_numbers {
            let mut table = Vec::with_capacity(2 + 4 * line_numbers.len());
            table.u2(count(line_numbers.len(), "line numbers")?);
            for line_number in line_numbers {
                table.u2(offset(&offsets, line_number.start)?);
                table.u2(line_number.line);
            }
            attributes.push(&mut self.cp, attribute::LINE_NUMBER_TABLE, &table)?;
        }
        if let Some(local_variables) = &code.local_variables {
            let table = self.local_variables(local_variables, &offsets)?;
            attributes.push(&mut self.cp, attribute::LOCAL_VARIABLE_TABLE, &table)?;
        }
        if let Some(local_variable_types) = &code.local_variable_types {
            let table = self.local_variables(local_variable_types, &offsets)?;
            attributes.push(&mut self.cp, attribute::LOCAL_VARIABLE_TYPE_TABLE, &table)?;
        }
        if let Some(frames) = &frames {
            let table = self
                .stack_map_table(frames, &offsets)
                .map_err(|err| in_method(err, method))?;
            attributes.push(&mut self.cp, attribute::STACK_MAP_TABLE, &table)?;
        }
        self.type_annotation_attributes(
            &mut attributes,
            code.visible_type_annotations.as_deref(),
            code.invisible_type_annotations.as_deref(),
            Some(&offsets),
        )?;
        for raw in &code.attributes {
            attributes.push(&mut self.cp, &raw.name, &raw.info)?;
        }
        attributes.write(&mut info)?;

        trace!(
            "encoded {} instructions of {}{} into {} bytes",
            code.instructions.len(),
            method.name,
            method.descriptor,
            bytecode.len()
        );
        Ok(info)
    }

    fn initial_locals(&self, method: &MethodRecord) -> Result<Vec<VerificationType>> {
        frame::initial_locals(self.owner, method.access, &method.name, &method.descriptor)
            .map_err(ClassFileError::into_invalid_record)
    }

    /// Lays out `instructions`, returning the bytecode and the offset of
    /// every label, the end of the code included.
    fn bytecode(&mut self, instructions: &[Instruction]) -> Result<(Vec<u8>, Vec<u32>)> {
        // pool entries first, their index decides the width of `ldc`
        let mut operands = Vec::with_capacity(instructions.len());
        for instruction in instructions {
            operands.push(self.operand(instruction)?);
        }

        let mut offsets = Vec::with_capacity(instructions.len() + 1);
        let mut length = 0;
        for (instruction, operand) in instructions.iter().zip(&operands) {
            offsets.push(length as u32);
            length += size(instruction, *operand, length);
            if length > MAX_CODE_LENGTH {
                invalid!("code is longer than {MAX_CODE_LENGTH} bytes");
            }
        }
        offsets.push(length as u32);

        let mut out = Vec::with_capacity(length);
        for (index, (instruction, operand)) in instructions.iter().zip(&operands).enumerate() {
            emit(&mut out, instruction, *operand, index, &offsets)
                .map_err(|err| at_instruction(err, index))?;
        }
        debug_assert_eq!(out.len(), length);

        Ok((out, offsets))
    }

    /// The constant pool entry an instruction refers to, 0 if none.
    fn operand(&mut self, instruction: &Instruction) -> Result<u16> {
        Ok(match instruction {
            Instruction::Ldc(constant) => self.constant(constant)?.0,
            Instruction::Field {
                owner,
                name,
                descriptor,
                ..
            } => self.cp.field_ref(owner, name, descriptor)?.0,
            Instruction::Method {
                owner,
                name,
                descriptor,
                interface,
                ..
            } => self.cp.method_ref(owner, name, descriptor, *interface)?.0,
            Instruction::InvokeDynamic {
                name,
                descriptor,
                bootstrap,
            } => {
                let bootstrap = self.bootstrap_method(bootstrap)?;
                self.cp.invoke_dynamic(bootstrap, name, descriptor)?.0
            }
            Instruction::Type { class, .. } | Instruction::MultiANewArray { class, .. } => {
                self.cp.class(class)?.0
            }
            _ => 0,
        })
    }

    fn local_variables(&mut self, variables: &[LocalVariable], offsets: &[u32]) -> Result<Vec<u8>> {
        let mut table = Vec::with_capacity(2 + 10 * variables.len());
        table.u2(count(variables.len(), "local variables")?);
        for variable in variables {
            let start = offset(offsets, variable.start)?;
            let end = offset(offsets, variable.end)?;
            if end < start {
                invalid!("local variable {} ends before it starts", variable.name);
            }
            table.u2(start);
            table.u2(end - start);
            table.u2(self.cp.utf8(&variable.name)?.0);
            table.u2(self.cp.utf8(&variable.descriptor)?.0);
            table.u2(variable.index);
        }
        Ok(table)
    }

    fn stack_map_table(&mut self, frames: &[StackMapFrame], offsets: &[u32]) -> Result<Vec<u8>> {
        let end = offsets.len() - 1;
        let mut table = Vec::new();
        table.u2(count(frames.len(), "stack map frames")?);

        let mut previous: Option<u32> = None;
        for frame in frames {
            let target = frame.target();
            if target.index() >= end {
                invalid!("stack map frame at label {} is past the last instruction", target.0);
            }
            let offset = offsets[target.index()];
            let delta = match previous {
                None => offset,
                Some(previous) if offset > previous => offset - previous - 1,
                Some(_) => invalid!("stack map frames are not in increasing offset order"),
            };
            previous = Some(offset);
            let delta = delta as u16;

            match frame {
                StackMapFrame::Same { .. } if delta < 64 => table.u1(delta as u8),
                StackMapFrame::Same { .. } => {
                    table.u1(251);
                    table.u2(delta);
                }
                StackMapFrame::SameLocals1StackItem { stack, .. } => {
                    if delta < 64 {
                        table.u1(64 + delta as u8);
                    } else {
                        table.u1(247);
                        table.u2(delta);
                    }
                    self.verification_type(&mut table, stack, offsets)?;
                }
                StackMapFrame::Chop { count, .. } => {
                    if !(1..=3).contains(count) {
                        invalid!("chop frame removing {count} locals");
                    }
                    table.u1(251 - count);
                    table.u2(delta);
                }
                StackMapFrame::Append { locals, .. } => {
                    if !(1..=3).contains(&locals.len()) {
                        invalid!("append frame adding {} locals", locals.len());
                    }
                    table.u1(251 + locals.len() as u8);
                    table.u2(delta);
                    for local in locals {
                        self.verification_type(&mut table, local, offsets)?;
                    }
                }
                StackMapFrame::Full { locals, stack, .. } => {
                    table.u1(255);
                    table.u2(delta);
                    table.u2(count(locals.len(), "frame locals")?);
                    for local in locals {
                        self.verification_type(&mut table, local, offsets)?;
                    }
                    table.u2(count(stack.len(), "frame stack entries")?);
                    for entry in stack {
                        self.verification_type(&mut table, entry, offsets)?;
                    }
                }
            }
        }

        Ok(table)
    }

    fn verification_type(
        &mut self,
        out: &mut Vec<u8>,
        value: &VerificationType,
        offsets: &[u32],
    ) -> Result<()> {
        match value {
            VerificationType::Top => out.u1(0),
            VerificationType::Integer => out.u1(1),
            VerificationType::Float => out.u1(2),
            VerificationType::Double => out.u1(3),
            VerificationType::Long => out.u1(4),
            VerificationType::Null => out.u1(5),
            VerificationType::UninitializedThis => out.u1(6),
            VerificationType::Object(class) => {
                out.u1(7);
                out.u2(self.cp.class(class)?.0);
            }
            VerificationType::Uninitialized(label) => {
                if label.index() + 1 >= offsets.len() {
                    invalid!("uninitialized value created past the last instruction");
                }
                out.u1(8);
                out.u2(offset(offsets, *label)?);
            }
        }
        Ok(())
    }
}

fn in_method(err: ClassFileError, method: &MethodRecord) -> ClassFileError {
    match err {
        ClassFileError::InvalidRecord(message) => {
            ClassFileError::InvalidRecord(format!("{}{}: {message}", method.name, method.descriptor))
        }
        other => other,
    }
}

fn at_instruction(err: ClassFileError, index: usize) -> ClassFileError {
    match err {
        ClassFileError::InvalidRecord(message) => {
            ClassFileError::InvalidRecord(format!("instruction {index}: {message}"))
        }
        other => other,
    }
}

/// Branch targets and exception ranges must stay inside the body.
fn check_labels(code: &Code) -> Result<()> {
    let end = code.end();
    for (index, instruction) in code.instructions.iter().enumerate() {
        if let Some(target) = instruction.targets().into_iter().find(|target| *target >= end) {
            invalid!("instruction {index} jumps to label {} past the last instruction", target.0);
        }
    }
    for handler in &code.exception_table {
        if handler.start >= handler.end || handler.end > end || handler.handler >= end {
            invalid!(
                "exception handler covering labels {}..{} with handler {} does not fit {} instructions",
                handler.start.0,
                handler.end.0,
                handler.handler.0,
                end.0
            );
        }
    }
    Ok(())
}

/// Bytes of padding after a switch opcode at `offset`.
fn switch_padding(offset: usize) -> usize {
    3 - offset % 4
}

fn is_var_opcode(opcode: u8) -> bool {
    matches!(opcode, ILOAD..=ALOAD | ISTORE..=ASTORE | RET)
}

/// Encoded length of `instruction` when placed at `offset`.
fn size(instruction: &Instruction, operand: u16, offset: usize) -> usize {
    match instruction {
        Instruction::Simple(_) => 1,
        Instruction::IntPush { opcode: BIPUSH, .. } | Instruction::NewArray(_) => 2,
        Instruction::IntPush { .. } => 3,
        Instruction::Ldc(constant) if constant.is_wide() || operand > u8::MAX as u16 => 3,
        Instruction::Ldc(_) => 2,
        Instruction::Var { opcode: RET, index } if *index <= u8::MAX as u16 => 2,
        Instruction::Var { opcode: RET, .. } => 4,
        Instruction::Var { index, .. } if *index <= 3 => 1,
        Instruction::Var { index, .. } if *index <= u8::MAX as u16 => 2,
        Instruction::Var { .. } => 4,
        Instruction::Iinc { index, increment }
            if *index <= u8::MAX as u16 && i8::try_from(*increment).is_ok() =>
        {
            3
        }
        Instruction::Iinc { .. } => 6,
        Instruction::Jump {
            opcode: GOTO_W | JSR_W,
            ..
        } => 5,
        Instruction::Jump { .. } => 3,
        Instruction::TableSwitch { targets, .. } => 1 + switch_padding(offset) + 12 + 4 * targets.len(),
        Instruction::LookupSwitch { pairs, .. } => 1 + switch_padding(offset) + 8 + 8 * pairs.len(),
        Instruction::Method {
            opcode: INVOKEINTERFACE,
            ..
        }
        | Instruction::InvokeDynamic { .. } => 5,
        Instruction::Field { .. } | Instruction::Method { .. } | Instruction::Type { .. } => 3,
        Instruction::MultiANewArray { .. } => 4,
    }
}

fn branch(from: u32, to: u32) -> i64 {
    i64::from(to) - i64::from(from)
}

fn emit(out: &mut Vec<u8>, instruction: &Instruction, operand: u16, index: usize, offsets: &[u32]) -> Result<()> {
    let here = offsets[index];
    let target = |label: &Label| offsets[label.index()];

    match instruction {
        Instruction::Simple(opcode) => match *opcode {
            NOP..=DCONST_1
            | IALOAD..=SALOAD
            | IASTORE..=LXOR
            | I2L..=DCMPG
            | IRETURN..=RETURN
            | ARRAYLENGTH
            | ATHROW
            | MONITORENTER
            | MONITOREXIT => out.u1(*opcode),
            _ => invalid!("opcode 0x{opcode:x} takes operands"),
        },
        Instruction::IntPush { opcode: BIPUSH, value } => {
            let Ok(value) = i8::try_from(*value) else {
                invalid!("bipush of {value}");
            };
            out.u1(BIPUSH);
            out.u1(value as u8);
        }
        Instruction::IntPush { opcode: SIPUSH, value } => {
            out.u1(SIPUSH);
            out.u2(*value as u16);
        }
        Instruction::IntPush { opcode, .. } => invalid!("opcode 0x{opcode:x} does not push an int"),
        Instruction::Ldc(constant) => {
            if constant.is_wide() {
                out.u1(LDC2_W);
                out.u2(operand);
            } else if operand <= u8::MAX as u16 {
                out.u1(LDC);
                out.u1(operand as u8);
            } else {
                out.u1(LDC_W);
                out.u2(operand);
            }
        }
        Instruction::Var { opcode, index: slot } => {
            if !is_var_opcode(*opcode) {
                invalid!("opcode 0x{opcode:x} does not access a local variable");
            }
            if *opcode != RET && *slot <= 3 {
                let short = match *opcode {
                    ILOAD..=ALOAD => ILOAD_0 + (opcode - ILOAD) * 4,
                    _ => ISTORE_0 + (opcode - ISTORE) * 4,
                };
                out.u1(short + *slot as u8);
            } else if *slot <= u8::MAX as u16 {
                out.u1(*opcode);
                out.u1(*slot as u8);
            } else {
                out.u1(WIDE);
                out.u1(*opcode);
                out.u2(*slot);
            }
        }
        Instruction::Iinc {
            index: slot,
            increment,
        } => match i8::try_from(*increment) {
            Ok(small) if *slot <= u8::MAX as u16 => {
                out.u1(IINC);
                out.u1(*slot as u8);
                out.u1(small as u8);
            }
            _ => {
                out.u1(WIDE);
                out.u1(IINC);
                out.u2(*slot);
                out.u2(*increment as u16);
            }
        },
        Instruction::Jump { opcode, target: to } => {
            let relative = branch(here, target(to));
            match *opcode {
                GOTO_W | JSR_W => {
                    out.u1(*opcode);
                    out.i4(relative as i32);
                }
                IFEQ..=JSR | IFNULL | IFNONNULL => {
                    let Ok(relative) = i16::try_from(relative) else {
                        invalid!("branch of {relative} bytes does not fit a 16-bit offset");
                    };
                    out.u1(*opcode);
                    out.u2(relative as u16);
                }
                _ => invalid!("opcode 0x{opcode:x} is not a jump"),
            }
        }
        Instruction::TableSwitch {
            default,
            low,
            high,
            targets,
        } => {
            if high < low || i64::from(*high) - i64::from(*low) + 1 != targets.len() as i64 {
                invalid!("tableswitch {low}..={high} with {} targets", targets.len());
            }
            out.u1(TABLESWITCH);
            out.resize(out.len() + switch_padding(here as usize), 0);
            out.i4(branch(here, target(default)) as i32);
            out.i4(*low);
            out.i4(*high);
            for label in targets {
                out.i4(branch(here, target(label)) as i32);
            }
        }
        Instruction::LookupSwitch { default, pairs } => {
            let mut sorted = pairs.clone();
            sorted.sort_by_key(|(key, _)| *key);
            if sorted.windows(2).any(|pair| pair[0].0 == pair[1].0) {
                invalid!("lookupswitch with duplicate keys");
            }
            out.u1(LOOKUPSWITCH);
            out.resize(out.len() + switch_padding(here as usize), 0);
            out.i4(branch(here, target(default)) as i32);
            out.i4(sorted.len() as i32);
            for (key, label) in &sorted {
                out.i4(*key);
                out.i4(branch(here, target(label)) as i32);
            }
        }
        Instruction::Field { opcode, .. } => {
            if !(GETSTATIC..=PUTFIELD).contains(opcode) {
                invalid!("opcode 0x{opcode:x} does not access a field");
            }
            out.u1(*opcode);
            out.u2(operand);
        }
        Instruction::Method {
            opcode, descriptor, ..
        } => match *opcode {
            INVOKEINTERFACE => {
                let descriptor =
                    MethodDescriptor::new(descriptor).map_err(ClassFileError::into_invalid_record)?;
                let Ok(arguments) = u8::try_from(1 + descriptor.parameter_slots()) else {
                    invalid!("invokeinterface with {} argument slots", descriptor.parameter_slots());
                };
                out.u1(INVOKEINTERFACE);
                out.u2(operand);
                out.u1(arguments);
                out.u1(0);
            }
            INVOKEVIRTUAL..=INVOKESTATIC => {
                out.u1(*opcode);
                out.u2(operand);
            }
            _ => invalid!("opcode 0x{opcode:x} does not invoke a method"),
        },
        Instruction::InvokeDynamic { .. } => {
            out.u1(INVOKEDYNAMIC);
            out.u2(operand);
            out.u2(0);
        }
        Instruction::Type { opcode, .. } => {
            if !matches!(*opcode, NEW | ANEWARRAY | CHECKCAST | INSTANCEOF) {
                invalid!("opcode 0x{opcode:x} does not take a class");
            }
            out.u1(*opcode);
            out.u2(operand);
        }
        Instruction::NewArray(atype) => {
            if !(T_BOOLEAN..=T_LONG).contains(atype) {
                invalid!("newarray of type {atype}");
            }
            out.u1(NEWARRAY);
            out.u1(*atype);
        }
        Instruction::MultiANewArray { dimensions, .. } => {
            if *dimensions == 0 {
                invalid!("multianewarray without dimensions");
            }
            out.u1(MULTIANEWARRAY);
            out.u2(operand);
            out.u1(*dimensions);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::{
        ClassFileError,
        class::{
            ClassRecord,
            access_flags::AccessFlags,
            constant::Constant,
            frame::{Frame, Frames, StackMapFrame, VerificationType},
            instruction::{Instruction, Label},
            method::{Code, ExceptionHandler, LineNumber, LocalVariable, MethodRecord},
        },
        opcodes::*,
        reader::{DecodeOptions, decode},
        writer::{EncodeOptions, encode},
    };

    fn class_with(access: AccessFlags, descriptor: &str, code: Code) -> ClassRecord {
        let mut class = ClassRecord::new("a/B");
        let mut method = MethodRecord::new(access, "m", descriptor);
        method.code = Some(code);
        class.methods.push(method);
        class
    }

    fn roundtrip(class: &ClassRecord, options: EncodeOptions) -> Code {
        let bytes = encode(class, options).unwrap();
        decode(&bytes, DecodeOptions::default()).unwrap().methods[0]
            .code
            .clone()
            .unwrap()
    }

    #[test]
    fn short_and_wide_forms_are_chosen() {
        let code = Code::new(vec![
            Instruction::Var {
                opcode: ALOAD,
                index: 0,
            },
            Instruction::Var {
                opcode: ISTORE,
                index: 200,
            },
            Instruction::Var {
                opcode: LLOAD,
                index: 300,
            },
            Instruction::Iinc {
                index: 1,
                increment: 1000,
            },
            Instruction::Simple(RETURN),
        ]);
        let class = class_with(AccessFlags::STATIC, "()V", code.clone());
        let bytes = encode(&class, EncodeOptions::none()).unwrap();

        // aload_0; istore 200; wide lload 300; wide iinc 1 1000; return
        let expected = [
            ALOAD_0, ISTORE, 200, WIDE, LLOAD, 0x01, 0x2c, WIDE, IINC, 0x00, 0x01, 0x03, 0xe8, RETURN,
        ];
        assert!(bytes.windows(expected.len()).any(|window| window == expected));

        assert_eq!(roundtrip(&class, EncodeOptions::none()).instructions, code.instructions);
    }

    #[test]
    fn ldc_width_follows_pool_index() {
        let mut instructions = Vec::new();
        for value in 0..300 {
            instructions.push(Instruction::Ldc(Constant::Integer(100_000 + value)));
            instructions.push(Instruction::Simple(POP));
        }
        instructions.push(Instruction::Ldc(Constant::Long(5)));
        instructions.push(Instruction::Simple(POP2));
        instructions.push(Instruction::Simple(RETURN));

        let class = class_with(AccessFlags::STATIC, "()V", Code::new(instructions.clone()));
        let code = roundtrip(&class, EncodeOptions::maxs());
        assert_eq!(code.instructions, instructions);
        assert_eq!(code.max_stack, 2);
    }

    #[test]
    fn switch_tables_are_laid_out() {
        let instructions = vec![
            Instruction::Var {
                opcode: ILOAD,
                index: 0,
            },
            Instruction::LookupSwitch {
                default: Label(4),
                pairs: vec![(10, Label(2)), (-3, Label(3))],
            },
            Instruction::Simple(ICONST_1),
            Instruction::Simple(ICONST_2),
            Instruction::Simple(RETURN),
        ];
        let class = class_with(AccessFlags::STATIC, "(I)V", Code::new(instructions));
        let code = roundtrip(&class, EncodeOptions::none());

        // keys come back sorted
        assert_eq!(
            code.instructions[1],
            Instruction::LookupSwitch {
                default: Label(4),
                pairs: vec![(-3, Label(3)), (10, Label(2))],
            }
        );
    }

    #[test]
    fn duplicate_lookupswitch_keys_are_refused() {
        let instructions = vec![
            Instruction::Simple(ICONST_0),
            Instruction::LookupSwitch {
                default: Label(2),
                pairs: vec![(1, Label(2)), (1, Label(2))],
            },
            Instruction::Simple(RETURN),
        ];
        let class = class_with(AccessFlags::STATIC, "()V", Code::new(instructions));
        assert!(matches!(
            encode(&class, EncodeOptions::none()),
            Err(ClassFileError::InvalidRecord(_))
        ));
    }

    #[test]
    fn labels_outside_the_body_are_refused() {
        let jump = Code::new(vec![Instruction::Jump {
            opcode: GOTO,
            target: Label(5),
        }]);
        let class = class_with(AccessFlags::STATIC, "()V", jump);
        assert!(matches!(
            encode(&class, EncodeOptions::none()),
            Err(ClassFileError::InvalidRecord(_))
        ));

        let mut handler = Code::new(vec![Instruction::Simple(RETURN)]);
        handler.exception_table.push(ExceptionHandler {
            start: Label(0),
            end: Label(0),
            handler: Label(0),
            catch_type: None,
        });
        let class = class_with(AccessFlags::STATIC, "()V", handler);
        assert!(encode(&class, EncodeOptions::none()).is_err());
    }

    #[test]
    fn short_branch_overflow_is_refused() {
        // goto over 40000 nops and back
        let mut instructions = vec![Instruction::Jump {
            opcode: GOTO,
            target: Label(40_001),
        }];
        instructions.extend(std::iter::repeat(Instruction::Simple(NOP)).take(40_000));
        instructions.push(Instruction::Jump {
            opcode: GOTO,
            target: Label(0),
        });
        let class = class_with(AccessFlags::STATIC, "()V", Code::new(instructions));
        assert!(matches!(
            encode(&class, EncodeOptions::none()),
            Err(ClassFileError::InvalidRecord(_))
        ));
    }

    #[test]
    fn debug_tables_survive() {
        let mut code = Code::new(vec![
            Instruction::Simple(ICONST_0),
            Instruction::Var {
                opcode: ISTORE,
                index: 0,
            },
            Instruction::Simple(RETURN),
        ]);
        code.max_stack = 1;
        code.max_locals = 1;
        code.line_numbers = Some(vec![
            LineNumber {
                start: Label(0),
                line: 3,
            },
            LineNumber {
                start: Label(2),
                line: 4,
            },
        ]);
        code.local_variables = Some(vec![LocalVariable {
            start: Label(2),
            end: Label(3),
            name: "x".to_string(),
            descriptor: "I".to_string(),
            index: 0,
        }]);

        let class = class_with(AccessFlags::STATIC, "()V", code.clone());
        assert_eq!(roundtrip(&class, EncodeOptions::none()), code);
    }

    #[test]
    fn frames_are_computed_for_branches() {
        let code = Code::new(vec![
            Instruction::Var {
                opcode: ILOAD,
                index: 0,
            },
            Instruction::Jump {
                opcode: IFEQ,
                target: Label(4),
            },
            Instruction::Simple(ICONST_1),
            Instruction::Simple(IRETURN),
            Instruction::Simple(ICONST_0),
            Instruction::Simple(IRETURN),
        ]);
        let class = class_with(AccessFlags::STATIC, "(I)I", code);

        let computed = roundtrip(&class, EncodeOptions::frames());
        assert_eq!(
            computed.frames,
            Some(Frames::Compressed(vec![StackMapFrame::Same { target: Label(4) }]))
        );
        assert_eq!((computed.max_stack, computed.max_locals), (1, 1));

        let mut old = class.clone();
        old.major_version = 49;
        assert_eq!(roundtrip(&old, EncodeOptions::frames()).frames, None);
    }

    #[test]
    fn expanded_frames_are_compressed_on_write() {
        let mut code = Code::new(vec![
            Instruction::Var {
                opcode: ILOAD,
                index: 0,
            },
            Instruction::Jump {
                opcode: IFEQ,
                target: Label(3),
            },
            Instruction::Simple(NOP),
            Instruction::Simple(RETURN),
        ]);
        code.max_stack = 1;
        code.max_locals = 1;
        code.frames = Some(Frames::Expanded(vec![Frame {
            target: Label(3),
            locals: vec![VerificationType::Integer],
            stack: vec![],
        }]));
        let class = class_with(AccessFlags::STATIC, "(I)V", code);

        assert_eq!(
            roundtrip(&class, EncodeOptions::none()).frames,
            Some(Frames::Compressed(vec![StackMapFrame::Same { target: Label(3) }]))
        );
    }

    #[test]
    fn operandless_opcodes_are_written_as_is() {
        // synchronized (lock) { throw (Throwable) lock.length }, never run
        let instructions = vec![
            Instruction::Var {
                opcode: ALOAD,
                index: 0,
            },
            Instruction::Simple(DUP),
            Instruction::Simple(MONITORENTER),
            Instruction::Simple(MONITOREXIT),
            Instruction::Var {
                opcode: ALOAD,
                index: 0,
            },
            Instruction::Simple(ARRAYLENGTH),
            Instruction::Simple(POP),
            Instruction::Simple(ACONST_NULL),
            Instruction::Simple(ATHROW),
        ];
        let class = class_with(AccessFlags::STATIC, "([I)V", Code::new(instructions.clone()));
        let code = roundtrip(&class, EncodeOptions::maxs());
        assert_eq!(code.instructions, instructions);
        assert_eq!((code.max_stack, code.max_locals), (2, 1));

        let operands_missing = class_with(AccessFlags::STATIC, "()V", Code::new(vec![Instruction::Simple(BIPUSH)]));
        assert!(matches!(
            encode(&operands_missing, EncodeOptions::none()),
            Err(ClassFileError::InvalidRecord(_))
        ));
    }

    #[test]
    fn unverifiable_bodies_still_encode() {
        let mut falls_off = Code::new(vec![Instruction::Simple(NOP)]);
        falls_off.max_stack = 3;
        let mut underflow = Code::new(vec![Instruction::Simple(POP), Instruction::Simple(RETURN)]);
        underflow.max_stack = 3;

        for code in [falls_off, underflow] {
            let class = class_with(AccessFlags::STATIC, "()V", code.clone());
            for options in [EncodeOptions::none(), EncodeOptions::maxs(), EncodeOptions::frames()] {
                let encoded = roundtrip(&class, options);
                assert_eq!(encoded.instructions, code.instructions);
                assert_eq!(encoded.frames, None);
            }
            // sizes are computed where only frames are out of reach
            assert_eq!(roundtrip(&class, EncodeOptions::maxs()).max_stack, 0);
            assert_eq!(roundtrip(&class, EncodeOptions::frames()).max_stack, 3);
        }

        // descriptor the analysis cannot read
        let mut code = Code::new(vec![Instruction::Simple(RETURN)]);
        code.max_stack = 2;
        code.max_locals = 2;
        let class = class_with(AccessFlags::STATIC, "(Q)V", code);
        let encoded = roundtrip(&class, EncodeOptions::frames());
        assert_eq!((encoded.max_stack, encoded.max_locals), (2, 2));
    }

    #[test]
    fn frames_out_of_order_are_refused() {
        let mut code = Code::new(vec![Instruction::Simple(NOP), Instruction::Simple(RETURN)]);
        code.frames = Some(Frames::Compressed(vec![
            StackMapFrame::Same { target: Label(1) },
            StackMapFrame::Same { target: Label(0) },
        ]));
        let class = class_with(AccessFlags::STATIC, "()V", code);
        assert!(matches!(
            encode(&class, EncodeOptions::none()),
            Err(ClassFileError::InvalidRecord(_))
        ));
    }
}
