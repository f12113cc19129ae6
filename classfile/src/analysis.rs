//! Abstract interpretation of method bodies, used by the writer to compute
//! operand stack and local variable sizes as well as stack map frames.

use std::collections::{BTreeMap, VecDeque};

use tracing::trace;

use crate::{
    class::{
        constant::Constant,
        descriptor::{FieldDescriptor, MethodDescriptor, ReturnDescriptor},
        frame::{Frame, VerificationType},
        instruction::{Instruction, Label},
        method::{Code, ExceptionHandler, MethodRecord},
    },
    error::{ClassFileError, Result, invalid},
    frame,
    opcodes::*,
};

const OBJECT: &str = "java/lang/Object";
const THROWABLE: &str = "java/lang/Throwable";

/// Answers subtyping questions while merging reference types at control
/// flow joins.
pub trait TypeHierarchy {
    /// Closest common super class of two different classes, given as
    /// internal names.
    fn common_super_class(&self, left: &str, right: &str) -> String;
}

/// Knows nothing about any class; every merge widens to `java/lang/Object`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ObjectHierarchy;

impl TypeHierarchy for ObjectHierarchy {
    fn common_super_class(&self, _left: &str, _right: &str) -> String {
        OBJECT.to_string()
    }
}

/// What the analysis of one method body found out.
#[derive(Debug)]
pub struct Analysis {
    pub max_stack: u16,
    pub max_locals: u16,
    /// Present when frames were asked for.
    pub frames: Option<Vec<Frame>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Value {
    Top,
    Integer,
    Float,
    Long,
    Double,
    Null,
    UninitializedThis,
    Object(String),
    Uninitialized(Label),
    /// Pushed by `jsr`; never part of a frame.
    ReturnAddress,
}

impl Value {
    fn is_wide(&self) -> bool {
        matches!(self, Self::Long | Self::Double)
    }

    fn object(name: &str) -> Self {
        Self::Object(name.to_string())
    }

    fn from_descriptor(descriptor: &str) -> Result<Self> {
        let descriptor = FieldDescriptor::new(descriptor).map_err(ClassFileError::into_invalid_record)?;
        Ok(frame::verification_type(&descriptor.field_type).into())
    }

    fn from_constant(constant: &Constant) -> Result<Self> {
        Ok(match constant {
            Constant::Integer(_) => Self::Integer,
            Constant::Float(_) => Self::Float,
            Constant::Long(_) => Self::Long,
            Constant::Double(_) => Self::Double,
            Constant::String(_) => Self::object("java/lang/String"),
            Constant::Class(_) => Self::object("java/lang/Class"),
            Constant::MethodType(_) => Self::object("java/lang/invoke/MethodType"),
            Constant::MethodHandle(_) => Self::object("java/lang/invoke/MethodHandle"),
            Constant::Dynamic(dynamic) => Self::from_descriptor(&dynamic.descriptor)?,
        })
    }

    fn verification_type(&self) -> VerificationType {
        match self {
            Self::Top | Self::ReturnAddress => VerificationType::Top,
            Self::Integer => VerificationType::Integer,
            Self::Float => VerificationType::Float,
            Self::Long => VerificationType::Long,
            Self::Double => VerificationType::Double,
            Self::Null => VerificationType::Null,
            Self::UninitializedThis => VerificationType::UninitializedThis,
            Self::Object(name) => VerificationType::Object(name.clone()),
            Self::Uninitialized(label) => VerificationType::Uninitialized(*label),
        }
    }
}

impl From<VerificationType> for Value {
    fn from(value: VerificationType) -> Self {
        match value {
            VerificationType::Top => Self::Top,
            VerificationType::Integer => Self::Integer,
            VerificationType::Float => Self::Float,
            VerificationType::Long => Self::Long,
            VerificationType::Double => Self::Double,
            VerificationType::Null => Self::Null,
            VerificationType::UninitializedThis => Self::UninitializedThis,
            VerificationType::Object(name) => Self::Object(name),
            VerificationType::Uninitialized(label) => Self::Uninitialized(label),
        }
    }
}

/// Locals are kept one value per slot (the second slot of a Long or Double
/// is Top); the stack one value per entry.
///
/// A `lenient` state reads an empty stack as Top and ignores slot size
/// mismatches, which is enough to size code that would not verify.
#[derive(Clone, Debug, PartialEq, Eq)]
struct State {
    locals: Vec<Value>,
    stack: Vec<Value>,
    lenient: bool,
}

impl State {
    fn stack_size(&self) -> usize {
        self.stack.iter().map(|value| if value.is_wide() { 2 } else { 1 }).sum()
    }

    fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    fn pop(&mut self) -> Result<Value> {
        match self.stack.pop() {
            Some(value) => Ok(value),
            None if self.lenient => Ok(Value::Top),
            None => invalid!("operand stack underflow"),
        }
    }

    /// Pops a value that takes a single stack slot.
    fn pop1(&mut self) -> Result<Value> {
        let value = self.pop()?;
        if value.is_wide() && !self.lenient {
            invalid!("{value:?} used where a one-slot value is expected");
        }
        Ok(value)
    }

    fn pop_n(&mut self, count: usize) -> Result<()> {
        for _ in 0..count {
            self.pop()?;
        }
        Ok(())
    }

    fn load(&self, index: u16) -> Result<Value> {
        match self.locals.get(index as usize) {
            Some(value) => Ok(value.clone()),
            None => invalid!("local variable {index} out of range"),
        }
    }

    fn store(&mut self, index: u16, value: Value) -> Result<()> {
        let index = index as usize;
        let mut wide = value.is_wide();
        if index + usize::from(wide) >= self.locals.len() {
            if !self.lenient || index >= self.locals.len() {
                invalid!("local variable {index} out of range");
            }
            wide = false;
        }

        // overwriting the second half of a Long or Double
        if index > 0 && self.locals[index - 1].is_wide() {
            self.locals[index - 1] = Value::Top;
        }
        self.locals[index] = value;
        if wide {
            self.locals[index + 1] = Value::Top;
        }
        Ok(())
    }

    /// Replaces every occurrence of `from` once a constructor has run.
    fn initialize(&mut self, from: &Value, to: &Value) {
        for value in self.locals.iter_mut().chain(self.stack.iter_mut()) {
            if value == from {
                *value = to.clone();
            }
        }
    }

    fn frame(&self, target: Label) -> Frame {
        let mut locals = Vec::with_capacity(self.locals.len());
        let mut slot = 0;
        while slot < self.locals.len() {
            let value = &self.locals[slot];
            locals.push(value.verification_type());
            slot += if value.is_wide() { 2 } else { 1 };
        }
        while locals.last() == Some(&VerificationType::Top) {
            locals.pop();
        }

        Frame {
            target,
            locals,
            stack: self.stack.iter().map(Value::verification_type).collect(),
        }
    }
}

/// Local variable slots the instructions touch, at least `minimum`.
fn max_locals(instructions: &[Instruction], minimum: usize) -> usize {
    instructions
        .iter()
        .map(|instruction| match instruction {
            Instruction::Var {
                opcode: LLOAD | DLOAD | LSTORE | DSTORE,
                index,
            } => *index as usize + 2,
            Instruction::Var { index, .. } | Instruction::Iinc { index, .. } => *index as usize + 1,
            _ => 0,
        })
        .fold(minimum, usize::max)
}

struct Handler {
    start: usize,
    end: usize,
    handler: usize,
    catch: Value,
}

struct Interpreter<'a> {
    owner: &'a str,
    instructions: &'a [Instruction],
    hierarchy: &'a dyn TypeHierarchy,
}

/// Computes the maximum stack and locals of `code` and, with
/// `compute_frames`, its stack map frames.
///
/// Computing frames also replaces unreachable instructions by `nop`s ending
/// in `athrow` and takes them out of the exception table.
pub fn analyze(
    owner: &str,
    method: &MethodRecord,
    code: &mut Code,
    hierarchy: &dyn TypeHierarchy,
    compute_frames: bool,
) -> Result<Analysis> {
    let in_method = |err: ClassFileError| match err {
        ClassFileError::InvalidRecord(message) => {
            ClassFileError::InvalidRecord(format!("{}{}: {message}", method.name, method.descriptor))
        }
        other => other,
    };

    let initial = frame::initial_locals(owner, method.access, &method.name, &method.descriptor)
        .map_err(|err| in_method(err.into_invalid_record()))?;
    let argument_slots: usize = initial.iter().map(|value| if value.is_wide() { 2 } else { 1 }).sum();
    let max_locals = max_locals(&code.instructions, argument_slots);
    let Ok(max_locals_u16) = u16::try_from(max_locals) else {
        return Err(in_method(ClassFileError::InvalidRecord(format!(
            "{max_locals} local variable slots"
        ))));
    };

    if compute_frames
        && code
            .instructions
            .iter()
            .any(|instruction| matches!(instruction.opcode(), JSR | JSR_W | RET))
    {
        return Err(in_method(ClassFileError::InvalidRecord(
            "jsr and ret cannot be combined with frame computation".to_string(),
        )));
    }

    let count = code.instructions.len();
    if count == 0 {
        return Ok(Analysis {
            max_stack: 0,
            max_locals: max_locals_u16,
            frames: compute_frames.then(Vec::new),
        });
    }

    let mut locals = Vec::with_capacity(max_locals);
    for value in initial {
        let wide = value.is_wide();
        locals.push(Value::from(value));
        if wide {
            locals.push(Value::Top);
        }
    }
    locals.resize(max_locals, Value::Top);

    let handlers: Vec<Handler> = code
        .exception_table
        .iter()
        .map(|handler| Handler {
            start: handler.start.index(),
            end: handler.end.index(),
            handler: handler.handler.index(),
            catch: Value::object(handler.catch_type.as_deref().unwrap_or(THROWABLE)),
        })
        .collect();

    let interpreter = Interpreter {
        owner,
        instructions: &code.instructions,
        hierarchy,
    };

    let mut entries: Vec<Option<State>> = vec![None; count];
    entries[0] = Some(State {
        locals,
        stack: Vec::new(),
        lenient: !compute_frames,
    });
    let mut queue = VecDeque::from([0]);
    let mut queued = vec![false; count];
    queued[0] = true;
    let mut max_stack = 0;
    let mut iterations = 0usize;
    let iteration_limit = count.saturating_mul(64).max(100_000);

    while let Some(index) = queue.pop_front() {
        queued[index] = false;
        iterations += 1;
        if iterations > iteration_limit {
            return Err(in_method(ClassFileError::InvalidRecord(
                "frame analysis does not converge".to_string(),
            )));
        }

        let Some(before) = entries[index].clone() else {
            continue;
        };
        let mut after = before.clone();
        interpreter
            .execute(index, &mut after)
            .map_err(|err| in_method(at_instruction(err, index)))?;
        max_stack = max_stack.max(after.stack_size());

        let mut edges: Vec<(usize, State)> = Vec::new();
        for handler in handlers.iter().filter(|handler| (handler.start..handler.end).contains(&index)) {
            for locals in [&before.locals, &after.locals] {
                edges.push((
                    handler.handler,
                    State {
                        locals: locals.clone(),
                        stack: vec![handler.catch.clone()],
                        lenient: before.lenient,
                    },
                ));
            }
        }

        let instruction = &code.instructions[index];
        if let Instruction::Jump {
            opcode: JSR | JSR_W,
            target,
        } = instruction
        {
            let mut subroutine = after.clone();
            subroutine.push(Value::ReturnAddress);
            max_stack = max_stack.max(subroutine.stack_size());
            edges.push((target.index(), subroutine));
        } else {
            for target in instruction.targets() {
                edges.push((target.index(), after.clone()));
            }
        }

        if !instruction.ends_block() {
            if index + 1 < count {
                edges.push((index + 1, after));
            } else if !compute_frames {
                trace!("{}{} falls off the end of its code", method.name, method.descriptor);
            } else {
                return Err(in_method(at_instruction(
                    ClassFileError::InvalidRecord("execution falls off the end of the code".to_string()),
                    index,
                )));
            }
        }

        for (successor, state) in edges {
            let changed = interpreter
                .merge_into(&mut entries[successor], &state)
                .map_err(|err| in_method(at_instruction(err, successor)))?;
            if changed && !queued[successor] {
                queued[successor] = true;
                queue.push_back(successor);
            }
        }
    }

    let frames = if compute_frames {
        let (frames, dead_code) = frames(code, &entries);
        if dead_code {
            max_stack = max_stack.max(1);
        }
        Some(frames)
    } else {
        None
    };

    let Ok(max_stack) = u16::try_from(max_stack) else {
        return Err(in_method(ClassFileError::InvalidRecord(format!(
            "operand stack of {max_stack} slots"
        ))));
    };

    trace!(
        "analyzed {}{}: max_stack {max_stack}, max_locals {max_locals}",
        method.name, method.descriptor
    );
    Ok(Analysis {
        max_stack,
        max_locals: max_locals_u16,
        frames,
    })
}

fn at_instruction(err: ClassFileError, index: usize) -> ClassFileError {
    match err {
        ClassFileError::InvalidRecord(message) => {
            ClassFileError::InvalidRecord(format!("instruction {index}: {message}"))
        }
        other => other,
    }
}

/// Collects the frames at branch targets, handlers and unreachable blocks,
/// rewriting the unreachable blocks on the way. Also reports whether there
/// was any unreachable code.
fn frames(code: &mut Code, entries: &[Option<State>]) -> (Vec<Frame>, bool) {
    let mut frames = BTreeMap::new();

    for (index, instruction) in code.instructions.iter().enumerate() {
        if entries[index].is_none() {
            continue;
        }
        for target in instruction.targets() {
            if let Some(state) = &entries[target.index()] {
                frames.insert(target, state.frame(target));
            }
        }
    }

    let mut dead = Vec::new();
    let mut index = 0;
    while index < entries.len() {
        if entries[index].is_some() {
            index += 1;
            continue;
        }
        let start = index;
        while index < entries.len() && entries[index].is_none() {
            index += 1;
        }
        dead.push((start, index));
    }

    for (start, end) in &dead {
        for instruction in &mut code.instructions[*start..*end - 1] {
            *instruction = Instruction::Simple(NOP);
        }
        code.instructions[*end - 1] = Instruction::Simple(ATHROW);

        let target = Label::from(*start);
        frames.insert(
            target,
            Frame {
                target,
                locals: Vec::new(),
                stack: vec![VerificationType::Object(THROWABLE.to_string())],
            },
        );
    }

    if !dead.is_empty() {
        code.exception_table = remove_ranges(&code.exception_table, &dead);
    }

    for handler in &code.exception_table {
        if let Some(state) = &entries[handler.handler.index()] {
            frames.insert(handler.handler, state.frame(handler.handler));
        }
    }

    (frames.into_values().collect(), !dead.is_empty())
}

/// Cuts `dead` (sorted, disjoint index ranges) out of every handler range,
/// splitting ranges in two where needed and dropping the ones left empty.
fn remove_ranges(table: &[ExceptionHandler], dead: &[(usize, usize)]) -> Vec<ExceptionHandler> {
    let mut result = Vec::with_capacity(table.len());
    for handler in table {
        let mut start = handler.start.index();
        let end = handler.end.index();
        for (dead_start, dead_end) in dead {
            if *dead_end <= start || *dead_start >= end {
                continue;
            }
            if *dead_start > start {
                result.push(ExceptionHandler {
                    start: Label::from(start),
                    end: Label::from(*dead_start),
                    ..handler.clone()
                });
            }
            start = (*dead_end).min(end);
        }
        if start < end {
            result.push(ExceptionHandler {
                start: Label::from(start),
                ..handler.clone()
            });
        }
    }
    result
}

impl Interpreter<'_> {
    fn merge_value(&self, left: &Value, right: &Value) -> Value {
        if left == right {
            return left.clone();
        }
        match (left, right) {
            (Value::Null, Value::Object(name)) | (Value::Object(name), Value::Null) => {
                Value::Object(name.clone())
            }
            (Value::Object(left), Value::Object(right)) => {
                if left.starts_with('[') || right.starts_with('[') {
                    Value::object(OBJECT)
                } else {
                    Value::Object(self.hierarchy.common_super_class(left, right))
                }
            }
            _ => Value::Top,
        }
    }

    /// Merges `incoming` into the entry state of an instruction and reports
    /// whether the entry changed.
    fn merge_into(&self, entry: &mut Option<State>, incoming: &State) -> Result<bool> {
        let Some(existing) = entry else {
            *entry = Some(incoming.clone());
            return Ok(true);
        };

        if existing.stack.len() != incoming.stack.len() {
            if existing.lenient {
                // keep the deepest stack seen so the maximum stays an upper bound
                if incoming.stack_size() > existing.stack_size() {
                    existing.stack = incoming.stack.clone();
                    return Ok(true);
                }
                return Ok(false);
            }
            invalid!(
                "operand stack height differs between paths ({} and {})",
                existing.stack.len(),
                incoming.stack.len()
            );
        }

        let mut changed = false;
        for (current, other) in existing.locals.iter_mut().zip(&incoming.locals) {
            let merged = self.merge_value(current, other);
            if merged != *current {
                *current = merged;
                changed = true;
            }
        }
        for (current, other) in existing.stack.iter_mut().zip(&incoming.stack) {
            if current.is_wide() != other.is_wide() && !existing.lenient {
                invalid!("operand stack entries {current:?} and {other:?} differ in size");
            }
            let merged = self.merge_value(current, other);
            if merged != *current {
                *current = merged;
                changed = true;
            }
        }
        Ok(changed)
    }

    fn execute(&self, index: usize, state: &mut State) -> Result<()> {
        match &self.instructions[index] {
            Instruction::Simple(opcode) => self.simple(*opcode, state)?,
            Instruction::IntPush { .. } => state.push(Value::Integer),
            Instruction::Ldc(constant) => state.push(Value::from_constant(constant)?),
            Instruction::Var { opcode, index } => match *opcode {
                ILOAD => state.push(Value::Integer),
                LLOAD => state.push(Value::Long),
                FLOAD => state.push(Value::Float),
                DLOAD => state.push(Value::Double),
                ALOAD => state.push(state.load(*index)?),
                ISTORE | LSTORE | FSTORE | DSTORE | ASTORE => {
                    let value = state.pop()?;
                    state.store(*index, value)?;
                }
                RET => {
                    state.load(*index)?;
                }
                opcode => invalid!("opcode 0x{opcode:x} is not a local variable instruction"),
            },
            Instruction::Iinc { index, .. } => state.store(*index, Value::Integer)?,
            Instruction::Jump { opcode, .. } => match *opcode {
                IFEQ..=IFLE | IFNULL | IFNONNULL => {
                    state.pop1()?;
                }
                IF_ICMPEQ..=IF_ACMPNE => state.pop_n(2)?,
                GOTO | GOTO_W | JSR | JSR_W => {}
                opcode => invalid!("opcode 0x{opcode:x} is not a jump"),
            },
            Instruction::TableSwitch { .. } | Instruction::LookupSwitch { .. } => {
                state.pop1()?;
            }
            Instruction::Field {
                opcode, descriptor, ..
            } => {
                let value = Value::from_descriptor(descriptor)?;
                match *opcode {
                    GETSTATIC => state.push(value),
                    PUTSTATIC => state.pop_n(1)?,
                    GETFIELD => {
                        state.pop1()?;
                        state.push(value);
                    }
                    PUTFIELD => state.pop_n(2)?,
                    opcode => invalid!("opcode 0x{opcode:x} is not a field instruction"),
                }
            }
            Instruction::Method {
                opcode,
                owner,
                name,
                descriptor,
                ..
            } => {
                let descriptor = MethodDescriptor::new(descriptor).map_err(ClassFileError::into_invalid_record)?;
                state.pop_n(descriptor.parameters.len())?;
                if *opcode != INVOKESTATIC {
                    let receiver = state.pop1()?;
                    if *opcode == INVOKESPECIAL && name == "<init>" {
                        let initialized = match &receiver {
                            Value::UninitializedThis => Value::object(self.owner),
                            Value::Uninitialized(label) => Value::object(self.new_class(*label)?),
                            _ => Value::object(owner),
                        };
                        state.initialize(&receiver, &initialized);
                    }
                }
                push_return(state, &descriptor.return_descriptor);
            }
            Instruction::InvokeDynamic { descriptor, .. } => {
                let descriptor = MethodDescriptor::new(descriptor).map_err(ClassFileError::into_invalid_record)?;
                state.pop_n(descriptor.parameters.len())?;
                push_return(state, &descriptor.return_descriptor);
            }
            Instruction::Type { opcode, class } => match *opcode {
                NEW => state.push(Value::Uninitialized(Label::from(index))),
                ANEWARRAY => {
                    state.pop1()?;
                    let array = if class.starts_with('[') {
                        format!("[{class}")
                    } else {
                        format!("[L{class};")
                    };
                    state.push(Value::Object(array));
                }
                CHECKCAST => {
                    state.pop1()?;
                    state.push(Value::Object(class.clone()));
                }
                INSTANCEOF => {
                    state.pop1()?;
                    state.push(Value::Integer);
                }
                opcode => invalid!("opcode 0x{opcode:x} is not a type instruction"),
            },
            Instruction::NewArray(atype) => {
                state.pop1()?;
                let array = match *atype {
                    T_BOOLEAN => "[Z",
                    T_CHAR => "[C",
                    T_FLOAT => "[F",
                    T_DOUBLE => "[D",
                    T_BYTE => "[B",
                    T_SHORT => "[S",
                    T_INT => "[I",
                    T_LONG => "[J",
                    atype => invalid!("invalid newarray type {atype}"),
                };
                state.push(Value::object(array));
            }
            Instruction::MultiANewArray { class, dimensions } => {
                state.pop_n(*dimensions as usize)?;
                state.push(Value::Object(class.clone()));
            }
        }
        Ok(())
    }

    fn new_class(&self, label: Label) -> Result<&str> {
        match self.instructions.get(label.index()) {
            Some(Instruction::Type { opcode: NEW, class }) => Ok(class),
            _ => invalid!("uninitialized value does not come from a new instruction"),
        }
    }

    fn simple(&self, opcode: u8, state: &mut State) -> Result<()> {
        match opcode {
            NOP => {}
            ACONST_NULL => state.push(Value::Null),
            ICONST_M1..=ICONST_5 => state.push(Value::Integer),
            LCONST_0 | LCONST_1 => state.push(Value::Long),
            FCONST_0..=FCONST_2 => state.push(Value::Float),
            DCONST_0 | DCONST_1 => state.push(Value::Double),
            IALOAD | BALOAD | CALOAD | SALOAD => binary(state, Value::Integer)?,
            LALOAD => binary(state, Value::Long)?,
            FALOAD => binary(state, Value::Float)?,
            DALOAD => binary(state, Value::Double)?,
            AALOAD => {
                state.pop1()?;
                let element = match state.pop1()? {
                    Value::Object(array) if array.starts_with('[') => Value::from_descriptor(&array[1..])?,
                    Value::Null => Value::Null,
                    _ => Value::object(OBJECT),
                };
                state.push(element);
            }
            IASTORE..=SASTORE => state.pop_n(3)?,
            POP => {
                state.pop1()?;
            }
            POP2 => {
                if !state.pop()?.is_wide() {
                    state.pop1()?;
                }
            }
            DUP => {
                let v1 = state.pop1()?;
                state.push(v1.clone());
                state.push(v1);
            }
            DUP_X1 => {
                let v1 = state.pop1()?;
                let v2 = state.pop1()?;
                state.stack.extend([v1.clone(), v2, v1]);
            }
            DUP_X2 => {
                let v1 = state.pop1()?;
                let v2 = state.pop()?;
                if v2.is_wide() {
                    state.stack.extend([v1.clone(), v2, v1]);
                } else {
                    let v3 = state.pop1()?;
                    state.stack.extend([v1.clone(), v3, v2, v1]);
                }
            }
            DUP2 => {
                let v1 = state.pop()?;
                if v1.is_wide() {
                    state.stack.extend([v1.clone(), v1]);
                } else {
                    let v2 = state.pop1()?;
                    state.stack.extend([v2.clone(), v1.clone(), v2, v1]);
                }
            }
            DUP2_X1 => {
                let v1 = state.pop()?;
                if v1.is_wide() {
                    let v2 = state.pop1()?;
                    state.stack.extend([v1.clone(), v2, v1]);
                } else {
                    let v2 = state.pop1()?;
                    let v3 = state.pop1()?;
                    state.stack.extend([v2.clone(), v1.clone(), v3, v2, v1]);
                }
            }
            DUP2_X2 => {
                let v1 = state.pop()?;
                if v1.is_wide() {
                    let v2 = state.pop()?;
                    if v2.is_wide() {
                        state.stack.extend([v1.clone(), v2, v1]);
                    } else {
                        let v3 = state.pop1()?;
                        state.stack.extend([v1.clone(), v3, v2, v1]);
                    }
                } else {
                    let v2 = state.pop1()?;
                    let v3 = state.pop()?;
                    if v3.is_wide() {
                        state.stack.extend([v2.clone(), v1.clone(), v3, v2, v1]);
                    } else {
                        let v4 = state.pop1()?;
                        state.stack.extend([v2.clone(), v1.clone(), v4, v3, v2, v1]);
                    }
                }
            }
            SWAP => {
                let v1 = state.pop1()?;
                let v2 = state.pop1()?;
                state.stack.extend([v1, v2]);
            }
            IADD..=DREM => binary(state, arithmetic_type(opcode - IADD))?,
            INEG..=DNEG => unary(state, arithmetic_type(opcode - INEG))?,
            ISHL..=LXOR => binary(
                state,
                if (opcode - ISHL) % 2 == 0 {
                    Value::Integer
                } else {
                    Value::Long
                },
            )?,
            I2L | F2L | D2L => unary(state, Value::Long)?,
            I2F | L2F | D2F => unary(state, Value::Float)?,
            I2D | L2D | F2D => unary(state, Value::Double)?,
            L2I | F2I | D2I | I2B | I2C | I2S => unary(state, Value::Integer)?,
            LCMP..=DCMPG => binary(state, Value::Integer)?,
            IRETURN..=ARETURN | ATHROW | MONITORENTER | MONITOREXIT => {
                state.pop()?;
            }
            RETURN => {}
            ARRAYLENGTH => unary(state, Value::Integer)?,
            opcode => invalid!("opcode 0x{opcode:x} takes operands"),
        }
        Ok(())
    }
}

/// Integer, Long, Float and Double take turns in the arithmetic opcodes.
fn arithmetic_type(offset: u8) -> Value {
    match offset % 4 {
        0 => Value::Integer,
        1 => Value::Long,
        2 => Value::Float,
        _ => Value::Double,
    }
}

fn unary(state: &mut State, result: Value) -> Result<()> {
    state.pop()?;
    state.push(result);
    Ok(())
}

fn binary(state: &mut State, result: Value) -> Result<()> {
    state.pop_n(2)?;
    state.push(result);
    Ok(())
}

fn push_return(state: &mut State, descriptor: &ReturnDescriptor) {
    if let ReturnDescriptor::FieldType(field_type) = descriptor {
        state.push(frame::verification_type(field_type).into());
    }
}
