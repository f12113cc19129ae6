use crate::{
    class::constant::{BootstrapMethod, Constant},
    opcodes::*,
};

/// Position inside a method body: an index into its instruction list.
/// `Label(instructions.len())` is the end of the code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(pub u32);

impl From<usize> for Label {
    fn from(value: usize) -> Self {
        Self(value as u32)
    }
}

impl Label {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One bytecode instruction with its operands resolved against the constant
/// pool, so that a body survives the pool being rebuilt.
#[derive(Clone, Debug, PartialEq)]
pub enum Instruction {
    /// Any instruction without operands.
    Simple(u8),
    /// `bipush` or `sipush`.
    IntPush { opcode: u8, value: i16 },
    /// `ldc`, `ldc_w` and `ldc2_w`; the form is picked when writing.
    Ldc(Constant),
    /// Loads, stores and `ret`. Short forms (`iload_0`) and `wide` are
    /// normalized away and picked again when writing.
    Var { opcode: u8, index: u16 },
    Iinc { index: u16, increment: i16 },
    /// Conditional branches, `goto`, `jsr` and their wide forms.
    Jump { opcode: u8, target: Label },
    TableSwitch {
        default: Label,
        low: i32,
        high: i32,
        targets: Vec<Label>,
    },
    LookupSwitch {
        default: Label,
        pairs: Vec<(i32, Label)>,
    },
    Field {
        opcode: u8,
        owner: String,
        name: String,
        descriptor: String,
    },
    Method {
        opcode: u8,
        owner: String,
        name: String,
        descriptor: String,
        interface: bool,
    },
    InvokeDynamic {
        name: String,
        descriptor: String,
        bootstrap: BootstrapMethod,
    },
    /// `new`, `anewarray`, `checkcast` and `instanceof`.
    Type { opcode: u8, class: String },
    NewArray(u8),
    MultiANewArray { class: String, dimensions: u8 },
}

impl Instruction {
    pub fn opcode(&self) -> u8 {
        match self {
            Self::Simple(opcode)
            | Self::IntPush { opcode, .. }
            | Self::Var { opcode, .. }
            | Self::Jump { opcode, .. }
            | Self::Field { opcode, .. }
            | Self::Method { opcode, .. }
            | Self::Type { opcode, .. } => *opcode,
            Self::Ldc(constant) if constant.is_wide() => LDC2_W,
            Self::Ldc(_) => LDC,
            Self::Iinc { .. } => IINC,
            Self::TableSwitch { .. } => TABLESWITCH,
            Self::LookupSwitch { .. } => LOOKUPSWITCH,
            Self::InvokeDynamic { .. } => INVOKEDYNAMIC,
            Self::NewArray(_) => NEWARRAY,
            Self::MultiANewArray { .. } => MULTIANEWARRAY,
        }
    }

    /// Branch targets of the instruction, default first for switches.
    pub fn targets(&self) -> Vec<Label> {
        match self {
            Self::Jump { target, .. } => vec![*target],
            Self::TableSwitch {
                default, targets, ..
            } => std::iter::once(*default).chain(targets.iter().copied()).collect(),
            Self::LookupSwitch { default, pairs } => std::iter::once(*default)
                .chain(pairs.iter().map(|(_, label)| *label))
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn targets_mut(&mut self) -> Vec<&mut Label> {
        match self {
            Self::Jump { target, .. } => vec![target],
            Self::TableSwitch {
                default, targets, ..
            } => std::iter::once(default).chain(targets.iter_mut()).collect(),
            Self::LookupSwitch { default, pairs } => std::iter::once(default)
                .chain(pairs.iter_mut().map(|(_, label)| label))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Control never falls through to the next instruction.
    pub fn ends_block(&self) -> bool {
        matches!(
            self.opcode(),
            GOTO | GOTO_W
                | TABLESWITCH
                | LOOKUPSWITCH
                | IRETURN
                | LRETURN
                | FRETURN
                | DRETURN
                | ARETURN
                | RETURN
                | ATHROW
                | RET
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ldc_opcode_follows_constant_width() {
        assert_eq!(Instruction::Ldc(Constant::Integer(1)).opcode(), LDC);
        assert_eq!(Instruction::Ldc(Constant::Double(1.0)).opcode(), LDC2_W);
    }

    #[test]
    fn switch_targets_start_with_default() {
        let insn = Instruction::TableSwitch {
            default: Label(9),
            low: 0,
            high: 1,
            targets: vec![Label(3), Label(5)],
        };
        assert_eq!(insn.targets(), vec![Label(9), Label(3), Label(5)]);
        assert!(insn.ends_block());
    }

    #[test]
    fn conditional_jump_falls_through() {
        let insn = Instruction::Jump {
            opcode: IFEQ,
            target: Label(0),
        };
        assert!(!insn.ends_block());
        assert!(Instruction::Simple(ATHROW).ends_block());
    }
}
