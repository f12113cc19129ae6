use crate::class::instruction::Label;

/// `verification_type_info`. Long and Double stand for both of their slots.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum VerificationType {
    Top,
    Integer,
    Float,
    Double,
    Long,
    Null,
    UninitializedThis,
    /// Internal name or array descriptor.
    Object(String),
    /// Result of the `new` instruction at the label, not yet constructed.
    Uninitialized(Label),
}

impl VerificationType {
    pub fn is_wide(&self) -> bool {
        matches!(self, Self::Long | Self::Double)
    }
}

/// A `stack_map_frame` in the delta form it is stored in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StackMapFrame {
    /// Same locals as the previous frame, empty stack.
    Same { target: Label },
    /// Same locals, one stack item.
    SameLocals1StackItem {
        target: Label,
        stack: VerificationType,
    },
    /// The last `count` (1 to 3) locals are absent, empty stack.
    Chop { target: Label, count: u8 },
    /// 1 to 3 locals added, empty stack.
    Append {
        target: Label,
        locals: Vec<VerificationType>,
    },
    Full {
        target: Label,
        locals: Vec<VerificationType>,
        stack: Vec<VerificationType>,
    },
}

impl StackMapFrame {
    pub fn target(&self) -> Label {
        match self {
            Self::Same { target }
            | Self::SameLocals1StackItem { target, .. }
            | Self::Chop { target, .. }
            | Self::Append { target, .. }
            | Self::Full { target, .. } => *target,
        }
    }
}

/// A frame with its locals and stack spelled out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub target: Label,
    pub locals: Vec<VerificationType>,
    pub stack: Vec<VerificationType>,
}

/// The content of a `StackMapTable` attribute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frames {
    Compressed(Vec<StackMapFrame>),
    Expanded(Vec<Frame>),
}

impl Frames {
    pub fn len(&self) -> usize {
        match self {
            Self::Compressed(frames) => frames.len(),
            Self::Expanded(frames) => frames.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
