/// A loadable constant with every constant pool reference resolved.
#[derive(Clone, Debug, PartialEq)]
pub enum Constant {
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    String(String),
    /// Internal name, or array descriptor for array classes.
    Class(String),
    MethodType(String),
    MethodHandle(Handle),
    Dynamic(ConstantDynamic),
}

impl Constant {
    /// Whether the value takes two slots (and `ldc2_w` to load).
    pub fn is_wide(&self) -> bool {
        match self {
            Self::Long(_) | Self::Double(_) => true,
            Self::Dynamic(dynamic) => matches!(dynamic.descriptor.as_str(), "J" | "D"),
            _ => false,
        }
    }
}

pub const REF_GET_FIELD: u8 = 1;
pub const REF_GET_STATIC: u8 = 2;
pub const REF_PUT_FIELD: u8 = 3;
pub const REF_PUT_STATIC: u8 = 4;
pub const REF_INVOKE_VIRTUAL: u8 = 5;
pub const REF_INVOKE_STATIC: u8 = 6;
pub const REF_INVOKE_SPECIAL: u8 = 7;
pub const REF_NEW_INVOKE_SPECIAL: u8 = 8;
pub const REF_INVOKE_INTERFACE: u8 = 9;

/// A `CONSTANT_MethodHandle` with its member reference resolved.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Handle {
    pub kind: u8,
    pub owner: String,
    pub name: String,
    pub descriptor: String,
    /// The member is referenced through an `InterfaceMethodref`.
    pub interface: bool,
}

impl Handle {
    pub fn is_field(&self) -> bool {
        (REF_GET_FIELD..=REF_PUT_STATIC).contains(&self.kind)
    }
}

/// A dynamically-computed constant (`CONSTANT_Dynamic`).
#[derive(Clone, Debug, PartialEq)]
pub struct ConstantDynamic {
    pub name: String,
    pub descriptor: String,
    pub bootstrap: BootstrapMethod,
}

/// An entry of the `BootstrapMethods` attribute, referenced from
/// `invokedynamic` and dynamic constants.
#[derive(Clone, Debug, PartialEq)]
pub struct BootstrapMethod {
    pub handle: Handle,
    pub arguments: Vec<Constant>,
}
