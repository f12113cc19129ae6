use std::{fmt, ops::BitOr};

/// Raw `access_flags` of a class, field, method or inner class entry.
///
/// The same bit means different things depending on where it appears
/// (`0x0020` is `ACC_SUPER` on a class and `ACC_SYNCHRONIZED` on a method),
/// so naming the set bits needs a [`FlagTarget`].
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct AccessFlags(pub u16);

impl AccessFlags {
    pub const PUBLIC: Self = Self(0x0001);
    pub const PRIVATE: Self = Self(0x0002);
    pub const PROTECTED: Self = Self(0x0004);
    pub const STATIC: Self = Self(0x0008);
    pub const FINAL: Self = Self(0x0010);
    pub const SUPER: Self = Self(0x0020);
    pub const SYNCHRONIZED: Self = Self(0x0020);
    pub const VOLATILE: Self = Self(0x0040);
    pub const BRIDGE: Self = Self(0x0040);
    pub const TRANSIENT: Self = Self(0x0080);
    pub const VARARGS: Self = Self(0x0080);
    pub const NATIVE: Self = Self(0x0100);
    pub const INTERFACE: Self = Self(0x0200);
    pub const ABSTRACT: Self = Self(0x0400);
    pub const STRICT: Self = Self(0x0800);
    pub const SYNTHETIC: Self = Self(0x1000);
    pub const ANNOTATION: Self = Self(0x2000);
    pub const ENUM: Self = Self(0x4000);
    pub const MODULE: Self = Self(0x8000);
    pub const MANDATED: Self = Self(0x8000);

    pub fn bits(self) -> u16 {
        self.0
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_static(self) -> bool {
        self.contains(Self::STATIC)
    }

    pub fn is_interface(self) -> bool {
        self.contains(Self::INTERFACE)
    }

    /// Names of the set flags, in bit order.
    pub fn names(self, target: FlagTarget) -> Vec<&'static str> {
        target
            .table()
            .iter()
            .filter(|(flag, _)| self.0 & flag != 0)
            .map(|(_, name)| *name)
            .collect()
    }
}

impl From<u16> for AccessFlags {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl BitOr for AccessFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Debug for AccessFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccessFlags(0x{:04x})", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlagTarget {
    Class,
    Field,
    Method,
    Parameter,
}

const CLASS_FLAGS: &[(u16, &str)] = &[
    (0x0001, "public"),
    (0x0010, "final"),
    (0x0020, "super"),
    (0x0200, "interface"),
    (0x0400, "abstract"),
    (0x1000, "synthetic"),
    (0x2000, "annotation"),
    (0x4000, "enum"),
    (0x8000, "module"),
];

const FIELD_FLAGS: &[(u16, &str)] = &[
    (0x0001, "public"),
    (0x0002, "private"),
    (0x0004, "protected"),
    (0x0008, "static"),
    (0x0010, "final"),
    (0x0040, "volatile"),
    (0x0080, "transient"),
    (0x1000, "synthetic"),
    (0x4000, "enum"),
];

const METHOD_FLAGS: &[(u16, &str)] = &[
    (0x0001, "public"),
    (0x0002, "private"),
    (0x0004, "protected"),
    (0x0008, "static"),
    (0x0010, "final"),
    (0x0020, "synchronized"),
    (0x0040, "bridge"),
    (0x0080, "varargs"),
    (0x0100, "native"),
    (0x0400, "abstract"),
    (0x0800, "strict"),
    (0x1000, "synthetic"),
];

const PARAMETER_FLAGS: &[(u16, &str)] = &[
    (0x0010, "final"),
    (0x1000, "synthetic"),
    (0x8000, "mandated"),
];

impl FlagTarget {
    fn table(self) -> &'static [(u16, &'static str)] {
        match self {
            Self::Class => CLASS_FLAGS,
            Self::Field => FIELD_FLAGS,
            Self::Method => METHOD_FLAGS,
            Self::Parameter => PARAMETER_FLAGS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_depend_on_target() {
        let flags = AccessFlags::PUBLIC | AccessFlags(0x0020);
        assert_eq!(flags.names(FlagTarget::Class), vec!["public", "super"]);
        assert_eq!(flags.names(FlagTarget::Method), vec!["public", "synchronized"]);
        assert_eq!(flags.names(FlagTarget::Field), vec!["public"]);
    }

    #[test]
    fn contains_requires_all_bits() {
        let flags = AccessFlags::PUBLIC | AccessFlags::FINAL;
        assert!(flags.contains(AccessFlags::FINAL));
        assert!(!flags.contains(AccessFlags::FINAL | AccessFlags::STATIC));
        assert_eq!(flags.bits(), 0x0011);
    }
}
