use std::collections::HashMap;

use tracing::trace;

use crate::{
    error::{Result, bail, invalid},
    mutf8,
    util::{Cursor, Out},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CpIndex(pub u16);

impl From<u16> for CpIndex {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl CpIndex {
    pub fn is_none(&self) -> bool {
        self.0 == 0
    }
}

/// A table of structures representing various string constants,
/// class and interface names, field names, and other constant structures
#[derive(Clone, Debug)]
pub struct ConstantPool {
    pub infos: Vec<CpInfo>,
}

impl ConstantPool {
    pub fn new(r: &mut Cursor, count: u16) -> Result<Self> {
        if count == 0 {
            bail!("constant pool count must be at least 1");
        }

        let mut infos = Vec::with_capacity(count.into());
        infos.push(CpInfo::Reserved);

        while infos.len() < count as usize {
            let info = CpInfo::new(r)?;
            let wide = info.is_wide();
            infos.push(info);

            if wide {
                if infos.len() == count as usize {
                    bail!("8-byte constant occupies the last constant pool slot");
                }
                infos.push(CpInfo::Reserved);
            }
        }

        trace!("parsed constant pool with {count} slots");
        Ok(Self { infos })
    }

    pub fn get(&self, index: CpIndex) -> Result<&CpInfo> {
        match self.infos.get(index.0 as usize) {
            None | Some(CpInfo::Reserved) => {
                bail!("invalid constant pool index {}", index.0)
            }
            Some(info) => Ok(info),
        }
    }

    pub fn utf8(&self, index: CpIndex) -> Result<&str> {
        match self.get(index)? {
            CpInfo::Utf8(value) => Ok(value),
            item => bail!("expected Utf8 at constant pool index {}, got {}", index.0, item.kind()),
        }
    }

    pub fn optional_utf8(&self, index: CpIndex) -> Result<Option<&str>> {
        if index.is_none() {
            return Ok(None);
        }
        self.utf8(index).map(Some)
    }

    pub fn class_name(&self, index: CpIndex) -> Result<&str> {
        match self.get(index)? {
            CpInfo::Class { name_index } => self.utf8(*name_index),
            item => bail!("expected Class at constant pool index {}, got {}", index.0, item.kind()),
        }
    }

    pub fn optional_class_name(&self, index: CpIndex) -> Result<Option<&str>> {
        if index.is_none() {
            return Ok(None);
        }
        self.class_name(index).map(Some)
    }

    pub fn name_and_type(&self, index: CpIndex) -> Result<(&str, &str)> {
        match self.get(index)? {
            CpInfo::NameAndType {
                name_index,
                descriptor_index,
            } => Ok((self.utf8(*name_index)?, self.utf8(*descriptor_index)?)),
            item => bail!(
                "expected NameAndType at constant pool index {}, got {}",
                index.0,
                item.kind()
            ),
        }
    }

    /// Resolves a field, method or interface method reference.
    pub fn member_ref(&self, index: CpIndex) -> Result<MemberRef<'_>> {
        let (class_index, name_and_type_index, field, interface) = match self.get(index)? {
            CpInfo::FieldRef {
                class_index,
                name_and_type_index,
            } => (*class_index, *name_and_type_index, true, false),
            CpInfo::MethodRef {
                class_index,
                name_and_type_index,
            } => (*class_index, *name_and_type_index, false, false),
            CpInfo::InterfaceMethodRef {
                class_index,
                name_and_type_index,
            } => (*class_index, *name_and_type_index, false, true),
            item => bail!(
                "expected member reference at constant pool index {}, got {}",
                index.0,
                item.kind()
            ),
        };

        let (name, descriptor) = self.name_and_type(name_and_type_index)?;
        Ok(MemberRef {
            owner: self.class_name(class_index)?,
            name,
            descriptor,
            field,
            interface,
        })
    }
}

pub struct MemberRef<'a> {
    pub owner: &'a str,
    pub name: &'a str,
    pub descriptor: &'a str,
    /// Referenced through a `Fieldref`.
    pub field: bool,
    /// Referenced through an `InterfaceMethodref`.
    pub interface: bool,
}

const UTF8_TAG: u8 = 1;
const INTEGER_TAG: u8 = 3;
const FLOAT_TAG: u8 = 4;
const LONG_TAG: u8 = 5;
const DOUBLE_TAG: u8 = 6;
const CLASS_TAG: u8 = 7;
const STRING_TAG: u8 = 8;
const FIELD_REF_TAG: u8 = 9;
const METHOD_REF_TAG: u8 = 10;
const INTERFACE_METHOD_REF_TAG: u8 = 11;
const NAME_AND_TYPE_TAG: u8 = 12;
const METHOD_HANDLE_TAG: u8 = 15;
const METHOD_TYPE_TAG: u8 = 16;
const DYNAMIC_TAG: u8 = 17;
const INVOKE_DYNAMIC_TAG: u8 = 18;
const MODULE_TAG: u8 = 19;
const PACKAGE_TAG: u8 = 20;

/// One constant pool slot. Floating point values keep their raw bits so that
/// entries can be hashed and NaN payloads survive a round trip.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CpInfo {
    /// Slot 0 and the slot following a Long or Double.
    Reserved,
    Utf8(String),
    Integer(i32),
    Float(u32),
    Long(i64),
    Double(u64),
    Class {
        name_index: CpIndex,
    },
    String {
        string_index: CpIndex,
    },
    FieldRef {
        class_index: CpIndex,
        name_and_type_index: CpIndex,
    },
    MethodRef {
        class_index: CpIndex,
        name_and_type_index: CpIndex,
    },
    InterfaceMethodRef {
        class_index: CpIndex,
        name_and_type_index: CpIndex,
    },
    NameAndType {
        name_index: CpIndex,
        descriptor_index: CpIndex,
    },
    MethodHandle {
        reference_kind: u8,
        reference_index: CpIndex,
    },
    MethodType {
        descriptor_index: CpIndex,
    },
    Dynamic {
        bootstrap_method_attr_index: u16,
        name_and_type_index: CpIndex,
    },
    InvokeDynamic {
        bootstrap_method_attr_index: u16,
        name_and_type_index: CpIndex,
    },
    Module {
        name_index: CpIndex,
    },
    Package {
        name_index: CpIndex,
    },
}

impl CpInfo {
    fn new(r: &mut Cursor) -> Result<Self> {
        let position = r.position();
        let tag = r.u1()?;

        Ok(match tag {
            UTF8_TAG => {
                let length = r.u2()?;
                Self::Utf8(mutf8::decode(r.bytes(length.into())?))
            }
            INTEGER_TAG => Self::Integer(r.i4()?),
            FLOAT_TAG => Self::Float(r.u4()?),
            LONG_TAG => Self::Long(r.i8()?),
            DOUBLE_TAG => Self::Double(r.i8()? as u64),
            CLASS_TAG => Self::Class {
                name_index: r.u2()?.into(),
            },
            STRING_TAG => Self::String {
                string_index: r.u2()?.into(),
            },
            FIELD_REF_TAG => Self::FieldRef {
                class_index: r.u2()?.into(),
                name_and_type_index: r.u2()?.into(),
            },
            METHOD_REF_TAG => Self::MethodRef {
                class_index: r.u2()?.into(),
                name_and_type_index: r.u2()?.into(),
            },
            INTERFACE_METHOD_REF_TAG => Self::InterfaceMethodRef {
                class_index: r.u2()?.into(),
                name_and_type_index: r.u2()?.into(),
            },
            NAME_AND_TYPE_TAG => Self::NameAndType {
                name_index: r.u2()?.into(),
                descriptor_index: r.u2()?.into(),
            },
            METHOD_HANDLE_TAG => Self::MethodHandle {
                reference_kind: r.u1()?,
                reference_index: r.u2()?.into(),
            },
            METHOD_TYPE_TAG => Self::MethodType {
                descriptor_index: r.u2()?.into(),
            },
            DYNAMIC_TAG => Self::Dynamic {
                bootstrap_method_attr_index: r.u2()?,
                name_and_type_index: r.u2()?.into(),
            },
            INVOKE_DYNAMIC_TAG => Self::InvokeDynamic {
                bootstrap_method_attr_index: r.u2()?,
                name_and_type_index: r.u2()?.into(),
            },
            MODULE_TAG => Self::Module {
                name_index: r.u2()?.into(),
            },
            PACKAGE_TAG => Self::Package {
                name_index: r.u2()?.into(),
            },
            _ => bail!("invalid constant pool info tag {tag} at offset {position}"),
        })
    }

    fn is_wide(&self) -> bool {
        matches!(self, Self::Long(_) | Self::Double(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Reserved => "Reserved",
            Self::Utf8(_) => "Utf8",
            Self::Integer(_) => "Integer",
            Self::Float(_) => "Float",
            Self::Long(_) => "Long",
            Self::Double(_) => "Double",
            Self::Class { .. } => "Class",
            Self::String { .. } => "String",
            Self::FieldRef { .. } => "Fieldref",
            Self::MethodRef { .. } => "Methodref",
            Self::InterfaceMethodRef { .. } => "InterfaceMethodref",
            Self::NameAndType { .. } => "NameAndType",
            Self::MethodHandle { .. } => "MethodHandle",
            Self::MethodType { .. } => "MethodType",
            Self::Dynamic { .. } => "Dynamic",
            Self::InvokeDynamic { .. } => "InvokeDynamic",
            Self::Module { .. } => "Module",
            Self::Package { .. } => "Package",
        }
    }

    fn write(&self, out: &mut Vec<u8>) -> Result<()> {
        match self {
            Self::Reserved => {}
            Self::Utf8(value) => {
                let bytes = mutf8::encode(value);
                let Ok(length) = u16::try_from(bytes.len()) else {
                    invalid!("string constant of {} bytes does not fit a Utf8 entry", bytes.len());
                };
                out.u1(UTF8_TAG);
                out.u2(length);
                out.extend_from_slice(&bytes);
            }
            Self::Integer(value) => {
                out.u1(INTEGER_TAG);
                out.i4(*value);
            }
            Self::Float(bits) => {
                out.u1(FLOAT_TAG);
                out.u4(*bits);
            }
            Self::Long(value) => {
                out.u1(LONG_TAG);
                out.i8(*value);
            }
            Self::Double(bits) => {
                out.u1(DOUBLE_TAG);
                out.i8(*bits as i64);
            }
            Self::Class { name_index } => {
                out.u1(CLASS_TAG);
                out.u2(name_index.0);
            }
            Self::String { string_index } => {
                out.u1(STRING_TAG);
                out.u2(string_index.0);
            }
            Self::FieldRef {
                class_index,
                name_and_type_index,
            } => {
                out.u1(FIELD_REF_TAG);
                out.u2(class_index.0);
                out.u2(name_and_type_index.0);
            }
            Self::MethodRef {
                class_index,
                name_and_type_index,
            } => {
                out.u1(METHOD_REF_TAG);
                out.u2(class_index.0);
                out.u2(name_and_type_index.0);
            }
            Self::InterfaceMethodRef {
                class_index,
                name_and_type_index,
            } => {
                out.u1(INTERFACE_METHOD_REF_TAG);
                out.u2(class_index.0);
                out.u2(name_and_type_index.0);
            }
            Self::NameAndType {
                name_index,
                descriptor_index,
            } => {
                out.u1(NAME_AND_TYPE_TAG);
                out.u2(name_index.0);
                out.u2(descriptor_index.0);
            }
            Self::MethodHandle {
                reference_kind,
                reference_index,
            } => {
                out.u1(METHOD_HANDLE_TAG);
                out.u1(*reference_kind);
                out.u2(reference_index.0);
            }
            Self::MethodType { descriptor_index } => {
                out.u1(METHOD_TYPE_TAG);
                out.u2(descriptor_index.0);
            }
            Self::Dynamic {
                bootstrap_method_attr_index,
                name_and_type_index,
            } => {
                out.u1(DYNAMIC_TAG);
                out.u2(*bootstrap_method_attr_index);
                out.u2(name_and_type_index.0);
            }
            Self::InvokeDynamic {
                bootstrap_method_attr_index,
                name_and_type_index,
            } => {
                out.u1(INVOKE_DYNAMIC_TAG);
                out.u2(*bootstrap_method_attr_index);
                out.u2(name_and_type_index.0);
            }
            Self::Module { name_index } => {
                out.u1(MODULE_TAG);
                out.u2(name_index.0);
            }
            Self::Package { name_index } => {
                out.u1(PACKAGE_TAG);
                out.u2(name_index.0);
            }
        }
        Ok(())
    }
}

/// Builds a fresh constant pool, deduplicating entries and handing out
/// indices in first-seen order.
#[derive(Debug)]
pub struct ConstantPoolBuilder {
    infos: Vec<CpInfo>,
    indices: HashMap<CpInfo, u16>,
}

impl Default for ConstantPoolBuilder {
    fn default() -> Self {
        Self {
            infos: vec![CpInfo::Reserved],
            indices: HashMap::new(),
        }
    }
}

impl ConstantPoolBuilder {
    pub fn len(&self) -> usize {
        self.infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.infos.len() == 1
    }

    fn add(&mut self, info: CpInfo) -> Result<CpIndex> {
        if let Some(index) = self.indices.get(&info) {
            return Ok(CpIndex(*index));
        }

        let wide = info.is_wide();
        let index = self.infos.len();
        let slots = if wide { 2 } else { 1 };
        if index + slots > u16::MAX as usize {
            invalid!("constant pool exceeds {} entries", u16::MAX - 1);
        }

        self.infos.push(info.clone());
        if wide {
            self.infos.push(CpInfo::Reserved);
        }
        self.indices.insert(info, index as u16);
        Ok(CpIndex(index as u16))
    }

    pub fn utf8(&mut self, value: &str) -> Result<CpIndex> {
        self.add(CpInfo::Utf8(value.to_owned()))
    }

    pub fn class(&mut self, name: &str) -> Result<CpIndex> {
        let name_index = self.utf8(name)?;
        self.add(CpInfo::Class { name_index })
    }

    pub fn string(&mut self, value: &str) -> Result<CpIndex> {
        let string_index = self.utf8(value)?;
        self.add(CpInfo::String { string_index })
    }

    pub fn integer(&mut self, value: i32) -> Result<CpIndex> {
        self.add(CpInfo::Integer(value))
    }

    pub fn float(&mut self, value: f32) -> Result<CpIndex> {
        self.add(CpInfo::Float(value.to_bits()))
    }

    pub fn long(&mut self, value: i64) -> Result<CpIndex> {
        self.add(CpInfo::Long(value))
    }

    pub fn double(&mut self, value: f64) -> Result<CpIndex> {
        self.add(CpInfo::Double(value.to_bits()))
    }

    pub fn name_and_type(&mut self, name: &str, descriptor: &str) -> Result<CpIndex> {
        let name_index = self.utf8(name)?;
        let descriptor_index = self.utf8(descriptor)?;
        self.add(CpInfo::NameAndType {
            name_index,
            descriptor_index,
        })
    }

    pub fn field_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> Result<CpIndex> {
        let class_index = self.class(owner)?;
        let name_and_type_index = self.name_and_type(name, descriptor)?;
        self.add(CpInfo::FieldRef {
            class_index,
            name_and_type_index,
        })
    }

    pub fn method_ref(
        &mut self,
        owner: &str,
        name: &str,
        descriptor: &str,
        interface: bool,
    ) -> Result<CpIndex> {
        let class_index = self.class(owner)?;
        let name_and_type_index = self.name_and_type(name, descriptor)?;
        self.add(if interface {
            CpInfo::InterfaceMethodRef {
                class_index,
                name_and_type_index,
            }
        } else {
            CpInfo::MethodRef {
                class_index,
                name_and_type_index,
            }
        })
    }

    pub fn method_handle(&mut self, reference_kind: u8, reference_index: CpIndex) -> Result<CpIndex> {
        self.add(CpInfo::MethodHandle {
            reference_kind,
            reference_index,
        })
    }

    pub fn method_type(&mut self, descriptor: &str) -> Result<CpIndex> {
        let descriptor_index = self.utf8(descriptor)?;
        self.add(CpInfo::MethodType { descriptor_index })
    }

    pub fn dynamic(&mut self, bootstrap: u16, name: &str, descriptor: &str) -> Result<CpIndex> {
        let name_and_type_index = self.name_and_type(name, descriptor)?;
        self.add(CpInfo::Dynamic {
            bootstrap_method_attr_index: bootstrap,
            name_and_type_index,
        })
    }

    pub fn invoke_dynamic(&mut self, bootstrap: u16, name: &str, descriptor: &str) -> Result<CpIndex> {
        let name_and_type_index = self.name_and_type(name, descriptor)?;
        self.add(CpInfo::InvokeDynamic {
            bootstrap_method_attr_index: bootstrap,
            name_and_type_index,
        })
    }

    /// Writes `constant_pool_count` followed by every entry.
    pub fn write(&self, out: &mut Vec<u8>) -> Result<()> {
        out.u2(self.infos.len() as u16);
        for info in &self.infos {
            info.write(out)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(bytes: &[u8], count: u16) -> Result<ConstantPool> {
        ConstantPool::new(&mut Cursor::new(bytes), count)
    }

    #[test]
    fn wide_entries_take_two_slots() {
        // #1 Long, #3 Utf8 "A", #4 Class #3
        let bytes = [
            5, 0, 0, 0, 0, 0, 0, 0, 7, //
            1, 0, 1, b'A', //
            7, 0, 3,
        ];
        let pool = parse(&bytes, 5).unwrap();
        assert_eq!(pool.infos[1], CpInfo::Long(7));
        assert_eq!(pool.infos[2], CpInfo::Reserved);
        assert_eq!(pool.class_name(CpIndex(4)).unwrap(), "A");
        assert!(pool.get(CpIndex(2)).is_err());
    }

    #[test]
    fn rejects_unknown_tag() {
        let err = parse(&[2, 0, 0], 2).unwrap_err();
        assert!(err.to_string().contains("tag 2"));
    }

    #[test]
    fn rejects_out_of_range_and_wrong_kind() {
        let pool = parse(&[1, 0, 1, b'A'], 2).unwrap();
        assert!(pool.get(CpIndex(0)).is_err());
        assert!(pool.get(CpIndex(2)).is_err());
        assert!(pool.class_name(CpIndex(1)).is_err());
    }

    #[test]
    fn wide_entry_in_last_slot_is_malformed() {
        assert!(parse(&[6, 0, 0, 0, 0, 0, 0, 0, 0], 2).is_err());
    }

    #[test]
    fn builder_deduplicates_in_first_seen_order() {
        let mut cp = ConstantPoolBuilder::default();
        let object = cp.class("java/lang/Object").unwrap();
        let long = cp.long(1).unwrap();
        let again = cp.class("java/lang/Object").unwrap();
        let after = cp.utf8("x").unwrap();

        assert_eq!(object, CpIndex(2));
        assert_eq!(again, object);
        assert_eq!(long, CpIndex(3));
        assert_eq!(after, CpIndex(5));
    }

    #[test]
    fn builder_output_parses_back() {
        let mut cp = ConstantPoolBuilder::default();
        cp.method_ref("a/B", "run", "()V", true).unwrap();
        cp.double(f64::NAN).unwrap();
        cp.string("s\0").unwrap();

        let mut out = Vec::new();
        cp.write(&mut out).unwrap();

        let mut r = Cursor::new(&out);
        let count = r.u2().unwrap();
        let pool = ConstantPool::new(&mut r, count).unwrap();
        assert!(r.is_empty());

        let member = pool.member_ref(CpIndex(6)).unwrap();
        assert_eq!((member.owner, member.name, member.descriptor), ("a/B", "run", "()V"));
        assert!(member.interface);
        assert_eq!(pool.infos[7], CpInfo::Double(f64::NAN.to_bits()));
    }
}
