use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use classfile::TypeHierarchy;
use common::ClassIdentifier;
use tracing::{trace, warn};

use crate::ClassPath;

const OBJECT: &str = "java/lang/Object";

#[derive(Clone, Debug)]
struct Supertype {
    super_name: Option<String>,
    interface: bool,
}

/// Answers common super class questions by loading classes from a class
/// path. Classes that cannot be loaded are treated as direct subclasses of
/// `java/lang/Object`.
pub struct ClassHierarchy {
    class_path: Mutex<ClassPath>,
    supertypes: Mutex<HashMap<String, Supertype>>,
}

impl ClassHierarchy {
    pub fn new(class_path: ClassPath) -> Self {
        Self {
            class_path: Mutex::new(class_path),
            supertypes: Mutex::new(HashMap::new()),
        }
    }

    fn supertype(&self, name: &str) -> Supertype {
        let mut supertypes = self.supertypes.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(supertype) = supertypes.get(name) {
            return supertype.clone();
        }

        let supertype = self.load(name);
        supertypes.insert(name.to_string(), supertype.clone());
        supertype
    }

    fn load(&self, name: &str) -> Supertype {
        let unknown = Supertype {
            super_name: (name != OBJECT).then(|| OBJECT.to_string()),
            interface: false,
        };

        let identifier = match ClassIdentifier::parse(name) {
            Ok(identifier) => identifier,
            Err(err) => {
                warn!("{err}");
                return unknown;
            }
        };

        let mut class_path = self.class_path.lock().unwrap_or_else(PoisonError::into_inner);
        match class_path.from_runtime(&identifier) {
            Ok(Some(class)) => Supertype {
                super_name: class.super_name,
                interface: class.access.is_interface(),
            },
            Ok(None) => {
                warn!("class {identifier} is not on the class path, assuming it extends {OBJECT}");
                unknown
            }
            Err(err) => {
                warn!("{err:#}, assuming {identifier} extends {OBJECT}");
                unknown
            }
        }
    }

    /// `name` followed by its super classes, `java/lang/Object` last.
    fn ancestors(&self, name: &str) -> Vec<String> {
        let mut ancestors = vec![name.to_string()];
        let mut current = name.to_string();
        while let Some(super_name) = self.supertype(&current).super_name {
            // a cycle can only come from broken class files
            if ancestors.contains(&super_name) {
                break;
            }
            ancestors.push(super_name.clone());
            current = super_name;
        }
        if ancestors.last().map(String::as_str) != Some(OBJECT) {
            ancestors.push(OBJECT.to_string());
        }
        ancestors
    }
}

impl TypeHierarchy for ClassHierarchy {
    fn common_super_class(&self, left: &str, right: &str) -> String {
        if self.supertype(left).interface || self.supertype(right).interface {
            return OBJECT.to_string();
        }

        let right_ancestors = self.ancestors(right);
        let common = self
            .ancestors(left)
            .into_iter()
            .find(|ancestor| right_ancestors.contains(ancestor))
            .unwrap_or_else(|| OBJECT.to_string());
        trace!("common super class of {left} and {right} is {common}");
        common
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use classfile::{
        ClassRecord, DecodeOptions, EncodeOptions,
        class::{
            access_flags::AccessFlags,
            frame::{Frames, VerificationType},
            instruction::{Instruction, Label},
            method::{Code, MethodRecord},
        },
        opcodes::*,
    };

    use super::*;
    use crate::{
        Directory,
        tests::{init_tracing, temp_dir},
    };

    fn class_bytes(name: &str, super_name: Option<&str>, access: AccessFlags) -> Vec<u8> {
        let mut class = ClassRecord::new(name);
        class.super_name = super_name.map(str::to_string);
        class.access = access;
        classfile::encode(&class, EncodeOptions::none()).unwrap()
    }

    /// A class path holding a cut down `java.lang` number hierarchy.
    fn numbers(name: &str) -> ClassHierarchy {
        let root = temp_dir(name);
        fs::create_dir_all(root.join("java/lang")).unwrap();
        let classes = [
            ("java/lang/Object", None, AccessFlags::PUBLIC),
            ("java/lang/Number", Some(OBJECT), AccessFlags::PUBLIC | AccessFlags::ABSTRACT),
            ("java/lang/Integer", Some("java/lang/Number"), AccessFlags::PUBLIC | AccessFlags::FINAL),
            ("java/lang/Long", Some("java/lang/Number"), AccessFlags::PUBLIC | AccessFlags::FINAL),
            ("java/lang/String", Some(OBJECT), AccessFlags::PUBLIC | AccessFlags::FINAL),
            (
                "java/lang/Comparable",
                Some(OBJECT),
                AccessFlags::PUBLIC | AccessFlags::INTERFACE | AccessFlags::ABSTRACT,
            ),
        ];
        for (name, super_name, access) in classes {
            fs::write(root.join(format!("{name}.class")), class_bytes(name, super_name, access)).unwrap();
        }
        ClassHierarchy::new(ClassPath::new(vec![Box::new(Directory::new(root))]))
    }

    #[test]
    fn siblings_meet_at_their_parent() {
        let hierarchy = numbers("hierarchy-siblings");
        assert_eq!(
            hierarchy.common_super_class("java/lang/Integer", "java/lang/Long"),
            "java/lang/Number"
        );
        assert_eq!(
            hierarchy.common_super_class("java/lang/Number", "java/lang/Long"),
            "java/lang/Number"
        );
        assert_eq!(hierarchy.common_super_class("java/lang/Integer", "java/lang/String"), OBJECT);
    }

    #[test]
    fn interfaces_and_unknown_classes_meet_at_object() {
        init_tracing();
        let hierarchy = numbers("hierarchy-unknown");
        assert_eq!(
            hierarchy.common_super_class("java/lang/Comparable", "java/lang/String"),
            OBJECT
        );
        assert_eq!(hierarchy.common_super_class("a/Missing", "java/lang/Long"), OBJECT);
    }

    #[test]
    fn computed_frames_use_loaded_classes() {
        // static Number pick(boolean b) { return b ? Integer.valueOf(1) : Long.valueOf(1); }
        let mut method = MethodRecord::new(AccessFlags::PUBLIC | AccessFlags::STATIC, "pick", "(Z)Ljava/lang/Number;");
        method.code = Some(Code::new(vec![
            Instruction::Var {
                opcode: ILOAD,
                index: 0,
            },
            Instruction::Jump {
                opcode: IFEQ,
                target: Label(5),
            },
            Instruction::Simple(ICONST_1),
            Instruction::Method {
                opcode: INVOKESTATIC,
                owner: "java/lang/Integer".to_string(),
                name: "valueOf".to_string(),
                descriptor: "(I)Ljava/lang/Integer;".to_string(),
                interface: false,
            },
            Instruction::Jump {
                opcode: GOTO,
                target: Label(7),
            },
            Instruction::Simple(LCONST_1),
            Instruction::Method {
                opcode: INVOKESTATIC,
                owner: "java/lang/Long".to_string(),
                name: "valueOf".to_string(),
                descriptor: "(J)Ljava/lang/Long;".to_string(),
                interface: false,
            },
            Instruction::Simple(ARETURN),
        ]));
        let mut class = ClassRecord::new("a/Pick");
        class.methods.push(method);

        let hierarchy = numbers("hierarchy-frames");
        let bytes = classfile::encode_with(&class, EncodeOptions::frames(), &hierarchy).unwrap();
        let options = DecodeOptions {
            expand_frames: true,
            ..DecodeOptions::default()
        };
        let decoded = classfile::decode(&bytes, options).unwrap();

        let Some(Frames::Expanded(frames)) = &decoded.methods[0].code.as_ref().unwrap().frames else {
            panic!("frames were not computed");
        };
        let join = frames.iter().find(|frame| frame.target == Label(7)).unwrap();
        assert_eq!(join.stack, vec![VerificationType::Object("java/lang/Number".to_string())]);
    }
}
