use crate::error::{Result, bail};

#[derive(Debug, PartialEq)]
pub struct FieldDescriptor {
    pub field_type: FieldType,
}

impl FieldDescriptor {
    pub fn new(raw: &str) -> Result<Self> {
        let (field_type, rest) = FieldType::parse(raw)?;
        if !rest.is_empty() {
            bail!("trailing characters in field descriptor {raw}");
        }
        Ok(Self { field_type })
    }
}

#[derive(Debug, PartialEq)]
pub struct MethodDescriptor {
    pub return_descriptor: ReturnDescriptor,
    pub parameters: Vec<FieldType>,
}

impl MethodDescriptor {
    pub fn new(raw: &str) -> Result<Self> {
        let Some(mut rest) = raw.strip_prefix('(') else {
            bail!("invalid method descriptor {raw}: no '('");
        };

        let mut parameters = Vec::new();
        loop {
            if let Some(after) = rest.strip_prefix(')') {
                rest = after;
                break;
            }
            let (parameter, after) = FieldType::parse(rest)?;
            parameters.push(parameter);
            rest = after;
        }

        let return_descriptor = if rest == "V" {
            ReturnDescriptor::Void
        } else {
            let (field_type, after) = FieldType::parse(rest)?;
            if !after.is_empty() {
                bail!("trailing characters in method descriptor {raw}");
            }
            ReturnDescriptor::FieldType(field_type)
        };

        Ok(Self {
            return_descriptor,
            parameters,
        })
    }

    /// Local variable slots taken by the parameters, `this` excluded.
    pub fn parameter_slots(&self) -> usize {
        self.parameters.iter().map(FieldType::size).sum()
    }
}

#[derive(Debug, PartialEq)]
pub enum ReturnDescriptor {
    Void,
    FieldType(FieldType),
}

#[derive(Debug, PartialEq, Clone)]
pub enum FieldType {
    BaseType(BaseType),
    ObjectType { class_name: String },
    ComponentType(Box<FieldType>),
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum BaseType {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
}

impl FieldType {
    fn parse(raw: &str) -> Result<(Self, &str)> {
        let dimensions = raw.bytes().take_while(|&b| b == b'[').count();
        if dimensions > 255 {
            bail!("array type with more than 255 dimensions in descriptor");
        }
        if dimensions > 0 {
            let (mut field_type, rest) = Self::parse(&raw[dimensions..])?;
            for _ in 0..dimensions {
                field_type = Self::ComponentType(Box::new(field_type));
            }
            return Ok((field_type, rest));
        }

        let Some(first) = raw.chars().next() else {
            bail!("unexpected end of descriptor");
        };
        let rest = &raw[first.len_utf8()..];

        Ok(match first {
            'B' => (Self::BaseType(BaseType::Byte), rest),
            'C' => (Self::BaseType(BaseType::Char), rest),
            'D' => (Self::BaseType(BaseType::Double), rest),
            'F' => (Self::BaseType(BaseType::Float), rest),
            'I' => (Self::BaseType(BaseType::Int), rest),
            'J' => (Self::BaseType(BaseType::Long), rest),
            'S' => (Self::BaseType(BaseType::Short), rest),
            'Z' => (Self::BaseType(BaseType::Boolean), rest),
            'L' => {
                let Some(end) = rest.find(';') else {
                    bail!("unterminated object type in descriptor {raw}");
                };
                if end == 0 {
                    bail!("empty class name in descriptor {raw}");
                }
                (
                    Self::ObjectType {
                        class_name: rest[..end].to_string(),
                    },
                    &rest[end + 1..],
                )
            }
            _ => bail!("unknown field type in descriptor {raw}"),
        })
    }

    /// Number of local variable or operand stack slots a value takes.
    pub fn size(&self) -> usize {
        match self {
            Self::BaseType(BaseType::Long | BaseType::Double) => 2,
            _ => 1,
        }
    }

    /// The descriptor string of this type.
    pub fn descriptor(&self) -> String {
        match self {
            Self::BaseType(base) => base.descriptor().to_string(),
            Self::ObjectType { class_name } => format!("L{class_name};"),
            Self::ComponentType(component) => format!("[{}", component.descriptor()),
        }
    }
}

impl BaseType {
    pub fn descriptor(self) -> char {
        match self {
            Self::Byte => 'B',
            Self::Char => 'C',
            Self::Double => 'D',
            Self::Float => 'F',
            Self::Int => 'I',
            Self::Long => 'J',
            Self::Short => 'S',
            Self::Boolean => 'Z',
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_descriptor() {
        let descriptor = MethodDescriptor::new("(IDLjava/lang/Thread;)Ljava/lang/Object;").unwrap();
        assert_eq!(
            descriptor.parameters,
            vec![
                FieldType::BaseType(BaseType::Int),
                FieldType::BaseType(BaseType::Double),
                FieldType::ObjectType {
                    class_name: "java/lang/Thread".to_string()
                }
            ]
        );

        assert_eq!(
            descriptor.return_descriptor,
            ReturnDescriptor::FieldType(FieldType::ObjectType {
                class_name: "java/lang/Object".to_string()
            })
        );
        assert_eq!(descriptor.parameter_slots(), 4);
    }

    #[test]
    fn method_descriptor_arrays() {
        let descriptor = MethodDescriptor::new("([[[D)V").unwrap();
        assert_eq!(
            descriptor.parameters,
            vec![FieldType::ComponentType(Box::new(
                FieldType::ComponentType(Box::new(FieldType::ComponentType(Box::new(
                    FieldType::BaseType(BaseType::Double)
                ))))
            ))]
        );

        assert_eq!(descriptor.return_descriptor, ReturnDescriptor::Void);
    }

    #[test]
    fn object_parameters_followed_by_more() {
        let descriptor = MethodDescriptor::new("(Ljava/lang/String;[Ljava/lang/Object;J)V").unwrap();
        assert_eq!(descriptor.parameters.len(), 3);
        assert_eq!(descriptor.parameters[1].descriptor(), "[Ljava/lang/Object;");
        assert_eq!(descriptor.parameter_slots(), 4);
    }

    #[test]
    fn rejects_garbage() {
        assert!(MethodDescriptor::new("V").is_err());
        assert!(MethodDescriptor::new("(Ljava/lang/String)V").is_err());
        assert!(MethodDescriptor::new("()VV").is_err());
        assert!(FieldDescriptor::new("Q").is_err());
        assert!(FieldDescriptor::new("II").is_err());
    }
}
