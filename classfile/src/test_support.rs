//! Hand-assembled class files for tests, independent of the writer.

use std::collections::HashMap;

use crate::{class::access_flags::AccessFlags, magic::MAGIC, opcodes::RETURN, util::Out};

#[derive(Default)]
struct Pool {
    count: u16,
    bytes: Vec<u8>,
    utf8: HashMap<String, u16>,
    classes: HashMap<String, u16>,
}

impl Pool {
    fn next(&mut self) -> u16 {
        self.count += 1;
        self.count
    }

    fn utf8(&mut self, value: &str) -> u16 {
        if let Some(index) = self.utf8.get(value) {
            return *index;
        }
        let index = self.next();
        self.bytes.u1(1);
        self.bytes.u2(value.len() as u16);
        self.bytes.extend_from_slice(value.as_bytes());
        self.utf8.insert(value.to_string(), index);
        index
    }

    fn class(&mut self, name: &str) -> u16 {
        if let Some(index) = self.classes.get(name) {
            return *index;
        }
        let name_index = self.utf8(name);
        let index = self.next();
        self.bytes.u1(7);
        self.bytes.u2(name_index);
        self.classes.insert(name.to_string(), index);
        index
    }
}

struct Local {
    start: u16,
    length: u16,
    name: String,
    descriptor: String,
    index: u16,
}

#[derive(Default)]
struct Method {
    name: String,
    descriptor: String,
    bytecode: Vec<u8>,
    lines: Vec<(u16, u16)>,
    local_variables: Vec<Local>,
    local_variable_types: Vec<Local>,
    stack_map: Option<Vec<u8>>,
    parameters: Vec<(String, u16)>,
}

/// Builder for small class files with a `java/lang/Object` super class.
pub struct ClassBuilder {
    name: String,
    major_version: u16,
    access: AccessFlags,
    methods: Vec<Method>,
    source_file: Option<String>,
    attributes: Vec<(String, Vec<u8>)>,
}

impl ClassBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            major_version: 52,
            access: AccessFlags::PUBLIC | AccessFlags::SUPER,
            methods: Vec::new(),
            source_file: None,
            attributes: Vec::new(),
        }
    }

    pub fn version(mut self, major_version: u16) -> Self {
        self.major_version = major_version;
        self
    }

    pub fn access(mut self, access: AccessFlags) -> Self {
        self.access = access;
        self
    }

    /// A public method with `max_stack` and `max_locals` of 1. `lines`
    /// pairs bytecode offsets with line numbers.
    pub fn method(mut self, name: &str, descriptor: &str, bytecode: &[u8], lines: &[(u16, u16)]) -> Self {
        self.methods.push(Method {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            bytecode: bytecode.to_vec(),
            lines: lines.to_vec(),
            ..Method::default()
        });
        self
    }

    fn last_method(&mut self) -> &mut Method {
        self.methods.last_mut().expect("add a method first")
    }

    /// A `LocalVariableTable` entry of the last method.
    pub fn local_variable(mut self, start: u16, length: u16, name: &str, descriptor: &str, index: u16) -> Self {
        self.last_method().local_variables.push(Local {
            start,
            length,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            index,
        });
        self
    }

    /// A `LocalVariableTypeTable` entry of the last method.
    pub fn local_variable_type(mut self, start: u16, length: u16, name: &str, signature: &str, index: u16) -> Self {
        self.last_method().local_variable_types.push(Local {
            start,
            length,
            name: name.to_string(),
            descriptor: signature.to_string(),
            index,
        });
        self
    }

    /// The `StackMapTable` of the last method, entries included but not
    /// the attribute header.
    pub fn stack_map(mut self, info: &[u8]) -> Self {
        self.last_method().stack_map = Some(info.to_vec());
        self
    }

    /// A `MethodParameters` entry of the last method.
    pub fn parameter(mut self, name: &str, access: AccessFlags) -> Self {
        self.last_method().parameters.push((name.to_string(), access.bits()));
        self
    }

    pub fn source_file(mut self, source_file: &str) -> Self {
        self.source_file = Some(source_file.to_string());
        self
    }

    pub fn class_attribute(mut self, name: &str, info: &[u8]) -> Self {
        self.attributes.push((name.to_string(), info.to_vec()));
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut pool = Pool::default();
        let mut body = Vec::new();

        body.u2(self.access.bits());
        body.u2(pool.class(&self.name));
        body.u2(pool.class("java/lang/Object"));
        body.u2(0); // interfaces
        body.u2(0); // fields

        body.u2(self.methods.len() as u16);
        for method in &self.methods {
            body.u2(AccessFlags::PUBLIC.bits());
            body.u2(pool.utf8(&method.name));
            body.u2(pool.utf8(&method.descriptor));
            body.u2(1 + u16::from(!method.parameters.is_empty()));

            let mut code = Vec::new();
            code.u2(1);
            code.u2(1);
            code.u4(method.bytecode.len() as u32);
            code.extend_from_slice(&method.bytecode);
            code.u2(0); // exception table

            let mut attributes: Vec<(u16, Vec<u8>)> = Vec::new();
            if !method.lines.is_empty() {
                let mut table = Vec::new();
                table.u2(method.lines.len() as u16);
                for (start, line) in &method.lines {
                    table.u2(*start);
                    table.u2(*line);
                }
                attributes.push((pool.utf8("LineNumberTable"), table));
            }
            for (name, locals) in [
                ("LocalVariableTable", &method.local_variables),
                ("LocalVariableTypeTable", &method.local_variable_types),
            ] {
                if locals.is_empty() {
                    continue;
                }
                let mut table = Vec::new();
                table.u2(locals.len() as u16);
                for local in locals {
                    table.u2(local.start);
                    table.u2(local.length);
                    table.u2(pool.utf8(&local.name));
                    table.u2(pool.utf8(&local.descriptor));
                    table.u2(local.index);
                }
                attributes.push((pool.utf8(name), table));
            }
            if let Some(stack_map) = &method.stack_map {
                attributes.push((pool.utf8("StackMapTable"), stack_map.clone()));
            }

            code.u2(attributes.len() as u16);
            for (name, info) in attributes {
                code.u2(name);
                code.u4(info.len() as u32);
                code.extend_from_slice(&info);
            }

            body.u2(pool.utf8("Code"));
            body.u4(code.len() as u32);
            body.extend_from_slice(&code);

            if !method.parameters.is_empty() {
                body.u2(pool.utf8("MethodParameters"));
                body.u4(1 + 4 * method.parameters.len() as u32);
                body.u1(method.parameters.len() as u8);
                for (name, access) in &method.parameters {
                    body.u2(pool.utf8(name));
                    body.u2(*access);
                }
            }
        }

        let attribute_count = self.attributes.len() + usize::from(self.source_file.is_some());
        body.u2(attribute_count as u16);
        if let Some(source_file) = &self.source_file {
            body.u2(pool.utf8("SourceFile"));
            body.u4(2);
            body.u2(pool.utf8(source_file));
        }
        for (name, info) in &self.attributes {
            body.u2(pool.utf8(name));
            body.u4(info.len() as u32);
            body.extend_from_slice(info);
        }

        let mut out = Vec::new();
        out.u4(MAGIC);
        out.u2(0);
        out.u2(self.major_version);
        out.u2(pool.count + 1);
        out.extend_from_slice(&pool.bytes);
        out.extend_from_slice(&body);
        out
    }
}

/// `public class Hello` with a single `public void run() { return; }`.
pub fn minimal_class() -> Vec<u8> {
    ClassBuilder::new("Hello").method("run", "()V", &[RETURN], &[]).build()
}

/// Routes `tracing` output of a test through the test harness, filtered by
/// `RUST_LOG`.
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_test_writer())
        .with(EnvFilter::from_default_env())
        .try_init();
}
