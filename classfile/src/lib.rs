//! Reads, writes and transforms JVM class files.
//!
//! Class bytes decode into a [`ClassRecord`] in which every constant pool
//! reference is resolved and instructions branch to labels, so a record can
//! be edited freely and encoded again with a freshly built constant pool.

pub mod analysis;
pub mod class;
pub mod error;
pub mod frame;
pub mod magic;
pub mod mutf8;
pub mod opcodes;
pub mod ops;
pub mod reader;
pub mod util;
pub mod validate;
pub mod writer;

#[cfg(test)]
mod test_support;

pub use analysis::{ObjectHierarchy, TypeHierarchy};
pub use class::ClassRecord;
pub use error::{ClassFileError, Result};
pub use magic::is_class;
pub use ops::{copy_field_metadata, get_access, get_node, get_version, strip_debug, to_code};
pub use reader::{DecodeOptions, decode, decode_access};
pub use validate::is_valid;
pub use writer::{EncodeOptions, encode, encode_with};
