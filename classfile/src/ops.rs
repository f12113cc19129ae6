//! Whole-class helpers built on the reader and writer.

use std::borrow::Cow;

use tracing::{debug, warn};

use crate::{
    class::{ClassRecord, V1_8, field::FieldRecord},
    error::Result,
    reader::{DecodeOptions, decode, decode_access},
    writer::{EncodeOptions, encode},
};

/// Inputs this short cannot hold any debug information.
const STRIP_THRESHOLD: usize = 10;

/// Access flags of the class in `bytes`, 0 if they cannot be read.
pub fn get_access(bytes: &[u8]) -> u16 {
    match decode_access(bytes) {
        Ok(access) => access.bits(),
        Err(err) => {
            warn!("cannot read class access flags: {err}");
            0
        }
    }
}

/// Major version straight from the header, [`V1_8`] for inputs too short
/// to have one.
pub fn get_version(bytes: &[u8]) -> u16 {
    match bytes.get(6..8) {
        Some(&[high, low]) => u16::from_be_bytes([high, low]),
        _ => V1_8,
    }
}

/// Re-encodes `bytes` without source files, line numbers, local variable
/// tables and method parameter names. Frames and sizes are kept.
pub fn strip_debug(bytes: &[u8]) -> Result<Cow<'_, [u8]>> {
    if bytes.len() <= STRIP_THRESHOLD {
        return Ok(Cow::Borrowed(bytes));
    }

    let options = DecodeOptions {
        skip_debug: true,
        expand_frames: true,
        ..DecodeOptions::default()
    };
    let class = decode(bytes, options)?;
    let stripped = encode(&class, EncodeOptions::none())?;
    debug!(
        "stripped debug information from {} ({} -> {} bytes)",
        class.name,
        bytes.len(),
        stripped.len()
    );
    Ok(Cow::Owned(stripped))
}

/// Copies every annotation list `from` has onto `to`. Lists absent on
/// `from` stay as they are on `to`.
pub fn copy_field_metadata(from: &FieldRecord, to: &mut FieldRecord) {
    let (source, target) = (&from.annotations, &mut to.annotations);
    if let Some(visible) = &source.visible {
        target.visible = Some(visible.clone());
    }
    if let Some(invisible) = &source.invisible {
        target.invisible = Some(invisible.clone());
    }
    if let Some(visible_type) = &source.visible_type {
        target.visible_type = Some(visible_type.clone());
    }
    if let Some(invisible_type) = &source.invisible_type {
        target.invisible_type = Some(invisible_type.clone());
    }
}

/// Decodes a class into a record, the same as [`decode`].
pub fn get_node(bytes: &[u8], options: DecodeOptions) -> Result<ClassRecord> {
    decode(bytes, options)
}

/// Encodes a record without a class hierarchy, the same as [`encode`].
pub fn to_code(class: &ClassRecord, options: EncodeOptions) -> Result<Vec<u8>> {
    encode(class, options)
}
