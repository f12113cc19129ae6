use std::panic::{self, AssertUnwindSafe};

use tracing::debug;

use crate::{
    magic::is_class,
    reader::{DecodeOptions, decode},
};

/// Whether `bytes` decode as a class file.
///
/// Frames are not looked at. Every failure, a panic included, is reported
/// as `false`.
pub fn is_valid(bytes: &[u8]) -> bool {
    if !is_class(bytes) {
        return false;
    }

    let options = DecodeOptions {
        skip_frames: true,
        ..DecodeOptions::default()
    };
    match panic::catch_unwind(AssertUnwindSafe(|| decode(bytes, options))) {
        Ok(Ok(_)) => true,
        Ok(Err(err)) => {
            debug!("invalid class file: {err}");
            false
        }
        Err(_) => {
            debug!("decoding panicked");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ClassBuilder, minimal_class};

    #[test]
    fn accepts_well_formed_class() {
        assert!(is_valid(&minimal_class()));
    }

    #[test]
    fn rejects_without_magic() {
        assert!(!is_valid(&[]));
        assert!(!is_valid(&[0xCA, 0xFE, 0xBA, 0xBE]));
        assert!(!is_valid(b"not a class file"));
    }

    #[test]
    fn rejects_garbage_after_magic() {
        let mut bytes = minimal_class();
        bytes.truncate(12);
        assert!(!is_valid(&bytes));

        let mut bytes = ClassBuilder::new("A").build();
        // constant pool count of zero
        bytes[8] = 0;
        bytes[9] = 0;
        assert!(!is_valid(&bytes));
    }
}
