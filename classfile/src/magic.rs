/// The four bytes every class file starts with.
pub const MAGIC: u32 = 0xCAFEBABE;

/// Checks for the class file magic prefix.
///
/// Only inputs strictly longer than the magic itself are accepted, a bare
/// `CA FE BA BE` is not a class.
pub fn is_class(data: &[u8]) -> bool {
    data.len() > 4 && u32::from_be_bytes([data[0], data[1], data[2], data[3]]) == MAGIC
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_magic_with_payload() {
        assert!(is_class(&[0xCA, 0xFE, 0xBA, 0xBE, 0x00]));
    }

    #[test]
    fn rejects_bare_magic() {
        assert!(!is_class(&[0xCA, 0xFE, 0xBA, 0xBE]));
    }

    #[test]
    fn rejects_short_input() {
        assert!(!is_class(&[]));
        assert!(!is_class(&[0xCA, 0xFE, 0xBA]));
    }

    #[test]
    fn rejects_wrong_magic() {
        assert!(!is_class(&[0xCA, 0xFE, 0xBA, 0xBF, 0x00, 0x00]));
        assert!(!is_class(b"PK\x03\x04\x14\x00"));
    }
}
