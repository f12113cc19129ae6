//! The "modified UTF-8" used by `CONSTANT_Utf8` entries: NUL is written as
//! `C0 80` and supplementary characters as two three-byte surrogates.

/// Decodes modified UTF-8. Byte sequences that are not valid in the encoding
/// and unpaired surrogates become U+FFFD.
pub fn decode(bytes: &[u8]) -> String {
    if bytes.iter().all(|b| (1..0x80).contains(b)) {
        // plain ASCII, by far the common case
        return bytes.iter().map(|&b| b as char).collect();
    }

    let mut units = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        let continuation = |k: usize| bytes.get(i + k).filter(|&&c| c & 0xC0 == 0x80).copied();

        if b & 0x80 == 0 {
            units.push(b as u16);
            i += 1;
        } else if b & 0xE0 == 0xC0 {
            match continuation(1) {
                Some(c) => {
                    units.push(((b as u16 & 0x1F) << 6) | (c as u16 & 0x3F));
                    i += 2;
                }
                None => {
                    units.push(0xFFFD);
                    i += 1;
                }
            }
        } else if b & 0xF0 == 0xE0 {
            match (continuation(1), continuation(2)) {
                (Some(c1), Some(c2)) => {
                    units.push(
                        ((b as u16 & 0x0F) << 12) | ((c1 as u16 & 0x3F) << 6) | (c2 as u16 & 0x3F),
                    );
                    i += 3;
                }
                _ => {
                    units.push(0xFFFD);
                    i += 1;
                }
            }
        } else {
            units.push(0xFFFD);
            i += 1;
        }
    }

    String::from_utf16_lossy(&units)
}

pub fn encode(value: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    for unit in value.encode_utf16() {
        match unit {
            0x0001..=0x007F => out.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                out.push(0xC0 | (unit >> 6) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                out.push(0xE0 | (unit >> 12) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    out
}
