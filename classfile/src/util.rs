use crate::error::{Result, bail};

/// Big-endian reader over an in-memory class file.
///
/// Every read is bounds checked; running off the end is reported as a
/// malformed class file together with the offending offset.
#[derive(Clone, Debug)]
pub struct Cursor<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn set_position(&mut self, position: usize) {
        self.position = position;
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.position)
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn bytes(&mut self, length: usize) -> Result<&'a [u8]> {
        let end = match self.position.checked_add(length) {
            Some(end) if end <= self.bytes.len() => end,
            _ => bail!(
                "unexpected end of data at offset {} (wanted {length} bytes, {} left)",
                self.position,
                self.remaining()
            ),
        };

        let slice = &self.bytes[self.position..end];
        self.position = end;
        Ok(slice)
    }

    pub fn skip(&mut self, length: usize) -> Result<()> {
        self.bytes(length).map(|_| ())
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0; N];
        buf.copy_from_slice(self.bytes(N)?);
        Ok(buf)
    }

    pub fn u1(&mut self) -> Result<u8> {
        Ok(self.array::<1>()?[0])
    }

    pub fn u2(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.array()?))
    }

    pub fn u4(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.array()?))
    }

    pub fn i1(&mut self) -> Result<i8> {
        Ok(i8::from_be_bytes(self.array()?))
    }

    pub fn i2(&mut self) -> Result<i16> {
        Ok(i16::from_be_bytes(self.array()?))
    }

    pub fn i4(&mut self) -> Result<i32> {
        Ok(i32::from_be_bytes(self.array()?))
    }

    pub fn i8(&mut self) -> Result<i64> {
        Ok(i64::from_be_bytes(self.array()?))
    }

    /// Slices off a length-prefixed sub-structure as its own cursor.
    pub fn sub(&mut self, length: usize) -> Result<Cursor<'a>> {
        Ok(Cursor::new(self.bytes(length)?))
    }
}

/// Big-endian writes onto a growable buffer.
pub trait Out {
    fn u1(&mut self, value: u8);
    fn u2(&mut self, value: u16);
    fn u4(&mut self, value: u32);
    fn i4(&mut self, value: i32);
    fn i8(&mut self, value: i64);
}

impl Out for Vec<u8> {
    fn u1(&mut self, value: u8) {
        self.push(value);
    }

    fn u2(&mut self, value: u16) {
        self.extend_from_slice(&value.to_be_bytes());
    }

    fn u4(&mut self, value: u32) {
        self.extend_from_slice(&value.to_be_bytes());
    }

    fn i4(&mut self, value: i32) {
        self.extend_from_slice(&value.to_be_bytes());
    }

    fn i8(&mut self, value: i64) {
        self.extend_from_slice(&value.to_be_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClassFileError;

    #[test]
    fn reads_big_endian() {
        let mut r = Cursor::new(&[0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x34, 0xFF]);
        assert_eq!(r.u4().unwrap(), 0xCAFEBABE);
        assert_eq!(r.u2().unwrap(), 52);
        assert_eq!(r.i1().unwrap(), -1);
        assert!(r.is_empty());
    }

    #[test]
    fn truncated_read_reports_offset() {
        let mut r = Cursor::new(&[0x00, 0x01, 0x02]);
        r.u2().unwrap();
        let err = r.u4().unwrap_err();
        assert!(matches!(err, ClassFileError::MalformedClassFile(ref msg) if msg.contains("offset 2")));
        // a failed read does not move the cursor
        assert_eq!(r.position(), 2);
    }

    #[test]
    fn huge_length_does_not_overflow() {
        let mut r = Cursor::new(&[0x00]);
        r.u1().unwrap();
        assert!(r.bytes(usize::MAX).is_err());
    }

    #[test]
    fn writes_big_endian() {
        let mut out = Vec::new();
        out.u2(0x0102);
        out.u4(0x03040506);
        out.i4(-1);
        assert_eq!(out, vec![1, 2, 3, 4, 5, 6, 0xFF, 0xFF, 0xFF, 0xFF]);
    }
}
