use crate::RuntimeError;

/// Flat byte addressable memory. Words are little endian.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memory {
    bytes: Vec<u8>,
}

impl Memory {
    /// A zeroed memory of `size` bytes.
    pub fn new(size: usize) -> Self {
        Self {
            bytes: vec![0; size],
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// The byte range `[address, address + len)`, if it is inside the memory.
    fn range(&self, address: i64, len: usize) -> Result<std::ops::Range<usize>, RuntimeError> {
        if address < 0 || address + len as i64 > self.bytes.len() as i64 {
            return Err(RuntimeError::SegmentFault { address });
        }
        let start = address as usize;
        Ok(start..start + len)
    }

    pub fn read_word(&self, address: i64) -> Result<i32, RuntimeError> {
        let range = self.range(address, 4)?;
        let mut word = [0; 4];
        word.copy_from_slice(&self.bytes[range]);
        Ok(i32::from_le_bytes(word))
    }

    pub fn write_word(&mut self, address: i64, value: i32) -> Result<(), RuntimeError> {
        let range = self.range(address, 4)?;
        self.bytes[range].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    pub fn read_byte(&self, address: i64) -> Result<u8, RuntimeError> {
        let range = self.range(address, 1)?;
        Ok(self.bytes[range.start])
    }

    pub fn write_bytes(&mut self, address: i64, bytes: &[u8]) -> Result<(), RuntimeError> {
        let range = self.range(address, bytes.len())?;
        self.bytes[range].copy_from_slice(bytes);
        Ok(())
    }

    /// The bytes from `address` up to the first NUL, excluded.
    ///
    /// Running off the end of memory before finding the NUL is a segment fault.
    pub fn read_c_string(&self, address: i64) -> Result<&[u8], RuntimeError> {
        let range = self.range(address, 0)?;
        let rest = &self.bytes[range.start..];
        match rest.iter().position(|b| *b == 0) {
            Some(len) => Ok(&rest[..len]),
            None => Err(RuntimeError::SegmentFault {
                address: self.bytes.len() as i64,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use speculoos::prelude::*;

    use super::*;

    #[test]
    fn test_words_are_little_endian() {
        let mut memory = Memory::new(16);
        memory.write_word(4, 0x0102_0304).unwrap();
        assert_eq!(memory.read_byte(4).unwrap(), 4);
        assert_eq!(memory.read_byte(7).unwrap(), 1);
        assert_eq!(memory.read_word(4).unwrap(), 0x0102_0304);
        memory.write_word(8, -2).unwrap();
        assert_eq!(memory.read_word(8).unwrap(), -2);
    }

    #[test]
    fn test_bounds() {
        let mut memory = Memory::new(16);
        assert_that!(memory.read_word(0)).is_ok();
        assert_that!(memory.read_word(12)).is_ok();
        assert!(matches!(
            memory.read_word(13),
            Err(RuntimeError::SegmentFault { address: 13 })
        ));
        assert!(matches!(
            memory.write_word(-1, 0),
            Err(RuntimeError::SegmentFault { address: -1 })
        ));
        assert_that!(memory.write_bytes(14, b"abc")).is_err();
    }

    #[test]
    fn test_c_string() {
        let mut memory = Memory::new(16);
        memory.write_bytes(2, b"hi\0").unwrap();
        assert_eq!(memory.read_c_string(2).unwrap(), b"hi");
        memory.write_bytes(10, b"xxxxxx").unwrap();
        assert_that!(memory.read_c_string(10)).is_err();
    }
}
