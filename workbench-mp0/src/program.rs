use std::fmt::{Display, Formatter};

use itertools::Itertools;

use crate::{Instruction, RuntimeError};

/// Address where programs are loaded, address 0 is the null pointer.
pub const LOAD_ADDRESS: usize = 4;

/// An assembled program: a data section and a code section, both made of words.
///
/// The binary form is a stream of little endian words: the number of data words, the number of
/// code bytes, the data words and the code words.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Program {
    data: Vec<u32>,
    code: Vec<u32>,
}

impl Program {
    /// Make a program from the raw data bytes, padded with zeros to a whole word, and the code.
    pub fn new(data: &[u8], code: Vec<u32>) -> Self {
        let data = data
            .chunks(4)
            .map(|chunk| {
                let mut word = [0; 4];
                word[..chunk.len()].copy_from_slice(chunk);
                u32::from_le_bytes(word)
            })
            .collect();
        Self { data, code }
    }

    pub fn data(&self) -> &[u32] {
        &self.data
    }

    pub fn code(&self) -> &[u32] {
        &self.code
    }

    /// The size of the data section in bytes.
    pub fn data_len(&self) -> usize {
        self.data.len() * 4
    }

    /// The size of the loaded image, data and code, in bytes.
    pub fn image_len(&self) -> usize {
        (self.data.len() + self.code.len()) * 4
    }

    /// The address of the first instruction once the program is loaded.
    pub fn entry_point(&self) -> usize {
        LOAD_ADDRESS + self.data_len()
    }

    /// The image to copy at [`LOAD_ADDRESS`].
    pub fn image(&self) -> Vec<u8> {
        self.data
            .iter()
            .chain(self.code.iter())
            .flat_map(|w| w.to_le_bytes())
            .collect()
    }

    /// The binary form of the program.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(8 + self.image_len());
        bytes.extend((self.data.len() as u32).to_le_bytes());
        bytes.extend((self.code.len() as u32 * 4).to_le_bytes());
        bytes.extend(self.image());
        bytes
    }

    /// Parse the binary form of a program, checking that the header matches the content.
    pub fn from_bytes(bytes: &[u8]) -> Result<Program, RuntimeError> {
        if bytes.len() % 4 != 0 {
            return Err(RuntimeError::MalformedProgram(format!(
                "the size {} is not a whole number of words",
                bytes.len()
            )));
        }
        let words: Vec<u32> = bytes
            .chunks_exact(4)
            .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();
        let [data_size, code_size, body @ ..] = words.as_slice() else {
            return Err(RuntimeError::MalformedProgram("missing header".into()));
        };
        let (data_size, code_size) = (*data_size as usize, *code_size as usize);
        if code_size % 4 != 0 {
            return Err(RuntimeError::MalformedProgram(format!(
                "the code size {} is not a multiple of 4",
                code_size
            )));
        }
        if data_size + code_size / 4 != body.len() {
            return Err(RuntimeError::MalformedProgram(format!(
                "the header declares {} data words and {} code bytes, but the body has {} words",
                data_size,
                code_size,
                body.len()
            )));
        }
        let (data, code) = body.split_at(data_size);
        Ok(Program {
            data: data.to_vec(),
            code: code.to_vec(),
        })
    }

    /// The program as hexadecimal words, one per line.
    pub fn to_hex(&self) -> String {
        let header = [self.data.len() as u32, self.code.len() as u32 * 4];
        header
            .iter()
            .chain(&self.data)
            .chain(&self.code)
            .map(|word| format!("{:08x}", word))
            .join("\n")
    }
}

impl Display for Program {
    /// A listing of the program, with the code disassembled.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, ".data")?;
        for (i, word) in self.data.iter().enumerate() {
            writeln!(f, "{:6}: {:08x}", LOAD_ADDRESS + i * 4, word)?;
        }
        writeln!(f, ".code")?;
        for (i, word) in self.code.iter().enumerate() {
            let address = self.entry_point() + i * 4;
            match Instruction::decode(*word) {
                Ok(instruction) => writeln!(f, "{:6}: {}", address, instruction)?,
                Err(_) => writeln!(f, "{:6}: {:08x} ???", address, word)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_binary_form() {
        let program = Program::new(b"hi\0", vec![0xf800_0000]);
        assert_eq!(program.data(), &[0x0069_68]);
        assert_eq!(program.entry_point(), 8);
        let bytes = program.to_bytes();
        assert_eq!(&bytes[..8], &[1, 0, 0, 0, 4, 0, 0, 0]);
        assert_eq!(Program::from_bytes(&bytes).unwrap(), program);
        assert_eq!(program.to_hex(), "00000001\n00000004\n00006968\nf8000000");
    }

    #[test]
    fn test_malformed() {
        assert!(Program::from_bytes(&[1, 0, 0]).is_err());
        assert!(Program::from_bytes(&[0, 0, 0, 0]).is_err());
        assert!(Program::from_bytes(&[0, 0, 0, 0, 3, 0, 0, 0]).is_err());
        assert!(Program::from_bytes(&[1, 0, 0, 0, 4, 0, 0, 0, 0, 0, 0, 0]).is_err());
    }

    #[test]
    fn test_listing() {
        let program = Program::new(&[], vec![0xf800_0000, 0xffff_ffff]);
        assert_eq!(program.to_string(), ".data\n.code\n     4: env\n     8: ffffffff ???\n");
    }
}
