use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Number of general purpose registers.
pub const REGISTER_COUNT: usize = 32;

lazy_static! {
    /// Every accepted register name, both `rN` and the aliases.
    static ref NAMES: HashMap<String, Register> = {
        let mut names = HashMap::new();
        for index in 0..REGISTER_COUNT as u8 {
            let register = Register(index);
            names.insert(format!("r{}", index), register);
            names.insert(register.alias(), register);
        }
        names
    };
}

/// One of the 32 registers of the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Register(u8);

impl Register {
    pub const ZERO: Register = Register(0);
    pub const PC: Register = Register(1);
    pub const SP: Register = Register(2);
    pub const RA: Register = Register(3);
    pub const T0: Register = Register(4);
    pub const T1: Register = Register(5);
    pub const T2: Register = Register(6);
    /// Scratch register of the assembler.
    pub const T9: Register = Register(13);
    pub const A0: Register = Register(14);
    pub const A1: Register = Register(15);

    /// The register with the given index, if it is below 32.
    pub fn new(index: u8) -> Option<Register> {
        ((index as usize) < REGISTER_COUNT).then_some(Register(index))
    }

    /// Lowest 5 bits of an encoded field.
    pub(crate) fn from_bits(bits: u32) -> Register {
        Register((bits & 0x1f) as u8)
    }

    /// Look up a register by name: `r0`..`r31`, `pc`, `sp`, `ra`, `t0`..`t9`, `a0`..`a5` or
    /// `s0`..`s11`.
    pub fn parse(name: &str) -> Option<Register> {
        NAMES.get(name).copied()
    }

    /// The `n`-th argument register `a0`..`a5`.
    pub fn argument(n: usize) -> Option<Register> {
        (n < 6).then(|| Register(14 + n as u8))
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }

    /// The conventional name of the register.
    pub fn alias(&self) -> String {
        match self.0 {
            0 => "r0".into(),
            1 => "pc".into(),
            2 => "sp".into(),
            3 => "ra".into(),
            n @ 4..=13 => format!("t{}", n - 4),
            n @ 14..=19 => format!("a{}", n - 14),
            n => format!("s{}", n - 20),
        }
    }
}

impl Display for Register {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.alias())
    }
}

/// The register file. `r0` always reads as zero.
///
/// The program counter is not stored here, the machine intercepts reads and writes of `pc`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registers {
    values: [i32; REGISTER_COUNT],
}

impl Registers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, register: Register) -> i32 {
        self.values[register.index()]
    }

    /// Write a register, writes to `r0` are discarded.
    pub fn set(&mut self, register: Register, value: i32) {
        if register != Register::ZERO {
            self.values[register.index()] = value;
        }
    }

    /// The registers with their values, for debugging.
    pub fn iter(&self) -> impl Iterator<Item = (Register, i32)> + '_ {
        self.values
            .iter()
            .enumerate()
            .map(|(i, v)| (Register(i as u8), *v))
    }
}

#[cfg(test)]
mod tests {
    use speculoos::prelude::*;

    use super::*;

    #[test]
    fn test_names() {
        assert_eq!(Register::parse("r0"), Some(Register::ZERO));
        assert_eq!(Register::parse("pc"), Some(Register::PC));
        assert_eq!(Register::parse("r1"), Some(Register::PC));
        assert_eq!(Register::parse("t9"), Some(Register::T9));
        assert_eq!(Register::parse("a5"), Register::new(19));
        assert_eq!(Register::parse("s11"), Register::new(31));
        assert_that!(Register::parse("r32")).is_none();
        assert_that!(Register::parse("t10")).is_none();
        assert_eq!(Register::new(20).unwrap().to_string(), "s0");
        assert_eq!(Register::argument(1), Some(Register::A1));
        assert_that!(Register::argument(6)).is_none();
    }

    #[test]
    fn test_zero_is_hardwired() {
        let mut registers = Registers::new();
        registers.set(Register::ZERO, 42);
        registers.set(Register::A0, 7);
        assert_eq!(registers.get(Register::ZERO), 0);
        assert_eq!(registers.get(Register::A0), 7);
    }
}
