//! Encoding and decoding of the 32 bit instruction words.
//!
//! The leading bits of a word select its type with a prefix code:
//!
//! | Prefix   | Type | Fields (high to low)                              |
//! |----------|------|---------------------------------------------------|
//! | `0`      | B    | opcode(1) src1(5) src2(5) offset(20)              |
//! | `10`     | OI   | opcode(4) dst(5) src(5) immediate(16)             |
//! | `110`    | M    | opcode(1) reg(5) base(5) offset(18)               |
//! | `1110`   | O    | opcode(4) dst(5) src1(5) src2(5) padding(9)       |
//! | `11110`  | J    | offset(27)                                        |
//! | `111110` | E    | opcode(1) padding(25)                             |
//!
//! Offsets and immediates are signed. Branch and jump offsets are in bytes, relative to the
//! address of the instruction.

use std::fmt::{Display, Formatter};

use crate::{InstructionError, Register};

/// Operations of the B type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BranchOp {
    Beq,
    Bne,
}

/// Arithmetic and comparison operations of the O and OI types, in opcode order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AluOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Or,
    And,
    Xor,
    Eq,
    Gt,
    Ge,
    Lt,
    Le,
    Ls,
    Rs,
}

impl AluOp {
    const ALL: [AluOp; 15] = [
        AluOp::Add,
        AluOp::Sub,
        AluOp::Mul,
        AluOp::Div,
        AluOp::Mod,
        AluOp::Or,
        AluOp::And,
        AluOp::Xor,
        AluOp::Eq,
        AluOp::Gt,
        AluOp::Ge,
        AluOp::Lt,
        AluOp::Le,
        AluOp::Ls,
        AluOp::Rs,
    ];

    fn opcode(&self) -> u32 {
        *self as u32
    }

    fn from_opcode(opcode: u32) -> Option<AluOp> {
        Self::ALL.get(opcode as usize).copied()
    }

    /// The mnemonic of the register form.
    pub fn name(&self) -> &'static str {
        match self {
            AluOp::Add => "add",
            AluOp::Sub => "sub",
            AluOp::Mul => "mul",
            AluOp::Div => "div",
            AluOp::Mod => "mod",
            AluOp::Or => "or",
            AluOp::And => "and",
            AluOp::Xor => "xor",
            AluOp::Eq => "eq",
            AluOp::Gt => "gt",
            AluOp::Ge => "ge",
            AluOp::Lt => "lt",
            AluOp::Le => "le",
            AluOp::Ls => "ls",
            AluOp::Rs => "rs",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryOp {
    Load,
    Store,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvOp {
    /// Call the host, the call number is in `a0`.
    Call,
    /// Dump the registers and continue.
    Break,
}

/// A decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instruction {
    Branch {
        op: BranchOp,
        src1: Register,
        src2: Register,
        offset: i32,
    },
    Immediate {
        op: AluOp,
        dst: Register,
        src: Register,
        imm: i32,
    },
    Memory {
        op: MemoryOp,
        reg: Register,
        base: Register,
        offset: i32,
    },
    Operation {
        op: AluOp,
        dst: Register,
        src1: Register,
        src2: Register,
    },
    Jump {
        offset: i32,
    },
    Env {
        op: EnvOp,
    },
}

const BRANCH_OFFSET_BITS: u32 = 20;
const IMMEDIATE_BITS: u32 = 16;
const MEMORY_OFFSET_BITS: u32 = 18;
const JUMP_OFFSET_BITS: u32 = 27;

/// Whether `value` fits a signed field of `bits` bits. The most negative value is excluded so
/// that the range is symmetric.
pub fn fits(value: i64, bits: u32) -> bool {
    let limit = 1i64 << (bits - 1);
    -limit < value && value < limit
}

fn check(field: &'static str, value: i32, bits: u32) -> Result<u32, InstructionError> {
    if !fits(value as i64, bits) {
        return Err(InstructionError::OutOfRange {
            field,
            value: value as i64,
            bits,
        });
    }
    Ok((value as u32) & ((1 << bits) - 1))
}

fn sign_extend(value: u32, bits: u32) -> i32 {
    ((value << (32 - bits)) as i32) >> (32 - bits)
}

fn register(word: u32, shift: u32) -> Register {
    Register::from_bits(word >> shift)
}

fn reg_bits(register: Register, shift: u32) -> u32 {
    (register.index() as u32) << shift
}

impl Instruction {
    /// The word of this instruction.
    pub fn encode(&self) -> Result<u32, InstructionError> {
        Ok(match *self {
            Instruction::Branch {
                op,
                src1,
                src2,
                offset,
            } => {
                let op = match op {
                    BranchOp::Beq => 0,
                    BranchOp::Bne => 1,
                };
                (op << 30)
                    | reg_bits(src1, 25)
                    | reg_bits(src2, 20)
                    | check("branch offset", offset, BRANCH_OFFSET_BITS)?
            }
            Instruction::Immediate { op, dst, src, imm } => {
                (0b10 << 30)
                    | (op.opcode() << 26)
                    | reg_bits(dst, 21)
                    | reg_bits(src, 16)
                    | check("immediate", imm, IMMEDIATE_BITS)?
            }
            Instruction::Memory {
                op,
                reg,
                base,
                offset,
            } => {
                let op = match op {
                    MemoryOp::Load => 0,
                    MemoryOp::Store => 1,
                };
                (0b110 << 29)
                    | (op << 28)
                    | reg_bits(reg, 23)
                    | reg_bits(base, 18)
                    | check("memory offset", offset, MEMORY_OFFSET_BITS)?
            }
            Instruction::Operation {
                op,
                dst,
                src1,
                src2,
            } => {
                (0b1110 << 28)
                    | (op.opcode() << 24)
                    | reg_bits(dst, 19)
                    | reg_bits(src1, 14)
                    | reg_bits(src2, 9)
            }
            Instruction::Jump { offset } => {
                (0b11110 << 27) | check("jump offset", offset, JUMP_OFFSET_BITS)?
            }
            Instruction::Env { op } => {
                let op = match op {
                    EnvOp::Call => 0,
                    EnvOp::Break => 1,
                };
                (0b111110 << 26) | (op << 25)
            }
        })
    }

    /// Decode a word.
    pub fn decode(word: u32) -> Result<Instruction, InstructionError> {
        let prefix = word.leading_ones();
        Ok(match prefix {
            0 => Instruction::Branch {
                op: if word >> 30 & 1 == 0 {
                    BranchOp::Beq
                } else {
                    BranchOp::Bne
                },
                src1: register(word, 25),
                src2: register(word, 20),
                offset: sign_extend(word & 0xf_ffff, BRANCH_OFFSET_BITS),
            },
            1 => Instruction::Immediate {
                op: AluOp::from_opcode(word >> 26 & 0xf)
                    .ok_or(InstructionError::InvalidOpcode { word })?,
                dst: register(word, 21),
                src: register(word, 16),
                imm: sign_extend(word & 0xffff, IMMEDIATE_BITS),
            },
            2 => Instruction::Memory {
                op: if word >> 28 & 1 == 0 {
                    MemoryOp::Load
                } else {
                    MemoryOp::Store
                },
                reg: register(word, 23),
                base: register(word, 18),
                offset: sign_extend(word & 0x3_ffff, MEMORY_OFFSET_BITS),
            },
            3 => Instruction::Operation {
                op: AluOp::from_opcode(word >> 24 & 0xf)
                    .ok_or(InstructionError::InvalidOpcode { word })?,
                dst: register(word, 19),
                src1: register(word, 14),
                src2: register(word, 9),
            },
            4 => Instruction::Jump {
                offset: sign_extend(word & 0x7ff_ffff, JUMP_OFFSET_BITS),
            },
            5 => Instruction::Env {
                op: if word >> 25 & 1 == 0 {
                    EnvOp::Call
                } else {
                    EnvOp::Break
                },
            },
            _ => return Err(InstructionError::InvalidPrefix { word }),
        })
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Instruction::Branch {
                op,
                src1,
                src2,
                offset,
            } => {
                let name = match op {
                    BranchOp::Beq => "beq",
                    BranchOp::Bne => "bne",
                };
                write!(f, "{} {}, {}, {}", name, src1, src2, offset)
            }
            Instruction::Immediate { op, dst, src, imm } => {
                write!(f, "{}i {}, {}, {}", op.name(), dst, src, imm)
            }
            Instruction::Memory {
                op: MemoryOp::Load,
                reg,
                base,
                offset,
            } => write!(f, "load {}, [{} + {}]", reg, base, offset),
            Instruction::Memory {
                op: MemoryOp::Store,
                reg,
                base,
                offset,
            } => write!(f, "store {}, [{} + {}]", reg, base, offset),
            Instruction::Operation {
                op,
                dst,
                src1,
                src2,
            } => write!(f, "{} {}, {}, {}", op.name(), dst, src1, src2),
            Instruction::Jump { offset } => write!(f, "jump {}", offset),
            Instruction::Env { op: EnvOp::Call } => write!(f, "env"),
            Instruction::Env { op: EnvOp::Break } => write!(f, "envbreak"),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use speculoos::prelude::*;

    use super::*;

    fn reg(name: &str) -> Register {
        Register::parse(name).unwrap()
    }

    #[test]
    fn test_prefixes() {
        let addi = Instruction::Immediate {
            op: AluOp::Add,
            dst: reg("a0"),
            src: reg("r0"),
            imm: -1,
        };
        let word = addi.encode().unwrap();
        assert_eq!(word >> 30, 0b10);
        assert_eq!(word & 0xffff, 0xffff);
        assert_eq!(Instruction::decode(word).unwrap(), addi);

        let env = Instruction::Env { op: EnvOp::Break }.encode().unwrap();
        assert_eq!(env, 0b1111_1010 << 24);
        assert_eq!(
            Instruction::decode(env).unwrap(),
            Instruction::Env { op: EnvOp::Break }
        );
    }

    #[test]
    fn test_every_type() {
        let instructions = [
            Instruction::Branch {
                op: BranchOp::Bne,
                src1: reg("t0"),
                src2: reg("r0"),
                offset: -8,
            },
            Instruction::Memory {
                op: MemoryOp::Store,
                reg: reg("ra"),
                base: reg("sp"),
                offset: 131_071,
            },
            Instruction::Operation {
                op: AluOp::Rs,
                dst: reg("s11"),
                src1: reg("a5"),
                src2: reg("t9"),
            },
            Instruction::Jump { offset: -67_108_863 },
        ];
        for instruction in instructions {
            let word = instruction.encode().unwrap();
            assert_eq!(Instruction::decode(word).unwrap(), instruction);
        }
    }

    #[test]
    fn test_immediate_range() {
        let make = |imm| Instruction::Immediate {
            op: AluOp::Add,
            dst: reg("t0"),
            src: reg("t0"),
            imm,
        };
        assert_that!(make(32767).encode()).is_ok();
        assert_that!(make(-32767).encode()).is_ok();
        assert_eq!(
            make(32768).encode(),
            Err(InstructionError::OutOfRange {
                field: "immediate",
                value: 32768,
                bits: 16
            })
        );
        assert_that!(make(-32768).encode()).is_err();
    }

    #[test]
    fn test_invalid_words() {
        assert_eq!(
            Instruction::decode(0xffff_ffff),
            Err(InstructionError::InvalidPrefix { word: 0xffff_ffff })
        );
        assert_eq!(
            Instruction::decode(0xfc00_0000),
            Err(InstructionError::InvalidPrefix { word: 0xfc00_0000 })
        );
        // opcode 15 is not an operation
        let word = (0b10 << 30) | (0xf << 26);
        assert_eq!(
            Instruction::decode(word),
            Err(InstructionError::InvalidOpcode { word })
        );
    }

    #[test]
    fn test_display() {
        let load = Instruction::Memory {
            op: MemoryOp::Load,
            reg: reg("a0"),
            base: reg("sp"),
            offset: 4,
        };
        assert_eq!(load.to_string(), "load a0, [sp + 4]");
        let geq = Instruction::Operation {
            op: AluOp::Ge,
            dst: reg("t0"),
            src1: reg("t1"),
            src2: reg("t2"),
        };
        assert_eq!(geq.to_string(), "ge t0, t1, t2");
    }
}
