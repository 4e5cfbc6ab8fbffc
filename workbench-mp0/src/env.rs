//! The calls from a program to the host.
//!
//! `a0` holds the call number on entry and the result on exit, `a1` holds the argument.

use std::io::{BufRead, Write};

use crate::{Machine, Register, RuntimeError};

/// The env calls, numbered as in `a0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Syscall {
    /// Print the NUL terminated string at `a1`.
    Print = 0,
    /// Read a line into the buffer at `a1`, NUL terminated. Returns its length.
    Read = 1,
    /// Parse the NUL terminated decimal at `a1`.
    Stoi = 2,
    /// Print `a1` in decimal.
    Printi = 3,
    /// Reserve `a1` bytes of heap, returning their address.
    Alloc = 4,
    /// Release memory. Nothing is ever reclaimed.
    Free = 5,
}

impl Syscall {
    pub const ALL: [Syscall; 6] = [
        Syscall::Print,
        Syscall::Read,
        Syscall::Stoi,
        Syscall::Printi,
        Syscall::Alloc,
        Syscall::Free,
    ];

    pub fn id(&self) -> i32 {
        *self as i32
    }

    pub fn name(&self) -> &'static str {
        match self {
            Syscall::Print => "print",
            Syscall::Read => "read",
            Syscall::Stoi => "stoi",
            Syscall::Printi => "printi",
            Syscall::Alloc => "alloc",
            Syscall::Free => "free",
        }
    }

    /// Look up a call by its name.
    pub fn from_name(name: &str) -> Option<Syscall> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }
}

impl TryFrom<i32> for Syscall {
    type Error = i32;

    fn try_from(id: i32) -> Result<Self, Self::Error> {
        Self::ALL.into_iter().find(|s| s.id() == id).ok_or(id)
    }
}

impl<R: BufRead, W: Write> Machine<R, W> {
    pub(crate) fn env_call(&mut self) -> Result<(), RuntimeError> {
        let call = self.registers.get(Register::A0);
        let arg = self.registers.get(Register::A1);
        let syscall = Syscall::try_from(call)
            .map_err(|call| RuntimeError::InvalidEnvCall { call, pc: self.pc })?;
        debug!("env {}({}) at pc {}", syscall.name(), arg, self.pc);
        match syscall {
            Syscall::Print => {
                let text = self.memory.read_c_string(arg as i64)?;
                self.stdout.write_all(text)?;
                self.stdout.flush()?;
            }
            Syscall::Read => {
                let mut line = Vec::new();
                self.stdin.read_until(b'\n', &mut line)?;
                let len = line.len() as i32;
                line.push(0);
                self.memory.write_bytes(arg as i64, &line)?;
                self.registers.set(Register::A0, len);
            }
            Syscall::Stoi => {
                let text = self.memory.read_c_string(arg as i64)?;
                let value = String::from_utf8_lossy(text)
                    .trim()
                    .parse()
                    .map_err(|_| RuntimeError::InvalidInteger { address: arg })?;
                self.registers.set(Register::A0, value);
            }
            Syscall::Printi => {
                write!(self.stdout, "{}", arg)?;
                self.stdout.flush()?;
            }
            Syscall::Alloc => {
                let limit = self.config.stack_limit() as i64;
                let end = (self.heap + arg as i64 + 3) / 4 * 4;
                if arg < 0 || end > limit {
                    return Err(RuntimeError::OutOfMemory {
                        requested: arg as i64,
                        available: limit - self.heap,
                    });
                }
                let address = self.heap;
                self.heap = end;
                self.registers.set(Register::A0, address as i32);
            }
            Syscall::Free => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::instruction::{AluOp, EnvOp};
    use crate::{Instruction, MachineConfig, Program};

    use super::*;

    fn reg(name: &str) -> Register {
        Register::parse(name).unwrap()
    }

    fn addi(dst: &str, src: &str, imm: i32) -> Instruction {
        Instruction::Immediate {
            op: AluOp::Add,
            dst: reg(dst),
            src: reg(src),
            imm,
        }
    }

    fn add(dst: &str, src1: &str, src2: &str) -> Instruction {
        Instruction::Operation {
            op: AluOp::Add,
            dst: reg(dst),
            src1: reg(src1),
            src2: reg(src2),
        }
    }

    const ENV: Instruction = Instruction::Env { op: EnvOp::Call };

    fn run(
        config: MachineConfig,
        data: &[u8],
        code: &[Instruction],
        input: &str,
    ) -> (Result<i32, RuntimeError>, String) {
        let program = Program::new(data, code.iter().map(|i| i.encode().unwrap()).collect());
        let mut output = Vec::new();
        let result = Machine::new(config, &program, input.as_bytes(), &mut output)
            .and_then(|mut machine| machine.run());
        (result, String::from_utf8(output).unwrap())
    }

    fn halt() -> Instruction {
        add("pc", "r0", "r0")
    }

    #[test]
    fn test_syscall_ids() {
        assert_eq!(Syscall::from_name("printi"), Some(Syscall::Printi));
        assert_eq!(Syscall::try_from(4), Ok(Syscall::Alloc));
        assert_eq!(Syscall::try_from(6), Err(6));
    }

    #[test]
    fn test_print_constant() {
        // the data starts at address 4
        let code = [addi("a0", "r0", 0), addi("a1", "r0", 4), ENV, halt()];
        let (result, output) = run(MachineConfig::default(), b"hello\n\0", &code, "");
        assert_eq!(result.unwrap(), 0);
        assert_eq!(output, "hello\n");
    }

    #[test]
    fn test_read_stoi_printi() {
        let code = [
            // read into [sp - 64]
            addi("s0", "sp", -64),
            addi("sp", "sp", -64),
            addi("a0", "r0", 1),
            add("a1", "s0", "r0"),
            ENV,
            addi("a0", "r0", 2),
            add("a1", "s0", "r0"),
            ENV,
            // print the number plus one
            addi("a1", "a0", 1),
            addi("a0", "r0", 3),
            ENV,
            halt(),
        ];
        let (result, output) = run(MachineConfig::default(), &[], &code, "41\n");
        assert_eq!(result.unwrap(), 3);
        assert_eq!(output, "42");
    }

    #[test]
    fn test_alloc() {
        let code = [
            addi("a0", "r0", 4),
            addi("a1", "r0", 10),
            ENV,
            add("s0", "a0", "r0"),
            addi("a0", "r0", 4),
            addi("a1", "r0", 1),
            ENV,
            Instruction::Operation {
                op: AluOp::Sub,
                dst: reg("a0"),
                src1: reg("a0"),
                src2: reg("s0"),
            },
            halt(),
        ];
        // the heap grows upwards from the end of the image, in whole words
        let (result, _) = run(MachineConfig::default(), &[], &code, "");
        assert_eq!(result.unwrap(), 12);
    }

    #[test]
    fn test_out_of_memory() {
        let mut config = MachineConfig::new();
        config.mem_size(1024).stack_size(512);
        let code = [addi("a0", "r0", 4), addi("a1", "r0", 1000), ENV, halt()];
        let (result, _) = run(config, &[], &code, "");
        assert!(matches!(
            result,
            Err(RuntimeError::OutOfMemory { requested: 1000, .. })
        ));
    }

    #[test]
    fn test_invalid_call() {
        let code = [addi("a0", "r0", 9), ENV, halt()];
        let (result, _) = run(MachineConfig::default(), &[], &code, "");
        assert!(matches!(
            result,
            Err(RuntimeError::InvalidEnvCall { call: 9, pc: 8 })
        ));
    }
}
