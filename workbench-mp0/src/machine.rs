use std::io::{BufRead, Write};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::instruction::{AluOp, BranchOp, EnvOp, MemoryOp};
use crate::program::LOAD_ADDRESS;
use crate::{Instruction, Memory, Program, Register, Registers, RuntimeError};

/// Default size of the memory, 2 MiB.
pub const DEFAULT_MEM_SIZE: usize = 2 * 1024 * 1024;
/// Default size of the stack region at the top of memory, 16 KiB.
pub const DEFAULT_STACK_SIZE: usize = 16 * 1024;

/// The parameters of a [`Machine`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineConfig {
    /// Size of the memory in bytes.
    pub mem_size: usize,
    /// Size of the stack region in bytes. The stack pointer cannot go below
    /// `mem_size - stack_size`.
    pub stack_size: usize,
    /// Stop the machine after this many instructions.
    pub max_steps: Option<u64>,
}

impl Default for MachineConfig {
    fn default() -> Self {
        MachineConfig {
            mem_size: DEFAULT_MEM_SIZE,
            stack_size: DEFAULT_STACK_SIZE,
            max_steps: None,
        }
    }
}

fn env_var<T: FromStr>(name: &str) -> Option<T> {
    let value = std::env::var(name).ok()?;
    match value.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring invalid ${}: {:?}", name, value);
            None
        }
    }
}

impl MachineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// The default configuration, overridden by `$WORKBENCH_MEM_SIZE`, `$WORKBENCH_STACK_SIZE`
    /// and `$WORKBENCH_MAX_STEPS` when set.
    pub fn from_env() -> Self {
        let default = Self::default();
        MachineConfig {
            mem_size: env_var("WORKBENCH_MEM_SIZE").unwrap_or(default.mem_size),
            stack_size: env_var("WORKBENCH_STACK_SIZE").unwrap_or(default.stack_size),
            max_steps: env_var("WORKBENCH_MAX_STEPS").or(default.max_steps),
        }
    }

    pub fn mem_size(&mut self, mem_size: usize) -> &mut Self {
        self.mem_size = mem_size;
        self
    }

    pub fn stack_size(&mut self, stack_size: usize) -> &mut Self {
        self.stack_size = stack_size;
        self
    }

    pub fn max_steps(&mut self, max_steps: Option<u64>) -> &mut Self {
        self.max_steps = max_steps;
        self
    }

    /// The lowest address the stack may use.
    pub fn stack_limit(&self) -> usize {
        self.mem_size - self.stack_size
    }

    fn validate(&self) -> Result<(), RuntimeError> {
        if self.mem_size > i32::MAX as usize || self.mem_size % 4 != 0 {
            return Err(RuntimeError::InvalidConfig(format!(
                "the memory size {} must be a multiple of 4 that fits 31 bits",
                self.mem_size
            )));
        }
        if self.stack_size >= self.mem_size {
            return Err(RuntimeError::InvalidConfig(format!(
                "the stack size {} must be smaller than the memory size {}",
                self.stack_size, self.mem_size
            )));
        }
        Ok(())
    }
}

/// The MP0 machine running a single program.
///
/// The program is loaded at address 4, the stack pointer starts at the top of memory and
/// execution starts at the first instruction. The machine stops when the program counter becomes
/// 0, and the exit code is the value of `a0`.
pub struct Machine<R, W> {
    pub(crate) config: MachineConfig,
    pub(crate) registers: Registers,
    pub(crate) memory: Memory,
    /// Address of the current instruction.
    pub(crate) pc: i32,
    /// Address of the next instruction, writes to `pc` go here.
    pub(crate) next_pc: i32,
    /// First free address of the heap.
    pub(crate) heap: i64,
    pub(crate) steps: u64,
    pub(crate) stdin: R,
    pub(crate) stdout: W,
}

impl<R: BufRead, W: Write> Machine<R, W> {
    /// Load `program` in a new machine.
    pub fn new(
        config: MachineConfig,
        program: &Program,
        stdin: R,
        stdout: W,
    ) -> Result<Self, RuntimeError> {
        config.validate()?;
        let image = program.image();
        if LOAD_ADDRESS + image.len() > config.stack_limit() {
            return Err(RuntimeError::MalformedProgram(format!(
                "the program needs {} bytes but only {} are available below the stack",
                image.len(),
                config.stack_limit() - LOAD_ADDRESS
            )));
        }
        let mut memory = Memory::new(config.mem_size);
        memory.write_bytes(LOAD_ADDRESS as i64, &image)?;
        let mut registers = Registers::new();
        registers.set(Register::SP, config.mem_size as i32);
        let pc = program.entry_point() as i32;
        debug!(
            "Loaded {} data words and {} instructions, starting at {}",
            program.data().len(),
            program.code().len(),
            pc
        );
        Ok(Machine {
            heap: (LOAD_ADDRESS + image.len()) as i64,
            config,
            registers,
            memory,
            pc,
            next_pc: pc,
            steps: 0,
            stdin,
            stdout,
        })
    }

    /// Run until the program counter becomes 0, returning the value of `a0`.
    pub fn run(&mut self) -> Result<i32, RuntimeError> {
        while self.step()? {}
        debug!("Program terminated after {} steps", self.steps);
        Ok(self.registers.get(Register::A0))
    }

    /// Execute one instruction. Returns `false` when the machine has stopped.
    pub fn step(&mut self) -> Result<bool, RuntimeError> {
        if self.pc == 0 {
            return Ok(false);
        }
        if let Some(max_steps) = self.config.max_steps {
            if self.steps >= max_steps {
                return Err(RuntimeError::StepLimit(max_steps));
            }
        }
        let word = self.memory.read_word(self.pc as i64)? as u32;
        let instruction =
            Instruction::decode(word).map_err(|source| RuntimeError::Decode { pc: self.pc, source })?;
        trace!("{:6}: {}", self.pc, instruction);
        self.next_pc = self.pc.wrapping_add(4);
        self.execute(instruction)?;
        self.pc = self.next_pc;
        self.steps += 1;

        let sp = self.registers.get(Register::SP);
        let limit = self.config.stack_limit() as i64;
        if (sp as i64) < limit {
            return Err(RuntimeError::StackOverflow { sp, limit });
        }
        Ok(self.pc != 0)
    }

    /// Read a register, `pc` reads as the address of the current instruction.
    pub fn read_register(&self, register: Register) -> i32 {
        if register == Register::PC {
            self.pc
        } else {
            self.registers.get(register)
        }
    }

    /// Write a register, writing `pc` redirects the next instruction.
    pub fn write_register(&mut self, register: Register, value: i32) {
        if register == Register::PC {
            self.next_pc = value;
        } else {
            self.registers.set(register, value);
        }
    }

    pub fn pc(&self) -> i32 {
        self.pc
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// How many instructions were executed.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Give back the output handle.
    pub fn into_output(self) -> W {
        self.stdout
    }

    fn execute(&mut self, instruction: Instruction) -> Result<(), RuntimeError> {
        match instruction {
            Instruction::Branch {
                op,
                src1,
                src2,
                offset,
            } => {
                let equal = self.read_register(src1) == self.read_register(src2);
                let taken = match op {
                    BranchOp::Beq => equal,
                    BranchOp::Bne => !equal,
                };
                if taken {
                    self.next_pc = self.pc.wrapping_add(offset);
                }
            }
            Instruction::Immediate { op, dst, src, imm } => {
                let value = self.alu(op, self.read_register(src), imm)?;
                self.write_register(dst, value);
            }
            Instruction::Operation {
                op,
                dst,
                src1,
                src2,
            } => {
                let value = self.alu(op, self.read_register(src1), self.read_register(src2))?;
                self.write_register(dst, value);
            }
            Instruction::Memory {
                op,
                reg,
                base,
                offset,
            } => {
                let address = self.read_register(base) as i64 + offset as i64;
                match op {
                    MemoryOp::Load => {
                        let value = self.memory.read_word(address)?;
                        self.write_register(reg, value);
                    }
                    MemoryOp::Store => {
                        let value = self.read_register(reg);
                        self.memory.write_word(address, value)?;
                    }
                }
            }
            Instruction::Jump { offset } => self.next_pc = self.pc.wrapping_add(offset),
            Instruction::Env { op: EnvOp::Call } => self.env_call()?,
            Instruction::Env { op: EnvOp::Break } => {
                debug!("envbreak at pc {}", self.pc);
                for (register, value) in self.registers.iter() {
                    debug!("{:>4} = {}", register, value);
                }
            }
        }
        Ok(())
    }

    fn alu(&self, op: AluOp, a: i32, b: i32) -> Result<i32, RuntimeError> {
        Ok(match op {
            AluOp::Add => a.wrapping_add(b),
            AluOp::Sub => a.wrapping_sub(b),
            AluOp::Mul => a.wrapping_mul(b),
            AluOp::Div | AluOp::Mod if b == 0 => {
                return Err(RuntimeError::DivisionByZero { pc: self.pc })
            }
            AluOp::Div => a.wrapping_div(b),
            AluOp::Mod => a.wrapping_rem(b),
            AluOp::Or => a | b,
            AluOp::And => a & b,
            AluOp::Xor => a ^ b,
            AluOp::Eq => (a == b) as i32,
            AluOp::Gt => (a > b) as i32,
            AluOp::Ge => (a >= b) as i32,
            AluOp::Lt => (a < b) as i32,
            AluOp::Le => (a <= b) as i32,
            AluOp::Ls => a.wrapping_shl(b as u32 & 31),
            AluOp::Rs => a >> (b as u32 & 31),
        })
    }
}
