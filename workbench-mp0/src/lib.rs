//! The MP0 machine: a 32-bit register machine with 32 registers, flat byte addressed memory and
//! six kinds of instructions.
//!
//! A [`Program`] is made of a data section and a code section, both loaded at [`LOAD_ADDRESS`].
//! The [`Machine`] executes it until the program counter becomes 0, talking with the host through
//! the `env` instruction.

#[macro_use]
extern crate log;
#[macro_use]
extern crate lazy_static;

mod env;
mod error;
pub mod instruction;
mod machine;
mod memory;
pub mod program;
mod register;

pub use env::Syscall;
pub use error::{InstructionError, RuntimeError};
pub use instruction::Instruction;
pub use machine::{Machine, MachineConfig, DEFAULT_MEM_SIZE, DEFAULT_STACK_SIZE};
pub use memory::Memory;
pub use program::{Program, LOAD_ADDRESS};
pub use register::{Register, Registers, REGISTER_COUNT};
