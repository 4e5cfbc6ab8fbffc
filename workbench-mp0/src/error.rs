use thiserror::Error;

/// An instruction cannot be encoded or decoded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InstructionError {
    #[error("invalid instruction prefix in {word:#010x}")]
    InvalidPrefix { word: u32 },
    #[error("invalid opcode in {word:#010x}")]
    InvalidOpcode { word: u32 },
    #[error("{field} {value} does not fit in {bits} signed bits")]
    OutOfRange {
        field: &'static str,
        value: i64,
        bits: u32,
    },
}

/// A fatal error while loading or running a program.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("segment fault at address {address}")]
    SegmentFault { address: i64 },
    #[error("invalid env call {call} at pc {pc}")]
    InvalidEnvCall { call: i32, pc: i32 },
    #[error("stack overflow: sp is {sp}, the stack ends at {limit}")]
    StackOverflow { sp: i32, limit: i64 },
    #[error("out of memory: cannot allocate {requested} bytes, {available} available")]
    OutOfMemory { requested: i64, available: i64 },
    #[error("cannot decode the instruction at pc {pc}: {source}")]
    Decode {
        pc: i32,
        #[source]
        source: InstructionError,
    },
    #[error("division by zero at pc {pc}")]
    DivisionByZero { pc: i32 },
    #[error("invalid integer at address {address}")]
    InvalidInteger { address: i32 },
    #[error("malformed program: {0}")]
    MalformedProgram(String),
    #[error("invalid machine configuration: {0}")]
    InvalidConfig(String),
    #[error("the program did not stop after {0} steps")]
    StepLimit(u64),
    #[error("I/O error during an env call")]
    Io(#[from] std::io::Error),
}
