use thiserror::Error;

use workbench_diagnostics::{CursorRange, Diagnostic};
use workbench_mp0::InstructionError;

/// An A program cannot be assembled.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssemblyError {
    #[error("{range}: unknown instruction {mnemonic}")]
    UnknownInstruction { mnemonic: String, range: CursorRange },
    #[error("{range}: {mnemonic} takes {expected} operands, {found} given")]
    WrongArity {
        mnemonic: String,
        expected: usize,
        found: usize,
        range: CursorRange,
    },
    #[error("{range}: operand {position} of {mnemonic} must be {expected}, found {found}")]
    InvalidOperand {
        mnemonic: String,
        position: usize,
        expected: &'static str,
        found: String,
        range: CursorRange,
    },
    #[error("{range}: label {label} is defined more than once")]
    DuplicateLabel { label: String, range: CursorRange },
    #[error("{range}: undefined label {label}")]
    UndefinedLabel { label: String, range: CursorRange },
    #[error("{range}: there is no string constant ={index}")]
    UndefinedConstant { index: usize, range: CursorRange },
    #[error("{range}: malformed instruction: {message}")]
    Malformed { message: String, range: CursorRange },
    #[error("{range}: cannot encode instruction {index}: {source}")]
    Encoding {
        index: usize,
        range: CursorRange,
        #[source]
        source: InstructionError,
    },
}

impl AssemblyError {
    pub fn range(&self) -> CursorRange {
        match self {
            AssemblyError::UnknownInstruction { range, .. }
            | AssemblyError::WrongArity { range, .. }
            | AssemblyError::InvalidOperand { range, .. }
            | AssemblyError::DuplicateLabel { range, .. }
            | AssemblyError::UndefinedLabel { range, .. }
            | AssemblyError::UndefinedConstant { range, .. }
            | AssemblyError::Malformed { range, .. }
            | AssemblyError::Encoding { range, .. } => *range,
        }
    }
}

/// A B program cannot be compiled to A.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("{range}: variable {name} is used before being assigned")]
    UndefinedVariable { name: String, range: CursorRange },
    #[error("{range}: unknown function {name}")]
    UnknownFunction { name: String, range: CursorRange },
    #[error("{range}: function {name} is defined more than once")]
    DuplicateFunction { name: String, range: CursorRange },
    #[error("{range}: {name} takes {expected} arguments, {found} given")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
        range: CursorRange,
    },
    #[error("{range}: {name} has {count} parameters, at most {max} are supported")]
    TooManyParameters {
        name: String,
        count: usize,
        max: usize,
        range: CursorRange,
    },
    #[error("{range}: the literal {value} does not fit in 16 signed bits")]
    LiteralOutOfRange { value: i64, range: CursorRange },
    #[error("{range}: division by zero")]
    DivisionByZero { range: CursorRange },
    #[error("the program has no main function")]
    MissingMain,
    #[error("{range}: malformed tree: {message}")]
    Malformed { message: String, range: CursorRange },
}

impl CompileError {
    pub fn range(&self) -> Option<CursorRange> {
        match self {
            CompileError::UndefinedVariable { range, .. }
            | CompileError::UnknownFunction { range, .. }
            | CompileError::DuplicateFunction { range, .. }
            | CompileError::ArityMismatch { range, .. }
            | CompileError::TooManyParameters { range, .. }
            | CompileError::LiteralOutOfRange { range, .. }
            | CompileError::DivisionByZero { range }
            | CompileError::Malformed { range, .. } => Some(*range),
            CompileError::MissingMain => None,
        }
    }
}

/// An Expr expression cannot be evaluated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    #[error("{range}: unbound variable {name}")]
    UnboundVariable { name: String, range: CursorRange },
    #[error("{range}: division by zero")]
    DivisionByZero { range: CursorRange },
    #[error("{range}: malformed tree: {message}")]
    Malformed { message: String, range: CursorRange },
}

/// Any error of the languages.
#[derive(Error, Debug, Clone)]
pub enum LangError {
    #[error(transparent)]
    Grammar(#[from] workbench_grammar::Error),
    #[error(transparent)]
    Assembly(#[from] AssemblyError),
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Eval(#[from] EvalError),
    #[error("invalid regex: {0}")]
    Regex(#[from] regex::Error),
    #[error("unknown language {0}")]
    UnknownLanguage(String),
}

impl LangError {
    /// Make a [`Diagnostic`] out of this error, pointing at the offending position if known.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            LangError::Grammar(e) => e.to_diagnostic(),
            LangError::Assembly(e) => Diagnostic::error(self.to_string()).with_range(e.range()),
            LangError::Compile(e) => match e.range() {
                Some(range) => Diagnostic::error(self.to_string()).with_range(range),
                None => Diagnostic::error(self.to_string()),
            },
            _ => Diagnostic::error(self.to_string()),
        }
    }
}
