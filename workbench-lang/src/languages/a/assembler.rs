//! Assembling A programs into MP0 programs.
//!
//! The tree is first turned into a [`Listing`]: the string constants and a list of labels and
//! instructions. Assembling a listing takes two passes: the first validates every instruction
//! and records the word index of every label, the second lowers every instruction to one or
//! more MP0 instructions, resolving the label and constant references.
//!
//! `t9` is reserved as a scratch register by the instructions that need one.

use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use itertools::Itertools;

use workbench_diagnostics::CursorRange;
use workbench_grammar::{Node, Token, Visitor};
use workbench_mp0::instruction::{AluOp, BranchOp, EnvOp, MemoryOp};
use workbench_mp0::{Instruction, InstructionError, Program, Register};

use crate::languages::{is_token, range_of};
use crate::AssemblyError;

/// An operand of an A instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Register(Register),
    Label(String),
    Int(i64),
    /// `=n`: the address of the `n`-th string constant.
    Constant(usize),
}

impl Operand {
    /// A name is a register if it is one of the register names, a label otherwise.
    pub fn name(name: &str) -> Operand {
        match Register::parse(name) {
            Some(register) => Operand::Register(register),
            None => Operand::Label(name.to_string()),
        }
    }
}

impl Display for Operand {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Operand::Register(register) => write!(f, "{}", register),
            Operand::Label(label) => write!(f, "{}", label),
            Operand::Int(value) => write!(f, "{}", value),
            Operand::Constant(index) => write!(f, "={}", index),
        }
    }
}

/// A line of the code section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Label {
        name: String,
        range: CursorRange,
    },
    Instruction {
        mnemonic: String,
        operands: Vec<Operand>,
        range: CursorRange,
    },
}

impl Line {
    pub fn label(name: impl Into<String>) -> Line {
        Line::Label {
            name: name.into(),
            range: CursorRange::default(),
        }
    }

    pub fn instruction(mnemonic: impl Into<String>, operands: Vec<Operand>) -> Line {
        Line::Instruction {
            mnemonic: mnemonic.into(),
            operands,
            range: CursorRange::default(),
        }
    }
}

impl Display for Line {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Line::Label { name, .. } => write!(f, "{}:", name),
            Line::Instruction {
                mnemonic, operands, ..
            } => write!(f, "{} {}", mnemonic, operands.iter().join(" ")),
        }
    }
}

/// The content of an A program: its string constants and its code lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    pub constants: Vec<String>,
    pub lines: Vec<Line>,
}

/// What an operand position accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Register,
    Immediate,
    /// A label or a byte offset.
    Target,
    /// An immediate, a constant or a label address.
    Value,
}

impl Kind {
    fn accepts(&self, operand: &Operand) -> bool {
        matches!(
            (self, operand),
            (Kind::Register, Operand::Register(_))
                | (Kind::Immediate, Operand::Int(_))
                | (Kind::Target, Operand::Label(_) | Operand::Int(_))
                | (Kind::Value, Operand::Int(_) | Operand::Constant(_) | Operand::Label(_))
        )
    }

    fn describe(&self) -> &'static str {
        match self {
            Kind::Register => "a register",
            Kind::Immediate => "an integer",
            Kind::Target => "a label or an offset",
            Kind::Value => "an integer, a constant or a label",
        }
    }
}

/// The MP0 operation of an arithmetic mnemonic, and whether the result is negated afterwards.
fn alu(name: &str) -> Option<(AluOp, bool)> {
    Some(match name {
        "add" => (AluOp::Add, false),
        "sub" => (AluOp::Sub, false),
        "mul" => (AluOp::Mul, false),
        "div" => (AluOp::Div, false),
        "mod" => (AluOp::Mod, false),
        "or" => (AluOp::Or, false),
        "and" => (AluOp::And, false),
        "xor" => (AluOp::Xor, false),
        "eq" => (AluOp::Eq, false),
        "neq" => (AluOp::Eq, true),
        "gt" => (AluOp::Gt, false),
        "geq" => (AluOp::Ge, false),
        "lt" => (AluOp::Lt, false),
        "leq" => (AluOp::Le, false),
        "ls" => (AluOp::Ls, false),
        "rs" => (AluOp::Rs, false),
        _ => return None,
    })
}

/// Arithmetic mnemonics, `op` with three registers and `opv` with an immediate.
fn alu_form(mnemonic: &str) -> Option<(AluOp, bool, bool)> {
    if let Some((op, negate)) = alu(mnemonic) {
        return Some((op, negate, false));
    }
    let (op, negate) = alu(mnemonic.strip_suffix('v')?)?;
    Some((op, negate, true))
}

/// The operands expected by `mnemonic`, if it is known.
fn signature(mnemonic: &str) -> Option<Vec<Kind>> {
    if let Some((_, _, immediate)) = alu_form(mnemonic) {
        let last = if immediate { Kind::Immediate } else { Kind::Register };
        return Some(vec![Kind::Register, Kind::Register, last]);
    }
    Some(match mnemonic {
        "jump" | "sys" | "exit" => vec![Kind::Register],
        "jumpv" => vec![Kind::Target],
        "sysv" | "exitv" => vec![Kind::Immediate],
        "not" | "set" | "jumpif" => vec![Kind::Register, Kind::Register],
        "setv" => vec![Kind::Register, Kind::Value],
        "jumpifv" => vec![Kind::Target, Kind::Register],
        "load" | "store" => vec![Kind::Register, Kind::Register, Kind::Immediate],
        "storev" => vec![Kind::Immediate, Kind::Register, Kind::Immediate],
        _ => return None,
    })
}

/// How many MP0 instructions `mnemonic` lowers to.
fn size(mnemonic: &str) -> usize {
    match mnemonic {
        "neq" | "neqv" | "storev" | "jumpif" | "sys" | "sysv" | "exit" | "exitv" => 2,
        _ => 1,
    }
}

fn op(op: AluOp, dst: Register, src1: Register, src2: Register) -> Instruction {
    Instruction::Operation {
        op,
        dst,
        src1,
        src2,
    }
}

fn opi(op: AluOp, dst: Register, src: Register, imm: i32) -> Instruction {
    Instruction::Immediate { op, dst, src, imm }
}

fn int(value: i64) -> Result<i32, InstructionError> {
    i32::try_from(value).map_err(|_| InstructionError::OutOfRange {
        field: "immediate",
        value,
        bits: 32,
    })
}

/// The label table and data layout of a listing, built by the first pass.
struct Context<'l> {
    listing: &'l Listing,
    /// Word index of every label.
    labels: HashMap<&'l str, usize>,
    /// Byte offset of every constant inside the data section.
    offsets: Vec<usize>,
    /// The data section, NUL terminated constants back to back.
    data: Vec<u8>,
    /// Size of the data section once padded to whole words.
    data_len: usize,
    words: usize,
}

impl<'l> Context<'l> {
    fn populate(listing: &'l Listing) -> Result<Self, AssemblyError> {
        let mut data = Vec::new();
        let mut offsets = Vec::with_capacity(listing.constants.len());
        for constant in &listing.constants {
            offsets.push(data.len());
            data.extend(constant.as_bytes());
            data.push(0);
        }
        let data_len = (data.len() + 3) / 4 * 4;

        let mut labels = HashMap::new();
        let mut words = 0;
        for line in &listing.lines {
            match line {
                Line::Label { name, range } => {
                    if labels.insert(name.as_str(), words).is_some() {
                        return Err(AssemblyError::DuplicateLabel {
                            label: name.clone(),
                            range: *range,
                        });
                    }
                }
                Line::Instruction {
                    mnemonic,
                    operands,
                    range,
                } => {
                    check(mnemonic, operands, *range)?;
                    words += size(mnemonic);
                }
            }
        }
        debug!(
            "Labels: {}",
            labels
                .iter()
                .sorted_by_key(|(_, index)| **index)
                .map(|(label, index)| format!("{}={}", label, index))
                .join(", ")
        );
        Ok(Context {
            listing,
            labels,
            offsets,
            data,
            data_len,
            words,
        })
    }

    fn generate(&self) -> Result<Program, AssemblyError> {
        let mut code = Vec::with_capacity(self.words);
        for line in &self.listing.lines {
            let Line::Instruction {
                mnemonic,
                operands,
                range,
            } = line
            else {
                continue;
            };
            let site = code.len();
            for (i, instruction) in self.lower(mnemonic, operands, site, *range)?.iter().enumerate() {
                trace!("{:4}: {}", site + i, instruction);
                let word = instruction
                    .encode()
                    .map_err(|source| AssemblyError::Encoding {
                        index: site + i,
                        range: *range,
                        source,
                    })?;
                code.push(word);
            }
        }
        Ok(Program::new(&self.data, code))
    }

    /// Byte offset from the instruction at `site` to `label`.
    fn label_offset(&self, label: &str, site: usize, range: CursorRange) -> Result<i64, AssemblyError> {
        let target = self
            .labels
            .get(label)
            .ok_or_else(|| AssemblyError::UndefinedLabel {
                label: label.to_string(),
                range,
            })?;
        Ok((*target as i64 - site as i64) * 4)
    }

    /// Offset from the `pc` of the instruction at `site` to the constant `index`.
    fn constant_offset(&self, index: usize, site: usize, range: CursorRange) -> Result<i64, AssemblyError> {
        let offset = self
            .offsets
            .get(index)
            .ok_or(AssemblyError::UndefinedConstant { index, range })?;
        Ok(-(4 * site as i64 + (self.data_len as i64 - *offset as i64)))
    }

    fn lower(
        &self,
        mnemonic: &str,
        operands: &[Operand],
        site: usize,
        range: CursorRange,
    ) -> Result<Vec<Instruction>, AssemblyError> {
        let encoding = |source| AssemblyError::Encoding {
            index: site,
            range,
            source,
        };
        let malformed = || AssemblyError::Malformed {
            message: format!("{} {}", mnemonic, operands.iter().join(" ")),
            range,
        };
        let reg = |i: usize| match operands.get(i) {
            Some(Operand::Register(register)) => Ok(*register),
            _ => Err(malformed()),
        };
        let imm = |i: usize| match operands.get(i) {
            Some(Operand::Int(value)) => int(*value).map_err(encoding),
            _ => Err(malformed()),
        };
        // a label or a raw byte offset relative to the instruction at `at`
        let target = |i: usize, at: usize| -> Result<i32, AssemblyError> {
            match operands.get(i) {
                Some(Operand::Label(label)) => {
                    int(self.label_offset(label, at, range)?).map_err(encoding)
                }
                Some(Operand::Int(value)) => int(*value).map_err(encoding),
                _ => Err(malformed()),
            }
        };
        let zero = Register::ZERO;

        if let Some((alu_op, negate, immediate)) = alu_form(mnemonic) {
            let dst = reg(0)?;
            let first = if immediate {
                opi(alu_op, dst, reg(1)?, imm(2)?)
            } else {
                op(alu_op, dst, reg(1)?, reg(2)?)
            };
            let mut lowered = vec![first];
            if negate {
                lowered.push(opi(AluOp::Eq, dst, dst, 0));
            }
            return Ok(lowered);
        }

        Ok(match mnemonic {
            "set" => vec![op(AluOp::Add, reg(0)?, reg(1)?, zero)],
            "setv" => {
                let dst = reg(0)?;
                match operands.get(1) {
                    Some(Operand::Int(value)) => {
                        vec![opi(AluOp::Add, dst, zero, int(*value).map_err(encoding)?)]
                    }
                    Some(Operand::Label(_)) => vec![opi(AluOp::Add, dst, Register::PC, target(1, site)?)],
                    Some(Operand::Constant(index)) => {
                        let offset = self.constant_offset(*index, site, range)?;
                        vec![opi(AluOp::Add, dst, Register::PC, int(offset).map_err(encoding)?)]
                    }
                    _ => return Err(malformed()),
                }
            }
            "not" => vec![opi(AluOp::Eq, reg(0)?, reg(1)?, 0)],
            "load" => vec![Instruction::Memory {
                op: MemoryOp::Load,
                reg: reg(0)?,
                base: reg(1)?,
                offset: imm(2)?,
            }],
            "store" => vec![Instruction::Memory {
                op: MemoryOp::Store,
                reg: reg(0)?,
                base: reg(1)?,
                offset: imm(2)?,
            }],
            "storev" => vec![
                opi(AluOp::Add, Register::T9, zero, imm(0)?),
                Instruction::Memory {
                    op: MemoryOp::Store,
                    reg: Register::T9,
                    base: reg(1)?,
                    offset: imm(2)?,
                },
            ],
            "jump" => vec![op(AluOp::Add, Register::PC, reg(0)?, zero)],
            "jumpv" => vec![Instruction::Jump {
                offset: target(0, site)?,
            }],
            "jumpif" => vec![
                // skip the jump when the condition is zero
                Instruction::Branch {
                    op: BranchOp::Beq,
                    src1: reg(1)?,
                    src2: zero,
                    offset: 8,
                },
                op(AluOp::Add, Register::PC, reg(0)?, zero),
            ],
            "jumpifv" => vec![Instruction::Branch {
                op: BranchOp::Bne,
                src1: reg(1)?,
                src2: zero,
                offset: target(0, site)?,
            }],
            "sys" => vec![
                op(AluOp::Add, Register::A0, reg(0)?, zero),
                Instruction::Env { op: EnvOp::Call },
            ],
            "sysv" => vec![
                opi(AluOp::Add, Register::A0, zero, imm(0)?),
                Instruction::Env { op: EnvOp::Call },
            ],
            "exit" => vec![
                op(AluOp::Add, Register::A0, reg(0)?, zero),
                op(AluOp::Add, Register::PC, zero, zero),
            ],
            "exitv" => vec![
                opi(AluOp::Add, Register::A0, zero, imm(0)?),
                op(AluOp::Add, Register::PC, zero, zero),
            ],
            _ => {
                return Err(AssemblyError::UnknownInstruction {
                    mnemonic: mnemonic.to_string(),
                    range,
                })
            }
        })
    }
}

/// Validate the mnemonic and the operands of an instruction.
fn check(mnemonic: &str, operands: &[Operand], range: CursorRange) -> Result<(), AssemblyError> {
    let kinds = signature(mnemonic).ok_or_else(|| AssemblyError::UnknownInstruction {
        mnemonic: mnemonic.to_string(),
        range,
    })?;
    if kinds.len() != operands.len() {
        return Err(AssemblyError::WrongArity {
            mnemonic: mnemonic.to_string(),
            expected: kinds.len(),
            found: operands.len(),
            range,
        });
    }
    for (position, (kind, operand)) in kinds.iter().zip(operands).enumerate() {
        if !kind.accepts(operand) {
            return Err(AssemblyError::InvalidOperand {
                mnemonic: mnemonic.to_string(),
                position: position + 1,
                expected: kind.describe(),
                found: operand.to_string(),
                range,
            });
        }
    }
    Ok(())
}

impl Listing {
    /// Collect the constants and the lines of an A tree, raw or shaken.
    pub fn from_ast(ast: &Node) -> Result<Listing, AssemblyError> {
        let mut listing = Listing::default();
        CollectLines.visit(ast, &mut listing)?;
        Ok(listing)
    }

    /// Assemble the listing into an MP0 program.
    pub fn assemble(&self) -> Result<Program, AssemblyError> {
        let context = Context::populate(self)?;
        let program = context.generate()?;
        debug!(
            "Assembled {} lines into {} data bytes and {} instructions",
            self.lines.len(),
            program.data_len(),
            program.code().len()
        );
        Ok(program)
    }
}

/// Assemble an A tree into an MP0 program.
pub fn assemble(ast: &Node) -> Result<Program, AssemblyError> {
    Listing::from_ast(ast)?.assemble()
}

struct CollectLines;

fn malformed(node: &Node, message: &str) -> AssemblyError {
    AssemblyError::Malformed {
        message: message.to_string(),
        range: range_of(node),
    }
}

fn operand(node: &Node) -> Result<Operand, AssemblyError> {
    let inner = node
        .child(0)
        .ok_or_else(|| malformed(node, "empty operand"))?;
    let integer = |n: &Node| {
        n.tokens()
            .into_iter()
            .find_map(Token::int)
            .ok_or_else(|| malformed(n, "missing integer"))
    };
    match inner.ty.as_str() {
        "name" => Ok(Operand::name(&inner.text())),
        "integer" => {
            let value = integer(inner)?;
            let negative = inner.child(0).map_or(false, |c| is_token(c, "-"))
                || inner
                    .child(0)
                    .map_or(false, |c| c.children().first().map_or(false, |c| is_token(c, "-")));
            Ok(Operand::Int(if negative { -value } else { value }))
        }
        "constant_ref" => Ok(Operand::Constant(integer(inner)? as usize)),
        _ => Err(malformed(node, "unknown operand")),
    }
}

impl Visitor for CollectLines {
    type Output = ();
    type Context = Listing;
    type Error = AssemblyError;

    fn dispatch(&mut self, node: &Node, listing: &mut Listing) -> Option<Result<(), AssemblyError>> {
        let result = match node.ty.as_str() {
            "constant" => node
                .token()
                .and_then(Token::string)
                .map(|text| listing.constants.push(text.to_string()))
                .ok_or_else(|| malformed(node, "invalid string constant")),
            "label" => {
                listing.lines.push(Line::Label {
                    name: node.tokens().first().map(|t| t.lexeme.clone()).unwrap_or_default(),
                    range: range_of(node),
                });
                Ok(())
            }
            "instruction" => {
                let operands: Result<Vec<_>, _> = node
                    .children()
                    .iter()
                    .filter(|c| c.ty == "operand")
                    .map(operand)
                    .collect();
                operands.map(|operands| {
                    listing.lines.push(Line::Instruction {
                        mnemonic: node
                            .labeled("op")
                            .map(Node::text)
                            .unwrap_or_default(),
                        operands,
                        range: range_of(node),
                    })
                })
            }
            _ => return None,
        };
        Some(result)
    }

    fn visit_nonterminal(&mut self, node: &Node, listing: &mut Listing) -> Result<(), AssemblyError> {
        self.visit_children(node, listing).map(|_| ())
    }

    fn visit_terminal(&mut self, _node: &Node, _token: &Token, _listing: &mut Listing) -> Result<(), AssemblyError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use speculoos::prelude::*;
    use workbench_mp0::{Machine, MachineConfig, RuntimeError};

    use crate::languages::a::LanguageA;
    use crate::Language;

    use super::*;

    fn listing(source: &str) -> Listing {
        let lang = LanguageA::new();
        Listing::from_ast(&lang.shake(&lang.parse(source).unwrap())).unwrap()
    }

    fn run(source: &str, input: &str) -> (Result<i32, RuntimeError>, String) {
        let program = listing(source).assemble().unwrap();
        let mut output = Vec::new();
        let result = Machine::new(MachineConfig::default(), &program, input.as_bytes(), &mut output)
            .and_then(|mut machine| machine.run());
        (result, String::from_utf8(output).unwrap())
    }

    #[test]
    fn test_listing() {
        let listing = listing(
            r#"
            .data "hi\n"
            .code
            start: setv a1 =0  # the greeting
                sysv 0
                addv t0 t0 -3
                jumpv start
            "#,
        );
        assert_eq!(listing.constants, vec!["hi\n"]);
        let lines: Vec<_> = listing.lines.iter().map(|l| l.to_string()).collect();
        assert_eq!(
            lines,
            vec!["start:", "setv a1 =0", "sysv 0", "addv t0 t0 -3", "jumpv start"]
        );
    }

    #[test]
    fn test_hello() {
        let (result, output) = run(
            r#"
            .data "hello\n"
            .code
                setv a1 =0
                sysv 0
                exitv 0
            "#,
            "",
        );
        assert_eq!(result.unwrap(), 0);
        assert_eq!(output, "hello\n");
    }

    #[test]
    fn test_constants_after_padding() {
        let (result, output) = run(
            r#"
            .data "abc" "de\n"
            .code
                setv a1 =1
                sysv 0
                setv a1 =0
                sysv 0
                exitv 7
            "#,
            "",
        );
        assert_eq!(result.unwrap(), 7);
        assert_eq!(output, "de\nabc");
    }

    #[test]
    fn test_loop_and_calls() {
        // print 3 2 1 through a subroutine
        let (result, output) = run(
            r#"
            .code
                setv s0 3
            loop:
                setv ra back
                jumpv show
            back:
                subv s0 s0 1
                neqv t0 s0 0
                jumpifv loop t0
                exit s0
            show:
                set a1 s0
                sysv 3
                jump ra
            "#,
            "",
        );
        assert_eq!(result.unwrap(), 0);
        assert_eq!(output, "321");
    }

    #[test]
    fn test_memory_and_jumpif() {
        let (result, _) = run(
            r#"
            .code
                storev 42 sp -4
                load t0 sp -4
                setv t1 skip
                setv t2 1
                jumpif t1 t2
                exitv 1
            skip:
                geqv t3 t0 42
                not t4 t3
                add a0 t0 t4
                exit a0
            "#,
            "",
        );
        assert_eq!(result.unwrap(), 42);
    }

    #[test]
    fn test_errors() {
        let unknown = Listing {
            constants: vec![],
            lines: vec![Line::instruction("push", vec![])],
        };
        assert!(matches!(
            unknown.assemble(),
            Err(AssemblyError::UnknownInstruction { .. })
        ));
        let arity = Listing {
            constants: vec![],
            lines: vec![Line::instruction("set", vec![Operand::name("t0")])],
        };
        assert!(matches!(
            arity.assemble(),
            Err(AssemblyError::WrongArity { expected: 2, found: 1, .. })
        ));
        let operand = Listing {
            constants: vec![],
            lines: vec![Line::instruction(
                "add",
                vec![Operand::name("t0"), Operand::name("t1"), Operand::Int(1)],
            )],
        };
        assert!(matches!(
            operand.assemble(),
            Err(AssemblyError::InvalidOperand { position: 3, .. })
        ));
        let duplicate = Listing {
            constants: vec![],
            lines: vec![Line::label("a"), Line::label("a")],
        };
        assert!(matches!(
            duplicate.assemble(),
            Err(AssemblyError::DuplicateLabel { .. })
        ));
        let undefined = Listing {
            constants: vec![],
            lines: vec![Line::instruction("jumpv", vec![Operand::name("nowhere")])],
        };
        assert!(matches!(
            undefined.assemble(),
            Err(AssemblyError::UndefinedLabel { .. })
        ));
        let constant = Listing {
            constants: vec!["x".into()],
            lines: vec![Line::instruction(
                "setv",
                vec![Operand::name("a1"), Operand::Constant(1)],
            )],
        };
        assert!(matches!(
            constant.assemble(),
            Err(AssemblyError::UndefinedConstant { index: 1, .. })
        ));
    }

    #[test]
    fn test_immediate_range() {
        let make = |value| Listing {
            constants: vec![],
            lines: vec![Line::instruction(
                "setv",
                vec![Operand::name("t0"), Operand::Int(value)],
            )],
        };
        assert_that!(make(32767).assemble()).is_ok();
        assert_that!(make(-32767).assemble()).is_ok();
        assert!(matches!(
            make(32768).assemble(),
            Err(AssemblyError::Encoding {
                source: InstructionError::OutOfRange { .. },
                ..
            })
        ));
    }
}
