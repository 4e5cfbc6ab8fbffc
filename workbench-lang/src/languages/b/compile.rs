//! Lowering B programs to A.
//!
//! Every named value and every intermediate result lives in a stack slot of the current
//! function. Operands are loaded into `t1` and `t2`, the result is computed in `t0` and stored
//! back to a fresh temporary slot. Literal operands are folded when possible and otherwise used
//! as immediates.

use std::collections::HashMap;

use indexmap::IndexSet;

use workbench_grammar::vocabulary::escape;
use workbench_grammar::Node;
use workbench_mp0::instruction::fits;
use workbench_mp0::Syscall;

use crate::languages::b::aggregate;
use crate::languages::b::symbols::Symbols;
use crate::languages::{is_token, range_of};
use crate::CompileError;

/// Arguments are passed in `a0..a5`.
pub const MAX_PARAMETERS: usize = 6;
/// Integer literals must fit an A immediate.
const LITERAL_BITS: u32 = 16;

/// Where the value of an expression is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Value {
    Slot(usize),
    Int(i32),
    /// The address of a string constant.
    Const(usize),
}

/// Compile a shaken B program to the source of an A program.
pub fn compile(ast: &Node) -> Result<String, CompileError> {
    let constants = aggregate::constants(ast)?;
    let functions = signatures(ast)?;
    if !functions.contains_key("main") {
        return Err(CompileError::MissingMain);
    }
    let mut unit = Unit {
        constants,
        functions,
        labels: 0,
    };

    let mut lines = vec![".data".to_string()];
    for constant in &unit.constants {
        lines.push(format!("    \"{}\"", escape(constant)));
    }
    lines.push(".code".to_string());
    let back = unit.label();
    lines.push(format!("    setv ra {}", back));
    lines.push("    jumpv fn_main".to_string());
    lines.push(format!("{}:", back));
    lines.push("    exit a0".to_string());
    for function in functions_of(ast) {
        lines.extend(Function::compile(&mut unit, function)?);
    }
    lines.push("    exitv 0".to_string());
    debug!(
        "Compiled {} functions, {} constants, {} labels",
        unit.functions.len(),
        unit.constants.len(),
        unit.labels
    );
    Ok(lines.join("\n") + "\n")
}

fn functions_of(ast: &Node) -> impl Iterator<Item = &Node> {
    ast.children().iter().filter(|c| c.ty == "function")
}

fn function_name(function: &Node) -> String {
    function
        .labeled("name")
        .map(Node::text)
        .unwrap_or_default()
}

fn parameters(function: &Node) -> Vec<String> {
    function
        .children()
        .iter()
        .find(|c| c.ty == "parameters")
        .map(|p| {
            p.children()
                .iter()
                .filter(|c| c.ty == "identifier")
                .map(Node::text)
                .collect()
        })
        .unwrap_or_default()
}

/// The number of parameters of every function.
fn signatures(ast: &Node) -> Result<HashMap<String, usize>, CompileError> {
    let mut functions = HashMap::new();
    for function in functions_of(ast) {
        let name = function_name(function);
        let count = parameters(function).len();
        let range = range_of(function);
        if count > MAX_PARAMETERS {
            return Err(CompileError::TooManyParameters {
                name,
                count,
                max: MAX_PARAMETERS,
                range,
            });
        }
        if Syscall::from_name(&name).is_some() || functions.insert(name.clone(), count).is_some() {
            return Err(CompileError::DuplicateFunction { name, range });
        }
    }
    Ok(functions)
}

/// State shared by all the functions of a program.
struct Unit {
    constants: IndexSet<String>,
    functions: HashMap<String, usize>,
    labels: usize,
}

impl Unit {
    fn label(&mut self) -> String {
        let label = format!("L{}", self.labels);
        self.labels += 1;
        label
    }
}

/// The value of the integer literal at the bottom of a chain of single child nodes.
fn literal(node: &Node) -> Option<i64> {
    match node.children() {
        [single] => literal(single),
        [] if node.ty == "integer" => node.token().and_then(|t| t.int()),
        _ => None,
    }
}

/// Split `base + k` into the base expression and the literal offset `k`.
fn peel(address: &Node) -> Option<(Node, i64)> {
    let mut current = address;
    while current.ty != "sum" {
        match current.children() {
            [single] => current = single,
            _ => return None,
        }
    }
    let children = current.children();
    let [.., op, last] = children else {
        return None;
    };
    if children.len() < 3 {
        return None;
    }
    let offset = literal(last)?;
    let offset = if is_token(op, "+") {
        offset
    } else if is_token(op, "-") {
        -offset
    } else {
        return None;
    };
    Some((current.with_children(children[..children.len() - 2].to_vec()), offset))
}

fn mnemonic(op: &str) -> Option<&'static str> {
    Some(match op {
        "+" => "add",
        "-" => "sub",
        "*" => "mul",
        "/" => "div",
        "%" => "mod",
        "|" => "or",
        "&" => "and",
        "==" => "eq",
        "!=" => "neq",
        ">" => "gt",
        ">=" => "geq",
        "<" => "lt",
        "<=" => "leq",
        _ => return None,
    })
}

/// Compute `a op b` at compile time.
fn fold(op: &str, a: i32, b: i32) -> Option<i32> {
    Some(match op {
        "+" => a.wrapping_add(b),
        "-" => a.wrapping_sub(b),
        "*" => a.wrapping_mul(b),
        "/" => a.checked_div(b)?,
        "%" => a.checked_rem(b)?,
        "|" => a | b,
        "&" => a & b,
        "==" => (a == b) as i32,
        "!=" => (a != b) as i32,
        ">" => (a > b) as i32,
        ">=" => (a >= b) as i32,
        "<" => (a < b) as i32,
        "<=" => (a <= b) as i32,
        _ => return None,
    })
}

/// The lowering of a single function.
struct Function<'u> {
    unit: &'u mut Unit,
    symbols: Symbols,
    /// Temporaries used by the current statement.
    temps: usize,
    max_temps: usize,
    code: Vec<String>,
    /// Label of the epilogue.
    end: String,
}

impl<'u> Function<'u> {
    fn compile(unit: &'u mut Unit, node: &Node) -> Result<Vec<String>, CompileError> {
        let name = function_name(node);
        let parameters = parameters(node);
        let body = node.labeled("body").ok_or_else(|| CompileError::Malformed {
            message: format!("function {} has no body", name),
            range: range_of(node),
        })?;
        let end = unit.label();
        let mut function = Function {
            unit,
            symbols: Symbols::allocate(&parameters, body),
            temps: 0,
            max_temps: 0,
            code: Vec::new(),
            end,
        };
        function.statement(body)?;

        let frame = 4 * (1 + function.symbols.len() + function.max_temps);
        trace!(
            "fn {}: {} named slots, {} temporaries",
            name,
            function.symbols.len(),
            function.max_temps
        );
        let mut lines = vec![
            format!("fn_{}:", name),
            format!("    addv sp sp -{}", frame),
            "    store ra sp 0".to_string(),
        ];
        for (i, parameter) in parameters.iter().enumerate() {
            if let Some(slot) = function.symbols.slot(parameter) {
                lines.push(format!("    store a{} sp {}", i, 4 * slot));
            }
        }
        lines.append(&mut function.code);
        lines.extend([
            "    setv a0 0".to_string(),
            format!("{}:", function.end),
            "    load ra sp 0".to_string(),
            format!("    addv sp sp {}", frame),
            "    jump ra".to_string(),
        ]);
        Ok(lines)
    }

    fn emit(&mut self, instruction: String) {
        self.code.push(format!("    {}", instruction));
    }

    fn place(&mut self, label: &str) {
        self.code.push(format!("{}:", label));
    }

    fn load(&mut self, register: &str, value: Value) {
        match value {
            Value::Slot(slot) => self.emit(format!("load {} sp {}", register, 4 * slot)),
            Value::Int(v) => self.emit(format!("setv {} {}", register, v)),
            Value::Const(index) => self.emit(format!("setv {} ={}", register, index)),
        }
    }

    /// Store `register` in a new temporary.
    fn store_temp(&mut self, register: &str) -> Value {
        let slot = 1 + self.symbols.len() + self.temps;
        self.temps += 1;
        self.max_temps = self.max_temps.max(self.temps);
        self.emit(format!("store {} sp {}", register, 4 * slot));
        Value::Slot(slot)
    }

    fn statement(&mut self, node: &Node) -> Result<(), CompileError> {
        self.temps = 0;
        match node.ty.as_str() {
            "block" => {
                for child in node.children().iter().filter(|c| !c.is_leaf()) {
                    self.statement(child)?;
                }
            }
            "while" => {
                let start = self.unit.label();
                let end = self.unit.label();
                self.place(&start);
                self.jump_unless(self.part(node, "condition")?, &end)?;
                self.statement(self.part(node, "body")?)?;
                self.emit(format!("jumpv {}", start));
                self.place(&end);
            }
            "if" => {
                let otherwise = self.unit.label();
                self.jump_unless(self.part(node, "condition")?, &otherwise)?;
                self.statement(self.part(node, "then")?)?;
                match node.labeled("otherwise") {
                    Some(branch) => {
                        let end = self.unit.label();
                        self.emit(format!("jumpv {}", end));
                        self.place(&otherwise);
                        self.statement(branch)?;
                        self.place(&end);
                    }
                    None => self.place(&otherwise),
                }
            }
            "return" => {
                match node.labeled("value") {
                    Some(value) => {
                        let value = self.expression(value)?;
                        self.load("a0", value);
                    }
                    None => self.emit("setv a0 0".to_string()),
                }
                self.emit(format!("jumpv {}", self.end));
            }
            "assignment" => {
                let target = self.part(node, "target")?.text();
                let slot = self.symbols.slot(&target).ok_or_else(|| CompileError::Malformed {
                    message: format!("no slot for {}", target),
                    range: range_of(node),
                })?;
                let value = self.expression(self.part(node, "value")?)?;
                self.load("t0", value);
                self.emit(format!("store t0 sp {}", 4 * slot));
            }
            "store" => {
                let (base, offset) = self.address(self.part(node, "address")?)?;
                let value = self.expression(self.part(node, "value")?)?;
                self.load("t0", base);
                self.load("t1", value);
                self.emit(format!("store t1 t0 {}", offset));
            }
            "call_statement" => {
                let call = node
                    .children()
                    .iter()
                    .find(|c| c.ty == "call")
                    .ok_or_else(|| malformed(node, "call statement without a call"))?;
                self.call(call)?;
            }
            "empty" => {}
            _ => return Err(malformed(node, "unknown statement")),
        }
        Ok(())
    }

    fn part<'n>(&self, node: &'n Node, label: &str) -> Result<&'n Node, CompileError> {
        node.labeled(label)
            .ok_or_else(|| malformed(node, &format!("missing {}", label)))
    }

    /// Jump to `target` when `condition` is zero.
    fn jump_unless(&mut self, condition: &Node, target: &str) -> Result<(), CompileError> {
        let value = self.expression(condition)?;
        self.load("t0", value);
        self.emit("eqv t0 t0 0".to_string());
        self.emit(format!("jumpifv {} t0", target));
        Ok(())
    }

    /// The base and the literal offset of a memory address.
    fn address(&mut self, node: &Node) -> Result<(Value, i64), CompileError> {
        match peel(node) {
            Some((base, offset)) => {
                if !fits(offset, LITERAL_BITS) {
                    return Err(CompileError::LiteralOutOfRange {
                        value: offset,
                        range: range_of(node),
                    });
                }
                Ok((self.expression(&base)?, offset))
            }
            None => Ok((self.expression(node)?, 0)),
        }
    }

    fn expression(&mut self, node: &Node) -> Result<Value, CompileError> {
        match node.ty.as_str() {
            "expression" | "conjunction" | "equality" | "comparison" | "sum" | "product" => {
                let children = node.children();
                let (first, rest) = children
                    .split_first()
                    .ok_or_else(|| malformed(node, "empty operation"))?;
                let mut value = self.expression(first)?;
                for pair in rest.chunks(2) {
                    let [op, operand] = pair else {
                        return Err(malformed(node, "dangling operator"));
                    };
                    let rhs = self.expression(operand)?;
                    value = self.binary(op, value, rhs)?;
                }
                Ok(value)
            }
            "unary" => match node.children() {
                [op, operand] if op.is_leaf() => {
                    let value = self.expression(operand)?;
                    self.unary(op, value)
                }
                [open, inner, close] if is_token(open, "(") && is_token(close, ")") => {
                    self.expression(inner)
                }
                [single] => self.expression(single),
                _ => Err(malformed(node, "invalid unary expression")),
            },
            "integer" => {
                let value = node
                    .token()
                    .and_then(|t| t.int())
                    .ok_or_else(|| malformed(node, "invalid integer"))?;
                if !fits(value, LITERAL_BITS) {
                    return Err(CompileError::LiteralOutOfRange {
                        value,
                        range: range_of(node),
                    });
                }
                Ok(Value::Int(value as i32))
            }
            "string" => {
                let text = node.token().and_then(|t| t.string()).unwrap_or_default();
                self.unit
                    .constants
                    .get_index_of(text)
                    .map(Value::Const)
                    .ok_or_else(|| malformed(node, "string literal missing from the data"))
            }
            "variable" => {
                let name = node.text();
                self.symbols
                    .slot(&name)
                    .map(Value::Slot)
                    .ok_or(CompileError::UndefinedVariable {
                        name,
                        range: range_of(node),
                    })
            }
            "call" => self.call(node),
            "load" => {
                let (base, offset) = self.address(self.part(node, "address")?)?;
                self.load("t1", base);
                self.emit(format!("load t0 t1 {}", offset));
                Ok(self.store_temp("t0"))
            }
            _ => Err(malformed(node, "unknown expression")),
        }
    }

    fn unary(&mut self, op: &Node, value: Value) -> Result<Value, CompileError> {
        let negate = is_token(op, "-");
        if !negate && !is_token(op, "!") {
            return Err(malformed(op, "unknown unary operator"));
        }
        if let Value::Int(v) = value {
            return Ok(Value::Int(if negate { v.wrapping_neg() } else { (v == 0) as i32 }));
        }
        self.load("t1", value);
        if negate {
            self.emit("sub t0 r0 t1".to_string());
        } else {
            self.emit("not t0 t1".to_string());
        }
        Ok(self.store_temp("t0"))
    }

    fn binary(&mut self, op: &Node, lhs: Value, rhs: Value) -> Result<Value, CompileError> {
        let text = op.token().map(|t| t.lexeme.as_str()).unwrap_or_default();
        let mnemonic = mnemonic(text).ok_or_else(|| malformed(op, "unknown operator"))?;
        if matches!(text, "/" | "%") && rhs == Value::Int(0) {
            return Err(CompileError::DivisionByZero {
                range: range_of(op),
            });
        }
        if let (Value::Int(a), Value::Int(b)) = (lhs, rhs) {
            if let Some(folded) = fold(text, a, b).filter(|v| fits(*v as i64, LITERAL_BITS)) {
                return Ok(Value::Int(folded));
            }
        }
        self.load("t1", lhs);
        match rhs {
            Value::Int(v) => self.emit(format!("{}v t0 t1 {}", mnemonic, v)),
            _ => {
                self.load("t2", rhs);
                self.emit(format!("{} t0 t1 t2", mnemonic));
            }
        }
        Ok(self.store_temp("t0"))
    }

    fn call(&mut self, node: &Node) -> Result<Value, CompileError> {
        let name = self.part(node, "name")?.text();
        let arguments: Vec<&Node> = node
            .children()
            .iter()
            .find(|c| c.ty == "arguments")
            .map(|a| a.children().iter().filter(|c| !c.is_leaf()).collect())
            .unwrap_or_default();
        let expected = match Syscall::from_name(&name) {
            Some(_) => 1,
            None => *self.unit.functions.get(&name).ok_or_else(|| {
                CompileError::UnknownFunction {
                    name: name.clone(),
                    range: range_of(node),
                }
            })?,
        };
        if arguments.len() != expected {
            return Err(CompileError::ArityMismatch {
                name,
                expected,
                found: arguments.len(),
                range: range_of(node),
            });
        }
        let values = arguments
            .into_iter()
            .map(|argument| self.expression(argument))
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(syscall) = Syscall::from_name(&name) {
            self.load("a1", values[0]);
            self.emit(format!("sysv {}", syscall.id()));
        } else {
            for (i, value) in values.into_iter().enumerate() {
                self.load(&format!("a{}", i), value);
            }
            let back = self.unit.label();
            self.emit(format!("setv ra {}", back));
            self.emit(format!("jumpv fn_{}", name));
            self.place(&back);
        }
        Ok(self.store_temp("a0"))
    }
}

fn malformed(node: &Node, message: &str) -> CompileError {
    CompileError::Malformed {
        message: message.to_string(),
        range: range_of(node),
    }
}
