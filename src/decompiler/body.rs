//! Lifting CIL method bodies to C# statements.
//!
//! The lifter simulates the evaluation stack over straight-line code and builds expression
//! text with operator precedence, so parentheses appear only where needed. Control flow is
//! limited to forward conditional branches that skip a block, which become `if` statements
//! without `else`. Anything else makes [`lift`] fail and the caller falls back to an IL
//! listing.

use crate::{
    decompiler::namer::TypeNamer,
    metadata::{
        escape_string, FieldReference, Instruction, MethodDefinition, MethodReference, Operand,
        PrimitiveType, TypeDefinition, TypeScope, TypeSig,
    },
};

const PREC_ASSIGN: u8 = 1;
const PREC_OR: u8 = 6;
const PREC_XOR: u8 = 7;
const PREC_AND: u8 = 8;
const PREC_EQUALITY: u8 = 9;
const PREC_RELATIONAL: u8 = 10;
const PREC_SHIFT: u8 = 11;
const PREC_ADDITIVE: u8 = 12;
const PREC_MULTIPLICATIVE: u8 = 13;
const PREC_UNARY: u8 = 14;
const PREC_PRIMARY: u8 = 15;

/// A lifted statement.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Stmt {
    /// An expression or declaration statement, without the trailing `;`
    Line(String),
    /// `return;` or `return expr;`
    Return(Option<String>),
    /// `if (condition) { body }`
    If {
        condition: String,
        body: Vec<Stmt>,
    },
}

/// Result of lifting a method body.
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct LiftedBody {
    /// Constructor initializer such as `base(name)`
    pub(crate) initializer: Option<String>,
    pub(crate) statements: Vec<Stmt>,
}

impl LiftedBody {
    /// The returned expression, if the body is nothing but a single `return expr;`.
    pub(crate) fn single_return(&self) -> Option<&str> {
        match self.statements.as_slice() {
            [Stmt::Return(Some(expr))] => Some(expr),
            _ => None,
        }
    }
}

/// How a stack value relates to the statements written after it was pushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    /// Evaluated where the text ends up; must not be duplicated or moved past a statement
    Computed,
    /// An argument or local; may be read twice, but a later store can change it
    Variable,
    /// A constant, `this` or a temporary; never changes
    Fixed,
}

#[derive(Debug, Clone)]
struct Expr {
    text: String,
    prec: u8,
    /// Operands of a comparison, kept so the comparison can be negated
    compare: Option<(String, &'static str, String)>,
    literal: Option<i64>,
    has_effect: bool,
    origin: Origin,
}

impl Expr {
    fn atom(text: impl Into<String>) -> Self {
        Expr {
            text: text.into(),
            prec: PREC_PRIMARY,
            compare: None,
            literal: None,
            has_effect: false,
            origin: Origin::Computed,
        }
    }

    fn variable(text: impl Into<String>) -> Self {
        Expr {
            origin: Origin::Variable,
            ..Expr::atom(text)
        }
    }

    fn fixed(text: impl Into<String>) -> Self {
        Expr {
            origin: Origin::Fixed,
            ..Expr::atom(text)
        }
    }

    fn with_prec(text: String, prec: u8) -> Self {
        Expr {
            prec,
            ..Expr::atom(text)
        }
    }

    fn literal(value: i64) -> Self {
        Expr {
            literal: Some(value),
            ..Expr::fixed(value.to_string())
        }
    }

    fn effect(text: String) -> Self {
        Expr {
            has_effect: true,
            ..Expr::atom(text)
        }
    }

    /// Text, parenthesized if it binds looser than `min`.
    fn at(&self, min: u8) -> String {
        if self.prec < min {
            format!("({})", self.text)
        } else {
            self.text.clone()
        }
    }

    fn negated(&self) -> String {
        if let Some((left, op, right)) = &self.compare {
            let inverse = match *op {
                "==" => "!=",
                "!=" => "==",
                "<" => ">=",
                ">=" => "<",
                ">" => "<=",
                _ => ">",
            };
            return format!("{left} {inverse} {right}");
        }
        format!("!{}", self.at(PREC_UNARY))
    }
}

fn binary(left: &Expr, op: &'static str, right: &Expr, prec: u8) -> Expr {
    let text = format!("{} {op} {}", left.at(prec), right.at(prec + 1));
    let mut expr = Expr::with_prec(text, prec);
    if prec == PREC_EQUALITY || prec == PREC_RELATIONAL {
        expr.compare = Some((left.at(prec), op, right.at(prec + 1)));
    }
    expr
}

/// Why a body could not be lifted.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Unsupported(pub(crate) String);

type Lift<T> = std::result::Result<T, Unsupported>;

fn unsupported<T>(reason: impl Into<String>) -> Lift<T> {
    Err(Unsupported(reason.into()))
}

/// Lift the body of `method`, declared by `owner`.
pub(crate) fn lift(
    owner: &TypeDefinition,
    method: &MethodDefinition,
    namer: &mut TypeNamer<'_>,
    call_space: bool,
) -> Lift<LiftedBody> {
    let Some(body) = &method.body else {
        return unsupported("method has no body");
    };

    let mut lifter = Lifter {
        owner,
        method,
        instructions: &body.instructions,
        locals: &body.locals,
        declared: vec![false; body.locals.len()],
        namer,
        call_space,
        initializer: None,
        temporaries: 0,
    };

    let mut statements = lifter.range(0, body.instructions.len())?;
    if statements.last() == Some(&Stmt::Return(None)) {
        statements.pop();
    }

    Ok(LiftedBody {
        initializer: lifter.initializer,
        statements,
    })
}

struct Lifter<'a, 'n, 'm> {
    owner: &'a TypeDefinition,
    method: &'a MethodDefinition,
    instructions: &'a [Instruction],
    locals: &'a [TypeSig],
    declared: Vec<bool>,
    namer: &'n mut TypeNamer<'m>,
    call_space: bool,
    initializer: Option<String>,
    temporaries: usize,
}

impl Lifter<'_, '_, '_> {
    fn offset_at(&self, index: usize) -> Option<u32> {
        self.instructions.get(index).map(|ins| ins.offset)
    }

    /// Lift `instructions[start..end]`; the stack must be empty at both ends.
    fn range(&mut self, start: usize, end: usize) -> Lift<Vec<Stmt>> {
        let mut stack: Vec<Expr> = Vec::new();
        let mut out: Vec<Stmt> = Vec::new();
        let mut index = start;

        let instructions = self.instructions;
        while index < end {
            let ins = &instructions[index];
            let op = ins.opcode.as_str();

            if let Some(negate_on) = conditional_branch(op) {
                let Operand::Branch(target) = ins.operand else {
                    return unsupported(format!("{op} without target"));
                };
                let Some(skip_to) = (index + 1..=end).find(|&i| self.offset_at(i) == Some(target))
                else {
                    return unsupported(format!("branch to IL_{target:04x} leaves the block"));
                };

                let condition = match negate_on {
                    Branch::True => pop(&mut stack)?.negated(),
                    Branch::False => pop(&mut stack)?.at(0),
                    Branch::Compare(op, prec) => {
                        let right = pop(&mut stack)?;
                        let left = pop(&mut stack)?;
                        binary(&left, op, &right, prec).text
                    }
                };
                if !stack.is_empty() {
                    return unsupported("conditional branch with values on the stack");
                }

                let body = self.range(index + 1, skip_to)?;
                out.push(Stmt::If { condition, body });
                index = skip_to;
                continue;
            }

            self.step(index, &mut stack, &mut out)?;
            index += 1;
        }

        if !stack.is_empty() {
            return unsupported("values left on the stack");
        }
        Ok(out)
    }

    /// Write `stmt`, first moving every value still on the stack that the statement could
    /// change or reorder into a temporary.
    fn emit(&mut self, stack: &mut [Expr], out: &mut Vec<Stmt>, stmt: Stmt) {
        self.spill(stack, out);
        out.push(stmt);
    }

    fn spill(&mut self, stack: &mut [Expr], out: &mut Vec<Stmt>) {
        for value in stack.iter_mut().filter(|value| value.origin != Origin::Fixed) {
            let name = format!("V_{}", self.locals.len() + self.temporaries);
            self.temporaries += 1;
            out.push(Stmt::Line(format!("var {name} = {}", value.at(PREC_ASSIGN + 1))));
            *value = Expr::fixed(name);
        }
    }

    fn step(&mut self, index: usize, stack: &mut Vec<Expr>, out: &mut Vec<Stmt>) -> Lift<()> {
        let instructions = self.instructions;
        let ins = &instructions[index];
        let op = ins.opcode.as_str();

        match op {
            "nop" => {}
            "ldarg" | "ldarg.s" | "ldarga" | "ldarga.s" | "ldarg.0" | "ldarg.1" | "ldarg.2"
            | "ldarg.3" => {
                let slot = slot_index(ins)?;
                let name = self.argument(slot)?;
                if name == "this" {
                    stack.push(Expr::fixed(name));
                } else {
                    stack.push(Expr::variable(name));
                }
            }
            "starg" | "starg.s" => {
                let value = pop(stack)?;
                let slot = slot_index(ins)?;
                let name = self.argument(slot)?;
                let line = format!("{name} = {}", value.at(PREC_ASSIGN));
                self.emit(stack, out, Stmt::Line(line));
            }
            "ldloc" | "ldloc.s" | "ldloca" | "ldloca.s" | "ldloc.0" | "ldloc.1" | "ldloc.2"
            | "ldloc.3" => {
                let slot = slot_index(ins)?;
                stack.push(Expr::variable(format!("V_{slot}")));
            }
            "stloc" | "stloc.s" | "stloc.0" | "stloc.1" | "stloc.2" | "stloc.3" => {
                let value = pop(stack)?;
                let slot = usize::from(slot_index(ins)?);
                let Some(local_type) = self.locals.get(slot) else {
                    return unsupported(format!("local V_{slot} out of range"));
                };
                let value = self.coerce(&value, local_type);
                let line = if self.declared[slot] {
                    format!("V_{slot} = {value}")
                } else {
                    self.declared[slot] = true;
                    format!("{} V_{slot} = {value}", self.namer.name(local_type))
                };
                self.emit(stack, out, Stmt::Line(line));
            }
            "ldnull" => stack.push(Expr::fixed("null")),
            "ldstr" => match &ins.operand {
                Operand::String(value) => {
                    stack.push(Expr::fixed(format!("\"{}\"", escape_string(value))));
                }
                _ => return unsupported("ldstr without string"),
            },
            "ldc.r4" | "ldc.r8" => match ins.operand {
                Operand::Float(value) => {
                    let mut text = if value.fract() == 0.0 && value.is_finite() {
                        format!("{value:.1}")
                    } else {
                        value.to_string()
                    };
                    if op == "ldc.r4" {
                        text.push('f');
                    }
                    stack.push(Expr::fixed(text));
                }
                _ => return unsupported(format!("{op} without value")),
            },
            _ if op.starts_with("ldc.i") => stack.push(Expr::literal(int_constant(ins)?)),
            "dup" => {
                let Some(top) = stack.last() else {
                    return unsupported("stack underflow");
                };
                if top.origin == Origin::Computed {
                    self.spill(stack, out);
                }
                let top = pop(stack)?;
                stack.push(top.clone());
                stack.push(top);
            }
            "pop" => {
                let value = pop(stack)?;
                if value.has_effect {
                    self.emit(stack, out, Stmt::Line(value.text));
                }
            }
            "ret" => {
                if self.method.return_type.is_void() {
                    out.push(Stmt::Return(None));
                } else {
                    let value = pop(stack)?;
                    let value = self.coerce(&value, &self.method.return_type);
                    out.push(Stmt::Return(Some(value)));
                }
            }
            "throw" => {
                let value = pop(stack)?;
                self.emit(stack, out, Stmt::Line(format!("throw {}", value.text)));
            }
            "br" | "br.s" => {
                let Operand::Branch(target) = ins.operand else {
                    return unsupported(format!("{op} without target"));
                };
                if self.offset_at(index + 1) != Some(target) {
                    return unsupported(format!("jump to IL_{target:04x}"));
                }
            }
            "ldfld" | "ldflda" => {
                let field = field_operand(ins)?;
                let target = pop(stack)?;
                stack.push(Expr::atom(self.instance_member(&target, &field.name)));
            }
            "stfld" => {
                let field = field_operand(ins)?;
                let value = pop(stack)?;
                let target = pop(stack)?;
                let value = self.coerce(&value, &field.field_type);
                let access = self.instance_member(&target, &field.name);
                self.emit(stack, out, Stmt::Line(format!("{access} = {value}")));
            }
            "ldsfld" | "ldsflda" => {
                let field = field_operand(ins)?;
                stack.push(Expr::atom(self.static_member(&field.declaring_type, &field.name)));
            }
            "stsfld" => {
                let field = field_operand(ins)?;
                let value = pop(stack)?;
                let value = self.coerce(&value, &field.field_type);
                let access = self.static_member(&field.declaring_type, &field.name);
                self.emit(stack, out, Stmt::Line(format!("{access} = {value}")));
            }
            "call" | "callvirt" => {
                let Operand::Method(reference) = &ins.operand else {
                    return unsupported(format!("{op} without method"));
                };
                self.call(reference, op == "callvirt", stack, out)?;
            }
            "newobj" => {
                let Operand::Method(reference) = &ins.operand else {
                    return unsupported("newobj without constructor");
                };
                let args = self.arguments(reference, stack)?;
                let type_name = self.namer.name(&reference.declaring_type);
                stack.push(Expr::effect(format!(
                    "new {type_name}{}({})",
                    self.space(),
                    args.join(", ")
                )));
            }
            "newarr" => {
                let Operand::Type(element) = &ins.operand else {
                    return unsupported("newarr without element type");
                };
                let length = pop(stack)?;
                let element = self.namer.name(element);
                stack.push(Expr::atom(format!("new {element}[{}]", length.text)));
            }
            "ldlen" => {
                let array = pop(stack)?;
                stack.push(Expr::atom(format!("{}.Length", array.at(PREC_PRIMARY))));
            }
            _ if op.starts_with("ldelem") => {
                let position = pop(stack)?;
                let array = pop(stack)?;
                stack.push(Expr::atom(format!(
                    "{}[{}]",
                    array.at(PREC_PRIMARY),
                    position.text
                )));
            }
            _ if op.starts_with("stelem") => {
                let value = pop(stack)?;
                let position = pop(stack)?;
                let array = pop(stack)?;
                let line = format!(
                    "{}[{}] = {}",
                    array.at(PREC_PRIMARY),
                    position.text,
                    value.at(PREC_ASSIGN)
                );
                self.emit(stack, out, Stmt::Line(line));
            }
            "initobj" => {
                let Operand::Type(ty) = &ins.operand else {
                    return unsupported("initobj without type");
                };
                let target = pop(stack)?;
                let type_name = self.namer.name(ty);
                let line = format!("{} = default({type_name})", target.text);
                self.emit(stack, out, Stmt::Line(line));
            }
            "castclass" | "unbox.any" => {
                let Operand::Type(ty) = &ins.operand else {
                    return unsupported(format!("{op} without type"));
                };
                let value = pop(stack)?;
                let type_name = self.namer.name(ty);
                stack.push(Expr::with_prec(
                    format!("({type_name}){}", value.at(PREC_UNARY)),
                    PREC_UNARY,
                ));
            }
            "isinst" => {
                let Operand::Type(ty) = &ins.operand else {
                    return unsupported("isinst without type");
                };
                let value = pop(stack)?;
                let type_name = self.namer.name(ty);
                stack.push(Expr::with_prec(
                    format!("{} as {type_name}", value.at(PREC_RELATIONAL)),
                    PREC_RELATIONAL,
                ));
            }
            "box" => {}
            "neg" | "not" => {
                let value = pop(stack)?;
                let sign = if op == "neg" { "-" } else { "~" };
                stack.push(Expr::with_prec(
                    format!("{sign}{}", value.at(PREC_UNARY)),
                    PREC_UNARY,
                ));
            }
            "ceq" | "cgt" | "cgt.un" | "clt" | "clt.un" => {
                let right = pop(stack)?;
                let left = pop(stack)?;
                let expr = match op {
                    "ceq" if right.literal == Some(0) && left.compare.is_some() => {
                        Expr::with_prec(left.negated(), PREC_EQUALITY)
                    }
                    "ceq" => binary(&left, "==", &right, PREC_EQUALITY),
                    "cgt.un" if right.text == "null" => binary(&left, "!=", &right, PREC_EQUALITY),
                    "cgt" | "cgt.un" => binary(&left, ">", &right, PREC_RELATIONAL),
                    _ => binary(&left, "<", &right, PREC_RELATIONAL),
                };
                stack.push(expr);
            }
            _ if op.starts_with("conv.") => {
                let value = pop(stack)?;
                let previous = index.checked_sub(1).map(|i| instructions[i].opcode.as_str());
                if op == "conv.i4" && previous == Some("ldlen") {
                    stack.push(value);
                } else {
                    let keyword = conversion_keyword(op)
                        .ok_or_else(|| Unsupported(format!("unsupported conversion {op}")))?;
                    stack.push(Expr::with_prec(
                        format!("({keyword}){}", value.at(PREC_UNARY)),
                        PREC_UNARY,
                    ));
                }
            }
            _ => {
                let Some((symbol, prec)) = binary_operator(op) else {
                    return unsupported(format!("unsupported instruction {op}"));
                };
                let right = pop(stack)?;
                let left = pop(stack)?;
                stack.push(binary(&left, symbol, &right, prec));
            }
        }

        Ok(())
    }

    fn space(&self) -> &'static str {
        if self.call_space {
            " "
        } else {
            ""
        }
    }

    fn argument(&self, slot: u16) -> Lift<String> {
        let mut position = usize::from(slot);
        if !self.method.is_static() {
            if position == 0 {
                return Ok("this".to_string());
            }
            position -= 1;
        }
        self.method
            .parameters
            .get(position)
            .map(|param| param.name.clone())
            .ok_or_else(|| Unsupported(format!("argument {slot} out of range")))
    }

    fn coerce(&self, value: &Expr, target: &TypeSig) -> String {
        match (value.literal, target) {
            (Some(0), TypeSig::Primitive(PrimitiveType::Boolean)) => "false".to_string(),
            (Some(1), TypeSig::Primitive(PrimitiveType::Boolean)) => "true".to_string(),
            (Some(code), TypeSig::Primitive(PrimitiveType::Char)) => u32::try_from(code)
                .ok()
                .and_then(char::from_u32)
                .map_or_else(|| value.text.clone(), |c| format!("'{}'", c.escape_default())),
            _ => value.at(PREC_ASSIGN + 1),
        }
    }

    fn is_owner(&self, sig: &TypeSig) -> bool {
        let TypeSig::Named(reference) = sig else {
            return false;
        };
        reference.scope == TypeScope::Module
            && reference.namespace == self.owner.full_name.namespace
            && reference.name == self.owner.full_name.names.join(".")
    }

    fn instance_member(&self, target: &Expr, name: &str) -> String {
        if target.text == "this" {
            let shadowed = self.method.parameters.iter().any(|param| param.name == name);
            if shadowed {
                format!("this.{name}")
            } else {
                name.to_string()
            }
        } else {
            format!("{}.{name}", target.at(PREC_PRIMARY))
        }
    }

    fn static_member(&mut self, declaring_type: &TypeSig, name: &str) -> String {
        if self.is_owner(declaring_type) {
            name.to_string()
        } else {
            format!("{}.{name}", self.namer.name(declaring_type))
        }
    }

    fn arguments(&mut self, reference: &MethodReference, stack: &mut Vec<Expr>) -> Lift<Vec<String>> {
        let mut args = Vec::with_capacity(reference.parameters.len());
        for parameter in reference.parameters.iter().rev() {
            let value = pop(stack)?;
            let text = match parameter {
                TypeSig::ByRef(_) => format!("ref {}", value.text),
                other => self.coerce(&value, other),
            };
            args.push(text);
        }
        args.reverse();
        Ok(args)
    }

    fn call(
        &mut self,
        reference: &MethodReference,
        is_virtual: bool,
        stack: &mut Vec<Expr>,
        out: &mut Vec<Stmt>,
    ) -> Lift<()> {
        let args = self.arguments(reference, stack)?;
        let target = if reference.has_this {
            Some(pop(stack)?)
        } else {
            None
        };
        let name = reference.name.as_str();

        if name == ".ctor" {
            let from_constructor = self.method.name == ".ctor"
                && target.as_ref().is_some_and(|t| t.text == "this")
                && out.is_empty()
                && self.initializer.is_none();
            if !from_constructor {
                return unsupported("constructor call outside of an initializer");
            }

            let keyword = if self.is_owner(&reference.declaring_type) {
                "this"
            } else {
                "base"
            };
            if keyword == "this" || !args.is_empty() {
                self.initializer = Some(format!("{keyword}{}({})", self.space(), args.join(", ")));
            } else {
                self.initializer = Some(String::new());
            }
            return Ok(());
        }

        let receiver = match &target {
            Some(target) if target.text == "this" => {
                if !is_virtual && !self.is_owner(&reference.declaring_type) {
                    "base.".to_string()
                } else {
                    String::new()
                }
            }
            Some(target) => format!("{}.", target.at(PREC_PRIMARY)),
            None if self.is_owner(&reference.declaring_type) => String::new(),
            None => format!("{}.", self.namer.name(&reference.declaring_type)),
        };

        if let Some(property) = name.strip_prefix("get_") {
            if property == "Item" && !args.is_empty() {
                let indexed = receiver.strip_suffix('.').unwrap_or("this");
                stack.push(Expr::atom(format!("{indexed}[{}]", args.join(", "))));
                return Ok(());
            }
            if args.is_empty() {
                stack.push(Expr::atom(format!("{receiver}{property}")));
                return Ok(());
            }
        }

        if let Some(property) = name.strip_prefix("set_") {
            if let Some((value, index)) = args.split_last() {
                if property == "Item" && !index.is_empty() {
                    let indexed = receiver.strip_suffix('.').unwrap_or("this");
                    let line = format!("{indexed}[{}] = {value}", index.join(", "));
                    self.emit(stack, out, Stmt::Line(line));
                    return Ok(());
                }
                if index.is_empty() {
                    let line = format!("{receiver}{property} = {value}");
                    self.emit(stack, out, Stmt::Line(line));
                    return Ok(());
                }
            }
        }

        if target.is_none()
            && name == "Concat"
            && (2..=4).contains(&args.len())
            && matches!(&reference.declaring_type, TypeSig::Named(r) if r.is("System", "String"))
            && reference
                .parameters
                .iter()
                .all(|p| !matches!(p, TypeSig::Array { .. }))
        {
            stack.push(Expr::with_prec(args.join(" + "), PREC_ADDITIVE));
            return Ok(());
        }

        let text = format!("{receiver}{name}{}({})", self.space(), args.join(", "));
        if reference.return_type.is_void() {
            self.emit(stack, out, Stmt::Line(text));
        } else {
            stack.push(Expr::effect(text));
        }
        Ok(())
    }
}

enum Branch {
    /// Jumps when the value is true, so the skipped block runs when it is false
    True,
    /// Jumps when the value is false
    False,
    /// Jumps when the comparison fails, so the skipped block runs when it holds
    Compare(&'static str, u8),
}

fn conditional_branch(op: &str) -> Option<Branch> {
    let base = op.strip_suffix(".s").unwrap_or(op);
    let base = base.strip_suffix(".un").unwrap_or(base);
    Some(match base {
        "brtrue" | "brinst" => Branch::True,
        "brfalse" | "brnull" | "brzero" => Branch::False,
        "beq" => Branch::Compare("!=", PREC_EQUALITY),
        "bne" => Branch::Compare("==", PREC_EQUALITY),
        "bge" => Branch::Compare("<", PREC_RELATIONAL),
        "bgt" => Branch::Compare("<=", PREC_RELATIONAL),
        "ble" => Branch::Compare(">", PREC_RELATIONAL),
        "blt" => Branch::Compare(">=", PREC_RELATIONAL),
        _ => return None,
    })
}

fn binary_operator(op: &str) -> Option<(&'static str, u8)> {
    let base = op.split('.').next().unwrap_or(op);
    Some(match base {
        "add" => ("+", PREC_ADDITIVE),
        "sub" => ("-", PREC_ADDITIVE),
        "mul" => ("*", PREC_MULTIPLICATIVE),
        "div" => ("/", PREC_MULTIPLICATIVE),
        "rem" => ("%", PREC_MULTIPLICATIVE),
        "and" => ("&", PREC_AND),
        "or" => ("|", PREC_OR),
        "xor" => ("^", PREC_XOR),
        "shl" => ("<<", PREC_SHIFT),
        "shr" => (">>", PREC_SHIFT),
        _ => return None,
    })
}

fn conversion_keyword(op: &str) -> Option<&'static str> {
    let target = op
        .trim_start_matches("conv.")
        .trim_start_matches("ovf.")
        .trim_end_matches(".un");
    Some(match target {
        "i1" => "sbyte",
        "u1" => "byte",
        "i2" => "short",
        "u2" => "ushort",
        "i4" => "int",
        "u4" => "uint",
        "i8" => "long",
        "u8" => "ulong",
        "r4" => "float",
        "r8" | "r" => "double",
        "i" => "nint",
        "u" => "nuint",
        _ => return None,
    })
}

fn pop(stack: &mut Vec<Expr>) -> Lift<Expr> {
    stack
        .pop()
        .ok_or_else(|| Unsupported("stack underflow".to_string()))
}

fn field_operand(ins: &Instruction) -> Lift<FieldReference> {
    match &ins.operand {
        Operand::Field(field) => Ok(field.clone()),
        _ => unsupported(format!("{} without field", ins.opcode)),
    }
}

/// Argument or local index, from the operand or the short-form mnemonic suffix.
fn slot_index(ins: &Instruction) -> Lift<u16> {
    let index = match &ins.operand {
        Operand::Argument(index) | Operand::Local(index) => Some(*index),
        Operand::Int(value) => u16::try_from(*value).ok(),
        _ => ins
            .opcode
            .rsplit('.')
            .next()
            .and_then(|suffix| suffix.parse::<u16>().ok()),
    };
    index.ok_or_else(|| Unsupported(format!("{} without index", ins.opcode)))
}

fn int_constant(ins: &Instruction) -> Lift<i64> {
    if let Operand::Int(value) = ins.operand {
        return Ok(value);
    }
    match ins.opcode.rsplit('.').next() {
        Some("m1" | "M1") => Ok(-1),
        Some(suffix) => suffix
            .parse::<i64>()
            .map_err(|_| Unsupported(format!("{} without value", ins.opcode))),
        None => unsupported("constant without value"),
    }
}

/// Commented IL listing used when a body cannot be lifted.
pub(crate) fn il_listing(method: &MethodDefinition) -> Vec<String> {
    let mut lines = vec!["// Decompilation not supported; IL follows".to_string()];
    if let Some(body) = &method.body {
        lines.extend(body.instructions.iter().map(|ins| format!("// {ins}")));
    }
    lines
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        metadata::{MethodBody, ModuleDefinition, ParameterDefinition, TypeReference},
        reader::NullResolver,
    };

    fn int() -> TypeSig {
        TypeSig::Primitive(PrimitiveType::Int32)
    }

    fn ins(offset: u32, opcode: &str, operand: Operand) -> Instruction {
        Instruction::new(offset, opcode, operand)
    }

    fn widget() -> TypeDefinition {
        let mut ty = TypeDefinition::new(0x0200_0002, "Acme", "Widget");
        ty.assign_full_names(None);
        ty
    }

    fn method_with(name: &str, return_type: TypeSig, instructions: Vec<Instruction>) -> MethodDefinition {
        let mut method = MethodDefinition::new(0x0600_0001, name, return_type);
        method.parameters = vec![
            ParameterDefinition::new("a", int()),
            ParameterDefinition::new("b", int()),
        ];
        method.body = Some(MethodBody {
            max_stack: 2,
            locals: vec![int()],
            instructions,
        });
        method
    }

    fn run(method: &MethodDefinition) -> Lift<LiftedBody> {
        let module = ModuleDefinition::new("Acme.dll", Vec::new(), Vec::new(), Arc::new(NullResolver));
        let mut namer = TypeNamer::new(&module);
        lift(&widget(), method, &mut namer, false)
    }

    #[test]
    fn arithmetic_with_precedence() {
        let method = method_with(
            "Mix",
            int(),
            vec![
                ins(0, "ldarg.1", Operand::None),
                ins(1, "ldarg.2", Operand::None),
                ins(2, "add", Operand::None),
                ins(3, "ldc.i4.3", Operand::None),
                ins(4, "mul", Operand::None),
                ins(5, "ret", Operand::None),
            ],
        );
        let lifted = run(&method).unwrap();
        assert_eq!(lifted.single_return(), Some("(a + b) * 3"));
    }

    #[test]
    fn forward_branch_becomes_if() {
        let method = method_with(
            "Clamp",
            int(),
            vec![
                ins(0, "ldarg.1", Operand::None),
                ins(1, "ldc.i4.0", Operand::None),
                ins(2, "bge.s", Operand::Branch(6)),
                ins(4, "ldc.i4.0", Operand::None),
                ins(5, "ret", Operand::None),
                ins(6, "ldarg.1", Operand::None),
                ins(7, "ret", Operand::None),
            ],
        );
        let lifted = run(&method).unwrap();
        assert_eq!(
            lifted.statements,
            vec![
                Stmt::If {
                    condition: "a < 0".to_string(),
                    body: vec![Stmt::Return(Some("0".to_string()))],
                },
                Stmt::Return(Some("a".to_string())),
            ]
        );
    }

    #[test]
    fn locals_are_declared_on_first_store() {
        let method = method_with(
            "Sum",
            int(),
            vec![
                ins(0, "ldarg.1", Operand::None),
                ins(1, "ldarg.2", Operand::None),
                ins(2, "add", Operand::None),
                ins(3, "stloc.0", Operand::None),
                ins(4, "br.s", Operand::Branch(6)),
                ins(6, "ldloc.0", Operand::None),
                ins(7, "ret", Operand::None),
            ],
        );
        let lifted = run(&method).unwrap();
        assert_eq!(
            lifted.statements,
            vec![
                Stmt::Line("int V_0 = a + b".to_string()),
                Stmt::Return(Some("V_0".to_string())),
            ]
        );
    }

    #[test]
    fn constructor_initializer() {
        let object = TypeSig::Named(TypeReference::local("Acme", "Base"));
        let mut ctor = method_with(
            ".ctor",
            TypeSig::Primitive(PrimitiveType::Void),
            vec![
                ins(0, "ldarg.0", Operand::None),
                ins(1, "ldarg.1", Operand::None),
                ins(
                    2,
                    "call",
                    Operand::Method(MethodReference {
                        declaring_type: object,
                        name: ".ctor".to_string(),
                        has_this: true,
                        parameters: vec![int()],
                        return_type: TypeSig::Primitive(PrimitiveType::Void),
                    }),
                ),
                ins(7, "ret", Operand::None),
            ],
        );
        ctor.attributes |= crate::metadata::MethodAttributes::SPECIAL_NAME;
        let lifted = run(&ctor).unwrap();
        assert_eq!(lifted.initializer.as_deref(), Some("base(a)"));
        assert!(lifted.statements.is_empty());
    }

    #[test]
    fn unsupported_control_flow() {
        let method = method_with(
            "Loop",
            TypeSig::Primitive(PrimitiveType::Void),
            vec![
                ins(0, "br.s", Operand::Branch(4)),
                ins(2, "nop", Operand::None),
                ins(3, "nop", Operand::None),
                ins(4, "br.s", Operand::Branch(2)),
            ],
        );
        assert!(run(&method).is_err());

        let listing = il_listing(&method);
        assert_eq!(listing[0], "// Decompilation not supported; IL follows");
        assert_eq!(listing[1], "// IL_0000: br.s IL_0004");
    }

    #[test]
    fn pending_value_survives_a_store() {
        // returns the old value of `a`
        let method = method_with(
            "Swap",
            int(),
            vec![
                ins(0, "ldarg.1", Operand::None),
                ins(1, "ldc.i4.0", Operand::None),
                ins(2, "starg.s", Operand::Argument(1)),
                ins(4, "ret", Operand::None),
            ],
        );
        assert_eq!(
            run(&method).unwrap().statements,
            vec![
                Stmt::Line("var V_1 = a".to_string()),
                Stmt::Line("a = 0".to_string()),
                Stmt::Return(Some("V_1".to_string())),
            ]
        );
    }

    #[test]
    fn dup_of_new_object_constructs_once() {
        let gadget = TypeSig::Named(TypeReference::local("Acme", "Gadget"));
        let void = TypeSig::Primitive(PrimitiveType::Void);
        let method = method_with(
            "Make",
            gadget.clone(),
            vec![
                ins(
                    0,
                    "newobj",
                    Operand::Method(MethodReference {
                        declaring_type: gadget.clone(),
                        name: ".ctor".to_string(),
                        has_this: true,
                        parameters: Vec::new(),
                        return_type: void.clone(),
                    }),
                ),
                ins(5, "dup", Operand::None),
                ins(6, "ldc.i4.3", Operand::None),
                ins(
                    7,
                    "callvirt",
                    Operand::Method(MethodReference {
                        declaring_type: gadget,
                        name: "set_Size".to_string(),
                        has_this: true,
                        parameters: vec![int()],
                        return_type: void,
                    }),
                ),
                ins(12, "ret", Operand::None),
            ],
        );
        assert_eq!(
            run(&method).unwrap().statements,
            vec![
                Stmt::Line("var V_1 = new Gadget()".to_string()),
                Stmt::Line("V_1.Size = 3".to_string()),
                Stmt::Return(Some("V_1".to_string())),
            ]
        );
    }

    #[test]
    fn dup_of_argument_reads_it_twice() {
        let method = method_with(
            "Double",
            int(),
            vec![
                ins(0, "ldarg.1", Operand::None),
                ins(1, "dup", Operand::None),
                ins(2, "add", Operand::None),
                ins(3, "ret", Operand::None),
            ],
        );
        assert_eq!(run(&method).unwrap().single_return(), Some("a + a"));
    }

    #[test]
    fn boolean_returns_are_coerced() {
        let method = method_with(
            "IsPositive",
            TypeSig::Primitive(PrimitiveType::Boolean),
            vec![
                ins(0, "ldarg.1", Operand::None),
                ins(1, "ldc.i4.0", Operand::None),
                ins(2, "cgt", Operand::None),
                ins(3, "ret", Operand::None),
            ],
        );
        assert_eq!(run(&method).unwrap().single_return(), Some("a > 0"));

        let constant = method_with(
            "Always",
            TypeSig::Primitive(PrimitiveType::Boolean),
            vec![ins(0, "ldc.i4.1", Operand::None), ins(1, "ret", Operand::None)],
        );
        assert_eq!(run(&constant).unwrap().single_return(), Some("true"));
    }
}
