//! ============================================================
//!                    Native Assembly Entities
//! ============================================================
//! A typed model of the 32-bit x86 assembly the native backend emits.
//! Code generation builds a `NativeModule`; turning it into AT&T text is
//! a separate step (`asm_rendering`), and the simulator executes the
//! typed form directly.

use crate::compiler_frontend::language::ast_nodes::{BinaryOperator, FunctionKey};
use std::fmt::{Display, Formatter, Result as FmtResult};

// Fixed symbols shared with the runtime
pub const REF_INCREASE: &str = "ref_increase";
pub const REF_DECREASE: &str = "ref_decrease";
pub const EXCEPTION_PAYLOAD: &str = "exception_payload";
pub const EXCEPTION_PAYLOAD_TYPE: &str = "exception_payload_type";
pub const UNCAUGHT_EXCEPTION: &str = "uncaught_exception";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    Eax,
    Ebx,
    Ecx,
    Edx,
    Esi,
    Edi,
    Ebp,
    Esp,
}

impl Register {
    pub const COUNT: usize = 8;

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Register::Eax => "eax",
            Register::Ebx => "ebx",
            Register::Ecx => "ecx",
            Register::Edx => "edx",
            Register::Esi => "esi",
            Register::Edi => "edi",
            Register::Ebp => "ebp",
            Register::Esp => "esp",
        }
    }
}

/// Low bytes of the scratch registers.
/// `%esi` and `%edi` have no 8-bit form, so boolean results never go through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByteRegister {
    Al,
    Bl,
}

impl ByteRegister {
    pub fn full(self) -> Register {
        match self {
            ByteRegister::Al => Register::Eax,
            ByteRegister::Bl => Register::Ebx,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ByteRegister::Al => "al",
            ByteRegister::Bl => "bl",
        }
    }
}

/// Signed condition codes, as used by `setcc` and `jcc`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Condition {
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

impl Condition {
    pub fn suffix(self) -> &'static str {
        match self {
            Condition::Equal => "e",
            Condition::NotEqual => "ne",
            Condition::Less => "l",
            Condition::LessOrEqual => "le",
            Condition::Greater => "g",
            Condition::GreaterOrEqual => "ge",
        }
    }

    pub fn for_comparison(operator: BinaryOperator) -> Option<Condition> {
        match operator {
            BinaryOperator::Eq => Some(Condition::Equal),
            BinaryOperator::Neq => Some(Condition::NotEqual),
            BinaryOperator::Lt => Some(Condition::Less),
            BinaryOperator::Leq => Some(Condition::LessOrEqual),
            BinaryOperator::Gt => Some(Condition::Greater),
            BinaryOperator::Geq => Some(Condition::GreaterOrEqual),
            _ => None,
        }
    }
}

/// An undecorated global symbol. Platform prefixes are added when rendering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(pub String);

impl Symbol {
    pub fn new(name: impl Into<String>) -> Self {
        Symbol(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `main` for the entry function, `NAME_ARITY` for everything else
    pub fn for_function(key: &FunctionKey, entry: &FunctionKey) -> Self {
        if key == entry {
            Symbol::new(entry.name.as_str())
        } else {
            Symbol::new(format!("{}_{}", key.name, key.arity))
        }
    }

    pub fn pooled_string(index: usize) -> Self {
        Symbol::new(format!("_pooled_string_{index}"))
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

/// A function-local jump target, one per stack instruction index that is jumped to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Label {
    pub function: Symbol,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Immediate(i32),

    /// `$symbol`, the address of a data symbol
    Address(Symbol),

    Register(Register),
    Memory { base: Register, offset: i32 },

    /// The word stored at a data symbol
    Global(Symbol),
}

impl Operand {
    pub fn frame(offset: i32) -> Self {
        Operand::Memory {
            base: Register::Ebp,
            offset,
        }
    }

    pub fn global(name: &str) -> Self {
        Operand::Global(Symbol::new(name))
    }

    pub fn is_memory(&self) -> bool {
        matches!(self, Operand::Memory { .. } | Operand::Global(_))
    }
}

impl From<Register> for Operand {
    fn from(register: Register) -> Self {
        Operand::Register(register)
    }
}

/// Instructions in AT&T operand order: source first, destination last
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AsmInstruction {
    Mov(Operand, Operand),
    Movzbl(ByteRegister, Register),
    Add(Operand, Operand),
    Sub(Operand, Operand),
    Imul(Operand, Register),
    And(Operand, Operand),
    Or(Operand, Operand),
    Cmp(Operand, Operand),
    Test(Operand, Operand),
    Set(Condition, ByteRegister),
    Cltd,
    Idiv(Operand),
    Push(Operand),
    Pop(Operand),
    Call(Symbol),
    Jmp(Label),
    Jcc(Condition, Label),
    Ret,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Text,
    ReadOnlyData,
    Data,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Section(Section),
    Global(Symbol),
    SymbolLabel(Symbol),
    LocalLabel(Label),
    Asciz(String),
    Long(i32),
    Comment(String),
    Instruction(AsmInstruction),
}

/// A whole program ready to render or simulate
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NativeModule {
    pub directives: Vec<Directive>,

    /// Exception names by id, starting at id 1
    pub exception_names: Vec<String>,
}

impl NativeModule {
    pub fn instructions(&self) -> impl Iterator<Item = &AsmInstruction> {
        self.directives.iter().filter_map(|directive| match directive {
            Directive::Instruction(instruction) => Some(instruction),
            _ => None,
        })
    }

    pub fn exception_name(&self, id: i32) -> Option<&str> {
        let index = usize::try_from(id).ok()?.checked_sub(1)?;
        self.exception_names.get(index).map(String::as_str)
    }
}
