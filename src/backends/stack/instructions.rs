//! ============================================================
//!                    Stack Machine Instructions
//! ============================================================
//! The linear program every function lowers to. Jump targets are
//! absolute indices into the same function's instruction list.

use crate::backends::stack::exception_ids::{RETURN_NORMALLY, RETURN_NORMALLY_ID};
use crate::compiler_frontend::language::ast_nodes::{BinaryOperator, FunctionKey, UnaryOperator};
use crate::compiler_frontend::language::intrinsics::Intrinsic;
use serde::Serialize;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// A variable slot in a stack frame.
/// Compiler-reserved slots can never collide with source names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum StackVariable {
    User(String),

    /// Id of the exception currently propagating, 0 when there is none
    CurrentException,
    ExceptionData,

    /// Set by a callee that finished with an exception
    Thrown,
    ThrownData,

    /// What was propagating when the n-th finally block of the function started
    FinallyException(usize),
    FinallyData(usize),

    /// The array being filled by the n-th array literal of the function
    ArrayLiteral(usize),
}

impl StackVariable {
    pub fn user(name: impl Into<String>) -> Self {
        StackVariable::User(name.into())
    }

    /// Slots that only ever hold exception ids
    pub fn is_scalar_only(&self) -> bool {
        matches!(
            self,
            StackVariable::CurrentException
                | StackVariable::Thrown
                | StackVariable::FinallyException(_)
        )
    }
}

impl Display for StackVariable {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            StackVariable::User(name) => write!(f, "{name}"),
            StackVariable::CurrentException => write!(f, "$ex"),
            StackVariable::ExceptionData => write!(f, "$exdata"),
            StackVariable::Thrown => write!(f, "$thrown"),
            StackVariable::ThrownData => write!(f, "$thrown_data"),
            StackVariable::FinallyException(n) => write!(f, "$fin_ex{n}"),
            StackVariable::FinallyData(n) => write!(f, "$fin_data{n}"),
            StackVariable::ArrayLiteral(n) => write!(f, "$arr{n}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum CallTarget {
    Intrinsic(Intrinsic),
    User(FunctionKey),
}

impl CallTarget {
    pub fn arity(&self) -> usize {
        match self {
            CallTarget::Intrinsic(intrinsic) => intrinsic.arity(),
            CallTarget::User(key) => key.arity,
        }
    }
}

impl Display for CallTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            CallTarget::Intrinsic(intrinsic) => write!(f, "{intrinsic}/{}", intrinsic.arity()),
            CallTarget::User(key) => write!(f, "{key}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Instruction {
    Push(i32),

    /// Pushes the handle of a string from the literal pool
    PushPooled(usize),

    Ld(StackVariable),
    St(StackVariable),
    Unop(UnaryOperator),
    Binop(BinaryOperator),
    Jmp(usize),

    /// Pops the condition and jumps when it is zero
    Jz(usize),

    Call(CallTarget),
    Pop,

    /// Returns the popped value
    Ret1,

    /// Returns scalar 0
    Ret0,

    /// Hands the propagating exception to the caller's thrown slot
    TransEx,
}

impl Instruction {
    pub fn jump_target(&self) -> Option<usize> {
        match self {
            Instruction::Jmp(target) | Instruction::Jz(target) => Some(*target),
            _ => None,
        }
    }

    /// Control never reaches the next index from here
    pub fn ends_flow(&self) -> bool {
        matches!(
            self,
            Instruction::Jmp(_) | Instruction::Ret1 | Instruction::Ret0
        )
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Instruction::Push(value) => write!(f, "Push {value}"),
            Instruction::PushPooled(index) => write!(f, "PushPooled #{index}"),
            Instruction::Ld(variable) => write!(f, "Ld {variable}"),
            Instruction::St(variable) => write!(f, "St {variable}"),
            Instruction::Unop(_) => write!(f, "Unop !"),
            Instruction::Binop(operator) => write!(f, "Binop {}", operator.symbol()),
            Instruction::Jmp(target) => write!(f, "Jmp {target}"),
            Instruction::Jz(target) => write!(f, "Jz {target}"),
            Instruction::Call(target) => write!(f, "Call {target}"),
            Instruction::Pop => write!(f, "Pop"),
            Instruction::Ret1 => write!(f, "Ret1"),
            Instruction::Ret0 => write!(f, "Ret0"),
            Instruction::TransEx => write!(f, "TransEx"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackFunction {
    pub key: FunctionKey,
    pub parameters: Vec<String>,
    pub instructions: Vec<Instruction>,

    /// Callers must check the thrown slot after calling this function
    pub can_throw: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackProgram {
    /// In declaration order, the entry function last
    pub functions: Vec<StackFunction>,
    pub entry: FunctionKey,
    pub literal_pool: Vec<String>,

    /// Exception names by id, starting at id 1
    pub exception_names: Vec<String>,
}

impl StackProgram {
    pub fn function(&self, key: &FunctionKey) -> Option<&StackFunction> {
        self.functions.iter().find(|function| &function.key == key)
    }

    pub fn entry_function(&self) -> Option<&StackFunction> {
        self.function(&self.entry)
    }

    pub fn can_throw(&self, target: &CallTarget) -> bool {
        match target {
            CallTarget::Intrinsic(intrinsic) => intrinsic.can_throw(),
            CallTarget::User(key) => self
                .function(key)
                .is_some_and(|function| function.can_throw),
        }
    }

    pub fn exception_name(&self, id: i32) -> Option<&str> {
        if id == RETURN_NORMALLY_ID {
            return Some(RETURN_NORMALLY);
        }

        let index = usize::try_from(id).ok()?.checked_sub(1)?;
        self.exception_names.get(index).map(String::as_str)
    }
}

impl Display for StackFunction {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "fun {}({})", self.key, self.parameters.join(", "))?;
        if self.can_throw {
            write!(f, " can throw")?;
        }
        writeln!(f)?;

        for (index, instruction) in self.instructions.iter().enumerate() {
            writeln!(f, "{index:>5}: {instruction}")?;
        }

        Ok(())
    }
}

impl Display for StackProgram {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for (index, literal) in self.literal_pool.iter().enumerate() {
            writeln!(f, "#{index} = \"{literal}\"")?;
        }

        for function in &self.functions {
            writeln!(f)?;
            write!(f, "{function}")?;
        }

        writeln!(f)?;
        write!(f, "# entry: {}", self.entry)
    }
}
