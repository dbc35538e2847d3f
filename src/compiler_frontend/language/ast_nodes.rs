//! ============================================================
//!                         AST Nodes
//! ============================================================
//! The closed vocabulary every stage of the toolchain agrees on.
//!
//! Statements and expressions are plain enums so every pass is an
//! exhaustive match. Calls start out `Callee::Unresolved` (name + arity
//! only) and are bound to a user declaration or an intrinsic by the
//! call resolver before anything is compiled or executed.

use crate::compiler_frontend::language::intrinsics::Intrinsic;
use crate::compiler_frontend::tokenizer::tokens::TextLocation;
use serde::Serialize;
use std::hash::{Hash, Hasher};

// ============================================================
// Operators
// ============================================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum UnaryOperator {
    Not,
}

impl UnaryOperator {
    pub fn semantics(self, operand: i32) -> i32 {
        match self {
            UnaryOperator::Not => (operand == 0) as i32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BinaryOperator {
    Plus,
    Minus,
    Times,
    Div,
    Rem,
    And,
    Or,
    Eq,
    Neq,
    Gt,
    Lt,
    Leq,
    Geq,
}

impl BinaryOperator {
    /// Returns None when the machine division would trap
    /// (division by zero or i32::MIN / -1).
    pub fn semantics(self, left: i32, right: i32) -> Option<i32> {
        let result = match self {
            BinaryOperator::Plus => left.wrapping_add(right),
            BinaryOperator::Minus => left.wrapping_sub(right),
            BinaryOperator::Times => left.wrapping_mul(right),
            BinaryOperator::Div => left.checked_div(right)?,
            BinaryOperator::Rem => left.checked_rem(right)?,
            BinaryOperator::And => (left != 0 && right != 0) as i32,
            BinaryOperator::Or => (left != 0 || right != 0) as i32,
            BinaryOperator::Eq => (left == right) as i32,
            BinaryOperator::Neq => (left != right) as i32,
            BinaryOperator::Gt => (left > right) as i32,
            BinaryOperator::Lt => (left < right) as i32,
            BinaryOperator::Leq => (left <= right) as i32,
            BinaryOperator::Geq => (left >= right) as i32,
        };

        Some(result)
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOperator::And | BinaryOperator::Or)
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOperator::Eq
                | BinaryOperator::Neq
                | BinaryOperator::Gt
                | BinaryOperator::Lt
                | BinaryOperator::Leq
                | BinaryOperator::Geq
        )
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Plus => "+",
            BinaryOperator::Minus => "-",
            BinaryOperator::Times => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Rem => "%",
            BinaryOperator::And => "&&",
            BinaryOperator::Or => "!!",
            BinaryOperator::Eq => "==",
            BinaryOperator::Neq => "!=",
            BinaryOperator::Gt => ">",
            BinaryOperator::Lt => "<",
            BinaryOperator::Leq => "<=",
            BinaryOperator::Geq => ">=",
        }
    }
}

// ============================================================
// Functions
// ============================================================

/// The unit of overload resolution: a function is identified by its name and parameter count.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FunctionKey {
    pub name: String,
    pub arity: usize,
}

impl FunctionKey {
    pub fn new(name: impl Into<String>, arity: usize) -> Self {
        FunctionKey {
            name: name.into(),
            arity,
        }
    }
}

impl std::fmt::Display for FunctionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.name, self.arity)
    }
}

#[derive(Debug, Clone)]
pub struct FunctionDeclaration {
    pub name: String,
    pub parameters: Vec<String>,
    pub body: Statement,
    pub location: TextLocation,
}

impl FunctionDeclaration {
    pub fn new(name: impl Into<String>, parameters: Vec<String>, body: Statement) -> Self {
        FunctionDeclaration {
            name: name.into(),
            parameters,
            body,
            location: TextLocation::default(),
        }
    }

    pub fn key(&self) -> FunctionKey {
        FunctionKey::new(self.name.clone(), self.parameters.len())
    }
}

// Declarations are equal when they would collide in resolution
impl PartialEq for FunctionDeclaration {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.parameters.len() == other.parameters.len()
    }
}

impl Eq for FunctionDeclaration {}

impl Hash for FunctionDeclaration {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.parameters.len().hash(state);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callee {
    Unresolved { name: String, arity: usize },
    User(FunctionKey),
    Intrinsic(Intrinsic),
}

impl Callee {
    pub fn name(&self) -> &str {
        match self {
            Callee::Unresolved { name, .. } => name,
            Callee::User(key) => &key.name,
            Callee::Intrinsic(intrinsic) => intrinsic.name(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub callee: Callee,
    pub arguments: Vec<Expression>,
    pub location: TextLocation,
}

impl FunctionCall {
    /// A call as the parser produces it: bound by name and argument count only
    pub fn unresolved(name: impl Into<String>, arguments: Vec<Expression>) -> Self {
        FunctionCall {
            callee: Callee::Unresolved {
                name: name.into(),
                arity: arguments.len(),
            },
            arguments,
            location: TextLocation::default(),
        }
    }

    pub fn intrinsic(intrinsic: Intrinsic, arguments: Vec<Expression>) -> Self {
        FunctionCall {
            callee: Callee::Intrinsic(intrinsic),
            arguments,
            location: TextLocation::default(),
        }
    }

    pub fn with_location(mut self, location: TextLocation) -> Self {
        self.location = location;
        self
    }
}

// ============================================================
// Expressions and statements
// ============================================================
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Const(i32),
    StringLiteral(String),

    /// `[a, b]` builds a scalar array, `{a, b}` a boxed array of tagged values
    ArrayLiteral {
        boxed: bool,
        initializers: Vec<Expression>,
    },

    Variable(String),
    UnaryOperation {
        operator: UnaryOperator,
        operand: Box<Expression>,
    },
    BinaryOperation {
        operator: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    FunctionCall(FunctionCall),
}

impl Expression {
    pub fn variable(name: impl Into<String>) -> Self {
        Expression::Variable(name.into())
    }

    pub fn binary(operator: BinaryOperator, left: Expression, right: Expression) -> Self {
        Expression::BinaryOperation {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn not(operand: Expression) -> Self {
        Expression::UnaryOperation {
            operator: UnaryOperator::Not,
            operand: Box::new(operand),
        }
    }

    pub fn call(name: impl Into<String>, arguments: Vec<Expression>) -> Self {
        Expression::FunctionCall(FunctionCall::unresolved(name, arguments))
    }
}

/// A named tag on a thrown value, compared by name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExceptionType(pub String);

impl ExceptionType {
    pub fn new(name: impl Into<String>) -> Self {
        ExceptionType(name.into())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchBranch {
    pub exception_type: ExceptionType,
    pub variable: String,
    pub body: Statement,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Skip,
    Assign {
        variable: String,
        expression: Expression,
    },
    If {
        condition: Expression,
        then_branch: Box<Statement>,
        else_branch: Box<Statement>,
    },
    While {
        condition: Expression,
        body: Box<Statement>,
    },
    Chain(Box<Statement>, Box<Statement>),
    Return(Expression),
    FunctionCallStatement(FunctionCall),
    Try {
        body: Box<Statement>,
        catches: Vec<CatchBranch>,
        finally: Option<Box<Statement>>,
    },
    Throw {
        exception_type: ExceptionType,
        data: Expression,
    },
}

impl Statement {
    pub fn assign(variable: impl Into<String>, expression: Expression) -> Self {
        Statement::Assign {
            variable: variable.into(),
            expression,
        }
    }

    pub fn call(name: impl Into<String>, arguments: Vec<Expression>) -> Self {
        Statement::FunctionCallStatement(FunctionCall::unresolved(name, arguments))
    }

    pub fn if_else(condition: Expression, then_branch: Statement, else_branch: Statement) -> Self {
        Statement::If {
            condition,
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        }
    }

    pub fn while_loop(condition: Expression, body: Statement) -> Self {
        Statement::While {
            condition,
            body: Box::new(body),
        }
    }

    pub fn throw(exception_type: &str, data: Expression) -> Self {
        Statement::Throw {
            exception_type: ExceptionType::new(exception_type),
            data,
        }
    }
}

/// Folds a list of statements into right-nested `Chain`s, an empty list becomes `Skip`
pub fn chain_of(statements: Vec<Statement>) -> Statement {
    let mut statements = statements.into_iter().rev();

    let Some(last) = statements.next() else {
        return Statement::Skip;
    };

    statements.fold(last, |rest, statement| {
        Statement::Chain(Box::new(statement), Box::new(rest))
    })
}

// ============================================================
// Program
// ============================================================
#[derive(Debug, Clone)]
pub struct Program {
    /// Declaration order is significant: it fixes exception ids,
    /// the string pool order and the order of emitted code.
    pub functions: Vec<FunctionDeclaration>,
    pub entry: FunctionKey,
}

impl Program {
    pub fn function(&self, key: &FunctionKey) -> Option<&FunctionDeclaration> {
        self.functions.iter().find(|function| &function.key() == key)
    }

    pub fn entry_function(&self) -> Option<&FunctionDeclaration> {
        self.function(&self.entry)
    }
}
