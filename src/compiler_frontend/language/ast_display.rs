// Renders the AST back into source-like text for diagnostics and `show_ast` logging.
// Sugar the parser expanded (for, repeat, indexing) is shown in its expanded form.

use crate::compiler_frontend::language::ast_nodes::{
    Callee, Expression, FunctionCall, FunctionDeclaration, Program, Statement, UnaryOperator,
};
use std::fmt::{Display, Formatter, Result as FmtResult, Write};

const INDENT: &str = "    ";

impl Display for FunctionCall {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match &self.callee {
            // Marked so unresolved calls stand out in logs
            Callee::Unresolved { name, .. } => write!(f, "{name}?(")?,
            callee => write!(f, "{}(", callee.name())?,
        }
        for (index, argument) in self.arguments.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{argument}")?;
        }
        write!(f, ")")
    }
}

impl Display for Expression {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Expression::Const(value) => write!(f, "{value}"),
            Expression::StringLiteral(text) => write!(f, "\"{text}\""),
            Expression::ArrayLiteral {
                boxed,
                initializers,
            } => {
                let (open, close) = if *boxed { ("{", "}") } else { ("[", "]") };
                write!(f, "{open}")?;
                for (index, initializer) in initializers.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{initializer}")?;
                }
                write!(f, "{close}")
            }
            Expression::Variable(name) => write!(f, "{name}"),
            Expression::UnaryOperation { operator, operand } => match operator {
                UnaryOperator::Not => write!(f, "!({operand})"),
            },

            // Always parenthesised, precedence is not reconstructed
            Expression::BinaryOperation {
                operator,
                left,
                right,
            } => write!(f, "({left} {} {right})", operator.symbol()),
            Expression::FunctionCall(call) => write!(f, "{call}"),
        }
    }
}

fn write_statement(out: &mut String, statement: &Statement, depth: usize) -> FmtResult {
    let indent = INDENT.repeat(depth);

    match statement {
        Statement::Skip => writeln!(out, "{indent}skip"),
        Statement::Assign {
            variable,
            expression,
        } => writeln!(out, "{indent}{variable} := {expression}"),
        Statement::If {
            condition,
            then_branch,
            else_branch,
        } => {
            writeln!(out, "{indent}if {condition} then")?;
            write_statement(out, then_branch, depth + 1)?;
            if **else_branch != Statement::Skip {
                writeln!(out, "{indent}else")?;
                write_statement(out, else_branch, depth + 1)?;
            }
            writeln!(out, "{indent}fi")
        }
        Statement::While { condition, body } => {
            writeln!(out, "{indent}while {condition} do")?;
            write_statement(out, body, depth + 1)?;
            writeln!(out, "{indent}od")
        }
        Statement::Chain(first, second) => {
            write_statement(out, first, depth)?;
            write_statement(out, second, depth)
        }
        Statement::Return(expression) => writeln!(out, "{indent}return {expression}"),
        Statement::FunctionCallStatement(call) => writeln!(out, "{indent}{call}"),
        Statement::Try {
            body,
            catches,
            finally,
        } => {
            writeln!(out, "{indent}try")?;
            write_statement(out, body, depth + 1)?;
            for branch in catches {
                writeln!(
                    out,
                    "{indent}catch ({} {})",
                    branch.exception_type.0, branch.variable
                )?;
                write_statement(out, &branch.body, depth + 1)?;
            }
            if let Some(finally) = finally {
                writeln!(out, "{indent}finally")?;
                write_statement(out, finally, depth + 1)?;
            }
            writeln!(out, "{indent}yrt")
        }
        Statement::Throw {
            exception_type,
            data,
        } => writeln!(out, "{indent}throw ({} {data})", exception_type.0),
    }
}

impl Display for Statement {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let mut out = String::new();
        write_statement(&mut out, self, 0)?;
        write!(f, "{}", out.trim_end())
    }
}

impl Display for FunctionDeclaration {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let mut out = String::new();
        writeln!(out, "fun {}({}) begin", self.name, self.parameters.join(", "))?;
        write_statement(&mut out, &self.body, 1)?;
        write!(out, "end")?;
        write!(f, "{out}")
    }
}

impl Display for Program {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for function in &self.functions {
            writeln!(f, "{function}")?;
        }
        write!(f, "# entry: {}", self.entry)
    }
}
