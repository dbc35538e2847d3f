//! Call resolution.
//!
//! Binds every call site, known so far only by name and argument count,
//! to either a user declaration or an intrinsic. Nothing downstream ever
//! sees `Callee::Unresolved`.

use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::language::ast_nodes::{
    Callee, Expression, FunctionCall, FunctionKey, Program, Statement,
};
use crate::compiler_frontend::language::intrinsics::Intrinsic;
use crate::compiler_frontend::tokenizer::tokens::TextLocation;
use crate::{ast_log, return_resolution_error};
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy)]
enum Declared {
    User,
    Intrinsic(Intrinsic),
}

struct CallTable {
    declarations: FxHashMap<FunctionKey, Declared>,
}

impl CallTable {
    fn new(program: &Program) -> Result<Self, CompilerError> {
        let mut declarations = FxHashMap::default();

        for intrinsic in Intrinsic::ALL {
            declarations.insert(intrinsic.key(), Declared::Intrinsic(intrinsic));
        }

        for function in &program.functions {
            let key = function.key();
            if declarations.insert(key.to_owned(), Declared::User).is_some() {
                return_resolution_error!(
                    ambiguous_message(&key),
                    function.location.to_owned(),
                    {
                        CompilationStage => "Call Resolution",
                        PrimarySuggestion => "Rename the function or change its number of parameters",
                    }
                );
            }
        }

        Ok(CallTable { declarations })
    }

    fn resolve(&self, call: &mut FunctionCall) -> Result<(), CompilerError> {
        let key = match &call.callee {
            Callee::Unresolved { name, arity } => FunctionKey::new(name.to_owned(), *arity),

            // Already bound by whoever built the tree, but it must still exist
            Callee::User(key) => key.to_owned(),
            Callee::Intrinsic(_) => return Ok(()),
        };

        call.callee = match self.declarations.get(&key) {
            Some(Declared::User) => Callee::User(key),
            Some(Declared::Intrinsic(intrinsic)) if matches!(call.callee, Callee::Unresolved { .. }) => {
                Callee::Intrinsic(*intrinsic)
            }
            _ => {
                return_resolution_error!(
                    unresolved_message(&key),
                    call.location.to_owned(),
                    {
                        CompilationStage => "Call Resolution",
                        PrimarySuggestion => "Check the function name and the number of arguments",
                    }
                );
            }
        };

        Ok(())
    }
}

fn unresolved_message(key: &FunctionKey) -> String {
    format!("Unresolved function {}, {} arguments.", key.name, key.arity)
}

fn ambiguous_message(key: &FunctionKey) -> String {
    format!("Ambiguous function {}, {} arguments.", key.name, key.arity)
}

/// Rewrites every call site of the program in place.
/// The entry function must be one of the program's declarations.
pub fn resolve_calls(mut program: Program) -> Result<Program, CompilerError> {
    let table = CallTable::new(&program)?;

    if program.entry_function().is_none() {
        return_resolution_error!(
            format!("The entry function {} is not declared", program.entry),
            TextLocation::default()
        );
    }

    for function in &mut program.functions {
        resolve_statement(&table, &mut function.body)?;
    }

    ast_log!(Green "Resolved program\n", program.to_string());

    Ok(program)
}

fn resolve_statement(table: &CallTable, statement: &mut Statement) -> Result<(), CompilerError> {
    match statement {
        Statement::Skip => Ok(()),
        Statement::Assign { expression, .. } => resolve_expression(table, expression),
        Statement::If {
            condition,
            then_branch,
            else_branch,
        } => {
            resolve_expression(table, condition)?;
            resolve_statement(table, then_branch)?;
            resolve_statement(table, else_branch)
        }
        Statement::While { condition, body } => {
            resolve_expression(table, condition)?;
            resolve_statement(table, body)
        }
        Statement::Chain(first, second) => {
            resolve_statement(table, first)?;
            resolve_statement(table, second)
        }
        Statement::Return(expression) => resolve_expression(table, expression),
        Statement::FunctionCallStatement(call) => resolve_call(table, call),
        Statement::Try {
            body,
            catches,
            finally,
        } => {
            resolve_statement(table, body)?;
            for branch in catches {
                resolve_statement(table, &mut branch.body)?;
            }
            match finally {
                Some(finally) => resolve_statement(table, finally),
                None => Ok(()),
            }
        }
        Statement::Throw { data, .. } => resolve_expression(table, data),
    }
}

fn resolve_expression(table: &CallTable, expression: &mut Expression) -> Result<(), CompilerError> {
    match expression {
        Expression::Const(_) | Expression::StringLiteral(_) | Expression::Variable(_) => Ok(()),
        Expression::ArrayLiteral { initializers, .. } => {
            for initializer in initializers {
                resolve_expression(table, initializer)?;
            }
            Ok(())
        }
        Expression::UnaryOperation { operand, .. } => resolve_expression(table, operand),
        Expression::BinaryOperation { left, right, .. } => {
            resolve_expression(table, left)?;
            resolve_expression(table, right)
        }
        Expression::FunctionCall(call) => resolve_call(table, call),
    }
}

fn resolve_call(table: &CallTable, call: &mut FunctionCall) -> Result<(), CompilerError> {
    for argument in &mut call.arguments {
        resolve_expression(table, argument)?;
    }

    table.resolve(call)
}

#[cfg(test)]
#[path = "tests/resolution_tests.rs"]
mod tests;
