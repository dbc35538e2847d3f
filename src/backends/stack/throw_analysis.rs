use crate::compiler_frontend::language::ast_nodes::{
    Callee, Expression, FunctionCall, FunctionKey, Program, Statement,
};
use rustc_hash::FxHashSet;

/// Which user functions can finish with an exception.
///
/// A function can throw if its body has a `throw`, or calls a throwing
/// intrinsic or a user function that can throw. Solved as a fixpoint, so
/// recursion settles once no function changes. `return` never counts,
/// and a try that catches everything is still counted conservatively.
pub fn throwing_functions(program: &Program) -> FxHashSet<FunctionKey> {
    let mut throwing = FxHashSet::default();

    loop {
        let mut changed = false;

        for function in &program.functions {
            let key = function.key();
            if !throwing.contains(&key) && statement_can_throw(&function.body, &throwing) {
                throwing.insert(key);
                changed = true;
            }
        }

        if !changed {
            return throwing;
        }
    }
}

pub fn callee_can_throw(callee: &Callee, throwing: &FxHashSet<FunctionKey>) -> bool {
    match callee {
        Callee::Intrinsic(intrinsic) => intrinsic.can_throw(),
        Callee::User(key) => throwing.contains(key),
        Callee::Unresolved { .. } => false,
    }
}

fn statement_can_throw(statement: &Statement, throwing: &FxHashSet<FunctionKey>) -> bool {
    match statement {
        Statement::Skip => false,
        Statement::Throw { .. } => true,
        Statement::Assign { expression, .. } | Statement::Return(expression) => {
            expression_can_throw(expression, throwing)
        }
        Statement::If {
            condition,
            then_branch,
            else_branch,
        } => {
            expression_can_throw(condition, throwing)
                || statement_can_throw(then_branch, throwing)
                || statement_can_throw(else_branch, throwing)
        }
        Statement::While { condition, body } => {
            expression_can_throw(condition, throwing) || statement_can_throw(body, throwing)
        }
        Statement::Chain(first, second) => {
            statement_can_throw(first, throwing) || statement_can_throw(second, throwing)
        }
        Statement::FunctionCallStatement(call) => call_can_throw(call, throwing),
        Statement::Try {
            body,
            catches,
            finally,
        } => {
            statement_can_throw(body, throwing)
                || catches
                    .iter()
                    .any(|branch| statement_can_throw(&branch.body, throwing))
                || finally
                    .as_deref()
                    .is_some_and(|finally| statement_can_throw(finally, throwing))
        }
    }
}

fn expression_can_throw(expression: &Expression, throwing: &FxHashSet<FunctionKey>) -> bool {
    match expression {
        Expression::Const(_) | Expression::Variable(_) | Expression::StringLiteral(_) => false,

        // Filling the literal goes through arrset
        Expression::ArrayLiteral { .. } => true,

        Expression::UnaryOperation { operand, .. } => expression_can_throw(operand, throwing),
        Expression::BinaryOperation { left, right, .. } => {
            expression_can_throw(left, throwing) || expression_can_throw(right, throwing)
        }
        Expression::FunctionCall(call) => call_can_throw(call, throwing),
    }
}

fn call_can_throw(call: &FunctionCall, throwing: &FxHashSet<FunctionKey>) -> bool {
    callee_can_throw(&call.callee, throwing)
        || call
            .arguments
            .iter()
            .any(|argument| expression_can_throw(argument, throwing))
}

#[cfg(test)]
#[path = "tests/throw_analysis_tests.rs"]
mod tests;
