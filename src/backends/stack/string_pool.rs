use crate::compiler_frontend::language::ast_nodes::{Expression, Program, Statement};
use rustc_hash::FxHashMap;

/// Every distinct string literal of a program, indexed in order of first appearance.
/// Built once before functions are compiled, read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct StringPool {
    literals: Vec<String>,
    indices: FxHashMap<String, usize>,
}

impl StringPool {
    pub fn collect(program: &Program) -> Self {
        let mut pool = StringPool::default();

        for function in &program.functions {
            pool.collect_statement(&function.body);
        }

        pool
    }

    fn intern(&mut self, literal: &str) {
        if self.indices.contains_key(literal) {
            return;
        }

        self.indices.insert(literal.to_owned(), self.literals.len());
        self.literals.push(literal.to_owned());
    }

    fn collect_statement(&mut self, statement: &Statement) {
        match statement {
            Statement::Skip => {}
            Statement::Assign { expression, .. } | Statement::Return(expression) => {
                self.collect_expression(expression)
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.collect_expression(condition);
                self.collect_statement(then_branch);
                self.collect_statement(else_branch);
            }
            Statement::While { condition, body } => {
                self.collect_expression(condition);
                self.collect_statement(body);
            }
            Statement::Chain(first, second) => {
                self.collect_statement(first);
                self.collect_statement(second);
            }
            Statement::FunctionCallStatement(call) => {
                for argument in &call.arguments {
                    self.collect_expression(argument);
                }
            }
            Statement::Try {
                body,
                catches,
                finally,
            } => {
                self.collect_statement(body);
                for branch in catches {
                    self.collect_statement(&branch.body);
                }
                if let Some(finally) = finally {
                    self.collect_statement(finally);
                }
            }
            Statement::Throw { data, .. } => self.collect_expression(data),
        }
    }

    fn collect_expression(&mut self, expression: &Expression) {
        match expression {
            Expression::Const(_) | Expression::Variable(_) => {}
            Expression::StringLiteral(text) => self.intern(text),
            Expression::ArrayLiteral { initializers, .. } => {
                for initializer in initializers {
                    self.collect_expression(initializer);
                }
            }
            Expression::UnaryOperation { operand, .. } => self.collect_expression(operand),
            Expression::BinaryOperation { left, right, .. } => {
                self.collect_expression(left);
                self.collect_expression(right);
            }
            Expression::FunctionCall(call) => {
                for argument in &call.arguments {
                    self.collect_expression(argument);
                }
            }
        }
    }

    pub fn index_of(&self, literal: &str) -> Option<usize> {
        self.indices.get(literal).copied()
    }

    pub fn literals(&self) -> &[String] {
        &self.literals
    }
}
