use crate::compiler_frontend::language::ast_nodes::{ExceptionType, Program, Statement};
use crate::compiler_frontend::language::intrinsics::INDEX_OUT_OF_BOUNDS;
use rustc_hash::FxHashMap;

/// `return` travels as this exception. No user type can collide with it.
pub const RETURN_NORMALLY_ID: i32 = -1;
pub const RETURN_NORMALLY: &str = "ReturnNormally";

pub const INDEX_OUT_OF_BOUNDS_ID: i32 = 1;

/// Numeric ids for every exception type named in a program.
///
/// The runtime's own `IndexOutOfBounds` is always 1. User types follow in
/// the order they first appear: functions in declaration order, each body
/// walked in source order, counting both `throw` and `catch` types.
/// Zero never names an exception, it means "nothing is propagating".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionIds {
    ids: FxHashMap<String, i32>,

    // names[id - 1]
    names: Vec<String>,
}

impl ExceptionIds {
    pub fn collect(program: &Program) -> Self {
        let mut table = ExceptionIds {
            ids: FxHashMap::default(),
            names: Vec::new(),
        };
        table.insert(INDEX_OUT_OF_BOUNDS);

        for function in &program.functions {
            table.collect_statement(&function.body);
        }

        table
    }

    fn insert(&mut self, name: &str) {
        if self.ids.contains_key(name) {
            return;
        }

        self.names.push(name.to_owned());
        self.ids.insert(name.to_owned(), self.names.len() as i32);
    }

    // Expressions cannot name exception types, so only statements are walked
    fn collect_statement(&mut self, statement: &Statement) {
        match statement {
            Statement::Skip
            | Statement::Assign { .. }
            | Statement::Return(_)
            | Statement::FunctionCallStatement(_) => {}
            Statement::If {
                then_branch,
                else_branch,
                ..
            } => {
                self.collect_statement(then_branch);
                self.collect_statement(else_branch);
            }
            Statement::While { body, .. } => self.collect_statement(body),
            Statement::Chain(first, second) => {
                self.collect_statement(first);
                self.collect_statement(second);
            }
            Statement::Try {
                body,
                catches,
                finally,
            } => {
                self.collect_statement(body);
                for branch in catches {
                    self.insert(&branch.exception_type.0);
                    self.collect_statement(&branch.body);
                }
                if let Some(finally) = finally {
                    self.collect_statement(finally);
                }
            }
            Statement::Throw { exception_type, .. } => self.insert(&exception_type.0),
        }
    }

    pub fn id(&self, exception_type: &ExceptionType) -> Option<i32> {
        self.ids.get(&exception_type.0).copied()
    }

    pub fn name(&self, id: i32) -> Option<&str> {
        if id == RETURN_NORMALLY_ID {
            return Some(RETURN_NORMALLY);
        }

        let index = usize::try_from(id).ok()?.checked_sub(1)?;
        self.names.get(index).map(String::as_str)
    }

    /// Names in id order, starting at id 1
    pub fn names(&self) -> &[String] {
        &self.names
    }
}
