//! Exit handlers track where control leaves a dynamic scope.
//!
//! Every function body, try body, catch body and finally block gets one.
//! A throw (or `return`) registers its jump on the nearest handler that is
//! interested in exceptions. Normal exits are registered on a specific
//! handler by the construct that owns it. When a scope is popped, its
//! owner resolves both worklists.

use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::{return_compiler_error, stack_log};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    FunctionBody,
    TryBody,
    CatchBody,
    Finally,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerId(usize);

#[derive(Debug)]
pub struct ExitHandler {
    pub id: HandlerId,
    pub kind: HandlerKind,

    /// Whether throws inside this scope land here
    pub interested: bool,

    /// Pending jumps reached by a throw
    pub throw_edges: Vec<usize>,

    /// Pending jumps reached by normal completion
    pub normal_exits: Vec<usize>,
}

#[derive(Debug, Default)]
pub struct ExitHandlerStack {
    handlers: Vec<ExitHandler>,
    next_id: usize,
}

impl ExitHandlerStack {
    pub fn new() -> Self {
        ExitHandlerStack::default()
    }

    pub fn push(&mut self, kind: HandlerKind, interested: bool) -> HandlerId {
        let id = HandlerId(self.next_id);
        self.next_id += 1;

        stack_log!(Cyan "push handler {:?} (interested: {})", kind, interested);

        self.handlers.push(ExitHandler {
            id,
            kind,
            interested,
            throw_edges: Vec::new(),
            normal_exits: Vec::new(),
        });

        id
    }

    /// Removes the innermost handler, which must be the one `id` names
    pub fn pop(&mut self, id: HandlerId) -> Result<ExitHandler, CompilerError> {
        match self.handlers.pop() {
            Some(handler) if handler.id == id => {
                stack_log!(Cyan "pop handler {:?}", handler.kind);
                Ok(handler)
            }
            Some(handler) => {
                return_compiler_error!(
                    "Exit handlers popped out of order: expected {:?}, found {:?} ({:?})",
                    id,
                    handler.id,
                    handler.kind
                );
            }
            None => {
                return_compiler_error!("Exit handler {:?} popped from an empty stack", id);
            }
        }
    }

    pub fn add_throw_edge(&mut self, slot: usize) -> Result<(), CompilerError> {
        match self.handlers.iter_mut().rev().find(|handler| handler.interested) {
            Some(handler) => {
                handler.throw_edges.push(slot);
                Ok(())
            }
            None => {
                return_compiler_error!("Throw at {} has no interested exit handler", slot);
            }
        }
    }

    pub fn add_normal_exit(&mut self, id: HandlerId, slot: usize) -> Result<(), CompilerError> {
        match self.handlers.iter_mut().find(|handler| handler.id == id) {
            Some(handler) => {
                handler.normal_exits.push(slot);
                Ok(())
            }
            None => {
                return_compiler_error!("Normal exit registered on inactive handler {:?}", id);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
#[path = "tests/exit_handlers_tests.rs"]
mod tests;
