//! ============================================================
//!                      Bytecode Compiler
//! ============================================================
//! Lowers a resolved `Program` into a `StackProgram`.
//!
//! Code is emitted in one forward pass. Jumps whose target is not known
//! yet are reserved in the code buffer and backpatched once the target
//! is reached.
//!
//! `return` and `throw` share one mechanism: both store an exception id
//! in `$ex` and the payload in `$exdata`, then jump to the nearest exit
//! handler that is interested. `return` uses the reserved id -1, which
//! only the function's own landing code accepts. Everything else that
//! reaches the landing is handed to the caller with `TransEx`.

use crate::backends::stack::code_buffer::{CodeBuffer, JumpKind};
use crate::backends::stack::exception_ids::{ExceptionIds, RETURN_NORMALLY_ID};
use crate::backends::stack::exit_handlers::{ExitHandlerStack, HandlerKind};
use crate::backends::stack::instructions::{
    CallTarget, Instruction, StackFunction, StackProgram, StackVariable,
};
use crate::backends::stack::string_pool::StringPool;
use crate::backends::stack::throw_analysis::{callee_can_throw, throwing_functions};
use crate::compiler_frontend::compiler_errors::{CompilerError, ErrorMetaDataKey};
use crate::compiler_frontend::language::ast_nodes::{
    BinaryOperator, Callee, CatchBranch, ExceptionType, Expression, FunctionCall,
    FunctionDeclaration, FunctionKey, Program, Statement,
};
use crate::compiler_frontend::language::intrinsics::Intrinsic;
use crate::{return_compiler_error, stack_log};
use rayon::prelude::*;
use rustc_hash::FxHashSet;

/// Computed once before any function is compiled, read-only afterwards
struct ProgramContext {
    exception_ids: ExceptionIds,
    string_pool: StringPool,
    throwing: FxHashSet<FunctionKey>,
}

pub fn compile_program(program: &Program) -> Result<StackProgram, CompilerError> {
    let context = ProgramContext {
        exception_ids: ExceptionIds::collect(program),
        string_pool: StringPool::collect(program),
        throwing: throwing_functions(program),
    };

    // Functions share no compiler state, so they compile independently
    let functions = program
        .functions
        .par_iter()
        .map(|function| compile_function(function, &context))
        .collect::<Result<Vec<StackFunction>, CompilerError>>()?;

    Ok(StackProgram {
        functions,
        entry: program.entry.to_owned(),
        literal_pool: context.string_pool.literals().to_vec(),
        exception_names: context.exception_ids.names().to_vec(),
    })
}

fn compile_function(
    function: &FunctionDeclaration,
    context: &ProgramContext,
) -> Result<StackFunction, CompilerError> {
    let key = function.key();
    let mut compiler = FunctionCompiler::new(context);

    let body_handler = compiler
        .handlers
        .push(HandlerKind::FunctionBody, true);
    compiler.compile_statement(&function.body)?;
    compiler.emit(Instruction::Ret0);
    let body_handler = compiler.handlers.pop(body_handler)?;

    // Landing: a `return` finishes here, anything else goes to the caller
    let landing = compiler.code.next_index();
    compiler
        .code
        .resolve_all(&body_handler.throw_edges, landing)?;

    compiler.emit(Instruction::Ld(StackVariable::CurrentException));
    compiler.emit(Instruction::Push(RETURN_NORMALLY_ID));
    compiler.emit(Instruction::Binop(BinaryOperator::Eq));
    let uncaught = compiler.jump_if_zero(format!("exit of {key}"));
    compiler.emit(Instruction::Ld(StackVariable::ExceptionData));
    compiler.emit(Instruction::Ret1);
    compiler.resolve_here(uncaught)?;
    compiler.emit(Instruction::TransEx);
    compiler.emit(Instruction::Ret0);

    if !compiler.handlers.is_empty() {
        return_compiler_error!("Exit handlers left open after compiling {}", key);
    }

    let stack_function = StackFunction {
        can_throw: context.throwing.contains(&key),
        parameters: function.parameters.to_owned(),
        instructions: compiler.code.finish()?,
        key,
    };

    stack_log!(Dark Magenta "{}", stack_function);

    Ok(stack_function)
}

struct FunctionCompiler<'a> {
    context: &'a ProgramContext,
    code: CodeBuffer,
    handlers: ExitHandlerStack,

    // Values on the evaluation stack at the current emission point
    depth: usize,

    finally_blocks: usize,
    array_literals: usize,
}

impl<'a> FunctionCompiler<'a> {
    fn new(context: &'a ProgramContext) -> Self {
        FunctionCompiler {
            context,
            code: CodeBuffer::new(),
            handlers: ExitHandlerStack::new(),
            depth: 0,
            finally_blocks: 0,
            array_literals: 0,
        }
    }

    fn emit(&mut self, instruction: Instruction) {
        let (pops, pushes) = match &instruction {
            Instruction::Push(_) | Instruction::PushPooled(_) | Instruction::Ld(_) => (0, 1),
            Instruction::St(_) | Instruction::Pop | Instruction::Jz(_) | Instruction::Ret1 => (1, 0),
            Instruction::Unop(_) => (1, 1),
            Instruction::Binop(_) => (2, 1),
            Instruction::Call(target) => (target.arity(), 1),
            Instruction::Jmp(_) | Instruction::Ret0 | Instruction::TransEx => (0, 0),
        };

        self.depth = self.depth.saturating_sub(pops) + pushes;
        self.code.emit(instruction);
    }

    fn jump_if_zero(&mut self, origin: impl Into<String>) -> usize {
        self.depth = self.depth.saturating_sub(1);
        self.code.emit_pending(JumpKind::Jz, origin)
    }

    fn jump(&mut self, origin: impl Into<String>) -> usize {
        self.code.emit_pending(JumpKind::Jmp, origin)
    }

    fn resolve_here(&mut self, slot: usize) -> Result<(), CompilerError> {
        let target = self.code.next_index();
        self.code.resolve(slot, target)
    }

    /// Jumps to the nearest handler interested in exceptions
    fn throw_edge(&mut self, origin: impl Into<String>) -> Result<(), CompilerError> {
        let slot = self.jump(origin);
        self.handlers.add_throw_edge(slot)
    }

    fn exception_id(&self, exception_type: &ExceptionType) -> Result<i32, CompilerError> {
        match self.context.exception_ids.id(exception_type) {
            Some(id) => Ok(id),
            None => {
                return_compiler_error!("Exception type {} was never given an id", exception_type.0);
            }
        }
    }

    // ============================================================
    // Statements
    // ============================================================
    fn compile_statement(&mut self, statement: &Statement) -> Result<(), CompilerError> {
        match statement {
            Statement::Skip => {}

            Statement::Assign {
                variable,
                expression,
            } => {
                self.compile_expression(expression)?;
                self.emit(Instruction::St(StackVariable::user(variable)));
            }

            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let origin = format!("if {condition}");
                self.compile_expression(condition)?;
                let to_else = self.jump_if_zero(&origin);
                self.compile_statement(then_branch)?;
                let over_else = self.jump(&origin);
                self.resolve_here(to_else)?;
                self.compile_statement(else_branch)?;
                self.resolve_here(over_else)?;
            }

            Statement::While { condition, body } => {
                let origin = format!("while {condition}");
                let loop_start = self.code.next_index();
                self.compile_expression(condition)?;
                let exit = self.jump_if_zero(origin);
                self.compile_statement(body)?;
                self.emit(Instruction::Jmp(loop_start));
                self.resolve_here(exit)?;
            }

            Statement::Chain(first, second) => {
                self.compile_statement(first)?;
                self.compile_statement(second)?;
            }

            Statement::Return(expression) => {
                self.emit(Instruction::Push(RETURN_NORMALLY_ID));
                self.emit(Instruction::St(StackVariable::CurrentException));
                self.compile_expression(expression)?;
                self.emit(Instruction::St(StackVariable::ExceptionData));
                self.throw_edge(format!("return {expression}"))?;
            }

            Statement::FunctionCallStatement(call) => {
                self.compile_call(call)?;
                self.emit(Instruction::Pop);
            }

            Statement::Try {
                body,
                catches,
                finally,
            } => self.compile_try(body, catches, finally.as_deref())?,

            Statement::Throw {
                exception_type,
                data,
            } => {
                let id = self.exception_id(exception_type)?;
                self.emit(Instruction::Push(id));
                self.emit(Instruction::St(StackVariable::CurrentException));
                self.compile_expression(data)?;
                self.emit(Instruction::St(StackVariable::ExceptionData));
                self.throw_edge(format!("throw ({} {data})", exception_type.0))?;
            }
        }

        Ok(())
    }

    fn compile_try(
        &mut self,
        body: &Statement,
        catches: &[CatchBranch],
        finally: Option<&Statement>,
    ) -> Result<(), CompilerError> {
        if catches.is_empty() && finally.is_none() {
            return self.compile_statement(body);
        }

        let has_finally = finally.is_some();

        let try_handler = self.handlers.push(HandlerKind::TryBody, true);
        self.compile_statement(body)?;
        let body_exit = self.jump("try");
        self.handlers.add_normal_exit(try_handler, body_exit)?;
        let try_handler = self.handlers.pop(try_handler)?;

        // Throws from the body land on the catch chain
        let catch_chain = self.code.next_index();
        self.code
            .resolve_all(&try_handler.throw_edges, catch_chain)?;

        let mut normal_exits = try_handler.normal_exits;
        let mut into_finally = Vec::new();

        for branch in catches {
            let origin = format!("catch ({} {})", branch.exception_type.0, branch.variable);
            let id = self.exception_id(&branch.exception_type)?;

            self.emit(Instruction::Ld(StackVariable::CurrentException));
            self.emit(Instruction::Push(id));
            self.emit(Instruction::Binop(BinaryOperator::Eq));
            let next_branch = self.jump_if_zero(&origin);

            self.emit(Instruction::Ld(StackVariable::ExceptionData));
            self.emit(Instruction::St(StackVariable::user(&branch.variable)));
            self.emit(Instruction::Push(0));
            self.emit(Instruction::St(StackVariable::CurrentException));
            self.emit(Instruction::Push(0));
            self.emit(Instruction::St(StackVariable::ExceptionData));

            let catch_handler = self.handlers.push(HandlerKind::CatchBody, has_finally);
            self.compile_statement(&branch.body)?;
            let branch_exit = self.jump(&origin);
            self.handlers.add_normal_exit(catch_handler, branch_exit)?;
            let catch_handler = self.handlers.pop(catch_handler)?;

            normal_exits.extend(catch_handler.normal_exits);
            into_finally.extend(catch_handler.throw_edges);

            self.resolve_here(next_branch)?;
        }

        match finally {
            // An exception no branch matched falls through into finally as well
            Some(finally) => {
                let finally_start = self.code.next_index();
                self.code.resolve_all(&normal_exits, finally_start)?;
                self.code.resolve_all(&into_finally, finally_start)?;
                self.compile_finally(finally)
            }
            None => {
                self.throw_edge("unmatched exception")?;
                let end = self.code.next_index();
                self.code.resolve_all(&normal_exits, end)
            }
        }
    }

    fn compile_finally(&mut self, finally: &Statement) -> Result<(), CompilerError> {
        let n = self.finally_blocks;
        self.finally_blocks += 1;

        // Park whatever is propagating while the block runs
        self.emit(Instruction::Ld(StackVariable::CurrentException));
        self.emit(Instruction::St(StackVariable::FinallyException(n)));
        self.emit(Instruction::Ld(StackVariable::ExceptionData));
        self.emit(Instruction::St(StackVariable::FinallyData(n)));
        self.emit(Instruction::Push(0));
        self.emit(Instruction::St(StackVariable::CurrentException));

        let finally_handler = self.handlers.push(HandlerKind::Finally, false);
        self.compile_statement(finally)?;
        self.handlers.pop(finally_handler)?;

        self.emit(Instruction::Ld(StackVariable::FinallyException(n)));
        let end = self.jump_if_zero("finally");
        self.emit(Instruction::Ld(StackVariable::FinallyException(n)));
        self.emit(Instruction::St(StackVariable::CurrentException));
        self.emit(Instruction::Ld(StackVariable::FinallyData(n)));
        self.emit(Instruction::St(StackVariable::ExceptionData));
        self.emit(Instruction::Push(0));
        self.emit(Instruction::St(StackVariable::FinallyData(n)));
        self.throw_edge("rethrow after finally")?;
        self.resolve_here(end)
    }

    // ============================================================
    // Expressions
    // ============================================================
    fn compile_expression(&mut self, expression: &Expression) -> Result<(), CompilerError> {
        match expression {
            Expression::Const(value) => self.emit(Instruction::Push(*value)),

            Expression::StringLiteral(text) => {
                let Some(index) = self.context.string_pool.index_of(text) else {
                    return_compiler_error!("String literal \"{}\" is missing from the pool", text);
                };

                self.emit(Instruction::PushPooled(index));
                self.emit(Instruction::Call(CallTarget::Intrinsic(Intrinsic::StrDup)));
            }

            Expression::ArrayLiteral {
                boxed,
                initializers,
            } => self.compile_array_literal(*boxed, initializers)?,

            Expression::Variable(name) => self.emit(Instruction::Ld(StackVariable::user(name))),

            Expression::UnaryOperation { operator, operand } => {
                self.compile_expression(operand)?;
                self.emit(Instruction::Unop(*operator));
            }

            Expression::BinaryOperation {
                operator,
                left,
                right,
            } => {
                self.compile_expression(left)?;
                self.compile_expression(right)?;
                self.emit(Instruction::Binop(*operator));
            }

            Expression::FunctionCall(call) => self.compile_call(call)?,
        }

        Ok(())
    }

    fn compile_call(&mut self, call: &FunctionCall) -> Result<(), CompilerError> {
        let target = match &call.callee {
            Callee::User(key) => CallTarget::User(key.to_owned()),
            Callee::Intrinsic(intrinsic) => CallTarget::Intrinsic(*intrinsic),
            Callee::Unresolved { .. } => {
                let mut error = CompilerError::compiler_error(format!(
                    "Unresolved call '{call}' reached the bytecode compiler"
                ));
                error.location = call.location.to_owned();
                error.new_metadata_entry(
                    ErrorMetaDataKey::CompilationStage,
                    "Bytecode Compilation",
                );
                return Err(error);
            }
        };

        for argument in &call.arguments {
            self.compile_expression(argument)?;
        }

        self.emit(Instruction::Call(target));

        if callee_can_throw(&call.callee, &self.context.throwing) {
            self.check_thrown(format!("call {call}"))?;
        }

        Ok(())
    }

    /// Runs after a call that can throw. When the callee left an exception
    /// in `$thrown`, it becomes the current exception, the half-evaluated
    /// operands are dropped and control takes the throw edge.
    fn check_thrown(&mut self, origin: String) -> Result<(), CompilerError> {
        self.emit(Instruction::Ld(StackVariable::Thrown));
        let no_exception = self.jump_if_zero(&origin);

        self.emit(Instruction::Ld(StackVariable::Thrown));
        self.emit(Instruction::St(StackVariable::CurrentException));
        self.emit(Instruction::Ld(StackVariable::ThrownData));
        self.emit(Instruction::St(StackVariable::ExceptionData));
        self.emit(Instruction::Push(0));
        self.emit(Instruction::St(StackVariable::Thrown));

        let depth = self.depth;
        for _ in 0..depth {
            self.emit(Instruction::Pop);
        }
        self.throw_edge(origin)?;

        // The no-exception path still holds every operand
        self.depth = depth;
        self.resolve_here(no_exception)
    }

    /// The array is allocated and parked in a reserved slot first, then each
    /// element is evaluated and stored in order, so an exception in one
    /// element leaves the earlier ones already written.
    fn compile_array_literal(
        &mut self,
        boxed: bool,
        initializers: &[Expression],
    ) -> Result<(), CompilerError> {
        let slot = StackVariable::ArrayLiteral(self.array_literals);
        self.array_literals += 1;

        let make = if boxed {
            Intrinsic::ArrMakeBoxed
        } else {
            Intrinsic::ArrMake
        };

        self.emit(Instruction::Push(initializers.len() as i32));
        self.emit(Instruction::Push(0));
        self.emit(Instruction::Call(CallTarget::Intrinsic(make)));
        self.emit(Instruction::St(slot.to_owned()));

        for (index, initializer) in initializers.iter().enumerate() {
            self.emit(Instruction::Ld(slot.to_owned()));
            self.emit(Instruction::Push(index as i32));
            self.compile_expression(initializer)?;
            self.emit(Instruction::Call(CallTarget::Intrinsic(Intrinsic::ArrSet)));
            self.check_thrown(format!("element {index} of array literal"))?;
            self.emit(Instruction::Pop);
        }

        self.emit(Instruction::Ld(slot));
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/stack_compiler_tests.rs"]
mod tests;
