//! Direct structural evaluation of a resolved `Program`.
//!
//! This is the semantic oracle the other two executors are checked
//! against, so it stays as plain as possible: exceptions and `return`
//! both unwind through `Result`, and `try` is a match on the outcome.

use crate::backends::stack::exception_ids::{
    ExceptionIds, INDEX_OUT_OF_BOUNDS_ID, RETURN_NORMALLY_ID,
};
use crate::backends::stack::string_pool::StringPool;
use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::language::ast_nodes::{
    Callee, CatchBranch, Expression, FunctionCall, FunctionDeclaration, FunctionKey, Program,
    Statement,
};
use crate::compiler_frontend::language::intrinsics::Intrinsic;
use crate::compiler_frontend::language::values::TaggedValue;
use crate::runtime::heap::Heap;
use crate::runtime::intrinsic_semantics::{
    ConsoleIo, IntrinsicResult, RunOutcome, UncaughtException, call_intrinsic,
};
use crate::{eval_log, return_compiler_error, return_runtime_error};
use rustc_hash::FxHashMap;

enum Unwind {
    // `return` is the exception with id RETURN_NORMALLY_ID
    Exception { id: i32, payload: TaggedValue },
    Fault(CompilerError),
}

impl From<CompilerError> for Unwind {
    fn from(error: CompilerError) -> Self {
        Unwind::Fault(error)
    }
}

type Flow<T> = Result<T, Unwind>;

#[derive(Default)]
struct Frame {
    variables: FxHashMap<String, TaggedValue>,
}

impl Frame {
    // Variables that were never assigned read as scalar 0
    fn load(&self, name: &str) -> TaggedValue {
        self.variables.get(name).copied().unwrap_or_default()
    }

    fn store(&mut self, name: &str, value: TaggedValue) {
        self.variables.insert(name.to_owned(), value);
    }
}

struct TreeInterpreter<'a> {
    functions: FxHashMap<FunctionKey, &'a FunctionDeclaration>,
    exception_ids: ExceptionIds,
    string_pool: StringPool,
    pooled_strings: Vec<i32>,
    heap: Heap,
    io: ConsoleIo,
}

pub fn run_program(program: &Program, input: &[i32]) -> Result<RunOutcome, CompilerError> {
    let string_pool = StringPool::collect(program);
    let mut heap = Heap::new();
    let pooled_strings = heap.preload_strings(string_pool.literals());

    let mut interpreter = TreeInterpreter {
        functions: program
            .functions
            .iter()
            .map(|function| (function.key(), function))
            .collect(),
        exception_ids: ExceptionIds::collect(program),
        string_pool,
        pooled_strings,
        heap,
        io: ConsoleIo::new(input),
    };

    let uncaught = match interpreter.call_user(&program.entry, Vec::new()) {
        Ok(_) => None,
        Err(Unwind::Fault(error)) => return Err(error),
        Err(Unwind::Exception { id, payload }) => Some(UncaughtException {
            id,
            name: interpreter
                .exception_ids
                .name(id)
                .unwrap_or_default()
                .to_owned(),
            payload: payload.value,
        }),
    };

    Ok(RunOutcome {
        output: interpreter.io.output,
        uncaught,
    })
}

impl<'a> TreeInterpreter<'a> {
    fn call_user(&mut self, key: &FunctionKey, arguments: Vec<TaggedValue>) -> Flow<TaggedValue> {
        let Some(function) = self.functions.get(key).copied() else {
            return_compiler_error!("Call to undeclared function {}", key);
        };

        eval_log!(Cyan "call ", #key);

        let mut frame = Frame::default();
        for (parameter, argument) in function.parameters.iter().zip(arguments) {
            frame.store(parameter, argument);
        }

        // Falling off the end returns scalar 0
        match self.execute(&function.body, &mut frame) {
            Ok(()) => Ok(TaggedValue::scalar(0)),
            Err(Unwind::Exception {
                id: RETURN_NORMALLY_ID,
                payload,
            }) => Ok(payload),
            Err(unwind) => Err(unwind),
        }
    }

    // ============================================================
    // Statements
    // ============================================================
    fn execute(&mut self, statement: &Statement, frame: &mut Frame) -> Flow<()> {
        match statement {
            Statement::Skip => Ok(()),

            Statement::Assign {
                variable,
                expression,
            } => {
                let value = self.evaluate(expression, frame)?;
                frame.store(variable, value);
                Ok(())
            }

            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition, frame)?.value != 0 {
                    self.execute(then_branch, frame)
                } else {
                    self.execute(else_branch, frame)
                }
            }

            Statement::While { condition, body } => {
                while self.evaluate(condition, frame)?.value != 0 {
                    self.execute(body, frame)?;
                }
                Ok(())
            }

            Statement::Chain(first, second) => {
                self.execute(first, frame)?;
                self.execute(second, frame)
            }

            Statement::Return(expression) => {
                let payload = self.evaluate(expression, frame)?;
                Err(Unwind::Exception {
                    id: RETURN_NORMALLY_ID,
                    payload,
                })
            }

            Statement::FunctionCallStatement(call) => {
                self.call(call, frame)?;
                Ok(())
            }

            Statement::Try {
                body,
                catches,
                finally,
            } => self.execute_try(body, catches, finally.as_deref(), frame),

            Statement::Throw {
                exception_type,
                data,
            } => {
                let Some(id) = self.exception_ids.id(exception_type) else {
                    return_compiler_error!("Exception type {} has no id", exception_type.0);
                };

                let payload = self.evaluate(data, frame)?;
                Err(Unwind::Exception { id, payload })
            }
        }
    }

    fn execute_try(
        &mut self,
        body: &Statement,
        catches: &[CatchBranch],
        finally: Option<&Statement>,
        frame: &mut Frame,
    ) -> Flow<()> {
        // The exception still propagating once the catches have had their turn
        let pending = match self.execute(body, frame) {
            Ok(()) => None,
            Err(Unwind::Fault(error)) => return Err(Unwind::Fault(error)),
            Err(Unwind::Exception { id, payload }) => {
                let handler = catches
                    .iter()
                    .find(|branch| self.exception_ids.id(&branch.exception_type) == Some(id));

                match handler {
                    Some(branch) => {
                        frame.store(&branch.variable, payload);
                        match self.execute(&branch.body, frame) {
                            Ok(()) => None,
                            Err(Unwind::Fault(error)) => return Err(Unwind::Fault(error)),
                            Err(exception) => Some(exception),
                        }
                    }
                    None => Some(Unwind::Exception { id, payload }),
                }
            }
        };

        // Anything thrown by the finally block replaces what was pending
        if let Some(finally) = finally {
            self.execute(finally, frame)?;
        }

        match pending {
            Some(unwind) => Err(unwind),
            None => Ok(()),
        }
    }

    // ============================================================
    // Expressions
    // ============================================================
    fn evaluate(&mut self, expression: &Expression, frame: &mut Frame) -> Flow<TaggedValue> {
        match expression {
            Expression::Const(value) => Ok(TaggedValue::scalar(*value)),

            Expression::StringLiteral(text) => {
                let Some(index) = self.string_pool.index_of(text) else {
                    return_compiler_error!("String literal \"{}\" is missing from the pool", text);
                };

                let pooled = TaggedValue::scalar(self.pooled_strings[index]);
                self.call_intrinsic(Intrinsic::StrDup, &[pooled])
            }

            // The array exists before any element is evaluated
            Expression::ArrayLiteral {
                boxed,
                initializers,
            } => {
                let make = if *boxed {
                    Intrinsic::ArrMakeBoxed
                } else {
                    Intrinsic::ArrMake
                };
                let length = TaggedValue::scalar(initializers.len() as i32);
                let array = self.call_intrinsic(make, &[length, TaggedValue::scalar(0)])?;

                for (index, initializer) in initializers.iter().enumerate() {
                    let value = self.evaluate(initializer, frame)?;
                    self.call_intrinsic(
                        Intrinsic::ArrSet,
                        &[array, TaggedValue::scalar(index as i32), value],
                    )?;
                }

                Ok(array)
            }

            Expression::Variable(name) => Ok(frame.load(name)),

            Expression::UnaryOperation { operator, operand } => {
                let operand = self.evaluate(operand, frame)?;
                Ok(TaggedValue::scalar(operator.semantics(operand.value)))
            }

            Expression::BinaryOperation {
                operator,
                left,
                right,
            } => {
                let left = self.evaluate(left, frame)?;
                let right = self.evaluate(right, frame)?;
                match operator.semantics(left.value, right.value) {
                    Some(result) => Ok(TaggedValue::scalar(result)),
                    None => {
                        return_runtime_error!(
                            "Arithmetic fault: {} {} {}",
                            left.value,
                            operator.symbol(),
                            right.value
                        );
                    }
                }
            }

            Expression::FunctionCall(call) => self.call(call, frame),
        }
    }

    fn call(&mut self, call: &FunctionCall, frame: &mut Frame) -> Flow<TaggedValue> {
        let mut arguments = Vec::with_capacity(call.arguments.len());
        for argument in &call.arguments {
            arguments.push(self.evaluate(argument, frame)?);
        }

        match &call.callee {
            Callee::User(key) => self.call_user(key, arguments),
            Callee::Intrinsic(intrinsic) => self.call_intrinsic(*intrinsic, &arguments),
            Callee::Unresolved { name, arity } => {
                return_compiler_error!("Unresolved call to {}/{} reached the interpreter", name, arity);
            }
        }
    }

    fn call_intrinsic(
        &mut self,
        intrinsic: Intrinsic,
        arguments: &[TaggedValue],
    ) -> Flow<TaggedValue> {
        match call_intrinsic(intrinsic, arguments, &mut self.heap, &mut self.io)? {
            IntrinsicResult::Returned(value) => Ok(value),
            IntrinsicResult::OutOfBounds(index) => Err(Unwind::Exception {
                id: INDEX_OUT_OF_BOUNDS_ID,
                payload: TaggedValue::scalar(index),
            }),
        }
    }
}

#[cfg(test)]
#[path = "tests/tree_interpreter_tests.rs"]
mod tests;
