//! Replays a `StackProgram` instruction by instruction.
//!
//! Each call runs in its own frame with a fresh variable table and operand
//! stack. A callee that finishes with `TransEx` hands its exception back
//! through the caller's `$thrown` / `$thrown_data` slots, exactly where the
//! compiled post-call check looks for it.

use crate::backends::stack::exception_ids::INDEX_OUT_OF_BOUNDS_ID;
use crate::backends::stack::instructions::{
    CallTarget, Instruction, StackFunction, StackProgram, StackVariable,
};
use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::language::ast_nodes::FunctionKey;
use crate::compiler_frontend::language::values::TaggedValue;
use crate::runtime::heap::Heap;
use crate::runtime::intrinsic_semantics::{
    ConsoleIo, IntrinsicResult, RunOutcome, UncaughtException, call_intrinsic,
};
use crate::{eval_log, return_runtime_error};
use rustc_hash::FxHashMap;

/// How a frame finished
struct FrameExit {
    value: TaggedValue,

    // (id, payload) handed over by TransEx
    transferred: Option<(TaggedValue, TaggedValue)>,
}

struct Frame {
    variables: FxHashMap<StackVariable, TaggedValue>,
    stack: Vec<TaggedValue>,
    transferred: Option<(TaggedValue, TaggedValue)>,
}

impl Frame {
    fn new(function: &StackFunction, arguments: Vec<TaggedValue>) -> Self {
        let variables = function
            .parameters
            .iter()
            .zip(arguments)
            .map(|(parameter, argument)| (StackVariable::user(parameter), argument))
            .collect();

        Frame {
            variables,
            stack: Vec::new(),
            transferred: None,
        }
    }

    fn load(&self, variable: &StackVariable) -> TaggedValue {
        self.variables.get(variable).copied().unwrap_or_default()
    }

    fn store(&mut self, variable: &StackVariable, value: TaggedValue) {
        self.variables.insert(variable.to_owned(), value);
    }

    fn pop(&mut self, key: &FunctionKey, ip: usize) -> Result<TaggedValue, CompilerError> {
        match self.stack.pop() {
            Some(value) => Ok(value),
            None => {
                return_runtime_error!("Operand stack underflow in {} at {}", key, ip);
            }
        }
    }
}

struct StackInterpreter<'a> {
    functions: FxHashMap<&'a FunctionKey, &'a StackFunction>,
    pooled_strings: Vec<i32>,
    heap: Heap,
    io: ConsoleIo,
}

pub fn run_stack_program(
    program: &StackProgram,
    input: &[i32],
) -> Result<RunOutcome, CompilerError> {
    let mut heap = Heap::new();
    let pooled_strings = heap.preload_strings(&program.literal_pool);

    let mut interpreter = StackInterpreter {
        functions: program
            .functions
            .iter()
            .map(|function| (&function.key, function))
            .collect(),
        pooled_strings,
        heap,
        io: ConsoleIo::new(input),
    };

    let exit = interpreter.call_user(&program.entry, Vec::new())?;

    let uncaught = exit.transferred.map(|(id, payload)| UncaughtException {
        id: id.value,
        name: program
            .exception_name(id.value)
            .unwrap_or_default()
            .to_owned(),
        payload: payload.value,
    });

    Ok(RunOutcome {
        output: interpreter.io.output,
        uncaught,
    })
}

impl<'a> StackInterpreter<'a> {
    fn call_user(
        &mut self,
        key: &FunctionKey,
        arguments: Vec<TaggedValue>,
    ) -> Result<FrameExit, CompilerError> {
        let Some(function) = self.functions.get(key).copied() else {
            return_runtime_error!("Call to {} which was never compiled", key);
        };

        eval_log!(Cyan "enter ", #key);

        let mut frame = Frame::new(function, arguments);
        let code = &function.instructions;
        let mut ip = 0;

        loop {
            let Some(instruction) = code.get(ip) else {
                return_runtime_error!("{} ran past its last instruction ({})", key, ip);
            };
            ip += 1;

            match instruction {
                Instruction::Push(value) => frame.stack.push(TaggedValue::scalar(*value)),

                Instruction::PushPooled(index) => {
                    let Some(handle) = self.pooled_strings.get(*index) else {
                        return_runtime_error!("Literal pool has no entry {}", index);
                    };
                    frame.stack.push(TaggedValue::scalar(*handle));
                }

                Instruction::Ld(variable) => {
                    let value = frame.load(variable);
                    frame.stack.push(value);
                }

                Instruction::St(variable) => {
                    let value = frame.pop(key, ip)?;
                    frame.store(variable, value);
                }

                Instruction::Unop(operator) => {
                    let operand = frame.pop(key, ip)?;
                    frame
                        .stack
                        .push(TaggedValue::scalar(operator.semantics(operand.value)));
                }

                Instruction::Binop(operator) => {
                    let right = frame.pop(key, ip)?;
                    let left = frame.pop(key, ip)?;
                    let Some(result) = operator.semantics(left.value, right.value) else {
                        return_runtime_error!(
                            "Arithmetic fault: {} {} {}",
                            left.value,
                            operator.symbol(),
                            right.value
                        );
                    };
                    frame.stack.push(TaggedValue::scalar(result));
                }

                Instruction::Jmp(target) => ip = *target,

                Instruction::Jz(target) => {
                    if frame.pop(key, ip)?.value == 0 {
                        ip = *target;
                    }
                }

                Instruction::Call(target) => {
                    let arity = target.arity();
                    if frame.stack.len() < arity {
                        return_runtime_error!("Call to {} with only {} operands", target, frame.stack.len());
                    }
                    let arguments = frame.stack.split_off(frame.stack.len() - arity);

                    let result = self.call(target, arguments, &mut frame)?;
                    frame.stack.push(result);
                }

                Instruction::Pop => {
                    frame.pop(key, ip)?;
                }

                Instruction::Ret1 => {
                    let value = frame.pop(key, ip)?;
                    return Ok(FrameExit {
                        value,
                        transferred: frame.transferred,
                    });
                }

                Instruction::Ret0 => {
                    return Ok(FrameExit {
                        value: TaggedValue::scalar(0),
                        transferred: frame.transferred,
                    });
                }

                Instruction::TransEx => {
                    frame.transferred = Some((
                        frame.load(&StackVariable::CurrentException),
                        frame.load(&StackVariable::ExceptionData),
                    ));
                }
            }
        }
    }

    fn call(
        &mut self,
        target: &CallTarget,
        arguments: Vec<TaggedValue>,
        frame: &mut Frame,
    ) -> Result<TaggedValue, CompilerError> {
        match target {
            CallTarget::User(callee) => {
                let exit = self.call_user(callee, arguments)?;
                if let Some((id, payload)) = exit.transferred {
                    frame.store(&StackVariable::Thrown, id);
                    frame.store(&StackVariable::ThrownData, payload);
                }
                Ok(exit.value)
            }

            CallTarget::Intrinsic(intrinsic) => {
                match call_intrinsic(*intrinsic, &arguments, &mut self.heap, &mut self.io)? {
                    IntrinsicResult::Returned(value) => Ok(value),
                    IntrinsicResult::OutOfBounds(index) => {
                        frame.store(
                            &StackVariable::Thrown,
                            TaggedValue::scalar(INDEX_OUT_OF_BOUNDS_ID),
                        );
                        frame.store(&StackVariable::ThrownData, TaggedValue::scalar(index));
                        Ok(TaggedValue::scalar(0))
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/stack_interpreter_tests.rs"]
mod tests;
