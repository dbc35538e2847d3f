//! What each intrinsic does, shared by the tree interpreter, the stack
//! interpreter and the native simulator so they cannot drift apart.

use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::language::intrinsics::Intrinsic;
use crate::compiler_frontend::language::values::{TaggedValue, TypeTag};
use crate::runtime::heap::{Heap, HeapObject, expect_array};
use crate::{eval_log, return_runtime_error};
use serde::Serialize;
use std::collections::VecDeque;

/// Console-style integer I/O: `read` consumes the input, `write` appends to the output
#[derive(Debug, Default)]
pub struct ConsoleIo {
    input: VecDeque<i32>,
    pub output: Vec<i32>,
}

impl ConsoleIo {
    pub fn new(input: &[i32]) -> Self {
        ConsoleIo {
            input: input.iter().copied().collect(),
            output: Vec::new(),
        }
    }

    pub fn read(&mut self) -> Result<i32, CompilerError> {
        match self.input.pop_front() {
            Some(value) => Ok(value),
            None => {
                return_runtime_error!("read() called with no input left");
            }
        }
    }

    pub fn write(&mut self, value: i32) {
        eval_log!(Blue "write ", Bright value);
        self.output.push(value);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntrinsicResult {
    Returned(TaggedValue),

    /// Raised `IndexOutOfBounds` carrying the offending index
    OutOfBounds(i32),
}

/// An exception that reached the top of the entry function
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UncaughtException {
    pub id: i32,
    pub name: String,
    pub payload: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    pub output: Vec<i32>,
    pub uncaught: Option<UncaughtException>,
}

fn index_in(index: i32, length: usize) -> Option<usize> {
    usize::try_from(index).ok().filter(|index| *index < length)
}

fn length_of(value: TaggedValue, operation: &str) -> Result<usize, CompilerError> {
    match usize::try_from(value.value) {
        Ok(length) => Ok(length),
        Err(_) => {
            return_runtime_error!("{} called with the negative length {}", operation, value.value);
        }
    }
}

fn returned_scalar(value: i32) -> Result<IntrinsicResult, CompilerError> {
    Ok(IntrinsicResult::Returned(TaggedValue::scalar(value)))
}

/// Runs one intrinsic. Arguments arrive in declaration order and
/// the caller has already checked the arity through call resolution.
pub fn call_intrinsic(
    intrinsic: Intrinsic,
    arguments: &[TaggedValue],
    heap: &mut Heap,
    io: &mut ConsoleIo,
) -> Result<IntrinsicResult, CompilerError> {
    if arguments.len() != intrinsic.arity() {
        return_runtime_error!(
            "{} expects {} arguments, got {}",
            intrinsic,
            intrinsic.arity(),
            arguments.len()
        );
    }

    match intrinsic {
        Intrinsic::Read => returned_scalar(io.read()?),

        Intrinsic::Write => {
            io.write(arguments[0].value);
            returned_scalar(0)
        }

        // ------------------------
        //  Strings
        // ------------------------
        Intrinsic::StrMake => {
            let length = length_of(arguments[0], "strmake")?;
            let handle = heap.allocate(HeapObject::Text(vec![arguments[1].value as u8; length]));
            returned_scalar(handle)
        }

        Intrinsic::StrCmp => {
            let left = heap.text(arguments[0].value)?;
            let right = heap.text(arguments[1].value)?;
            returned_scalar(left.cmp(right) as i32)
        }

        Intrinsic::StrGet => {
            let index = arguments[1].value;
            let text = heap.text(arguments[0].value)?;
            match index_in(index, text.len()) {
                Some(position) => returned_scalar(i32::from(text[position])),
                None => Ok(IntrinsicResult::OutOfBounds(index)),
            }
        }

        Intrinsic::StrDup => {
            let copy = heap.text(arguments[0].value)?.to_vec();
            returned_scalar(heap.allocate(HeapObject::Text(copy)))
        }

        Intrinsic::StrSet => {
            let index = arguments[1].value;
            let text = heap.text_mut(arguments[0].value)?;
            match index_in(index, text.len()) {
                Some(position) => {
                    text[position] = arguments[2].value as u8;
                    returned_scalar(0)
                }
                None => Ok(IntrinsicResult::OutOfBounds(index)),
            }
        }

        Intrinsic::StrCat => {
            let mut joined = heap.text(arguments[0].value)?.to_vec();
            joined.extend_from_slice(heap.text(arguments[1].value)?);
            returned_scalar(heap.allocate(HeapObject::Text(joined)))
        }

        // The payload is the start of the requested range
        Intrinsic::StrSub => {
            let from = arguments[1].value;
            let count = arguments[2].value;
            let text = heap.text(arguments[0].value)?;

            let range = match (usize::try_from(from), usize::try_from(count)) {
                (Ok(start), Ok(count)) if start + count <= text.len() => start..start + count,
                _ => return Ok(IntrinsicResult::OutOfBounds(from)),
            };

            let slice = text[range].to_vec();
            returned_scalar(heap.allocate(HeapObject::Text(slice)))
        }

        Intrinsic::StrLen => returned_scalar(heap.text(arguments[0].value)?.len() as i32),

        // ------------------------
        //  Arrays
        // ------------------------
        Intrinsic::ArrMake => {
            let length = length_of(arguments[0], "arrmake")?;
            let handle = heap.allocate(HeapObject::ScalarArray(vec![arguments[1].value; length]));
            Ok(IntrinsicResult::Returned(TaggedValue::new(
                handle,
                TypeTag::ScalarArray,
            )))
        }

        // Every element is the same tagged value, so nested arrays are shared
        Intrinsic::ArrMakeBoxed => {
            let length = length_of(arguments[0], "Arrmake")?;
            let initial = arguments[1];
            for _ in 0..length {
                heap.retain(initial)?;
            }

            let handle = heap.allocate(HeapObject::BoxedArray(vec![initial; length]));
            Ok(IntrinsicResult::Returned(TaggedValue::new(
                handle,
                TypeTag::BoxedArray,
            )))
        }

        Intrinsic::ArrGet => {
            let handle = expect_array(arguments[0], "arrget")?;
            let index = arguments[1].value;

            let element = match heap.object(handle)? {
                HeapObject::ScalarArray(values) => {
                    index_in(index, values.len()).map(|position| TaggedValue::scalar(values[position]))
                }
                HeapObject::BoxedArray(values) => {
                    index_in(index, values.len()).map(|position| values[position])
                }
                HeapObject::Text(_) => {
                    return_runtime_error!("arrget expects an array, found a string");
                }
            };

            match element {
                Some(element) => Ok(IntrinsicResult::Returned(element)),
                None => Ok(IntrinsicResult::OutOfBounds(index)),
            }
        }

        Intrinsic::ArrSet => {
            let handle = expect_array(arguments[0], "arrset")?;
            let index = arguments[1].value;
            let new_value = arguments[2];

            let previous = match heap.object_mut(handle)? {
                HeapObject::ScalarArray(values) => match index_in(index, values.len()) {
                    Some(position) => {
                        values[position] = new_value.value;
                        None
                    }
                    None => return Ok(IntrinsicResult::OutOfBounds(index)),
                },
                HeapObject::BoxedArray(values) => match index_in(index, values.len()) {
                    Some(position) => Some(std::mem::replace(&mut values[position], new_value)),
                    None => return Ok(IntrinsicResult::OutOfBounds(index)),
                },
                HeapObject::Text(_) => {
                    return_runtime_error!("arrset expects an array, found a string");
                }
            };

            // Boxed arrays own a reference to each element
            if let Some(previous) = previous {
                heap.retain(new_value)?;
                heap.release(previous)?;
            }

            returned_scalar(0)
        }

        Intrinsic::ArrLen => {
            let handle = expect_array(arguments[0], "arrlen")?;
            let length = match heap.object(handle)? {
                HeapObject::ScalarArray(values) => values.len(),
                HeapObject::BoxedArray(values) => values.len(),
                HeapObject::Text(_) => {
                    return_runtime_error!("arrlen expects an array, found a string");
                }
            };

            returned_scalar(length as i32)
        }
    }
}

#[cfg(test)]
#[path = "tests/intrinsic_semantics_tests.rs"]
mod tests;
