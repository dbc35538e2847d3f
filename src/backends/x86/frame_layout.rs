//! Where every variable of a function lives in its stack frame.
//!
//! ```text
//!   8+8n(%ebp)      thrown slot (reserved by the caller of a can-throw function)
//!   8+8i(%ebp)      parameter i value, tag at +4
//!   4(%ebp)         return address
//!   0(%ebp)         saved %ebp
//!  -8(k+1)(%ebp)    local k value, tag at +4
//!   below locals    spilled operand slots, pushed tag first
//! ```

use crate::backends::stack::instructions::{Instruction, StackFunction, StackProgram, StackVariable};
use crate::backends::x86::asm_entities::{EXCEPTION_PAYLOAD, EXCEPTION_PAYLOAD_TYPE, Operand};
use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::return_codegen_error;
use rustc_hash::FxHashMap;

pub const SLOT_SIZE: i32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableHome {
    Parameter(usize),
    Local(usize),

    /// `$thrown_data` is shared by all frames through the payload globals
    PayloadGlobal,
}

#[derive(Debug, Clone)]
pub struct FrameLayout {
    arity: usize,
    locals: Vec<StackVariable>,
    homes: FxHashMap<StackVariable, VariableHome>,
}

impl FrameLayout {
    pub fn of(function: &StackFunction, program: &StackProgram) -> Self {
        let mut homes = FxHashMap::default();
        for (index, parameter) in function.parameters.iter().enumerate() {
            homes
                .entry(StackVariable::user(parameter))
                .or_insert(VariableHome::Parameter(index));
        }

        let mut layout = FrameLayout {
            arity: function.parameters.len(),
            locals: Vec::new(),
            homes,
        };

        for instruction in &function.instructions {
            match instruction {
                Instruction::Ld(variable) | Instruction::St(variable) => layout.place(variable),

                // The caller pops the thrown slot into `$thrown` after every can-throw call
                Instruction::Call(target) if program.can_throw(target) => {
                    layout.place(&StackVariable::Thrown)
                }
                _ => {}
            }
        }

        layout
    }

    fn place(&mut self, variable: &StackVariable) {
        if self.homes.contains_key(variable) {
            return;
        }

        let home = match variable {
            StackVariable::ThrownData => VariableHome::PayloadGlobal,
            _ => {
                self.locals.push(variable.to_owned());
                VariableHome::Local(self.locals.len() - 1)
            }
        };

        self.homes.insert(variable.to_owned(), home);
    }

    pub fn home(&self, variable: &StackVariable) -> Option<VariableHome> {
        self.homes.get(variable).copied()
    }

    /// The (value, tag) operands of a variable
    pub fn operands(&self, variable: &StackVariable) -> Result<(Operand, Operand), CompilerError> {
        let Some(home) = self.home(variable) else {
            return_codegen_error!("Variable {} has no home in this frame", variable);
        };

        Ok(match home {
            VariableHome::Parameter(index) => parameter_slot(index),
            VariableHome::Local(index) => local_slot(index),
            VariableHome::PayloadGlobal => (
                Operand::global(EXCEPTION_PAYLOAD),
                Operand::global(EXCEPTION_PAYLOAD_TYPE),
            ),
        })
    }

    pub fn locals(&self) -> &[StackVariable] {
        &self.locals
    }

    pub fn locals_size(&self) -> i32 {
        SLOT_SIZE * self.locals.len() as i32
    }

    /// Zero-initialised words of every local, value and tag
    pub fn local_words(&self) -> impl Iterator<Item = Operand> + '_ {
        (0..self.locals.len() as i32 * 2).map(|word| Operand::frame(-4 * (word + 1)))
    }

    pub fn thrown_slot(&self) -> Operand {
        Operand::frame(8 + SLOT_SIZE * self.arity as i32)
    }

    /// The (value, tag) operands of the n-th spilled operand slot
    pub fn spill(&self, index: usize) -> (Operand, Operand) {
        let offset = -self.locals_size() - SLOT_SIZE * (index as i32 + 1);
        (Operand::frame(offset), Operand::frame(offset + 4))
    }

    pub fn parameters(&self) -> impl Iterator<Item = (Operand, Operand)> {
        (0..self.arity).map(parameter_slot)
    }

    /// Variables released when the function returns.
    /// `$exdata` is skipped: its payload moves to the caller.
    pub fn swept_variables(&self) -> Vec<(Operand, Operand)> {
        let locals = self
            .locals
            .iter()
            .enumerate()
            .filter(|(_, variable)| {
                !variable.is_scalar_only() && **variable != StackVariable::ExceptionData
            })
            .map(|(index, _)| local_slot(index));

        self.parameters().chain(locals).collect()
    }
}

fn parameter_slot(index: usize) -> (Operand, Operand) {
    let offset = 8 + SLOT_SIZE * index as i32;
    (Operand::frame(offset), Operand::frame(offset + 4))
}

fn local_slot(index: usize) -> (Operand, Operand) {
    let offset = -SLOT_SIZE * (index as i32 + 1);
    (Operand::frame(offset), Operand::frame(offset + 4))
}

#[cfg(test)]
#[path = "tests/frame_layout_tests.rs"]
mod tests;
