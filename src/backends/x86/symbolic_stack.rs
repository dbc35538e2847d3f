//! The compile-time model of the operand stack.
//!
//! Every stack slot is a (value, tag) pair. The two bottom-most slots live
//! in register pairs, the rest are spilled to the machine stack in push
//! order, so a slot's location follows from its depth alone. Each slot also
//! remembers whether it owns a reference that must be released when the
//! slot is consumed.

use crate::backends::x86::asm_entities::Register;
use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::return_codegen_error;
use std::fmt::{Display, Formatter, Result as FmtResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterPair {
    R0,
    R1,
}

impl RegisterPair {
    pub const ALL: [RegisterPair; 2] = [RegisterPair::R0, RegisterPair::R1];

    pub fn value(self) -> Register {
        match self {
            RegisterPair::R0 => Register::Ecx,
            RegisterPair::R1 => Register::Esi,
        }
    }

    pub fn tag(self) -> Register {
        match self {
            RegisterPair::R0 => Register::Edx,
            RegisterPair::R1 => Register::Edi,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotLocation {
    Register(RegisterPair),

    /// Index into the spill area, counted from the first spilled slot
    Spilled(usize),
}

impl SlotLocation {
    pub fn for_depth(depth: usize) -> Self {
        match RegisterPair::ALL.get(depth) {
            Some(pair) => SlotLocation::Register(*pair),
            None => SlotLocation::Spilled(depth - RegisterPair::ALL.len()),
        }
    }

    pub fn is_spilled(self) -> bool {
        matches!(self, SlotLocation::Spilled(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolicSlot {
    pub location: SlotLocation,
    pub owned: bool,
}

/// Register pairs holding the `depth` bottom-most slots
pub fn registers_in_use(depth: usize) -> &'static [RegisterPair] {
    &RegisterPair::ALL[..depth.min(RegisterPair::ALL.len())]
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolicStack {
    slots: Vec<SymbolicSlot>,
}

impl SymbolicStack {
    pub fn new() -> Self {
        SymbolicStack::default()
    }

    pub fn depth(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn push(&mut self, owned: bool) -> SymbolicSlot {
        let slot = SymbolicSlot {
            location: SlotLocation::for_depth(self.slots.len()),
            owned,
        };
        self.slots.push(slot);
        slot
    }

    pub fn pop(&mut self, origin: &str) -> Result<SymbolicSlot, CompilerError> {
        match self.slots.pop() {
            Some(slot) => Ok(slot),
            None => {
                return_codegen_error!(
                    "{} needs an operand but the symbolic stack is empty",
                    origin;
                    { CompilationStage => "Native Codegen", InstructionKind => "operand" }
                );
            }
        }
    }

    /// Pops `count` slots, returned bottom-most first
    pub fn pop_many(&mut self, count: usize, origin: &str) -> Result<Vec<SymbolicSlot>, CompilerError> {
        if count > self.slots.len() {
            return_codegen_error!(
                "{} needs {} operands but the symbolic stack holds {}",
                origin,
                count,
                self.slots.len()
            );
        }

        Ok(self.slots.split_off(self.slots.len() - count))
    }

    pub fn spilled_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.location.is_spilled())
            .count()
    }
}

impl Display for SymbolicStack {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "[")?;
        for (index, slot) in self.slots.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            match slot.location {
                SlotLocation::Register(RegisterPair::R0) => write!(f, "R0")?,
                SlotLocation::Register(RegisterPair::R1) => write!(f, "R1")?,
                SlotLocation::Spilled(spill) => write!(f, "S{spill}")?,
            }
            if slot.owned {
                write!(f, "*")?;
            }
        }
        write!(f, "]")
    }
}

#[cfg(test)]
#[path = "tests/symbolic_stack_tests.rs"]
mod tests;
