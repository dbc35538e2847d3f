use crate::backends::stack::instructions::Instruction;
use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::return_compiler_error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpKind {
    Jmp,
    Jz,
}

/// A jump whose target is not known yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingJump {
    pub kind: JumpKind,

    /// The construct that emitted the jump, for diagnostics
    pub origin: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    Resolved(Instruction),
    Pending(PendingJump),
}

/// Forward-only instruction buffer with backpatched jumps.
/// Emitting a pending jump reserves its slot; resolving it writes the
/// final instruction into that slot by index.
#[derive(Debug, Default)]
pub struct CodeBuffer {
    slots: Vec<Slot>,
}

impl CodeBuffer {
    pub fn new() -> Self {
        CodeBuffer::default()
    }

    /// Index the next emitted instruction will get
    pub fn next_index(&self) -> usize {
        self.slots.len()
    }

    pub fn emit(&mut self, instruction: Instruction) {
        self.slots.push(Slot::Resolved(instruction));
    }

    pub fn emit_pending(&mut self, kind: JumpKind, origin: impl Into<String>) -> usize {
        self.slots.push(Slot::Pending(PendingJump {
            kind,
            origin: origin.into(),
        }));
        self.slots.len() - 1
    }

    pub fn resolve(&mut self, slot: usize, target: usize) -> Result<(), CompilerError> {
        let Some(Slot::Pending(pending)) = self.slots.get(slot) else {
            return_compiler_error!("Slot {} is not a pending jump", slot);
        };

        let instruction = match pending.kind {
            JumpKind::Jmp => Instruction::Jmp(target),
            JumpKind::Jz => Instruction::Jz(target),
        };

        self.slots[slot] = Slot::Resolved(instruction);
        Ok(())
    }

    pub fn resolve_all(&mut self, slots: &[usize], target: usize) -> Result<(), CompilerError> {
        for slot in slots {
            self.resolve(*slot, target)?;
        }

        Ok(())
    }

    /// Fails on the first jump that was never resolved
    pub fn finish(self) -> Result<Vec<Instruction>, CompilerError> {
        let mut instructions = Vec::with_capacity(self.slots.len());

        for (index, slot) in self.slots.into_iter().enumerate() {
            match slot {
                Slot::Resolved(instruction) => instructions.push(instruction),
                Slot::Pending(pending) => {
                    return_compiler_error!(
                        "Jump at {} emitted by '{}' was never given a target",
                        index,
                        pending.origin
                    );
                }
            }
        }

        Ok(instructions)
    }
}

#[cfg(test)]
#[path = "tests/code_buffer_tests.rs"]
mod tests;
