#![cfg(test)]

use crate::backends::stack::code_buffer::{CodeBuffer, JumpKind};
use crate::backends::stack::instructions::Instruction;
use crate::compiler_frontend::compiler_errors::ErrorType;

#[test]
fn pending_jumps_are_patched_in_place() {
    let mut code = CodeBuffer::new();
    code.emit(Instruction::Push(1));
    let skip = code.emit_pending(JumpKind::Jz, "if x");
    code.emit(Instruction::Push(2));
    let target = code.next_index();
    code.resolve(skip, target).expect("slot is pending");
    code.emit(Instruction::Ret0);

    let instructions = code.finish().expect("every jump resolved");
    assert_eq!(
        instructions,
        vec![
            Instruction::Push(1),
            Instruction::Jz(3),
            Instruction::Push(2),
            Instruction::Ret0
        ]
    );
}

#[test]
fn unfilled_placeholder_names_its_origin() {
    let mut code = CodeBuffer::new();
    code.emit(Instruction::Push(1));
    code.emit_pending(JumpKind::Jmp, "throw (Oops 1)");

    let error = code.finish().expect_err("pending slot left behind");
    assert_eq!(error.error_type, ErrorType::Compiler);
    assert!(error.msg.contains("throw (Oops 1)"));
    assert!(error.msg.contains("at 1"));
}

#[test]
fn resolving_a_finished_slot_is_rejected() {
    let mut code = CodeBuffer::new();
    code.emit(Instruction::Pop);

    let error = code.resolve(0, 0).expect_err("slot 0 is not pending");
    assert_eq!(error.error_type, ErrorType::Compiler);
}
