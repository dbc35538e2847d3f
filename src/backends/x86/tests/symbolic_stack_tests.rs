#![cfg(test)]

use crate::backends::x86::symbolic_stack::{
    RegisterPair, SlotLocation, SymbolicStack, registers_in_use,
};
use crate::compiler_frontend::compiler_errors::ErrorType;

#[test]
fn registers_fill_before_the_machine_stack() {
    let mut stack = SymbolicStack::new();

    let locations: Vec<SlotLocation> = (0..4).map(|_| stack.push(false).location).collect();
    assert_eq!(
        locations,
        vec![
            SlotLocation::Register(RegisterPair::R0),
            SlotLocation::Register(RegisterPair::R1),
            SlotLocation::Spilled(0),
            SlotLocation::Spilled(1),
        ]
    );
    assert_eq!(stack.spilled_count(), 2);
}

#[test]
fn popping_frees_the_top_location() {
    let mut stack = SymbolicStack::new();
    stack.push(false);
    stack.push(true);
    stack.push(false);

    let top = stack.pop("Pop").expect("three slots");
    assert_eq!(top.location, SlotLocation::Spilled(0));

    let owned = stack.pop("Pop").expect("two slots");
    assert!(owned.owned);

    assert_eq!(stack.push(false).location, SlotLocation::Register(RegisterPair::R1));
}

#[test]
fn snapshots_compare_owned_bits() {
    let mut left = SymbolicStack::new();
    let mut right = SymbolicStack::new();
    left.push(true);
    right.push(false);

    assert_ne!(left, right);
    assert_eq!(left.to_string(), "[R0*]");
    assert_eq!(right.to_string(), "[R0]");
}

#[test]
fn underflow_is_a_codegen_error() {
    let mut stack = SymbolicStack::new();
    let error = stack.pop("Binop").expect_err("empty stack");
    assert_eq!(error.error_type, ErrorType::Codegen);

    let error = stack.pop_many(2, "Call write/1").expect_err("empty stack");
    assert!(error.msg.contains("needs 2 operands"));
}

#[test]
fn pop_many_returns_bottom_first() {
    let mut stack = SymbolicStack::new();
    stack.push(false);
    stack.push(true);
    stack.push(false);

    let popped = stack.pop_many(2, "Call").expect("enough slots");
    assert_eq!(popped[0].location, SlotLocation::Register(RegisterPair::R1));
    assert!(popped[0].owned);
    assert_eq!(popped[1].location, SlotLocation::Spilled(0));
    assert_eq!(stack.depth(), 1);
}

#[test]
fn live_register_pairs_follow_depth() {
    assert!(registers_in_use(0).is_empty());
    assert_eq!(registers_in_use(1), &[RegisterPair::R0]);
    assert_eq!(registers_in_use(5), &[RegisterPair::R0, RegisterPair::R1]);
}
