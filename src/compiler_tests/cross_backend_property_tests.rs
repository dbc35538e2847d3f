//! Property-based tests across the three executors.
//!
//! Random programs are generated as source text over three scalar variables,
//! a flat array `f0` and a boxed array `bx`, with arithmetic, comparisons,
//! conditionals, bounded loops, calls that take and return arrays, and
//! `try` / `catch` / `finally` around statements that throw. Every generated
//! program terminates and never divides by zero. `f0` always holds three
//! scalars and `bx` always holds two flat arrays of three, so no reference
//! cycle can form and every exception is caught. `!!` is logical or.
#![cfg(test)]

use crate::backends::stack::stack_compiler::compile_program;
use crate::backends::stack::stack_interpreter::run_stack_program;
use crate::backends::x86::asm_simulator::run_native;
use crate::compiler_frontend::parse_source;
use crate::projects::settings::DEFAULT_SIMULATOR_STEP_LIMIT;
use crate::runtime::tree_interpreter::run_program;
use proptest::prelude::*;

const VARIABLES: [&str; 3] = ["v0", "v1", "v2"];

const PRELUDE: &str = "fun twice(a, b) begin return a + a - b end
fun fresh(x) begin return [x, x + 1, x * 2] end
fun total(a) begin return a[0] + a[1] + a[2] end
fun wipe(b, x) begin b[0] := [x, x, x] return 0 end
fun keep(a, y) begin return total(a) + y end
fun risky(x) begin if x > 0 then throw (Oops x) else return x * 3 fi end
fun guarded(a, x)
begin
    try
        return a[x]
    catch (IndexOutOfBounds i)
        return 0 - i
    finally
        write(5)
    yrt
end
";

fn variable() -> impl Strategy<Value = String> {
    prop::sample::select(VARIABLES.to_vec()).prop_map(String::from)
}

fn flat_index() -> impl Strategy<Value = i32> {
    0i32..3
}

fn boxed_index() -> impl Strategy<Value = i32> {
    0i32..2
}

fn expression() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![
        (-20i32..20).prop_map(|value| format!("({value})")),
        variable(),
        flat_index().prop_map(|index| format!("f0[{index}]")),
        (boxed_index(), flat_index()).prop_map(|(outer, inner)| format!("bx[{outer}][{inner}]")),
        Just(String::from("arrlen(bx)")),
    ];

    leaf.prop_recursive(4, 24, 2, |inner| {
        prop_oneof![
            (
                inner.clone(),
                prop::sample::select(vec!["+", "-", "*", "<", ">", "<=", ">=", "==", "!=", "&&", "!!"]),
                inner.clone(),
            )
                .prop_map(|(left, operator, right)| format!("({left} {operator} {right})")),
            // Constant, nonzero divisors only
            (inner.clone(), prop::sample::select(vec!["/", "%"]), 1i32..7)
                .prop_map(|(left, operator, divisor)| format!("({left} {operator} {divisor})")),
            inner.clone().prop_map(|operand| format!("!({operand})")),
            (inner.clone(), inner.clone()).prop_map(|(left, right)| format!("twice({left}, {right})")),
            boxed_index().prop_map(|index| format!("total(bx[{index}])")),
            inner.prop_map(|value| format!("total(fresh({value}))")),
        ]
    })
}

/// Statements that keep `f0` flat of three and `bx` boxed of two
fn array_statement() -> impl Strategy<Value = String> {
    prop_oneof![
        (flat_index(), expression()).prop_map(|(index, value)| format!("f0[{index}] := {value}")),
        (boxed_index(), flat_index(), expression())
            .prop_map(|(outer, inner, value)| format!("bx[{outer}][{inner}] := {value}")),
        boxed_index().prop_map(|index| format!("f0 := bx[{index}]")),
        boxed_index().prop_map(|index| format!("bx[{index}] := f0")),
        (boxed_index(), expression(), expression())
            .prop_map(|(index, first, second)| format!("bx[{index}] := [{first}, {second}, 0]")),
        expression().prop_map(|value| format!("f0 := fresh({value})")),
        expression().prop_map(|value| format!("bx := {{fresh({value}), f0}}")),
        (variable(), boxed_index(), expression()).prop_map(|(name, index, value)| {
            format!("{name} := keep(bx[{index}], wipe(bx, {value}))")
        }),
        (variable(), expression()).prop_map(|(name, index)| format!("{name} := guarded(f0, {index})")),
        Just(String::from("write(total(f0))")),
    ]
}

/// Statements that may throw, only ever generated inside a `try`
fn throwing_statement() -> impl Strategy<Value = String> {
    prop_oneof![
        (expression(), expression())
            .prop_map(|(condition, value)| format!("if {condition} then throw (Oops {value}) fi")),
        expression().prop_map(|index| format!("write(f0[{index}])")),
        expression().prop_map(|index| format!("write(bx[{index}][0])")),
        (variable(), expression()).prop_map(|(name, value)| format!("{name} := risky({value})")),
    ]
}

fn statement(depth: u32) -> BoxedStrategy<String> {
    let simple = prop_oneof![
        3 => (variable(), expression()).prop_map(|(name, value)| format!("{name} := {value}")),
        2 => expression().prop_map(|value| format!("write({value})")),
        2 => array_statement(),
    ];

    if depth == 0 {
        return simple.boxed();
    }

    let block = prop::collection::vec(statement(depth - 1), 1..4)
        .prop_map(|statements| statements.join("\n"));

    let guarded_block = prop::collection::vec(
        prop_oneof![2 => throwing_statement(), 1 => statement(depth - 1)],
        1..4,
    )
    .prop_map(|statements| statements.join("\n"));

    prop_oneof![
        4 => simple,
        1 => (expression(), block.clone(), block.clone()).prop_map(|(condition, then, otherwise)| {
            format!("if {condition} then\n{then}\nelse\n{otherwise}\nfi")
        }),
        // Loop counters are never assigned by the generated bodies
        1 => (0i32..4, block.clone()).prop_map(move |(count, body)| {
            let counter = format!("i{depth}");
            format!("for {counter} := 0, {counter} < {count}, {counter} := {counter} + 1 do\n{body}\nod")
        }),
        1 => (guarded_block, block, any::<bool>()).prop_map(|(body, cleanup, with_finally)| {
            let finally = if with_finally {
                format!("finally\n{cleanup}\n")
            } else {
                String::new()
            };
            format!(
                "try\n{body}\ncatch (Oops e)\nv0 := e\ncatch (IndexOutOfBounds e)\nv1 := e\n{finally}yrt"
            )
        }),
    ]
    .boxed()
}

fn program() -> impl Strategy<Value = String> {
    prop::collection::vec(statement(2), 1..8).prop_map(|statements| {
        format!(
            "{PRELUDE}\
             v0 := read()\n\
             v1 := read()\n\
             v2 := 0\n\
             f0 := fresh(v0)\n\
             bx := {{fresh(v1), [1, 2, 3]}}\n\
             {}\n\
             write(v0) write(v1) write(v2) write(total(f0)) write(total(bx[0]) + total(bx[1]))",
            statements.join("\n")
        )
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn all_backends_agree(source in program(), first in -100i32..100, second in -100i32..100) {
        let input = [first, second];
        let program = parse_source(&source).expect("generated programs parse");
        let compiled = compile_program(&program).expect("generated programs compile");

        let reference = run_program(&program, &input).expect("tree run");
        let stack = run_stack_program(&compiled, &input).expect("stack run");
        let native = run_native(&compiled, &input, DEFAULT_SIMULATOR_STEP_LIMIT)
            .expect("native run");

        prop_assert_eq!(&stack, &reference);
        prop_assert_eq!(&native.outcome, &reference);
        prop_assert_eq!(native.exit_code, 0);
        prop_assert!(native.refcounts.is_balanced());
    }

    #[test]
    fn exception_ids_are_stable(names in prop::collection::vec(prop::sample::select(vec!["Alpha", "Beta", "Gamma", "Delta"]), 1..6)) {
        let throws: Vec<String> = names
            .iter()
            .enumerate()
            .map(|(index, name)| format!(
                "try\n throw ({name} {index})\ncatch ({name} x)\n write(x)\nyrt"
            ))
            .collect();
        let source = throws.join("\n");

        let first = compile_program(&parse_source(&source).expect("parses"))
            .expect("compiles");
        let second = compile_program(&parse_source(&source).expect("parses"))
            .expect("compiles");

        prop_assert_eq!(&first.exception_names, &second.exception_names);
        prop_assert_eq!(first.exception_names[0].as_str(), "IndexOutOfBounds");

        // User types are numbered in order of first appearance
        let mut expected: Vec<&str> = Vec::new();
        for name in &names {
            if !expected.contains(name) {
                expected.push(name);
            }
        }
        let user_types: Vec<&str> = first.exception_names[1..].iter().map(String::as_str).collect();
        prop_assert_eq!(user_types, expected);
    }
}
