#![cfg(test)]

use crate::backends::stack::instructions::{
    CallTarget, Instruction, StackFunction, StackProgram,
};
use crate::backends::stack::stack_compiler::compile_program;
use crate::backends::stack::stack_interpreter::run_stack_program;
use crate::compiler_frontend::compiler_errors::ErrorType;
use crate::compiler_frontend::language::ast_nodes::FunctionKey;
use crate::compiler_frontend::language::intrinsics::Intrinsic;
use crate::compiler_frontend::parse_source;
use crate::runtime::intrinsic_semantics::RunOutcome;
use crate::runtime::tree_interpreter::run_program;

fn run(source: &str, input: &[i32]) -> RunOutcome {
    let program = parse_source(source).expect("program should parse");
    let compiled = compile_program(&program).expect("program should compile");
    let outcome = run_stack_program(&compiled, input).expect("program should run");

    // The tree interpreter is the reference for every stack run
    let reference = run_program(&program, input).expect("reference run");
    assert_eq!(outcome, reference, "stack and tree interpreters disagree");

    outcome
}

fn output(source: &str) -> Vec<i32> {
    let outcome = run(source, &[]);
    assert_eq!(outcome.uncaught, None);
    outcome.output
}

fn hand_written(instructions: Vec<Instruction>) -> StackProgram {
    let key = FunctionKey::new("main", 0);
    StackProgram {
        functions: vec![StackFunction {
            key: key.clone(),
            parameters: Vec::new(),
            instructions,
            can_throw: false,
        }],
        entry: key,
        literal_pool: Vec::new(),
        exception_names: Vec::new(),
    }
}

#[test]
fn factorial_writes_partial_products() {
    let source = "v1 := read()
        v2 := 1
        while v1 > 1 do
            v2 := v2 * v1
            v1 := v1 - 1
            write(v2)
        od";

    assert_eq!(run(source, &[6]).output, vec![6, 30, 120, 360, 720]);
}

#[test]
fn fast_power() {
    let source = "v3 := 1
        v1 := read()
        v2 := read()
        while v2 > 0 do
            if v2 % 2 == 1 then
                v3 := v3 * v1
                v2 := v2 - 1
            fi
            v1 := v1 * v1
            v2 := v2 / 2
        od
        write(v3)";

    assert_eq!(run(source, &[2, 11]).output, vec![2048]);
}

#[test]
fn nested_calls_thread_values_through() {
    let source = "fun addInts(a, b) begin return a + b end
        x := read()
        y := read()
        z := addInts(x, y)
        x := addInts(y, z)
        y := addInts(z, x)
        z := addInts(x, y)
        write(z)";

    assert_eq!(run(source, &[2, 3]).output, vec![3 * 2 + 5 * 3]);
}

#[test]
fn first_return_wins() {
    let source = "fun f(a, b, c) begin
            write(a) write(b) write(c)
            return a
            return b
        end
        write(f(7, 8, 9))";

    assert_eq!(output(source), vec![7, 8, 9, 7]);
}

#[test]
fn throw_through_recursion() {
    let source = "fun throwsWhen0(x)
        begin
            write(x)
            if x == 0 then throw (MyException 123) else throwsWhen0(x - 1) fi
            write(-1)
        end

        try
            throwsWhen0(5)
        catch (MyException data)
            write(data)
        yrt";

    assert_eq!(output(source), vec![5, 4, 3, 2, 1, 0, 123]);
}

#[test]
fn throw_from_catch_reaches_the_outer_try() {
    let source = "fun throwsOne() begin
            throw (ExceptionOne 1)
        end

        fun throwsSomething() begin
            try
                throwsOne()
            catch (ExceptionOne one)
                throw (ExceptionTwo one + one)
                write(-1)
            yrt
            write(-1)
        end

        try
            throwsSomething()
        catch (ExceptionTwo two)
            write(two)
        yrt";

    assert_eq!(output(source), vec![2]);
}

#[test]
fn throw_from_finally_replaces_the_catch_throw() {
    let source = "fun throwsOne() begin
            throw (ExceptionOne 1)
        end

        fun throwsSomething() begin
            try
                throwsOne()
            catch (ExceptionOne one)
                throw (ExceptionOne -1)
            finally
                throw (ExceptionTwo 2)
            yrt
            write(-1)
        end

        try
            throwsSomething()
        catch (ExceptionTwo two)
            write(two)
        yrt";

    assert_eq!(output(source), vec![2]);
}

#[test]
fn nested_throw_skips_unrelated_catches() {
    let source = "try
            try
                try
                    throw (ExceptionOne 1)
                catch (ExceptionTwo two)
                    write(-1)
                yrt
                write(-1)
            catch (ExceptionThree three)
                write(-1)
            yrt
            write(-1)
        catch (ExceptionOne one)
            write(one)
        yrt";

    assert_eq!(output(source), vec![1]);
}

#[test]
fn uncaught_exception_ends_the_run() {
    let outcome = run(
        "write(1)
         throw (Fatal 42)
         write(2)",
        &[],
    );

    assert_eq!(outcome.output, vec![1]);
    let uncaught = outcome.uncaught.expect("Fatal escapes main");
    assert_eq!((uncaught.id, uncaught.name.as_str(), uncaught.payload), (2, "Fatal", 42));
}

#[test]
fn index_out_of_bounds_is_catchable() {
    let source = "A := arrmake(2, 0)
        try
            A[5] := 1
        catch (IndexOutOfBounds i)
            write(i)
        yrt
        s := \"ab\"
        write(strget(s, 9))";

    let outcome = run(source, &[]);
    assert_eq!(outcome.output, vec![5]);
    assert_eq!(outcome.uncaught.expect("strget escapes").payload, 9);
}

#[test]
fn circular_references_can_be_walked() {
    let source = "A = {0, 1}
        B = {A, 2}
        C = {B, 3}
        A[0] = C

        X = A
        for i := 0, i < 4, i := i + 1 do
            write(X[1])
            X = X[0]
        od";

    assert_eq!(output(source), vec![1, 3, 2, 1]);
}

#[test]
fn boxed_arrays_hold_nested_arrays() {
    let source = "A = {[1, 2, 3], [4, 5, 6], [7, 8, 9], 999}
        for i := 0, i < 3, i := i + 1 do
            for j := 0, j < 3, j := j + 1 do
                write(A[i][j])
            od
        od;
        A[0] = [-1, -2, -3]
        A[1][1] = 100
        for i := 0, i < 3, i := i + 1 do
            write(A[0][i])
        od
        write(A[1][1])
        write(A[3])
        write(arrlen(A))
        write(arrlen(A[0]))";

    assert_eq!(
        output(source),
        vec![1, 2, 3, 4, 5, 6, 7, 8, 9, -1, -2, -3, 100, 999, 4, 3]
    );
}

#[test]
fn strings_round_trip_through_intrinsics() {
    let source = "s := strcat(\"ab\", \"cd\")
        write(strlen(s))
        t := strsub(s, 1, 2)
        write(strget(t, 0))
        write(strcmp(t, \"bc\"))
        u := strmake(3, 'x')
        write(strget(u, 2))";

    assert_eq!(output(source), vec![4, 98, 0, 120]);
}

#[test]
fn operand_underflow_is_a_runtime_fault() {
    let program = hand_written(vec![Instruction::Pop, Instruction::Ret0]);

    let error = run_stack_program(&program, &[]).expect_err("nothing to pop");
    assert_eq!(error.error_type, ErrorType::Runtime);
}

#[test]
fn falling_off_the_end_is_a_runtime_fault() {
    let program = hand_written(vec![
        Instruction::Push(1),
        Instruction::Call(CallTarget::Intrinsic(Intrinsic::Write)),
        Instruction::Pop,
    ]);

    let error = run_stack_program(&program, &[]).expect_err("no return instruction");
    assert!(error.msg.contains("ran past"));
}
