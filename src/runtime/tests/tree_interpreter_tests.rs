#![cfg(test)]

use crate::compiler_frontend::compiler_errors::ErrorType;
use crate::compiler_frontend::parse_source;
use crate::runtime::intrinsic_semantics::RunOutcome;
use crate::runtime::tree_interpreter::run_program;

fn run(source: &str, input: &[i32]) -> RunOutcome {
    let program = parse_source(source).expect("program should parse and resolve");
    run_program(&program, input).expect("program should run")
}

fn output(source: &str) -> Vec<i32> {
    let outcome = run(source, &[]);
    assert_eq!(outcome.uncaught, None, "unexpected uncaught exception");
    outcome.output
}

#[test]
fn reads_input_in_order() {
    let outcome = run("x := read() y := read() write(y - x)", &[3, 10]);
    assert_eq!(outcome.output, vec![7]);
}

#[test]
fn read_past_the_end_is_a_runtime_fault() {
    let program = parse_source("write(read())").expect("program should parse");
    let error = run_program(&program, &[]).expect_err("empty input should fault");
    assert_eq!(error.error_type, ErrorType::Runtime);
}

#[test]
fn division_by_zero_is_a_runtime_fault() {
    let program = parse_source("x := 0 write(1 / x)").expect("program should parse");
    let error = run_program(&program, &[]).expect_err("division by zero should fault");
    assert_eq!(error.error_type, ErrorType::Runtime);
}

#[test]
fn unassigned_variables_read_as_zero() {
    assert_eq!(output("write(never_set + 1)"), vec![1]);
}

#[test]
fn function_without_return_yields_zero() {
    assert_eq!(
        output(
            "fun noisy() begin write(5) end
             write(noisy() + 1)"
        ),
        vec![5, 1]
    );
}

#[test]
fn recursion_and_arity_overloads() {
    let source = "fun fact(n) begin
            if n <= 1 then return 1 fi
            return n * fact(n - 1)
        end
        fun fact(n, acc) begin
            if n <= 1 then return acc fi
            return fact(n - 1, acc * n)
        end
        write(fact(5))
        write(fact(5, 1))";

    assert_eq!(output(source), vec![120, 120]);
}

#[test]
fn simple_throw_catch_runs_finally() {
    let source = "fun alwaysThrows()
        begin
            throw (MyException 123)
        end

        try
            alwaysThrows()
        catch (MyException data)
            write(data)
        finally
            write(321)
        yrt";

    assert_eq!(output(source), vec![123, 321]);
}

#[test]
fn deep_catch_rethrows_until_main() {
    let source = "fun throwsWhen0(x)
        begin
            write(x);
            if x == 0
            then
                throw (MyException 123)
            else
                try
                    throwsWhen0(x - 1)
                catch (MyException data)
                    write(data)
                    throw (MyException data - 1)
                yrt
            fi
        end

        throwsWhen0(5)";

    let outcome = run(source, &[]);
    assert_eq!(outcome.output, vec![5, 4, 3, 2, 1, 0, 123, 122, 121, 120, 119]);

    let uncaught = outcome.uncaught.expect("the last rethrow escapes main");
    assert_eq!(uncaught.name, "MyException");
    assert_eq!(uncaught.id, 2);
    assert_eq!(uncaught.payload, 118);
}

#[test]
fn catches_are_selected_by_type() {
    let source = "fun throwsCase(x)
        begin
            if x == 1 then
                throw (ExceptionOne 1)
            elif x == 2 then
                throw (ExceptionTwo 2)
            elif x == 3 then
                throw (ExceptionThree 3)
            else
                return 4
            fi
        end

        for i := 1, i <= 4, i := i + 1 do
            try
                throwsCase(i)
            catch (ExceptionOne one)
                write(one)
            catch (ExceptionTwo two)
                write(two)
            catch (ExceptionThree three)
                write(three)
            finally
                write(0)
            yrt
        od
        write(123)";

    assert_eq!(output(source), vec![1, 0, 2, 0, 3, 0, 0, 123]);
}

#[test]
fn finally_throw_replaces_the_pending_exception() {
    let source = "fun throwsOne() begin
            throw (ExceptionOne 1)
        end

        fun throwsSomething() begin
            try
                throwsOne()
            catch (ExceptionOne one)
                write(one)
                throw (ExceptionTwo one + one)
            finally
                throw (ExceptionThree 3)
            yrt
        end

        try
            throwsSomething()
        catch (ExceptionThree three)
            write(three)
        yrt";

    assert_eq!(output(source), vec![1, 3]);
}

#[test]
fn return_from_finally_swallows_the_exception() {
    let source = "fun throwsOne() begin
            throw (ExceptionOne 1)
            write(-1)
        end

        fun throwsSomething() begin
            try
                throwsOne()
                write(-1)
            finally
                return 2
            yrt
            write(-1)
        end

        try
            write(throwsSomething())
            write(3)
        catch (ExceptionOne one)
            write(one)
        yrt";

    assert_eq!(output(source), vec![2, 3]);
}

#[test]
fn finally_without_catch_rethrows() {
    let source = "fun throwsOne() begin
            throw (ExceptionOne 1)
        end

        fun throwsSomething() begin
            try
                throwsOne()
            finally
                write(2)
            yrt
        end

        try
            throwsSomething()
        catch (ExceptionOne one)
            write(one)
        yrt";

    assert_eq!(output(source), vec![2, 1]);
}

#[test]
fn exception_in_binop_operand_abandons_the_expression() {
    let source = "fun throwsOne() begin
            throw (ExceptionOne 1)
        end

        fun writesTwo() begin
            write(2)
        end

        try
            write(writesTwo() + throwsOne() + writesTwo())
        catch (ExceptionOne one)
            write(one)
        yrt
        write(123)";

    assert_eq!(output(source), vec![2, 1, 123]);
}

#[test]
fn out_of_bounds_access_raises_index_out_of_bounds() {
    let source = "A := [1, 2, 3]
        try
            write(A[7])
        catch (IndexOutOfBounds index)
            write(index)
        yrt";

    assert_eq!(output(source), vec![7]);
}

#[test]
fn uncaught_out_of_bounds_reports_id_one() {
    let outcome = run("s := \"abc\" write(strget(s, -1))", &[]);

    let uncaught = outcome.uncaught.expect("strget should throw");
    assert_eq!(uncaught.id, 1);
    assert_eq!(uncaught.name, "IndexOutOfBounds");
    assert_eq!(uncaught.payload, -1);
}

#[test]
fn string_literals_are_copied_on_each_evaluation() {
    let source = "i := 0
        while i < 2 do
            s := \"abc\"
            write(strget(s, 0))
            strset(s, 0, 'z')
            i := i + 1
        od
        write(strlen(strcat(s, \"de\")))";

    assert_eq!(output(source), vec![97, 97, 5]);
}

#[test]
fn array_literal_elements_evaluate_in_order() {
    let source = "fun writes(i) begin
            write(i)
            return i
        end

        arr = [writes(101), writes(102), writes(103), writes(104)]
        arr[0] := 1
        arr[1] := 2
        arr[2] := 3
        write(arr[1])
        write(arr[2])
        write(arr[3])
        write(arrlen(arr))";

    assert_eq!(output(source), vec![101, 102, 103, 104, 2, 3, 104, 4]);
}

#[test]
fn boxed_arrays_share_references() {
    let source = "A = [0, 1, 2, 3]
        B = {A, A, A}
        C = Arrmake(3, A)
        A[0] = -999
        A[3] = 999
        for i := 0, i < 3, i := i + 1 do
            write(B[i][0])
            write(C[i][0])
        od
        for i := 0, i < 3, i := i + 1 do
            write(B[i][3])
            write(C[i][3])
        od";

    assert_eq!(
        output(source),
        vec![-999, -999, -999, -999, -999, -999, 999, 999, 999, 999, 999, 999]
    );
}

#[test]
fn arrays_cross_function_boundaries() {
    let source = "fun createRange(a, b) begin
            len = b - a + 1
            A = arrmake(len, 0)
            for i := 0, i < len, i := i + 1 do
                A[i] := i + a
            od
            return A
        end

        fun wrapTwoArrs(A, B) begin
            Result = {A, B}
            return Result
        end

        X = createRange(3, 3)
        Y = createRange(5, 10)
        Arrs = wrapTwoArrs(X, Y)
        for i := 0, i < arrlen(Arrs), i := i + 1 do
            for j := 0, j < arrlen(Arrs[i]), j := j + 1 do
                write(Arrs[i][j])
            od
        od";

    assert_eq!(output(source), vec![3, 5, 6, 7, 8, 9, 10]);
}

#[test]
fn indexing_a_scalar_is_a_runtime_fault() {
    let program = parse_source("x := 5 write(x[0])").expect("program should parse");
    let error = run_program(&program, &[]).expect_err("a scalar is not an array");
    assert_eq!(error.error_type, ErrorType::Runtime);
}
