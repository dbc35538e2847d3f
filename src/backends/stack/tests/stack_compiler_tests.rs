#![cfg(test)]

use crate::backends::stack::instructions::{
    CallTarget, Instruction, StackProgram, StackVariable,
};
use crate::backends::stack::stack_compiler::compile_program;
use crate::compiler_frontend::compiler_errors::ErrorType;
use crate::compiler_frontend::language::ast_nodes::{
    BinaryOperator, FunctionDeclaration, FunctionKey, Program, Statement,
};
use crate::compiler_frontend::language::intrinsics::Intrinsic;
use crate::compiler_frontend::parse_source;

use Instruction::*;

fn compile(source: &str) -> StackProgram {
    let program = parse_source(source).expect("program should parse");
    compile_program(&program).expect("program should compile")
}

fn code_of(program: &StackProgram, name: &str, arity: usize) -> Vec<Instruction> {
    program
        .function(&FunctionKey::new(name, arity))
        .expect("function should be compiled")
        .instructions
        .to_owned()
}

fn user(name: &str) -> StackVariable {
    StackVariable::user(name)
}

fn intrinsic(intrinsic: Intrinsic) -> Instruction {
    Call(CallTarget::Intrinsic(intrinsic))
}

/// The fixed tail every function ends with, starting at `landing`
fn landing_code(landing: usize) -> Vec<Instruction> {
    vec![
        Ld(StackVariable::CurrentException),
        Push(-1),
        Binop(BinaryOperator::Eq),
        Jz(landing + 6),
        Ld(StackVariable::ExceptionData),
        Ret1,
        TransEx,
        Ret0,
    ]
}

#[test]
fn straight_line_code_then_landing() {
    let program = compile("x := 1 + 2");

    let mut expected = vec![
        Push(1),
        Push(2),
        Binop(BinaryOperator::Plus),
        St(user("x")),
        Ret0,
    ];
    expected.extend(landing_code(5));

    assert_eq!(code_of(&program, "main", 0), expected);
}

#[test]
fn while_jumps_back_to_the_condition() {
    let program = compile("while i < 3 do i := i + 1 od");

    let mut expected = vec![
        Ld(user("i")),
        Push(3),
        Binop(BinaryOperator::Lt),
        Jz(9),
        Ld(user("i")),
        Push(1),
        Binop(BinaryOperator::Plus),
        St(user("i")),
        Jmp(0),
        Ret0,
    ];
    expected.extend(landing_code(10));

    assert_eq!(code_of(&program, "main", 0), expected);
}

#[test]
fn if_else_branches_rejoin() {
    let program = compile("if c then x := 1 else x := 2 fi");

    let mut expected = vec![
        Ld(user("c")),
        Jz(5),
        Push(1),
        St(user("x")),
        Jmp(7),
        Push(2),
        St(user("x")),
        Ret0,
    ];
    expected.extend(landing_code(8));

    assert_eq!(code_of(&program, "main", 0), expected);
}

#[test]
fn every_return_is_an_edge_to_the_landing() {
    let program = compile(
        "fun f(a, b, c) begin
            write(a) write(b) write(c)
            return a
            return b
         end
         write(f(1, 2, 3))",
    );

    let write = intrinsic(Intrinsic::Write);
    let mut expected = vec![
        Ld(user("a")),
        write.clone(),
        Pop,
        Ld(user("b")),
        write.clone(),
        Pop,
        Ld(user("c")),
        write,
        Pop,
        // return a
        Push(-1),
        St(StackVariable::CurrentException),
        Ld(user("a")),
        St(StackVariable::ExceptionData),
        Jmp(20),
        // return b, unreachable but still an edge
        Push(-1),
        St(StackVariable::CurrentException),
        Ld(user("b")),
        St(StackVariable::ExceptionData),
        Jmp(20),
        Ret0,
    ];
    expected.extend(landing_code(20));

    assert_eq!(code_of(&program, "f", 3), expected);
}

#[test]
fn throwing_call_gets_the_post_call_check() {
    let program = compile(
        "fun f() begin throw (Oops 7) end
         write(1 + f())",
    );

    let code = code_of(&program, "main", 0);
    let landing = code.len() - 8;

    let expected_prefix = vec![
        Push(1),
        Call(CallTarget::User(FunctionKey::new("f", 0))),
        Ld(StackVariable::Thrown),
        Jz(13),
        Ld(StackVariable::Thrown),
        St(StackVariable::CurrentException),
        Ld(StackVariable::ThrownData),
        St(StackVariable::ExceptionData),
        Push(0),
        St(StackVariable::Thrown),
        // both operands of the unfinished `+` are dropped
        Pop,
        Pop,
        Jmp(landing),
        Binop(BinaryOperator::Plus),
        intrinsic(Intrinsic::Write),
        Pop,
        Ret0,
    ];

    assert_eq!(code[..expected_prefix.len()].to_vec(), expected_prefix);
    assert!(program.entry_function().expect("entry").can_throw);
}

#[test]
fn non_throwing_call_has_no_check() {
    let program = compile(
        "fun f() begin return 3 end
         write(f())",
    );

    let code = code_of(&program, "main", 0);
    assert!(!code.contains(&Ld(StackVariable::Thrown)));
    assert!(!program.entry_function().expect("entry").can_throw);
}

#[test]
fn throw_inside_try_lands_on_the_catch_chain() {
    let program = compile(
        "try
            throw (Oops 5)
         catch (Oops v)
            write(v)
         yrt",
    );

    let mut expected = vec![
        // body
        Push(2),
        St(StackVariable::CurrentException),
        Push(5),
        St(StackVariable::ExceptionData),
        Jmp(6),
        Jmp(21),
        // catch (Oops v)
        Ld(StackVariable::CurrentException),
        Push(2),
        Binop(BinaryOperator::Eq),
        Jz(20),
        Ld(StackVariable::ExceptionData),
        St(user("v")),
        Push(0),
        St(StackVariable::CurrentException),
        Push(0),
        St(StackVariable::ExceptionData),
        Ld(user("v")),
        intrinsic(Intrinsic::Write),
        Pop,
        Jmp(21),
        // no branch matched
        Jmp(22),
        Ret0,
    ];
    expected.extend(landing_code(22));

    assert_eq!(code_of(&program, "main", 0), expected);
}

#[test]
fn finally_parks_and_rethrows_the_exception() {
    let program = compile("try x := 1 finally write(2) yrt");

    let mut expected = vec![
        Push(1),
        St(user("x")),
        Jmp(3),
        // finally
        Ld(StackVariable::CurrentException),
        St(StackVariable::FinallyException(0)),
        Ld(StackVariable::ExceptionData),
        St(StackVariable::FinallyData(0)),
        Push(0),
        St(StackVariable::CurrentException),
        Push(2),
        intrinsic(Intrinsic::Write),
        Pop,
        Ld(StackVariable::FinallyException(0)),
        Jz(21),
        Ld(StackVariable::FinallyException(0)),
        St(StackVariable::CurrentException),
        Ld(StackVariable::FinallyData(0)),
        St(StackVariable::ExceptionData),
        Push(0),
        St(StackVariable::FinallyData(0)),
        Jmp(22),
        Ret0,
    ];
    expected.extend(landing_code(22));

    assert_eq!(code_of(&program, "main", 0), expected);
}

#[test]
fn try_without_handlers_is_just_its_body() {
    let program = compile("try x := 1 yrt");

    let mut expected = vec![Push(1), St(user("x")), Ret0];
    expected.extend(landing_code(3));

    assert_eq!(code_of(&program, "main", 0), expected);
}

#[test]
fn array_literal_fills_a_reserved_slot() {
    let program = compile("A := [7]");

    let code = code_of(&program, "main", 0);
    let array = StackVariable::ArrayLiteral(0);

    assert_eq!(
        code[..7].to_vec(),
        vec![
            Push(1),
            Push(0),
            intrinsic(Intrinsic::ArrMake),
            St(array.clone()),
            Ld(array.clone()),
            Push(0),
            Push(7),
        ]
    );
    assert_eq!(code[7], intrinsic(Intrinsic::ArrSet));

    // arrset can throw, so its check drops only its own result
    assert_eq!(code[8], Ld(StackVariable::Thrown));
    assert_eq!(code[16], Pop);
    assert_eq!(code[17], Jmp(code.len() - 8));
    assert_eq!(code[18], Pop);
    assert_eq!(code[19], Ld(array));
    assert_eq!(code[20], St(user("A")));
}

#[test]
fn string_literals_are_pooled_once() {
    let program = compile(
        "a := \"hi\"
         b := \"there\"
         c := \"hi\"",
    );

    assert_eq!(program.literal_pool, vec!["hi".to_owned(), "there".to_owned()]);

    let code = code_of(&program, "main", 0);
    let pooled: Vec<&Instruction> = code
        .iter()
        .filter(|instruction| matches!(instruction, PushPooled(_)))
        .collect();
    assert_eq!(pooled, vec![&PushPooled(0), &PushPooled(1), &PushPooled(0)]);
    assert_eq!(code[1], intrinsic(Intrinsic::StrDup));
}

#[test]
fn exception_ids_are_stable_across_compilations() {
    let source = "fun f(x) begin
            if x then throw (Second x) else throw (First x) fi
         end
         try f(1) catch (First a) skip catch (Third b) skip yrt";

    let first = compile(source);
    let second = compile(source);

    assert_eq!(first, second);
    assert_eq!(
        first.exception_names,
        vec!["IndexOutOfBounds", "Second", "First", "Third"]
    );
    assert_eq!(first.exception_name(3), Some("First"));
    assert_eq!(first.exception_name(-1), Some("ReturnNormally"));
    assert_eq!(first.exception_name(0), None);
}

#[test]
fn unresolved_call_is_a_compiler_error() {
    let main = FunctionDeclaration::new("main", Vec::new(), Statement::call("ghost", Vec::new()));
    let program = Program {
        entry: main.key(),
        functions: vec![main],
    };

    let error = compile_program(&program).expect_err("unresolved call should fail");
    assert_eq!(error.error_type, ErrorType::Compiler);
    assert!(error.msg.contains("ghost"));
}

#[test]
fn functions_keep_declaration_order() {
    let program = compile(
        "fun b() begin skip end
         fun a() begin skip end
         b() a()",
    );

    let names: Vec<&str> = program
        .functions
        .iter()
        .map(|function| function.key.name.as_str())
        .collect();
    assert_eq!(names, vec!["b", "a", "main"]);
}

#[test]
fn listing_and_json_describe_the_program() {
    let program = compile(
        "fun f(p) begin return p end
         write(f(\"s\"))",
    );

    let listing = program.to_string();
    assert!(listing.contains("#0 = \"s\""));
    assert!(listing.contains("fun f/1(p)"));
    assert!(listing.contains("    0: Push -1"));
    assert!(listing.contains("    2: Ld p"));
    assert!(listing.ends_with("# entry: main/0"));

    let json = serde_json::to_value(&program).expect("program should serialise");
    assert_eq!(json["entry"]["name"], "main");
    assert_eq!(json["functions"][0]["parameters"][0], "p");
}
