#![cfg(test)]

use crate::compiler_frontend::compiler_errors::ErrorType;
use crate::compiler_frontend::language::ast_nodes::{
    Callee, Expression, FunctionCall, FunctionDeclaration, FunctionKey, Program, Statement,
};
use crate::compiler_frontend::language::intrinsics::Intrinsic;
use crate::compiler_frontend::parse_source;
use crate::compiler_frontend::resolution::resolve_calls;

fn program_with_entry(functions: Vec<FunctionDeclaration>, entry_body: Statement) -> Program {
    let mut functions = functions;
    functions.push(FunctionDeclaration::new("main", Vec::new(), entry_body));

    Program {
        functions,
        entry: FunctionKey::new("main", 0),
    }
}

fn first_call(statement: &Statement) -> &FunctionCall {
    match statement {
        Statement::FunctionCallStatement(call) => call,
        Statement::Chain(first, _) => first_call(first),
        other => panic!("expected a call statement, found {other}"),
    }
}

#[test]
fn binds_user_functions_and_intrinsics() {
    let program = parse_source(
        "fun twice(x) begin return x * 2 end
         write(twice(read()))",
    )
    .expect("program should resolve");

    let entry = program.entry_function().expect("entry should exist");
    let write = first_call(&entry.body);
    assert_eq!(write.callee, Callee::Intrinsic(Intrinsic::Write));

    let Expression::FunctionCall(twice) = &write.arguments[0] else {
        panic!("expected a nested call");
    };
    assert_eq!(twice.callee, Callee::User(FunctionKey::new("twice", 1)));

    let Expression::FunctionCall(read) = &twice.arguments[0] else {
        panic!("expected a nested call");
    };
    assert_eq!(read.callee, Callee::Intrinsic(Intrinsic::Read));
}

#[test]
fn overloads_are_told_apart_by_arity() {
    let program = parse_source(
        "fun f(a) begin return 1 end
         fun f(a, b) begin return 2 end
         f(1, 2)",
    )
    .expect("program should resolve");

    let entry = program.entry_function().expect("entry should exist");
    assert_eq!(
        first_call(&entry.body).callee,
        Callee::User(FunctionKey::new("f", 2))
    );
}

#[test]
fn wrong_arity_is_unresolved() {
    let error = parse_source("write(1, 2)").expect_err("arity mismatch should fail");
    assert_eq!(error.error_type, ErrorType::Resolution);
    assert_eq!(error.msg, "Unresolved function write, 2 arguments.");
}

#[test]
fn unknown_function_is_unresolved_at_the_call_site() {
    let error = parse_source("x := 1\nnope(x)").expect_err("unknown call should fail");
    assert_eq!(error.msg, "Unresolved function nope, 1 arguments.");
    assert_eq!(error.location.start_pos.line_number, 1);
}

#[test]
fn duplicate_declarations_are_ambiguous() {
    let error = parse_source(
        "fun f(a) begin return 1 end
         fun f(b) begin return 2 end
         f(1)",
    )
    .expect_err("duplicate should fail");
    assert_eq!(error.msg, "Ambiguous function f, 1 arguments.");
}

#[test]
fn shadowing_an_intrinsic_is_ambiguous() {
    let error = parse_source("fun write(x) begin return x end write(1)")
        .expect_err("colliding with an intrinsic should fail");
    assert_eq!(error.msg, "Ambiguous function write, 1 arguments.");
}

#[test]
fn prebound_user_callee_must_be_declared() {
    let mut call = FunctionCall::unresolved("ghost", Vec::new());
    call.callee = Callee::User(FunctionKey::new("ghost", 0));

    let program = program_with_entry(Vec::new(), Statement::FunctionCallStatement(call));
    let error = resolve_calls(program).expect_err("undeclared key should fail");
    assert_eq!(error.msg, "Unresolved function ghost, 0 arguments.");
}

#[test]
fn missing_entry_is_rejected() {
    let program = Program {
        functions: vec![FunctionDeclaration::new("f", Vec::new(), Statement::Skip)],
        entry: FunctionKey::new("main", 0),
    };

    let error = resolve_calls(program).expect_err("missing entry should fail");
    assert_eq!(error.error_type, ErrorType::Resolution);
}

#[test]
fn calls_inside_every_construct_are_resolved() {
    let program = parse_source(
        "fun g() begin return 1 end
         A := {[g()], g()}
         try
            if g() then throw (E g()) fi
         catch (E e)
            while g() == 0 do write(g()) od
         finally
            A[g()] := g()
         yrt",
    )
    .expect("program should resolve");

    let text = program.to_string();
    assert!(!text.contains('?'), "unresolved call left in:\n{text}");
}
