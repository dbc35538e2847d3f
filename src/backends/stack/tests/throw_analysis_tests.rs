#![cfg(test)]

use crate::backends::stack::throw_analysis::throwing_functions;
use crate::compiler_frontend::language::ast_nodes::FunctionKey;
use crate::compiler_frontend::parse_source;

fn key(name: &str, arity: usize) -> FunctionKey {
    FunctionKey::new(name, arity)
}

#[test]
fn throwing_propagates_through_callers() {
    let program = parse_source(
        "fun leaf() begin throw (Oops 1) end
         fun middle() begin leaf() end
         fun top() begin write(middle()) end
         fun quiet() begin return 5 end
         top()
         write(quiet())",
    )
    .expect("program should parse");

    let throwing = throwing_functions(&program);
    assert!(throwing.contains(&key("leaf", 0)));
    assert!(throwing.contains(&key("middle", 0)));
    assert!(throwing.contains(&key("top", 0)));
    assert!(throwing.contains(&key("main", 0)));
    assert!(!throwing.contains(&key("quiet", 0)));
}

#[test]
fn mutual_recursion_settles() {
    let program = parse_source(
        "fun even(n) begin if n == 0 then return 1 fi return odd(n - 1) end
         fun odd(n) begin if n == 0 then return 0 fi return even(n - 1) end
         fun risky(n) begin if n == 0 then throw (Done n) fi return risky(n - 1) end
         write(even(4))",
    )
    .expect("program should parse");

    let throwing = throwing_functions(&program);
    assert!(!throwing.contains(&key("even", 1)));
    assert!(!throwing.contains(&key("odd", 1)));
    assert!(throwing.contains(&key("risky", 1)));
    assert!(!throwing.contains(&key("main", 0)));
}

#[test]
fn array_access_and_literals_can_throw() {
    let program = parse_source(
        "fun first(a) begin return a[0] end
         fun build() begin return [1, 2] end
         fun length(a) begin return arrlen(a) end
         skip",
    )
    .expect("program should parse");

    let throwing = throwing_functions(&program);
    assert!(throwing.contains(&key("first", 1)));
    assert!(throwing.contains(&key("build", 0)));
    assert!(!throwing.contains(&key("length", 1)));
}
