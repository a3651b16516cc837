mod common;

use lox_walk::ast::{Expr, ExprId, Stmt};
use lox_walk::error::LoxError;
use lox_walk::interpreter::Interpreter;
use lox_walk::parser::Parser;
use lox_walk::resolver::Resolver;
use lox_walk::scanner::scan_tokens;
use pretty_assertions::assert_eq;

fn parse_program(source: &str) -> Vec<Stmt> {
    let (tokens, errors) = scan_tokens(source);
    assert!(errors.is_empty());

    Parser::new(&tokens).parse().expect("program should parse")
}

fn resolve(source: &str) -> (Vec<Stmt>, Interpreter, Result<(), Vec<LoxError>>) {
    let program = parse_program(source);
    let mut interpreter = Interpreter::with_output(Box::new(std::io::sink()));

    let result = Resolver::new(&mut interpreter).resolve(&program);
    (program, interpreter, result)
}

/// Every `Variable` reference to `name`, in source order.
fn references(program: &[Stmt], name: &str) -> Vec<ExprId> {
    fn in_expr(expr: &Expr, name: &str, out: &mut Vec<ExprId>) {
        match expr {
            Expr::Variable { id, name: token } if token.lexeme == name => out.push(*id),
            Expr::Assign { value, .. } => in_expr(value, name, out),
            Expr::Grouping(inner) | Expr::Unary { right: inner, .. } => in_expr(inner, name, out),
            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                in_expr(left, name, out);
                in_expr(right, name, out);
            }
            Expr::Call {
                callee, arguments, ..
            } => {
                in_expr(callee, name, out);
                arguments.iter().for_each(|a| in_expr(a, name, out));
            }
            _ => {}
        }
    }

    fn in_stmt(stmt: &Stmt, name: &str, out: &mut Vec<ExprId>) {
        match stmt {
            Stmt::Expression(e) | Stmt::Print(e) => in_expr(e, name, out),
            Stmt::Var {
                initializer: Some(e),
                ..
            } => in_expr(e, name, out),
            Stmt::Block(body) => body.iter().for_each(|s| in_stmt(s, name, out)),
            Stmt::Function(decl) => decl.body.iter().for_each(|s| in_stmt(s, name, out)),
            Stmt::Return { value: Some(e), .. } => in_expr(e, name, out),
            _ => {}
        }
    }

    let mut out = Vec::new();
    program.iter().for_each(|s| in_stmt(s, name, &mut out));
    out
}

fn messages(errors: &[LoxError]) -> Vec<String> {
    errors.iter().map(|e| e.to_string()).collect()
}

#[test]
fn depth_counts_enclosing_blocks() {
    let (program, interpreter, result) = resolve("{ var a = 1; { { print a; } } }");
    assert!(result.is_ok());

    let ids = references(&program, "a");
    assert_eq!(ids.len(), 1);
    assert_eq!(interpreter.local_depth(ids[0]), Some(2));
}

#[test]
fn globals_get_no_entry() {
    let (program, interpreter, result) = resolve("var g = 1; { print g; }");
    assert!(result.is_ok());

    let ids = references(&program, "g");
    assert_eq!(interpreter.local_depth(ids[0]), None);
}

#[test]
fn parameters_and_body_share_one_scope() {
    let (program, interpreter, result) = resolve("fun f(x) { var y = x; return y; }");
    assert!(result.is_ok());

    let x = references(&program, "x");
    let y = references(&program, "y");
    assert_eq!(interpreter.local_depth(x[0]), Some(0));
    assert_eq!(interpreter.local_depth(y[0]), Some(0));
}

#[test]
fn closures_resolve_to_the_declaring_scope() {
    let source = "fun outer() { var n = 0; fun inner() { return n; } return inner; }";
    let (program, interpreter, result) = resolve(source);
    assert!(result.is_ok());

    let n = references(&program, "n");
    assert_eq!(interpreter.local_depth(n[0]), Some(1));
}

#[test]
fn identical_references_resolve_independently() {
    let (program, interpreter, result) = resolve("{ var a = 1; print a; { print a; } }");
    assert!(result.is_ok());

    let ids = references(&program, "a");
    assert_eq!(ids.len(), 2);
    assert_eq!(interpreter.local_depth(ids[0]), Some(0));
    assert_eq!(interpreter.local_depth(ids[1]), Some(1));
}

#[test]
fn redeclaring_in_a_block_is_an_error_and_resolution_continues() {
    let (program, interpreter, result) =
        resolve("{ var a = 1; var a = 2; }\n{ var b = 3; print b; }");

    assert_eq!(
        messages(&result.unwrap_err()),
        vec!["[line 1] Error at 'a': Already a variable with this name in this scope."]
    );

    let b = references(&program, "b");
    assert_eq!(interpreter.local_depth(b[0]), Some(0));
}

#[test]
fn redeclaring_a_global_is_allowed() {
    let (_, _, result) = resolve("var a = 1; var a = 2;");
    assert!(result.is_ok());
}

#[test]
fn reading_a_local_in_its_own_initializer() {
    let (_, _, result) = resolve("{ var a = a; }");

    assert_eq!(
        messages(&result.unwrap_err()),
        vec!["[line 1] Error at 'a': Can't read local variable in its own initializer."]
    );

    // at top level the name just refers to the global
    let (_, _, result) = resolve("var a = a;");
    assert!(result.is_ok());
}

#[test]
fn return_outside_a_function() {
    let (_, _, result) = resolve("print 1;\nreturn 2;");

    assert_eq!(
        messages(&result.unwrap_err()),
        vec!["[line 2] Error at 'return': Can't return from top-level code."]
    );
}

#[test]
fn this_outside_a_class() {
    let (_, _, result) = resolve("print this;\nfun f() { return this; }");

    assert_eq!(
        messages(&result.unwrap_err()),
        vec![
            "[line 1] Error at 'this': Can't use 'this' outside of a class.",
            "[line 2] Error at 'this': Can't use 'this' outside of a class.",
        ]
    );
}

#[test]
fn this_inside_methods_and_nested_functions_is_fine() {
    let source = "class A { m() { fun g() { return this; } return g; } }";
    let (_, _, result) = resolve(source);

    assert!(result.is_ok());
}

#[test]
fn static_errors_stop_the_run_before_execution() {
    let outcome = common::run("print \"before\";\n{ var x = 1; var x = 2; }");

    assert_eq!(outcome.stdout, "");
    assert_eq!(
        outcome.stderr,
        "[line 2] Error at 'x': Already a variable with this name in this scope.\n"
    );
    assert_eq!(outcome.exit_code, 65);
}
