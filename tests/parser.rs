use std::collections::HashSet;

use loxwalk::ast::{Expr, ExprId, LiteralValue, Stmt};
use loxwalk::error::LoxError;
use loxwalk::scanner::Scanner;
use loxwalk::token::Token;
use loxwalk::Parser;

fn tokens(source: &str) -> Vec<Token<'_>> {
    let (tokens, errors) = Scanner::new(source).scan_all();
    assert!(errors.is_empty(), "lex errors: {:?}", errors);
    tokens
}

fn parse_errors(source: &str) -> Vec<String> {
    let tokens = tokens(source);
    Parser::new(&tokens)
        .parse()
        .expect_err("program should not parse")
        .into_iter()
        .map(|e: LoxError| e.to_string())
        .collect()
}

fn collect_ids(expr: &Expr<'_>, ids: &mut Vec<ExprId>) {
    match expr {
        Expr::Literal(_) => {}
        Expr::Unary { right, .. } => collect_ids(right, ids),
        Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
            collect_ids(left, ids);
            collect_ids(right, ids);
        }
        Expr::Grouping(inner) => collect_ids(inner, ids),
        Expr::Variable { id, .. } | Expr::This { id, .. } => ids.push(*id),
        Expr::Assign { id, value, .. } => {
            ids.push(*id);
            collect_ids(value, ids);
        }
        Expr::Call {
            callee, arguments, ..
        } => {
            collect_ids(callee, ids);
            arguments.iter().for_each(|a| collect_ids(a, ids));
        }
        Expr::Get { object, .. } => collect_ids(object, ids),
        Expr::Set { object, value, .. } => {
            collect_ids(object, ids);
            collect_ids(value, ids);
        }
    }
}

#[test]
fn parses_variable_declaration_with_initializer() {
    let tokens = tokens("var answer = 42;");
    let program = Parser::new(&tokens).parse().unwrap();

    match program.as_slice() {
        [Stmt::Var {
            name,
            initializer: Some(Expr::Literal(LiteralValue::Number(n))),
        }] => {
            assert_eq!(name.lexeme, "answer");
            assert_eq!(*n, 42.0);
        }
        other => panic!("unexpected program: {:?}", other),
    }
}

#[test]
fn class_body_splits_static_and_instance_methods() {
    let tokens = tokens(
        "class Math {
            init() {}
            static square(n) { return n * n; }
            static() { return 0; }
        }",
    );
    let program = Parser::new(&tokens).parse().unwrap();

    let Stmt::Class { name, methods } = &program[0] else {
        panic!("expected a class, got {:?}", program[0]);
    };
    assert_eq!(name.lexeme, "Math");

    let summary: Vec<(&str, bool, usize)> = methods
        .iter()
        .map(|m| (m.name.lexeme, m.is_static, m.params.len()))
        .collect();
    assert_eq!(
        summary,
        vec![("init", false, 0), ("square", true, 1), ("static", false, 0)]
    );
}

#[test]
fn for_loop_keeps_its_clauses() {
    let tokens = tokens("for (var i = 0; i < 3; i = i + 1) print i;");
    let program = Parser::new(&tokens).parse().unwrap();

    match &program[0] {
        Stmt::For {
            initializer: Some(init),
            condition: Some(_),
            increment: Some(Expr::Assign { .. }),
            body,
        } => {
            assert!(matches!(**init, Stmt::Var { .. }));
            assert!(matches!(**body, Stmt::Print(_)));
        }
        other => panic!("unexpected statement: {:?}", other),
    }
}

#[test]
fn property_assignment_becomes_set() {
    let tokens = tokens("a.b.c = 1;");
    let program = Parser::new(&tokens).parse().unwrap();

    match &program[0] {
        Stmt::Expression(Expr::Set { object, name, .. }) => {
            assert_eq!(name.lexeme, "c");
            assert!(matches!(**object, Expr::Get { .. }));
        }
        other => panic!("unexpected statement: {:?}", other),
    }
}

#[test]
fn expression_ids_are_unique() {
    let tokens = tokens("a = b + a; print a(b, this.c);");
    let program = Parser::new(&tokens).parse().unwrap();

    let mut ids = Vec::new();
    for stmt in &program {
        match stmt {
            Stmt::Expression(expr) | Stmt::Print(expr) => collect_ids(expr, &mut ids),
            other => panic!("unexpected statement: {:?}", other),
        }
    }

    assert_eq!(ids.len(), 6);
    assert_eq!(ids.iter().collect::<HashSet<_>>().len(), ids.len());
}

#[test]
fn invalid_assignment_target_is_reported() {
    assert_eq!(
        parse_errors("1 + 2 = 3;"),
        vec!["[line 1] Error: Invalid assignment target"]
    );
}

#[test]
fn recovers_and_reports_every_statement_error() {
    let errors = parse_errors("var = 1;\nprint 2;\nprint (3;\nvar ok = 4;");
    assert_eq!(errors.len(), 2);
    assert!(errors[0].starts_with("[line 1] Error: Expected variable name"));
    assert!(errors[1].starts_with("[line 3] Error: Expected ')' after expression"));
}

#[test]
fn too_many_arguments_is_reported() {
    let args = vec!["1"; 256].join(", ");
    let errors = parse_errors(&format!("f({});", args));
    assert_eq!(errors, vec!["[line 1] Error: Cannot have more than 255 arguments"]);
}

#[test]
fn single_expression_must_span_the_input() {
    let tokens = tokens("1 + 2 3");
    let err = Parser::new(&tokens).parse_expression().unwrap_err();
    assert_eq!(err.to_string(), "[line 1] Error: Unexpected '3' after expression");
}

#[test]
fn program_serializes_to_json() {
    let tokens = tokens("var x = \"hi\";");
    let program = Parser::new(&tokens).parse().unwrap();

    let json = serde_json::to_value(&program).unwrap();
    assert_eq!(json[0]["Var"]["name"]["lexeme"], "x");
    assert_eq!(json[0]["Var"]["initializer"]["Literal"]["Str"], "hi");
}

#[test]
fn empty_token_slice_is_an_empty_program() {
    let program = Parser::new(&[]).parse().unwrap();
    assert!(program.is_empty());

    let err = Parser::new(&[]).parse_expression().unwrap_err();
    assert_eq!(err.to_string(), "[line 0] Error: Expected expression at ''");
}

#[test]
fn slice_without_eof_still_terminates() {
    let (mut tokens, _) = Scanner::new("print 1;").scan_all();
    tokens.pop();

    let program = Parser::new(&tokens).parse().unwrap();
    assert_eq!(program.len(), 1);
}
