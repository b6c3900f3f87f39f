//! A resolving tree-walk interpreter for Lox.
//!
//! Source text goes through four stages, each its own module:
//! [`scanner`] → [`parser`] → [`resolver`] → [`interpreter`]. [`run`] chains
//! them for a whole program; the CLI also drives them one at a time.

use std::io::Write;

use log::info;

pub mod ast;
pub mod ast_printer;
pub mod callable;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod token;
pub mod value;

pub use error::{ErrorSink, LoxError, Result, RuntimeError, StderrSink};
pub use interpreter::Interpreter;
pub use parser::Parser;
pub use resolver::{Address, Resolutions, Resolver};
pub use scanner::Scanner;

/// How a program run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// Lexing, parsing or resolution failed; nothing was executed.
    StaticError,
    RuntimeError,
}

impl Outcome {
    /// Process exit status for this outcome (sysexits `EX_DATAERR` and
    /// `EX_SOFTWARE` for the two failure kinds).
    pub fn exit_code(self) -> i32 {
        match self {
            Outcome::Success => 0,
            Outcome::StaticError => 65,
            Outcome::RuntimeError => 70,
        }
    }
}

/// Scan, parse, resolve and execute `source`, printing to `out`.
///
/// Every static diagnostic is handed to `sink` before anything runs; a
/// single static error keeps the program from executing.
pub fn run<W: Write>(source: &str, out: W, sink: &mut dyn ErrorSink) -> Outcome {
    let (tokens, lex_errors) = Scanner::new(source).scan_all();
    let had_lex_error = !lex_errors.is_empty();
    for error in lex_errors {
        sink.report(error);
    }

    let statements = match Parser::new(&tokens).parse() {
        Ok(statements) => statements,
        Err(errors) => {
            errors.into_iter().for_each(|e| sink.report(e));
            return Outcome::StaticError;
        }
    };

    if had_lex_error {
        return Outcome::StaticError;
    }

    let resolutions = match Resolver::new().resolve(&statements) {
        Ok(resolutions) => resolutions,
        Err(errors) => {
            errors.into_iter().for_each(|e| sink.report(e));
            return Outcome::StaticError;
        }
    };

    let mut interpreter = Interpreter::with_output(out);
    interpreter.add_resolutions(resolutions);

    if interpreter.interpret(&statements, sink) {
        info!("Program finished");
        Outcome::Success
    } else {
        Outcome::RuntimeError
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_capture(source: &str) -> (Outcome, String, Vec<LoxError>) {
        let mut out = Vec::new();
        let mut errors = Vec::new();
        let outcome = run(source, &mut out, &mut errors);
        (outcome, String::from_utf8(out).unwrap(), errors)
    }

    #[test]
    fn prints_and_succeeds() {
        let (outcome, out, errors) = run_capture("print 1 + 2;");
        assert_eq!(outcome, Outcome::Success);
        assert_eq!(out, "3\n");
        assert!(errors.is_empty());
    }

    #[test]
    fn static_error_blocks_execution() {
        let (outcome, out, errors) = run_capture("print 1; { var a = 1; var a = 2; print a; }");
        assert_eq!(outcome, Outcome::StaticError);
        assert_eq!(outcome.exit_code(), 65);
        assert!(out.is_empty());
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn unused_underscore_local_blocks_execution() {
        let (outcome, out, errors) = run_capture("{ var _tmp = 1; } print \"ran\";");
        assert_eq!(outcome, Outcome::StaticError);
        assert!(out.is_empty());
        assert_eq!(
            errors[0].to_string(),
            "[line 1] Error: Local variable '_tmp' is never used."
        );
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn runtime_error_keeps_earlier_output() {
        let (outcome, out, errors) = run_capture("print \"before\";\nprint -\"x\";");
        assert_eq!(outcome, Outcome::RuntimeError);
        assert_eq!(outcome.exit_code(), 70);
        assert_eq!(out, "before\n");
        assert!(errors[0].is_runtime());
        assert_eq!(
            errors[0].to_string(),
            "Operand must be a number.\n[line 2] at '-'"
        );
    }
}
