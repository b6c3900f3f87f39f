//! Centralised error hierarchy for the interpreter.
//!
//! Every stage (scanner, parser, resolver, runtime) converts its failure
//! modes into a [`LoxError`]. Runtime failures get their own richer enum,
//! [`RuntimeError`], because the evaluator needs to distinguish them and
//! each carries the line of the offending token.
//!
//! Only [`StderrSink`] prints; every other path hands errors to
//! an [`ErrorSink`].

use std::io;
use thiserror::Error;

use log::info;

use crate::token::Token;

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoxError {
    /// Lexical (scanner) error with source line information.
    #[error("[line {line}] Error: {message}")]
    Lex {
        /// Human‑readable description.
        message: String,

        /// 1‑based line where the error occurred.
        line: usize,
    },

    /// Syntactic (parser) error.
    #[error("[line {line}] Error: {message}")]
    Parse { message: String, line: usize },

    /// Static‑analysis failure reported by the resolver.
    #[error("[line {line}] Error: {message}")]
    Resolve { message: String, line: usize },

    /// Runtime evaluation error.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl LoxError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        LoxError::Lex { message, line }
    }

    /// Helper constructor for the **parser**.
    pub fn parse<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Parse error: line={}, msg={}", line, message);

        LoxError::Parse { message, line }
    }

    /// Helper constructor for the **resolver**.
    pub fn resolve<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Resolve error: line={}, msg={}", line, message);

        LoxError::Resolve { message, line }
    }

    /// Static errors stop a program before it runs; runtime errors stop it
    /// midway. The CLI maps them to different exit codes.
    pub fn is_runtime(&self) -> bool {
        matches!(self, LoxError::Runtime(_))
    }
}

/// Failures raised while evaluating a resolved program.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RuntimeError {
    /// Operand of the wrong type, or division by zero. `lexeme` is the
    /// operator or property name at fault.
    #[error("{message}\n[line {line}] at '{lexeme}'")]
    Type {
        message: String,
        lexeme: String,
        line: usize,
    },

    #[error("Undefined variable '{name}'.\n[line {line}]")]
    UndefinedVariable { name: String, line: usize },

    #[error("Undefined property '{name}'.\n[line {line}]")]
    UndefinedProperty { name: String, line: usize },

    /// `lexeme` is the closing paren of the call.
    #[error("Expected {expected} arguments but got {got}.\n[line {line}] at '{lexeme}'")]
    ArityMismatch {
        expected: usize,
        got: usize,
        lexeme: String,
        line: usize,
    },

    #[error("Can only call functions and classes.\n[line {line}] at '{lexeme}'")]
    NotCallable { lexeme: String, line: usize },

    /// `Class.name` where the class has no method of that name at all.
    #[error("Can't find static class method '{name}' on class {class}.\n[line {line}]")]
    NoSuchStaticMethod {
        name: String,
        class: String,
        line: usize,
    },

    /// `Class.name` where `name` is an instance method.
    #[error("Can't call non static class method '{name}' on class {class}.\n[line {line}]")]
    NonStaticMethod {
        name: String,
        class: String,
        line: usize,
    },

    /// A native function reported a failure.
    #[error("{message}\n[line {line}]")]
    Native { message: String, line: usize },

    /// Writing `print` output failed.
    #[error("Output error: {0}")]
    Io(String),
}

impl RuntimeError {
    pub fn type_error<S: Into<String>>(token: &Token<'_>, msg: S) -> Self {
        RuntimeError::Type {
            message: msg.into(),
            lexeme: token.lexeme.to_string(),
            line: token.line,
        }
    }
}

impl From<io::Error> for RuntimeError {
    fn from(e: io::Error) -> Self {
        RuntimeError::Io(e.to_string())
    }
}

/// Receives diagnostics from every stage. The core never exits the process;
/// whoever owns the sink decides what a failure means.
pub trait ErrorSink {
    fn report(&mut self, error: LoxError);
}

impl ErrorSink for Vec<LoxError> {
    fn report(&mut self, error: LoxError) {
        self.push(error);
    }
}

/// Sink that prints to stderr and remembers whether a static error (one
/// that must keep a program from running) went through it.
#[derive(Debug, Default)]
pub struct StderrSink {
    pub had_error: bool,
}

impl ErrorSink for StderrSink {
    fn report(&mut self, error: LoxError) {
        if !error.is_runtime() {
            self.had_error = true;
        }

        eprintln!("{}", error);
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, LoxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stderr_sink_flags_only_static_errors() {
        let mut sink = StderrSink::default();

        sink.report(LoxError::Runtime(RuntimeError::NotCallable {
            lexeme: ")".into(),
            line: 1,
        }));
        assert!(!sink.had_error);

        sink.report(LoxError::resolve(2, "Can't return from top-level code."));
        assert!(sink.had_error);
    }
}
