//! Static resolver pass.
//!
//! This resolver does three things in one AST walk:
//! 1. Build lexical scopes (a stack of name → [`VarInfo`] maps) that mirror,
//!    slot for slot, the frames the interpreter will create at runtime.
//! 2. Report static errors: redeclaration, reading a local in its own
//!    initializer, `return` at top level, `this` outside a class, and locals
//!    that are never read.
//! 3. Record, for each variable occurrence, its lexical [`Address`] keyed by
//!    the node's [`ExprId`]. Occurrences found in no scope are globals and
//!    are left out of the table; the interpreter looks those up by name.
//!
//! Diagnostics do not stop the walk, so one pass reports every problem.

use std::collections::HashMap;

use log::{debug, info};

use crate::ast::{Expr, ExprId, FunctionDecl, Stmt};
use crate::callable::{INITIALIZER, THIS};
use crate::error::LoxError;
use crate::token::Token;

/// Location of a local: walk `distance` enclosing frames, then read `slot`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
    pub distance: usize,
    pub slot: usize,
}

/// Lexical addresses of every resolved local reference.
pub type Resolutions = HashMap<ExprId, Address>;

/// Kind of function body being resolved; used to validate `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Method,
    Initializer,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
}

#[derive(Debug, Clone)]
struct VarInfo {
    defined: bool,
    accessed: bool,
    line: usize,
    slot: usize,
}

pub struct Resolver<'a> {
    scopes: Vec<HashMap<&'a str, VarInfo>>,
    locals: Resolutions,
    current_function: FunctionType,
    current_class: ClassType,
    errors: Vec<LoxError>,
}

impl<'a> Default for Resolver<'a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Resolver<'a> {
    pub fn new() -> Self {
        info!("Resolver instantiated");

        Resolver {
            scopes: Vec::new(),
            locals: HashMap::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
            errors: Vec::new(),
        }
    }

    /// Walk all top‑level statements, returning the address table or every
    /// diagnostic reported along the way.
    pub fn resolve(
        mut self,
        statements: &[Stmt<'a>],
    ) -> std::result::Result<Resolutions, Vec<LoxError>> {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        self.resolve_block(statements);

        info!(
            "Resolve pass finished: {} local reference(s), {} error(s)",
            self.locals.len(),
            self.errors.len()
        );

        if self.errors.is_empty() {
            Ok(self.locals)
        } else {
            Err(self.errors)
        }
    }

    fn error<S: Into<String>>(&mut self, line: usize, message: S) {
        self.errors.push(LoxError::resolve(line, message));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_block(&mut self, statements: &[Stmt<'a>]) {
        for stmt in statements {
            self.resolve_stmt(stmt);
        }
    }

    fn resolve_stmt(&mut self, stmt: &Stmt<'a>) {
        debug!("Resolving stmt: {:?}", stmt);

        match stmt {
            Stmt::Block(statements) => {
                self.begin_scope();
                self.resolve_block(statements);
                self.end_scope();
            }

            Stmt::Var { name, initializer } => {
                self.declare(name);
                if let Some(expr) = initializer {
                    self.resolve_expr(expr);
                }
                self.define(name);
            }

            Stmt::Function(function) => {
                // the name is visible inside its own body, for recursion
                self.declare(function.name);
                self.define(function.name);
                self.resolve_function(function, FunctionType::Function);
            }

            Stmt::Class { name, methods } => {
                self.declare(name);
                self.define(name);
                self.resolve_class(methods);
            }

            Stmt::Expression(expr) | Stmt::Print(expr) => {
                self.resolve_expr(expr);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(eb) = else_branch.as_deref() {
                    self.resolve_stmt(eb);
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }

            Stmt::For {
                initializer,
                condition,
                increment,
                body,
            } => {
                // loop scope for the initializer, then one per iteration
                self.begin_scope();
                if let Some(init) = initializer {
                    self.resolve_stmt(init);
                }
                if let Some(cond) = condition {
                    self.resolve_expr(cond);
                }
                if let Some(inc) = increment {
                    self.resolve_expr(inc);
                }

                self.begin_scope();
                self.resolve_stmt(body);
                self.end_scope();

                self.end_scope();
            }

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.error(keyword.line, "Can't return from top-level code.");
                }
                if let Some(expr) = value {
                    self.resolve_expr(expr);
                }
            }
        }
    }

    /// Methods close over a scope holding only `this`, matching the frame
    /// [`Function::bind`](crate::callable::Function::bind) creates.
    fn resolve_class(&mut self, methods: &[FunctionDecl<'a>]) {
        let enclosing_class = self.current_class;
        self.current_class = ClassType::Class;

        self.begin_scope();
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(
                THIS,
                VarInfo {
                    defined: true,
                    accessed: true,
                    line: 0,
                    slot: 0,
                },
            );
        }

        for method in methods {
            let kind = if method.name.lexeme == INITIALIZER && !method.is_static {
                FunctionType::Initializer
            } else {
                FunctionType::Method
            };
            self.resolve_function(method, kind);
        }

        self.end_scope();
        self.current_class = enclosing_class;
    }

    /// Enter a fresh scope for a function’s parameters + body.
    fn resolve_function(&mut self, function: &FunctionDecl<'a>, kind: FunctionType) {
        let enclosing = self.current_function;
        self.current_function = kind;

        self.begin_scope();
        for param in &function.params {
            self.declare(param);
            self.define(param);
        }
        self.resolve_block(&function.body);
        self.end_scope();

        self.current_function = enclosing;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &Expr<'a>) {
        match expr {
            Expr::Literal(_) => {}

            Expr::Grouping(inner) => self.resolve_expr(inner),

            Expr::Unary { right, .. } => self.resolve_expr(right),

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }

            Expr::Variable { id, name } => {
                let uninitialized = self
                    .scopes
                    .last()
                    .and_then(|scope| scope.get(name.lexeme))
                    .is_some_and(|info| !info.defined);

                if uninitialized {
                    self.error(
                        name.line,
                        format!(
                            "Can't read local variable '{}' in its own initializer.",
                            name.lexeme
                        ),
                    );
                }

                self.resolve_local(*id, name);
            }

            Expr::Assign { id, name, value } => {
                self.resolve_expr(value);
                self.resolve_local(*id, name);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);
                for arg in arguments {
                    self.resolve_expr(arg);
                }
            }

            Expr::Get { object, .. } => self.resolve_expr(object),

            Expr::Set { object, value, .. } => {
                self.resolve_expr(object);
                self.resolve_expr(value);
            }

            Expr::This { id, keyword } => {
                if self.current_class == ClassType::None {
                    self.error(keyword.line, "Can't use 'this' outside of a class.");
                    return;
                }
                self.resolve_local(*id, keyword);
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    /// Pop the innermost scope, reporting locals that were never read.
    fn end_scope(&mut self) {
        let Some(scope) = self.scopes.pop() else {
            return;
        };

        let mut unused: Vec<(&'a str, VarInfo)> = scope
            .into_iter()
            .filter(|(_, info)| !info.accessed)
            .collect();
        unused.sort_by_key(|(_, info)| info.slot);

        for (name, info) in unused {
            self.error(
                info.line,
                format!("Local variable '{}' is never used.", name),
            );
        }
    }

    fn declare(&mut self, name: &Token<'a>) {
        let Some(scope) = self.scopes.last_mut() else {
            return; // globals are not tracked
        };

        if scope.contains_key(name.lexeme) {
            self.error(
                name.line,
                format!(
                    "Already a variable named '{}' in this scope.",
                    name.lexeme
                ),
            );
            return;
        }

        let slot = scope.len();
        scope.insert(
            name.lexeme,
            VarInfo {
                defined: false,
                accessed: false,
                line: name.line,
                slot,
            },
        );
    }

    fn define(&mut self, name: &Token<'a>) {
        if let Some(info) = self
            .scopes
            .last_mut()
            .and_then(|scope| scope.get_mut(name.lexeme))
        {
            info.defined = true;
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Binding‑distance helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Record this occurrence as a local at `(distance, slot)`, or leave it
    /// unrecorded as a global if no scope declares the name.
    fn resolve_local(&mut self, id: ExprId, name: &Token<'a>) {
        for (distance, scope) in self.scopes.iter_mut().rev().enumerate() {
            if let Some(info) = scope.get_mut(name.lexeme) {
                info.accessed = true;
                debug!(
                    "Resolved '{}' at distance {}, slot {}",
                    name.lexeme, distance, info.slot
                );
                self.locals.insert(
                    id,
                    Address {
                        distance,
                        slot: info.slot,
                    },
                );
                return;
            }
        }

        debug!("Resolved '{}' as global", name.lexeme);
    }
}
