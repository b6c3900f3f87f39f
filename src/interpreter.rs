use std::cell::RefCell;
use std::io::{self, Write};
use std::mem;
use std::rc::Rc;
use std::time::{SystemTime, SystemTimeError, UNIX_EPOCH};

use log::{debug, info};

use crate::ast::{Expr, ExprId, LiteralValue, Stmt};
use crate::callable::{Class, Function, Instance, INITIALIZER};
use crate::environment::Environment;
use crate::error::{ErrorSink, LoxError, RuntimeError};
use crate::resolver::Resolutions;
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Outcome of executing one statement: fall through, or unwind to the
/// nearest call boundary carrying a return value.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion<'a> {
    Normal,
    Return(Value<'a>),
}

/// Convenient alias for interpreter results.
pub type IResult<T> = Result<T, RuntimeError>;

/// Tree-walking evaluator.
///
/// `environment` is the frame of the code currently executing and is swapped
/// in and out with stack discipline around blocks, loops and calls.
/// `globals` is the outermost frame, where unresolved names are looked up by
/// name. `print` output goes to `out`.
pub struct Interpreter<'a, W: Write = io::Stdout> {
    globals: Rc<RefCell<Environment<'a>>>,
    environment: Rc<RefCell<Environment<'a>>>,
    locals: Resolutions,
    out: W,
}

impl<'a> Interpreter<'a, io::Stdout> {
    /// Interpreter printing to stdout.
    pub fn new() -> Self {
        Self::with_output(io::stdout())
    }
}

impl<'a> Default for Interpreter<'a, io::Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, W: Write> Interpreter<'a, W> {
    /// Creates a new Interpreter and defines native functions such as `clock`.
    pub fn with_output(out: W) -> Self {
        info!("Initializing Interpreter");

        let globals = Rc::new(RefCell::new(Environment::new()));

        debug!("Defining native function 'clock'");

        globals.borrow_mut().define(
            "clock",
            Value::NativeFunction {
                name: "clock",
                arity: 0,
                func: |_args| {
                    let timestamp: f64 = SystemTime::now()
                        .duration_since(UNIX_EPOCH)
                        .map_err(|e: SystemTimeError| format!("Clock error: {}", e))?
                        .as_secs_f64();
                    Ok(Value::Number(timestamp))
                },
            },
        );

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: Resolutions::new(),
            out,
        }
    }

    /// Hand back the output target, e.g. to inspect a captured buffer.
    pub fn into_output(self) -> W {
        self.out
    }

    /// Install the address table produced by the resolver. Ids are only
    /// unique within one parse, so every table must come from the same one.
    pub fn add_resolutions(&mut self, resolutions: Resolutions) {
        debug!("Adding {} resolved address(es)", resolutions.len());
        self.locals.extend(resolutions);
    }

    /// Run a resolved program. The first runtime error stops execution and
    /// goes to `sink`; returns `false` in that case.
    pub fn interpret(&mut self, statements: &'a [Stmt<'a>], sink: &mut dyn ErrorSink) -> bool {
        debug!("Interpreting {} statements", statements.len());

        match self.execute_all(statements) {
            Ok(()) => {
                info!("Interpretation completed successfully");
                true
            }
            Err(e) => {
                debug!("Runtime error: {}", e);
                sink.report(LoxError::Runtime(e));
                false
            }
        }
    }

    /// Evaluate one expression and print its display form.
    pub fn interpret_expression(&mut self, expr: &'a Expr<'a>, sink: &mut dyn ErrorSink) -> bool {
        let result = self
            .evaluate(expr)
            .and_then(|value| writeln!(self.out, "{}", value).map_err(RuntimeError::from));

        match result {
            Ok(()) => true,
            Err(e) => {
                debug!("Runtime error: {}", e);
                sink.report(LoxError::Runtime(e));
                false
            }
        }
    }

    /// Execute statements in the current frame, propagating the first error.
    pub fn execute_all(&mut self, statements: &'a [Stmt<'a>]) -> IResult<()> {
        for stmt in statements {
            self.execute(stmt)?;
        }
        self.out.flush()?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────────

    fn execute(&mut self, stmt: &'a Stmt<'a>) -> IResult<Completion<'a>> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                writeln!(self.out, "{}", value)?;
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Defining variable '{}' = {}", name.lexeme, value);
                self.environment.borrow_mut().define(name.lexeme, value);
            }

            Stmt::Block(statements) => {
                let frame = Environment::child(&self.environment);
                return self.with_environment(frame, |this| this.execute_statements(statements));
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    return self.execute(then_branch);
                } else if let Some(else_stmt) = else_branch {
                    return self.execute(else_stmt);
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    if let Completion::Return(value) = self.execute(body)? {
                        return Ok(Completion::Return(value));
                    }
                }
            }

            Stmt::For {
                initializer,
                condition,
                increment,
                body,
            } => {
                let frame = Environment::child(&self.environment);
                return self.with_environment(frame, |this| {
                    this.execute_for(
                        initializer.as_deref(),
                        condition.as_ref(),
                        increment.as_ref(),
                        body,
                    )
                });
            }

            Stmt::Function(declaration) => {
                debug!("Defining function '{}'", declaration.name.lexeme);
                let function = Function::new(declaration, Rc::clone(&self.environment), false);
                self.environment
                    .borrow_mut()
                    .define(declaration.name.lexeme, Value::Function(Rc::new(function)));
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(e) => self.evaluate(e)?,
                    None => Value::Nil,
                };
                debug!("Returning value: {}", value);
                return Ok(Completion::Return(value));
            }

            Stmt::Class { name, methods } => {
                let methods = methods
                    .iter()
                    .map(|method| {
                        let is_initializer =
                            method.name.lexeme == INITIALIZER && !method.is_static;
                        Function::new(method, Rc::clone(&self.environment), is_initializer)
                    })
                    .collect();

                let class = Class::new(name.lexeme, methods);
                info!("Class '{}' defined", name.lexeme);
                self.environment
                    .borrow_mut()
                    .define(name.lexeme, Value::Class(Rc::new(class)));
            }
        }

        Ok(Completion::Normal)
    }

    fn execute_statements(&mut self, statements: &'a [Stmt<'a>]) -> IResult<Completion<'a>> {
        for stmt in statements {
            if let Completion::Return(value) = self.execute(stmt)? {
                return Ok(Completion::Return(value));
            }
        }
        Ok(Completion::Normal)
    }

    /// Runs inside the loop frame; the body gets a fresh frame per iteration.
    fn execute_for(
        &mut self,
        initializer: Option<&'a Stmt<'a>>,
        condition: Option<&'a Expr<'a>>,
        increment: Option<&'a Expr<'a>>,
        body: &'a Stmt<'a>,
    ) -> IResult<Completion<'a>> {
        if let Some(init) = initializer {
            self.execute(init)?;
        }

        loop {
            if let Some(cond) = condition {
                if !self.evaluate(cond)?.is_truthy() {
                    break;
                }
            }

            let frame = Environment::child(&self.environment);
            let completion = self.with_environment(frame, |this| this.execute(body))?;
            if let Completion::Return(value) = completion {
                return Ok(Completion::Return(value));
            }

            if let Some(inc) = increment {
                self.evaluate(inc)?;
            }
        }

        Ok(Completion::Normal)
    }

    /// Make `frame` current for the duration of `f`, restoring the previous
    /// frame afterwards whether or not `f` failed.
    fn with_environment<T>(
        &mut self,
        frame: Rc<RefCell<Environment<'a>>>,
        f: impl FnOnce(&mut Self) -> IResult<T>,
    ) -> IResult<T> {
        let previous = mem::replace(&mut self.environment, frame);
        let result = f(self);
        self.environment = previous;
        result
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────────────

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &'a Expr<'a>) -> IResult<Value<'a>> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => {
                let right = self.evaluate(right)?;
                match (&operator.token_type, right) {
                    (TokenType::MINUS, Value::Number(n)) => Ok(Value::Number(-n)),
                    (TokenType::MINUS, _) => Err(RuntimeError::type_error(
                        operator,
                        "Operand must be a number.",
                    )),
                    (TokenType::BANG, value) => Ok(Value::Bool(!value.is_truthy())),
                    _ => Err(RuntimeError::type_error(
                        operator,
                        format!("Invalid unary operator '{}'.", operator.lexeme),
                    )),
                }
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                binary(operator, left, right)
            }

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let short_circuits = match operator.token_type {
                    TokenType::OR => left.is_truthy(),
                    _ => !left.is_truthy(),
                };
                if short_circuits {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }

            Expr::Variable { id, name } => self.look_up(*id, name),

            Expr::This { id, keyword } => self.look_up(*id, keyword),

            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;
                match self.locals.get(id) {
                    Some(address) => self.environment.borrow_mut().assign_at(
                        address.distance,
                        address.slot,
                        value.clone(),
                    ),
                    None => self.globals.borrow_mut().assign(name, value.clone())?,
                }
                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee = self.evaluate(callee)?;
                let mut args = Vec::with_capacity(arguments.len());
                for arg in arguments {
                    args.push(self.evaluate(arg)?);
                }
                self.call(callee, paren, args)
            }

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => Instance::get(&instance, name),
                Value::Class(class) => Class::get_static(&class, name),
                other => Err(RuntimeError::type_error(
                    name,
                    format!("Only instances have properties, not {}.", other.type_name()),
                )),
            },

            Expr::Set {
                object,
                name,
                value,
            } => {
                let Value::Instance(instance) = self.evaluate(object)? else {
                    return Err(RuntimeError::type_error(
                        name,
                        "Only instances have fields.",
                    ));
                };
                let value = self.evaluate(value)?;
                instance.borrow_mut().set(name, value.clone());
                Ok(value)
            }
        }
    }

    /// Resolved locals are read by address; everything else is a global.
    fn look_up(&self, id: ExprId, name: &Token<'_>) -> IResult<Value<'a>> {
        match self.locals.get(&id) {
            Some(address) => Ok(self
                .environment
                .borrow()
                .get_at(address.distance, address.slot)),
            None => self.globals.borrow().get(name),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Calls
    // ─────────────────────────────────────────────────────────────────────────

    fn call(
        &mut self,
        callee: Value<'a>,
        paren: &Token<'_>,
        args: Vec<Value<'a>>,
    ) -> IResult<Value<'a>> {
        match callee {
            Value::NativeFunction { name, arity, func } => {
                debug!("Calling native function '{}'", name);
                check_arity(arity, args.len(), paren)?;
                func(&args).map_err(|message| RuntimeError::Native {
                    message,
                    line: paren.line,
                })
            }

            Value::Function(function) => {
                check_arity(function.arity(), args.len(), paren)?;
                self.call_function(&function, args)
            }

            Value::Class(class) => {
                check_arity(class.arity(), args.len(), paren)?;

                let instance = Rc::new(RefCell::new(Instance::new(Rc::clone(&class))));
                if let Some(init) = class.find_method(INITIALIZER) {
                    let bound = init.bind(Value::Instance(Rc::clone(&instance)));
                    self.call_function(&bound, args)?;
                }

                debug!("Constructed instance of '{}'", class.name);
                Ok(Value::Instance(instance))
            }

            other => {
                debug!("Attempted to call a {}", other.type_name());
                Err(RuntimeError::NotCallable {
                    lexeme: paren.lexeme.to_string(),
                    line: paren.line,
                })
            }
        }
    }

    /// Run `function`'s body in a new frame under its closure, one slot per
    /// parameter.
    fn call_function(
        &mut self,
        function: &Function<'a>,
        args: Vec<Value<'a>>,
    ) -> IResult<Value<'a>> {
        debug!("Calling user-defined function '{}'", function.name());

        let declaration = function.declaration;
        let frame = Environment::child(&function.closure);
        {
            let mut frame = frame.borrow_mut();
            for (param, arg) in declaration.params.iter().zip(args) {
                frame.define(param.lexeme, arg);
            }
        }

        let completion =
            self.with_environment(frame, |this| this.execute_statements(&declaration.body))?;

        // an initializer always yields its receiver
        if function.is_initializer {
            return Ok(function.closure.borrow().get_at(0, 0));
        }

        Ok(match completion {
            Completion::Return(value) => value,
            Completion::Normal => Value::Nil,
        })
    }
}

fn check_arity(expected: usize, got: usize, paren: &Token<'_>) -> IResult<()> {
    if expected == got {
        return Ok(());
    }

    Err(RuntimeError::ArityMismatch {
        expected,
        got,
        lexeme: paren.lexeme.to_string(),
        line: paren.line,
    })
}

fn number_operands(
    operator: &Token<'_>,
    left: &Value<'_>,
    right: &Value<'_>,
) -> IResult<(f64, f64)> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(RuntimeError::type_error(
            operator,
            format!(
                "Operands of '{}' must be numbers, got {} and {}.",
                operator.lexeme,
                left.type_name(),
                right.type_name()
            ),
        )),
    }
}

/// Binary operators. `+` adds numbers, concatenates strings, and
/// stringifies the other side when exactly one operand is a string.
fn binary<'a>(operator: &Token<'_>, left: Value<'a>, right: Value<'a>) -> IResult<Value<'a>> {
    match operator.token_type {
        TokenType::PLUS => match (left, right) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
            (l @ Value::String(_), r) | (l, r @ Value::String(_)) => {
                Ok(Value::String(format!("{}{}", l, r)))
            }
            _ => Err(RuntimeError::type_error(
                operator,
                "Operands must be two numbers or two strings.",
            )),
        },

        TokenType::MINUS => {
            let (a, b) = number_operands(operator, &left, &right)?;
            Ok(Value::Number(a - b))
        }

        TokenType::STAR => {
            let (a, b) = number_operands(operator, &left, &right)?;
            Ok(Value::Number(a * b))
        }

        TokenType::SLASH => {
            let (a, b) = number_operands(operator, &left, &right)?;
            if b == 0.0 {
                return Err(RuntimeError::type_error(
                    operator,
                    "denominator can't be zero",
                ));
            }
            Ok(Value::Number(a / b))
        }

        TokenType::GREATER => {
            let (a, b) = number_operands(operator, &left, &right)?;
            Ok(Value::Bool(a > b))
        }

        TokenType::GREATER_EQUAL => {
            let (a, b) = number_operands(operator, &left, &right)?;
            Ok(Value::Bool(a >= b))
        }

        TokenType::LESS => {
            let (a, b) = number_operands(operator, &left, &right)?;
            Ok(Value::Bool(a < b))
        }

        TokenType::LESS_EQUAL => {
            let (a, b) = number_operands(operator, &left, &right)?;
            Ok(Value::Bool(a <= b))
        }

        TokenType::EQUAL_EQUAL => Ok(Value::Bool(left == right)),

        TokenType::BANG_EQUAL => Ok(Value::Bool(left != right)),

        _ => Err(RuntimeError::type_error(
            operator,
            format!("Invalid binary operator '{}'.", operator.lexeme),
        )),
    }
}
