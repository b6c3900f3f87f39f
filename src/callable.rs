//! Runtime object model: user functions, classes and instances.
//!
//! Invocation lives in the interpreter; this module owns the data and the
//! lookup/binding rules.
//!
//! A [`Class`] keeps instance methods and static methods in two separate
//! tables. Property access on a class value only ever consults the static
//! table, and property access on an instance only the instance table.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::ast::FunctionDecl;
use crate::environment::Environment;
use crate::error::RuntimeError;
use crate::token::Token;
use crate::value::Value;

/// Name of the constructor method.
pub const INITIALIZER: &str = "init";

/// Name the receiver is bound under, always at slot 0 of the bound frame.
pub const THIS: &str = "this";

/// A user-defined function or method together with its closure.
pub struct Function<'a> {
    pub declaration: &'a FunctionDecl<'a>,
    pub closure: Rc<RefCell<Environment<'a>>>,
    pub is_initializer: bool,
}

impl<'a> Function<'a> {
    pub fn new(
        declaration: &'a FunctionDecl<'a>,
        closure: Rc<RefCell<Environment<'a>>>,
        is_initializer: bool,
    ) -> Self {
        Self {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &'a str {
        self.declaration.name.lexeme
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    pub fn is_static(&self) -> bool {
        self.declaration.is_static
    }

    /// Copy of this method whose closure is a new frame holding `receiver`
    /// as `this` in slot 0, wrapped around the original closure.
    pub fn bind(&self, receiver: Value<'a>) -> Function<'a> {
        debug!("Binding method '{}' to {}", self.name(), receiver);

        let environment = Environment::child(&self.closure);
        environment.borrow_mut().define(THIS, receiver);

        Function::new(self.declaration, environment, self.is_initializer)
    }
}

impl fmt::Debug for Function<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name())
            .field("arity", &self.arity())
            .field("is_initializer", &self.is_initializer)
            .field("is_static", &self.is_static())
            .finish()
    }
}

pub struct Class<'a> {
    pub name: &'a str,
    methods: HashMap<&'a str, Rc<Function<'a>>>,
    statics: HashMap<&'a str, Rc<Function<'a>>>,
}

impl<'a> Class<'a> {
    /// Split `methods` into the instance and static tables by their flag.
    pub fn new(name: &'a str, methods: Vec<Function<'a>>) -> Self {
        let mut instance_table = HashMap::new();
        let mut static_table = HashMap::new();

        for method in methods {
            let table = if method.is_static() {
                &mut static_table
            } else {
                &mut instance_table
            };
            table.insert(method.name(), Rc::new(method));
        }

        Self {
            name,
            methods: instance_table,
            statics: static_table,
        }
    }

    pub fn find_method(&self, name: &str) -> Option<Rc<Function<'a>>> {
        self.methods.get(name).cloned()
    }

    pub fn find_static(&self, name: &str) -> Option<Rc<Function<'a>>> {
        self.statics.get(name).cloned()
    }

    /// Calling a class takes as many arguments as its `init`, or none.
    pub fn arity(&self) -> usize {
        self.find_method(INITIALIZER).map_or(0, |init| init.arity())
    }

    /// `Class.name`: a static method bound with the class itself as `this`.
    pub fn get_static(class: &Rc<Class<'a>>, name: &Token<'_>) -> Result<Value<'a>, RuntimeError> {
        if let Some(method) = class.find_static(name.lexeme) {
            let bound = method.bind(Value::Class(Rc::clone(class)));
            return Ok(Value::Function(Rc::new(bound)));
        }

        if class.find_method(name.lexeme).is_some() {
            return Err(RuntimeError::NonStaticMethod {
                name: name.lexeme.to_string(),
                class: class.name.to_string(),
                line: name.line,
            });
        }

        Err(RuntimeError::NoSuchStaticMethod {
            name: name.lexeme.to_string(),
            class: class.name.to_string(),
            line: name.line,
        })
    }
}

impl fmt::Debug for Class<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut methods: Vec<_> = self.methods.keys().collect();
        let mut statics: Vec<_> = self.statics.keys().collect();
        methods.sort();
        statics.sort();

        f.debug_struct("Class")
            .field("name", &self.name)
            .field("methods", &methods)
            .field("statics", &statics)
            .finish()
    }
}

pub struct Instance<'a> {
    pub class: Rc<Class<'a>>,
    fields: HashMap<String, Value<'a>>,
}

impl<'a> Instance<'a> {
    pub fn new(class: Rc<Class<'a>>) -> Self {
        Self {
            class,
            fields: HashMap::new(),
        }
    }

    /// Fields shadow methods; methods come back bound to `instance`.
    pub fn get(
        instance: &Rc<RefCell<Instance<'a>>>,
        name: &Token<'_>,
    ) -> Result<Value<'a>, RuntimeError> {
        let this = instance.borrow();

        if let Some(value) = this.fields.get(name.lexeme) {
            return Ok(value.clone());
        }

        if let Some(method) = this.class.find_method(name.lexeme) {
            let bound = method.bind(Value::Instance(Rc::clone(instance)));
            return Ok(Value::Function(Rc::new(bound)));
        }

        Err(RuntimeError::UndefinedProperty {
            name: name.lexeme.to_string(),
            line: name.line,
        })
    }

    pub fn set(&mut self, name: &Token<'_>, value: Value<'a>) {
        self.fields.insert(name.lexeme.to_string(), value);
    }
}

impl fmt::Debug for Instance<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fields: Vec<_> = self.fields.keys().collect();
        fields.sort();

        f.debug_struct("Instance")
            .field("class", &self.class.name)
            .field("fields", &fields)
            .finish()
    }
}
