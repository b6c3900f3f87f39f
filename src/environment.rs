//! Variable frames.
//!
//! A frame stores its values in an append-only slot vector and keeps a
//! name → slot map beside it. Resolved locals are read with
//! [`Environment::get_at`] using the `(distance, slot)` address computed by the
//! resolver; the name map only serves the global frame and by-name lookups.
//!
//! Frames are shared through `Rc<RefCell<_>>`: a closure keeps its defining
//! frame alive, and every closure over the same frame sees the same slots.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::debug;

use crate::error::RuntimeError;
use crate::token::Token;
use crate::value::Value;

#[derive(Default)]
pub struct Environment<'a> {
    names: HashMap<&'a str, usize>,
    slots: Vec<Value<'a>>,
    pub enclosing: Option<Rc<RefCell<Environment<'a>>>>,
}

impl<'a> Environment<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment<'a>>>) -> Self {
        Environment {
            names: HashMap::new(),
            slots: Vec::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Wrap `enclosing` in a fresh, shared child frame.
    pub fn child(enclosing: &Rc<RefCell<Environment<'a>>>) -> Rc<RefCell<Environment<'a>>> {
        Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(
            enclosing,
        ))))
    }

    /// Append `value` as a new slot. Redefining a name in the same frame
    /// points the name at the new slot; the old slot stays in place.
    pub fn define(&mut self, name: &'a str, value: Value<'a>) -> usize {
        let slot = self.slots.len();
        self.slots.push(value);
        self.names.insert(name, slot);
        slot
    }

    pub fn get(&self, name: &Token<'_>) -> Result<Value<'a>, RuntimeError> {
        if let Some(&slot) = self.names.get(name.lexeme) {
            return Ok(self.slots[slot].clone());
        }

        match &self.enclosing {
            Some(enclosing) => enclosing.borrow().get(name),
            None => Err(RuntimeError::UndefinedVariable {
                name: name.lexeme.to_string(),
                line: name.line,
            }),
        }
    }

    pub fn assign(&mut self, name: &Token<'_>, value: Value<'a>) -> Result<(), RuntimeError> {
        if let Some(&slot) = self.names.get(name.lexeme) {
            self.slots[slot] = value;
            return Ok(());
        }

        match &self.enclosing {
            Some(enclosing) => enclosing.borrow_mut().assign(name, value),
            None => Err(RuntimeError::UndefinedVariable {
                name: name.lexeme.to_string(),
                line: name.line,
            }),
        }
    }

    /// Read slot `slot` of the frame `distance` links up.
    ///
    /// # Panics
    ///
    /// If the frame or slot does not exist. Addresses come from the
    /// resolver, so a miss means the two passes disagree about scoping.
    pub fn get_at(&self, distance: usize, slot: usize) -> Value<'a> {
        if distance == 0 {
            return match self.slots.get(slot) {
                Some(value) => value.clone(),
                None => panic!(
                    "resolved slot {} missing from frame of {} slot(s)",
                    slot,
                    self.slots.len()
                ),
            };
        }

        self.ancestor_link(distance).borrow().get_at(distance - 1, slot)
    }

    /// Write slot `slot` of the frame `distance` links up.
    ///
    /// # Panics
    ///
    /// Same conditions as [`Environment::get_at`].
    pub fn assign_at(&mut self, distance: usize, slot: usize, value: Value<'a>) {
        if distance == 0 {
            let len = self.slots.len();
            match self.slots.get_mut(slot) {
                Some(target) => *target = value,
                None => panic!("resolved slot {} missing from frame of {} slot(s)", slot, len),
            }
            return;
        }

        self.ancestor_link(distance)
            .borrow_mut()
            .assign_at(distance - 1, slot, value);
    }

    fn ancestor_link(&self, distance: usize) -> &Rc<RefCell<Environment<'a>>> {
        debug!("Walking enclosing link, {} remaining", distance);

        match &self.enclosing {
            Some(enclosing) => enclosing,
            None => panic!("resolved distance {} walks past the global frame", distance),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenType;

    fn ident(name: &str) -> Token<'_> {
        Token::new(TokenType::IDENTIFIER, name, 1)
    }

    #[test]
    fn define_appends_slots_in_order() {
        let mut env = Environment::new();
        assert_eq!(env.define("a", Value::Number(1.0)), 0);
        assert_eq!(env.define("b", Value::Number(2.0)), 1);
        assert_eq!(env.get_at(0, 1), Value::Number(2.0));
        assert_eq!(env.slots.len(), 2);
    }

    #[test]
    fn redefinition_remaps_name_without_removing_slot() {
        let mut env = Environment::new();
        env.define("a", Value::Number(1.0));
        env.define("a", Value::Number(2.0));

        assert_eq!(env.get(&ident("a")), Ok(Value::Number(2.0)));
        assert_eq!(env.get_at(0, 0), Value::Number(1.0));
    }

    #[test]
    fn get_walks_the_enclosing_chain() {
        let globals = Rc::new(RefCell::new(Environment::new()));
        globals.borrow_mut().define("x", Value::Bool(true));

        let inner = Environment::child(&Environment::child(&globals));

        assert_eq!(inner.borrow().get(&ident("x")), Ok(Value::Bool(true)));
        assert_eq!(inner.borrow().get_at(2, 0), Value::Bool(true));
    }

    #[test]
    fn missing_name_is_undefined_variable() {
        let env = Environment::new();
        let err = env.get(&ident("nope")).unwrap_err();
        assert!(matches!(err, RuntimeError::UndefinedVariable { .. }));

        let mut env = Environment::new();
        let err = env.assign(&ident("nope"), Value::Nil).unwrap_err();
        assert!(matches!(err, RuntimeError::UndefinedVariable { .. }));
    }

    #[test]
    fn assign_at_mutates_shared_frame() {
        let outer = Rc::new(RefCell::new(Environment::new()));
        outer.borrow_mut().define("n", Value::Number(0.0));

        let first = Environment::child(&outer);
        let second = Environment::child(&outer);

        first.borrow_mut().assign_at(1, 0, Value::Number(5.0));
        assert_eq!(second.borrow().get_at(1, 0), Value::Number(5.0));
    }

    #[test]
    fn assign_by_name_updates_first_frame_holding_it() {
        let outer = Rc::new(RefCell::new(Environment::new()));
        outer.borrow_mut().define("n", Value::Number(0.0));
        let inner = Environment::child(&outer);

        inner
            .borrow_mut()
            .assign(&ident("n"), Value::Number(3.0))
            .unwrap();
        assert_eq!(outer.borrow().get_at(0, 0), Value::Number(3.0));
    }

    #[test]
    #[should_panic(expected = "walks past the global frame")]
    fn bad_distance_is_a_defect() {
        let env = Environment::new();
        env.get_at(1, 0);
    }
}
