//! Chained scopes.
//!
//! Each block, call, and bound method gets one [`Environment`] layered on
//! exactly one parent.  Links are shared (`Rc<RefCell<_>>`) so closures keep
//! their defining scope alive after it has been exited, and assignments made
//! through one closure are visible to every other holder.
//!
//! Reference counting cannot reclaim cycles (an instance whose field holds
//! one of its own bound methods points back at itself through the method's
//! `this` scope).  Such structures live until the process exits.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::debug;

use crate::error::{LoxError, Result};
use crate::token::Token;
use crate::value::Value;

/// Shared handle to a scope.
pub type EnvRef = Rc<RefCell<Environment>>;

#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<EnvRef>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: EnvRef) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// A fresh root scope, ready to share.
    pub fn new_global() -> EnvRef {
        Rc::new(RefCell::new(Environment::new()))
    }

    /// A fresh child of `parent`, ready to share.
    pub fn new_enclosed(parent: &EnvRef) -> EnvRef {
        Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(parent))))
    }

    /// Define (or redefine) `name` in this scope.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Dynamic lookup walking the whole chain.  Only used for globals,
    /// whose scope has no parent.
    pub fn get(&self, name: &Token) -> Result<Value> {
        if let Some(value) = self.values.get(&name.lexeme) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            Err(undefined(name))
        }
    }

    pub fn assign(&mut self, name: &Token, value: Value) -> Result<()> {
        if let Some(slot) = self.values.get_mut(&name.lexeme) {
            *slot = value;
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(undefined(name))
        }
    }

    /// The scope exactly `distance` links up from `env`.
    pub fn ancestor(env: &EnvRef, distance: usize) -> Option<EnvRef> {
        let mut current: EnvRef = Rc::clone(env);

        for _ in 0..distance {
            let parent: EnvRef = current.borrow().enclosing.clone()?;
            current = parent;
        }

        Some(current)
    }

    /// Read `name` from the scope `distance` hops up, without searching.
    pub fn get_at(env: &EnvRef, distance: usize, name: &str) -> Option<Value> {
        debug!("get_at distance={} name={}", distance, name);

        let scope: EnvRef = Self::ancestor(env, distance)?;
        let value: Option<Value> = scope.borrow().values.get(name).cloned();
        value
    }

    /// Write `name` in the scope `distance` hops up.  Returns `false` if that
    /// scope does not bind it.
    pub fn assign_at(env: &EnvRef, distance: usize, name: &str, value: Value) -> bool {
        debug!("assign_at distance={} name={}", distance, name);

        let Some(scope) = Self::ancestor(env, distance) else {
            return false;
        };
        let mut scope = scope.borrow_mut();

        match scope.values.get_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}

pub(crate) fn undefined(name: &Token) -> LoxError {
    LoxError::runtime(name, format!("Undefined variable '{}'.", name.lexeme))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenType;

    #[test]
    fn get_at_reads_exactly_that_many_hops_up() {
        let global = Environment::new_global();
        global.borrow_mut().define("a", Value::Number(1.0));

        let block = Environment::new_enclosed(&global);
        block.borrow_mut().define("a", Value::Number(2.0));

        let inner = Environment::new_enclosed(&block);

        let root = Environment::ancestor(&inner, 2).unwrap();
        assert!(Rc::ptr_eq(&root, &global));
        assert_eq!(Environment::get_at(&inner, 1, "a"), Some(Value::Number(2.0)));
        assert_eq!(Environment::get_at(&inner, 2, "a"), Some(Value::Number(1.0)));
        assert_eq!(Environment::get_at(&inner, 0, "a"), None);
        assert_eq!(Environment::get_at(&inner, 3, "a"), None);
    }

    #[test]
    fn assignment_through_a_shared_link_is_visible_to_all_holders() {
        let global = Environment::new_global();
        let captured = Environment::new_enclosed(&global);
        captured.borrow_mut().define("n", Value::Number(0.0));

        let holder_a = Environment::new_enclosed(&captured);
        let holder_b = Environment::new_enclosed(&captured);

        assert!(Environment::assign_at(&holder_a, 1, "n", Value::Number(5.0)));
        assert_eq!(Environment::get_at(&holder_b, 1, "n"), Some(Value::Number(5.0)));
    }

    #[test]
    fn undefined_globals_are_runtime_errors() {
        let global = Environment::new_global();
        let name = Token::new(TokenType::IDENTIFIER, "missing", 3);

        let err = global.borrow().get(&name).unwrap_err();
        assert_eq!(err.to_string(), "Undefined variable 'missing'.\n[line 3]");

        let err = global
            .borrow_mut()
            .assign(&name, Value::Nil)
            .unwrap_err();
        assert_eq!(err.message(), "Undefined variable 'missing'.");
    }
}
