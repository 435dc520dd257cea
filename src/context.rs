// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Evaluation scopes.
//!
//! Scopes form a chain through borrowed parent links. Named variables live
//! in [`EvaluationContext`]s; [`DefaultVariable`] and [`IteratePool`] only
//! rebind the default variable and forward everything else.

use crate::error::Result;
use crate::runtime::Runtime;
use crate::value::Value;

use core::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::sync::Arc;

/// Resolves variables that take arguments, on demand.
pub trait VariableResolver: Send + Sync {
    /// `Ok(None)` if this resolver does not know `name`.
    fn resolve(&self, name: &str, args: &[Value]) -> Result<Option<Value>>;
}

/// A scope expressions are evaluated in.
pub trait Context {
    fn parent(&self) -> Option<&dyn Context>;

    /// Shared engine services.
    fn runtime(&self) -> &Arc<Runtime>;

    /// The object expressions are tested against. `Null` if none is set.
    fn default_variable(&self) -> Value;

    fn set_allow_plugin_activation(&self, value: bool);

    /// Whether property testers may instantiate dormant contributors.
    /// Inherited from the parent when unset; `false` at the root.
    fn allow_plugin_activation(&self) -> bool;

    fn add_variable(&self, name: &str, value: Value);

    fn remove_variable(&self, name: &str) -> Option<Value>;

    /// Look up a named variable here, then in the parents.
    fn variable(&self, name: &str) -> Option<Value>;

    /// Ask the resolvers installed here, then the parents.
    fn resolve_variable(&self, name: &str, args: &[Value]) -> Result<Option<Value>>;

    /// The scope that owns named variables for this one.
    fn managed_pool(&self) -> &dyn Context;
}

impl dyn Context + '_ {
    pub fn root(&self) -> &dyn Context {
        let mut current: &dyn Context = self;
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }
}

/// Scope with its own variables and resolvers.
pub struct EvaluationContext<'a> {
    parent: Option<&'a dyn Context>,
    runtime: Arc<Runtime>,
    default_variable: Value,
    variables: RefCell<HashMap<String, Value>>,
    resolvers: Vec<Arc<dyn VariableResolver>>,
    allow_plugin_activation: Cell<Option<bool>>,
}

impl EvaluationContext<'static> {
    pub fn root(runtime: Arc<Runtime>, default_variable: Value) -> Self {
        Self {
            parent: None,
            runtime,
            default_variable,
            variables: RefCell::new(HashMap::new()),
            resolvers: Vec::new(),
            allow_plugin_activation: Cell::new(None),
        }
    }
}

impl<'a> EvaluationContext<'a> {
    pub fn new(parent: &'a dyn Context, default_variable: Value) -> Self {
        Self {
            parent: Some(parent),
            runtime: parent.runtime().clone(),
            default_variable,
            variables: RefCell::new(HashMap::new()),
            resolvers: Vec::new(),
            allow_plugin_activation: Cell::new(None),
        }
    }

    pub fn with_resolvers(mut self, resolvers: Vec<Arc<dyn VariableResolver>>) -> Self {
        self.resolvers = resolvers;
        self
    }

    pub fn with_variable(self, name: &str, value: Value) -> Self {
        self.variables.borrow_mut().insert(name.to_string(), value);
        self
    }
}

impl Context for EvaluationContext<'_> {
    fn parent(&self) -> Option<&dyn Context> {
        self.parent
    }

    fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }

    fn default_variable(&self) -> Value {
        self.default_variable.clone()
    }

    fn set_allow_plugin_activation(&self, value: bool) {
        self.allow_plugin_activation.set(Some(value));
    }

    fn allow_plugin_activation(&self) -> bool {
        match self.allow_plugin_activation.get() {
            Some(value) => value,
            None => self
                .parent
                .map(|p| p.allow_plugin_activation())
                .unwrap_or(false),
        }
    }

    fn add_variable(&self, name: &str, value: Value) {
        self.variables.borrow_mut().insert(name.to_string(), value);
    }

    fn remove_variable(&self, name: &str) -> Option<Value> {
        self.variables.borrow_mut().remove(name)
    }

    fn variable(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.variables.borrow().get(name) {
            return Some(value.clone());
        }
        self.parent.and_then(|p| p.variable(name))
    }

    fn resolve_variable(&self, name: &str, args: &[Value]) -> Result<Option<Value>> {
        for resolver in &self.resolvers {
            if let Some(value) = resolver.resolve(name, args)? {
                return Ok(Some(value));
            }
        }
        match self.parent {
            Some(parent) => parent.resolve_variable(name, args),
            None => Ok(None),
        }
    }

    fn managed_pool(&self) -> &dyn Context {
        self
    }
}

/// Scope that only rebinds the default variable.
///
/// Named variables are read from and written to the nearest enclosing
/// scope that is not itself a `DefaultVariable`.
pub struct DefaultVariable<'a> {
    parent: &'a dyn Context,
    managed_pool: &'a dyn Context,
    default_variable: Value,
}

impl<'a> DefaultVariable<'a> {
    pub fn new(parent: &'a dyn Context, default_variable: Value) -> Self {
        Self {
            parent,
            managed_pool: parent.managed_pool(),
            default_variable,
        }
    }
}

impl Context for DefaultVariable<'_> {
    fn parent(&self) -> Option<&dyn Context> {
        Some(self.parent)
    }

    fn runtime(&self) -> &Arc<Runtime> {
        self.managed_pool.runtime()
    }

    fn default_variable(&self) -> Value {
        self.default_variable.clone()
    }

    fn set_allow_plugin_activation(&self, value: bool) {
        self.managed_pool.set_allow_plugin_activation(value)
    }

    fn allow_plugin_activation(&self) -> bool {
        self.managed_pool.allow_plugin_activation()
    }

    fn add_variable(&self, name: &str, value: Value) {
        self.managed_pool.add_variable(name, value)
    }

    fn remove_variable(&self, name: &str) -> Option<Value> {
        self.managed_pool.remove_variable(name)
    }

    fn variable(&self, name: &str) -> Option<Value> {
        self.managed_pool.variable(name)
    }

    fn resolve_variable(&self, name: &str, args: &[Value]) -> Result<Option<Value>> {
        self.managed_pool.resolve_variable(name, args)
    }

    fn managed_pool(&self) -> &dyn Context {
        self.managed_pool
    }
}

/// Scope whose default variable steps through a sequence of elements.
pub struct IteratePool<'a> {
    parent: &'a dyn Context,
    elements: RefCell<Box<dyn Iterator<Item = Value> + 'a>>,
    current: RefCell<Value>,
}

impl<'a> IteratePool<'a> {
    pub fn new<I>(parent: &'a dyn Context, elements: I) -> Self
    where
        I: IntoIterator<Item = Value>,
        I::IntoIter: 'a,
    {
        Self {
            parent,
            elements: RefCell::new(Box::new(elements.into_iter())),
            current: RefCell::new(Value::Null),
        }
    }

    /// Bind the next element as the default variable.
    /// Returns `false` once the elements are exhausted.
    pub fn advance(&self) -> bool {
        let next = self.elements.borrow_mut().next();
        match next {
            Some(element) => {
                *self.current.borrow_mut() = element;
                true
            }
            None => false,
        }
    }
}

impl Context for IteratePool<'_> {
    fn parent(&self) -> Option<&dyn Context> {
        Some(self.parent)
    }

    fn runtime(&self) -> &Arc<Runtime> {
        self.parent.runtime()
    }

    fn default_variable(&self) -> Value {
        self.current.borrow().clone()
    }

    fn set_allow_plugin_activation(&self, value: bool) {
        self.parent.set_allow_plugin_activation(value)
    }

    fn allow_plugin_activation(&self) -> bool {
        self.parent.allow_plugin_activation()
    }

    fn add_variable(&self, name: &str, value: Value) {
        self.parent.add_variable(name, value)
    }

    fn remove_variable(&self, name: &str) -> Option<Value> {
        self.parent.remove_variable(name)
    }

    fn variable(&self, name: &str) -> Option<Value> {
        self.parent.variable(name)
    }

    fn resolve_variable(&self, name: &str, args: &[Value]) -> Result<Option<Value>> {
        self.parent.resolve_variable(name, args)
    }

    fn managed_pool(&self) -> &dyn Context {
        self
    }
}
