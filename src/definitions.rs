// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::converter::{ConfigurationElement, ExpressionConverter};
use crate::error::{ExpressionError, Result};
use crate::expression::ExpressionRef;

use std::sync::Arc;

use dashmap::DashMap;

const ATT_ID: &str = "id";
const DEFINITION_TAG: &str = "definition";

/// Thread-safe registry of named expression definitions.
///
/// A definition element wraps exactly one expression element. It is
/// converted on first lookup and the result is cached for the lifetime of
/// the entry.
pub struct DefinitionRegistry {
    converter: Arc<ExpressionConverter>,
    elements: DashMap<String, Arc<ConfigurationElement>>,
    cache: DashMap<String, ExpressionRef>,
}

impl DefinitionRegistry {
    pub fn new(converter: Arc<ExpressionConverter>) -> Self {
        Self {
            converter,
            elements: DashMap::new(),
            cache: DashMap::new(),
        }
    }

    /// Converter used for definitions and for references bound to this registry.
    pub fn converter(&self) -> &Arc<ExpressionConverter> {
        &self.converter
    }

    /// Register a `<definition id="...">` element, replacing any earlier
    /// definition with the same id.
    pub fn add_definition_element(&self, element: ConfigurationElement) -> Result<()> {
        let id = element
            .attributes
            .get(ATT_ID)
            .filter(|id| !id.trim().is_empty())
            .cloned()
            .ok_or_else(|| ExpressionError::missing_attribute(DEFINITION_TAG, ATT_ID))?;
        self.add_definition(&id, element);
        Ok(())
    }

    /// Register a definition element under `id`.
    pub fn add_definition(&self, id: &str, element: ConfigurationElement) {
        self.cache.remove(id);
        self.elements.insert(id.to_string(), Arc::new(element));
    }

    /// Register an already built expression under `id`.
    pub fn define(&self, id: &str, expression: ExpressionRef) {
        self.elements.remove(id);
        self.cache.insert(id.to_string(), expression);
    }

    /// The expression registered under `id`.
    pub fn expression(&self, id: &str) -> Result<ExpressionRef> {
        if let Some(cached) = self.cache.get(id) {
            return Ok(Arc::clone(cached.value()));
        }

        let element = self
            .elements
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| ExpressionError::DefinitionNotFound(id.to_string()))?;
        let child = element.children.first().ok_or_else(|| {
            ExpressionError::MissingExpression(format!("definition '{id}' has no expression"))
        })?;
        let expression = self.converter.perform(child)?;
        self.cache.insert(id.to_string(), Arc::clone(&expression));
        Ok(expression)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.elements.contains_key(id) || self.cache.contains_key(id)
    }

    pub fn remove_definition(&self, id: &str) -> bool {
        let element = self.elements.remove(id).is_some();
        let expression = self.cache.remove(id).is_some();
        element || expression
    }

    pub fn clear(&self) {
        self.elements.clear();
        self.cache.clear();
    }

    pub fn len(&self) -> usize {
        self.ids().len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty() && self.cache.is_empty()
    }

    /// Ids of all registered definitions, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .elements
            .iter()
            .map(|entry| entry.key().clone())
            .chain(self.cache.iter().map(|entry| entry.key().clone()))
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }
}
