// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::BTreeSet;

/// Describes what an expression tree accesses when it is evaluated.
///
/// Hosts use this to decide when a cached evaluation result needs to be
/// recomputed: a tree that never touches the default variable does not
/// have to be re-evaluated when the selection changes, and so on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpressionInfo {
    has_default_variable_access: bool,
    has_system_property_access: bool,
    accessed_variable_names: BTreeSet<String>,
    accessed_property_names: BTreeSet<String>,
    misbehaving_expression_types: BTreeSet<String>,
}

impl ExpressionInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_default_variable_access(&self) -> bool {
        self.has_default_variable_access
    }

    pub fn mark_default_variable_accessed(&mut self) {
        self.has_default_variable_access = true;
    }

    pub fn has_system_property_access(&self) -> bool {
        self.has_system_property_access
    }

    pub fn mark_system_property_accessed(&mut self) {
        self.has_system_property_access = true;
    }

    pub fn accessed_variable_names(&self) -> &BTreeSet<String> {
        &self.accessed_variable_names
    }

    pub fn add_variable_name_access(&mut self, name: &str) {
        if !self.accessed_variable_names.contains(name) {
            self.accessed_variable_names.insert(name.to_string());
        }
    }

    /// Property names are recorded as `namespace.property`.
    pub fn accessed_property_names(&self) -> &BTreeSet<String> {
        &self.accessed_property_names
    }

    pub fn add_accessed_property_name(&mut self, name: &str) {
        if !self.accessed_property_names.contains(name) {
            self.accessed_property_names.insert(name.to_string());
        }
    }

    /// Expression types that did not report what they access.
    pub fn misbehaving_expression_types(&self) -> &BTreeSet<String> {
        &self.misbehaving_expression_types
    }

    pub fn add_misbehaving_expression_type(&mut self, type_name: &str) {
        if !self.misbehaving_expression_types.contains(type_name) {
            self.misbehaving_expression_types
                .insert(type_name.to_string());
        }
    }

    /// Merge `other` into this info.
    pub fn merge(&mut self, other: &ExpressionInfo) {
        self.merge_default_variable(other);
        self.merge_except_default_variable(other);
    }

    /// Merge everything but the default variable access of `other`.
    ///
    /// Used by nodes that rebind the default variable to a named variable:
    /// they record the named access themselves.
    pub fn merge_except_default_variable(&mut self, other: &ExpressionInfo) {
        self.has_system_property_access |= other.has_system_property_access;
        Self::merge_set(
            &mut self.accessed_variable_names,
            &other.accessed_variable_names,
        );
        Self::merge_set(
            &mut self.accessed_property_names,
            &other.accessed_property_names,
        );
        Self::merge_set(
            &mut self.misbehaving_expression_types,
            &other.misbehaving_expression_types,
        );
    }

    fn merge_default_variable(&mut self, other: &ExpressionInfo) {
        self.has_default_variable_access |= other.has_default_variable_access;
    }

    fn merge_set(target: &mut BTreeSet<String>, source: &BTreeSet<String>) {
        if source.is_empty() {
            return;
        }
        if target.is_empty() {
            target.clone_from(source);
        } else {
            target.extend(source.iter().cloned());
        }
    }
}
