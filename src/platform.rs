// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Host capabilities consumed by the expression engine.
//!
//! The engine never discovers types, adapters or contributions by itself.
//! The host describes them through the traits in this module and hands a
//! [`Platform`] to the engine. Simple table-backed implementations are
//! provided for hosts that configure everything up front.

use crate::value::Value;

use core::any::Any;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use parking_lot::RwLock;

/// Object created by the host for a contributed class name.
pub type ExecutableExtension = Box<dyn Any + Send + Sync>;

/// Factory producing an executable extension.
pub type ExtensionFactory = Arc<dyn Fn() -> ExecutableExtension + Send + Sync>;

/// Factory adapting a value to another type.
pub type AdapterFactory = Arc<dyn Fn(&Value) -> Option<Value> + Send + Sync>;

/// Type adapters must provide for a value to be counted.
pub const COUNTABLE_TYPE: &str = "ICountable";

/// Type adapters must provide for a value to be iterated.
pub const ITERABLE_TYPE: &str = "IIterable";

/// Receiver type whose `test` properties are read from system properties.
pub const PLATFORM_TYPE: &str = "Platform";

/// Availability of an adapter for a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterStatus {
    /// An adapter exists and its factory is loaded.
    Loaded,
    /// An adapter is declared but its factory has not been loaded yet.
    NotLoaded,
    /// No adapter is declared.
    None,
}

/// Inheritance information for runtime type names.
pub trait TypeHierarchy: Send + Sync {
    /// Direct supertypes of `type_name`, superclass first.
    fn super_types(&self, type_name: &str) -> Vec<String>;
}

/// Converts values into other types.
pub trait AdapterManager: Send + Sync {
    fn has_adapter(&self, adaptable: &Value, type_name: &str) -> bool;

    /// The adapted value, or `None` if no adapter is declared or its factory is not loaded.
    fn get_adapter(&self, adaptable: &Value, type_name: &str) -> Option<Value>;

    fn query_adapter(&self, adaptable: &Value, type_name: &str) -> AdapterStatus;
}

/// State of the components ("plugins") that contribute property testers.
pub trait ContributorRegistry: Send + Sync {
    fn is_active(&self, contributor: &str) -> bool;

    /// Create the object for a contributed class name.
    fn create_executable_extension(
        &self,
        contributor: &str,
        class: &str,
    ) -> Result<ExecutableExtension>;
}

/// Lookup of system/platform properties.
pub trait SystemProperties: Send + Sync {
    fn property(&self, name: &str) -> Option<String>;
}

/// Type hierarchy backed by a table of declared types.
#[derive(Debug, Default)]
pub struct TypeTable {
    super_types: RwLock<HashMap<String, Vec<String>>>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the direct supertypes of a type, replacing earlier declarations.
    pub fn declare(&self, type_name: &str, super_types: &[&str]) {
        self.super_types.write().insert(
            type_name.to_string(),
            super_types.iter().map(|s| s.to_string()).collect(),
        );
    }
}

impl TypeHierarchy for TypeTable {
    fn super_types(&self, type_name: &str) -> Vec<String> {
        self.super_types
            .read()
            .get(type_name)
            .cloned()
            .unwrap_or_default()
    }
}

#[derive(Clone)]
enum AdapterEntry {
    Loaded(AdapterFactory),
    Declared,
}

/// Adapter manager backed by factories registered per (value type, target type).
///
/// Lookups use the exact runtime type of the adaptable value.
#[derive(Default)]
pub struct AdapterTable {
    factories: RwLock<HashMap<(String, String), AdapterEntry>>,
}

impl AdapterTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a loaded adapter factory.
    pub fn register(&self, adaptable_type: &str, target_type: &str, factory: AdapterFactory) {
        self.factories.write().insert(
            (adaptable_type.to_string(), target_type.to_string()),
            AdapterEntry::Loaded(factory),
        );
    }

    /// Declare an adapter whose factory has not been loaded yet.
    pub fn declare(&self, adaptable_type: &str, target_type: &str) {
        self.factories.write().insert(
            (adaptable_type.to_string(), target_type.to_string()),
            AdapterEntry::Declared,
        );
    }

    fn entry(&self, adaptable: &Value, type_name: &str) -> Option<AdapterEntry> {
        self.factories
            .read()
            .get(&(adaptable.type_name().to_string(), type_name.to_string()))
            .cloned()
    }
}

impl AdapterManager for AdapterTable {
    fn has_adapter(&self, adaptable: &Value, type_name: &str) -> bool {
        self.entry(adaptable, type_name).is_some()
    }

    fn get_adapter(&self, adaptable: &Value, type_name: &str) -> Option<Value> {
        match self.entry(adaptable, type_name)? {
            AdapterEntry::Loaded(factory) => factory(adaptable),
            AdapterEntry::Declared => None,
        }
    }

    fn query_adapter(&self, adaptable: &Value, type_name: &str) -> AdapterStatus {
        match self.entry(adaptable, type_name) {
            Some(AdapterEntry::Loaded(_)) => AdapterStatus::Loaded,
            Some(AdapterEntry::Declared) => AdapterStatus::NotLoaded,
            None => AdapterStatus::None,
        }
    }
}

/// Contributor registry backed by a set of active contributors and
/// class factories.
#[derive(Default)]
pub struct ContributorTable {
    active: RwLock<HashSet<String>>,
    classes: RwLock<HashMap<String, ExtensionFactory>>,
}

impl ContributorTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn activate(&self, contributor: &str) {
        self.active.write().insert(contributor.to_string());
    }

    pub fn deactivate(&self, contributor: &str) {
        self.active.write().remove(contributor);
    }

    pub fn register_class(&self, class: &str, factory: ExtensionFactory) {
        self.classes.write().insert(class.to_string(), factory);
    }
}

impl ContributorRegistry for ContributorTable {
    fn is_active(&self, contributor: &str) -> bool {
        self.active.read().contains(contributor)
    }

    fn create_executable_extension(
        &self,
        contributor: &str,
        class: &str,
    ) -> Result<ExecutableExtension> {
        let factory = self
            .classes
            .read()
            .get(class)
            .cloned()
            .ok_or_else(|| anyhow!("class '{class}' not found in '{contributor}'"))?;
        Ok(factory())
    }
}

/// System properties backed by a map.
#[derive(Debug, Default)]
pub struct PropertyTable {
    properties: RwLock<HashMap<String, String>>,
}

impl PropertyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, name: &str, value: &str) {
        self.properties
            .write()
            .insert(name.to_string(), value.to_string());
    }

    pub fn remove(&self, name: &str) {
        self.properties.write().remove(name);
    }
}

impl SystemProperties for PropertyTable {
    fn property(&self, name: &str) -> Option<String> {
        self.properties.read().get(name).cloned()
    }
}

/// System properties read from the process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvironmentProperties;

impl SystemProperties for EnvironmentProperties {
    fn property(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// The set of host services the engine evaluates against.
#[derive(Clone)]
pub struct Platform {
    types: Arc<dyn TypeHierarchy>,
    adapters: Arc<dyn AdapterManager>,
    contributors: Arc<dyn ContributorRegistry>,
    properties: Arc<dyn SystemProperties>,
}

impl Default for Platform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform {
    /// A platform with no declared types, adapters, contributors or properties.
    pub fn new() -> Self {
        Self {
            types: Arc::new(TypeTable::new()),
            adapters: Arc::new(AdapterTable::new()),
            contributors: Arc::new(ContributorTable::new()),
            properties: Arc::new(PropertyTable::new()),
        }
    }

    pub fn with_type_hierarchy(mut self, types: Arc<dyn TypeHierarchy>) -> Self {
        self.types = types;
        self
    }

    pub fn with_adapter_manager(mut self, adapters: Arc<dyn AdapterManager>) -> Self {
        self.adapters = adapters;
        self
    }

    pub fn with_contributors(mut self, contributors: Arc<dyn ContributorRegistry>) -> Self {
        self.contributors = contributors;
        self
    }

    pub fn with_system_properties(mut self, properties: Arc<dyn SystemProperties>) -> Self {
        self.properties = properties;
        self
    }

    pub fn super_types(&self, type_name: &str) -> Vec<String> {
        self.types.super_types(type_name)
    }

    /// Whether `type_name` is `super_type` or inherits from it.
    pub fn is_subtype(&self, type_name: &str, super_type: &str) -> bool {
        let mut visited = BTreeSet::new();
        let mut queue = VecDeque::from([type_name.to_string()]);
        while let Some(current) = queue.pop_front() {
            if current == super_type {
                return true;
            }
            if visited.insert(current.clone()) {
                queue.extend(self.types.super_types(&current));
            }
        }
        false
    }

    /// Whether the runtime type of `value` is-a `type_name`.
    pub fn is_instance_of(&self, value: &Value, type_name: &str) -> bool {
        match value {
            Value::Null | Value::Undefined => false,
            _ => self.is_subtype(value.type_name(), type_name),
        }
    }

    pub fn adapter_manager(&self) -> &dyn AdapterManager {
        self.adapters.as_ref()
    }

    pub fn is_contributor_active(&self, contributor: &str) -> bool {
        self.contributors.is_active(contributor)
    }

    pub fn create_executable_extension(
        &self,
        contributor: &str,
        class: &str,
    ) -> Result<ExecutableExtension> {
        self.contributors
            .create_executable_extension(contributor, class)
    }

    pub fn system_property(&self, name: &str) -> Option<String> {
        self.properties.property(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_of_walks_the_hierarchy() {
        let types = Arc::new(TypeTable::new());
        types.declare("string", &["Object", "CharSequence"]);
        types.declare("CharSequence", &["Sequence"]);
        let platform = Platform::new().with_type_hierarchy(types);

        let value = Value::from("text");
        assert!(platform.is_instance_of(&value, "string"));
        assert!(platform.is_instance_of(&value, "Object"));
        assert!(platform.is_instance_of(&value, "Sequence"));
        assert!(!platform.is_instance_of(&value, "number"));
        assert!(!platform.is_instance_of(&Value::Null, "Object"));
    }

    #[test]
    fn cyclic_hierarchies_terminate() {
        let types = Arc::new(TypeTable::new());
        types.declare("A", &["B"]);
        types.declare("B", &["A"]);
        let platform = Platform::new().with_type_hierarchy(types);
        assert!(!platform.is_subtype("A", "C"));
    }

    #[test]
    fn adapter_table_states() {
        let adapters = AdapterTable::new();
        adapters.register(
            "string",
            "number",
            Arc::new(|v: &Value| v.as_string().ok().map(|s| Value::from(s.len()))),
        );
        adapters.declare("boolean", "number");

        let text = Value::from("four");
        assert_eq!(adapters.query_adapter(&text, "number"), AdapterStatus::Loaded);
        assert_eq!(adapters.get_adapter(&text, "number"), Some(Value::from(4u64)));

        let flag = Value::Bool(true);
        assert!(adapters.has_adapter(&flag, "number"));
        assert_eq!(adapters.get_adapter(&flag, "number"), None);
        assert_eq!(adapters.query_adapter(&flag, "number"), AdapterStatus::NotLoaded);
        assert_eq!(adapters.query_adapter(&Value::Null, "number"), AdapterStatus::None);
    }
}
