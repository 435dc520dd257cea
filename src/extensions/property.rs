// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::tester::TesterHandle;
use crate::error::Result;
use crate::platform::Platform;
use crate::value::Value;

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;

/// Identity of a resolved property: receiver type, namespace and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyKey {
    type_name: Arc<str>,
    namespace: String,
    name: String,
}

impl PropertyKey {
    pub fn new(type_name: Arc<str>, namespace: &str, name: &str) -> Self {
        Self {
            type_name,
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }
}

/// A property resolved to the tester that handles it.
#[derive(Debug)]
pub struct Property {
    key: PropertyKey,
    tester: TesterHandle,
}

impl Property {
    pub(crate) fn new(key: PropertyKey, tester: TesterHandle) -> Self {
        Self { key, tester }
    }

    pub fn key(&self) -> &PropertyKey {
        &self.key
    }

    pub fn type_name(&self) -> &str {
        &self.key.type_name
    }

    pub fn namespace(&self) -> &str {
        &self.key.namespace
    }

    pub fn name(&self) -> &str {
        &self.key.name
    }

    pub fn tester(&self) -> &TesterHandle {
        &self.tester
    }

    pub fn is_instantiated(&self) -> bool {
        self.tester.is_instantiated()
    }

    pub fn is_declaring_plugin_active(&self, platform: &Platform) -> bool {
        self.tester.is_declaring_plugin_active(platform)
    }

    /// Whether a cached resolution can still be used.
    ///
    /// A forced lookup needs a live instance. Otherwise the entry must still
    /// agree with the contributor state: instantiated testers need an active
    /// contributor, descriptors an inactive one.
    pub fn is_valid_cache_entry(&self, force_plugin_activation: bool, platform: &Platform) -> bool {
        let instantiated = self.is_instantiated();
        let active = self.is_declaring_plugin_active(platform);
        if force_plugin_activation {
            instantiated && active
        } else {
            (instantiated && active) || (!instantiated && !active)
        }
    }

    pub fn test(&self, receiver: &Value, args: &[Value], expected_value: Option<&Value>) -> Result<bool> {
        self.tester
            .test(receiver, &self.key.name, args, expected_value)
    }
}

/// Bounded least-recently-used cache of resolved properties.
pub struct PropertyCache {
    cache: LruCache<PropertyKey, Arc<Property>>,
}

impl PropertyCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            cache: LruCache::new(capacity),
        }
    }

    pub fn get(&mut self, key: &PropertyKey) -> Option<Arc<Property>> {
        self.cache.get(key).cloned()
    }

    pub fn put(&mut self, property: Arc<Property>) {
        self.cache.put(property.key.clone(), property);
    }

    pub fn remove(&mut self, key: &PropertyKey) {
        self.cache.pop(key);
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
