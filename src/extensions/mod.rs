// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Property testers contributed to types, and their resolution.

mod property;
mod tester;
mod type_extension;

pub use property::{Property, PropertyCache, PropertyKey};
pub use tester::{executable_tester, PropertyTester, PropertyTesterDescriptor, TesterHandle};

use type_extension::{TesterLookup, TypeExtension};

use crate::converter::ElementNode;
use crate::error::{ExpressionError, Result};
use crate::platform::Platform;
use crate::runtime::Options;
use crate::value::Value;

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

const PROPERTY_TESTER_TAG: &str = "propertyTester";

/// Resolves `namespace.property` on a receiver to the tester that handles it.
///
/// Resolutions are kept in an LRU cache. Cache entries whose tester state no
/// longer matches the contributor state are re-resolved.
pub struct TypeExtensionManager {
    platform: Arc<Platform>,
    trace: bool,
    testers: RwLock<HashMap<String, Vec<Arc<PropertyTesterDescriptor>>>>,
    type_extensions: Mutex<HashMap<Arc<str>, Arc<TypeExtension>>>,
    cache: Mutex<PropertyCache>,
    capacity: NonZeroUsize,
}

impl TypeExtensionManager {
    pub fn new(platform: Arc<Platform>, options: &Options) -> Self {
        let capacity = NonZeroUsize::new(options.property_cache_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            platform,
            trace: options.trace_property_resolving,
            testers: RwLock::new(HashMap::new()),
            type_extensions: Mutex::new(HashMap::new()),
            cache: Mutex::new(PropertyCache::new(capacity)),
            capacity,
        }
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    pub(crate) fn trace(&self, message: impl FnOnce() -> String) {
        if self.trace {
            log::debug!("{}", message());
        }
    }

    /// Resolve a property of `receiver`.
    ///
    /// A `Value::Type` receiver is static: only testers contributed to that
    /// type itself are considered.
    pub fn property(
        &self,
        receiver: &Value,
        namespace: &str,
        property: &str,
        force_plugin_activation: bool,
    ) -> Result<Arc<Property>> {
        let (type_name, static_receiver): (Arc<str>, bool) = match receiver {
            Value::Type(t) => (t.clone(), true),
            other => (Arc::from(other.type_name()), false),
        };
        let key = PropertyKey::new(type_name.clone(), namespace, property);

        {
            let mut cache = self.cache.lock();
            if let Some(cached) = cache.get(&key) {
                if cached.is_valid_cache_entry(force_plugin_activation, &self.platform) {
                    self.trace(|| format!("cache hit for {type_name}: {namespace}.{property}"));
                    return Ok(cached);
                }
                cache.remove(&key);
            }
        }
        self.trace(|| format!("cache miss for {type_name}: {namespace}.{property}"));

        let extension = self.type_extension(&type_name);
        let tester = match extension.find_type_extender(
            self,
            namespace,
            property,
            static_receiver,
            force_plugin_activation,
        )? {
            TesterLookup::Found(tester) => tester,
            TesterLookup::Continue | TesterLookup::Exhausted => {
                return Err(ExpressionError::UnknownProperty {
                    namespace: namespace.to_string(),
                    property: property.to_string(),
                    type_name: type_name.to_string(),
                })
            }
        };

        let result = Arc::new(Property::new(key, tester));
        self.cache.lock().put(result.clone());
        Ok(result)
    }

    pub fn add_property_tester(&self, descriptor: PropertyTesterDescriptor) {
        self.add_property_testers([descriptor]);
    }

    pub fn add_property_testers(&self, descriptors: impl IntoIterator<Item = PropertyTesterDescriptor>) {
        {
            let mut testers = self.testers.write();
            for descriptor in descriptors {
                testers
                    .entry(descriptor.type_name().to_string())
                    .or_default()
                    .push(Arc::new(descriptor));
            }
        }
        self.registry_changed();
    }

    /// Register the `<propertyTester>` children of an extension element.
    /// Children without a contributor inherit the extension's.
    pub fn add_property_testers_from(&self, extension: &dyn ElementNode) -> Result<usize> {
        let descriptors = extension
            .children()
            .iter()
            .filter(|c| c.name() == PROPERTY_TESTER_TAG)
            .map(|c| PropertyTesterDescriptor::from_element(c.as_ref(), extension.contributor()))
            .collect::<Result<Vec<_>>>()?;
        let count = descriptors.len();
        self.add_property_testers(descriptors);
        Ok(count)
    }

    /// Drop every tester contributed by `contributor`.
    pub fn remove_contributor(&self, contributor: &str) -> usize {
        let mut removed = 0;
        {
            let mut testers = self.testers.write();
            for descriptors in testers.values_mut() {
                let before = descriptors.len();
                descriptors.retain(|d| d.contributor() != contributor);
                removed += before - descriptors.len();
            }
            testers.retain(|_, descriptors| !descriptors.is_empty());
        }
        self.registry_changed();
        removed
    }

    /// Forget all loaded type extensions and cached properties.
    pub fn registry_changed(&self) {
        self.type_extensions.lock().clear();
        self.cache.lock().clear();
        log::info!("property tester registry changed; caches flushed");
    }

    pub fn cached_properties(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn cache_capacity(&self) -> usize {
        self.capacity.get()
    }

    pub(crate) fn type_extension(&self, type_name: &str) -> Arc<TypeExtension> {
        let mut extensions = self.type_extensions.lock();
        if let Some(extension) = extensions.get(type_name) {
            return extension.clone();
        }
        let type_name: Arc<str> = Arc::from(type_name);
        let extension = Arc::new(TypeExtension::new(type_name.clone()));
        extensions.insert(type_name, extension.clone());
        extension
    }

    pub(crate) fn load_testers(&self, type_name: &str) -> Vec<Option<TesterHandle>> {
        self.testers
            .read()
            .get(type_name)
            .map(|descriptors| {
                descriptors
                    .iter()
                    .map(|d| Some(TesterHandle::Descriptor(d.clone())))
                    .collect()
            })
            .unwrap_or_default()
    }
}
