// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::tester::TesterHandle;
use super::TypeExtensionManager;
use crate::error::Result;

use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

/// Outcome of searching the testers of a type hierarchy.
#[derive(Debug, Clone)]
pub(crate) enum TesterLookup {
    Found(TesterHandle),
    /// Nothing in this type; keep searching its supertypes.
    Continue,
    /// Nothing in the searched hierarchy.
    Exhausted,
}

/// The testers contributed to one type, and links to its supertypes.
///
/// Tester slots are loaded on first use. A slot is replaced by its instance
/// once instantiated and is cleared when instantiation fails. Instances live
/// until the registry changes.
pub(crate) struct TypeExtension {
    type_name: Arc<str>,
    extenders: Mutex<Option<Vec<Option<TesterHandle>>>>,
    super_types: OnceLock<Vec<Arc<TypeExtension>>>,
}

impl TypeExtension {
    pub(crate) fn new(type_name: Arc<str>) -> Self {
        Self {
            type_name,
            extenders: Mutex::new(None),
            super_types: OnceLock::new(),
        }
    }

    /// Search this type, then unless `static_receiver` its supertypes depth-first.
    pub(crate) fn find_type_extender(
        &self,
        manager: &TypeExtensionManager,
        namespace: &str,
        property: &str,
        static_receiver: bool,
        force_plugin_activation: bool,
    ) -> Result<TesterLookup> {
        if let TesterLookup::Found(tester) =
            self.find_local(manager, namespace, property, force_plugin_activation)?
        {
            return Ok(TesterLookup::Found(tester));
        }
        if static_receiver {
            return Ok(TesterLookup::Exhausted);
        }
        for super_type in self.super_types(manager) {
            if let TesterLookup::Found(tester) = super_type.find_type_extender(
                manager,
                namespace,
                property,
                false,
                force_plugin_activation,
            )? {
                return Ok(TesterLookup::Found(tester));
            }
        }
        Ok(TesterLookup::Exhausted)
    }

    fn find_local(
        &self,
        manager: &TypeExtensionManager,
        namespace: &str,
        property: &str,
        force_plugin_activation: bool,
    ) -> Result<TesterLookup> {
        let platform = manager.platform();
        let mut extenders = self.extenders.lock();
        let slots = extenders.get_or_insert_with(|| manager.load_testers(&self.type_name));

        for slot in slots.iter_mut() {
            let extender = match slot {
                Some(extender) if extender.handles(namespace, property) => extender.clone(),
                _ => continue,
            };

            if extender.is_instantiated() {
                return Ok(TesterLookup::Found(extender));
            }

            if force_plugin_activation || extender.is_declaring_plugin_active(platform) {
                return match extender.instantiate(platform) {
                    Ok(instance) => {
                        manager.trace(|| {
                            format!("instantiated tester {}", instance.descriptor().id())
                        });
                        *slot = Some(instance.clone());
                        Ok(TesterLookup::Found(instance))
                    }
                    Err(error) => {
                        *slot = None;
                        log::warn!(
                            "could not instantiate tester {}: {error}",
                            extender.descriptor().id()
                        );
                        Err(error)
                    }
                };
            }

            return Ok(TesterLookup::Found(extender));
        }
        Ok(TesterLookup::Continue)
    }

    fn super_types(&self, manager: &TypeExtensionManager) -> &[Arc<TypeExtension>] {
        self.super_types.get_or_init(|| {
            manager
                .platform()
                .super_types(&self.type_name)
                .iter()
                .map(|name| manager.type_extension(name))
                .collect()
        })
    }
}
