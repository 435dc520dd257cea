// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::converter::{check_attribute, ElementNode};
use crate::error::{ExpressionError, Result};
use crate::platform::{ExecutableExtension, Platform};
use crate::value::Value;

use core::fmt;
use std::sync::Arc;

const ATT_ID: &str = "id";
const ATT_TYPE: &str = "type";
const ATT_NAMESPACE: &str = "namespace";
const ATT_PROPERTIES: &str = "properties";
const ATT_CLASS: &str = "class";
const ATT_CONTRIBUTOR: &str = "contributor";

/// Answers property questions about receivers of one type.
pub trait PropertyTester: Send + Sync {
    /// Whether `property` of `receiver` matches `expected_value`, given `args`.
    fn test(
        &self,
        receiver: &Value,
        property: &str,
        args: &[Value],
        expected_value: Option<&Value>,
    ) -> bool;
}

/// Wrap a tester so a host can return it from
/// [`ContributorRegistry::create_executable_extension`](crate::platform::ContributorRegistry::create_executable_extension).
pub fn executable_tester<T: PropertyTester + 'static>(tester: T) -> ExecutableExtension {
    Box::new(Arc::new(tester) as Arc<dyn PropertyTester>)
}

/// Declaration of a property tester contributed by a component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyTesterDescriptor {
    id: String,
    type_name: String,
    namespace: String,
    properties: String,
    class: String,
    contributor: String,
}

impl PropertyTesterDescriptor {
    pub fn new(
        id: &str,
        type_name: &str,
        namespace: &str,
        properties: &str,
        class: &str,
        contributor: &str,
    ) -> Self {
        Self {
            id: id.to_string(),
            type_name: type_name.to_string(),
            namespace: namespace.to_string(),
            properties: normalize_properties(properties),
            class: class.to_string(),
            contributor: contributor.to_string(),
        }
    }

    /// Read a `<propertyTester>` element. The contributor comes from the
    /// element itself, else from `fallback_contributor`.
    pub fn from_element(element: &dyn ElementNode, fallback_contributor: Option<&str>) -> Result<Self> {
        let contributor = element
            .contributor()
            .or(fallback_contributor)
            .ok_or_else(|| ExpressionError::missing_attribute(element.name(), ATT_CONTRIBUTOR))?;
        Ok(Self::new(
            check_attribute(element, ATT_ID)?,
            check_attribute(element, ATT_TYPE)?,
            check_attribute(element, ATT_NAMESPACE)?,
            check_attribute(element, ATT_PROPERTIES)?,
            check_attribute(element, ATT_CLASS)?,
            contributor,
        ))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn contributor(&self) -> &str {
        &self.contributor
    }

    pub fn properties(&self) -> Vec<&str> {
        self.properties
            .split(',')
            .filter(|p| !p.is_empty())
            .collect()
    }

    pub fn handles(&self, namespace: &str, property: &str) -> bool {
        self.namespace == namespace
            && self.properties.contains(&format!(",{property},"))
    }
}

/// `,a,b,` with whitespace removed, so membership is a substring search.
fn normalize_properties(properties: &str) -> String {
    let mut result = String::with_capacity(properties.len() + 2);
    result.push(',');
    result.extend(properties.chars().filter(|c| !c.is_whitespace()));
    result.push(',');
    result
}

/// A property tester that is either only declared or already instantiated.
#[derive(Clone)]
pub enum TesterHandle {
    Descriptor(Arc<PropertyTesterDescriptor>),
    Instance {
        descriptor: Arc<PropertyTesterDescriptor>,
        tester: Arc<dyn PropertyTester>,
    },
}

impl fmt::Debug for TesterHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TesterHandle::Descriptor(d) => f.debug_tuple("Descriptor").field(&d.id).finish(),
            TesterHandle::Instance { descriptor, .. } => {
                f.debug_tuple("Instance").field(&descriptor.id).finish()
            }
        }
    }
}

impl TesterHandle {
    pub fn descriptor(&self) -> &Arc<PropertyTesterDescriptor> {
        match self {
            TesterHandle::Descriptor(descriptor) | TesterHandle::Instance { descriptor, .. } => {
                descriptor
            }
        }
    }

    pub fn handles(&self, namespace: &str, property: &str) -> bool {
        self.descriptor().handles(namespace, property)
    }

    pub fn is_instantiated(&self) -> bool {
        matches!(self, TesterHandle::Instance { .. })
    }

    pub fn is_declaring_plugin_active(&self, platform: &Platform) -> bool {
        platform.is_contributor_active(&self.descriptor().contributor)
    }

    /// Ask the host to create the tester class.
    pub fn instantiate(&self, platform: &Platform) -> Result<TesterHandle> {
        let descriptor = self.descriptor();
        if let TesterHandle::Instance { .. } = self {
            return Ok(self.clone());
        }
        let extension = platform
            .create_executable_extension(&descriptor.contributor, &descriptor.class)
            .map_err(|source| ExpressionError::ExtensionCreation {
                class: descriptor.class.clone(),
                contributor: descriptor.contributor.clone(),
                source,
            })?;
        let tester = extension
            .downcast::<Arc<dyn PropertyTester>>()
            .map_err(|_| ExpressionError::IncorrectTesterType {
                class: descriptor.class.clone(),
                contributor: descriptor.contributor.clone(),
            })?;
        Ok(TesterHandle::Instance {
            descriptor: descriptor.clone(),
            tester: *tester,
        })
    }

    pub fn test(
        &self,
        receiver: &Value,
        property: &str,
        args: &[Value],
        expected_value: Option<&Value>,
    ) -> Result<bool> {
        match self {
            TesterHandle::Instance { tester, .. } => {
                Ok(tester.test(receiver, property, args, expected_value))
            }
            TesterHandle::Descriptor(descriptor) => {
                Err(ExpressionError::TesterNotLoaded(descriptor.id.clone()))
            }
        }
    }
}
