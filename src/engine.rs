// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::context::EvaluationContext;
use crate::converter::{ConfigurationElement, ElementHandler, ElementNode, ExpressionConverter};
use crate::error::Result;
use crate::expression::{Expression, ExpressionRef};
use crate::extensions::PropertyTesterDescriptor;
use crate::platform::Platform;
use crate::result::EvaluationResult;
use crate::runtime::{Options, Runtime};
use crate::value::Value;

use std::sync::Arc;

/// The expression evaluation engine.
///
/// Cloning an engine is cheap; clones share the same runtime, and with it
/// the property cache and the definition registry.
#[derive(Clone, Debug)]
pub struct Engine {
    runtime: Arc<Runtime>,
}

impl Engine {
    /// Engine with default options and the standard element handler.
    pub fn new(platform: Platform) -> Self {
        Self {
            runtime: Arc::new(Runtime::with_platform(platform)),
        }
    }

    pub fn with_options(platform: Platform, options: Options) -> Result<Self> {
        Self::with_converter(platform, options, ExpressionConverter::default())
    }

    /// Engine whose converter asks `handlers` in order.
    pub fn with_handlers(
        platform: Platform,
        options: Options,
        handlers: Vec<Arc<dyn ElementHandler>>,
    ) -> Result<Self> {
        Self::with_converter(platform, options, ExpressionConverter::new(handlers))
    }

    fn with_converter(
        platform: Platform,
        options: Options,
        converter: ExpressionConverter,
    ) -> Result<Self> {
        Ok(Self {
            runtime: Arc::new(Runtime::new(platform, options, converter)?),
        })
    }

    pub fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }

    pub fn convert(&self, element: &dyn ElementNode) -> Result<ExpressionRef> {
        self.runtime.converter().perform(element)
    }

    pub fn convert_json(&self, json: &str) -> Result<ExpressionRef> {
        self.convert(&ConfigurationElement::from_json_str(json)?)
    }

    #[cfg(feature = "yaml")]
    pub fn convert_yaml(&self, yaml: &str) -> Result<ExpressionRef> {
        self.convert(&ConfigurationElement::from_yaml_str(yaml)?)
    }

    /// Root context bound to this engine.
    pub fn new_context(&self, default_variable: Value) -> EvaluationContext<'static> {
        EvaluationContext::root(self.runtime.clone(), default_variable)
    }

    /// Evaluate `expression` in a fresh root context.
    pub fn evaluate(
        &self,
        expression: &dyn Expression,
        default_variable: Value,
    ) -> Result<EvaluationResult> {
        expression.evaluate(&self.new_context(default_variable))
    }

    pub fn add_property_tester(&self, descriptor: PropertyTesterDescriptor) {
        self.runtime.type_extensions().add_property_tester(descriptor);
    }

    pub fn add_property_testers(
        &self,
        descriptors: impl IntoIterator<Item = PropertyTesterDescriptor>,
    ) {
        self.runtime.type_extensions().add_property_testers(descriptors);
    }

    /// Register the `<propertyTester>` children of an extension element.
    pub fn add_property_testers_from(&self, extension: &dyn ElementNode) -> Result<usize> {
        self.runtime
            .type_extensions()
            .add_property_testers_from(extension)
    }

    pub fn add_definition(&self, id: &str, element: ConfigurationElement) {
        self.runtime.definitions().add_definition(id, element);
    }

    /// Register a `<definition id="...">` element.
    pub fn add_definition_element(&self, element: ConfigurationElement) -> Result<()> {
        self.runtime.definitions().add_definition_element(element)
    }

    /// Flush the property cache after the host's contributions changed.
    pub fn registry_changed(&self) {
        self.runtime.type_extensions().registry_changed();
    }
}
