// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::{hash_of, hash_values, Expression, HashCode, HASH_FACTOR};
use crate::context::Context;
use crate::converter::{
    arguments_of, check_attribute, convert_argument, optional_boolean_attribute, ElementNode,
};
use crate::error::{ExpressionError, Result};
use crate::info::ExpressionInfo;
use crate::platform::PLATFORM_TYPE;
use crate::result::EvaluationResult;
use crate::value::Value;

use core::any::Any;

const ATT_PROPERTY: &str = "property";
const ATT_ARGS: &str = "args";
const ATT_VALUE: &str = "value";
const ATT_FORCE_PLUGIN_ACTIVATION: &str = "forcePluginActivation";

/// `<test property="namespace.name" args="..." value="..."/>`: asks a
/// contributed property tester about the default variable.
#[derive(Debug)]
pub struct TestExpression {
    namespace: String,
    property: String,
    args: Vec<Value>,
    expected_value: Option<Value>,
    force_plugin_activation: bool,
    hash: HashCode,
}

impl TestExpression {
    pub fn new(
        namespace: &str,
        property: &str,
        args: Vec<Value>,
        expected_value: Option<Value>,
        force_plugin_activation: bool,
    ) -> Self {
        Self {
            namespace: namespace.to_string(),
            property: property.to_string(),
            args,
            expected_value,
            force_plugin_activation,
            hash: HashCode::default(),
        }
    }

    pub fn from_element(element: &dyn ElementNode) -> Result<Self> {
        let qualified = check_attribute(element, ATT_PROPERTY)?;
        let (namespace, property) = qualified
            .rsplit_once('.')
            .ok_or_else(|| ExpressionError::NoNamespaceProvided(qualified.to_string()))?;
        let args = arguments_of(element, ATT_ARGS)?;
        let expected_value = match element.attribute(ATT_VALUE) {
            Some(value) => Some(convert_argument(value)?),
            None => None,
        };
        let force = optional_boolean_attribute(element, ATT_FORCE_PLUGIN_ACTIVATION);
        Ok(Self::new(namespace, property, args, expected_value, force))
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn expected_value(&self) -> Option<&Value> {
        self.expected_value.as_ref()
    }

    pub fn force_plugin_activation(&self) -> bool {
        self.force_plugin_activation
    }

    /// `Platform` receivers answer from the system properties.
    fn test_platform_property(&self, context: &dyn Context) -> EvaluationResult {
        let actual = context
            .runtime()
            .platform()
            .system_property(&self.property);
        match (actual, self.args.first()) {
            (Some(actual), Some(Value::String(expected))) => {
                EvaluationResult::value_of(actual.as_str() == expected.as_ref())
            }
            _ => EvaluationResult::False,
        }
    }
}

impl Expression for TestExpression {
    fn evaluate(&self, context: &dyn Context) -> Result<EvaluationResult> {
        let element = context.default_variable();
        if matches!(&element, Value::Type(t) if t.as_ref() == PLATFORM_TYPE) {
            return Ok(self.test_platform_property(context));
        }

        let force = context.allow_plugin_activation() && self.force_plugin_activation;
        let property = context.runtime().type_extensions().property(
            &element,
            &self.namespace,
            &self.property,
            force,
        )?;
        if !property.is_instantiated() {
            return Ok(EvaluationResult::NotLoaded);
        }
        let result = property.test(&element, &self.args, self.expected_value.as_ref())?;
        Ok(EvaluationResult::value_of(result))
    }

    fn collect_expression_info(&self, info: &mut ExpressionInfo) {
        info.mark_default_variable_accessed();
        info.add_accessed_property_name(&format!("{}.{}", self.namespace, self.property));
    }

    fn compute_hash_code(&self) -> u32 {
        hash_of(&(
            self.type_name(),
            &self.namespace,
            &self.property,
            &self.expected_value,
            self.force_plugin_activation,
        ))
        .wrapping_mul(HASH_FACTOR)
        .wrapping_add(hash_values(&self.args))
    }

    fn hash_cache(&self) -> Option<&HashCode> {
        Some(&self.hash)
    }

    fn equals(&self, other: &dyn Expression) -> bool {
        other.downcast_ref::<Self>().is_some_and(|o| {
            o.namespace == self.namespace
                && o.property == self.property
                && o.force_plugin_activation == self.force_plugin_activation
                && o.expected_value == self.expected_value
                && o.args == self.args
        })
    }

    fn type_name(&self) -> &'static str {
        "TestExpression"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
