// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::{hash_of, Expression, HashCode, HASH_FACTOR};
use crate::context::Context;
use crate::converter::{check_attribute, convert_argument, ElementNode};
use crate::error::Result;
use crate::info::ExpressionInfo;
use crate::result::EvaluationResult;
use crate::value::Value;

use core::any::Any;

const ATT_PROPERTY: &str = "property";
const ATT_VALUE: &str = "value";

/// `<equals value="..."/>`: compares the default variable with a literal.
#[derive(Debug)]
pub struct EqualsExpression {
    expected_value: Value,
    hash: HashCode,
}

impl EqualsExpression {
    pub fn new(expected_value: Value) -> Self {
        Self {
            expected_value,
            hash: HashCode::default(),
        }
    }

    pub fn from_element(element: &dyn ElementNode) -> Result<Self> {
        let value = check_attribute(element, ATT_VALUE)?;
        Ok(Self::new(convert_argument(value)?))
    }

    pub fn expected_value(&self) -> &Value {
        &self.expected_value
    }
}

impl Expression for EqualsExpression {
    fn evaluate(&self, context: &dyn Context) -> Result<EvaluationResult> {
        let element = context.default_variable();
        Ok(EvaluationResult::value_of(self.expected_value == element))
    }

    fn collect_expression_info(&self, info: &mut ExpressionInfo) {
        info.mark_default_variable_accessed();
    }

    fn compute_hash_code(&self) -> u32 {
        hash_of(self.type_name())
            .wrapping_mul(HASH_FACTOR)
            .wrapping_add(hash_of(&self.expected_value))
    }

    fn hash_cache(&self) -> Option<&HashCode> {
        Some(&self.hash)
    }

    fn equals(&self, other: &dyn Expression) -> bool {
        other
            .downcast_ref::<Self>()
            .is_some_and(|o| o.expected_value == self.expected_value)
    }

    fn type_name(&self) -> &'static str {
        "EqualsExpression"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `<systemTest property="..." value="..."/>`: compares a system property
/// with a string.
#[derive(Debug)]
pub struct SystemTestExpression {
    property: String,
    expected_value: String,
    hash: HashCode,
}

impl SystemTestExpression {
    pub fn new(property: &str, expected_value: &str) -> Self {
        Self {
            property: property.to_string(),
            expected_value: expected_value.to_string(),
            hash: HashCode::default(),
        }
    }

    pub fn from_element(element: &dyn ElementNode) -> Result<Self> {
        let property = check_attribute(element, ATT_PROPERTY)?;
        let value = check_attribute(element, ATT_VALUE)?;
        Ok(Self::new(property, value))
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn expected_value(&self) -> &str {
        &self.expected_value
    }
}

impl Expression for SystemTestExpression {
    fn evaluate(&self, context: &dyn Context) -> Result<EvaluationResult> {
        let actual = context
            .runtime()
            .platform()
            .system_property(&self.property);
        Ok(match actual {
            Some(actual) if !actual.is_empty() => {
                EvaluationResult::value_of(actual == self.expected_value)
            }
            _ => EvaluationResult::False,
        })
    }

    fn collect_expression_info(&self, info: &mut ExpressionInfo) {
        info.mark_system_property_accessed();
    }

    fn compute_hash_code(&self) -> u32 {
        hash_of(&(self.type_name(), &self.property, &self.expected_value))
    }

    fn hash_cache(&self) -> Option<&HashCode> {
        Some(&self.hash)
    }

    fn equals(&self, other: &dyn Expression) -> bool {
        other.downcast_ref::<Self>().is_some_and(|o| {
            o.property == self.property && o.expected_value == self.expected_value
        })
    }

    fn type_name(&self) -> &'static str {
        "SystemTestExpression"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
