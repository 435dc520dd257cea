// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::{hash_of, CompositeExpression, Expression, ExpressionRef, HashCode, HASH_FACTOR};
use crate::context::{Context, DefaultVariable};
use crate::converter::{check_attribute, ElementNode};
use crate::error::Result;
use crate::info::ExpressionInfo;
use crate::platform::AdapterStatus;
use crate::result::EvaluationResult;

use core::any::Any;

const ATT_TYPE: &str = "type";
const ATT_VALUE: &str = "value";

/// `<instanceof value="Type"/>`: checks the runtime type of the default variable.
#[derive(Debug)]
pub struct InstanceofExpression {
    type_name: String,
    hash: HashCode,
}

impl InstanceofExpression {
    pub fn new(type_name: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            hash: HashCode::default(),
        }
    }

    pub fn from_element(element: &dyn ElementNode) -> Result<Self> {
        Ok(Self::new(check_attribute(element, ATT_VALUE)?))
    }

    pub fn value_type(&self) -> &str {
        &self.type_name
    }
}

impl Expression for InstanceofExpression {
    fn evaluate(&self, context: &dyn Context) -> Result<EvaluationResult> {
        let element = context.default_variable();
        let platform = context.runtime().platform();
        Ok(EvaluationResult::value_of(
            platform.is_instance_of(&element, &self.type_name),
        ))
    }

    fn collect_expression_info(&self, info: &mut ExpressionInfo) {
        info.mark_default_variable_accessed();
    }

    fn compute_hash_code(&self) -> u32 {
        hash_of(self.type_name())
            .wrapping_mul(HASH_FACTOR)
            .wrapping_add(hash_of(&self.type_name))
    }

    fn hash_cache(&self) -> Option<&HashCode> {
        Some(&self.hash)
    }

    fn equals(&self, other: &dyn Expression) -> bool {
        other
            .downcast_ref::<Self>()
            .is_some_and(|o| o.type_name == self.type_name)
    }

    fn type_name(&self) -> &'static str {
        "InstanceofExpression"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `<adapt type="Type">`: adapts the default variable and evaluates the
/// children against the adapted value.
#[derive(Debug)]
pub struct AdaptExpression {
    type_name: String,
    composite: CompositeExpression,
    hash: HashCode,
}

impl AdaptExpression {
    pub fn new(type_name: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            composite: CompositeExpression::new(),
            hash: HashCode::default(),
        }
    }

    pub fn from_element(element: &dyn ElementNode) -> Result<Self> {
        Ok(Self::new(check_attribute(element, ATT_TYPE)?))
    }

    pub fn target_type(&self) -> &str {
        &self.type_name
    }

    pub fn add(&mut self, expression: ExpressionRef) {
        self.composite.add(expression);
    }

    pub fn children(&self) -> &[ExpressionRef] {
        self.composite.children()
    }

    pub(crate) fn composite_mut(&mut self) -> &mut CompositeExpression {
        &mut self.composite
    }
}

impl Expression for AdaptExpression {
    fn evaluate(&self, context: &dyn Context) -> Result<EvaluationResult> {
        let element = context.default_variable();
        let platform = context.runtime().platform();
        let manager = platform.adapter_manager();

        let adapted = if platform.is_instance_of(&element, &self.type_name) {
            Some(element.clone())
        } else {
            if !manager.has_adapter(&element, &self.type_name) {
                return Ok(EvaluationResult::False);
            }
            manager.get_adapter(&element, &self.type_name)
        };

        match adapted {
            Some(adapted) => self
                .composite
                .evaluate_and(&DefaultVariable::new(context, adapted)),
            None => match manager.query_adapter(&element, &self.type_name) {
                AdapterStatus::NotLoaded => Ok(EvaluationResult::NotLoaded),
                _ => Ok(EvaluationResult::False),
            },
        }
    }

    fn collect_expression_info(&self, info: &mut ExpressionInfo) {
        info.mark_default_variable_accessed();
        self.composite.collect_expression_info(info);
    }

    fn compute_hash_code(&self) -> u32 {
        hash_of(&(self.type_name(), &self.type_name))
            .wrapping_mul(HASH_FACTOR)
            .wrapping_add(self.composite.compute_hash_code())
    }

    fn hash_cache(&self) -> Option<&HashCode> {
        Some(&self.hash)
    }

    fn equals(&self, other: &dyn Expression) -> bool {
        other.downcast_ref::<Self>().is_some_and(|o| {
            o.type_name == self.type_name && self.composite.equals(&o.composite)
        })
    }

    fn type_name(&self) -> &'static str {
        "AdaptExpression"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
