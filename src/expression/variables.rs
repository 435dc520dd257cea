// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::{
    equal_expressions, hash_of, hash_values, CompositeExpression, Expression, ExpressionRef,
    HashCode, HASH_FACTOR,
};
use crate::context::{Context, EvaluationContext};
use crate::converter::{arguments_of, check_attribute, ElementNode};
use crate::error::{ExpressionError, Result};
use crate::info::ExpressionInfo;
use crate::result::EvaluationResult;
use crate::value::Value;

use core::any::Any;

const ATT_VARIABLE: &str = "variable";
const ATT_ARGS: &str = "args";

/// Record the accesses of a subtree evaluated against a named variable.
///
/// Default-variable access inside the subtree is an access to `variable`.
fn collect_rebound(variable: &str, composite: &CompositeExpression, info: &mut ExpressionInfo) {
    let mut other = ExpressionInfo::new();
    composite.collect_expression_info(&mut other);
    if other.has_default_variable_access() {
        info.add_variable_name_access(variable);
    }
    info.merge_except_default_variable(&other);
}

/// `<with variable="name">`: evaluates the children against a named variable.
#[derive(Debug)]
pub struct WithExpression {
    variable: String,
    composite: CompositeExpression,
    hash: HashCode,
}

impl WithExpression {
    pub fn new(variable: &str) -> Self {
        Self {
            variable: variable.to_string(),
            composite: CompositeExpression::new(),
            hash: HashCode::default(),
        }
    }

    pub fn from_element(element: &dyn ElementNode) -> Result<Self> {
        Ok(Self::new(check_attribute(element, ATT_VARIABLE)?))
    }

    pub fn variable(&self) -> &str {
        &self.variable
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

impl Expression for WithExpression {
    fn evaluate(&self, context: &dyn Context) -> Result<EvaluationResult> {
        let variable = context
            .variable(&self.variable)
            .ok_or_else(|| ExpressionError::VariableNotDefined(self.variable.clone()))?;
        if variable.is_undefined() {
            return Ok(EvaluationResult::False);
        }
        self.composite
            .evaluate_and(&EvaluationContext::new(context, variable))
    }

    fn collect_expression_info(&self, info: &mut ExpressionInfo) {
        collect_rebound(&self.variable, &self.composite, info);
    }

    fn compute_hash_code(&self) -> u32 {
        hash_of(&(self.type_name(), &self.variable))
            .wrapping_mul(HASH_FACTOR)
            .wrapping_add(self.composite.compute_hash_code())
    }

    fn hash_cache(&self) -> Option<&HashCode> {
        Some(&self.hash)
    }

    fn equals(&self, other: &dyn Expression) -> bool {
        other.downcast_ref::<Self>().is_some_and(|o| {
            o.variable == self.variable && self.composite.equals(&o.composite)
        })
    }

    fn type_name(&self) -> &'static str {
        "WithExpression"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `<resolve variable="name" args="...">`: evaluates the children against a
/// variable computed by the context's resolvers.
#[derive(Debug)]
pub struct ResolveExpression {
    variable: String,
    args: Vec<Value>,
    composite: CompositeExpression,
    hash: HashCode,
}

impl ResolveExpression {
    pub fn new(variable: &str, args: Vec<Value>) -> Self {
        Self {
            variable: variable.to_string(),
            args,
            composite: CompositeExpression::new(),
            hash: HashCode::default(),
        }
    }

    pub fn from_element(element: &dyn ElementNode) -> Result<Self> {
        let variable = check_attribute(element, ATT_VARIABLE)?;
        Ok(Self::new(variable, arguments_of(element, ATT_ARGS)?))
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    pub fn args(&self) -> &[Value] {
        &self.args
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

impl Expression for ResolveExpression {
    fn evaluate(&self, context: &dyn Context) -> Result<EvaluationResult> {
        let variable = context
            .resolve_variable(&self.variable, &self.args)?
            .ok_or_else(|| ExpressionError::VariableNotResolved(self.variable.clone()))?;
        self.composite
            .evaluate_and(&EvaluationContext::new(context, variable))
    }

    fn collect_expression_info(&self, info: &mut ExpressionInfo) {
        collect_rebound(&self.variable, &self.composite, info);
    }

    fn compute_hash_code(&self) -> u32 {
        hash_of(&(self.type_name(), &self.variable))
            .wrapping_mul(HASH_FACTOR)
            .wrapping_add(hash_values(&self.args))
            .wrapping_mul(HASH_FACTOR)
            .wrapping_add(self.composite.compute_hash_code())
    }

    fn hash_cache(&self) -> Option<&HashCode> {
        Some(&self.hash)
    }

    fn equals(&self, other: &dyn Expression) -> bool {
        other.downcast_ref::<Self>().is_some_and(|o| {
            o.variable == self.variable
                && o.args == self.args
                && equal_expressions(self.children(), o.children())
        })
    }

    fn type_name(&self) -> &'static str {
        "ResolveExpression"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
