// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::{equal_expressions, hash_expressions, hash_of, Expression, ExpressionRef, HashCode};
use crate::context::Context;
use crate::error::Result;
use crate::info::ExpressionInfo;
use crate::result::EvaluationResult;

use core::any::Any;
use std::time::Instant;

/// Ordered children shared by every node that combines sub-expressions.
#[derive(Debug, Default)]
pub struct CompositeExpression {
    children: Vec<ExpressionRef>,
}

impl CompositeExpression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, expression: ExpressionRef) {
        self.children.push(expression);
    }

    pub fn children(&self) -> &[ExpressionRef] {
        &self.children
    }

    /// Conjunction of the children, stopping at the first `False`.
    ///
    /// `NotLoaded` does not stop the scan: a later `False` still wins.
    pub fn evaluate_and(&self, context: &dyn Context) -> Result<EvaluationResult> {
        let mut result = EvaluationResult::True;
        for child in &self.children {
            result = result.and(child.evaluate(context)?);
            if result == EvaluationResult::False {
                return Ok(result);
            }
        }
        Ok(result)
    }

    /// Disjunction of the children, stopping at the first `True`.
    ///
    /// A composite without children is `True`.
    pub fn evaluate_or(&self, context: &dyn Context) -> Result<EvaluationResult> {
        if self.children.is_empty() {
            return Ok(EvaluationResult::True);
        }
        let mut result = EvaluationResult::False;
        for child in &self.children {
            result = result.or(child.evaluate(context)?);
            if result == EvaluationResult::True {
                return Ok(result);
            }
        }
        Ok(result)
    }

    pub fn collect_expression_info(&self, info: &mut ExpressionInfo) {
        for child in &self.children {
            child.collect_expression_info(info);
        }
    }

    pub fn compute_hash_code(&self) -> u32 {
        hash_expressions(&self.children)
    }

    pub fn equals(&self, other: &CompositeExpression) -> bool {
        equal_expressions(&self.children, &other.children)
    }
}

macro_rules! composite_node {
    ($(#[$meta:meta])* $name:ident, $evaluate:ident) => {
        $(#[$meta])*
        #[derive(Debug, Default)]
        pub struct $name {
            composite: CompositeExpression,
            hash: HashCode,
        }

        impl $name {
            pub fn new() -> Self {
                Self::default()
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

        impl Expression for $name {
            fn evaluate(&self, context: &dyn Context) -> Result<EvaluationResult> {
                self.composite.$evaluate(context)
            }

            fn collect_expression_info(&self, info: &mut ExpressionInfo) {
                self.composite.collect_expression_info(info);
            }

            fn compute_hash_code(&self) -> u32 {
                hash_of(stringify!($name)).wrapping_add(self.composite.compute_hash_code())
            }

            fn hash_cache(&self) -> Option<&HashCode> {
                Some(&self.hash)
            }

            fn equals(&self, other: &dyn Expression) -> bool {
                other
                    .downcast_ref::<Self>()
                    .is_some_and(|o| self.composite.equals(&o.composite))
            }

            fn type_name(&self) -> &'static str {
                stringify!($name)
            }

            fn as_any(&self) -> &dyn Any {
                self
            }
        }
    };
}

composite_node!(
    /// `<and>`: conjunction of the children.
    AndExpression,
    evaluate_and
);

composite_node!(
    /// `<or>`: disjunction of the children.
    OrExpression,
    evaluate_or
);

/// `<not>`: negation of exactly one child.
#[derive(Debug)]
pub struct NotExpression {
    expression: ExpressionRef,
    hash: HashCode,
}

impl NotExpression {
    pub fn new(expression: ExpressionRef) -> Self {
        Self {
            expression,
            hash: HashCode::default(),
        }
    }

    pub fn expression(&self) -> &ExpressionRef {
        &self.expression
    }
}

impl Expression for NotExpression {
    fn evaluate(&self, context: &dyn Context) -> Result<EvaluationResult> {
        Ok(self.expression.evaluate(context)?.not())
    }

    fn collect_expression_info(&self, info: &mut ExpressionInfo) {
        self.expression.collect_expression_info(info);
    }

    fn compute_hash_code(&self) -> u32 {
        hash_of(self.type_name())
            .wrapping_mul(super::HASH_FACTOR)
            .wrapping_add(self.expression.hash_code())
    }

    fn hash_cache(&self) -> Option<&HashCode> {
        Some(&self.hash)
    }

    fn equals(&self, other: &dyn Expression) -> bool {
        other
            .downcast_ref::<Self>()
            .is_some_and(|o| self.expression.equals(o.expression.as_ref()))
    }

    fn type_name(&self) -> &'static str {
        "NotExpression"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `<enablement>`: root of an enablement condition, a conjunction of the children.
#[derive(Debug, Default)]
pub struct EnablementExpression {
    composite: CompositeExpression,
    hash: HashCode,
}

impl EnablementExpression {
    pub fn new() -> Self {
        Self::default()
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

impl Expression for EnablementExpression {
    fn evaluate(&self, context: &dyn Context) -> Result<EvaluationResult> {
        if !context.runtime().options().trace_evaluation {
            return self.composite.evaluate_and(context);
        }
        let start = Instant::now();
        let result = self.composite.evaluate_and(context);
        log::debug!(
            "enablement evaluated to {} in {:?}",
            result
                .as_ref()
                .map(|r| r.to_string())
                .unwrap_or_else(|e| format!("error ({e})")),
            start.elapsed()
        );
        result
    }

    fn collect_expression_info(&self, info: &mut ExpressionInfo) {
        self.composite.collect_expression_info(info);
    }

    fn compute_hash_code(&self) -> u32 {
        hash_of(self.type_name()).wrapping_add(self.composite.compute_hash_code())
    }

    fn hash_cache(&self) -> Option<&HashCode> {
        Some(&self.hash)
    }

    fn equals(&self, other: &dyn Expression) -> bool {
        other
            .downcast_ref::<Self>()
            .is_some_and(|o| self.composite.equals(&o.composite))
    }

    fn type_name(&self) -> &'static str {
        "EnablementExpression"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
