// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::{hash_of, CompositeExpression, Expression, ExpressionRef, HashCode, HASH_FACTOR};
use crate::context::{Context, DefaultVariable, IteratePool};
use crate::converter::{check_attribute_values, ElementNode};
use crate::error::{ExpressionError, Result};
use crate::info::ExpressionInfo;
use crate::platform::{AdapterStatus, COUNTABLE_TYPE, ITERABLE_TYPE};
use crate::result::EvaluationResult;
use crate::value::Value;

use core::any::Any;

const ATT_VALUE: &str = "value";
const ATT_OPERATOR: &str = "operator";
const ATT_IF_EMPTY: &str = "ifEmpty";

/// Adapt a non-collection value to `target` and read it with `read`.
///
/// `Ok(None)` means the adapter is declared but not loaded yet.
fn adapt_collection<T>(
    context: &dyn Context,
    element: &Value,
    target: &str,
    read: impl Fn(&Value) -> Option<T>,
) -> Result<Option<T>> {
    let manager = context.runtime().platform().adapter_manager();
    if let Some(adapted) = manager.get_adapter(element, target) {
        if let Some(result) = read(&adapted) {
            return Ok(Some(result));
        }
    } else if manager.query_adapter(element, target) == AdapterStatus::NotLoaded {
        return Ok(None);
    }
    Err(ExpressionError::NotACollection(element.type_name().to_string()))
}

/// Accepted sizes of a `<count>` expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CountMode {
    /// `*`
    AnyNumber,
    /// `?`
    NoneOrOne,
    /// `!`
    None,
    /// `+`
    OneOrMore,
    /// An integer.
    Exact(i32),
    /// Anything else; never matches.
    Unknown,
}

impl CountMode {
    pub fn parse(size: &str) -> Self {
        match size {
            "*" => CountMode::AnyNumber,
            "?" => CountMode::NoneOrOne,
            "!" => CountMode::None,
            "+" => CountMode::OneOrMore,
            _ => match size.parse::<i32>() {
                Ok(n) => CountMode::Exact(n),
                Err(_) => CountMode::Unknown,
            },
        }
    }

    pub fn matches(&self, size: usize) -> bool {
        match *self {
            CountMode::AnyNumber => true,
            CountMode::NoneOrOne => size <= 1,
            CountMode::None => size == 0,
            CountMode::OneOrMore => size >= 1,
            CountMode::Exact(n) => usize::try_from(n).is_ok_and(|n| n == size),
            CountMode::Unknown => false,
        }
    }
}

/// `<count value="..."/>`: checks the number of elements of the default variable.
#[derive(Debug)]
pub struct CountExpression {
    mode: CountMode,
    hash: HashCode,
}

impl CountExpression {
    pub fn new(size: &str) -> Self {
        Self {
            mode: CountMode::parse(size),
            hash: HashCode::default(),
        }
    }

    /// A missing `value` attribute accepts any size.
    pub fn from_element(element: &dyn ElementNode) -> Result<Self> {
        Ok(Self::new(element.attribute(ATT_VALUE).unwrap_or("*")))
    }

    pub fn mode(&self) -> CountMode {
        self.mode
    }
}

impl Expression for CountExpression {
    fn evaluate(&self, context: &dyn Context) -> Result<EvaluationResult> {
        let element = context.default_variable();
        let size = match element.count() {
            Some(size) => size,
            None => match adapt_collection(context, &element, COUNTABLE_TYPE, Value::count)? {
                Some(size) => size,
                None => return Ok(EvaluationResult::NotLoaded),
            },
        };
        Ok(EvaluationResult::value_of(self.mode.matches(size)))
    }

    fn collect_expression_info(&self, info: &mut ExpressionInfo) {
        info.mark_default_variable_accessed();
    }

    fn compute_hash_code(&self) -> u32 {
        hash_of(&(self.type_name(), self.mode))
    }

    fn hash_cache(&self) -> Option<&HashCode> {
        Some(&self.hash)
    }

    fn equals(&self, other: &dyn Expression) -> bool {
        other
            .downcast_ref::<Self>()
            .is_some_and(|o| o.mode == self.mode)
    }

    fn type_name(&self) -> &'static str {
        "CountExpression"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// How an `<iterate>` combines the per-element results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IterateOperator {
    And,
    Or,
}

/// `<iterate>`: evaluates the children against every element of the default variable.
#[derive(Debug)]
pub struct IterateExpression {
    operator: IterateOperator,
    empty_result: Option<bool>,
    composite: CompositeExpression,
    hash: HashCode,
}

impl IterateExpression {
    pub fn new(operator: IterateOperator, empty_result: Option<bool>) -> Self {
        Self {
            operator,
            empty_result,
            composite: CompositeExpression::new(),
            hash: HashCode::default(),
        }
    }

    pub fn from_element(element: &dyn ElementNode) -> Result<Self> {
        let operator = match element.attribute(ATT_OPERATOR) {
            None => IterateOperator::And,
            Some(value) => {
                check_attribute_values(ATT_OPERATOR, value, &["and", "or"])?;
                if value == "and" {
                    IterateOperator::And
                } else {
                    IterateOperator::Or
                }
            }
        };
        let empty_result = element
            .attribute(ATT_IF_EMPTY)
            .map(|v| v.eq_ignore_ascii_case("true"));
        Ok(Self::new(operator, empty_result))
    }

    pub fn operator(&self) -> IterateOperator {
        self.operator
    }

    pub fn empty_result(&self) -> Option<bool> {
        self.empty_result
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

    fn empty_collection_result(&self) -> EvaluationResult {
        match self.empty_result {
            Some(result) => EvaluationResult::value_of(result),
            None => EvaluationResult::value_of(self.operator == IterateOperator::And),
        }
    }
}

impl Expression for IterateExpression {
    fn evaluate(&self, context: &dyn Context) -> Result<EvaluationResult> {
        let element = context.default_variable();
        let elements = match element.elements() {
            Some(elements) => elements,
            None => match adapt_collection(context, &element, ITERABLE_TYPE, Value::elements)? {
                Some(elements) => elements,
                None => return Ok(EvaluationResult::NotLoaded),
            },
        };

        match elements.len() {
            0 => Ok(self.empty_collection_result()),
            1 => {
                let scope = DefaultVariable::new(context, elements[0].clone());
                self.composite.evaluate_and(&scope)
            }
            _ => {
                let pool = IteratePool::new(context, elements);
                let mut result = EvaluationResult::value_of(self.operator == IterateOperator::And);
                while pool.advance() {
                    let current = self.composite.evaluate_and(&pool)?;
                    match self.operator {
                        IterateOperator::And => {
                            result = result.and(current);
                            if result == EvaluationResult::False {
                                return Ok(result);
                            }
                        }
                        IterateOperator::Or => {
                            result = result.or(current);
                            if result == EvaluationResult::True {
                                return Ok(result);
                            }
                        }
                    }
                }
                Ok(result)
            }
        }
    }

    fn collect_expression_info(&self, info: &mut ExpressionInfo) {
        // Only the default variable is recorded; the elements have no names.
        info.mark_default_variable_accessed();
        self.composite.collect_expression_info(info);
    }

    fn compute_hash_code(&self) -> u32 {
        hash_of(&(self.type_name(), self.operator, self.empty_result))
            .wrapping_mul(HASH_FACTOR)
            .wrapping_add(self.composite.compute_hash_code())
    }

    fn hash_cache(&self) -> Option<&HashCode> {
        Some(&self.hash)
    }

    fn equals(&self, other: &dyn Expression) -> bool {
        other.downcast_ref::<Self>().is_some_and(|o| {
            o.operator == self.operator
                && o.empty_result == self.empty_result
                && self.composite.equals(&o.composite)
        })
    }

    fn type_name(&self) -> &'static str {
        "IterateExpression"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
