// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::{ElementHandler, ElementNode, ExpressionConverter};
use crate::error::{ExpressionError, Result};
use crate::expression::*;

use std::collections::HashMap;
use std::sync::Arc;

use lazy_static::lazy_static;

/// Tag names of the standard expression elements.
pub mod tags {
    pub const ADAPT: &str = "adapt";
    pub const AND: &str = "and";
    pub const COUNT: &str = "count";
    pub const ENABLEMENT: &str = "enablement";
    pub const EQUALS: &str = "equals";
    pub const INSTANCEOF: &str = "instanceof";
    pub const ITERATE: &str = "iterate";
    pub const NOT: &str = "not";
    pub const OR: &str = "or";
    pub const REFERENCE: &str = "reference";
    pub const RESOLVE: &str = "resolve";
    pub const SYSTEM_TEST: &str = "systemTest";
    pub const TEST: &str = "test";
    pub const WITH: &str = "with";
}

type ElementFactory = fn(&ExpressionConverter, &dyn ElementNode) -> Result<ExpressionRef>;

lazy_static! {
    static ref FACTORIES: HashMap<&'static str, ElementFactory> = {
        let mut m: HashMap<&'static str, ElementFactory> = HashMap::new();
        register(&mut m);
        m
    };
}

fn register(m: &mut HashMap<&'static str, ElementFactory>) {
    m.insert(tags::ADAPT, adapt);
    m.insert(tags::AND, and);
    m.insert(tags::COUNT, count);
    m.insert(tags::ENABLEMENT, enablement);
    m.insert(tags::EQUALS, equals);
    m.insert(tags::INSTANCEOF, instanceof);
    m.insert(tags::ITERATE, iterate);
    m.insert(tags::NOT, not);
    m.insert(tags::OR, or);
    m.insert(tags::REFERENCE, reference);
    m.insert(tags::RESOLVE, resolve);
    m.insert(tags::SYSTEM_TEST, system_test);
    m.insert(tags::TEST, test);
    m.insert(tags::WITH, with);
}

/// Handler for the standard expression elements.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardElementHandler;

impl ElementHandler for StandardElementHandler {
    fn create(
        &self,
        converter: &ExpressionConverter,
        element: &dyn ElementNode,
    ) -> Result<Option<ExpressionRef>> {
        match FACTORIES.get(element.name()) {
            Some(factory) => factory(converter, element).map(Some),
            None => Ok(None),
        }
    }
}

fn and(converter: &ExpressionConverter, element: &dyn ElementNode) -> Result<ExpressionRef> {
    let mut result = AndExpression::new();
    converter.process_children(element, result.composite_mut())?;
    Ok(Arc::new(result))
}

fn or(converter: &ExpressionConverter, element: &dyn ElementNode) -> Result<ExpressionRef> {
    let mut result = OrExpression::new();
    converter.process_children(element, result.composite_mut())?;
    Ok(Arc::new(result))
}

fn not(converter: &ExpressionConverter, element: &dyn ElementNode) -> Result<ExpressionRef> {
    let children = element.children();
    match children.as_slice() {
        [child] => Ok(Arc::new(NotExpression::new(
            converter.perform(child.as_ref())?,
        ))),
        _ => Err(ExpressionError::MissingExpression(format!(
            "<{}> requires exactly one child, found {}",
            tags::NOT,
            children.len()
        ))),
    }
}

fn enablement(converter: &ExpressionConverter, element: &dyn ElementNode) -> Result<ExpressionRef> {
    let mut result = EnablementExpression::new();
    converter.process_children(element, result.composite_mut())?;
    Ok(Arc::new(result))
}

fn instanceof(_: &ExpressionConverter, element: &dyn ElementNode) -> Result<ExpressionRef> {
    Ok(Arc::new(InstanceofExpression::from_element(element)?))
}

fn equals(_: &ExpressionConverter, element: &dyn ElementNode) -> Result<ExpressionRef> {
    Ok(Arc::new(EqualsExpression::from_element(element)?))
}

fn system_test(_: &ExpressionConverter, element: &dyn ElementNode) -> Result<ExpressionRef> {
    Ok(Arc::new(SystemTestExpression::from_element(element)?))
}

fn count(_: &ExpressionConverter, element: &dyn ElementNode) -> Result<ExpressionRef> {
    Ok(Arc::new(CountExpression::from_element(element)?))
}

fn test(_: &ExpressionConverter, element: &dyn ElementNode) -> Result<ExpressionRef> {
    Ok(Arc::new(TestExpression::from_element(element)?))
}

fn reference(converter: &ExpressionConverter, element: &dyn ElementNode) -> Result<ExpressionRef> {
    let reference =
        ReferenceExpression::from_element(element)?.with_definitions(converter.definitions());
    Ok(Arc::new(reference))
}

fn with(converter: &ExpressionConverter, element: &dyn ElementNode) -> Result<ExpressionRef> {
    let mut result = WithExpression::from_element(element)?;
    converter.process_children(element, result.composite_mut())?;
    Ok(Arc::new(result))
}

fn resolve(converter: &ExpressionConverter, element: &dyn ElementNode) -> Result<ExpressionRef> {
    let mut result = ResolveExpression::from_element(element)?;
    converter.process_children(element, result.composite_mut())?;
    Ok(Arc::new(result))
}

fn adapt(converter: &ExpressionConverter, element: &dyn ElementNode) -> Result<ExpressionRef> {
    let mut result = AdaptExpression::from_element(element)?;
    converter.process_children(element, result.composite_mut())?;
    Ok(Arc::new(result))
}

fn iterate(converter: &ExpressionConverter, element: &dyn ElementNode) -> Result<ExpressionRef> {
    let mut result = IterateExpression::from_element(element)?;
    converter.process_children(element, result.composite_mut())?;
    Ok(Arc::new(result))
}
