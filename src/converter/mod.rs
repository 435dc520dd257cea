// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Conversion of configuration element trees into expression trees.

mod arguments;
mod dom;
mod element;
mod standard;

pub use arguments::{
    arguments_of, check_attribute, check_attribute_values, convert_argument,
    optional_boolean_attribute, parse_arguments, unescape_string,
};
pub use dom::{DomDocument, DomElement, NodeId};
pub use element::{ConfigurationElement, ElementNode};
pub use standard::{tags, StandardElementHandler};

use crate::definitions::DefinitionRegistry;
use crate::error::{ExpressionError, Result};
use crate::expression::{CompositeExpression, ExpressionRef};

use core::fmt;
use std::sync::{Arc, Weak};

/// Creates expressions for the elements it knows.
pub trait ElementHandler: Send + Sync {
    /// `Ok(None)` if the element is not handled here.
    fn create(
        &self,
        converter: &ExpressionConverter,
        element: &dyn ElementNode,
    ) -> Result<Option<ExpressionRef>>;
}

/// Converts element trees by asking a list of handlers in order.
pub struct ExpressionConverter {
    handlers: Vec<Arc<dyn ElementHandler>>,
    definitions: Weak<DefinitionRegistry>,
}

impl Default for ExpressionConverter {
    /// Converter with the standard handler only.
    fn default() -> Self {
        Self::new(vec![Arc::new(StandardElementHandler)])
    }
}

impl fmt::Debug for ExpressionConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpressionConverter")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

impl ExpressionConverter {
    pub fn new(handlers: Vec<Arc<dyn ElementHandler>>) -> Self {
        Self {
            handlers,
            definitions: Weak::new(),
        }
    }

    pub(crate) fn bound_to(mut self, definitions: Weak<DefinitionRegistry>) -> Self {
        self.definitions = definitions;
        self
    }

    /// Registry that `reference` expressions created by this converter consult.
    pub fn definitions(&self) -> Weak<DefinitionRegistry> {
        self.definitions.clone()
    }

    /// Convert `root`; an element no handler understands is an error.
    pub fn perform(&self, root: &dyn ElementNode) -> Result<ExpressionRef> {
        self.try_perform(root)?.ok_or_else(|| {
            ExpressionError::MissingExpression(format!(
                "no expression handler for element <{}>",
                root.name()
            ))
        })
    }

    /// Convert `root`, or `Ok(None)` if no handler understands it.
    pub fn try_perform(&self, root: &dyn ElementNode) -> Result<Option<ExpressionRef>> {
        for handler in &self.handlers {
            if let Some(expression) = handler.create(self, root)? {
                return Ok(Some(expression));
            }
        }
        log::debug!("no expression handler for element <{}>", root.name());
        Ok(None)
    }

    /// Convert every child of `element` into `composite`.
    pub fn process_children(
        &self,
        element: &dyn ElementNode,
        composite: &mut CompositeExpression,
    ) -> Result<()> {
        for child in element.children() {
            composite.add(self.perform(child.as_ref())?);
        }
        Ok(())
    }
}
