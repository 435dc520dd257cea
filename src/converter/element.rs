// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::error::Result;

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Read access to a configuration element tree.
pub trait ElementNode {
    /// Tag name.
    fn name(&self) -> &str;

    fn attribute(&self, name: &str) -> Option<&str>;

    fn attribute_names(&self) -> Vec<&str>;

    /// Child elements in document order.
    fn children(&self) -> Vec<Box<dyn ElementNode + '_>>;

    /// Component that contributed the element, if known.
    fn contributor(&self) -> Option<&str> {
        None
    }
}

impl<T: ElementNode + ?Sized> ElementNode for &T {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        (**self).attribute(name)
    }

    fn attribute_names(&self) -> Vec<&str> {
        (**self).attribute_names()
    }

    fn children(&self) -> Vec<Box<dyn ElementNode + '_>> {
        (**self).children()
    }

    fn contributor(&self) -> Option<&str> {
        (**self).contributor()
    }
}

/// Owned configuration element.
///
/// Serialized as `{ name, attributes, children, contributor }`. Scalar
/// attribute values in documents are read as their string form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigurationElement {
    pub name: String,

    #[serde(
        default,
        deserialize_with = "scalar_attributes",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub attributes: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ConfigurationElement>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contributor: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    String(String),
    Bool(bool),
    Int(i64),
    Float(f64),
}

fn scalar_attributes<'de, D>(deserializer: D) -> core::result::Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let attributes = BTreeMap::<String, Scalar>::deserialize(deserializer)?;
    Ok(attributes
        .into_iter()
        .map(|(k, v)| {
            let v = match v {
                Scalar::String(s) => s,
                Scalar::Bool(b) => b.to_string(),
                Scalar::Int(i) => i.to_string(),
                Scalar::Float(f) => f.to_string(),
            };
            (k, v)
        })
        .collect())
}

impl ConfigurationElement {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_child(mut self, child: ConfigurationElement) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_contributor(mut self, contributor: &str) -> Self {
        self.contributor = Some(contributor.to_string());
        self
    }

    /// Deep copy of any element tree.
    pub fn from_node(node: &dyn ElementNode) -> Self {
        Self {
            name: node.name().to_string(),
            attributes: node
                .attribute_names()
                .into_iter()
                .filter_map(|n| node.attribute(n).map(|v| (n.to_string(), v.to_string())))
                .collect(),
            children: node
                .children()
                .iter()
                .map(|c| Self::from_node(c.as_ref()))
                .collect(),
            contributor: node.contributor().map(str::to_string),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    #[cfg(feature = "yaml")]
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }
}

impl ElementNode for ConfigurationElement {
    fn name(&self) -> &str {
        &self.name
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    fn attribute_names(&self) -> Vec<&str> {
        self.attributes.keys().map(String::as_str).collect()
    }

    fn children(&self) -> Vec<Box<dyn ElementNode + '_>> {
        self.children
            .iter()
            .map(|c| Box::new(c) as Box<dyn ElementNode + '_>)
            .collect()
    }

    fn contributor(&self) -> Option<&str> {
        self.contributor.as_deref()
    }
}
