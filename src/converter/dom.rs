// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Minimal arena DOM.
//!
//! Nodes are linked through first-child/next-sibling indices. Text and
//! comment nodes are kept in the tree but are invisible through
//! [`ElementNode`].

use super::element::ElementNode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
enum NodeKind {
    Element {
        name: String,
        attributes: Vec<(String, String)>,
    },
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct DomNode {
    kind: NodeKind,
    parent: Option<usize>,
    first_child: Option<usize>,
    last_child: Option<usize>,
    next_sibling: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct DomDocument {
    nodes: Vec<DomNode>,
    contributor: Option<String>,
}

impl DomDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Contributor reported by every element of the document.
    pub fn with_contributor(mut self, contributor: &str) -> Self {
        self.contributor = Some(contributor.to_string());
        self
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(DomNode {
            kind,
            parent: None,
            first_child: None,
            last_child: None,
            next_sibling: None,
        });
        NodeId(self.nodes.len() - 1)
    }

    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.push(NodeKind::Element {
            name: name.to_string(),
            attributes: Vec::new(),
        })
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeKind::Text(text.to_string()))
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.push(NodeKind::Comment(text.to_string()))
    }

    /// Set an attribute on an element node. Ignored for other nodes.
    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(DomNode {
            kind: NodeKind::Element { attributes, .. },
            ..
        }) = self.nodes.get_mut(node.0)
        {
            match attributes.iter_mut().find(|(n, _)| n == name) {
                Some((_, v)) => *v = value.to_string(),
                None => attributes.push((name.to_string(), value.to_string())),
            }
        }
    }

    /// Append a detached node as the last child of `parent`.
    /// Returns `false` if either id is unknown, `child` already has a parent,
    /// or `child` is `parent` or one of its ancestors.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if parent.0 >= self.nodes.len()
            || child.0 >= self.nodes.len()
            || self.nodes[child.0].parent.is_some()
            || self.is_ancestor_or_self(child.0, parent.0)
        {
            return false;
        }
        match self.nodes[parent.0].last_child {
            Some(last) => self.nodes[last].next_sibling = Some(child.0),
            None => self.nodes[parent.0].first_child = Some(child.0),
        }
        self.nodes[parent.0].last_child = Some(child.0);
        self.nodes[child.0].parent = Some(parent.0);
        true
    }

    fn is_ancestor_or_self(&self, ancestor: usize, node: usize) -> bool {
        let mut current = Some(node);
        while let Some(index) = current {
            if index == ancestor {
                return true;
            }
            current = self.nodes[index].parent;
        }
        false
    }

    pub fn first_child(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0)?.first_child.map(NodeId)
    }

    pub fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0)?.next_sibling.map(NodeId)
    }

    /// Text content of a text or comment node.
    pub fn text(&self, node: NodeId) -> Option<&str> {
        match &self.nodes.get(node.0)?.kind {
            NodeKind::Text(t) | NodeKind::Comment(t) => Some(t),
            NodeKind::Element { .. } => None,
        }
    }

    /// View of an element node.
    pub fn element(&self, node: NodeId) -> Option<DomElement<'_>> {
        match self.nodes.get(node.0)?.kind {
            NodeKind::Element { .. } => Some(DomElement {
                document: self,
                node: node.0,
            }),
            _ => None,
        }
    }
}

/// Element of a [`DomDocument`].
///
/// As in DOM, attributes with an empty value read as absent.
#[derive(Debug, Clone, Copy)]
pub struct DomElement<'a> {
    document: &'a DomDocument,
    node: usize,
}

impl<'a> DomElement<'a> {
    fn parts(&self) -> (&'a str, &'a [(String, String)]) {
        match &self.document.nodes[self.node].kind {
            NodeKind::Element { name, attributes } => (name, attributes),
            _ => ("", &[]),
        }
    }

    pub fn id(&self) -> NodeId {
        NodeId(self.node)
    }
}

impl ElementNode for DomElement<'_> {
    fn name(&self) -> &str {
        self.parts().0
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.parts()
            .1
            .iter()
            .find(|(n, v)| n == name && !v.is_empty())
            .map(|(_, v)| v.as_str())
    }

    fn attribute_names(&self) -> Vec<&str> {
        self.parts().1.iter().map(|(n, _)| n.as_str()).collect()
    }

    fn children(&self) -> Vec<Box<dyn ElementNode + '_>> {
        let mut children: Vec<Box<dyn ElementNode + '_>> = Vec::new();
        let mut next = self.document.nodes[self.node].first_child;
        while let Some(index) = next {
            if let Some(element) = self.document.element(NodeId(index)) {
                children.push(Box::new(element));
            }
            next = self.document.nodes[index].next_sibling;
        }
        children
    }

    fn contributor(&self) -> Option<&str> {
        self.document.contributor.as_deref()
    }
}
