// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg(test)]

use std::sync::Arc;
use std::thread;

use anyhow::{bail, Result};
use berry_expressions::converter::{ConfigurationElement, DomDocument, NodeId};
use berry_expressions::extensions::{executable_tester, PropertyTester};
use berry_expressions::platform::{ContributorTable, Platform, TypeTable};
use berry_expressions::*;

const ENABLEMENT: &str = r#"
name: enablement
children:
  - name: with
    attributes: {variable: selection}
    children:
      - name: iterate
        attributes: {operator: or}
        children:
          - name: adapt
            attributes: {type: string}
            children:
              - name: test
                attributes:
                  property: org.example.text.startsWith
                  args: "'read'"
  - name: systemTest
    attributes: {property: os, value: linux}
"#;

/// Build the DOM form of an owned element tree, with whitespace between children.
fn to_dom(doc: &mut DomDocument, element: &ConfigurationElement) -> NodeId {
    let node = doc.create_element(&element.name);
    for (name, value) in &element.attributes {
        doc.set_attribute(node, name, value);
    }
    for child in &element.children {
        let text = doc.create_text("\n    ");
        doc.append_child(node, text);
        let child = to_dom(doc, child);
        doc.append_child(node, child);
    }
    node
}

struct StartsWith;

impl PropertyTester for StartsWith {
    fn test(&self, receiver: &Value, _: &str, args: &[Value], _: Option<&Value>) -> bool {
        match (receiver.as_string(), args.first().map(Value::as_string)) {
            (Ok(text), Some(Ok(prefix))) => text.starts_with(&**prefix),
            _ => false,
        }
    }
}

fn engine() -> Result<Engine> {
    let types = Arc::new(TypeTable::new());
    types.declare("string", &["CharSequence"]);
    let contributors = Arc::new(ContributorTable::new());
    contributors.register_class("StartsWith", Arc::new(|| executable_tester(StartsWith)));
    contributors.activate("org.example.text");
    let platform = Platform::new()
        .with_type_hierarchy(types)
        .with_contributors(contributors);

    let engine = Engine::with_options(platform, Options::from_json_str(r#"{"property_cache_capacity": 16}"#)?)?;
    let extension = ConfigurationElement::from_yaml_str(
        r#"
name: extension
contributor: org.example.text
children:
  - name: propertyTester
    attributes:
      id: org.example.text.tester
      type: CharSequence
      namespace: org.example.text
      properties: startsWith
      class: StartsWith
"#,
    )?;
    if engine.add_property_testers_from(&extension)? != 1 {
        bail!("expected one property tester");
    }
    Ok(engine)
}

#[test]
fn dom_and_owned_trees_convert_alike() -> Result<()> {
    let engine = engine()?;
    let element = ConfigurationElement::from_yaml_str(ENABLEMENT)?;

    let mut doc = DomDocument::new().with_contributor("org.example");
    let root = to_dom(&mut doc, &element);
    let comment = doc.create_comment("trailing comment");
    doc.append_child(root, comment);
    let Some(dom_root) = doc.element(root) else {
        bail!("root is not an element");
    };

    let from_dom = engine.convert(&dom_root)?;
    let from_owned = engine.convert(&element)?;
    assert!(from_dom.equals(from_owned.as_ref()));
    assert_eq!(from_dom.hash_code(), from_owned.hash_code());

    let copy = ConfigurationElement::from_node(&dom_root);
    assert_eq!(copy.name, element.name);
    assert_eq!(copy.children.len(), element.children.len());
    assert_eq!(copy.contributor.as_deref(), Some("org.example"));
    Ok(())
}

#[test]
fn expression_info_of_a_converted_tree() -> Result<()> {
    let engine = engine()?;
    let expression = engine.convert_yaml(ENABLEMENT)?;
    let info = expression.compute_expression_info();
    assert!(!info.has_default_variable_access());
    assert!(info.has_system_property_access());
    assert_eq!(
        info.accessed_variable_names().iter().collect::<Vec<_>>(),
        vec!["selection"]
    );
    assert_eq!(
        info.accessed_property_names().iter().collect::<Vec<_>>(),
        vec!["org.example.text.startsWith"]
    );
    Ok(())
}

#[test]
fn json_and_yaml_documents() -> Result<()> {
    let engine = engine()?;
    let json = engine.convert_json(r#"{"name": "count", "attributes": {"value": "+"}}"#)?;
    let yaml = engine.convert_yaml("name: count\nattributes: {value: '+'}\n")?;
    assert!(json.equals(yaml.as_ref()));

    let status = engine
        .convert_json(r#"{"name": "count", "extra": 1}"#)
        .err()
        .map(|e| e.status());
    assert_eq!(status, Some(ExpressionStatus::INVALID_DOCUMENT));
    Ok(())
}

#[test]
fn shared_engine_across_threads() -> Result<()> {
    let engine = engine()?;
    let expression = engine.convert(
        &ConfigurationElement::new("test")
            .with_attribute("property", "org.example.text.startsWith")
            .with_attribute("args", "'a'"),
    )?;

    let handles: Vec<_> = ["apple", "banana", "avocado", "cherry"]
        .into_iter()
        .map(|fruit| {
            let engine = engine.clone();
            let expression = expression.clone();
            thread::spawn(move || engine.evaluate(expression.as_ref(), Value::from(fruit)))
        })
        .collect();

    let mut results = vec![];
    for handle in handles {
        match handle.join() {
            Ok(result) => results.push(result?),
            Err(_) => bail!("evaluation thread panicked"),
        }
    }
    assert_eq!(
        results,
        vec![
            EvaluationResult::True,
            EvaluationResult::False,
            EvaluationResult::True,
            EvaluationResult::False
        ]
    );
    assert_eq!(engine.runtime().type_extensions().cached_properties(), 1);
    Ok(())
}

#[test]
fn removing_a_contributor() -> Result<()> {
    let engine = engine()?;
    let expression = engine.convert(
        &ConfigurationElement::new("test").with_attribute("property", "org.example.text.startsWith"),
    )?;
    assert_eq!(
        engine.evaluate(expression.as_ref(), Value::from(""))?,
        EvaluationResult::False
    );

    let removed = engine
        .runtime()
        .type_extensions()
        .remove_contributor("org.example.text");
    assert_eq!(removed, 1);
    let status = engine
        .evaluate(expression.as_ref(), Value::from(""))
        .err()
        .map(|e| e.status());
    assert_eq!(status, Some(ExpressionStatus::TYPE_EXTENDER_UNKNOWN_METHOD));
    Ok(())
}
