// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg(test)]

use std::collections::BTreeMap;
use std::env;
use std::sync::Arc;

use anyhow::{bail, Result};
use berry_expressions::converter::ConfigurationElement;
use berry_expressions::extensions::{executable_tester, PropertyTester, PropertyTesterDescriptor};
use berry_expressions::platform::{
    AdapterTable, ContributorTable, ExecutableExtension, Platform, PropertyTable, TypeTable,
};
use berry_expressions::*;
use serde::Deserialize;
use test_generator::test_resources;

/// Tester for string receivers.
struct StringTester;

impl PropertyTester for StringTester {
    fn test(&self, receiver: &Value, property: &str, args: &[Value], expected: Option<&Value>) -> bool {
        let Ok(text) = receiver.as_string() else {
            return false;
        };
        let arg = args.first().and_then(|a| a.as_string().ok());
        let result = match property {
            "isEmpty" => text.is_empty(),
            "startsWith" => arg.is_some_and(|a| text.starts_with(&**a)),
            "endsWith" => arg.is_some_and(|a| text.ends_with(&**a)),
            "length" => return expected == Some(&Value::from(text.chars().count())),
            _ => false,
        };
        match expected {
            Some(expected) => expected == &Value::Bool(result),
            None => result,
        }
    }
}

/// Tester for number receivers.
struct NumberTester;

impl PropertyTester for NumberTester {
    fn test(&self, receiver: &Value, property: &str, args: &[Value], _: Option<&Value>) -> bool {
        let Ok(n) = receiver.as_number() else {
            return false;
        };
        match property {
            "even" => n.as_i64().is_some_and(|n| n % 2 == 0),
            "greaterThan" => args
                .first()
                .and_then(|a| a.as_number().ok())
                .is_some_and(|a| n > a),
            _ => false,
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct TesterCase {
    id: String,
    #[serde(rename = "type")]
    type_name: String,
    namespace: String,
    properties: String,
    class: String,
    contributor: String,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct AdapterCase {
    from: String,
    to: String,
    /// `uppercase`, `split`, or absent for a declared but unloaded adapter.
    kind: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default, deny_unknown_fields)]
struct PlatformCase {
    types: BTreeMap<String, Vec<String>>,
    adapters: Vec<AdapterCase>,
    active: Vec<String>,
    properties: BTreeMap<String, String>,
    testers: Vec<TesterCase>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct TestCase {
    note: String,
    #[serde(default)]
    platform: PlatformCase,
    #[serde(default)]
    definitions: Vec<ConfigurationElement>,
    expression: ConfigurationElement,
    #[serde(default)]
    default: Option<Value>,
    #[serde(default)]
    variables: BTreeMap<String, Value>,
    #[serde(default)]
    allow_activation: bool,
    want_result: Option<EvaluationResult>,
    want_error_code: Option<u32>,
    skip: Option<bool>,
}

#[derive(Deserialize, Debug)]
struct YamlTest {
    cases: Vec<TestCase>,
}

// Values read from yaml may use special encodings.
fn process_value(v: Value) -> Value {
    let type_name = match &v {
        Value::String(s) if s.as_ref() == "#undefined" => return Value::Undefined,
        Value::String(s) => s.strip_prefix("#type:").map(str::to_string),
        _ => None,
    };
    match type_name {
        Some(name) => Value::new_type(&name),
        None => v,
    }
}

fn build_platform(case: &PlatformCase) -> Platform {
    let types = Arc::new(TypeTable::new());
    for (name, super_types) in &case.types {
        let super_types: Vec<&str> = super_types.iter().map(String::as_str).collect();
        types.declare(name, &super_types);
    }

    let adapters = Arc::new(AdapterTable::new());
    for adapter in &case.adapters {
        match adapter.kind.as_deref() {
            Some("uppercase") => adapters.register(
                &adapter.from,
                &adapter.to,
                Arc::new(|v: &Value| v.as_string().ok().map(|s| Value::from(s.to_uppercase()))),
            ),
            Some("split") => adapters.register(
                &adapter.from,
                &adapter.to,
                Arc::new(|v: &Value| {
                    v.as_string().ok().map(|s| {
                        Value::from(s.split(',').map(Value::from).collect::<Vec<_>>())
                    })
                }),
            ),
            _ => adapters.declare(&adapter.from, &adapter.to),
        }
    }

    let contributors = Arc::new(ContributorTable::new());
    contributors.register_class("StringTester", Arc::new(|| executable_tester(StringTester)));
    contributors.register_class("NumberTester", Arc::new(|| executable_tester(NumberTester)));
    contributors.register_class(
        "NotATester",
        Arc::new(|| Box::new("not a tester") as ExecutableExtension),
    );
    for contributor in &case.active {
        contributors.activate(contributor);
    }

    let properties = Arc::new(PropertyTable::new());
    for (name, value) in &case.properties {
        properties.set(name, value);
    }

    Platform::new()
        .with_type_hierarchy(types)
        .with_adapter_manager(adapters)
        .with_contributors(contributors)
        .with_system_properties(properties)
}

fn run_case(case: TestCase) -> Result<()> {
    let engine = Engine::with_options(build_platform(&case.platform), Options::default())?;
    engine.add_property_testers(case.platform.testers.iter().map(|t| {
        PropertyTesterDescriptor::new(
            &t.id,
            &t.type_name,
            &t.namespace,
            &t.properties,
            &t.class,
            &t.contributor,
        )
    }));
    for definition in case.definitions {
        engine.add_definition_element(definition)?;
    }

    let result = engine.convert(&case.expression).and_then(|expression| {
        let context = engine.new_context(process_value(case.default.unwrap_or(Value::Null)));
        context.set_allow_plugin_activation(case.allow_activation);
        for (name, value) in case.variables {
            context.add_variable(&name, process_value(value));
        }
        expression.evaluate(&context)
    });

    match (result, case.want_result, case.want_error_code) {
        (Ok(actual), Some(expected), None) if actual == expected => Ok(()),
        (Ok(actual), Some(expected), None) => bail!("expected {expected}, got {actual}"),
        (Err(e), None, Some(code)) if e.status() == code => Ok(()),
        (Err(e), None, Some(code)) => bail!("expected error code {code}, got {} ({e})", e.status()),
        (Ok(actual), None, Some(code)) => bail!("expected error code {code}, got {actual}"),
        (Err(e), Some(expected), None) => bail!("expected {expected}, got error {e}"),
        _ => bail!("either want_result or want_error_code must be specified in test case."),
    }
}

fn yaml_test_impl(file: &str) -> Result<()> {
    let yaml_str = std::fs::read_to_string(file)?;
    let test: YamlTest = serde_yaml::from_str(&yaml_str)?;

    println!("running {file}");

    for case in test.cases {
        print!("case {} ", case.note);
        if case.skip == Some(true) {
            println!("skipped");
            continue;
        }
        let note = case.note.clone();
        if let Err(e) = run_case(case) {
            bail!("case {note} failed: {e}");
        }
        println!("passed");
    }

    Ok(())
}

fn yaml_test(file: &str) -> Result<()> {
    match yaml_test_impl(file) {
        Ok(_) => Ok(()),
        Err(e) => {
            // If Err is returned, it doesn't always get printed by cargo test.
            // Therefore, panic with the error.
            panic!("{}", e);
        }
    }
}

#[test]
#[ignore = "intended for running a single yaml file"]
fn one_yaml() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();

    let Some(file) = env::args().find(|a| a.ends_with(".yaml")) else {
        bail!("missing <yaml-file>");
    };
    yaml_test(&file)
}

#[test_resources("tests/evaluation/cases/**/*.yaml")]
fn run(path: &str) {
    let _ = env_logger::builder().is_test(true).try_init();
    yaml_test(path).unwrap()
}
