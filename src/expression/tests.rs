// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::*;
use crate::context::{EvaluationContext, VariableResolver};
use crate::converter::{ConfigurationElement, ExpressionConverter};
use crate::extensions::{executable_tester, PropertyTester, PropertyTesterDescriptor};
use crate::platform::{AdapterTable, ContributorTable, Platform, PropertyTable, TypeTable};
use crate::runtime::Runtime;
use crate::ExpressionStatus;

use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result as TestResult;

use EvaluationResult::{False, NotLoaded, True};

#[derive(Debug)]
struct Fixed(EvaluationResult);

impl Expression for Fixed {
    fn evaluate(&self, _: &dyn Context) -> Result<EvaluationResult> {
        Ok(self.0)
    }

    fn compute_hash_code(&self) -> u32 {
        hash_of(&self.0)
    }

    fn equals(&self, other: &dyn Expression) -> bool {
        other.downcast_ref::<Self>().is_some_and(|o| o.0 == self.0)
    }

    fn type_name(&self) -> &'static str {
        "Fixed"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn fixed(result: EvaluationResult) -> ExpressionRef {
    Arc::new(Fixed(result))
}

struct StartsWith;

impl PropertyTester for StartsWith {
    fn test(&self, receiver: &Value, _: &str, args: &[Value], expected: Option<&Value>) -> bool {
        let (Ok(text), Some(Ok(prefix))) = (receiver.as_string(), args.first().map(Value::as_string))
        else {
            return false;
        };
        let matches = text.starts_with(&**prefix);
        match expected {
            Some(expected) => expected == &Value::Bool(matches),
            None => matches,
        }
    }
}

struct Fixture {
    runtime: Arc<Runtime>,
    contributors: Arc<ContributorTable>,
    properties: Arc<PropertyTable>,
}

fn fixture() -> Fixture {
    let types = Arc::new(TypeTable::new());
    types.declare("Document", &["Object"]);

    let adapters = Arc::new(AdapterTable::new());
    adapters.register(
        "Document",
        "IIterable",
        Arc::new(|v: &Value| v.as_host().and_then(|h| h.downcast_ref::<Document>()).map(|d| {
            Value::from(d.pages.iter().map(|p| Value::from(*p)).collect::<Vec<_>>())
        })),
    );
    adapters.register(
        "Document",
        "ICountable",
        Arc::new(|v: &Value| {
            v.as_host()
                .and_then(|h| h.downcast_ref::<Document>())
                .map(|d| Value::from(vec![Value::Null; d.pages.len()]))
        }),
    );
    adapters.register("string", "Upper", Arc::new(|v: &Value| {
        v.as_string().ok().map(|s| Value::from(s.to_uppercase()))
    }));
    adapters.declare("number", "IIterable");
    adapters.declare("number", "Upper");

    let contributors = Arc::new(ContributorTable::new());
    contributors.register_class("StartsWith", Arc::new(|| executable_tester(StartsWith)));

    let properties = Arc::new(PropertyTable::new());
    properties.set("os", "linux");

    let platform = Platform::new()
        .with_type_hierarchy(types)
        .with_adapter_manager(adapters)
        .with_contributors(contributors.clone())
        .with_system_properties(properties.clone());
    let runtime = Arc::new(Runtime::with_platform(platform));
    runtime
        .type_extensions()
        .add_property_tester(PropertyTesterDescriptor::new(
            "startsWith",
            "string",
            "org.example",
            "startsWith",
            "StartsWith",
            "org.example.bundle",
        ));
    Fixture {
        runtime,
        contributors,
        properties,
    }
}

#[derive(Debug)]
struct Document {
    pages: Vec<i32>,
}

impl crate::value::HostObject for Document {
    fn type_name(&self) -> &str {
        "Document"
    }
}

fn eval(f: &Fixture, expression: &dyn Expression, default_variable: Value) -> Result<EvaluationResult> {
    let context = EvaluationContext::root(f.runtime.clone(), default_variable);
    expression.evaluate(&context)
}

fn convert(yaml: &str) -> TestResult<ExpressionRef> {
    let element = ConfigurationElement::from_yaml_str(yaml)?;
    Ok(ExpressionConverter::default().perform(&element)?)
}

#[test]
fn and_stops_at_false_only() -> TestResult<()> {
    let f = fixture();
    let mut and = AndExpression::new();
    and.add(fixed(NotLoaded));
    and.add(fixed(False));
    assert_eq!(eval(&f, &and, Value::Null)?, False);

    let mut and = AndExpression::new();
    and.add(fixed(True));
    and.add(fixed(NotLoaded));
    assert_eq!(eval(&f, &and, Value::Null)?, NotLoaded);

    assert_eq!(eval(&f, &AndExpression::new(), Value::Null)?, True);
    Ok(())
}

#[test]
fn three_valued_folds() -> TestResult<()> {
    let f = fixture();
    let mut and = AndExpression::new();
    for result in [True, NotLoaded, False] {
        and.add(fixed(result));
    }
    assert_eq!(eval(&f, &and, Value::Null)?, False);

    let mut or = OrExpression::new();
    for result in [False, NotLoaded, True] {
        or.add(fixed(result));
    }
    assert_eq!(eval(&f, &or, Value::Null)?, True);
    Ok(())
}

#[test]
fn or_stops_at_true() -> TestResult<()> {
    let f = fixture();
    let mut or = OrExpression::new();
    or.add(fixed(NotLoaded));
    or.add(fixed(True));
    assert_eq!(eval(&f, &or, Value::Null)?, True);

    let mut or = OrExpression::new();
    or.add(fixed(False));
    or.add(fixed(NotLoaded));
    assert_eq!(eval(&f, &or, Value::Null)?, NotLoaded);

    assert_eq!(eval(&f, &OrExpression::new(), Value::Null)?, True);
    Ok(())
}

#[test]
fn not_and_enablement() -> TestResult<()> {
    let f = fixture();
    assert_eq!(eval(&f, &NotExpression::new(fixed(True)), Value::Null)?, False);
    assert_eq!(eval(&f, &NotExpression::new(fixed(NotLoaded)), Value::Null)?, NotLoaded);

    let mut enablement = EnablementExpression::new();
    enablement.add(fixed(True));
    enablement.add(fixed(False));
    assert_eq!(eval(&f, &enablement, Value::Null)?, False);
    Ok(())
}

#[test]
fn equals_compares_numbers_numerically() -> TestResult<()> {
    let f = fixture();
    let equals = EqualsExpression::new(Value::from(2));
    assert_eq!(eval(&f, &equals, Value::from(2.0))?, True);
    assert_eq!(eval(&f, &equals, Value::from("2"))?, False);

    let equals = convert("{name: equals, attributes: {value: \"'2'\"}}")?;
    assert_eq!(eval(&f, equals.as_ref(), Value::from("2"))?, True);
    Ok(())
}

#[test]
fn instanceof_follows_the_type_hierarchy() -> TestResult<()> {
    let f = fixture();
    let document = Value::from_host(Document { pages: vec![] });
    assert_eq!(eval(&f, &InstanceofExpression::new("Object"), document.clone())?, True);
    assert_eq!(eval(&f, &InstanceofExpression::new("Document"), document)?, True);
    assert_eq!(eval(&f, &InstanceofExpression::new("string"), Value::Null)?, False);
    Ok(())
}

#[test]
fn system_test() -> TestResult<()> {
    let f = fixture();
    assert_eq!(eval(&f, &SystemTestExpression::new("os", "linux"), Value::Null)?, True);
    assert_eq!(eval(&f, &SystemTestExpression::new("os", "win32"), Value::Null)?, False);
    assert_eq!(eval(&f, &SystemTestExpression::new("arch", ""), Value::Null)?, False);
    f.properties.set("arch", "");
    assert_eq!(eval(&f, &SystemTestExpression::new("arch", ""), Value::Null)?, False);
    Ok(())
}

#[test]
fn with_rebinds_the_default_variable() -> TestResult<()> {
    let f = fixture();
    let mut with = WithExpression::new("selection");
    with.add(Arc::new(EqualsExpression::new(Value::from("a"))));

    let context = EvaluationContext::root(f.runtime.clone(), Value::Null)
        .with_variable("selection", Value::from("a"))
        .with_variable("missing", Value::Undefined);
    assert_eq!(with.evaluate(&context)?, True);

    let status = eval(&f, &with, Value::Null).map_err(|e| e.status());
    assert_eq!(status, Err(ExpressionStatus::VARIABLE_NOT_DEFINED));

    let mut undefined = WithExpression::new("missing");
    undefined.add(fixed(True));
    assert_eq!(undefined.evaluate(&context)?, False);
    Ok(())
}

struct Echo;

impl VariableResolver for Echo {
    fn resolve(&self, name: &str, args: &[Value]) -> Result<Option<Value>> {
        Ok((name == "echo").then(|| args.first().cloned().unwrap_or(Value::Null)))
    }
}

#[test]
fn resolve_uses_the_context_resolvers() -> TestResult<()> {
    let f = fixture();
    let mut resolve = ResolveExpression::new("echo", vec![Value::from(7)]);
    resolve.add(Arc::new(EqualsExpression::new(Value::from(7))));
    let context =
        EvaluationContext::root(f.runtime.clone(), Value::Null).with_resolvers(vec![Arc::new(Echo)]);
    assert_eq!(resolve.evaluate(&context)?, True);

    let unknown = ResolveExpression::new("other", vec![]);
    let status = unknown.evaluate(&context).map_err(|e| e.status());
    assert_eq!(status, Err(ExpressionStatus::VARIABLE_NOT_DEFINED));
    Ok(())
}

#[test]
fn adapt() -> TestResult<()> {
    let f = fixture();
    let mut adapt = AdaptExpression::new("Upper");
    adapt.add(Arc::new(EqualsExpression::new(Value::from("ABC"))));
    assert_eq!(eval(&f, &adapt, Value::from("abc"))?, True);
    assert_eq!(eval(&f, &adapt, Value::from(1))?, NotLoaded);
    assert_eq!(eval(&f, &adapt, Value::Bool(true))?, False);

    // A value that already is an instance is used as is.
    let mut same = AdaptExpression::new("string");
    same.add(Arc::new(EqualsExpression::new(Value::from("abc"))));
    assert_eq!(eval(&f, &same, Value::from("abc"))?, True);
    Ok(())
}

#[test]
fn count() -> TestResult<()> {
    let f = fixture();
    let pages = Value::from_host(Document { pages: vec![1, 2] });
    assert_eq!(eval(&f, &CountExpression::new("2"), pages.clone())?, True);
    assert_eq!(eval(&f, &CountExpression::new("?"), pages)?, False);
    assert_eq!(eval(&f, &CountExpression::new("!"), Value::new_array())?, True);
    assert_eq!(eval(&f, &CountExpression::new("+"), Value::from_json_str("[1]")?)?, True);

    let status = eval(&f, &CountExpression::new("*"), Value::from("abc")).map_err(|e| e.status());
    assert_eq!(status, Err(ExpressionStatus::VARIABLE_IS_NOT_A_COLLECTION));
    Ok(())
}

#[test]
fn iterate() -> TestResult<()> {
    let f = fixture();
    let numbers = Value::from_json_str("[1, 2, 3]")?;

    let mut any_two = IterateExpression::new(IterateOperator::Or, None);
    any_two.add(Arc::new(EqualsExpression::new(Value::from(2))));
    assert_eq!(eval(&f, &any_two, numbers.clone())?, True);

    let mut all_two = IterateExpression::new(IterateOperator::And, None);
    all_two.add(Arc::new(EqualsExpression::new(Value::from(2))));
    assert_eq!(eval(&f, &all_two, numbers)?, False);
    assert_eq!(eval(&f, &all_two, Value::from_json_str("[2]")?)?, True);

    // Empty collections: `and` is true, `or` is false, unless overridden.
    assert_eq!(eval(&f, &all_two, Value::new_array())?, True);
    assert_eq!(eval(&f, &any_two, Value::new_array())?, False);
    let overridden = IterateExpression::new(IterateOperator::Or, Some(true));
    assert_eq!(eval(&f, &overridden, Value::new_array())?, True);

    let document = Value::from_host(Document { pages: vec![4, 2] });
    assert_eq!(eval(&f, &any_two, document)?, True);
    assert_eq!(eval(&f, &any_two, Value::from(1))?, NotLoaded);
    let status = eval(&f, &any_two, Value::Bool(true)).map_err(|e| e.status());
    assert_eq!(status, Err(ExpressionStatus::VARIABLE_IS_NOT_A_COLLECTION));
    Ok(())
}

#[test]
fn test_expression_respects_plugin_state() -> TestResult<()> {
    let f = fixture();
    let test = TestExpression::new(
        "org.example",
        "startsWith",
        vec![Value::from("ab")],
        None,
        true,
    );
    // Inactive contributor and no activation allowed.
    assert_eq!(eval(&f, &test, Value::from("abc"))?, NotLoaded);

    let context = EvaluationContext::root(f.runtime.clone(), Value::from("abc"));
    context.set_allow_plugin_activation(true);
    assert_eq!(test.evaluate(&context)?, True);

    f.contributors.activate("org.example.bundle");
    assert_eq!(eval(&f, &test, Value::from("xyz"))?, False);

    let expected = TestExpression::new(
        "org.example",
        "startsWith",
        vec![Value::from("x")],
        Some(Value::Bool(false)),
        false,
    );
    assert_eq!(eval(&f, &expected, Value::from("abc"))?, True);

    let unknown = TestExpression::new("org.example", "endsWith", vec![], None, false);
    let status = eval(&f, &unknown, Value::from("abc")).map_err(|e| e.status());
    assert_eq!(status, Err(ExpressionStatus::TYPE_EXTENDER_UNKNOWN_METHOD));
    Ok(())
}

#[test]
fn forced_activation_is_stable() -> TestResult<()> {
    let f = fixture();
    let test = TestExpression::new(
        "org.example",
        "startsWith",
        vec![Value::from("ab")],
        None,
        true,
    );
    let context = EvaluationContext::root(f.runtime.clone(), Value::from("abc"));
    context.set_allow_plugin_activation(true);
    let results = (0..4)
        .map(|_| test.evaluate(&context))
        .collect::<Result<Vec<_>>>()?;
    assert_eq!(results, vec![True; 4]);

    // The instance is used even without forcing.
    let unforced = TestExpression::new(
        "org.example",
        "startsWith",
        vec![Value::from("ab")],
        None,
        false,
    );
    assert_eq!(eval(&f, &unforced, Value::from("abc"))?, True);
    Ok(())
}

struct CountingPages(Arc<AtomicUsize>);

impl PropertyTester for CountingPages {
    fn test(&self, receiver: &Value, _: &str, _: &[Value], _: Option<&Value>) -> bool {
        self.0.fetch_add(1, Ordering::SeqCst);
        receiver
            .as_host()
            .and_then(|h| h.downcast_ref::<Document>())
            .is_some_and(|d| !d.pages.is_empty())
    }
}

#[test]
fn instanceof_guards_the_tester() -> TestResult<()> {
    let f = fixture();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    f.contributors.register_class(
        "CountingPages",
        Arc::new(move || executable_tester(CountingPages(counter.clone()))),
    );
    f.contributors.activate("org.example.pages");
    f.runtime
        .type_extensions()
        .add_property_tester(PropertyTesterDescriptor::new(
            "pages",
            "Document",
            "org.example",
            "hasPages",
            "CountingPages",
            "org.example.pages",
        ));

    let guarded = convert(
        r#"
name: and
children:
  - name: instanceof
    attributes: {value: Document}
  - name: test
    attributes: {property: org.example.hasPages}
"#,
    )?;
    assert_eq!(eval(&f, guarded.as_ref(), Value::from("abc"))?, False);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let document = Value::from_host(Document { pages: vec![1] });
    assert_eq!(eval(&f, guarded.as_ref(), document)?, True);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn platform_receivers_read_system_properties() -> TestResult<()> {
    let f = fixture();
    let test = TestExpression::new("org.example", "os", vec![Value::from("linux")], None, false);
    let platform = Value::new_type(crate::platform::PLATFORM_TYPE);
    assert_eq!(eval(&f, &test, platform.clone())?, True);
    let other = TestExpression::new("org.example", "os", vec![Value::from("mac")], None, false);
    assert_eq!(eval(&f, &other, platform)?, False);
    Ok(())
}

#[test]
fn references_are_resolved_at_evaluation() -> TestResult<()> {
    let f = fixture();
    let reference = f
        .runtime
        .converter()
        .perform(&ConfigurationElement::new("reference").with_attribute("definitionId", "isA"))?;
    let status = eval(&f, reference.as_ref(), Value::from("a")).map_err(|e| e.status());
    assert_eq!(status, Err(ExpressionStatus::DEFINITION_NOT_FOUND));

    f.runtime.definitions().add_definition(
        "isA",
        ConfigurationElement::new("definition").with_child(
            ConfigurationElement::new("equals").with_attribute("value", "a"),
        ),
    );
    assert_eq!(eval(&f, reference.as_ref(), Value::from("a"))?, True);

    let info = reference.compute_expression_info();
    assert!(info.has_default_variable_access());
    Ok(())
}

#[test]
fn expression_info() -> TestResult<()> {
    let expression = convert(
        r#"
name: and
children:
  - name: with
    attributes: {variable: selection}
    children:
      - name: test
        attributes: {property: org.example.startsWith, args: "'a'"}
  - name: systemTest
    attributes: {property: os, value: linux}
  - name: iterate
    children:
      - name: instanceof
        attributes: {value: string}
"#,
    )?;
    let info = expression.compute_expression_info();
    assert!(info.has_default_variable_access());
    assert!(info.has_system_property_access());
    assert!(info.accessed_variable_names().contains("selection"));
    assert!(info.accessed_property_names().contains("org.example.startsWith"));
    assert!(info.misbehaving_expression_types().is_empty());

    let mut with = WithExpression::new("selection");
    with.add(fixed(True));
    let info = with.compute_expression_info();
    assert!(!info.has_default_variable_access());
    assert!(info.misbehaving_expression_types().contains("Fixed"));
    Ok(())
}

#[test]
fn structural_equality_and_hashing() -> TestResult<()> {
    let yaml = r#"
name: or
children:
  - name: equals
    attributes: {value: "'x'"}
  - name: count
    attributes: {value: "+"}
"#;
    let a = convert(yaml)?;
    let b = convert(yaml)?;
    assert!(a.equals(b.as_ref()));
    assert_eq!(a.hash_code(), b.hash_code());
    assert!(*a == *b);

    let c = convert("{name: and, children: [{name: equals, attributes: {value: \"'x'\"}}, {name: count, attributes: {value: \"+\"}}]}")?;
    assert!(!a.equals(c.as_ref()));

    let mut set = std::collections::HashSet::new();
    set.insert(a.clone());
    assert!(set.contains(&b));
    assert!(!set.contains(&c));

    assert!(ConstantExpression::true_().equals(&ConstantExpression::true_()));
    assert!(!ConstantExpression::true_().equals(&ConstantExpression::false_()));
    Ok(())
}

#[test]
fn hash_codes_are_memoized() {
    let hash = HashCode::default();
    assert_eq!(hash.get_or_compute(|| u32::MAX), 0);
    assert_eq!(hash.get_or_compute(|| 5), 0);
}
