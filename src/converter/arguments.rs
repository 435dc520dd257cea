// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Attribute checks and argument literal parsing.

use super::element::ElementNode;
use crate::error::{ExpressionError, Result};
use crate::value::Value;

/// Value of a mandatory attribute.
pub fn check_attribute<'e>(element: &'e dyn ElementNode, name: &str) -> Result<&'e str> {
    element
        .attribute(name)
        .ok_or_else(|| ExpressionError::missing_attribute(element.name(), name))
}

pub fn check_attribute_values(name: &str, value: &str, valid_values: &[&str]) -> Result<()> {
    if valid_values.contains(&value) {
        return Ok(());
    }
    Err(ExpressionError::WrongAttributeValue {
        attribute: name.to_string(),
        value: value.to_string(),
        expected: valid_values.join(", "),
    })
}

/// `true` only if the attribute is present and reads `true`, ignoring case.
pub fn optional_boolean_attribute(element: &dyn ElementNode, name: &str) -> bool {
    element
        .attribute(name)
        .is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

/// Parsed comma separated arguments of an attribute; empty if absent.
pub fn arguments_of(element: &dyn ElementNode, name: &str) -> Result<Vec<Value>> {
    match element.attribute(name) {
        Some(args) => parse_arguments(args),
        None => Ok(Vec::new()),
    }
}

/// Convert a literal into a value.
///
/// * `'...'` is a string, with `''` standing for one quote.
/// * `true` and `false` are booleans.
/// * Literals containing `.` are floats if they parse as such.
/// * Other literals are integers if they parse as such.
/// * Anything else, including the empty literal, is a string.
pub fn convert_argument(arg: &str) -> Result<Value> {
    if arg.is_empty() {
        return Ok(Value::from(arg));
    }
    if arg.len() >= 2 && arg.starts_with('\'') && arg.ends_with('\'') {
        return Ok(Value::from(unescape_string(&arg[1..arg.len() - 1])?));
    }
    match arg {
        "true" => return Ok(Value::Bool(true)),
        "false" => return Ok(Value::Bool(false)),
        _ => {}
    }
    if arg.contains('.') {
        return Ok(match arg.parse::<f64>() {
            Ok(f) => Value::from(f),
            Err(_) => Value::from(arg),
        });
    }
    Ok(match arg.parse::<i32>() {
        Ok(i) => Value::from(i),
        Err(_) => Value::from(arg),
    })
}

/// Replace `''` with `'`. A lone quote is an error.
pub fn unescape_string(s: &str) -> Result<String> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\'' {
            if chars.next_if_eq(&'\'').is_none() {
                return Err(ExpressionError::StringNotCorrectlyEscaped(s.to_string()));
            }
        }
        result.push(ch);
    }
    Ok(result)
}

/// Split at commas outside of quoted strings and convert every piece.
pub fn parse_arguments(args: &str) -> Result<Vec<Value>> {
    let mut result = Vec::new();
    let mut start = 0;
    let mut in_string = false;
    let mut chars = args.char_indices().peekable();
    while let Some((i, ch)) = chars.next() {
        match ch {
            ',' if !in_string => {
                result.push(convert_argument(args[start..i].trim())?);
                start = i + 1;
            }
            '\'' if !in_string => in_string = true,
            '\'' => {
                // `''` inside a string is an escaped quote.
                if chars.next_if(|&(_, c)| c == '\'').is_none() {
                    in_string = false;
                }
            }
            _ => {}
        }
    }
    if in_string {
        return Err(ExpressionError::StringNotTerminated(args.to_string()));
    }
    result.push(convert_argument(args[start..].trim())?);
    Ok(result)
}
