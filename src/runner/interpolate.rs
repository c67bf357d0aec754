//! Substitution grammar
//!
//! `#{expr}` inside a string is replaced with the stringified value of the expression,
//! `${NAME}` (environment strings only) with an environment variable. A string starting
//! with `=` is a whole-value expression whose native value is kept. Backslashes before
//! the introducer escape it when odd and are halved either way.

use crate::error::{EvalError, EvalResult};
use regex::Regex;
use serde_yaml::Value;
use std::sync::OnceLock;

/// Placeholders in property and argument strings
pub fn property_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(\\*)(#)\{").expect("valid regex"))
}

/// Placeholders in environment strings
pub fn environment_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(\\*)([#$])\{").expect("valid regex"))
}

/// Replace every placeholder matched by `pattern`
///
/// `resolve` receives the introducer and the expression source. Returning `None` leaves
/// the placeholder as written.
pub fn substitute<F>(text: &str, pattern: &Regex, mut resolve: F) -> EvalResult<String>
where
    F: FnMut(char, &str) -> EvalResult<Option<String>>,
{
    let mut result = String::with_capacity(text.len());
    let mut position = 0;

    while let Some(captures) = pattern.captures_at(text, position) {
        let (Some(whole), Some(slashes), Some(introducer)) =
            (captures.get(0), captures.get(1), captures.get(2))
        else {
            break;
        };

        result.push_str(&text[position..whole.start()]);
        let count = slashes.as_str().len();
        result.push_str(&"\\".repeat(count / 2));

        if count % 2 == 1 {
            // Escaped: keep the introducer and brace, scan on after them
            result.push_str(&text[introducer.start()..whole.end()]);
            position = whole.end();
            continue;
        }

        let (source, consumed) = read_expression(&text[whole.end()..])?;
        let introducer = introducer.as_str().chars().next().unwrap_or('#');
        match resolve(introducer, &source)? {
            Some(value) => result.push_str(&value),
            None => result.push_str(&text[introducer_start(&captures)..whole.end() + consumed]),
        }
        position = whole.end() + consumed;
    }

    result.push_str(&text[position..]);
    Ok(result)
}

fn introducer_start(captures: &regex::Captures<'_>) -> usize {
    captures.get(2).map(|m| m.start()).unwrap_or(0)
}

/// Read an expression up to its closing brace
///
/// Returns the source and the number of bytes consumed, closing brace included.
fn read_expression(text: &str) -> EvalResult<(String, usize)> {
    let mut source = String::new();
    let mut depth = 0usize;
    let mut chars = text.char_indices().peekable();

    while let Some((index, c)) = chars.next() {
        match c {
            '\\' if matches!(chars.peek(), Some((_, '}'))) => {
                source.push('}');
                chars.next();
            }
            '{' => {
                depth += 1;
                source.push(c);
            }
            '}' if depth == 0 => return Ok((source, index + 1)),
            '}' => {
                depth -= 1;
                source.push(c);
            }
            _ => source.push(c),
        }
    }

    Err(EvalError::InvalidSyntax(format!(
        "unterminated placeholder in '{}'",
        text
    )))
}

/// A string that is a whole-value expression
#[derive(Debug, Clone, PartialEq)]
pub struct WholeExpression<'a> {
    /// Whitespace before the backslashes
    pub leading: &'a str,

    /// Number of backslashes before `=`
    pub slashes: usize,

    /// Text after `=`
    pub source: &'a str,
}

/// Split a `=expr` string, if it is one
pub fn whole_expression(text: &str) -> Option<WholeExpression<'_>> {
    let trimmed = text.trim_start();
    let leading = &text[..text.len() - trimmed.len()];
    let rest = trimmed.trim_start_matches('\\');
    let slashes = trimmed.len() - rest.len();
    let source = rest.strip_prefix('=')?;
    Some(WholeExpression {
        leading,
        slashes,
        source,
    })
}

/// Whether a string evaluates to a native value rather than a string
pub fn is_expression(text: &str) -> bool {
    matches!(whole_expression(text), Some(WholeExpression { slashes: 0, .. }))
}

/// Stringify a value
pub fn to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Sequence(items) => format!(
            "[{}]",
            items.iter().map(to_text).collect::<Vec<_>>().join(", ")
        ),
        Value::Mapping(entries) => format!(
            "{{{}}}",
            entries
                .iter()
                .map(|(k, v)| format!("{}: {}", to_text(k), to_text(v)))
                .collect::<Vec<_>>()
                .join(", ")
        ),
        Value::Tagged(tagged) => to_text(&tagged.value),
    }
}
