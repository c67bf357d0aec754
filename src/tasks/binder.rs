//! Argument binding
//!
//! A task declares its arguments as a [`Schema`]: an ordered list of [`Field`]s, each with
//! a value [`Shape`] and qualifiers. Raw step arguments are validated against the schema
//! when the build file is loaded, and evaluated into [`BoundArgs`] right before the task
//! handler runs.

use crate::build::Step;
use crate::error::{ArgumentError, EvalError, Result};
use crate::runner::interpolate::{is_expression, to_text};
use crate::runner::ExecutionContext;
use crate::tasks::{Registry, TaskDescriptor};
use crate::utils::resolve_path;
use serde_yaml::{Mapping, Number, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Expected shape of an argument value
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Any,
    String,
    Bool,
    Int,
    Float,
    List(Box<Shape>),
    Map(Box<Shape>),
}

impl Shape {
    /// Human readable name, used in error messages
    pub fn describe(&self) -> String {
        match self {
            Shape::Any => "any value".to_string(),
            Shape::String => "a string".to_string(),
            Shape::Bool => "a boolean".to_string(),
            Shape::Int => "an integer".to_string(),
            Shape::Float => "a number".to_string(),
            Shape::List(item) => format!("a list of {}", item.plural()),
            Shape::Map(item) => format!("a map of {}", item.plural()),
        }
    }

    fn plural(&self) -> String {
        match self {
            Shape::Any => "values".to_string(),
            Shape::String => "strings".to_string(),
            Shape::Bool => "booleans".to_string(),
            Shape::Int => "integers".to_string(),
            Shape::Float => "numbers".to_string(),
            Shape::List(_) | Shape::Map(_) => format!("({})", self.describe()),
        }
    }

    /// Value of an absent optional field
    pub fn zero(&self) -> Value {
        match self {
            Shape::Any => Value::Null,
            Shape::String => Value::String(String::new()),
            Shape::Bool => Value::Bool(false),
            Shape::Int => Value::Number(0.into()),
            Shape::Float => Value::Number(Number::from(0.0)),
            Shape::List(_) => Value::Sequence(Vec::new()),
            Shape::Map(_) => Value::Mapping(Mapping::new()),
        }
    }
}

/// One argument of a task
#[derive(Debug, Clone)]
pub struct Field {
    /// Name the handler reads the bound value with
    pub name: String,

    /// Key in the raw step mapping
    pub key: String,

    pub shape: Shape,

    /// May be absent
    pub optional: bool,

    /// Resolved as a path relative to the build directory
    pub file: bool,

    /// Evaluated as an expression instead of a template
    pub expression: bool,

    /// A scalar is promoted to a one element list
    pub wrap: bool,

    /// Holds nested steps
    pub steps: bool,
}

impl Field {
    pub fn new(name: &str, shape: Shape) -> Self {
        Field {
            name: name.to_string(),
            key: name.to_lowercase(),
            shape,
            optional: false,
            file: false,
            expression: false,
            wrap: false,
            steps: false,
        }
    }

    pub fn key(mut self, key: &str) -> Self {
        self.key = key.to_string();
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn file(mut self) -> Self {
        self.file = true;
        self
    }

    pub fn expression(mut self) -> Self {
        self.expression = true;
        self
    }

    pub fn wrap(mut self) -> Self {
        self.wrap = true;
        self
    }

    pub fn steps(mut self) -> Self {
        self.steps = true;
        self
    }
}

/// Ordered argument fields of a task
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Schema { fields }
    }

    fn field_by_key(&self, key: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.key == key)
    }
}

/// Evaluated arguments handed to a task handler
#[derive(Debug, Clone, Default)]
pub struct BoundArgs {
    values: BTreeMap<String, Value>,
    steps: BTreeMap<String, Vec<Step>>,
    set: BTreeSet<String>,
}

impl BoundArgs {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Whether the argument was given in the step
    pub fn is_set(&self, name: &str) -> bool {
        self.set.contains(name)
    }

    pub fn string(&self, name: &str) -> String {
        self.get(name).map(to_text).unwrap_or_default()
    }

    pub fn bool(&self, name: &str) -> bool {
        self.get(name).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn int(&self, name: &str) -> i64 {
        self.get(name).and_then(Value::as_i64).unwrap_or(0)
    }

    pub fn list(&self, name: &str) -> Vec<Value> {
        match self.get(name) {
            Some(Value::Sequence(items)) => items.clone(),
            _ => Vec::new(),
        }
    }

    pub fn strings(&self, name: &str) -> Vec<String> {
        self.list(name).iter().map(to_text).collect()
    }

    pub fn steps(&self, name: &str) -> &[Step] {
        self.steps.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Describe the shape of a raw value for error messages
pub fn describe_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(_) => "a boolean".to_string(),
        Value::Number(n) if n.is_f64() => "a float".to_string(),
        Value::Number(_) => "an integer".to_string(),
        Value::String(_) => "a string".to_string(),
        Value::Sequence(_) => "a list".to_string(),
        Value::Mapping(_) => "a map".to_string(),
        Value::Tagged(tagged) => describe_value(&tagged.value),
    }
}

/// Raw value of a field, with an optional null counted as absent
fn raw_value<'a>(field: &Field, args: &'a Mapping) -> Option<&'a Value> {
    match args.get(field.key.as_str()) {
        Some(Value::Null) if field.optional => None,
        other => other,
    }
}

/// Check raw step arguments against a schema
pub fn validate(schema: &Schema, args: &Mapping, registry: &Registry) -> std::result::Result<(), ArgumentError> {
    for key in args.keys() {
        let name = key.as_str().map(str::to_string).unwrap_or_else(|| format!("{:?}", key));
        if schema.field_by_key(&name).is_none() {
            return Err(ArgumentError::Unknown(name));
        }
    }

    for field in &schema.fields {
        let Some(raw) = raw_value(field, args) else {
            if field.optional {
                continue;
            }
            return Err(ArgumentError::Missing(field.key.clone()));
        };

        if field.steps {
            Step::parse_list(raw, registry).map_err(|e| ArgumentError::Steps {
                field: field.key.clone(),
                message: e.to_string(),
            })?;
            continue;
        }

        if field.expression {
            continue;
        }

        let wrapped = wrap(field, raw.clone());
        if !matches_shape(&field.shape, &wrapped, true) {
            return Err(shape_error(field, &wrapped));
        }
    }

    Ok(())
}

/// Evaluate raw step arguments into typed values
pub fn bind(ctx: &ExecutionContext, descriptor: &TaskDescriptor, args: &Mapping) -> Result<BoundArgs> {
    let mut bound = BoundArgs::default();
    let arguments = |source: ArgumentError| EvalError::Arguments {
        task: descriptor.name.clone(),
        source,
    };

    for field in &descriptor.schema.fields {
        let Some(raw) = raw_value(field, args) else {
            if !field.optional {
                return Err(arguments(ArgumentError::Missing(field.key.clone())).into());
            }
            if !field.steps {
                bound.values.insert(field.name.clone(), field.shape.zero());
            }
            continue;
        };
        bound.set.insert(field.name.clone());

        if field.steps {
            let steps = Step::parse_list(raw, ctx.registry()).map_err(|e| {
                arguments(ArgumentError::Steps {
                    field: field.key.clone(),
                    message: e.to_string(),
                })
            })?;
            bound.steps.insert(field.name.clone(), steps);
            continue;
        }

        let value = match raw {
            Value::String(source) if field.expression => {
                let source = source.trim_start();
                ctx.evaluate_expression(source.strip_prefix('=').unwrap_or(source))?
            }
            _ if field.expression => raw.clone(),
            _ => ctx.evaluate_value(raw)?,
        };

        let value = coerce(&field.shape, wrap(field, value));
        if !matches_shape(&field.shape, &value, false) {
            return Err(arguments(shape_error(field, &value)).into());
        }

        let value = if field.file {
            resolve_files(ctx, value)
        } else {
            value
        };
        bound.values.insert(field.name.clone(), value);
    }

    Ok(bound)
}

fn shape_error(field: &Field, actual: &Value) -> ArgumentError {
    ArgumentError::Shape {
        field: field.key.clone(),
        expected: field.shape.describe(),
        actual: describe_value(actual),
    }
}

fn wrap(field: &Field, value: Value) -> Value {
    match (&field.shape, value) {
        (Shape::List(_), Value::Sequence(items)) => Value::Sequence(items),
        (Shape::List(_), Value::Null) if field.wrap => Value::Sequence(Vec::new()),
        (Shape::List(_), scalar) if field.wrap => Value::Sequence(vec![scalar]),
        (_, value) => value,
    }
}

/// Structural shape check. Before evaluation, whole-value expression strings match anything.
fn matches_shape(shape: &Shape, value: &Value, raw: bool) -> bool {
    if raw {
        if let Value::String(text) = value {
            if is_expression(text) {
                return true;
            }
        }
    }

    match (shape, value) {
        (Shape::Any, _) => true,
        (Shape::String, Value::String(_)) => true,
        (Shape::Bool, Value::Bool(_)) => true,
        (Shape::Int, Value::Number(n)) => {
            n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0)
        }
        (Shape::Float, Value::Number(_)) => true,
        (Shape::List(item), Value::Sequence(items)) => {
            items.iter().all(|value| matches_shape(item, value, raw))
        }
        (Shape::Map(item), Value::Mapping(entries)) => {
            entries.values().all(|value| matches_shape(item, value, raw))
        }
        (_, Value::Tagged(tagged)) => matches_shape(shape, &tagged.value, raw),
        _ => false,
    }
}

/// Integral floats become integers, integers become floats, element-wise
fn coerce(shape: &Shape, value: Value) -> Value {
    match (shape, value) {
        (Shape::Int, Value::Number(n)) if n.is_f64() => match n.as_f64() {
            Some(f) if f.fract() == 0.0 => Value::Number((f as i64).into()),
            _ => Value::Number(n),
        },
        (Shape::Float, Value::Number(n)) if !n.is_f64() => match n.as_f64() {
            Some(f) => Value::Number(Number::from(f)),
            None => Value::Number(n),
        },
        (Shape::List(item), Value::Sequence(items)) => Value::Sequence(
            items.into_iter().map(|value| coerce(item, value)).collect(),
        ),
        (Shape::Map(item), Value::Mapping(entries)) => Value::Mapping(
            entries
                .into_iter()
                .map(|(key, value)| (key, coerce(item, value)))
                .collect(),
        ),
        (_, value) => value,
    }
}

fn resolve_files(ctx: &ExecutionContext, value: Value) -> Value {
    match value {
        Value::String(path) => {
            Value::String(resolve_path(&ctx.base_dir(), &path).to_string_lossy().into_owned())
        }
        Value::Sequence(items) => Value::Sequence(
            items.into_iter().map(|item| resolve_files(ctx, item)).collect(),
        ),
        other => other,
    }
}
