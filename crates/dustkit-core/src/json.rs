//! Human-readable JSON projection of variable trees.
//!
//! A variable is split into a *schema* describing its types and a plain
//! JSON *value*. Scalars use the schema strings `"bool"`, `"int"`, `"uint"`,
//! `"float"`, `"string"` and `"vec2"`; structs become objects of schemas and
//! arrays become a one-element list holding the element schema. Strings are
//! mapped byte-for-char through latin-1 so arbitrary bytes survive.
//!
//! # Format
//!
//! ```text
//! variable:  Struct { name: String("Hi"), nodes: Array<Vec2>[(1, 2)] }
//! schema:    {"name": "string", "nodes": ["vec2"]}
//! value:     {"name": "Hi", "nodes": [[1.0, 2.0]]}
//! ```

use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::variable::{Variable, VariableArray, VariableMap, VariableType};

fn json_err(detail: impl Into<String>) -> CoreError {
    CoreError::Json {
        detail: detail.into(),
    }
}

fn latin1_decode(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

fn latin1_encode(text: &str) -> Result<Vec<u8>, CoreError> {
    text.chars()
        .map(|c| {
            u8::try_from(u32::from(c))
                .map_err(|_| json_err(format!("character {c:?} is not latin-1")))
        })
        .collect()
}

fn scalar_type(schema: &str) -> Result<VariableType, CoreError> {
    Ok(match schema {
        "bool" => VariableType::Bool,
        "int" => VariableType::Int,
        "uint" => VariableType::UInt,
        "float" => VariableType::Float,
        "string" => VariableType::String,
        "vec2" => VariableType::Vec2,
        other => return Err(json_err(format!("unknown schema type '{other}'"))),
    })
}

/// Project a variable into a `(schema, value)` pair.
///
/// Fails only when the elements of an array of structs disagree on the
/// type stored under a shared key.
pub fn variables_to_json(var: &Variable) -> Result<(Value, Value), CoreError> {
    Ok(match var {
        Variable::Bool(v) => (Value::from("bool"), Value::from(*v)),
        Variable::Int(v) => (Value::from("int"), Value::from(*v)),
        Variable::UInt(v) => (Value::from("uint"), Value::from(*v)),
        Variable::Float(v) => (Value::from("float"), Value::from(*v)),
        Variable::String(v) => (Value::from("string"), Value::from(latin1_decode(v))),
        Variable::Vec2(x, y) => (
            Value::from("vec2"),
            Value::Array(vec![Value::from(*x), Value::from(*y)]),
        ),
        Variable::Struct(map) => map_to_json(map)?,
        Variable::Array(arr) => array_to_json(arr)?,
    })
}

/// Project a variable map (the root of every level and var file).
pub fn map_to_json(map: &VariableMap) -> Result<(Value, Value), CoreError> {
    let mut schema = Map::new();
    let mut value = Map::new();
    for (key, var) in map {
        let (s, v) = variables_to_json(var)?;
        schema.insert(key.clone(), s);
        value.insert(key.clone(), v);
    }
    Ok((Value::Object(schema), Value::Object(value)))
}

fn array_to_json(arr: &VariableArray) -> Result<(Value, Value), CoreError> {
    let elem = match arr.element_type() {
        VariableType::Array => Value::Array(Vec::new()),
        VariableType::Struct => Value::Object(Map::new()),
        scalar => Value::from(scalar.name()),
    };
    let mut schema = elem;
    let mut values = Vec::with_capacity(arr.len());
    for var in arr {
        let (s, v) = variables_to_json(var)?;
        schema = merge_schema(&schema, &s)?;
        values.push(v);
    }
    Ok((Value::Array(vec![schema]), Value::Array(values)))
}

/// Merge two schemas, unioning struct keys and recursing into arrays.
///
/// An empty list schema (an array of arrays with no elements seen yet)
/// merges with any list schema.
pub fn merge_schema(lhs: &Value, rhs: &Value) -> Result<Value, CoreError> {
    match (lhs, rhs) {
        (Value::Object(l), Value::Object(r)) => {
            let mut out = l.clone();
            for (key, rs) in r {
                let merged = match out.get(key) {
                    Some(ls) => merge_schema(ls, rs)?,
                    None => rs.clone(),
                };
                out.insert(key.clone(), merged);
            }
            Ok(Value::Object(out))
        }
        (Value::Array(l), Value::Array(r)) => match (l.first(), r.first()) {
            (None, _) => Ok(rhs.clone()),
            (_, None) => Ok(lhs.clone()),
            (Some(le), Some(re)) => Ok(Value::Array(vec![merge_schema(le, re)?])),
        },
        (Value::String(l), Value::String(r)) if l == r => Ok(lhs.clone()),
        (Value::String(l), Value::String(r)) => {
            Err(json_err(format!("differing schemas {l} and {r}")))
        }
        _ => Err(json_err("unmergeable schemas")),
    }
}

/// Rebuild a variable from a `(schema, value)` pair produced by
/// [`variables_to_json`].
pub fn json_to_variables(schema: &Value, value: &Value) -> Result<Variable, CoreError> {
    match schema {
        Value::Array(elem) => {
            let elem = elem
                .first()
                .ok_or_else(|| json_err("array schema has no element type"))?;
            let element_type = match elem {
                Value::Array(_) => VariableType::Array,
                Value::Object(_) => VariableType::Struct,
                Value::String(s) => scalar_type(s)?,
                _ => return Err(json_err("invalid array element schema")),
            };
            let items = value
                .as_array()
                .ok_or_else(|| json_err("expected a JSON array"))?;
            let mut arr = VariableArray::new(element_type);
            for item in items {
                let var = json_to_variables(elem, item)?;
                if var.variable_type() != element_type {
                    return Err(json_err("array element does not match schema"));
                }
                arr.push(var);
            }
            Ok(Variable::Array(arr))
        }
        Value::Object(fields) => {
            let items = value
                .as_object()
                .ok_or_else(|| json_err("expected a JSON object"))?;
            let mut map = VariableMap::new();
            for (key, item) in items {
                let sub = fields
                    .get(key)
                    .ok_or_else(|| json_err(format!("no schema for key '{key}'")))?;
                map.insert(key.clone(), json_to_variables(sub, item)?);
            }
            Ok(Variable::Struct(map))
        }
        Value::String(s) => scalar_from_json(scalar_type(s)?, value),
        _ => Err(json_err("invalid schema")),
    }
}

fn scalar_from_json(vtype: VariableType, value: &Value) -> Result<Variable, CoreError> {
    let mismatch = || json_err(format!("value {value} is not a valid {vtype}"));
    Ok(match vtype {
        VariableType::Bool => Variable::Bool(value.as_bool().ok_or_else(mismatch)?),
        VariableType::Int => Variable::Int(
            value
                .as_i64()
                .and_then(|v| i32::try_from(v).ok())
                .ok_or_else(mismatch)?,
        ),
        VariableType::UInt => Variable::UInt(
            value
                .as_u64()
                .and_then(|v| u32::try_from(v).ok())
                .ok_or_else(mismatch)?,
        ),
        VariableType::Float => Variable::Float(value.as_f64().ok_or_else(mismatch)?),
        VariableType::String => {
            Variable::String(latin1_encode(value.as_str().ok_or_else(mismatch)?)?)
        }
        VariableType::Vec2 => match value.as_array().map(Vec::as_slice) {
            Some([x, y]) => Variable::Vec2(
                x.as_f64().ok_or_else(mismatch)?,
                y.as_f64().ok_or_else(mismatch)?,
            ),
            _ => return Err(mismatch()),
        },
        _ => return Err(mismatch()),
    })
}
