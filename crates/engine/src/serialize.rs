//! Result serializer – renders any [`ResultValue`] as indented JSON text.
//!
//! Engine internals (callables, compiled expressions, timer handles) are
//! replaced with fixed placeholders and sets are flattened to arrays, so
//! rendering never fails.

use crate::types::ResultValue;
use serde_json::{Map, Value};

pub const FUNCTION_PLACEHOLDER: &str = "{function:}";
pub const COMPILED_EXPR_PLACEHOLDER: &str = "--compiled expression--";
pub const TIMER_PLACEHOLDER: &str = "--interval/timeout--";

/// Field name whose value is always hidden behind [`COMPILED_EXPR_PLACEHOLDER`].
pub const COMPILED_EXPR_FIELD: &str = "compiledExpr__";

/// Render a result as two-space indented JSON.
pub fn stringify(value: &ResultValue) -> String {
    let json = to_json(value);
    // Serializing a serde_json::Value with string keys cannot fail.
    serde_json::to_string_pretty(&json).unwrap_or_else(|_| "null".to_string())
}

/// Apply the placeholder rules and produce a plain JSON tree.
pub fn to_json(value: &ResultValue) -> Value {
    convert(None, value)
}

fn convert(key: Option<&str>, value: &ResultValue) -> Value {
    if key == Some(COMPILED_EXPR_FIELD) {
        return Value::String(COMPILED_EXPR_PLACEHOLDER.to_string());
    }
    match value {
        ResultValue::Undefined | ResultValue::Null => Value::Null,
        ResultValue::Bool(b) => Value::Bool(*b),
        ResultValue::Number(n) => Value::Number(n.clone()),
        ResultValue::String(s) => Value::String(s.clone()),
        ResultValue::Function => Value::String(FUNCTION_PLACEHOLDER.to_string()),
        ResultValue::CompiledExpr(_) => Value::String(COMPILED_EXPR_PLACEHOLDER.to_string()),
        ResultValue::Timer { .. } => Value::String(TIMER_PLACEHOLDER.to_string()),
        ResultValue::Array(items) | ResultValue::Set(items) => {
            Value::Array(items.iter().map(|v| convert(None, v)).collect())
        }
        ResultValue::Object(fields) => {
            let mut map = Map::with_capacity(fields.len());
            for (k, v) in fields {
                map.insert(k.clone(), convert(Some(k), v));
            }
            Value::Object(map)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_json_uses_two_space_indent() {
        let v = ResultValue::from(json!({"a": {"b": [1, 2]}, "c": "x"}));
        let expected = "{\n  \"a\": {\n    \"b\": [\n      1,\n      2\n    ]\n  },\n  \"c\": \"x\"\n}";
        assert_eq!(stringify(&v), expected);
    }

    #[test]
    fn test_undefined_renders_null_everywhere() {
        assert_eq!(stringify(&ResultValue::Undefined), "null");
        let v = ResultValue::object([
            ("a", ResultValue::Undefined),
            ("b", ResultValue::Array(vec![ResultValue::Undefined])),
        ]);
        assert_eq!(to_json(&v), json!({"a": null, "b": [null]}));
    }

    #[test]
    fn test_function_placeholder_at_any_depth() {
        let v = ResultValue::object([
            ("f", ResultValue::Function),
            (
                "deep",
                ResultValue::object([(
                    "list",
                    ResultValue::Array(vec![ResultValue::Null, ResultValue::Function]),
                )]),
            ),
            ("sibling", ResultValue::from(json!(3))),
        ]);
        assert_eq!(
            to_json(&v),
            json!({
                "f": "{function:}",
                "deep": {"list": [null, "{function:}"]},
                "sibling": 3
            })
        );
    }

    #[test]
    fn test_compiled_expr_field_hidden_whatever_its_content() {
        let v = ResultValue::object([
            ("expr__", ResultValue::string("/a")),
            (
                "compiledExpr__",
                ResultValue::from(json!({"type": "path", "steps": [1, 2, 3]})),
            ),
        ]);
        assert_eq!(
            to_json(&v),
            json!({"expr__": "/a", "compiledExpr__": "--compiled expression--"})
        );
    }

    #[test]
    fn test_compiled_expr_variant_elsewhere() {
        let v = ResultValue::Array(vec![ResultValue::CompiledExpr("ref(/a)".into())]);
        assert_eq!(to_json(&v), json!(["--compiled expression--"]));
    }

    #[test]
    fn test_timer_placeholder() {
        let v = ResultValue::object([("poll", ResultValue::Timer { delay_ms: 1000 })]);
        assert_eq!(to_json(&v), json!({"poll": "--interval/timeout--"}));
    }

    #[test]
    fn test_set_renders_in_insertion_order() {
        let v = ResultValue::string_set(["a", "b", "c"]);
        assert_eq!(to_json(&v), json!(["a", "b", "c"]));
        let v = ResultValue::string_set(["c", "a", "b"]);
        assert_eq!(to_json(&v), json!(["c", "a", "b"]));
    }

    #[test]
    fn test_object_key_order_preserved() {
        let v = ResultValue::object([
            ("zeta", ResultValue::Null),
            ("alpha", ResultValue::Bool(true)),
        ]);
        assert_eq!(stringify(&v), "{\n  \"zeta\": null,\n  \"alpha\": true\n}");
    }

    #[test]
    fn test_stringify_is_idempotent() {
        let v = ResultValue::object([
            ("s", ResultValue::string_set(["x", "y"])),
            ("t", ResultValue::Timer { delay_ms: 5 }),
            ("f", ResultValue::Function),
            ("n", ResultValue::from(json!({"k": [1.5, "v"]}))),
        ]);
        assert_eq!(stringify(&v), stringify(&v));
    }
}
