use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Result values – what every engine operation hands back to the shell
// ---------------------------------------------------------------------------

/// Ordered key/value pairs of an object result. Insertion order is kept so
/// printed output follows the order the engine produced.
pub type ResultMap = Vec<(String, ResultValue)>;

/// A value returned by an engine operation.
///
/// Plain JSON shapes map one-to-one onto the first seven variants. The rest
/// are engine internals that cannot be rendered structurally; the serializer
/// swaps them for fixed placeholders instead of probing for marker fields.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultValue {
    /// Absent value. Renders as `null`.
    Undefined,
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Array(Vec<ResultValue>),
    Object(ResultMap),
    /// A compiled callable.
    Function,
    /// Opaque compiled form of an expression.
    CompiledExpr(String),
    /// A pending timer or interval handle.
    Timer { delay_ms: u64 },
    /// Set-like collection, members in insertion order.
    Set(Vec<ResultValue>),
}

impl ResultValue {
    pub fn object<K: Into<String>>(fields: impl IntoIterator<Item = (K, ResultValue)>) -> Self {
        ResultValue::Object(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn string(s: impl Into<String>) -> Self {
        ResultValue::String(s.into())
    }

    /// A set of strings, duplicates dropped, first occurrence wins.
    pub fn string_set<S: AsRef<str>>(items: impl IntoIterator<Item = S>) -> Self {
        let mut members: Vec<ResultValue> = Vec::new();
        for item in items {
            let v = ResultValue::string(item.as_ref());
            if !members.contains(&v) {
                members.push(v);
            }
        }
        ResultValue::Set(members)
    }

    pub fn string_array<S: AsRef<str>>(items: impl IntoIterator<Item = S>) -> Self {
        ResultValue::Array(
            items
                .into_iter()
                .map(|s| ResultValue::string(s.as_ref()))
                .collect(),
        )
    }

    pub fn get(&self, key: &str) -> Option<&ResultValue> {
        match self {
            ResultValue::Object(fields) => fields.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }
}

impl From<Value> for ResultValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => ResultValue::Null,
            Value::Bool(b) => ResultValue::Bool(b),
            Value::Number(n) => ResultValue::Number(n),
            Value::String(s) => ResultValue::String(s),
            Value::Array(items) => ResultValue::Array(items.into_iter().map(Into::into).collect()),
            Value::Object(map) => {
                ResultValue::Object(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<&Value> for ResultValue {
    fn from(value: &Value) -> Self {
        value.clone().into()
    }
}

impl From<&str> for ResultValue {
    fn from(s: &str) -> Self {
        ResultValue::string(s)
    }
}

impl From<String> for ResultValue {
    fn from(s: String) -> Self {
        ResultValue::String(s)
    }
}

impl From<bool> for ResultValue {
    fn from(b: bool) -> Self {
        ResultValue::Bool(b)
    }
}

impl<T: Into<ResultValue>> From<Option<T>> for ResultValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(ResultValue::Undefined)
    }
}

// ---------------------------------------------------------------------------
// Diagnostic verbosity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!(
                "unknown log level '{}' (expected one of: debug, info, warn, error)",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_keeps_key_order() {
        let v: Value = serde_json::from_str(r#"{"z": 1, "a": [true, null]}"#).unwrap();
        let r = ResultValue::from(v);
        match r {
            ResultValue::Object(fields) => {
                let keys: Vec<&str> = fields.iter().map(|(k, _)| k.as_str()).collect();
                assert_eq!(keys, vec!["z", "a"]);
            }
            other => panic!("expected object, got {:?}", other),
        }
    }

    #[test]
    fn test_string_set_drops_duplicates() {
        let s = ResultValue::string_set(["b", "a", "b"]);
        assert_eq!(
            s,
            ResultValue::Set(vec![ResultValue::string("b"), ResultValue::string("a")])
        );
    }

    #[test]
    fn test_log_level_parse() {
        assert_eq!("DEBUG".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!(" warn ".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("verbose".parse::<LogLevel>().is_err());
    }
}
