//! JSON pointer (RFC 6901) helpers over `serde_json::Value`.

use crate::traits::EngineError;
use serde_json::{Map, Value};

/// Split a pointer into unescaped reference tokens. Only `""` addresses the
/// root; `"/"` is the empty key and whitespace belongs to the token.
pub fn parse(pointer: &str) -> Result<Vec<String>, EngineError> {
    if pointer.is_empty() {
        return Ok(Vec::new());
    }
    let rest = pointer.strip_prefix('/').ok_or_else(|| {
        EngineError::InvalidInput(format!("json pointer must start with '/': {}", pointer))
    })?;
    Ok(rest
        .split('/')
        .map(|t| t.replace("~1", "/").replace("~0", "~"))
        .collect())
}

/// Build a pointer string from tokens.
pub fn compile(tokens: &[String]) -> String {
    tokens
        .iter()
        .map(|t| format!("/{}", t.replace('~', "~0").replace('/', "~1")))
        .collect()
}

/// Normalise a pointer to its canonical escaped form.
pub fn normalize(pointer: &str) -> Result<String, EngineError> {
    Ok(compile(&parse(pointer)?))
}

pub fn get<'a>(doc: &'a Value, pointer: &str) -> Result<Option<&'a Value>, EngineError> {
    let mut cur = doc;
    for token in parse(pointer)? {
        let next = match cur {
            Value::Object(map) => map.get(&token),
            Value::Array(items) => token.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        match next {
            Some(v) => cur = v,
            None => return Ok(None),
        }
    }
    Ok(Some(cur))
}

/// Write `value` at `pointer`, creating intermediate objects. Array tokens
/// must be an index or `-` (append).
pub fn set(doc: &mut Value, pointer: &str, value: Value) -> Result<(), EngineError> {
    let tokens = parse(pointer)?;
    let Some((last, parents)) = tokens.split_last() else {
        *doc = value;
        return Ok(());
    };

    let mut cur = doc;
    for token in parents {
        if !cur.is_object() && !cur.is_array() {
            *cur = Value::Object(Map::new());
        }
        cur = match cur {
            Value::Object(map) => map
                .entry(token.clone())
                .or_insert_with(|| Value::Object(Map::new())),
            Value::Array(items) => {
                let idx = array_index(token, items.len(), pointer)?;
                if idx == items.len() {
                    items.push(Value::Object(Map::new()));
                }
                &mut items[idx]
            }
            _ => unreachable!("container ensured above"),
        };
    }

    match cur {
        Value::Array(items) => {
            let idx = array_index(last, items.len(), pointer)?;
            if idx == items.len() {
                items.push(value);
            } else {
                items[idx] = value;
            }
        }
        Value::Object(map) => {
            map.insert(last.clone(), value);
        }
        other => {
            let mut map = Map::new();
            map.insert(last.clone(), value);
            *other = Value::Object(map);
        }
    }
    Ok(())
}

fn array_index(token: &str, len: usize, pointer: &str) -> Result<usize, EngineError> {
    if token == "-" {
        return Ok(len);
    }
    match token.parse::<usize>() {
        Ok(i) if i <= len => Ok(i),
        _ => Err(EngineError::InvalidInput(format!(
            "bad array index '{}' in {}",
            token, pointer
        ))),
    }
}

/// Two pointers overlap when one equals, contains or sits inside the other.
pub fn overlaps(a: &str, b: &str) -> bool {
    is_within(a, b) || is_within(b, a)
}

/// `inner` equals `outer` or is a descendant of it.
pub fn is_within(inner: &str, outer: &str) -> bool {
    outer.is_empty() || inner == outer || inner.starts_with(&format!("{}/", outer))
}

/// Every pointer to a string leaf in `doc`, with its text, in document order.
pub fn string_leaves(doc: &Value) -> Vec<(String, String)> {
    let mut out = Vec::new();
    walk(doc, &mut Vec::new(), &mut out);
    out
}

fn walk(v: &Value, path: &mut Vec<String>, out: &mut Vec<(String, String)>) {
    match v {
        Value::String(s) => out.push((compile(path), s.clone())),
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                path.push(i.to_string());
                walk(item, path, out);
                path.pop();
            }
        }
        Value::Object(map) => {
            for (k, item) in map {
                path.push(k.clone());
                walk(item, path, out);
                path.pop();
            }
        }
        _ => {}
    }
}
