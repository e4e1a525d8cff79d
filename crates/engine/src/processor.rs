//! Template processor – finds `${ /pointer }` expressions, orders them by
//! dependency and copies referenced values into the output.

use crate::pointer;
use crate::traits::EngineError;
use crate::types::ResultValue;
use regex::Regex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

fn expr_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*\$\{\s*(.*?)\s*\}\s*$").expect("static regex"))
}

/// One expression found in the template.
#[derive(Debug, Clone)]
pub struct ExprNode {
    /// Where the result is written.
    pub pointer: String,
    /// Expression source, without the `${ }` wrapper.
    pub expr: String,
    /// Pointer the expression reads from.
    pub reads: String,
}

pub struct TemplateProcessor {
    input: Value,
    output: Value,
    nodes: Vec<ExprNode>,
    plan: Vec<usize>,
}

impl TemplateProcessor {
    /// Compile the template and run the full evaluation plan.
    pub fn new(input: Value) -> Result<Self, EngineError> {
        let nodes = compile_nodes(&input)?;
        let plan = topological_order(&nodes)?;
        let mut output = input.clone();
        let mut tp = Self {
            output: Value::Null,
            input,
            nodes,
            plan,
        };
        tp.evaluate_into(&mut output, &tp.plan)?;
        tp.output = output;
        tracing::debug!(expressions = tp.nodes.len(), "template initialized");
        Ok(tp)
    }

    pub fn input(&self) -> &Value {
        &self.input
    }

    pub fn output(&self) -> &Value {
        &self.output
    }

    /// Write `data` at `ptr` and re-run whatever depends on it. On error the
    /// output is left exactly as it was.
    pub fn set_data(&mut self, ptr: &str, data: Value) -> Result<(), EngineError> {
        let ptr = pointer::normalize(ptr)?;
        let mut next = self.output.clone();
        pointer::set(&mut next, &ptr, data)?;
        let affected = self.dependents_of(&ptr);
        tracing::debug!(pointer = %ptr, affected = affected.len(), "data set");
        self.evaluate_into(&mut next, &affected)?;
        self.output = next;
        Ok(())
    }

    /// Pointers of expressions in evaluation order.
    pub fn plan(&self) -> Vec<String> {
        self.plan
            .iter()
            .map(|&i| self.nodes[i].pointer.clone())
            .collect()
    }

    /// Expressions that must re-run when `ptr` changes, in plan order.
    pub fn from(&self, ptr: &str) -> Result<Vec<String>, EngineError> {
        let ptr = pointer::normalize(ptr)?;
        Ok(self
            .dependents_of(&ptr)
            .into_iter()
            .map(|i| self.nodes[i].pointer.clone())
            .collect())
    }

    /// Everything `ptr` reads from, directly or through other expressions,
    /// in plan order.
    pub fn to(&self, ptr: &str) -> Result<Vec<String>, EngineError> {
        let ptr = pointer::normalize(ptr)?;
        let mut reads: Vec<String> = Vec::new();
        let mut seen: HashSet<usize> = HashSet::new();
        let mut stack: Vec<usize> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| pointer::is_within(&n.pointer, &ptr))
            .map(|(i, _)| i)
            .collect();

        while let Some(i) = stack.pop() {
            if !seen.insert(i) {
                continue;
            }
            let read = &self.nodes[i].reads;
            if !reads.contains(read) {
                reads.push(read.clone());
            }
            for (j, n) in self.nodes.iter().enumerate() {
                if pointer::overlaps(&n.pointer, read) {
                    stack.push(j);
                }
            }
        }

        // Order by the plan position of the expression producing each read;
        // plain data (no producing expression) comes first.
        let rank: HashMap<&str, usize> = self
            .plan
            .iter()
            .enumerate()
            .map(|(pos, &i)| (self.nodes[i].pointer.as_str(), pos + 1))
            .collect();
        reads.sort_by_key(|r| rank.get(r.as_str()).copied().unwrap_or(0));
        Ok(reads)
    }

    /// Template meta: one entry per expression pointer.
    pub fn meta(&self) -> ResultValue {
        let entries = self.nodes.iter().map(|n| {
            let dependees = self
                .nodes
                .iter()
                .filter(|other| pointer::overlaps(&other.reads, &n.pointer))
                .map(|other| other.pointer.as_str());
            let materialized = pointer::get(&self.output, &n.pointer).ok().flatten()
                != pointer::get(&self.input, &n.pointer).ok().flatten();
            (
                n.pointer.clone(),
                ResultValue::object([
                    ("jsonPointer__", ResultValue::string(&n.pointer)),
                    ("expr__", ResultValue::string(&n.expr)),
                    ("dependencies__", ResultValue::string_array([&n.reads])),
                    ("dependees__", ResultValue::string_set(dependees)),
                    ("compiledExpr__", ResultValue::CompiledExpr(format!("ref({})", n.reads))),
                    ("materialized__", ResultValue::Bool(materialized)),
                ]),
            )
        });
        ResultValue::object(entries)
    }

    fn dependents_of(&self, ptr: &str) -> Vec<usize> {
        let mut changed: Vec<String> = vec![ptr.to_string()];
        let mut hit: HashSet<usize> = HashSet::new();
        while let Some(c) = changed.pop() {
            for (i, n) in self.nodes.iter().enumerate() {
                if !hit.contains(&i) && pointer::overlaps(&n.reads, &c) {
                    hit.insert(i);
                    changed.push(n.pointer.clone());
                }
            }
        }
        self.plan.iter().copied().filter(|i| hit.contains(i)).collect()
    }

    fn evaluate_into(&self, output: &mut Value, order: &[usize]) -> Result<(), EngineError> {
        for &i in order {
            let node = &self.nodes[i];
            let value = pointer::get(output, &node.reads)?
                .cloned()
                .unwrap_or(Value::Null);
            tracing::trace!(pointer = %node.pointer, reads = %node.reads, "evaluate");
            pointer::set(output, &node.pointer, value)?;
        }
        Ok(())
    }
}

fn compile_nodes(input: &Value) -> Result<Vec<ExprNode>, EngineError> {
    let mut nodes = Vec::new();
    for (ptr, text) in pointer::string_leaves(input) {
        let Some(caps) = expr_pattern().captures(&text) else {
            continue;
        };
        let expr = caps.get(1).map(|m| m.as_str()).unwrap_or_default().to_string();
        let reads = pointer::normalize(&expr).map_err(|_| {
            EngineError::Parse(format!(
                "expression at {} must be a json pointer like /a/b, got '{}'",
                ptr, expr
            ))
        })?;
        if pointer::is_within(&ptr, &reads) {
            return Err(EngineError::Cycle(vec![ptr.clone(), reads]));
        }
        nodes.push(ExprNode {
            pointer: ptr,
            expr,
            reads,
        });
    }
    Ok(nodes)
}

/// Depth-first topological sort; an expression runs after every expression
/// whose output overlaps what it reads.
fn topological_order(nodes: &[ExprNode]) -> Result<Vec<usize>, EngineError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        New,
        Active,
        Done,
    }

    fn visit(
        i: usize,
        nodes: &[ExprNode],
        marks: &mut [Mark],
        stack: &mut Vec<usize>,
        order: &mut Vec<usize>,
    ) -> Result<(), EngineError> {
        match marks[i] {
            Mark::Done => return Ok(()),
            Mark::Active => {
                let start = stack.iter().position(|&s| s == i).unwrap_or(0);
                let mut cycle: Vec<String> =
                    stack[start..].iter().map(|&s| nodes[s].pointer.clone()).collect();
                cycle.push(nodes[i].pointer.clone());
                return Err(EngineError::Cycle(cycle));
            }
            Mark::New => {}
        }
        marks[i] = Mark::Active;
        stack.push(i);
        for (j, dep) in nodes.iter().enumerate() {
            if j != i && pointer::overlaps(&dep.pointer, &nodes[i].reads) {
                visit(j, nodes, marks, stack, order)?;
            }
        }
        stack.pop();
        marks[i] = Mark::Done;
        order.push(i);
        Ok(())
    }

    let mut marks = vec![Mark::New; nodes.len()];
    let mut order = Vec::with_capacity(nodes.len());
    let mut stack = Vec::new();
    for i in 0..nodes.len() {
        visit(i, nodes, &mut marks, &mut stack, &mut order)?;
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chain() -> TemplateProcessor {
        TemplateProcessor::new(json!({
            "c": "${ /b }",
            "b": "${ /a/x }",
            "a": {"x": 1},
            "other": 5
        }))
        .unwrap()
    }

    #[test]
    fn test_evaluates_in_dependency_order() {
        let tp = chain();
        assert_eq!(tp.output(), &json!({"c": 1, "b": 1, "a": {"x": 1}, "other": 5}));
        assert_eq!(tp.plan(), vec!["/b", "/c"]);
        assert_eq!(tp.input()["c"], json!("${ /b }"));
    }

    #[test]
    fn test_set_propagates_to_dependents() {
        let mut tp = chain();
        tp.set_data("/a/x", json!(42)).unwrap();
        assert_eq!(tp.output()["b"], json!(42));
        assert_eq!(tp.output()["c"], json!(42));
        tp.set_data("/other", json!(6)).unwrap();
        assert_eq!(tp.output()["c"], json!(42));
    }

    #[test]
    fn test_set_parent_reaches_child_readers() {
        let mut tp = chain();
        tp.set_data("/a", json!({"x": "new"})).unwrap();
        assert_eq!(tp.output()["c"], json!("new"));
    }

    #[test]
    fn test_failed_set_leaves_output_untouched() {
        let mut tp = TemplateProcessor::new(json!({"arr": [1, "${ /x }"], "x": 1})).unwrap();
        tp.set_data("/arr", json!([])).unwrap();
        let before = tp.output().clone();

        let err = tp.set_data("/x", json!(2)).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
        assert_eq!(tp.output(), &before);
        assert_eq!(tp.output()["x"], json!(1));
    }

    #[test]
    fn test_from_and_to() {
        let tp = chain();
        assert_eq!(tp.from("/a/x").unwrap(), vec!["/b", "/c"]);
        assert_eq!(tp.from("/other").unwrap(), Vec::<String>::new());
        assert_eq!(tp.to("/c").unwrap(), vec!["/a/x", "/b"]);
        assert_eq!(tp.to("/b").unwrap(), vec!["/a/x"]);
    }

    #[test]
    fn test_missing_reference_is_null() {
        let tp = TemplateProcessor::new(json!({"a": "${ /nope }"})).unwrap();
        assert_eq!(tp.output(), &json!({"a": null}));
    }

    #[test]
    fn test_cycle_is_rejected() {
        let err = TemplateProcessor::new(json!({"a": "${ /b }", "b": "${ /a }"}))
            .err()
            .unwrap();
        assert!(matches!(err, EngineError::Cycle(_)));
        let err = TemplateProcessor::new(json!({"a": {"b": "${ /a }"}}))
            .err()
            .unwrap();
        assert!(matches!(err, EngineError::Cycle(_)));
    }

    #[test]
    fn test_bad_expression() {
        let err = TemplateProcessor::new(json!({"a": "${ 1 + 2 }"})).err().unwrap();
        assert!(matches!(err, EngineError::Parse(_)));
    }

    #[test]
    fn test_meta_shape() {
        let tp = chain();
        let meta = tp.meta();
        let b = meta.get("/b").unwrap();
        assert_eq!(b.get("expr__"), Some(&ResultValue::string("/a/x")));
        assert_eq!(b.get("dependees__"), Some(&ResultValue::string_set(["/c"])));
        assert!(matches!(b.get("compiledExpr__"), Some(ResultValue::CompiledExpr(_))));
        assert_eq!(b.get("materialized__"), Some(&ResultValue::Bool(true)));
    }
}
