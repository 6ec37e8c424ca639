//! Filter predicates and their evaluator.
//!
//! A filter is written as an arrow function, `(e) => e.payload.label.name == "bug"`,
//! but it is not run by a general interpreter: the body is parsed into the
//! small `Expr` tree below and evaluated against the JSON view of the event
//! (see [`EventContext::to_value`]). Evaluation is pure, synchronous and
//! cannot fail; missing fields read as `null`.
//!
//! Supported:
//!
//! ```text
//! e.payload.issue.title            member access, e.payload["label"] indexing
//! == != (loose)  === !== (strict)  < <= > >=
//! && || !                          with JS truthiness
//! .includes(x) .startsWith(s) .endsWith(s) .match(re)
//! .toLowerCase() .toUpperCase()    .length on strings and arrays
//! ```

use issuewright_core::EventContext;
use regex_lite::Regex;
use serde_json::Value;
use std::borrow::Cow;
use std::fmt;

/// A parsed filter predicate.
#[derive(Debug, Clone)]
pub struct Predicate {
    param: String,
    body: Expr,
    source: String,
}

impl Predicate {
    pub(crate) fn new(param: String, body: Expr, source: String) -> Self {
        Self {
            param,
            body,
            source,
        }
    }

    /// Evaluate against an event.
    pub fn evaluate(&self, ctx: &EventContext) -> bool {
        self.evaluate_view(&ctx.to_value())
    }

    /// Evaluate against an already-built event view.
    pub fn evaluate_view(&self, view: &Value) -> bool {
        truthy(&self.body.eval(view))
    }

    /// The arrow function's parameter name.
    pub fn param(&self) -> &str {
        &self.param
    }

    /// The predicate as written in the script.
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Expression tree.
#[derive(Debug, Clone)]
pub(crate) enum Expr {
    Literal(Value),
    /// The arrow function's parameter, i.e. the event view.
    Param,
    Member(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Call {
        target: Box<Expr>,
        method: Method,
        args: Vec<Expr>,
    },
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Compare(Box<Expr>, CompareOp, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CompareOp {
    LooseEq,
    LooseNotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    Lte,
    Gt,
    Gte,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Method {
    Includes,
    StartsWith,
    EndsWith,
    Match,
    ToLowerCase,
    ToUpperCase,
}

impl Method {
    pub(crate) fn from_name(name: &str) -> Option<Self> {
        match name {
            "includes" => Some(Method::Includes),
            "startsWith" => Some(Method::StartsWith),
            "endsWith" => Some(Method::EndsWith),
            "match" => Some(Method::Match),
            "toLowerCase" => Some(Method::ToLowerCase),
            "toUpperCase" => Some(Method::ToUpperCase),
            _ => None,
        }
    }

    pub(crate) fn arity(self) -> usize {
        match self {
            Method::ToLowerCase | Method::ToUpperCase => 0,
            _ => 1,
        }
    }
}

impl Expr {
    /// Evaluate against the event view. Member and index chains borrow
    /// from the view; only computed values are owned.
    pub(crate) fn eval<'a>(&'a self, view: &'a Value) -> Cow<'a, Value> {
        match self {
            Expr::Literal(v) => Cow::Borrowed(v),
            Expr::Param => Cow::Borrowed(view),
            Expr::Member(target, name) => match target.eval(view) {
                Cow::Borrowed(v) => member(v, name),
                Cow::Owned(v) => Cow::Owned(member(&v, name).into_owned()),
            },
            Expr::Index(target, index) => {
                let index = index.eval(view);
                match target.eval(view) {
                    Cow::Borrowed(v) => index_into(v, &index),
                    Cow::Owned(v) => Cow::Owned(index_into(&v, &index).into_owned()),
                }
            }
            Expr::Call {
                target,
                method,
                args,
            } => {
                let target = target.eval(view);
                let arg = args.first().map(|a| a.eval(view));
                Cow::Owned(call(&target, *method, arg.as_deref().unwrap_or(&Value::Null)))
            }
            Expr::Not(inner) => Cow::Owned(Value::Bool(!truthy(&inner.eval(view)))),
            Expr::And(a, b) => {
                let left = a.eval(view);
                if truthy(&left) { b.eval(view) } else { left }
            }
            Expr::Or(a, b) => {
                let left = a.eval(view);
                if truthy(&left) { left } else { b.eval(view) }
            }
            Expr::Compare(a, op, b) => {
                Cow::Owned(Value::Bool(compare(&a.eval(view), *op, &b.eval(view))))
            }
        }
    }
}

static NULL: Value = Value::Null;

fn member<'a>(target: &'a Value, name: &str) -> Cow<'a, Value> {
    match (target, name) {
        (Value::String(s), "length") => Cow::Owned(Value::from(s.chars().count())),
        (Value::Array(items), "length") => Cow::Owned(Value::from(items.len())),
        (Value::Object(map), _) => map.get(name).map_or(Cow::Borrowed(&NULL), Cow::Borrowed),
        _ => Cow::Borrowed(&NULL),
    }
}

fn index_into<'a>(target: &'a Value, index: &Value) -> Cow<'a, Value> {
    match (target, index) {
        (Value::Array(items), Value::Number(n)) => n
            .as_u64()
            .and_then(|i| items.get(i as usize))
            .map_or(Cow::Borrowed(&NULL), Cow::Borrowed),
        (Value::String(s), Value::Number(n)) => Cow::Owned(
            n.as_u64()
                .and_then(|i| s.chars().nth(i as usize))
                .map(|c| Value::String(c.to_string()))
                .unwrap_or(Value::Null),
        ),
        (_, Value::String(key)) => member(target, key),
        _ => Cow::Borrowed(&NULL),
    }
}

fn call(target: &Value, method: Method, arg: &Value) -> Value {
    match (method, target) {
        (Method::Includes, Value::String(s)) => {
            Value::Bool(arg.as_str().is_some_and(|needle| s.contains(needle)))
        }
        (Method::Includes, Value::Array(items)) => {
            Value::Bool(items.iter().any(|item| strict_eq(item, arg)))
        }
        (Method::StartsWith, Value::String(s)) => {
            Value::Bool(arg.as_str().is_some_and(|prefix| s.starts_with(prefix)))
        }
        (Method::EndsWith, Value::String(s)) => {
            Value::Bool(arg.as_str().is_some_and(|suffix| s.ends_with(suffix)))
        }
        (Method::Match, Value::String(s)) => Value::Bool(
            arg.as_str()
                .is_some_and(|pattern| Regex::new(pattern).is_ok_and(|re| re.is_match(s))),
        ),
        (Method::ToLowerCase, Value::String(s)) => Value::String(s.to_lowercase()),
        (Method::ToUpperCase, Value::String(s)) => Value::String(s.to_uppercase()),
        (Method::Includes | Method::StartsWith | Method::EndsWith | Method::Match, _) => {
            Value::Bool(false)
        }
        _ => Value::Null,
    }
}

/// JS truthiness.
pub(crate) fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|x| x != 0.0 && !x.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn compare(a: &Value, op: CompareOp, b: &Value) -> bool {
    match op {
        CompareOp::LooseEq => loose_eq(a, b),
        CompareOp::LooseNotEq => !loose_eq(a, b),
        CompareOp::StrictEq => strict_eq(a, b),
        CompareOp::StrictNotEq => !strict_eq(a, b),
        CompareOp::Lt => relational(a, b).is_some_and(|o| o.is_lt()),
        CompareOp::Lte => relational(a, b).is_some_and(|o| o.is_le()),
        CompareOp::Gt => relational(a, b).is_some_and(|o| o.is_gt()),
        CompareOp::Gte => relational(a, b).is_some_and(|o| o.is_ge()),
    }
}

fn strict_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// `==` semantics: null only equals null, numbers and numeric strings
/// compare by value, booleans compare as 0/1.
fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::String(_), Value::String(_)) => a == b,
        (Value::Bool(_), _) | (_, Value::Bool(_)) => {
            matches!((to_number(a), to_number(b)), (Some(x), Some(y)) if x == y)
        }
        (Value::Number(_), Value::String(_)) | (Value::String(_), Value::Number(_)) => {
            matches!((to_number(a), to_number(b)), (Some(x), Some(y)) if x == y)
        }
        _ => strict_eq(a, b),
    }
}

fn relational(a: &Value, b: &Value) -> Option<std::cmp::Ordering> {
    if let (Value::String(x), Value::String(y)) = (a, b) {
        return Some(x.cmp(y));
    }
    to_number(a)?.partial_cmp(&to_number(b)?)
}

fn to_number(v: &Value) -> Option<f64> {
    match v {
        Value::Null => Some(0.0),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => n.as_f64(),
        Value::String(s) if s.trim().is_empty() => Some(0.0),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lit(v: Value) -> Box<Expr> {
        Box::new(Expr::Literal(v))
    }

    fn path(parts: &[&str]) -> Box<Expr> {
        parts
            .iter()
            .fold(Box::new(Expr::Param), |acc, p| Box::new(Expr::Member(acc, p.to_string())))
    }

    fn view() -> Value {
        json!({
            "event": "issues",
            "action": "labeled",
            "payload": {
                "label": {"name": "bug"},
                "issue": {"number": 7, "title": "Crash on start", "labels": ["bug", "p1"]}
            }
        })
    }

    #[test]
    fn member_access_reads_nested_fields() {
        let e = path(&["payload", "label", "name"]);
        assert_eq!(e.eval(&view()).into_owned(), json!("bug"));
        assert_eq!(path(&["payload", "nope", "deeper"]).eval(&view()).into_owned(), Value::Null);
        assert_eq!(path(&["payload", "issue", "labels", "length"]).eval(&view()).into_owned(), json!(2));
    }

    #[test]
    fn loose_equality_follows_js() {
        assert!(loose_eq(&json!("7"), &json!(7)));
        assert!(loose_eq(&json!(1), &json!(true)));
        assert!(!loose_eq(&Value::Null, &json!(0)));
        assert!(loose_eq(&Value::Null, &Value::Null));
        assert!(!loose_eq(&json!("bug"), &json!("foobar")));
    }

    #[test]
    fn strict_equality_checks_types() {
        assert!(!strict_eq(&json!("7"), &json!(7)));
        assert!(strict_eq(&json!(7), &json!(7.0)));
    }

    #[test]
    fn relational_operators() {
        let number = path(&["payload", "issue", "number"]);
        let gt = Expr::Compare(number.clone(), CompareOp::Gt, lit(json!(5)));
        let lte = Expr::Compare(number, CompareOp::Lte, lit(json!(5)));
        assert_eq!(gt.eval(&view()).into_owned(), json!(true));
        assert_eq!(lte.eval(&view()).into_owned(), json!(false));
        assert!(relational(&json!("a"), &json!("b")).is_some_and(|o| o.is_lt()));
        assert!(relational(&json!({}), &json!(1)).is_none());
    }

    #[test]
    fn logical_operators_short_circuit_to_operands() {
        let or = Expr::Or(path(&["payload", "missing"]), lit(json!("fallback")));
        assert_eq!(or.eval(&view()).into_owned(), json!("fallback"));
        let and = Expr::And(lit(json!(0)), path(&["payload"]));
        assert_eq!(and.eval(&view()).into_owned(), json!(0));
        let not = Expr::Not(path(&["payload", "missing"]));
        assert_eq!(not.eval(&view()).into_owned(), json!(true));
    }

    #[test]
    fn string_and_array_methods() {
        let title = *path(&["payload", "issue", "title"]);
        let labels = *path(&["payload", "issue", "labels"]);
        let call = |target: &Expr, method, arg: Value| Expr::Call {
            target: Box::new(target.clone()),
            method,
            args: vec![Expr::Literal(arg)],
        };
        assert_eq!(call(&title, Method::Includes, json!("Crash")).eval(&view()).into_owned(), json!(true));
        assert_eq!(call(&title, Method::StartsWith, json!("Crash")).eval(&view()).into_owned(), json!(true));
        assert_eq!(call(&title, Method::EndsWith, json!("Crash")).eval(&view()).into_owned(), json!(false));
        assert_eq!(call(&title, Method::Match, json!("(?i)^crash")).eval(&view()).into_owned(), json!(true));
        assert_eq!(call(&labels, Method::Includes, json!("p1")).eval(&view()).into_owned(), json!(true));
        assert_eq!(call(&labels, Method::Includes, json!("p2")).eval(&view()).into_owned(), json!(false));

        let lower = Expr::Call {
            target: Box::new(title),
            method: Method::ToLowerCase,
            args: vec![],
        };
        assert_eq!(lower.eval(&view()).into_owned(), json!("crash on start"));
    }

    #[test]
    fn methods_on_missing_values_are_false() {
        let missing = path(&["payload", "missing"]);
        let call = Expr::Call {
            target: missing,
            method: Method::Includes,
            args: vec![Expr::Literal(json!("x"))],
        };
        assert_eq!(call.eval(&view()).into_owned(), json!(false));
    }

    #[test]
    fn truthiness() {
        assert!(!truthy(&json!("")));
        assert!(!truthy(&json!(0)));
        assert!(truthy(&json!([])));
        assert!(truthy(&json!("0")));
    }
}
