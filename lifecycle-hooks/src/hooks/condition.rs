//! Value conditions used by hook specs.

use serde_json::{Number, Value};
use std::fmt;
use std::sync::Arc;

/// Marker string that reads as "any value" in declarative hook params.
pub const WILDCARD: &str = "*";

/// Predicate over a field value.
pub type ValuePredicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// A condition on a prior or current field value.
///
/// A condition is either the wildcard, a fixed value, or a rule evaluated
/// against the value. Fixed values compare as JSON, except that numbers
/// compare by value, so `100` matches `100.0`.
#[derive(Clone, Default)]
pub enum Condition {
    /// Matches every value.
    #[default]
    Any,
    /// Matches values equal to this one.
    Value(Value),
    /// Matches values for which the predicate returns true.
    Predicate(ValuePredicate),
}

impl Condition {
    /// Build a predicate condition from a closure.
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Condition::Predicate(Arc::new(f))
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Condition::Any)
    }

    pub fn is_predicate(&self) -> bool {
        matches!(self, Condition::Predicate(_))
    }

    /// Read the `"*"` marker as [`Condition::Any`].
    ///
    /// Only expected values (`was`, `is_now`) take the marker as a wildcard.
    /// Exclusions and transition targets compare against the string `"*"`.
    pub fn expand_wildcard(self) -> Self {
        match self {
            Condition::Value(Value::String(s)) if s == WILDCARD => Condition::Any,
            other => other,
        }
    }

    /// Whether `value` satisfies the condition.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Condition::Any => true,
            Condition::Value(expected) => values_equal(expected, value),
            Condition::Predicate(f) => f(value),
        }
    }

    /// Literal comparison only: predicates never equal a value.
    ///
    /// Exclusion checks (`is_not`, `was_not`) are evaluated with this, so a
    /// predicate given there never excludes anything.
    pub fn equals_literal(&self, value: &Value) -> bool {
        match self {
            Condition::Value(expected) => values_equal(expected, value),
            Condition::Any | Condition::Predicate(_) => false,
        }
    }
}

fn values_equal(expected: &Value, value: &Value) -> bool {
    match (expected, value) {
        (Value::Number(a), Value::Number(b)) => numbers_equal(a, b),
        _ => expected == value,
    }
}

// Integers compare exactly; anything involving a float compares as f64.
fn numbers_equal(a: &Number, b: &Number) -> bool {
    if let (Some(a), Some(b)) = (a.as_i64(), b.as_i64()) {
        return a == b;
    }
    if let (Some(a), Some(b)) = (a.as_u64(), b.as_u64()) {
        return a == b;
    }
    if a.is_f64() || b.is_f64() {
        return a.as_f64() == b.as_f64();
    }
    false
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Any => f.write_str("Any"),
            Condition::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Condition::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl From<Value> for Condition {
    fn from(value: Value) -> Self {
        Condition::Value(value)
    }
}

impl From<&str> for Condition {
    fn from(value: &str) -> Self {
        Value::from(value).into()
    }
}

impl From<String> for Condition {
    fn from(value: String) -> Self {
        Value::from(value).into()
    }
}

impl From<bool> for Condition {
    fn from(value: bool) -> Self {
        Condition::Value(Value::Bool(value))
    }
}

impl From<i64> for Condition {
    fn from(value: i64) -> Self {
        Condition::Value(Value::from(value))
    }
}

impl From<i32> for Condition {
    fn from(value: i32) -> Self {
        Condition::Value(Value::from(value))
    }
}

impl From<f64> for Condition {
    fn from(value: f64) -> Self {
        Condition::Value(Value::from(value))
    }
}

impl<T: Into<Condition>> From<Option<T>> for Condition {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => Condition::Value(Value::Null),
        }
    }
}
