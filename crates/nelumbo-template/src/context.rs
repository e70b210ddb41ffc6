//! The data context a template is rendered against.
//!
//! Provides [`Context`], the read-only mapping from top-level names to values,
//! and [`ContextValue`], the typed value model (string, number, bool, mapping,
//! sequence) that interpolations and conditions resolve to.

use std::collections::BTreeMap;
use std::fmt;

use nelumbo_core::NelumboError;

/// Represents a dynamic value in a data context.
///
/// Mappings are ordered by key, so dumps and mapping iteration are deterministic.
#[derive(Debug, Clone)]
pub enum ContextValue {
    /// A string value.
    String(String),
    /// A 64-bit integer.
    Integer(i64),
    /// A 64-bit floating point number.
    Float(f64),
    /// A boolean value.
    Bool(bool),
    /// An ordered sequence of values.
    List(Vec<ContextValue>),
    /// A key-value mapping.
    Dict(BTreeMap<String, ContextValue>),
    /// The absence of a value (`null` in a JSON data file).
    None,
}

impl ContextValue {
    /// Returns `true` if this value is considered "truthy" in a condition.
    ///
    /// - `None` is falsy
    /// - Empty strings, `"0"`, empty lists, empty dicts are falsy
    /// - `Bool(false)` is falsy
    /// - `Integer(0)` and `Float(0.0)` are falsy
    /// - Everything else is truthy
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::None => false,
            Self::Bool(b) => *b,
            Self::Integer(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::String(s) => !s.is_empty() && s != "0",
            Self::List(l) => !l.is_empty(),
            Self::Dict(d) => !d.is_empty(),
        }
    }

    /// Converts this value to the text an interpolation renders.
    ///
    /// Collections are rendered through [`ContextValue::dump`].
    pub fn to_display_string(&self) -> String {
        match self {
            Self::String(s) => s.clone(),
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Bool(b) => b.to_string(),
            Self::List(_) | Self::Dict(_) => self.dump(),
            Self::None => String::new(),
        }
    }

    /// Returns a structural dump of the value, e.g. `['a', {'k': 1}]`.
    pub fn dump(&self) -> String {
        match self {
            Self::String(s) => format!("'{s}'"),
            Self::None => "None".to_string(),
            Self::List(items) => {
                let inner: Vec<String> = items.iter().map(Self::dump).collect();
                format!("[{}]", inner.join(", "))
            }
            Self::Dict(map) => {
                let inner: Vec<String> = map
                    .iter()
                    .map(|(k, v)| format!("'{}': {}", k, v.dump()))
                    .collect();
                format!("{{{}}}", inner.join(", "))
            }
            scalar => scalar.to_display_string(),
        }
    }

    /// Resolves one path segment on this value (a dict key or a list index).
    pub fn resolve_path(&self, key: &str) -> Option<&ContextValue> {
        match self {
            Self::Dict(map) => map.get(key),
            Self::List(list) => key.parse::<usize>().ok().and_then(|idx| list.get(idx)),
            _ => None,
        }
    }

    /// Returns `true` for `None`.
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Returns the length of a list, string, or dict.
    pub fn len(&self) -> Option<usize> {
        match self {
            Self::String(s) => Some(s.len()),
            Self::List(l) => Some(l.len()),
            Self::Dict(d) => Some(d.len()),
            _ => None,
        }
    }

    /// Returns `true` if this is an empty collection or empty string.
    pub fn is_empty(&self) -> Option<bool> {
        self.len().map(|l| l == 0)
    }

    /// Attempts to read this value as a number.
    ///
    /// Strings holding a number (`"17"`, `" 2.5 "`) count as numbers.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            #[allow(clippy::cast_precision_loss)]
            Self::Integer(i) => Some(*i as f64),
            Self::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Returns the string contents if this is a String.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ContextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

impl PartialEq for ContextValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            #[allow(clippy::float_cmp)]
            (Self::Float(a), Self::Float(b)) => a == b,
            #[allow(clippy::cast_precision_loss, clippy::float_cmp)]
            (Self::Integer(a), Self::Float(b)) | (Self::Float(b), Self::Integer(a)) => {
                (*a as f64) == *b
            }
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::None, Self::None) => true,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Dict(a), Self::Dict(b)) => a == b,
            _ => false,
        }
    }
}

// -- From implementations --

impl From<&str> for ContextValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for ContextValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i32> for ContextValue {
    fn from(i: i32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<i64> for ContextValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<f64> for ContextValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for ContextValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl<T: Into<ContextValue>> From<Vec<T>> for ContextValue {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<ContextValue>> From<Option<T>> for ContextValue {
    fn from(o: Option<T>) -> Self {
        match o {
            Some(v) => v.into(),
            None => Self::None,
        }
    }
}

impl From<serde_json::Value> for ContextValue {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Self::None,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Integer(i)
                } else if let Some(f) = n.as_f64() {
                    Self::Float(f)
                } else {
                    Self::None
                }
            }
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(arr) => {
                Self::List(arr.into_iter().map(ContextValue::from).collect())
            }
            serde_json::Value::Object(map) => Self::Dict(
                map.into_iter()
                    .map(|(k, v)| (k, ContextValue::from(v)))
                    .collect(),
            ),
        }
    }
}

/// The data a template is rendered against.
///
/// A context is supplied once per render and never mutated by the engine: loop
/// and condition variables are resolved by rewriting dotted paths in the
/// template text, not by binding new entries.
///
/// # Examples
///
/// ```
/// use nelumbo_template::context::{Context, ContextValue};
///
/// let mut ctx = Context::new();
/// ctx.set("user", serde_json::json!({"profile": {"city": "Lyon"}}).into());
/// assert_eq!(ctx.get("user.profile.city").unwrap().to_display_string(), "Lyon");
/// assert!(ctx.get("user.profile.zip").is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    values: BTreeMap<String, ContextValue>,
}

impl Context {
    /// Creates a new empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a context from a JSON object.
    ///
    /// # Errors
    ///
    /// Returns a `SerializationError` if `value` is not an object.
    pub fn from_json(value: serde_json::Value) -> Result<Self, NelumboError> {
        match value {
            serde_json::Value::Object(map) => Ok(Self {
                values: map
                    .into_iter()
                    .map(|(k, v)| (k, ContextValue::from(v)))
                    .collect(),
            }),
            other => Err(NelumboError::SerializationError(format!(
                "Template data must be a JSON object, got {other}"
            ))),
        }
    }

    /// Parses a context from JSON text.
    ///
    /// # Errors
    ///
    /// Returns a `SerializationError` if the text is not a JSON object.
    pub fn from_json_str(json: &str) -> Result<Self, NelumboError> {
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| NelumboError::SerializationError(format!("Failed to parse data: {e}")))?;
        Self::from_json(value)
    }

    /// Sets a top-level variable.
    pub fn set(&mut self, key: impl Into<String>, value: ContextValue) {
        self.values.insert(key.into(), value);
    }

    /// Returns `true` if a top-level variable named `key` exists.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Looks up a variable by name.
    ///
    /// Supports dot-separated paths like `user.name` or `items.0.title`.
    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        let mut parts = key.split('.');
        let root = parts.next()?;
        parts.try_fold(self.values.get(root)?, |current, part| {
            current.resolve_path(part)
        })
    }
}

impl<K: Into<String>, V: Into<ContextValue>> FromIterator<(K, V)> for Context {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!ContextValue::None.is_truthy());
        assert!(!ContextValue::Bool(false).is_truthy());
        assert!(!ContextValue::Integer(0).is_truthy());
        assert!(!ContextValue::from("").is_truthy());
        assert!(!ContextValue::from("0").is_truthy());
        assert!(!ContextValue::List(vec![]).is_truthy());
        assert!(ContextValue::from("x").is_truthy());
        assert!(ContextValue::Integer(-1).is_truthy());
        assert!(ContextValue::from(vec!["a"]).is_truthy());
    }

    #[test]
    fn test_display_scalars() {
        assert_eq!(ContextValue::from("Ada").to_display_string(), "Ada");
        assert_eq!(ContextValue::Integer(42).to_display_string(), "42");
        assert_eq!(ContextValue::Float(2.5).to_display_string(), "2.5");
        assert_eq!(ContextValue::Float(3.0).to_display_string(), "3");
        assert_eq!(ContextValue::Bool(true).to_display_string(), "true");
        assert_eq!(ContextValue::None.to_display_string(), "");
    }

    #[test]
    fn test_dump_collections() {
        let value = ContextValue::from(serde_json::json!({"b": [1, "x"], "a": null}));
        assert_eq!(value.to_display_string(), "{'a': None, 'b': [1, 'x']}");
    }

    #[test]
    fn test_get_dotted_path() {
        let ctx = Context::from_json(serde_json::json!({
            "user": {"profile": {"city": "Lyon"}},
            "items": ["a", {"title": "b"}]
        }))
        .unwrap();
        assert_eq!(ctx.get("user.profile.city"), Some(&ContextValue::from("Lyon")));
        assert_eq!(ctx.get("items.0"), Some(&ContextValue::from("a")));
        assert_eq!(ctx.get("items.1.title"), Some(&ContextValue::from("b")));
        assert!(ctx.get("items.7").is_none());
        assert!(ctx.get("user.name").is_none());
        assert!(ctx.get("nobody").is_none());
    }

    #[test]
    fn test_from_json_rejects_non_object() {
        assert!(Context::from_json(serde_json::json!([1, 2])).is_err());
        assert!(Context::from_json_str("{broken").is_err());
    }

    #[test]
    fn test_from_iterator() {
        let ctx: Context = [("name", "Ada"), ("city", "London")].into_iter().collect();
        assert!(ctx.contains("name"));
        assert_eq!(ctx.get("city").unwrap().to_string(), "London");
    }

    #[test]
    fn test_as_float_parses_numeric_strings() {
        assert_eq!(ContextValue::from("17").as_float(), Some(17.0));
        assert_eq!(ContextValue::Integer(3).as_float(), Some(3.0));
        assert_eq!(ContextValue::from("abc").as_float(), None);
        assert_eq!(ContextValue::Bool(true).as_float(), None);
    }

    #[test]
    fn test_len_and_empty() {
        assert_eq!(ContextValue::from(vec![1, 2]).len(), Some(2));
        assert_eq!(ContextValue::from("").is_empty(), Some(true));
        assert_eq!(ContextValue::Integer(1).len(), None);
    }
}
