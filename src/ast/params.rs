//! Bound values and batch parameter lists
//!
//! Host values are carried in the AST as [`ParamValue`]s and rendered as
//! positional `?` placeholders. Batch statements instead reference named
//! parameters which are resolved once per [`BatchRow`].

use super::expr::Ident;
use crate::error::{BuildError, BuildResult};
use indexmap::IndexMap;

/// A host value bound to a placeholder
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Null,
    Bool(bool),
    String(String),
    Integer(i64),
    Float(f64),
    Bytes(Vec<u8>),
    /// JSON value (stored as serde_json::Value)
    Json(serde_json::Value),
}

impl ParamValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short type name used in log output
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::String(_) => "string",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Bytes(_) => "bytes",
            Self::Json(_) => "json",
        }
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<i64> for ParamValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<i32> for ParamValue {
    fn from(n: i32) -> Self {
        Self::Integer(n as i64)
    }
}

impl From<u32> for ParamValue {
    fn from(n: u32) -> Self {
        Self::Integer(n as i64)
    }
}

impl From<f64> for ParamValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<Vec<u8>> for ParamValue {
    fn from(b: Vec<u8>) -> Self {
        Self::Bytes(b)
    }
}

impl From<serde_json::Value> for ParamValue {
    fn from(v: serde_json::Value) -> Self {
        json_to_param_value(&v)
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

/// Convert a serde_json::Value to a ParamValue
///
/// Scalars map to their natural variant; arrays and objects stay JSON.
pub fn json_to_param_value(value: &serde_json::Value) -> ParamValue {
    match value {
        serde_json::Value::Null => ParamValue::Null,
        serde_json::Value::Bool(b) => ParamValue::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                ParamValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                ParamValue::Float(f)
            } else {
                // u64 beyond i64::MAX
                ParamValue::String(n.to_string())
            }
        }
        serde_json::Value::String(s) => ParamValue::String(s.clone()),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
            ParamValue::Json(value.clone())
        }
    }
}

/// One row of a batch parameter list: named parameter to value
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BatchRow {
    values: IndexMap<Ident, ParamValue>,
}

impl BatchRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<Ident>, value: impl Into<ParamValue>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<Ident>, value: impl Into<ParamValue>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &Ident) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Build a row from a JSON object; anything else yields `None`.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        let obj = value.as_object()?;
        Some(Self {
            values: obj
                .iter()
                .map(|(k, v)| (Ident::new(k.as_str()), json_to_param_value(v)))
                .collect(),
        })
    }
}

impl<K: Into<Ident>, V: Into<ParamValue>> FromIterator<(K, V)> for BatchRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// One placeholder recorded during rendering
#[derive(Debug, Clone, PartialEq)]
pub enum ParamSlot {
    /// A value fixed in the AST
    Value(ParamValue),
    /// A named parameter resolved per batch row
    Named(Ident),
}

/// Collects placeholders in the order the renderer emits them
#[derive(Debug, Default)]
pub struct ParamCollector {
    slots: Vec<ParamSlot>,
}

impl ParamCollector {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Record a bound value, returning its 1-indexed position
    pub fn add(&mut self, value: ParamValue) -> usize {
        self.slots.push(ParamSlot::Value(value));
        self.slots.len()
    }

    /// Record a named parameter, returning its 1-indexed position
    pub fn add_named(&mut self, name: Ident) -> usize {
        self.slots.push(ParamSlot::Named(name));
        self.slots.len()
    }

    pub fn slots(&self) -> &[ParamSlot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn has_named(&self) -> bool {
        self.slots.iter().any(|s| matches!(s, ParamSlot::Named(_)))
    }

    /// Resolve every slot against `row` (row index `index` for error reporting).
    ///
    /// Without a row, any named slot is an error.
    pub fn bind(&self, row: Option<&BatchRow>, index: usize) -> BuildResult<Vec<ParamValue>> {
        self.slots
            .iter()
            .map(|slot| match slot {
                ParamSlot::Value(v) => Ok(v.clone()),
                ParamSlot::Named(name) => row
                    .and_then(|r| r.get(name))
                    .cloned()
                    .ok_or_else(|| BuildError::MissingBatchParam {
                        name: name.to_string(),
                        row: index,
                    }),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_collector() {
        let mut collector = ParamCollector::new();

        assert_eq!(collector.add(ParamValue::String("hello".into())), 1);
        assert_eq!(collector.add_named(Ident::new("id")), 2);
        assert_eq!(collector.len(), 2);
        assert!(collector.has_named());

        let row = BatchRow::new().with("id", 7);
        let bound = collector.bind(Some(&row), 0).unwrap();
        assert_eq!(
            bound,
            vec![ParamValue::String("hello".into()), ParamValue::Integer(7)]
        );
    }

    #[test]
    fn test_bind_reports_missing_named_param() {
        let mut collector = ParamCollector::new();
        collector.add_named(Ident::new("name"));

        let row = BatchRow::new().with("id", 1);
        let err = collector.bind(Some(&row), 3).unwrap_err();
        assert_eq!(
            err,
            BuildError::MissingBatchParam {
                name: "name".into(),
                row: 3
            }
        );

        assert!(collector.bind(None, 0).is_err());
    }

    #[test]
    fn test_json_to_param_value() {
        assert!(matches!(
            json_to_param_value(&serde_json::Value::Null),
            ParamValue::Null
        ));

        assert!(matches!(
            json_to_param_value(&serde_json::json!(true)),
            ParamValue::Bool(true)
        ));

        assert!(matches!(
            json_to_param_value(&serde_json::json!(42)),
            ParamValue::Integer(42)
        ));

        assert!(matches!(
            json_to_param_value(&serde_json::json!("hello")),
            ParamValue::String(s) if s == "hello"
        ));

        assert!(matches!(
            json_to_param_value(&serde_json::json!([1, 2, 3])),
            ParamValue::Json(_)
        ));
    }

    #[test]
    fn test_batch_row_from_json() {
        let row = BatchRow::from_json(&serde_json::json!({"id": 1, "name": "a"})).unwrap();
        assert_eq!(row.len(), 2);
        assert_eq!(row.get(&Ident::new("id")), Some(&ParamValue::Integer(1)));
        assert!(BatchRow::from_json(&serde_json::json!([1])).is_none());
    }

    #[test]
    fn test_param_value_from() {
        let _: ParamValue = true.into();
        let _: ParamValue = "hello".into();
        let _: ParamValue = 42i32.into();
        let _: ParamValue = 42i64.into();
        let _: ParamValue = 3.5f64.into();
        let _: ParamValue = None::<i32>.into();
        let _: ParamValue = Some(42i32).into();
    }
}
