use super::feature_spec::{FeatureKind, FeatureSpec, RequestSchema};
use crate::domain::errors::{FieldViolation, ValidationError, ViolationKind};
use serde_json::Value;
use std::collections::HashMap;

/// A request body after validation against the `RequestSchema`.
///
/// Values are keyed by name only. Fields the schema does not know are
/// dropped and reported through `ignored_fields`.
#[derive(Debug, Clone, PartialEq)]
pub struct InputRecord {
    values: HashMap<String, f64>,
    ignored: Vec<String>,
}

impl InputRecord {
    /// Checks every schema field is present and coercible to its kind.
    ///
    /// All violations are collected, sorted by field name.
    pub fn validate(body: &Value, schema: &RequestSchema) -> Result<Self, ValidationError> {
        let object = body.as_object().ok_or(ValidationError::NotAnObject {
            found: json_type_name(body),
        })?;

        let mut values = HashMap::with_capacity(schema.len());
        let mut violations = Vec::new();

        for (name, kind) in schema.iter() {
            match object.get(name) {
                None => violations.push(FieldViolation {
                    field: name.to_string(),
                    kind: ViolationKind::Missing,
                }),
                Some(raw) => match coerce(raw, kind) {
                    Ok(v) => {
                        values.insert(name.to_string(), v);
                    }
                    Err(kind) => violations.push(FieldViolation {
                        field: name.to_string(),
                        kind,
                    }),
                },
            }
        }

        if !violations.is_empty() {
            violations.sort_by(|a, b| a.field.cmp(&b.field));
            return Err(ValidationError::Fields(violations));
        }

        let mut ignored: Vec<String> = object
            .keys()
            .filter(|k| !schema.contains(k))
            .cloned()
            .collect();
        ignored.sort();

        Ok(Self { values, ignored })
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn ignored_fields(&self) -> &[String] {
        &self.ignored
    }

    /// Reads the record's values in `FeatureSpec` order.
    pub fn align(&self, spec: &FeatureSpec) -> Result<AlignedRow, ValidationError> {
        let mut row = Vec::with_capacity(spec.len());
        let mut missing = Vec::new();

        for name in spec.names() {
            match self.get(name) {
                Some(v) => row.push(v),
                None => missing.push(FieldViolation {
                    field: name.to_string(),
                    kind: ViolationKind::Missing,
                }),
            }
        }

        if !missing.is_empty() {
            return Err(ValidationError::Fields(missing));
        }
        Ok(AlignedRow { values: row })
    }
}

/// One row of model input in training column order.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedRow {
    values: Vec<f64>,
}

impl AlignedRow {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn to_f32(&self) -> Vec<f32> {
        self.values.iter().map(|v| *v as f32).collect()
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn finite(v: f64) -> Result<f64, ViolationKind> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(ViolationKind::NotFinite)
    }
}

fn coerce(raw: &Value, kind: &FeatureKind) -> Result<f64, ViolationKind> {
    match kind {
        FeatureKind::Float => coerce_number(raw, "float"),
        FeatureKind::Opaque(_) => coerce_number(raw, "number"),
        FeatureKind::Integer => coerce_integer(raw),
    }
}

fn coerce_number(raw: &Value, expected: &'static str) -> Result<f64, ViolationKind> {
    let wrong = || ViolationKind::WrongType {
        expected,
        found: json_type_name(raw),
    };
    match raw {
        Value::Number(n) => n.as_f64().ok_or_else(wrong).and_then(finite),
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| wrong()).and_then(finite),
        _ => Err(wrong()),
    }
}

fn coerce_integer(raw: &Value) -> Result<f64, ViolationKind> {
    match raw {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(i as f64);
            }
            if let Some(u) = n.as_u64() {
                return Ok(u as f64);
            }
            match n.as_f64() {
                Some(f) if f.is_finite() && f.fract() == 0.0 => Ok(f),
                _ => Err(ViolationKind::WrongType {
                    expected: "integer",
                    found: "fractional number",
                }),
            }
        }
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(|i| i as f64)
            .map_err(|_| ViolationKind::WrongType {
                expected: "integer",
                found: "string",
            }),
        other => Err(ViolationKind::WrongType {
            expected: "integer",
            found: json_type_name(other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ml::feature_spec::DtypePolicy;
    use serde_json::json;

    fn spec() -> FeatureSpec {
        FeatureSpec::from_dtypes(
            vec![
                ("revenue", "float64"),
                ("debt_ratio", "float64"),
                ("employees", "int64"),
            ],
            DtypePolicy::Permissive,
        )
        .unwrap()
    }

    #[test]
    fn test_reordered_keys_align_to_spec_order() {
        let spec = spec();
        let body = json!({"employees": 50, "revenue": 12.5, "debt_ratio": 0.3});

        let record = InputRecord::validate(&body, &spec.request_schema()).unwrap();
        let row = record.align(&spec).unwrap();

        assert_eq!(row.values(), &[12.5, 0.3, 50.0]);
    }

    #[test]
    fn test_missing_field_is_named() {
        let spec = spec();
        let body = json!({"employees": 50, "revenue": 12.5});

        let err = InputRecord::validate(&body, &spec.request_schema()).unwrap_err();
        match err {
            ValidationError::Fields(v) => {
                assert_eq!(v.len(), 1);
                assert_eq!(v[0].field, "debt_ratio");
                assert_eq!(v[0].kind, ViolationKind::Missing);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_all_violations_reported_sorted() {
        let spec = spec();
        let body = json!({"employees": "many", "revenue": null});

        let err = InputRecord::validate(&body, &spec.request_schema()).unwrap_err();
        assert_eq!(err.fields(), vec!["debt_ratio", "employees", "revenue"]);
    }

    #[test]
    fn test_integer_coercion() {
        assert_eq!(coerce_integer(&json!(50)), Ok(50.0));
        assert_eq!(coerce_integer(&json!(50.0)), Ok(50.0));
        assert_eq!(coerce_integer(&json!("42")), Ok(42.0));
        assert!(coerce_integer(&json!(50.5)).is_err());
        assert!(coerce_integer(&json!(true)).is_err());
    }

    #[test]
    fn test_float_coercion() {
        assert_eq!(coerce_number(&json!(3), "float"), Ok(3.0));
        assert_eq!(coerce_number(&json!(" 0.25 "), "float"), Ok(0.25));
        assert_eq!(
            coerce_number(&json!("NaN"), "float"),
            Err(ViolationKind::NotFinite)
        );
        assert_eq!(
            coerce_number(&json!([1.0]), "float"),
            Err(ViolationKind::WrongType {
                expected: "float",
                found: "array"
            })
        );
    }

    #[test]
    fn test_non_object_body_rejected() {
        let err = InputRecord::validate(&json!([1, 2, 3]), &spec().request_schema()).unwrap_err();
        assert_eq!(err, ValidationError::NotAnObject { found: "array" });
    }

    #[test]
    fn test_extra_fields_are_ignored() {
        let spec = spec();
        let body = json!({
            "revenue": 1.0,
            "debt_ratio": 2.0,
            "employees": 3,
            "ticker": "ACME"
        });

        let record = InputRecord::validate(&body, &spec.request_schema()).unwrap();
        assert_eq!(record.ignored_fields(), &["ticker".to_string()]);
        assert_eq!(record.align(&spec).unwrap().len(), 3);
    }

    #[test]
    fn test_opaque_column_accepts_numbers() {
        let spec = FeatureSpec::from_dtypes(
            vec![("revenue", "float64"), ("rating", "category")],
            DtypePolicy::Permissive,
        )
        .unwrap();
        let body = json!({"rating": 2, "revenue": 10.0});

        let row = InputRecord::validate(&body, &spec.request_schema())
            .unwrap()
            .align(&spec)
            .unwrap();
        assert_eq!(row.values(), &[10.0, 2.0]);
    }
}
