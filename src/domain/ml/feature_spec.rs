use crate::domain::errors::StartupError;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// Value kind a request field must be coercible to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FeatureKind {
    Float,
    Integer,
    /// Unrecognized dtype kept as-is under the permissive policy.
    /// Accepts any numeric value.
    Opaque(String),
}

impl FeatureKind {
    pub fn as_str(&self) -> &str {
        match self {
            FeatureKind::Float => "float",
            FeatureKind::Integer => "integer",
            FeatureKind::Opaque(tag) => tag,
        }
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the schema builder treats dtypes it does not recognize
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DtypePolicy {
    /// Keep the dtype as an opaque label
    #[default]
    Permissive,
    /// Refuse to start
    Strict,
}

impl FromStr for DtypePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "permissive" => Ok(DtypePolicy::Permissive),
            "strict" => Ok(DtypePolicy::Strict),
            _ => anyhow::bail!(
                "Invalid DTYPE_POLICY: {}. Must be 'permissive' or 'strict'",
                s
            ),
        }
    }
}

/// Maps a physical dtype tag to a request kind.
/// Returns None for tags outside the float and integer families.
pub fn kind_for_dtype(dtype: &str) -> Option<FeatureKind> {
    match dtype.trim().to_lowercase().as_str() {
        "float16" | "float32" | "float64" | "float" | "double" => Some(FeatureKind::Float),
        "int8" | "int16" | "int32" | "int64" | "uint8" | "uint16" | "uint32" | "uint64"
        | "int" | "integer" => Some(FeatureKind::Integer),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureColumn {
    pub name: String,
    pub kind: FeatureKind,
}

/// Ordered feature columns, in the exact order the model was trained on.
///
/// The order is taken from the dataset shape listing and never changes.
/// `AlignedRow` construction walks this sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSpec {
    columns: Vec<FeatureColumn>,
}

impl FeatureSpec {
    /// Builds the feature spec from an ordered (column, dtype) listing.
    pub fn from_dtypes<'a, I>(listing: I, policy: DtypePolicy) -> Result<Self, StartupError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut seen = HashSet::new();
        let mut columns = Vec::new();

        for (name, dtype) in listing {
            if !seen.insert(name) {
                return Err(StartupError::DuplicateFeature {
                    name: name.to_string(),
                });
            }

            let kind = match kind_for_dtype(dtype) {
                Some(kind) => kind,
                None => match policy {
                    DtypePolicy::Permissive => FeatureKind::Opaque(dtype.to_string()),
                    DtypePolicy::Strict => {
                        return Err(StartupError::UnsupportedDtype {
                            name: name.to_string(),
                            dtype: dtype.to_string(),
                        });
                    }
                },
            };

            columns.push(FeatureColumn {
                name: name.to_string(),
                kind,
            });
        }

        if columns.is_empty() {
            return Err(StartupError::EmptyFeatureSpec);
        }

        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[FeatureColumn] {
        &self.columns
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Columns that fell through to an opaque kind
    pub fn opaque_columns(&self) -> Vec<&FeatureColumn> {
        self.columns
            .iter()
            .filter(|c| matches!(c.kind, FeatureKind::Opaque(_)))
            .collect()
    }

    pub fn request_schema(&self) -> RequestSchema {
        RequestSchema {
            fields: self
                .columns
                .iter()
                .map(|c| (c.name.clone(), c.kind.clone()))
                .collect(),
        }
    }
}

/// Name-keyed validation rules. Every field is required.
///
/// Carries no ordering; column order belongs to `FeatureSpec`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSchema {
    fields: HashMap<String, FeatureKind>,
}

impl RequestSchema {
    pub fn kind_of(&self, name: &str) -> Option<&FeatureKind> {
        self.fields.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeatureKind)> {
        self.fields.iter().map(|(name, kind)| (name.as_str(), kind))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
