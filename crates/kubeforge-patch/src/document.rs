//! A generic, order-preserving JSON tree which can be mutated by path.
//!
//! [`serde_json::Value`] would work as well, but exposing our own sum type
//! keeps the mutation rules of the [patcher](crate::patcher) in one place and
//! lets [`Scalar`] carry the coercion rules for override values.
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::path::{Path, PathStep};

/// The kind of a [`Document`] node, used in error messages.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
#[strum(serialize_all = "lowercase")]
pub enum NodeKind {
    Object,
    Sequence,
    Null,
    Bool,
    Integer,
    Float,
    String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Integer(i64),

    /// Integers above [`i64::MAX`], only ever read from a base document.
    Unsigned(u64),

    Float(f64),
    String(String),
}

impl Scalar {
    /// Coerces a raw override value into the most specific scalar type.
    ///
    /// The rules are purely syntactic: `true` and `false` become booleans,
    /// anything [`i64`] accepts becomes an integer, finite floats become
    /// floats and everything else stays a string. No schema is consulted.
    pub fn coerce(raw: &str) -> Self {
        match raw {
            "true" => return Self::Bool(true),
            "false" => return Self::Bool(false),
            _ => {}
        }

        if let Ok(integer) = raw.parse::<i64>() {
            return Self::Integer(integer);
        }

        match raw.parse::<f64>() {
            Ok(float) if float.is_finite() => Self::Float(float),
            _ => Self::String(raw.to_owned()),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Null => NodeKind::Null,
            Self::Bool(_) => NodeKind::Bool,
            Self::Integer(_) | Self::Unsigned(_) => NodeKind::Integer,
            Self::Float(_) => NodeKind::Float,
            Self::String(_) => NodeKind::String,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Document {
    Object(IndexMap<String, Document>),
    Sequence(Vec<Document>),
    Scalar(Scalar),
}

impl Default for Document {
    fn default() -> Self {
        Self::empty_object()
    }
}

impl Document {
    pub const NULL: Self = Self::Scalar(Scalar::Null);

    pub fn empty_object() -> Self {
        Self::Object(IndexMap::new())
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Object(_) => NodeKind::Object,
            Self::Sequence(_) => NodeKind::Sequence,
            Self::Scalar(scalar) => scalar.kind(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Scalar(Scalar::Null))
    }

    pub fn as_object(&self) -> Option<&IndexMap<String, Document>> {
        match self {
            Self::Object(members) => Some(members),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut IndexMap<String, Document>> {
        match self {
            Self::Object(members) => Some(members),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Document]> {
        match self {
            Self::Sequence(elements) => Some(elements),
            _ => None,
        }
    }

    pub fn as_sequence_mut(&mut self) -> Option<&mut Vec<Document>> {
        match self {
            Self::Sequence(elements) => Some(elements),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Self::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar(Scalar::String(string)) => Some(string),
            _ => None,
        }
    }

    /// Returns the node at `path`, or [`None`] if any step does not exist.
    pub fn get(&self, path: &Path) -> Option<&Document> {
        path.steps().iter().try_fold(self, |node, step| match step {
            PathStep::Field(name) => node.as_object()?.get(name),
            PathStep::Index(position) => node.as_sequence()?.get(*position),
        })
    }
}

impl From<Scalar> for Document {
    fn from(scalar: Scalar) -> Self {
        Self::Scalar(scalar)
    }
}

impl From<serde_json::Value> for Document {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => Self::NULL,
            Value::Bool(boolean) => Scalar::Bool(boolean).into(),
            Value::Number(number) => {
                if let Some(integer) = number.as_i64() {
                    Scalar::Integer(integer).into()
                } else if let Some(unsigned) = number.as_u64() {
                    Scalar::Unsigned(unsigned).into()
                } else {
                    // Without arbitrary_precision every other number is an f64
                    Scalar::Float(number.as_f64().unwrap_or_default()).into()
                }
            }
            Value::String(string) => Scalar::String(string).into(),
            Value::Array(elements) => Self::Sequence(elements.into_iter().map(Self::from).collect()),
            Value::Object(members) => Self::Object(
                members
                    .into_iter()
                    .map(|(key, value)| (key, Self::from(value)))
                    .collect(),
            ),
        }
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        serde_json::Value::deserialize(deserializer).map(Self::from)
    }
}

impl Serialize for Document {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Self::Object(members) => serializer.collect_map(members),
            Self::Sequence(elements) => serializer.collect_seq(elements),
            Self::Scalar(Scalar::Null) => serializer.serialize_unit(),
            Self::Scalar(Scalar::Bool(boolean)) => serializer.serialize_bool(*boolean),
            Self::Scalar(Scalar::Integer(integer)) => serializer.serialize_i64(*integer),
            Self::Scalar(Scalar::Unsigned(unsigned)) => serializer.serialize_u64(*unsigned),
            Self::Scalar(Scalar::Float(float)) => serializer.serialize_f64(*float),
            Self::Scalar(Scalar::String(string)) => serializer.serialize_str(string),
        }
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("true", Scalar::Bool(true))]
    #[case("false", Scalar::Bool(false))]
    #[case("True", Scalar::String("True".to_owned()))]
    #[case("3", Scalar::Integer(3))]
    #[case("-42", Scalar::Integer(-42))]
    #[case("0.5", Scalar::Float(0.5))]
    #[case("1e3", Scalar::Float(1000.0))]
    #[case("NaN", Scalar::String("NaN".to_owned()))]
    #[case("inf", Scalar::String("inf".to_owned()))]
    #[case("99999999999999999999", Scalar::Float(1e20))]
    #[case("Standard_D2_v2", Scalar::String("Standard_D2_v2".to_owned()))]
    #[case("", Scalar::String(String::new()))]
    fn coerce(#[case] raw: &str, #[case] expected: Scalar) {
        assert_eq!(Scalar::coerce(raw), expected);
    }

    #[test]
    fn deserialize_preserves_key_order() {
        let input = indoc! {r#"
            {
              "zeta": 1,
              "alpha": [true, null, 1.5],
              "mid": {"b": "x", "a": "y"}
            }
        "#};

        let document: Document = serde_json::from_str(input).expect("valid JSON");
        let keys: Vec<_> = document
            .as_object()
            .expect("root is an object")
            .keys()
            .cloned()
            .collect();
        assert_eq!(keys, ["zeta", "alpha", "mid"]);

        let serialized = serde_json::to_string(&document).expect("serializable");
        assert_eq!(
            serialized,
            r#"{"zeta":1,"alpha":[true,null,1.5],"mid":{"b":"x","a":"y"}}"#
        );
    }

    #[rstest]
    #[case::u64_max("18446744073709551615", Scalar::Unsigned(u64::MAX))]
    #[case::above_i64("9223372036854775808", Scalar::Unsigned(9_223_372_036_854_775_808))]
    #[case::i64_min("-9223372036854775808", Scalar::Integer(i64::MIN))]
    #[case::beyond_u64("18446744073709551616", Scalar::Float(18_446_744_073_709_551_616.0))]
    fn large_numbers_keep_their_type(#[case] input: &str, #[case] expected: Scalar) {
        let document: Document = serde_json::from_str(input).expect("valid JSON");
        assert_eq!(document, Document::Scalar(expected));
    }

    #[test]
    fn large_unsigned_integers_serialize_verbatim() {
        let input = r#"{"big":18446744073709551615,"x":1}"#;
        let document: Document = serde_json::from_str(input).expect("valid JSON");

        let serialized = serde_json::to_string(&document).expect("serializable");
        assert_eq!(serialized, input);
    }

    #[test]
    fn get_by_path() {
        let document: Document = serde_json::from_str(
            r#"{"agentPoolProfiles": [{"name": "agentpool1", "count": 3}]}"#,
        )
        .expect("valid JSON");

        let count = "agentPoolProfiles[0].count".parse().expect("valid path");
        assert_eq!(
            document.get(&count),
            Some(&Document::Scalar(Scalar::Integer(3)))
        );

        let missing = "agentPoolProfiles[1].count".parse().expect("valid path");
        assert_eq!(document.get(&missing), None);

        let wrong_kind = "agentPoolProfiles.name".parse().expect("valid path");
        assert_eq!(document.get(&wrong_kind), None);
    }

    #[test]
    fn node_kind_display() {
        assert_eq!(Document::empty_object().kind().to_string(), "object");
        assert_eq!(Document::Sequence(vec![]).kind().to_string(), "sequence");
        assert_eq!(Document::NULL.kind().to_string(), "null");
    }
}
