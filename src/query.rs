use serde::{Serialize, Serializer};

use crate::domain::SearchSpec;

/// Accession excluded from every unauthenticated search.
pub const EXCLUDED_ACCESSIONS: &str = "LC722946";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Scalar(String),
    List(Vec<String>),
}

impl ParamValue {
    fn flatten(self) -> String {
        match self {
            ParamValue::Scalar(value) => value,
            ParamValue::List(values) => values.join(","),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Scalar(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Scalar(value)
    }
}

impl From<&[String]> for ParamValue {
    fn from(values: &[String]) -> Self {
        ParamValue::List(values.to_vec())
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(values: Vec<String>) -> Self {
        ParamValue::List(values)
    }
}

impl From<bool> for ParamValue {
    // The portal API expects capitalized booleans.
    fn from(value: bool) -> Self {
        ParamValue::Scalar(if value { "True" } else { "False" }.to_string())
    }
}

impl From<u64> for ParamValue {
    fn from(value: u64) -> Self {
        ParamValue::Scalar(value.to_string())
    }
}

/// Flattened request parameters, kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchParams(Vec<(String, String)>);

impl SearchParams {
    /// Builds the request for one search. Authenticated searches ask for
    /// data-hub records only and carry neither a query nor exclusions.
    pub fn from_spec(spec: &SearchSpec) -> Self {
        if spec.authentication {
            build_request_params([
                ("dataPortal", ParamValue::from(spec.data_portal.as_str())),
                ("fields", ParamValue::from(spec.fields.as_slice())),
                ("result", ParamValue::from(spec.result_type.as_str())),
                ("dccDataOnly", ParamValue::from(true)),
                ("limit", ParamValue::from(0u64)),
            ])
        } else {
            build_request_params([
                ("dataPortal", ParamValue::from(spec.data_portal.as_str())),
                ("fields", ParamValue::from(spec.fields.as_slice())),
                ("query", ParamValue::from(spec.query.as_str())),
                ("result", ParamValue::from(spec.result_type.as_str())),
                ("excludeAccessions", ParamValue::from(EXCLUDED_ACCESSIONS)),
                ("limit", ParamValue::from(0u64)),
            ])
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn as_pairs(&self) -> &[(String, String)] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for SearchParams {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(key, value)| (key, value)))
    }
}

/// Flattens key/value pairs into request parameters. A repeated key replaces
/// the earlier value in place.
pub fn build_request_params<I, K>(pairs: I) -> SearchParams
where
    I: IntoIterator<Item = (K, ParamValue)>,
    K: Into<String>,
{
    let mut params: Vec<(String, String)> = Vec::new();
    for (key, value) in pairs {
        let key = key.into();
        let value = value.flatten();
        match params.iter_mut().find(|(name, _)| *name == key) {
            Some(slot) => slot.1 = value,
            None => params.push((key, value)),
        }
    }
    SearchParams(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_values_are_comma_joined() {
        let params = build_request_params([(
            "fields",
            ParamValue::from(vec!["country".to_string(), "host".to_string()]),
        )]);
        assert_eq!(params.get("fields"), Some("country,host"));
    }

    #[test]
    fn repeated_key_keeps_position() {
        let params = build_request_params([
            ("a", ParamValue::from("1")),
            ("b", ParamValue::from("2")),
            ("a", ParamValue::from("3")),
        ]);
        assert_eq!(
            params.as_pairs(),
            &[
                ("a".to_string(), "3".to_string()),
                ("b".to_string(), "2".to_string())
            ]
        );
    }
}
