//! External input loading
//!
//! Hosts feed witness computations a JSON object mapping signal names to
//! values, e.g. `{"position": 5}` or `{"coords": ["1", "0x2"]}`. Values may
//! be unsigned integers, decimal strings, `0x` hex strings, or flat arrays
//! of these for array signals.

use std::path::Path;

use anyhow::{bail, Context, Result};
use fnv::FnvHashMap;
use serde_json::Value;

use crate::field::FieldElement;

/// Named external inputs for a circuit's main component
#[derive(Clone, Debug, Default)]
pub struct InputMap {
    values: FnvHashMap<String, Vec<FieldElement>>,
}

impl InputMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: FieldElement) {
        self.values.insert(name.into(), vec![value]);
    }

    pub fn insert_many(&mut self, name: impl Into<String>, values: Vec<FieldElement>) {
        self.values.insert(name.into(), values);
    }

    pub fn get(&self, name: &str) -> Option<&[FieldElement]> {
        self.values.get(name).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<FieldElement>)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parse an input map from a JSON object string
    pub fn from_json_str(s: &str) -> Result<Self> {
        let map: serde_json::Map<String, Value> =
            serde_json::from_str(s).context("inputs must be a JSON object")?;
        let mut inputs = Self::new();
        for (name, value) in &map {
            let parsed = parse_entry(name, value)?;
            inputs.values.insert(name.clone(), parsed);
        }
        Ok(inputs)
    }

    /// Load an input map from a JSON file
    pub fn from_path(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading inputs from {}", path.display()))?;
        Self::from_json_str(&data)
    }
}

fn parse_entry(name: &str, value: &Value) -> Result<Vec<FieldElement>> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| parse_scalar(name, item))
            .collect(),
        _ => Ok(vec![parse_scalar(name, value)?]),
    }
}

fn parse_scalar(name: &str, value: &Value) -> Result<FieldElement> {
    match value {
        Value::Number(n) => {
            let v = match n.as_u64() {
                Some(v) => v,
                None => bail!("input `{name}` must be an unsigned integer"),
            };
            Ok(FieldElement::from_u64(v))
        }
        Value::String(s) => s
            .parse()
            .with_context(|| format!("parsing input `{name}`")),
        _ => bail!("input `{name}` has an unsupported JSON type"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numbers_strings_and_arrays() {
        let inputs = InputMap::from_json_str(
            r#"{"position": 5, "salt": "255", "mask": "0xff", "coords": ["1", 2]}"#,
        )
        .unwrap();
        assert_eq!(inputs.len(), 4);
        assert_eq!(inputs.get("position").unwrap(), &[FieldElement::from_u64(5)]);
        assert_eq!(inputs.get("salt").unwrap(), &[FieldElement::from_u64(255)]);
        assert_eq!(inputs.get("mask").unwrap(), &[FieldElement::from_u64(255)]);
        assert_eq!(
            inputs.get("coords").unwrap(),
            &[FieldElement::from_u64(1), FieldElement::from_u64(2)]
        );
    }

    #[test]
    fn loads_from_a_file() {
        let path = std::env::temp_dir().join("witness-calc-inputs-test.json");
        std::fs::write(&path, r#"{"position": 7}"#).unwrap();
        let inputs = InputMap::from_path(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(inputs.get("position").unwrap(), &[FieldElement::from_u64(7)]);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(InputMap::from_json_str(r#"[1, 2]"#).is_err());
        assert!(InputMap::from_json_str(r#"{"x": -1}"#).is_err());
        assert!(InputMap::from_json_str(r#"{"x": true}"#).is_err());
        assert!(InputMap::from_json_str(r#"{"x": "12a"}"#).is_err());
        // the modulus itself is out of range
        assert!(InputMap::from_json_str(
            r#"{"x": "21888242871839275222246405745257275088548364400416034343698204186575808495617"}"#
        )
        .is_err());
    }
}
