//! Method descriptors and the include/exclude builder that produces them.
//!
//! Every "describe one remote operation" function hands an ordered table of
//! `field name -> wire call` pairs to [`build_descriptors`] together with a
//! [`FieldSelection`]; the table order is preserved in the output.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::value::Value;

/// One remote call plus the logical field its result is stored under.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDescriptor {
    /// Logical field name for the result.
    pub key: String,
    /// Remote method name.
    pub wire_method: String,
    /// Positional parameters, target entity first where applicable.
    pub params: Vec<Value>,
    /// Field names used to decode each row of a batched result.
    pub sub_field_keys: Option<Vec<String>>,
}

impl MethodDescriptor {
    /// Build a plain (non-batched) descriptor.
    #[must_use]
    pub fn new(key: impl Into<String>, wire_method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            key: key.into(),
            wire_method: wire_method.into(),
            params,
            sub_field_keys: None,
        }
    }

    /// Attach the row field names of a batched result.
    #[must_use]
    pub fn with_sub_field_keys(mut self, keys: Vec<String>) -> Self {
        self.sub_field_keys = Some(keys);
        self
    }

    /// Whether the descriptor yields a nested array of rows.
    #[must_use]
    pub const fn is_group(&self) -> bool {
        self.sub_field_keys.is_some()
    }

    /// Entry for a `system.multicall` parameter list.
    #[must_use]
    pub fn to_multicall_entry(&self) -> Value {
        let mut members = IndexMap::with_capacity(2);
        members.insert("methodName".to_string(), Value::str(&self.wire_method));
        members.insert("params".to_string(), Value::Array(self.params.clone()));
        Value::Struct(members)
    }
}

/// Remote method and parameters before a field key is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct WireCall {
    /// Remote method name.
    pub method: String,
    /// Positional parameters.
    pub params: Vec<Value>,
}

impl WireCall {
    /// Build a wire call from a method name and its parameters.
    #[must_use]
    pub fn new(method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }
}

/// Which logical fields an operation should include.
///
/// An empty `only_fields` admits every field; `exclude_fields` always wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSelection {
    /// When non-empty, only these fields are kept.
    #[serde(default)]
    pub only_fields: BTreeSet<String>,
    /// Fields that are always dropped.
    #[serde(default)]
    pub exclude_fields: BTreeSet<String>,
}

impl FieldSelection {
    /// Selection admitting every field.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Selection restricted to the given fields.
    #[must_use]
    pub fn only<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            only_fields: fields.into_iter().map(Into::into).collect(),
            exclude_fields: BTreeSet::new(),
        }
    }

    /// Add a field to the exclusion set.
    #[must_use]
    pub fn excluding(mut self, field: impl Into<String>) -> Self {
        self.exclude_fields.insert(field.into());
        self
    }

    /// Whether `field` survives the selection.
    #[must_use]
    pub fn admits(&self, field: &str) -> bool {
        if self.exclude_fields.contains(field) {
            return false;
        }
        self.only_fields.is_empty() || self.only_fields.contains(field)
    }
}

/// Turn an ordered call table into descriptors, honouring the selection.
pub fn build_descriptors<I, K>(calls: I, selection: &FieldSelection) -> Vec<MethodDescriptor>
where
    I: IntoIterator<Item = (K, WireCall)>,
    K: Into<String>,
{
    calls
        .into_iter()
        .map(|(key, call)| (key.into(), call))
        .filter(|(key, _)| selection.admits(key))
        .map(|(key, call)| MethodDescriptor::new(key, call.method, call.params))
        .collect()
}

/// Target-entity parameter: the hash when bound, nil when building a template.
#[must_use]
pub fn target(hash: Option<&str>) -> Value {
    hash.map_or(Value::Nil, Value::str)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Vec<(&'static str, WireCall)> {
        vec![
            ("hash", WireCall::new("d.hash", vec![Value::str("ABC")])),
            ("name", WireCall::new("d.name", vec![Value::str("ABC")])),
            ("ratio", WireCall::new("d.ratio", vec![Value::str("ABC")])),
        ]
    }

    fn keys(descriptors: &[MethodDescriptor]) -> Vec<&str> {
        descriptors.iter().map(|d| d.key.as_str()).collect()
    }

    #[test]
    fn builder_preserves_table_order() {
        let descriptors = build_descriptors(table(), &FieldSelection::all());
        assert_eq!(keys(&descriptors), vec!["hash", "name", "ratio"]);
        assert_eq!(descriptors[1].wire_method, "d.name");
        assert_eq!(descriptors[1].params, vec![Value::str("ABC")]);
        assert!(descriptors.iter().all(|d| !d.is_group()));
    }

    #[test]
    fn only_fields_restrict_and_exclusion_wins() {
        let only = FieldSelection::only(["ratio", "hash"]);
        assert_eq!(keys(&build_descriptors(table(), &only)), vec!["hash", "ratio"]);

        let both = FieldSelection::only(["ratio", "hash"]).excluding("hash");
        assert_eq!(keys(&build_descriptors(table(), &both)), vec!["ratio"]);

        let excluded = FieldSelection::all().excluding("name");
        assert_eq!(keys(&build_descriptors(table(), &excluded)), vec!["hash", "ratio"]);
    }

    #[test]
    fn multicall_entries_carry_method_and_params() {
        let descriptor = MethodDescriptor::new("hash", "d.hash", vec![Value::str("ABC")]);
        let entry = descriptor.to_multicall_entry();
        let members = entry.as_struct().expect("struct entry");
        assert_eq!(members.get("methodName"), Some(&Value::str("d.hash")));
        assert_eq!(
            members.get("params"),
            Some(&Value::Array(vec![Value::str("ABC")]))
        );
    }

    #[test]
    fn unbound_target_is_nil() {
        assert_eq!(target(None), Value::Nil);
        assert_eq!(target(Some("ABC")), Value::str("ABC"));
    }
}
