//! Demultiplex flat multicall responses into per-torrent records.
//!
//! # Design
//! - The response is correlated with the request by position only; a length
//!   mismatch or any fault element fails the whole batch.
//! - Plain descriptors fill one record per `scalar descriptors / entity count`
//!   positions; batched descriptors contribute one record per returned row.
//! - Every scalar passes through [`ResponseDecoder::transform`] before it is stored.

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::descriptor::MethodDescriptor;
use crate::error::{RpcError, RpcResult};
use crate::registry::{FieldGroup, FieldRegistry, registry};
use crate::value::{Record, Value};

/// Marker the web UI prepends to stored comments.
pub const COMMENT_MARKER: &str = "VRS24mrker";

const RATIO_GROUP_PREFIX: &str = "rat_";

/// Decoder bound to a field registry and a reference clock.
#[derive(Debug, Clone, Copy)]
pub struct ResponseDecoder<'r> {
    registry: &'r FieldRegistry,
    now: DateTime<Utc>,
}

impl Default for ResponseDecoder<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseDecoder<'static> {
    /// Decoder over the built-in registry, clocked at the current time.
    #[must_use]
    pub fn new() -> Self {
        Self::with_registry(registry())
    }
}

impl<'r> ResponseDecoder<'r> {
    /// Decoder over a custom registry, clocked at the current time.
    #[must_use]
    pub fn with_registry(registry: &'r FieldRegistry) -> Self {
        Self {
            registry,
            now: Utc::now(),
        }
    }

    /// Pin the reference clock used for elapsed-time fields.
    #[must_use]
    pub const fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Decode a flat response into records.
    ///
    /// `entity_count` is the number of torrents the plain descriptors were issued
    /// for; each record is assembled from a contiguous run of descriptors.
    ///
    /// # Errors
    ///
    /// Fails on any fault element, on a response/request length mismatch, when
    /// the plain descriptors do not split evenly across `entity_count`, and when
    /// a batched row is not an array.
    pub fn decode(
        &self,
        methods: &[MethodDescriptor],
        response: Vec<Value>,
        entity_count: usize,
    ) -> RpcResult<Vec<Record>> {
        check_response(methods, &response)?;

        let scalar_count = methods.iter().filter(|method| !method.is_group()).count();
        let per_entity = if scalar_count == 0 {
            1
        } else if entity_count == 0 || scalar_count % entity_count != 0 {
            return Err(RpcError::BatchShape {
                descriptors: scalar_count,
                entities: entity_count,
            });
        } else {
            scalar_count / entity_count
        };

        let mut records: Vec<Record> = Vec::with_capacity(entity_count);
        let mut current = 0;
        let mut position = 0;
        for (method, value) in methods.iter().zip(response) {
            if let Some(keys) = &method.sub_field_keys {
                for (row_index, row) in batched_rows(&method.key, value)?.into_iter().enumerate() {
                    let Value::Array(columns) = row else {
                        return Err(RpcError::MalformedRow {
                            key: method.key.clone(),
                            row: row_index,
                        });
                    };
                    records.push(self.decode_row(keys, columns));
                }
                continue;
            }

            if position % per_entity == 0 {
                records.push(Record::with_capacity(per_entity));
                current = records.len() - 1;
            }
            let transformed = self.transform(&method.key, value);
            records[current].insert(method.key.clone(), transformed);
            position += 1;
        }
        Ok(records)
    }

    fn decode_row(&self, keys: &[String], columns: Vec<Value>) -> Record {
        keys.iter()
            .zip(columns)
            .map(|(key, value)| (key.clone(), self.transform(key, value)))
            .collect()
    }

    /// Apply the per-field value rules to one raw scalar.
    #[must_use]
    pub fn transform(&self, field: &str, raw: Value) -> Value {
        let value = unwrap_single(raw);
        match field {
            "comment" => decode_comment(value),
            "seeding_time" => self.elapsed_since(&value),
            "ratio_group" => ratio_group_index(value),
            "ratio" => permille_ratio(value),
            name => match self.registry.group(name) {
                Some(group) => decode_group(group, value),
                None => value,
            },
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn elapsed_since(&self, value: &Value) -> Value {
        let now = self.now.timestamp();
        match parse_number(value) {
            Some(Value::Int(started)) => Value::Int(now - started),
            Some(Value::Double(started)) => Value::Int(now - started as i64),
            _ => Value::Nil,
        }
    }
}

/// Decode a response with the built-in registry at the current time.
///
/// # Errors
///
/// See [`ResponseDecoder::decode`].
pub fn parse_method_response(
    methods: &[MethodDescriptor],
    response: Vec<Value>,
    entity_count: usize,
) -> RpcResult<Vec<Record>> {
    ResponseDecoder::new().decode(methods, response, entity_count)
}

/// Apply the per-field value rules with the built-in registry.
#[must_use]
pub fn parse_result(field: &str, raw: Value) -> Value {
    ResponseDecoder::new().transform(field, raw)
}

/// Fail the batch on any fault, or when the reply does not carry one element per
/// descriptor.
///
/// # Errors
///
/// Returns [`RpcError::Fault`] for the first faulting element and
/// [`RpcError::ResponseLength`] for a short or long reply.
pub fn check_response(methods: &[MethodDescriptor], response: &[Value]) -> RpcResult<()> {
    check_faults(methods, response)?;
    if methods.len() != response.len() {
        return Err(RpcError::ResponseLength {
            expected: methods.len(),
            actual: response.len(),
        });
    }
    Ok(())
}

/// Fail the batch if any response element is a fault.
///
/// # Errors
///
/// Returns [`RpcError::Fault`] for the first faulting element.
pub fn check_faults(methods: &[MethodDescriptor], response: &[Value]) -> RpcResult<()> {
    let Some((index, fault)) = response
        .iter()
        .enumerate()
        .find_map(|(index, value)| value.as_fault().map(|fault| (index, fault)))
    else {
        return Ok(());
    };
    let key = methods
        .get(index)
        .map(|method| method.key.clone())
        .unwrap_or_default();
    warn!(
        index,
        key = %key,
        code = fault.code,
        message = %fault.message,
        "batched call reported a fault"
    );
    Err(RpcError::Fault {
        index,
        key,
        code: fault.code,
        message: fault.message,
    })
}

/// Numeric coercion: strings with a `.` parse as floats, other strings as
/// integers; numbers pass through; anything else is `None`.
#[must_use]
pub fn parse_number(value: &Value) -> Option<Value> {
    match value {
        Value::Str(text) => {
            let text = text.trim();
            if text.is_empty() {
                None
            } else if text.contains('.') {
                text.parse().ok().map(Value::Double)
            } else {
                text.parse().ok().map(Value::Int)
            }
        }
        Value::Int(_) | Value::Double(_) => Some(value.clone()),
        _ => None,
    }
}

fn unwrap_single(value: Value) -> Value {
    match value {
        Value::Array(mut items) if items.len() == 1 => items.pop().unwrap_or_default(),
        other => other,
    }
}

fn batched_rows(key: &str, value: Value) -> RpcResult<Vec<Value>> {
    let Value::Array(mut items) = value else {
        return Err(RpcError::MalformedRow {
            key: key.to_string(),
            row: 0,
        });
    };
    let wrapped = matches!(
        items.as_slice(),
        [Value::Array(rows)] if rows.iter().all(|row| matches!(row, Value::Array(_)))
    );
    if wrapped && let Some(Value::Array(rows)) = items.pop() {
        return Ok(rows);
    }
    Ok(items)
}

fn decode_comment(value: Value) -> Value {
    match value {
        Value::Str(text) => match text.strip_prefix(COMMENT_MARKER) {
            Some(encoded) => Value::Str(
                urlencoding::decode(encoded)
                    .map_or_else(|_| encoded.to_string(), Cow::into_owned),
            ),
            None => Value::Str(text),
        },
        other => other,
    }
}

fn ratio_group_index(value: Value) -> Value {
    let first = match value {
        Value::Array(items) => items.into_iter().next().unwrap_or_default(),
        other => other,
    };
    let Value::Str(text) = first else {
        return Value::Nil;
    };
    text.match_indices(RATIO_GROUP_PREFIX)
        .find_map(|(start, prefix)| {
            let digits: String = text[start + prefix.len()..]
                .chars()
                .take_while(char::is_ascii_digit)
                .collect();
            digits.parse::<i64>().ok()
        })
        .map_or(Value::Nil, |index| Value::Int(index.saturating_add(1)))
}

#[allow(clippy::cast_precision_loss)]
fn permille_ratio(value: Value) -> Value {
    match value {
        Value::Int(permille) => Value::Double(permille as f64 / 1000.0),
        other => other,
    }
}

fn decode_group(group: &FieldGroup, value: Value) -> Value {
    let Value::Array(rows) = value else {
        return Value::Nil;
    };
    if rows.is_empty() {
        return Value::Nil;
    }
    let rows = if matches!(rows.first(), Some(Value::Array(_))) {
        rows
    } else {
        vec![Value::Array(rows)]
    };
    Value::Array(
        rows.into_iter()
            .map(|row| match row {
                Value::Array(columns) => Value::Struct(group.decode_row(&columns)),
                other => Value::Struct(group.decode_row(std::slice::from_ref(&other))),
            })
            .collect(),
    )
}
