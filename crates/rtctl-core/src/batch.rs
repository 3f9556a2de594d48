//! Compile per-torrent call templates into one view-wide `d.multicall2`.
//!
//! # Design
//! - Templates are built for an unbound torrent (target parameter is nil); the
//!   compiler drops that leading parameter and serialises the rest into
//!   `method=param1,param2` fragments.
//! - Fragment serialisation lives in [`call_fragment`] only.
//! - A ratio-group selector, when present, replaces the view name with its tag.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::descriptor::MethodDescriptor;
use crate::error::RpcResult;
use crate::ratio_group::{RatioGroupSelector, parse_ratio_group};
use crate::value::Value;

/// Remote method that applies a call list to every torrent in a view.
pub const BATCH_METHOD: &str = "d.multicall2";

/// Which torrents a batched call applies to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchScope {
    /// Named view (`default`, `active`, `complete`, ...); empty means the daemon default.
    #[serde(default)]
    pub view: String,
    /// Ratio group that overrides `view` when set.
    #[serde(default)]
    pub ratio_group: Option<RatioGroupSelector>,
}

impl BatchScope {
    /// Scope covering a named view.
    #[must_use]
    pub fn view(view: impl Into<String>) -> Self {
        Self {
            view: view.into(),
            ratio_group: None,
        }
    }

    /// Scope covering one ratio group.
    #[must_use]
    pub fn ratio_group(selector: impl Into<RatioGroupSelector>) -> Self {
        Self {
            view: String::new(),
            ratio_group: Some(selector.into()),
        }
    }

    /// View name sent on the wire.
    ///
    /// # Errors
    ///
    /// Propagates ratio-group validation failures.
    pub fn resolve_view(&self) -> RpcResult<String> {
        Ok(parse_ratio_group(self.ratio_group.as_ref())?
            .map_or_else(|| self.view.clone(), |tag| tag.to_string()))
    }
}

/// Serialise one template descriptor into a `d.multicall2` call fragment.
#[must_use]
pub fn call_fragment(descriptor: &MethodDescriptor) -> String {
    let mut fragment = descriptor.wire_method.clone();
    if !fragment.ends_with('=') {
        fragment.push('=');
    }
    let params: Vec<String> = descriptor
        .params
        .iter()
        .skip(1)
        .map(Value::fragment)
        .collect();
    fragment.push_str(&params.join(","));
    fragment
}

/// Merge a per-torrent template into one descriptor covering the whole scope.
///
/// The result decodes as one row per matched torrent, with columns named after
/// the template keys.
///
/// # Errors
///
/// Propagates ratio-group validation failures from the scope.
pub fn compile_batch(
    template: &[MethodDescriptor],
    scope: &BatchScope,
) -> RpcResult<MethodDescriptor> {
    let view = scope.resolve_view()?;
    let mut params = Vec::with_capacity(template.len() + 2);
    params.push(Value::str(""));
    params.push(Value::str(view.as_str()));
    params.extend(template.iter().map(|d| Value::Str(call_fragment(d))));
    let keys = template.iter().map(|d| d.key.clone()).collect();

    debug!(view = %view, calls = template.len(), "compiled batched call");
    Ok(MethodDescriptor::new(BATCH_METHOD, BATCH_METHOD, params).with_sub_field_keys(keys))
}
