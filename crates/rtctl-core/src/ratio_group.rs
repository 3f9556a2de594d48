//! Ratio-group index codec and group-membership transitions.
//!
//! Humans address ratio groups as `1..=8`; the daemon names the backing views
//! `rat_0..=rat_7`.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::descriptor::{FieldSelection, MethodDescriptor, WireCall, build_descriptors};
use crate::error::{RpcError, RpcResult};
use crate::value::Value;

/// Smallest one-based ratio group index.
pub const RATIO_GROUP_MIN: i64 = 1;
/// Largest one-based ratio group index.
pub const RATIO_GROUP_MAX: i64 = 8;

const TAG_PREFIX: &str = "rat_";

/// Internal view tag for a ratio group (`rat_<N>`, `N` zero-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RatioGroupTag(u8);

impl RatioGroupTag {
    /// Build a tag from a one-based group index.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::RatioGroupOutOfRange`] outside `1..=8`.
    pub fn from_index(index: i64) -> RpcResult<Self> {
        if !(RATIO_GROUP_MIN..=RATIO_GROUP_MAX).contains(&index) {
            return Err(RpcError::RatioGroupOutOfRange { index });
        }
        let zero_based = u8::try_from(index - 1)
            .map_err(|_| RpcError::RatioGroupOutOfRange { index })?;
        Ok(Self(zero_based))
    }

    /// One-based group index.
    #[must_use]
    pub const fn index(self) -> u8 {
        self.0 + 1
    }

    /// Zero-based suffix used in the view name.
    #[must_use]
    pub const fn zero_based(self) -> u8 {
        self.0
    }
}

impl Display for RatioGroupTag {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{TAG_PREFIX}{}", self.0)
    }
}

impl FromStr for RatioGroupTag {
    type Err = RpcError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let index = format_ratio_group_tag(value)?;
        Self::from_index(i64::from(index))
    }
}

/// Ways a caller may name a ratio group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RatioGroupSelector {
    /// One-based index.
    Index(i64),
    /// Numeric string (`"3"`) or tag (`"rat_2"`).
    Name(String),
}

impl From<i64> for RatioGroupSelector {
    fn from(index: i64) -> Self {
        Self::Index(index)
    }
}

impl From<i32> for RatioGroupSelector {
    fn from(index: i32) -> Self {
        Self::Index(i64::from(index))
    }
}

impl From<&str> for RatioGroupSelector {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for RatioGroupSelector {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<RatioGroupTag> for RatioGroupSelector {
    fn from(tag: RatioGroupTag) -> Self {
        Self::Index(i64::from(tag.index()))
    }
}

/// Resolve a selector to its internal tag; `None` and empty names yield `None`.
///
/// # Errors
///
/// Returns [`RpcError::RatioGroupOutOfRange`] when the resolved index is outside
/// `1..=8` and [`RpcError::InvalidRatioGroup`] when a name is not numeric.
pub fn parse_ratio_group(
    selector: Option<&RatioGroupSelector>,
) -> RpcResult<Option<RatioGroupTag>> {
    match selector {
        None => Ok(None),
        Some(RatioGroupSelector::Index(index)) => RatioGroupTag::from_index(*index).map(Some),
        Some(RatioGroupSelector::Name(name)) => parse_ratio_group_name(name),
    }
}

/// Resolve a decoded response value (index, name, tag, or list of those).
///
/// # Errors
///
/// Same conditions as [`parse_ratio_group`].
pub fn parse_ratio_group_value(value: &Value) -> RpcResult<Option<RatioGroupTag>> {
    match value {
        Value::Array(items) => items.first().map_or(Ok(None), parse_ratio_group_value),
        Value::Int(index) => RatioGroupTag::from_index(*index).map(Some),
        Value::Str(name) => parse_ratio_group_name(name),
        Value::Nil => Ok(None),
        other => Err(RpcError::InvalidRatioGroup {
            value: format!("{other:?}"),
        }),
    }
}

fn parse_ratio_group_name(name: &str) -> RpcResult<Option<RatioGroupTag>> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let invalid = || RpcError::InvalidRatioGroup {
        value: name.to_string(),
    };
    let index = match trimmed.strip_prefix(TAG_PREFIX) {
        Some(suffix) => suffix.parse::<i64>().map_err(|_| invalid())?.saturating_add(1),
        None => trimmed.parse::<i64>().map_err(|_| invalid())?,
    };
    RatioGroupTag::from_index(index).map(Some)
}

/// Convert a `rat_<N>` tag to its one-based index (`N + 1`).
///
/// # Errors
///
/// Returns [`RpcError::InvalidRatioGroup`] when the tag is malformed and
/// [`RpcError::RatioGroupOutOfRange`] when `N` is outside `0..=7`.
pub fn format_ratio_group_tag(tag: &str) -> RpcResult<u8> {
    let suffix = tag
        .trim()
        .strip_prefix(TAG_PREFIX)
        .ok_or_else(|| RpcError::InvalidRatioGroup {
            value: tag.to_string(),
        })?;
    let zero_based = suffix
        .parse::<i64>()
        .map_err(|_| RpcError::InvalidRatioGroup {
            value: tag.to_string(),
        })?;
    RatioGroupTag::from_index(zero_based.saturating_add(1)).map(RatioGroupTag::index)
}

/// Membership change needed to move an entity to its desired group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatioGroupTransition {
    /// Already in the desired state.
    Unchanged,
    /// Not grouped yet; join `to`.
    Set {
        /// Group to join.
        to: RatioGroupTag,
    },
    /// Leave `from` without joining another group.
    Remove {
        /// Group to leave.
        from: RatioGroupTag,
    },
    /// Leave `from`, then join `to`.
    Replace {
        /// Group to leave.
        from: RatioGroupTag,
        /// Group to join.
        to: RatioGroupTag,
    },
}

impl RatioGroupTransition {
    /// Wire calls implementing the transition for one torrent.
    #[must_use]
    pub fn descriptors(self, hash: &str) -> Vec<MethodDescriptor> {
        match self {
            Self::Unchanged => Vec::new(),
            Self::Set { to } => ratio_group_set(hash, to),
            Self::Remove { from } => ratio_group_remove(hash, from),
            Self::Replace { from, to } => ratio_group_replace(hash, from, to),
        }
    }
}

/// Decide which transition moves an entity from `current` to `desired`.
#[must_use]
pub const fn plan_ratio_group_change(
    current: Option<RatioGroupTag>,
    desired: Option<RatioGroupTag>,
) -> RatioGroupTransition {
    match (current, desired) {
        (None, None) => RatioGroupTransition::Unchanged,
        (None, Some(to)) => RatioGroupTransition::Set { to },
        (Some(from), None) => RatioGroupTransition::Remove { from },
        (Some(from), Some(to)) if from.0 == to.0 => RatioGroupTransition::Unchanged,
        (Some(from), Some(to)) => RatioGroupTransition::Replace { from, to },
    }
}

fn join_calls(hash: &str, tag: RatioGroupTag) -> [(&'static str, WireCall); 2] {
    let params = || vec![Value::str(hash), Value::str(tag.to_string())];
    [
        (
            "d.views.push_back_unique",
            WireCall::new("d.views.push_back_unique", params()),
        ),
        ("view.set_visible", WireCall::new("view.set_visible", params())),
    ]
}

fn leave_calls(hash: &str, tag: RatioGroupTag) -> [(&'static str, WireCall); 2] {
    let params = || vec![Value::str(hash), Value::str(tag.to_string())];
    [
        (
            "view.set_not_visible",
            WireCall::new("view.set_not_visible", params()),
        ),
        ("d.views.remove", WireCall::new("d.views.remove", params())),
    ]
}

/// Add an ungrouped torrent to `group`.
#[must_use]
pub fn ratio_group_set(hash: &str, group: RatioGroupTag) -> Vec<MethodDescriptor> {
    build_descriptors(join_calls(hash, group), &FieldSelection::all())
}

/// Take a torrent out of `group`.
#[must_use]
pub fn ratio_group_remove(hash: &str, group: RatioGroupTag) -> Vec<MethodDescriptor> {
    build_descriptors(leave_calls(hash, group), &FieldSelection::all())
}

/// Move a torrent from `old` to `new`, leaving before joining.
#[must_use]
pub fn ratio_group_replace(
    hash: &str,
    old: RatioGroupTag,
    new: RatioGroupTag,
) -> Vec<MethodDescriptor> {
    let calls = leave_calls(hash, old)
        .into_iter()
        .chain(join_calls(hash, new));
    build_descriptors(calls, &FieldSelection::all())
}
