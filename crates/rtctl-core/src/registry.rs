//! Declarative field tables for the repeating entities nested under a torrent.
//!
//! # Design
//! - Each group (trackers, files, peers) is declared once as an ordered table of
//!   `(field name, wire getter)` pairs; the declaration order is the column order of
//!   decoded rows.
//! - The process-wide registry is built on first use and never mutated afterwards.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use tracing::error;

use crate::error::{RpcError, RpcResult};
use crate::value::{Record, Value};

/// Group name for tracker rows.
pub const TRACKERS: &str = "trackers";
/// Group name for file rows.
pub const FILES: &str = "files";
/// Group name for peer rows.
pub const PEERS: &str = "peers";

const TRACKER_FIELDS: &[(&str, &str)] = &[
    ("url", "t.url="),
    ("type", "t.type="),
    ("is_enabled", "t.is_enabled="),
    ("group", "t.group="),
    ("scrape_complete", "t.scrape_complete="),
    ("scrape_incomplete", "t.scrape_incomplete="),
    ("scrape_downloaded", "t.scrape_downloaded="),
    ("scrape_counter", "t.scrape_counter="),
    ("normal_interval", "t.normal_interval="),
    ("scrape_time_last", "t.scrape_time_last="),
    ("failed_counter", "t.failed_counter="),
    ("success_counter", "t.success_counter="),
    ("is_busy", "t.is_busy="),
    ("latest_event", "t.latest_event="),
    ("latest_new_peers", "t.latest_new_peers="),
    ("latest_sum_peers", "t.latest_sum_peers="),
];

const FILE_FIELDS: &[(&str, &str)] = &[
    ("path", "f.path="),
    ("frozen_path", "f.frozen_path="),
    ("is_created", "f.is_created="),
    ("is_open", "f.is_open="),
    ("priority", "f.priority="),
    ("chunks_completed", "f.completed_chunks="),
    ("chunks_total", "f.size_chunks="),
    ("is_complete", "equal=f.size_chunks=,f.completed_chunks="),
];

const PEER_FIELDS: &[(&str, &str)] = &[
    ("id", "p.id="),
    ("address", "p.address="),
    ("port", "p.port="),
    ("client_version", "p.client_version="),
    ("completed_percent", "p.completed_percent="),
    ("down_rate", "p.down_rate="),
    ("down_total", "p.down_total="),
    ("up_rate", "p.up_rate="),
    ("up_total", "p.up_total="),
    ("peer_rate", "p.peer_total="),
    ("is_incoming", "p.is_incoming="),
    ("is_obfuscated", "p.is_obfuscated="),
    ("is_preferred", "p.is_preferred="),
    ("is_snubbed", "p.is_snubbed="),
    ("is_banned", "p.banned="),
];

/// Static declaration of one repeating-entity group.
#[derive(Debug, Clone, Copy)]
pub struct GroupDefinition {
    /// Field name the group is stored under in a torrent record.
    pub name: &'static str,
    /// Per-torrent multicall used to fetch the group's rows.
    pub multicall: &'static str,
    /// Ordered `(field name, wire getter)` pairs.
    pub fields: &'static [(&'static str, &'static str)],
}

/// Built-in group declarations, in registry order.
pub const GROUP_DEFINITIONS: &[GroupDefinition] = &[
    GroupDefinition {
        name: TRACKERS,
        multicall: "t.multicall",
        fields: TRACKER_FIELDS,
    },
    GroupDefinition {
        name: FILES,
        multicall: "f.multicall",
        fields: FILE_FIELDS,
    },
    GroupDefinition {
        name: PEERS,
        multicall: "p.multicall",
        fields: PEER_FIELDS,
    },
];

static REGISTRY: Lazy<FieldRegistry> = Lazy::new(FieldRegistry::standard);

/// Access the process-wide registry of built-in groups.
#[must_use]
pub fn registry() -> &'static FieldRegistry {
    &REGISTRY
}

/// Immutable, ordered field table for one group.
#[derive(Debug, Clone)]
pub struct FieldGroup {
    name: &'static str,
    multicall: &'static str,
    fields: IndexMap<&'static str, &'static str>,
}

impl FieldGroup {
    /// Build a group from its declaration, rejecting duplicate field names.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::DuplicateField`] when a field name is declared twice.
    pub fn try_from_definition(definition: &GroupDefinition) -> RpcResult<Self> {
        let fields = definition.fields.iter().try_fold(
            IndexMap::with_capacity(definition.fields.len()),
            |mut fields, &(field, getter)| {
                if fields.insert(field, getter).is_some() {
                    return Err(RpcError::DuplicateField {
                        group: definition.name,
                        field,
                    });
                }
                Ok(fields)
            },
        )?;
        Ok(Self {
            name: definition.name,
            multicall: definition.multicall,
            fields,
        })
    }

    /// Field name the group is stored under.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Per-torrent multicall method for this group.
    #[must_use]
    pub const fn multicall(&self) -> &'static str {
        self.multicall
    }

    /// Field names in column order.
    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.keys().copied()
    }

    /// Wire getters in column order.
    pub fn getters(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.values().copied()
    }

    /// Number of columns in a decoded row.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the group declares no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Zip one positional row against the group's field order.
    #[must_use]
    pub fn decode_row(&self, row: &[Value]) -> Record {
        self.field_names()
            .zip(row.iter().cloned())
            .map(|(field, value)| (field.to_string(), value))
            .collect()
    }
}

/// Read-only collection of field groups keyed by group name.
#[derive(Debug, Clone)]
pub struct FieldRegistry {
    groups: IndexMap<&'static str, FieldGroup>,
}

impl FieldRegistry {
    /// Build a registry from group declarations.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::DuplicateField`] when any group repeats a field name.
    pub fn build(definitions: &[GroupDefinition]) -> RpcResult<Self> {
        let groups = definitions
            .iter()
            .map(|definition| {
                FieldGroup::try_from_definition(definition).map(|group| (group.name, group))
            })
            .collect::<RpcResult<_>>()?;
        Ok(Self { groups })
    }

    /// Registry of the built-in groups.
    ///
    /// A built-in table that fails validation is logged and left out.
    fn standard() -> Self {
        let groups = GROUP_DEFINITIONS
            .iter()
            .filter_map(|definition| match FieldGroup::try_from_definition(definition) {
                Ok(group) => Some((group.name, group)),
                Err(error) => {
                    error!(group = definition.name, %error, "built-in field table rejected");
                    None
                }
            })
            .collect();
        Self { groups }
    }

    /// Look up a group by name.
    #[must_use]
    pub fn group(&self, name: &str) -> Option<&FieldGroup> {
        self.groups.get(name)
    }

    /// Whether `name` is a registered group name.
    #[must_use]
    pub fn is_group(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    /// Groups in declaration order.
    pub fn groups(&self) -> impl Iterator<Item = &FieldGroup> {
        self.groups.values()
    }
}
