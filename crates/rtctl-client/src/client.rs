//! Caller-facing facade issuing one batched round trip per operation.
//!
//! # Design
//! - Every operation compiles its descriptors with `rtctl-core`, sends them in a
//!   single `system.multicall`, and decodes the flat reply into records.
//! - Inputs are validated locally before anything is sent; a rejected magnet or
//!   unreadable torrent file never produces a partial batch.
//! - A few daemon-wide helpers (`system.time`, `view.list`, ...) are plain calls.

use std::path::PathBuf;

use rtctl_core::ops::{
    AddTorrentOptions, TorrentAction, action_descriptors, add_torrent_file, add_torrent_magnet,
    all_torrents, events_get, events_remove, events_set, torrent_fields,
};
use rtctl_core::registry::{FILES, PEERS, TRACKERS};
use rtctl_core::{
    BatchScope, FieldSelection, MAX_XMLRPC_SIZE, MethodDescriptor, RatioGroupSelector,
    RatioGroupTransition, Record, ResponseDecoder, RpcError, Transport, Value, check_response,
    normalize_settings, parse_ratio_group, parse_ratio_group_value, plan_ratio_group_change,
    settings_get, settings_set, size_limit_bytes, size_limit_mib,
};
use rtctl_metainfo::{MagnetLink, Metainfo};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::config::ConnectionConfig;
use crate::error::{ClientError, ClientResult, ConfigError};
use crate::transport::HttpTransport;

const HASH_FIELD: &str = "hash";
const RATIO_GROUP_FIELD: &str = "ratio_group";

/// Which torrents [`RtorrentClient::get_torrents`] reads, and which fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TorrentQuery {
    /// Explicit info hashes; when unset the whole scope is read in one batch.
    pub hashes: Option<Vec<String>>,
    /// View or ratio group read when no hashes are given.
    pub scope: BatchScope,
    /// Include the nested tracker rows.
    pub include_trackers: bool,
    /// Include the nested file rows.
    pub include_files: bool,
    /// Include the nested peer rows.
    pub include_peers: bool,
    /// Field filter applied on top of the group switches.
    pub selection: FieldSelection,
}

impl TorrentQuery {
    /// Query for specific torrents.
    #[must_use]
    pub fn hashes<I, S>(hashes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hashes: Some(hashes.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// Query for every torrent in `scope`.
    #[must_use]
    pub fn scope(scope: BatchScope) -> Self {
        Self {
            scope,
            ..Self::default()
        }
    }

    /// Restrict the fields returned.
    #[must_use]
    pub fn with_selection(mut self, selection: FieldSelection) -> Self {
        self.selection = selection;
        self
    }

    fn effective_selection(&self) -> FieldSelection {
        let switches = [
            (TRACKERS, self.include_trackers),
            (FILES, self.include_files),
            (PEERS, self.include_peers),
        ];
        switches
            .into_iter()
            .filter(|(_, included)| !included)
            .fold(self.selection.clone(), |selection, (group, _)| {
                selection.excluding(group)
            })
    }
}

/// One torrent to add.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TorrentItem {
    /// Magnet URI.
    Magnet(String),
    /// Local `.torrent` file.
    Path(PathBuf),
    /// Raw metainfo bytes.
    Bytes(Vec<u8>),
}

impl From<&str> for TorrentItem {
    /// Magnet-looking strings become [`TorrentItem::Magnet`]; anything else is a path.
    fn from(value: &str) -> Self {
        if MagnetLink::is_magnet(value) {
            Self::Magnet(value.to_string())
        } else {
            Self::Path(PathBuf::from(value))
        }
    }
}

impl From<PathBuf> for TorrentItem {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<Vec<u8>> for TorrentItem {
    fn from(data: Vec<u8>) -> Self {
        Self::Bytes(data)
    }
}

enum PreparedTorrent {
    Magnet(MagnetLink),
    File {
        info_hash: String,
        data: Vec<u8>,
        name: String,
        comment: String,
    },
}

impl PreparedTorrent {
    async fn load(item: TorrentItem) -> ClientResult<Self> {
        match item {
            TorrentItem::Magnet(uri) => Ok(Self::Magnet(MagnetLink::parse(&uri)?)),
            TorrentItem::Path(path) => match tokio::fs::read(&path).await {
                Ok(data) => Self::from_metainfo(&data),
                Err(source) => Err(ClientError::ReadTorrent { path, source }),
            },
            TorrentItem::Bytes(data) => Self::from_metainfo(&data),
        }
    }

    fn from_metainfo(data: &[u8]) -> ClientResult<Self> {
        let metainfo = Metainfo::from_bytes(data)?;
        Ok(Self::File {
            info_hash: metainfo.info_hash().to_string(),
            data: metainfo.to_bytes(),
            name: metainfo.name().unwrap_or_default().to_string(),
            comment: metainfo.comment().unwrap_or_default().to_string(),
        })
    }
}

/// Batched rTorrent client.
#[derive(Debug, Clone)]
pub struct RtorrentClient<T> {
    transport: T,
}

impl RtorrentClient<HttpTransport> {
    /// Client over HTTP using `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the settings do not describe a usable endpoint.
    pub fn connect(config: &ConnectionConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config.transport()?))
    }
}

impl<T: Transport> RtorrentClient<T> {
    /// Client over an existing transport.
    #[must_use]
    pub const fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    async fn execute(
        &self,
        methods: &[MethodDescriptor],
        entity_count: usize,
    ) -> ClientResult<Vec<Record>> {
        if methods.is_empty() {
            return Ok(Vec::new());
        }
        debug!(calls = methods.len(), entity_count, "executing batch");
        let response = self.transport.multicall(methods).await?;
        Ok(ResponseDecoder::new().decode(methods, response, entity_count)?)
    }

    async fn execute_single(&self, methods: &[MethodDescriptor]) -> ClientResult<Record> {
        Ok(self
            .execute(methods, 1)
            .await?
            .into_iter()
            .next()
            .unwrap_or_default())
    }

    /// Read torrents, one record per torrent.
    ///
    /// # Errors
    ///
    /// Fails when the batch cannot be delivered, any call faults, or the scope's
    /// ratio group is invalid.
    #[instrument(name = "client.get_torrents", skip(self, query))]
    pub async fn get_torrents(&self, query: &TorrentQuery) -> ClientResult<Vec<Record>> {
        let selection = query.effective_selection();
        match &query.hashes {
            Some(hashes) => {
                let methods: Vec<_> = hashes
                    .iter()
                    .flat_map(|hash| torrent_fields(Some(hash.as_str()), &selection))
                    .collect();
                self.execute(&methods, hashes.len()).await
            }
            None => {
                let batch = all_torrents(&query.scope, &selection)?;
                self.execute(std::slice::from_ref(&batch), 1).await
            }
        }
    }

    /// Read one torrent.
    ///
    /// # Errors
    ///
    /// Same as [`Self::get_torrents`], plus [`ClientError::MissingRecord`] when
    /// nothing comes back.
    pub async fn get_torrent(&self, hash: &str, selection: FieldSelection) -> ClientResult<Record> {
        let query = TorrentQuery::hashes([hash]).with_selection(selection);
        self.get_torrents(&query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::MissingRecord {
                hash: hash.to_string(),
            })
    }

    /// Apply `action` to each torrent in `hashes`.
    ///
    /// # Errors
    ///
    /// Fails when the batch cannot be delivered or any call faults.
    #[instrument(name = "client.apply", skip(self, hashes), fields(count = hashes.len()))]
    pub async fn apply<S>(&self, action: TorrentAction, hashes: &[S]) -> ClientResult<Vec<Record>>
    where
        S: AsRef<str> + Sync,
    {
        let methods = action_descriptors(action, hashes);
        let records = self.execute(&methods, hashes.len()).await?;
        info!(%action, torrents = records.len(), "torrent action applied");
        Ok(records)
    }

    /// Apply `action` to every torrent in `scope` with one batched call.
    ///
    /// # Errors
    ///
    /// Fails when the scope is invalid, the batch cannot be delivered, or the
    /// call faults.
    #[instrument(name = "client.apply_all", skip(self))]
    pub async fn apply_all(
        &self,
        action: TorrentAction,
        scope: &BatchScope,
    ) -> ClientResult<Vec<Record>> {
        let batch = action.batch(scope)?;
        self.execute(std::slice::from_ref(&batch), 1).await
    }

    /// Open and start torrents.
    ///
    /// # Errors
    ///
    /// See [`Self::apply`].
    pub async fn start<S: AsRef<str> + Sync>(&self, hashes: &[S]) -> ClientResult<Vec<Record>> {
        self.apply(TorrentAction::Start, hashes).await
    }

    /// Pause torrents.
    ///
    /// # Errors
    ///
    /// See [`Self::apply`].
    pub async fn pause<S: AsRef<str> + Sync>(&self, hashes: &[S]) -> ClientResult<Vec<Record>> {
        self.apply(TorrentAction::Pause, hashes).await
    }

    /// Resume paused torrents.
    ///
    /// # Errors
    ///
    /// See [`Self::apply`].
    pub async fn unpause<S: AsRef<str> + Sync>(&self, hashes: &[S]) -> ClientResult<Vec<Record>> {
        self.apply(TorrentAction::Unpause, hashes).await
    }

    /// Stop and close torrents.
    ///
    /// # Errors
    ///
    /// See [`Self::apply`].
    pub async fn stop<S: AsRef<str> + Sync>(&self, hashes: &[S]) -> ClientResult<Vec<Record>> {
        self.apply(TorrentAction::Stop, hashes).await
    }

    /// Re-verify torrent data.
    ///
    /// # Errors
    ///
    /// See [`Self::apply`].
    pub async fn check_hash<S: AsRef<str> + Sync>(&self, hashes: &[S]) -> ClientResult<Vec<Record>> {
        self.apply(TorrentAction::CheckHash, hashes).await
    }

    /// Remove torrents, keeping their data.
    ///
    /// # Errors
    ///
    /// See [`Self::apply`].
    pub async fn remove<S: AsRef<str> + Sync>(&self, hashes: &[S]) -> ClientResult<Vec<Record>> {
        self.apply(TorrentAction::Remove, hashes).await
    }

    /// Remove torrents and flag their data for deletion.
    ///
    /// # Errors
    ///
    /// See [`Self::apply`].
    pub async fn remove_and_delete<S: AsRef<str> + Sync>(
        &self,
        hashes: &[S],
    ) -> ClientResult<Vec<Record>> {
        self.apply(TorrentAction::RemoveAndDelete, hashes).await
    }

    /// [`Self::start`] for every torrent in `scope`.
    ///
    /// # Errors
    ///
    /// See [`Self::apply_all`].
    pub async fn start_all(&self, scope: &BatchScope) -> ClientResult<Vec<Record>> {
        self.apply_all(TorrentAction::Start, scope).await
    }

    /// [`Self::pause`] for every torrent in `scope`.
    ///
    /// # Errors
    ///
    /// See [`Self::apply_all`].
    pub async fn pause_all(&self, scope: &BatchScope) -> ClientResult<Vec<Record>> {
        self.apply_all(TorrentAction::Pause, scope).await
    }

    /// [`Self::unpause`] for every torrent in `scope`.
    ///
    /// # Errors
    ///
    /// See [`Self::apply_all`].
    pub async fn unpause_all(&self, scope: &BatchScope) -> ClientResult<Vec<Record>> {
        self.apply_all(TorrentAction::Unpause, scope).await
    }

    /// [`Self::stop`] for every torrent in `scope`.
    ///
    /// # Errors
    ///
    /// See [`Self::apply_all`].
    pub async fn stop_all(&self, scope: &BatchScope) -> ClientResult<Vec<Record>> {
        self.apply_all(TorrentAction::Stop, scope).await
    }

    /// [`Self::check_hash`] for every torrent in `scope`.
    ///
    /// # Errors
    ///
    /// See [`Self::apply_all`].
    pub async fn check_hash_all(&self, scope: &BatchScope) -> ClientResult<Vec<Record>> {
        self.apply_all(TorrentAction::CheckHash, scope).await
    }

    /// [`Self::remove`] for every torrent in `scope`.
    ///
    /// # Errors
    ///
    /// See [`Self::apply_all`].
    pub async fn remove_all(&self, scope: &BatchScope) -> ClientResult<Vec<Record>> {
        self.apply_all(TorrentAction::Remove, scope).await
    }

    /// [`Self::remove_and_delete`] for every torrent in `scope`.
    ///
    /// # Errors
    ///
    /// See [`Self::apply_all`].
    pub async fn remove_and_delete_all(&self, scope: &BatchScope) -> ClientResult<Vec<Record>> {
        self.apply_all(TorrentAction::RemoveAndDelete, scope).await
    }

    /// Load torrents, one record per item.
    ///
    /// Every item is validated before anything is sent. When no download path
    /// is given the daemon's default directory is asked for first.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Metainfo`] for a malformed magnet or torrent,
    /// [`ClientError::ReadTorrent`] for an unreadable file, and the usual batch
    /// failures otherwise.
    #[instrument(name = "client.add_torrents", skip(self, items, options), fields(count = items.len()))]
    pub async fn add_torrents(
        &self,
        items: Vec<TorrentItem>,
        options: &AddTorrentOptions,
    ) -> ClientResult<Vec<Record>> {
        let mut prepared = Vec::with_capacity(items.len());
        for item in items {
            prepared.push(PreparedTorrent::load(item).await?);
        }
        if prepared.is_empty() {
            return Ok(Vec::new());
        }

        let fallback = match options.download_path {
            Some(_) => None,
            None => Some(self.download_directory().await?),
        };
        let directives = options.resolve(fallback.as_deref())?;

        let methods: Vec<_> = prepared
            .into_iter()
            .flat_map(|torrent| match torrent {
                PreparedTorrent::Magnet(link) => {
                    add_torrent_magnet(link.info_hash(), link.as_str(), &directives)
                }
                PreparedTorrent::File {
                    info_hash,
                    data,
                    name,
                    comment,
                } => add_torrent_file(&info_hash, data, &name, &comment, &directives),
            })
            .collect();
        let entity_count = methods.len() / 2;
        let records = self.execute(&methods, entity_count).await?;
        info!(
            torrents = records.len(),
            path = %directives.download_path,
            "torrents added"
        );
        Ok(records)
    }

    /// Move torrents into `group`, or out of any group when `group` is `None`.
    ///
    /// Current membership is read in one batch; the planned changes are sent
    /// in a second one, skipped when nothing changes. Returns the torrents that
    /// changed with their transition.
    ///
    /// # Errors
    ///
    /// Fails when `group` is out of range, either batch cannot be delivered, any
    /// call faults, or a reply is missing elements.
    #[instrument(name = "client.set_ratio_group", skip(self, hashes), fields(count = hashes.len()))]
    pub async fn set_ratio_group<S>(
        &self,
        hashes: &[S],
        group: Option<RatioGroupSelector>,
    ) -> ClientResult<Vec<(String, RatioGroupTransition)>>
    where
        S: AsRef<str> + Sync,
    {
        let desired = parse_ratio_group(group.as_ref())?;
        let selection = FieldSelection::only([HASH_FIELD, RATIO_GROUP_FIELD]);
        let lookups: Vec<_> = hashes
            .iter()
            .flat_map(|hash| torrent_fields(Some(hash.as_ref()), &selection))
            .collect();
        let current = self.execute(&lookups, hashes.len()).await?;

        let mut changed = Vec::new();
        let mut methods = Vec::new();
        for record in &current {
            let Some(hash) = record
                .get(HASH_FIELD)
                .and_then(Value::as_str)
                .filter(|hash| !hash.is_empty())
            else {
                continue;
            };
            let member_of =
                parse_ratio_group_value(record.get(RATIO_GROUP_FIELD).unwrap_or(&Value::Nil))?;
            let transition = plan_ratio_group_change(member_of, desired);
            if transition == RatioGroupTransition::Unchanged {
                continue;
            }
            methods.extend(transition.descriptors(hash));
            changed.push((hash.to_string(), transition));
        }

        if methods.is_empty() {
            debug!("ratio group membership already up to date");
            return Ok(changed);
        }
        let response = self.transport.multicall(&methods).await?;
        check_response(&methods, &response)?;
        info!(torrents = changed.len(), "ratio group membership updated");
        Ok(changed)
    }

    /// Take torrents out of whatever ratio group they are in.
    ///
    /// # Errors
    ///
    /// See [`Self::set_ratio_group`].
    pub async fn remove_ratio_group<S>(
        &self,
        hashes: &[S],
    ) -> ClientResult<Vec<(String, RatioGroupTransition)>>
    where
        S: AsRef<str> + Sync,
    {
        self.set_ratio_group(hashes, None).await
    }

    /// Handlers registered on the download events, keyed by event.
    ///
    /// # Errors
    ///
    /// Fails when the batch cannot be delivered or any call faults.
    pub async fn get_events(&self, selection: &FieldSelection) -> ClientResult<Record> {
        self.execute_single(&events_get(selection)).await
    }

    /// Register `command` under `name` on `event`.
    ///
    /// # Errors
    ///
    /// Fails when the batch cannot be delivered or any call faults.
    #[instrument(name = "client.set_event", skip(self, command))]
    pub async fn set_event(&self, event: &str, name: &str, command: &str) -> ClientResult<Record> {
        self.execute_single(&events_set(event, name, command)).await
    }

    /// Remove the handler `name` from `event`.
    ///
    /// # Errors
    ///
    /// Fails when the batch cannot be delivered or any call faults.
    #[instrument(name = "client.remove_event", skip(self))]
    pub async fn remove_event(&self, event: &str, name: &str) -> ClientResult<Record> {
        self.execute_single(&events_remove(event, name)).await
    }

    /// Read daemon settings.
    ///
    /// # Errors
    ///
    /// Fails when the batch cannot be delivered or any call faults.
    pub async fn get_settings(&self, selection: &FieldSelection) -> ClientResult<Record> {
        self.execute_single(&settings_get(selection)).await
    }

    /// Write daemon settings; names may carry a `get_`/`set_` prefix.
    ///
    /// # Errors
    ///
    /// Fails when the batch cannot be delivered or any call faults.
    pub async fn set_settings<I, K, V>(&self, settings: I) -> ClientResult<Record>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let normalized = normalize_settings(settings);
        self.execute_single(&settings_set(&normalized, &FieldSelection::all()))
            .await
    }

    /// Daemon clock as a Unix timestamp.
    ///
    /// # Errors
    ///
    /// Fails when the call cannot be delivered or returns a non-integer.
    pub async fn server_time(&self) -> ClientResult<i64> {
        const METHOD: &str = "system.time";
        self.transport
            .call(METHOD, Vec::new())
            .await?
            .as_i64()
            .ok_or(ClientError::UnexpectedValue { method: METHOD })
    }

    /// Names of every view.
    ///
    /// # Errors
    ///
    /// Fails when the call cannot be delivered or returns a non-list.
    pub async fn views(&self) -> ClientResult<Vec<String>> {
        const METHOD: &str = "view.list";
        let reply = self.transport.call(METHOD, vec![Value::str("")]).await?;
        let names = reply
            .as_array()
            .ok_or(ClientError::UnexpectedValue { method: METHOD })?;
        Ok(names
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect())
    }

    /// Default download directory of the daemon.
    ///
    /// # Errors
    ///
    /// Fails when the call cannot be delivered or returns a non-string.
    pub async fn download_directory(&self) -> ClientResult<String> {
        const METHOD: &str = "directory.default";
        let reply = self.transport.call(METHOD, vec![Value::str("")]).await?;
        reply
            .as_str()
            .map(str::to_string)
            .ok_or(ClientError::UnexpectedValue { method: METHOD })
    }

    /// Request size ceiling of the daemon, rounded to whole MiB.
    ///
    /// # Errors
    ///
    /// Fails when the call cannot be delivered or returns a non-integer.
    pub async fn xmlrpc_size_limit_mib(&self) -> ClientResult<u64> {
        const METHOD: &str = "network.xmlrpc.size_limit";
        let reply = self.transport.call(METHOD, vec![Value::str("")]).await?;
        reply
            .as_i64()
            .and_then(|bytes| u64::try_from(bytes).ok())
            .map(size_limit_mib)
            .ok_or(ClientError::UnexpectedValue { method: METHOD })
    }

    /// Set the daemon's request size ceiling, returning the bytes written.
    ///
    /// Exactly 64 MiB is clamped to one byte below.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::ResourceLimit`] above 64 MiB without contacting the
    /// daemon, and fails when the call cannot be delivered.
    #[instrument(name = "client.set_xmlrpc_size_limit", skip(self))]
    pub async fn set_xmlrpc_size_limit_mib(&self, mib: u64) -> ClientResult<u64> {
        let bytes = size_limit_bytes(mib)?;
        let wire = i64::try_from(bytes).map_err(|_| RpcError::ResourceLimit {
            requested: bytes,
            maximum: MAX_XMLRPC_SIZE,
        })?;
        self.transport
            .call(
                "network.xmlrpc.size_limit.set",
                vec![Value::str(""), Value::Int(wire)],
            )
            .await?;
        info!(bytes, "xml-rpc size limit updated");
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use rtctl_core::TransportError;
    use rtctl_metainfo::MetainfoError;
    use rtctl_test_support::fixtures::{
        SAMPLE_INFO_HASH, fault, ok, sample_magnet, sample_torrent_bytes,
    };
    use rtctl_test_support::mocks::ScriptedTransport;

    fn client(transport: ScriptedTransport) -> RtorrentClient<ScriptedTransport> {
        RtorrentClient::new(transport)
    }

    fn row(values: Vec<Value>) -> Value {
        Value::Array(values)
    }

    async fn only_entries(client: &RtorrentClient<ScriptedTransport>) -> Vec<(String, Vec<Value>)> {
        let calls = client.transport().calls().await;
        assert_eq!(calls.len(), 1, "expected a single round trip");
        calls[0].multicall_entries()
    }

    #[tokio::test]
    async fn get_torrents_by_hash_builds_one_record_per_torrent() -> Result<()> {
        let client = client(ScriptedTransport::new().with_multicall(vec![
            ok("AAA"),
            ok("first.iso"),
            ok("BBB"),
            ok("second.iso"),
        ]));
        let query = TorrentQuery::hashes(["AAA", "BBB"])
            .with_selection(FieldSelection::only(["hash", "name"]));

        let records = client.get_torrents(&query).await?;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("name"), Some(&Value::str("first.iso")));
        assert_eq!(records[1].get("hash"), Some(&Value::str("BBB")));

        let entries = only_entries(&client).await;
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0], ("d.hash".to_string(), vec![Value::str("AAA")]));
        assert_eq!(entries[3], ("d.name".to_string(), vec![Value::str("BBB")]));
        Ok(())
    }

    #[tokio::test]
    async fn get_torrents_without_hashes_uses_one_batched_call() -> Result<()> {
        let rows = row(vec![
            row(vec![Value::str("AAA"), Value::Int(1500)]),
            row(vec![Value::str("BBB"), Value::Int(0)]),
        ]);
        let client = client(ScriptedTransport::new().with_multicall(vec![ok(rows)]));
        let query = TorrentQuery::scope(BatchScope::view("complete"))
            .with_selection(FieldSelection::only(["hash", "ratio", "trackers"]));

        let records = client.get_torrents(&query).await?;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("ratio"), Some(&Value::Double(1.5)));
        assert_eq!(records[1].get("hash"), Some(&Value::str("BBB")));

        let entries = only_entries(&client).await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, "d.multicall2");
        assert_eq!(
            entries[0].1,
            vec![
                Value::str(""),
                Value::str("complete"),
                Value::str("d.hash="),
                Value::str("d.ratio="),
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn faults_fail_the_whole_read() -> Result<()> {
        let client = client(
            ScriptedTransport::new()
                .with_multicall(vec![ok("AAA"), fault(-501, "Could not find info-hash.")]),
        );
        match client
            .get_torrent("ZZZ", FieldSelection::only(["hash", "name"]))
            .await
        {
            Err(ClientError::Rpc(RpcError::Fault { index, key, code, .. })) => {
                assert_eq!(index, 1);
                assert_eq!(key, "name");
                assert_eq!(code, -501);
            }
            other => panic!("unexpected result {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn empty_selection_reports_missing_record_without_a_call() {
        let client = client(ScriptedTransport::new());
        match client
            .get_torrent("AAA", FieldSelection::only(["no_such_field"]))
            .await
        {
            Err(ClientError::MissingRecord { hash }) => assert_eq!(hash, "AAA"),
            other => panic!("unexpected result {other:?}"),
        }
        assert!(client.transport().calls().await.is_empty());
    }

    #[tokio::test]
    async fn actions_batch_every_hash() -> Result<()> {
        let client = client(ScriptedTransport::new().with_multicall(vec![
            ok("AAA"),
            ok(0),
            ok(0),
            ok("BBB"),
            ok(0),
            ok(0),
        ]));
        let records = client.start(&["AAA", "BBB"]).await?;
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].get("hash"), Some(&Value::str("BBB")));
        assert_eq!(records[0].get("d.start"), Some(&Value::Int(0)));

        let methods: Vec<_> = only_entries(&client)
            .await
            .into_iter()
            .map(|(method, _)| method)
            .collect();
        assert_eq!(
            methods,
            vec!["d.hash", "d.open", "d.start", "d.hash", "d.open", "d.start"]
        );
        Ok(())
    }

    #[tokio::test]
    async fn scoped_actions_target_the_ratio_group_view() -> Result<()> {
        let rows = row(vec![row(vec![Value::str("AAA"), Value::Int(0)])]);
        let client = client(ScriptedTransport::new().with_multicall(vec![ok(rows)]));
        let records = client.pause_all(&BatchScope::ratio_group(2)).await?;
        assert_eq!(records.len(), 1);

        let entries = only_entries(&client).await;
        assert_eq!(entries[0].0, "d.multicall2");
        assert_eq!(entries[0].1[1], Value::str("rat_1"));
        Ok(())
    }

    #[tokio::test]
    async fn out_of_range_scope_is_rejected_locally() {
        let client = client(ScriptedTransport::new());
        assert!(matches!(
            client.stop_all(&BatchScope::ratio_group(9)).await,
            Err(ClientError::Rpc(RpcError::RatioGroupOutOfRange { index: 9 }))
        ));
        assert!(client.transport().calls().await.is_empty());
    }

    #[tokio::test]
    async fn add_torrents_sends_files_and_magnets_together() -> Result<()> {
        let client = client(ScriptedTransport::new().with_multicall(vec![
            ok(0),
            ok(SAMPLE_INFO_HASH),
            ok(0),
            ok(SAMPLE_INFO_HASH),
        ]));
        let options = AddTorrentOptions {
            download_path: Some("/data".to_string()),
            label: Some("movies & tv".to_string()),
            ..AddTorrentOptions::default()
        };
        let items = vec![
            TorrentItem::Bytes(sample_torrent_bytes()),
            TorrentItem::from(sample_magnet().as_str()),
        ];

        let records = client.add_torrents(items, &options).await?;
        assert_eq!(records.len(), 2);
        assert!(
            records
                .iter()
                .all(|record| record.get("hash") == Some(&Value::str(SAMPLE_INFO_HASH)))
        );

        let entries = only_entries(&client).await;
        let methods: Vec<_> = entries.iter().map(|(method, _)| method.as_str()).collect();
        assert_eq!(methods, vec!["load.raw_start", "cat", "load.start", "cat"]);
        let file_params = &entries[0].1;
        assert_eq!(file_params[1], Value::Bytes(sample_torrent_bytes()));
        assert_eq!(file_params[2], Value::str("d.set_custom1=movies%20%26%20tv"));
        assert_eq!(
            file_params[3],
            Value::str("d.set_custom2=VRS24mrkerHello%20World")
        );
        assert_eq!(file_params[4], Value::str("d.set_custom=x-filename,sample.iso"));
        assert_eq!(entries[1].1, vec![Value::str(""), Value::str(SAMPLE_INFO_HASH)]);
        Ok(())
    }

    #[tokio::test]
    async fn add_torrents_falls_back_to_daemon_directory() -> Result<()> {
        let client = client(
            ScriptedTransport::new()
                .with_reply("/srv/downloads")
                .with_multicall(vec![ok(0), ok(SAMPLE_INFO_HASH)]),
        );
        let options = AddTorrentOptions {
            add_stopped: true,
            ..AddTorrentOptions::default()
        };
        client
            .add_torrents(vec![TorrentItem::Magnet(sample_magnet())], &options)
            .await?;

        let calls = client.transport().calls().await;
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].method, "directory.default");
        let entries = calls[1].multicall_entries();
        assert_eq!(entries[0].0, "load.normal");
        assert!(
            entries[0]
                .1
                .contains(&Value::str("execute=mkdir,-p,\"/srv/downloads\""))
        );
        Ok(())
    }

    #[tokio::test]
    async fn invalid_inputs_are_rejected_before_any_call() {
        let client = client(ScriptedTransport::new());
        let options = AddTorrentOptions::default();

        let magnet = client
            .add_torrents(
                vec![
                    TorrentItem::Bytes(sample_torrent_bytes()),
                    TorrentItem::Magnet("magnet:?xt=urn:btih:tooshort".to_string()),
                ],
                &options,
            )
            .await;
        assert!(matches!(
            magnet,
            Err(ClientError::Metainfo(MetainfoError::InvalidMagnet { .. }))
        ));

        let missing = client
            .add_torrents(
                vec![TorrentItem::Path(PathBuf::from("/nonexistent/rtctl.torrent"))],
                &options,
            )
            .await;
        assert!(matches!(missing, Err(ClientError::ReadTorrent { .. })));

        let garbage = client
            .add_torrents(vec![TorrentItem::Bytes(b"not bencode".to_vec())], &options)
            .await;
        assert!(matches!(garbage, Err(ClientError::Metainfo(_))));

        assert!(client.transport().calls().await.is_empty());
    }

    #[tokio::test]
    async fn set_ratio_group_plans_each_transition() -> Result<()> {
        let client = client(
            ScriptedTransport::new()
                .with_multicall(vec![
                    ok("AAA"),
                    ok(Value::Array(Vec::new())),
                    ok("BBB"),
                    ok(row(vec![Value::str("rat_0")])),
                    ok("CCC"),
                    ok(row(vec![Value::str("rat_2")])),
                ])
                .with_multicall(vec![ok(0); 6]),
        );
        let changed = client.set_ratio_group(&["AAA", "BBB", "CCC"], Some(3.into())).await?;

        let hashes: Vec<_> = changed.iter().map(|(hash, _)| hash.as_str()).collect();
        assert_eq!(hashes, vec!["AAA", "BBB"]);
        assert!(matches!(changed[0].1, RatioGroupTransition::Set { .. }));
        assert!(matches!(changed[1].1, RatioGroupTransition::Replace { .. }));

        let calls = client.transport().calls().await;
        assert_eq!(calls.len(), 2);
        let methods: Vec<_> = calls[1]
            .multicall_entries()
            .into_iter()
            .map(|(method, params)| (method, params[1].clone()))
            .collect();
        assert_eq!(
            methods,
            vec![
                ("d.views.push_back_unique".to_string(), Value::str("rat_2")),
                ("view.set_visible".to_string(), Value::str("rat_2")),
                ("view.set_not_visible".to_string(), Value::str("rat_0")),
                ("d.views.remove".to_string(), Value::str("rat_0")),
                ("d.views.push_back_unique".to_string(), Value::str("rat_2")),
                ("view.set_visible".to_string(), Value::str("rat_2")),
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn short_membership_update_reply_is_rejected() -> Result<()> {
        let client = client(
            ScriptedTransport::new()
                .with_multicall(vec![ok("AAA"), ok(Value::Array(Vec::new()))])
                .with_multicall(vec![ok(0)]),
        );
        match client.set_ratio_group(&["AAA"], Some(3.into())).await {
            Err(ClientError::Rpc(RpcError::ResponseLength { expected, actual })) => {
                assert_eq!(expected, 2);
                assert_eq!(actual, 1);
            }
            other => panic!("unexpected result {other:?}"),
        }
        assert_eq!(client.transport().calls().await.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn unchanged_membership_skips_the_second_round_trip() -> Result<()> {
        let client = client(
            ScriptedTransport::new().with_multicall(vec![ok("AAA"), ok(Value::Array(Vec::new()))]),
        );
        let changed = client.remove_ratio_group(&["AAA"]).await?;
        assert!(changed.is_empty());
        assert_eq!(client.transport().calls().await.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn events_and_settings_decode_to_one_record() -> Result<()> {
        let client = client(
            ScriptedTransport::new()
                .with_multicall(vec![ok(0), ok(row(vec![Value::str("notify")]))])
                .with_multicall(vec![ok(0), ok(0)]),
        );
        let event = client
            .set_event("event.download.finished", "notify", "execute=notify-send,done")
            .await?;
        assert_eq!(
            event.get("method.get"),
            Some(&Value::Array(vec![Value::str("notify")]))
        );

        let written = client
            .set_settings([("get_max_peers", Value::Int(80)), ("set_directory", Value::Nil)])
            .await?;
        assert_eq!(written.len(), 2);

        let calls = client.transport().calls().await;
        let settings = calls[1].multicall_entries();
        assert_eq!(
            settings,
            vec![
                ("set_max_peers".to_string(), vec![Value::str(""), Value::Int(80)]),
                ("set_directory".to_string(), vec![Value::str(""), Value::str("")]),
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn single_call_helpers_decode_plain_values() -> Result<()> {
        let client = client(
            ScriptedTransport::new()
                .with_reply(1_700_000_000_i64)
                .with_reply(Value::Array(vec![Value::str("main"), Value::str("rat_0")]))
                .with_reply(67_108_863_i64)
                .with_reply(0_i64),
        );
        assert_eq!(client.server_time().await?, 1_700_000_000);
        assert_eq!(client.views().await?, vec!["main", "rat_0"]);
        assert_eq!(client.xmlrpc_size_limit_mib().await?, 64);
        assert_eq!(client.set_xmlrpc_size_limit_mib(64).await?, MAX_XMLRPC_SIZE);

        let calls = client.transport().calls().await;
        assert_eq!(calls[3].method, "network.xmlrpc.size_limit.set");
        assert_eq!(
            calls[3].params,
            vec![Value::str(""), Value::Int(67_108_863)]
        );
        Ok(())
    }

    #[tokio::test]
    async fn oversized_limit_is_rejected_locally() {
        let client = client(ScriptedTransport::new());
        assert!(matches!(
            client.set_xmlrpc_size_limit_mib(65).await,
            Err(ClientError::Rpc(RpcError::ResourceLimit { .. }))
        ));
        assert!(client.transport().calls().await.is_empty());
    }

    #[tokio::test]
    async fn transport_failures_surface_as_rpc_errors() {
        let client = client(ScriptedTransport::new().with_error(TransportError::Status {
            method: "system.multicall".to_string(),
            status: 502,
        }));
        assert!(matches!(
            client.get_events(&FieldSelection::all()).await,
            Err(ClientError::Rpc(RpcError::Transport(TransportError::Status {
                status: 502,
                ..
            })))
        ));
        assert!(matches!(
            client.server_time().await,
            Err(ClientError::Rpc(RpcError::Transport(
                TransportError::UnexpectedResponse { .. }
            )))
        ));
    }
}
