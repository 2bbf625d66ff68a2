//! In-memory search service for tests and offline runs.
//!
//! `InMemorySearchService` keeps resources as the JSON records the real
//! service would hold and applies the same server-side rewrites, so the
//! synchronizer's equality rules are exercised against realistic reads.
//!
//! # Example
//!
//! ```ignore
//! use skillset_sync_repository::{InMemorySearchService, SearchServiceProvider};
//!
//! let service = InMemorySearchService::new();
//! service.create_or_update(&descriptor).await?;
//! assert_eq!(service.write_count(), 1);
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use skillset_sync_shared::{
    ExecutionReport, IndexerStatusDocument, ResourceDescriptor, ResourceKind,
};
use tracing::debug;

use crate::errors::SyncError;
use crate::interfaces::SearchServiceProvider;

type Key = (ResourceKind, String);

#[derive(Default)]
struct State {
    records: HashMap<Key, Value>,
    statuses: HashMap<String, VecDeque<IndexerStatusDocument>>,
    failures: VecDeque<SyncError>,
    writes: Vec<Key>,
    deletes: Vec<Key>,
    next_runs: HashMap<String, Vec<IndexerStatusDocument>>,
    last_start: Option<DateTime<Utc>>,
    runs: Vec<String>,
    resets: Vec<String>,
    etag: u64,
}

/// A search service that lives in memory.
///
/// Like the real service it:
/// - stamps every stored record with an `@odata.etag`
/// - never returns data source connection strings
/// - names unnamed skills `#1`, `#2`, ... by position
/// - fills in a schedule start time when none is given
/// - rejects indexers whose data source, skillset or index does not exist
/// - starts a run when a new, enabled indexer is created
/// - keeps reporting the previous run for one status request after a run is requested
pub struct InMemorySearchService {
    state: Mutex<State>,
}

impl Default for InMemorySearchService {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySearchService {
    /// Create an empty service.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a raw record as-is, bypassing every check.
    ///
    /// Useful to seed objects carrying attributes a descriptor can't express.
    pub fn insert_raw(&self, kind: ResourceKind, name: &str, record: Value) {
        self.state().records.insert((kind, name.to_string()), record);
    }

    /// The stored record, before credential masking.
    pub fn raw(&self, kind: ResourceKind, name: &str) -> Option<Value> {
        self.state().records.get(&(kind, name.to_string())).cloned()
    }

    /// Whether a resource of that kind and name exists.
    pub fn contains(&self, kind: ResourceKind, name: &str) -> bool {
        self.state().records.contains_key(&(kind, name.to_string()))
    }

    /// Number of stored resources.
    pub fn len(&self) -> usize {
        self.state().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of successful create-or-update calls.
    pub fn write_count(&self) -> usize {
        self.state().writes.len()
    }

    /// Kinds and names written, in call order.
    pub fn writes(&self) -> Vec<(ResourceKind, String)> {
        self.state().writes.clone()
    }

    /// Kinds and names deleted, in call order. Includes deletes of missing resources.
    pub fn deletes(&self) -> Vec<(ResourceKind, String)> {
        self.state().deletes.clone()
    }

    /// Indexers started with `run_indexer`, in call order.
    pub fn runs(&self) -> Vec<String> {
        self.state().runs.clone()
    }

    /// Indexers reset with `reset_indexer`, in call order.
    pub fn resets(&self) -> Vec<String> {
        self.state().resets.clone()
    }

    /// Script the status documents returned for an indexer.
    ///
    /// Each poll consumes one document; the last one keeps being returned.
    pub fn script_status(&self, indexer_name: &str, documents: Vec<IndexerStatusDocument>) {
        self.state()
            .statuses
            .insert(indexer_name.to_string(), documents.into());
    }

    /// Script the status documents of the next run started for an indexer.
    ///
    /// Without one, a run goes through one in-progress poll and then succeeds.
    /// Every document is stamped with the run's start time.
    pub fn script_next_run(&self, indexer_name: &str, documents: Vec<IndexerStatusDocument>) {
        self.state()
            .next_runs
            .insert(indexer_name.to_string(), documents);
    }

    /// Make the next provider call fail with `error`.
    ///
    /// Queued errors are consumed one per call, in order.
    pub fn fail_next(&self, error: SyncError) {
        self.state().failures.push_back(error);
    }

    fn default_run() -> Vec<IndexerStatusDocument> {
        vec![
            IndexerStatusDocument::with_run("inProgress", 0, 0),
            IndexerStatusDocument::with_run("success", 0, 0),
        ]
    }

    /// Replace the status script of `indexer_name` with a fresh run.
    ///
    /// Start times strictly increase from one run to the next. With `lagging`,
    /// the last reported run is served once more before the new one shows up.
    fn start_run(state: &mut State, indexer_name: &str, lagging: bool) {
        let now = Utc::now();
        let start = match state.last_start {
            Some(previous) => now.max(previous + Duration::milliseconds(1)),
            None => now,
        };
        state.last_start = Some(start);

        let documents = state
            .next_runs
            .remove(indexer_name)
            .unwrap_or_else(Self::default_run);
        let mut script: VecDeque<IndexerStatusDocument> =
            documents.into_iter().map(|d| d.started_at(start)).collect();

        if lagging {
            let previous = state
                .statuses
                .get(indexer_name)
                .and_then(|s| s.front())
                .filter(|d| d.last_result.is_some())
                .cloned();
            if let Some(previous) = previous {
                script.push_front(previous);
            }
        }
        state.statuses.insert(indexer_name.to_string(), script);
    }

    fn take_failure(state: &mut State) -> Result<(), SyncError> {
        match state.failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Apply the rewrites the service performs when it stores an object.
    fn store_rewrites(kind: ResourceKind, record: &mut Value) {
        match kind {
            ResourceKind::EnrichmentPipeline => {
                if let Some(skills) = record.get_mut("skills").and_then(Value::as_array_mut) {
                    for (position, skill) in skills.iter_mut().enumerate() {
                        let unnamed = skill.get("name").map_or(true, Value::is_null);
                        if unnamed {
                            skill["name"] = Value::from(format!("#{}", position + 1));
                        }
                    }
                }
            }
            ResourceKind::Indexer => {
                if let Some(schedule) = record.get_mut("schedule").filter(|s| s.is_object()) {
                    if schedule.get("startTime").map_or(true, Value::is_null) {
                        schedule["startTime"] = Value::from(Utc::now().to_rfc3339());
                    }
                }
            }
            ResourceKind::DataSource | ResourceKind::IndexSchema => {}
        }
    }

    /// Apply the rewrites the service performs when it returns an object.
    fn read_rewrites(kind: ResourceKind, mut record: Value) -> Value {
        if kind == ResourceKind::DataSource {
            if let Some(credentials) = record.get_mut("credentials").filter(|c| c.is_object()) {
                credentials["connectionString"] = Value::Null;
            }
        }
        record
    }

    fn decode(kind: ResourceKind, name: &str, record: Value) -> Result<ResourceDescriptor, SyncError> {
        ResourceDescriptor::from_json(kind, Self::read_rewrites(kind, record))
            .map_err(|e| SyncError::parse(format!("{} '{}': {}", kind, name, e)))
    }

    fn check_references(state: &State, descriptor: &ResourceDescriptor) -> Result<(), SyncError> {
        let ResourceDescriptor::Indexer(indexer) = descriptor else {
            return Ok(());
        };

        let mut required = vec![
            (ResourceKind::DataSource, indexer.data_source_name.as_str()),
            (ResourceKind::IndexSchema, indexer.target_index_name.as_str()),
        ];
        if let Some(skillset) = indexer.skillset_name.as_deref() {
            required.push((ResourceKind::EnrichmentPipeline, skillset));
        }

        for (kind, name) in required {
            if !state.records.contains_key(&(kind, name.to_string())) {
                return Err(SyncError::rejected(
                    descriptor.label(),
                    format!("The {} '{}' referenced by the indexer does not exist", kind, name),
                ));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl SearchServiceProvider for InMemorySearchService {
    async fn get(
        &self,
        kind: ResourceKind,
        name: &str,
    ) -> Result<Option<ResourceDescriptor>, SyncError> {
        let record = {
            let mut state = self.state();
            Self::take_failure(&mut state)?;
            state.records.get(&(kind, name.to_string())).cloned()
        };

        record.map(|r| Self::decode(kind, name, r)).transpose()
    }

    async fn create_or_update(
        &self,
        descriptor: &ResourceDescriptor,
    ) -> Result<ResourceDescriptor, SyncError> {
        let kind = descriptor.kind();
        let name = descriptor.name().to_string();
        let mut record = descriptor
            .to_json()
            .map_err(|e| SyncError::serialization(format!("{}: {}", descriptor.label(), e)))?;

        let stored = {
            let mut state = self.state();
            Self::take_failure(&mut state)?;
            Self::check_references(&state, descriptor)?;

            Self::store_rewrites(kind, &mut record);
            state.etag += 1;
            record["@odata.etag"] = Value::from(format!("\"0x{:X}\"", state.etag));

            let existed = state
                .records
                .insert((kind, name.clone()), record.clone())
                .is_some();
            state.writes.push((kind, name.clone()));

            // A new, enabled indexer starts its first run right away.
            if let ResourceDescriptor::Indexer(indexer) = descriptor {
                if !existed && !indexer.disabled.unwrap_or(false) {
                    Self::start_run(&mut state, &name, false);
                }
            }
            record
        };

        debug!(kind = %kind, name = %name, "Stored resource in memory");
        Self::decode(kind, &name, stored)
    }

    async fn delete(&self, kind: ResourceKind, name: &str) -> Result<(), SyncError> {
        let mut state = self.state();
        Self::take_failure(&mut state)?;
        state.records.remove(&(kind, name.to_string()));
        state.deletes.push((kind, name.to_string()));
        if kind == ResourceKind::Indexer {
            state.statuses.remove(name);
        }
        Ok(())
    }

    async fn get_execution_report(&self, indexer_name: &str) -> Result<ExecutionReport, SyncError> {
        let document = {
            let mut state = self.state();
            Self::take_failure(&mut state)?;
            if !state
                .records
                .contains_key(&(ResourceKind::Indexer, indexer_name.to_string()))
            {
                return Err(SyncError::not_found(format!("indexer '{}'", indexer_name)));
            }

            match state.statuses.get_mut(indexer_name) {
                Some(script) if script.len() > 1 => script.pop_front().unwrap_or_default(),
                Some(script) => script.front().cloned().unwrap_or_else(IndexerStatusDocument::idle),
                None => IndexerStatusDocument::idle(),
            }
        };

        Ok(ExecutionReport::decode(indexer_name, document)?)
    }

    async fn run_indexer(&self, indexer_name: &str) -> Result<(), SyncError> {
        let mut state = self.state();
        Self::take_failure(&mut state)?;
        if !state
            .records
            .contains_key(&(ResourceKind::Indexer, indexer_name.to_string()))
        {
            return Err(SyncError::not_found(format!("indexer '{}'", indexer_name)));
        }

        Self::start_run(&mut state, indexer_name, true);
        state.runs.push(indexer_name.to_string());
        Ok(())
    }

    async fn reset_indexer(&self, indexer_name: &str) -> Result<(), SyncError> {
        let mut state = self.state();
        Self::take_failure(&mut state)?;
        if !state
            .records
            .contains_key(&(ResourceKind::Indexer, indexer_name.to_string()))
        {
            return Err(SyncError::not_found(format!("indexer '{}'", indexer_name)));
        }
        state.resets.push(indexer_name.to_string());
        Ok(())
    }

    async fn ping(&self) -> Result<(), SyncError> {
        let mut state = self.state();
        Self::take_failure(&mut state)
    }
}
