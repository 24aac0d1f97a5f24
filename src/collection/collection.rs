//! # Collection engine
//!
//! One `Collection` serves queries, aggregations and subscriptions over a
//! single database collection.
//!
//! Query flow:
//! 1. Access check, then filter and access conditions are compiled
//! 2. A statically false condition returns no results without a database call
//! 3. The filter is classified fast or slow and routed to a connection
//! 4. Plain queries execute once; wait-for queries race a poll loop, a
//!    change-feed listener, a timer and caller cancellation
//!
//! The losers of the wait-for race are dropped before the result is
//! returned, which deregisters the listener and clears the poll timer.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::access::AccessRights;
use super::config::{EngineConfig, SlowQueriesMode};
use super::driver::DatabaseDriver;
use super::errors::{QueryError, QueryResult};
use super::query::{
    access_filtered_condition, compile_query, keys_query, CompiledQuery, DocumentMatcher,
    QueryRequest,
};
use super::stats::{CollectionStats, StatsSnapshot};
use crate::aggregation::{AggregationQuery, FieldAggregation};
use crate::filter::{FieldSelection, FilterError, QueryParams, StructType, TypeRef};
use crate::observability::{Logger, ObservationScope};
use crate::planner::{classify_query, IndexInfo, OrderBy, QueryClass, QueryClassCache};
use crate::realtime::{ChangeFeed, ChangeKind, Subscription};

pub struct Collection {
    name: String,
    doc_type: TypeRef,
    account_fields: Vec<String>,
    fast: Arc<dyn DatabaseDriver>,
    slow: Arc<dyn DatabaseDriver>,
    feed: ChangeFeed,
    cache: QueryClassCache,
    stats: Arc<CollectionStats>,
    config: EngineConfig,
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name)
            .field("account_fields", &self.account_fields)
            .field("feed", &self.feed)
            .finish()
    }
}

impl Collection {
    /// `doc_type` must be a struct type
    pub fn new(
        name: impl Into<String>,
        doc_type: TypeRef,
        fast: Arc<dyn DatabaseDriver>,
        slow: Arc<dyn DatabaseDriver>,
        config: EngineConfig,
    ) -> Self {
        Self {
            name: name.into(),
            doc_type,
            account_fields: Vec::new(),
            fast,
            slow,
            feed: ChangeFeed::new(),
            cache: QueryClassCache::default(),
            stats: Arc::new(CollectionStats::new()),
            config,
        }
    }

    /// Storage fields naming the accounts a document belongs to
    pub fn with_account_fields(mut self, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.account_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Initial index catalog, used until the first refresh
    pub fn with_indexes(self, indexes: Vec<IndexInfo>) -> Self {
        self.cache.update_indexes(indexes);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn doc_type(&self) -> &TypeRef {
        &self.doc_type
    }

    pub fn account_fields(&self) -> &[String] {
        &self.account_fields
    }

    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    pub fn cache(&self) -> &QueryClassCache {
        &self.cache
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    fn struct_type(&self) -> QueryResult<&StructType> {
        self.doc_type
            .as_struct()
            .ok_or_else(|| FilterError::invalid_field(&self.name).into())
    }

    /// Delivers a document observed on the change feed to every listener
    pub fn on_document(&self, document: &Value, kind: ChangeKind) -> usize {
        self.stats.record_observed_document();
        self.feed.dispatch(document, kind)
    }

    /// Fast/slow verdict for a filter, memoized by compiled condition and
    /// sort order
    pub fn classify(
        &self,
        filter: &Value,
        filter_condition: &str,
        order_by: &[OrderBy],
    ) -> QueryResult<QueryClass> {
        let fingerprint = QueryClassCache::fingerprint(filter_condition, order_by);
        let class = self.cache.get_or_classify(&fingerprint, |indexes| {
            classify_query(indexes, &self.doc_type, filter, order_by)
        })?;
        Ok(class)
    }

    /// Picks the connection for a verdict. Returns the driver and whether
    /// the query runs as fast.
    fn route(&self, class: &QueryClass) -> QueryResult<(Arc<dyn DatabaseDriver>, bool)> {
        let Some(reason) = class.reason() else {
            return Ok((self.fast.clone(), true));
        };
        self.stats.record_slow_query();
        let reason = reason.to_string();
        Logger::warn(
            "SLOW_QUERY_DETECTED",
            &[("collection", self.name.as_str()), ("reason", reason.as_str())],
        );
        match self.config.slow_queries {
            SlowQueriesMode::Redirect => Ok((self.slow.clone(), false)),
            SlowQueriesMode::Enable => Ok((self.fast.clone(), false)),
            SlowQueriesMode::Disable => Err(QueryError::SlowQueriesDisabled(reason)),
        }
    }

    async fn execute(
        &self,
        driver: &dyn DatabaseDriver,
        text: &str,
        params: &Map<String, Value>,
        is_fast: bool,
    ) -> QueryResult<Vec<Value>> {
        let operation = Uuid::new_v4().to_string();
        let params_text = Value::Object(params.clone()).to_string();
        let fast = is_fast.to_string();
        let scope = ObservationScope::with_fields(
            "COLLECTION_QUERY",
            &[
                ("collection", self.name.as_str()),
                ("fast", fast.as_str()),
                ("operation", operation.as_str()),
                ("params", params_text.as_str()),
                ("text", text),
            ],
        );
        match driver.execute(text, params).await {
            Ok(documents) => {
                self.stats.add_query_time(scope.elapsed_ms() as u64);
                let count = documents.len().to_string();
                scope.complete_with_fields(&[("count", count.as_str())]);
                Ok(documents)
            }
            Err(err) => {
                self.stats.record_failed_query();
                self.stats.add_query_time(scope.elapsed_ms() as u64);
                scope.fail(&err.to_string());
                Err(err.into())
            }
        }
    }

    /// Runs a query, waiting for a match when the request carries a timeout
    pub async fn query(
        &self,
        request: &QueryRequest,
        access: &AccessRights,
        cancel: &CancellationToken,
    ) -> QueryResult<Vec<Value>> {
        access.ensure_granted()?;
        self.stats.record_query();
        let _active = self.stats.begin_query();

        let compiled = compile_query(
            &self.name,
            &self.doc_type,
            request,
            access,
            &self.account_fields,
            &self.config,
        )?;
        if compiled.is_statically_false() {
            return Ok(Vec::new());
        }

        let class = self.classify(&request.filter, &compiled.filter_condition, &request.order_by)?;
        let (driver, is_fast) = self.route(&class)?;

        match request.timeout_ms.filter(|t| *t > 0) {
            None => {
                self.execute(driver.as_ref(), &compiled.text, &compiled.params, is_fast)
                    .await
            }
            Some(timeout_ms) => {
                let matcher = DocumentMatcher::new(
                    self.doc_type.clone(),
                    request.filter.clone(),
                    access.clone(),
                    self.account_fields.clone(),
                    compiled.selection.clone(),
                );
                let timeout = self.config.wait_timeout(timeout_ms);
                self.wait_for(&compiled, driver.as_ref(), is_fast, matcher, timeout, cancel)
                    .await
            }
        }
    }

    async fn wait_for(
        &self,
        compiled: &CompiledQuery,
        driver: &dyn DatabaseDriver,
        is_fast: bool,
        matcher: DocumentMatcher,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> QueryResult<Vec<Value>> {
        let _waiting = self.stats.begin_wait();

        let (found_tx, found_rx) = oneshot::channel::<Value>();
        let found_tx = Mutex::new(Some(found_tx));
        let listener = self.feed.listen(Arc::new(move |document: &Value, _kind: ChangeKind| {
            let Some(projected) = matcher.accept(document) else {
                return;
            };
            let sender = found_tx
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            if let Some(sender) = sender {
                let _ = sender.send(projected);
            }
        }));

        let poll = self.poll_until_found(compiled, driver, is_fast);
        let (result, resolved_by) = tokio::select! {
            result = poll => (result, "query"),
            Ok(document) = found_rx => (Ok(vec![document]), "listener"),
            _ = tokio::time::sleep(timeout) => (Ok(Vec::new()), "timer"),
            _ = cancel.cancelled() => (Ok(Vec::new()), "cancel"),
        };
        drop(listener);

        Logger::info(
            "WAIT_FOR_RESOLVED",
            &[("collection", self.name.as_str()), ("resolved_by", resolved_by)],
        );
        result
    }

    /// Executes until the result is non-empty, sleeping between attempts
    async fn poll_until_found(
        &self,
        compiled: &CompiledQuery,
        driver: &dyn DatabaseDriver,
        is_fast: bool,
    ) -> QueryResult<Vec<Value>> {
        loop {
            let documents = self
                .execute(driver, &compiled.text, &compiled.params, is_fast)
                .await?;
            if !documents.is_empty() {
                return Ok(documents);
            }
            tokio::time::sleep(self.config.wait_poll_interval()).await;
        }
    }

    /// Aggregates over documents matching `filter`. Returns one converted
    /// value per requested field.
    pub async fn aggregate(
        &self,
        filter: &Value,
        fields: &[FieldAggregation],
        access: &AccessRights,
    ) -> QueryResult<Vec<Value>> {
        access.ensure_granted()?;
        self.stats.record_query();
        let _active = self.stats.begin_query();

        let mut params = QueryParams::new();
        let (filter_condition, condition) = access_filtered_condition(
            &self.doc_type,
            &mut params,
            filter,
            access,
            &self.account_fields,
        )?;
        let aggregation = AggregationQuery::compile(
            &self.name,
            self.struct_type()?,
            &condition,
            params.into_values(),
            fields,
        )?;
        if condition == "false" {
            return Ok(aggregation.empty_results());
        }

        let class = self.classify(filter, &filter_condition, &[])?;
        let (driver, is_fast) = self.route(&class)?;
        let rows = self
            .execute(driver.as_ref(), &aggregation.text, &aggregation.params, is_fast)
            .await?;
        Ok(aggregation.convert_results(&rows)?)
    }

    /// Opens a live view of documents matching `filter`
    pub fn subscribe(
        &self,
        filter: &Value,
        selection: &[FieldSelection],
        access: &AccessRights,
    ) -> QueryResult<Subscription> {
        access.ensure_granted()?;
        self.doc_type
            .filter_condition(&mut QueryParams::new(), "doc", filter)?;
        let selection = self.struct_type()?.prune_selection(selection);

        let matcher = DocumentMatcher::new(
            self.doc_type.clone(),
            filter.clone(),
            access.clone(),
            self.account_fields.clone(),
            selection,
        );
        self.stats.subscription_opened();
        let stats = self.stats.clone();
        let subscription = Subscription::open(
            &self.feed,
            self.name.clone(),
            self.config.subscription_queue_capacity,
            move |document: &Value, _kind: ChangeKind| matcher.accept(document),
        )
        .on_close(move || stats.subscription_closed());
        Ok(subscription)
    }

    /// Full documents for the given keys, in database order
    pub async fn fetch_by_keys(&self, keys: &[String]) -> QueryResult<Vec<Value>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let (text, params) = keys_query(&self.name, keys);
        self.execute(self.fast.as_ref(), &text, &params, true).await
    }

    /// Reloads the live index catalog. Returns true when it changed, in
    /// which case every memoized verdict is dropped.
    pub async fn refresh_indexes(&self) -> QueryResult<bool> {
        let indexes = match self.fast.list_indexes(&self.name).await {
            Ok(indexes) => indexes,
            Err(err) => {
                let message = err.to_string();
                Logger::error(
                    "INDEX_REFRESH_FAILED",
                    &[("collection", self.name.as_str()), ("error", message.as_str())],
                );
                return Err(err.into());
            }
        };
        let count = indexes.len().to_string();
        let changed = self.cache.update_indexes(indexes);
        if changed {
            Logger::info(
                "INDEXES_CHANGED",
                &[("collection", self.name.as_str()), ("count", count.as_str())],
            );
        }
        Ok(changed)
    }
}
