//! # Data Cache
//!
//! The client-side copy of every collection, its per-collection loading
//! flags and the session's display name.
//!
//! Collections are always replaced whole. A failed fetch logs and leaves the
//! previous copy visible. Fetches take a [`CancelToken`]; a cancelled fetch
//! never touches the snapshot.

use crate::client::{ClientError, RecordClient, SessionUser};
use casefile_core::{
    BoardGraph, CasefileError, DashboardAggregates, EdgeAnchoring, Record, RecordId, RecordKind,
    Snapshot, board::SaveRequest, build_graph, suggestions, system,
};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::future::Future;
use tokio::sync::watch;

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The server refused an update based on a stale version.
    #[error("{kind}/{id} was changed by someone else: {message}")]
    Conflict {
        kind: RecordKind,
        id: RecordId,
        message: String,
    },

    #[error("request cancelled")]
    Cancelled,

    #[error(transparent)]
    Invalid(#[from] CasefileError),
}

// =============================================================================
// CANCELLATION
// =============================================================================

/// Owner side of a cancellation pair.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Cancel every fetch holding a token from this handle.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Passed to fetches; resolves once its handle cancels.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// A linked handle and token.
    pub fn pair() -> (CancelHandle, CancelToken) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle { tx }, CancelToken { rx })
    }

    /// A token nobody can cancel.
    pub fn never() -> Self {
        Self::pair().1
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    async fn cancelled(&mut self) {
        // A dropped handle can no longer cancel.
        if self.rx.wait_for(|c| *c).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Race `fut` against `token`.
async fn guarded<T>(
    token: &CancelToken,
    fut: impl Future<Output = Result<T, ClientError>>,
) -> Result<T, CacheError> {
    let mut token = token.clone();
    if token.is_cancelled() {
        return Err(CacheError::Cancelled);
    }
    tokio::select! {
        biased;
        () = token.cancelled() => Err(CacheError::Cancelled),
        result = fut => result.map_err(CacheError::from),
    }
}

// =============================================================================
// LOADING FLAGS
// =============================================================================

/// Which collections have a fetch in flight.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadingFlags {
    loading: BTreeSet<RecordKind>,
}

impl LoadingFlags {
    pub fn is_loading(&self, kind: RecordKind) -> bool {
        self.loading.contains(&kind)
    }

    pub fn any(&self) -> bool {
        !self.loading.is_empty()
    }

    fn set(&mut self, kind: RecordKind) {
        self.loading.insert(kind);
    }

    fn clear(&mut self, kind: RecordKind) {
        self.loading.remove(&kind);
    }

    fn set_all(&mut self) {
        self.loading.extend(RecordKind::ALL);
    }

    fn clear_all(&mut self) {
        self.loading.clear();
    }
}

// =============================================================================
// DATA CACHE
// =============================================================================

/// Cached collections over a [`RecordClient`].
#[derive(Debug)]
pub struct DataCache {
    client: RecordClient,
    snapshot: Snapshot,
    loading: LoadingFlags,
    user: Option<SessionUser>,
}

impl DataCache {
    pub fn new(client: RecordClient) -> Self {
        Self {
            client,
            snapshot: Snapshot::new(),
            loading: LoadingFlags::default(),
            user: None,
        }
    }

    /// Log in and remember the principal for `createdBy` stamps.
    pub async fn login(
        &mut self,
        email: &str,
        password: &str,
    ) -> Result<&SessionUser, CacheError> {
        let user = self.client.login(email, password).await?;
        tracing::info!(user = %user.email, "Logged in");
        Ok(self.user.insert(user))
    }

    pub fn user(&self) -> Option<&SessionUser> {
        self.user.as_ref()
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn loading(&self) -> &LoadingFlags {
        &self.loading
    }

    // --- fetching -----------------------------------------------------------

    /// Replace one collection with the server's copy.
    ///
    /// On failure the previous copy stays and the error is logged and returned.
    pub async fn fetch_collection(
        &mut self,
        kind: RecordKind,
        token: &CancelToken,
    ) -> Result<(), CacheError> {
        self.loading.set(kind);
        let result = guarded(token, self.client.list(kind)).await;
        self.loading.clear(kind);

        match result {
            Ok(records) => {
                tracing::debug!(collection = %kind, count = records.len(), "Collection loaded");
                self.snapshot.replace(kind, records);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(collection = %kind, error = %e, "Fetch failed, keeping previous copy");
                Err(e)
            }
        }
    }

    /// Fetch all nine collections concurrently.
    ///
    /// All-or-nothing: if any request fails, no collection is replaced.
    pub async fn fetch_all(&mut self, token: &CancelToken) -> Result<(), CacheError> {
        use RecordKind::{
            Company, CorporateAffiliation, FinancialTransaction, Occurrence, Person, Phone,
            Property, SocialProfile, Vehicle,
        };

        self.loading.set_all();
        let c = &self.client;
        let result = guarded(token, async {
            let (
                persons,
                companies,
                properties,
                vehicles,
                phones,
                social,
                financial,
                affiliations,
                occurrences,
            ) = tokio::try_join!(
                c.list(Person),
                c.list(Company),
                c.list(Property),
                c.list(Vehicle),
                c.list(Phone),
                c.list(SocialProfile),
                c.list(FinancialTransaction),
                c.list(CorporateAffiliation),
                c.list(Occurrence),
            )?;
            Ok([
                (Person, persons),
                (Company, companies),
                (Property, properties),
                (Vehicle, vehicles),
                (Phone, phones),
                (SocialProfile, social),
                (FinancialTransaction, financial),
                (CorporateAffiliation, affiliations),
                (Occurrence, occurrences),
            ])
        })
        .await;
        self.loading.clear_all();

        match result {
            Ok(collections) => {
                for (kind, records) in collections {
                    self.snapshot.replace(kind, records);
                }
                tracing::info!("All collections loaded");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Bulk fetch failed, no collection replaced");
                Err(e)
            }
        }
    }

    // --- writes -------------------------------------------------------------

    /// Update a record from a patch, based on the cached version.
    ///
    /// The patch is merged into the cached record whatever the server says.
    /// A stale version comes back as [`CacheError::Conflict`].
    pub async fn mutate_record(
        &mut self,
        kind: RecordKind,
        id: RecordId,
        patch: Map<String, Value>,
    ) -> Result<(), CacheError> {
        let version = self.snapshot.find(kind, id).map(|r| r.meta().version);
        self.write_update(kind, id, patch, version).await
    }

    /// Route a saved board edit to its collection's update.
    pub async fn save(&mut self, request: SaveRequest) -> Result<(), CacheError> {
        tracing::debug!(path = %request.path(), version = request.version, "Saving board edit");
        self.write_update(request.kind, request.id, request.patch, Some(request.version))
            .await
    }

    async fn write_update(
        &mut self,
        kind: RecordKind,
        id: RecordId,
        patch: Map<String, Value>,
        version: Option<u64>,
    ) -> Result<(), CacheError> {
        let result = self.client.update(kind, id, &patch, version).await;

        if let Some(cached) = self.snapshot.find_mut(kind, id) {
            match &result {
                Ok(updated) => *cached = updated.clone(),
                Err(_) => {
                    if let Err(e) = cached.apply_patch(&patch) {
                        tracing::warn!(collection = %kind, id = %id, error = %e, "Local merge failed");
                    }
                }
            }
        }

        match result {
            Ok(_) => Ok(()),
            Err(ClientError::Conflict(message)) => {
                tracing::warn!(collection = %kind, id = %id, "Update conflict");
                Err(CacheError::Conflict { kind, id, message })
            }
            Err(e) => {
                tracing::warn!(collection = %kind, id = %id, error = %e, "Update failed");
                Err(e.into())
            }
        }
    }

    /// Create a record stamped with the session's display name, then re-pull
    /// its collection.
    pub async fn create_record(
        &mut self,
        kind: RecordKind,
        data: Value,
    ) -> Result<RecordId, CacheError> {
        let Value::Object(mut body) = data else {
            return Err(
                CasefileError::InvalidRecord("record must be a JSON object".to_string()).into(),
            );
        };
        if let Some(user) = &self.user {
            body.insert("createdBy".to_string(), Value::String(user.name.clone()));
        }

        let id = self
            .client
            .create(kind, &Value::Object(body))
            .await
            .inspect_err(|e| tracing::warn!(collection = %kind, error = %e, "Create failed"))?;

        // A failed re-pull is logged there; the create itself stands.
        let _ = self.fetch_collection(kind, &CancelToken::never()).await;
        Ok(id)
    }

    /// Delete a record; the cached copy goes whatever the server says.
    pub async fn delete_record(
        &mut self,
        kind: RecordKind,
        id: RecordId,
    ) -> Result<(), CacheError> {
        let result = self.client.delete(kind, id).await;
        self.snapshot.remove(kind, id);
        result.map_err(|e| {
            tracing::warn!(collection = %kind, id = %id, error = %e, "Delete failed");
            e.into()
        })
    }

    // --- derived views ------------------------------------------------------

    /// Aggregates over the current snapshot. Recomputed on every call.
    pub fn dashboard(&self) -> DashboardAggregates {
        system::compute(&self.snapshot)
    }

    pub fn board(&self, search: &str, anchoring: EdgeAnchoring) -> BoardGraph {
        build_graph(search, &self.snapshot, anchoring)
    }

    pub fn suggestions(&self, typed: &str) -> Vec<String> {
        suggestions(typed, &self.snapshot)
    }

    pub fn record(&self, kind: RecordKind, id: RecordId) -> Option<&Record> {
        self.snapshot.find(kind, id)
    }
}
