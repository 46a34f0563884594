//! Reconciles local entity changes with remote calendar events.
//!
//! [`CalendarObserver`] holds the adapter registry, the mapping store and a
//! lazily authenticated remote client. Each call to [`CalendarObserver::update`]
//! or [`CalendarObserver::delete`] runs one reconciliation to completion:
//!
//! 1. look up the adapter for the entity type and ask whether to act
//! 2. find the existing remote event through the mapping store, if any
//! 3. merge the adapter's [`EventData`](crate::EventData) onto it
//! 4. insert or update (or delete) remotely, then record the mapping
//!
//! Two reconciliations of the same entity running at once can lose an
//! update. Callers that need strict ordering per entity should serialize
//! their calls, e.g. by feeding signals through [`CalendarObserver::listen`].

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, error, info, instrument, warn};

use crate::adapter::{Adapter, Entity};
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::mapping::{EventMapping, MappingKey, MappingStore};
use crate::remote::{Connector, RemoteCalendar, RemoteError, RemotePayload};
use crate::signal::EntityEvent;

/// Maps an instance of a related entity type to the entity whose event it affects.
pub type Selector<E> = Arc<dyn Fn(&E) -> Option<E> + Send + Sync>;

struct RelatedBinding<E> {
    target_type: String,
    selector: Selector<E>,
}

/// What an [`CalendarObserver::update`] call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The adapter declined to save the instance.
    Skipped,
    /// A new remote event was created and its mapping stored.
    Created(EventMapping),
    /// The existing remote event with this id was overwritten.
    Updated(String),
}

pub struct CalendarObserver<E, C: Connector> {
    adapters: HashMap<String, Arc<dyn Adapter<E>>>,
    related: HashMap<String, Vec<RelatedBinding<E>>>,
    store: Arc<dyn MappingStore>,
    connector: C,
    default_feed: Option<String>,
    client: RwLock<Option<Arc<C::Client>>>,
}

impl<E: Entity, C: Connector> CalendarObserver<E, C> {
    pub fn new(connector: C, store: Arc<dyn MappingStore>) -> Self {
        CalendarObserver {
            adapters: HashMap::new(),
            related: HashMap::new(),
            store,
            connector,
            default_feed: None,
            client: RwLock::new(None),
        }
    }

    /// Build an observer backed by the SQLite store and default feed from `config`.
    pub fn from_config(connector: C, config: &SyncConfig) -> SyncResult<Self> {
        let store = Arc::new(config.open_store()?);
        let mut observer = Self::new(connector, store);
        observer.default_feed = config.default_feed.clone();
        Ok(observer)
    }

    pub fn with_default_feed(mut self, feed: impl Into<String>) -> Self {
        self.default_feed = Some(feed.into());
        self
    }

    pub fn store(&self) -> &Arc<dyn MappingStore> {
        &self.store
    }

    /// Mirror instances of `entity_type` into the calendar using `adapter`.
    ///
    /// Registering a second adapter for the same type replaces the first.
    pub fn observe(&mut self, entity_type: impl Into<String>, adapter: impl Adapter<E> + 'static) {
        let entity_type = entity_type.into();
        debug!(%entity_type, adapter = adapter.name(), "observing entity type");
        self.adapters.insert(entity_type, Arc::new(adapter));
    }

    /// Refresh the event of a `target_type` entity whenever a `related_type`
    /// entity changes or is deleted. `selector` finds the target; returning
    /// `None` skips the refresh.
    pub fn observe_related<F>(
        &mut self,
        target_type: impl Into<String>,
        related_type: impl Into<String>,
        selector: F,
    ) where
        F: Fn(&E) -> Option<E> + Send + Sync + 'static,
    {
        self.related
            .entry(related_type.into())
            .or_default()
            .push(RelatedBinding {
                target_type: target_type.into(),
                selector: Arc::new(selector),
            });
    }

    /// Drop the cached remote client; the next reconciliation authenticates again.
    pub async fn reauthenticate(&self) {
        self.client.write().await.take();
    }

    async fn client(&self) -> SyncResult<Arc<C::Client>> {
        if let Some(client) = self.client.read().await.as_ref() {
            return Ok(Arc::clone(client));
        }

        let mut slot = self.client.write().await;
        if let Some(client) = slot.as_ref() {
            return Ok(Arc::clone(client));
        }

        debug!("authenticating remote calendar client");
        let client = Arc::new(
            self.connector
                .connect()
                .await
                .map_err(SyncError::AuthFailed)?,
        );
        *slot = Some(Arc::clone(&client));
        Ok(client)
    }

    async fn forget_client_if_unauthorized(&self, err: &RemoteError) {
        if matches!(err, RemoteError::Unauthorized(_)) {
            warn!("remote rejected credentials, dropping cached client");
            self.reauthenticate().await;
        }
    }

    fn adapter(&self, entity_type: &str) -> SyncResult<Arc<dyn Adapter<E>>> {
        self.adapters
            .get(entity_type)
            .cloned()
            .ok_or_else(|| SyncError::UnknownEntityType(entity_type.to_string()))
    }

    fn mapping_key(
        &self,
        entity_type: &str,
        adapter: &dyn Adapter<E>,
        instance: &E,
    ) -> SyncResult<MappingKey> {
        let feed = adapter
            .feed_id(instance)
            .or_else(|| self.default_feed.clone())
            .ok_or_else(|| SyncError::NoFeedConfigured(entity_type.to_string()))?;

        Ok(MappingKey::new(entity_type, instance.entity_id(), feed))
    }

    /// The remote event currently mapped to `key`, or an empty payload if
    /// there is none or it cannot be read.
    async fn existing_event(
        &self,
        client: &C::Client,
        key: &MappingKey,
    ) -> SyncResult<RemotePayload> {
        let Some(event_id) = self.store.get_event_id(key)? else {
            return Ok(RemotePayload::new());
        };

        let fetched = client.get_event(&key.feed_id, &event_id).await;

        match fetched {
            Ok(payload) if payload.is_cancelled() => {
                debug!(%key, %event_id, "mapped event was cancelled remotely");
                Ok(RemotePayload::new())
            }
            Ok(payload) => Ok(payload),
            Err(source) => {
                let not_found = source.is_not_found();
                let err = SyncError::RemoteReadFailed { event_id, source };
                if not_found {
                    debug!(%key, "mapped event no longer exists remotely");
                } else {
                    warn!(%key, error = %err, "treating remote event as absent");
                }
                Ok(RemotePayload::new())
            }
        }
    }

    /// Create or update the remote event for `instance`.
    #[instrument(skip(self, instance), fields(entity_id = %instance.entity_id()))]
    pub async fn update(&self, entity_type: &str, instance: &E) -> SyncResult<UpdateOutcome> {
        let adapter = self.adapter(entity_type)?;

        if !adapter.can_save(instance) {
            debug!("adapter declined to save");
            return Ok(UpdateOutcome::Skipped);
        }

        let key = self.mapping_key(entity_type, adapter.as_ref(), instance)?;
        let client = self.client().await?;

        let existing = self.existing_event(client.as_ref(), &key).await?;
        let existing_id = existing.id().map(str::to_string);

        let mut payload = adapter.event_data(instance)?.populate(existing)?;
        let notify = adapter.can_notify(instance);

        match existing_id {
            Some(event_id) => {
                payload.set("id", json!(event_id));

                if let Err(e) = client
                    .update_event(&key.feed_id, &event_id, &payload, notify)
                    .await
                {
                    self.forget_client_if_unauthorized(&e).await;
                    return Err(SyncError::RemoteWriteFailed(e));
                }

                info!(%key, %event_id, "updated remote event");
                Ok(UpdateOutcome::Updated(event_id))
            }
            None => {
                // The service assigns ids for new events
                payload.remove("id");

                let created = match client.insert_event(&key.feed_id, &payload, notify).await {
                    Ok(created) => created,
                    Err(e) => {
                        self.forget_client_if_unauthorized(&e).await;
                        return Err(SyncError::RemoteWriteFailed(e));
                    }
                };

                let event_id = created.id().ok_or_else(|| {
                    SyncError::RemoteWriteFailed(RemoteError::Decode(
                        "created event has no id".into(),
                    ))
                })?;

                let mapping = self.store.set_event_id(&key, event_id)?;
                info!(%key, %event_id, "created remote event");
                Ok(UpdateOutcome::Created(mapping))
            }
        }
    }

    /// Delete the remote event for `instance` and forget its mapping.
    ///
    /// The mapping is removed even when the remote delete fails; that
    /// failure is returned afterwards as [`SyncError::RemoteDeleteFailed`].
    #[instrument(skip(self, instance), fields(entity_id = %instance.entity_id()))]
    pub async fn delete(&self, entity_type: &str, instance: &E) -> SyncResult<()> {
        let adapter = self.adapter(entity_type)?;
        let key = self.mapping_key(entity_type, adapter.as_ref(), instance)?;

        let mut remote_failure = None;

        if adapter.can_delete(instance) {
            if let Some(event_id) = self.store.get_event_id(&key)? {
                let client = self.client().await?;
                let notify = adapter.can_notify(instance);
                let deleted = client.delete_event(&key.feed_id, &event_id, notify).await;

                match deleted {
                    Ok(()) => info!(%key, %event_id, "deleted remote event"),
                    Err(e) if e.is_not_found() => {
                        debug!(%key, %event_id, "remote event already gone")
                    }
                    Err(source) => {
                        self.forget_client_if_unauthorized(&source).await;
                        let err = SyncError::RemoteDeleteFailed { event_id, source };
                        warn!(%key, error = %err, "removing mapping anyway");
                        remote_failure = Some(err);
                    }
                }
            }
        } else {
            debug!("adapter declined to delete remote event");
        }

        let removed = self.store.delete_event_id(&key)?;
        debug!(%key, removed, "removed event mapping");

        match remote_failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn propagate(&self, binding: &RelatedBinding<E>, related: &E) -> SyncResult<()> {
        match (binding.selector)(related) {
            Some(target) => self
                .update(&binding.target_type, &target)
                .await
                .map(|_| ()),
            None => {
                debug!(
                    target_type = %binding.target_type,
                    related_id = %related.entity_id(),
                    "selector found no target, skipping"
                );
                Ok(())
            }
        }
    }

    /// Handle one host signal: reconcile the entity itself if its type is
    /// observed, then refresh every entity related to it.
    ///
    /// All handlers run even if one fails; the first error is returned.
    pub async fn dispatch(&self, event: &EntityEvent<E>) -> SyncResult<()> {
        let entity_type = event.entity_type();
        let instance = event.instance();
        let bindings = self.related.get(entity_type);

        if !self.adapters.contains_key(entity_type) && bindings.is_none() {
            return Err(SyncError::UnknownEntityType(entity_type.to_string()));
        }

        let mut first_error = None;

        if self.adapters.contains_key(entity_type) {
            let result = match event {
                EntityEvent::Changed { .. } => self.update(entity_type, instance).await.map(|_| ()),
                EntityEvent::Deleted { .. } => self.delete(entity_type, instance).await,
            };
            if let Err(e) = result {
                first_error = Some(e);
            }
        }

        for binding in bindings.into_iter().flatten() {
            if let Err(e) = self.propagate(binding, instance).await {
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Dispatch signals from `events` one at a time until every sender is dropped.
    ///
    /// Failures are logged and do not stop the loop.
    pub async fn listen(&self, mut events: mpsc::Receiver<EntityEvent<E>>) {
        while let Some(event) = events.recv().await {
            if let Err(e) = self.dispatch(&event).await {
                error!(
                    entity_type = event.entity_type(),
                    entity_id = %event.instance().entity_id(),
                    error = %e,
                    "calendar reconciliation failed"
                );
            }
        }

        debug!("entity event source closed");
    }
}
