//! Mutation coordinator - await the remote call, then commit locally.
//!
//! Every write follows the same sequence: run the remote operation, and only if
//! it succeeds apply the returned data to the [`SharedStore`]. A failed call
//! leaves the store exactly as it was and hands the error back to the caller.
//!
//! The store's write lock is taken only after the remote call resolves, so two
//! calls racing on the same entity commit in resolution order (last write wins).
//! Dropping a coordinator future before it resolves leaves the store untouched.

use crate::{
    core::{
        source::DataSource,
        store::{Record, SharedStore},
    },
    errors::{Error, Result},
};
use std::future::Future;
use tracing::{debug, info, instrument, warn};

/// Awaits `call` and, on success, adds its result to `store`.
///
/// Use this for resource-specific operations (assign teacher, record payment)
/// whose remote call returns the authoritative entity.
pub async fn commit<T, F>(store: &SharedStore<T>, call: F) -> Result<T>
where
    T: Record,
    F: Future<Output = Result<T>>,
{
    let entity = call
        .await
        .inspect_err(|e| warn!(resource = T::RESOURCE, error = %e, "remote call failed; store unchanged"))?;
    store.write().await.add(entity.clone());
    debug!(resource = T::RESOURCE, id = %entity.id(), "committed remote result");
    Ok(entity)
}

/// Awaits a bulk `call` and, on success, adds every returned entity to `store`.
pub async fn commit_batch<T, F>(store: &SharedStore<T>, call: F) -> Result<Vec<T>>
where
    T: Record,
    F: Future<Output = Result<Vec<T>>>,
{
    let entities = call.await.inspect_err(
        |e| warn!(resource = T::RESOURCE, error = %e, "bulk remote call failed; store unchanged"),
    )?;
    let mut guard = store.write().await;
    for entity in &entities {
        guard.add(entity.clone());
    }
    info!(
        resource = T::RESOURCE,
        count = entities.len(),
        "committed bulk remote result"
    );
    Ok(entities)
}

/// Awaits a `call` returning two related entities and commits each to its store.
pub async fn commit_pair<A, B, F>(
    first: &SharedStore<A>,
    second: &SharedStore<B>,
    call: F,
) -> Result<(A, B)>
where
    A: Record,
    B: Record,
    F: Future<Output = Result<(A, B)>>,
{
    let (a, b) = call.await.inspect_err(|e| {
        warn!(
            resource = A::RESOURCE,
            related = B::RESOURCE,
            error = %e,
            "remote call failed; stores unchanged"
        );
    })?;
    first.write().await.add(a.clone());
    second.write().await.add(b.clone());
    Ok((a, b))
}

/// Sequences CRUD calls against a data source with commits to a store.
#[derive(Debug, Clone)]
pub struct MutationCoordinator<S> {
    source: S,
}

impl<S> MutationCoordinator<S> {
    /// Wraps a data source.
    #[must_use]
    pub const fn new(source: S) -> Self {
        Self { source }
    }

    /// The wrapped data source, for resource-specific calls used with [`commit`].
    #[must_use]
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Fetches everything matching `filter` and replaces the store contents.
    /// Returns the number of entities loaded.
    #[instrument(skip_all, fields(resource = T::RESOURCE))]
    pub async fn load<T>(&self, store: &SharedStore<T>, filter: &T::Filter) -> Result<usize>
    where
        T: Record,
        S: DataSource<T>,
    {
        let entities = self
            .source
            .get_all(filter)
            .await
            .inspect_err(|e| warn!(error = %e, "load failed; store unchanged"))?;
        let count = entities.len();
        store.write().await.set_all(entities);
        info!(count, "store loaded");
        Ok(count)
    }

    /// Re-fetches one entity. A hit replaces the local copy; a miss removes it.
    #[instrument(skip_all, fields(resource = T::RESOURCE, id = %id))]
    pub async fn refresh<T>(&self, store: &SharedStore<T>, id: &T::Id) -> Result<Option<T>>
    where
        T: Record,
        S: DataSource<T>,
    {
        let fetched = self
            .source
            .get_by_id(id)
            .await
            .inspect_err(|e| warn!(error = %e, "refresh failed; store unchanged"))?;
        let mut guard = store.write().await;
        match &fetched {
            Some(entity) => {
                guard.add(entity.clone());
            }
            None => {
                guard.remove(id);
            }
        }
        Ok(fetched)
    }

    /// Validates `draft`, creates it remotely and adds the returned entity.
    #[instrument(skip_all, fields(resource = T::RESOURCE))]
    pub async fn create<T>(&self, store: &SharedStore<T>, draft: T::Draft) -> Result<T>
    where
        T: Record,
        S: DataSource<T>,
    {
        T::validate_draft(&draft)?;
        commit(store, self.source.create(draft)).await
    }

    /// Validates `patch`, applies it remotely and stores the returned entity.
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] when the remote side has no such entity.
    #[instrument(skip_all, fields(resource = T::RESOURCE, id = %id))]
    pub async fn update<T>(&self, store: &SharedStore<T>, id: &T::Id, patch: T::Patch) -> Result<T>
    where
        T: Record,
        S: DataSource<T>,
    {
        T::validate_patch(&patch)?;
        let call = async {
            self.source
                .update(id, patch)
                .await?
                .ok_or_else(|| Error::not_found(T::RESOURCE, id))
        };
        commit(store, call).await
    }

    /// Deletes remotely, then removes the local copy. Deleting twice is not an error.
    #[instrument(skip_all, fields(resource = T::RESOURCE, id = %id))]
    pub async fn delete<T>(&self, store: &SharedStore<T>, id: &T::Id) -> Result<()>
    where
        T: Record,
        S: DataSource<T>,
    {
        self.source
            .delete(id)
            .await
            .inspect_err(|e| warn!(error = %e, "delete failed; store unchanged"))?;
        store.write().await.remove(id);
        debug!("entity removed");
        Ok(())
    }
}
