//! Data source contract and the in-memory mock provider.
//!
//! A [`DataSource`] is the remote side of every resource: the database-backed
//! APIs in [`crate::api`] implement it for production use and [`MemorySource`]
//! implements it for tests and demos, with failure and latency injection.

use crate::{
    core::store::Record,
    errors::{Error, Result},
};
use async_trait::async_trait;
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};
use tracing::{debug, trace};

/// Remote CRUD capability for one resource type.
#[async_trait]
pub trait DataSource<T: Record>: Send + Sync {
    /// Fetches every entity matching `filter`.
    async fn get_all(&self, filter: &T::Filter) -> Result<Vec<T>>;

    /// Fetches one entity, `None` when it does not exist.
    async fn get_by_id(&self, id: &T::Id) -> Result<Option<T>>;

    /// Creates an entity and returns the stored version.
    async fn create(&self, draft: T::Draft) -> Result<T>;

    /// Applies `patch`; returns `None` when the entity does not exist.
    async fn update(&self, id: &T::Id, patch: T::Patch) -> Result<Option<T>>;

    /// Deletes an entity. Deleting a missing entity is not an error.
    async fn delete(&self, id: &T::Id) -> Result<()>;
}

#[async_trait]
impl<T: Record, S: DataSource<T> + ?Sized> DataSource<T> for Arc<S> {
    async fn get_all(&self, filter: &T::Filter) -> Result<Vec<T>> {
        (**self).get_all(filter).await
    }

    async fn get_by_id(&self, id: &T::Id) -> Result<Option<T>> {
        (**self).get_by_id(id).await
    }

    async fn create(&self, draft: T::Draft) -> Result<T> {
        (**self).create(draft).await
    }

    async fn update(&self, id: &T::Id, patch: T::Patch) -> Result<Option<T>> {
        (**self).update(id, patch).await
    }

    async fn delete(&self, id: &T::Id) -> Result<()> {
        (**self).delete(id).await
    }
}

/// Builds a stored entity from a create payload and a server-assigned id.
pub trait Materialize: Record<Id = i64> {
    /// Creates the entity the server would return for `draft`.
    fn materialize(id: i64, draft: Self::Draft) -> Self;
}

#[derive(Debug)]
struct MemoryState<T> {
    rows: Vec<T>,
    next_id: i64,
    failures: VecDeque<String>,
    latencies: VecDeque<Duration>,
    calls: usize,
}

/// In-memory mock provider.
///
/// Each call first waits for the next queued latency (if any), then fails with
/// the next queued failure (if any), otherwise serves the request from memory.
#[derive(Debug)]
pub struct MemorySource<T> {
    state: Mutex<MemoryState<T>>,
}

impl<T: Materialize> Default for MemorySource<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Materialize> MemorySource<T> {
    /// Creates an empty provider; ids start at 1.
    #[must_use]
    pub fn new() -> Self {
        Self::with_rows(Vec::new())
    }

    /// Creates a provider pre-loaded with `rows`.
    #[must_use]
    pub fn with_rows(rows: Vec<T>) -> Self {
        let next_id = rows.iter().map(|row| row.id()).max().unwrap_or(0) + 1;
        Self {
            state: Mutex::new(MemoryState {
                rows,
                next_id,
                failures: VecDeque::new(),
                latencies: VecDeque::new(),
                calls: 0,
            }),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState<T>>> {
        self.state.lock().map_err(|_| Error::Remote {
            message: "mock provider lock poisoned".to_string(),
        })
    }

    /// Makes the next call fail with [`Error::Remote`].
    pub fn fail_next(&self, message: impl Into<String>) -> Result<()> {
        self.lock()?.failures.push_back(message.into());
        Ok(())
    }

    /// Delays the next call by `latency` before it touches any data.
    pub fn delay_next(&self, latency: Duration) -> Result<()> {
        self.lock()?.latencies.push_back(latency);
        Ok(())
    }

    /// Number of calls received so far, including failed ones.
    pub fn calls(&self) -> Result<usize> {
        Ok(self.lock()?.calls)
    }

    /// Copy of the rows the provider currently holds.
    pub fn rows(&self) -> Result<Vec<T>> {
        Ok(self.lock()?.rows.clone())
    }

    /// Waits out any queued latency, then either fails or runs `op` on the state.
    async fn serve<R>(&self, op: impl FnOnce(&mut MemoryState<T>) -> R + Send) -> Result<R> {
        let latency = {
            let mut state = self.lock()?;
            state.calls += 1;
            state.latencies.pop_front()
        };
        if let Some(latency) = latency {
            trace!(?latency, resource = T::RESOURCE, "mock provider delaying call");
            tokio::time::sleep(latency).await;
        }
        let mut state = self.lock()?;
        if let Some(message) = state.failures.pop_front() {
            debug!(resource = T::RESOURCE, %message, "mock provider failing call");
            return Err(Error::Remote { message });
        }
        Ok(op(&mut state))
    }
}

#[async_trait]
impl<T: Materialize> DataSource<T> for MemorySource<T> {
    async fn get_all(&self, filter: &T::Filter) -> Result<Vec<T>> {
        self.serve(|state| {
            state
                .rows
                .iter()
                .filter(|row| row.matches(filter))
                .cloned()
                .collect()
        })
        .await
    }

    async fn get_by_id(&self, id: &T::Id) -> Result<Option<T>> {
        let id = *id;
        self.serve(move |state| state.rows.iter().find(|row| row.id() == id).cloned())
            .await
    }

    async fn create(&self, draft: T::Draft) -> Result<T> {
        T::validate_draft(&draft)?;
        self.serve(move |state| {
            let row = T::materialize(state.next_id, draft);
            state.next_id += 1;
            state.rows.push(row.clone());
            row
        })
        .await
    }

    async fn update(&self, id: &T::Id, patch: T::Patch) -> Result<Option<T>> {
        T::validate_patch(&patch)?;
        let id = *id;
        self.serve(move |state| -> Result<Option<T>> {
            let Some(row) = state.rows.iter_mut().find(|row| row.id() == id) else {
                return Ok(None);
            };
            let mut merged = row.clone();
            merged.apply_patch(&patch);
            merged.validate_state()?;
            *row = merged.clone();
            Ok(Some(merged))
        })
        .await?
    }

    async fn delete(&self, id: &T::Id) -> Result<()> {
        let id = *id;
        self.serve(move |state| state.rows.retain(|row| row.id() != id))
            .await
    }
}
