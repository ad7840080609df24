//! Handles for background reconciliation

use anyhow::anyhow;
use std::future::Future;
use tokio::task::JoinHandle;

use crate::error::CatalogError;

enum Inner<T> {
    Spawned(JoinHandle<Result<T, CatalogError>>),
    Ready(Result<T, CatalogError>),
}

/// The remote outcome of an operation whose local effect already happened.
///
/// Dropping the handle does not cancel reconciliation.
pub struct Pending<T> {
    inner: Inner<T>,
}

impl<T: Send + 'static> Pending<T> {
    pub(crate) fn spawn<F>(job: F) -> Self
    where
        F: Future<Output = Result<T, CatalogError>> + Send + 'static,
    {
        Self {
            inner: Inner::Spawned(tokio::spawn(job)),
        }
    }

    /// Already settled; nothing to reconcile.
    pub fn ready(result: Result<T, CatalogError>) -> Self {
        Self {
            inner: Inner::Ready(result),
        }
    }

    pub fn is_settled(&self) -> bool {
        match &self.inner {
            Inner::Spawned(handle) => handle.is_finished(),
            Inner::Ready(_) => true,
        }
    }

    /// Wait for reconciliation to finish
    pub async fn settled(self) -> Result<T, CatalogError> {
        match self.inner {
            Inner::Ready(result) => result,
            Inner::Spawned(handle) => match handle.await {
                Ok(result) => result,
                Err(join) => Err(CatalogError::Storage(anyhow!(
                    "reconciliation task failed: {}",
                    join
                ))),
            },
        }
    }
}

impl<T> std::fmt::Debug for Pending<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &self.inner {
            Inner::Spawned(handle) if handle.is_finished() => "finished",
            Inner::Spawned(_) => "running",
            Inner::Ready(_) => "ready",
        };
        f.debug_struct("Pending").field("state", &state).finish()
    }
}

/// An operation's optimistic value plus its pending remote outcome.
#[derive(Debug)]
pub struct Optimistic<V, T = V> {
    pub value: V,
    pub outcome: Pending<T>,
}

impl<V, T: Send + 'static> Optimistic<V, T> {
    pub fn settled(value: V, result: Result<T, CatalogError>) -> Self {
        Self {
            value,
            outcome: Pending::ready(result),
        }
    }
}
