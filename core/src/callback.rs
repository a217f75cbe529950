//! Completion-callback call style.
//!
//! Every operation is an `async fn`. The `*_with_callback` variants are the
//! second, explicit call shape: they spawn the operation onto the current
//! tokio runtime, hand the outcome to the callback and return nothing. They
//! must be called from within a runtime.

use std::future::Future;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::params::Params;
use crate::resource::RestResource;

/// Run `future` on the current runtime and hand its outcome to `callback`.
///
/// # Panics
///
/// Panics when called outside a tokio runtime.
pub fn spawn_with_callback<T, Fut, F>(future: Fut, callback: F)
where
    T: Send + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    F: FnOnce(Result<T, ApiError>) + Send + 'static,
{
    tokio::spawn(async move { callback(future.await) });
}

/// Callback variants of the five verbs, for any cloneable resource client.
pub trait RestResourceExt: RestResource + Clone + 'static {
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    fn create_with_callback<D, T, F>(&self, params: Params, data: D, callback: F)
    where
        D: Serialize + Send + Sync + 'static,
        T: DeserializeOwned + Send + 'static,
        F: FnOnce(Result<T, ApiError>) + Send + 'static,
    {
        let client = self.clone();
        spawn_with_callback(async move { client.create(&params, &data).await }, callback);
    }

    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    fn get_all_with_callback<T, F>(&self, params: Params, callback: F)
    where
        T: DeserializeOwned + Send + 'static,
        F: FnOnce(Result<Vec<T>, ApiError>) + Send + 'static,
    {
        let client = self.clone();
        spawn_with_callback(async move { client.get_all(&params).await }, callback);
    }

    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    fn get_with_callback<T, F>(&self, params: Params, callback: F)
    where
        T: DeserializeOwned + Send + 'static,
        F: FnOnce(Result<T, ApiError>) + Send + 'static,
    {
        let client = self.clone();
        spawn_with_callback(async move { client.get(&params).await }, callback);
    }

    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    fn update_with_callback<D, T, F>(&self, params: Params, data: D, callback: F)
    where
        D: Serialize + Send + Sync + 'static,
        T: DeserializeOwned + Send + 'static,
        F: FnOnce(Result<T, ApiError>) + Send + 'static,
    {
        let client = self.clone();
        spawn_with_callback(async move { client.update(&params, &data).await }, callback);
    }

    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    fn delete_with_callback<F>(&self, params: Params, body: Option<Value>, callback: F)
    where
        F: FnOnce(Result<(), ApiError>) + Send + 'static,
    {
        let client = self.clone();
        spawn_with_callback(
            async move { client.delete(&params, body.as_ref()).await },
            callback,
        );
    }
}

impl<R: RestResource + Clone + 'static> RestResourceExt for R {}
