// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Adapter to use Service implementations as near cache remote backends.

use std::marker::PhantomData;

use layered::Service;
use nearcache_tier::{Error, FilterSnapshot, RemoteCache, Version, VersionedValue};

use crate::{
    GetRequest, PutRequest, RemoteOperation, RemoteResponse, RemoveRequest, VersionedPutRequest, VersionedRemoveRequest,
};

/// Adapter that converts a `Service<RemoteOperation>` into a `RemoteCache`.
///
/// The service can be composed with middleware before being wrapped. A response whose
/// variant does not match the request is reported as an [`Error`].
///
/// # Examples
///
/// ```ignore
/// let remote = ServiceRemote::new(hotrod_service);
/// let near = NearRemoteCache::new(remote, config, "orders")?;
/// ```
#[derive(Debug, Clone)]
pub struct ServiceRemote<K, V, S> {
    service: S,
    _phantom: PhantomData<fn(K, V)>,
}

impl<K, V, S> ServiceRemote<K, V, S> {
    /// Creates a new `ServiceRemote` wrapping the given service.
    #[must_use]
    pub fn new(service: S) -> Self {
        Self {
            service,
            _phantom: PhantomData,
        }
    }

    /// Consumes the adapter and returns the inner service.
    #[must_use]
    pub fn into_inner(self) -> S {
        self.service
    }

    /// Returns a reference to the inner service.
    #[must_use]
    pub fn inner(&self) -> &S {
        &self.service
    }
}

fn unexpected<V>(operation: &'static str, response: &RemoteResponse<V>) -> Error {
    let variant = match response {
        RemoteResponse::Get(_) => "get",
        RemoteResponse::Put => "put",
        RemoteResponse::Applied(_) => "applied",
        RemoteResponse::Clear => "clear",
        RemoteResponse::FilterUpdated => "filter_updated",
    };
    Error::from_message(format!("unexpected {variant} response for {operation}"))
}

impl<K, V, S> ServiceRemote<K, V, S>
where
    K: Send,
    V: Send,
    S: Service<RemoteOperation<K, V>, Out = Result<RemoteResponse<V>, Error>> + Send + Sync,
{
    async fn applied(&self, request: RemoteOperation<K, V>) -> Result<bool, Error> {
        let operation = request.name();
        match self.service.execute(request).await? {
            RemoteResponse::Applied(applied) => Ok(applied),
            other => Err(unexpected(operation, &other)),
        }
    }
}

impl<K, V, S> RemoteCache<K, V> for ServiceRemote<K, V, S>
where
    K: Clone + Send + Sync,
    V: Send + Sync,
    S: Service<RemoteOperation<K, V>, Out = Result<RemoteResponse<V>, Error>> + Send + Sync,
{
    async fn get(&self, key: &K) -> Result<Option<VersionedValue<V>>, Error> {
        let request = RemoteOperation::Get(GetRequest::new(key.clone()));
        match self.service.execute(request).await? {
            RemoteResponse::Get(value) => Ok(value),
            other => Err(unexpected("remote.get", &other)),
        }
    }

    async fn put(&self, key: K, value: V) -> Result<(), Error> {
        let request = RemoteOperation::Put(PutRequest::new(key, value));
        match self.service.execute(request).await? {
            RemoteResponse::Put => Ok(()),
            other => Err(unexpected("remote.put", &other)),
        }
    }

    async fn put_if_absent(&self, key: K, value: V) -> Result<bool, Error> {
        self.applied(RemoteOperation::PutIfAbsent(PutRequest::new(key, value))).await
    }

    async fn replace(&self, key: K, value: V) -> Result<bool, Error> {
        self.applied(RemoteOperation::Replace(PutRequest::new(key, value))).await
    }

    async fn replace_with_version(&self, key: K, value: V, expected: Version) -> Result<bool, Error> {
        self.applied(RemoteOperation::ReplaceWithVersion(VersionedPutRequest::new(key, value, expected)))
            .await
    }

    async fn remove(&self, key: &K) -> Result<bool, Error> {
        self.applied(RemoteOperation::Remove(RemoveRequest::new(key.clone()))).await
    }

    async fn remove_with_version(&self, key: &K, expected: Version) -> Result<bool, Error> {
        self.applied(RemoteOperation::RemoveWithVersion(VersionedRemoveRequest::new(key.clone(), expected)))
            .await
    }

    async fn clear(&self) -> Result<(), Error> {
        match self.service.execute(RemoteOperation::Clear).await? {
            RemoteResponse::Clear => Ok(()),
            other => Err(unexpected("remote.clear", &other)),
        }
    }

    async fn update_membership_filter(&self, snapshot: FilterSnapshot) -> Result<(), Error> {
        match self.service.execute(RemoteOperation::UpdateMembershipFilter(snapshot)).await? {
            RemoteResponse::FilterUpdated => Ok(()),
            other => Err(unexpected("remote.update_membership_filter", &other)),
        }
    }
}
