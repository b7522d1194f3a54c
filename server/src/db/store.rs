//! [`LocalStore`] backed by the SQLite order cache.

use std::collections::HashMap;

use async_trait::async_trait;
use orderflux_engine::{
    Error, ListDescriptor, LocalId, LocalOrRemoteId, LocalStore, OrderRecord, OwnerId, RemoteId,
};

use super::{orders, Pool};

fn store_error(err: sqlx::Error) -> Error {
    tracing::error!("order store query failed: {:?}", err);
    Error::Store(err.to_string())
}

/// Serves the sync engine from the `orders` table.
#[derive(Debug, Clone)]
pub struct SqliteOrderStore {
    pool: Pool,
}

impl SqliteOrderStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }
}

#[async_trait]
impl LocalStore for SqliteOrderStore {
    async fn orders_by_remote_ids(
        &self,
        remote_ids: &[RemoteId],
        owner: OwnerId,
    ) -> orderflux_engine::error::Result<HashMap<RemoteId, OrderRecord>> {
        if remote_ids.is_empty() {
            return Ok(HashMap::new());
        }
        orders::orders_by_remote_ids(&self.pool, remote_ids, owner)
            .await
            .map_err(store_error)
    }

    async fn overwrite_upsert(&self, order: &OrderRecord) -> orderflux_engine::error::Result<u64> {
        orders::overwrite_upsert(&self.pool, order)
            .await
            .map_err(store_error)
    }

    async fn orders_by_local_or_remote_ids(
        &self,
        ids: &[LocalOrRemoteId],
        owner: OwnerId,
    ) -> orderflux_engine::error::Result<Vec<OrderRecord>> {
        orders::orders_by_local_or_remote_ids(&self.pool, ids, owner)
            .await
            .map_err(store_error)
    }

    async fn local_ids_for_descriptor(
        &self,
        descriptor: &ListDescriptor,
    ) -> orderflux_engine::error::Result<Vec<LocalId>> {
        orders::local_ids_for_descriptor(&self.pool, descriptor)
            .await
            .map_err(store_error)
    }
}
