//! Database operations for the orders table.

use std::collections::HashMap;

use orderflux_engine::{
    ListDescriptor, ListOrder, ListOrderBy, LocalId, LocalOrRemoteId, OrderRecord, OrderStatus,
    OwnerId, RemoteId,
};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

/// Upper bound on ids bound into a single `IN (...)` clause.
const MAX_BOUND_IDS: usize = 500;

const SELECT_ORDERS: &str = "SELECT local_id, remote_id, owner_id, last_modified, status, \
     date_created, payload, is_locally_changed, synced_at FROM orders";

/// A stored order row from the database.
#[derive(Debug)]
pub struct StoredOrder {
    pub local_id: i64,
    pub remote_id: Option<i64>,
    pub owner_id: i64,
    pub last_modified: String,
    pub status: String,
    pub date_created: String,
    pub payload: String,
    pub is_locally_changed: bool,
    pub synced_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl<'r> sqlx::FromRow<'r, SqliteRow> for StoredOrder {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(StoredOrder {
            local_id: row.try_get("local_id")?,
            remote_id: row.try_get("remote_id")?,
            owner_id: row.try_get("owner_id")?,
            last_modified: row.try_get("last_modified")?,
            status: row.try_get("status")?,
            date_created: row.try_get("date_created")?,
            payload: row.try_get("payload")?,
            is_locally_changed: row.try_get("is_locally_changed")?,
            synced_at: row.try_get("synced_at")?,
        })
    }
}

impl StoredOrder {
    /// Convert database row to an engine order.
    pub fn to_order(&self) -> Result<OrderRecord, sqlx::Error> {
        let status = OrderStatus::parse(&self.status).ok_or_else(|| {
            sqlx::Error::Decode(format!("unknown order status '{}'", self.status).into())
        })?;
        let payload = serde_json::from_str(&self.payload)
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

        Ok(OrderRecord {
            local_id: self.local_id,
            remote_id: self.remote_id,
            owner_id: self.owner_id,
            last_modified: self.last_modified.clone(),
            status,
            date_created: self.date_created.clone(),
            payload,
            is_locally_changed: self.is_locally_changed,
        })
    }
}

fn to_orders(rows: Vec<StoredOrder>) -> Result<Vec<OrderRecord>, sqlx::Error> {
    rows.iter().map(StoredOrder::to_order).collect()
}

fn payload_text(order: &OrderRecord) -> String {
    order.payload.to_string()
}

/// Insert an order as a local client would. Returns its local id.
pub async fn insert_order(pool: &SqlitePool, order: &OrderRecord) -> Result<LocalId, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO orders (
            remote_id, owner_id, last_modified, status, date_created,
            payload, is_locally_changed
        )
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(order.remote_id)
    .bind(order.owner_id)
    .bind(&order.last_modified)
    .bind(order.status.as_str())
    .bind(&order.date_created)
    .bind(payload_text(order))
    .bind(order.is_locally_changed)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Get a single order by local id.
pub async fn get_order(
    pool: &SqlitePool,
    local_id: LocalId,
) -> Result<Option<OrderRecord>, sqlx::Error> {
    let row: Option<StoredOrder> =
        sqlx::query_as(&format!("{SELECT_ORDERS} WHERE local_id = ?"))
            .bind(local_id)
            .fetch_optional(pool)
            .await?;

    row.as_ref().map(StoredOrder::to_order).transpose()
}

/// Orders of `owner` whose remote id is in `remote_ids`, keyed by remote id.
pub async fn orders_by_remote_ids(
    pool: &SqlitePool,
    remote_ids: &[RemoteId],
    owner: OwnerId,
) -> Result<HashMap<RemoteId, OrderRecord>, sqlx::Error> {
    let mut found = HashMap::with_capacity(remote_ids.len());

    for chunk in remote_ids.chunks(MAX_BOUND_IDS) {
        let mut query = QueryBuilder::<Sqlite>::new(SELECT_ORDERS);
        query.push(" WHERE owner_id = ");
        query.push_bind(owner);
        query.push(" AND remote_id IN (");
        let mut ids = query.separated(", ");
        for id in chunk {
            ids.push_bind(*id);
        }
        ids.push_unseparated(")");

        let rows: Vec<StoredOrder> = query.build_query_as().fetch_all(pool).await?;
        for order in to_orders(rows)? {
            if let Some(remote_id) = order.remote_id {
                found.insert(remote_id, order);
            }
        }
    }

    Ok(found)
}

/// Overwrite an order with the remote's version.
///
/// Matches by local id first, then by `(owner, remote id)`. Unmatched orders
/// with a remote id are inserted; unmatched orders without one are ignored.
/// Returns the number of rows written.
pub async fn overwrite_upsert(pool: &SqlitePool, order: &OrderRecord) -> Result<u64, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let mut existing: Option<i64> =
        sqlx::query_scalar("SELECT local_id FROM orders WHERE local_id = ?")
            .bind(order.local_id)
            .fetch_optional(&mut *tx)
            .await?;

    if existing.is_none() {
        if let Some(remote_id) = order.remote_id {
            existing = sqlx::query_scalar(
                "SELECT local_id FROM orders WHERE owner_id = ? AND remote_id = ?",
            )
            .bind(order.owner_id)
            .bind(remote_id)
            .fetch_optional(&mut *tx)
            .await?;
        }
    }

    let synced_at = chrono::Utc::now();
    let rows = match (existing, order.remote_id) {
        (Some(local_id), _) => {
            sqlx::query(
                r#"
                UPDATE orders SET
                    remote_id = COALESCE(?, remote_id),
                    owner_id = ?,
                    last_modified = ?,
                    status = ?,
                    date_created = ?,
                    payload = ?,
                    is_locally_changed = 0,
                    synced_at = ?
                WHERE local_id = ?
                "#,
            )
            .bind(order.remote_id)
            .bind(order.owner_id)
            .bind(&order.last_modified)
            .bind(order.status.as_str())
            .bind(&order.date_created)
            .bind(payload_text(order))
            .bind(synced_at)
            .bind(local_id)
            .execute(&mut *tx)
            .await?
            .rows_affected()
        }
        (None, Some(remote_id)) => {
            sqlx::query(
                r#"
                INSERT INTO orders (
                    remote_id, owner_id, last_modified, status, date_created,
                    payload, is_locally_changed, synced_at
                )
                VALUES (?, ?, ?, ?, ?, ?, 0, ?)
                "#,
            )
            .bind(remote_id)
            .bind(order.owner_id)
            .bind(&order.last_modified)
            .bind(order.status.as_str())
            .bind(&order.date_created)
            .bind(payload_text(order))
            .bind(synced_at)
            .execute(&mut *tx)
            .await?
            .rows_affected()
        }
        (None, None) => 0,
    };

    tx.commit().await?;
    Ok(rows)
}

/// Orders of `owner` matching any of `ids`, by local id.
pub async fn orders_by_local_or_remote_ids(
    pool: &SqlitePool,
    ids: &[LocalOrRemoteId],
    owner: OwnerId,
) -> Result<Vec<OrderRecord>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let (local_ids, remote_ids): (Vec<_>, Vec<_>) = ids
        .iter()
        .partition(|id| matches!(id, LocalOrRemoteId::LocalId(_)));

    let mut query = QueryBuilder::<Sqlite>::new(SELECT_ORDERS);
    query.push(" WHERE owner_id = ");
    query.push_bind(owner);
    query.push(" AND (0");

    for (column, group) in [("local_id", &local_ids), ("remote_id", &remote_ids)] {
        if group.is_empty() {
            continue;
        }
        query.push(format!(" OR {column} IN ("));
        let mut bound = query.separated(", ");
        for id in group.iter() {
            match id {
                LocalOrRemoteId::LocalId(v) | LocalOrRemoteId::RemoteId(v) => bound.push_bind(*v),
            };
        }
        bound.push_unseparated(")");
    }
    query.push(") ORDER BY local_id");

    let rows: Vec<StoredOrder> = query.build_query_as().fetch_all(pool).await?;
    to_orders(rows)
}

/// Local ids of the orders a list descriptor covers, in display order.
pub async fn local_ids_for_descriptor(
    pool: &SqlitePool,
    descriptor: &ListDescriptor,
) -> Result<Vec<LocalId>, sqlx::Error> {
    let order_clause = match (descriptor.order_by(), descriptor.order()) {
        (ListOrderBy::Date, ListOrder::Asc) => "date_created ASC, local_id ASC",
        (ListOrderBy::Date, ListOrder::Desc) => "date_created DESC, local_id DESC",
        (ListOrderBy::Id, ListOrder::Asc) => "local_id ASC",
        (ListOrderBy::Id, ListOrder::Desc) => "local_id DESC",
    };

    sqlx::query_scalar(&format!(
        "SELECT local_id FROM orders WHERE owner_id = ? ORDER BY {order_clause}"
    ))
    .bind(descriptor.owner().id)
    .fetch_all(pool)
    .await
}
