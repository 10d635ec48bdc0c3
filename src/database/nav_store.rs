use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, info, warn};

use super::manager::{DatabaseError, DatabaseManager};
use crate::navigation::{NavItem, NavItemPatch, NavSnapshot, NavWrite};

/// Persistence for navigation items.
///
/// Writes are only ever applied as a whole batch guarded by the revision the
/// caller's snapshot was taken at.
#[async_trait]
pub trait NavStore: Send + Sync {
    /// All items ordered by `order`, plus the current revision.
    async fn snapshot(&self) -> Result<NavSnapshot, DatabaseError>;

    /// Apply every write or none of them. Fails with [`DatabaseError::Conflict`]
    /// when the navigation changed since `expected_revision`. Returns the new revision.
    async fn apply_batch(&self, expected_revision: i64, writes: &[NavWrite]) -> Result<i64, DatabaseError>;

    async fn health_check(&self) -> Result<(), DatabaseError>;

    fn backend(&self) -> &'static str;
}

const SELECT_ITEMS: &str = r#"
    SELECT id, label, href, sort_order, visible, parent_id
    FROM navbar_items
    ORDER BY sort_order ASC, id ASC
"#;

/// PostgreSQL-backed store over the `navbar_items` and `navbar_revision` tables.
#[derive(Clone)]
pub struct PgNavStore {
    pool: PgPool,
}

impl PgNavStore {
    pub fn new(database: &DatabaseManager) -> Self {
        Self {
            pool: database.pool().clone(),
        }
    }

    async fn list_items(tx: &mut Transaction<'_, Postgres>) -> Result<Vec<NavItem>, DatabaseError> {
        Ok(sqlx::query_as::<_, NavItem>(SELECT_ITEMS)
            .fetch_all(&mut **tx)
            .await?)
    }

    async fn current_revision(tx: &mut Transaction<'_, Postgres>) -> Result<i64, DatabaseError> {
        let (revision,): (i64,) = sqlx::query_as("SELECT revision FROM navbar_revision WHERE id = 1")
            .fetch_one(&mut **tx)
            .await?;
        Ok(revision)
    }

    async fn create_item(tx: &mut Transaction<'_, Postgres>, item: &NavItem) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO navbar_items (id, label, href, sort_order, visible, parent_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(item.id)
        .bind(&item.label)
        .bind(&item.href)
        .bind(item.order)
        .bind(item.visible)
        .bind(item.parent_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn update_item(
        tx: &mut Transaction<'_, Postgres>,
        id: uuid::Uuid,
        patch: &NavItemPatch,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE navbar_items SET
                label = COALESCE($2, label),
                href = COALESCE($3, href),
                visible = COALESCE($4, visible),
                sort_order = COALESCE($5, sort_order),
                parent_id = CASE WHEN $6 THEN $7 ELSE parent_id END,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(patch.label.as_deref())
        .bind(patch.href.as_deref())
        .bind(patch.visible)
        .bind(patch.order)
        .bind(patch.parent_id.is_some())
        .bind(patch.parent_id.flatten())
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("navigation item {}", id)));
        }
        Ok(())
    }

    async fn delete_item(tx: &mut Transaction<'_, Postgres>, id: uuid::Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM navbar_items WHERE id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("navigation item {}", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl NavStore for PgNavStore {
    async fn snapshot(&self) -> Result<NavSnapshot, DatabaseError> {
        // One repeatable-read view, so the items are exactly those of `revision`.
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;
        let revision = Self::current_revision(&mut tx).await?;
        let items = Self::list_items(&mut tx).await?;
        tx.commit().await?;

        debug!("Loaded {} navigation items at revision {}", items.len(), revision);
        Ok(NavSnapshot::new(revision, items))
    }

    async fn apply_batch(&self, expected_revision: i64, writes: &[NavWrite]) -> Result<i64, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let (current,): (i64,) =
            sqlx::query_as("SELECT revision FROM navbar_revision WHERE id = 1 FOR UPDATE")
                .fetch_one(&mut *tx)
                .await?;

        if current != expected_revision {
            warn!(
                "Rejecting navigation batch: expected revision {}, found {}",
                expected_revision, current
            );
            return Err(DatabaseError::Conflict(format!(
                "navigation was modified (revision {} is now {})",
                expected_revision, current
            )));
        }

        for write in writes {
            match write {
                NavWrite::Create { item } => Self::create_item(&mut tx, item).await?,
                NavWrite::Update { id, patch } => Self::update_item(&mut tx, *id, patch).await?,
                NavWrite::Delete { id } => Self::delete_item(&mut tx, *id).await?,
            }
        }

        let next = current + 1;
        sqlx::query("UPDATE navbar_revision SET revision = $1, updated_at = now() WHERE id = 1")
            .bind(next)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!("Applied {} navigation write(s), revision {}", writes.len(), next);
        Ok(next)
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}
