use sqlx::{PgPool, Row};
use std::sync::Arc;
use tracing::{info, warn};

use crate::dto::archive_dto::BulkResult;
use crate::error::Result;
use crate::models::actor::Actor;
use crate::models::application::ApplicationStatus;
use crate::services::audit_service::{self, NewEvent};
use crate::services::object_store::ObjectStore;
use crate::utils::validation::normalize_ids;

/// Deletes each CV blob once. Failures are logged and counted; the caller's
/// database changes are already committed.
pub async fn purge_blobs(store: &dyn ObjectStore, blobs: &[(i64, String)]) -> usize {
    let mut failures = 0;
    for (application_id, key) in blobs {
        if let Err(e) = store.delete(key).await {
            failures += 1;
            warn!(application_id, key = %key, error = %e, "Failed to delete CV blob");
        }
    }
    failures
}

#[derive(Clone)]
pub struct ArchivalService {
    pool: PgPool,
    store: Arc<dyn ObjectStore>,
}

impl ArchivalService {
    pub fn new(pool: PgPool, store: Arc<dyn ObjectStore>) -> Self {
        Self { pool, store }
    }

    /// Archives ids that are active and in a terminal status; anything else
    /// is skipped without error.
    pub async fn archive(&self, ids: &[i64], actor: &Actor) -> Result<BulkResult> {
        let ids = normalize_ids(ids)?;
        let archivable: Vec<&str> = ApplicationStatus::ARCHIVABLE
            .iter()
            .map(|s| s.as_str())
            .collect();

        let mut tx = self.pool.begin().await?;
        let archived: Vec<i64> = sqlx::query_scalar(
            r#"
            UPDATE applications SET is_archived = TRUE, updated_at = NOW()
            WHERE id = ANY($1) AND NOT is_archived AND status = ANY($2)
            RETURNING id
            "#,
        )
        .bind(&ids)
        .bind(&archivable)
        .fetch_all(&mut *tx)
        .await?;

        for id in &archived {
            audit_service::record(
                &mut tx,
                NewEvent {
                    application_id: *id,
                    actor_id: Some(actor.id),
                    action: "archived",
                    from_status: None,
                    to_status: None,
                    changes: None,
                },
            )
            .await?;
        }
        tx.commit().await?;

        let count = archived.len() as u64;
        info!(requested = ids.len(), archived = count, actor_id = actor.id, "Applications archived");
        Ok(BulkResult {
            count,
            message: format!("{} of {} application(s) archived", count, ids.len()),
        })
    }

    pub async fn unarchive(&self, ids: &[i64], actor: &Actor) -> Result<BulkResult> {
        let ids = normalize_ids(ids)?;

        let mut tx = self.pool.begin().await?;
        let restored: Vec<i64> = sqlx::query_scalar(
            r#"
            UPDATE applications SET is_archived = FALSE, updated_at = NOW()
            WHERE id = ANY($1) AND is_archived
            RETURNING id
            "#,
        )
        .bind(&ids)
        .fetch_all(&mut *tx)
        .await?;

        for id in &restored {
            audit_service::record(
                &mut tx,
                NewEvent {
                    application_id: *id,
                    actor_id: Some(actor.id),
                    action: "unarchived",
                    from_status: None,
                    to_status: None,
                    changes: None,
                },
            )
            .await?;
        }
        tx.commit().await?;

        let count = restored.len() as u64;
        info!(requested = ids.len(), unarchived = count, actor_id = actor.id, "Applications restored from archive");
        Ok(BulkResult {
            count,
            message: format!("{} of {} application(s) restored", count, ids.len()),
        })
    }

    /// Deletes active applications together with their bookings in a single
    /// transaction, then removes their CV blobs.
    pub async fn bulk_delete_active(&self, ids: &[i64], actor: &Actor) -> Result<BulkResult> {
        let ids = normalize_ids(ids)?;

        let mut tx = self.pool.begin().await?;
        let rows = sqlx::query(
            r#"
            SELECT id, cv_object_key FROM applications
            WHERE id = ANY($1) AND NOT is_archived
            ORDER BY id
            FOR UPDATE
            "#,
        )
        .bind(&ids)
        .fetch_all(&mut *tx)
        .await?;

        let mut blobs = Vec::with_capacity(rows.len());
        for row in rows {
            blobs.push((row.try_get::<i64, _>("id")?, row.try_get::<String, _>("cv_object_key")?));
        }
        let matched: Vec<i64> = blobs.iter().map(|(id, _)| *id).collect();

        if !matched.is_empty() {
            sqlx::query("DELETE FROM bookings WHERE application_id = ANY($1)")
                .bind(&matched)
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM applications WHERE id = ANY($1)")
                .bind(&matched)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        let failures = purge_blobs(self.store.as_ref(), &blobs).await;
        let count = matched.len() as u64;
        info!(
            requested = ids.len(),
            deleted = count,
            blob_failures = failures,
            actor_id = actor.id,
            "Active applications deleted"
        );

        let mut message = format!("{} of {} application(s) deleted", count, ids.len());
        if failures > 0 {
            message.push_str(&format!("; {} CV file(s) could not be removed", failures));
        }
        Ok(BulkResult { count, message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::services::object_store::MockObjectStore;

    #[tokio::test]
    async fn purge_deletes_each_key_once_and_survives_failures() {
        let mut store = MockObjectStore::new();
        store
            .expect_delete()
            .withf(|key| key.to_string() == "cv/1.pdf")
            .times(1)
            .returning(|_| Ok(()));
        store
            .expect_delete()
            .withf(|key| key.to_string() == "cv/2.pdf")
            .times(1)
            .returning(|_| Err(Error::ObjectStore("disk unavailable".into())));
        store
            .expect_delete()
            .withf(|key| key.to_string() == "cv/3.pdf")
            .times(1)
            .returning(|_| Ok(()));

        let blobs = vec![
            (1, "cv/1.pdf".to_string()),
            (2, "cv/2.pdf".to_string()),
            (3, "cv/3.pdf".to_string()),
        ];
        let failures = purge_blobs(&store, &blobs).await;
        assert_eq!(failures, 1);
    }

    #[test]
    fn purge_with_nothing_to_delete_touches_nothing() {
        let store = MockObjectStore::new();
        let failures = tokio_test::block_on(purge_blobs(&store, &[]));
        assert_eq!(failures, 0);
    }
}
