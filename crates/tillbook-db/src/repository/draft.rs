//! # Draft Repository
//!
//! Open billing sessions, saved as JSON so a restart does not lose a
//! half-entered invoice.

use chrono::Utc;
use sqlx::types::Json;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use tillbook_core::InvoiceDraft;

/// One persisted session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDraft {
    pub session_id: String,
    pub label: String,
    pub draft: InvoiceDraft,
    pub position: i64,
}

/// Repository for draft sessions.
#[derive(Debug, Clone)]
pub struct DraftRepository {
    pool: SqlitePool,
}

impl DraftRepository {
    /// Creates a new DraftRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DraftRepository { pool }
    }

    /// Inserts or replaces a session.
    pub async fn save(&self, session_id: &str, label: &str, draft: &InvoiceDraft, position: i64) -> DbResult<()> {
        debug!(session_id = %session_id, lines = draft.lines().len(), "Saving draft session");

        sqlx::query(
            r#"
            INSERT INTO invoice_drafts (session_id, label, draft, position, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (session_id) DO UPDATE SET
                label = excluded.label,
                draft = excluded.draft,
                position = excluded.position,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(session_id)
        .bind(label)
        .bind(Json(draft))
        .bind(position)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Every saved session in tab order.
    pub async fn load_all(&self) -> DbResult<Vec<StoredDraft>> {
        let rows: Vec<(String, String, Json<InvoiceDraft>, i64)> = sqlx::query_as(
            "SELECT session_id, label, draft, position FROM invoice_drafts ORDER BY position, updated_at",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(session_id, label, Json(draft), position)| StoredDraft {
                session_id,
                label,
                draft,
                position,
            })
            .collect())
    }

    pub async fn delete(&self, session_id: &str) -> DbResult<()> {
        debug!(session_id = %session_id, "Deleting draft session");

        sqlx::query("DELETE FROM invoice_drafts WHERE session_id = ?1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use tillbook_core::draft::LineField;
    use tillbook_core::{InvoiceStatus, LineKind, Money};

    #[tokio::test]
    async fn test_draft_survives_a_round_trip() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut draft = InvoiceDraft::default();
        draft.customer.name = "Asha".into();
        let line = draft.add_line(LineKind::Manual).unwrap();
        draft.update_line(line, LineField::UnitPrice, "250").unwrap();
        draft.update_line(line, LineField::Quantity, "2").unwrap();
        draft.set_payment_status(InvoiceStatus::Partial);
        draft.set_paid_amount(Money::from_rupees(100));

        db.drafts().save("s1", "Asha", &draft, 0).await.unwrap();
        db.drafts().save("s2", "New Invoice", &InvoiceDraft::default(), 1).await.unwrap();

        let stored = db.drafts().load_all().await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].session_id, "s1");
        assert_eq!(stored[0].draft, draft);
        assert_eq!(stored[0].draft.settlement().paid_amount(), Money::from_rupees(100));
    }

    #[tokio::test]
    async fn test_save_replaces_and_delete_removes() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let draft = InvoiceDraft::default();

        db.drafts().save("s1", "New Invoice", &draft, 0).await.unwrap();
        db.drafts().save("s1", "Ravi", &draft, 0).await.unwrap();
        let stored = db.drafts().load_all().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].label, "Ravi");

        db.drafts().delete("s1").await.unwrap();
        assert!(db.drafts().load_all().await.unwrap().is_empty());
    }
}
