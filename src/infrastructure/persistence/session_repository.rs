use crate::domain::ledger::ConsumptionEvent;
use crate::domain::session::{
    InventorySession, InventorySessionLine, QuantityForm, SessionParticipant, SessionStatus,
    SessionType, VarianceReason, VarianceReasonEntry,
};
use crate::shared::{
    AppError, AppResult, InventoryItemId, InventorySessionId, InventorySessionLineId, LocationId,
    SessionParticipantId, UserId, VarianceReasonEntryId,
};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// §5 "session close ... on failure at any step rolls back so the session
/// remains open and no ledger entries are written" — a Postgres
/// serialization failure (SQLSTATE `40001`) retried up to this many times
/// before giving up, matching §4.12's "fixed 3-attempt budget".
const CLOSE_RETRY_ATTEMPTS: u32 = 3;

fn is_serialization_failure(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("40001"))
}

/// §3 InventorySession / InventorySessionLine / SessionParticipant /
/// VarianceReasonEntry, §4.5 Session Engine.
#[async_trait]
pub trait SessionRepositoryTrait: Send + Sync {
    async fn create_session(&self, session: &InventorySession) -> AppResult<()>;
    async fn find_session(&self, id: InventorySessionId) -> AppResult<Option<InventorySession>>;
    async fn find_open_session_for_location(
        &self,
        location_id: LocationId,
    ) -> AppResult<Option<InventorySession>>;
    async fn list_sessions_for_location(
        &self,
        location_id: LocationId,
        limit: i64,
    ) -> AppResult<Vec<InventorySession>>;
    async fn update_session(&self, session: &InventorySession) -> AppResult<()>;

    async fn add_line(&self, line: &InventorySessionLine) -> AppResult<()>;
    async fn list_lines(&self, session_id: InventorySessionId) -> AppResult<Vec<InventorySessionLine>>;

    async fn add_participant(&self, participant: &SessionParticipant) -> AppResult<()>;
    async fn list_participants(&self, session_id: InventorySessionId) -> AppResult<Vec<SessionParticipant>>;

    async fn add_variance_reason(&self, entry: &VarianceReasonEntry) -> AppResult<()>;
    async fn list_variance_reasons(&self, session_id: InventorySessionId) -> AppResult<Vec<VarianceReasonEntry>>;

    /// §4.5 "All writes are within one transaction; failure at any step
    /// rolls back so the session remains open and no ledger entries are
    /// written. Readers never see a partially closed session." Writes
    /// every reconciling `ConsumptionEvent` and flips the session to
    /// closed inside one `repeatable read` transaction, retrying the whole
    /// transaction up to `CLOSE_RETRY_ATTEMPTS` times on a serialization
    /// failure (§5, §4.12).
    async fn close_with_ledger_entries(
        &self,
        session: &InventorySession,
        events: &[ConsumptionEvent],
    ) -> AppResult<()>;
}

#[derive(Clone)]
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_session(row: sqlx::postgres::PgRow) -> AppResult<InventorySession> {
        let session_type: String = row.get("session_type");
        let status: String = row.get("status");
        Ok(InventorySession {
            id: InventorySessionId::from_uuid(row.get::<Uuid, _>("id")),
            location_id: LocationId::from_uuid(row.get::<Uuid, _>("location_id")),
            session_type: SessionType::from_str(&session_type)?,
            status: SessionStatus::from_str(&status)?,
            opened_by: UserId::from_uuid(row.get::<Uuid, _>("opened_by")),
            opened_at: row.get("opened_at"),
            closed_by: row.get::<Option<Uuid>, _>("closed_by").map(UserId::from_uuid),
            closed_at: row.get("closed_at"),
        })
    }

    fn row_to_line(row: sqlx::postgres::PgRow) -> AppResult<InventorySessionLine> {
        let raw_form: serde_json::Value = row.get("raw_form");
        let raw_form: QuantityForm = serde_json::from_value(raw_form)
            .map_err(|e| crate::shared::AppError::internal(format!("corrupt raw_form: {e}")))?;
        Ok(InventorySessionLine {
            id: InventorySessionLineId::from_uuid(row.get::<Uuid, _>("id")),
            session_id: InventorySessionId::from_uuid(row.get::<Uuid, _>("session_id")),
            inventory_item_id: InventoryItemId::from_uuid(row.get::<Uuid, _>("inventory_item_id")),
            sub_area: row.get("sub_area"),
            raw_form,
            counted_quantity: row.get("counted_quantity"),
            counted_by: UserId::from_uuid(row.get::<Uuid, _>("counted_by")),
            counted_at: row.get("counted_at"),
        })
    }

    fn row_to_participant(row: sqlx::postgres::PgRow) -> SessionParticipant {
        SessionParticipant {
            id: SessionParticipantId::from_uuid(row.get::<Uuid, _>("id")),
            session_id: InventorySessionId::from_uuid(row.get::<Uuid, _>("session_id")),
            user_id: UserId::from_uuid(row.get::<Uuid, _>("user_id")),
            sub_area: row.get("sub_area"),
            joined_at: row.get("joined_at"),
            last_active_ts: row.get("last_active_ts"),
        }
    }

    fn row_to_variance_reason(row: sqlx::postgres::PgRow) -> AppResult<VarianceReasonEntry> {
        let reason: String = row.get("reason");
        Ok(VarianceReasonEntry {
            id: VarianceReasonEntryId::from_uuid(row.get::<Uuid, _>("id")),
            session_id: InventorySessionId::from_uuid(row.get::<Uuid, _>("session_id")),
            inventory_item_id: InventoryItemId::from_uuid(row.get::<Uuid, _>("inventory_item_id")),
            reason: VarianceReason::from_str(&reason)?,
            note: row.get("note"),
            entered_by: UserId::from_uuid(row.get::<Uuid, _>("entered_by")),
            entered_at: row.get("entered_at"),
        })
    }
}

#[async_trait]
impl SessionRepositoryTrait for SessionRepository {
    async fn create_session(&self, session: &InventorySession) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO inventory_sessions
                (id, location_id, session_type, status, opened_by, opened_at, closed_by, closed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(session.id.as_uuid())
        .bind(session.location_id.as_uuid())
        .bind(session.session_type.as_str())
        .bind(session.status.as_str())
        .bind(session.opened_by.as_uuid())
        .bind(session.opened_at)
        .bind(session.closed_by.map(|id| *id.as_uuid()))
        .bind(session.closed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_session(&self, id: InventorySessionId) -> AppResult<Option<InventorySession>> {
        let row = sqlx::query(
            r#"
            SELECT id, location_id, session_type, status, opened_by, opened_at, closed_by, closed_at
            FROM inventory_sessions WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_session).transpose()
    }

    async fn find_open_session_for_location(
        &self,
        location_id: LocationId,
    ) -> AppResult<Option<InventorySession>> {
        let row = sqlx::query(
            r#"
            SELECT id, location_id, session_type, status, opened_by, opened_at, closed_by, closed_at
            FROM inventory_sessions WHERE location_id = $1 AND status = 'open'
            "#,
        )
        .bind(location_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_session).transpose()
    }

    async fn list_sessions_for_location(
        &self,
        location_id: LocationId,
        limit: i64,
    ) -> AppResult<Vec<InventorySession>> {
        let rows = sqlx::query(
            r#"
            SELECT id, location_id, session_type, status, opened_by, opened_at, closed_by, closed_at
            FROM inventory_sessions WHERE location_id = $1
            ORDER BY opened_at DESC LIMIT $2
            "#,
        )
        .bind(location_id.as_uuid())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_session).collect()
    }

    async fn update_session(&self, session: &InventorySession) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE inventory_sessions SET status = $2, closed_by = $3, closed_at = $4
            WHERE id = $1
            "#,
        )
        .bind(session.id.as_uuid())
        .bind(session.status.as_str())
        .bind(session.closed_by.map(|id| *id.as_uuid()))
        .bind(session.closed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Upserts on `(session_id, inventory_item_id, sub_area)`: a second
    /// count of the same item/sub-area overwrites the first rather than
    /// creating a duplicate line, so re-counting a mis-keyed item is just a
    /// repeat `AddLine` call (§4.5 step 2).
    async fn add_line(&self, line: &InventorySessionLine) -> AppResult<()> {
        let raw_form = serde_json::to_value(&line.raw_form)
            .map_err(|e| crate::shared::AppError::internal(format!("cannot serialize raw_form: {e}")))?;
        sqlx::query(
            r#"
            INSERT INTO inventory_session_lines
                (id, session_id, inventory_item_id, sub_area, raw_form, counted_quantity, counted_by, counted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (session_id, inventory_item_id, sub_area) DO UPDATE SET
                raw_form = EXCLUDED.raw_form,
                counted_quantity = EXCLUDED.counted_quantity,
                counted_by = EXCLUDED.counted_by,
                counted_at = EXCLUDED.counted_at
            "#,
        )
        .bind(line.id.as_uuid())
        .bind(line.session_id.as_uuid())
        .bind(line.inventory_item_id.as_uuid())
        .bind(&line.sub_area)
        .bind(raw_form)
        .bind(line.counted_quantity)
        .bind(line.counted_by.as_uuid())
        .bind(line.counted_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_lines(&self, session_id: InventorySessionId) -> AppResult<Vec<InventorySessionLine>> {
        let rows = sqlx::query(
            r#"
            SELECT id, session_id, inventory_item_id, sub_area, raw_form, counted_quantity, counted_by, counted_at
            FROM inventory_session_lines WHERE session_id = $1
            "#,
        )
        .bind(session_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_line).collect()
    }

    /// Upserts on `(session_id, user_id, sub_area)`, refreshing
    /// `last_active_ts` on every subsequent join so presence in a session
    /// can be derived without a separate heartbeat channel (§4.5).
    async fn add_participant(&self, participant: &SessionParticipant) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO session_participants (id, session_id, user_id, sub_area, joined_at, last_active_ts)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (session_id, user_id, sub_area) DO UPDATE SET
                last_active_ts = EXCLUDED.last_active_ts
            "#,
        )
        .bind(participant.id.as_uuid())
        .bind(participant.session_id.as_uuid())
        .bind(participant.user_id.as_uuid())
        .bind(&participant.sub_area)
        .bind(participant.joined_at)
        .bind(participant.last_active_ts)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_participants(&self, session_id: InventorySessionId) -> AppResult<Vec<SessionParticipant>> {
        let rows = sqlx::query(
            r#"
            SELECT id, session_id, user_id, sub_area, joined_at, last_active_ts
            FROM session_participants WHERE session_id = $1
            "#,
        )
        .bind(session_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Self::row_to_participant).collect())
    }

    async fn add_variance_reason(&self, entry: &VarianceReasonEntry) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO variance_reason_entries
                (id, session_id, inventory_item_id, reason, note, entered_by, entered_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(entry.id.as_uuid())
        .bind(entry.session_id.as_uuid())
        .bind(entry.inventory_item_id.as_uuid())
        .bind(entry.reason.as_str())
        .bind(&entry.note)
        .bind(entry.entered_by.as_uuid())
        .bind(entry.entered_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_variance_reasons(&self, session_id: InventorySessionId) -> AppResult<Vec<VarianceReasonEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, session_id, inventory_item_id, reason, note, entered_by, entered_at
            FROM variance_reason_entries WHERE session_id = $1
            "#,
        )
        .bind(session_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_variance_reason).collect()
    }

    async fn close_with_ledger_entries(
        &self,
        session: &InventorySession,
        events: &[ConsumptionEvent],
    ) -> AppResult<()> {
        let mut last_err = None;
        for attempt in 0..CLOSE_RETRY_ATTEMPTS {
            match self.try_close_with_ledger_entries(session, events).await {
                Ok(()) => return Ok(()),
                Err(err) if is_serialization_failure(&err) && attempt + 1 < CLOSE_RETRY_ATTEMPTS => {
                    tracing::warn!(session_id = %session.id, attempt, "session close serialization failure, retrying");
                    last_err = Some(err);
                }
                Err(err) => return Err(AppError::from(err)),
            }
        }
        Err(AppError::from(last_err.expect("loop always sets last_err before exhausting retries")))
    }
}

impl SessionRepository {
    async fn try_close_with_ledger_entries(
        &self,
        session: &InventorySession,
        events: &[ConsumptionEvent],
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ").execute(&mut *tx).await?;

        for event in events {
            sqlx::query(
                r#"
                INSERT INTO consumption_events
                    (id, location_id, event_ts, created_ts, event_type, source_system,
                     inventory_item_id, quantity_delta, uom, confidence_level,
                     session_id, recipe_id, sales_line_ref, notes, variance_reason, void_seq)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, 0)
                "#,
            )
            .bind(event.id.as_uuid())
            .bind(event.location_id.as_uuid())
            .bind(event.event_ts)
            .bind(event.created_ts)
            .bind(event.event_type.as_str())
            .bind(event.source_system.as_str())
            .bind(event.inventory_item_id.as_uuid())
            .bind(event.quantity_delta.value())
            .bind(event.uom.as_str())
            .bind(event.confidence_level.as_str())
            .bind(event.session_id.map(|id| *id.as_uuid()))
            .bind(event.recipe_id.map(|id| *id.as_uuid()))
            .bind(event.sales_line_ref.map(|id| *id.as_uuid()))
            .bind(&event.notes)
            .bind(&event.variance_reason)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            r#"
            UPDATE inventory_sessions SET status = $2, closed_by = $3, closed_at = $4
            WHERE id = $1
            "#,
        )
        .bind(session.id.as_uuid())
        .bind(session.status.as_str())
        .bind(session.closed_by.map(|id| *id.as_uuid()))
        .bind(session.closed_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await
    }
}
