//! Database queries for the ticket service.

use ticketd_core::db::now_ms;

use super::db::TicketDatabase;
use super::models::{
    ALERT_CANCELLED, ALERT_EXECUTED, ALERT_PENDING, ExpiredAlert, MemberInsert, RatingInsert,
    RatingSummary, STATUS_CLOSED, STATUS_OPEN, Ticket, TicketAlert, TicketAnswer, TicketMember,
    TicketRating, TicketResponse,
};
use ticketd_core::db::DatabaseError;

impl TicketDatabase {
    // =========================================================================
    // Ticket queries
    // =========================================================================

    /// Create a ticket, minting the next per-guild ticket number.
    ///
    /// One transaction: counter upsert, ticket insert, and the owner's
    /// membership row. The channel id stays NULL until the platform channel
    /// exists; see [`Self::set_ticket_channel`].
    pub async fn create_ticket(
        &self,
        guild_id: &str,
        user_id: &str,
        category_id: &str,
    ) -> Result<Ticket, DatabaseError> {
        let now = now_ms();
        let mut tx = self.pool().begin().await?;

        sqlx::query(
            "INSERT INTO guild_counters (guild_id, ticket_count) VALUES (?, 1) \
             ON CONFLICT (guild_id) DO UPDATE SET ticket_count = ticket_count + 1",
        )
        .bind(guild_id)
        .execute(&mut *tx)
        .await?;

        let number: i64 =
            sqlx::query_scalar("SELECT ticket_count FROM guild_counters WHERE guild_id = ?")
                .bind(guild_id)
                .fetch_one(&mut *tx)
                .await?;

        let result = sqlx::query(
            "INSERT INTO tickets (ticket_number, guild_id, user_id, category_id, status, created_at, last_message_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(number)
        .bind(guild_id)
        .bind(user_id)
        .bind(category_id)
        .bind(STATUS_OPEN)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let ticket_id = result.last_insert_rowid();

        sqlx::query(
            "INSERT INTO ticket_members (ticket_id, user_id, added_by, added_at) VALUES (?, ?, ?, ?)",
        )
        .bind(ticket_id)
        .bind(user_id)
        .bind(user_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.get_ticket_by_id(ticket_id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Ticket {ticket_id}")))
    }

    /// Record the platform channel once it exists.
    pub async fn set_ticket_channel(
        &self,
        ticket_id: i64,
        channel_id: &str,
    ) -> Result<(), DatabaseError> {
        sqlx::query("UPDATE tickets SET channel_id = ? WHERE id = ?")
            .bind(channel_id)
            .bind(ticket_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Compensating rollback when channel creation fails after the row was
    /// inserted. Removes members, responses, and the ticket itself.
    pub async fn delete_ticket(&self, ticket_id: i64) -> Result<(), DatabaseError> {
        let mut tx = self.pool().begin().await?;

        sqlx::query("DELETE FROM ticket_members WHERE ticket_id = ?")
            .bind(ticket_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM ticket_responses WHERE ticket_id = ?")
            .bind(ticket_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM tickets WHERE id = ?")
            .bind(ticket_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn get_ticket_by_id(&self, ticket_id: i64) -> Result<Option<Ticket>, DatabaseError> {
        let ticket = sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE id = ?")
            .bind(ticket_id)
            .fetch_optional(self.pool())
            .await?;
        Ok(ticket)
    }

    pub async fn get_ticket_by_channel(
        &self,
        channel_id: &str,
    ) -> Result<Option<Ticket>, DatabaseError> {
        let ticket = sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE channel_id = ?")
            .bind(channel_id)
            .fetch_optional(self.pool())
            .await?;
        Ok(ticket)
    }

    /// Open tickets a user holds in one category.
    pub async fn get_user_open_tickets(
        &self,
        user_id: &str,
        category_id: &str,
    ) -> Result<Vec<Ticket>, DatabaseError> {
        let tickets = sqlx::query_as::<_, Ticket>(
            "SELECT * FROM tickets WHERE user_id = ? AND category_id = ? AND status = ?",
        )
        .bind(user_id)
        .bind(category_id)
        .bind(STATUS_OPEN)
        .fetch_all(self.pool())
        .await?;
        Ok(tickets)
    }

    /// All open tickets in one category.
    pub async fn get_category_open_tickets(
        &self,
        category_id: &str,
    ) -> Result<Vec<Ticket>, DatabaseError> {
        let tickets = sqlx::query_as::<_, Ticket>(
            "SELECT * FROM tickets WHERE category_id = ? AND status = ?",
        )
        .bind(category_id)
        .bind(STATUS_OPEN)
        .fetch_all(self.pool())
        .await?;
        Ok(tickets)
    }

    /// Close a ticket. Racing closers serialize here: only the UPDATE that
    /// still sees `open` wins, the rest return `false`.
    pub async fn close_ticket(
        &self,
        channel_id: &str,
        closed_by: &str,
        reason: Option<&str>,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE tickets SET status = ?, closed_at = ?, closed_by = ?, close_reason = ? \
             WHERE channel_id = ? AND status = ?",
        )
        .bind(STATUS_CLOSED)
        .bind(now_ms())
        .bind(closed_by)
        .bind(reason)
        .bind(channel_id)
        .bind(STATUS_OPEN)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Claim an open, unclaimed ticket.
    pub async fn claim_ticket(
        &self,
        channel_id: &str,
        user_id: &str,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE tickets SET claimed_by = ? \
             WHERE channel_id = ? AND status = ? AND claimed_by IS NULL",
        )
        .bind(user_id)
        .bind(channel_id)
        .bind(STATUS_OPEN)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Release a claim. Returns `false` when nothing was claimed.
    pub async fn unclaim_ticket(&self, channel_id: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE tickets SET claimed_by = NULL \
             WHERE channel_id = ? AND status = ? AND claimed_by IS NOT NULL",
        )
        .bind(channel_id)
        .bind(STATUS_OPEN)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Bump the activity timestamp for a ticket channel.
    pub async fn update_last_message(&self, channel_id: &str) -> Result<(), DatabaseError> {
        sqlx::query("UPDATE tickets SET last_message_at = ? WHERE channel_id = ?")
            .bind(now_ms())
            .bind(channel_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    pub async fn count_open_tickets(&self) -> Result<i64, DatabaseError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tickets WHERE status = ?")
            .bind(STATUS_OPEN)
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }

    // =========================================================================
    // Member queries
    // =========================================================================

    /// Add a member to a ticket. The exists check runs inside the
    /// transaction so a duplicate is reported as an outcome, not an error.
    pub async fn add_ticket_member(
        &self,
        ticket_id: i64,
        user_id: &str,
        added_by: &str,
    ) -> Result<MemberInsert, DatabaseError> {
        let mut tx = self.pool().begin().await?;

        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM ticket_members WHERE ticket_id = ? AND user_id = ?)",
        )
        .bind(ticket_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        if exists {
            return Ok(MemberInsert::AlreadyMember);
        }

        let result = sqlx::query(
            "INSERT INTO ticket_members (ticket_id, user_id, added_by, added_at) VALUES (?, ?, ?, ?)",
        )
        .bind(ticket_id)
        .bind(user_id)
        .bind(added_by)
        .bind(now_ms())
        .execute(&mut *tx)
        .await?;

        let member_id = result.last_insert_rowid();

        let member =
            sqlx::query_as::<_, TicketMember>("SELECT * FROM ticket_members WHERE id = ?")
                .bind(member_id)
                .fetch_one(&mut *tx)
                .await?;

        tx.commit().await?;
        Ok(MemberInsert::Added(member))
    }

    pub async fn remove_ticket_member(
        &self,
        ticket_id: i64,
        user_id: &str,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM ticket_members WHERE ticket_id = ? AND user_id = ?")
            .bind(ticket_id)
            .bind(user_id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn get_ticket_members(
        &self,
        ticket_id: i64,
    ) -> Result<Vec<TicketMember>, DatabaseError> {
        let members = sqlx::query_as::<_, TicketMember>(
            "SELECT * FROM ticket_members WHERE ticket_id = ? ORDER BY id",
        )
        .bind(ticket_id)
        .fetch_all(self.pool())
        .await?;
        Ok(members)
    }

    pub async fn is_ticket_member(
        &self,
        ticket_id: i64,
        user_id: &str,
    ) -> Result<bool, DatabaseError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM ticket_members WHERE ticket_id = ? AND user_id = ?)",
        )
        .bind(ticket_id)
        .bind(user_id)
        .fetch_one(self.pool())
        .await?;
        Ok(exists)
    }

    // =========================================================================
    // Intake response queries
    // =========================================================================

    /// Persist intake answers in submission order (single transaction).
    pub async fn save_ticket_responses(
        &self,
        ticket_id: i64,
        answers: &[TicketAnswer],
    ) -> Result<(), DatabaseError> {
        let mut tx = self.pool().begin().await?;

        for answer in answers {
            sqlx::query(
                "INSERT INTO ticket_responses (ticket_id, question, answer) VALUES (?, ?, ?)",
            )
            .bind(ticket_id)
            .bind(&answer.question)
            .bind(&answer.answer)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn get_ticket_responses(
        &self,
        ticket_id: i64,
    ) -> Result<Vec<TicketResponse>, DatabaseError> {
        let responses = sqlx::query_as::<_, TicketResponse>(
            "SELECT * FROM ticket_responses WHERE ticket_id = ? ORDER BY id",
        )
        .bind(ticket_id)
        .fetch_all(self.pool())
        .await?;
        Ok(responses)
    }

    // =========================================================================
    // Cooldown queries
    // =========================================================================

    /// Remaining cooldown in milliseconds; 0 when absent or expired.
    pub async fn check_cooldown(
        &self,
        user_id: &str,
        category_id: &str,
    ) -> Result<i64, DatabaseError> {
        let expires_at: Option<i64> = sqlx::query_scalar(
            "SELECT expires_at FROM cooldowns WHERE user_id = ? AND category_id = ?",
        )
        .bind(user_id)
        .bind(category_id)
        .fetch_optional(self.pool())
        .await?;

        Ok(expires_at.map_or(0, |ts| (ts - now_ms()).max(0)))
    }

    /// Start (or restart) a cooldown.
    pub async fn set_cooldown(
        &self,
        user_id: &str,
        category_id: &str,
        duration_ms: i64,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO cooldowns (user_id, category_id, expires_at) VALUES (?, ?, ?) \
             ON CONFLICT (user_id, category_id) DO UPDATE SET expires_at = excluded.expires_at",
        )
        .bind(user_id)
        .bind(category_id)
        .bind(now_ms() + duration_ms)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Drop expired cooldown rows, returning how many were removed.
    pub async fn clean_expired_cooldowns(&self) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM cooldowns WHERE expires_at <= ?")
            .bind(now_ms())
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected())
    }

    // =========================================================================
    // Rating queries
    // =========================================================================

    /// Save a rating, at most one per ticket.
    pub async fn save_ticket_rating(
        &self,
        ticket_id: i64,
        user_id: &str,
        rating: i64,
        comment: Option<&str>,
    ) -> Result<RatingInsert, DatabaseError> {
        let mut tx = self.pool().begin().await?;

        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM ticket_ratings WHERE ticket_id = ?)",
        )
        .bind(ticket_id)
        .fetch_one(&mut *tx)
        .await?;

        if exists {
            return Ok(RatingInsert::AlreadyRated);
        }

        let result = sqlx::query(
            "INSERT INTO ticket_ratings (ticket_id, user_id, rating, comment, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(ticket_id)
        .bind(user_id)
        .bind(rating)
        .bind(comment)
        .bind(now_ms())
        .execute(&mut *tx)
        .await?;

        let rating_id = result.last_insert_rowid();

        let saved =
            sqlx::query_as::<_, TicketRating>("SELECT * FROM ticket_ratings WHERE id = ?")
                .bind(rating_id)
                .fetch_one(&mut *tx)
                .await?;

        tx.commit().await?;
        Ok(RatingInsert::Saved(saved))
    }

    pub async fn get_ticket_rating(
        &self,
        ticket_id: i64,
    ) -> Result<Option<TicketRating>, DatabaseError> {
        let rating =
            sqlx::query_as::<_, TicketRating>("SELECT * FROM ticket_ratings WHERE ticket_id = ?")
                .bind(ticket_id)
                .fetch_optional(self.pool())
                .await?;
        Ok(rating)
    }

    pub async fn average_rating(&self) -> Result<RatingSummary, DatabaseError> {
        let summary = sqlx::query_as::<_, RatingSummary>(
            "SELECT AVG(rating) AS average, COUNT(*) AS total FROM ticket_ratings",
        )
        .fetch_one(self.pool())
        .await?;
        Ok(summary)
    }

    // =========================================================================
    // Alert queries
    // =========================================================================

    /// Arm an inactivity alert, cancelling any pending one first so a ticket
    /// never carries two pending alerts.
    pub async fn set_ticket_alert(
        &self,
        ticket_id: i64,
        alerted_by: &str,
        duration_minutes: i64,
        reason: Option<&str>,
    ) -> Result<TicketAlert, DatabaseError> {
        let now = now_ms();
        let mut tx = self.pool().begin().await?;

        sqlx::query("UPDATE ticket_alerts SET status = ? WHERE ticket_id = ? AND status = ?")
            .bind(ALERT_CANCELLED)
            .bind(ticket_id)
            .bind(ALERT_PENDING)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query(
            "INSERT INTO ticket_alerts (ticket_id, alerted_by, reason, duration_minutes, expires_at, status, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(ticket_id)
        .bind(alerted_by)
        .bind(reason)
        .bind(duration_minutes)
        .bind(now + duration_minutes * 60_000)
        .bind(ALERT_PENDING)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let alert_id = result.last_insert_rowid();

        let alert = sqlx::query_as::<_, TicketAlert>("SELECT * FROM ticket_alerts WHERE id = ?")
            .bind(alert_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(alert)
    }

    /// Latest pending alert for a ticket, if any.
    pub async fn get_ticket_alert(
        &self,
        ticket_id: i64,
    ) -> Result<Option<TicketAlert>, DatabaseError> {
        let alert = sqlx::query_as::<_, TicketAlert>(
            "SELECT * FROM ticket_alerts WHERE ticket_id = ? AND status = ? \
             ORDER BY id DESC LIMIT 1",
        )
        .bind(ticket_id)
        .bind(ALERT_PENDING)
        .fetch_optional(self.pool())
        .await?;
        Ok(alert)
    }

    /// Pending alerts past their deadline whose ticket is still open.
    pub async fn get_expired_alerts(&self) -> Result<Vec<ExpiredAlert>, DatabaseError> {
        let alerts = sqlx::query_as::<_, ExpiredAlert>(
            "SELECT a.id, a.ticket_id, a.alerted_by, a.reason, a.duration_minutes, \
                    a.expires_at, a.created_at, \
                    t.channel_id, t.guild_id, t.user_id AS owner_id, t.ticket_number \
             FROM ticket_alerts a \
             JOIN tickets t ON t.id = a.ticket_id \
             WHERE a.status = ? AND a.expires_at <= ? AND t.status = ? \
             ORDER BY a.expires_at",
        )
        .bind(ALERT_PENDING)
        .bind(now_ms())
        .bind(STATUS_OPEN)
        .fetch_all(self.pool())
        .await?;
        Ok(alerts)
    }

    pub async fn mark_alert_executed(&self, alert_id: i64) -> Result<(), DatabaseError> {
        sqlx::query("UPDATE ticket_alerts SET status = ? WHERE id = ?")
            .bind(ALERT_EXECUTED)
            .bind(alert_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Cancel pending alerts when the owner responds. Returns how many were
    /// cancelled (0 or 1 in practice).
    pub async fn cancel_alert_on_response(&self, ticket_id: i64) -> Result<u64, DatabaseError> {
        let result =
            sqlx::query("UPDATE ticket_alerts SET status = ? WHERE ticket_id = ? AND status = ?")
                .bind(ALERT_CANCELLED)
                .bind(ticket_id)
                .bind(ALERT_PENDING)
                .execute(self.pool())
                .await?;
        Ok(result.rows_affected())
    }
}
