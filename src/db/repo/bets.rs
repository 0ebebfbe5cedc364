use super::{page_offset, parse_decimal, parse_enum, parse_id, PageQuery, Repository};
use crate::domain::{
    datetime_from_ms, BankrollId, Bet, BetId, BetStatus, UserId, VerificationStatus,
};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

const BET_COLUMNS: &str = "t.id AS id, t.user_id AS user_id, t.bankroll_id AS bankroll_id, \
     t.date_ms AS date_ms, t.sport AS sport, t.label AS label, t.stake AS stake, \
     t.odds AS odds, t.cashout_amount AS cashout_amount, \
     t.verification_code AS verification_code, t.is_verified AS is_verified, \
     t.verification_status AS verification_status, t.status AS status, \
     t.created_at_ms AS created_at_ms, t.updated_at_ms AS updated_at_ms";

/// A bet joined with its owner and bankroll for the moderation queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminBetRow {
    #[serde(flatten)]
    pub bet: Bet,
    pub owner_username: String,
    pub owner_email: String,
    pub bankroll_name: String,
}

fn bet_from_row(row: &SqliteRow) -> Result<Bet, sqlx::Error> {
    let id: BetId = parse_id(row, "id")?;
    let id_str = id.to_string();
    let stake: String = row.try_get("stake")?;
    let odds: String = row.try_get("odds")?;
    let cashout_amount: Option<String> = row.try_get("cashout_amount")?;
    let verification_status: String = row.try_get("verification_status")?;
    let status: String = row.try_get("status")?;

    Ok(Bet {
        id,
        user_id: parse_id(row, "user_id")?,
        bankroll_id: parse_id(row, "bankroll_id")?,
        date: datetime_from_ms(row.try_get("date_ms")?),
        sport: row.try_get("sport")?,
        label: row.try_get("label")?,
        stake: parse_decimal(&stake, "stake", &id_str),
        odds: parse_decimal(&odds, "odds", &id_str),
        cashout_amount: cashout_amount
            .as_deref()
            .map(|raw| parse_decimal(raw, "cashout_amount", &id_str)),
        verification_code: row.try_get("verification_code")?,
        is_verified: row.try_get("is_verified")?,
        verification_status: parse_enum::<VerificationStatus>(
            &verification_status,
            "verification_status",
            &id_str,
        ),
        status: BetStatus::from(status),
        created_at: datetime_from_ms(row.try_get("created_at_ms")?),
        updated_at: datetime_from_ms(row.try_get("updated_at_ms")?),
    })
}

impl Repository {
    // =========================================================================
    // Bet operations
    // =========================================================================

    /// Insert a new bet.
    ///
    /// # Errors
    /// Returns an error if the insert fails (e.g. unknown bankroll).
    pub async fn insert_bet(&self, bet: &Bet) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO bets (
                id, user_id, bankroll_id, date_ms, sport, label, stake, odds,
                cashout_amount, verification_code, is_verified, verification_status,
                status, created_at_ms, updated_at_ms
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(bet.id.to_string())
        .bind(bet.user_id.to_string())
        .bind(bet.bankroll_id.to_string())
        .bind(bet.date.timestamp_millis())
        .bind(&bet.sport)
        .bind(&bet.label)
        .bind(bet.stake.to_canonical_string())
        .bind(bet.odds.to_canonical_string())
        .bind(bet.cashout_amount.map(|d| d.to_canonical_string()))
        .bind(&bet.verification_code)
        .bind(bet.is_verified)
        .bind(bet.verification_status.as_str())
        .bind(bet.status.as_str())
        .bind(bet.created_at.timestamp_millis())
        .bind(bet.updated_at.timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_bet(&self, id: BetId) -> Result<Option<Bet>, sqlx::Error> {
        let row = sqlx::query(&format!("SELECT {} FROM bets t WHERE t.id = ?", BET_COLUMNS))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(bet_from_row).transpose()
    }

    /// Fetch a bet only if it belongs to `owner`.
    pub async fn get_owned_bet(&self, id: BetId, owner: UserId) -> Result<Option<Bet>, sqlx::Error> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM bets t WHERE t.id = ? AND t.user_id = ?",
            BET_COLUMNS
        ))
        .bind(id.to_string())
        .bind(owner.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(bet_from_row).transpose()
    }

    /// All bets of a bankroll in the order they were recorded.
    pub async fn list_bets_for_bankroll(&self, bankroll: BankrollId) -> Result<Vec<Bet>, sqlx::Error> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM bets t WHERE t.bankroll_id = ? ORDER BY t.rowid ASC",
            BET_COLUMNS
        ))
        .bind(bankroll.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(bet_from_row).collect()
    }

    /// Bets of a bankroll recorded by `owner`, in recording order.
    pub async fn list_owned_bets_for_bankroll(
        &self,
        bankroll: BankrollId,
        owner: UserId,
    ) -> Result<Vec<Bet>, sqlx::Error> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM bets t WHERE t.bankroll_id = ? AND t.user_id = ? ORDER BY t.rowid ASC",
            BET_COLUMNS
        ))
        .bind(bankroll.to_string())
        .bind(owner.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(bet_from_row).collect()
    }

    /// Bets of a bankroll dated in `[from_ms, to_ms)`.
    pub async fn list_bets_for_bankroll_between(
        &self,
        bankroll: BankrollId,
        from_ms: i64,
        to_ms: i64,
    ) -> Result<Vec<Bet>, sqlx::Error> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {} FROM bets t
            WHERE t.bankroll_id = ? AND t.date_ms >= ? AND t.date_ms < ?
            ORDER BY t.rowid ASC
            "#,
            BET_COLUMNS
        ))
        .bind(bankroll.to_string())
        .bind(from_ms)
        .bind(to_ms)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(bet_from_row).collect()
    }

    /// Persist every mutable field of an existing bet.
    ///
    /// Returns false when the bet does not exist.
    pub async fn update_bet(&self, bet: &Bet) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE bets
            SET date_ms = ?, sport = ?, label = ?, stake = ?, odds = ?,
                cashout_amount = ?, verification_code = ?, is_verified = ?,
                verification_status = ?, status = ?, updated_at_ms = ?
            WHERE id = ?
            "#,
        )
        .bind(bet.date.timestamp_millis())
        .bind(&bet.sport)
        .bind(&bet.label)
        .bind(bet.stake.to_canonical_string())
        .bind(bet.odds.to_canonical_string())
        .bind(bet.cashout_amount.map(|d| d.to_canonical_string()))
        .bind(&bet.verification_code)
        .bind(bet.is_verified)
        .bind(bet.verification_status.as_str())
        .bind(bet.status.as_str())
        .bind(bet.updated_at.timestamp_millis())
        .bind(bet.id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete an owned bet. Returns false when nothing matched.
    pub async fn delete_bet(&self, id: BetId, owner: UserId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM bets WHERE id = ? AND user_id = ?")
            .bind(id.to_string())
            .bind(owner.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Record a moderation decision. Both verification fields are written
    /// together; returns the updated bet, or None if it does not exist.
    pub async fn set_bet_verification(
        &self,
        id: BetId,
        is_verified: bool,
        status: VerificationStatus,
    ) -> Result<Option<Bet>, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE bets
            SET is_verified = ?, verification_status = ?, updated_at_ms = ?
            WHERE id = ?
            "#,
        )
        .bind(is_verified)
        .bind(status.as_str())
        .bind(chrono::Utc::now().timestamp_millis())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_bet(id).await
    }

    /// Page through all bets, optionally filtered by a case-insensitive
    /// substring of sport or label. Returns the page and the total match count.
    pub async fn search_bets(&self, query: &PageQuery) -> Result<(Vec<AdminBetRow>, i64), sqlx::Error> {
        let pattern = query.like_pattern();

        let total: i64 = sqlx::query(
            r#"
            SELECT COUNT(*) AS total FROM bets t
            WHERE (? IS NULL OR t.sport LIKE ? ESCAPE '\' OR t.label LIKE ? ESCAPE '\')
            "#,
        )
        .bind(pattern.as_deref())
        .bind(pattern.as_deref())
        .bind(pattern.as_deref())
        .fetch_one(&self.pool)
        .await?
        .try_get("total")?;

        let (limit, offset) = page_offset(query)?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT {}, u.username AS owner_username, u.email AS owner_email,
                   b.name AS bankroll_name
            FROM bets t
            JOIN users u ON u.id = t.user_id
            JOIN bankrolls b ON b.id = t.bankroll_id
            WHERE (? IS NULL OR t.sport LIKE ? ESCAPE '\' OR t.label LIKE ? ESCAPE '\')
            ORDER BY t.created_at_ms DESC, t.rowid DESC
            LIMIT ? OFFSET ?
            "#,
            BET_COLUMNS
        ))
        .bind(pattern.as_deref())
        .bind(pattern.as_deref())
        .bind(pattern.as_deref())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let bets = rows
            .iter()
            .map(|row| {
                Ok(AdminBetRow {
                    bet: bet_from_row(row)?,
                    owner_username: row.try_get("owner_username")?,
                    owner_email: row.try_get("owner_email")?,
                    bankroll_name: row.try_get("bankroll_name")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?;

        Ok((bets, total))
    }
}
