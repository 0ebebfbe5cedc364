use super::{parse_decimal, parse_enum, parse_id, Repository};
use crate::domain::{datetime_from_ms, Bankroll, BankrollId, Currency, UserId, Visibility};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

const BANKROLL_COLUMNS: &str = "b.id AS id, b.user_id AS user_id, b.name AS name, \
     b.starting_capital AS starting_capital, b.visibility AS visibility, \
     b.currency_code AS currency_code, b.currency_label AS currency_label, \
     b.currency_symbol AS currency_symbol, b.is_shareable AS is_shareable, \
     b.shareable_link AS shareable_link, b.created_at_ms AS created_at_ms, \
     b.updated_at_ms AS updated_at_ms";

fn bankroll_from_row(row: &SqliteRow) -> Result<Bankroll, sqlx::Error> {
    let id: BankrollId = parse_id(row, "id")?;
    let id_str = id.to_string();
    let starting_capital: String = row.try_get("starting_capital")?;
    let visibility: String = row.try_get("visibility")?;

    Ok(Bankroll {
        id,
        user_id: parse_id(row, "user_id")?,
        name: row.try_get("name")?,
        starting_capital: parse_decimal(&starting_capital, "starting_capital", &id_str),
        visibility: parse_enum::<Visibility>(&visibility, "visibility", &id_str),
        currency: Currency {
            code: row.try_get("currency_code")?,
            label: row.try_get("currency_label")?,
            symbol: row.try_get("currency_symbol")?,
        },
        is_shareable: row.try_get("is_shareable")?,
        shareable_link: row.try_get("shareable_link")?,
        created_at: datetime_from_ms(row.try_get("created_at_ms")?),
        updated_at: datetime_from_ms(row.try_get("updated_at_ms")?),
    })
}

impl Repository {
    // =========================================================================
    // Bankroll operations
    // =========================================================================

    /// Insert a new bankroll.
    ///
    /// # Errors
    /// Returns an error if the insert fails (e.g. unknown owner, duplicate link).
    pub async fn insert_bankroll(&self, bankroll: &Bankroll) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO bankrolls (
                id, user_id, name, starting_capital, visibility,
                currency_code, currency_label, currency_symbol,
                is_shareable, shareable_link, created_at_ms, updated_at_ms
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(bankroll.id.to_string())
        .bind(bankroll.user_id.to_string())
        .bind(&bankroll.name)
        .bind(bankroll.starting_capital.to_canonical_string())
        .bind(bankroll.visibility.as_str())
        .bind(&bankroll.currency.code)
        .bind(&bankroll.currency.label)
        .bind(&bankroll.currency.symbol)
        .bind(bankroll.is_shareable)
        .bind(bankroll.shareable_link.as_deref())
        .bind(bankroll.created_at.timestamp_millis())
        .bind(bankroll.updated_at.timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_bankroll(&self, id: BankrollId) -> Result<Option<Bankroll>, sqlx::Error> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM bankrolls b WHERE b.id = ?",
            BANKROLL_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(bankroll_from_row).transpose()
    }

    /// Fetch a bankroll only if it belongs to `owner`.
    pub async fn get_owned_bankroll(
        &self,
        id: BankrollId,
        owner: UserId,
    ) -> Result<Option<Bankroll>, sqlx::Error> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM bankrolls b WHERE b.id = ? AND b.user_id = ?",
            BANKROLL_COLUMNS
        ))
        .bind(id.to_string())
        .bind(owner.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(bankroll_from_row).transpose()
    }

    /// Fetch a bankroll by its shareable link, only while sharing is enabled.
    pub async fn get_shared_bankroll(&self, link: &str) -> Result<Option<Bankroll>, sqlx::Error> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM bankrolls b WHERE b.shareable_link = ? AND b.is_shareable = 1",
            BANKROLL_COLUMNS
        ))
        .bind(link)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(bankroll_from_row).transpose()
    }

    /// All bankrolls of a user in creation order.
    pub async fn list_bankrolls_for_user(&self, owner: UserId) -> Result<Vec<Bankroll>, sqlx::Error> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM bankrolls b WHERE b.user_id = ? ORDER BY b.created_at_ms ASC, b.rowid ASC",
            BANKROLL_COLUMNS
        ))
        .bind(owner.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(bankroll_from_row).collect()
    }

    /// The user's public bankroll other than `excluding`, if any.
    pub async fn find_public_bankroll(
        &self,
        owner: UserId,
        excluding: Option<BankrollId>,
    ) -> Result<Option<Bankroll>, sqlx::Error> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {} FROM bankrolls b
            WHERE b.user_id = ? AND b.visibility = 'Public' AND (? IS NULL OR b.id != ?)
            LIMIT 1
            "#,
            BANKROLL_COLUMNS
        ))
        .bind(owner.to_string())
        .bind(excluding.map(|id| id.to_string()))
        .bind(excluding.map(|id| id.to_string()))
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(bankroll_from_row).transpose()
    }

    /// Persist every mutable field of an existing bankroll.
    ///
    /// Returns false when the bankroll does not exist.
    pub async fn update_bankroll(&self, bankroll: &Bankroll) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE bankrolls
            SET name = ?, starting_capital = ?, visibility = ?,
                currency_code = ?, currency_label = ?, currency_symbol = ?,
                is_shareable = ?, shareable_link = ?, updated_at_ms = ?
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(&bankroll.name)
        .bind(bankroll.starting_capital.to_canonical_string())
        .bind(bankroll.visibility.as_str())
        .bind(&bankroll.currency.code)
        .bind(&bankroll.currency.label)
        .bind(&bankroll.currency.symbol)
        .bind(bankroll.is_shareable)
        .bind(bankroll.shareable_link.as_deref())
        .bind(bankroll.updated_at.timestamp_millis())
        .bind(bankroll.id.to_string())
        .bind(bankroll.user_id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete an owned bankroll together with its bets in one transaction.
    ///
    /// Returns false when the bankroll does not exist or is owned by someone else.
    pub async fn delete_bankroll(&self, id: BankrollId, owner: UserId) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let owned = sqlx::query("SELECT 1 FROM bankrolls WHERE id = ? AND user_id = ?")
            .bind(id.to_string())
            .bind(owner.to_string())
            .fetch_optional(&mut *tx)
            .await?
            .is_some();
        if !owned {
            return Ok(false);
        }

        sqlx::query("DELETE FROM bets WHERE bankroll_id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM bankrolls WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Every public bankroll with its owner's username.
    pub async fn list_public_bankrolls_with_owner(
        &self,
    ) -> Result<Vec<(Bankroll, String)>, sqlx::Error> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}, u.username AS owner_username
            FROM bankrolls b
            JOIN users u ON u.id = b.user_id
            WHERE b.visibility = 'Public'
            ORDER BY b.id ASC
            "#,
            BANKROLL_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| Ok((bankroll_from_row(row)?, row.try_get("owner_username")?)))
            .collect()
    }
}
