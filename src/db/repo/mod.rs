//! Repository layer for database operations.
//!
//! This module provides the `Repository` struct for all database operations.
//! Methods are organized across submodules by domain:
//! - `mod.rs` - User and subscription operations
//! - `bankrolls.rs` - Bankroll operations
//! - `bets.rs` - Bet operations, moderation and admin search

mod bankrolls;
mod bets;

pub use bets::AdminBetRow;

use crate::domain::{
    datetime_from_ms, Decimal, Role, Subscription, SubscriptionStatus, User, UserId,
};
use serde::Serialize;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use tracing::warn;

/// Repository for database operations.
pub struct Repository {
    pool: SqlitePool,
}

/// Admin listing parameters. `page` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    pub search: Option<String>,
    pub limit: i64,
    pub page: i64,
}

impl PageQuery {
    /// Rows to skip before this page, or `None` when it does not fit in an i64.
    pub fn offset(&self) -> Option<i64> {
        self.page.max(1).checked_sub(1)?.checked_mul(self.limit.max(1))
    }

    /// `%term%` for LIKE with wildcard characters escaped. Blank terms match everything.
    fn like_pattern(&self) -> Option<String> {
        let term = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let escaped = term
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        Some(format!("%{}%", escaped))
    }
}

/// `LIMIT` and `OFFSET` for a page query.
fn page_offset(query: &PageQuery) -> Result<(i64, i64), sqlx::Error> {
    let offset = query
        .offset()
        .ok_or_else(|| sqlx::Error::Protocol(format!("page {} is out of range", query.page)))?;
    Ok((query.limit.max(1), offset))
}

/// A user with the size of their footprint, for the admin user list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserRow {
    #[serde(flatten)]
    pub user: User,
    pub bankroll_count: i64,
    pub bet_count: i64,
}

/// Parse an identifier column, failing the row when it is malformed.
fn parse_id<T>(row: &SqliteRow, column: &str) -> Result<T, sqlx::Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.try_get(column)?;
    T::from_str(&raw).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

/// Parse a stored decimal column, falling back to zero with a warning.
fn parse_decimal(raw: &str, column: &str, id: &str) -> Decimal {
    Decimal::from_str(raw).unwrap_or_else(|e| {
        warn!(
            id = %id,
            column = column,
            value = %raw,
            error = %e,
            "Failed to parse stored decimal, using default"
        );
        Decimal::default()
    })
}

/// Parse a stored enum column, falling back to its default with a warning.
fn parse_enum<T>(raw: &str, column: &str, id: &str) -> T
where
    T: FromStr<Err = String> + Default,
{
    T::from_str(raw).unwrap_or_else(|e| {
        warn!(id = %id, column = column, error = %e, "Unknown stored value, using default");
        T::default()
    })
}

fn user_from_row(row: &SqliteRow) -> Result<User, sqlx::Error> {
    let id: UserId = parse_id(row, "id")?;
    let id_str = id.to_string();
    let role: String = row.try_get("role")?;
    let status: String = row.try_get("subscription_status")?;
    let period_end: Option<i64> = row.try_get("current_period_end_ms")?;

    Ok(User {
        id,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        role: parse_enum::<Role>(&role, "role", &id_str),
        subscription: Subscription {
            status: parse_enum::<SubscriptionStatus>(&status, "subscription_status", &id_str),
            plan_id: row.try_get("plan_id")?,
            current_period_end: period_end.map(datetime_from_ms),
            customer_id: row.try_get("customer_id")?,
            subscription_id: row.try_get("subscription_id")?,
        },
        created_at: datetime_from_ms(row.try_get("created_at_ms")?),
    })
}

const USER_COLUMNS: &str = "id, username, email, role, subscription_status, plan_id, \
     current_period_end_ms, customer_id, subscription_id, created_at_ms";

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    /// Round-trip a trivial query to confirm the database is reachable.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    // =========================================================================
    // User operations
    // =========================================================================

    /// Insert a new user.
    ///
    /// # Errors
    /// Returns an error if the insert fails, including username/email conflicts.
    pub async fn insert_user(&self, user: &User) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO users (
                id, username, email, role, subscription_status, plan_id,
                current_period_end_ms, customer_id, subscription_id, created_at_ms
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.id.to_string())
        .bind(&user.username)
        .bind(&user.email)
        .bind(user.role.as_str())
        .bind(user.subscription.status.as_str())
        .bind(user.subscription.plan_id.as_deref())
        .bind(
            user.subscription
                .current_period_end
                .map(|t| t.timestamp_millis()),
        )
        .bind(user.subscription.customer_id.as_deref())
        .bind(user.subscription.subscription_id.as_deref())
        .bind(user.created_at.timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_user(&self, id: UserId) -> Result<Option<User>, sqlx::Error> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM users WHERE email = ?",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    /// Look up the user billed under a payment-provider customer id.
    pub async fn find_user_by_customer_id(
        &self,
        customer_id: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM users WHERE customer_id = ?",
            USER_COLUMNS
        ))
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    /// Page through users, optionally filtered by a case-insensitive
    /// substring of username or email. Returns the page and the total match count.
    pub async fn search_users(
        &self,
        query: &PageQuery,
    ) -> Result<(Vec<AdminUserRow>, i64), sqlx::Error> {
        let pattern = query.like_pattern();

        let total: i64 = sqlx::query(
            r#"
            SELECT COUNT(*) AS total FROM users
            WHERE (? IS NULL OR username LIKE ? ESCAPE '\' OR email LIKE ? ESCAPE '\')
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
            SELECT {},
                   (SELECT COUNT(*) FROM bankrolls b WHERE b.user_id = users.id) AS bankroll_count,
                   (SELECT COUNT(*) FROM bets t WHERE t.user_id = users.id) AS bet_count
            FROM users
            WHERE (? IS NULL OR username LIKE ? ESCAPE '\' OR email LIKE ? ESCAPE '\')
            ORDER BY created_at_ms ASC, rowid ASC
            LIMIT ? OFFSET ?
            "#,
            USER_COLUMNS
        ))
        .bind(pattern.as_deref())
        .bind(pattern.as_deref())
        .bind(pattern.as_deref())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let users = rows
            .iter()
            .map(|row| {
                Ok(AdminUserRow {
                    user: user_from_row(row)?,
                    bankroll_count: row.try_get("bankroll_count")?,
                    bet_count: row.try_get("bet_count")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?;

        Ok((users, total))
    }

    /// Overwrite username and email. Returns false when no such user exists.
    ///
    /// # Errors
    /// Returns a unique violation when the username or email belongs to someone else.
    pub async fn update_user_profile(
        &self,
        id: UserId,
        username: &str,
        email: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET username = ?, email = ? WHERE id = ?")
            .bind(username)
            .bind(email)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM users WHERE username = ?",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    /// Returns false when no such user exists.
    pub async fn update_user_role(&self, id: UserId, role: Role) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET role = ? WHERE id = ?")
            .bind(role.as_str())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Make sure an admin account exists for `email`, promoting an existing
    /// user or creating a new one.
    pub async fn ensure_admin(&self, username: &str, email: &str) -> Result<User, sqlx::Error> {
        if let Some(mut user) = self.find_user_by_email(email).await? {
            if !user.is_admin() {
                self.update_user_role(user.id, Role::Admin).await?;
                user.role = Role::Admin;
            }
            return Ok(user);
        }

        let user = User {
            id: UserId::generate(),
            username: username.to_string(),
            email: email.to_string(),
            role: Role::Admin,
            subscription: Subscription::default(),
            created_at: chrono::Utc::now(),
        };
        self.insert_user(&user).await?;
        Ok(user)
    }

    /// Delete a user. Their bankrolls and bets go with them.
    pub async fn delete_user(&self, id: UserId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Overwrite the stored subscription state of a user.
    pub async fn update_subscription(
        &self,
        id: UserId,
        subscription: &Subscription,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET subscription_status = ?, plan_id = ?, current_period_end_ms = ?,
                customer_id = ?, subscription_id = ?
            WHERE id = ?
            "#,
        )
        .bind(subscription.status.as_str())
        .bind(subscription.plan_id.as_deref())
        .bind(subscription.current_period_end.map(|t| t.timestamp_millis()))
        .bind(subscription.customer_id.as_deref())
        .bind(subscription.subscription_id.as_deref())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::Repository;
    use crate::db::migrations::init_db;
    use crate::domain::{Role, Subscription, User, UserId};
    use tempfile::TempDir;

    pub async fn setup_test_db() -> (Repository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        (Repository::new(pool), temp_dir)
    }

    pub async fn seed_user(repo: &Repository, username: &str) -> User {
        let user = User {
            id: UserId::generate(),
            username: username.to_string(),
            email: format!("{}@example.com", username),
            role: Role::User,
            subscription: Subscription::default(),
            created_at: chrono::Utc::now(),
        };
        repo.insert_user(&user).await.expect("insert_user failed");
        user
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{seed_user, setup_test_db};
    use super::*;
    use chrono::{TimeZone, Utc};

    #[tokio::test]
    async fn test_insert_and_get_user() {
        let (repo, _temp) = setup_test_db().await;
        let user = seed_user(&repo, "alice").await;

        let loaded = repo.get_user(user.id).await.unwrap().expect("user missing");
        assert_eq!(loaded.username, "alice");
        assert_eq!(loaded.role, Role::User);
        assert_eq!(loaded.subscription.status, SubscriptionStatus::Incomplete);

        let by_email = repo.find_user_by_email("alice@example.com").await.unwrap();
        assert_eq!(by_email.map(|u| u.id), Some(user.id));
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let (repo, _temp) = setup_test_db().await;
        let user = seed_user(&repo, "alice").await;

        let clash = User {
            id: UserId::generate(),
            email: "other@example.com".to_string(),
            ..user
        };
        assert!(repo.insert_user(&clash).await.is_err());
    }

    #[tokio::test]
    async fn test_update_role_and_delete() {
        let (repo, _temp) = setup_test_db().await;
        let user = seed_user(&repo, "bob").await;

        assert!(repo.update_user_role(user.id, Role::Admin).await.unwrap());
        assert!(repo.get_user(user.id).await.unwrap().unwrap().is_admin());

        assert!(repo.delete_user(user.id).await.unwrap());
        assert!(!repo.delete_user(user.id).await.unwrap());
        assert!(repo.get_user(user.id).await.unwrap().is_none());
        assert!(!repo.update_user_role(user.id, Role::User).await.unwrap());
    }

    #[tokio::test]
    async fn test_subscription_update_and_customer_lookup() {
        let (repo, _temp) = setup_test_db().await;
        let user = seed_user(&repo, "carol").await;
        let period_end = Utc.with_ymd_and_hms(2025, 1, 31, 0, 0, 0).unwrap();

        let subscription = Subscription {
            status: SubscriptionStatus::Active,
            plan_id: Some("price_basic".to_string()),
            current_period_end: Some(period_end),
            customer_id: Some("cus_123".to_string()),
            subscription_id: Some("sub_456".to_string()),
        };
        assert!(repo.update_subscription(user.id, &subscription).await.unwrap());

        let found = repo
            .find_user_by_customer_id("cus_123")
            .await
            .unwrap()
            .expect("user missing");
        assert_eq!(found.id, user.id);
        assert_eq!(found.subscription, subscription);
        assert!(repo.find_user_by_customer_id("cus_nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_role_falls_back_to_user() {
        let (repo, _temp) = setup_test_db().await;
        let user = seed_user(&repo, "dave").await;

        sqlx::query("UPDATE users SET role = 'superuser' WHERE id = ?")
            .bind(user.id.to_string())
            .execute(&repo.pool)
            .await
            .unwrap();

        let loaded = repo.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(loaded.role, Role::User);
    }

    #[test]
    fn test_page_query_offset_and_pattern() {
        let query = PageQuery {
            search: Some(" 50%_x ".to_string()),
            limit: 10,
            page: 3,
        };
        assert_eq!(query.offset(), Some(20));
        assert_eq!(query.like_pattern().as_deref(), Some("%50\\%\\_x%"));

        let far = PageQuery {
            search: Some("  ".to_string()),
            limit: 100,
            page: i64::MAX,
        };
        assert_eq!(far.offset(), None);
        assert!(far.like_pattern().is_none());
    }

    #[tokio::test]
    async fn test_search_users_counts_and_paginates() {
        let (repo, _temp) = setup_test_db().await;
        let alice = seed_user(&repo, "alice").await;
        seed_user(&repo, "bob").await;
        seed_user(&repo, "Alicia").await;

        let bankroll = crate::db::repo::bankrolls::test_support::new_bankroll(
            &alice,
            "Main",
            crate::domain::Visibility::Private,
        );
        repo.insert_bankroll(&bankroll).await.unwrap();

        let (page, total) = repo
            .search_users(&PageQuery {
                search: Some("ALI".to_string()),
                limit: 1,
                page: 1,
            })
            .await
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].user.id, alice.id);
        assert_eq!(page[0].bankroll_count, 1);
        assert_eq!(page[0].bet_count, 0);

        let (by_email, total) = repo
            .search_users(&PageQuery {
                search: Some("bob@EXAMPLE".to_string()),
                limit: 10,
                page: 1,
            })
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(by_email[0].user.username, "bob");
    }

    #[tokio::test]
    async fn test_update_user_profile() {
        let (repo, _temp) = setup_test_db().await;
        let alice = seed_user(&repo, "alice").await;
        let bob = seed_user(&repo, "bob").await;

        assert!(repo
            .update_user_profile(alice.id, "alice2", "alice2@example.com")
            .await
            .unwrap());
        let loaded = repo.get_user(alice.id).await.unwrap().unwrap();
        assert_eq!(loaded.username, "alice2");
        assert_eq!(loaded.email, "alice2@example.com");
        assert_eq!(
            repo.find_user_by_username("alice2").await.unwrap().map(|u| u.id),
            Some(alice.id)
        );

        let clash = repo
            .update_user_profile(alice.id, "bob", "alice2@example.com")
            .await;
        assert!(matches!(clash, Err(sqlx::Error::Database(db)) if db.is_unique_violation()));
        assert!(!repo
            .update_user_profile(UserId::generate(), "ghost", "ghost@example.com")
            .await
            .unwrap());
        assert_eq!(repo.get_user(bob.id).await.unwrap().unwrap().username, "bob");
    }

    #[tokio::test]
    async fn test_ensure_admin_creates_then_promotes() {
        let (repo, _temp) = setup_test_db().await;

        let created = repo.ensure_admin("root", "root@example.com").await.unwrap();
        assert!(created.is_admin());
        let again = repo.ensure_admin("root", "root@example.com").await.unwrap();
        assert_eq!(again.id, created.id);

        let erin = seed_user(&repo, "erin").await;
        let promoted = repo.ensure_admin("ignored", &erin.email).await.unwrap();
        assert_eq!(promoted.id, erin.id);
        assert_eq!(promoted.username, "erin");
        assert_eq!(repo.get_user(erin.id).await.unwrap().unwrap().role, Role::Admin);
        assert!(repo.ping().await.is_ok());
    }
}
