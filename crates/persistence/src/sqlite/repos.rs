//! Repository implementations for SQLite
//!
//! `AccountRepo` is the account store; `PointTransactionRepo` and
//! `PiggyTransactionRepo` are the append-only ledger. Functions that issue a
//! single statement accept any executor (pool or open transaction); functions
//! that need several statements take a connection so callers can run them
//! inside their own transaction.

use crate::error::{PersistenceError, PersistenceResult};
use crate::sqlite::schema::*;
use chrono::Utc;
use points_core::{
    Account, AccountStatus, Amount, PiggyBankTransaction, PiggyKind, PointTransaction, UserId,
};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Executor, Sqlite, SqliteConnection, SqlitePool};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

// ============================================================================
// Account Repository
// ============================================================================

/// Values for a freshly registered account
#[derive(Debug, Clone)]
pub struct NewAccountRow {
    pub cpf: String,
    pub full_name: String,
    pub email: String,
    pub opening_balance: Decimal,
}

/// Repository for the accounts table
pub struct AccountRepo;

impl AccountRepo {
    /// Insert a new active account; the opening balance becomes the normal balance
    pub async fn insert(
        conn: &mut SqliteConnection,
        new: &NewAccountRow,
    ) -> PersistenceResult<Account> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO accounts
                (cpf, full_name, email, normal_balance, piggy_bank_balance, opening_balance,
                 status, email_confirmed, version, created_at, updated_at)
            VALUES (?, ?, ?, ?, '0', ?, 'active', 0, 0, ?, ?)
            "#,
        )
        .bind(&new.cpf)
        .bind(&new.full_name)
        .bind(&new.email)
        .bind(new.opening_balance.to_string())
        .bind(new.opening_balance.to_string())
        .bind(now)
        .bind(now)
        .execute(&mut *conn)
        .await
        .map_err(|e| unique_violation(e, new))?;

        Self::get_by_id(&mut *conn, UserId(result.last_insert_rowid())).await
    }

    /// Get account by ID
    pub async fn get_by_id<'e, E>(executor: E, user_id: UserId) -> PersistenceResult<Account>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        Self::find_by_id(executor, user_id)
            .await?
            .ok_or_else(|| PersistenceError::not_found("Account", user_id))
    }

    /// Find account by ID
    pub async fn find_by_id<'e, E>(executor: E, user_id: UserId) -> PersistenceResult<Option<Account>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let row = sqlx::query_as::<_, AccountRow>("SELECT * FROM accounts WHERE user_id = ?")
            .bind(user_id.value())
            .fetch_optional(executor)
            .await?;
        row.map(Account::try_from).transpose()
    }

    /// Find the active account registered under `cpf`
    pub async fn find_active_by_cpf<'e, E>(
        executor: E,
        cpf: &str,
    ) -> PersistenceResult<Option<Account>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let row = sqlx::query_as::<_, AccountRow>(
            "SELECT * FROM accounts WHERE cpf = ? AND status = 'active'",
        )
        .bind(cpf)
        .fetch_optional(executor)
        .await?;
        row.map(Account::try_from).transpose()
    }

    /// Take the write lock on an account row by bumping its version.
    ///
    /// Must be the first statement of a write transaction: SQLite then holds
    /// the database write lock until commit, so no other writer can read the
    /// balance in between. Returns false if the account does not exist.
    pub async fn lock<'e, E>(executor: E, user_id: UserId) -> PersistenceResult<bool>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("UPDATE accounts SET version = version + 1 WHERE user_id = ?")
            .bind(user_id.value())
            .execute(executor)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Apply signed deltas to both sub-balances.
    ///
    /// Reads the current row, refuses any result below zero, and writes the new
    /// balances guarded by the version it read. Nothing is written on failure.
    pub async fn apply_delta(
        conn: &mut SqliteConnection,
        user_id: UserId,
        normal_delta: Decimal,
        piggy_delta: Decimal,
    ) -> PersistenceResult<Account> {
        let row = sqlx::query_as::<_, AccountRow>("SELECT * FROM accounts WHERE user_id = ?")
            .bind(user_id.value())
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| PersistenceError::not_found("Account", user_id))?;

        let normal = row.normal_balance()?;
        let piggy = row.piggy_bank_balance()?;
        let new_normal = normal + normal_delta;
        let new_piggy = piggy + piggy_delta;

        if new_normal < Decimal::ZERO {
            return Err(PersistenceError::InsufficientFunds {
                user_id: user_id.value(),
                required: -normal_delta,
                available: normal,
            });
        }
        if new_piggy < Decimal::ZERO {
            return Err(PersistenceError::InsufficientFunds {
                user_id: user_id.value(),
                required: -piggy_delta,
                available: piggy,
            });
        }

        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET normal_balance = ?, piggy_bank_balance = ?, version = version + 1, updated_at = ?
            WHERE user_id = ? AND version = ?
            "#,
        )
        .bind(new_normal.to_string())
        .bind(new_piggy.to_string())
        .bind(Utc::now())
        .bind(user_id.value())
        .bind(row.version)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::Conflict(user_id.value()));
        }

        debug!(%user_id, %normal_delta, %piggy_delta, %new_normal, %new_piggy, "balance updated");
        Self::get_by_id(&mut *conn, user_id).await
    }

    /// Set the account status
    pub async fn update_status<'e, E>(
        executor: E,
        user_id: UserId,
        status: AccountStatus,
    ) -> PersistenceResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("UPDATE accounts SET status = ?, updated_at = ? WHERE user_id = ?")
            .bind(status.as_str())
            .bind(Utc::now())
            .bind(user_id.value())
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("Account", user_id));
        }
        Ok(())
    }

    /// Mark the email address as confirmed
    pub async fn confirm_email<'e, E>(executor: E, user_id: UserId) -> PersistenceResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result =
            sqlx::query("UPDATE accounts SET email_confirmed = 1, updated_at = ? WHERE user_id = ?")
                .bind(Utc::now())
                .bind(user_id.value())
                .execute(executor)
                .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("Account", user_id));
        }
        Ok(())
    }

    /// Count accounts
    pub async fn count<'e, E>(executor: E) -> PersistenceResult<i64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM accounts")
            .fetch_one(executor)
            .await?;
        Ok(row.0)
    }
}

fn unique_violation(err: sqlx::Error, new: &NewAccountRow) -> PersistenceError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let message = db_err.message();
            if message.contains("accounts.cpf") {
                return PersistenceError::already_exists("Account", "cpf", &new.cpf);
            }
            if message.contains("accounts.email") {
                return PersistenceError::already_exists("Account", "email", &new.email);
            }
        }
    }
    err.into()
}

// ============================================================================
// Point Transaction Repository
// ============================================================================

/// Repository for the point_transactions table (append-only)
pub struct PointTransactionRepo;

impl PointTransactionRepo {
    /// Append a transfer record
    pub async fn insert(
        conn: &mut SqliteConnection,
        from: UserId,
        to: UserId,
        amount: Amount,
        idempotency_key: Option<&str>,
    ) -> PersistenceResult<PointTransaction> {
        let result = sqlx::query(
            r#"
            INSERT INTO point_transactions (from_user, to_user, amount, idempotency_key, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(from.value())
        .bind(to.value())
        .bind(amount.to_string())
        .bind(idempotency_key)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        Self::get_by_id(&mut *conn, result.last_insert_rowid()).await
    }

    /// Get transaction by ID
    pub async fn get_by_id<'e, E>(executor: E, id: i64) -> PersistenceResult<PointTransaction>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, PointTransactionRow>("SELECT * FROM point_transactions WHERE id = ?")
            .bind(id)
            .fetch_optional(executor)
            .await?
            .ok_or_else(|| PersistenceError::not_found("PointTransaction", id))?
            .try_into()
    }

    /// Find a transfer previously recorded by `from` under `key`
    pub async fn find_by_key<'e, E>(
        executor: E,
        from: UserId,
        key: &str,
    ) -> PersistenceResult<Option<PointTransaction>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let row = sqlx::query_as::<_, PointTransactionRow>(
            "SELECT * FROM point_transactions WHERE from_user = ? AND idempotency_key = ?",
        )
        .bind(from.value())
        .bind(key)
        .fetch_optional(executor)
        .await?;
        row.map(PointTransaction::try_from).transpose()
    }

    /// Transfers sent or received by `user`, newest first
    pub async fn list_for_user<'e, E>(
        executor: E,
        user: UserId,
    ) -> PersistenceResult<Vec<PointTransaction>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let rows = sqlx::query_as::<_, PointTransactionRow>(
            r#"
            SELECT * FROM point_transactions
            WHERE from_user = ? OR to_user = ?
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user.value())
        .bind(user.value())
        .fetch_all(executor)
        .await?;
        rows.into_iter().map(PointTransaction::try_from).collect()
    }

    /// Total received by `user`
    pub async fn sum_received<'e, E>(executor: E, user: UserId) -> PersistenceResult<Decimal>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sum_amounts(
            executor,
            "SELECT amount FROM point_transactions WHERE to_user = ?",
            user,
        )
        .await
    }

    /// Total sent by `user`
    pub async fn sum_sent<'e, E>(executor: E, user: UserId) -> PersistenceResult<Decimal>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sum_amounts(
            executor,
            "SELECT amount FROM point_transactions WHERE from_user = ?",
            user,
        )
        .await
    }

    /// Count transactions
    pub async fn count<'e, E>(executor: E) -> PersistenceResult<i64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM point_transactions")
            .fetch_one(executor)
            .await?;
        Ok(row.0)
    }
}

// ============================================================================
// Piggy Bank Transaction Repository
// ============================================================================

/// Repository for the piggy_bank_transactions table (append-only)
pub struct PiggyTransactionRepo;

impl PiggyTransactionRepo {
    /// Append a deposit/withdraw record
    pub async fn insert(
        conn: &mut SqliteConnection,
        user: UserId,
        kind: PiggyKind,
        amount: Amount,
    ) -> PersistenceResult<PiggyBankTransaction> {
        let result = sqlx::query(
            "INSERT INTO piggy_bank_transactions (user_id, type, amount, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(user.value())
        .bind(kind.as_str())
        .bind(amount.to_string())
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        sqlx::query_as::<_, PiggyTransactionRow>(
            "SELECT * FROM piggy_bank_transactions WHERE id = ?",
        )
        .bind(result.last_insert_rowid())
        .fetch_one(&mut *conn)
        .await?
        .try_into()
    }

    /// Piggy bank movements of `user`, newest first
    pub async fn list_for_user<'e, E>(
        executor: E,
        user: UserId,
    ) -> PersistenceResult<Vec<PiggyBankTransaction>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let rows = sqlx::query_as::<_, PiggyTransactionRow>(
            r#"
            SELECT * FROM piggy_bank_transactions
            WHERE user_id = ?
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user.value())
        .fetch_all(executor)
        .await?;
        rows.into_iter().map(PiggyBankTransaction::try_from).collect()
    }

    /// Total moved by `user` in one direction
    pub async fn sum_by_kind<'e, E>(
        executor: E,
        user: UserId,
        kind: PiggyKind,
    ) -> PersistenceResult<Decimal>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT amount FROM piggy_bank_transactions WHERE user_id = ? AND type = ?",
        )
        .bind(user.value())
        .bind(kind.as_str())
        .fetch_all(executor)
        .await?;
        total(&rows)
    }

    /// Count transactions
    pub async fn count<'e, E>(executor: E) -> PersistenceResult<i64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM piggy_bank_transactions")
            .fetch_one(executor)
            .await?;
        Ok(row.0)
    }
}

async fn sum_amounts<'e, E>(executor: E, sql: &'static str, user: UserId) -> PersistenceResult<Decimal>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows: Vec<(String,)> = sqlx::query_as(sql)
        .bind(user.value())
        .fetch_all(executor)
        .await?;
    total(&rows)
}

// Decimal TEXT columns are summed here rather than in SQL to stay exact.
fn total(rows: &[(String,)]) -> PersistenceResult<Decimal> {
    rows.iter()
        .try_fold(Decimal::ZERO, |acc, (raw,)| Ok(acc + parse_decimal(raw)?))
}

// ============================================================================
// Database initialization
// ============================================================================

/// Connection pool settings
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub max_connections: u32,
    /// How long a writer waits for the database write lock
    pub busy_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 5,
            busy_timeout: Duration::from_secs(5),
        }
    }
}

/// Open a pool and make sure the schema exists.
///
/// In-memory databases live per connection, so they get a single connection
/// that is never recycled.
pub async fn connect_pool(
    database_url: &str,
    settings: &PoolSettings,
) -> PersistenceResult<SqlitePool> {
    let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");

    let mut options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(settings.busy_timeout);
    if !in_memory {
        options = options.journal_mode(SqliteJournalMode::Wal);
    }

    let pool_options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
    } else {
        SqlitePoolOptions::new().max_connections(settings.max_connections)
    };

    let pool = pool_options.connect_with(options).await?;
    create_schema(&pool).await?;
    Ok(pool)
}

/// Create tables, indexes and append-only triggers if missing
pub async fn create_schema(pool: &SqlitePool) -> PersistenceResult<()> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    Ok(())
}
