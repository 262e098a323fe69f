//! Database schema definitions
//!
//! Row types for sqlx mapping from SQLite tables, and their conversion into
//! core domain types. Decimals are stored as TEXT.

use crate::error::{PersistenceError, PersistenceResult};
use chrono::{DateTime, Utc};
use points_core::{
    Account, AccountStatus, Amount, Cpf, PiggyBankTransaction, PiggyKind, PointTransaction,
    UserId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// DDL for the whole store. Ledger tables reject UPDATE and DELETE.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS accounts (
    user_id INTEGER PRIMARY KEY AUTOINCREMENT,
    cpf TEXT NOT NULL UNIQUE,
    full_name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    normal_balance TEXT NOT NULL DEFAULT '0',
    piggy_bank_balance TEXT NOT NULL DEFAULT '0',
    opening_balance TEXT NOT NULL DEFAULT '0',
    status TEXT NOT NULL DEFAULT 'active' CHECK (status IN ('active', 'deleted_by_user')),
    email_confirmed INTEGER NOT NULL DEFAULT 0,
    version INTEGER NOT NULL DEFAULT 0,
    created_at DATETIME NOT NULL,
    updated_at DATETIME NOT NULL
);

CREATE TABLE IF NOT EXISTS point_transactions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    from_user INTEGER NOT NULL REFERENCES accounts(user_id),
    to_user INTEGER NOT NULL REFERENCES accounts(user_id),
    amount TEXT NOT NULL,
    idempotency_key TEXT,
    created_at DATETIME NOT NULL,
    UNIQUE (from_user, idempotency_key)
);

CREATE INDEX IF NOT EXISTS idx_point_transactions_from ON point_transactions(from_user);
CREATE INDEX IF NOT EXISTS idx_point_transactions_to ON point_transactions(to_user);

CREATE TABLE IF NOT EXISTS piggy_bank_transactions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES accounts(user_id),
    type TEXT NOT NULL CHECK (type IN ('deposit', 'withdraw')),
    amount TEXT NOT NULL,
    created_at DATETIME NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_piggy_bank_transactions_user ON piggy_bank_transactions(user_id);

CREATE TRIGGER IF NOT EXISTS point_transactions_no_update
BEFORE UPDATE ON point_transactions
BEGIN
    SELECT RAISE(ABORT, 'point_transactions is append-only');
END;

CREATE TRIGGER IF NOT EXISTS point_transactions_no_delete
BEFORE DELETE ON point_transactions
BEGIN
    SELECT RAISE(ABORT, 'point_transactions is append-only');
END;

CREATE TRIGGER IF NOT EXISTS piggy_bank_transactions_no_update
BEFORE UPDATE ON piggy_bank_transactions
BEGIN
    SELECT RAISE(ABORT, 'piggy_bank_transactions is append-only');
END;

CREATE TRIGGER IF NOT EXISTS piggy_bank_transactions_no_delete
BEFORE DELETE ON piggy_bank_transactions
BEGIN
    SELECT RAISE(ABORT, 'piggy_bank_transactions is append-only');
END;
"#;

/// Row type for table `accounts`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct AccountRow {
    pub user_id: i64,
    pub cpf: String,
    pub full_name: String,
    pub email: String,
    pub normal_balance: String,
    pub piggy_bank_balance: String,
    pub opening_balance: String,
    pub status: String,
    pub email_confirmed: bool,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row type for table `point_transactions`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct PointTransactionRow {
    pub id: i64,
    pub from_user: i64,
    pub to_user: i64,
    pub amount: String,
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Row type for table `piggy_bank_transactions`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct PiggyTransactionRow {
    pub id: i64,
    pub user_id: i64,
    #[sqlx(rename = "type")]
    pub kind: String,
    pub amount: String,
    pub created_at: DateTime<Utc>,
}

// === Conversion helpers ===

pub(crate) fn parse_decimal(raw: &str) -> PersistenceResult<Decimal> {
    Decimal::from_str(raw).map_err(|e| PersistenceError::InvalidDecimal(format!("{raw}: {e}")))
}

fn parse_amount(raw: &str) -> PersistenceResult<Amount> {
    Amount::new(parse_decimal(raw)?).map_err(|e| PersistenceError::InvalidDecimal(e.to_string()))
}

impl AccountRow {
    pub fn normal_balance(&self) -> PersistenceResult<Decimal> {
        parse_decimal(&self.normal_balance)
    }

    pub fn piggy_bank_balance(&self) -> PersistenceResult<Decimal> {
        parse_decimal(&self.piggy_bank_balance)
    }
}

impl TryFrom<AccountRow> for Account {
    type Error = PersistenceError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let status = AccountStatus::from_str(&row.status).map_err(|_| {
            PersistenceError::InvalidEnumValue {
                field: "status".to_string(),
                value: row.status.clone(),
            }
        })?;
        let cpf = Cpf::parse(&row.cpf).map_err(|_| PersistenceError::InvalidEnumValue {
            field: "cpf".to_string(),
            value: row.cpf.clone(),
        })?;

        Ok(Account {
            user_id: UserId(row.user_id),
            normal_balance: row.normal_balance()?,
            piggy_bank_balance: row.piggy_bank_balance()?,
            opening_balance: parse_decimal(&row.opening_balance)?,
            cpf,
            full_name: row.full_name,
            email: row.email,
            status,
            email_confirmed: row.email_confirmed,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<PointTransactionRow> for PointTransaction {
    type Error = PersistenceError;

    fn try_from(row: PointTransactionRow) -> Result<Self, Self::Error> {
        Ok(PointTransaction {
            id: row.id,
            from_user: UserId(row.from_user),
            to_user: UserId(row.to_user),
            amount: parse_amount(&row.amount)?,
            idempotency_key: row.idempotency_key,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<PiggyTransactionRow> for PiggyBankTransaction {
    type Error = PersistenceError;

    fn try_from(row: PiggyTransactionRow) -> Result<Self, Self::Error> {
        let kind = PiggyKind::from_str(&row.kind).map_err(|_| PersistenceError::InvalidEnumValue {
            field: "type".to_string(),
            value: row.kind.clone(),
        })?;

        Ok(PiggyBankTransaction {
            id: row.id,
            user_id: UserId(row.user_id),
            kind,
            amount: parse_amount(&row.amount)?,
            created_at: row.created_at,
        })
    }
}
