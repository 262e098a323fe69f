//! Ledger entries - immutable records of point movements
//!
//! `PointTransaction` moves points between two users. `PiggyBankTransaction`
//! moves points between one user's normal balance and piggy bank.

use crate::account::UserId;
use crate::amount::Amount;
use crate::error::CoreError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Peer-to-peer transfer record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointTransaction {
    pub id: i64,
    pub from_user: UserId,
    pub to_user: UserId,
    pub amount: Amount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PointTransaction {
    pub fn involves(&self, user: UserId) -> bool {
        self.from_user == user || self.to_user == user
    }

    /// Effect of this entry on `user`'s normal balance
    pub fn delta_for(&self, user: UserId) -> Decimal {
        if self.to_user == user {
            self.amount.value()
        } else if self.from_user == user {
            self.amount.debit()
        } else {
            Decimal::ZERO
        }
    }
}

/// Direction of a piggy bank movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PiggyKind {
    /// Normal balance -> piggy bank
    Deposit,
    /// Piggy bank -> normal balance
    Withdraw,
}

impl PiggyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PiggyKind::Deposit => "deposit",
            PiggyKind::Withdraw => "withdraw",
        }
    }

    /// (normal delta, piggy delta) for an amount moved in this direction
    pub fn deltas(&self, amount: Amount) -> (Decimal, Decimal) {
        match self {
            PiggyKind::Deposit => (amount.debit(), amount.value()),
            PiggyKind::Withdraw => (amount.value(), amount.debit()),
        }
    }
}

impl fmt::Display for PiggyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PiggyKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(PiggyKind::Deposit),
            "withdraw" => Ok(PiggyKind::Withdraw),
            other => Err(CoreError::InvalidPiggyKind(other.to_string())),
        }
    }
}

/// Deposit/withdraw record within one account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiggyBankTransaction {
    pub id: i64,
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub kind: PiggyKind,
    pub amount: Amount,
    pub created_at: DateTime<Utc>,
}
