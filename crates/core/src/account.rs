//! # Account Module
//!
//! One account per user: a spendable normal balance, a locked piggy bank
//! balance and a status. Accounts are never physically deleted.

use crate::amount::Amount;
use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Database-assigned user identifier.
///
/// Ordered, so multi-account operations can lock rows in ascending id order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl UserId {
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Brazilian taxpayer number, 11 digits. Used to address transfer recipients.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cpf(String);

impl Cpf {
    /// Parse a CPF; accepts the bare 11 digits only.
    pub fn parse(raw: &str) -> CoreResult<Self> {
        let raw = raw.trim();
        if raw.len() == 11 && raw.chars().all(|c| c.is_ascii_digit()) {
            Ok(Self(raw.to_string()))
        } else {
            Err(CoreError::InvalidCpf(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cpf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Account status. `DeletedByUser` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    #[default]
    Active,
    DeletedByUser,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::DeletedByUser => "deleted_by_user",
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(AccountStatus::Active),
            "deleted_by_user" => Ok(AccountStatus::DeletedByUser),
            other => Err(CoreError::InvalidStatus(other.to_string())),
        }
    }
}

/// A user's account as held by the account store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub user_id: UserId,
    pub cpf: Cpf,
    pub full_name: String,
    pub email: String,
    /// Spendable balance; never negative after a successful operation
    pub normal_balance: Decimal,
    /// Locked savings; never negative
    pub piggy_bank_balance: Decimal,
    /// Grant credited at registration, kept for reconciliation
    pub opening_balance: Decimal,
    pub status: AccountStatus,
    pub email_confirmed: bool,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }

    /// Whether the normal balance covers `amount`
    pub fn can_spend(&self, amount: Amount) -> bool {
        self.normal_balance >= amount.value()
    }

    /// Whether the piggy bank covers `amount`
    pub fn can_withdraw(&self, amount: Amount) -> bool {
        self.piggy_bank_balance >= amount.value()
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Account {} ({}, status: {}, normal: {}, piggy: {})",
            self.user_id, self.full_name, self.status, self.normal_balance, self.piggy_bank_balance
        )
    }
}
