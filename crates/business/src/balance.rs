//! Balance view and reconciliation
//!
//! Reads come straight from the stored account balances. `reconcile` replays
//! the ledger tables from the opening balance and reports any difference.

use crate::account::AccountService;
use crate::error::LedgerResult;
use crate::services::ServiceContext;
use points_core::{PiggyKind, UserId};
use points_persistence::{AccountRepo, PiggyTransactionRepo, PointTransactionRepo};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::warn;

/// Both sub-balances of one account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Balances {
    pub normal: Decimal,
    pub piggy: Decimal,
}

impl Balances {
    pub fn total(&self) -> Decimal {
        self.normal + self.piggy
    }
}

/// Stored balances next to the balances the ledger implies
#[derive(Debug, Clone, Serialize)]
pub struct Reconciliation {
    pub user_id: UserId,
    pub stored: Balances,
    pub derived: Balances,
    /// stored minus derived, per sub-balance
    pub drift: Balances,
}

impl Reconciliation {
    pub fn is_consistent(&self) -> bool {
        self.drift.normal.is_zero() && self.drift.piggy.is_zero()
    }
}

/// Balance Reconciler - balance reads and ledger audit
pub struct BalanceReconciler<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> BalanceReconciler<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Stored normal balance, the authoritative figure
    pub async fn normal_balance(&self, user_id: UserId) -> LedgerResult<Decimal> {
        Ok(self.balances(user_id).await?.normal)
    }

    /// Stored piggy bank balance, the authoritative figure
    pub async fn piggy_balance(&self, user_id: UserId) -> LedgerResult<Decimal> {
        Ok(self.balances(user_id).await?.piggy)
    }

    /// Stored balances of an active account
    pub async fn balances(&self, user_id: UserId) -> LedgerResult<Balances> {
        let account = AccountService::new(self.ctx).authorize(user_id).await?;
        Ok(Balances {
            normal: account.normal_balance,
            piggy: account.piggy_bank_balance,
        })
    }

    /// Replay the ledger for `user_id` and compare it with the stored balances.
    ///
    /// All reads share one transaction so the comparison sees a single
    /// snapshot. Nothing is written.
    pub async fn reconcile(&self, user_id: UserId) -> LedgerResult<Reconciliation> {
        AccountService::new(self.ctx).authorize(user_id).await?;

        let mut tx = self.ctx.db().begin().await?;
        let account = AccountRepo::get_by_id(&mut *tx, user_id).await?;
        let received = PointTransactionRepo::sum_received(&mut *tx, user_id).await?;
        let sent = PointTransactionRepo::sum_sent(&mut *tx, user_id).await?;
        let deposits = PiggyTransactionRepo::sum_by_kind(&mut *tx, user_id, PiggyKind::Deposit).await?;
        let withdrawals =
            PiggyTransactionRepo::sum_by_kind(&mut *tx, user_id, PiggyKind::Withdraw).await?;
        tx.rollback().await?;

        let stored = Balances {
            normal: account.normal_balance,
            piggy: account.piggy_bank_balance,
        };
        let derived = Balances {
            normal: account.opening_balance + received - sent - deposits + withdrawals,
            piggy: deposits - withdrawals,
        };
        let drift = Balances {
            normal: stored.normal - derived.normal,
            piggy: stored.piggy - derived.piggy,
        };

        let reconciliation = Reconciliation {
            user_id,
            stored,
            derived,
            drift,
        };
        if !reconciliation.is_consistent() {
            warn!(
                %user_id,
                normal_drift = %drift.normal,
                piggy_drift = %drift.piggy,
                "ledger does not match stored balances"
            );
        }
        Ok(reconciliation)
    }
}
