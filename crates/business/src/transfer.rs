//! Transfer engine - peer transfers and piggy bank movements
//!
//! Each operation runs in one database transaction whose first statements
//! lock the affected account rows in ascending user id order. The balance
//! check, the balance writes and the ledger append then happen under that
//! lock, and any error drops the transaction, rolling every step back.

use crate::account::AccountService;
use crate::error::{LedgerError, LedgerResult};
use crate::services::ServiceContext;
use points_core::{Amount, PiggyBankTransaction, PiggyKind, PointTransaction, UserId};
use points_persistence::{AccountRepo, PiggyTransactionRepo, PointTransactionRepo};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::{info, warn};

/// A peer transfer as submitted by the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRequest {
    pub sender: UserId,
    pub recipient_cpf: String,
    pub amount: Decimal,
    /// Retries carrying the same key return the original transfer
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

impl TransferRequest {
    pub fn new(sender: UserId, recipient_cpf: &str, amount: Decimal) -> Self {
        Self {
            sender,
            recipient_cpf: recipient_cpf.to_string(),
            amount,
            idempotency_key: None,
        }
    }

    pub fn with_idempotency_key(mut self, key: &str) -> Self {
        self.idempotency_key = Some(key.to_string());
        self
    }
}

/// Outcome of a peer transfer
#[derive(Debug, Clone, Serialize)]
pub struct TransferReceipt {
    pub transaction: PointTransaction,
    /// True when an earlier transfer with the same idempotency key was returned
    pub replayed: bool,
}

/// Transfer Service - transfer, deposit, withdraw
pub struct TransferService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> TransferService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Move points from the sender's normal balance to the active account
    /// registered under `recipient_cpf`, recording one PointTransaction
    pub async fn transfer(&self, request: TransferRequest) -> LedgerResult<TransferReceipt> {
        let amount = Amount::new(request.amount)?;
        let sender = AccountService::new(self.ctx).authorize(request.sender).await?;
        let key = request.idempotency_key.as_deref();

        if let Some(key) = key {
            if let Some(existing) =
                PointTransactionRepo::find_by_key(self.ctx.pool(), sender.user_id, key).await?
            {
                let original = AccountRepo::get_by_id(self.ctx.pool(), existing.to_user).await?;
                let same_recipient = original.cpf.as_str() == request.recipient_cpf.trim();
                return replay(existing, same_recipient, amount, key);
            }
        }

        let recipient = AccountRepo::find_active_by_cpf(self.ctx.pool(), &request.recipient_cpf)
            .await?
            .ok_or_else(|| LedgerError::RecipientNotFound(request.recipient_cpf.clone()))?;

        if recipient.user_id == sender.user_id {
            return Err(LedgerError::SelfTransfer);
        }
        if !sender.can_spend(amount) {
            return Err(LedgerError::insufficient_funds(
                amount.value(),
                sender.normal_balance,
            ));
        }

        let mut tx = self.ctx.db().begin().await?;
        lock_in_order(&mut tx, &[sender.user_id, recipient.user_id]).await?;

        // Another request with the same key may have committed while we waited.
        if let Some(key) = key {
            if let Some(existing) =
                PointTransactionRepo::find_by_key(&mut *tx, sender.user_id, key).await?
            {
                let same_recipient = existing.to_user == recipient.user_id;
                return replay(existing, same_recipient, amount, key);
            }
        }

        // Status may have changed between lookup and lock.
        let sender_now = AccountRepo::get_by_id(&mut *tx, sender.user_id).await?;
        if !sender_now.is_active() {
            return Err(LedgerError::unauthorized("account deactivated"));
        }
        let recipient_now = AccountRepo::get_by_id(&mut *tx, recipient.user_id).await?;
        if !recipient_now.is_active() {
            return Err(LedgerError::RecipientNotFound(request.recipient_cpf));
        }

        AccountRepo::apply_delta(&mut tx, sender.user_id, amount.debit(), Decimal::ZERO).await?;
        AccountRepo::apply_delta(&mut tx, recipient.user_id, amount.value(), Decimal::ZERO).await?;
        let transaction =
            PointTransactionRepo::insert(&mut tx, sender.user_id, recipient.user_id, amount, key)
                .await?;

        tx.commit().await?;

        info!(
            tx_id = transaction.id,
            from = %sender.user_id,
            to = %recipient.user_id,
            %amount,
            "points transferred"
        );
        Ok(TransferReceipt {
            transaction,
            replayed: false,
        })
    }

    /// Move points from the normal balance into the piggy bank
    pub async fn deposit(&self, user_id: UserId, amount: Decimal) -> LedgerResult<PiggyBankTransaction> {
        self.move_piggy(user_id, PiggyKind::Deposit, amount).await
    }

    /// Move points from the piggy bank back to the normal balance
    pub async fn withdraw(&self, user_id: UserId, amount: Decimal) -> LedgerResult<PiggyBankTransaction> {
        self.move_piggy(user_id, PiggyKind::Withdraw, amount).await
    }

    async fn move_piggy(
        &self,
        user_id: UserId,
        kind: PiggyKind,
        amount: Decimal,
    ) -> LedgerResult<PiggyBankTransaction> {
        let amount = Amount::new(amount)?;
        let account = AccountService::new(self.ctx).authorize(user_id).await?;

        let (covered, available) = match kind {
            PiggyKind::Deposit => (account.can_spend(amount), account.normal_balance),
            PiggyKind::Withdraw => (account.can_withdraw(amount), account.piggy_bank_balance),
        };
        if !covered {
            warn!(%user_id, %kind, %amount, "piggy bank movement refused");
            return Err(LedgerError::insufficient_funds(amount.value(), available));
        }

        let mut tx = self.ctx.db().begin().await?;
        lock_in_order(&mut tx, &[user_id]).await?;

        let account = AccountRepo::get_by_id(&mut *tx, user_id).await?;
        if !account.is_active() {
            return Err(LedgerError::unauthorized("account deactivated"));
        }

        let (normal_delta, piggy_delta) = kind.deltas(amount);
        let updated = AccountRepo::apply_delta(&mut tx, user_id, normal_delta, piggy_delta)
            .await
            .inspect_err(|e| {
                if e.is_insufficient_funds() {
                    warn!(%user_id, %kind, %amount, "piggy bank movement refused");
                }
            })?;
        let transaction = PiggyTransactionRepo::insert(&mut tx, user_id, kind, amount).await?;

        tx.commit().await?;

        info!(
            tx_id = transaction.id,
            %user_id,
            %kind,
            %amount,
            normal = %updated.normal_balance,
            piggy = %updated.piggy_bank_balance,
            "piggy bank updated"
        );
        Ok(transaction)
    }
}

/// Return the recorded transfer for a retried key, provided the retry asks
/// for the same recipient and amount
fn replay(
    existing: PointTransaction,
    same_recipient: bool,
    amount: Amount,
    key: &str,
) -> LedgerResult<TransferReceipt> {
    if !same_recipient || existing.amount != amount {
        warn!(tx_id = existing.id, idempotency_key = key, "idempotency key reused for a different transfer");
        return Err(LedgerError::IdempotencyConflict(key.to_string()));
    }

    info!(tx_id = existing.id, idempotency_key = key, "transfer replayed");
    Ok(TransferReceipt {
        transaction: existing,
        replayed: true,
    })
}

/// Lock account rows in ascending id order so two transactions touching the
/// same pair can never wait on each other
async fn lock_in_order(conn: &mut SqliteConnection, user_ids: &[UserId]) -> LedgerResult<()> {
    let mut ordered = user_ids.to_vec();
    ordered.sort();
    ordered.dedup();

    for user_id in ordered {
        if !AccountRepo::lock(&mut *conn, user_id).await? {
            return Err(LedgerError::AccountNotFound(user_id));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{memory_context, registered};
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_transfer_moves_points_and_records_entry() {
        let ctx = memory_context().await;
        let a = registered(&ctx, "11111111111", "a@example.com").await;
        let b = registered(&ctx, "22222222222", "b@example.com").await;
        let transfers = TransferService::new(&ctx);

        let receipt = transfers
            .transfer(TransferRequest::new(a.user_id, "22222222222", dec!(1)))
            .await
            .unwrap();

        assert!(!receipt.replayed);
        assert_eq!(receipt.transaction.from_user, a.user_id);
        assert_eq!(receipt.transaction.to_user, b.user_id);
        assert_eq!(receipt.transaction.amount.value(), dec!(1));

        let accounts = AccountService::new(&ctx);
        assert_eq!(accounts.get(a.user_id).await.unwrap().normal_balance, dec!(99));
        assert_eq!(accounts.get(b.user_id).await.unwrap().normal_balance, dec!(101));
    }

    #[tokio::test]
    async fn test_transfer_rejections_leave_state_unchanged() {
        let ctx = memory_context().await;
        let a = registered(&ctx, "11111111111", "a@example.com").await;
        registered(&ctx, "22222222222", "b@example.com").await;
        let transfers = TransferService::new(&ctx);

        for bad in [dec!(0), dec!(-1)] {
            let err = transfers
                .transfer(TransferRequest::new(a.user_id, "22222222222", bad))
                .await
                .unwrap_err();
            assert!(matches!(err, LedgerError::InvalidAmount(_)));
        }

        let err = transfers
            .transfer(TransferRequest::new(a.user_id, "22222222222", dec!(1000)))
            .await
            .unwrap_err();
        assert!(err.is_insufficient_funds());

        let err = transfers
            .transfer(TransferRequest::new(a.user_id, "99999999999", dec!(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::RecipientNotFound(_)));

        let err = transfers
            .transfer(TransferRequest::new(a.user_id, "11111111111", dec!(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::SelfTransfer));

        let sender = AccountService::new(&ctx).get(a.user_id).await.unwrap();
        assert_eq!(sender.normal_balance, dec!(100));
        assert_eq!(PointTransactionRepo::count(ctx.pool()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_deactivated_recipient_and_sender() {
        let ctx = memory_context().await;
        let a = registered(&ctx, "11111111111", "a@example.com").await;
        let b = registered(&ctx, "22222222222", "b@example.com").await;
        let transfers = TransferService::new(&ctx);
        let accounts = AccountService::new(&ctx);

        accounts.deactivate(b.user_id).await.unwrap();
        let err = transfers
            .transfer(TransferRequest::new(a.user_id, "22222222222", dec!(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::RecipientNotFound(_)));

        accounts.deactivate(a.user_id).await.unwrap();
        assert!(matches!(
            transfers.deposit(a.user_id, dec!(1)).await,
            Err(LedgerError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_idempotent_retry() {
        let ctx = memory_context().await;
        let a = registered(&ctx, "11111111111", "a@example.com").await;
        registered(&ctx, "22222222222", "b@example.com").await;
        let transfers = TransferService::new(&ctx);

        let request =
            TransferRequest::new(a.user_id, "22222222222", dec!(10)).with_idempotency_key("req-1");
        let first = transfers.transfer(request.clone()).await.unwrap();
        let second = transfers.transfer(request).await.unwrap();

        assert!(!first.replayed);
        assert!(second.replayed);
        assert_eq!(first.transaction.id, second.transaction.id);
        assert_eq!(
            AccountService::new(&ctx).get(a.user_id).await.unwrap().normal_balance,
            dec!(90)
        );
    }

    #[tokio::test]
    async fn test_amount_below_point_precision_rejected() {
        let ctx = memory_context().await;
        let a = registered(&ctx, "11111111111", "a@example.com").await;
        let b = registered(&ctx, "22222222222", "b@example.com").await;
        let transfers = TransferService::new(&ctx);
        let tiny = dec!(0.0000000000000000000000000001);

        let err = transfers
            .transfer(TransferRequest::new(a.user_id, "22222222222", tiny))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(_)));
        assert!(matches!(
            transfers.deposit(a.user_id, tiny).await,
            Err(LedgerError::InvalidAmount(_))
        ));

        let accounts = AccountService::new(&ctx);
        assert_eq!(accounts.get(a.user_id).await.unwrap().normal_balance, dec!(100));
        assert_eq!(accounts.get(b.user_id).await.unwrap().normal_balance, dec!(100));
        assert_eq!(PointTransactionRepo::count(ctx.pool()).await.unwrap(), 0);
        assert_eq!(PiggyTransactionRepo::count(ctx.pool()).await.unwrap(), 0);

        // smallest accepted amount moves exactly that much
        transfers
            .transfer(TransferRequest::new(a.user_id, "22222222222", dec!(0.0001)))
            .await
            .unwrap();
        assert_eq!(accounts.get(a.user_id).await.unwrap().normal_balance, dec!(99.9999));
        assert_eq!(accounts.get(b.user_id).await.unwrap().normal_balance, dec!(100.0001));
    }

    #[tokio::test]
    async fn test_idempotency_key_reused_for_different_transfer() {
        let ctx = memory_context().await;
        let a = registered(&ctx, "11111111111", "a@example.com").await;
        let b = registered(&ctx, "22222222222", "b@example.com").await;
        let c = registered(&ctx, "33333333333", "c@example.com").await;
        let transfers = TransferService::new(&ctx);

        transfers
            .transfer(TransferRequest::new(a.user_id, "22222222222", dec!(10)).with_idempotency_key("k"))
            .await
            .unwrap();

        let err = transfers
            .transfer(TransferRequest::new(a.user_id, "33333333333", dec!(50)).with_idempotency_key("k"))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::IdempotencyConflict(ref key) if key == "k"));
        assert_eq!(err.code(), "idempotency_conflict");

        let err = transfers
            .transfer(TransferRequest::new(a.user_id, "22222222222", dec!(50)).with_idempotency_key("k"))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::IdempotencyConflict(_)));

        let accounts = AccountService::new(&ctx);
        assert_eq!(accounts.get(a.user_id).await.unwrap().normal_balance, dec!(90));
        assert_eq!(accounts.get(b.user_id).await.unwrap().normal_balance, dec!(110));
        assert_eq!(accounts.get(c.user_id).await.unwrap().normal_balance, dec!(100));
        assert_eq!(PointTransactionRepo::count(ctx.pool()).await.unwrap(), 1);

        // the same key from another sender is an independent transfer
        let receipt = transfers
            .transfer(TransferRequest::new(c.user_id, "22222222222", dec!(5)).with_idempotency_key("k"))
            .await
            .unwrap();
        assert!(!receipt.replayed);
    }

    #[tokio::test]
    async fn test_deposit_then_withdraw_restores_balances() {
        let ctx = memory_context().await;
        let a = registered(&ctx, "11111111111", "a@example.com").await;
        let transfers = TransferService::new(&ctx);
        let accounts = AccountService::new(&ctx);
        transfers.deposit(a.user_id, dec!(7.25)).await.unwrap();

        for amount in [dec!(1), dec!(2.5), dec!(0.0001), dec!(37.1234), dec!(92.75)] {
            let before = accounts.get(a.user_id).await.unwrap();

            transfers.deposit(a.user_id, amount).await.unwrap();
            transfers.withdraw(a.user_id, amount).await.unwrap();

            let after = accounts.get(a.user_id).await.unwrap();
            assert_eq!(
                (after.normal_balance, after.piggy_bank_balance),
                (before.normal_balance, before.piggy_bank_balance),
                "round trip of {amount}"
            );
        }
    }

    #[tokio::test]
    async fn test_piggy_bank_scenario() {
        let ctx = memory_context().await;
        let a = registered(&ctx, "11111111111", "a@example.com").await;
        let transfers = TransferService::new(&ctx);
        let accounts = AccountService::new(&ctx);

        let deposit = transfers.deposit(a.user_id, dec!(2)).await.unwrap();
        assert_eq!(deposit.kind, PiggyKind::Deposit);
        let account = accounts.get(a.user_id).await.unwrap();
        assert_eq!((account.normal_balance, account.piggy_bank_balance), (dec!(98), dec!(2)));

        let withdraw = transfers.withdraw(a.user_id, dec!(1)).await.unwrap();
        assert_eq!(withdraw.kind, PiggyKind::Withdraw);
        let account = accounts.get(a.user_id).await.unwrap();
        assert_eq!((account.normal_balance, account.piggy_bank_balance), (dec!(99), dec!(1)));

        assert!(transfers.withdraw(a.user_id, dec!(5)).await.unwrap_err().is_insufficient_funds());
        assert!(transfers.deposit(a.user_id, dec!(500)).await.unwrap_err().is_insufficient_funds());
        assert!(matches!(
            transfers.deposit(a.user_id, dec!(-1)).await,
            Err(LedgerError::InvalidAmount(_))
        ));

        let account = accounts.get(a.user_id).await.unwrap();
        assert_eq!((account.normal_balance, account.piggy_bank_balance), (dec!(99), dec!(1)));
        assert_eq!(PiggyTransactionRepo::count(ctx.pool()).await.unwrap(), 2);
    }
}
