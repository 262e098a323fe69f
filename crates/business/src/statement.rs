//! Transaction history per user

use crate::account::AccountService;
use crate::error::LedgerResult;
use crate::services::ServiceContext;
use points_core::{PiggyBankTransaction, PointTransaction, UserId};
use points_persistence::{PiggyTransactionRepo, PointTransactionRepo};

pub struct StatementService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> StatementService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Transfers sent or received by the user, newest first
    pub async fn point_statement(&self, user_id: UserId) -> LedgerResult<Vec<PointTransaction>> {
        AccountService::new(self.ctx).authorize(user_id).await?;
        Ok(PointTransactionRepo::list_for_user(self.ctx.pool(), user_id).await?)
    }

    /// Piggy bank deposits and withdrawals of the user, newest first
    pub async fn piggy_statement(&self, user_id: UserId) -> LedgerResult<Vec<PiggyBankTransaction>> {
        AccountService::new(self.ctx).authorize(user_id).await?;
        Ok(PiggyTransactionRepo::list_for_user(self.ctx.pool(), user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use crate::services::test_support::{memory_context, registered};
    use crate::transfer::{TransferRequest, TransferService};
    use points_core::PiggyKind;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_statements_newest_first() {
        let ctx = memory_context().await;
        let a = registered(&ctx, "11111111111", "a@example.com").await;
        let b = registered(&ctx, "22222222222", "b@example.com").await;
        let c = registered(&ctx, "33333333333", "c@example.com").await;
        let transfers = TransferService::new(&ctx);

        transfers
            .transfer(TransferRequest::new(a.user_id, "22222222222", dec!(1)))
            .await
            .unwrap();
        transfers
            .transfer(TransferRequest::new(b.user_id, "11111111111", dec!(2)))
            .await
            .unwrap();
        transfers
            .transfer(TransferRequest::new(b.user_id, "33333333333", dec!(3)))
            .await
            .unwrap();
        transfers.deposit(a.user_id, dec!(4)).await.unwrap();
        transfers.withdraw(a.user_id, dec!(1)).await.unwrap();

        let statements = StatementService::new(&ctx);
        let points = statements.point_statement(a.user_id).await.unwrap();
        assert_eq!(points.len(), 2);
        assert!(points[0].id > points[1].id);
        assert!(points.iter().all(|tx| tx.involves(a.user_id)));
        assert_eq!(points[0].delta_for(a.user_id), dec!(2));
        assert_eq!(points[1].delta_for(a.user_id), dec!(-1));

        let piggy = statements.piggy_statement(a.user_id).await.unwrap();
        assert_eq!(piggy.len(), 2);
        assert_eq!(piggy[0].kind, PiggyKind::Withdraw);
        assert_eq!(piggy[1].kind, PiggyKind::Deposit);

        assert!(statements.piggy_statement(c.user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_statement_requires_active_account() {
        let ctx = memory_context().await;
        let a = registered(&ctx, "11111111111", "a@example.com").await;
        AccountService::new(&ctx).deactivate(a.user_id).await.unwrap();

        let err = StatementService::new(&ctx)
            .point_statement(a.user_id)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Unauthorized(_)));
    }
}
