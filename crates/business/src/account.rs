//! Account operations - registration, login gate, deactivation
//!
//! Every ledger entry point starts with [`AccountService::authorize`]; a
//! deactivated account is refused there, not by incidental side effects.

use crate::error::{LedgerError, LedgerResult};
use crate::services::ServiceContext;
use points_core::{Account, AccountStatus, Cpf, UserId};
use points_persistence::{AccountRepo, NewAccountRow};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Registration input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAccount {
    pub cpf: String,
    pub full_name: String,
    pub email: String,
}

/// Account Service - registration and status gate
pub struct AccountService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> AccountService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Create an active account holding the configured opening balance
    pub async fn register(&self, new: NewAccount) -> LedgerResult<Account> {
        let cpf = Cpf::parse(&new.cpf)?;
        let full_name = new.full_name.trim();
        let email = new.email.trim();
        if full_name.is_empty() {
            return Err(LedgerError::InvalidInput("full name is required".to_string()));
        }
        if email.is_empty() {
            return Err(LedgerError::InvalidInput("email is required".to_string()));
        }

        let row = NewAccountRow {
            cpf: cpf.to_string(),
            full_name: full_name.to_string(),
            email: email.to_string(),
            opening_balance: self.ctx.config().default_normal_balance,
        };

        let mut conn = self.ctx.pool().acquire().await?;
        let account = AccountRepo::insert(&mut conn, &row).await?;

        info!(user_id = %account.user_id, opening_balance = %account.normal_balance, "account registered");
        Ok(account)
    }

    /// Mark the account's email as confirmed
    pub async fn confirm_email(&self, user_id: UserId) -> LedgerResult<()> {
        AccountRepo::confirm_email(self.ctx.pool(), user_id)
            .await
            .map_err(|e| not_found_as(e, user_id))?;
        info!(%user_id, "email confirmed");
        Ok(())
    }

    /// Fetch an account regardless of status
    pub async fn get(&self, user_id: UserId) -> LedgerResult<Account> {
        AccountRepo::find_by_id(self.ctx.pool(), user_id)
            .await?
            .ok_or(LedgerError::AccountNotFound(user_id))
    }

    /// Gate for the login collaborator: the credentials it verified only
    /// grant a session if the account is active (and confirmed, if required)
    pub async fn authorize_login(&self, user_id: UserId) -> LedgerResult<Account> {
        let account = self.authorize(user_id).await?;
        if self.ctx.config().require_email_confirmation && !account.email_confirmed {
            warn!(%user_id, "login refused: email not confirmed");
            return Err(LedgerError::unauthorized("email not confirmed"));
        }
        Ok(account)
    }

    /// Gate for every ledger entry point: the acting account must exist and be active
    pub async fn authorize(&self, user_id: UserId) -> LedgerResult<Account> {
        let account = AccountRepo::find_by_id(self.ctx.pool(), user_id)
            .await?
            .ok_or_else(|| LedgerError::unauthorized("unknown account"))?;

        if !account.is_active() {
            warn!(%user_id, status = %account.status, "request from inactive account refused");
            return Err(LedgerError::unauthorized("account deactivated"));
        }
        Ok(account)
    }

    /// Soft delete: the account keeps its balances and history but can no
    /// longer log in, act, or receive transfers
    pub async fn deactivate(&self, user_id: UserId) -> LedgerResult<Account> {
        let mut account = self.authorize(user_id).await?;

        AccountRepo::update_status(self.ctx.pool(), user_id, AccountStatus::DeletedByUser)
            .await
            .map_err(|e| not_found_as(e, user_id))?;
        account.status = AccountStatus::DeletedByUser;

        info!(%user_id, "account deactivated by user");
        Ok(account)
    }
}

fn not_found_as(err: points_persistence::PersistenceError, user_id: UserId) -> LedgerError {
    if err.is_not_found() {
        LedgerError::AccountNotFound(user_id)
    } else {
        err.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{memory_context, registered};
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_register_grants_default_balance() {
        let ctx = memory_context().await;
        let accounts = AccountService::new(&ctx);

        let account = accounts
            .register(NewAccount {
                cpf: "12345678901".to_string(),
                full_name: "  Ana Souza ".to_string(),
                email: "ana@example.com".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(account.normal_balance, dec!(100));
        assert_eq!(account.piggy_bank_balance, dec!(0));
        assert_eq!(account.full_name, "Ana Souza");
        assert!(account.is_active());
    }

    #[tokio::test]
    async fn test_register_rejects_bad_or_duplicate_input() {
        let ctx = memory_context().await;
        let accounts = AccountService::new(&ctx);
        registered(&ctx, "12345678901", "ana@example.com").await;

        let err = accounts
            .register(NewAccount {
                cpf: "123".to_string(),
                full_name: "Bob".to_string(),
                email: "bob@example.com".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalid_input");

        let err = accounts
            .register(NewAccount {
                cpf: "12345678901".to_string(),
                full_name: "Bob".to_string(),
                email: "bob@example.com".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::AccountExists { ref field, .. } if field == "cpf"));
    }

    #[tokio::test]
    async fn test_login_requires_confirmed_email() {
        let ctx = memory_context().await;
        let accounts = AccountService::new(&ctx);

        let account = accounts
            .register(NewAccount {
                cpf: "12345678901".to_string(),
                full_name: "Ana".to_string(),
                email: "ana@example.com".to_string(),
            })
            .await
            .unwrap();

        let err = accounts.authorize_login(account.user_id).await.unwrap_err();
        assert!(matches!(err, LedgerError::Unauthorized(_)));

        accounts.confirm_email(account.user_id).await.unwrap();
        assert!(accounts.authorize_login(account.user_id).await.is_ok());
    }

    #[tokio::test]
    async fn test_deactivation_blocks_login_and_keeps_balances() {
        let ctx = memory_context().await;
        let accounts = AccountService::new(&ctx);
        let account = registered(&ctx, "12345678901", "ana@example.com").await;

        let deactivated = accounts.deactivate(account.user_id).await.unwrap();
        assert_eq!(deactivated.status, AccountStatus::DeletedByUser);

        assert!(matches!(
            accounts.authorize_login(account.user_id).await,
            Err(LedgerError::Unauthorized(_))
        ));
        assert!(matches!(
            accounts.deactivate(account.user_id).await,
            Err(LedgerError::Unauthorized(_))
        ));

        let stored = accounts.get(account.user_id).await.unwrap();
        assert_eq!(stored.normal_balance, dec!(100));
        assert_eq!(stored.status, AccountStatus::DeletedByUser);
    }

    #[tokio::test]
    async fn test_unknown_account() {
        let ctx = memory_context().await;
        let accounts = AccountService::new(&ctx);

        assert!(matches!(
            accounts.get(UserId(42)).await,
            Err(LedgerError::AccountNotFound(UserId(42)))
        ));
        assert!(matches!(
            accounts.confirm_email(UserId(42)).await,
            Err(LedgerError::AccountNotFound(_))
        ));
        assert!(matches!(
            accounts.authorize(UserId(42)).await,
            Err(LedgerError::Unauthorized(_))
        ));
    }
}
