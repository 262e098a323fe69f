//! Account commands: register, confirm-email, login, deactivate

use anyhow::Result;
use points_business::{AccountService, NewAccount, ServiceContext};
use points_core::UserId;

use super::print_json;

pub async fn register(
    ctx: &ServiceContext,
    cpf: String,
    full_name: String,
    email: String,
    json: bool,
) -> Result<()> {
    let account = AccountService::new(ctx)
        .register(NewAccount {
            cpf,
            full_name,
            email,
        })
        .await?;

    if json {
        return print_json(&account);
    }
    println!("✅ Registered account:");
    println!("   User ID: {}", account.user_id);
    println!("   CPF:     {}", account.cpf);
    println!("   Name:    {}", account.full_name);
    println!("   Email:   {}", account.email);
    println!("   Balance: {}", account.normal_balance);
    if ctx.config().require_email_confirmation {
        println!("   Run 'points confirm-email {}' before logging in", account.user_id);
    }
    Ok(())
}

pub async fn confirm_email(ctx: &ServiceContext, user_id: UserId) -> Result<()> {
    AccountService::new(ctx).confirm_email(user_id).await?;
    println!("✅ Email confirmed for user {}", user_id);
    Ok(())
}

pub async fn login(ctx: &ServiceContext, user_id: UserId, json: bool) -> Result<()> {
    let account = AccountService::new(ctx).authorize_login(user_id).await?;

    if json {
        return print_json(&account);
    }
    println!("✅ Login allowed for {}", account.full_name);
    Ok(())
}

pub async fn deactivate(ctx: &ServiceContext, user_id: UserId) -> Result<()> {
    let account = AccountService::new(ctx).deactivate(user_id).await?;
    println!("✅ Account {} deactivated", account.user_id);
    println!("   Balances are kept but the account can no longer act or receive points");
    Ok(())
}
