//! Piggy bank commands: deposit, withdraw, piggy-statement

use anyhow::Result;
use points_business::{BalanceReconciler, ServiceContext, StatementService, TransferService};
use points_core::{PiggyBankTransaction, UserId};
use rust_decimal::Decimal;

use super::print_json;

pub async fn deposit(ctx: &ServiceContext, user_id: UserId, amount: Decimal, json: bool) -> Result<()> {
    let tx = TransferService::new(ctx).deposit(user_id, amount).await?;
    report(ctx, &tx, json).await
}

pub async fn withdraw(ctx: &ServiceContext, user_id: UserId, amount: Decimal, json: bool) -> Result<()> {
    let tx = TransferService::new(ctx).withdraw(user_id, amount).await?;
    report(ctx, &tx, json).await
}

async fn report(ctx: &ServiceContext, tx: &PiggyBankTransaction, json: bool) -> Result<()> {
    if json {
        return print_json(tx);
    }
    let balances = BalanceReconciler::new(ctx).balances(tx.user_id).await?;
    println!("✅ Piggy bank {} successful!", tx.kind);
    println!("   Transaction: {}", tx.id);
    println!("   Amount:      {}", tx.amount);
    println!("   Normal:      {}", balances.normal);
    println!("   Piggy bank:  {}", balances.piggy);
    Ok(())
}

pub async fn statement(ctx: &ServiceContext, user_id: UserId, json: bool) -> Result<()> {
    let entries = StatementService::new(ctx).piggy_statement(user_id).await?;

    if json {
        return print_json(&entries);
    }
    if entries.is_empty() {
        println!("No piggy bank movements for user {}", user_id);
        return Ok(());
    }

    println!("{:<8} {:<20} {:<10} {:>12}", "ID", "Date", "Type", "Amount");
    println!("{}", "-".repeat(53));
    for tx in &entries {
        println!(
            "{:<8} {:<20} {:<10} {:>12}",
            tx.id,
            tx.created_at.format("%Y-%m-%d %H:%M:%S"),
            tx.kind,
            tx.amount
        );
    }
    Ok(())
}
