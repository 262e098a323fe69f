//! Balance commands: balance, reconcile

use anyhow::Result;
use points_business::{BalanceReconciler, ServiceContext};
use points_core::UserId;

use super::print_json;

pub async fn show(ctx: &ServiceContext, user_id: UserId, json: bool) -> Result<()> {
    let balances = BalanceReconciler::new(ctx).balances(user_id).await?;

    if json {
        return print_json(&balances);
    }
    println!("💰 Balances for user {}", user_id);
    println!("   Normal:     {}", balances.normal);
    println!("   Piggy bank: {}", balances.piggy);
    println!("   Total:      {}", balances.total());
    Ok(())
}

pub async fn reconcile(ctx: &ServiceContext, user_id: UserId, json: bool) -> Result<()> {
    let rec = BalanceReconciler::new(ctx).reconcile(user_id).await?;

    if json {
        return print_json(&rec);
    }
    println!("🔎 Reconciliation for user {}", user_id);
    println!("   {:<12} {:>12} {:>12} {:>12}", "", "Stored", "Ledger", "Drift");
    println!(
        "   {:<12} {:>12} {:>12} {:>12}",
        "Normal", rec.stored.normal, rec.derived.normal, rec.drift.normal
    );
    println!(
        "   {:<12} {:>12} {:>12} {:>12}",
        "Piggy bank", rec.stored.piggy, rec.derived.piggy, rec.drift.piggy
    );
    if rec.is_consistent() {
        println!("✅ Ledger matches stored balances");
    } else {
        println!("⚠️  Ledger does not match stored balances");
    }
    Ok(())
}
