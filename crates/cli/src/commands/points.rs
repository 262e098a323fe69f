//! Point transfer commands: send, statement

use anyhow::Result;
use points_business::{ServiceContext, StatementService, TransferRequest, TransferService};
use points_core::UserId;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::print_json;

/// Send points by CPF. Every attempt carries an idempotency key; passing the
/// printed key back with `--key` makes a retry safe.
pub async fn send(
    ctx: &ServiceContext,
    sender: UserId,
    recipient_cpf: &str,
    amount: Decimal,
    key: Option<String>,
    json: bool,
) -> Result<()> {
    let key = key.unwrap_or_else(|| Uuid::new_v4().to_string());
    let request = TransferRequest::new(sender, recipient_cpf, amount).with_idempotency_key(&key);

    let receipt = TransferService::new(ctx).transfer(request).await?;

    if json {
        return print_json(&receipt);
    }
    let tx = &receipt.transaction;
    if receipt.replayed {
        println!("↩️  Transfer already recorded, nothing sent again");
    } else {
        println!("✅ Transfer successful!");
    }
    println!("   Transaction: {}", tx.id);
    println!("   From:        {}", tx.from_user);
    println!("   To:          {}", tx.to_user);
    println!("   Amount:      {}", tx.amount);
    println!("   Key:         {}", key);
    Ok(())
}

pub async fn statement(ctx: &ServiceContext, user_id: UserId, json: bool) -> Result<()> {
    let entries = StatementService::new(ctx).point_statement(user_id).await?;

    if json {
        return print_json(&entries);
    }
    if entries.is_empty() {
        println!("No transfers for user {}", user_id);
        return Ok(());
    }

    println!("{:<8} {:<20} {:<8} {:<8} {:>12}", "ID", "Date", "From", "To", "Delta");
    println!("{}", "-".repeat(60));
    for tx in &entries {
        println!(
            "{:<8} {:<20} {:<8} {:<8} {:>12}",
            tx.id,
            tx.created_at.format("%Y-%m-%d %H:%M:%S"),
            tx.from_user,
            tx.to_user,
            tx.delta_for(user_id)
        );
    }
    Ok(())
}
