//! Command handlers, one module per area

pub mod account;
pub mod balance;
pub mod piggy;
pub mod points;

use anyhow::Result;
use serde::Serialize;

/// Print a value as pretty JSON
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
