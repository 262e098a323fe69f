//! # Points Business
//!
//! Ledger operations on top of the persistence layer:
//!
//! - [`AccountService`]: registration, login gate, deactivation
//! - [`TransferService`]: peer transfers and piggy bank deposit/withdraw
//! - [`BalanceReconciler`]: balance view and ledger reconciliation
//! - [`StatementService`]: transaction history per user
//!
//! The stored account balances are authoritative. The ledger tables are an
//! audit trail; [`BalanceReconciler::reconcile`] replays them to detect drift.

pub mod account;
pub mod balance;
pub mod config;
pub mod error;
pub mod services;
pub mod statement;
pub mod transfer;

pub use account::{AccountService, NewAccount};
pub use balance::{BalanceReconciler, Balances, Reconciliation};
pub use config::{ConfigError, LedgerConfig};
pub use error::{LedgerError, LedgerResult};
pub use services::ServiceContext;
pub use statement::StatementService;
pub use transfer::{TransferReceipt, TransferRequest, TransferService};
