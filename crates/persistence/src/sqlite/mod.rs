//! SQLite persistence module
//!
//! Repository pattern for SQLite database access.

pub mod repos;
pub mod schema;

pub use repos::{
    connect_pool, create_schema, AccountRepo, NewAccountRow, PiggyTransactionRepo,
    PointTransactionRepo,
};
pub use schema::{AccountRow, PiggyTransactionRow, PointTransactionRow};
