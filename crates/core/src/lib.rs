//! # Points Core
//!
//! Domain types for the points ledger. No I/O lives here.
//!
//! - [`Amount`]: strictly positive quantity of points moved by an operation
//! - [`Account`]: a user's normal and piggy bank balances plus status
//! - [`PointTransaction`] / [`PiggyBankTransaction`]: immutable ledger entries

pub mod account;
pub mod amount;
pub mod error;
pub mod ledger;

pub use account::{Account, AccountStatus, Cpf, UserId};
pub use amount::{Amount, MAX_SCALE};
pub use error::{CoreError, CoreResult};
pub use ledger::{PiggyBankTransaction, PiggyKind, PointTransaction};
