//! Points CLI - ledger operations from the command line
//!
//! Usage:
//! ```bash
//! points init
//! points register 12345678901 "Alice Silva" alice@example.com
//! points confirm-email 1
//! points deposit 1 25
//! points send 1 10987654321 10.5
//! points balance 1
//! points reconcile 1
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod db;

use commands::{account, balance, piggy, points};

/// Points - reward points ledger with a piggy bank per user
#[derive(Parser)]
#[command(name = "points")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// JSON config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database URL, overrides config and POINTS_DATABASE_URL
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the database and schema
    Init {
        /// Remove an existing database file first
        #[arg(long)]
        force: bool,
    },

    /// Show database status
    Status,

    /// Register a new account
    Register {
        /// CPF, 11 digits
        cpf: String,
        /// Full name
        name: String,
        /// Email address
        email: String,
    },

    /// Mark the account's email as confirmed
    ConfirmEmail { user_id: i64 },

    /// Check whether the account may log in
    Login { user_id: i64 },

    /// Move points from the normal balance into the piggy bank
    Deposit { user_id: i64, amount: Decimal },

    /// Move points from the piggy bank back to the normal balance
    Withdraw { user_id: i64, amount: Decimal },

    /// Send points to another user by CPF
    Send {
        /// Sender user id
        user_id: i64,
        /// Recipient CPF
        recipient_cpf: String,
        /// Points to send
        amount: Decimal,
        /// Reuse the key printed by an earlier attempt to retry it safely
        #[arg(long)]
        key: Option<String>,
    },

    /// Show normal and piggy bank balances
    Balance { user_id: i64 },

    /// Compare stored balances with the ledger
    Reconcile { user_id: i64 },

    /// List point transfers, newest first
    Statement { user_id: i64 },

    /// List piggy bank movements, newest first
    PiggyStatement { user_id: i64 },

    /// Deactivate the account
    Deactivate { user_id: i64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = db::load_config(cli.config.as_deref(), cli.db.as_deref())?;
    let json = cli.json;

    match cli.command {
        Commands::Init { force } => {
            db::init_database(&config, force).await?;
        }

        Commands::Status => {
            db::show_status(&config).await?;
        }

        Commands::Register { cpf, name, email } => {
            let ctx = db::connect(config).await?;
            account::register(&ctx, cpf, name, email, json).await?;
        }

        Commands::ConfirmEmail { user_id } => {
            let ctx = db::connect(config).await?;
            account::confirm_email(&ctx, user_id.into()).await?;
        }

        Commands::Login { user_id } => {
            let ctx = db::connect(config).await?;
            account::login(&ctx, user_id.into(), json).await?;
        }

        Commands::Deactivate { user_id } => {
            let ctx = db::connect(config).await?;
            account::deactivate(&ctx, user_id.into()).await?;
        }

        Commands::Deposit { user_id, amount } => {
            let ctx = db::connect(config).await?;
            piggy::deposit(&ctx, user_id.into(), amount, json).await?;
        }

        Commands::Withdraw { user_id, amount } => {
            let ctx = db::connect(config).await?;
            piggy::withdraw(&ctx, user_id.into(), amount, json).await?;
        }

        Commands::PiggyStatement { user_id } => {
            let ctx = db::connect(config).await?;
            piggy::statement(&ctx, user_id.into(), json).await?;
        }

        Commands::Send {
            user_id,
            recipient_cpf,
            amount,
            key,
        } => {
            let ctx = db::connect(config).await?;
            points::send(&ctx, user_id.into(), &recipient_cpf, amount, key, json).await?;
        }

        Commands::Statement { user_id } => {
            let ctx = db::connect(config).await?;
            points::statement(&ctx, user_id.into(), json).await?;
        }

        Commands::Balance { user_id } => {
            let ctx = db::connect(config).await?;
            balance::show(&ctx, user_id.into(), json).await?;
        }

        Commands::Reconcile { user_id } => {
            let ctx = db::connect(config).await?;
            balance::reconcile(&ctx, user_id.into(), json).await?;
        }
    }

    Ok(())
}
