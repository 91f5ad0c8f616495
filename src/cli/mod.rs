//! Command-line interface
//!
//! clap-derive surface with one module per command, each pairing a
//! `FooArgs` struct with a `FooCommand` that runs against the engine.
//! `Cli::execute` resolves the data directory, initializes logging,
//! starts the engine, dispatches the command and shuts down.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod args;
pub mod commands;

pub use args::parse_status;

use crate::config::EngineConfig;
use crate::data_paths::DataPaths;
use crate::engine::Engine;
use crate::logging::{init_logging, LogMode, LoggingConfig};

use commands::ack::{AckArgs, AckCommand};
use commands::buy::{BuyArgs, BuyCommand};
use commands::cancel::{CancelArgs, CancelCommand};
use commands::export::{ExportArgs, ExportCommand};
use commands::fill::{FillArgs, FillCommand};
use commands::init::{InitArgs, InitCommand};
use commands::orders::{OrdersArgs, OrdersCommand};
use commands::portfolio::{PortfolioArgs, PortfolioCommand};
use commands::positions::{PositionsArgs, PositionsCommand};
use commands::price::{PriceArgs, PriceCommand};
use commands::sell::{SellArgs, SellCommand};
use commands::trades::{TradesArgs, TradesCommand};
use commands::version::{VersionArgs, VersionCommand};

#[derive(Parser)]
#[command(name = "paperbroker")]
#[command(version)]
#[command(about = "Paper trading broker with exchange-style fees", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Account to operate on
    #[arg(long, global = true, default_value = "default")]
    pub user: String,

    /// Data directory path (default: platform data dir, then ./data)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Machine-readable JSON on stdout; logs go to file only
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose logging
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the account and fund it with opening cash
    Init(InitArgs),

    /// Place a buy order
    Buy(BuyArgs),

    /// Place a sell order
    Sell(SellArgs),

    /// Cancel a pending or open order
    Cancel(CancelArgs),

    /// Fill a resting order at an execution price
    Fill(FillArgs),

    /// Acknowledge a pending limit order as resting
    Ack(AckArgs),

    /// List orders, newest first
    Orders(OrdersArgs),

    /// Show open positions
    Positions(PositionsArgs),

    /// Portfolio summary with allocation and risk metrics
    Portfolio(PortfolioArgs),

    /// Trade history, newest first
    Trades(TradesArgs),

    /// Push a price mark for a symbol
    Price(PriceArgs),

    /// Export trades, orders or positions to CSV
    Export(ExportArgs),

    /// Show version information
    Version(VersionArgs),
}

/// Per-invocation settings shared by every command.
pub struct CommandContext {
    pub user: String,
    pub json: bool,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let data_paths = DataPaths::resolve(self.data_dir.clone());
        let mode = if self.json {
            LogMode::FileOnly
        } else {
            LogMode::ConsoleAndFile
        };
        init_logging(LoggingConfig::new(mode, data_paths.clone(), self.verbose))?;

        let config = EngineConfig::load(Some(&data_paths.config_file()))?;
        let engine = Engine::start(config, data_paths).await?;

        let ctx = CommandContext {
            user: self.user,
            json: self.json,
        };
        let result = match self.command {
            Commands::Init(args) => InitCommand::new(args).execute(&engine, &ctx).await,
            Commands::Buy(args) => BuyCommand::new(args).execute(&engine, &ctx).await,
            Commands::Sell(args) => SellCommand::new(args).execute(&engine, &ctx).await,
            Commands::Cancel(args) => CancelCommand::new(args).execute(&engine, &ctx).await,
            Commands::Fill(args) => FillCommand::new(args).execute(&engine, &ctx).await,
            Commands::Ack(args) => AckCommand::new(args).execute(&engine, &ctx).await,
            Commands::Orders(args) => OrdersCommand::new(args).execute(&engine, &ctx).await,
            Commands::Positions(args) => PositionsCommand::new(args).execute(&engine, &ctx).await,
            Commands::Portfolio(args) => PortfolioCommand::new(args).execute(&engine, &ctx).await,
            Commands::Trades(args) => TradesCommand::new(args).execute(&engine, &ctx).await,
            Commands::Price(args) => PriceCommand::new(args).execute(&engine, &ctx).await,
            Commands::Export(args) => ExportCommand::new(args).execute(&engine, &ctx).await,
            Commands::Version(args) => VersionCommand::new(args).execute(&engine, &ctx).await,
        };

        engine.shutdown().await;
        result
    }
}
