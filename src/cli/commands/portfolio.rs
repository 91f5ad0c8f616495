use anyhow::Result;
use clap::Args;
use owo_colors::OwoColorize;

use crate::cli::CommandContext;
use crate::engine::Engine;
use crate::portfolio::build_report;
use crate::portfolio::display::{positions_table, print_report};

#[derive(Args, Clone)]
pub struct PortfolioArgs {
    /// Skip the positions table, show totals only
    #[arg(long)]
    pub totals_only: bool,
}

pub struct PortfolioCommand {
    args: PortfolioArgs,
}

impl PortfolioCommand {
    pub fn new(args: PortfolioArgs) -> Self {
        Self { args }
    }

    pub async fn execute(&self, engine: &Engine, ctx: &CommandContext) -> Result<()> {
        let ledger = engine.ledgers().handle(&ctx.user).await?;
        let account = ledger.account().await?;
        let positions: Vec<_> = account.positions.values().cloned().collect();
        let report = build_report(&positions, account.cash_balance);

        if ctx.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }

        println!(
            "\n👤 {}",
            format!("Portfolio for {}", account.user_id).bright_white().bold()
        );
        if !self.args.totals_only && !report.positions.is_empty() {
            println!("\n{}", positions_table(&report.positions));
        }
        print_report(&report);
        Ok(())
    }
}
