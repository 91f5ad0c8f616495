use anyhow::Result;
use clap::Args;
use owo_colors::OwoColorize;

use crate::cli::CommandContext;
use crate::engine::Engine;
use crate::portfolio::display::{format_money, pnl_cell, positions_table};
use crate::portfolio::{build_report, position_metrics};

#[derive(Args, Clone)]
pub struct PositionsArgs {
    /// Show a single symbol in detail
    #[arg(long)]
    pub symbol: Option<String>,
}

pub struct PositionsCommand {
    args: PositionsArgs,
}

impl PositionsCommand {
    pub fn new(args: PositionsArgs) -> Self {
        Self { args }
    }

    pub async fn execute(&self, engine: &Engine, ctx: &CommandContext) -> Result<()> {
        let ledger = engine.ledgers().handle(&ctx.user).await?;

        if let Some(symbol) = &self.args.symbol {
            let position = ledger.position(symbol.to_uppercase()).await?;
            let metrics = position_metrics(&position);

            if ctx.json {
                println!("{}", serde_json::to_string_pretty(&metrics)?);
                return Ok(());
            }

            if position.quantity == 0 {
                println!("No open position in {}.", symbol.to_uppercase());
                return Ok(());
            }
            println!("\n🔎 {}", metrics.symbol.bright_white().bold());
            println!("   Quantity: {}", metrics.quantity);
            println!("   Avg price: {:.2}", metrics.avg_price);
            println!("   Invested: {}", format_money(metrics.invested));
            println!("   Value: {}", format_money(metrics.current_value));
            println!(
                "   Unrealized: {} ({:.2}%)",
                pnl_cell(metrics.unrealized_pnl),
                metrics.unrealized_pnl_pct
            );
            println!("   Realized: {}", pnl_cell(metrics.realized_pnl));
            println!("   Day P&L: {}", pnl_cell(metrics.day_pnl));
            return Ok(());
        }

        let account = ledger.account().await?;
        let positions: Vec<_> = account.positions.values().cloned().collect();
        let report = build_report(&positions, account.cash_balance);

        if ctx.json {
            println!("{}", serde_json::to_string_pretty(&report.positions)?);
            return Ok(());
        }

        if report.positions.is_empty() {
            println!("No open positions.");
            return Ok(());
        }

        println!(
            "\n📈 {} ({})\n",
            "Positions".bright_white().bold(),
            report.positions.len()
        );
        println!("{}", positions_table(&report.positions));
        Ok(())
    }
}
