use anyhow::Result;
use clap::Args;
use owo_colors::OwoColorize;
use rust_decimal::Decimal;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::cli::CommandContext;
use crate::engine::Engine;
use crate::portfolio::display::{format_money, pnl_cell};

#[derive(Args, Clone)]
pub struct FillArgs {
    /// Order ID
    pub order_id: Uuid,

    /// Execution price per share
    pub price: Decimal,
}

pub struct FillCommand {
    args: FillArgs,
}

impl FillCommand {
    pub fn new(args: FillArgs) -> Self {
        Self { args }
    }

    pub async fn execute(&self, engine: &Engine, ctx: &CommandContext) -> Result<()> {
        info!(
            "Filling order {} at {}",
            self.args.order_id, self.args.price
        );
        let (order, outcome) = engine
            .orders()
            .fill(self.args.order_id, self.args.price)
            .await?;

        if ctx.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "order": order,
                    "outcome": outcome,
                }))?
            );
            return Ok(());
        }

        println!("✅ Order {} {}", order.id, "filled".bright_green().bold());
        println!(
            "🎯 {} {} x {} @ {:.2}",
            order.side,
            order.symbol.bright_white(),
            order.quantity,
            self.args.price
        );
        println!("💸 Fees: {}", format_money(outcome.trade.fees()));
        if let Some(total) = order.total {
            println!("💰 Total: {}", format_money(total).bright_yellow());
        }
        if !outcome.trade.realized_pnl.is_zero() {
            println!("📈 Realized P&L: {}", pnl_cell(outcome.trade.realized_pnl));
        }
        println!("🏦 Cash balance: {}", format_money(outcome.cash_balance));
        Ok(())
    }
}
