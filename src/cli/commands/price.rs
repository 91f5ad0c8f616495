use anyhow::Result;
use clap::Args;
use owo_colors::OwoColorize;
use rust_decimal::Decimal;
use tracing::info;

use crate::cli::CommandContext;
use crate::engine::Engine;
use crate::portfolio::display::pnl_cell;
use crate::portfolio::position_metrics;

#[derive(Args, Clone)]
pub struct PriceArgs {
    /// Stock symbol
    pub symbol: String,

    /// Latest traded price
    pub price: Decimal,

    /// Previous close, for day-change tracking
    #[arg(long)]
    pub prev_close: Option<Decimal>,
}

pub struct PriceCommand {
    args: PriceArgs,
}

impl PriceCommand {
    pub fn new(args: PriceArgs) -> Self {
        Self { args }
    }

    pub async fn execute(&self, engine: &Engine, ctx: &CommandContext) -> Result<()> {
        info!("Pushing price {} for {}", self.args.price, self.args.symbol);
        let ledger = engine.ledgers().handle(&ctx.user).await?;
        let updated = ledger
            .apply_price(
                self.args.symbol.to_uppercase(),
                self.args.price,
                self.args.prev_close,
            )
            .await?;

        let Some(position) = updated else {
            if ctx.json {
                println!("null");
            } else {
                println!(
                    "Symbol {} was never traded; nothing to mark.",
                    self.args.symbol.to_uppercase()
                );
            }
            return Ok(());
        };

        let metrics = position_metrics(&position);
        if ctx.json {
            println!("{}", serde_json::to_string_pretty(&metrics)?);
            return Ok(());
        }

        println!(
            "💹 {} marked at {:.2}",
            metrics.symbol.bright_white().bold(),
            self.args.price
        );
        println!(
            "   Unrealized: {} ({:.2}%)",
            pnl_cell(metrics.unrealized_pnl),
            metrics.unrealized_pnl_pct
        );
        println!("   Day P&L: {}", pnl_cell(metrics.day_pnl));
        Ok(())
    }
}
