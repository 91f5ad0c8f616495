use anyhow::Result;
use clap::Args;
use owo_colors::OwoColorize;

use crate::cli::CommandContext;
use crate::engine::Engine;
use crate::ledger::OrderSide;
use crate::money::Money;
use crate::portfolio::display::{format_money, trades_table};

#[derive(Args, Clone)]
pub struct TradesArgs {
    /// Number of trades to show
    #[arg(short, long, default_value = "20")]
    pub limit: usize,
}

pub struct TradesCommand {
    args: TradesArgs,
}

impl TradesCommand {
    pub fn new(args: TradesArgs) -> Self {
        Self { args }
    }

    pub async fn execute(&self, engine: &Engine, ctx: &CommandContext) -> Result<()> {
        let ledger = engine.ledgers().handle(&ctx.user).await?;
        let trades = ledger.history(Some(self.args.limit)).await?;

        if ctx.json {
            println!("{}", serde_json::to_string_pretty(&trades)?);
            return Ok(());
        }

        if trades.is_empty() {
            println!("No trades recorded.");
            return Ok(());
        }

        println!(
            "\n📈 {} ({} shown)\n",
            "Trade History".bright_white().bold(),
            trades.len()
        );
        println!("{}", trades_table(&trades));

        let buys = trades.iter().filter(|t| t.side == OrderSide::Buy).count();
        let volume: Money = trades.iter().map(|t| t.trade_value).sum();
        let fees: Money = trades.iter().map(|t| t.fees()).sum();
        println!("\n📊 Summary");
        println!(
            "   Trades: {} ({} buys, {} sells)",
            trades.len(),
            buys,
            trades.len() - buys
        );
        println!("   Volume: {}", format_money(volume));
        println!("   Fees paid: {}", format_money(fees));
        Ok(())
    }
}
