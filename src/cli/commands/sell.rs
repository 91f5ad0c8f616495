use anyhow::Result;
use clap::Args;
use owo_colors::OwoColorize;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::cli::CommandContext;
use crate::engine::Engine;
use crate::ledger::{OrderKind, OrderSide};
use crate::orders::{OrderStatus, PlaceOrder};
use crate::portfolio::display::{format_money, pnl_cell};

#[derive(Args, Clone)]
pub struct SellArgs {
    /// Stock symbol (e.g. RELIANCE)
    pub symbol: String,

    /// Number of shares
    #[arg(long)]
    pub quantity: u64,

    /// Reference price per share; market orders execute at it
    #[arg(long)]
    pub price: Decimal,

    /// Limit price; places a resting limit order instead of executing
    #[arg(long)]
    pub limit: Option<Decimal>,

    /// Display name for the stock
    #[arg(long)]
    pub name: Option<String>,

    /// Idempotency key, making the submission safe to retry
    #[arg(long, value_name = "KEY")]
    pub idempotency_key: Option<String>,

    /// Confirm order placement (required unless RUST_ENV=production)
    #[arg(long)]
    pub yes: bool,
}

pub struct SellCommand {
    args: SellArgs,
}

impl SellCommand {
    pub fn new(args: SellArgs) -> Self {
        Self { args }
    }

    pub async fn execute(&self, engine: &Engine, ctx: &CommandContext) -> Result<()> {
        // Check confirmation in non-production environments
        if !self.args.yes && std::env::var("RUST_ENV").unwrap_or_default() != "production" {
            warn!("⚠️  Order confirmation required. Use --yes to confirm.");
            return Ok(());
        }

        info!("Placing sell order for {}", self.args.symbol);
        let placement = engine
            .orders()
            .place(PlaceOrder {
                user_id: ctx.user.clone(),
                side: OrderSide::Sell,
                symbol: self.args.symbol.clone(),
                stock_name: self.args.name.clone(),
                quantity: self.args.quantity,
                price: self.args.price,
                kind: if self.args.limit.is_some() {
                    OrderKind::Limit
                } else {
                    OrderKind::Market
                },
                limit_price: self.args.limit,
                idempotency_key: self.args.idempotency_key.clone(),
            })
            .await?;

        if ctx.json {
            println!("{}", serde_json::to_string_pretty(&placement)?);
            return Ok(());
        }

        let order = &placement.order;
        println!("🚀 {} order placed!", "SELL".bright_red().bold());
        println!("📋 Order ID: {}", order.id);
        println!(
            "🎯 {} x {} @ {:.2}",
            order.display_name().bright_white(),
            order.quantity,
            order.price
        );
        match &placement.outcome {
            Some(outcome) => {
                println!("✅ Status: {}", order.status.to_string().bright_green());
                println!("💸 Fees: {}", format_money(outcome.trade.fees()));
                println!(
                    "💰 Net proceeds: {}",
                    format_money(outcome.trade.total_cost).bright_yellow()
                );
                println!("📈 Realized P&L: {}", pnl_cell(outcome.trade.realized_pnl));
                println!("🏦 Cash balance: {}", format_money(outcome.cash_balance));
            }
            None => {
                println!("⏳ Status: {}", order.status.to_string().bright_yellow());
                if order.status == OrderStatus::Pending {
                    if let Some(limit) = order.limit_price {
                        println!("🎚️  Resting until filled at or above {limit:.2}");
                    }
                    println!("💡 Fill it with: paperbroker fill {} <price>", order.id);
                }
            }
        }
        Ok(())
    }
}
