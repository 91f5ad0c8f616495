use anyhow::Result;
use clap::Args;
use owo_colors::OwoColorize;

use crate::cli::{parse_status, CommandContext};
use crate::engine::Engine;
use crate::orders::OrderStatus;
use crate::portfolio::display::orders_table;
use crate::storage::OrderFilter;

#[derive(Args, Clone)]
pub struct OrdersArgs {
    /// Filter by status (pending, open, filled, cancelled, rejected)
    #[arg(long, value_parser = parse_status)]
    pub status: Option<OrderStatus>,

    /// Filter by symbol
    #[arg(long)]
    pub symbol: Option<String>,

    /// Number of orders to show
    #[arg(short, long)]
    pub limit: Option<usize>,
}

pub struct OrdersCommand {
    args: OrdersArgs,
}

impl OrdersCommand {
    pub fn new(args: OrdersArgs) -> Self {
        Self { args }
    }

    pub async fn execute(&self, engine: &Engine, ctx: &CommandContext) -> Result<()> {
        let filter = OrderFilter {
            status: self.args.status,
            symbol: self.args.symbol.clone(),
            limit: self.args.limit,
        };
        let orders = engine.orders().orders(&ctx.user, &filter);

        if ctx.json {
            println!("{}", serde_json::to_string_pretty(&orders)?);
            return Ok(());
        }

        if orders.is_empty() {
            println!("No orders found.");
            return Ok(());
        }

        println!("\n📋 {} ({})\n", "Orders".bright_white().bold(), orders.len());
        println!("{}", orders_table(&orders));
        Ok(())
    }
}
