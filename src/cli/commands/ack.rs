use anyhow::Result;
use clap::Args;
use owo_colors::OwoColorize;
use uuid::Uuid;

use crate::cli::CommandContext;
use crate::engine::Engine;

#[derive(Args, Clone)]
pub struct AckArgs {
    /// Order ID
    pub order_id: Uuid,
}

pub struct AckCommand {
    args: AckArgs,
}

impl AckCommand {
    pub fn new(args: AckArgs) -> Self {
        Self { args }
    }

    pub async fn execute(&self, engine: &Engine, ctx: &CommandContext) -> Result<()> {
        let order = engine.orders().acknowledge(self.args.order_id).await?;

        if ctx.json {
            println!("{}", serde_json::to_string_pretty(&order)?);
            return Ok(());
        }

        println!(
            "👁️  Order {} is now {}",
            order.id,
            "OPEN".bright_cyan().bold()
        );
        println!(
            "🎯 {} {} x {}",
            order.side,
            order.symbol.bright_white(),
            order.quantity
        );
        Ok(())
    }
}
