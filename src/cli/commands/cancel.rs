use anyhow::Result;
use clap::Args;
use owo_colors::OwoColorize;
use uuid::Uuid;

use crate::cli::CommandContext;
use crate::engine::Engine;

#[derive(Args, Clone)]
pub struct CancelArgs {
    /// Order ID
    pub order_id: Uuid,

    /// Reason for the cancellation
    #[arg(long)]
    pub reason: Option<String>,

    /// Confirm cancellation (required unless RUST_ENV=production)
    #[arg(long)]
    pub yes: bool,
}

pub struct CancelCommand {
    args: CancelArgs,
}

impl CancelCommand {
    pub fn new(args: CancelArgs) -> Self {
        Self { args }
    }

    pub async fn execute(&self, engine: &Engine, ctx: &CommandContext) -> Result<()> {
        // Check confirmation in non-production environments
        if !self.args.yes && std::env::var("RUST_ENV").unwrap_or_default() != "production" {
            println!(
                "{}",
                "⚠️  Cancellation confirmation required. Use --yes to confirm."
                    .yellow()
            );
            return Ok(());
        }

        let cancelled = engine
            .orders()
            .cancel(self.args.order_id, self.args.reason.as_deref())
            .await?;

        if ctx.json {
            println!("{}", serde_json::to_string_pretty(&cancelled)?);
            return Ok(());
        }

        println!(
            "🛑 Order {} {}",
            cancelled.id,
            "cancelled".bright_red().bold()
        );
        println!(
            "🎯 {} {} x {}",
            cancelled.side,
            cancelled.symbol.bright_white(),
            cancelled.quantity
        );
        Ok(())
    }
}
