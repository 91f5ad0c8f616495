use anyhow::Result;
use clap::Args;
use owo_colors::OwoColorize;
use rust_decimal::Decimal;
use tracing::info;

use crate::cli::CommandContext;
use crate::engine::Engine;
use crate::money::Money;
use crate::portfolio::display::format_money;

#[derive(Args, Clone)]
pub struct InitArgs {
    /// Opening cash balance (default from config)
    #[arg(long)]
    pub cash: Option<Decimal>,
}

pub struct InitCommand {
    args: InitArgs,
}

impl InitCommand {
    pub fn new(args: InitArgs) -> Self {
        Self { args }
    }

    pub async fn execute(&self, engine: &Engine, ctx: &CommandContext) -> Result<()> {
        info!("Creating account: {}", ctx.user);
        let opening = self.args.cash.map(Money::from_decimal);
        let account = engine.ledgers().create_account(&ctx.user, opening).await?;

        if ctx.json {
            println!("{}", serde_json::to_string_pretty(&account)?);
            return Ok(());
        }

        println!(
            "✅ Account {} created",
            account.user_id.bright_white().bold()
        );
        println!(
            "💰 Opening balance: {}",
            format_money(account.cash_balance).bright_green()
        );
        Ok(())
    }
}
