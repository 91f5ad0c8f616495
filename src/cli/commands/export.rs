use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, ValueEnum};
use owo_colors::OwoColorize;
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

use crate::cli::CommandContext;
use crate::engine::Engine;
use crate::storage::OrderFilter;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ExportKind {
    Trades,
    Orders,
    Positions,
}

impl ExportKind {
    fn name(self) -> &'static str {
        match self {
            ExportKind::Trades => "trades",
            ExportKind::Orders => "orders",
            ExportKind::Positions => "positions",
        }
    }
}

#[derive(Args, Clone)]
pub struct ExportArgs {
    /// What to export
    #[arg(value_enum)]
    pub kind: ExportKind,

    /// Output file (default: <data-dir>/exports/<kind>-<timestamp>.csv)
    #[arg(long)]
    pub output: Option<PathBuf>,
}

pub struct ExportCommand {
    args: ExportArgs,
}

impl ExportCommand {
    pub fn new(args: ExportArgs) -> Self {
        Self { args }
    }

    pub async fn execute(&self, engine: &Engine, ctx: &CommandContext) -> Result<()> {
        let path = self.args.output.clone().unwrap_or_else(|| {
            engine.data_paths().exports().join(format!(
                "{}-{}.csv",
                self.args.kind.name(),
                Utc::now().format("%Y%m%d_%H%M%S")
            ))
        });

        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("Failed to create export file: {}", path.display()))?;

        let rows = match self.args.kind {
            ExportKind::Trades => write_trades(&mut writer, engine, ctx).await?,
            ExportKind::Orders => write_orders(&mut writer, engine, ctx)?,
            ExportKind::Positions => write_positions(&mut writer, engine, ctx).await?,
        };
        writer.flush()?;
        info!(path = %path.display(), rows, "Export written");

        if ctx.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "kind": self.args.kind.name(),
                    "rows": rows,
                    "path": path,
                }))?
            );
            return Ok(());
        }

        println!(
            "✅ Exported {} {} to {}",
            rows,
            self.args.kind.name(),
            path.display().to_string().bright_white()
        );
        Ok(())
    }
}

async fn write_trades(
    writer: &mut csv::Writer<std::fs::File>,
    engine: &Engine,
    ctx: &CommandContext,
) -> Result<usize> {
    let ledger = engine.ledgers().handle(&ctx.user).await?;
    let trades = ledger.history(None).await?;

    writer.write_record([
        "trade_id",
        "order_id",
        "symbol",
        "side",
        "kind",
        "quantity",
        "price",
        "trade_value",
        "brokerage",
        "taxes",
        "total_cost",
        "realized_pnl",
        "executed_at",
    ])?;
    for trade in &trades {
        writer.write_record([
            trade.id.to_string(),
            trade
                .order_id
                .map(|id| id.to_string())
                .unwrap_or_default(),
            trade.symbol.clone(),
            trade.side.to_string(),
            trade.kind.to_string(),
            trade.quantity.to_string(),
            trade.price.to_string(),
            trade.trade_value.to_string(),
            trade.brokerage.to_string(),
            trade.taxes.to_string(),
            trade.total_cost.to_string(),
            trade.realized_pnl.to_string(),
            trade.executed_at.to_rfc3339(),
        ])?;
    }
    Ok(trades.len())
}

fn write_orders(
    writer: &mut csv::Writer<std::fs::File>,
    engine: &Engine,
    ctx: &CommandContext,
) -> Result<usize> {
    let orders = engine.orders().orders(&ctx.user, &OrderFilter::default());

    writer.write_record([
        "order_id",
        "symbol",
        "side",
        "kind",
        "quantity",
        "price",
        "limit_price",
        "status",
        "execution_price",
        "fees",
        "total",
        "rejection_reason",
        "created_at",
    ])?;
    for order in &orders {
        writer.write_record([
            order.id.to_string(),
            order.symbol.clone(),
            order.side.to_string(),
            order.kind.to_string(),
            order.quantity.to_string(),
            order.price.to_string(),
            order
                .limit_price
                .map(|p| p.to_string())
                .unwrap_or_default(),
            order.status.to_string(),
            order
                .execution_price
                .map(|p| p.to_string())
                .unwrap_or_default(),
            order.fees.map(|f| f.to_string()).unwrap_or_default(),
            order.total.map(|t| t.to_string()).unwrap_or_default(),
            order.rejection_reason.clone().unwrap_or_default(),
            order.created_at.to_rfc3339(),
        ])?;
    }
    Ok(orders.len())
}

async fn write_positions(
    writer: &mut csv::Writer<std::fs::File>,
    engine: &Engine,
    ctx: &CommandContext,
) -> Result<usize> {
    let ledger = engine.ledgers().handle(&ctx.user).await?;
    let positions = ledger.positions().await?;
    let open: Vec<_> = positions.iter().filter(|p| p.is_open()).collect();

    writer.write_record([
        "symbol",
        "quantity",
        "avg_price",
        "total_invested",
        "current_price",
        "current_value",
        "realized_pnl",
        "last_updated",
    ])?;
    for position in &open {
        writer.write_record([
            position.symbol.clone(),
            position.quantity.to_string(),
            position.avg_price.to_string(),
            position.total_invested.to_string(),
            position
                .current_price
                .map(|p| p.to_string())
                .unwrap_or_default(),
            position
                .current_value()
                .map(|v| v.to_string())
                .unwrap_or_default(),
            position.realized_pnl.to_string(),
            position.last_updated.to_rfc3339(),
        ])?;
    }
    Ok(open.len())
}
