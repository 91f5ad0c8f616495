//! Terminal rendering for portfolio views
//!
//! Table builders plus the colored summary block used by the CLI.
//! Everything here is presentation; the numbers come in already
//! computed.

use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use owo_colors::OwoColorize;

use crate::ledger::{OrderSide, Trade};
use crate::money::Money;
use crate::orders::{Order, OrderStatus};
use crate::portfolio::aggregator::{PortfolioReport, PositionMetrics, RiskLevel};

pub fn format_money(amount: Money) -> String {
    format!("₹{amount}")
}

/// Signed money with a colored sign for terminals.
pub fn pnl_cell(amount: Money) -> String {
    if amount.is_negative() {
        format!("₹{amount}").bright_red().to_string()
    } else if amount.is_zero() {
        format!("₹{amount}")
    } else {
        format!("+₹{amount}").bright_green().to_string()
    }
}

pub fn side_cell(side: OrderSide) -> String {
    match side {
        OrderSide::Buy => "BUY".bright_green().to_string(),
        OrderSide::Sell => "SELL".bright_red().to_string(),
    }
}

pub fn status_cell(status: OrderStatus) -> String {
    match status {
        OrderStatus::Pending => "PENDING".bright_yellow().to_string(),
        OrderStatus::Open => "OPEN".bright_cyan().to_string(),
        OrderStatus::Filled => "FILLED".bright_green().to_string(),
        OrderStatus::Cancelled => "CANCELLED".bright_red().to_string(),
        OrderStatus::Rejected => "REJECTED".bright_red().to_string(),
    }
}

fn short_id(id: &uuid::Uuid) -> String {
    let s = id.to_string();
    format!("{}...", &s[..8])
}

pub fn positions_table(positions: &[PositionMetrics]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            "Symbol", "Qty", "Avg Price", "LTP", "Invested", "Value", "Day P&L", "Unrealized",
            "Weight",
        ]);

    for m in positions {
        let ltp = m
            .current_price
            .map(|p| format!("{p:.2}"))
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            m.symbol.clone(),
            m.quantity.to_string(),
            format!("{:.2}", m.avg_price),
            ltp,
            format_money(m.invested),
            format_money(m.current_value),
            pnl_cell(m.day_pnl),
            format!("{} ({:.2}%)", pnl_cell(m.unrealized_pnl), m.unrealized_pnl_pct),
            format!("{:.1}%", m.weightage),
        ]);
    }
    table
}

pub fn orders_table(orders: &[Order]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            "Order ID", "Symbol", "Side", "Type", "Qty", "Price", "Limit", "Status", "Total",
            "Created",
        ]);

    for order in orders {
        let limit = order
            .limit_price
            .map(|p| format!("{p:.2}"))
            .unwrap_or_else(|| "-".to_string());
        let total = order
            .total
            .map(format_money)
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            short_id(&order.id),
            order.symbol.clone(),
            side_cell(order.side),
            order.kind.to_string(),
            order.quantity.to_string(),
            format!("{:.2}", order.price),
            limit,
            status_cell(order.status),
            total,
            order.created_at.format("%Y-%m-%d %H:%M").to_string(),
        ]);
    }
    table
}

pub fn trades_table(trades: &[Trade]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            "Trade ID", "Symbol", "Side", "Qty", "Price", "Value", "Fees", "Realized P&L",
            "Executed",
        ]);

    for trade in trades {
        table.add_row(vec![
            short_id(&trade.id),
            trade.symbol.clone(),
            side_cell(trade.side),
            trade.quantity.to_string(),
            format!("{:.2}", trade.price),
            format_money(trade.trade_value),
            format_money(trade.fees()),
            pnl_cell(trade.realized_pnl),
            trade.executed_at.format("%Y-%m-%d %H:%M").to_string(),
        ]);
    }
    table
}

/// Colored multi-line summary block for the `portfolio` command.
pub fn print_report(report: &PortfolioReport) {
    let totals = &report.totals;

    println!("\n{}", "📊 Portfolio Summary".bright_white().bold());
    println!("{}", "─".repeat(44).bright_black());
    println!(
        "   {} {}",
        "Cash balance:".bright_black(),
        format_money(totals.cash_balance).bright_white()
    );
    println!(
        "   {} {}",
        "Invested:".bright_black(),
        format_money(totals.invested)
    );
    println!(
        "   {} {}",
        "Current value:".bright_black(),
        format_money(totals.current_value)
    );
    println!(
        "   {} {}",
        "Day P&L:".bright_black(),
        pnl_cell(totals.day_pnl)
    );
    println!(
        "   {} {}",
        "Unrealized P&L:".bright_black(),
        pnl_cell(totals.unrealized_pnl)
    );
    println!(
        "   {} {}",
        "Realized P&L:".bright_black(),
        pnl_cell(totals.realized_pnl)
    );
    println!(
        "   {} {}",
        "Portfolio value:".bright_black(),
        format_money(totals.portfolio_value).bright_yellow()
    );
    println!(
        "   {} {:.1}% invested / {:.1}% cash",
        "Allocation:".bright_black(),
        totals.invested_allocation,
        totals.cash_allocation
    );
    if !report.positions.is_empty() {
        println!(
            "   {} {:.1}%",
            "Win rate:".bright_black(),
            totals.win_rate
        );
    }

    let risk = &report.risk;
    let level = match risk.risk_level {
        RiskLevel::Low => risk.risk_level.to_string().bright_green().to_string(),
        RiskLevel::Medium => risk.risk_level.to_string().bright_yellow().to_string(),
        RiskLevel::High => risk.risk_level.to_string().bright_red().to_string(),
    };
    println!("\n{}", "⚖️  Risk".bright_white().bold());
    println!("{}", "─".repeat(44).bright_black());
    println!("   {} {}", "Level:".bright_black(), level);
    println!(
        "   {} {:.1}%",
        "Concentration:".bright_black(),
        risk.concentration
    );
    println!(
        "   {} {:.2}%",
        "Day volatility:".bright_black(),
        risk.volatility
    );
    println!(
        "   {} {:.0}/100",
        "Diversification:".bright_black(),
        risk.diversification_score
    );
}
