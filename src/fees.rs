//! Brokerage and statutory charge computation
//!
//! Pure calculation over a trade value and side. Rates model an Indian
//! equity brokerage: percentage brokerage with a flat cap, STT on sells,
//! exchange transaction charges, GST on (brokerage + exchange), SEBI
//! turnover fees, and stamp duty on buys. All rates are overridable
//! through [`FeeSchedule`] in the engine configuration.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ledger::OrderSide;
use crate::money::Money;

/// Charge rates applied to every executed trade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeSchedule {
    /// Brokerage as a fraction of trade value.
    #[serde(default = "default_brokerage_rate")]
    pub brokerage_rate: Decimal,
    /// Flat cap on brokerage per trade.
    #[serde(default = "default_brokerage_cap")]
    pub brokerage_cap: Decimal,
    /// Securities transaction tax, charged on sells only.
    #[serde(default = "default_stt_rate")]
    pub stt_rate: Decimal,
    /// Exchange transaction charges.
    #[serde(default = "default_exchange_rate")]
    pub exchange_rate: Decimal,
    /// GST applied on brokerage + exchange charges.
    #[serde(default = "default_gst_rate")]
    pub gst_rate: Decimal,
    /// SEBI turnover fees.
    #[serde(default = "default_sebi_rate")]
    pub sebi_rate: Decimal,
    /// Stamp duty, charged on buys only.
    #[serde(default = "default_stamp_rate")]
    pub stamp_rate: Decimal,
}

fn default_brokerage_rate() -> Decimal {
    Decimal::new(1, 3) // 0.1%
}

fn default_brokerage_cap() -> Decimal {
    Decimal::new(20, 0)
}

fn default_stt_rate() -> Decimal {
    Decimal::new(25, 5) // 0.025%
}

fn default_exchange_rate() -> Decimal {
    Decimal::new(345, 7) // 0.00345%
}

fn default_gst_rate() -> Decimal {
    Decimal::new(18, 2) // 18%
}

fn default_sebi_rate() -> Decimal {
    Decimal::new(1, 6) // 0.0001%
}

fn default_stamp_rate() -> Decimal {
    Decimal::new(3, 5) // 0.003%
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            brokerage_rate: default_brokerage_rate(),
            brokerage_cap: default_brokerage_cap(),
            stt_rate: default_stt_rate(),
            exchange_rate: default_exchange_rate(),
            gst_rate: default_gst_rate(),
            sebi_rate: default_sebi_rate(),
            stamp_rate: default_stamp_rate(),
        }
    }
}

/// Statutory charge components for one trade, kept at full precision
/// for display; `total` is the rounded amount actually debited.
#[derive(Debug, Clone, Serialize)]
pub struct TaxBreakdown {
    pub stt: Decimal,
    pub exchange: Decimal,
    pub gst: Decimal,
    pub sebi: Decimal,
    pub stamp_duty: Decimal,
    pub total: Money,
}

/// Complete charges for one trade.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FeeBreakdown {
    pub brokerage: Money,
    pub taxes: Money,
    pub total: Money,
}

/// Computes brokerage and taxes for trade values.
#[derive(Debug, Clone, Default)]
pub struct FeeCalculator {
    schedule: FeeSchedule,
}

impl FeeCalculator {
    pub fn new(schedule: FeeSchedule) -> Self {
        Self { schedule }
    }

    /// Brokerage on a trade value: `rate * value`, capped.
    pub fn brokerage(&self, trade_value: Decimal) -> Money {
        let raw = (trade_value * self.schedule.brokerage_rate).min(self.schedule.brokerage_cap);
        Money::from_decimal(raw)
    }

    /// All statutory components. Each component stays full precision;
    /// the sum is rounded once.
    pub fn tax_breakdown(&self, trade_value: Decimal, side: OrderSide) -> TaxBreakdown {
        let stt = match side {
            OrderSide::Sell => trade_value * self.schedule.stt_rate,
            OrderSide::Buy => Decimal::ZERO,
        };
        let exchange = trade_value * self.schedule.exchange_rate;
        let gst = (self.brokerage(trade_value).as_decimal() + exchange) * self.schedule.gst_rate;
        let sebi = trade_value * self.schedule.sebi_rate;
        let stamp_duty = match side {
            OrderSide::Buy => trade_value * self.schedule.stamp_rate,
            OrderSide::Sell => Decimal::ZERO,
        };
        let total = Money::from_decimal(stt + exchange + gst + sebi + stamp_duty);

        TaxBreakdown {
            stt,
            exchange,
            gst,
            sebi,
            stamp_duty,
            total,
        }
    }

    /// Taxes on a trade value for the given side.
    pub fn taxes(&self, trade_value: Decimal, side: OrderSide) -> Money {
        self.tax_breakdown(trade_value, side).total
    }

    /// Brokerage + taxes for one trade.
    pub fn charges(&self, trade_value: Decimal, side: OrderSide) -> FeeBreakdown {
        let brokerage = self.brokerage(trade_value);
        let taxes = self.taxes(trade_value, side);
        FeeBreakdown {
            brokerage,
            taxes,
            total: brokerage + taxes,
        }
    }
}
